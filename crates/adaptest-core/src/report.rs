//! Session reports with JSON persistence.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::answers::AnswerAttempt;
use crate::difficulty::AdaptiveSettings;
use crate::performance::PerformanceMetrics;
use crate::session::{ExamSession, FinalResult};
use crate::traits::GradingResult;

/// Topic used for questions without metadata.
pub const UNTAGGED_TOPIC: &str = "untagged";

/// A complete record of one finished exam session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Summary of the exam.
    pub exam: ExamSummary,
    /// Session the report was built from.
    pub session_id: Uuid,
    /// Every attempt in submission order, superseded ones included.
    pub attempts: Vec<AnswerAttempt>,
    pub metrics: PerformanceMetrics,
    pub settings: AdaptiveSettings,
    pub result: FinalResult,
    /// Answered/correct counts per topic. Informational only; never used
    /// for scoring.
    pub topics: BTreeMap<String, TopicBreakdown>,
    /// Grading server acknowledgement, if the results were submitted.
    pub grading: Option<GradingResult>,
}

/// Summary of an exam (without the full question definitions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamSummary {
    pub id: String,
    pub title: String,
    pub question_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicBreakdown {
    pub answered: usize,
    pub correct: usize,
}

impl TopicBreakdown {
    pub fn accuracy_percent(&self) -> f64 {
        if self.answered == 0 {
            0.0
        } else {
            self.correct as f64 / self.answered as f64 * 100.0
        }
    }
}

impl SessionReport {
    /// Build a report from a completed session.
    pub fn from_session(session: &ExamSession) -> Result<Self> {
        let result = session
            .finalize()
            .context("cannot report on a session that has not completed")?;

        Ok(Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            exam: ExamSummary {
                id: session.exam_id().to_string(),
                title: session.title().to_string(),
                question_count: session.questions().len(),
            },
            session_id: session.id(),
            attempts: session.answers().history().to_vec(),
            metrics: session.metrics().clone(),
            settings: session.settings().clone(),
            result,
            topics: topic_breakdown(session),
            grading: session.grading().cloned(),
        })
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: SessionReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Default file name: `<exam id>-<session id>.json`.
    ///
    /// Characters of the exam id outside `[A-Za-z0-9_-]` become `_`, so the
    /// name never leaves the report directory.
    pub fn file_name(&self) -> String {
        let stem: String = self
            .exam
            .id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let stem = if stem.is_empty() { "exam" } else { stem.as_str() };
        format!("{}-{}.json", stem, self.session_id)
    }
}

/// Per-topic counts over the latest attempt of each answered question.
pub fn topic_breakdown(session: &ExamSession) -> BTreeMap<String, TopicBreakdown> {
    let mut topics: BTreeMap<String, TopicBreakdown> = BTreeMap::new();

    for attempt in session.answers().graded() {
        let topic = session
            .questions()
            .get(attempt.question_index)
            .and_then(|q| q.metadata.topic.clone())
            .unwrap_or_else(|| UNTAGGED_TOPIC.to_string());

        let entry = topics.entry(topic).or_default();
        entry.answered += 1;
        if attempt.correct {
            entry.correct += 1;
        }
    }

    topics
}
