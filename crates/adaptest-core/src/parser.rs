//! TOML exam definition parser.
//!
//! Loads exams from TOML files and directories, and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::difficulty::{MAX_DIFFICULTY, MIN_DIFFICULTY};
use crate::model::{
    CanonicalAnswer, ExamDefinition, Question, QuestionContent, QuestionKind, QuestionMetadata,
    FALSE_LABEL, TRUE_LABEL,
};

/// Intermediate TOML structure for parsing exam files.
#[derive(Debug, Deserialize)]
struct TomlExamFile {
    exam: TomlExamHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlExamHeader {
    id: String,
    title: String,
    #[serde(default = "default_duration")]
    duration_minutes: u32,
    #[serde(default = "default_passing_score")]
    passing_score_percent: f64,
}

fn default_duration() -> u32 {
    30
}

fn default_passing_score() -> f64 {
    60.0
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    kind: String,
    #[serde(default)]
    difficulty: Option<f64>,
    prompt: String,
    #[serde(default)]
    options: Vec<String>,
    correct_answer: CanonicalAnswer,
    #[serde(default)]
    hints: Vec<String>,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    metadata: QuestionMetadata,
}

/// Parse a single TOML file into an `ExamDefinition`.
pub fn parse_exam(path: &Path) -> Result<ExamDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read exam file: {}", path.display()))?;

    parse_exam_str(&content, path)
}

/// Parse a TOML string into an `ExamDefinition` (useful for testing).
pub fn parse_exam_str(content: &str, source_path: &Path) -> Result<ExamDefinition> {
    let parsed: TomlExamFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            let kind: QuestionKind = q
                .kind
                .parse()
                .map_err(|e: String| anyhow::anyhow!("question '{}': {}", q.id, e))?;

            // True/false questions always offer the two fixed labels.
            let options = if kind == QuestionKind::TrueFalse && q.options.is_empty() {
                vec![TRUE_LABEL.to_string(), FALSE_LABEL.to_string()]
            } else {
                q.options
            };

            Ok(Question {
                id: q.id,
                kind,
                difficulty: q.difficulty.unwrap_or(MIN_DIFFICULTY),
                content: QuestionContent {
                    prompt: q.prompt,
                    options,
                    correct_answer: q.correct_answer,
                    hints: q.hints,
                    explanation: q.explanation,
                },
                metadata: q.metadata,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ExamDefinition {
        id: parsed.exam.id,
        title: parsed.exam.title,
        duration_minutes: parsed.exam.duration_minutes,
        passing_score_percent: parsed.exam.passing_score_percent,
        questions,
    })
}

/// Recursively load all `.toml` exam files from a directory.
///
/// Files that fail to parse are skipped with a warning, so response scripts
/// and other TOML files can live alongside exams.
pub fn load_exam_directory(dir: &Path) -> Result<Vec<ExamDefinition>> {
    let mut exams = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            exams.extend(load_exam_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_exam(&path) {
                Ok(exam) => exams.push(exam),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    exams.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(exams)
}

/// A warning from exam validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate an exam for common authoring mistakes.
pub fn validate_exam(exam: &ExamDefinition) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let exam_warning = |message: String| ValidationWarning {
        question_id: None,
        message,
    };

    if exam.questions.is_empty() {
        warnings.push(exam_warning("exam has no questions".into()));
    }
    if exam.duration_minutes == 0 {
        warnings.push(exam_warning("duration_minutes is 0; the exam expires immediately".into()));
    }
    if !(0.0..=100.0).contains(&exam.passing_score_percent) {
        warnings.push(exam_warning(format!(
            "passing_score_percent {} is outside 0-100",
            exam.passing_score_percent
        )));
    }

    let mut seen_ids = HashSet::new();
    for q in &exam.questions {
        let mut warn = |message: String| {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message,
            })
        };

        if !seen_ids.insert(&q.id) {
            warn(format!("duplicate question ID: {}", q.id));
        }
        if q.content.prompt.trim().is_empty() {
            warn("prompt is empty".into());
        }
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&q.difficulty) {
            warn(format!(
                "difficulty {} is outside {MIN_DIFFICULTY}-{MAX_DIFFICULTY}",
                q.difficulty
            ));
        }

        let canonical = q.content.correct_answer.values();
        if canonical.is_empty() {
            warn("question has no correct answer; every response is graded incorrect".into());
        }
        match q.kind {
            QuestionKind::SingleChoice => {
                if q.content.options.is_empty() {
                    warn("single_choice question has no options".into());
                }
                for value in &canonical {
                    if !q.content.options.iter().any(|o| o == value) {
                        warn(format!("correct answer '{value}' is not one of the options"));
                    }
                }
            }
            QuestionKind::TrueFalse => {
                if q.content.options != [TRUE_LABEL, FALSE_LABEL] {
                    warn(format!(
                        "true_false options must be [\"{TRUE_LABEL}\", \"{FALSE_LABEL}\"]"
                    ));
                }
                if canonical.len() > 1
                    || canonical
                        .first()
                        .is_some_and(|c| !q.content.options.iter().any(|o| o == c))
                {
                    warn(format!(
                        "true_false correct answer must be \"{TRUE_LABEL}\" or \"{FALSE_LABEL}\""
                    ));
                }
            }
            QuestionKind::FreeText => {
                if q.content.correct_answer.is_multiple() {
                    warn("free_text question has several correct answers; only an exact single match can be graded".into());
                }
                if canonical.iter().any(|c| c.trim() != *c) {
                    warn("correct answer has surrounding whitespace; grading is exact-match".into());
                }
            }
        }
    }

    warnings
}
