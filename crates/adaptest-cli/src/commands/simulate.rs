//! The `adaptest simulate` command.
//!
//! Replays a response script through a live [`SessionEngine`]:
//!
//! ```toml
//! [[responses]]
//! answer = { kind = "choice", index = 1 }
//! confidence = 4
//! time_spent_secs = 40
//! help = true          # request a hint first
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use serde::Deserialize;

use adaptest_core::model::{RawAnswer, RawResponse};
use adaptest_core::parser;
use adaptest_core::report::SessionReport;
use adaptest_core::session::{CompletionReason, FinalResult, SubmitOutcome};
use adaptest_core::{SessionEngine, SessionError, SessionStatus};
use adaptest_grading::config::load_config_from;
use adaptest_grading::create_client;

#[derive(Debug, Deserialize)]
struct ResponseScript {
    #[serde(default)]
    responses: Vec<ScriptedResponse>,
}

#[derive(Debug, Deserialize)]
struct ScriptedResponse {
    /// Question index; defaults to whatever question is current.
    #[serde(default)]
    question: Option<usize>,
    answer: RawAnswer,
    #[serde(default = "default_confidence")]
    confidence: u8,
    #[serde(default)]
    hint_used: bool,
    #[serde(default)]
    time_spent_secs: u64,
    /// Request help before answering.
    #[serde(default)]
    help: bool,
    /// Stage the response instead of submitting it.
    #[serde(default)]
    stage: bool,
}

fn default_confidence() -> u8 {
    3
}

fn load_script(path: &Path) -> Result<ResponseScript> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read response script: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("failed to parse response script: {}", path.display()))
}

pub async fn execute(
    exam_path: PathBuf,
    responses_path: PathBuf,
    difficulty: Option<f64>,
    output: Option<PathBuf>,
    submit: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    if let Some(d) = difficulty {
        anyhow::ensure!((1.0..=5.0).contains(&d), "difficulty must be between 1 and 5");
    }

    let config = load_config_from(config_path.as_deref())?;
    let exam = parser::parse_exam(&exam_path)?;
    let script = load_script(&responses_path)?;
    tracing::debug!(
        exam = %exam.id,
        responses = script.responses.len(),
        "loaded response script"
    );

    for w in parser::validate_exam(&exam) {
        let id = w.question_id.as_deref().unwrap_or("exam");
        eprintln!("Warning [{id}]: {}", w.message);
    }

    let engine = SessionEngine::new(config.engine_config());
    let snapshot = engine.start(exam, difficulty).await?;
    eprintln!(
        "adaptest v{}: {} questions, {} min, starting difficulty {}",
        env!("CARGO_PKG_VERSION"),
        snapshot.total_questions,
        snapshot.time_allowed_minutes,
        snapshot.settings.difficulty
    );

    let mut table = Table::new();
    table.set_header(vec![
        "#",
        "Question",
        "Result",
        "Difficulty",
        "Pace",
        "Support",
    ]);

    let scripted_count = script.responses.len();
    for (step, scripted) in script.responses.into_iter().enumerate() {
        let current = engine.snapshot().await?;
        if current.status == SessionStatus::Completed {
            eprintln!(
                "Session completed; ignoring {} remaining scripted response(s).",
                scripted_count - step
            );
            break;
        }

        if scripted.help {
            match engine.request_help().await? {
                Some(hint) => eprintln!("  Hint: {hint}"),
                None => eprintln!("  No more hints for this question."),
            }
        }

        let response = RawResponse {
            question_index: scripted.question.unwrap_or(current.current_index),
            answer: scripted.answer,
            confidence: scripted.confidence,
            hint_used: scripted.hint_used,
            time_spent_secs: scripted.time_spent_secs,
        };

        if scripted.stage {
            engine.stage_response(response).await?;
            eprintln!("  Staged response for question {}", current.current_index + 1);
            continue;
        }

        match engine.submit_answer(response).await {
            Ok(outcome) => add_row(&mut table, current.current_index, &outcome),
            Err(e @ SessionError::InvalidResponse(_)) => {
                eprintln!("  Rejected response {}: {e}", step + 1);
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!("{table}");

    if engine.snapshot().await?.status != SessionStatus::Completed {
        eprintln!("Response script ended early; expiring the session.");
        engine.expire_by_timeout().await?;
    }

    let result = engine.finalize().await?;
    print_result(&result);

    let session = if submit {
        let client = create_client(&config.grading)?;
        let grading = engine
            .submit_results(client.as_ref())
            .await
            .context("failed to submit results")?;
        println!(
            "Graded: {:.1}% ({}), attempt {}",
            grading.score,
            if grading.passed() { "passed" } else { "failed" },
            grading.attempt_id
        );
        engine.discard().await?
    } else {
        engine.session().await?
    };

    // Graded sessions are always archived, to the configured directory by default.
    let report_dir = output.or_else(|| submit.then(|| config.output_dir.clone()));
    if let Some(dir) = report_dir {
        let report = SessionReport::from_session(&session)?;
        let path = dir.join(report.file_name());
        report.save_json(&path)?;
        eprintln!("Report saved to: {}", path.display());
    }

    Ok(())
}

fn add_row(table: &mut Table, index: usize, outcome: &SubmitOutcome) {
    let verdict = match outcome.correct {
        Some(true) => "correct",
        Some(false) => "incorrect",
        None => "skipped",
    };
    table.add_row(vec![
        Cell::new(index + 1),
        Cell::new(&outcome.question_id),
        Cell::new(verdict),
        Cell::new(outcome.settings.difficulty),
        Cell::new(outcome.settings.pace),
        Cell::new(if outcome.settings.requires_additional_support {
            "yes"
        } else {
            "no"
        }),
    ]);
}

fn print_result(result: &FinalResult) {
    println!(
        "Score: {:.1}% ({}), {}/{} answered in {}s, {}",
        result.score_percent,
        if result.passed { "PASS" } else { "FAIL" },
        result.answered,
        result.total_questions,
        result.total_time_secs,
        match result.reason {
            CompletionReason::AllAnswered => "all questions answered",
            CompletionReason::TimedOut => "time expired",
            CompletionReason::Submitted => "submitted early",
        }
    );
}
