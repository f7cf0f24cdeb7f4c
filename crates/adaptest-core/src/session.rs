//! The exam session state machine.
//!
//! [`ExamSession`] is the aggregate root: it owns the questions, the
//! countdown, the answer store, the performance metrics and the adaptive
//! settings. Every mutation goes through `&mut self`, so serializing access
//! to one session is the caller's job (see [`crate::engine::SessionEngine`]).
//!
//! ```text
//! not_started ──begin──▶ in_progress ──submit last / expire / finish──▶ completed
//!                           │   ▲
//!                      pause│   │resume
//!                           ▼   │
//!                           paused
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::answers::{normalize, AnswerAttempt, AnswerStore};
use crate::difficulty::{adjust, AdaptiveSettings};
use crate::error::SessionError;
use crate::model::{ExamDefinition, Question, RawResponse};
use crate::performance::{record_attempt, PerformanceMetrics};
use crate::snapshot::{QuestionView, SessionSnapshot};
use crate::timer::{Countdown, TickOutcome};
use crate::traits::{GradingRequest, GradingResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Completed,
    Paused,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::NotStarted => write!(f, "not started"),
            SessionStatus::InProgress => write!(f, "in progress"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Paused => write!(f, "paused"),
        }
    }
}

/// Why a session completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// The last question was answered.
    AllAnswered,
    /// The countdown reached zero.
    TimedOut,
    /// The test-taker submitted before the end.
    Submitted,
}

/// Result of a single `submit_answer` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub question_id: String,
    /// `None` when the question was skipped with the "no answer" sentinel.
    pub correct: Option<bool>,
    pub explanation: String,
    pub settings: AdaptiveSettings,
    pub completed: bool,
}

/// Terminal read of a completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    pub session_id: Uuid,
    pub exam_id: String,
    /// Accuracy rate at completion, 0-100.
    pub score_percent: f64,
    pub passing_score_percent: f64,
    pub passed: bool,
    pub total_time_secs: u64,
    pub answered: usize,
    pub total_questions: usize,
    pub reason: CompletionReason,
}

/// One exam session.
#[derive(Debug, Clone)]
pub struct ExamSession {
    id: Uuid,
    exam_id: String,
    title: String,
    passing_score_percent: f64,
    questions: Vec<Question>,
    status: SessionStatus,
    completion: Option<CompletionReason>,
    current_index: usize,
    time_allowed_minutes: u32,
    countdown: Countdown,
    /// Countdown elapsed seconds when the current question was presented.
    presented_at: u64,
    answers: AnswerStore,
    /// Response recorded for the current question but not yet submitted.
    staged: Option<RawResponse>,
    /// Question index → number of hints revealed by help requests.
    hints_revealed: BTreeMap<usize, usize>,
    metrics: PerformanceMetrics,
    settings: AdaptiveSettings,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    grading: Option<GradingResult>,
    /// Bumped whenever the countdown stops or restarts; stale tickers compare against it.
    timer_epoch: u64,
}

impl ExamSession {
    /// Build a not-started session. Fails if the exam has no questions.
    pub fn new(exam: ExamDefinition, initial_difficulty: f64) -> Result<Self, SessionError> {
        if exam.questions.is_empty() {
            return Err(SessionError::EmptyExam(exam.id));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            countdown: Countdown::from_minutes(exam.duration_minutes),
            time_allowed_minutes: exam.duration_minutes,
            exam_id: exam.id,
            title: exam.title,
            passing_score_percent: exam.passing_score_percent,
            questions: exam.questions,
            status: SessionStatus::NotStarted,
            completion: None,
            current_index: 0,
            presented_at: 0,
            answers: AnswerStore::new(),
            staged: None,
            hints_revealed: BTreeMap::new(),
            metrics: PerformanceMetrics::default(),
            settings: AdaptiveSettings::new(initial_difficulty),
            created_at: Utc::now(),
            completed_at: None,
            grading: None,
            timer_epoch: 0,
        })
    }

    /// Build a session and put it in progress with the countdown running.
    pub fn start(exam: ExamDefinition, initial_difficulty: f64) -> Result<Self, SessionError> {
        let mut session = Self::new(exam, initial_difficulty)?;
        session.begin()?;
        Ok(session)
    }

    /// not-started → in-progress.
    pub fn begin(&mut self) -> Result<(), SessionError> {
        if self.status != SessionStatus::NotStarted {
            return Err(self.state_error(SessionStatus::NotStarted));
        }
        self.status = SessionStatus::InProgress;
        self.countdown.start();
        self.timer_epoch += 1;
        tracing::info!(
            session = %self.id,
            exam = %self.exam_id,
            questions = self.questions.len(),
            minutes = self.time_allowed_minutes,
            difficulty = %self.settings.difficulty,
            "exam session started"
        );
        Ok(())
    }

    /// Grade a response for the current question and advance.
    ///
    /// The "no answer" sentinel skips the question without grading it.
    pub fn submit_answer(&mut self, response: RawResponse) -> Result<SubmitOutcome, SessionError> {
        self.require_in_progress()?;
        self.require_current(&response)?;

        let index = self.current_index;
        let question = &self.questions[index];
        let help = self.hints_revealed.contains_key(&index);
        let attempt = normalize(question, &response, help)?;

        let question_id = question.id.clone();
        let explanation = question.content.explanation.clone();
        let correct = attempt.as_ref().map(|a| a.correct);

        match attempt {
            Some(attempt) => self.fold(attempt),
            None => tracing::debug!(session = %self.id, question = %question_id, "question skipped"),
        }

        self.staged = None;
        self.current_index += 1;
        self.presented_at = self.countdown.elapsed_secs();

        if self.current_index == self.questions.len() {
            self.complete(CompletionReason::AllAnswered);
        }

        Ok(SubmitOutcome {
            question_id,
            correct,
            explanation,
            settings: self.settings.clone(),
            completed: self.status == SessionStatus::Completed,
        })
    }

    /// Record a response for the current question without submitting it.
    ///
    /// A staged response is graded if the session ends before the
    /// test-taker submits it. Staging again replaces it.
    pub fn stage_response(&mut self, response: RawResponse) -> Result<(), SessionError> {
        self.require_in_progress()?;
        self.require_current(&response)?;
        normalize(&self.questions[self.current_index], &response, false)?;
        self.staged = Some(response);
        Ok(())
    }

    /// Flag the test-taker for support, enable the help accommodations and
    /// reveal the next hint for the current question, if one is left.
    pub fn request_help(&mut self) -> Result<Option<String>, SessionError> {
        self.require_in_progress()?;

        self.settings = self.settings.with_help();

        let index = self.current_index;
        let hints = &self.questions[index].content.hints;
        let revealed = self.hints_revealed.entry(index).or_insert(0);
        let hint = hints.get(*revealed).cloned();
        if hint.is_some() {
            *revealed += 1;
        }

        tracing::info!(
            session = %self.id,
            question = index,
            hint = hint.is_some(),
            "help requested"
        );
        Ok(hint)
    }

    /// End the session because time ran out.
    ///
    /// A staged response for the current question is graded; every other
    /// unanswered question counts as "no answer". A second call reports
    /// [`SessionError::AlreadyCompleted`] and changes nothing.
    pub fn expire_by_timeout(&mut self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::Completed => return Err(SessionError::AlreadyCompleted),
            SessionStatus::NotStarted => {
                return Err(self.state_error(SessionStatus::InProgress));
            }
            SessionStatus::InProgress | SessionStatus::Paused => {}
        }

        self.expire();
        Ok(())
    }

    /// End the session early at the test-taker's request.
    ///
    /// Rejected with [`SessionError::NothingAnswered`] when no question has
    /// been answered; the session then stays open.
    pub fn finish(&mut self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::Completed => return Err(SessionError::AlreadyCompleted),
            SessionStatus::NotStarted => {
                return Err(self.state_error(SessionStatus::InProgress));
            }
            SessionStatus::InProgress | SessionStatus::Paused => {}
        }

        let staged_answer = self
            .staged
            .as_ref()
            .is_some_and(|r| r.answer.is_answered());
        if self.answers.answered_count() == 0 && !staged_answer {
            return Err(SessionError::NothingAnswered);
        }

        self.grade_staged();
        self.complete(CompletionReason::Submitted);
        Ok(())
    }

    /// One second of countdown. Expires the session when it reaches zero.
    pub fn tick(&mut self) -> TickOutcome {
        if self.status != SessionStatus::InProgress {
            return TickOutcome::Inactive;
        }
        let outcome = self.countdown.tick();
        if outcome == TickOutcome::Expired {
            self.expire();
        }
        outcome
    }

    /// Grade whatever is staged and complete as timed out. Callers have
    /// already checked that the session is running or paused.
    fn expire(&mut self) {
        self.grade_staged();
        tracing::warn!(
            session = %self.id,
            answered = self.answers.answered_count(),
            total = self.questions.len(),
            "exam time expired"
        );
        self.complete(CompletionReason::TimedOut);
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.require_in_progress()?;
        self.status = SessionStatus::Paused;
        self.countdown.pause();
        self.timer_epoch += 1;
        tracing::info!(session = %self.id, remaining = self.countdown.remaining_secs(), "exam paused");
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::Paused => {}
            SessionStatus::Completed => return Err(SessionError::AlreadyCompleted),
            _ => return Err(self.state_error(SessionStatus::Paused)),
        }
        self.status = SessionStatus::InProgress;
        self.countdown.resume();
        self.timer_epoch += 1;
        tracing::info!(session = %self.id, remaining = self.countdown.remaining_secs(), "exam resumed");
        Ok(())
    }

    /// Score and total time of a completed session.
    pub fn finalize(&self) -> Result<FinalResult, SessionError> {
        let reason = match (self.status, self.completion) {
            (SessionStatus::Completed, Some(reason)) => reason,
            _ => return Err(SessionError::NotCompleted),
        };

        let score_percent = self.metrics.accuracy_rate;
        Ok(FinalResult {
            session_id: self.id,
            exam_id: self.exam_id.clone(),
            score_percent,
            passing_score_percent: self.passing_score_percent,
            passed: score_percent >= self.passing_score_percent,
            total_time_secs: self.metrics.completion_time_secs,
            answered: self.answers.answered_count(),
            total_questions: self.questions.len(),
            reason,
        })
    }

    /// The payload for the grading endpoint. Identical on every call, so a
    /// failed submission can be retried as-is.
    pub fn grading_request(&self) -> Result<GradingRequest, SessionError> {
        Ok(GradingRequest {
            exam_id: self.exam_id.clone(),
            session_id: self.id,
            answers: self.answers.submission_payload()?,
        })
    }

    /// Store the grading server's acknowledgement.
    pub fn acknowledge(&mut self, result: GradingResult) -> Result<(), SessionError> {
        if self.status != SessionStatus::Completed {
            return Err(SessionError::NotCompleted);
        }
        self.grading = Some(result);
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let current_question = (self.status != SessionStatus::Completed)
            .then(|| self.questions.get(self.current_index))
            .flatten()
            .map(|q| {
                let revealed = self
                    .hints_revealed
                    .get(&self.current_index)
                    .copied()
                    .unwrap_or(0);
                QuestionView::new(self.current_index, q, revealed)
            });

        SessionSnapshot {
            session_id: self.id,
            exam_id: self.exam_id.clone(),
            status: self.status,
            current_index: self.current_index,
            total_questions: self.questions.len(),
            answered: self.answers.answered_count(),
            time_allowed_minutes: self.time_allowed_minutes,
            time_remaining_secs: self.countdown.remaining_secs(),
            question_elapsed_secs: self.question_elapsed_secs(),
            settings: self.settings.clone(),
            metrics: self.metrics.clone(),
            current_question,
            completion: self.completion,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn exam_id(&self) -> &str {
        &self.exam_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    pub fn settings(&self) -> &AdaptiveSettings {
        &self.settings
    }

    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    pub fn time_remaining_secs(&self) -> u64 {
        self.countdown.remaining_secs()
    }

    pub fn question_elapsed_secs(&self) -> u64 {
        self.countdown.elapsed_secs().saturating_sub(self.presented_at)
    }

    pub fn completion_reason(&self) -> Option<CompletionReason> {
        self.completion
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn grading(&self) -> Option<&GradingResult> {
        self.grading.as_ref()
    }

    pub(crate) fn timer_epoch(&self) -> u64 {
        self.timer_epoch
    }

    fn fold(&mut self, attempt: AnswerAttempt) {
        self.metrics = record_attempt(&self.metrics, &attempt);
        self.settings = adjust(&self.metrics, &self.settings, &attempt);
        tracing::debug!(
            session = %self.id,
            question = %attempt.question_id,
            correct = attempt.correct,
            accuracy = self.metrics.accuracy_rate,
            difficulty = %self.settings.difficulty,
            "answer graded"
        );
        self.answers.record(attempt);
    }

    fn grade_staged(&mut self) {
        let Some(response) = self.staged.take() else {
            return;
        };
        let index = self.current_index;
        let Some(question) = self.questions.get(index) else {
            return;
        };
        let help = self.hints_revealed.contains_key(&index);
        match normalize(question, &response, help) {
            Ok(Some(attempt)) => self.fold(attempt),
            Ok(None) => {}
            Err(e) => tracing::warn!(session = %self.id, "dropping staged response: {e}"),
        }
    }

    fn complete(&mut self, reason: CompletionReason) {
        self.status = SessionStatus::Completed;
        self.completion = Some(reason);
        self.completed_at = Some(Utc::now());
        self.staged = None;
        self.countdown.cancel();
        self.timer_epoch += 1;
        tracing::info!(
            session = %self.id,
            ?reason,
            accuracy = self.metrics.accuracy_rate,
            answered = self.answers.answered_count(),
            "exam session completed"
        );
    }

    fn require_in_progress(&self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::InProgress => Ok(()),
            SessionStatus::Completed => Err(SessionError::AlreadyCompleted),
            _ => Err(self.state_error(SessionStatus::InProgress)),
        }
    }

    fn require_current(&self, response: &RawResponse) -> Result<(), SessionError> {
        if response.question_index != self.current_index {
            return Err(SessionError::InvalidResponse(format!(
                "expected a response for question {}, got {}",
                self.current_index, response.question_index
            )));
        }
        Ok(())
    }

    fn state_error(&self, required: SessionStatus) -> SessionError {
        SessionError::InvalidState {
            actual: self.status,
            required,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::answers::tests::{choice_question, text_question};
    use crate::difficulty::{Accommodation, HELP_ACCOMMODATIONS};
    use crate::model::RawAnswer;

    pub(crate) fn exam(minutes: u32) -> ExamDefinition {
        ExamDefinition {
            id: "geo-101".into(),
            title: "Geography".into(),
            duration_minutes: minutes,
            passing_score_percent: 60.0,
            questions: vec![
                choice_question("q1", &["A", "B", "C"], "B"),
                choice_question("q2", &["A", "B", "C"], "C"),
                text_question("q3", "Paris"),
            ],
        }
    }

    pub(crate) fn choice(index: usize, option: usize) -> RawResponse {
        RawResponse {
            question_index: index,
            answer: RawAnswer::Choice { index: option },
            confidence: 3,
            hint_used: false,
            time_spent_secs: 45,
        }
    }

    fn text(index: usize, text: &str) -> RawResponse {
        RawResponse {
            question_index: index,
            answer: RawAnswer::FreeText { text: text.into() },
            confidence: 4,
            hint_used: false,
            time_spent_secs: 90,
        }
    }

    #[test]
    fn start_rejects_empty_exam() {
        let mut e = exam(10);
        e.questions.clear();
        assert!(matches!(
            ExamSession::start(e, 3.0),
            Err(SessionError::EmptyExam(id)) if id == "geo-101"
        ));
    }

    #[test]
    fn start_puts_session_in_progress() {
        let s = ExamSession::start(exam(45), 3.0).unwrap();
        assert_eq!(s.status(), SessionStatus::InProgress);
        assert_eq!(s.current_index(), 0);
        assert_eq!(s.metrics(), &PerformanceMetrics::default());
        assert_eq!(s.time_remaining_secs(), 2700);
    }

    #[test]
    fn not_started_session_rejects_answers() {
        let mut s = ExamSession::new(exam(10), 3.0).unwrap();
        let err = s.submit_answer(choice(0, 1)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidState {
                actual: SessionStatus::NotStarted,
                ..
            }
        ));
        s.begin().unwrap();
        assert!(s.begin().is_err());
    }

    #[test]
    fn correct_single_choice_scores() {
        let mut s = ExamSession::start(exam(10), 3.0).unwrap();
        let outcome = s.submit_answer(choice(0, 1)).unwrap();
        assert_eq!(outcome.correct, Some(true));
        assert!(!outcome.completed);
        assert_eq!(s.metrics().accuracy_rate, 100.0);
        assert_eq!(s.metrics().comprehension_rate, 10.0);
        assert_eq!(s.answers().latest(0).unwrap().answer, "B");
        assert_eq!(s.current_index(), 1);
    }

    #[test]
    fn answering_every_question_completes() {
        let mut s = ExamSession::start(exam(10), 3.0).unwrap();
        s.submit_answer(choice(0, 1)).unwrap();
        s.submit_answer(choice(1, 0)).unwrap();
        let outcome = s.submit_answer(text(2, "Paris ")).unwrap();
        assert_eq!(outcome.correct, Some(false));
        assert!(outcome.completed);
        assert_eq!(s.status(), SessionStatus::Completed);

        let result = s.finalize().unwrap();
        assert!((result.score_percent - 100.0 / 3.0).abs() < 1e-9);
        assert!(!result.passed);
        assert_eq!(result.total_time_secs, 45 + 45 + 90);
        assert_eq!(result.reason, CompletionReason::AllAnswered);
    }

    #[test]
    fn double_submission_after_completion_is_rejected() {
        let mut s = ExamSession::start(exam(10), 3.0).unwrap();
        s.submit_answer(choice(0, 1)).unwrap();
        s.submit_answer(choice(1, 2)).unwrap();
        s.submit_answer(text(2, "Paris")).unwrap();

        let err = s.submit_answer(text(2, "Paris")).unwrap_err();
        assert_eq!(err, SessionError::AlreadyCompleted);
        assert!(!err.is_recoverable());
        assert_eq!(s.metrics().attempts_count, 3);
    }

    #[test]
    fn response_for_wrong_question_is_rejected() {
        let mut s = ExamSession::start(exam(10), 3.0).unwrap();
        let err = s.submit_answer(choice(1, 1)).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn skipped_question_is_not_graded() {
        let mut s = ExamSession::start(exam(10), 3.0).unwrap();
        let skip = RawResponse {
            question_index: 0,
            answer: RawAnswer::NoAnswer,
            confidence: 0,
            hint_used: false,
            time_spent_secs: 0,
        };
        let outcome = s.submit_answer(skip).unwrap();
        assert_eq!(outcome.correct, None);
        assert_eq!(s.current_index(), 1);
        assert_eq!(s.metrics().attempts_count, 0);
        assert_eq!(s.answers().answered_count(), 0);
    }

    #[test]
    fn finalize_before_completion_is_an_error() {
        let s = ExamSession::start(exam(10), 3.0).unwrap();
        assert_eq!(s.finalize().unwrap_err(), SessionError::NotCompleted);
    }

    #[test]
    fn help_twice_adds_accommodations_once() {
        let mut s = ExamSession::start(exam(10), 3.0).unwrap();
        let first = s.request_help().unwrap();
        assert_eq!(first.as_deref(), Some("Think about it"));
        let second = s.request_help().unwrap();
        assert_eq!(second, None);

        let settings = s.settings();
        assert!(settings.requires_additional_support);
        assert_eq!(settings.accommodations.len(), HELP_ACCOMMODATIONS.len());
        assert!(settings.accommodations.contains(&Accommodation::VisualAids));
        assert_eq!(s.current_index(), 0);
        assert_eq!(s.metrics().attempts_count, 0);

        let view = s.snapshot().current_question.unwrap();
        assert_eq!(view.hints_revealed, vec!["Think about it".to_string()]);

        let outcome = s.submit_answer(choice(0, 1)).unwrap();
        assert!(outcome.settings.requires_additional_support);
        assert!(s.answers().latest(0).unwrap().hint_used);
    }

    #[test]
    fn help_after_completion_reports_already_completed() {
        let mut s = ExamSession::start(exam(10), 3.0).unwrap();
        s.expire_by_timeout().unwrap();
        assert_eq!(s.request_help().unwrap_err(), SessionError::AlreadyCompleted);
    }

    #[test]
    fn expiry_is_idempotent() {
        let mut s = ExamSession::start(exam(10), 3.0).unwrap();
        s.submit_answer(choice(0, 1)).unwrap();
        s.expire_by_timeout().unwrap();
        let once = s.snapshot();
        let result_once = s.finalize().unwrap();

        assert_eq!(s.expire_by_timeout().unwrap_err(), SessionError::AlreadyCompleted);
        assert_eq!(s.snapshot(), once);
        assert_eq!(s.finalize().unwrap(), result_once);
        assert_eq!(result_once.reason, CompletionReason::TimedOut);
        assert_eq!(result_once.answered, 1);
    }

    #[test]
    fn expiry_grades_staged_response() {
        let mut s = ExamSession::start(exam(10), 3.0).unwrap();
        s.submit_answer(choice(0, 1)).unwrap();
        s.stage_response(choice(1, 2)).unwrap();
        s.expire_by_timeout().unwrap();

        assert_eq!(s.answers().answered_count(), 2);
        assert!(s.answers().latest(1).unwrap().correct);
        assert!(!s.answers().is_answered(2));
        let payload = s.grading_request().unwrap();
        assert_eq!(payload.answers.len(), 2);
    }

    #[test]
    fn stage_rejects_invalid_response() {
        let mut s = ExamSession::start(exam(10), 3.0).unwrap();
        assert!(s.stage_response(choice(0, 9)).is_err());
    }

    #[test]
    fn countdown_expiry_grades_staged_response() {
        let mut s = ExamSession::start(exam(1), 3.0).unwrap();
        s.stage_response(choice(0, 1)).unwrap();
        for _ in 0..59 {
            assert!(matches!(s.tick(), TickOutcome::Running { .. }));
        }
        assert_eq!(s.tick(), TickOutcome::Expired);

        assert_eq!(s.completion_reason(), Some(CompletionReason::TimedOut));
        assert!(s.answers().latest(0).unwrap().correct);
        assert_eq!(s.finalize().unwrap().answered, 1);
    }

    #[test]
    fn forty_five_minutes_of_ticks_complete_once() {
        let mut s = ExamSession::start(exam(45), 3.0).unwrap();
        let mut expiries = 0;
        for _ in 0..2700 {
            if s.tick() == TickOutcome::Expired {
                expiries += 1;
            }
        }
        assert_eq!(expiries, 1);
        assert_eq!(s.status(), SessionStatus::Completed);
        assert_eq!(s.completion_reason(), Some(CompletionReason::TimedOut));

        let before = s.snapshot();
        assert_eq!(s.tick(), TickOutcome::Inactive);
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn pause_freezes_the_clock() {
        let mut s = ExamSession::start(exam(1), 3.0).unwrap();
        s.tick();
        s.pause().unwrap();
        assert_eq!(s.tick(), TickOutcome::Inactive);
        assert_eq!(s.time_remaining_secs(), 59);
        assert!(s.submit_answer(choice(0, 1)).is_err());

        s.resume().unwrap();
        s.tick();
        assert_eq!(s.time_remaining_secs(), 58);
        assert_eq!(s.question_elapsed_secs(), 2);
    }

    #[test]
    fn resume_after_completion_is_rejected() {
        let mut s = ExamSession::start(exam(1), 3.0).unwrap();
        s.pause().unwrap();
        s.expire_by_timeout().unwrap();
        assert_eq!(s.resume().unwrap_err(), SessionError::AlreadyCompleted);
    }

    #[test]
    fn finish_requires_an_answer() {
        let mut s = ExamSession::start(exam(10), 3.0).unwrap();
        assert_eq!(s.finish().unwrap_err(), SessionError::NothingAnswered);
        assert_eq!(s.status(), SessionStatus::InProgress);

        s.submit_answer(choice(0, 1)).unwrap();
        s.finish().unwrap();
        assert_eq!(s.completion_reason(), Some(CompletionReason::Submitted));
        assert_eq!(s.expire_by_timeout().unwrap_err(), SessionError::AlreadyCompleted);
    }

    #[test]
    fn timeout_with_nothing_answered_has_empty_payload() {
        let mut s = ExamSession::start(exam(10), 3.0).unwrap();
        s.expire_by_timeout().unwrap();
        assert_eq!(s.finalize().unwrap().score_percent, 0.0);
        assert_eq!(s.grading_request().unwrap_err(), SessionError::NothingAnswered);
    }

    #[test]
    fn snapshot_hides_answer_key() {
        let s = ExamSession::start(exam(10), 3.0).unwrap();
        let snap = s.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        assert!(!json.contains("correct_answer"));
        assert!(!json.contains("explanation"));
        assert_eq!(snap.current_question.unwrap().id, "q1");
    }
}
