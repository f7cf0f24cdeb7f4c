//! Central session engine.
//!
//! Owns the single active [`ExamSession`] behind an async mutex so every
//! mutation (answers, help requests, timer expiry) is serialized, drives the
//! countdown from a background ticker task, and submits final results through
//! a [`GradingClient`] with an in-flight guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time;

use crate::error::{SessionError, SubmitError};
use crate::model::{ExamDefinition, RawResponse};
use crate::session::{ExamSession, FinalResult, SessionStatus, SubmitOutcome};
use crate::snapshot::SessionSnapshot;
use crate::timer::TickOutcome;
use crate::traits::{GradingClient, GradingResult};

/// Configuration for the session engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Countdown period. One tick removes one second from the session clock.
    pub tick_interval: Duration,
    /// Starting difficulty when `start` is not given one.
    pub default_difficulty: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            default_difficulty: 3.0,
        }
    }
}

/// The session engine. Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SessionEngine {
    session: Arc<Mutex<Option<ExamSession>>>,
    /// Live countdown task, tagged with the timer epoch it was spawned for.
    /// Only touched while the session lock is held.
    ticker: Arc<Mutex<Option<(u64, JoinHandle<()>)>>>,
    status_tx: Arc<watch::Sender<Option<SessionStatus>>>,
    submitting: Arc<AtomicBool>,
    config: EngineConfig,
}

impl Default for SessionEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl SessionEngine {
    pub fn new(config: EngineConfig) -> Self {
        let (status_tx, _) = watch::channel(None);
        Self {
            session: Arc::new(Mutex::new(None)),
            ticker: Arc::new(Mutex::new(None)),
            status_tx: Arc::new(status_tx),
            submitting: Arc::new(AtomicBool::new(false)),
            config,
        }
    }

    /// Watch the session status. `None` means no session is loaded.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionStatus>> {
        self.status_tx.subscribe()
    }

    /// Start a new session and its countdown.
    ///
    /// Fails with [`SessionError::SessionActive`] while another session is
    /// still running or paused. A completed session is replaced.
    pub async fn start(
        &self,
        exam: ExamDefinition,
        initial_difficulty: Option<f64>,
    ) -> Result<SessionSnapshot, SessionError> {
        let difficulty = initial_difficulty.unwrap_or(self.config.default_difficulty);

        let snapshot = {
            let mut guard = self.session.lock().await;
            if let Some(existing) = guard.as_ref() {
                if existing.status() != SessionStatus::Completed {
                    return Err(SessionError::SessionActive);
                }
                if existing.grading().is_none() {
                    tracing::warn!(
                        session = %existing.id(),
                        "replacing a completed session whose results were never acknowledged"
                    );
                }
            }

            let session = ExamSession::start(exam, difficulty)?;
            let snapshot = session.snapshot();
            self.sync_ticker(&session).await;
            *guard = Some(session);
            snapshot
        };

        self.status_tx.send_replace(Some(snapshot.status));
        Ok(snapshot)
    }

    pub async fn submit_answer(&self, response: RawResponse) -> Result<SubmitOutcome, SessionError> {
        self.mutate(|s| s.submit_answer(response)).await
    }

    pub async fn stage_response(&self, response: RawResponse) -> Result<(), SessionError> {
        self.mutate(|s| s.stage_response(response)).await
    }

    pub async fn request_help(&self) -> Result<Option<String>, SessionError> {
        self.mutate(|s| s.request_help()).await
    }

    pub async fn pause(&self) -> Result<(), SessionError> {
        self.mutate(|s| s.pause()).await
    }

    pub async fn resume(&self) -> Result<(), SessionError> {
        self.mutate(|s| s.resume()).await
    }

    /// Force the session to end as if the countdown had reached zero.
    pub async fn expire_by_timeout(&self) -> Result<(), SessionError> {
        self.mutate(|s| s.expire_by_timeout()).await
    }

    /// End the session early. Requires at least one answered question.
    pub async fn finish(&self) -> Result<(), SessionError> {
        self.mutate(|s| s.finish()).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let guard = self.session.lock().await;
        guard
            .as_ref()
            .map(ExamSession::snapshot)
            .ok_or(SessionError::NoActiveSession)
    }

    pub async fn finalize(&self) -> Result<FinalResult, SessionError> {
        let guard = self.session.lock().await;
        guard
            .as_ref()
            .ok_or(SessionError::NoActiveSession)?
            .finalize()
    }

    /// A copy of the current session, for reporting.
    pub async fn session(&self) -> Result<ExamSession, SessionError> {
        let guard = self.session.lock().await;
        guard.clone().ok_or(SessionError::NoActiveSession)
    }

    /// Submit final results for grading.
    ///
    /// An in-progress session with at least one answer is completed first.
    /// Nothing is sent when no question was answered. On failure the
    /// completed session stays loaded and the call can be retried with the
    /// same payload; once acknowledged, repeated calls return the stored
    /// result without contacting the server again.
    pub async fn submit_results(
        &self,
        client: &dyn GradingClient,
    ) -> Result<GradingResult, SubmitError> {
        let _in_flight = InFlightGuard::acquire(&self.submitting).ok_or(SubmitError::InFlight)?;

        let request = {
            let mut guard = self.session.lock().await;
            let session = guard.as_mut().ok_or(SessionError::NoActiveSession)?;
            if let Some(result) = session.grading() {
                return Ok(result.clone());
            }
            if session.status() != SessionStatus::Completed {
                session.finish()?;
            }
            let request = session.grading_request()?;
            self.sync_ticker(session).await;
            request
        };
        self.status_tx.send_replace(Some(SessionStatus::Completed));

        tracing::info!(
            client = client.name(),
            exam = %request.exam_id,
            answers = request.answers.len(),
            "submitting exam results"
        );

        let result = client.submit(&request).await.map_err(|e| {
            tracing::error!(exam = %request.exam_id, "grading submission failed: {e:#}");
            SubmitError::External(e)
        })?;

        let mut guard = self.session.lock().await;
        match guard.as_mut() {
            Some(session) if session.id() == request.session_id => {
                session.acknowledge(result.clone())?;
            }
            _ => return Err(SessionError::NoActiveSession.into()),
        }

        tracing::info!(
            attempt = %result.attempt_id,
            score = result.score,
            "exam results acknowledged"
        );
        Ok(result)
    }

    /// Release an acknowledged session and return it.
    pub async fn discard(&self) -> Result<ExamSession, SessionError> {
        let mut guard = self.session.lock().await;
        match guard.as_ref() {
            None => return Err(SessionError::NoActiveSession),
            Some(s) if s.grading().is_none() => return Err(SessionError::NotAcknowledged),
            Some(_) => {}
        }
        let session = guard.take().ok_or(SessionError::NoActiveSession)?;
        self.abort_ticker().await;
        drop(guard);

        self.status_tx.send_replace(None);
        Ok(session)
    }

    /// Run one mutation under the session lock and bring the ticker in line
    /// with the resulting session state before the lock is released.
    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut ExamSession) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let (value, status) = {
            let mut guard = self.session.lock().await;
            let session = guard.as_mut().ok_or(SessionError::NoActiveSession)?;
            let value = f(session)?;
            self.sync_ticker(session).await;
            (value, session.status())
        };

        self.status_tx.send_if_modified(|current| {
            let changed = *current != Some(status);
            *current = Some(status);
            changed
        });
        Ok(value)
    }

    /// Keep exactly one ticker alive for an in-progress session, and none
    /// otherwise. Must be called with the session lock held.
    async fn sync_ticker(&self, session: &ExamSession) {
        let mut ticker_guard = self.ticker.lock().await;
        let epoch = session.timer_epoch();
        let live = session.status() == SessionStatus::InProgress;

        if live && matches!(ticker_guard.as_ref(), Some((e, _)) if *e == epoch) {
            return;
        }
        if let Some((_, handle)) = ticker_guard.take() {
            handle.abort();
        }
        if live {
            *ticker_guard = Some((epoch, self.spawn_ticker(epoch)));
        }
    }

    fn spawn_ticker(&self, epoch: u64) -> JoinHandle<()> {
        let session = Arc::clone(&self.session);
        let ticker = Arc::clone(&self.ticker);
        let status_tx = Arc::clone(&self.status_tx);
        let period = self.config.tick_interval;

        tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + period, period);
            loop {
                interval.tick().await;

                let mut guard = session.lock().await;
                let Some(s) = guard.as_mut() else {
                    break;
                };
                // A pause, resume or completion since spawning makes this ticker stale.
                if s.timer_epoch() != epoch {
                    break;
                }
                match s.tick() {
                    TickOutcome::Running { .. } => {}
                    TickOutcome::Expired => {
                        let mut slot = ticker.lock().await;
                        if matches!(slot.as_ref(), Some((e, _)) if *e == epoch) {
                            *slot = None;
                        }
                        status_tx.send_replace(Some(s.status()));
                        break;
                    }
                    TickOutcome::Inactive => break,
                }
            }
        })
    }

    async fn abort_ticker(&self) {
        if let Some((_, handle)) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    #[cfg(test)]
    async fn ticker_epoch(&self) -> Option<u64> {
        self.ticker.lock().await.as_ref().map(|(epoch, _)| *epoch)
    }
}

/// Clears the in-flight flag when dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use async_trait::async_trait;

    use super::*;
    use crate::session::tests::{choice, exam};
    use crate::session::CompletionReason;
    use crate::traits::GradingRequest;

    /// Test grading backend: counts calls, optionally fails, optionally stalls.
    struct TestClient {
        calls: AtomicU32,
        fail_first: AtomicBool,
        delay: Duration,
    }

    impl TestClient {
        fn new() -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_first: AtomicBool::new(false),
                delay: Duration::ZERO,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl GradingClient for TestClient {
        fn name(&self) -> &str {
            "test"
        }

        async fn submit(&self, request: &GradingRequest) -> anyhow::Result<GradingResult> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if !self.delay.is_zero() {
                time::sleep(self.delay).await;
            }
            if self.fail_first.swap(false, Ordering::Relaxed) {
                anyhow::bail!("connection reset");
            }
            Ok(GradingResult {
                score: 50.0,
                total_questions: 3,
                passing_score: 60.0,
                attempt_id: format!("att-{}", request.answers.len()),
            })
        }
    }

    fn engine() -> SessionEngine {
        SessionEngine::new(EngineConfig::default())
    }

    #[tokio::test]
    async fn operations_without_session_fail() {
        let engine = engine();
        assert_eq!(
            engine.submit_answer(choice(0, 1)).await.unwrap_err(),
            SessionError::NoActiveSession
        );
        assert_eq!(engine.request_help().await.unwrap_err(), SessionError::NoActiveSession);
        assert_eq!(
            engine.expire_by_timeout().await.unwrap_err(),
            SessionError::NoActiveSession
        );
        assert_eq!(engine.finalize().await.unwrap_err(), SessionError::NoActiveSession);
        assert!(engine.snapshot().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_expires_session() {
        let engine = engine();
        let mut status = engine.subscribe();
        engine.start(exam(1), None).await.unwrap();
        assert_eq!(*status.borrow_and_update(), Some(SessionStatus::InProgress));

        time::sleep(Duration::from_millis(30_500)).await;
        let snap = engine.snapshot().await.unwrap();
        assert_eq!(snap.time_remaining_secs, 30);
        assert_eq!(snap.status, SessionStatus::InProgress);

        time::sleep(Duration::from_secs(31)).await;
        let snap = engine.snapshot().await.unwrap();
        assert_eq!(snap.status, SessionStatus::Completed);
        assert_eq!(snap.time_remaining_secs, 0);
        assert_eq!(snap.completion, Some(CompletionReason::TimedOut));
        assert_eq!(*status.borrow_and_update(), Some(SessionStatus::Completed));

        assert_eq!(
            engine.expire_by_timeout().await.unwrap_err(),
            SessionError::AlreadyCompleted
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pause_tears_down_ticks() {
        let engine = engine();
        engine.start(exam(1), None).await.unwrap();

        time::sleep(Duration::from_millis(10_500)).await;
        engine.pause().await.unwrap();
        time::sleep(Duration::from_secs(100)).await;
        assert_eq!(engine.snapshot().await.unwrap().time_remaining_secs, 50);

        engine.resume().await.unwrap();
        time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(engine.snapshot().await.unwrap().time_remaining_secs, 45);
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_pause_and_resume_keep_one_live_ticker() {
        let engine = engine();
        engine.start(exam(1), None).await.unwrap();

        for _ in 0..3 {
            let (paused, resumed) = tokio::join!(engine.pause(), async {
                tokio::task::yield_now().await;
                engine.resume().await
            });
            paused.unwrap();
            resumed.unwrap();

            let epoch = engine.session().await.unwrap().timer_epoch();
            assert_eq!(engine.ticker_epoch().await, Some(epoch));
        }

        // The resumed countdown keeps running and still expires the session.
        time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(engine.snapshot().await.unwrap().time_remaining_secs, 50);
        time::sleep(Duration::from_secs(51)).await;
        let snap = engine.snapshot().await.unwrap();
        assert_eq!(snap.status, SessionStatus::Completed);
        assert_eq!(snap.completion, Some(CompletionReason::TimedOut));
        assert_eq!(engine.ticker_epoch().await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_pause_and_resume_leave_ticker_matching_session() {
        let engine = SessionEngine::new(EngineConfig {
            tick_interval: Duration::from_secs(3600),
            ..EngineConfig::default()
        });
        engine.start(exam(5), None).await.unwrap();

        let tasks: Vec<_> = (0..200)
            .map(|i| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    // Losing the race is a plain state error.
                    if i % 2 == 0 {
                        let _ = engine.pause().await;
                    } else {
                        let _ = engine.resume().await;
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        if engine.snapshot().await.unwrap().status == SessionStatus::Paused {
            engine.resume().await.unwrap();
        }
        let epoch = engine.session().await.unwrap().timer_epoch();
        assert_eq!(engine.ticker_epoch().await, Some(epoch));
    }

    #[tokio::test(start_paused = true)]
    async fn paused_session_has_no_ticker() {
        let engine = engine();
        engine.start(exam(1), None).await.unwrap();
        let started = engine.ticker_epoch().await;
        assert!(started.is_some());

        engine.pause().await.unwrap();
        assert_eq!(engine.ticker_epoch().await, None);

        engine.resume().await.unwrap();
        let resumed = engine.ticker_epoch().await;
        assert!(resumed.is_some());
        assert_ne!(resumed, started);

        // Answers do not restart a running countdown.
        engine.submit_answer(choice(0, 1)).await.unwrap();
        assert_eq!(engine.ticker_epoch().await, resumed);
    }

    #[tokio::test(start_paused = true)]
    async fn answering_everything_stops_the_clock() {
        let engine = engine();
        engine.start(exam(1), Some(2.0)).await.unwrap();
        engine.submit_answer(choice(0, 1)).await.unwrap();
        engine.submit_answer(choice(1, 2)).await.unwrap();
        time::sleep(Duration::from_millis(2_500)).await;
        let outcome = engine
            .submit_answer(RawResponse {
                question_index: 2,
                answer: crate::model::RawAnswer::FreeText {
                    text: "Paris".into(),
                },
                confidence: 5,
                hint_used: false,
                time_spent_secs: 20,
            })
            .await
            .unwrap();
        assert!(outcome.completed);

        let remaining = engine.snapshot().await.unwrap().time_remaining_secs;
        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(engine.snapshot().await.unwrap().time_remaining_secs, remaining);

        let result = engine.finalize().await.unwrap();
        assert_eq!(result.score_percent, 100.0);
        assert!(result.passed);
        assert_eq!(result.reason, CompletionReason::AllAnswered);
    }

    #[tokio::test]
    async fn second_start_while_active_is_rejected() {
        let engine = engine();
        engine.start(exam(5), None).await.unwrap();
        assert_eq!(
            engine.start(exam(5), None).await.unwrap_err(),
            SessionError::SessionActive
        );

        engine.expire_by_timeout().await.unwrap();
        assert!(engine.start(exam(5), None).await.is_ok());
    }

    #[tokio::test]
    async fn empty_submission_never_reaches_the_client() {
        let engine = engine();
        let client = TestClient::new();
        engine.start(exam(5), None).await.unwrap();

        let err = engine.submit_results(&client).await.unwrap_err();
        assert!(matches!(err, SubmitError::Session(SessionError::NothingAnswered)));
        assert_eq!(client.calls(), 0);
        assert_eq!(
            engine.snapshot().await.unwrap().status,
            SessionStatus::InProgress
        );

        engine.expire_by_timeout().await.unwrap();
        let err = engine.submit_results(&client).await.unwrap_err();
        assert!(matches!(err, SubmitError::Session(SessionError::NothingAnswered)));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn failed_submission_keeps_session_and_can_retry() {
        let engine = engine();
        let client = TestClient::new();
        client.fail_first.store(true, Ordering::Relaxed);

        engine.start(exam(5), None).await.unwrap();
        engine.submit_answer(choice(0, 1)).await.unwrap();

        let err = engine.submit_results(&client).await.unwrap_err();
        assert!(err.is_retryable());
        let snap = engine.snapshot().await.unwrap();
        assert_eq!(snap.status, SessionStatus::Completed);
        assert_eq!(snap.completion, Some(CompletionReason::Submitted));
        assert_eq!(engine.discard().await.unwrap_err(), SessionError::NotAcknowledged);

        let result = engine.submit_results(&client).await.unwrap();
        assert_eq!(result.attempt_id, "att-1");
        assert_eq!(client.calls(), 2);

        // Acknowledged: no further network calls.
        engine.submit_results(&client).await.unwrap();
        assert_eq!(client.calls(), 2);

        let session = engine.discard().await.unwrap();
        assert_eq!(session.grading().unwrap().attempt_id, "att-1");
        assert_eq!(engine.snapshot().await.unwrap_err(), SessionError::NoActiveSession);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_submission_is_rejected() {
        let engine = engine();
        let client = TestClient {
            delay: Duration::from_secs(5),
            ..TestClient::new()
        };
        engine.start(exam(5), None).await.unwrap();
        engine.submit_answer(choice(0, 1)).await.unwrap();

        let (first, second) = tokio::join!(engine.submit_results(&client), async {
            tokio::task::yield_now().await;
            engine.submit_results(&client).await
        });

        assert!(first.is_ok());
        assert!(matches!(second, Err(SubmitError::InFlight)));
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn help_is_serialized_with_answers() {
        let engine = engine();
        engine.start(exam(5), None).await.unwrap();
        engine.request_help().await.unwrap();
        engine.request_help().await.unwrap();
        let snap = engine.snapshot().await.unwrap();
        assert!(snap.settings.requires_additional_support);
        assert_eq!(snap.settings.accommodations.len(), 2);
        assert_eq!(snap.current_index, 0);
    }
}
