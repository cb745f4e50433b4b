use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::client::{
    api::{QuizApi, SubmissionPayload},
    error::ClientError,
};

/// Why a submission was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Manual,
    Expiry,
    Retry,
}

/// What the participant is shown after grading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSummary {
    pub attempt_id: i64,
    pub score: i64,
    pub correct_count: i64,
    /// The server had already graded this session.
    pub duplicate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted(ResultSummary),
    /// Nothing was answered; the participant is sent away instead.
    Redirect,
    /// Another trigger is already waiting on the server.
    AlreadyDispatched,
    AlreadyCompleted(ResultSummary),
}

#[derive(Debug, Clone)]
enum Phase {
    Open,
    InFlight,
    Completed(ResultSummary),
    Redirected,
}

#[derive(Debug)]
struct Inner {
    phase: Phase,
    answers: BTreeMap<i64, String>,
    /// Remaining time captured by the first dispatch; reused on retry.
    captured_ms: Option<i64>,
}

/// Single guarded entry point for submitting one attempt session.
///
/// The phase is checked and flipped to `InFlight` under the lock before any
/// request goes out, so the manual submit and the expiry can race without
/// producing two requests.
pub struct SubmissionCoordinator<A> {
    api: Arc<A>,
    quiz_id: i64,
    session_id: String,
    inner: Mutex<Inner>,
}

impl<A: QuizApi> SubmissionCoordinator<A> {
    pub fn new(api: Arc<A>, quiz_id: i64, session_id: impl Into<String>) -> Self {
        Self {
            api,
            quiz_id,
            session_id: session_id.into(),
            inner: Mutex::new(Inner {
                phase: Phase::Open,
                answers: BTreeMap::new(),
                captured_ms: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the selected option for a question. Ignored once dispatched.
    pub fn record_answer(&self, question_id: i64, option: impl Into<String>) -> bool {
        let mut inner = self.lock();
        if !matches!(inner.phase, Phase::Open) || inner.captured_ms.is_some() {
            return false;
        }
        inner.answers.insert(question_id, option.into());
        true
    }

    pub fn result(&self) -> Option<ResultSummary> {
        match &self.lock().phase {
            Phase::Completed(summary) => Some(summary.clone()),
            _ => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.lock().phase, Phase::InFlight)
    }

    /// Dispatches the submission unless one is already out or done.
    ///
    /// On failure the coordinator reopens and keeps the captured time, so a
    /// later call resubmits the same answers with the same time.
    pub async fn submit(
        &self,
        trigger: Trigger,
        remaining_ms: i64,
    ) -> Result<SubmitOutcome, ClientError> {
        let payload = {
            let mut inner = self.lock();
            match &inner.phase {
                Phase::InFlight => return Ok(SubmitOutcome::AlreadyDispatched),
                Phase::Completed(summary) => {
                    return Ok(SubmitOutcome::AlreadyCompleted(summary.clone()));
                }
                Phase::Redirected => return Ok(SubmitOutcome::Redirect),
                Phase::Open => {}
            }

            if inner.answers.is_empty() {
                tracing::info!("No answers recorded for quiz {}; redirecting", self.quiz_id);
                inner.phase = Phase::Redirected;
                return Ok(SubmitOutcome::Redirect);
            }

            let time_remaining = *inner.captured_ms.get_or_insert(remaining_ms.max(0));
            inner.phase = Phase::InFlight;

            SubmissionPayload {
                answers: inner.answers.clone(),
                time_remaining,
                session_id: self.session_id.clone(),
            }
        };

        tracing::info!(
            "Submitting quiz {} ({:?}, {} answers, {}ms left)",
            self.quiz_id,
            trigger,
            payload.answers.len(),
            payload.time_remaining
        );

        match self.api.submit(self.quiz_id, &payload).await {
            Ok(response) => {
                let summary = ResultSummary {
                    attempt_id: response.quiz_attempt.id,
                    score: response.quiz_attempt.score,
                    correct_count: response.correct_count,
                    duplicate: response.duplicate,
                };
                self.lock().phase = Phase::Completed(summary.clone());
                Ok(SubmitOutcome::Submitted(summary))
            }
            Err(e) => {
                tracing::warn!("Submission for quiz {} failed: {}", self.quiz_id, e);
                self.lock().phase = Phase::Open;
                Err(e)
            }
        }
    }

    /// Resubmits after a failure with the originally captured time.
    pub async fn retry(&self) -> Result<SubmitOutcome, ClientError> {
        let captured = self.lock().captured_ms.unwrap_or(0);
        self.submit(Trigger::Retry, captured).await
    }
}
