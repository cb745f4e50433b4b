use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::time::MissedTickBehavior;

use crate::{
    client::{
        api::QuizApi,
        coordinator::{ResultSummary, SubmissionCoordinator, SubmitOutcome, Trigger},
        error::ClientError,
        store::{LocalStore, SessionRecord},
        timer::{Clock, Countdown, Tick, TimerState, format_remaining},
    },
    models::quiz::QuizDetail,
};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// How a play-through ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayEnd {
    Submitted(ResultSummary),
    /// Time ran out (or the participant submitted) with nothing answered.
    Redirected,
    Stopped,
}

/// One participant's attempt at one quiz.
pub struct PlaySession<A> {
    store: LocalStore,
    clock: Arc<dyn Clock>,
    quiz: QuizDetail,
    record: SessionRecord,
    countdown: Mutex<Countdown>,
    coordinator: SubmissionCoordinator<A>,
    display: watch::Sender<String>,
    ended: Mutex<Option<PlayEnd>>,
    stop: Notify,
}

impl<A: QuizApi> PlaySession<A> {
    /// Opens the quiz for play.
    ///
    /// A session saved for this quiz is resumed with its original deadline;
    /// otherwise a new one is requested from the server and saved before the
    /// quiz is fetched. The countdown starts once the quiz has loaded.
    pub async fn open(
        api: Arc<A>,
        store: LocalStore,
        clock: Arc<dyn Clock>,
        quiz_id: i64,
    ) -> Result<Self, ClientError> {
        let record = match store.load_session()? {
            Some(record) if record.quiz_id == quiz_id => {
                tracing::info!("Resuming session for quiz {} (deadline {})", quiz_id, record.deadline);
                record
            }
            _ => {
                let ticket = api.start_session(quiz_id).await?;
                let record = SessionRecord {
                    quiz_id,
                    session_id: ticket.session_id,
                    deadline: ticket.deadline,
                };
                store.save_session(&record)?;
                record
            }
        };

        let quiz = api.fetch_quiz(quiz_id).await?;

        let mut countdown = Countdown::new(record.deadline);
        let remaining_ms = match countdown.start(clock.now()) {
            Tick::Running { remaining_ms } => remaining_ms,
            _ => 0,
        };
        let (display, _) = watch::channel(format_remaining(remaining_ms));

        let coordinator = SubmissionCoordinator::new(api, quiz_id, record.session_id.clone());

        Ok(Self {
            store,
            clock,
            quiz,
            record,
            countdown: Mutex::new(countdown),
            coordinator,
            display,
            ended: Mutex::new(None),
            stop: Notify::new(),
        })
    }

    fn countdown(&self) -> MutexGuard<'_, Countdown> {
        self.countdown.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn quiz(&self) -> &QuizDetail {
        &self.quiz
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn state(&self) -> TimerState {
        self.countdown().state()
    }

    pub fn remaining_ms(&self) -> i64 {
        self.countdown().remaining_ms(self.clock.now()).max(0)
    }

    /// Receives the rendered `HH:MM:SS` on every tick.
    pub fn display(&self) -> watch::Receiver<String> {
        self.display.subscribe()
    }

    pub fn outcome(&self) -> Option<PlayEnd> {
        self.ended.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Selects an option for a question. Refused once time is up or the
    /// attempt was submitted.
    pub fn select(&self, question_id: i64, option: impl Into<String>) -> bool {
        if self.state().is_terminal() {
            return false;
        }
        self.coordinator.record_answer(question_id, option)
    }

    /// Submits on the participant's request.
    ///
    /// If the countdown is no longer running this resends whatever was
    /// already captured instead. A failure releases `run` with
    /// `PlayEnd::Stopped`; the attempt can still be sent with `retry`.
    pub async fn submit_now(&self) -> Result<SubmitOutcome, ClientError> {
        let now = self.clock.now();
        let manual = self.countdown().submit_manually(now);
        let result = match manual {
            Some(remaining_ms) => self.dispatch(Trigger::Manual, remaining_ms).await,
            None => return self.retry().await,
        };
        if result.is_err() {
            self.stop.notify_one();
        }
        result
    }

    /// Resends a submission that failed, with the same answers and time.
    pub async fn retry(&self) -> Result<SubmitOutcome, ClientError> {
        match self.coordinator.retry().await {
            Ok(outcome) => {
                self.settle(&outcome);
                Ok(outcome)
            }
            Err(e) => {
                self.stop.notify_one();
                Err(e)
            }
        }
    }

    /// Drives the countdown until the attempt ends.
    ///
    /// Expiry dispatches the submission with zero time remaining. An error
    /// from that dispatch is returned; the session stays open for `retry`.
    /// Returns `PlayEnd::Stopped` if a manual submit fails while waiting.
    pub async fn run(&self) -> Result<PlayEnd, ClientError> {
        if let Some(end) = self.outcome() {
            return Ok(end);
        }
        if self.state() == TimerState::Expired {
            return self.expire().await;
        }

        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.stop.notified() => return Ok(self.outcome().unwrap_or(PlayEnd::Stopped)),
                _ = interval.tick() => {}
            }

            let tick = self.countdown().tick(self.clock.now());
            match tick {
                Tick::Running { remaining_ms } => {
                    self.display.send_replace(format_remaining(remaining_ms));
                }
                Tick::Expired { .. } => return self.expire().await,
                // A manual submit stopped the clock; wait for it to land.
                Tick::Stopped => {
                    self.stop.notified().await;
                    return Ok(self.outcome().unwrap_or(PlayEnd::Stopped));
                }
                Tick::Idle => {}
            }
        }
    }

    /// Ends the loop without submitting.
    pub fn stop(&self) {
        self.stop.notify_one();
    }

    async fn expire(&self) -> Result<PlayEnd, ClientError> {
        self.display.send_replace(format_remaining(0));
        tracing::info!("Time is up for quiz {}", self.record.quiz_id);

        match self.dispatch(Trigger::Expiry, 0).await? {
            SubmitOutcome::AlreadyDispatched => {
                self.stop.notified().await;
                Ok(self.outcome().unwrap_or(PlayEnd::Stopped))
            }
            _ => Ok(self.outcome().unwrap_or(PlayEnd::Stopped)),
        }
    }

    async fn dispatch(&self, trigger: Trigger, remaining_ms: i64) -> Result<SubmitOutcome, ClientError> {
        let outcome = self.coordinator.submit(trigger, remaining_ms).await?;
        self.settle(&outcome);
        Ok(outcome)
    }

    // Terminal outcomes end the session locally and release `run`.
    fn settle(&self, outcome: &SubmitOutcome) {
        let end = match outcome {
            SubmitOutcome::Submitted(summary) | SubmitOutcome::AlreadyCompleted(summary) => {
                PlayEnd::Submitted(summary.clone())
            }
            SubmitOutcome::Redirect => PlayEnd::Redirected,
            SubmitOutcome::AlreadyDispatched => return,
        };

        if let Err(e) = self.store.clear_session() {
            tracing::warn!("Failed to clear saved session: {}", e);
        }
        *self.ended.lock().unwrap_or_else(PoisonError::into_inner) = Some(end);
        self.stop.notify_one();
    }
}
