//! Participant side of an attempt session.
//!
//! `PlaySession` drives a `Countdown` against the deadline the server issued,
//! and routes both the manual submit and the expiry through one
//! `SubmissionCoordinator`, so a play-through produces at most one submission.

pub mod api;
pub mod coordinator;
pub mod error;
pub mod play;
pub mod store;
pub mod timer;

pub use api::{HttpQuizApi, QuizApi, SubmissionPayload};
pub use coordinator::{ResultSummary, SubmissionCoordinator, SubmitOutcome, Trigger};
pub use error::ClientError;
pub use play::{PlayEnd, PlaySession};
pub use store::{LocalStore, SessionRecord};
pub use timer::{Clock, Countdown, SystemClock, Tick, TimerState, format_remaining};
