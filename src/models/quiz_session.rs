// src/models/quiz_session.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Server-side record of one attempt session.
/// The deadline is fixed here when the participant opens the quiz.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSession {
    pub id: String,
    pub quiz_id: i64,
    pub user_id: i64,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

impl QuizSession {
    /// Milliseconds left before the deadline as seen by the server, plus `grace_ms`.
    /// Never negative and never more than the session length.
    pub fn remaining_bound_ms(&self, now: DateTime<Utc>, grace_ms: i64) -> i64 {
        let length_ms = (self.deadline - self.started_at).num_milliseconds();
        ((self.deadline - now).num_milliseconds() + grace_ms).clamp(0, length_ms.max(0))
    }
}

/// Response to opening a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionTicket {
    pub session_id: String,
    pub quiz_id: i64,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub duration_secs: i64,
}

impl From<QuizSession> for SessionTicket {
    fn from(session: QuizSession) -> Self {
        Self {
            duration_secs: (session.deadline - session.started_at).num_seconds(),
            session_id: session.id,
            quiz_id: session.quiz_id,
            started_at: session.started_at,
            deadline: session.deadline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(now: DateTime<Utc>, secs: i64) -> QuizSession {
        QuizSession {
            id: "s".to_string(),
            quiz_id: 1,
            user_id: 1,
            started_at: now,
            deadline: now + Duration::seconds(secs),
        }
    }

    #[test]
    fn bound_includes_grace_after_the_start() {
        let now = Utc::now();
        let s = session(now, 10);
        assert_eq!(s.remaining_bound_ms(now + Duration::seconds(5), 2_000), 7_000);
        assert_eq!(s.remaining_bound_ms(now + Duration::seconds(11), 2_000), 1_000);
    }

    #[test]
    fn bound_never_exceeds_session_length() {
        let now = Utc::now();
        assert_eq!(session(now, 10).remaining_bound_ms(now, 2_000), 10_000);
        assert_eq!(
            session(now, 10).remaining_bound_ms(now + Duration::milliseconds(500), 2_000),
            10_000
        );
    }

    #[test]
    fn bound_is_zero_long_after_deadline() {
        let now = Utc::now();
        let s = session(now, 10);
        assert_eq!(s.remaining_bound_ms(now + Duration::seconds(60), 2_000), 0);
    }
}
