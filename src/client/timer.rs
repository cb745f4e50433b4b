use chrono::{DateTime, Utc};

/// Source of wall-clock time for the countdown.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Lifecycle of the countdown. Both submitted states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    ManuallySubmitted,
    Expired,
}

impl TimerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TimerState::ManuallySubmitted | TimerState::Expired)
    }
}

/// What one observation of the countdown produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Not started yet.
    Idle,
    Running { remaining_ms: i64 },
    /// Emitted exactly once, on the transition into `Expired`.
    Expired { remaining_ms: i64 },
    /// A terminal state was already reached; nothing more happens.
    Stopped,
}

/// Countdown against an absolute deadline.
///
/// Remaining time is always recomputed as `deadline - now`, never decremented,
/// so a late or skipped tick cannot drift the clock.
#[derive(Debug, Clone)]
pub struct Countdown {
    deadline: DateTime<Utc>,
    state: TimerState,
}

impl Countdown {
    pub fn new(deadline: DateTime<Utc>) -> Self {
        Self {
            deadline,
            state: TimerState::Idle,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Signed milliseconds until the deadline.
    pub fn remaining_ms(&self, now: DateTime<Utc>) -> i64 {
        (self.deadline - now).num_milliseconds()
    }

    /// Begins counting once the quiz is loaded. A deadline that already passed
    /// goes straight to `Expired` without ever running.
    pub fn start(&mut self, now: DateTime<Utc>) -> Tick {
        if self.state != TimerState::Idle {
            return self.tick(now);
        }

        let remaining_ms = self.remaining_ms(now);
        if remaining_ms <= 0 {
            self.state = TimerState::Expired;
            Tick::Expired { remaining_ms: 0 }
        } else {
            self.state = TimerState::Running;
            Tick::Running { remaining_ms }
        }
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        match self.state {
            TimerState::Idle => Tick::Idle,
            TimerState::Running => {
                let remaining_ms = self.remaining_ms(now);
                if remaining_ms <= 0 {
                    self.state = TimerState::Expired;
                    Tick::Expired { remaining_ms: 0 }
                } else {
                    Tick::Running { remaining_ms }
                }
            }
            TimerState::ManuallySubmitted | TimerState::Expired => Tick::Stopped,
        }
    }

    /// Stops a running countdown for a manual submit and returns the remaining
    /// time to send, clamped at 0. `None` if the countdown is not running.
    pub fn submit_manually(&mut self, now: DateTime<Utc>) -> Option<i64> {
        if self.state != TimerState::Running {
            return None;
        }
        self.state = TimerState::ManuallySubmitted;
        Some(self.remaining_ms(now).max(0))
    }
}

/// Renders remaining time as `HH:MM:SS`, rounding down to the second.
pub fn format_remaining(remaining_ms: i64) -> String {
    let total_seconds = remaining_ms.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(base: DateTime<Utc>, ms: i64) -> DateTime<Utc> {
        base + Duration::milliseconds(ms)
    }

    #[test]
    fn runs_then_expires_once() {
        let t0 = Utc::now();
        let mut countdown = Countdown::new(at(t0, 2_500));

        assert_eq!(countdown.start(t0), Tick::Running { remaining_ms: 2_500 });
        assert_eq!(countdown.tick(at(t0, 1_000)), Tick::Running { remaining_ms: 1_500 });
        assert_eq!(countdown.tick(at(t0, 3_000)), Tick::Expired { remaining_ms: 0 });
        assert_eq!(countdown.state(), TimerState::Expired);

        // Later ticks that still observe remaining <= 0 do not fire again.
        assert_eq!(countdown.tick(at(t0, 4_000)), Tick::Stopped);
        assert_eq!(countdown.tick(at(t0, 5_000)), Tick::Stopped);
    }

    #[test]
    fn past_deadline_expires_without_running() {
        let t0 = Utc::now();
        let mut countdown = Countdown::new(at(t0, -60_000));

        assert_eq!(countdown.start(t0), Tick::Expired { remaining_ms: 0 });
        assert_eq!(countdown.state(), TimerState::Expired);
        assert_eq!(countdown.submit_manually(t0), None);
    }

    #[test]
    fn manual_submit_is_absorbing() {
        let t0 = Utc::now();
        let mut countdown = Countdown::new(at(t0, 10_000));
        countdown.start(t0);

        assert_eq!(countdown.submit_manually(at(t0, 4_250)), Some(5_750));
        assert_eq!(countdown.state(), TimerState::ManuallySubmitted);
        assert_eq!(countdown.submit_manually(at(t0, 4_500)), None);
        assert_eq!(countdown.tick(at(t0, 20_000)), Tick::Stopped);
    }

    #[test]
    fn idle_countdown_does_not_tick() {
        let t0 = Utc::now();
        let mut countdown = Countdown::new(at(t0, 1_000));
        assert_eq!(countdown.tick(t0), Tick::Idle);
        assert_eq!(countdown.submit_manually(t0), None);
    }

    #[test]
    fn expires_exactly_at_deadline() {
        let t0 = Utc::now();
        let mut countdown = Countdown::new(at(t0, 1_000));
        countdown.start(t0);
        assert_eq!(countdown.tick(at(t0, 1_000)), Tick::Expired { remaining_ms: 0 });
    }

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(format_remaining(0), "00:00:00");
        assert_eq!(format_remaining(-5_000), "00:00:00");
        assert_eq!(format_remaining(59_999), "00:00:59");
        assert_eq!(format_remaining(3_723_000), "01:02:03");
    }
}
