//! Session-wide countdown.
//!
//! [`Countdown`] is the deterministic state behind the exam timer. It knows
//! nothing about tasks or clocks: something calls [`Countdown::tick`] once per
//! second (the engine's ticker task, or a test loop) and the countdown reports
//! expiry exactly once.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Expired,
    Cancelled,
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still counting down.
    Running { remaining_secs: u64 },
    /// Reached zero on this tick. Reported once.
    Expired,
    /// The countdown is not running; nothing happened.
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    status: TimerStatus,
    total_secs: u64,
    remaining_secs: u64,
}

impl Countdown {
    pub fn from_minutes(minutes: u32) -> Self {
        Self::from_secs(u64::from(minutes) * 60)
    }

    pub fn from_secs(total_secs: u64) -> Self {
        Self {
            status: TimerStatus::Idle,
            total_secs,
            remaining_secs: total_secs,
        }
    }

    /// Begin counting. Only an idle countdown can start.
    pub fn start(&mut self) -> bool {
        if self.status != TimerStatus::Idle {
            return false;
        }
        self.status = TimerStatus::Running;
        true
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.status != TimerStatus::Running {
            return TickOutcome::Inactive;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.status = TimerStatus::Expired;
            return TickOutcome::Expired;
        }
        TickOutcome::Running {
            remaining_secs: self.remaining_secs,
        }
    }

    pub fn pause(&mut self) -> bool {
        if self.status != TimerStatus::Running {
            return false;
        }
        self.status = TimerStatus::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.status != TimerStatus::Paused {
            return false;
        }
        self.status = TimerStatus::Running;
        true
    }

    /// Stop for good. An expired countdown stays expired.
    pub fn cancel(&mut self) {
        if self.status != TimerStatus::Expired {
            self.status = TimerStatus::Cancelled;
        }
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.total_secs - self.remaining_secs
    }

    pub fn is_expired(&self) -> bool {
        self.status == TimerStatus::Expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_and_expires_once() {
        let mut c = Countdown::from_secs(3);
        assert_eq!(c.tick(), TickOutcome::Inactive);
        assert!(c.start());
        assert_eq!(c.tick(), TickOutcome::Running { remaining_secs: 2 });
        assert_eq!(c.tick(), TickOutcome::Running { remaining_secs: 1 });
        assert_eq!(c.tick(), TickOutcome::Expired);
        assert_eq!(c.tick(), TickOutcome::Inactive);
        assert_eq!(c.remaining_secs(), 0);
        assert!(c.is_expired());
    }

    #[test]
    fn forty_five_minutes_is_2700_ticks() {
        let mut c = Countdown::from_minutes(45);
        c.start();
        let expiries = (0..2701)
            .map(|_| c.tick())
            .filter(|o| *o == TickOutcome::Expired)
            .count();
        assert_eq!(expiries, 1);
        assert_eq!(c.elapsed_secs(), 2700);
    }

    #[test]
    fn paused_countdown_does_not_move() {
        let mut c = Countdown::from_secs(10);
        c.start();
        c.tick();
        assert!(c.pause());
        assert_eq!(c.tick(), TickOutcome::Inactive);
        assert_eq!(c.remaining_secs(), 9);
        assert!(c.resume());
        assert_eq!(c.tick(), TickOutcome::Running { remaining_secs: 8 });
    }

    #[test]
    fn cancel_is_final_but_keeps_expiry() {
        let mut c = Countdown::from_secs(5);
        c.start();
        c.cancel();
        assert_eq!(c.tick(), TickOutcome::Inactive);
        assert!(!c.start());
        assert!(!c.resume());

        let mut c = Countdown::from_secs(1);
        c.start();
        assert_eq!(c.tick(), TickOutcome::Expired);
        c.cancel();
        assert_eq!(c.status(), TimerStatus::Expired);
    }

    #[test]
    fn zero_length_expires_on_first_tick() {
        let mut c = Countdown::from_secs(0);
        c.start();
        assert_eq!(c.tick(), TickOutcome::Expired);
    }
}
