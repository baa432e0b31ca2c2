//! Shared countdown that hides item content until it elapses.
//!
//! Remaining time is always derived from the persisted start time and
//! duration, so clients that reconnect or drift converge on the same
//! boundary. The local one-second tick only refreshes the display.

use chrono::{DateTime, Duration, Utc};
use shared::domain::TimerSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Counting { remaining_secs: i64 },
    Revealed,
}

impl TimerPhase {
    pub fn is_revealed(self) -> bool {
        matches!(self, TimerPhase::Revealed)
    }
}

pub fn deadline(settings: &TimerSettings) -> DateTime<Utc> {
    settings.start_time + Duration::minutes(i64::from(settings.duration))
}

/// Stateless evaluation against `now`.
pub fn evaluate(settings: &TimerSettings, now: DateTime<Utc>) -> TimerPhase {
    if !settings.enabled || settings.duration == 0 || settings.visible {
        return TimerPhase::Revealed;
    }

    let remaining_ms = (deadline(settings) - now).num_milliseconds();
    if remaining_ms <= 0 {
        TimerPhase::Revealed
    } else {
        TimerPhase::Counting {
            remaining_secs: (remaining_ms + 999) / 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateStep {
    pub phase: TimerPhase,
    /// The caller should persist `visible = true`. Set at most once per gate.
    pub persist_reveal: bool,
}

/// Per-client view of the timer. `Revealed` is terminal: a later delivery
/// still carrying `visible = false` cannot send the gate back to counting.
#[derive(Debug, Clone, Default)]
pub struct TimerGate {
    revealed: bool,
}

impl TimerGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn observe(&mut self, settings: &TimerSettings, now: DateTime<Utc>) -> GateStep {
        if self.revealed {
            return GateStep {
                phase: TimerPhase::Revealed,
                persist_reveal: false,
            };
        }

        let phase = evaluate(settings, now);
        self.revealed = phase.is_revealed();
        // Racing clients all write the same `true`.
        let persist_reveal = self.revealed && settings.enabled && !settings.visible;
        GateStep {
            phase,
            persist_reveal,
        }
    }
}

/// `M:SS`, minutes unbounded.
pub fn format_countdown(remaining_secs: i64) -> String {
    let secs = remaining_secs.max(0);
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
#[path = "tests/timer_tests.rs"]
mod tests;
