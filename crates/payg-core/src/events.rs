use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every observable change in the PAYG core produces an Event.
/// Collaborators (lock screen, notification presenter, CLI) subscribe to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PaygEvent {
    /// First connection attempt finished, successfully or not.
    Initialized {
        enabled: bool,
        at: DateTime<Utc>,
    },
    EnabledChanged {
        enabled: bool,
        at: DateTime<Utc>,
    },
    ExpiryTimeChanged {
        expiry_time: u64,
        at: DateTime<Utc>,
    },
    RateLimitEndTimeChanged {
        rate_limit_end_time: u64,
        at: DateTime<Utc>,
    },
    /// Forwarded from the daemon's `Expired` signal.
    CodeExpired {
        at: DateTime<Utc>,
    },
    /// A reminder threshold was crossed. Carries the threshold, not the
    /// exact remaining time, so it reads as a round number.
    ReminderDue {
        threshold_secs: u32,
        at: DateTime<Utc>,
    },
    /// Session started inside the reminder window.
    StartupReminder {
        seconds_left: u64,
        at: DateTime<Utc>,
    },
    /// The wall clock jumped and reminders were rescheduled.
    ClockChanged {
        jump_secs: i64,
        at: DateTime<Utc>,
    },
}

impl PaygEvent {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            PaygEvent::Initialized { at, .. }
            | PaygEvent::EnabledChanged { at, .. }
            | PaygEvent::ExpiryTimeChanged { at, .. }
            | PaygEvent::RateLimitEndTimeChanged { at, .. }
            | PaygEvent::CodeExpired { at }
            | PaygEvent::ReminderDue { at, .. }
            | PaygEvent::StartupReminder { at, .. }
            | PaygEvent::ClockChanged { at, .. } => *at,
        }
    }
}
