//! Reminder scheduler.
//!
//! Keeps at most one reminder alarm armed: the one for the next threshold
//! strictly below the current remaining time. Every re-arm cancels the
//! previous alarm first, and every firing re-arms for the following
//! threshold.
//!
//! ```text
//! remaining: 90000s          86400s                7200s
//!   │ ── arm(3600s) ──────────► fire(86400) ── arm(79200s) ──► fire(7200) ...
//! ```

use std::time::Duration;

use crate::error::ConfigError;
use crate::events::PaygEvent;
use crate::timer::ScopedTimer;
use crate::tracker::ExpiryTracker;

/// Longest delay a reminder alarm may be armed for.
pub const MAX_TIMER_INTERVAL_SECS: u64 = u32::MAX as u64;

/// Seconds before expiry at which to remind, strictly descending.
pub const DEFAULT_THRESHOLDS_SECS: [u32; 7] = [
    60 * 60 * 48, // 2 days
    60 * 60 * 24, // 1 day
    60 * 60 * 2,  // 2 hours
    60 * 60,      // 1 hour
    60 * 30,      // 30 minutes
    60 * 2,       // 2 minutes
    30,           // 30 seconds
];

/// The alarm currently armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingReminder {
    pub threshold_secs: u32,
    pub delay: Duration,
}

#[derive(Debug)]
pub struct ReminderScheduler {
    thresholds: Vec<u32>,
    timer: ScopedTimer<u32>,
}

impl ReminderScheduler {
    /// # Errors
    ///
    /// Returns an error if the thresholds are not strictly descending or
    /// contain a zero.
    pub fn new(thresholds: Vec<u32>) -> Result<Self, ConfigError> {
        validate_thresholds(&thresholds)?;
        Ok(Self {
            thresholds,
            timer: ScopedTimer::new(),
        })
    }

    pub fn thresholds(&self) -> &[u32] {
        &self.thresholds
    }

    pub fn pending(&self) -> Option<PendingReminder> {
        Some(PendingReminder {
            threshold_secs: *self.timer.payload()?,
            delay: self.timer.delay()?,
        })
    }

    pub fn cancel(&mut self) {
        if self.timer.cancel().is_some() {
            tracing::debug!("reminder cancelled");
        }
    }

    /// Cancel the pending alarm and arm the next one, if any applies.
    pub fn rearm(&mut self, tracker: &ExpiryTracker) -> Option<PendingReminder> {
        self.timer.cancel();

        let secs_left = tracker.time_remaining_secs();
        // Expired is handled by the lock path; too far out is re-armed later.
        if secs_left == 0 || secs_left >= MAX_TIMER_INTERVAL_SECS {
            return None;
        }

        let target = select_target(&self.thresholds, secs_left)?;
        let delay = Duration::from_secs(secs_left - u64::from(target));
        self.timer.arm(delay, target);
        tracing::debug!(
            threshold_secs = target,
            delay_secs = delay.as_secs(),
            "reminder armed"
        );

        self.pending()
    }

    /// Wait until the armed alarm fires. Pends forever while none is armed.
    pub async fn next_due(&mut self) -> u32 {
        self.timer.fired().await
    }

    /// Publish the reminder for `threshold_secs` and arm the following one.
    pub fn fire(&mut self, threshold_secs: u32, tracker: &ExpiryTracker) -> Option<PendingReminder> {
        tracing::info!(threshold_secs, "PAYG reminder due");
        tracker.publish(PaygEvent::ReminderDue {
            threshold_secs,
            at: tracker.now(),
        });
        self.rearm(tracker)
    }

    /// Remaining seconds to announce right away when a session starts inside
    /// the reminder window.
    pub fn startup_reminder(&self, tracker: &ExpiryTracker) -> Option<u64> {
        let first = u64::from(*self.thresholds.first()?);
        let secs_left = tracker.time_remaining_secs();
        (secs_left > 0 && secs_left <= first).then_some(secs_left)
    }
}

impl Default for ReminderScheduler {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_THRESHOLDS_SECS.to_vec(),
            timer: ScopedTimer::new(),
        }
    }
}

/// First threshold strictly below `secs_left`.
pub fn select_target(thresholds: &[u32], secs_left: u64) -> Option<u32> {
    thresholds
        .iter()
        .copied()
        .find(|&threshold| u64::from(threshold) < secs_left)
}

/// # Errors
///
/// Returns an error if `thresholds` is not strictly descending or contains 0.
pub fn validate_thresholds(thresholds: &[u32]) -> Result<(), ConfigError> {
    if thresholds.contains(&0) {
        return Err(ConfigError::InvalidValue {
            key: "reminders.thresholds_secs".into(),
            message: "thresholds must be greater than zero".into(),
        });
    }
    if thresholds.windows(2).any(|pair| pair[0] <= pair[1]) {
        return Err(ConfigError::InvalidValue {
            key: "reminders.thresholds_secs".into(),
            message: "thresholds must be strictly descending".into(),
        });
    }
    Ok(())
}
