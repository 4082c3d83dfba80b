//! Expiry tracker.
//!
//! Single source of truth for the locally observed subscription state. All
//! setters are change-detecting: writing the value already cached is a
//! no-op and publishes nothing, so observers only ever see real changes.
//!
//! Remaining time is derived on demand from the wall clock and never cached.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::clock::WallClock;
use crate::events::PaygEvent;
use crate::state::{AppliedChanges, PropertyChanges, SubscriptionState};

/// Buffered events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 64;

/// Returned by [`ExpiryTracker::time_remaining_secs`] when PAYG is disabled.
pub const TIME_REMAINING_UNLIMITED: u64 = u64::MAX;

pub struct ExpiryTracker {
    state: SubscriptionState,
    initialized: bool,
    clock: Arc<dyn WallClock>,
    events: broadcast::Sender<PaygEvent>,
}

impl ExpiryTracker {
    pub fn new(clock: Arc<dyn WallClock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: SubscriptionState::default(),
            initialized: false,
            clock,
            events,
        }
    }

    /// Subscribe to state-change events. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<PaygEvent> {
        self.events.subscribe()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }

    pub fn enabled(&self) -> bool {
        self.state.enabled
    }

    pub fn expiry_time(&self) -> u64 {
        self.state.expiry_time
    }

    pub fn rate_limit_end_time(&self) -> u64 {
        self.state.rate_limit_end_time
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn clock(&self) -> Arc<dyn WallClock> {
        Arc::clone(&self.clock)
    }

    /// Seconds until expiry, clamped at zero.
    ///
    /// [`TIME_REMAINING_UNLIMITED`] while PAYG is disabled.
    pub fn time_remaining_secs(&self) -> u64 {
        if !self.state.enabled {
            return TIME_REMAINING_UNLIMITED;
        }
        self.state
            .expiry_time
            .saturating_sub(self.clock.now_unix_secs())
    }

    pub fn is_locked(&self) -> bool {
        self.state.enabled && self.time_remaining_secs() == 0
    }

    /// Seconds until the rate limit ends. Zero or negative when none is active.
    pub fn rate_limit_secs_left(&self) -> i64 {
        let end = i64::try_from(self.state.rate_limit_end_time).unwrap_or(i64::MAX);
        end.saturating_sub(self.clock.now().timestamp())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Seed the cache from the daemon after connecting.
    ///
    /// Publishes nothing: startup values are not changes, and announcing
    /// them would make the lock screen think the session mode flipped.
    pub fn load_initial(&mut self, state: SubscriptionState) {
        self.state = state;
    }

    /// Mark the first connection attempt as finished and announce it once.
    pub fn mark_initialized(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        self.publish(PaygEvent::Initialized {
            enabled: self.state.enabled,
            at: self.clock.now(),
        });
    }

    pub fn set_enabled(&mut self, value: bool) -> bool {
        if self.state.enabled == value {
            return false;
        }
        self.state.enabled = value;
        self.publish(PaygEvent::EnabledChanged {
            enabled: value,
            at: self.clock.now(),
        });
        true
    }

    pub fn set_expiry_time(&mut self, value: u64) -> bool {
        if self.state.expiry_time == value {
            return false;
        }
        self.state.expiry_time = value;
        self.publish(PaygEvent::ExpiryTimeChanged {
            expiry_time: value,
            at: self.clock.now(),
        });
        true
    }

    pub fn set_rate_limit_end_time(&mut self, value: u64) -> bool {
        if self.state.rate_limit_end_time == value {
            return false;
        }
        self.state.rate_limit_end_time = value;
        self.publish(PaygEvent::RateLimitEndTimeChanged {
            rate_limit_end_time: value,
            at: self.clock.now(),
        });
        true
    }

    /// Apply one property notification, field by field.
    pub fn apply_changes(&mut self, changes: PropertyChanges) -> AppliedChanges {
        let mut applied = AppliedChanges::default();
        if let Some(enabled) = changes.enabled {
            applied.enabled = self.set_enabled(enabled);
        }
        if let Some(expiry_time) = changes.expiry_time {
            applied.expiry_time = self.set_expiry_time(expiry_time);
        }
        if let Some(end_time) = changes.rate_limit_end_time {
            applied.rate_limit_end_time = self.set_rate_limit_end_time(end_time);
        }
        applied
    }

    /// Forward the daemon's `Expired` signal.
    pub fn code_expired(&mut self) {
        self.publish(PaygEvent::CodeExpired {
            at: self.clock.now(),
        });
    }

    /// Drop back to the disabled state, announcing the changes.
    pub fn disable(&mut self) -> AppliedChanges {
        self.apply_changes(PropertyChanges {
            enabled: Some(false),
            expiry_time: Some(0),
            rate_limit_end_time: None,
        })
    }

    pub(crate) fn publish(&self, event: PaygEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for ExpiryTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiryTracker")
            .field("state", &self.state)
            .field("initialized", &self.initialized)
            .finish()
    }
}
