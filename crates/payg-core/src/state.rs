//! Subscription state as observed from the PAYG daemon.

use serde::{Deserialize, Serialize};

/// The daemon's state, as last observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionState {
    /// Whether PAYG enforcement is active at all.
    pub enabled: bool,
    /// Unix time after which the subscription is expired.
    pub expiry_time: u64,
    /// Unix time until which new codes are refused. 0 or past means none.
    pub rate_limit_end_time: u64,
}

/// Properties that changed in one notification from the daemon.
///
/// `None` means the property was not part of the notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropertyChanges {
    pub enabled: Option<bool>,
    pub expiry_time: Option<u64>,
    pub rate_limit_end_time: Option<u64>,
}

impl PropertyChanges {
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none() && self.expiry_time.is_none() && self.rate_limit_end_time.is_none()
    }
}

/// Which fields actually changed after applying a [`PropertyChanges`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedChanges {
    pub enabled: bool,
    pub expiry_time: bool,
    pub rate_limit_end_time: bool,
}

impl AppliedChanges {
    /// Whether the reminder schedule depends on anything that changed.
    pub fn affects_reminders(&self) -> bool {
        self.enabled || self.expiry_time
    }

    pub fn any(&self) -> bool {
        self.enabled || self.expiry_time || self.rate_limit_end_time
    }
}
