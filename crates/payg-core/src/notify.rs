//! Reminder notifications.
//!
//! Turns [`PaygEvent::ReminderDue`] and [`PaygEvent::StartupReminder`] into
//! notification contents. Only one reminder is shown at a time: a new one
//! replaces the previous. Nothing is shown outside a regular user session
//! (login screen, initial setup).

use serde::{Deserialize, Serialize};

use crate::events::PaygEvent;
use crate::format::time_to_string;

pub const NOTIFICATION_TITLE: &str = "Pay as You Go";

/// Session modes in which reminders are shown.
pub const USER_SESSION_MODES: [&str; 2] = ["user", "user-coding"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Normal,
    High,
    Critical,
}

/// A notification ready to hand to the message tray.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderNotification {
    pub id: u32,
    /// Notification this one replaces, if it is still showing.
    pub replaces: Option<u32>,
    pub title: String,
    pub body: String,
    pub urgency: Urgency,
    /// Transient notifications skip the tray; reminders stay.
    pub transient: bool,
}

#[derive(Debug)]
pub struct ReminderPresenter {
    session_mode: String,
    next_id: u32,
    showing: Option<u32>,
}

impl ReminderPresenter {
    pub fn new(session_mode: impl Into<String>) -> Self {
        Self {
            session_mode: session_mode.into(),
            next_id: 1,
            showing: None,
        }
    }

    pub fn session_mode(&self) -> &str {
        &self.session_mode
    }

    pub fn set_session_mode(&mut self, mode: impl Into<String>) {
        self.session_mode = mode.into();
    }

    pub fn showing(&self) -> Option<u32> {
        self.showing
    }

    fn in_user_session(&self) -> bool {
        USER_SESSION_MODES.contains(&self.session_mode.as_str())
    }

    /// Build the notification for `event`, if it is a reminder and the
    /// session allows one.
    pub fn present(&mut self, event: &PaygEvent) -> Option<ReminderNotification> {
        let seconds_left = match event {
            PaygEvent::ReminderDue { threshold_secs, .. } => u64::from(*threshold_secs),
            PaygEvent::StartupReminder { seconds_left, .. } => *seconds_left,
            _ => return None,
        };

        if !self.in_user_session() {
            tracing::debug!(mode = %self.session_mode, "skipping PAYG reminder outside user session");
            return None;
        }

        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        let replaces = self.showing.replace(id);

        Some(ReminderNotification {
            id,
            replaces,
            title: NOTIFICATION_TITLE.to_string(),
            body: reminder_body(seconds_left),
            urgency: Urgency::High,
            transient: false,
        })
    }

    /// The user dismissed notification `id`.
    pub fn dismissed(&mut self, id: u32) {
        if self.showing == Some(id) {
            self.showing = None;
        }
    }
}

pub fn reminder_body(seconds_left: u64) -> String {
    format!("Subscription runs out in {}.", time_to_string(seconds_left))
}
