//! PAYG manager.
//!
//! Owns the [`ExpiryTracker`] and the [`ReminderScheduler`] and is the only
//! place that mutates them. Everything it reacts to (daemon notifications,
//! wall-clock jumps, the reminder alarm) arrives on one task through
//! [`PaygManager::run`], so handlers never interleave.
//!
//! ## Startup
//!
//! ```text
//! system flag off ──────────────────────────────► initialized (disabled)
//! system flag on ── connect ── ok ── seed state ── startup reminder ── arm ── initialized
//!                           └─ err ── log ─────────────────────────────────── initialized (disabled)
//! ```
//!
//! PAYG being unreachable never blocks the session.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

use crate::clock::{self, WallClock};
use crate::config::{ClockConfig, ShellConfig};
use crate::error::{ConfigError, PaygError, Result as CoreResult};
use crate::events::PaygEvent;
use crate::format::time_to_string;
use crate::ipc::{IpcEvent, PaygBackend, PaygConnector};
use crate::scheduler::{PendingReminder, ReminderScheduler};
use crate::state::PropertyChanges;
use crate::tracker::ExpiryTracker;

/// Buffered wall-clock jump notifications.
const CLOCK_EVENT_CAPACITY: usize = 4;

pub struct PaygManager {
    tracker: ExpiryTracker,
    scheduler: ReminderScheduler,
    backend: Option<Arc<dyn PaygBackend>>,
    ipc_events: Option<mpsc::Receiver<IpcEvent>>,
    clock_changes: Option<mpsc::Receiver<i64>>,
}

impl PaygManager {
    /// # Errors
    ///
    /// Returns an error if the configured reminder thresholds are invalid.
    pub fn new(clock: Arc<dyn WallClock>, config: &ShellConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            tracker: ExpiryTracker::new(clock),
            scheduler: ReminderScheduler::new(config.reminders.thresholds_secs.clone())?,
            backend: None,
            ipc_events: None,
            clock_changes: None,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn tracker(&self) -> &ExpiryTracker {
        &self.tracker
    }

    pub fn scheduler(&self) -> &ReminderScheduler {
        &self.scheduler
    }

    pub fn pending_reminder(&self) -> Option<PendingReminder> {
        self.scheduler.pending()
    }

    pub fn backend(&self) -> Option<Arc<dyn PaygBackend>> {
        self.backend.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.backend.is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PaygEvent> {
        self.tracker.subscribe()
    }

    pub fn status(&self) -> PaygStatus {
        PaygStatus::from_tracker(&self.tracker)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Connect to the daemon if PAYG is switched on, then announce
    /// initialization whatever the outcome.
    pub async fn start(&mut self, system_enabled: bool, connector: &dyn PaygConnector) {
        if !system_enabled {
            tracing::debug!("PAYG disabled in system configuration");
            self.tracker.mark_initialized();
            return;
        }

        match connector.connect().await {
            Ok(connection) => {
                self.tracker.load_initial(connection.initial);
                self.backend = Some(connection.backend);
                self.ipc_events = Some(connection.events);

                if let Some(seconds_left) = self.scheduler.startup_reminder(&self.tracker) {
                    self.tracker.publish(PaygEvent::StartupReminder {
                        seconds_left,
                        at: self.tracker.now(),
                    });
                }
                self.scheduler.rearm(&self.tracker);
                tracing::info!(state = ?self.tracker.state(), "connected to PAYG daemon");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error while connecting to the PAYG daemon");
            }
        }

        self.tracker.mark_initialized();
    }

    /// Start watching the wall clock for jumps.
    pub fn watch_clock(&mut self, config: &ClockConfig) {
        let (tx, rx) = mpsc::channel(CLOCK_EVENT_CAPACITY);
        tokio::spawn(clock::watch_clock(
            self.tracker.clock(),
            config.poll_interval(),
            config.jump_tolerance(),
            tx,
        ));
        self.clock_changes = Some(rx);
    }

    /// Feed clock-change notifications from an external source instead.
    pub fn set_clock_changes(&mut self, rx: mpsc::Receiver<i64>) {
        self.clock_changes = Some(rx);
    }

    /// Cancel the pending reminder, drop the connection and fall back to
    /// the disabled state. Subscribers see the resulting property changes.
    pub fn shutdown(&mut self) {
        self.scheduler.cancel();
        self.ipc_events = None;
        self.clock_changes = None;
        self.backend = None;
        if self.tracker.disable().any() {
            tracing::debug!("PAYG state reset on shutdown");
        }
    }

    // ── Handlers ─────────────────────────────────────────────────────

    pub fn handle_ipc_event(&mut self, event: IpcEvent) {
        match event {
            IpcEvent::PropertiesChanged(changes) => {
                let applied = self.tracker.apply_changes(changes);
                if applied.affects_reminders() {
                    self.scheduler.rearm(&self.tracker);
                }
            }
            IpcEvent::Expired => self.tracker.code_expired(),
        }
    }

    pub fn on_clock_changed(&mut self, jump_secs: i64) {
        self.tracker.publish(PaygEvent::ClockChanged {
            jump_secs,
            at: self.tracker.now(),
        });
        self.scheduler.rearm(&self.tracker);
    }

    pub fn on_reminder_due(&mut self, threshold_secs: u32) {
        self.scheduler.fire(threshold_secs, &self.tracker);
    }

    /// Wait for the next input and handle it.
    ///
    /// Returns `false` once there is nothing left that could ever arrive.
    pub async fn step(&mut self) -> bool {
        if self.ipc_events.is_none()
            && self.clock_changes.is_none()
            && self.scheduler.pending().is_none()
        {
            return false;
        }

        tokio::select! {
            event = recv_or_pending(&mut self.ipc_events) => match event {
                Some(event) => self.handle_ipc_event(event),
                None => {
                    tracing::warn!("lost connection to the PAYG daemon");
                    self.ipc_events = None;
                }
            },
            jump = recv_or_pending(&mut self.clock_changes) => match jump {
                Some(jump_secs) => self.on_clock_changed(jump_secs),
                None => self.clock_changes = None,
            },
            threshold_secs = self.scheduler.next_due() => self.on_reminder_due(threshold_secs),
        }
        true
    }

    /// Process inputs until `shutdown` resolves or nothing is left to wait for.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                more = self.step() => if !more { break },
            }
        }
        self.shutdown();
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Re-read every property from the daemon and apply what changed.
    ///
    /// # Errors
    ///
    /// Returns the daemon's error, or a transport error without a connection.
    pub async fn refresh(&mut self) -> Result<(), PaygError> {
        let state = self.connected_backend()?.fetch_state().await?;
        self.handle_ipc_event(IpcEvent::PropertiesChanged(PropertyChanges {
            enabled: Some(state.enabled),
            expiry_time: Some(state.expiry_time),
            rate_limit_end_time: Some(state.rate_limit_end_time),
        }));
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the daemon's error, or a transport error without a connection.
    pub async fn add_code(&self, code: &str) -> Result<(), PaygError> {
        self.connected_backend()?.add_code(code).await
    }

    /// # Errors
    ///
    /// Returns the daemon's error, or a transport error without a connection.
    pub async fn clear_code(&self) -> Result<(), PaygError> {
        self.connected_backend()?.clear_code().await
    }

    fn connected_backend(&self) -> Result<&Arc<dyn PaygBackend>, PaygError> {
        self.backend.as_ref().ok_or_else(|| {
            tracing::warn!("no D-Bus connection to the PAYG daemon");
            PaygError::Transport("not connected to the PAYG daemon".into())
        })
    }
}

async fn recv_or_pending<T>(rx: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Snapshot of the tracker for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaygStatus {
    pub enabled: bool,
    pub expiry_time: u64,
    pub rate_limit_end_time: u64,
    /// `None` while PAYG is disabled.
    pub time_remaining_secs: Option<u64>,
    pub time_remaining: Option<String>,
    pub locked: bool,
    /// Seconds left on the rate limit, if one is active.
    pub rate_limit_secs_left: Option<u64>,
}

impl PaygStatus {
    pub fn from_tracker(tracker: &ExpiryTracker) -> Self {
        let remaining = tracker
            .enabled()
            .then(|| tracker.time_remaining_secs());
        let rate_limit = tracker.rate_limit_secs_left();
        Self {
            enabled: tracker.enabled(),
            expiry_time: tracker.expiry_time(),
            rate_limit_end_time: tracker.rate_limit_end_time(),
            time_remaining_secs: remaining,
            time_remaining: remaining.map(time_to_string),
            locked: tracker.is_locked(),
            rate_limit_secs_left: (rate_limit > 0).then_some(rate_limit as u64),
        }
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
