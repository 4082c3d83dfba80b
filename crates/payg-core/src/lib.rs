//! # PAYG Shell Core Library
//!
//! Client-side logic for pay-as-you-go subscription enforcement in the
//! desktop shell. The PAYG daemon owns the truth (codes, expiry, rate
//! limiting); this library mirrors its state over D-Bus and decides when the
//! user has to be told something.
//!
//! ## Architecture
//!
//! - **Expiry tracking**: a cached copy of the daemon's properties with
//!   change detection and a broadcast event stream
//! - **Reminders**: one alarm at a time, armed for the next threshold below
//!   the remaining time, rescheduled on every change and wall-clock jump
//! - **Unlock flow**: the code-entry dialog state machine, including the
//!   rate-limit countdown
//! - **IPC**: a zbus proxy behind the [`PaygBackend`] / [`PaygConnector`]
//!   traits so everything above it runs against fakes in tests
//!
//! ## Key Components
//!
//! - [`PaygManager`]: owns tracker and scheduler, runs the event loop
//! - [`ExpiryTracker`]: subscription state and [`PaygEvent`]s
//! - [`ReminderScheduler`]: reminder alarm selection
//! - [`UnlockFlow`]: unlock dialog
//! - [`ShellConfig`]: tunables read from TOML

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod ipc;
pub mod manager;
pub mod notify;
pub mod scheduler;
pub mod state;
pub mod timer;
pub mod tracker;
pub mod unlock;

pub use clock::{ManualClock, SystemClock, WallClock};
pub use config::{payg_enabled, ShellConfig};
pub use error::{ConfigError, CoreError, PaygError};
pub use events::PaygEvent;
pub use format::time_to_string;
pub use ipc::{DbusConnector, IpcEvent, PaygBackend, PaygConnection, PaygConnector};
pub use manager::{PaygManager, PaygStatus};
pub use notify::{ReminderNotification, ReminderPresenter};
pub use scheduler::{PendingReminder, ReminderScheduler};
pub use state::{PropertyChanges, SubscriptionState};
pub use timer::ScopedTimer;
pub use tracker::ExpiryTracker;
pub use unlock::{CancelReason, UnlockEvent, UnlockFlow, UnlockStatus};
