//! Client side of the PAYG daemon's D-Bus interface.
//!
//! Everything above this module works against [`PaygBackend`] and
//! [`PaygConnector`]; only [`dbus`] knows about zbus.

pub mod dbus;
mod proxy;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::PaygError;
use crate::state::{PropertyChanges, SubscriptionState};

pub use dbus::{parse_property_changes, DbusConnector};
pub use proxy::{Payg1Proxy, EOS_PAYG_INTERFACE, EOS_PAYG_NAME, EOS_PAYG_PATH};

/// Requests the daemon answers.
#[async_trait]
pub trait PaygBackend: Send + Sync {
    /// Submit an unlock code.
    async fn add_code(&self, code: &str) -> Result<(), PaygError>;

    /// Remove the current code, expiring the subscription.
    async fn clear_code(&self) -> Result<(), PaygError>;

    /// Read all properties at once.
    async fn fetch_state(&self) -> Result<SubscriptionState, PaygError>;
}

/// Notifications pushed by the daemon, in the order it sent them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpcEvent {
    PropertiesChanged(PropertyChanges),
    Expired,
}

/// A live connection to the daemon.
pub struct PaygConnection {
    pub backend: Arc<dyn PaygBackend>,
    /// Property values read right after subscribing.
    pub initial: SubscriptionState,
    pub events: mpsc::Receiver<IpcEvent>,
}

/// Establishes [`PaygConnection`]s.
#[async_trait]
pub trait PaygConnector: Send + Sync {
    async fn connect(&self) -> Result<PaygConnection, PaygError>;
}
