//! zbus-backed connector and backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use zbus::fdo::PropertiesProxy;
use zbus::zvariant::Value;
use zbus::Connection;

use super::proxy::{Payg1Proxy, EOS_PAYG_INTERFACE, EOS_PAYG_NAME, EOS_PAYG_PATH};
use super::{IpcEvent, PaygBackend, PaygConnection, PaygConnector};
use crate::error::PaygError;
use crate::state::{PropertyChanges, SubscriptionState};

const IPC_EVENT_CAPACITY: usize = 32;

/// Connects to the PAYG daemon on the system bus.
#[derive(Debug, Clone, Copy, Default)]
pub struct DbusConnector;

#[async_trait]
impl PaygConnector for DbusConnector {
    async fn connect(&self) -> Result<PaygConnection, PaygError> {
        let connection = Connection::system().await?;
        let proxy = Payg1Proxy::new(&connection).await?;
        let properties = PropertiesProxy::builder(&connection)
            .destination(EOS_PAYG_NAME)?
            .path(EOS_PAYG_PATH)?
            .build()
            .await?;

        // Subscribe before reading so nothing slips between the two; a change
        // seen twice is harmless since the tracker ignores repeated values.
        let properties_changed = properties.receive_properties_changed().await?;
        let expired = proxy.receive_expired().await?;

        let backend = DbusBackend { proxy };
        let initial = backend.fetch_state().await?;

        let (tx, rx) = mpsc::channel(IPC_EVENT_CAPACITY);
        tokio::spawn(async move {
            let mut properties_changed = properties_changed;
            let mut expired = expired;
            loop {
                let event = tokio::select! {
                    Some(signal) = properties_changed.next() => {
                        let args = match signal.args() {
                            Ok(args) => args,
                            Err(e) => {
                                tracing::warn!(error = %e, "malformed PropertiesChanged signal");
                                continue;
                            }
                        };
                        if args.interface_name().as_str() != EOS_PAYG_INTERFACE {
                            continue;
                        }
                        let changes = parse_property_changes(args.changed_properties());
                        if changes.is_empty() {
                            continue;
                        }
                        IpcEvent::PropertiesChanged(changes)
                    }
                    Some(_) = expired.next() => IpcEvent::Expired,
                    else => break,
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            tracing::debug!("PAYG signal pump stopped");
        });

        Ok(PaygConnection {
            backend: Arc::new(backend),
            initial,
            events: rx,
        })
    }
}

/// [`PaygBackend`] over a live D-Bus proxy.
pub struct DbusBackend {
    proxy: Payg1Proxy<'static>,
}

#[async_trait]
impl PaygBackend for DbusBackend {
    async fn add_code(&self, code: &str) -> Result<(), PaygError> {
        Ok(self.proxy.add_code(code).await?)
    }

    async fn clear_code(&self) -> Result<(), PaygError> {
        Ok(self.proxy.clear_code().await?)
    }

    async fn fetch_state(&self) -> Result<SubscriptionState, PaygError> {
        Ok(SubscriptionState {
            enabled: self.proxy.enabled().await?,
            expiry_time: self.proxy.expiry_time().await?,
            rate_limit_end_time: self.proxy.rate_limit_end_time().await?,
        })
    }
}

/// Turn a `PropertiesChanged` dictionary into typed changes.
///
/// Unknown properties are ignored; known ones with an unexpected type are
/// logged and skipped.
pub fn parse_property_changes(changed: &HashMap<&str, Value<'_>>) -> PropertyChanges {
    let mut changes = PropertyChanges::default();
    for (&name, value) in changed {
        match name {
            "Enabled" => changes.enabled = as_bool(name, value),
            "ExpiryTime" => changes.expiry_time = as_u64(name, value),
            "RateLimitEndTime" => changes.rate_limit_end_time = as_u64(name, value),
            _ => {}
        }
    }
    changes
}

fn as_bool(name: &str, value: &Value<'_>) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        other => mistyped(name, other),
    }
}

fn as_u64(name: &str, value: &Value<'_>) -> Option<u64> {
    match value {
        Value::U64(n) => Some(*n),
        other => mistyped(name, other),
    }
}

fn mistyped<T>(name: &str, value: &Value<'_>) -> Option<T> {
    tracing::warn!(property = name, value = ?value, "unexpected PAYG property type");
    None
}
