//! Core error types for payg-core.
//!
//! This module defines the error hierarchy using thiserror. [`PaygError`]
//! is the taxonomy surfaced by the PAYG daemon and the transport to it;
//! [`ConfigError`] covers both the system flag file and the shell config.

use std::path::PathBuf;
use thiserror::Error;

/// D-Bus error names registered by the PAYG daemon.
pub const DBUS_ERROR_INVALID_CODE: &str = "com.endlessm.Payg1.Error.InvalidCode";
pub const DBUS_ERROR_CODE_ALREADY_USED: &str = "com.endlessm.Payg1.Error.CodeAlreadyUsed";
pub const DBUS_ERROR_TOO_MANY_ATTEMPTS: &str = "com.endlessm.Payg1.Error.TooManyAttempts";
pub const DBUS_ERROR_DISABLED: &str = "com.endlessm.Payg1.Error.Disabled";

/// Core error type for payg-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Errors reported by (or on the way to) the PAYG daemon
    #[error("PAYG error: {0}")]
    Payg(#[from] PaygError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned by PAYG daemon requests.
///
/// `Transport` and `TimedOut` together form the transport class: the
/// daemon could not be reached or did not answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaygError {
    /// The daemon could not be reached
    #[error("PAYG daemon unreachable: {0}")]
    Transport(String),

    /// The daemon did not answer in time
    #[error("Timed out waiting for the PAYG daemon")]
    TimedOut,

    /// The code was rejected
    #[error("Invalid code")]
    InvalidCode,

    /// The code was valid but has been used before
    #[error("Code already used")]
    CodeAlreadyUsed,

    /// The daemon is rate limiting code attempts
    #[error("Too many attempts")]
    TooManyAttempts,

    /// PAYG is disabled on this machine
    #[error("PAYG is disabled")]
    Disabled,

    /// Anything the daemon reported that we have no mapping for
    #[error("Unknown PAYG error: {0}")]
    Unknown(String),
}

impl PaygError {
    /// Map a D-Bus error name (and optional detail message) to a PAYG error.
    pub fn from_dbus_name(name: &str, detail: Option<&str>) -> Self {
        match name {
            DBUS_ERROR_INVALID_CODE => PaygError::InvalidCode,
            DBUS_ERROR_CODE_ALREADY_USED => PaygError::CodeAlreadyUsed,
            DBUS_ERROR_TOO_MANY_ATTEMPTS => PaygError::TooManyAttempts,
            DBUS_ERROR_DISABLED => PaygError::Disabled,
            "org.freedesktop.DBus.Error.Timeout"
            | "org.freedesktop.DBus.Error.TimedOut"
            | "org.freedesktop.DBus.Error.NoReply" => PaygError::TimedOut,
            "org.freedesktop.DBus.Error.ServiceUnknown"
            | "org.freedesktop.DBus.Error.NameHasNoOwner"
            | "org.freedesktop.DBus.Error.Disconnected" => {
                PaygError::Transport(detail.unwrap_or(name).to_string())
            }
            other => PaygError::Unknown(match detail {
                Some(detail) => format!("{other}: {detail}"),
                None => other.to_string(),
            }),
        }
    }

    /// Whether the daemon was never reached or never answered.
    pub fn is_transport(&self) -> bool {
        matches!(self, PaygError::Transport(_) | PaygError::TimedOut)
    }
}

impl From<zbus::Error> for PaygError {
    fn from(err: zbus::Error) -> Self {
        match err {
            zbus::Error::MethodError(name, detail, _) => {
                PaygError::from_dbus_name(name.as_str(), detail.as_deref())
            }
            zbus::Error::FDO(fdo) => match *fdo {
                zbus::fdo::Error::Timeout(_)
                | zbus::fdo::Error::TimedOut(_)
                | zbus::fdo::Error::NoReply(_) => PaygError::TimedOut,
                other => PaygError::Transport(other.to_string()),
            },
            other => PaygError::Transport(other.to_string()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for PaygError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        PaygError::TimedOut
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration from {path}: {message}")]
    ParseFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
