pub mod code;
pub mod config;
pub mod format;
pub mod status;
pub mod watch;

use std::sync::Arc;

use payg_core::{payg_enabled, DbusConnector, PaygError, PaygManager, ShellConfig, SystemClock};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Build a manager from the user's configuration.
pub fn new_manager(config: &ShellConfig) -> payg_core::error::Result<PaygManager> {
    Ok(PaygManager::new(Arc::new(SystemClock), config)?)
}

/// Start `manager` against the system bus, as the shell does at login.
pub async fn start(manager: &mut PaygManager) {
    manager.start(payg_enabled(), &DbusConnector).await;
}

/// A started manager that must be talking to the daemon.
pub async fn connect(config: &ShellConfig) -> payg_core::error::Result<PaygManager> {
    let mut manager = new_manager(config)?;
    start(&mut manager).await;
    if !manager.is_connected() {
        let reason = if payg_enabled() {
            "see log for details"
        } else {
            "PAYG is not enabled on this system"
        };
        return Err(PaygError::Transport(reason.into()).into());
    }
    Ok(manager)
}
