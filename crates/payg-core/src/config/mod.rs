mod shell;
mod system;

pub use shell::{ClockConfig, RemindersConfig, ShellConfig, UnlockConfig};
pub use system::{payg_enabled, read_enabled_flag, SYSTEM_CONFIG_DIRS, SYSTEM_CONFIG_FILE};

use std::path::PathBuf;

/// Returns `~/.config/payg-shell[-dev]/` based on PAYG_SHELL_ENV.
///
/// Set PAYG_SHELL_ENV=dev to use the development config directory.
/// The directory is not created; a missing config file means defaults.
pub fn config_dir() -> PathBuf {
    let base_dir = dirs::config_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
    });

    let env = std::env::var("PAYG_SHELL_ENV").unwrap_or_else(|_| "production".to_string());

    if env == "dev" {
        base_dir.join("payg-shell-dev")
    } else {
        base_dir.join("payg-shell")
    }
}
