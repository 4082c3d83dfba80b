//! The system-wide PAYG switch.
//!
//! Read straight from `eos-payg.conf` so that the daemon is never woken up
//! (and kept running) on machines where PAYG is off. See eos-payg.conf(5).

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const SYSTEM_CONFIG_FILE: &str = "eos-payg.conf";

/// Searched in order; the first directory holding the file wins.
pub const SYSTEM_CONFIG_DIRS: [&str; 3] = [
    "/etc/eos-payg",
    "/usr/local/share/eos-payg",
    "/usr/share/eos-payg",
];

const GROUP: &str = "PAYG";
const KEY: &str = "Enabled";

/// Read the `[PAYG] Enabled` flag from the first config file found in `dirs`.
///
/// The file is a GLib key file: `[Group]` headers, `Key=Value` lines and `#`
/// comments. Booleans are `true`, `false`, `1` or `0`. A missing file, group
/// or key is `Ok(false)`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed, or if
/// the key holds something other than a boolean.
pub fn read_enabled_flag<P: AsRef<Path>>(dirs: &[P]) -> Result<bool, ConfigError> {
    let Some(path) = find_config(dirs) else {
        return Ok(false);
    };

    let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
        path: path.clone(),
        message: e.to_string(),
    })?;
    let value = key_file_value(&content, GROUP, KEY).map_err(|message| {
        ConfigError::ParseFailed {
            path: path.clone(),
            message,
        }
    })?;

    match value {
        None => Ok(false),
        Some(raw) => parse_boolean(raw).ok_or_else(|| ConfigError::InvalidValue {
            key: format!("{GROUP}.{KEY}"),
            message: format!("expected a boolean, found {raw:?}"),
        }),
    }
}

/// Look up `key` in `group`, checking the syntax of the whole file.
/// A key repeated within a group takes its last value.
fn key_file_value<'a>(content: &'a str, group: &str, key: &str) -> Result<Option<&'a str>, String> {
    let mut current: Option<&str> = None;
    let mut found = None;

    for (index, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line_no = index + 1;

        if let Some(header) = line.strip_prefix('[') {
            let name = header
                .strip_suffix(']')
                .filter(|name| !name.is_empty() && !name.contains(['[', ']']))
                .ok_or_else(|| format!("line {line_no}: invalid group header {line:?}"))?;
            current = Some(name);
            continue;
        }

        let (name, value) = line
            .split_once('=')
            .ok_or_else(|| format!("line {line_no}: expected Key=Value, found {line:?}"))?;
        let Some(current_group) = current else {
            return Err(format!("line {line_no}: key outside of any group"));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("line {line_no}: empty key name"));
        }
        if current_group == group && name == key {
            found = Some(value.trim());
        }
    }

    Ok(found)
}

fn parse_boolean(value: &str) -> Option<bool> {
    match value {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Whether PAYG is switched on for this machine. Never fails: errors are
/// logged and count as disabled.
pub fn payg_enabled() -> bool {
    match read_enabled_flag(&SYSTEM_CONFIG_DIRS) {
        Ok(enabled) => enabled,
        Err(e) => {
            tracing::warn!(error = %e, "Error reading PAYG configuration file");
            false
        }
    }
}

fn find_config<P: AsRef<Path>>(dirs: &[P]) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.as_ref().join(SYSTEM_CONFIG_FILE))
        .find(|path| path.is_file())
}
