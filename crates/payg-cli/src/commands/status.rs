use chrono::{TimeZone, Utc};
use payg_core::{payg_enabled, PaygStatus, ShellConfig};

use super::CmdResult;

pub async fn run(json: bool) -> CmdResult {
    let config = ShellConfig::load_or_default();
    let mut manager = super::new_manager(&config)?;
    super::start(&mut manager).await;
    let status = manager.status();

    if json {
        println!("{}", status.to_json()?);
        return Ok(());
    }

    if !manager.is_connected() {
        let reason = if payg_enabled() {
            "daemon not available"
        } else {
            "disabled on this system"
        };
        println!("PAYG: {reason}");
        return Ok(());
    }
    print_status(&status);
    Ok(())
}

fn print_status(status: &PaygStatus) {
    println!("Enabled:        {}", yes_no(status.enabled));
    if let Some(remaining) = &status.time_remaining {
        println!("Time remaining: {remaining}");
        if let Some(expiry) = i64::try_from(status.expiry_time)
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        {
            println!("Expires:        {}", expiry.to_rfc3339());
        }
    }
    println!("Locked:         {}", yes_no(status.locked));
    if let Some(secs) = status.rate_limit_secs_left {
        println!("Rate limited:   {secs}s");
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
