use payg_core::unlock::{UnlockEvent, UnlockFlow};
use payg_core::{PaygError, ShellConfig};

use super::CmdResult;

pub async fn add(code: &str) -> CmdResult {
    let config = ShellConfig::load_or_default();
    let mut manager = super::connect(&config).await?;

    let mut flow = UnlockFlow::new(config.unlock.clone());
    if !code.chars().all(|c| flow.push_char(c)) || !flow.submit_enabled() {
        return Err(format!("code must be {} digits", config.unlock.code_length).into());
    }
    let submission = flow.submit().ok_or("code cannot be submitted now")?;

    let backend = manager
        .backend()
        .ok_or_else(|| PaygError::Transport("not connected to the PAYG daemon".into()))?;
    let result = flow.send(backend.as_ref(), &submission).await;

    // The daemon moves RateLimitEndTime when it refuses a code.
    if result.is_err() {
        if let Err(e) = manager.refresh().await {
            tracing::warn!(error = %e, "could not refresh PAYG state");
        }
    }

    match flow.complete(submission.attempt, result, manager.tracker()) {
        Some(UnlockEvent::Succeeded) => {
            println!("Code accepted");
            if let Some(remaining) = manager.status().time_remaining {
                println!("Time remaining: {remaining}");
            }
            Ok(())
        }
        _ => {
            for line in flow.help_lines() {
                eprintln!("{line}");
            }
            Err(flow
                .error_message()
                .unwrap_or(payg_core::unlock::MSG_UNKNOWN_ERROR)
                .into())
        }
    }
}

pub async fn clear() -> CmdResult {
    let config = ShellConfig::load_or_default();
    let manager = super::connect(&config).await?;
    manager.clear_code().await?;
    println!("Code cleared");
    Ok(())
}
