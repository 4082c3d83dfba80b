use payg_core::format::time_to_string;
use payg_core::{PaygEvent, ReminderPresenter, ShellConfig};
use tokio::sync::broadcast::error::RecvError;

use super::CmdResult;

pub async fn run(session_mode: &str) -> CmdResult {
    let config = ShellConfig::load_or_default();
    let mut manager = super::new_manager(&config)?;
    let mut events = manager.subscribe();
    super::start(&mut manager).await;
    manager.watch_clock(&config.clock);

    let mut presenter = ReminderPresenter::new(session_mode);
    let task = tokio::spawn(manager.run(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }));

    loop {
        match events.recv().await {
            Ok(event) => {
                println!("{}", describe(&event));
                if let Some(notification) = presenter.present(&event) {
                    println!("  >> {}: {}", notification.title, notification.body);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event stream lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }

    task.await?;
    Ok(())
}

fn describe(event: &PaygEvent) -> String {
    let what = match event {
        PaygEvent::Initialized { enabled, .. } => format!("initialized (enabled: {enabled})"),
        PaygEvent::EnabledChanged { enabled, .. } => format!("enabled changed: {enabled}"),
        PaygEvent::ExpiryTimeChanged { expiry_time, .. } => {
            format!("expiry time changed: {expiry_time}")
        }
        PaygEvent::RateLimitEndTimeChanged {
            rate_limit_end_time,
            ..
        } => format!("rate limit end time changed: {rate_limit_end_time}"),
        PaygEvent::CodeExpired { .. } => "code expired".to_string(),
        PaygEvent::ReminderDue { threshold_secs, .. } => {
            format!("reminder due: {}", time_to_string(u64::from(*threshold_secs)))
        }
        PaygEvent::StartupReminder { seconds_left, .. } => {
            format!("startup reminder: {}", time_to_string(*seconds_left))
        }
        PaygEvent::ClockChanged { jump_secs, .. } => format!("clock changed by {jump_secs}s"),
    };
    format!("[{}] {what}", event.at().format("%Y-%m-%d %H:%M:%S"))
}
