//! Integration tests for the PAYG manager.
//!
//! These drive a full manager against a fake daemon, with tokio time paused
//! and the wall clock following it.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{enabled_until, fake_daemon, TokioClock, Unreachable, NOW};
use payg_core::{
    IpcEvent, PaygEvent, PaygManager, PropertyChanges, ReminderPresenter, ShellConfig,
    SubscriptionState,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;

fn new_manager() -> (PaygManager, TokioClock) {
    let clock = TokioClock::new();
    let manager = PaygManager::new(Arc::new(clock.clone()), &ShellConfig::default()).unwrap();
    (manager, clock)
}

/// Next event other than state-change noise.
async fn next_interesting(events: &mut broadcast::Receiver<PaygEvent>) -> PaygEvent {
    loop {
        match events.recv().await.unwrap() {
            PaygEvent::EnabledChanged { .. }
            | PaygEvent::ExpiryTimeChanged { .. }
            | PaygEvent::RateLimitEndTimeChanged { .. } => continue,
            event => return event,
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_startup_seeds_state_without_change_events() {
    let (mut manager, _clock) = new_manager();
    let mut events = manager.subscribe();
    let (connector, _daemon) = fake_daemon(enabled_until(500_000));

    manager.start(true, &connector).await;

    assert!(manager.is_connected());
    assert!(manager.tracker().enabled());
    assert_eq!(manager.tracker().time_remaining_secs(), 500_000);
    // Outside the first threshold: no startup reminder, and 500000s is
    // still below the timer limit so the 2-day alarm is armed.
    let pending = manager.pending_reminder().unwrap();
    assert_eq!(pending.threshold_secs, 172_800);
    assert_eq!(pending.delay, Duration::from_secs(500_000 - 172_800));

    assert!(matches!(
        events.try_recv(),
        Ok(PaygEvent::Initialized { enabled: true, .. })
    ));
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_startup_inside_window_reminds_immediately() {
    let (mut manager, _clock) = new_manager();
    let mut events = manager.subscribe();
    let (connector, _daemon) = fake_daemon(enabled_until(5_000));

    manager.start(true, &connector).await;

    let mut presenter = ReminderPresenter::new("user");
    let event = events.try_recv().unwrap();
    assert!(matches!(
        event,
        PaygEvent::StartupReminder { seconds_left: 5_000, .. }
    ));
    let notification = presenter.present(&event).unwrap();
    assert_eq!(notification.body, "Subscription runs out in 83 minutes.");
    assert!(matches!(
        events.try_recv(),
        Ok(PaygEvent::Initialized { enabled: true, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_daemon_never_blocks_startup() {
    let (mut manager, _clock) = new_manager();
    let mut events = manager.subscribe();

    manager.start(true, &Unreachable).await;

    assert!(manager.tracker().initialized());
    assert!(!manager.tracker().enabled());
    assert_eq!(manager.tracker().time_remaining_secs(), u64::MAX);
    assert!(!manager.tracker().is_locked());
    assert_eq!(manager.pending_reminder(), None);
    assert!(matches!(
        events.try_recv(),
        Ok(PaygEvent::Initialized { enabled: false, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_walks_all_thresholds() {
    let (mut manager, _clock) = new_manager();
    let (connector, daemon) = fake_daemon(enabled_until(7_300));
    manager.start(true, &connector).await;
    let mut events = manager.subscribe();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(manager.run(async move {
        let _ = stop_rx.await;
    }));

    let start = Instant::now();
    let mut fired = Vec::new();
    while fired.len() < 5 {
        if let PaygEvent::ReminderDue { threshold_secs, .. } = next_interesting(&mut events).await {
            fired.push((threshold_secs, start.elapsed().as_secs()));
        }
    }
    assert_eq!(
        fired,
        vec![
            (7_200, 100),
            (3_600, 3_700),
            (1_800, 5_500),
            (120, 7_180),
            (30, 7_270),
        ]
    );

    stop_tx.send(()).unwrap();
    task.await.unwrap();
    drop(daemon);
}

#[tokio::test(start_paused = true)]
async fn test_expiry_extension_reschedules() {
    let (mut manager, _clock) = new_manager();
    let (connector, daemon) = fake_daemon(enabled_until(3_700));
    manager.start(true, &connector).await;
    let mut events = manager.subscribe();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(manager.run(async move {
        let _ = stop_rx.await;
    }));

    // A new code adds a day before the 1-hour reminder fires.
    daemon
        .events
        .send(IpcEvent::PropertiesChanged(PropertyChanges {
            expiry_time: Some(NOW as u64 + 3_700 + 86_400),
            ..Default::default()
        }))
        .await
        .unwrap();

    let start = Instant::now();
    let event = next_interesting(&mut events).await;
    assert!(matches!(
        event,
        PaygEvent::ReminderDue { threshold_secs: 86_400, .. }
    ));
    assert_eq!(start.elapsed().as_secs(), 3_700);

    stop_tx.send(()).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_clock_jump_replaces_pending_reminder() {
    let (mut manager, clock) = new_manager();
    let (connector, _daemon) = fake_daemon(enabled_until(10_000));
    manager.start(true, &connector).await;
    let (jumps_tx, jumps_rx) = mpsc::channel(4);
    manager.set_clock_changes(jumps_rx);
    let mut events = manager.subscribe();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(manager.run(async move {
        let _ = stop_rx.await;
    }));

    let start = Instant::now();
    clock.jump(5_000);
    jumps_tx.send(5_000).await.unwrap();

    assert!(matches!(
        next_interesting(&mut events).await,
        PaygEvent::ClockChanged { jump_secs: 5_000, .. }
    ));
    // The 7200s reminder armed for t=2800 must not fire any more.
    assert!(matches!(
        next_interesting(&mut events).await,
        PaygEvent::ReminderDue { threshold_secs: 3_600, .. }
    ));
    assert_eq!(start.elapsed().as_secs(), 1_400);

    stop_tx.send(()).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_backward_clock_jump_brings_back_earlier_reminder() {
    let (mut manager, clock) = new_manager();
    let (connector, _daemon) = fake_daemon(enabled_until(5_000));
    manager.start(true, &connector).await;
    let (jumps_tx, jumps_rx) = mpsc::channel(4);
    manager.set_clock_changes(jumps_rx);
    let mut events = manager.subscribe();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(manager.run(async move {
        let _ = stop_rx.await;
    }));

    // 3000s back: 8000s remain, so the 2-hour reminder is due again.
    let start = Instant::now();
    clock.jump(-3_000);
    jumps_tx.send(-3_000).await.unwrap();

    assert!(matches!(
        next_interesting(&mut events).await,
        PaygEvent::ClockChanged { jump_secs: -3_000, .. }
    ));
    assert!(matches!(
        next_interesting(&mut events).await,
        PaygEvent::ReminderDue { threshold_secs: 7_200, .. }
    ));
    assert_eq!(start.elapsed().as_secs(), 800);
    // Only one alarm was armed: the next reminder is the 1-hour one.
    assert!(matches!(
        next_interesting(&mut events).await,
        PaygEvent::ReminderDue { threshold_secs: 3_600, .. }
    ));
    assert_eq!(start.elapsed().as_secs(), 4_400);

    stop_tx.send(()).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_disable_cancels_and_expired_is_forwarded() {
    let (mut manager, _clock) = new_manager();
    let (connector, daemon) = fake_daemon(enabled_until(10_000));
    manager.start(true, &connector).await;
    let mut events = manager.subscribe();

    daemon.events.send(IpcEvent::Expired).await.unwrap();
    daemon
        .events
        .send(IpcEvent::PropertiesChanged(PropertyChanges {
            enabled: Some(false),
            ..Default::default()
        }))
        .await
        .unwrap();
    drop(daemon);

    assert!(manager.step().await);
    assert!(matches!(
        events.try_recv(),
        Ok(PaygEvent::CodeExpired { .. })
    ));
    assert!(manager.step().await);
    assert!(matches!(
        events.try_recv(),
        Ok(PaygEvent::EnabledChanged { enabled: false, .. })
    ));
    assert_eq!(manager.pending_reminder(), None);

    // Daemon gone and nothing left to wait for.
    assert!(manager.step().await);
    assert!(!manager.step().await);
}

#[tokio::test(start_paused = true)]
async fn test_requests_go_to_the_daemon() {
    let (mut manager, _clock) = new_manager();
    let (connector, daemon) = fake_daemon(SubscriptionState::default());
    manager.start(true, &connector).await;

    manager.add_code("12345678").await.unwrap();
    manager.clear_code().await.unwrap();
    assert_eq!(daemon.backend.codes(), vec!["12345678".to_string()]);
    assert_eq!(daemon.backend.clears(), 1);
}
