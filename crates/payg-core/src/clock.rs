//! Wall-clock sources and clock-jump detection.
//!
//! Expiry and rate-limit times are absolute unix timestamps, so remaining
//! time is always measured against the real-time clock. That clock can be
//! moved by NTP, the user or a timezone change at any moment, which is why
//! it is read fresh on every query and why jumps are detected separately by
//! comparing it against the monotonic clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// A source of wall-clock time.
pub trait WallClock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Current wall-clock time as whole unix seconds (floored, never negative).
    fn now_unix_secs(&self) -> u64 {
        self.now().timestamp().max(0) as u64
    }
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Start at the given unix timestamp.
    pub fn at_unix_secs(secs: i64) -> Self {
        let start = Utc
            .timestamp_opt(secs, 0)
            .single()
            .unwrap_or_default();
        Self::new(start)
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.lock() = to;
    }

    /// Move the clock by `secs` seconds (negative moves it back).
    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.lock();
        *now += chrono::Duration::seconds(secs);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // A poisoned clock still holds a valid timestamp.
        self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl WallClock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}

/// Detects wall-clock jumps by comparing wall progress with monotonic progress.
#[derive(Debug)]
pub struct ClockJumpDetector {
    tolerance: Duration,
    last: Option<(DateTime<Utc>, Instant)>,
}

impl ClockJumpDetector {
    pub fn new(tolerance: Duration) -> Self {
        Self {
            tolerance,
            last: None,
        }
    }

    /// Record a sample. Returns the jump in seconds (positive = forward) when
    /// the wall clock moved more than `tolerance` away from monotonic time
    /// since the previous sample.
    pub fn check(&mut self, wall: DateTime<Utc>, mono: Instant) -> Option<i64> {
        let previous = self.last.replace((wall, mono));
        let (last_wall, last_mono) = previous?;

        let wall_elapsed_ms = (wall - last_wall).num_milliseconds();
        let mono_elapsed_ms = mono.saturating_duration_since(last_mono).as_millis() as i64;
        let drift_ms = wall_elapsed_ms - mono_elapsed_ms;

        if drift_ms.unsigned_abs() as u128 > self.tolerance.as_millis() {
            Some(drift_ms / 1000)
        } else {
            None
        }
    }
}

/// Poll the wall clock every `period` and send the jump size on `tx` whenever
/// it moves independently of monotonic time. Ends when the receiver is gone.
pub async fn watch_clock(
    clock: Arc<dyn WallClock>,
    period: Duration,
    tolerance: Duration,
    tx: mpsc::Sender<i64>,
) {
    let mut detector = ClockJumpDetector::new(tolerance);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Some(jump) = detector.check(clock.now(), Instant::now()) {
            tracing::info!(jump_secs = jump, "wall clock changed");
            if tx.send(jump).await.is_err() {
                return;
            }
        }
        if tx.is_closed() {
            return;
        }
    }
}
