//! Fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use payg_core::{
    IpcEvent, PaygBackend, PaygConnection, PaygConnector, PaygError, SubscriptionState, WallClock,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

pub const NOW: i64 = 1_700_000_000;

/// Wall clock that moves with tokio time, plus a manual offset for jumps.
#[derive(Debug, Clone)]
pub struct TokioClock {
    base: DateTime<Utc>,
    start: Instant,
    offset_secs: Arc<Mutex<i64>>,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            base: Utc.timestamp_opt(NOW, 0).unwrap(),
            start: Instant::now(),
            offset_secs: Arc::new(Mutex::new(0)),
        }
    }

    pub fn jump(&self, secs: i64) {
        *self.offset_secs.lock().unwrap() += secs;
    }
}

impl WallClock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let offset = *self.offset_secs.lock().unwrap();
        self.base
            + chrono::Duration::from_std(self.start.elapsed()).unwrap()
            + chrono::Duration::seconds(offset)
    }
}

#[derive(Debug, Default)]
pub struct FakeBackend {
    results: Mutex<VecDeque<Result<(), PaygError>>>,
    codes: Mutex<Vec<String>>,
    clears: Mutex<usize>,
    delay: Duration,
    state: SubscriptionState,
}

impl FakeBackend {
    pub fn new(state: SubscriptionState) -> Self {
        Self {
            state,
            ..Default::default()
        }
    }

    /// Every `AddCode` takes this long to answer.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn push_result(&self, result: Result<(), PaygError>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn codes(&self) -> Vec<String> {
        self.codes.lock().unwrap().clone()
    }

    pub fn clears(&self) -> usize {
        *self.clears.lock().unwrap()
    }
}

#[async_trait]
impl PaygBackend for FakeBackend {
    async fn add_code(&self, code: &str) -> Result<(), PaygError> {
        self.codes.lock().unwrap().push(code.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.results.lock().unwrap().pop_front();
        next.unwrap_or(Ok(()))
    }

    async fn clear_code(&self) -> Result<(), PaygError> {
        *self.clears.lock().unwrap() += 1;
        Ok(())
    }

    async fn fetch_state(&self) -> Result<SubscriptionState, PaygError> {
        Ok(self.state)
    }
}

/// Hands out a single prepared connection.
pub struct FakeConnector {
    connection: Mutex<Option<PaygConnection>>,
}

/// The daemon's side of a [`FakeConnector`].
pub struct FakeDaemon {
    pub events: mpsc::Sender<IpcEvent>,
    pub backend: Arc<FakeBackend>,
}

pub fn fake_daemon(initial: SubscriptionState) -> (FakeConnector, FakeDaemon) {
    let (tx, rx) = mpsc::channel(16);
    let backend = Arc::new(FakeBackend::new(initial));
    let connector = FakeConnector {
        connection: Mutex::new(Some(PaygConnection {
            backend: backend.clone(),
            initial,
            events: rx,
        })),
    };
    (
        connector,
        FakeDaemon {
            events: tx,
            backend,
        },
    )
}

#[async_trait]
impl PaygConnector for FakeConnector {
    async fn connect(&self) -> Result<PaygConnection, PaygError> {
        self.connection
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| PaygError::Transport("already connected".into()))
    }
}

pub struct Unreachable;

#[async_trait]
impl PaygConnector for Unreachable {
    async fn connect(&self) -> Result<PaygConnection, PaygError> {
        Err(PaygError::Transport(
            "org.freedesktop.DBus.Error.ServiceUnknown".into(),
        ))
    }
}

pub fn enabled_until(secs_from_now: u64) -> SubscriptionState {
    SubscriptionState {
        enabled: true,
        expiry_time: NOW as u64 + secs_from_now,
        rate_limit_end_time: 0,
    }
}
