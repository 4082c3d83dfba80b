//! One-shot timer slot.
//!
//! A [`ScopedTimer`] holds at most one armed timer for a single logical
//! purpose (the reminder alarm, the rate-limit clear). Arming replaces and
//! cancels whatever was armed before; dropping the slot cancels it. The
//! timer runs on tokio's monotonic clock.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep};

struct Armed<T> {
    sleep: Pin<Box<Sleep>>,
    delay: Duration,
    payload: T,
}

/// Owned optional one-shot timer carrying a payload of type `T`.
pub struct ScopedTimer<T> {
    armed: Option<Armed<T>>,
}

impl<T> ScopedTimer<T> {
    pub fn new() -> Self {
        Self { armed: None }
    }

    /// Arm the timer, cancelling any previously armed one.
    pub fn arm(&mut self, delay: Duration, payload: T) {
        self.armed = Some(Armed {
            sleep: Box::pin(tokio::time::sleep(delay)),
            delay,
            payload,
        });
    }

    /// Cancel the armed timer, if any. Returns its payload.
    pub fn cancel(&mut self) -> Option<T> {
        self.armed.take().map(|armed| armed.payload)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Delay the timer was armed with.
    pub fn delay(&self) -> Option<Duration> {
        self.armed.as_ref().map(|armed| armed.delay)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed.as_ref().map(|armed| armed.sleep.deadline())
    }

    pub fn payload(&self) -> Option<&T> {
        self.armed.as_ref().map(|armed| &armed.payload)
    }

    /// Wait for the armed timer to fire and disarm it, yielding its payload.
    ///
    /// Pends forever while nothing is armed. Cancel-safe: dropping the future
    /// before it completes leaves the timer armed.
    pub async fn fired(&mut self) -> T {
        match self.armed.as_mut() {
            Some(armed) => armed.sleep.as_mut().await,
            None => std::future::pending::<()>().await,
        }
        match self.armed.take() {
            Some(armed) => armed.payload,
            None => std::future::pending().await,
        }
    }

    /// Poll-style check used by tests and synchronous hosts: if the deadline
    /// has passed, disarm and return the payload.
    pub fn take_if_elapsed(&mut self) -> Option<T> {
        let elapsed = self
            .armed
            .as_ref()
            .is_some_and(|armed| armed.sleep.deadline() <= Instant::now());
        if elapsed {
            self.cancel()
        } else {
            None
        }
    }
}

impl<T> Default for ScopedTimer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ScopedTimer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedTimer")
            .field("delay", &self.delay())
            .field("payload", &self.payload())
            .finish()
    }
}
