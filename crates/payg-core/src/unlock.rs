//! Unlock dialog state machine.
//!
//! Drives the "enter a new code" dialog shown on the lock screen once credit
//! has run out. The flow owns the typed code, the status and the error
//! message; the host owns the widgets and the D-Bus call.
//!
//! ## State Transitions
//!
//! ```text
//!                 submit()                Ok
//! NotVerifying ───────────► Verifying ─────────► Succeeded
//!      ▲  ▲                   │   │
//!      │  │ input             │   │ TooManyAttempts
//!      │  └──── Failed ◄──────┘   ▼
//!      └──────────────────── TooManyAttempts   (rate-limit timer)
//! ```
//!
//! `cancel()` from any state closes the flow. A completion arriving after
//! that is discarded; the in-flight call itself is never aborted.

use serde::{Deserialize, Serialize};

use crate::config::UnlockConfig;
use crate::error::PaygError;
use crate::format::plural;
use crate::ipc::PaygBackend;
use crate::timer::ScopedTimer;
use crate::tracker::ExpiryTracker;

pub const MSG_INVALID_CODE: &str = "Invalid code. Please try again.";
pub const MSG_CODE_ALREADY_USED: &str = "Code already used. Please enter a new code.";
pub const MSG_TIMED_OUT: &str = "Time exceeded while verifying the code";
pub const MSG_UNKNOWN_ERROR: &str = "Unknown error";
pub const MSG_TOO_MANY_ATTEMPTS_FEW_SECONDS: &str =
    "Too many attempts. Try again in a few seconds.";
pub const MSG_HELP_MAIN: &str = "Don’t have an unlock code? That’s OK!";
pub const MSG_HELP_SUB: &str = "Talk to your sales representative to purchase a new code.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockStatus {
    NotVerifying,
    Verifying,
    Failed,
    TooManyAttempts,
    Succeeded,
}

/// Why the dialog was dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    Button,
    Escape,
    IdleTimeout,
}

/// Outcomes reported to the lock screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnlockEvent {
    /// The daemon accepted the code; the screen may unlock.
    Succeeded,
    /// The dialog was dismissed without unlocking.
    Cancelled { reason: CancelReason },
}

/// A code ready to be sent with `AddCode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSubmission {
    /// Matches the completion back to this submission.
    pub attempt: u64,
    pub code: String,
}

#[derive(Debug)]
pub struct UnlockFlow {
    config: UnlockConfig,
    status: UnlockStatus,
    code: String,
    error_message: Option<String>,
    cancelled: bool,
    attempt: u64,
    rate_limit_timer: ScopedTimer<()>,
}

impl UnlockFlow {
    pub fn new(config: UnlockConfig) -> Self {
        Self {
            config,
            status: UnlockStatus::NotVerifying,
            code: String::new(),
            error_message: None,
            cancelled: false,
            attempt: 0,
            rate_limit_timer: ScopedTimer::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> UnlockStatus {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Closed flows accept no more input.
    pub fn is_closed(&self) -> bool {
        self.cancelled || self.status == UnlockStatus::Succeeded
    }

    pub fn entry_enabled(&self) -> bool {
        !self.is_closed()
            && !matches!(
                self.status,
                UnlockStatus::Verifying | UnlockStatus::TooManyAttempts
            )
    }

    pub fn submit_enabled(&self) -> bool {
        self.entry_enabled() && self.code_is_complete()
    }

    pub fn spinner_visible(&self) -> bool {
        !self.cancelled && self.status == UnlockStatus::Verifying
    }

    pub fn rate_limit_timer_armed(&self) -> bool {
        self.rate_limit_timer.is_armed()
    }

    pub fn idle_timeout(&self) -> std::time::Duration {
        self.config.idle_timeout()
    }

    /// The two help lines shown under the code entry.
    ///
    /// Vendor overrides win. A contact is only named when both its name and
    /// number are configured; empty values count as unset.
    pub fn help_lines(&self) -> [String; 2] {
        let main = non_empty(&self.config.instructions_line1).unwrap_or(MSG_HELP_MAIN);
        let sub = match (
            non_empty(&self.config.instructions_line2),
            non_empty(&self.config.contact_name),
            non_empty(&self.config.contact_number),
        ) {
            (Some(line), _, _) => line.to_string(),
            (None, Some(name), Some(number)) => {
                format!("{MSG_HELP_SUB} Call or text {name} at {number}")
            }
            _ => MSG_HELP_SUB.to_string(),
        };
        [main.to_string(), sub]
    }

    fn code_is_complete(&self) -> bool {
        self.code.len() == self.config.code_length
    }

    // ── Input ────────────────────────────────────────────────────────

    /// Type one character. Only digits are accepted, up to the code length.
    pub fn push_char(&mut self, c: char) -> bool {
        if !self.entry_enabled() || !c.is_ascii_digit() || self.code.len() >= self.config.code_length {
            return false;
        }
        if self.status == UnlockStatus::Failed {
            self.status = UnlockStatus::NotVerifying;
        }
        self.code.push(c);
        true
    }

    pub fn delete_char(&mut self) -> bool {
        if !self.entry_enabled() {
            return false;
        }
        if self.status == UnlockStatus::Failed {
            self.status = UnlockStatus::NotVerifying;
        }
        self.code.pop().is_some()
    }

    // ── Verification ─────────────────────────────────────────────────

    /// Start verifying the typed code.
    ///
    /// Returns `None` (and sends nothing) unless the code is complete and
    /// the flow is accepting input.
    pub fn submit(&mut self) -> Option<CodeSubmission> {
        if !self.submit_enabled() {
            return None;
        }
        self.attempt += 1;
        self.status = UnlockStatus::Verifying;
        Some(CodeSubmission {
            attempt: self.attempt,
            code: self.code.clone(),
        })
    }

    /// Feed back the result of `AddCode` for `attempt`.
    pub fn complete(
        &mut self,
        attempt: u64,
        result: Result<(), PaygError>,
        tracker: &ExpiryTracker,
    ) -> Option<UnlockEvent> {
        if self.cancelled {
            tracing::debug!(attempt, "discarding code result for a closed dialog");
            return None;
        }
        if attempt != self.attempt || self.status != UnlockStatus::Verifying {
            tracing::debug!(attempt, "discarding stale code result");
            return None;
        }

        let event = match result {
            Ok(()) => {
                self.status = UnlockStatus::Succeeded;
                self.error_message = None;
                Some(UnlockEvent::Succeeded)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error adding PAYG code");
                self.process_error(&e, tracker);
                None
            }
        };

        self.code.clear();
        event
    }

    fn process_error(&mut self, error: &PaygError, tracker: &ExpiryTracker) {
        let message = match error {
            PaygError::TooManyAttempts => {
                let secs_left = tracker.rate_limit_secs_left();
                self.error_message = Some(self.rate_limit_message(secs_left));
                // Clear the state once the window has passed, at least a
                // second from now.
                let wait = secs_left.max(1).unsigned_abs();
                self.rate_limit_timer
                    .arm(std::time::Duration::from_secs(wait), ());
                self.status = UnlockStatus::TooManyAttempts;
                return;
            }
            PaygError::InvalidCode => MSG_INVALID_CODE,
            PaygError::CodeAlreadyUsed => MSG_CODE_ALREADY_USED,
            PaygError::TimedOut => MSG_TIMED_OUT,
            // Disabled should not happen here, but the user still needs to
            // see something.
            PaygError::Transport(_) | PaygError::Disabled | PaygError::Unknown(_) => {
                MSG_UNKNOWN_ERROR
            }
        };
        self.error_message = Some(message.to_string());
        self.status = UnlockStatus::Failed;
    }

    fn rate_limit_message(&self, secs_left: i64) -> String {
        let few_seconds = i64::try_from(self.config.few_seconds_threshold_secs).unwrap_or(i64::MAX);
        if secs_left > few_seconds {
            let minutes = secs_left.unsigned_abs().div_ceil(60);
            format!(
                "Too many attempts. Try again in {minutes} {}.",
                plural(minutes, "minute", "minutes")
            )
        } else {
            MSG_TOO_MANY_ATTEMPTS_FEW_SECONDS.to_string()
        }
    }

    /// The rate-limit window is over: accept codes again.
    pub fn rate_limit_expired(&mut self) {
        self.rate_limit_timer.cancel();
        if self.status == UnlockStatus::TooManyAttempts {
            self.status = UnlockStatus::NotVerifying;
            self.error_message = None;
        }
    }

    /// Wait for the rate-limit timer, then clear the rate-limited state.
    /// Pends forever while no rate limit is active.
    pub async fn rate_limit_cleared(&mut self) {
        self.rate_limit_timer.fired().await;
        self.rate_limit_expired();
    }

    /// Dismiss the dialog.
    pub fn cancel(&mut self, reason: CancelReason) -> Option<UnlockEvent> {
        if self.cancelled {
            return None;
        }
        tracing::debug!(?reason, "unlock dialog cancelled");
        self.cancelled = true;
        self.code.clear();
        self.rate_limit_timer.cancel();

        (self.status != UnlockStatus::Succeeded).then_some(UnlockEvent::Cancelled { reason })
    }

    /// Submit the typed code through `backend` and apply the result.
    ///
    /// The call is bounded by the configured add-code timeout.
    pub async fn verify<B>(&mut self, backend: &B, tracker: &ExpiryTracker) -> Option<UnlockEvent>
    where
        B: PaygBackend + ?Sized,
    {
        let submission = self.submit()?;
        let result = self.send(backend, &submission).await;
        self.complete(submission.attempt, result, tracker)
    }

    /// Call `AddCode` for `submission`, giving up after the configured
    /// add-code timeout with [`PaygError::TimedOut`].
    ///
    /// # Errors
    ///
    /// Returns the daemon's error, or `TimedOut` if it did not answer in time.
    pub async fn send<B>(&self, backend: &B, submission: &CodeSubmission) -> Result<(), PaygError>
    where
        B: PaygBackend + ?Sized,
    {
        tokio::time::timeout(
            self.config.add_code_timeout(),
            backend.add_code(&submission.code),
        )
        .await
        .unwrap_or_else(|elapsed| Err(elapsed.into()))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
