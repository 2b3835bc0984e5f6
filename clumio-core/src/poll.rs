//! Poll - Wait for an asynchronously converging backend condition
//!
//! [`poll_until`] invokes a check function on a fixed tick cadence until it
//! reports a terminal outcome, the timeout elapses, or the caller cancels.
//! Checks never overlap: the next tick is only awaited once the previous
//! check has been evaluated.

use std::future::Future;
use std::time::Duration;

use log::debug;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Default delay between two checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default upper bound for a whole poll
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(300);

/// Result of a single check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// Condition not reached yet, check again on the next tick
    Pending,
    /// Condition reached, carrying the terminal payload
    Success(T),
    /// Condition can never be reached
    Failed(String),
}

/// Lifecycle of a poll. Every state but `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Pending,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl PollState {
    pub fn is_terminal(self) -> bool {
        self != PollState::Pending
    }
}

/// Errors returned by [`poll_until`]
#[derive(Debug, thiserror::Error)]
pub enum PollError<E> {
    /// The check's own query failed; not retried
    #[error("{0}")]
    Api(E),

    /// The condition reported a permanent failure
    #[error("{0}")]
    TerminalFailure(String),

    #[error("timed out after {timeout:?} waiting for {target}")]
    Timeout { target: String, timeout: Duration },

    #[error("cancelled while waiting for {target}")]
    Cancelled { target: String },

    #[error("invalid poll configuration: {0}")]
    InvalidConfig(String),
}

impl<E> PollError<E> {
    /// Terminal state this error corresponds to
    pub fn state(&self) -> PollState {
        match self {
            PollError::Api(_) | PollError::TerminalFailure(_) | PollError::InvalidConfig(_) => {
                PollState::Failed
            }
            PollError::Timeout { .. } => PollState::TimedOut,
            PollError::Cancelled { .. } => PollState::Cancelled,
        }
    }
}

/// Interval and timeout shared by every poll of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl PollConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Build a request for a given target
    pub fn request(&self, target: impl Into<String>) -> PollRequest {
        PollRequest {
            target: target.into(),
            interval: self.interval,
            timeout: self.timeout,
        }
    }
}

/// A single poll, owned by the calling operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    /// Human readable target (e.g. "task 1234"), used in errors and logs
    pub target: String,
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollRequest {
    fn validate<E>(&self) -> Result<(), PollError<E>> {
        if self.interval.is_zero() {
            return Err(PollError::InvalidConfig(
                "interval must be greater than zero".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(PollError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Invoke `check` every `request.interval` until it returns a terminal outcome.
///
/// The first check happens one interval after the call. A check error or a
/// [`PollOutcome::Failed`] ends the poll immediately. Cancellation and the
/// deadline are only observed between checks, so a check already in flight
/// always completes and its outcome is honored.
pub async fn poll_until<T, E, F, Fut>(
    request: &PollRequest,
    cancel: &CancellationToken,
    mut check: F,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollOutcome<T>, E>>,
{
    request.validate()?;

    let start = Instant::now();
    let deadline_at = start
        .checked_add(request.timeout)
        .ok_or_else(|| PollError::InvalidConfig("timeout is out of range".to_string()))?;
    let first_tick = start
        .checked_add(request.interval)
        .ok_or_else(|| PollError::InvalidConfig("interval is out of range".to_string()))?;
    let deadline = tokio::time::sleep_until(deadline_at);
    tokio::pin!(deadline);

    let mut ticker = tokio::time::interval_at(first_tick, request.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut attempts: u32 = 0;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("poll for {} cancelled after {} attempts", request.target, attempts);
                return Err(PollError::Cancelled {
                    target: request.target.clone(),
                });
            }
            _ = &mut deadline => {
                debug!("poll for {} timed out after {} attempts", request.target, attempts);
                return Err(PollError::Timeout {
                    target: request.target.clone(),
                    timeout: request.timeout,
                });
            }
            _ = ticker.tick() => {}
        }

        attempts += 1;
        match check().await {
            Ok(PollOutcome::Pending) => {
                debug!("{} not ready (attempt {})", request.target, attempts);
            }
            Ok(PollOutcome::Success(value)) => {
                debug!(
                    "{} ready after {} attempts ({:?})",
                    request.target,
                    attempts,
                    start.elapsed()
                );
                return Ok(value);
            }
            Ok(PollOutcome::Failed(reason)) => {
                debug!("{} failed: {}", request.target, reason);
                return Err(PollError::TerminalFailure(reason));
            }
            Err(err) => return Err(PollError::Api(err)),
        }
    }
}
