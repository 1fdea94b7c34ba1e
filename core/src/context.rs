//! Deadlines and cancellation for blocking calls.
//!
//! Every network operation takes a `&Context`. The retry loop consults it
//! before each attempt, bounds each attempt's timeout by the remaining
//! deadline and wakes from backoff sleeps as soon as the token is cancelled.
//! A cancellable context also abandons an attempt already on the wire: the
//! call returns `Cancelled` at once and the exchange is left to time out.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{ClientError, Result};

/// Shared flag that stops every call observing it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel all calls holding this token. Idempotent.
    pub fn cancel(&self) {
        let (flag, wake) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block for up to `timeout`. Returns true if cancelled meanwhile.
    fn wait(&self, timeout: Duration) -> bool {
        let (flag, wake) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = wake
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// Deadline and cancellation signal for one logical operation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
}

impl Context {
    /// A context that never expires and cannot be cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Whether a cancel token is attached.
    pub fn is_cancellable(&self) -> bool {
        self.cancel.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, or `None` without one.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fail if the context is cancelled or past its deadline.
    pub fn check(&self) -> Result<()> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(ClientError::Cancelled);
        }
        if self.remaining() == Some(Duration::ZERO) {
            return Err(ClientError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Clamp a per-attempt timeout to the remaining deadline.
    pub fn attempt_timeout(&self, configured: Duration) -> Duration {
        match self.remaining() {
            Some(left) => configured.min(left),
            None => configured,
        }
    }

    /// Sleep for `duration`, waking early on cancellation.
    ///
    /// A sleep that would run past the deadline fails immediately instead of
    /// waiting for an attempt that could never start.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        if self.remaining().is_some_and(|left| left < duration) {
            return Err(ClientError::DeadlineExceeded);
        }
        match &self.cancel {
            Some(token) if token.wait(duration) => Err(ClientError::Cancelled),
            Some(_) => Ok(()),
            None => {
                std::thread::sleep(duration);
                Ok(())
            }
        }
    }
}
