//! Retrying transient failures with jittered exponential backoff.
//!
//! # Design
//! `RetryingTransport` wraps any `Transport`. Attempts run strictly one after
//! another. A network failure or a status listed in
//! `RetryConfig::retryable_statuses` earns another attempt until
//! `max_attempts` is spent; then the last response or error is returned
//! unchanged. Every other status, 4xx above all, is returned after a single
//! attempt since resending the same request cannot change the answer.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::backoff::Backoff;
use crate::config::{ClientConfig, ResponseHook, RetryConfig};
use crate::context::Context;
use crate::error::{ClientError, Result, TransportError};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

/// How often a call waiting on an in-flight attempt looks at its context.
const CANCEL_POLL: Duration = Duration::from_millis(10);

/// A `Transport` with a retry policy and backoff schedule.
#[derive(Clone)]
pub struct RetryingTransport {
    inner: Arc<dyn Transport>,
    backoff: Arc<Backoff>,
    retry: RetryConfig,
    timeout: Duration,
    hook: Option<ResponseHook>,
}

impl RetryingTransport {
    pub fn new(inner: Arc<dyn Transport>, backoff: Arc<Backoff>, config: &ClientConfig) -> Self {
        Self {
            inner,
            backoff,
            retry: config.retry.clone(),
            timeout: config.timeout,
            hook: config.response_hook.clone(),
        }
    }

    /// Send `request` until it succeeds, fails permanently or the attempt
    /// budget runs out. The returned response may still carry an error status.
    pub fn send(&self, ctx: &Context, request: &HttpRequest) -> Result<HttpResponse> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            ctx.check()?;
            attempt += 1;

            let started = Instant::now();
            let outcome = self.attempt(ctx, request, ctx.attempt_timeout(self.timeout))?;
            let elapsed = started.elapsed();

            let retryable = match &outcome {
                Ok(response) => {
                    if let Some(hook) = &self.hook {
                        hook(response, elapsed);
                    }
                    self.retry.is_retryable_status(response.status)
                }
                Err(err) => {
                    tracing::warn!(
                        method = %request.method,
                        url = %request.url,
                        attempt,
                        error = %err,
                        "request failed"
                    );
                    err.is_retryable()
                }
            };

            if !retryable {
                return outcome.map_err(ClientError::from);
            }
            if attempt >= max_attempts {
                tracing::warn!(
                    method = %request.method,
                    url = %request.url,
                    attempts = attempt,
                    "giving up after exhausting retries"
                );
                return outcome.map_err(ClientError::from);
            }

            let wait = self
                .backoff
                .duration(self.retry.wait_min, self.retry.wait_max, attempt - 1);
            if let Ok(response) = &outcome {
                tracing::debug!(
                    method = %request.method,
                    url = %request.url,
                    status = response.status,
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    "retrying request"
                );
            }
            ctx.sleep(wait)?;
        }
    }
}

impl RetryingTransport {
    /// One exchange, abandoned as soon as `ctx` is cancelled or expires.
    ///
    /// Without a cancel token the exchange runs inline, bounded by `timeout`.
    /// With one it runs on a worker thread; an abandoned worker finishes or
    /// times out on its own and drops its connection.
    fn attempt(
        &self,
        ctx: &Context,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<std::result::Result<HttpResponse, TransportError>> {
        if !ctx.is_cancellable() {
            return Ok(self.inner.execute(request, timeout));
        }

        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let owned = request.clone();
        thread::Builder::new()
            .name("beaker-attempt".to_string())
            .spawn(move || {
                // The caller may have stopped listening.
                let _ = tx.send(inner.execute(&owned, timeout));
            })
            .map_err(|e| TransportError::Network(format!("failed to start request: {e}")))?;

        loop {
            match rx.recv_timeout(CANCEL_POLL) {
                Ok(outcome) => return Ok(outcome),
                Err(RecvTimeoutError::Timeout) => {
                    if let Err(err) = ctx.check() {
                        tracing::debug!(method = %request.method, url = %request.url, "abandoning in-flight request");
                        return Err(err);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Ok(Err(TransportError::Request(
                        "request worker exited without a result".to_string(),
                    )))
                }
            }
        }
    }
}

impl std::fmt::Debug for RetryingTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingTransport")
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
