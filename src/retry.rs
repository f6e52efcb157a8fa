// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry logic with exponential backoff for outbound HTTP calls.
//!
//! Only transport-level failures (connection errors, 429, 5xx) are retried,
//! and callers whose request must not be applied twice narrow that further
//! with [`retry_http_call_when`]. Rejections by the provider are returned
//! immediately, and nothing above the HTTP clients retries: the manager
//! propagates every failure unmodified.

use crate::dns_errors::{IpDiscoveryError, ProviderError};
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// HTTP retry initial interval (50ms)
const HTTP_INITIAL_INTERVAL_MILLIS: u64 = 50;

/// HTTP retry maximum interval (10 seconds)
const HTTP_MAX_INTERVAL_SECS: u64 = 10;

/// Backoff multiplier (exponential growth factor)
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Randomization factor to prevent thundering herd (±10%)
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// Errors that know whether repeating the failed call can help.
pub trait Transient {
    /// Returns true if the call may succeed when repeated.
    fn is_transient(&self) -> bool;
}

impl Transient for ProviderError {
    fn is_transient(&self) -> bool {
        ProviderError::is_transient(self)
    }
}

impl Transient for IpDiscoveryError {
    fn is_transient(&self) -> bool {
        IpDiscoveryError::is_transient(self)
    }
}

/// Simple exponential backoff implementation.
///
/// Provides exponential backoff with randomization (jitter) to prevent thundering herd.
#[derive(Debug)]
pub struct ExponentialBackoff {
    /// Current interval duration
    pub current_interval: Duration,
    /// Maximum interval duration
    pub max_interval: Duration,
    /// Maximum total elapsed time
    pub max_elapsed_time: Duration,
    /// Backoff multiplier (typically 2.0 for doubling)
    pub multiplier: f64,
    /// Randomization factor (e.g., 0.1 for ±10%)
    pub randomization_factor: f64,
    /// Start time for tracking total elapsed time
    start_time: Instant,
}

impl ExponentialBackoff {
    /// Get the next backoff interval, or None if max elapsed time exceeded.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.start_time.elapsed() >= self.max_elapsed_time {
            return None;
        }

        let interval = self.current_interval;
        let jittered = self.apply_jitter(interval);

        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);

        Some(jittered)
    }

    fn apply_jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 {
            return interval;
        }

        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;

        let jittered = rand::rng().random_range((secs - delta)..=(secs + delta));

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Create exponential backoff configuration for HTTP API retries.
///
/// # Configuration
///
/// - **Initial interval**: 50ms
/// - **Max interval**: 10 seconds
/// - **Max elapsed time**: `max_elapsed` (zero disables retries)
/// - **Multiplier**: 2.0 (exponential growth)
/// - **Randomization**: ±10% (prevents thundering herd)
#[must_use]
pub fn http_backoff(max_elapsed: Duration) -> ExponentialBackoff {
    ExponentialBackoff {
        current_interval: Duration::from_millis(HTTP_INITIAL_INTERVAL_MILLIS),
        max_interval: Duration::from_secs(HTTP_MAX_INTERVAL_SECS),
        max_elapsed_time: max_elapsed,
        multiplier: BACKOFF_MULTIPLIER,
        randomization_factor: RANDOMIZATION_FACTOR,
        start_time: Instant::now(),
    }
}

/// Retry an HTTP call with exponential backoff.
///
/// Retries while the error is [`Transient`] and the backoff budget lasts,
/// then returns the last error unchanged.
///
/// # Errors
///
/// Returns the first permanent error, or the last transient one once
/// `max_elapsed` has been spent.
pub async fn retry_http_call<T, E, F, Fut>(
    operation: F,
    operation_name: &str,
    max_elapsed: Duration,
) -> Result<T, E>
where
    E: Transient + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_http_call_when(operation, operation_name, max_elapsed, E::is_transient).await
}

/// Retry an HTTP call with exponential backoff while `should_retry` accepts the error.
///
/// Calls that must not be applied twice pass a stricter predicate than
/// [`Transient::is_transient`].
///
/// # Errors
///
/// Returns the first error `should_retry` refuses, or the last one once
/// `max_elapsed` has been spent.
pub async fn retry_http_call_when<T, E, F, Fut, P>(
    mut operation: F,
    operation_name: &str,
    max_elapsed: Duration,
    should_retry: P,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut backoff = http_backoff(max_elapsed);
    let start_time = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        "HTTP call succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) if !should_retry(&e) => {
                return Err(e);
            }
            Err(e) => {
                if let Some(duration) = backoff.next_backoff() {
                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        retry_after = ?duration,
                        error = %e,
                        "Retryable HTTP error, will retry"
                    );
                    tokio::time::sleep(duration).await;
                } else {
                    if !max_elapsed.is_zero() {
                        error!(
                            operation = operation_name,
                            attempt = attempt,
                            elapsed = ?start_time.elapsed(),
                            error = %e,
                            "Backoff exhausted, giving up"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
