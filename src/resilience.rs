//! Shared resilience policies: retry with exponential backoff, a unified
//! error-handling wrapper, isolated execution of independent operations,
//! and a circuit breaker.
//!
//! Both the entropy source and the ledger client are built on these
//! primitives, which is what guarantees that a failure in one external
//! dependency cannot block or corrupt work against the other.

use crate::errors::{ArcadeResult, ClassifiedError};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Retry tuning for [`retry_with_backoff`].
#[derive(Debug, Clone)]
pub struct RetryOptions {
    /// Total attempts, including the first one.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryOptions {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Default::default()
        }
    }

    /// Delay before the attempt following failure number `attempt`
    /// (zero-based): `min(base * multiplier^attempt, max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ms = self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(ms as u64).min(self.max_delay)
    }
}

/// Attempt `operation` up to `options.max_retries` times with exponential
/// backoff between attempts.
///
/// `on_retry(attempt, error)` is invoked before each wait. The last error
/// is returned when `should_retry` rejects it or attempts are exhausted.
pub async fn retry_with_backoff<T, F, Fut, S, R>(
    mut operation: F,
    options: &RetryOptions,
    should_retry: S,
    mut on_retry: R,
) -> ArcadeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ArcadeResult<T>>,
    S: Fn(&ClassifiedError) -> bool,
    R: FnMut(u32, &ClassifiedError),
{
    let max_attempts = options.max_retries.max(1);
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= max_attempts || !should_retry(&err) {
                    return Err(err);
                }
                let delay = options.delay_for(attempt - 1);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "attempt failed, backing off before retry"
                );
                on_retry(attempt, &err);
                sleep(delay).await;
            }
        }
    }
}

/// Retry only transient (retryable-classified) failures.
pub async fn retry_transient<T, F, Fut>(operation: F, options: &RetryOptions) -> ArcadeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ArcadeResult<T>>,
{
    retry_with_backoff(operation, options, |e| e.is_retryable(), |_, _| {}).await
}

/// Policy for [`with_error_handling`].
pub struct ErrorPolicy<T> {
    /// Operation label, attached to errors and logs.
    pub context: String,
    /// Retry transient failures before surfacing.
    pub retry: bool,
    pub retry_options: RetryOptions,
    /// When supplied, returned instead of propagating the error.
    pub fallback: Option<T>,
    pub on_error: Option<Box<dyn Fn(&ClassifiedError) + Send + Sync>>,
}

impl<T> ErrorPolicy<T> {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            retry: false,
            retry_options: RetryOptions::default(),
            fallback: None,
            on_error: None,
        }
    }

    pub fn with_retry(mut self, options: RetryOptions) -> Self {
        self.retry = true;
        self.retry_options = options;
        self
    }

    pub fn with_fallback(mut self, fallback: T) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_on_error(mut self, on_error: impl Fn(&ClassifiedError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }
}

/// Unified wrapper: optional transient-failure retry, one structured log
/// per failure, optional callback, and fallback substitution.
///
/// Errors are never swallowed silently; even the fallback path emits a
/// structured log of the original error.
pub async fn with_error_handling<T, F, Fut>(operation: F, policy: ErrorPolicy<T>) -> ArcadeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ArcadeResult<T>>,
{
    let result = if policy.retry {
        retry_transient(operation, &policy.retry_options).await
    } else {
        let mut operation = operation;
        operation().await
    };

    match result {
        Ok(value) => Ok(value),
        Err(err) => {
            let err = err.with_context(policy.context.clone());
            tracing::error!(
                kind = %err.kind,
                severity = %err.severity,
                context = %policy.context,
                error = %err.message,
                "operation failed"
            );
            if let Some(on_error) = &policy.on_error {
                on_error(&err);
            }
            match policy.fallback {
                Some(fallback) => {
                    tracing::warn!(context = %policy.context, "substituting configured fallback value");
                    Ok(fallback)
                }
                None => Err(err),
            }
        }
    }
}

/// Options for [`execute_independently`].
#[derive(Debug, Clone)]
pub struct IndependentOptions {
    /// When false, the first failure aborts the remaining operations.
    pub continue_on_error: bool,
    /// Per-operation deadline.
    pub timeout: Option<Duration>,
}

impl Default for IndependentOptions {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            timeout: None,
        }
    }
}

/// Outcome of one operation run by [`execute_independently`].
#[derive(Debug)]
pub struct OperationOutcome {
    pub index: usize,
    pub result: ArcadeResult<serde_json::Value>,
}

impl OperationOutcome {
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run independent operations sequentially, capturing per-operation
/// success or failure. One operation failing never aborts the rest
/// unless `continue_on_error` is false.
///
/// This is the mechanism that structurally enforces isolation between
/// entropy generation and ledger submission: each is handed in as its
/// own operation and settles on its own.
pub async fn execute_independently<'a>(
    operations: Vec<BoxFuture<'a, ArcadeResult<serde_json::Value>>>,
    options: &IndependentOptions,
) -> Vec<OperationOutcome> {
    let mut outcomes = Vec::with_capacity(operations.len());

    for (index, operation) in operations.into_iter().enumerate() {
        let result = match options.timeout {
            Some(deadline) => match tokio::time::timeout(deadline, operation).await {
                Ok(result) => result,
                Err(_) => Err(ClassifiedError::timeout(format!(
                    "Operation {} timed out after {}ms",
                    index,
                    deadline.as_millis()
                ))),
            },
            None => operation.await,
        };

        let failed = result.is_err();
        if let Err(err) = &result {
            tracing::warn!(index, error = %err, "independent operation failed");
        }
        outcomes.push(OperationOutcome { index, result });

        if failed && !options.continue_on_error {
            break;
        }
    }

    outcomes
}

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    HalfOpen,
    Open,
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakerState::Closed => write!(f, "CLOSED"),
            BreakerState::HalfOpen => write!(f, "HALF_OPEN"),
            BreakerState::Open => write!(f, "OPEN"),
        }
    }
}

/// Snapshot of a breaker's state for diagnostics.
#[derive(Debug, Clone)]
pub struct CircuitBreakerState {
    pub state: BreakerState,
    pub failure_count: u32,
    /// Epoch ms after which the next attempt will be allowed, while open.
    pub next_attempt_at: Option<u64>,
}

struct BreakerInner {
    state: BreakerState,
    failure_count: u32,
    opened_at: Option<Instant>,
    next_attempt_at: Option<u64>,
}

/// Failure-protection state machine guarding one external dependency.
///
/// CLOSED counts consecutive failures and trips to OPEN at the
/// threshold. OPEN rejects immediately until the reset timeout elapses,
/// then admits a single probe (HALF_OPEN). The probe's outcome either
/// closes the breaker or re-opens it for another window.
///
/// State transitions are guarded by a mutex; the read-check-then-mutate
/// sequence must be atomic under a multi-threaded runtime.
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                failure_count: 0,
                opened_at: None,
                next_attempt_at: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Move OPEN to HALF_OPEN once the reset timeout has elapsed.
    fn poll_transition(&self, inner: &mut BreakerInner) {
        if inner.state == BreakerState::Open {
            if let Some(opened_at) = inner.opened_at {
                if opened_at.elapsed() >= self.reset_timeout {
                    tracing::info!("circuit breaker entering half-open probe");
                    inner.state = BreakerState::HalfOpen;
                }
            }
        }
    }

    /// Run `operation` under the breaker. While open and before the
    /// reset timeout elapses, fails immediately without invoking it.
    pub async fn execute<T, F, Fut>(&self, operation: F) -> ArcadeResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ArcadeResult<T>>,
    {
        {
            let mut inner = self.lock();
            self.poll_transition(&mut inner);
            if inner.state == BreakerState::Open {
                return Err(ClassifiedError::connection("Service temporarily unavailable")
                    .with_cause("circuit breaker open"));
            }
        }

        match operation().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                self.on_failure();
                Err(err)
            }
        }
    }

    fn on_success(&self) {
        let mut inner = self.lock();
        if inner.state != BreakerState::Closed {
            tracing::info!("circuit breaker closed after successful probe");
        }
        inner.state = BreakerState::Closed;
        inner.failure_count = 0;
        inner.opened_at = None;
        inner.next_attempt_at = None;
    }

    fn on_failure(&self) {
        let mut inner = self.lock();
        inner.failure_count += 1;
        let should_open =
            inner.state == BreakerState::HalfOpen || inner.failure_count >= self.failure_threshold;
        if should_open {
            inner.state = BreakerState::Open;
            inner.opened_at = Some(Instant::now());
            inner.next_attempt_at =
                Some(crate::types::current_timestamp_ms() + self.reset_timeout.as_millis() as u64);
            tracing::warn!(
                failures = inner.failure_count,
                reset_ms = self.reset_timeout.as_millis() as u64,
                "circuit breaker opened"
            );
        }
    }

    pub fn state(&self) -> CircuitBreakerState {
        let mut inner = self.lock();
        self.poll_transition(&mut inner);
        CircuitBreakerState {
            state: inner.state,
            failure_count: inner.failure_count,
            next_attempt_at: inner.next_attempt_at,
        }
    }

    /// Manual reset to CLOSED.
    pub fn reset(&self) {
        self.on_success();
    }
}
