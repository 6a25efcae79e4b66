//! Remote request boundary
//!
//! Every call to the cloud goes through [`ProviderClient::request`] as
//! `(service, method, params)` with JSON in and out. Failures carry a code,
//! message and optional HTTP status so they can be classified as retryable or
//! fatal, and [`with_retry`] replays retryable failures with backoff.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::warn;

/// Transport to the provider API
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Provider name, e.g. "aws"
    fn name(&self) -> &str;

    /// Region requests are sent to
    fn region(&self) -> &str;

    async fn request(
        &self,
        service: &str,
        method: &str,
        params: Value,
    ) -> Result<Value, RemoteError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Throttling, transient server or network trouble
    Retryable,
    /// Bad input, missing permissions, missing resources
    Fatal,
}

/// Error returned by the provider API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub code: String,
    pub message: String,
    pub status_code: Option<u16>,
}

const RETRYABLE_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "RequestTimeout",
    "RequestTimeoutException",
    "ServiceUnavailable",
    "InternalFailure",
    "NetworkingError",
    "TimeoutError",
    "OperationInProgressException",
    "ResourceConflictException",
    "ConflictException",
    "TooManyUpdates",
];

/// Stack operations rejected because another one is still running
static IN_PROGRESS_STATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"is in [A-Z_]+_IN_PROGRESS state and can ?not be updated")
        .expect("valid in-progress pattern")
});

impl RemoteError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status_code: None,
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn class(&self) -> ErrorClass {
        match self.status_code {
            Some(403) => return ErrorClass::Fatal,
            Some(409) | Some(429) => return ErrorClass::Retryable,
            _ => {}
        }
        if RETRYABLE_CODES.contains(&self.code.as_str())
            || IN_PROGRESS_STATE.is_match(&self.message)
        {
            return ErrorClass::Retryable;
        }
        match self.status_code {
            Some(status) if status >= 500 => ErrorClass::Retryable,
            _ => ErrorClass::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Retryable
    }

    /// CloudFormation reports a missing stack as a validation error
    pub fn is_missing_stack(&self) -> bool {
        self.message.contains("does not exist")
    }

    pub fn is_no_op_update(&self) -> bool {
        self.message.contains("No updates are to be performed")
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(status) => write!(f, "{} ({}): {}", self.code, status, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Backoff for retryable request failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Attempts including the first one
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 1.0,
        }
    }
}

impl RetryConfig {
    /// `retries` extra attempts with a fixed `delay` between them
    pub fn fixed(retries: u32, delay: Duration) -> Self {
        Self {
            max_attempts: retries + 1,
            initial_delay: delay,
            max_delay: delay,
            backoff_multiplier: 1.0,
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let secs = self.initial_delay.as_secs_f64() * factor;
        let max = self.max_delay.as_secs_f64();
        if !secs.is_finite() || secs >= max {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }
}

/// Runs `op` until it succeeds, fails fatally, or attempts run out.
///
/// The caller sees either the first success or the last error.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    label: &str,
    mut op: F,
) -> Result<T, RemoteError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt + 1 < config.max_attempts => {
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    request = label,
                    attempt = attempt + 1,
                    max_attempts = config.max_attempts,
                    error = %err,
                    "retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// [`ProviderClient::request`] wrapped in [`with_retry`]
pub async fn request_with_retry(
    client: &dyn ProviderClient,
    config: &RetryConfig,
    service: &str,
    method: &str,
    params: Value,
) -> Result<Value, RemoteError> {
    let label = format!("{service}.{method}");
    with_retry(config, &label, || client.request(service, method, params.clone())).await
}
