use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::db::{CacheKey, ResponseCache};
use crate::services::providers::{describe_status, BackendError, ModelBackend};

pub const MAX_ATTEMPTS: u32 = 3;
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
pub const MAX_BACKOFF: Duration = Duration::from_secs(4);

/// Failure surfaced by the invoker once retries are spent or not allowed
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InvocationError {
    #[error("INVOCATION_TIMEOUT: model call timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error(
        "INVOCATION_TRANSIENT({}): {message} (after {attempts} attempt(s))",
        describe_status(.code)
    )]
    Transient {
        code: Option<u16>,
        message: String,
        attempts: u32,
    },

    #[error("INVOCATION_PERMANENT: {message}")]
    Permanent { message: String },
}

impl InvocationError {
    fn from_backend(error: BackendError, attempts: u32) -> Self {
        match error {
            BackendError::Timeout => InvocationError::Timeout { attempts },
            BackendError::Transient { code, message } => InvocationError::Transient {
                code,
                message,
                attempts,
            },
            BackendError::Permanent(message) => InvocationError::Permanent { message },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
        }
    }
}

/// Bounded (attempt, delay) state for the retry loop
#[derive(Debug, Clone, Copy)]
struct RetrySchedule {
    attempt: u32,
    delay: Duration,
    policy: RetryPolicy,
}

impl RetrySchedule {
    fn new(policy: RetryPolicy) -> Self {
        Self {
            attempt: 1,
            delay: policy.initial_backoff.min(policy.max_backoff),
            policy,
        }
    }

    /// Moves to the next attempt and returns how long to wait before it,
    /// or `None` once `max_attempts` have been made.
    fn advance(&mut self) -> Option<Duration> {
        if self.attempt >= self.policy.max_attempts {
            return None;
        }

        let wait = self.delay;
        self.attempt += 1;
        self.delay = (self.delay * 2).min(self.policy.max_backoff);
        Some(wait)
    }
}

/// Deterministic fingerprint of (model id, prompt), hex-encoded SHA-256
pub fn content_digest(model_id: &str, prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(prompt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Resilient, memoized access to a model backend
pub struct ModelInvoker {
    backend: Arc<dyn ModelBackend>,
    cache: Arc<dyn ResponseCache>,
    timeout: Duration,
    cache_ttl: Duration,
    policy: RetryPolicy,
}

impl ModelInvoker {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        cache: Arc<dyn ResponseCache>,
        timeout: Duration,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            backend,
            cache,
            timeout,
            cache_ttl,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the model's raw text for `prompt`
    ///
    /// A cached response within its TTL is returned without calling the
    /// backend. Otherwise the backend is called with retries; only successful
    /// responses are cached. The text is never inspected here.
    pub async fn invoke(&self, prompt: &str, model_id: &str) -> Result<String, InvocationError> {
        let digest = content_digest(model_id, prompt);
        let key = CacheKey::ModelResponse(digest);

        match self.cache.get(&key).await {
            Ok(Some(text)) => {
                tracing::debug!(key = %key, "Model response cache hit");
                return Ok(text);
            }
            Ok(None) => tracing::debug!(key = %key, "Model response cache miss"),
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Response cache lookup failed, calling model")
            }
        }

        let text = self.call_with_retry(prompt, model_id).await?;

        if let Err(e) = self.cache.put(&key, &text, self.cache_ttl).await {
            tracing::warn!(error = %e, key = %key, "Failed to memoize model response");
        }

        Ok(text)
    }

    async fn call_with_retry(&self, prompt: &str, model_id: &str) -> Result<String, InvocationError> {
        let mut schedule = RetrySchedule::new(self.policy);

        loop {
            // Dropping the pending call on elapse cancels it
            let outcome = tokio::time::timeout(
                self.timeout,
                self.backend.complete(prompt, model_id, self.timeout),
            )
            .await
            .unwrap_or(Err(BackendError::Timeout));

            let error = match outcome {
                Ok(text) => {
                    tracing::debug!(attempt = schedule.attempt, "Model call succeeded");
                    return Ok(text);
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                tracing::error!(
                    attempt = schedule.attempt,
                    error = %error,
                    "Model call failed permanently"
                );
                return Err(InvocationError::from_backend(error, schedule.attempt));
            }

            let attempt = schedule.attempt;
            match schedule.advance() {
                Some(delay) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Model call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    tracing::error!(
                        attempts = attempt,
                        error = %error,
                        "Model call retries exhausted"
                    );
                    return Err(InvocationError::from_backend(error, attempt));
                }
            }
        }
    }
}
