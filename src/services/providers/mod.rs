//! Model backend abstraction
//!
//! Every backend (the live HTTP API, scripted or fault-injecting test doubles)
//! implements the same single-shot call. Retry, timeout enforcement and
//! memoization live in the invoker and are shared by all of them.

use std::time::Duration;

pub mod anthropic;

/// Classified failure of a single model call
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("model call timed out")]
    Timeout,

    #[error("transient model failure ({}): {message}", describe_status(.code))]
    Transient { code: Option<u16>, message: String },

    #[error("permanent model failure: {0}")]
    Permanent(String),
}

pub(crate) fn describe_status(code: &Option<u16>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status".to_string(),
    }
}

impl BackendError {
    /// Whether the invoker may try the call again
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Timeout | BackendError::Transient { .. })
    }

    /// Classifies an HTTP status reported by the model service
    pub fn from_status(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            429 | 500 | 502 | 503 | 504 | 529 => BackendError::Transient {
                code: Some(code),
                message,
            },
            _ => BackendError::Permanent(format!("status {}: {}", code, message)),
        }
    }
}

/// Trait for generative model backends
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ModelBackend: Send + Sync {
    /// Sends `prompt` to `model_id` and returns the raw response text
    ///
    /// `timeout` is advisory for the transport; the invoker enforces it
    /// independently by cancelling the call.
    async fn complete(
        &self,
        prompt: &str,
        model_id: &str,
        timeout: Duration,
    ) -> Result<String, BackendError>;

    /// Backend name for logging and debugging
    fn name(&self) -> &'static str;
}
