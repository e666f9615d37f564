//! Error taxonomy shared by the transport, the orchestrator, and providers.

use thiserror::Error;

use super::types::CaptchaSolution;

/// Common result type returned by captcha providers.
pub type CaptchaResult = Result<CaptchaSolution, CaptchaError>;

/// Failure raised by a [`TaskHttpClient`](super::TaskHttpClient) implementation.
#[derive(Debug, Error)]
pub enum TaskHttpClientError {
    #[error("http transport error: {0}")]
    Transport(String),
    #[error("unexpected http status {status}")]
    Status { status: u16 },
}

/// Errors surfaced by captcha providers and the task orchestrator.
#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("captcha provider misconfigured: {0}")]
    Configuration(String),
    #[error("invalid captcha payload: {0}")]
    InvalidPayload(String),
    #[error("captcha transport failed: {0}")]
    Transport(String),
    #[error("malformed captcha service response: {0}")]
    Decode(String),
    #[error("{code}: {description}")]
    Remote { code: String, description: String },
    #[error("max tries exceeded after {attempts} polls")]
    MaxRetriesExceeded { attempts: usize },
    #[error("captcha solving cancelled")]
    Cancelled,
    #[error("{provider} does not implement {operation}")]
    NotImplemented {
        provider: &'static str,
        operation: &'static str,
    },
}

impl CaptchaError {
    pub fn not_implemented(provider: &'static str, operation: &'static str) -> Self {
        Self::NotImplemented {
            provider,
            operation,
        }
    }

    /// The remote service explicitly rejected the task.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The poll budget ran out while the task was still pending.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::MaxRetriesExceeded { .. })
    }
}

impl From<TaskHttpClientError> for CaptchaError {
    fn from(err: TaskHttpClientError) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for CaptchaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
