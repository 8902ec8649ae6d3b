//! `LLMError` (spec.md §4.5/§7), grounded on
//! `vtcode-core/src/llm/provider/provider_trait.rs::LLMError`'s
//! Authentication/RateLimit/InvalidRequest/Network/Provider split.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum LLMError {
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("rate limit exceeded")]
    RateLimit,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("provider error (status {status:?}): {message}")]
    Provider { status: Option<u16>, message: String },
    #[error("cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for LLMError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            LLMError::Network(e.to_string())
        } else {
            LLMError::Network(e.to_string())
        }
    }
}

impl From<LLMError> for crate::eval::InterpError {
    fn from(e: LLMError) -> Self {
        crate::eval::InterpError::external(e.to_string())
    }
}
