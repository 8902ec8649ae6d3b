//! Error kinds (spec.md §7), implemented as a `thiserror` enum per
//! SPEC_FULL.md §2.2 — grounded on
//! `vtcode-core/src/llm/provider/provider_trait.rs`'s `LLMError`.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum InterpError {
    #[error("parse error at {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("name error: {0}")]
    Name(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("arity error: expected {expected} argument(s), got {got}")]
    Arity { expected: usize, got: usize },

    #[error("domain error: {0}")]
    Domain(String),

    #[error("external error: {0}")]
    External(String),

    #[error("cancelled")]
    Cancelled,

    /// A break/continue/return signal escaped its expected frame (spec.md
    /// §4.1, §7 item 8, §9).
    #[error("control-flow signal escaped its frame: {0}")]
    Control(String),
}

impl InterpError {
    pub fn name(msg: impl Into<String>) -> Self {
        InterpError::Name(msg.into())
    }
    pub fn type_error(msg: impl Into<String>) -> Self {
        InterpError::Type(msg.into())
    }
    pub fn arity(expected: usize, got: usize) -> Self {
        InterpError::Arity { expected, got }
    }
    pub fn domain(msg: impl Into<String>) -> Self {
        InterpError::Domain(msg.into())
    }
    pub fn external(msg: impl Into<String>) -> Self {
        InterpError::External(msg.into())
    }
    pub fn parse(position: usize, msg: impl Into<String>) -> Self {
        InterpError::Parse {
            position,
            message: msg.into(),
        }
    }
}
