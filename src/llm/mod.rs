//! LLM provider client (spec.md §4.5).

mod client;
mod error;
mod message;
mod streaming;

pub use client::{ChatCompletion, OpenAiCompatibleProvider, StreamCallbacks, StreamingChatCompletion};
pub use error::LLMError;
pub use message::{ChatResponse, ToolSchema, Usage};
pub use streaming::{parse_sse_line, SseEvent, ToolCallAccumulator};
