//! Upstream chat-completion adapter.
//!
//! - [`glm`]: HTTP client and wire types for the GLM API
//! - [`assistant`]: prompt-in, outcome-out adapter used by the server

pub mod assistant;
pub mod glm;

pub use assistant::{AskOutcome, Assistant, ChatBackend};
pub use glm::{ChatCompletionResponse, ChatMessage, GlmClient, UpstreamError};
