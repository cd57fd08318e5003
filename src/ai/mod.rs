//! # AI Analysis Client
//!
//! Task-specific wrappers around a chat-completion endpoint. Each task sends a
//! fixed system prompt and narrows the reply into a typed result; the rest of
//! the crate never sees raw model text except on the prose Q&A path.

pub mod client;
pub mod parse;
pub mod prompts;
pub mod schema;
pub mod transport;

use thiserror::Error;

pub use client::{AiClient, AiSlot, ChatReply};
pub use schema::{AnalysisResult, Confidence, TokenSafetyVerdict, Verdict, WalletInsight};
pub use transport::{AnthropicHttp, ChatRequest, ChatTransport};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AiError {
    /// No key configured; raised before any request is built
    #[error("{0}")]
    Config(String),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Parse(String),

    #[error("{0}")]
    Transport(String),
}

pub const MISSING_KEY_MESSAGE: &str = "Claude API key not configured. Please set it in settings.";
