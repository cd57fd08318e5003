//! # Error Taxonomy
//!
//! Every failure the core can report to a UI surface. Read-only analysis
//! flows convert `Fetch`/`Api`/`Parse` failures into degraded results; the
//! swap pipeline surfaces `Bridge`/`Wallet` failures as hard errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ai::AiError;
use crate::explorer::FetchError;

/// Failures crossing a context boundary on the way to the page's wallet.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("No active tab found. Open a supported page and try again.")]
    NoActiveTab,

    #[error(
        "Could not reach the page script ({0}). Try: 1) refresh the page, \
         2) verify your wallet extension is installed and unlocked, \
         3) retry on a known-compatible site such as app.uniswap.org"
    )]
    ContentScriptUnreachable(String),

    #[error("Extension context invalidated. The extension was updated or reloaded, please refresh the page.")]
    ContextInvalidated,
}

/// Failures raised by the wallet provider or the transaction it was handed.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
pub enum WalletError {
    #[error("Wallet provider not detected")]
    NotDetected,

    #[error("No account found")]
    NoAccount,

    #[error("Please switch to {expected} in your wallet (current chain {actual})")]
    WrongChain { expected: String, actual: String },

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}

/// Umbrella error returned by orchestrator handlers.
#[derive(Debug, Error)]
pub enum SynthxError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Parse(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl SynthxError {
    pub fn validation(message: impl Into<String>) -> Self {
        SynthxError::Validation(message.into())
    }

    /// Stable machine-readable category, useful for UI branching and tests.
    pub fn kind(&self) -> &'static str {
        match self {
            SynthxError::Validation(_) => "validation",
            SynthxError::Config(_) => "config",
            SynthxError::Fetch(_) => "fetch",
            SynthxError::Api { .. } => "api",
            SynthxError::Parse(_) => "parse",
            SynthxError::Bridge(_) => "bridge",
            SynthxError::Wallet(_) => "wallet",
            SynthxError::Storage(_) => "storage",
        }
    }
}

impl From<AiError> for SynthxError {
    fn from(error: AiError) -> Self {
        match error {
            AiError::Config(message) => SynthxError::Config(message),
            AiError::Api { status, message } => SynthxError::Api { status, message },
            AiError::Parse(message) => SynthxError::Parse(message),
            AiError::Transport(message) => SynthxError::Api {
                status: 0,
                message: format!("AI request failed: {message}"),
            },
        }
    }
}

impl From<crate::storage::StorageError> for SynthxError {
    fn from(error: crate::storage::StorageError) -> Self {
        SynthxError::Storage(error.to_string())
    }
}

pub type Result<T, E = SynthxError> = std::result::Result<T, E>;
