//! # On-chain Data Fetcher
//!
//! Read-only access to a Blockscout-style explorer REST API. Responses are
//! narrowed into flat summaries before they reach the AI client so prompt
//! size stays bounded. Only public chain data is requested.

pub mod chain;
pub mod client;
pub mod types;

use thiserror::Error;

pub use chain::ChainEndpoint;
pub use client::{ActivityWindow, ExplorerTransport, HttpExplorerTransport, OnchainFetcher};
pub use types::{AddressKind, AddressSummary, HexAddress, TokenSummary, TransactionSummary, TxHash, WalletActivity};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Explorer API error {status} at {endpoint}")]
    Status { status: u16, endpoint: String },

    #[error("Explorer request to {endpoint} failed: {cause}")]
    Network { endpoint: String, cause: String },
}
