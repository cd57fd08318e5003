//! # SynthX
//!
//! Core of the SynthX explorer assistant:
//! - `explorer`: Blockscout REST lookups normalized into typed summaries
//! - `ai`: Anthropic messages client with strict JSON extraction
//! - `analyzers`: token-safety, wallet-activity and page explainers with a one-hour cache
//! - `pricing`: Uniswap V3 quoting and swap calldata on Sepolia
//! - `bridge`: background → content script → page script relay for wallet actions
//! - `orchestrator`: the `{action, data}` router every UI surface talks to
//! - `server` / `routes`: axum HTTP and WebSocket front door

pub mod ai;
pub mod analyzers;
pub mod bridge;
pub mod config;
pub mod error;
pub mod explorer;
pub mod orchestrator;
pub mod pricing;
pub mod routes;
pub mod server;
pub mod state_structs;
pub mod storage;
pub mod trade;

pub use error::{BridgeError, Result, SynthxError, WalletError};
pub use orchestrator::{Collaborators, Orchestrator};
pub use state_structs::{ExtensionMessage, Reply};
