//! # Analyzers
//!
//! Compose the on-chain fetcher and the AI client into single "analyze X"
//! calls with a one-hour result cache. Token and wallet analysis never fail
//! after validation; fetch or model failures come back as a degraded report
//! carrying `error: true` and a reason the UI can render.

pub mod cache;
pub mod page;
pub mod token_safety;
pub mod wallet_activity;

use serde::{Deserialize, Serialize};

use crate::explorer::ChainEndpoint;

pub use cache::{CacheEntry, Clock, SystemClock, TtlCache, FRESHNESS_WINDOW};
pub use page::{PageData, PageExplainer};
pub use token_safety::{AddressScan, OnchainDisplay, TokenSafetyAnalyzer, TokenSafetyReport};
pub use wallet_activity::{DEFAULT_ACTIVITY_DAYS, WalletActivityAnalyzer, WalletReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Address,
    Transaction,
    Token,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Address => "address",
            AnalysisKind::Transaction => "transaction",
            AnalysisKind::Token => "token",
        }
    }
}

/// One UI-triggered analysis, discarded once answered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub kind: AnalysisKind,
    pub identifier: String,
    pub chain_endpoint: ChainEndpoint,
}

fn is_false(value: &bool) -> bool {
    !*value
}
