//! # Swap Pricing
//!
//! Uniswap V3 quoting and transaction-payload encoding for the page context.
//! Quotes come from the on-chain Quoter via `eth_call`; when that fails the
//! caller gets an explicitly estimated quote instead of an error.

pub mod abi;
pub mod rpc;
pub mod uniswap;
pub mod units;

use std::collections::HashMap;

use alloy_primitives::{Address, Bytes, U256, address};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::warn;

pub use rpc::{HttpJsonRpc, JsonRpc, RpcError};
pub use uniswap::{SepoliaDeployment, UniswapV3Pricing};

pub const DEFAULT_SLIPPAGE_PERCENT: f64 = 0.5;
pub const SWAP_GAS_LIMIT: u64 = 200_000;
pub const APPROVAL_GAS_LIMIT: u64 = 100_000;
pub const GAS_COST_FALLBACK: &str = "~0.01";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("Token not supported: {0}")]
    UnsupportedToken(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Failed to get quote: {0}")]
    Rpc(String),

    #[error("Refusing to build a transaction from an estimated quote ({0})")]
    EstimatedQuote(String),
}

impl From<RpcError> for PricingError {
    fn from(error: RpcError) -> Self {
        PricingError::Rpc(error.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpec {
    pub symbol: &'static str,
    pub address: Address,
    pub decimals: u8,
    /// Native ETH, routed through WETH
    pub native: bool,
}

const SEPOLIA_WETH: Address = address!("fFf9976782d46CC05630D1f6eBAb18b2324d6B14");
const SEPOLIA_USDC: Address = address!("1c7D4B196Cb0C7B01d743Fbc6116a902379C7238");

static SEPOLIA_TOKENS: Lazy<HashMap<&'static str, TokenSpec>> = Lazy::new(|| {
    HashMap::from([
        ("ETH", TokenSpec { symbol: "WETH", address: SEPOLIA_WETH, decimals: 18, native: true }),
        ("WETH", TokenSpec { symbol: "WETH", address: SEPOLIA_WETH, decimals: 18, native: false }),
        ("USDC", TokenSpec { symbol: "USDC", address: SEPOLIA_USDC, decimals: 6, native: false }),
    ])
});

pub fn token(symbol: &str) -> Result<TokenSpec, PricingError> {
    SEPOLIA_TOKENS
        .get(symbol.trim().to_ascii_uppercase().as_str())
        .copied()
        .ok_or_else(|| PricingError::UnsupportedToken(symbol.to_string()))
}

/// Whether a quote was computed on-chain or synthesized after a failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "basis", rename_all = "lowercase")]
pub enum QuoteBasis {
    Real,
    Estimated { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub from_token: String,
    pub to_token: String,
    #[serde(alias = "amount")]
    pub amount_in: String,
    pub expected_output: String,
    pub min_received: String,
    pub slippage_percent: f64,
    pub price_impact: String,
    pub path_encoding: Bytes,
    pub gas_cost: String,
    pub is_real: bool,
    #[serde(flatten)]
    pub basis: QuoteBasis,
}

impl SwapQuote {
    /// Placeholder shown when the pricing helper could not be reached
    pub fn estimated(from_token: &str, to_token: &str, amount_in: &str, reason: impl Into<String>) -> Self {
        Self {
            from_token: from_token.to_string(),
            to_token: to_token.to_string(),
            amount_in: amount_in.to_string(),
            expected_output: "0.0".to_string(),
            min_received: "0.0".to_string(),
            slippage_percent: DEFAULT_SLIPPAGE_PERCENT,
            price_impact: "N/A".to_string(),
            path_encoding: Bytes::new(),
            gas_cost: GAS_COST_FALLBACK.to_string(),
            is_real: false,
            basis: QuoteBasis::Estimated { reason: reason.into() },
        }
    }

    pub fn is_real(&self) -> bool {
        self.is_real && self.basis == QuoteBasis::Real
    }
}

/// Payload handed to the wallet for signing; never carries key material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTransactionRequest {
    pub to: Address,
    pub from: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: u64,
}

impl SwapTransactionRequest {
    /// `eth_sendTransaction` parameter object
    pub fn to_rpc_params(&self) -> Value {
        json!({
            "from": self.from,
            "to": self.to,
            "data": self.data,
            "value": abi::hex_quantity(self.value),
            "gas": format!("0x{:x}", self.gas_limit),
        })
    }
}

#[async_trait]
pub trait PricingHelper: Send + Sync {
    async fn quote(&self, from_token: &str, to_token: &str, amount: &str) -> Result<SwapQuote, PricingError>;

    /// Gas cost of a swap in ETH; `~0.01` when the node cannot be asked
    async fn estimate_gas_cost(&self) -> String;

    /// Approval transaction the wallet must send first, if allowance is short
    async fn approval_transaction(
        &self,
        wallet: Address,
        token_symbol: &str,
        amount: &str,
    ) -> Result<Option<SwapTransactionRequest>, PricingError>;

    fn build_swap_transaction(&self, wallet: Address, quote: &SwapQuote) -> Result<SwapTransactionRequest, PricingError>;

    async fn quote_or_estimate(&self, from_token: &str, to_token: &str, amount: &str) -> SwapQuote {
        match self.quote(from_token, to_token, amount).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!("[Pricing] Quote failed, returning estimate: {}", e);
                SwapQuote::estimated(from_token, to_token, amount, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_lookup_is_case_insensitive() {
        assert_eq!(token("eth").unwrap().address, SEPOLIA_WETH);
        assert!(token("ETH").unwrap().native);
        assert_eq!(token("Usdc").unwrap().decimals, 6);
        assert_eq!(token("DOGE").unwrap_err(), PricingError::UnsupportedToken("DOGE".into()));
    }

    #[test]
    fn estimated_quote_is_flagged() {
        let quote = SwapQuote::estimated("ETH", "USDC", "0.1", "rpc down");
        assert!(!quote.is_real());
        assert_eq!(quote.gas_cost, "~0.01");

        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["isReal"], false);
        assert_eq!(json["basis"], "estimated");
        assert_eq!(json["reason"], "rpc down");

        let back: SwapQuote = serde_json::from_value(json).unwrap();
        assert_eq!(back, quote);
    }
}
