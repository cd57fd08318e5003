use std::sync::Arc;

use alloy_primitives::{Address, U256, address};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::abi::{self, ExactInputParams};
use super::units::{format_units, parse_units};
use super::{
    APPROVAL_GAS_LIMIT, DEFAULT_SLIPPAGE_PERCENT, GAS_COST_FALLBACK, JsonRpc, PricingError, PricingHelper,
    QuoteBasis, SWAP_GAS_LIMIT, SwapQuote, SwapTransactionRequest, token,
};

/// Seconds a signed swap stays valid
const DEADLINE_SECS: i64 = 600;
/// 995/1000 of the quoted output
const SLIPPAGE_NUMERATOR: u64 = 995;
const SLIPPAGE_DENOMINATOR: u64 = 1000;

#[derive(Debug, Clone, Copy)]
pub struct SepoliaDeployment {
    pub quoter: Address,
    pub router: Address,
    /// Pool fee tier in hundredths of a bip
    pub fee: u32,
}

impl Default for SepoliaDeployment {
    fn default() -> Self {
        Self {
            quoter: address!("Ed1f6473345F45b75F1DFF1dd1086Cf047DB5465"),
            router: address!("3bFA4769FB09eefC5a80d6E87c3B9C650f7Ae48E"),
            fee: 3000,
        }
    }
}

pub struct UniswapV3Pricing {
    rpc: Arc<dyn JsonRpc>,
    deployment: SepoliaDeployment,
}

impl UniswapV3Pricing {
    pub fn new(rpc: Arc<dyn JsonRpc>) -> Self {
        Self { rpc, deployment: SepoliaDeployment::default() }
    }

    pub fn with_deployment(rpc: Arc<dyn JsonRpc>, deployment: SepoliaDeployment) -> Self {
        Self { rpc, deployment }
    }

    async fn eth_call(&self, to: Address, data: &[u8]) -> Result<U256, PricingError> {
        let result = self
            .rpc
            .call(
                "eth_call",
                json!([{ "to": to, "data": format!("0x{}", hex::encode(data)) }, "latest"]),
            )
            .await?;
        let raw = result
            .as_str()
            .ok_or_else(|| PricingError::Rpc("eth_call result was not a hex string".to_string()))?;
        abi::decode_uint(raw)
    }

    /// Fee tier as a percentage string, `3000` → `0.30%`
    fn fee_percent(&self) -> String {
        format!("{:.2}%", f64::from(self.deployment.fee) / 10_000.0)
    }
}

fn parse_hex_u256(value: &Value) -> Option<U256> {
    let digits = value.as_str()?.trim_start_matches("0x");
    if digits.is_empty() {
        return Some(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).ok()
}

#[async_trait]
impl PricingHelper for UniswapV3Pricing {
    async fn quote(&self, from_token: &str, to_token: &str, amount: &str) -> Result<SwapQuote, PricingError> {
        info!("[Uniswap] Getting quote for {} {} → {}", amount, from_token, to_token);

        let from = token(from_token)?;
        let to = token(to_token)?;
        if from.address == to.address {
            return Err(PricingError::UnsupportedToken(format!("{from_token} → {to_token} is not a pair")));
        }

        let amount_in = parse_units(amount, from.decimals)?;
        if amount_in.is_zero() {
            return Err(PricingError::InvalidAmount("amount must be greater than zero".to_string()));
        }

        let path = abi::encode_path(from.address, self.deployment.fee, to.address);
        debug!("[Uniswap] Calling quoter with path 0x{}", hex::encode(&path));

        let amount_out = self
            .eth_call(self.deployment.quoter, &abi::quote_exact_input_call(&path, amount_in))
            .await?;
        let min_out = amount_out * U256::from(SLIPPAGE_NUMERATOR) / U256::from(SLIPPAGE_DENOMINATOR);

        Ok(SwapQuote {
            from_token: from_token.to_string(),
            to_token: to_token.to_string(),
            amount_in: amount.trim().to_string(),
            expected_output: format_units(amount_out, to.decimals),
            min_received: format_units(min_out, to.decimals),
            slippage_percent: DEFAULT_SLIPPAGE_PERCENT,
            price_impact: self.fee_percent(),
            path_encoding: path,
            gas_cost: self.estimate_gas_cost().await,
            is_real: true,
            basis: QuoteBasis::Real,
        })
    }

    async fn estimate_gas_cost(&self) -> String {
        match self.rpc.call("eth_gasPrice", json!([])).await {
            Ok(price) => match parse_hex_u256(&price) {
                Some(price) => format_units(price * U256::from(SWAP_GAS_LIMIT), 18),
                None => {
                    warn!("[Uniswap] Unparseable gas price {}", price);
                    GAS_COST_FALLBACK.to_string()
                }
            },
            Err(e) => {
                warn!("[Uniswap] Gas estimate error: {}", e);
                GAS_COST_FALLBACK.to_string()
            }
        }
    }

    async fn approval_transaction(
        &self,
        wallet: Address,
        token_symbol: &str,
        amount: &str,
    ) -> Result<Option<SwapTransactionRequest>, PricingError> {
        let asset = token(token_symbol)?;
        if asset.native {
            return Ok(None);
        }

        let needed = parse_units(amount, asset.decimals)?;
        let allowance = self
            .eth_call(asset.address, &abi::allowance_call(wallet, self.deployment.router))
            .await?;
        debug!("[Uniswap] Allowance {} vs needed {}", allowance, needed);

        if allowance >= needed {
            return Ok(None);
        }

        info!("[Uniswap] Approval required for {}", asset.symbol);
        Ok(Some(SwapTransactionRequest {
            to: asset.address,
            from: wallet,
            data: abi::approve_call(self.deployment.router, U256::MAX),
            value: U256::ZERO,
            gas_limit: APPROVAL_GAS_LIMIT,
        }))
    }

    fn build_swap_transaction(&self, wallet: Address, quote: &SwapQuote) -> Result<SwapTransactionRequest, PricingError> {
        if let QuoteBasis::Estimated { reason } = &quote.basis {
            return Err(PricingError::EstimatedQuote(reason.clone()));
        }
        if !quote.is_real {
            return Err(PricingError::EstimatedQuote("quote is not marked real".to_string()));
        }

        let from = token(&quote.from_token)?;
        let to = token(&quote.to_token)?;
        let amount_in = parse_units(&quote.amount_in, from.decimals)?;
        let amount_out_minimum = parse_units(&quote.min_received, to.decimals)?;
        let deadline = U256::from((Utc::now().timestamp() + DEADLINE_SECS).max(0) as u64);

        let data = abi::exact_input_call(&ExactInputParams {
            path: &quote.path_encoding,
            recipient: wallet,
            deadline,
            amount_in,
            amount_out_minimum,
        });

        Ok(SwapTransactionRequest {
            to: self.deployment.router,
            from: wallet,
            data,
            value: if from.native { amount_in } else { U256::ZERO },
            gas_limit: SWAP_GAS_LIMIT,
        })
    }
}
