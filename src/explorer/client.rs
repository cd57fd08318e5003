use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info};
use url::Url;

use super::chain::ChainEndpoint;
use super::types::*;
use super::FetchError;

/// Token transfers attached to address and transaction summaries
pub const MAX_RECENT_TRANSFERS: usize = 5;
pub const MAX_TOP_HOLDERS: usize = 5;
pub const MAX_WALLET_TRADES: usize = 20;
pub const MAX_WALLET_HOLDINGS: usize = 10;

/// Raw GET access to an explorer REST API
#[async_trait]
pub trait ExplorerTransport: Send + Sync {
    async fn get_json(&self, url: &Url) -> Result<Value, FetchError>;
}

/// reqwest-backed transport; no retries, failures surface immediately
pub struct HttpExplorerTransport {
    client: Client,
}

impl HttpExplorerTransport {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network { endpoint: "client".into(), cause: e.to_string() })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ExplorerTransport for HttpExplorerTransport {
    async fn get_json(&self, url: &Url) -> Result<Value, FetchError> {
        let endpoint = url.path().to_string();
        debug!("[Explorer] GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Network { endpoint: endpoint.clone(), cause: e.to_string() })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            error!("[Explorer] Error {} at {}", status, endpoint);
            return Err(FetchError::Status { status, endpoint });
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::Network { endpoint, cause: e.to_string() })
    }
}

/// Options for wallet activity lookups
#[derive(Debug, Clone, Copy)]
pub struct ActivityWindow {
    pub days: u32,
    pub now: DateTime<Utc>,
}

/// Normalizes explorer responses into flat, AI-friendly summaries
#[derive(Clone)]
pub struct OnchainFetcher {
    transport: Arc<dyn ExplorerTransport>,
}

impl OnchainFetcher {
    pub fn new(transport: Arc<dyn ExplorerTransport>) -> Self {
        Self { transport }
    }

    async fn call(&self, endpoint: &ChainEndpoint, path: &str) -> Result<Value, FetchError> {
        let raw = format!("{}{}", endpoint.api_base(), path);
        let url = Url::parse(&raw)
            .map_err(|e| FetchError::Network { endpoint: raw.clone(), cause: e.to_string() })?;
        self.transport.get_json(&url).await
    }

    /// Unmodified `/addresses/{address}` payload
    pub async fn address_info(
        &self,
        address: &HexAddress,
        endpoint: &ChainEndpoint,
    ) -> Result<Value, FetchError> {
        info!("[Explorer] Fetching address {} on {}", address, endpoint.name);
        self.call(endpoint, &format!("/addresses/{address}")).await
    }

    pub async fn get_address_summary(
        &self,
        address: &HexAddress,
        endpoint: &ChainEndpoint,
    ) -> Result<AddressSummary, FetchError> {
        let info = self.address_info(address, endpoint).await?;
        let transfers = self
            .call(endpoint, &format!("/addresses/{address}/token-transfers"))
            .await?;
        Ok(summarize_address(address, &info, &transfers))
    }

    pub async fn get_transaction_summary(
        &self,
        hash: &TxHash,
        endpoint: &ChainEndpoint,
    ) -> Result<TransactionSummary, FetchError> {
        info!("[Explorer] Fetching transaction {} on {}", hash, endpoint.name);
        let tx = self.call(endpoint, &format!("/transactions/{hash}")).await?;
        Ok(summarize_transaction(hash, &tx))
    }

    pub async fn get_token_summary(
        &self,
        address: &HexAddress,
        endpoint: &ChainEndpoint,
    ) -> Result<TokenSummary, FetchError> {
        let info = self.address_info(address, endpoint).await?;
        let holders = self.call(endpoint, &format!("/tokens/{address}/holders")).await?;
        let transactions = self
            .call(endpoint, &format!("/addresses/{address}/transactions"))
            .await?;
        Ok(summarize_token(address, &info, &holders, &transactions))
    }

    pub async fn get_wallet_activity(
        &self,
        address: &HexAddress,
        endpoint: &ChainEndpoint,
        window: ActivityWindow,
    ) -> Result<WalletActivity, FetchError> {
        info!("[Explorer] Fetching wallet activity {} ({} days)", address, window.days);
        let transactions = self
            .call(endpoint, &format!("/addresses/{address}/transactions"))
            .await?;
        let transfers = self
            .call(endpoint, &format!("/addresses/{address}/token-transfers"))
            .await?;
        let holdings = self.call(endpoint, &format!("/addresses/{address}/tokens")).await?;
        Ok(summarize_wallet(address, &transactions, &transfers, &holdings, window))
    }
}

// ── Normalization ────────────────────────────────────────────────────────────

fn items(payload: &Value) -> &[Value] {
    payload["items"].as_array().map(Vec::as_slice).unwrap_or(&[])
}

fn opt_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Blockscout reports counters as either numbers or decimal strings
fn lenient_u64(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

/// Addresses are nested objects (`{"hash": ..}`) in v2 and bare strings elsewhere
fn address_hash(value: &Value) -> Option<String> {
    opt_string(&value["hash"]).or_else(|| opt_string(value))
}

fn token_info(token: &Value) -> Option<TokenInfo> {
    if !token.is_object() {
        return None;
    }
    Some(TokenInfo {
        name: opt_string(&token["name"]),
        symbol: opt_string(&token["symbol"]),
        decimals: opt_string(&token["decimals"]),
        total_supply: opt_string(&token["total_supply"]),
        holders: lenient_u64(&token["holders"]).or_else(|| lenient_u64(&token["holders_count"])),
        token_type: opt_string(&token["type"]),
    })
}

fn token_transfer(item: &Value) -> TokenTransfer {
    TokenTransfer {
        tx_hash: opt_string(&item["transaction_hash"])
            .or_else(|| opt_string(&item["tx_hash"]))
            .unwrap_or_default(),
        from: address_hash(&item["from"]).unwrap_or_else(|| "unknown".into()),
        to: address_hash(&item["to"]).unwrap_or_else(|| "unknown".into()),
        token_symbol: opt_string(&item["token"]["symbol"]).unwrap_or_else(|| "UNKNOWN".into()),
        value: opt_string(&item["total"]["value"]).unwrap_or_else(|| "0".into()),
        method: opt_string(&item["method"]),
        timestamp: opt_string(&item["timestamp"]),
    }
}

fn is_contract(info: &Value) -> bool {
    info["type"].as_str() == Some("contract") || info["is_contract"].as_bool() == Some(true)
}

fn is_verified(info: &Value) -> bool {
    info["verified"].as_bool() == Some(true) || info["is_verified"].as_bool() == Some(true)
}

pub(crate) fn summarize_address(address: &HexAddress, info: &Value, transfers: &Value) -> AddressSummary {
    let token = token_info(&info["token"]);
    let kind = match (is_contract(info), token.is_some()) {
        (true, true) => AddressKind::TokenContract,
        (true, false) => AddressKind::Contract,
        (false, _) => AddressKind::Wallet,
    };

    AddressSummary {
        address: address.to_string(),
        kind,
        balance_wei: opt_string(&info["coin_balance"]),
        tx_count: lenient_u64(&info["transactions_count"]).unwrap_or(0),
        verified: is_verified(info),
        name: opt_string(&info["name"]),
        token,
        recent_token_transfers: items(transfers)
            .iter()
            .take(MAX_RECENT_TRANSFERS)
            .map(token_transfer)
            .collect(),
    }
}

fn summarize_transaction(hash: &TxHash, tx: &Value) -> TransactionSummary {
    TransactionSummary {
        hash: hash.to_string(),
        status: opt_string(&tx["status"])
            .or_else(|| opt_string(&tx["result"]))
            .unwrap_or_else(|| "unknown".into()),
        from: address_hash(&tx["from"]).unwrap_or_else(|| "unknown".into()),
        to: address_hash(&tx["to"]),
        value_wei: opt_string(&tx["value"]).unwrap_or_else(|| "0".into()),
        fee_wei: opt_string(&tx["fee"]["value"]),
        method: opt_string(&tx["method"])
            .or_else(|| opt_string(&tx["decoded_input"]["method_call"])),
        block: lenient_u64(&tx["block_number"]).or_else(|| lenient_u64(&tx["block"])),
        timestamp: opt_string(&tx["timestamp"]),
        gas_used: opt_string(&tx["gas_used"]),
        tx_types: tx["transaction_types"]
            .as_array()
            .or_else(|| tx["tx_types"].as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default(),
        token_transfers: tx["token_transfers"]
            .as_array()
            .map(|arr| arr.iter().take(MAX_RECENT_TRANSFERS).map(token_transfer).collect())
            .unwrap_or_default(),
    }
}

fn summarize_token(
    address: &HexAddress,
    info: &Value,
    holders: &Value,
    transactions: &Value,
) -> TokenSummary {
    let token = token_info(&info["token"]);
    let recent = items(transactions).len();

    TokenSummary {
        name: token
            .as_ref()
            .and_then(|t| t.name.clone())
            .or_else(|| opt_string(&info["name"]))
            .unwrap_or_else(|| "Unknown".into()),
        symbol: token
            .as_ref()
            .and_then(|t| t.symbol.clone())
            .or_else(|| opt_string(&info["symbol"]))
            .unwrap_or_else(|| "UNKNOWN".into()),
        address: address.to_string(),
        is_contract: is_contract(info),
        is_verified: is_verified(info),
        has_creation_tx: opt_string(&info["creation_tx_hash"])
            .or_else(|| opt_string(&info["creation_transaction_hash"]))
            .is_some(),
        owner: address_hash(&info["owner_address"]).or_else(|| address_hash(&info["creator_address_hash"])),
        implementation: info["implementations"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|imp| opt_string(&imp["address"]).or_else(|| opt_string(&imp["address_hash"])))
            .or_else(|| opt_string(&info["implementation_address"])),
        total_supply: token.as_ref().and_then(|t| t.total_supply.clone()),
        holders_count: token.as_ref().and_then(|t| t.holders),
        top_holders: items(holders)
            .iter()
            .take(MAX_TOP_HOLDERS)
            .map(|h| HolderShare {
                address: address_hash(&h["address"]).unwrap_or_else(|| "unknown".into()),
                value: opt_string(&h["value"]).unwrap_or_else(|| "0".into()),
            })
            .collect(),
        recent_transactions: recent,
        has_recent_activity: recent > 0,
    }
}

fn is_trade_like(tx: &Value) -> bool {
    if tx["to"].is_null() {
        return false;
    }
    let method = tx["method"].as_str().unwrap_or("").to_ascii_lowercase();
    ["swap", "exchange", "send"].iter().any(|m| method.contains(m))
}

fn within_window(timestamp: Option<&str>, window: &ActivityWindow) -> bool {
    let Some(ts) = timestamp.and_then(|t| DateTime::parse_from_rfc3339(t).ok()) else {
        // undated entries are kept rather than silently dropped
        return true;
    };
    window.now.signed_duration_since(ts.with_timezone(&Utc)).num_days() <= i64::from(window.days)
}

/// Coarse recency label for a transaction list
pub fn most_active_period(transactions: &[Value], now: DateTime<Utc>) -> String {
    if transactions.is_empty() {
        return "No activity".to_string();
    }

    let recent = transactions
        .iter()
        .filter_map(|tx| tx["timestamp"].as_str())
        .filter_map(|t| DateTime::parse_from_rfc3339(t).ok())
        .filter(|t| now.signed_duration_since(t.with_timezone(&Utc)).num_days() < 7)
        .count();

    if recent * 2 > transactions.len() {
        "Last 7 days".to_string()
    } else if recent > 0 {
        "Last month".to_string()
    } else {
        "Older than 30 days".to_string()
    }
}

fn summarize_wallet(
    address: &HexAddress,
    transactions: &Value,
    transfers: &Value,
    holdings: &Value,
    window: ActivityWindow,
) -> WalletActivity {
    let txs = items(transactions);

    let trades: Vec<WalletTrade> = txs
        .iter()
        .filter(|tx| is_trade_like(tx))
        .filter(|tx| within_window(tx["timestamp"].as_str(), &window))
        .map(|tx| WalletTrade {
            hash: opt_string(&tx["hash"]).unwrap_or_default(),
            from: address_hash(&tx["from"]).unwrap_or_else(|| "unknown".into()),
            to: address_hash(&tx["to"]).unwrap_or_else(|| "unknown".into()),
            method: opt_string(&tx["method"]).unwrap_or_else(|| "Unknown".into()),
            value: opt_string(&tx["value"]).unwrap_or_else(|| "0".into()),
            status: opt_string(&tx["status"]).unwrap_or_else(|| "unknown".into()),
            timestamp: opt_string(&tx["timestamp"]),
            gas_used: opt_string(&tx["gas_used"]),
        })
        .collect();

    let held = items(holdings);

    WalletActivity {
        address: address.to_string(),
        period_days: window.days,
        total_transactions: txs.len(),
        total_token_transfers: items(transfers).len(),
        total_trades: trades.len(),
        trades: trades.into_iter().take(MAX_WALLET_TRADES).collect(),
        current_holdings: held
            .iter()
            .take(MAX_WALLET_HOLDINGS)
            .map(|h| Holding {
                token_address: address_hash(&h["token"]["address"])
                    .or_else(|| address_hash(&h["token"]["address_hash"]))
                    .unwrap_or_default(),
                symbol: opt_string(&h["token"]["symbol"]).unwrap_or_else(|| "UNKNOWN".into()),
                value: opt_string(&h["value"]).unwrap_or_else(|| "0".into()),
            })
            .collect(),
        number_of_tokens: held.len(),
        has_activity: !txs.is_empty(),
        most_active_period: most_active_period(txs, window.now),
    }
}
