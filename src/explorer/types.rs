use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SynthxError;

/// A canonical 20-byte hex address (`0x` + 40 hex digits)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct HexAddress(String);

/// A canonical 32-byte transaction hash (`0x` + 64 hex digits)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TxHash(String);

fn is_prefixed_hex(value: &str, digits: usize) -> bool {
    value.len() == digits + 2
        && value.starts_with("0x")
        && value[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

pub fn is_valid_address(value: &str) -> bool {
    is_prefixed_hex(value, 40)
}

pub fn is_valid_tx_hash(value: &str) -> bool {
    is_prefixed_hex(value, 64)
}

impl HexAddress {
    pub fn parse(value: &str) -> Result<Self, SynthxError> {
        let value = value.trim();
        if is_valid_address(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(SynthxError::validation("Invalid Ethereum address"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TxHash {
    pub fn parse(value: &str) -> Result<Self, SynthxError> {
        let value = value.trim();
        if is_valid_tx_hash(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(SynthxError::validation("Invalid transaction hash"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HexAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    Wallet,
    Contract,
    TokenContract,
}

impl AddressKind {
    pub fn label(&self) -> &'static str {
        match self {
            AddressKind::Wallet => "👤 Wallet",
            AddressKind::Contract => "⚙️ Smart Contract",
            AddressKind::TokenContract => "📦 Token Contract",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<String>,
    pub total_supply: Option<String>,
    pub holders: Option<u64>,
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenTransfer {
    pub tx_hash: String,
    pub from: String,
    pub to: String,
    pub token_symbol: String,
    pub value: String,
    pub method: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressSummary {
    pub address: String,
    pub kind: AddressKind,
    /// Native balance in wei, as reported
    pub balance_wei: Option<String>,
    pub tx_count: u64,
    pub verified: bool,
    pub name: Option<String>,
    pub token: Option<TokenInfo>,
    pub recent_token_transfers: Vec<TokenTransfer>,
}

impl AddressSummary {
    pub fn balance_display(&self) -> String {
        self.balance_wei
            .as_deref()
            .and_then(format_wei_as_eth)
            .unwrap_or_else(|| "0 ETH".to_string())
    }
}

/// `1000000000000000000` → `1.0000 ETH`, rounded half-up at four decimals
pub fn format_wei_as_eth(wei: &str) -> Option<String> {
    const TEN_THOUSANDTH_ETH: u128 = 100_000_000_000_000;
    let wei: u128 = wei.trim().parse().ok()?;
    let units = wei.checked_add(TEN_THOUSANDTH_ETH / 2)? / TEN_THOUSANDTH_ETH;
    Some(format!("{}.{:04} ETH", units / 10_000, units % 10_000))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub hash: String,
    pub status: String,
    pub from: String,
    pub to: Option<String>,
    pub value_wei: String,
    pub fee_wei: Option<String>,
    pub method: Option<String>,
    pub block: Option<u64>,
    pub timestamp: Option<String>,
    pub gas_used: Option<String>,
    pub tx_types: Vec<String>,
    pub token_transfers: Vec<TokenTransfer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderShare {
    pub address: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSummary {
    pub name: String,
    pub symbol: String,
    pub address: String,
    pub is_contract: bool,
    pub is_verified: bool,
    pub has_creation_tx: bool,
    pub owner: Option<String>,
    pub implementation: Option<String>,
    pub total_supply: Option<String>,
    pub holders_count: Option<u64>,
    pub top_holders: Vec<HolderShare>,
    pub recent_transactions: usize,
    pub has_recent_activity: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTrade {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub method: String,
    pub value: String,
    pub status: String,
    pub timestamp: Option<String>,
    pub gas_used: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub token_address: String,
    pub symbol: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletActivity {
    pub address: String,
    pub period_days: u32,
    pub total_transactions: usize,
    pub total_token_transfers: usize,
    pub trades: Vec<WalletTrade>,
    pub total_trades: usize,
    pub current_holdings: Vec<Holding>,
    pub number_of_tokens: usize,
    pub has_activity: bool,
    pub most_active_period: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_validation() {
        assert!(is_valid_address("0x1111111111111111111111111111111111111111"));
        assert!(is_valid_address("0xAbCdEf0123456789abcdef0123456789ABCDEF01"));
        for bad in [
            "",
            "0x",
            "1111111111111111111111111111111111111111",
            "0x111111111111111111111111111111111111111",
            "0x11111111111111111111111111111111111111111",
            "0xg111111111111111111111111111111111111111",
            "0X1111111111111111111111111111111111111111",
        ] {
            assert!(!is_valid_address(bad), "{bad:?} should be rejected");
        }
        assert!(HexAddress::parse("0xnothex").is_err());
    }

    #[test]
    fn wei_formatting() {
        assert_eq!(format_wei_as_eth("1000000000000000000").as_deref(), Some("1.0000 ETH"));
        assert_eq!(format_wei_as_eth("123456789000000000").as_deref(), Some("0.1235 ETH"));
        assert_eq!(format_wei_as_eth("0").as_deref(), Some("0.0000 ETH"));
        assert_eq!(format_wei_as_eth("lots"), None);
    }
}
