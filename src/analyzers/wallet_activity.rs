use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use super::cache::{CacheEntry, Clock, TtlCache};
use super::is_false;
use crate::ai::{AiSlot, WalletInsight};
use crate::error::SynthxError;
use crate::explorer::{ActivityWindow, ChainEndpoint, HexAddress, OnchainFetcher};

pub const DEFAULT_ACTIVITY_DAYS: u32 = 90;
const MAX_ACTIVITY_DAYS: u32 = 3650;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletReport {
    pub address: String,
    pub period_days: u32,
    #[serde(flatten)]
    pub insight: WalletInsight,
    pub fetched_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "is_false")]
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn unavailable_insight() -> WalletInsight {
    WalletInsight {
        win_rate: "N/A".to_string(),
        total_trades: 0,
        profitable_trades: 0,
        biggest_win: "-".to_string(),
        biggest_loss: "-".to_string(),
        most_profitable_pair: "-".to_string(),
        risk_patterns: Vec::new(),
        recommendation: "Unable to analyze - please try again".to_string(),
        average_hold_time: "-".to_string(),
    }
}

pub struct WalletActivityAnalyzer {
    fetcher: OnchainFetcher,
    ai: Arc<AiSlot>,
    cache: TtlCache<(String, String, u32), WalletReport>,
}

impl WalletActivityAnalyzer {
    pub fn new(fetcher: OnchainFetcher, ai: Arc<AiSlot>, clock: Arc<dyn Clock>) -> Self {
        Self { fetcher, ai, cache: TtlCache::new(clock) }
    }

    pub async fn analyze(
        &self,
        wallet_address: &str,
        days: Option<u32>,
        endpoint: &ChainEndpoint,
    ) -> Result<CacheEntry<WalletReport>, SynthxError> {
        let address = HexAddress::parse(wallet_address)?;
        let days = days.unwrap_or(DEFAULT_ACTIVITY_DAYS);
        if days == 0 || days > MAX_ACTIVITY_DAYS {
            return Err(SynthxError::validation(format!(
                "days must be between 1 and {MAX_ACTIVITY_DAYS}"
            )));
        }

        let key = (endpoint.chain_id.clone(), address.as_str().to_ascii_lowercase(), days);
        if let Some(hit) = self.cache.get(&key) {
            info!("[WalletAnalyzer] Using cached result for {} ({} days)", address, days);
            return Ok(hit);
        }

        info!("[WalletAnalyzer] Analyzing wallet {} over {} days", address, days);
        let window = ActivityWindow { days, now: self.cache.now() };
        let outcome = match self.fetcher.get_wallet_activity(&address, endpoint, window).await {
            Ok(activity) => self
                .ai
                .current()
                .analyze_wallet_activity(&activity)
                .await
                .map_err(|e| format!("Unable to analyze wallet: {e}")),
            Err(e) => Err(format!("Unable to fetch wallet data: {e}")),
        };

        let now = self.cache.now();
        Ok(match outcome {
            Ok(insight) => {
                let report = WalletReport {
                    address: address.to_string(),
                    period_days: days,
                    insight,
                    fetched_at: now,
                    error: false,
                    message: None,
                };
                self.cache.insert(key, report, now)
            }
            Err(message) => {
                error!("[WalletAnalyzer] Analysis failed: {}", message);
                CacheEntry {
                    result: WalletReport {
                        address: address.to_string(),
                        period_days: days,
                        insight: unavailable_insight(),
                        fetched_at: now,
                        error: true,
                        message: Some(message),
                    },
                    computed_at: now,
                }
            }
        })
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
