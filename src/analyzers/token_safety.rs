use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use super::cache::{CacheEntry, Clock, TtlCache};
use super::is_false;
use crate::ai::{AiError, AiSlot, Confidence, TokenSafetyVerdict, Verdict};
use crate::error::SynthxError;
use crate::explorer::{AddressSummary, ChainEndpoint, FetchError, HexAddress, OnchainFetcher};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenSafetyReport {
    pub address: String,
    pub safety_score: u8,
    pub verdict: Verdict,
    pub risks: Vec<String>,
    pub reason: String,
    pub confidence: Confidence,
    pub fetched_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "is_false")]
    pub error: bool,
}

impl TokenSafetyReport {
    fn from_verdict(address: &HexAddress, verdict: TokenSafetyVerdict, fetched_at: DateTime<Utc>) -> Self {
        Self {
            address: address.to_string(),
            safety_score: verdict.safety_score,
            verdict: verdict.verdict,
            risks: verdict.risks,
            reason: verdict.reason,
            confidence: verdict.confidence,
            fetched_at,
            error: false,
        }
    }

    fn degraded(address: &HexAddress, failure: &Failure, fetched_at: DateTime<Utc>) -> Self {
        let (headline, cause) = match failure {
            Failure::Fetch(e) => ("Unable to fetch token data", e.to_string()),
            Failure::Ai(e) => ("Unable to analyze token", e.to_string()),
        };
        Self {
            address: address.to_string(),
            safety_score: 0,
            verdict: Verdict::Error,
            risks: vec![headline.to_string()],
            reason: format!("{headline}: {cause}"),
            confidence: Confidence::Low,
            fetched_at,
            error: true,
        }
    }

    /// Compact rendering data for the sidebar card
    pub fn format_for_ui(&self) -> SafetyCard {
        SafetyCard {
            emoji: self.verdict.emoji(),
            verdict: self.verdict,
            score: format!("{}/100", self.safety_score),
            risks: if self.risks.is_empty() {
                vec!["✅ No red flags detected".to_string()]
            } else {
                self.risks.clone()
            },
            reason: self.reason.clone(),
            confidence: self.confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetyCard {
    pub emoji: &'static str,
    pub verdict: Verdict,
    pub score: String,
    pub risks: Vec<String>,
    pub reason: String,
    pub confidence: Confidence,
}

/// Address facts shown next to the verdict
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnchainDisplay {
    #[serde(rename = "type")]
    pub kind: String,
    pub balance: String,
    pub tx_count: u64,
    pub verified: bool,
}

impl From<&AddressSummary> for OnchainDisplay {
    fn from(summary: &AddressSummary) -> Self {
        Self {
            kind: summary.kind.label().to_string(),
            balance: summary.balance_display(),
            tx_count: summary.tx_count,
            verified: summary.verified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressScan {
    pub address: String,
    pub analysis: TokenSafetyReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onchain: Option<OnchainDisplay>,
    pub timestamp: DateTime<Utc>,
}

enum Failure {
    Fetch(FetchError),
    Ai(AiError),
}

type CacheKey = (String, String);

pub struct TokenSafetyAnalyzer {
    fetcher: OnchainFetcher,
    ai: Arc<AiSlot>,
    tokens: TtlCache<CacheKey, TokenSafetyReport>,
    scans: TtlCache<CacheKey, AddressScan>,
}

impl TokenSafetyAnalyzer {
    pub fn new(fetcher: OnchainFetcher, ai: Arc<AiSlot>, clock: Arc<dyn Clock>) -> Self {
        Self {
            fetcher,
            ai,
            tokens: TtlCache::new(clock.clone()),
            scans: TtlCache::new(clock),
        }
    }

    fn key(address: &HexAddress, endpoint: &ChainEndpoint) -> CacheKey {
        (endpoint.chain_id.clone(), address.as_str().to_ascii_lowercase())
    }

    /// Token safety verdict; only malformed addresses are an error
    pub async fn analyze(
        &self,
        token_address: &str,
        endpoint: &ChainEndpoint,
    ) -> Result<CacheEntry<TokenSafetyReport>, SynthxError> {
        let address = HexAddress::parse(token_address)?;
        let key = Self::key(&address, endpoint);

        if let Some(hit) = self.tokens.get(&key) {
            info!("[TokenSafety] Using cached result for {}", address);
            return Ok(hit);
        }

        info!("[TokenSafety] Analyzing token {} on {}", address, endpoint.name);
        let outcome = match self.fetcher.get_token_summary(&address, endpoint).await {
            Ok(summary) => self
                .ai
                .current()
                .analyze_token_safety(&summary)
                .await
                .map_err(Failure::Ai),
            Err(e) => Err(Failure::Fetch(e)),
        };

        let now = self.tokens.now();
        Ok(match outcome {
            Ok(verdict) => {
                let report = TokenSafetyReport::from_verdict(&address, verdict, now);
                self.tokens.insert(key, report, now)
            }
            Err(failure) => {
                let report = TokenSafetyReport::degraded(&address, &failure, now);
                error!("[TokenSafety] Analysis failed: {}", report.reason);
                CacheEntry { result: report, computed_at: now }
            }
        })
    }

    /// Address scan: safety verdict on the raw address record plus display facts
    pub async fn scan_address(
        &self,
        address: &str,
        endpoint: &ChainEndpoint,
    ) -> Result<CacheEntry<AddressScan>, SynthxError> {
        let address = HexAddress::parse(address)?;
        let key = Self::key(&address, endpoint);

        if let Some(hit) = self.scans.get(&key) {
            info!("[TokenSafety] Using cached scan for {}", address);
            return Ok(hit);
        }

        info!("[TokenSafety] Scanning address {} on {}", address, endpoint.name);
        let summary = self.fetcher.get_address_summary(&address, endpoint).await;
        let outcome = match &summary {
            Ok(summary) => self
                .ai
                .current()
                .analyze_token_safety(summary)
                .await
                .map_err(Failure::Ai),
            Err(e) => Err(Failure::Fetch(e.clone())),
        };

        let now = self.scans.now();
        let onchain = summary.as_ref().ok().map(OnchainDisplay::from);
        Ok(match outcome {
            Ok(verdict) => {
                let scan = AddressScan {
                    address: address.to_string(),
                    analysis: TokenSafetyReport::from_verdict(&address, verdict, now),
                    onchain,
                    timestamp: now,
                };
                self.scans.insert(key, scan, now)
            }
            Err(failure) => {
                let analysis = TokenSafetyReport::degraded(&address, &failure, now);
                error!("[TokenSafety] Scan failed: {}", analysis.reason);
                CacheEntry {
                    result: AddressScan { address: address.to_string(), analysis, onchain, timestamp: now },
                    computed_at: now,
                }
            }
        })
    }

    pub fn clear_cache(&self) {
        self.tokens.clear();
        self.scans.clear();
    }
}
