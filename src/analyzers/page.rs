use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use url::Url;

use super::cache::{CacheEntry, Clock, TtlCache};
use super::{AnalysisKind, AnalysisRequest};
use crate::ai::{AnalysisResult, AiSlot};
use crate::error::SynthxError;
use crate::explorer::{ChainEndpoint, HexAddress, OnchainFetcher, TxHash};

/// What the content script extracted from the explorer page. A payload
/// carrying only `url` is resolved with [`PageData::detect`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPageData")]
pub struct PageData {
    #[serde(rename = "type")]
    pub kind: AnalysisKind,
    pub value: String,
    pub url: String,
}

#[derive(Deserialize)]
struct RawPageData {
    #[serde(rename = "type")]
    kind: Option<AnalysisKind>,
    value: Option<String>,
    url: String,
}

impl TryFrom<RawPageData> for PageData {
    type Error = String;

    fn try_from(raw: RawPageData) -> Result<Self, Self::Error> {
        match (raw.kind, raw.value) {
            (Some(kind), Some(value)) if !value.trim().is_empty() => Ok(PageData { kind, value, url: raw.url }),
            _ => PageData::detect(&raw.url).ok_or_else(|| format!("Unrecognized explorer page: {}", raw.url)),
        }
    }
}

impl PageData {
    /// Recognizes `/tx/<hash>`, `/address/<addr>` and `/token/<addr>` paths
    pub fn detect(page_url: &str) -> Option<Self> {
        let url = Url::parse(page_url).ok()?;
        let segments: Vec<&str> = url.path_segments()?.collect();

        segments.windows(2).find_map(|pair| {
            let kind = match pair[0] {
                "tx" => AnalysisKind::Transaction,
                "address" => AnalysisKind::Address,
                "token" => AnalysisKind::Token,
                _ => return None,
            };
            (!pair[1].is_empty()).then(|| PageData {
                kind,
                value: pair[1].to_string(),
                url: page_url.to_string(),
            })
        })
    }

    pub fn to_request(&self) -> AnalysisRequest {
        AnalysisRequest {
            kind: self.kind,
            identifier: self.value.trim().to_string(),
            chain_endpoint: ChainEndpoint::from_page_url(&self.url),
        }
    }
}

#[derive(Debug, Clone)]
struct Explained {
    analysis: AnalysisResult,
    context: Value,
}

type CacheKey = (AnalysisKind, String, String);

/// Explains whatever explorer page the user is on and answers follow-ups
pub struct PageExplainer {
    fetcher: OnchainFetcher,
    ai: Arc<AiSlot>,
    cache: TtlCache<CacheKey, Explained>,
}

impl PageExplainer {
    pub fn new(fetcher: OnchainFetcher, ai: Arc<AiSlot>, clock: Arc<dyn Clock>) -> Self {
        Self { fetcher, ai, cache: TtlCache::new(clock) }
    }

    fn key(request: &AnalysisRequest) -> CacheKey {
        (
            request.kind,
            request.identifier.to_ascii_lowercase(),
            request.chain_endpoint.chain_id.clone(),
        )
    }

    async fn fetch_context(&self, request: &AnalysisRequest) -> Result<Value, SynthxError> {
        let endpoint = &request.chain_endpoint;
        let context = match request.kind {
            AnalysisKind::Transaction => {
                let hash = TxHash::parse(&request.identifier)?;
                serde_json::to_value(self.fetcher.get_transaction_summary(&hash, endpoint).await?)
            }
            AnalysisKind::Address => {
                let address = HexAddress::parse(&request.identifier)?;
                serde_json::to_value(self.fetcher.get_address_summary(&address, endpoint).await?)
            }
            AnalysisKind::Token => {
                let address = HexAddress::parse(&request.identifier)?;
                serde_json::to_value(self.fetcher.get_token_summary(&address, endpoint).await?)
            }
        };
        context.map_err(|e| SynthxError::Parse(e.to_string()))
    }

    async fn explained(&self, request: &AnalysisRequest) -> Result<CacheEntry<Explained>, SynthxError> {
        let key = Self::key(request);
        if let Some(hit) = self.cache.get(&key) {
            info!("[Explainer] Using cached {} {}", request.kind.as_str(), request.identifier);
            return Ok(hit);
        }

        info!("[Explainer] Explaining {} {}", request.kind.as_str(), request.identifier);
        let context = self.fetch_context(request).await?;
        let analysis = self.ai.current().explain(request.kind.as_str(), &context).await?;
        let now = self.cache.now();
        Ok(self.cache.insert(key, Explained { analysis, context }, now))
    }

    pub async fn analyze_page(&self, page: &PageData) -> Result<AnalysisResult, SynthxError> {
        Ok(self.explained(&page.to_request()).await?.result.analysis)
    }

    pub async fn ask_follow_up(&self, page: &PageData, question: &str) -> Result<AnalysisResult, SynthxError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SynthxError::validation("Question required"));
        }

        let request = page.to_request();
        let context = match self.cache.get(&Self::key(&request)) {
            Some(hit) => hit.result.context,
            None => self.fetch_context(&request).await?,
        };

        info!("[Explainer] Follow-up on {} {}", request.kind.as_str(), request.identifier);
        Ok(self
            .ai
            .current()
            .ask_follow_up(request.kind.as_str(), &context, question)
            .await?)
    }
}
