//! # Orchestrator
//!
//! The single long-lived message router. Every UI surface posts
//! `{action, data}` here and always gets exactly one reply back, either an
//! `{success, data | error}` envelope or, for the page explainer,
//! `{analysis} | {error}`.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::ai::{AiClient, AiSlot, ChatTransport, MISSING_KEY_MESSAGE};
use crate::analyzers::{Clock, PageExplainer, TokenSafetyAnalyzer, WalletActivityAnalyzer};
use crate::bridge::{SwapOrder, SwapPipeline, TabMessenger};
use crate::config::AiConfig;
use crate::error::SynthxError;
use crate::explorer::{ChainEndpoint, ExplorerTransport, OnchainFetcher};
use crate::pricing::PricingHelper;
use crate::state_structs::{
    AddressPayload, ApiKeyPayload, ChainIdPayload, ExplainerReply, ExtensionMessage, FollowUpPayload, PagePayload,
    QuotePayload, Reply, TokenPayload, TradeCommandPayload, WalletPayload,
};
use crate::storage::{ConfigStore, StoredState, TradeRecord, mask_key};
use crate::trade::parse_trade_command;

const API_KEY_PREFIX: &str = "sk-ant-";

/// External capabilities the orchestrator is wired to
pub struct Collaborators {
    pub store: Arc<dyn ConfigStore>,
    pub explorer: Arc<dyn ExplorerTransport>,
    pub chat: Arc<dyn ChatTransport>,
    pub pricing: Arc<dyn PricingHelper>,
    pub tabs: Arc<dyn TabMessenger>,
    pub clock: Arc<dyn Clock>,
    pub ai: AiConfig,
}

pub struct Orchestrator {
    store: Arc<dyn ConfigStore>,
    ai: Arc<AiSlot>,
    token_safety: TokenSafetyAnalyzer,
    wallet_activity: WalletActivityAnalyzer,
    explainer: PageExplainer,
    pricing: Arc<dyn PricingHelper>,
    swaps: SwapPipeline,
}

impl Orchestrator {
    /// Loads the stored key and builds every analyzer around one AI slot
    pub async fn start(parts: Collaborators) -> Result<Arc<Self>, SynthxError> {
        let stored = parts.store.config().await?;
        match stored.masked_key() {
            Some(masked) => info!("[Orchestrator] Loaded API key {}", masked),
            None => warn!("[Orchestrator] No API key configured yet"),
        }

        let ai = Arc::new(AiSlot::new(AiClient::new(parts.chat, stored.api_key, &parts.ai)));
        let fetcher = OnchainFetcher::new(parts.explorer);

        Ok(Arc::new(Self {
            store: parts.store,
            token_safety: TokenSafetyAnalyzer::new(fetcher.clone(), ai.clone(), parts.clock.clone()),
            wallet_activity: WalletActivityAnalyzer::new(fetcher.clone(), ai.clone(), parts.clock.clone()),
            explainer: PageExplainer::new(fetcher, ai.clone(), parts.clock),
            ai,
            pricing: parts.pricing,
            swaps: SwapPipeline::new(parts.tabs),
        }))
    }

    /// Runs the handler on its own task so the caller is answered exactly
    /// once even if the handler panics
    pub async fn handle(self: &Arc<Self>, message: ExtensionMessage) -> Reply {
        let action = message.action.clone();
        let this = self.clone();
        match tokio::spawn(async move { this.dispatch(message).await }).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("[Orchestrator] {} handler aborted: {}", action, e);
                Reply::failure(format!("{action} failed unexpectedly"))
            }
        }
    }

    pub async fn dispatch(&self, message: ExtensionMessage) -> Reply {
        info!("[Orchestrator] Received action: {}", message.action);

        match message.action.as_str() {
            "analyzePage" => return self.analyze_page(&message).await,
            "askFollowUp" => return self.ask_follow_up(&message).await,
            _ => {}
        }

        let outcome = match message.action.as_str() {
            "ping" => Ok(json!({ "status": "pong" })),
            "analyzeAddress" => self.analyze_address(&message).await,
            "analyzeToken" => self.analyze_token(&message).await,
            "analyzeWallet" => self.analyze_wallet(&message).await,
            "parseTradeCommand" => self.parse_trade(&message),
            "getSwapQuote" => self.swap_quote(&message).await,
            "executeSwap" => self.execute_swap(&message).await,
            "checkWallet" => self.check_wallet().await,
            "setApiKey" => self.set_api_key(&message).await,
            "setChainId" => self.set_chain_id(&message).await,
            "getConfig" => self.get_config().await,
            "getTradeHistory" => self.trade_history().await,
            "clearCache" => {
                self.token_safety.clear_cache();
                self.wallet_activity.clear_cache();
                Ok(json!({ "cleared": true }))
            }
            _ => Err(SynthxError::validation("Unknown action")),
        };

        match outcome {
            Ok(data) => Reply::ok(data),
            Err(e) => {
                warn!("[Orchestrator] {} failed ({}): {}", message.action, e.kind(), e);
                Reply::failure(e.to_string())
            }
        }
    }

    fn require_ai(&self) -> Result<(), SynthxError> {
        if self.ai.current().is_configured() {
            Ok(())
        } else {
            Err(SynthxError::Config(MISSING_KEY_MESSAGE.to_string()))
        }
    }

    async fn chain_endpoint(&self) -> Result<ChainEndpoint, SynthxError> {
        Ok(ChainEndpoint::from_chain_id(&self.store.config().await?.chain_id))
    }

    async fn analyze_address(&self, message: &ExtensionMessage) -> Result<Value, SynthxError> {
        self.require_ai()?;
        let payload: AddressPayload = message.payload()?;
        let endpoint = self.chain_endpoint().await?;

        let scan = self.token_safety.scan_address(&payload.address, &endpoint).await?;
        to_json(&scan.result)
    }

    async fn analyze_token(&self, message: &ExtensionMessage) -> Result<Value, SynthxError> {
        self.require_ai()?;
        let payload: TokenPayload = message.payload()?;
        let endpoint = self.chain_endpoint().await?;

        let entry = self.token_safety.analyze(&payload.token_address, &endpoint).await?;
        Ok(json!({
            "analysis": to_json(&entry.result)?,
            "display": to_json(&entry.result.format_for_ui())?,
            "timestamp": entry.computed_at,
        }))
    }

    async fn analyze_wallet(&self, message: &ExtensionMessage) -> Result<Value, SynthxError> {
        self.require_ai()?;
        let payload: WalletPayload = message.payload()?;
        let endpoint = self.chain_endpoint().await?;

        let entry = self
            .wallet_activity
            .analyze(&payload.wallet_address, payload.days, &endpoint)
            .await?;
        Ok(json!({ "analysis": to_json(&entry.result)?, "timestamp": entry.computed_at }))
    }

    fn parse_trade(&self, message: &ExtensionMessage) -> Result<Value, SynthxError> {
        let payload: TradeCommandPayload = message.payload()?;
        let parsed = parse_trade_command(&payload.command)?;
        Ok(json!({ "parsed": to_json(&parsed)? }))
    }

    async fn swap_quote(&self, message: &ExtensionMessage) -> Result<Value, SynthxError> {
        let payload: QuotePayload = message.payload()?;
        if let Some(platform) = payload.platform.as_deref() {
            if !platform.is_empty() && !platform.to_ascii_lowercase().contains("uniswap") {
                return Err(SynthxError::validation(format!("Unsupported platform: {platform}")));
            }
        }

        let quote = self
            .pricing
            .quote_or_estimate(&payload.from_token, &payload.to_token, &payload.amount)
            .await;
        Ok(json!({ "quote": to_json(&quote)? }))
    }

    async fn execute_swap(&self, message: &ExtensionMessage) -> Result<Value, SynthxError> {
        let order: SwapOrder = message.payload()?;
        if order.amount.trim().is_empty() {
            return Err(SynthxError::validation("Amount required"));
        }

        let receipt = self.swaps.execute(order.clone()).await?;

        let record = TradeRecord {
            from_token: order.from_token,
            to_token: order.to_token,
            amount: order.amount,
            expected_output: receipt.quote.expected_output.clone(),
            tx_hash: receipt.tx_hash.clone(),
            wallet_address: receipt.wallet_address.clone(),
            timestamp: Utc::now(),
        };
        // the transaction is already on its way; a history write failure must not hide that
        if let Err(e) = self.store.update(Box::new(move |s: &mut StoredState| s.push_trade(record))).await {
            error!("[Orchestrator] Failed to record trade {}: {}", receipt.tx_hash, e);
        }

        to_json(&receipt)
    }

    async fn check_wallet(&self) -> Result<Value, SynthxError> {
        let wallet_address = self.swaps.check_wallet().await?;
        Ok(json!({ "walletAddress": wallet_address }))
    }

    async fn set_api_key(&self, message: &ExtensionMessage) -> Result<Value, SynthxError> {
        let payload: ApiKeyPayload = message.payload()?;
        let key = payload.api_key.trim().to_string();
        if key.is_empty() || !key.starts_with(API_KEY_PREFIX) {
            return Err(SynthxError::validation("Invalid Claude API key format"));
        }

        let stored = key.clone();
        self.store
            .update(Box::new(move |s: &mut StoredState| s.api_key = Some(stored)))
            .await?;
        self.ai.replace(self.ai.current().with_api_key(key.clone()));

        info!("[Orchestrator] API key updated ({})", mask_key(&key));
        Ok(json!({ "configured": true, "maskedKey": mask_key(&key) }))
    }

    async fn set_chain_id(&self, message: &ExtensionMessage) -> Result<Value, SynthxError> {
        let payload: ChainIdPayload = message.payload()?;
        let chain_id = payload.chain_id.trim().to_string();
        if chain_id.is_empty() || !chain_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(SynthxError::validation("Invalid chain id"));
        }

        let stored = chain_id.clone();
        self.store
            .update(Box::new(move |s: &mut StoredState| s.chain_id = Some(stored)))
            .await?;

        let endpoint = ChainEndpoint::from_chain_id(&chain_id);
        info!("[Orchestrator] Chain set to {} ({})", chain_id, endpoint.name);
        Ok(json!({ "chainId": chain_id, "chainName": endpoint.name }))
    }

    async fn get_config(&self) -> Result<Value, SynthxError> {
        let config = self.store.config().await?;
        Ok(json!({
            "configured": config.is_configured(),
            "chainId": config.chain_id,
            "maskedKey": config.masked_key(),
        }))
    }

    async fn trade_history(&self) -> Result<Value, SynthxError> {
        let state = self.store.load().await?;
        Ok(json!({ "trades": to_json(&state.trade_history)? }))
    }

    async fn analyze_page(&self, message: &ExtensionMessage) -> Reply {
        let outcome = async {
            self.require_ai()?;
            let payload: PagePayload = message.payload()?;
            self.explainer.analyze_page(&payload.page_data).await
        }
        .await;
        explainer_reply(outcome)
    }

    async fn ask_follow_up(&self, message: &ExtensionMessage) -> Reply {
        let outcome = async {
            self.require_ai()?;
            let payload: FollowUpPayload = message.payload()?;
            self.explainer.ask_follow_up(&payload.page_data, &payload.question).await
        }
        .await;
        explainer_reply(outcome)
    }
}

fn explainer_reply(outcome: Result<crate::ai::AnalysisResult, SynthxError>) -> Reply {
    match outcome {
        Ok(analysis) => Reply::Explainer(ExplainerReply::Analysis(analysis)),
        Err(e) => {
            warn!("[Orchestrator] Explainer failed ({}): {}", e.kind(), e);
            Reply::Explainer(ExplainerReply::Error(e.to_string()))
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, SynthxError> {
    serde_json::to_value(value).map_err(|e| SynthxError::Parse(e.to_string()))
}
