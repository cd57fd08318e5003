use std::sync::Arc;

use tracing::{error, info};

use super::protocol::{SwapOrder, SwapPhase, SwapReceipt, TabRequest, TabResponse};
use super::tabs::TabMessenger;
use crate::error::{BridgeError, SynthxError, WalletError};

/// Background side of a swap: resolve the tab, forward, surface the outcome.
/// Nothing here retries; every bridge or wallet failure is returned as is.
#[derive(Clone)]
pub struct SwapPipeline {
    tabs: Arc<dyn TabMessenger>,
}

fn failed(error: SynthxError) -> SynthxError {
    error!("[Swap] {:?}: {}", SwapPhase::Failed, error);
    error
}

fn page_failure(error: String, wallet: Option<WalletError>) -> SynthxError {
    match wallet {
        Some(wallet) => wallet.into(),
        None => BridgeError::ContentScriptUnreachable(error).into(),
    }
}

impl SwapPipeline {
    pub fn new(tabs: Arc<dyn TabMessenger>) -> Self {
        Self { tabs }
    }

    pub async fn execute(&self, order: SwapOrder) -> Result<SwapReceipt, SynthxError> {
        info!("[Swap] {:?}: {} {} → {}", SwapPhase::Idle, order.amount, order.from_token, order.to_token);

        let tab = self
            .tabs
            .active_tab()
            .await
            .ok_or_else(|| failed(BridgeError::NoActiveTab.into()))?;
        info!("[Swap] {:?}: tab {}", SwapPhase::TabResolved, tab);

        let response = self
            .tabs
            .send(tab, TabRequest::ExecuteSwap(order))
            .await
            .map_err(|e| failed(e.into()))?;

        match response {
            TabResponse::SwapExecuted { mut receipt } => {
                for phase in &receipt.phases {
                    info!("[Swap] {:?}", phase);
                }
                receipt.phases.insert(0, SwapPhase::TabResolved);
                receipt.phases.push(SwapPhase::Confirmed);
                info!("[Swap] {:?}: {}", SwapPhase::Confirmed, receipt.tx_hash);
                Ok(receipt)
            }
            TabResponse::Failed { error, wallet } => Err(failed(page_failure(error, wallet))),
            TabResponse::WalletInfo { .. } => Err(failed(
                BridgeError::ContentScriptUnreachable("content script answered with wallet info".to_string()).into(),
            )),
        }
    }

    pub async fn check_wallet(&self) -> Result<String, SynthxError> {
        let tab = self.tabs.active_tab().await.ok_or(BridgeError::NoActiveTab)?;
        match self.tabs.send(tab, TabRequest::CheckWallet).await? {
            TabResponse::WalletInfo { wallet_address } => Ok(wallet_address),
            TabResponse::Failed { error, wallet } => Err(page_failure(error, wallet)),
            TabResponse::SwapExecuted { .. } => {
                Err(BridgeError::ContentScriptUnreachable("content script answered with a swap".to_string()).into())
            }
        }
    }
}
