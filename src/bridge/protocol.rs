//! Wire types for the two bridge hops: tab-scoped requests between the
//! background and a content script, and tagged window broadcasts between
//! the content script and the page script.

use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::WalletError;
use crate::pricing::SwapQuote;

pub type RequestId = Uuid;

/// Swap lifecycle; `Confirmed` and `Failed` are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapPhase {
    Idle,
    TabResolved,
    ScriptEnsured,
    QuoteRequested,
    QuoteReceived,
    TxBuilt,
    TxSubmitted,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapOrder {
    pub from_token: String,
    pub to_token: String,
    pub amount: String,
    /// Quote the user saw; the page re-quotes before building the transaction
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_quote")]
    pub quote: Option<SwapQuote>,
}

/// A display quote that does not parse is dropped rather than failing the order
fn lenient_quote<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SwapQuote>, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| serde_json::from_value(value).ok()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapReceipt {
    pub tx_hash: String,
    pub wallet_address: String,
    pub quote: SwapQuote,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_tx_hash: Option<String>,
    pub phases: Vec<SwapPhase>,
}

/// Same-window broadcast between content script and page script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum WindowMessage {
    #[serde(rename = "SYNTHX_PING")]
    Ping { request_id: RequestId },

    /// Sent once the page script's listener is registered, and in answer to a ping
    #[serde(rename = "SYNTHX_READY")]
    Ready {
        #[serde(default)]
        request_id: Option<RequestId>,
    },

    #[serde(rename = "SYNTHX_EXECUTE_SWAP")]
    ExecuteSwap { request_id: RequestId, payload: SwapOrder },

    #[serde(rename = "SYNTHX_SWAP_RESULT")]
    SwapResult { request_id: RequestId, result: SwapReceipt },

    #[serde(rename = "SYNTHX_SWAP_ERROR")]
    SwapError {
        request_id: RequestId,
        error: String,
        #[serde(default)]
        wallet: Option<WalletError>,
    },

    #[serde(rename = "SYNTHX_CHECK_WALLET")]
    CheckWallet { request_id: RequestId },

    #[serde(rename = "SYNTHX_WALLET_INFO")]
    WalletInfo { request_id: RequestId, wallet_address: String },

    #[serde(rename = "SYNTHX_WALLET_ERROR")]
    WalletError {
        request_id: RequestId,
        error: String,
        #[serde(default)]
        wallet: Option<WalletError>,
    },
}

/// Which request a reply answers; success and error variants share a family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyFamily {
    Swap,
    Wallet,
    Ready,
}

impl WindowMessage {
    pub fn type_tag(&self) -> &'static str {
        match self {
            WindowMessage::Ping { .. } => "SYNTHX_PING",
            WindowMessage::Ready { .. } => "SYNTHX_READY",
            WindowMessage::ExecuteSwap { .. } => "SYNTHX_EXECUTE_SWAP",
            WindowMessage::SwapResult { .. } => "SYNTHX_SWAP_RESULT",
            WindowMessage::SwapError { .. } => "SYNTHX_SWAP_ERROR",
            WindowMessage::CheckWallet { .. } => "SYNTHX_CHECK_WALLET",
            WindowMessage::WalletInfo { .. } => "SYNTHX_WALLET_INFO",
            WindowMessage::WalletError { .. } => "SYNTHX_WALLET_ERROR",
        }
    }

    /// `(request, family)` for replies, `None` for requests and announcements
    pub fn reply_key(&self) -> Option<(RequestId, ReplyFamily)> {
        match self {
            WindowMessage::SwapResult { request_id, .. } | WindowMessage::SwapError { request_id, .. } => {
                Some((*request_id, ReplyFamily::Swap))
            }
            WindowMessage::WalletInfo { request_id, .. } | WindowMessage::WalletError { request_id, .. } => {
                Some((*request_id, ReplyFamily::Wallet))
            }
            WindowMessage::Ready { request_id: Some(id) } => Some((*id, ReplyFamily::Ready)),
            _ => None,
        }
    }
}

const WINDOW_CAPACITY: usize = 64;

/// The page window's message bus; every subscriber sees every post,
/// including its own
#[derive(Clone)]
pub struct WindowBus {
    tx: broadcast::Sender<WindowMessage>,
}

impl WindowBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(WINDOW_CAPACITY);
        Self { tx }
    }

    pub fn post(&self, message: WindowMessage) {
        // no listeners is not an error for a window post
        let _ = self.tx.send(message);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WindowMessage> {
        self.tx.subscribe()
    }
}

impl Default for WindowBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Background → content script request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum TabRequest {
    ExecuteSwap(SwapOrder),
    CheckWallet,
}

/// Content script → background reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TabResponse {
    SwapExecuted { receipt: SwapReceipt },
    WalletInfo { wallet_address: String },
    Failed {
        error: String,
        #[serde(default)]
        wallet: Option<WalletError>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn window_messages_use_type_discriminator() {
        let id = Uuid::new_v4();
        let msg = WindowMessage::SwapError { request_id: id, error: "rejected".into(), wallet: None };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "SYNTHX_SWAP_ERROR");
        assert_eq!(json["requestId"], id.to_string());
        assert_eq!(msg.reply_key(), Some((id, ReplyFamily::Swap)));

        let announced: WindowMessage = serde_json::from_value(json!({"type": "SYNTHX_READY"})).unwrap();
        assert_eq!(announced, WindowMessage::Ready { request_id: None });
        assert_eq!(announced.reply_key(), None);
    }

    #[test]
    fn tab_request_shape() {
        let request = TabRequest::ExecuteSwap(SwapOrder {
            from_token: "ETH".into(),
            to_token: "USDC".into(),
            amount: "0.1".into(),
            quote: None,
        });
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, json!({"action": "executeSwap", "fromToken": "ETH", "toToken": "USDC", "amount": "0.1"}));
    }

    #[test]
    fn bus_delivers_to_every_subscriber() {
        let bus = WindowBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        bus.post(WindowMessage::Ready { request_id: None });
        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_ok());
    }
}
