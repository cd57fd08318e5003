// --- Wire structs shared by the orchestrator and the HTTP routes ---
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ai::AnalysisResult;
use crate::analyzers::PageData;
use crate::error::SynthxError;

/// `{action, data}` as posted by a UI surface. The explainer variant puts
/// its fields at the top level instead of under `data`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtensionMessage {
    pub action: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExtensionMessage {
    pub fn new(action: impl Into<String>, data: Value) -> Self {
        Self { action: action.into(), data, extra: Map::new() }
    }

    /// Top-level fields overlaid with `data`, decoded into `T`
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, SynthxError> {
        let mut merged = self.extra.clone();
        if let Value::Object(fields) = &self.data {
            merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        serde_json::from_value(Value::Object(merged))
            .map_err(|e| SynthxError::validation(format!("Invalid {} request: {e}", self.action)))
    }
}

// --- Response shapes ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `{analysis}` or `{error}`, used by the page explainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplainerReply {
    Analysis(AnalysisResult),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    Envelope(Envelope),
    Explainer(ExplainerReply),
}

impl Reply {
    pub fn ok(data: Value) -> Self {
        Reply::Envelope(Envelope { success: true, data: Some(data), error: None })
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Reply::Envelope(Envelope { success: false, data: None, error: Some(error.into()) })
    }

    pub fn is_success(&self) -> bool {
        match self {
            Reply::Envelope(envelope) => envelope.success,
            Reply::Explainer(reply) => matches!(reply, ExplainerReply::Analysis(_)),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Reply::Envelope(envelope) => envelope.error.as_deref(),
            Reply::Explainer(ExplainerReply::Error(error)) => Some(error),
            Reply::Explainer(ExplainerReply::Analysis(_)) => None,
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Reply::Envelope(envelope) => envelope.data.as_ref(),
            Reply::Explainer(_) => None,
        }
    }
}

// --- Request payloads ---

#[derive(Debug, Clone, Deserialize)]
pub struct AddressPayload {
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    pub token_address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletPayload {
    pub wallet_address: String,
    #[serde(default)]
    pub days: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeCommandPayload {
    pub command: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotePayload {
    pub from_token: String,
    pub to_token: String,
    pub amount: String,
    #[serde(default)]
    pub platform: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyPayload {
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainIdPayload {
    pub chain_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePayload {
    pub page_data: PageData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpPayload {
    pub page_data: PageData,
    #[serde(default)]
    pub question: String,
}

// --- Tab WebSocket frames ---

/// Frames a content script sends over `/api/v1/tabs/connect`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TabClientFrame {
    Hello {
        tab_id: u32,
        #[serde(default)]
        active: bool,
    },
    Focus,
    Response {
        request_id: uuid::Uuid,
        response: crate::bridge::TabResponse,
    },
}

/// Frames the server pushes to a connected content script
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TabServerFrame {
    Request {
        request_id: uuid::Uuid,
        request: crate::bridge::TabRequest,
    },
}
