use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::parse::{JsonSpan, first_json_object};
use super::prompts;
use super::schema::{AnalysisResult, TokenSafetyVerdict, WalletInsight};
use super::transport::{ChatRequest, ChatTransport};
use super::{AiError, MISSING_KEY_MESSAGE};
use crate::config::AiConfig;

/// A chat reply: parsed JSON when the model returned an object, raw prose otherwise
#[derive(Debug, Clone, PartialEq)]
pub enum ChatReply {
    Json(Value),
    Text(String),
}

impl ChatReply {
    fn into_json(self) -> Result<Value, AiError> {
        match self {
            ChatReply::Json(value) => Ok(value),
            ChatReply::Text(_) => Err(AiError::Parse("No JSON found in response".to_string())),
        }
    }
}

#[derive(Clone)]
pub struct AiClient {
    transport: Arc<dyn ChatTransport>,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

impl AiClient {
    pub fn new(transport: Arc<dyn ChatTransport>, api_key: Option<String>, config: &AiConfig) -> Self {
        Self {
            transport,
            api_key: api_key.filter(|k| !k.is_empty()),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    /// Same transport and model, different key
    pub fn with_api_key(&self, api_key: String) -> Self {
        Self {
            api_key: Some(api_key).filter(|k| !k.is_empty()),
            ..self.clone()
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn chat(&self, user_message: &str, system_prompt: &str) -> Result<ChatReply, AiError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(AiError::Config(MISSING_KEY_MESSAGE.to_string()));
        };

        info!("[Claude] Sending message ({} chars)", user_message.len());
        let text = self
            .transport
            .send(ChatRequest {
                api_key,
                model: &self.model,
                max_tokens: self.max_tokens,
                system: system_prompt,
                user: user_message,
            })
            .await?;

        match first_json_object(&text) {
            JsonSpan::Found(span) => {
                debug!("[Claude] Parsing as JSON");
                serde_json::from_str(span)
                    .map(ChatReply::Json)
                    .map_err(|e| AiError::Parse(format!("Invalid JSON in response: {e}")))
            }
            JsonSpan::Unbalanced => Err(AiError::Parse("Unterminated JSON object in response".to_string())),
            JsonSpan::Absent => {
                debug!("[Claude] Returning as plain text");
                Ok(ChatReply::Text(text))
            }
        }
    }

    pub async fn analyze_token_safety<T: Serialize + Sync>(
        &self,
        data: &T,
    ) -> Result<TokenSafetyVerdict, AiError> {
        let message = prompts::token_safety_message(&pretty(data)?);
        let json = self.chat(&message, prompts::TOKEN_SAFETY).await?.into_json()?;
        TokenSafetyVerdict::from_value(&json)
    }

    pub async fn analyze_wallet_activity<T: Serialize + Sync>(
        &self,
        data: &T,
    ) -> Result<WalletInsight, AiError> {
        let message = prompts::wallet_activity_message(&pretty(data)?);
        let json = self.chat(&message, prompts::WALLET_ACTIVITY).await?.into_json()?;
        WalletInsight::from_value(&json)
    }

    pub async fn explain<T: Serialize + Sync>(
        &self,
        kind: &str,
        data: &T,
    ) -> Result<AnalysisResult, AiError> {
        let message = prompts::explain_message(kind, &pretty(data)?);
        let json = self.chat(&message, prompts::PAGE_EXPLAINER).await?.into_json()?;
        AnalysisResult::from_value(&json)
    }

    /// Free-form question; prose answers are expected and wrapped
    pub async fn ask_follow_up<T: Serialize + Sync>(
        &self,
        kind: &str,
        data: &T,
        question: &str,
    ) -> Result<AnalysisResult, AiError> {
        let message = prompts::follow_up_message(kind, &pretty(data)?, question);
        match self.chat(&message, prompts::FOLLOW_UP).await? {
            ChatReply::Text(text) => Ok(AnalysisResult::from_prose(&text)),
            ChatReply::Json(json) => AnalysisResult::from_value(&json).or_else(|_| {
                warn!("[Claude] Follow-up JSON did not match explanation shape");
                Ok(AnalysisResult::from_prose(&json.to_string()))
            }),
        }
    }
}

fn pretty<T: Serialize>(data: &T) -> Result<String, AiError> {
    serde_json::to_string_pretty(data).map_err(|e| AiError::Parse(e.to_string()))
}

/// The held AI client; reconfiguration swaps the whole instance at once
pub struct AiSlot {
    inner: RwLock<Arc<AiClient>>,
}

impl AiSlot {
    pub fn new(client: AiClient) -> Self {
        Self { inner: RwLock::new(Arc::new(client)) }
    }

    pub fn current(&self) -> Arc<AiClient> {
        self.inner.read().clone()
    }

    pub fn replace(&self, client: AiClient) {
        *self.inner.write() = Arc::new(client);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Canned {
        reply: Result<String, AiError>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatTransport for Canned {
        async fn send(&self, _request: ChatRequest<'_>) -> Result<String, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    fn client(reply: Result<&str, AiError>, key: Option<&str>) -> (AiClient, Arc<Canned>) {
        let transport = Arc::new(Canned {
            reply: reply.map(String::from),
            calls: AtomicUsize::new(0),
        });
        let client = AiClient::new(transport.clone(), key.map(String::from), &AiConfig::default());
        (client, transport)
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let (client, transport) = client(Ok("{}"), None);
        let err = client.chat("hi", "").await.unwrap_err();
        assert_eq!(err, AiError::Config(MISSING_KEY_MESSAGE.to_string()));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn prose_is_returned_unparsed() {
        let (client, _) = client(Ok("It is a multisig wallet."), Some("sk-ant-1"));
        assert_eq!(
            client.chat("q", "").await.unwrap(),
            ChatReply::Text("It is a multisig wallet.".to_string())
        );
    }

    #[tokio::test]
    async fn malformed_object_is_parse_error() {
        let (client, _) = client(Ok("Result: {verdict: SAFE}"), Some("sk-ant-1"));
        assert!(matches!(client.chat("q", "").await, Err(AiError::Parse(_))));
    }

    #[tokio::test]
    async fn structured_call_requires_json() {
        let (client, _) = client(Ok("I cannot tell."), Some("sk-ant-1"));
        let err = client.analyze_token_safety(&serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, AiError::Parse(_)));
    }

    #[tokio::test]
    async fn follow_up_wraps_prose() {
        let (client, _) = client(Ok("Yes, it was a swap."), Some("sk-ant-1"));
        let result = client
            .ask_follow_up("transaction", &serde_json::json!({"hash": "0x1"}), "Was it a swap?")
            .await
            .unwrap();
        assert_eq!(result.summary, "Yes, it was a swap.");
        assert!(result.risks.is_empty());
    }

    #[test]
    fn slot_replacement_is_visible_to_new_readers() {
        let (unconfigured, _) = client(Ok("{}"), None);
        let slot = AiSlot::new(unconfigured);
        let before = slot.current();
        slot.replace(before.with_api_key("sk-ant-new".into()));
        assert!(!before.is_configured());
        assert!(slot.current().is_configured());
    }
}
