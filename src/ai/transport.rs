use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, error};

use super::AiError;
use crate::config::AiConfig;

/// One single-turn request to the chat endpoint
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub api_key: &'a str,
    pub model: &'a str,
    pub max_tokens: u32,
    pub system: &'a str,
    pub user: &'a str,
}

/// Sends a chat request and returns the first text block of the reply
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: ChatRequest<'_>) -> Result<String, AiError>;
}

/// Anthropic messages API over reqwest
pub struct AnthropicHttp {
    client: Client,
    api_base: String,
    anthropic_version: String,
}

impl AnthropicHttp {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            client: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            anthropic_version: config.anthropic_version.clone(),
        }
    }

    fn payload(request: &ChatRequest<'_>) -> Value {
        let mut payload = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "messages": [
                { "role": "user", "content": request.user }
            ],
        });
        if !request.system.is_empty() {
            payload["system"] = Value::String(request.system.to_string());
        }
        payload
    }
}

#[async_trait]
impl ChatTransport for AnthropicHttp {
    async fn send(&self, request: ChatRequest<'_>) -> Result<String, AiError> {
        debug!("[Claude] Sending message to {} ({})", self.api_base, request.model);

        let response = self
            .client
            .post(format!("{}/messages", self.api_base))
            .header("Content-Type", "application/json")
            .header("x-api-key", request.api_key)
            .header("anthropic-version", &self.anthropic_version)
            .header("anthropic-dangerous-direct-browser-access", "true")
            .json(&Self::payload(&request))
            .send()
            .await
            .map_err(|e| AiError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body["error"]["message"]
                .as_str()
                .map(String::from)
                .unwrap_or_else(|| format!("API error {status}"));
            error!("[Claude] Error: {}", message);
            return Err(AiError::Api { status, message });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AiError::Transport(e.to_string()))?;

        json["content"][0]["text"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AiError::Parse("No text content in Claude response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_omitted_when_empty() {
        let request = ChatRequest {
            api_key: "sk-ant-x",
            model: "m",
            max_tokens: 16,
            system: "",
            user: "hi",
        };
        let payload = AnthropicHttp::payload(&request);
        assert!(payload.get("system").is_none());
        assert_eq!(payload["messages"][0]["content"], "hi");
    }
}
