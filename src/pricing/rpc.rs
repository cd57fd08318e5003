use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Node { code: i64, message: String },

    #[error("{0} result was missing")]
    MissingResult(String),
}

/// JSON-RPC 2.0 call returning the `result` member
#[async_trait]
pub trait JsonRpc: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

pub struct HttpJsonRpc {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpJsonRpc {
    pub fn new(url: impl Into<String>) -> Self {
        Self { client: Client::new(), url: url.into(), next_id: AtomicU64::new(1) }
    }
}

#[async_trait]
impl JsonRpc for HttpJsonRpc {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!("[RPC] {} #{}", method, id);

        let response: Value = self
            .client
            .post(&self.url)
            .json(&json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        if let Some(error) = response.get("error") {
            return Err(RpcError::Node {
                code: error["code"].as_i64().unwrap_or(-32000),
                message: error["message"].as_str().unwrap_or("unknown error").to_string(),
            });
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| RpcError::MissingResult(method.to_string()))
    }
}
