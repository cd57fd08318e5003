//! Configuration module for environment variables and application settings

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Result, anyhow};

#[derive(Debug, Clone)]
pub struct Config {
    /// Anthropic messages API configuration
    pub ai: AiConfig,

    /// Block explorer configuration
    pub explorer: ExplorerConfig,

    /// Swap pricing / wallet RPC configuration
    pub pricing: PricingConfig,

    /// Page-context bridge timing
    pub bridge: BridgeConfig,

    /// Where the extension-local settings file lives
    pub storage_path: PathBuf,

    /// Server configuration
    pub server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_base: String,
    pub model: String,
    pub max_tokens: u32,
    pub anthropic_version: String,
}

#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub rpc_url: String,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Upper bound on waiting for an injected page script to announce itself
    pub ready_timeout: Duration,
    /// EIP-1193 JSON-RPC endpoint (e.g. a local signer node) served as an
    /// in-process tab; none means only connected browser tabs are reachable
    pub wallet_rpc_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.anthropic.com/v1".to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 1024,
            anthropic_version: "2023-06-01".to_string(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { ready_timeout: Duration::from_millis(1500), wallet_rpc_url: None }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = AiConfig::default();

        let port = match env::var("PORT").or_else(|_| env::var("SERVER_PORT")) {
            Ok(raw) => raw
                .parse()
                .map_err(|_| anyhow!("SERVER_PORT must be a port number, got {raw}"))?,
            Err(_) => 3000,
        };

        Ok(Self {
            ai: AiConfig {
                api_base: env::var("ANTHROPIC_API_BASE").unwrap_or(defaults.api_base),
                model: env::var("ANTHROPIC_MODEL").unwrap_or(defaults.model),
                max_tokens: env::var("ANTHROPIC_MAX_TOKENS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.max_tokens),
                anthropic_version: defaults.anthropic_version,
            },

            explorer: ExplorerConfig {
                request_timeout: Duration::from_secs(
                    env::var("EXPLORER_TIMEOUT_SECS")
                        .ok()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(30),
                ),
            },

            pricing: PricingConfig {
                rpc_url: env::var("PRICING_RPC_URL")
                    .unwrap_or_else(|_| "https://rpc.sepolia.org".to_string()),
            },

            bridge: BridgeConfig {
                ready_timeout: Duration::from_millis(
                    env::var("BRIDGE_READY_TIMEOUT_MS")
                        .ok()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(1500),
                ),
                wallet_rpc_url: env::var("WALLET_RPC_URL").ok().filter(|url| !url.trim().is_empty()),
            },

            storage_path: env::var("SYNTHX_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("synthx-storage.json")),

            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port,
            },
        })
    }
}
