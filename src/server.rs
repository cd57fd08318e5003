//! # Server Module
//!
//! HTTP server setup and route configuration for the SynthX core.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method, header};
use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::analyzers::SystemClock;
use crate::ai::AnthropicHttp;
use crate::bridge::{ContentScript, JsonRpcWallet, PageRealm, TabId, TabRegistry, WalletProvider};
use crate::config::Config;
use crate::explorer::HttpExplorerTransport;
use crate::orchestrator::{Collaborators, Orchestrator};
use crate::pricing::{HttpJsonRpc, UniswapV3Pricing};
use crate::routes::{health::ping, message, tabs};
use crate::storage::JsonFileStore;

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub tabs: Arc<TabRegistry>,
    /// How long a connecting tab has to send its hello frame
    pub hello_timeout: Duration,
}

/// Extension pages and the local dev UI
fn allowed_origin(origin: &HeaderValue) -> bool {
    origin.to_str().is_ok_and(|origin| {
        origin.starts_with("chrome-extension://")
            || origin.starts_with("moz-extension://")
            || origin.starts_with("http://localhost")
            || origin.starts_with("http://127.0.0.1")
    })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/api/v1/message", post(message::post_message))
        .route("/api/v1/tabs/connect", get(tabs::connect_tab))
        .layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_origin(AllowOrigin::predicate(|origin, _| allowed_origin(origin)))
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT])
                    .max_age(Duration::from_secs(600)),
            ),
        )
        .with_state(state)
}

/// Tab id of the in-process page backed by `WALLET_RPC_URL`
pub const WALLET_RPC_TAB: TabId = 0;

/// Wires the real HTTP collaborators into one orchestrator
pub async fn build_state(config: &Config) -> Result<AppState> {
    let tabs = Arc::new(TabRegistry::new());
    let explorer = HttpExplorerTransport::new(config.explorer.request_timeout)
        .context("Failed to build explorer HTTP client")?;
    let rpc = Arc::new(HttpJsonRpc::new(config.pricing.rpc_url.clone()));
    let pricing = Arc::new(UniswapV3Pricing::new(rpc));

    if let Some(url) = &config.bridge.wallet_rpc_url {
        let wallet: Arc<dyn WalletProvider> = Arc::new(JsonRpcWallet::new(Arc::new(HttpJsonRpc::new(url.clone()))));
        let page = Arc::new(PageRealm::new(Some(wallet), pricing.clone()));
        let content = ContentScript::new(page, config.bridge.ready_timeout);
        tabs.attach_local(WALLET_RPC_TAB, Arc::new(content));
        tracing::info!("👛 Wallet RPC {} served as tab {}", url, WALLET_RPC_TAB);
    }

    let orchestrator = Orchestrator::start(Collaborators {
        store: Arc::new(JsonFileStore::new(config.storage_path.clone())),
        explorer: Arc::new(explorer),
        chat: Arc::new(AnthropicHttp::new(&config.ai)),
        pricing,
        tabs: tabs.clone(),
        clock: Arc::new(SystemClock),
        ai: config.ai.clone(),
    })
    .await
    .context("Failed to load extension storage")?;

    Ok(AppState { orchestrator, tabs, hello_timeout: config.bridge.ready_timeout })
}

/// Starts the SynthX HTTP server and serves until the process ends.
pub async fn start(config: Config) -> Result<()> {
    let state = build_state(&config).await?;
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr} - port may already be in use"))?;

    tracing::info!("🚀 SynthX server starting...");
    tracing::info!("📡 Listening on http://{}", addr);
    tracing::info!("🏥 Health check available at http://{}/ping", addr);
    tracing::info!("✉️  Messages accepted at http://{}/api/v1/message", addr);
    tracing::info!("🔌 Tabs connect at ws://{}/api/v1/tabs/connect", addr);
    tracing::info!("💾 Storage: {}", config.storage_path.display());

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
