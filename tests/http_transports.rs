mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use common::*;
use synthx::ai::{AiError, AnthropicHttp, ChatRequest, ChatTransport};
use synthx::WalletError;
use synthx::bridge::{JsonRpcWallet, TabMessenger, WalletProvider};
use synthx::config::{AiConfig, BridgeConfig, Config, ExplorerConfig, PricingConfig, ServerConfig};
use synthx::explorer::{AddressKind, ChainEndpoint, FetchError, HexAddress, HttpExplorerTransport, OnchainFetcher};
use synthx::pricing::{HttpJsonRpc, JsonRpc, RpcError};
use synthx::server::{AppState, WALLET_RPC_TAB, build_state, router};

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    addr
}

type Socket = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn connect_tab(addr: SocketAddr, tab: u32) -> Socket {
    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/api/v1/tabs/connect"))
        .await
        .unwrap();
    socket
        .send(Message::Text(json!({ "type": "hello", "tabId": tab, "active": true }).to_string()))
        .await
        .unwrap();
    socket
}

async fn next_request(socket: &mut Socket) -> Value {
    loop {
        match socket.next().await.unwrap().unwrap() {
            Message::Text(text) => break serde_json::from_str::<Value>(&text).unwrap(),
            _ => continue,
        }
    }
}

async fn post_message(addr: SocketAddr, body: Value) -> Value {
    reqwest::Client::new()
        .post(format!("http://{addr}/api/v1/message"))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

/// JSON-RPC wallet node: Sepolia account that rejects every send like a user would
fn wallet_node() -> Router {
    Router::new().route(
        "/",
        post(|Json(body): Json<Value>| async move {
            let id = body["id"].clone();
            Json(match body["method"].as_str() {
                Some("eth_requestAccounts") => json!({ "jsonrpc": "2.0", "id": id, "result": [ADDRESS] }),
                Some("eth_chainId") => json!({ "jsonrpc": "2.0", "id": id, "result": SEPOLIA }),
                Some("eth_sendTransaction") => json!({
                    "jsonrpc": "2.0", "id": id,
                    "error": { "code": 4001, "message": "MetaMask Tx Signature: User denied transaction signature." }
                }),
                _ => json!({ "jsonrpc": "2.0", "id": id, "error": { "code": -32601, "message": "method not found" } }),
            })
        }),
    )
}

fn request<'a>(api_key: &'a str) -> ChatRequest<'a> {
    ChatRequest { api_key, model: "claude-test", max_tokens: 64, system: "be brief", user: "hello" }
}

#[tokio::test]
async fn explorer_transport_reads_blockscout_v2() {
    let app = Router::new()
        .route(
            "/api/v2/addresses/{address}",
            get(|Path(address): Path<String>| async move {
                Json(json!({ "hash": address, "is_contract": false, "coin_balance": "2500000000000000", "transactions_count": "12" }))
            }),
        )
        .route(
            "/api/v2/addresses/{address}/token-transfers",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
    let addr = serve(app).await;

    let fetcher = OnchainFetcher::new(Arc::new(HttpExplorerTransport::new(Duration::from_secs(5)).unwrap()));
    let endpoint = ChainEndpoint::custom("1", format!("http://{addr}/api/v2"));
    let address = HexAddress::parse(ADDRESS).unwrap();

    let err = fetcher.get_address_summary(&address, &endpoint).await.unwrap_err();
    assert_eq!(err, FetchError::Status { status: 429, endpoint: format!("/api/v2/addresses/{ADDRESS}/token-transfers") });

    let app = Router::new()
        .route(
            "/api/v2/addresses/{address}",
            get(|| async { Json(json!({ "is_contract": false, "coin_balance": "2500000000000000", "transactions_count": "12" })) }),
        )
        .route("/api/v2/addresses/{address}/token-transfers", get(|| async { Json(json!({ "items": [] })) }));
    let addr = serve(app).await;
    let endpoint = ChainEndpoint::custom("1", format!("http://{addr}/api/v2"));

    let summary = fetcher.get_address_summary(&address, &endpoint).await.unwrap();
    assert_eq!(summary.kind, AddressKind::Wallet);
    assert_eq!(summary.tx_count, 12);
    assert_eq!(summary.balance_display(), "0.0025 ETH");
}

#[tokio::test]
async fn anthropic_transport_sends_headers_and_reads_text() {
    let app = Router::new().route(
        "/v1/messages",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some("sk-ant-good") {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "type": "error", "error": { "type": "authentication_error", "message": "invalid x-api-key" } })),
                );
            }
            assert_eq!(body["system"], "be brief");
            assert_eq!(body["messages"][0]["role"], "user");
            (StatusCode::OK, Json(json!({ "content": [{ "type": "text", "text": "hi there" }] })))
        }),
    );
    let addr = serve(app).await;

    let config = AiConfig { api_base: format!("http://{addr}/v1/"), ..AiConfig::default() };
    let transport = AnthropicHttp::new(&config);

    assert_eq!(transport.send(request("sk-ant-good")).await.unwrap(), "hi there");
    assert_eq!(
        transport.send(request("sk-ant-bad")).await.unwrap_err(),
        AiError::Api { status: 401, message: "invalid x-api-key".into() }
    );
}

#[tokio::test]
async fn anthropic_transport_falls_back_to_status_text() {
    let app = Router::new().route("/v1/messages", post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }));
    let addr = serve(app).await;

    let transport = AnthropicHttp::new(&AiConfig { api_base: format!("http://{addr}/v1"), ..AiConfig::default() });
    assert_eq!(
        transport.send(request("sk-ant-good")).await.unwrap_err(),
        AiError::Api { status: 502, message: "API error 502".into() }
    );
}

#[tokio::test]
async fn json_rpc_surfaces_node_errors() {
    let app = Router::new().route(
        "/",
        post(|Json(body): Json<Value>| async move {
            match body["method"].as_str() {
                Some("eth_chainId") => Json(json!({ "jsonrpc": "2.0", "id": body["id"], "result": "0xaa36a7" })),
                _ => Json(json!({ "jsonrpc": "2.0", "id": body["id"], "error": { "code": -32601, "message": "method not found" } })),
            }
        }),
    );
    let addr = serve(app).await;
    let rpc = HttpJsonRpc::new(format!("http://{addr}/"));

    assert_eq!(rpc.call("eth_chainId", json!([])).await.unwrap(), json!(SEPOLIA));
    assert_eq!(
        rpc.call("eth_foo", json!([])).await.unwrap_err(),
        RpcError::Node { code: -32601, message: "method not found".into() }
    );
}

#[tokio::test]
async fn remote_tab_answers_wallet_checks_over_websocket() {
    let h = HarnessBuilder::new().build().await;
    let state = AppState {
        orchestrator: h.orchestrator.clone(),
        tabs: h.tabs.clone(),
        hello_timeout: Duration::from_secs(2),
    };
    let addr = serve(router(state)).await;

    let ping = post_message(addr, json!({ "action": "ping" })).await;
    assert_eq!(ping, json!({ "success": true, "data": { "status": "pong" } }));

    let mut socket = connect_tab(addr, 9).await;
    for _ in 0..50 {
        if h.tabs.active_tab().await == Some(9) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.tabs.active_tab().await, Some(9));

    let pending = tokio::spawn(async move { post_message(addr, json!({ "action": "checkWallet", "data": {} })).await });

    let frame = next_request(&mut socket).await;
    assert_eq!(frame["type"], "request");
    assert_eq!(frame["request"]["action"], "checkWallet");

    socket
        .send(Message::Text(
            json!({
                "type": "response",
                "requestId": frame["requestId"],
                "response": { "status": "walletInfo", "walletAddress": ADDRESS }
            })
            .to_string(),
        ))
        .await
        .unwrap();

    let reply = pending.await.unwrap();
    assert_eq!(reply, json!({ "success": true, "data": { "walletAddress": ADDRESS } }));

    socket.close(None).await.unwrap();
    for _ in 0..50 {
        if h.tabs.active_tab().await.is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.tabs.active_tab().await, None);
}

#[tokio::test]
async fn reconnecting_tab_keeps_the_new_connection() {
    let h = HarnessBuilder::new().build().await;
    let state = AppState { orchestrator: h.orchestrator.clone(), tabs: h.tabs.clone(), hello_timeout: Duration::from_secs(2) };
    let addr = serve(router(state)).await;

    let mut first = connect_tab(addr, 9).await;
    for _ in 0..50 {
        if h.tabs.active_tab().await == Some(9) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let mut second = connect_tab(addr, 9).await;
    // the server closes the replaced connection once the new one is registered
    let closed = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match first.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "replaced connection stayed open");
    assert_eq!(h.tabs.active_tab().await, Some(9));

    let pending = tokio::spawn(async move { post_message(addr, json!({ "action": "checkWallet" })).await });
    let frame = next_request(&mut second).await;
    second
        .send(Message::Text(
            json!({
                "type": "response",
                "requestId": frame["requestId"],
                "response": { "status": "walletInfo", "walletAddress": ADDRESS }
            })
            .to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(pending.await.unwrap(), json!({ "success": true, "data": { "walletAddress": ADDRESS } }));
}

#[tokio::test]
async fn malformed_message_bodies_still_get_an_envelope() {
    let h = HarnessBuilder::new().build().await;
    let state = AppState { orchestrator: h.orchestrator.clone(), tabs: h.tabs.clone(), hello_timeout: Duration::from_secs(2) };
    let addr = serve(router(state)).await;
    let http = reqwest::Client::new();

    let missing_action = http
        .post(format!("http://{addr}/api/v1/message"))
        .json(&json!({ "data": { "address": "0x1" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_action.status(), reqwest::StatusCode::OK);
    let reply: Value = missing_action.json().await.unwrap();
    assert_eq!(reply["success"], false);
    assert!(reply["error"].as_str().unwrap().starts_with("Invalid message"));

    let not_json: Value = http
        .post(format!("http://{addr}/api/v1/message"))
        .header("content-type", "application/json")
        .body("{action:")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(not_json["success"], false);
    assert_eq!(h.chat.calls() + h.explorer.calls(), 0);
}

#[tokio::test]
async fn json_rpc_wallet_maps_provider_errors() {
    let addr = serve(wallet_node()).await;
    let wallet = JsonRpcWallet::new(Arc::new(HttpJsonRpc::new(format!("http://{addr}/"))));

    assert_eq!(wallet.request("eth_chainId", json!([])).await.unwrap(), json!(SEPOLIA));
    assert_eq!(
        wallet.request("eth_sendTransaction", json!([{}])).await.unwrap_err(),
        WalletError::TransactionFailed("User rejected the request".into())
    );
    assert_eq!(
        wallet.request("wallet_switchEthereumChain", json!([])).await.unwrap_err(),
        WalletError::TransactionFailed("method not found".into())
    );

    let closed = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
    let unreachable = JsonRpcWallet::new(Arc::new(HttpJsonRpc::new(format!("http://{closed}/"))));
    assert_eq!(unreachable.request("eth_chainId", json!([])).await.unwrap_err(), WalletError::NotDetected);
}

#[tokio::test]
async fn configured_wallet_rpc_is_served_as_a_local_tab() {
    let node = serve(wallet_node()).await;
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        ai: AiConfig::default(),
        explorer: ExplorerConfig { request_timeout: Duration::from_secs(5) },
        pricing: PricingConfig { rpc_url: format!("http://{node}/") },
        bridge: BridgeConfig { ready_timeout: Duration::from_millis(500), wallet_rpc_url: Some(format!("http://{node}/")) },
        storage_path: dir.path().join("synthx-storage.json"),
        server: ServerConfig { host: "127.0.0.1".into(), port: 0 },
    };

    let state = build_state(&config).await.unwrap();
    assert_eq!(state.tabs.active_tab().await, Some(WALLET_RPC_TAB));
    let addr = serve(router(state)).await;

    let reply = post_message(addr, json!({ "action": "checkWallet" })).await;
    assert_eq!(reply, json!({ "success": true, "data": { "walletAddress": ADDRESS } }));
}
