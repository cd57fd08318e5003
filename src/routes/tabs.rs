use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bridge::{TabEnvelope, TabId, TabRegistry, TabResponse};
use crate::error::BridgeError;
use crate::server::AppState;
use crate::state_structs::{TabClientFrame, TabServerFrame};

type ReplySlot = oneshot::Sender<Result<TabResponse, BridgeError>>;

/// `GET /api/v1/tabs/connect`: a content script attaches as a tab.
///
/// The first frame must be `{"type":"hello","tabId":N,"active":bool}`.
/// After that the server pushes `request` frames and the client answers
/// each with a `response` frame carrying the same `requestId`.
pub async fn connect_tab(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve_tab(socket, state.tabs, state.hello_timeout))
}

async fn serve_tab(socket: WebSocket, tabs: Arc<TabRegistry>, hello_timeout: Duration) {
    let (mut sink, mut stream) = socket.split();

    let hello = tokio::time::timeout(hello_timeout, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<TabClientFrame>(text.as_str()) {
                    Ok(TabClientFrame::Hello { tab_id, active }) => return Some((tab_id, active)),
                    Ok(_) => warn!("[Tabs] Frame before hello ignored"),
                    Err(e) => warn!("[Tabs] Malformed hello: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => return None,
                Some(Err(e)) => {
                    warn!("[Tabs] WebSocket error before hello: {}", e);
                    return None;
                }
                Some(Ok(_)) => {}
            }
        }
    })
    .await;

    let (tab, active) = match hello {
        Ok(Some(hello)) => hello,
        Ok(None) => return,
        Err(_) => {
            warn!("[Tabs] No hello within {:?}, closing", hello_timeout);
            return;
        }
    };

    let mut port = tabs.attach_remote(tab);
    if active {
        tabs.focus(tab);
    }
    let mut waiting: HashMap<Uuid, ReplySlot> = HashMap::new();

    loop {
        tokio::select! {
            envelope = port.recv() => {
                let Some(TabEnvelope { request_id, request, reply }) = envelope else { break };
                let frame = TabServerFrame::Request { request_id, request };
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        let _ = reply.send(Err(BridgeError::ContentScriptUnreachable(e.to_string())));
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    let _ = reply.send(Err(BridgeError::ContentScriptUnreachable(
                        "tab connection dropped".to_string(),
                    )));
                    break;
                }
                waiting.insert(request_id, reply);
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => handle_frame(&tabs, tab, text.as_str(), &mut waiting),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    warn!("[Tabs] WebSocket error on tab {}: {}", tab, e);
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    tabs.release(&port);
    if !waiting.is_empty() {
        info!("[Tabs] Tab {} closed with {} unanswered requests", tab, waiting.len());
    }
}

fn handle_frame(tabs: &TabRegistry, tab: TabId, text: &str, waiting: &mut HashMap<Uuid, ReplySlot>) {
    match serde_json::from_str::<TabClientFrame>(text) {
        Ok(TabClientFrame::Response { request_id, response }) => match waiting.remove(&request_id) {
            Some(reply) => {
                let _ = reply.send(Ok(response));
            }
            None => debug!("[Tabs] Unmatched response {} from tab {}", request_id, tab),
        },
        Ok(TabClientFrame::Focus) => tabs.focus(tab),
        Ok(TabClientFrame::Hello { .. }) => debug!("[Tabs] Repeated hello from tab {}", tab),
        Err(e) => warn!("[Tabs] Malformed frame from tab {}: {}", tab, e),
    }
}
