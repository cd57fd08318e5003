use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::correlator::PendingReplies;
use super::page::{InjectError, ScriptInjector};
use super::protocol::{ReplyFamily, RequestId, SwapOrder, SwapPhase, TabRequest, TabResponse, WindowBus, WindowMessage};
use crate::error::BridgeError;

/// The isolated content-script context of one tab. It can post on the
/// page's window bus but cannot touch the wallet itself.
pub struct ContentScript {
    bus: WindowBus,
    injector: Arc<dyn ScriptInjector>,
    pending: Arc<PendingReplies>,
    ready_timeout: Duration,
    dispatcher: JoinHandle<()>,
}

impl ContentScript {
    /// Must be called inside a Tokio runtime; starts the reply dispatcher.
    pub fn new(injector: Arc<dyn ScriptInjector>, ready_timeout: Duration) -> Self {
        let bus = injector.bus().clone();
        let pending = Arc::new(PendingReplies::new());

        let mut inbox = bus.subscribe();
        let replies = pending.clone();
        let dispatcher = tokio::spawn(async move {
            loop {
                match inbox.recv().await {
                    Ok(message) => {
                        replies.deliver(message);
                    }
                    Err(RecvError::Lagged(skipped)) => warn!("[Content] Missed {} window messages", skipped),
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self { bus, injector, pending, ready_timeout, dispatcher }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Injects the page script if needed and waits, bounded, for it to
    /// answer a ping. Never fails: a silent page is assumed to be ready.
    pub async fn ensure_script(&self) {
        let ping_id = Uuid::new_v4();
        let ready = self.pending.register(ping_id, ReplyFamily::Ready);

        match self.injector.inject() {
            Ok(()) => debug!("[Content] Page script injected"),
            Err(InjectError::AlreadyInjected) => debug!("[Content] Page script already present"),
            Err(e) => warn!("[Content] {}, assuming the script is already there", e),
        }

        self.bus.post(WindowMessage::Ping { request_id: ping_id });
        match tokio::time::timeout(self.ready_timeout, ready).await {
            Ok(Ok(_)) => debug!("[Content] Page script answered ping"),
            _ => {
                self.pending.cancel(&ping_id);
                warn!("[Content] No ready signal within {:?}, proceeding anyway", self.ready_timeout);
            }
        }
    }

    async fn round_trip(
        &self,
        family: ReplyFamily,
        request: impl FnOnce(RequestId) -> WindowMessage,
    ) -> Result<WindowMessage, BridgeError> {
        let request_id = Uuid::new_v4();
        let reply = self.pending.register(request_id, family);

        let message = request(request_id);
        debug!("[Content] Posting {} {}", message.type_tag(), request_id);
        self.bus.post(message);

        reply
            .await
            .map_err(|_| BridgeError::ContentScriptUnreachable("page script reply channel closed".to_string()))
    }

    pub async fn execute_swap(&self, order: SwapOrder) -> Result<TabResponse, BridgeError> {
        info!("[Content] Forwarding swap {} {} → {}", order.amount, order.from_token, order.to_token);
        self.ensure_script().await;

        match self.round_trip(ReplyFamily::Swap, |request_id| WindowMessage::ExecuteSwap { request_id, payload: order }).await? {
            WindowMessage::SwapResult { mut result, .. } => {
                result.phases.insert(0, SwapPhase::ScriptEnsured);
                Ok(TabResponse::SwapExecuted { receipt: result })
            }
            WindowMessage::SwapError { error, wallet, .. } => Ok(TabResponse::Failed { error, wallet }),
            other => Err(BridgeError::ContentScriptUnreachable(format!("unexpected {}", other.type_tag()))),
        }
    }

    pub async fn check_wallet(&self) -> Result<TabResponse, BridgeError> {
        self.ensure_script().await;

        match self.round_trip(ReplyFamily::Wallet, |request_id| WindowMessage::CheckWallet { request_id }).await? {
            WindowMessage::WalletInfo { wallet_address, .. } => Ok(TabResponse::WalletInfo { wallet_address }),
            WindowMessage::WalletError { error, wallet, .. } => Ok(TabResponse::Failed { error, wallet }),
            other => Err(BridgeError::ContentScriptUnreachable(format!("unexpected {}", other.type_tag()))),
        }
    }

    pub async fn handle(&self, request: TabRequest) -> Result<TabResponse, BridgeError> {
        match request {
            TabRequest::ExecuteSwap(order) => self.execute_swap(order).await,
            TabRequest::CheckWallet => self.check_wallet().await,
        }
    }
}

impl Drop for ContentScript {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}
