use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::content::ContentScript;
use super::protocol::{TabRequest, TabResponse};
use crate::error::BridgeError;

pub type TabId = u32;

const PORT_CAPACITY: usize = 16;
const NO_RECEIVER: &str = "Could not establish connection. Receiving end does not exist.";

/// One request travelling over a tab port
pub struct TabEnvelope {
    pub request_id: Uuid,
    pub request: TabRequest,
    pub reply: oneshot::Sender<Result<TabResponse, BridgeError>>,
}

/// Tab-scoped request/response channel from the background context
#[async_trait]
pub trait TabMessenger: Send + Sync {
    async fn active_tab(&self) -> Option<TabId>;

    async fn send(&self, tab: TabId, request: TabRequest) -> Result<TabResponse, BridgeError>;
}

/// Receiving end of one connection to a tab. A reconnect under the same
/// tab id gets a new generation, so releasing an old port never touches
/// the connection that replaced it.
pub struct TabPort {
    pub tab: TabId,
    pub generation: u64,
    requests: mpsc::Receiver<TabEnvelope>,
}

impl TabPort {
    pub async fn recv(&mut self) -> Option<TabEnvelope> {
        self.requests.recv().await
    }
}

/// Open tabs and the port to each tab's content script.
///
/// Local tabs are served in-process by a [`ContentScript`]; remote tabs are
/// drained by whoever holds the receiver from [`TabRegistry::attach_remote`].
pub struct TabRegistry {
    ports: DashMap<TabId, (u64, mpsc::Sender<TabEnvelope>)>,
    next_generation: AtomicU64,
    active: RwLock<Option<TabId>>,
    invalidated: watch::Sender<bool>,
}

impl TabRegistry {
    pub fn new() -> Self {
        let (invalidated, _) = watch::channel(false);
        Self { ports: DashMap::new(), next_generation: AtomicU64::new(1), active: RwLock::new(None), invalidated }
    }

    /// Registers a port for `tab`; the holder of the returned port answers it
    pub fn attach_remote(&self, tab: TabId) -> TabPort {
        let (tx, rx) = mpsc::channel(PORT_CAPACITY);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        if self.ports.insert(tab, (generation, tx)).is_some() {
            debug!("[Tabs] Replaced port for tab {}", tab);
        }
        info!("[Tabs] Tab {} connected (generation {})", tab, generation);
        TabPort { tab, generation, requests: rx }
    }

    /// Serves `tab` in-process and focuses it
    pub fn attach_local(&self, tab: TabId, content: Arc<ContentScript>) {
        let mut port = self.attach_remote(tab);
        self.focus(tab);
        tokio::spawn(async move {
            while let Some(envelope) = port.recv().await {
                let content = content.clone();
                tokio::spawn(async move {
                    let response = content.handle(envelope.request).await;
                    if envelope.reply.send(response).is_err() {
                        debug!("[Tabs] Sender went away before reply {}", envelope.request_id);
                    }
                });
            }
        });
    }

    /// The tab itself is gone, whichever connection serves it
    pub fn detach(&self, tab: TabId) {
        self.ports.remove(&tab);
        self.clear_focus(tab);
        info!("[Tabs] Tab {} disconnected", tab);
    }

    /// Drops `port`'s registration unless a newer connection replaced it.
    /// Returns whether anything was removed.
    pub fn release(&self, port: &TabPort) -> bool {
        let removed = self
            .ports
            .remove_if(&port.tab, |_, (generation, _)| *generation == port.generation)
            .is_some();
        if removed {
            self.clear_focus(port.tab);
            info!("[Tabs] Tab {} disconnected", port.tab);
        } else {
            debug!("[Tabs] Stale port for tab {} released (generation {})", port.tab, port.generation);
        }
        removed
    }

    fn clear_focus(&self, tab: TabId) {
        let mut active = self.active.write();
        if *active == Some(tab) {
            *active = None;
        }
    }

    pub fn focus(&self, tab: TabId) {
        *self.active.write() = Some(tab);
    }

    pub fn is_invalidated(&self) -> bool {
        *self.invalidated.borrow()
    }

    /// Extension reload: every in-flight and future send fails
    pub fn invalidate(&self) {
        warn!("[Tabs] Extension context invalidated");
        self.invalidated.send_replace(true);
    }
}

impl Default for TabRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn until_invalidated(mut flag: watch::Receiver<bool>) {
    loop {
        let invalidated = *flag.borrow_and_update();
        if invalidated {
            return;
        }
        if flag.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl TabMessenger for TabRegistry {
    async fn active_tab(&self) -> Option<TabId> {
        let active = *self.active.read();
        active.filter(|tab| self.ports.contains_key(tab))
    }

    async fn send(&self, tab: TabId, request: TabRequest) -> Result<TabResponse, BridgeError> {
        let invalidation = self.invalidated.subscribe();
        if *invalidation.borrow() {
            return Err(BridgeError::ContextInvalidated);
        }

        let (generation, port) = self
            .ports
            .get(&tab)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BridgeError::ContentScriptUnreachable(NO_RECEIVER.to_string()))?;

        let (reply, response) = oneshot::channel();
        let envelope = TabEnvelope { request_id: Uuid::new_v4(), request, reply };
        if port.send(envelope).await.is_err() {
            self.ports.remove_if(&tab, |_, (current, _)| *current == generation);
            return Err(BridgeError::ContentScriptUnreachable(NO_RECEIVER.to_string()));
        }

        tokio::select! {
            outcome = response => outcome.unwrap_or_else(|_| Err(BridgeError::ContentScriptUnreachable(
                "The message port closed before a response was received.".to_string(),
            ))),
            _ = until_invalidated(invalidation) => Err(BridgeError::ContextInvalidated),
        }
    }
}
