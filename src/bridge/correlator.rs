use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::debug;

use super::protocol::{ReplyFamily, RequestId, WindowMessage};

/// Single-use reply listeners keyed by request id.
///
/// A listener is removed the moment a reply of its family arrives, so a
/// page script that answers twice only ever reaches the caller once.
#[derive(Default)]
pub struct PendingReplies {
    waiting: DashMap<RequestId, (ReplyFamily, oneshot::Sender<WindowMessage>)>,
}

impl PendingReplies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, request_id: RequestId, family: ReplyFamily) -> oneshot::Receiver<WindowMessage> {
        let (tx, rx) = oneshot::channel();
        self.waiting.insert(request_id, (family, tx));
        rx
    }

    /// Hands `message` to its listener; `false` when nobody is waiting for it
    pub fn deliver(&self, message: WindowMessage) -> bool {
        let Some((request_id, family)) = message.reply_key() else {
            return false;
        };

        match self.waiting.remove_if(&request_id, |_, (expected, _)| *expected == family) {
            Some((_, (_, listener))) => listener.send(message).is_ok(),
            None => {
                debug!("[Bridge] Dropping unmatched {} for {}", message.type_tag(), request_id);
                false
            }
        }
    }

    pub fn cancel(&self, request_id: &RequestId) {
        self.waiting.remove(request_id);
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn swap_error(id: RequestId, error: &str) -> WindowMessage {
        WindowMessage::SwapError { request_id: id, error: error.into(), wallet: None }
    }

    #[tokio::test]
    async fn second_reply_is_dropped() {
        let pending = PendingReplies::new();
        let id = Uuid::new_v4();
        let rx = pending.register(id, ReplyFamily::Swap);

        assert!(pending.deliver(swap_error(id, "first")));
        assert!(!pending.deliver(swap_error(id, "second")));
        assert!(pending.is_empty());

        assert_eq!(rx.await.unwrap(), swap_error(id, "first"));
    }

    #[test]
    fn other_family_does_not_consume_listener() {
        let pending = PendingReplies::new();
        let id = Uuid::new_v4();
        let _rx = pending.register(id, ReplyFamily::Swap);

        let wallet_reply = WindowMessage::WalletInfo { request_id: id, wallet_address: "0xabc".into() };
        assert!(!pending.deliver(wallet_reply));
        assert_eq!(pending.len(), 1);
    }
}
