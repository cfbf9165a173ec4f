//! Event Channel
//!
//! Abstract pub/sub transport connecting all participants of a document.
//! Delivery is best-effort and at-least-once; no ordering is guaranteed
//! across senders. Publishing never blocks the caller.
//!
//! Subscriptions are owned guards: dropping one is the deregistration.
//! There is no manual register/unregister pair to get wrong, so repeated
//! open/close cycles cannot leak duplicate handlers.

use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::events::ChannelMessage;

/// Default buffer size for in-process channels.
const DEFAULT_CAPACITY: usize = 1024;

/// Abstract pub/sub transport for canvas events.
pub trait EventChannel: Send + Sync {
    /// Publish a message to all other participants. Fire-and-forget: the
    /// call returns without waiting for delivery confirmation.
    fn publish(&self, message: ChannelMessage) -> Result<()>;

    /// Subscribe to messages for one document. Messages originated by
    /// `origin` are filtered out (no self-echo).
    fn subscribe(&self, document_id: Uuid, origin: Uuid) -> Subscription;

    /// Whether the transport currently believes it is connected. Surfaced
    /// to the user as a passive status indicator.
    fn is_connected(&self) -> bool;
}

/// Scoped subscription to a document's event stream.
///
/// Filters by document id and suppresses messages from its own origin.
/// Dropping the subscription detaches it from the channel.
pub struct Subscription {
    document_id: Uuid,
    origin: Uuid,
    rx: broadcast::Receiver<ChannelMessage>,
}

impl Subscription {
    /// Build a subscription over a raw broadcast receiver. Channel
    /// implementations use this; engine code only ever consumes.
    #[must_use]
    pub fn new(document_id: Uuid, origin: Uuid, rx: broadcast::Receiver<ChannelMessage>) -> Self {
        Self {
            document_id,
            origin,
            rx,
        }
    }

    /// Receive the next message for this document from another
    /// participant. Returns `None` once the channel is closed. A lagged
    /// receiver logs and keeps going; missed events are an accepted
    /// staleness window, resolved by the next explicit document load.
    pub async fn recv(&mut self) -> Option<ChannelMessage> {
        loop {
            match self.rx.recv().await {
                Ok(message) => {
                    if message.document_id != self.document_id {
                        continue;
                    }
                    if message.origin == Some(self.origin) {
                        continue;
                    }
                    return Some(message);
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, document_id = %self.document_id, "subscription lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`Subscription::recv`]. Returns `None`
    /// when no relevant message is queued.
    pub fn try_recv(&mut self) -> Option<ChannelMessage> {
        loop {
            match self.rx.try_recv() {
                Ok(message) => {
                    if message.document_id != self.document_id {
                        continue;
                    }
                    if message.origin == Some(self.origin) {
                        continue;
                    }
                    return Some(message);
                }
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!(missed, document_id = %self.document_id, "subscription lagged, events dropped");
                }
                Err(_) => return None,
            }
        }
    }
}

/// In-process event channel backed by `tokio::broadcast`.
///
/// Serves as the relay's hub and as the transport for tests and
/// single-process embeddings. Slow subscribers miss events rather than
/// blocking publishers.
#[derive(Debug, Clone)]
pub struct LocalEventChannel {
    sender: broadcast::Sender<ChannelMessage>,
}

impl LocalEventChannel {
    /// Create a channel with the given buffer capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Number of live subscriptions across all documents.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LocalEventChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventChannel for LocalEventChannel {
    fn publish(&self, message: ChannelMessage) -> Result<()> {
        // No subscribers just means nobody else has the document open.
        match self.sender.send(message) {
            Ok(_) | Err(_) => Ok(()),
        }
    }

    fn subscribe(&self, document_id: Uuid, origin: Uuid) -> Subscription {
        Subscription::new(document_id, origin, self.sender.subscribe())
    }

    fn is_connected(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("document_id", &self.document_id)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}
