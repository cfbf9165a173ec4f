//! WebSocket Relay
//!
//! Fan-out hub connecting browser and native editors to a document's
//! event stream. Each connection is bridged onto the in-process
//! [`LocalEventChannel`]: inbound frames are stamped with the connection
//! id and published, outbound messages for the same document are
//! serialized back out. The relay never interprets document events; it
//! only maintains the per-document participant roster and broadcasts
//! `participant-list-changed` whenever it changes.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::channel::{EventChannel, LocalEventChannel};
use crate::events::{CanvasEvent, ChannelMessage, Participant};

/// Shared state for the relay.
pub struct RelayState {
    /// The in-process hub all connections publish to and subscribe from
    pub channel: LocalEventChannel,
    /// Participant rosters, keyed by document, entries keyed by
    /// connection
    rosters: RwLock<HashMap<Uuid, Vec<(Uuid, Participant)>>>,
}

impl RelayState {
    /// Create relay state with a fresh event hub.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channel: LocalEventChannel::default(),
            rosters: RwLock::new(HashMap::new()),
        }
    }

    /// Current roster for a document.
    pub async fn roster(&self, document_id: Uuid) -> Vec<Participant> {
        self.rosters
            .read()
            .await
            .get(&document_id)
            .map(|entries| entries.iter().map(|(_, p)| p.clone()).collect())
            .unwrap_or_default()
    }

    /// Record a participant joining and broadcast the updated roster.
    pub async fn register(&self, document_id: Uuid, connection_id: Uuid, participant: Participant) {
        let roster = {
            let mut rosters = self.rosters.write().await;
            let entries = rosters.entry(document_id).or_default();
            // Re-announced joins (reconnects) replace the old entry.
            entries.retain(|(conn, _)| *conn != connection_id);
            entries.push((connection_id, participant));
            entries.iter().map(|(_, p)| p.clone()).collect()
        };
        self.broadcast_roster(document_id, roster);
    }

    /// Remove a connection from the roster and broadcast the updated
    /// roster. No-op if the connection never announced itself.
    pub async fn deregister(&self, document_id: Uuid, connection_id: Uuid) {
        let roster = {
            let mut rosters = self.rosters.write().await;
            let Some(entries) = rosters.get_mut(&document_id) else {
                return;
            };
            let before = entries.len();
            entries.retain(|(conn, _)| *conn != connection_id);
            if entries.len() == before {
                return;
            }
            if entries.is_empty() {
                rosters.remove(&document_id);
                Vec::new()
            } else {
                entries.iter().map(|(_, p)| p.clone()).collect()
            }
        };
        self.broadcast_roster(document_id, roster);
    }

    fn broadcast_roster(&self, document_id: Uuid, participants: Vec<Participant>) {
        // Origin-less so every participant, including the one who just
        // joined, receives the authoritative roster.
        let message = ChannelMessage::notification(
            document_id,
            CanvasEvent::ParticipantListChanged { participants },
        );
        if let Err(err) = self.channel.publish(message) {
            warn!(error = %err, "failed to broadcast roster");
        }
    }
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket upgrade handler for `/ws/documents/:document_id`.
pub async fn document_ws_handler(
    ws: WebSocketUpgrade,
    Path(document_id): Path<Uuid>,
    State(state): State<Arc<RelayState>>,
) -> impl IntoResponse {
    info!(%document_id, "WebSocket upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, document_id, state))
}

/// Bridge one WebSocket connection onto the event hub.
async fn handle_socket(socket: WebSocket, document_id: Uuid, state: Arc<RelayState>) {
    let connection_id = Uuid::new_v4();
    info!(%document_id, %connection_id, "WebSocket connected");

    let (mut sender, mut receiver) = socket.split();
    let mut subscription = state.channel.subscribe(document_id, connection_id);

    // Outbound: hub -> socket.
    let forward_handle = tokio::spawn(async move {
        while let Some(message) = subscription.recv().await {
            let Ok(json) = serde_json::to_string(&message) else {
                continue;
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // Inbound: socket -> hub.
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                handle_frame(&text, document_id, connection_id, &state).await;
            }
            Ok(Message::Close(_)) => {
                info!(%connection_id, "WebSocket closed by client");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // axum answers pings at the protocol level.
            }
            Err(err) => {
                warn!(error = %err, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    forward_handle.abort();

    // A vanished connection leaves implicitly; clients that sent an
    // explicit leave were already deregistered and this is a no-op.
    state.deregister(document_id, connection_id).await;
    if let Err(err) = state.channel.publish(ChannelMessage::new(
        document_id,
        connection_id,
        CanvasEvent::Leave,
    )) {
        warn!(error = %err, "failed to publish leave");
    }
    info!(%connection_id, "WebSocket disconnected");
}

/// Parse and forward one inbound frame. Malformed frames are dropped
/// with a warning; one bad client must not take the relay down.
async fn handle_frame(text: &str, document_id: Uuid, connection_id: Uuid, state: &Arc<RelayState>) {
    let mut message: ChannelMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            warn!(%connection_id, error = %err, "dropping malformed frame");
            return;
        }
    };

    // The path and the connection are authoritative; never trust the
    // client-supplied routing fields.
    message.document_id = document_id;
    message.origin = Some(connection_id);

    debug!(%connection_id, event = message.event.kind(), "relaying event");

    match &message.event {
        CanvasEvent::Join { participant } => {
            let participant = participant.clone();
            if let Err(err) = state.channel.publish(message) {
                warn!(error = %err, "failed to relay join");
            }
            state.register(document_id, connection_id, participant).await;
        }
        CanvasEvent::Leave => {
            if let Err(err) = state.channel.publish(message) {
                warn!(error = %err, "failed to relay leave");
            }
            state.deregister(document_id, connection_id).await;
        }
        _ => {
            if let Err(err) = state.channel.publish(message) {
                warn!(error = %err, "failed to relay event");
            }
        }
    }
}
