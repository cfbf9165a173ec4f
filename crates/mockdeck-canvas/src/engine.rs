//! Synchronization Engine
//!
//! Composition root for one open document session. The engine exclusively
//! owns the live document and wires the local mutation path, the undo
//! history, the live-position throttle and the remote reconciler onto the
//! event channel and document store.
//!
//! Every local mutation follows the same sequence: snapshot history,
//! apply to the in-memory document, publish exactly one event. Remote
//! events flow the other way through [`crate::reconciler`] - no history
//! entry, no re-broadcast.
//!
//! Session lifecycle is a small state machine:
//! `Disconnected -> Joining -> Joined -> Leaving -> Disconnected`.
//! The channel subscription exists only while `Joined`; it is an owned
//! guard, so repeated open/close cycles cannot accumulate duplicate
//! handlers.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::channel::{EventChannel, Subscription};
use crate::document::{Document, Screen, Shape, ShapeUpdate};
use crate::error::{Error, Result};
use crate::events::{CanvasEvent, ChannelMessage, Participant};
use crate::history::History;
use crate::reconciler::{self, Outcome};
use crate::store::DocumentStore;
use crate::throttle::{LiveMove, PositionThrottle};

/// Channel membership state of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not attached to the channel
    Disconnected,
    /// Presence announced, subscription pending
    Joining,
    /// Subscribed; inbound events are applied
    Joined,
    /// Leave announced, teardown in progress
    Leaving,
}

/// The collaborative document synchronization engine.
pub struct SyncEngine {
    document_id: Uuid,
    participant: Participant,
    /// Identifies this engine's traffic on the channel for echo
    /// suppression.
    connection_id: Uuid,
    document: Document,
    history: History,
    throttle: PositionThrottle,
    channel: Arc<dyn EventChannel>,
    store: Arc<dyn DocumentStore>,
    state: SessionState,
    subscription: Option<Subscription>,
    /// Roster keyed by originating connection
    participants: HashMap<Uuid, Participant>,
    stale: bool,
}

impl SyncEngine {
    /// Open a document session: load the snapshot from the store,
    /// announce presence and subscribe to the channel.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn open(
        channel: Arc<dyn EventChannel>,
        store: Arc<dyn DocumentStore>,
        document_id: Uuid,
        participant: Participant,
    ) -> Result<Self> {
        let document = store.load(document_id).await?;
        let mut engine = Self::with_document(channel, store, document_id, participant, document);
        engine.join()?;
        Ok(engine)
    }

    /// Build an engine around an already-loaded document, still
    /// `Disconnected`. Callers use [`SyncEngine::reconnect`] to attach.
    #[must_use]
    pub fn with_document(
        channel: Arc<dyn EventChannel>,
        store: Arc<dyn DocumentStore>,
        document_id: Uuid,
        participant: Participant,
        document: Document,
    ) -> Self {
        let connection_id = Uuid::new_v4();
        let move_channel = Arc::clone(&channel);
        let throttle = PositionThrottle::with_default_interval(move |m: LiveMove| {
            let message = ChannelMessage::new(
                document_id,
                connection_id,
                CanvasEvent::ShapeMoving {
                    screen_id: m.screen_id,
                    shape_id: m.shape_id,
                    x: m.x,
                    y: m.y,
                },
            );
            if let Err(err) = move_channel.publish(message) {
                warn!(error = %err, "failed to publish live position");
            }
        });

        Self {
            document_id,
            participant,
            connection_id,
            document,
            history: History::new(),
            throttle,
            channel,
            store,
            state: SessionState::Disconnected,
            subscription: None,
            participants: HashMap::new(),
            stale: false,
        }
    }

    fn join(&mut self) -> Result<()> {
        self.state = SessionState::Joining;
        self.publish(CanvasEvent::Join {
            participant: self.participant.clone(),
        });
        // Replacing the option drops any previous subscription exactly
        // once before the new one attaches.
        self.subscription = Some(self.channel.subscribe(self.document_id, self.connection_id));
        self.state = SessionState::Joined;
        info!(document_id = %self.document_id, participant = %self.participant.name, "joined document session");
        Ok(())
    }

    /// Re-run the joining transition after a transport drop: re-announce
    /// presence and replace the subscription. Missed events are not
    /// recovered here; the next explicit load from the store closes that
    /// staleness window.
    pub fn reconnect(&mut self) -> Result<()> {
        if self.state == SessionState::Leaving {
            return Err(Error::InvalidState("cannot reconnect while leaving"));
        }
        self.join()
    }

    /// Close the session: announce leave and tear down the subscription.
    /// Idempotent.
    pub fn close(&mut self) {
        if self.state == SessionState::Joined {
            self.state = SessionState::Leaving;
            self.publish(CanvasEvent::Leave);
        }
        self.subscription = None;
        self.state = SessionState::Disconnected;
        info!(document_id = %self.document_id, "left document session");
    }

    // ------------------------------------------------------------------
    // Local mutation layer
    // ------------------------------------------------------------------

    /// Add a shape to a screen.
    pub fn add_shape(&mut self, screen_id: &str, shape: Shape) {
        if self.document.screen(screen_id).is_none() {
            warn!(%screen_id, "add_shape: screen not found");
            return;
        }
        self.history.snapshot_before_change(&self.document);
        if let Some(screen) = self.document.screen_mut(screen_id) {
            screen.shapes.push(shape.clone());
        }
        self.publish(CanvasEvent::ShapeAdded {
            screen_id: screen_id.to_string(),
            shape,
        });
    }

    /// Apply a partial update to a shape and broadcast the full result.
    ///
    /// A missing shape is a logged no-op: the shape likely lost a race
    /// with a concurrent delete from another participant.
    pub fn update_shape(&mut self, screen_id: &str, shape_id: &str, update: &ShapeUpdate) {
        if self.document.shape(screen_id, shape_id).is_none() {
            warn!(%screen_id, %shape_id, "update_shape: shape not found");
            return;
        }
        self.history.snapshot_before_change(&self.document);
        let Some(shape) = self
            .document
            .screen_mut(screen_id)
            .and_then(|s| s.shape_mut(shape_id))
        else {
            return;
        };
        shape.apply(update);
        let shape = shape.clone();
        self.publish(CanvasEvent::ShapeUpdated {
            screen_id: screen_id.to_string(),
            shape,
        });
    }

    /// Delete a shape. Missing shape is a logged no-op.
    pub fn delete_shape(&mut self, screen_id: &str, shape_id: &str) {
        if self.document.shape(screen_id, shape_id).is_none() {
            warn!(%screen_id, %shape_id, "delete_shape: shape not found");
            return;
        }
        self.history.snapshot_before_change(&self.document);
        if let Some(screen) = self.document.screen_mut(screen_id) {
            screen.remove_shape(shape_id);
        }
        self.publish(CanvasEvent::ShapeDeleted {
            screen_id: screen_id.to_string(),
            shape_id: shape_id.to_string(),
        });
    }

    /// Add a screen and make it current.
    pub fn add_screen(&mut self, screen: Screen) {
        self.history.snapshot_before_change(&self.document);
        self.document.current_screen_id = Some(screen.id.clone());
        self.document.add_screen(screen.clone());
        self.publish(CanvasEvent::ScreenAdded { screen });
    }

    /// Delete a screen. Deleting the last screen is permitted and leaves
    /// the document empty; the caller supplies a default screen before
    /// the next render.
    pub fn delete_screen(&mut self, screen_id: &str) {
        if self.document.screen(screen_id).is_none() {
            warn!(%screen_id, "delete_screen: screen not found");
            return;
        }
        self.history.snapshot_before_change(&self.document);
        self.document.remove_screen(screen_id);
        self.publish(CanvasEvent::ScreenDeleted {
            screen_id: screen_id.to_string(),
        });
    }

    /// Rename a screen. Missing screen is a logged no-op.
    pub fn rename_screen(&mut self, screen_id: &str, name: &str) {
        if self.document.screen(screen_id).is_none() {
            warn!(%screen_id, "rename_screen: screen not found");
            return;
        }
        self.history.snapshot_before_change(&self.document);
        if let Some(screen) = self.document.screen_mut(screen_id) {
            screen.name = name.to_string();
        }

        self.publish(CanvasEvent::ScreenRenamed {
            screen_id: screen_id.to_string(),
            new_name: name.to_string(),
        });
    }

    /// Live drag move: apply the position to the local document on every
    /// call (the dragging client's own view never lags) and feed the
    /// throttled broadcast. No history entry; the drag-end
    /// [`SyncEngine::update_shape`] is the authoritative change.
    pub fn drag_shape(&mut self, screen_id: &str, shape_id: &str, x: f64, y: f64) {
        let Some(shape) = self
            .document
            .screen_mut(screen_id)
            .and_then(|s| s.shape_mut(shape_id))
        else {
            warn!(%screen_id, %shape_id, "drag_shape: shape not found");
            return;
        };
        shape.x = x;
        shape.y = y;
        self.throttle.offer(LiveMove {
            screen_id: screen_id.to_string(),
            shape_id: shape_id.to_string(),
            x,
            y,
        });
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Undo the most recent local mutation. Purely local time-travel:
    /// nothing is broadcast, so other participants' views diverge until
    /// the next mutation or full resync.
    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.document)
    }

    /// Redo a previously undone mutation. Local-only, like undo.
    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.document)
    }

    // ------------------------------------------------------------------
    // Persistence and navigation
    // ------------------------------------------------------------------

    /// Persist the document and notify other participants that the
    /// stored snapshot changed. On failure the in-memory document stays
    /// editable; retry is manual.
    pub async fn save(&self) -> Result<()> {
        self.store.save(self.document_id, &self.document).await?;
        self.publish(CanvasEvent::DocumentReplaced);
        Ok(())
    }

    /// Move the local cursor to another screen. Not synchronized.
    pub fn set_current_screen(&mut self, screen_id: &str) {
        if self.document.screen(screen_id).is_none() {
            warn!(%screen_id, "set_current_screen: screen not found");
            return;
        }
        self.document.current_screen_id = Some(screen_id.to_string());
    }

    /// Follow a shape's navigation link, moving the cursor to the target
    /// screen. Returns `false` when the shape kind cannot navigate or the
    /// link is absent or dangling.
    pub fn navigate(&mut self, screen_id: &str, shape_id: &str) -> bool {
        let navigable = self
            .document
            .shape(screen_id, shape_id)
            .is_some_and(|s| s.kind.is_navigable());
        if !navigable {
            debug!(%screen_id, %shape_id, "shape is not navigable");
            return false;
        }
        let Some(target) = self
            .document
            .resolve_target(screen_id, shape_id)
            .map(str::to_string)
        else {
            debug!(%screen_id, %shape_id, "navigation target unresolved");
            return false;
        };
        self.document.current_screen_id = Some(target);
        true
    }

    /// Expand or collapse sidebar widgets. Local view state: no history
    /// entry, no broadcast.
    pub fn set_sidebar_expanded(&mut self, expanded: bool) {
        self.document.set_sidebar_expanded(expanded);
    }

    // ------------------------------------------------------------------
    // Remote event handling
    // ------------------------------------------------------------------

    /// Receive and apply one inbound message. Returns `false` when not
    /// joined or the channel closed. Events are processed strictly one
    /// at a time, in delivery order.
    pub async fn run_once(&mut self) -> bool {
        let message = match self.subscription.as_mut() {
            Some(subscription) => subscription.recv().await,
            None => return false,
        };
        match message {
            Some(message) => {
                self.handle_remote(message);
                true
            }
            None => {
                self.subscription = None;
                self.state = SessionState::Disconnected;
                false
            }
        }
    }

    /// Drain all queued inbound messages without blocking.
    pub fn drain_remote(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let message = match self.subscription.as_mut() {
                Some(subscription) => subscription.try_recv(),
                None => return applied,
            };
            let Some(message) = message else {
                return applied;
            };
            self.handle_remote(message);
            applied += 1;
        }
    }

    /// Apply one inbound message: presence events update the roster and
    /// staleness flag, document events go through the reconciler.
    pub fn handle_remote(&mut self, message: ChannelMessage) {
        match reconciler::apply(&mut self.document, &message.event) {
            Outcome::Applied => {
                debug!(event = message.event.kind(), "applied remote event");
            }
            Outcome::Dropped => {
                debug!(event = message.event.kind(), "dropped remote event");
            }
            Outcome::Presence => self.handle_presence(message),
        }
    }

    fn handle_presence(&mut self, message: ChannelMessage) {
        match message.event {
            CanvasEvent::Join { participant } => {
                if let Some(origin) = message.origin {
                    self.participants.insert(origin, participant);
                }
            }
            CanvasEvent::Leave => {
                if let Some(origin) = message.origin {
                    self.participants.remove(&origin);
                }
            }
            CanvasEvent::ParticipantListChanged { participants } => {
                // Authoritative roster from the relay replaces whatever
                // we pieced together from join/leave.
                self.participants = participants
                    .into_iter()
                    .map(|p| (Uuid::new_v4(), p))
                    .collect();
            }
            CanvasEvent::DocumentReplaced => {
                self.stale = true;
            }
            // Document events never reach here; the reconciler consumed
            // them before classifying the rest as presence.
            _ => {}
        }
    }

    fn publish(&self, event: CanvasEvent) {
        let message = ChannelMessage::new(self.document_id, self.connection_id, event);
        if let Err(err) = self.channel.publish(message) {
            // Fire-and-forget: the local mutation already happened and
            // stands; the user sees a passive disconnected indicator.
            warn!(error = %err, "failed to publish event");
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The live document. Read-only: all writes go through engine
    /// operations so history and broadcast stay consistent.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The document identifier.
    #[must_use]
    pub fn document_id(&self) -> Uuid {
        self.document_id
    }

    /// Current session state.
    #[must_use]
    pub fn session_state(&self) -> SessionState {
        self.state
    }

    /// Whether the transport currently reports a live connection.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.channel.is_connected() && self.state == SessionState::Joined
    }

    /// Whether another participant replaced the stored snapshot since we
    /// loaded it.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Other participants currently known to this engine.
    #[must_use]
    pub fn participants(&self) -> Vec<&Participant> {
        self.participants.values().collect()
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        if self.state == SessionState::Joined {
            self.close();
        }
    }
}
