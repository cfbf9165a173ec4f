//! Mockdeck Canvas - Collaborative Mockup Document Engine
//!
//! This crate provides the document synchronization core for Mockdeck:
//! - Document: Screens, shapes and the canvas model
//! - Events: The canvas event vocabulary and channel envelope
//! - Channel: Pub/sub transport abstraction with an in-process hub
//! - Engine: Per-session synchronization engine (local mutations,
//!   remote reconciliation, undo history)
//! - Reconciler: Application of remote events to the local document
//! - History: Bounded undo/redo over full document snapshots
//! - Throttle: Rate limiting for live drag position broadcasts
//! - Relay: axum WebSocket fan-out connecting editors to a document
//! - Store: SQLite document persistence
//! - Error: Error types for canvas operations
//!
//! ## Features
//!
//! - Optimistic local editing: mutations apply immediately, then
//!   broadcast exactly one event each
//! - Last-write-wins reconciliation of concurrent edits
//! - Live drag streaming throttled to ~30 Hz with trailing-edge delivery
//! - Local-only undo/redo bounded to 100 snapshots
//! - Presence rosters and stored-snapshot change notifications
//!
//! ## Usage
//!
//! ```ignore
//! use mockdeck_canvas::{document_ws_handler, RelayState};
//! use axum::{Router, routing::get};
//! use std::sync::Arc;
//!
//! let relay = Arc::new(RelayState::new());
//! let app: Router<()> = Router::new()
//!     .route("/ws/documents/:document_id", get(document_ws_handler))
//!     .with_state(relay);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod channel;
pub mod document;
pub mod engine;
pub mod error;
pub mod events;
pub mod history;
pub mod reconciler;
pub mod relay;
pub mod store;
pub mod throttle;

// Re-export main types
pub use channel::{EventChannel, LocalEventChannel, Subscription};
pub use document::{
    CanvasMeta, Document, Screen, Shape, ShapeKind, ShapeUpdate, DEFAULT_SCREEN_ID,
};
pub use engine::{SessionState, SyncEngine};
pub use error::{Error, Result};
pub use events::{CanvasEvent, ChannelMessage, Participant};
pub use history::History;
pub use reconciler::Outcome;
pub use relay::{document_ws_handler, RelayState};
pub use store::{DocumentStore, SqliteDocumentStore};
pub use throttle::{LiveMove, PositionThrottle, LIVE_MOVE_INTERVAL};
