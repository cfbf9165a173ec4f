//! Canvas Event Types
//!
//! This module defines the closed set of events exchanged between
//! participants editing the same document. The enum is exhaustive on
//! purpose: the reconciler matches every variant, so an unrecognized tag
//! is a deserialization failure rather than a silent miss at apply time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{Screen, Shape};

/// A participant editing a shared document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Stable participant identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
}

impl Participant {
    /// Create a participant with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// Events delivered over the event channel.
///
/// `shape-moving` is the high-frequency, position-only counterpart of
/// `shape-updated`; everything else is an authoritative state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum CanvasEvent {
    /// A participant opened the document
    Join {
        /// The joining participant
        participant: Participant,
    },

    /// A participant closed the document
    Leave,

    /// Full roster of connected participants
    #[serde(rename = "participant-list-changed")]
    ParticipantListChanged {
        /// Everyone currently connected
        participants: Vec<Participant>,
    },

    /// A shape was added to a screen
    ShapeAdded {
        /// Target screen
        screen_id: String,
        /// The new shape
        shape: Shape,
    },

    /// A shape was replaced with a new full value
    ShapeUpdated {
        /// Target screen
        screen_id: String,
        /// The full updated shape
        shape: Shape,
    },

    /// Position-only update streamed while a shape is dragged
    ShapeMoving {
        /// Target screen
        screen_id: String,
        /// Shape being dragged
        shape_id: String,
        /// New x position
        x: f64,
        /// New y position
        y: f64,
    },

    /// A shape was deleted
    ShapeDeleted {
        /// Target screen
        screen_id: String,
        /// Deleted shape id
        shape_id: String,
    },

    /// A screen was added
    ScreenAdded {
        /// The new screen
        screen: Screen,
    },

    /// A screen was renamed
    ScreenRenamed {
        /// Renamed screen
        screen_id: String,
        /// New display name
        new_name: String,
    },

    /// A screen was deleted
    ScreenDeleted {
        /// Deleted screen id
        screen_id: String,
    },

    /// The stored document was replaced by another participant's save.
    /// Notification only; carries no document payload.
    DocumentReplaced,
}

impl CanvasEvent {
    /// Get the wire tag of this event.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave => "leave",
            Self::ParticipantListChanged { .. } => "participant-list-changed",
            Self::ShapeAdded { .. } => "shape-added",
            Self::ShapeUpdated { .. } => "shape-updated",
            Self::ShapeMoving { .. } => "shape-moving",
            Self::ShapeDeleted { .. } => "shape-deleted",
            Self::ScreenAdded { .. } => "screen-added",
            Self::ScreenRenamed { .. } => "screen-renamed",
            Self::ScreenDeleted { .. } => "screen-deleted",
            Self::DocumentReplaced => "document-replaced",
        }
    }

    /// Whether this event mutates document content (as opposed to
    /// presence or notifications).
    #[must_use]
    pub fn is_document_event(&self) -> bool {
        matches!(
            self,
            Self::ShapeAdded { .. }
                | Self::ShapeUpdated { .. }
                | Self::ShapeMoving { .. }
                | Self::ShapeDeleted { .. }
                | Self::ScreenAdded { .. }
                | Self::ScreenRenamed { .. }
                | Self::ScreenDeleted { .. }
        )
    }
}

/// Envelope carrying an event across the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMessage {
    /// Document this event belongs to
    pub document_id: Uuid,

    /// Connection that originated the event, used to suppress self-echo.
    /// `None` for relay-originated notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Uuid>,

    /// The event payload
    pub event: CanvasEvent,
}

impl ChannelMessage {
    /// Create a message from a specific connection.
    #[must_use]
    pub fn new(document_id: Uuid, origin: Uuid, event: CanvasEvent) -> Self {
        Self {
            document_id,
            origin: Some(origin),
            event,
        }
    }

    /// Create a relay-originated notification.
    #[must_use]
    pub fn notification(document_id: Uuid, event: CanvasEvent) -> Self {
        Self {
            document_id,
            origin: None,
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ShapeKind;

    #[test]
    fn test_event_tags_match_wire_names() {
        let shape = Shape::new("s1", ShapeKind::Rectangle, 50.0, 50.0);
        let event = CanvasEvent::ShapeAdded {
            screen_id: "Home".to_string(),
            shape,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"shape-added\""));
        assert!(json.contains("\"screenId\":\"Home\""));
        assert_eq!(event.kind(), "shape-added");
    }

    #[test]
    fn test_event_payload_fields_are_camel_case() {
        let event = CanvasEvent::ScreenRenamed {
            screen_id: "s2".to_string(),
            new_name: "Details".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"screenId\":\"s2\""));
        assert!(json.contains("\"newName\":\"Details\""));
        assert!(!json.contains("screen_id"));

        let moving = CanvasEvent::ShapeMoving {
            screen_id: "Home".to_string(),
            shape_id: "s1".to_string(),
            x: 1.0,
            y: 2.0,
        };
        let json = serde_json::to_string(&moving).unwrap();
        assert!(json.contains("\"shapeId\":\"s1\""));
    }

    #[test]
    fn test_participant_list_changed_tag() {
        let event = CanvasEvent::ParticipantListChanged {
            participants: vec![Participant::new("ana")],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"participant-list-changed\""));
    }

    #[test]
    fn test_shape_moving_round_trip() {
        let event = CanvasEvent::ShapeMoving {
            screen_id: "Home".to_string(),
            shape_id: "s1".to_string(),
            x: 120.5,
            y: 33.0,
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: CanvasEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
        assert!(parsed.is_document_event());
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let json = r#"{"type":"shape-teleported","screenId":"Home"}"#;
        assert!(serde_json::from_str::<CanvasEvent>(json).is_err());
    }

    #[test]
    fn test_presence_events_are_not_document_events() {
        assert!(!CanvasEvent::Leave.is_document_event());
        assert!(!CanvasEvent::DocumentReplaced.is_document_event());
    }

    #[test]
    fn test_channel_message_envelope() {
        let doc_id = Uuid::new_v4();
        let origin = Uuid::new_v4();
        let msg = ChannelMessage::new(doc_id, origin, CanvasEvent::Leave);
        assert_eq!(msg.origin, Some(origin));

        let note = ChannelMessage::notification(doc_id, CanvasEvent::DocumentReplaced);
        assert!(note.origin.is_none());
        let json = serde_json::to_string(&note).unwrap();
        assert!(json.contains("\"documentId\""));
        assert!(!json.contains("\"origin\""));
    }
}
