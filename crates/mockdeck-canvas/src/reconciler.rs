//! Remote Event Reconciler
//!
//! Applies events from other participants directly to the local document.
//! Remote changes bypass history (undo is local-only) and are never
//! re-emitted. Conflict policy is last-write-wins per event: the
//! reconciler trusts arrival order as delivered by the channel, which is
//! acceptable because collaborators overwhelmingly edit different shapes.
//!
//! A missing screen or shape means the entity lost a race with a
//! concurrent delete. That is expected, not an error: the event is
//! dropped with a debug log and nothing crashes.

use tracing::debug;

use crate::document::Document;
use crate::events::CanvasEvent;

/// What became of a remote event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The document was mutated
    Applied,
    /// The event referenced a missing entity, or was redundant, and was
    /// dropped without touching the document
    Dropped,
    /// Presence or notification event; the engine handles it, not the
    /// document
    Presence,
}

/// Apply a remote event to the document.
///
/// Matching is exhaustive over the closed event set, so a new event kind
/// fails to compile until it is handled here.
pub fn apply(document: &mut Document, event: &CanvasEvent) -> Outcome {
    match event {
        CanvasEvent::ShapeAdded { screen_id, shape } => {
            // At-least-once delivery: a redelivered add must not duplicate.
            if document.contains_shape(&shape.id) {
                debug!(shape_id = %shape.id, "shape already present, dropping duplicate add");
                return Outcome::Dropped;
            }
            match document.screen_mut(screen_id) {
                Some(screen) => {
                    screen.shapes.push(shape.clone());
                    Outcome::Applied
                }
                None => {
                    debug!(%screen_id, "screen gone, dropping shape-added");
                    Outcome::Dropped
                }
            }
        }

        CanvasEvent::ShapeUpdated { screen_id, shape } => {
            let Some(screen) = document.screen_mut(screen_id) else {
                debug!(%screen_id, "screen gone, dropping shape-updated");
                return Outcome::Dropped;
            };
            match screen.shape_mut(&shape.id) {
                Some(existing) => {
                    *existing = shape.clone();
                    Outcome::Applied
                }
                None => {
                    debug!(shape_id = %shape.id, "shape gone, dropping shape-updated");
                    Outcome::Dropped
                }
            }
        }

        CanvasEvent::ShapeMoving {
            screen_id,
            shape_id,
            x,
            y,
        } => {
            // Position only; every other field keeps its current value.
            let Some(shape) = document
                .screen_mut(screen_id)
                .and_then(|s| s.shape_mut(shape_id))
            else {
                debug!(%shape_id, "shape gone, dropping shape-moving");
                return Outcome::Dropped;
            };
            shape.x = *x;
            shape.y = *y;
            Outcome::Applied
        }

        CanvasEvent::ShapeDeleted {
            screen_id,
            shape_id,
        } => {
            let Some(screen) = document.screen_mut(screen_id) else {
                debug!(%screen_id, "screen gone, dropping shape-deleted");
                return Outcome::Dropped;
            };
            match screen.remove_shape(shape_id) {
                Some(_) => Outcome::Applied,
                None => {
                    debug!(%shape_id, "shape already deleted");
                    Outcome::Dropped
                }
            }
        }

        CanvasEvent::ScreenAdded { screen } => {
            if document.screen(&screen.id).is_some() {
                debug!(screen_id = %screen.id, "screen already present, dropping duplicate add");
                return Outcome::Dropped;
            }
            document.add_screen(screen.clone());
            Outcome::Applied
        }

        CanvasEvent::ScreenRenamed {
            screen_id,
            new_name,
        } => match document.screen_mut(screen_id) {
            Some(screen) => {
                screen.name = new_name.clone();
                Outcome::Applied
            }
            None => {
                debug!(%screen_id, "screen gone, dropping screen-renamed");
                Outcome::Dropped
            }
        },

        CanvasEvent::ScreenDeleted { screen_id } => match document.remove_screen(screen_id) {
            Some(_) => Outcome::Applied,
            None => {
                debug!(%screen_id, "screen already deleted");
                Outcome::Dropped
            }
        },

        CanvasEvent::Join { .. }
        | CanvasEvent::Leave
        | CanvasEvent::ParticipantListChanged { .. }
        | CanvasEvent::DocumentReplaced => Outcome::Presence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Screen, Shape, ShapeKind, ShapeUpdate, DEFAULT_SCREEN_ID};
    use crate::events::Participant;

    fn doc_with_shape() -> Document {
        let mut doc = Document::with_default_screen();
        let shape = Shape::new("s1", ShapeKind::Rectangle, 50.0, 50.0)
            .with_size(120.0, 100.0)
            .with_fill("#60a5fa")
            .with_text("Box");
        doc.screen_mut(DEFAULT_SCREEN_ID).unwrap().shapes.push(shape);
        doc
    }

    #[test]
    fn test_shape_added_appends_to_screen() {
        let mut doc = Document::with_default_screen();
        let event = CanvasEvent::ShapeAdded {
            screen_id: DEFAULT_SCREEN_ID.to_string(),
            shape: Shape::new("s1", ShapeKind::Rectangle, 50.0, 50.0),
        };

        assert_eq!(apply(&mut doc, &event), Outcome::Applied);
        let shape = doc.shape(DEFAULT_SCREEN_ID, "s1").unwrap();
        assert_eq!((shape.x, shape.y), (50.0, 50.0));
    }

    #[test]
    fn test_duplicate_shape_added_is_dropped() {
        let mut doc = doc_with_shape();
        let event = CanvasEvent::ShapeAdded {
            screen_id: DEFAULT_SCREEN_ID.to_string(),
            shape: Shape::new("s1", ShapeKind::Rectangle, 0.0, 0.0),
        };

        assert_eq!(apply(&mut doc, &event), Outcome::Dropped);
        assert_eq!(doc.shape_count(), 1);
        // The original position survives the redelivery.
        assert_eq!(doc.shape(DEFAULT_SCREEN_ID, "s1").unwrap().x, 50.0);
    }

    #[test]
    fn test_shape_updated_replaces_whole_shape() {
        let mut doc = doc_with_shape();
        let mut updated = doc.shape(DEFAULT_SCREEN_ID, "s1").unwrap().clone();
        updated.apply(&ShapeUpdate {
            fill: Some("#ff0000".to_string()),
            text: Some("Renamed".to_string()),
            ..ShapeUpdate::default()
        });

        let event = CanvasEvent::ShapeUpdated {
            screen_id: DEFAULT_SCREEN_ID.to_string(),
            shape: updated,
        };
        assert_eq!(apply(&mut doc, &event), Outcome::Applied);

        let shape = doc.shape(DEFAULT_SCREEN_ID, "s1").unwrap();
        assert_eq!(shape.fill, "#ff0000");
        assert_eq!(shape.text.as_deref(), Some("Renamed"));
    }

    #[test]
    fn test_shape_moving_touches_only_position() {
        let mut doc = doc_with_shape();
        let event = CanvasEvent::ShapeMoving {
            screen_id: DEFAULT_SCREEN_ID.to_string(),
            shape_id: "s1".to_string(),
            x: 200.0,
            y: 300.0,
        };

        assert_eq!(apply(&mut doc, &event), Outcome::Applied);
        let shape = doc.shape(DEFAULT_SCREEN_ID, "s1").unwrap();
        assert_eq!((shape.x, shape.y), (200.0, 300.0));
        assert_eq!(shape.fill, "#60a5fa");
        assert_eq!(shape.text.as_deref(), Some("Box"));
        assert_eq!(shape.width, Some(120.0));
        assert_eq!(shape.height, Some(100.0));
    }

    #[test]
    fn test_shape_deleted_missing_id_leaves_screen_unchanged() {
        let mut doc = doc_with_shape();
        let before = doc.clone();
        let event = CanvasEvent::ShapeDeleted {
            screen_id: DEFAULT_SCREEN_ID.to_string(),
            shape_id: "ghost".to_string(),
        };

        assert_eq!(apply(&mut doc, &event), Outcome::Dropped);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_update_for_concurrently_deleted_shape_is_dropped() {
        let mut doc = Document::with_default_screen();
        let event = CanvasEvent::ShapeUpdated {
            screen_id: DEFAULT_SCREEN_ID.to_string(),
            shape: Shape::new("gone", ShapeKind::Rectangle, 0.0, 0.0),
        };
        assert_eq!(apply(&mut doc, &event), Outcome::Dropped);
    }

    #[test]
    fn test_screen_lifecycle_events() {
        let mut doc = Document::with_default_screen();

        let added = CanvasEvent::ScreenAdded {
            screen: Screen::new("s2", "Second"),
        };
        assert_eq!(apply(&mut doc, &added), Outcome::Applied);
        assert_eq!(apply(&mut doc, &added), Outcome::Dropped);

        let renamed = CanvasEvent::ScreenRenamed {
            screen_id: "s2".to_string(),
            new_name: "Details".to_string(),
        };
        assert_eq!(apply(&mut doc, &renamed), Outcome::Applied);
        assert_eq!(doc.screen("s2").unwrap().name, "Details");

        let deleted = CanvasEvent::ScreenDeleted {
            screen_id: "s2".to_string(),
        };
        assert_eq!(apply(&mut doc, &deleted), Outcome::Applied);
        assert_eq!(apply(&mut doc, &deleted), Outcome::Dropped);
    }

    #[test]
    fn test_remote_screen_delete_fixes_local_cursor() {
        let mut doc = Document::with_default_screen();
        doc.add_screen(Screen::new("s2", "Second"));
        doc.current_screen_id = Some("s2".to_string());

        let event = CanvasEvent::ScreenDeleted {
            screen_id: "s2".to_string(),
        };
        assert_eq!(apply(&mut doc, &event), Outcome::Applied);
        assert_eq!(doc.current_screen_id.as_deref(), Some(DEFAULT_SCREEN_ID));
    }

    #[test]
    fn test_presence_events_do_not_touch_document() {
        let mut doc = doc_with_shape();
        let before = doc.clone();

        for event in [
            CanvasEvent::Join {
                participant: Participant::new("ana"),
            },
            CanvasEvent::Leave,
            CanvasEvent::ParticipantListChanged {
                participants: vec![],
            },
            CanvasEvent::DocumentReplaced,
        ] {
            assert_eq!(apply(&mut doc, &event), Outcome::Presence);
        }
        assert_eq!(doc, before);
    }
}
