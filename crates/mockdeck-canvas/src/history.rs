//! Undo/Redo History
//!
//! Linear snapshot history over the full document. Entries are deep,
//! structurally independent copies - they never alias the live document,
//! so later mutations cannot corrupt recorded states. Undo and redo are
//! purely local time-travel and emit no synchronization events.

use crate::document::Document;

/// Default maximum undo depth before the oldest entry is dropped.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Bounded undo/redo snapshot stacks.
#[derive(Debug, Default)]
pub struct History {
    undo: Vec<Document>,
    redo: Vec<Document>,
    max_depth: usize,
}

impl History {
    /// Create a history with the default depth cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    /// Create a history with a specific depth cap.
    #[must_use]
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            max_depth,
        }
    }

    /// Record the pre-mutation state. Any new edit invalidates the redo
    /// stack, per standard linear-history semantics.
    pub fn snapshot_before_change(&mut self, current: &Document) {
        if self.undo.len() == self.max_depth {
            self.undo.remove(0);
        }
        self.undo.push(current.clone());
        self.redo.clear();
    }

    /// Restore the most recent snapshot into `live`, moving the current
    /// state onto the redo stack. Returns `false` when there is nothing
    /// to undo.
    pub fn undo(&mut self, live: &mut Document) -> bool {
        let Some(previous) = self.undo.pop() else {
            return false;
        };
        self.redo.push(std::mem::replace(live, previous));
        true
    }

    /// Mirror of [`History::undo`].
    pub fn redo(&mut self, live: &mut Document) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        self.undo.push(std::mem::replace(live, next));
        true
    }

    /// Whether an undo step is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether a redo step is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of recorded undo entries.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.undo.len()
    }
}
