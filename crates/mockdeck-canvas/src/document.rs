//! Canvas Document Types
//!
//! This module defines the document structure for the Mockdeck canvas.
//! A document is an ordered list of screens, each holding a flat, z-ordered
//! list of positioned shapes.

use serde::{Deserialize, Serialize};

/// Default screen created when a stored document is empty or malformed.
pub const DEFAULT_SCREEN_ID: &str = "Home";

/// Closed set of shape kinds supported by the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeKind {
    /// Plain rectangle
    Rectangle,
    /// Text input field
    Input,
    /// Clickable button (may navigate to another screen)
    Button,
    /// Free-standing text label
    Label,
    /// Text paragraph
    Text,
    /// Generic container
    Container,
    /// Sidebar panel (anchor of a sidebar widget group)
    Sidebar,
    /// Entry inside a sidebar group
    SidebarItem,
    /// Expand/collapse control of a sidebar group
    SidebarToggle,
}

impl ShapeKind {
    /// Whether shapes of this kind may carry a navigation target.
    #[must_use]
    pub fn is_navigable(&self) -> bool {
        matches!(self, Self::Button | Self::SidebarItem)
    }
}

/// A positioned visual element on a screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    /// Client-generated identifier, unique across the whole document
    pub id: String,

    /// Shape kind
    pub kind: ShapeKind,

    /// X position in document coordinates
    pub x: f64,

    /// Y position in document coordinates
    pub y: f64,

    /// Width (labels and text have intrinsic size)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,

    /// Height
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,

    /// Fill color (CSS hex string)
    pub fill: String,

    /// Display text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Cached label restored when a collapsed sidebar item expands again
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,

    /// Font size in points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,

    /// Screen this shape navigates to when activated (may dangle)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_screen_id: Option<String>,

    /// Id of the sibling shape anchoring this shape's widget group.
    /// A weak relation, not an ownership edge; may dangle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

impl Shape {
    /// Create a shape with the given id, kind and position.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: ShapeKind, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            kind,
            x,
            y,
            width: None,
            height: None,
            fill: "#000000".to_string(),
            text: None,
            original_text: None,
            font_size: None,
            target_screen_id: None,
            group_id: None,
        }
    }

    /// Set width and height.
    #[must_use]
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Set the fill color.
    #[must_use]
    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = fill.into();
        self
    }

    /// Set the display text.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the navigation target screen.
    #[must_use]
    pub fn with_target(mut self, screen_id: impl Into<String>) -> Self {
        self.target_screen_id = Some(screen_id.into());
        self
    }

    /// Set the group anchor reference.
    #[must_use]
    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Merge a partial update into this shape.
    pub fn apply(&mut self, update: &ShapeUpdate) {
        if let Some(x) = update.x {
            self.x = x;
        }
        if let Some(y) = update.y {
            self.y = y;
        }
        if let Some(width) = update.width {
            self.width = Some(width);
        }
        if let Some(height) = update.height {
            self.height = Some(height);
        }
        if let Some(ref fill) = update.fill {
            self.fill = fill.clone();
        }
        if let Some(ref text) = update.text {
            self.text = Some(text.clone());
        }
        if let Some(font_size) = update.font_size {
            self.font_size = Some(font_size);
        }
        if let Some(ref target) = update.target_screen_id {
            self.target_screen_id = Some(target.clone());
        }
    }
}

/// A partial shape update. Fields left as `None` are untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeUpdate {
    /// New x position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// New y position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// New width
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// New height
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// New fill color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    /// New display text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// New font size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// New navigation target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_screen_id: Option<String>,
}

impl ShapeUpdate {
    /// A position-only update.
    #[must_use]
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }
}

/// A named canvas holding an ordered list of shapes.
///
/// Insertion order is z-order for hit-testing purposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screen {
    /// Unique screen identifier
    pub id: String,

    /// Display name (mutable, not required to be unique)
    pub name: String,

    /// Shapes on this screen, in z-order
    #[serde(default)]
    pub shapes: Vec<Shape>,
}

impl Screen {
    /// Create an empty screen.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            shapes: Vec::new(),
        }
    }

    /// Get a shape by id.
    #[must_use]
    pub fn shape(&self, shape_id: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id == shape_id)
    }

    /// Get a mutable shape by id.
    pub fn shape_mut(&mut self, shape_id: &str) -> Option<&mut Shape> {
        self.shapes.iter_mut().find(|s| s.id == shape_id)
    }

    /// Remove a shape by id, returning it if present.
    pub fn remove_shape(&mut self, shape_id: &str) -> Option<Shape> {
        let pos = self.shapes.iter().position(|s| s.id == shape_id)?;
        Some(self.shapes.remove(pos))
    }
}

/// Target device metadata persisted with the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasMeta {
    /// Target device width in logical pixels
    pub width: f64,
    /// Target device height in logical pixels
    pub height: f64,
    /// Device preset name ("iPhone SE", "Custom", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

/// The root aggregate: all screens plus client-local UI state.
///
/// The document is the unit of persistence and the unit the undo history
/// snapshots. `current_screen_id` is a local cursor and is neither
/// persisted nor synchronized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Ordered list of screens
    #[serde(default)]
    pub screens: Vec<Screen>,

    /// Client-local cursor pointing at the screen being edited
    #[serde(skip)]
    pub current_screen_id: Option<String>,

    /// Target device metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<CanvasMeta>,
}

impl Document {
    /// Create a document with the single default "Home" screen.
    #[must_use]
    pub fn with_default_screen() -> Self {
        Self {
            screens: vec![Screen::new(DEFAULT_SCREEN_ID, DEFAULT_SCREEN_ID)],
            current_screen_id: Some(DEFAULT_SCREEN_ID.to_string()),
            meta: None,
        }
    }

    /// Get a screen by id.
    #[must_use]
    pub fn screen(&self, screen_id: &str) -> Option<&Screen> {
        self.screens.iter().find(|s| s.id == screen_id)
    }

    /// Get a mutable screen by id.
    pub fn screen_mut(&mut self, screen_id: &str) -> Option<&mut Screen> {
        self.screens.iter_mut().find(|s| s.id == screen_id)
    }

    /// Get a shape by screen and shape id.
    #[must_use]
    pub fn shape(&self, screen_id: &str, shape_id: &str) -> Option<&Shape> {
        self.screen(screen_id)?.shape(shape_id)
    }

    /// Whether a shape id exists anywhere in the document.
    #[must_use]
    pub fn contains_shape(&self, shape_id: &str) -> bool {
        self.screens.iter().any(|s| s.shape(shape_id).is_some())
    }

    /// Append a screen.
    pub fn add_screen(&mut self, screen: Screen) {
        self.screens.push(screen);
    }

    /// Remove a screen by id, returning it if present.
    ///
    /// If the removed screen was the current one, the cursor moves to the
    /// first remaining screen, or clears when no screens are left. The
    /// caller is responsible for installing a default screen before the
    /// next render of an empty document.
    pub fn remove_screen(&mut self, screen_id: &str) -> Option<Screen> {
        let pos = self.screens.iter().position(|s| s.id == screen_id)?;
        let removed = self.screens.remove(pos);
        if self.current_screen_id.as_deref() == Some(screen_id) {
            self.current_screen_id = self.screens.first().map(|s| s.id.clone());
        }
        Some(removed)
    }

    /// Resolve a shape's navigation target to a screen id.
    ///
    /// Returns `None` when the shape is missing, carries no target, or the
    /// target screen no longer exists (navigation simply no-ops).
    #[must_use]
    pub fn resolve_target(&self, screen_id: &str, shape_id: &str) -> Option<&str> {
        let target = self.shape(screen_id, shape_id)?.target_screen_id.as_deref()?;
        self.screen(target).map(|s| s.id.as_str())
    }

    /// All shapes of a screen that belong to the given widget group,
    /// including the anchor itself.
    ///
    /// A dangling `group_id` just yields the members that reference it.
    #[must_use]
    pub fn group_members<'a>(&'a self, screen_id: &str, group_id: &'a str) -> Vec<&'a Shape> {
        let Some(screen) = self.screen(screen_id) else {
            return Vec::new();
        };
        screen
            .shapes
            .iter()
            .filter(|s| s.id == group_id || s.group_id.as_deref() == Some(group_id))
            .collect()
    }

    /// Expand or collapse all sidebar widgets in the document.
    ///
    /// Collapsing shrinks sidebar panels and items and blanks item labels;
    /// expanding restores widths and the cached `original_text`. This is
    /// local view state: callers do not snapshot history or broadcast it.
    pub fn set_sidebar_expanded(&mut self, expanded: bool) {
        for screen in &mut self.screens {
            for shape in &mut screen.shapes {
                match shape.kind {
                    ShapeKind::Sidebar => {
                        shape.width = Some(if expanded { 200.0 } else { 60.0 });
                    }
                    ShapeKind::SidebarItem => {
                        shape.width = Some(if expanded { 180.0 } else { 40.0 });
                        shape.text = if expanded {
                            shape.original_text.clone().or_else(|| shape.text.clone())
                        } else {
                            Some(String::new())
                        };
                    }
                    _ => {}
                }
            }
        }
    }

    /// Total shape count across all screens.
    #[must_use]
    pub fn shape_count(&self) -> usize {
        self.screens.iter().map(|s| s.shapes.len()).sum()
    }
}
