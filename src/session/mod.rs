//! Drawing session state and the shape-drawing state machine.
//!
//! [`SessionState`] owns everything the user manipulates: the drawing mode and
//! its draft path, the live preview shape, the current tool colour and label
//! inputs, the map view, and the committed territories. The export renderer
//! only ever sees a snapshot of the territories (see [`crate::export`]).
//!
//! # Module Organization
//!
//! - `drawing` - start, vertex append/undo, commit, cancel and reset
//! - `interaction` - pointer routing, dragging, label editing and deletion
//! - `dialogs` - the blocking dialog collaborator

mod dialogs;
mod drawing;
mod interaction;

pub use dialogs::{Dialogs, ScriptedDialogs};
pub use drawing::CommitOutcome;
pub use interaction::{HitTarget, LabelEdit, PointerEvent, PointerOutcome};

use crate::config::{ExportConfig, LabelCascade};
use crate::constants;
use crate::export::ExportLock;
use crate::style::PathStyle;
use crate::types::*;

/// The in-progress vertex sequence. Order defines line direction and polygon winding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftPath {
    points: Vec<GeoPoint>,
}

impl DraftPath {
    /// Appends a vertex and returns the new length.
    pub fn push(&mut self, p: GeoPoint) -> usize {
        self.points.push(p);
        self.points.len()
    }

    /// Removes the last vertex, if any.
    pub fn pop(&mut self) -> Option<GeoPoint> {
        self.points.pop()
    }

    /// Vertices in drawing order.
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if no vertex has been placed.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Whether a territory is being drawn.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DrawingMode {
    /// No draft path exists
    #[default]
    Idle,
    /// Map clicks append to the draft
    Drawing {
        /// The live draft path
        draft: DraftPath,
    },
}

impl DrawingMode {
    /// True while drawing.
    pub fn is_drawing(&self) -> bool {
        matches!(self, DrawingMode::Drawing { .. })
    }
}

/// Live feedback for the draft path, re-derived after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewShape {
    /// Geometry of the draft so far
    pub geometry: Geometry,
    /// Dashed draft style in the current tool colour
    pub style: PathStyle,
}

/// Values of the label text, angle and size inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelInputs {
    /// Text to place with the next commit; blank means no label
    pub text: String,
    /// Rotation in degrees
    pub angle: f32,
    /// Font size in pixels
    pub font_size: f32,
}

impl Default for LabelInputs {
    fn default() -> Self {
        Self {
            text: String::new(),
            angle: constants::DEFAULT_LABEL_ANGLE,
            font_size: constants::DEFAULT_LABEL_SIZE,
        }
    }
}

/// The visible map region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    /// Centre of the view
    pub center: GeoPoint,
    /// Zoom level
    pub zoom: f64,
    /// Clockwise rotation in degrees, in `[0, 360)`
    pub bearing: f64,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: GeoPoint::new(constants::DEFAULT_CENTER_LAT, constants::DEFAULT_CENTER_LON),
            zoom: constants::DEFAULT_ZOOM,
            bearing: 0.0,
        }
    }
}

/// Enablement of the tool controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlStates {
    /// Start drawing
    pub start: bool,
    /// Undo last point
    pub undo: bool,
    /// Save the draft
    pub save: bool,
    /// Cancel the draft
    pub cancel: bool,
    /// Reset everything
    pub reset: bool,
    /// Export as image
    pub export_image: bool,
    /// Export as document
    pub export_document: bool,
}

/// In-flight drag of a committed shape.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DragState {
    pub shape: ShapeId,
    pub origin: GeoPoint,
    pub original: Geometry,
}

/// Session-wide state shared by the drawing state machine and the exporter.
#[derive(Debug)]
pub struct SessionState {
    /// Drawing mode and draft path
    mode: DrawingMode,
    /// Preview of the draft path
    preview: Option<PreviewShape>,
    /// Current tool colour
    color: Color,
    /// Label inputs used at commit time
    pub label_inputs: LabelInputs,
    /// Visible map region
    view: MapView,
    /// Committed shapes and labels
    territories: Territories,
    /// Shape being dragged
    drag: Option<DragState>,
    /// Guard against overlapping exports
    export_lock: ExportLock,
    /// Label handling when a shape is deleted
    pub label_cascade: LabelCascade,
    /// Whether an empty label edit deletes the label
    pub delete_label_on_empty_text: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Creates an idle session with an empty collection.
    pub fn new() -> Self {
        Self {
            mode: DrawingMode::Idle,
            preview: None,
            color: Color::default(),
            label_inputs: LabelInputs::default(),
            view: MapView::default(),
            territories: Territories::new(),
            drag: None,
            export_lock: ExportLock::default(),
            label_cascade: LabelCascade::default(),
            delete_label_on_empty_text: false,
        }
    }

    /// Creates a session using the label policies from `config`.
    pub fn with_config(config: &ExportConfig) -> Self {
        Self {
            label_cascade: config.label_cascade,
            delete_label_on_empty_text: config.delete_label_on_empty_text,
            ..Self::new()
        }
    }

    /// Current drawing mode.
    pub fn mode(&self) -> &DrawingMode {
        &self.mode
    }

    /// True while drawing.
    pub fn is_drawing(&self) -> bool {
        self.mode.is_drawing()
    }

    /// The live draft path, if drawing.
    pub fn draft(&self) -> Option<&DraftPath> {
        match &self.mode {
            DrawingMode::Drawing { draft } => Some(draft),
            DrawingMode::Idle => None,
        }
    }

    /// The preview of the draft path.
    pub fn preview(&self) -> Option<&PreviewShape> {
        self.preview.as_ref()
    }

    /// Current tool colour.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Visible map region.
    pub fn view(&self) -> &MapView {
        &self.view
    }

    /// Committed shapes and labels (read-only).
    pub fn territories(&self) -> &Territories {
        &self.territories
    }

    /// Shape currently being dragged.
    pub fn dragging(&self) -> Option<ShapeId> {
        self.drag.as_ref().map(|d| d.shape)
    }

    /// True while an export holds the guard.
    pub fn is_exporting(&self) -> bool {
        self.export_lock.is_busy()
    }

    pub(crate) fn export_lock(&self) -> &ExportLock {
        &self.export_lock
    }

    /// Changes the tool colour. A live preview follows; committed records do not.
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
        self.refresh_preview();
    }

    /// Moves the view.
    pub fn set_view(&mut self, center: GeoPoint, zoom: f64) {
        self.view.center = center;
        self.view.zoom = zoom;
    }

    /// Rotates the view. The bearing is normalised to `[0, 360)`.
    pub fn set_bearing(&mut self, degrees: f64) {
        self.view.bearing = if degrees.is_finite() { degrees.rem_euclid(360.0) } else { 0.0 };
    }

    /// Enablement of each tool control for the current state.
    pub fn controls(&self) -> ControlStates {
        let drawing = self.is_drawing();
        let can_export = !self.territories.is_empty() && !self.export_lock.is_busy();
        ControlStates {
            start: !drawing,
            undo: drawing,
            save: drawing,
            cancel: drawing,
            reset: drawing || !self.territories.is_empty(),
            export_image: can_export,
            export_document: can_export,
        }
    }

    /// Re-derives the preview from the draft: nothing, a marker, an open line or a closed outline.
    fn refresh_preview(&mut self) {
        self.preview = self.draft().and_then(|draft| {
            let geometry = Geometry::from_vertices(draft.points())?;
            let style = PathStyle::draft(geometry.kind(), self.color);
            Some(PreviewShape { geometry, style })
        });
    }
}

#[cfg(test)]
mod tests;
