//! The shape-drawing state machine: `Idle -> Drawing -> Idle`.

use super::{Dialogs, DraftPath, DrawingMode, LabelInputs, MapView, SessionState};
use crate::error::DrawError;
use crate::geometry;
use crate::style::PathStyle;
use crate::types::*;

/// Records created by a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The committed shape, absent for a label-only commit
    pub shape: Option<ShapeId>,
    /// The label created from the label text input, if any
    pub label: Option<LabelId>,
}

impl SessionState {
    /// Enters drawing mode with an empty draft.
    ///
    /// Clears any stale preview and resets the label inputs.
    pub fn start_drawing(&mut self) -> Result<(), DrawError> {
        if self.is_drawing() {
            return Err(DrawError::AlreadyDrawing);
        }
        self.mode = DrawingMode::Drawing { draft: DraftPath::default() };
        self.preview = None;
        self.label_inputs = LabelInputs::default();
        log::info!("Drawing started");
        Ok(())
    }

    /// Appends a vertex to the draft and re-derives the preview.
    ///
    /// # Returns
    ///
    /// The new number of vertices.
    pub fn add_vertex(&mut self, point: GeoPoint) -> Result<usize, DrawError> {
        let DrawingMode::Drawing { draft } = &mut self.mode else {
            return Err(DrawError::NotDrawing);
        };
        let len = draft.push(point);
        log::debug!("Vertex {} at ({:.6}, {:.6})", len, point.lat, point.lon);
        self.refresh_preview();
        Ok(len)
    }

    /// Removes the last vertex. Undo on an empty draft is a no-op.
    ///
    /// # Returns
    ///
    /// The remaining number of vertices.
    pub fn undo_vertex(&mut self) -> Result<usize, DrawError> {
        let DrawingMode::Drawing { draft } = &mut self.mode else {
            return Err(DrawError::NotDrawing);
        };
        if draft.pop().is_some() {
            log::debug!("Undo, {} vertices left", draft.len());
        }
        let len = draft.len();
        self.refresh_preview();
        Ok(len)
    }

    /// Commits the draft.
    ///
    /// A one-vertex draft becomes a point, two vertices a line, three or more a
    /// polygon. The shape is named through `dialogs` (a blank or cancelled answer
    /// keeps the `Territory {n+1}` default) and styled with the current colour.
    /// If the label text input is not blank, a label is placed at the shape's
    /// centroid with the current label settings. With an empty draft but label
    /// text present, only the label is created, at the view centre.
    ///
    /// # Errors
    ///
    /// [`DrawError::NotDrawing`] when idle, [`DrawError::EmptyDraft`] when there
    /// is nothing to commit. The session is unchanged on error.
    pub fn save_shape(&mut self, dialogs: &mut impl Dialogs) -> Result<CommitOutcome, DrawError> {
        let DrawingMode::Drawing { draft } = &self.mode else {
            return Err(DrawError::NotDrawing);
        };
        let label_text = self.label_inputs.text.trim().to_string();
        let geometry = Geometry::from_vertices(draft.points());
        if geometry.is_none() && label_text.is_empty() {
            return Err(DrawError::EmptyDraft);
        }

        let label_style = LabelStyle {
            angle: self.label_inputs.angle,
            font_size: self.label_inputs.font_size,
            color: self.color,
        };

        let mut outcome = CommitOutcome { shape: None, label: None };
        let anchor = match geometry {
            Some(geometry) => {
                let default_name = format!("Territory {}", self.territories.shapes.len() + 1);
                let name = dialogs
                    .prompt("Name of this territory:", &default_name)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .unwrap_or(default_name);
                let kind = geometry.kind();
                let style = PathStyle::committed(kind, self.color);
                let center = geometry::centroid(&geometry);
                let shape = ShapeRecord::new(geometry, style.stroke, style.weight, name);
                log::info!("Committed {} '{}' ({} vertices)", kind, shape.name, shape.geometry.vertex_count());
                outcome.shape = Some(self.territories.add_shape(shape));
                center
            }
            None => self.view.center,
        };

        if !label_text.is_empty() {
            let mut label = LabelRecord::new(label_text, anchor, label_style);
            label.shape = outcome.shape;
            let label_id = self.territories.add_label(label);
            if let Some(shape) = outcome.shape.and_then(|id| self.territories.shape_mut(id)) {
                shape.label = Some(label_id);
            }
            log::info!("Placed label at ({:.6}, {:.6})", anchor.lat, anchor.lon);
            outcome.label = Some(label_id);
        }

        self.mode = DrawingMode::Idle;
        self.preview = None;
        Ok(outcome)
    }

    /// Discards the draft and preview without committing. Idle sessions are unaffected.
    ///
    /// # Returns
    ///
    /// `true` if a drawing was cancelled.
    pub fn cancel_drawing(&mut self) -> bool {
        let was_drawing = self.is_drawing();
        self.mode = DrawingMode::Idle;
        self.preview = None;
        if was_drawing {
            log::info!("Drawing cancelled");
        }
        was_drawing
    }

    /// Removes every shape and label after confirmation.
    ///
    /// Also clears the draft, ends any drag, and restores the default colour,
    /// label inputs and view.
    ///
    /// # Returns
    ///
    /// `false` if the user declined; nothing is changed in that case.
    pub fn reset_all(&mut self, dialogs: &mut impl Dialogs) -> bool {
        if !dialogs.confirm("Reset everything? All marked territories will be deleted.") {
            return false;
        }
        self.territories.clear();
        self.mode = DrawingMode::Idle;
        self.preview = None;
        self.drag = None;
        self.color = Color::default();
        self.label_inputs = LabelInputs::default();
        self.view = MapView::default();
        log::info!("Session reset");
        true
    }
}
