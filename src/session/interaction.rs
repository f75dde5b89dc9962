//! Pointer routing, shape dragging, and label/shape editing.

use super::{Dialogs, DragState, SessionState};
use crate::config::LabelCascade;
use crate::error::DrawError;
use crate::geometry;
use crate::types::*;

/// What a pointer event landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    /// Empty map
    Map,
    /// A committed shape's rendered geometry
    Shape(ShapeId),
    /// A committed label
    Label(LabelId),
    /// A UI control
    Control,
}

/// A pointer event at a map coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// Press and release without movement
    Click {
        /// Where
        at: GeoPoint,
        /// On what
        target: HitTarget,
    },
    /// Button pressed
    Down {
        /// Where
        at: GeoPoint,
        /// On what
        target: HitTarget,
    },
    /// Pointer moved
    Move {
        /// Where
        at: GeoPoint,
    },
    /// Button released
    Up {
        /// Where
        at: GeoPoint,
    },
}

/// Result of a label edit prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelEdit {
    /// Cancelled, blank, or identical text
    Unchanged,
    /// Text replaced in place
    Renamed,
    /// Blank text removed the label
    Deleted,
}

/// What the session did with a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerOutcome {
    /// A vertex was appended; carries the new draft length
    VertexAdded(usize),
    /// A drag began on this shape
    DragStarted(ShapeId),
    /// The dragged shape moved
    Dragged,
    /// The drag ended on this shape
    DragEnded(ShapeId),
    /// A label was clicked and edited
    LabelEdited(LabelEdit),
    /// Nothing happened
    Ignored,
}

impl SessionState {
    /// Routes a pointer event.
    ///
    /// An active drag takes precedence: clicks arriving during a drag never add
    /// vertices. Map clicks add vertices only while drawing; clicks on shapes,
    /// labels or controls are never vertices. A label click opens the edit prompt.
    pub fn handle_pointer(&mut self, event: PointerEvent, dialogs: &mut impl Dialogs) -> PointerOutcome {
        match event {
            PointerEvent::Click { at, target } => {
                if self.drag.is_some() {
                    return PointerOutcome::Ignored;
                }
                match target {
                    HitTarget::Map if self.is_drawing() => self
                        .add_vertex(at)
                        .map(PointerOutcome::VertexAdded)
                        .unwrap_or(PointerOutcome::Ignored),
                    HitTarget::Label(id) => self
                        .edit_label(id, dialogs)
                        .map(PointerOutcome::LabelEdited)
                        .unwrap_or(PointerOutcome::Ignored),
                    _ => PointerOutcome::Ignored,
                }
            }
            PointerEvent::Down { at, target: HitTarget::Shape(id) } => self
                .begin_drag(id, at)
                .map(|_| PointerOutcome::DragStarted(id))
                .unwrap_or(PointerOutcome::Ignored),
            PointerEvent::Down { .. } => PointerOutcome::Ignored,
            PointerEvent::Move { at } => match self.drag_to(at) {
                Ok(true) => PointerOutcome::Dragged,
                _ => PointerOutcome::Ignored,
            },
            PointerEvent::Up { at } => {
                if self.drag.is_none() {
                    return PointerOutcome::Ignored;
                }
                if let Err(e) = self.drag_to(at) {
                    log::debug!("Drag release ignored: {}", e);
                    self.drag = None;
                    return PointerOutcome::Ignored;
                }
                self.end_drag()
                    .map(PointerOutcome::DragEnded)
                    .unwrap_or(PointerOutcome::Ignored)
            }
        }
    }

    /// Starts dragging a committed shape from `at`.
    pub fn begin_drag(&mut self, id: ShapeId, at: GeoPoint) -> Result<(), DrawError> {
        let shape = self.territories.shape(id).ok_or(DrawError::UnknownShape(id))?;
        self.drag = Some(DragState {
            shape: id,
            origin: at,
            original: shape.geometry.clone(),
        });
        log::debug!("Drag started on '{}'", shape.name);
        Ok(())
    }

    /// Moves the dragged shape so that its drag origin sits under `at`.
    ///
    /// Every vertex is translated by the same delta from the drag start; the
    /// associated label follows to the new centroid.
    ///
    /// # Returns
    ///
    /// `false` when no drag is active.
    pub fn drag_to(&mut self, at: GeoPoint) -> Result<bool, DrawError> {
        let Some(drag) = &self.drag else {
            return Ok(false);
        };
        let delta = at.delta_from(drag.origin);
        let moved = drag.original.translated(delta);
        let id = drag.shape;
        let center = geometry::centroid(&moved);

        let shape = self.territories.shape_mut(id).ok_or(DrawError::UnknownShape(id))?;
        shape.geometry = moved;
        let label = shape.label;
        if let Some(label) = label.and_then(|lid| self.territories.label_mut(lid)) {
            label.anchor = center;
        }
        Ok(true)
    }

    /// Ends the drag, returning the shape that was dragged.
    pub fn end_drag(&mut self) -> Option<ShapeId> {
        let drag = self.drag.take()?;
        log::debug!("Drag ended");
        Some(drag.shape)
    }

    /// Prompts for new label text.
    ///
    /// A cancelled or identical answer leaves the label alone. A blank answer
    /// deletes the label when `delete_label_on_empty_text` is set and is ignored
    /// otherwise. Any other answer replaces the text, keeping identity and anchor.
    pub fn edit_label(&mut self, id: LabelId, dialogs: &mut impl Dialogs) -> Result<LabelEdit, DrawError> {
        let current = self.territories.label(id).ok_or(DrawError::UnknownLabel(id))?.text.clone();
        let Some(answer) = dialogs.prompt("Edit label text:", &current) else {
            return Ok(LabelEdit::Unchanged);
        };
        let answer = answer.trim();
        if answer.is_empty() {
            if self.delete_label_on_empty_text {
                self.territories.remove_label(id);
                log::info!("Label deleted");
                return Ok(LabelEdit::Deleted);
            }
            return Ok(LabelEdit::Unchanged);
        }
        if answer == current {
            return Ok(LabelEdit::Unchanged);
        }
        if let Some(label) = self.territories.label_mut(id) {
            label.text = answer.to_string();
        }
        Ok(LabelEdit::Renamed)
    }

    /// Replaces a label's rotation, size and colour in place.
    pub fn restyle_label(&mut self, id: LabelId, style: LabelStyle) -> Result<(), DrawError> {
        let label = self.territories.label_mut(id).ok_or(DrawError::UnknownLabel(id))?;
        label.style = style;
        Ok(())
    }

    /// Deletes a shape. Its label is deleted too under [`LabelCascade::Cascade`],
    /// or kept as a standalone label under [`LabelCascade::Orphan`].
    pub fn delete_shape(&mut self, id: ShapeId) -> Result<ShapeRecord, DrawError> {
        let shape = self.territories.remove_shape(id).ok_or(DrawError::UnknownShape(id))?;
        if self.drag.as_ref().is_some_and(|d| d.shape == id) {
            self.drag = None;
        }
        if let Some(label_id) = shape.label {
            match self.label_cascade {
                LabelCascade::Cascade => {
                    self.territories.remove_label(label_id);
                }
                LabelCascade::Orphan => {
                    if let Some(label) = self.territories.label_mut(label_id) {
                        label.shape = None;
                    }
                }
            }
        }
        log::info!("Deleted '{}'", shape.name);
        Ok(shape)
    }

    /// Deletes a label.
    pub fn delete_label(&mut self, id: LabelId) -> Result<LabelRecord, DrawError> {
        self.territories.remove_label(id).ok_or(DrawError::UnknownLabel(id))
    }
}
