//! Replayable interaction scripts.
//!
//! A script is a JSON document listing tool actions in order. Replaying it
//! drives a [`TerritoryApp`] headlessly with [`ScriptedDialogs`], queueing the
//! answers each step needs before performing it. Answers a step leaves unused
//! are dropped once the step is done.
//!
//! ```json
//! {
//!   "steps": [
//!     { "action": "start" },
//!     { "action": "click", "lat": 41.3851, "lon": 2.1701 },
//!     { "action": "click", "lat": 41.3870, "lon": 2.1730 },
//!     { "action": "click", "lat": 41.3840, "lon": 2.1740 },
//!     { "action": "label", "text": "North", "angle": 45 },
//!     { "action": "save", "name": "Lot A" },
//!     { "action": "export", "format": "document" }
//!   ]
//! }
//! ```

use crate::app::TerritoryApp;
use crate::config::ExportConfig;
use crate::constants;
use crate::error::ScriptError;
use crate::export::{Delivery, ExportFormat, OutputSink, TileProvider};
use crate::session::{HitTarget, LabelInputs, PointerEvent, ScriptedDialogs};
use crate::types::{Color, GeoPoint, LabelId, LabelStyle, Territories};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_label_size() -> f32 {
    constants::DEFAULT_LABEL_SIZE
}

fn yes() -> bool {
    true
}

/// One tool action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Start drawing
    Start,
    /// Click the map
    Click {
        /// Latitude
        lat: f64,
        /// Longitude
        lon: f64,
    },
    /// Undo the last point
    Undo,
    /// Pick the tool colour
    Color {
        /// New colour
        color: Color,
    },
    /// Fill the label inputs
    Label {
        /// Label text
        text: String,
        /// Rotation in degrees
        #[serde(default)]
        angle: f32,
        /// Font size in pixels
        #[serde(default = "default_label_size")]
        size: f32,
    },
    /// Save the draft, answering the name prompt
    Save {
        /// Name to answer with; absent cancels the prompt
        #[serde(default)]
        name: Option<String>,
    },
    /// Cancel the draft
    Cancel,
    /// Reset everything
    Reset {
        /// Answer to the confirmation
        #[serde(default = "yes")]
        confirm: bool,
    },
    /// Rotate the view
    Bearing {
        /// Bearing in degrees
        degrees: f64,
    },
    /// Move the view
    View {
        /// Centre latitude
        lat: f64,
        /// Centre longitude
        lon: f64,
        /// Zoom level
        zoom: f64,
    },
    /// Drag a committed shape
    Drag {
        /// Index of the shape, oldest first
        shape: usize,
        /// Press position
        from: GeoPoint,
        /// Release position
        to: GeoPoint,
    },
    /// Click a label and answer the edit prompt
    EditLabel {
        /// Index of the label, oldest first
        label: usize,
        /// New text; absent cancels the prompt
        #[serde(default)]
        text: Option<String>,
    },
    /// Change a label's rotation, size and colour
    RestyleLabel {
        /// Index of the label, oldest first
        label: usize,
        /// Rotation in degrees
        angle: f32,
        /// Font size in pixels
        size: f32,
        /// Text colour
        color: Color,
    },
    /// Delete a committed shape
    DeleteShape {
        /// Index of the shape, oldest first
        shape: usize,
    },
    /// Delete a label
    DeleteLabel {
        /// Index of the label, oldest first
        label: usize,
    },
    /// Export
    Export {
        /// Output kind
        format: ExportFormat,
        /// Whether to go through the preview
        #[serde(default)]
        preview: bool,
        /// Answer to the preview confirmation
        #[serde(default = "yes")]
        confirm: bool,
    },
}

/// A script: optional configuration plus the steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Configuration to run with; the caller's configuration when absent
    #[serde(default)]
    pub config: Option<ExportConfig>,
    /// Actions in order
    pub steps: Vec<Step>,
}

impl Script {
    /// Parses a script.
    pub fn from_json_str(json: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a script file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// What a replay produced.
#[derive(Debug, Clone, Default)]
pub struct ReplayReport {
    /// Steps performed
    pub steps: usize,
    /// Exports that were delivered
    pub deliveries: Vec<Delivery>,
    /// Messages shown to the user
    pub alerts: Vec<String>,
    /// The collection after the last step
    pub territories: Territories,
}

/// Replays `script` against `app`.
///
/// # Errors
///
/// [`ScriptError::Step`] when a step refers to a shape or label that does not
/// exist. Steps before it have already taken effect.
pub async fn replay<T: TileProvider, S: OutputSink>(
    script: &Script,
    app: &mut TerritoryApp<ScriptedDialogs, T, S>,
) -> Result<ReplayReport, ScriptError> {
    let mut report = ReplayReport::default();
    for (index, step) in script.steps.iter().enumerate() {
        log::debug!("Step {}: {:?}", index, step);
        let fail = |message: String| ScriptError::Step { step: index, message };
        match step {
            Step::Start => {
                app.start();
            }
            Step::Click { lat, lon } => {
                app.click_map(GeoPoint::new(*lat, *lon));
            }
            Step::Undo => {
                app.undo();
            }
            Step::Color { color } => app.set_color(*color),
            Step::Label { text, angle, size } => app.set_label_inputs(LabelInputs {
                text: text.clone(),
                angle: *angle,
                font_size: *size,
            }),
            Step::Save { name } => {
                app.dialogs_mut().push_prompt(name.clone());
                app.save();
            }
            Step::Cancel => {
                app.cancel();
            }
            Step::Reset { confirm } => {
                app.dialogs_mut().push_confirm(*confirm);
                app.reset();
            }
            Step::Bearing { degrees } => app.set_bearing(*degrees),
            Step::View { lat, lon, zoom } => app.session_mut().set_view(GeoPoint::new(*lat, *lon), *zoom),
            Step::Drag { shape, from, to } => {
                let id = app
                    .session()
                    .territories()
                    .shapes
                    .get(*shape)
                    .map(|s| s.id)
                    .ok_or_else(|| fail(format!("no shape at index {}", shape)))?;
                app.pointer(PointerEvent::Down { at: *from, target: HitTarget::Shape(id) });
                app.pointer(PointerEvent::Move { at: *to });
                app.pointer(PointerEvent::Up { at: *to });
            }
            Step::EditLabel { label, text } => {
                let id = label_at(app, *label).ok_or_else(|| fail(format!("no label at index {}", label)))?;
                let at = app
                    .session()
                    .territories()
                    .label(id)
                    .map(|l| l.anchor)
                    .unwrap_or(GeoPoint::new(0.0, 0.0));
                app.dialogs_mut().push_prompt(text.clone());
                app.pointer(PointerEvent::Click { at, target: HitTarget::Label(id) });
            }
            Step::RestyleLabel { label, angle, size, color } => {
                let id = label_at(app, *label).ok_or_else(|| fail(format!("no label at index {}", label)))?;
                let style = LabelStyle { angle: *angle, font_size: *size, color: *color };
                app.session_mut()
                    .restyle_label(id, style)
                    .map_err(|e| fail(e.to_string()))?;
            }
            Step::DeleteShape { shape } => {
                let id = app
                    .session()
                    .territories()
                    .shapes
                    .get(*shape)
                    .map(|s| s.id)
                    .ok_or_else(|| fail(format!("no shape at index {}", shape)))?;
                app.session_mut().delete_shape(id).map_err(|e| fail(e.to_string()))?;
            }
            Step::DeleteLabel { label } => {
                let id = label_at(app, *label).ok_or_else(|| fail(format!("no label at index {}", label)))?;
                app.session_mut().delete_label(id).map_err(|e| fail(e.to_string()))?;
            }
            Step::Export { format, preview, confirm } => {
                let delivery = if *preview {
                    app.dialogs_mut().push_confirm(*confirm);
                    app.export_with_preview(*format).await
                } else {
                    app.export(*format).await
                };
                report.deliveries.extend(delivery);
            }
        }
        // Drop answers to dialogs this step never opened
        app.dialogs_mut().clear_pending();
        report.steps += 1;
    }
    report.alerts = app.dialogs().alerts.clone();
    report.territories = app.session().territories().clone();
    Ok(report)
}

fn label_at<T, S>(app: &TerritoryApp<ScriptedDialogs, T, S>, index: usize) -> Option<LabelId>
where
    T: TileProvider,
    S: OutputSink,
{
    app.session().territories().labels.get(index).map(|l| l.id)
}
