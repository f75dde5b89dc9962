//! The tool-controls facade.
//!
//! [`TerritoryApp`] wires a [`SessionState`] to a [`Dialogs`] collaborator and an
//! [`Exporter`]. Every button of the tool maps to one method here; user-facing
//! failures are reported through the dialogs and never propagate further.

use crate::config::ExportConfig;
use crate::error::{DrawError, ExportError};
use crate::export::{Delivery, ExportFormat, ExportJob, Exporter, OutputSink, TileProvider};
use crate::session::{
    CommitOutcome, ControlStates, Dialogs, HitTarget, LabelInputs, PointerEvent, PointerOutcome, SessionState,
};
use crate::types::{Color, GeoPoint};

/// Message shown when drawing starts.
pub const START_HINT: &str = "Tap the map to mark points. Save when you are done.";

/// Message shown after a successful commit.
pub const SAVED_MESSAGE: &str = "Territory saved. You can drag it or edit its label.";

/// The drawing tool: session, dialogs and exporter.
pub struct TerritoryApp<D, T, S> {
    session: SessionState,
    dialogs: D,
    exporter: Exporter<T, S>,
}

impl<D: Dialogs, T: TileProvider, S: OutputSink> TerritoryApp<D, T, S> {
    /// Creates an app with a fresh session configured from `config`.
    pub fn new(config: ExportConfig, dialogs: D, tiles: T, sink: S) -> Self {
        let session = SessionState::with_config(&config);
        Self::with_exporter(session, dialogs, Exporter::new(config, tiles, sink))
    }

    /// Creates an app from existing parts.
    pub fn with_exporter(session: SessionState, dialogs: D, exporter: Exporter<T, S>) -> Self {
        Self { session, dialogs, exporter }
    }

    /// The session.
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// The session, mutably.
    pub fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    /// The dialogs collaborator.
    pub fn dialogs(&self) -> &D {
        &self.dialogs
    }

    /// The dialogs collaborator, mutably.
    pub fn dialogs_mut(&mut self) -> &mut D {
        &mut self.dialogs
    }

    /// The exporter.
    pub fn exporter(&self) -> &Exporter<T, S> {
        &self.exporter
    }

    /// Which controls are enabled.
    pub fn controls(&self) -> ControlStates {
        self.session.controls()
    }

    /// "Start drawing". Ignored while already drawing.
    pub fn start(&mut self) -> bool {
        match self.session.start_drawing() {
            Ok(()) => {
                self.dialogs.alert(START_HINT);
                true
            }
            Err(e) => {
                log::debug!("Start ignored: {}", e);
                false
            }
        }
    }

    /// A click on the map.
    pub fn click_map(&mut self, at: GeoPoint) -> PointerOutcome {
        self.pointer(PointerEvent::Click { at, target: HitTarget::Map })
    }

    /// Routes any pointer event.
    pub fn pointer(&mut self, event: PointerEvent) -> PointerOutcome {
        self.session.handle_pointer(event, &mut self.dialogs)
    }

    /// "Undo last point". Returns the remaining vertex count.
    pub fn undo(&mut self) -> Option<usize> {
        self.session.undo_vertex().ok()
    }

    /// "Save". An empty draft is reported to the user.
    pub fn save(&mut self) -> Option<CommitOutcome> {
        match self.session.save_shape(&mut self.dialogs) {
            Ok(outcome) => {
                self.dialogs.alert(SAVED_MESSAGE);
                Some(outcome)
            }
            Err(DrawError::NotDrawing) => None,
            Err(e) => {
                self.dialogs.alert(&capitalize(&e.to_string()));
                None
            }
        }
    }

    /// "Cancel".
    pub fn cancel(&mut self) -> bool {
        self.session.cancel_drawing()
    }

    /// "Reset", after confirmation.
    pub fn reset(&mut self) -> bool {
        self.session.reset_all(&mut self.dialogs)
    }

    /// Colour picker.
    pub fn set_color(&mut self, color: Color) {
        self.session.set_color(color);
    }

    /// Label text, angle and size inputs.
    pub fn set_label_inputs(&mut self, inputs: LabelInputs) {
        self.session.label_inputs = inputs;
    }

    /// View rotation.
    pub fn set_bearing(&mut self, degrees: f64) {
        self.session.set_bearing(degrees);
    }

    /// "Export image" / "Export PDF" without a preview.
    ///
    /// # Returns
    ///
    /// The delivery, or `None` if the export was refused, ignored or failed.
    pub async fn export(&mut self, format: ExportFormat) -> Option<Delivery> {
        let job = self.admit(format)?;
        match self.exporter.run(job).await {
            Ok(delivery) => Some(delivery),
            Err(e) => {
                self.report_export_error(&e);
                None
            }
        }
    }

    /// Export with a confirmation preview.
    pub async fn export_with_preview(&mut self, format: ExportFormat) -> Option<Delivery> {
        let job = self.admit(format)?;
        match self.exporter.run_with_preview(job, &mut self.dialogs).await {
            Ok(delivery) => delivery,
            Err(e) => {
                self.report_export_error(&e);
                None
            }
        }
    }

    fn admit(&mut self, format: ExportFormat) -> Option<ExportJob> {
        match self.session.begin_export(format) {
            Ok(job) => job,
            Err(e) => {
                self.report_export_error(&e);
                None
            }
        }
    }

    fn report_export_error(&mut self, error: &ExportError) {
        match error {
            ExportError::NothingToExport => {
                log::info!("Export refused: {}", error);
                self.dialogs.alert(&capitalize(&error.to_string()));
            }
            _ => {
                log::error!("Export failed: {}", error);
                self.dialogs.alert(&format!("Export failed: {}", error));
            }
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
