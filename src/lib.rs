//! # Territory Marker
//!
//! Mark point, line and polygon "territories" over a web map, label them, and
//! export a framed snapshot of the annotated area as an image or a one-page
//! document.
//!
//! The crate has two halves:
//! - **Drawing session**: a state machine turning map clicks into typed shapes,
//!   with a live dashed preview, optional rotated text labels, dragging and
//!   label editing ([`SessionState`])
//! - **Export pipeline**: fits an off-screen surface to the committed shapes,
//!   loads background tiles with timeouts, rasterizes, and encodes JPEG/PNG or
//!   PDF output ([`Exporter`])
//!
//! [`TerritoryApp`] ties both to a [`Dialogs`] collaborator, and [`script`]
//! replays recorded interactions headlessly.
//!
//! ## Features
//! - Point, line and polygon shapes chosen by vertex count
//! - Per-shape colour and weight captured at commit time
//! - Labels with angle, size and colour, anchored at shape centroids
//! - Rotated map views carried through to the export
//! - Card templates, configurable tiles, preview-before-export

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod geometry;
pub mod script;
pub mod session;
pub mod style;
pub mod types;

// Re-export public types and functions
pub use app::TerritoryApp;
pub use config::{CardTemplate, ExportConfig};
pub use error::{ConfigError, DrawError, ExportError, ScriptError, TileError};
pub use export::{Delivery, ExportFormat, Exporter};
pub use session::{Dialogs, ScriptedDialogs, SessionState};
pub use types::*;

use export::{DirectorySink, HttpTileProvider, OutputSink, SaveDialogSink, TileProvider};
use script::{ReplayReport, Script};
use std::path::PathBuf;

/// Options of a headless replay.
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// Script file
    pub script: PathBuf,
    /// Directory receiving the exports and the final collection
    pub out_dir: PathBuf,
    /// Skip background tiles
    pub offline: bool,
    /// Configuration file overriding the script's own
    pub config: Option<PathBuf>,
    /// URL of a card template to fetch and use
    pub template_url: Option<String>,
    /// Ask where to save each export instead of writing into `out_dir`
    pub save_dialog: bool,
}

/// Replays a script file, writing exports and `territories.json` into the output directory.
///
/// # Example
///
/// ```no_run
/// use territory_marker::{run_replay, ReplayOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), territory_marker::ScriptError> {
///     let report = run_replay(ReplayOptions {
///         script: "walk.json".into(),
///         out_dir: "out".into(),
///         ..Default::default()
///     })
///     .await?;
///     println!("{} exports", report.deliveries.len());
///     Ok(())
/// }
/// ```
pub async fn run_replay(options: ReplayOptions) -> Result<ReplayReport, ScriptError> {
    let script = Script::load(&options.script)?;
    let mut config = match &options.config {
        Some(path) => ExportConfig::load(path)?,
        None => script.config.clone().unwrap_or_default(),
    }
    .with_env_overrides();
    config.validate()?;
    if let Some(url) = &options.template_url {
        config.fetch_template(url)?;
    }

    let tiles = if options.offline {
        None
    } else {
        HttpTileProvider::from_config(&config)
    };
    if tiles.is_none() {
        log::info!("Background tiles disabled");
    }

    let report = if options.save_dialog {
        replay_into(&script, config, tiles, SaveDialogSink).await?
    } else {
        replay_into(&script, config, tiles, DirectorySink::new(&options.out_dir)).await?
    };

    std::fs::create_dir_all(&options.out_dir)?;
    let json = serde_json::to_string_pretty(&report.territories)?;
    std::fs::write(options.out_dir.join("territories.json"), json)?;
    Ok(report)
}

async fn replay_into<T: TileProvider, S: OutputSink>(
    script: &Script,
    config: ExportConfig,
    tiles: T,
    sink: S,
) -> Result<ReplayReport, ScriptError> {
    let mut app = TerritoryApp::new(config, ScriptedDialogs::new(), tiles, sink);
    script::replay(script, &mut app).await
}
