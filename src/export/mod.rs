//! Export of the committed territories as an image or a one-page document.
//!
//! An export runs in stages:
//!
//! 1. [`SessionState::begin_export`](crate::session::SessionState::begin_export)
//!    admits the request, takes the [`ExportLock`] and snapshots the collection
//! 2. a [`RenderSurface`] is fitted to the snapshot and the overlay is built
//! 3. after the settle delay, background tiles load through a [`TileProvider`]
//!    with a per-tile timeout
//! 4. the surface is rasterized, then encoded as an image or a document
//! 5. the [`ExportArtifact`] is handed to an [`OutputSink`]
//!
//! The lock is released and the surface discarded on every path, including
//! failures, because both are owned by values dropped at the end of the run.

mod document;
mod encode;
mod job;
mod sink;
mod surface;
mod tiles;

pub use document::{encode_document, PageLayout};
pub use encode::encode_image;
pub use job::{ExportGuard, ExportJob, ExportLock};
pub use sink::{Delivery, DirectorySink, MemorySink, OutputSink, SaveDialogSink};
pub use surface::{RasterImage, RenderSurface};
pub use tiles::{decode_tile, load_tiles, HttpTileProvider, LoadedTile, TileId, TileLoad, TileProvider};

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::session::Dialogs;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Requested output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Raster image (JPEG or PNG per configuration)
    Image,
    /// Single-page PDF with a title
    Document,
}

/// An encoded export ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Suggested file name
    pub file_name: String,
    /// MIME type
    pub mime: &'static str,
    /// Encoded bytes
    pub bytes: Vec<u8>,
}

/// Renders, encodes and delivers admitted export jobs.
pub struct Exporter<T, S> {
    config: ExportConfig,
    tiles: T,
    sink: S,
    fontdb: Arc<fontdb::Database>,
}

impl<T: TileProvider, S: OutputSink> Exporter<T, S> {
    /// Creates an exporter using the system fonts.
    pub fn new(config: ExportConfig, tiles: T, sink: S) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        log::debug!("Loaded {} font faces", db.len());
        Self::with_fontdb(config, tiles, sink, Arc::new(db))
    }

    /// Creates an exporter with a specific font database.
    pub fn with_fontdb(config: ExportConfig, tiles: T, sink: S, fontdb: Arc<fontdb::Database>) -> Self {
        Self { config, tiles, sink, fontdb }
    }

    /// The configuration in use.
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// The output sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Renders the job's snapshot at `scale`.
    ///
    /// The surface is fitted to the snapshot, given the settle delay, backed with
    /// whatever tiles arrive in time, and rasterized.
    pub async fn render(&self, job: &ExportJob, scale: f32) -> Result<RasterImage, ExportError> {
        let surface = RenderSurface::fit(&job.snapshot, job.bearing, &self.config)?;

        let settle = self.config.settle_delay();
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        let coverage = surface.tile_coverage();
        let requested = coverage.len();
        let load = load_tiles(&self.tiles, coverage, self.config.tile_timeout()).await;
        if load.failed > 0 {
            log::info!("{} of {} tiles missing from the background", load.failed, requested);
        }

        let raster = surface.rasterize(&load.tiles, scale, &self.fontdb)?;
        log::debug!("Rasterized {}x{} at scale {}", raster.width(), raster.height(), scale);
        Ok(raster)
    }

    /// Encodes a raster in the job's format.
    ///
    /// Documents are titled with the most recently committed shape name, or the
    /// configured default title.
    pub fn encode(&self, job: &ExportJob, raster: &RasterImage) -> Result<ExportArtifact, ExportError> {
        let stem = &self.config.file_stem;
        match job.format {
            ExportFormat::Image => {
                let format = self.config.image_format;
                let bytes = encode_image(raster, format, self.config.jpeg_quality, self.config.image_canvas_px)?;
                Ok(ExportArtifact {
                    file_name: format!("{}.{}", stem, format.extension()),
                    mime: format.mime(),
                    bytes,
                })
            }
            ExportFormat::Document => {
                let title = job.snapshot.latest_name().unwrap_or(self.config.default_title.as_str());
                let bytes = encode_document(raster, &self.config.template, title, self.config.jpeg_quality)?;
                Ok(ExportArtifact {
                    file_name: format!("{}.pdf", stem),
                    mime: "application/pdf",
                    bytes,
                })
            }
        }
    }

    /// Runs an admitted job to completion at the export scale.
    ///
    /// The job's lock is released when this returns, whatever the outcome.
    pub async fn run(&self, job: ExportJob) -> Result<Delivery, ExportError> {
        log::info!("Exporting {:?} ({} records)", job.format, job.snapshot.len());
        let raster = self.render(&job, self.config.export_scale).await?;
        let artifact = self.encode(&job, &raster)?;
        let delivery = self.sink.deliver(&artifact).await?;
        log::info!("Export finished: {:?}", delivery);
        Ok(delivery)
    }

    /// Renders a preview, asks for confirmation, then runs the job.
    ///
    /// # Returns
    ///
    /// `Ok(None)` if the preview was declined.
    pub async fn run_with_preview(
        &self,
        job: ExportJob,
        dialogs: &mut impl Dialogs,
    ) -> Result<Option<Delivery>, ExportError> {
        let preview = self.render(&job, self.config.preview_scale).await?;
        if !dialogs.confirm_preview(&preview) {
            log::info!("Export preview declined");
            return Ok(None);
        }
        self.run(job).await.map(Some)
    }
}
