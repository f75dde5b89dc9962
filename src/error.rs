//! Error types for drawing, export, tiles, configuration and scripts.

use crate::types::{LabelId, ShapeId};
use thiserror::Error;

/// Rejected drawing-session operations. The session is left unchanged.
#[derive(Debug, Error, PartialEq)]
pub enum DrawError {
    /// Commit requested with no vertices and no label text
    #[error("mark at least one point before saving")]
    EmptyDraft,
    /// Operation requires an active drawing
    #[error("drawing mode is not active")]
    NotDrawing,
    /// Start requested while already drawing
    #[error("a territory is already being drawn")]
    AlreadyDrawing,
    /// The shape does not exist
    #[error("unknown shape {0}")]
    UnknownShape(ShapeId),
    /// The label does not exist
    #[error("unknown label {0}")]
    UnknownLabel(LabelId),
}

/// Export failures surfaced to the user.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The collection is empty
    #[error("there are no marked territories to export")]
    NothingToExport,
    /// The off-screen surface could not be built or rasterized
    #[error("failed to capture the map: {0}")]
    Rendering(String),
    /// The bitmap could not be encoded into the requested format
    #[error("failed to encode the export: {0}")]
    Encoding(String),
    /// The output could not be delivered
    #[error("failed to save the export: {0}")]
    Output(String),
    /// Underlying I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Background tile failures. Never fatal to an export.
#[derive(Debug, Error)]
pub enum TileError {
    /// Network request failed
    #[error("tile request failed: {0}")]
    Http(String),
    /// The tile did not arrive in time
    #[error("tile load timed out")]
    Timeout,
    /// The tile bytes are not a decodable image
    #[error("tile could not be decoded: {0}")]
    Decode(String),
    /// No tile source is configured
    #[error("tiles are disabled")]
    Offline,
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// JSON was malformed
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// Remote template could not be fetched
    #[error("failed to fetch template: {0}")]
    Fetch(String),
    /// A value is out of range
    #[error("invalid configuration value: {0}")]
    Invalid(String),
}

/// Script replay failures.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Script file could not be read
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Script JSON was malformed
    #[error("invalid script: {0}")]
    Parse(#[from] serde_json::Error),
    /// The configuration named by the script or the caller is unusable
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A step referenced something that does not exist
    #[error("step {step}: {message}")]
    Step {
        /// Zero-based step index
        step: usize,
        /// What went wrong
        message: String,
    },
}
