//! Export configuration and card templates.
//!
//! Configuration is plain JSON with every field optional; missing fields take
//! the defaults below. A handful of values can be overridden from the
//! environment for quick experiments.

use crate::constants;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default slippy-map tile source.
pub const DEFAULT_TILE_URL: &str = "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png";

/// Physical output format of an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardTemplate {
    /// Template name, for logs
    pub name: String,
    /// Output width in millimetres
    pub width_mm: f32,
    /// Output height in millimetres
    pub height_mm: f32,
    /// Resolution of the off-screen surface
    pub dpi: f32,
    /// Page margin for the document output, in millimetres
    pub margin_mm: f32,
    /// Title font size in points
    pub title_font_pt: f32,
    /// Whether the document output carries a title
    pub show_title: bool,
}

impl CardTemplate {
    /// A 12 cm × 8 cm card.
    pub fn card_12x8() -> Self {
        Self {
            name: "card-12x8".to_string(),
            width_mm: 120.0,
            height_mm: 80.0,
            dpi: 96.0,
            margin_mm: 7.0,
            title_font_pt: 14.0,
            show_title: true,
        }
    }

    /// An A6 landscape page (148 mm × 105 mm).
    pub fn a6_landscape() -> Self {
        Self {
            name: "a6-landscape".to_string(),
            width_mm: 148.0,
            height_mm: 105.0,
            ..Self::card_12x8()
        }
    }

    /// Surface size in pixels at the template's resolution.
    pub fn pixel_size(&self) -> (u32, u32) {
        let px = |mm: f32| ((mm / 25.4) * self.dpi).round().max(1.0) as u32;
        (px(self.width_mm), px(self.height_mm))
    }
}

impl Default for CardTemplate {
    fn default() -> Self {
        Self::card_12x8()
    }
}

/// Encoding of the image output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossy, flattened onto white
    #[default]
    Jpeg,
    /// Lossless, flattened onto white
    Png,
}

impl ImageFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }

    /// MIME type.
    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

/// What happens to a shape's label when the shape is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelCascade {
    /// Delete the label with its shape
    #[default]
    Cascade,
    /// Keep the label as a standalone annotation
    Orphan,
}

/// Everything the session and the export renderer can be tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Physical output format
    pub template: CardTemplate,
    /// Padding around fitted geometry, in surface pixels
    pub padding_px: f32,
    /// Lowest zoom the export fits to
    pub min_zoom: u8,
    /// Highest zoom the export fits to
    pub max_zoom: u8,
    /// Oversampling for the confirmation preview
    pub preview_scale: f32,
    /// Oversampling for the final export
    pub export_scale: f32,
    /// Per-tile load timeout in milliseconds
    pub tile_timeout_ms: u64,
    /// Delay after repositioning before capture, in milliseconds
    pub settle_delay_ms: u64,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Image output encoding
    pub image_format: ImageFormat,
    /// Fixed canvas the image output is letterboxed onto; `None` keeps the raster size
    pub image_canvas_px: Option<[u32; 2]>,
    /// Output filename stem
    pub file_stem: String,
    /// Title used when no shape is named
    pub default_title: String,
    /// Tile URL template with `{s}`, `{z}`, `{x}`, `{y}` and `{r}` placeholders
    pub tile_url: Option<String>,
    /// Values substituted for `{s}`
    pub tile_subdomains: Vec<String>,
    /// Label handling on shape deletion
    pub label_cascade: LabelCascade,
    /// Whether clearing a label's text deletes it
    pub delete_label_on_empty_text: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            template: CardTemplate::default(),
            padding_px: constants::FIT_PADDING_PX,
            min_zoom: constants::EXPORT_MIN_ZOOM,
            max_zoom: constants::EXPORT_MAX_ZOOM,
            preview_scale: constants::PREVIEW_SCALE,
            export_scale: constants::EXPORT_SCALE,
            tile_timeout_ms: constants::TILE_TIMEOUT_MS,
            settle_delay_ms: constants::SETTLE_DELAY_MS,
            jpeg_quality: constants::JPEG_QUALITY,
            image_format: ImageFormat::default(),
            image_canvas_px: None,
            file_stem: constants::FILE_STEM.to_string(),
            default_title: constants::DEFAULT_TITLE.to_string(),
            tile_url: Some(DEFAULT_TILE_URL.to_string()),
            tile_subdomains: ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect(),
            label_cascade: LabelCascade::default(),
            delete_label_on_empty_text: false,
        }
    }
}

impl ExportConfig {
    /// Parses a JSON configuration and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ExportConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Fetches a card template as JSON and installs it.
    pub fn fetch_template(&mut self, url: &str) -> Result<(), ConfigError> {
        let body = ureq::get(url)
            .timeout(Duration::from_secs(10))
            .call()
            .map_err(|e| ConfigError::Fetch(e.to_string()))?
            .into_string()?;
        let template: CardTemplate = serde_json::from_str(&body)?;
        log::info!("Fetched card template '{}' from {}", template.name, url);
        self.template = template;
        self.validate()
    }

    /// Applies `TERRITORY_TILE_URL`, `TERRITORY_MAX_ZOOM` and `TERRITORY_EXPORT_SCALE`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("TERRITORY_TILE_URL") {
            self.tile_url = if url.trim().is_empty() { None } else { Some(url) };
        }
        if let Some(zoom) = std::env::var("TERRITORY_MAX_ZOOM").ok().and_then(|v| v.parse::<u8>().ok()) {
            self.max_zoom = zoom.min(constants::MAX_TILE_ZOOM);
        }
        if let Some(scale) = std::env::var("TERRITORY_EXPORT_SCALE").ok().and_then(|v| v.parse().ok()) {
            self.export_scale = scale;
        }
        self
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.template;
        if !(t.width_mm > 0.0 && t.height_mm > 0.0 && t.dpi > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "template '{}' must have a positive size and dpi",
                t.name
            )));
        }
        if 2.0 * t.margin_mm >= t.width_mm.min(t.height_mm) {
            return Err(ConfigError::Invalid("page margin leaves no room for the map".into()));
        }
        if self.max_zoom > constants::MAX_TILE_ZOOM {
            return Err(ConfigError::Invalid(format!(
                "max_zoom must not exceed {}",
                constants::MAX_TILE_ZOOM
            )));
        }
        if self.min_zoom > self.max_zoom {
            return Err(ConfigError::Invalid("min_zoom exceeds max_zoom".into()));
        }
        if !(self.preview_scale > 0.0 && self.export_scale > 0.0) {
            return Err(ConfigError::Invalid("scale factors must be positive".into()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Invalid("jpeg_quality must be within 1..=100".into()));
        }
        if matches!(self.image_canvas_px, Some([w, h]) if w == 0 || h == 0) {
            return Err(ConfigError::Invalid("image canvas must be non-empty".into()));
        }
        Ok(())
    }

    /// Per-tile timeout.
    pub fn tile_timeout(&self) -> Duration {
        Duration::from_millis(self.tile_timeout_ms)
    }

    /// Settle delay after repositioning.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
