//! Shared application-wide constants.
//! Centralizes tweakable values used across drawing, styling and export.

// Draft (in-progress) styling
/// Stroke width of the dashed preview outline.
pub const DRAFT_STROKE_WEIGHT: f32 = 3.0;
/// Fill opacity of a preview polygon.
pub const DRAFT_FILL_OPACITY: f32 = 0.1;
/// Dash pattern (on, off) of the preview outline, in screen pixels.
pub const DRAFT_DASH: [f32; 2] = [5.0, 5.0];

// Committed styling
/// Stroke width persisted on committed lines and polygons.
pub const FINAL_STROKE_WEIGHT: f32 = 2.0;
/// Fill opacity of committed polygons.
pub const FINAL_FILL_OPACITY: f32 = 0.2;

// Point markers
/// Radius of a point marker in screen pixels.
pub const POINT_RADIUS: f32 = 6.0;
/// Fill opacity of point markers, draft and committed alike.
pub const POINT_FILL_OPACITY: f32 = 0.5;

// Label inputs
/// Font size the label input resets to.
pub const DEFAULT_LABEL_SIZE: f32 = 14.0;
/// Rotation the label input resets to.
pub const DEFAULT_LABEL_ANGLE: f32 = 0.0;

// Default view
/// Default map centre latitude (Barcelona).
pub const DEFAULT_CENTER_LAT: f64 = 41.3851;
/// Default map centre longitude (Barcelona).
pub const DEFAULT_CENTER_LON: f64 = 2.1701;
/// Default map zoom.
pub const DEFAULT_ZOOM: f64 = 15.0;
/// Default tool colour.
pub const DEFAULT_COLOR: &str = "#3388ff";

// Map projection
/// Edge length of a square map tile in pixels.
pub const TILE_SIZE: f64 = 256.0;
/// Web-Mercator latitude limit.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

// Export framing
/// Padding around the fitted geometry, in surface pixels.
pub const FIT_PADDING_PX: f32 = 40.0;
/// Highest zoom an export will fit to, so the map stays legible.
pub const EXPORT_MAX_ZOOM: u8 = 17;
/// Lowest zoom an export will fit to.
pub const EXPORT_MIN_ZOOM: u8 = 1;
/// Deepest zoom any tile source serves.
pub const MAX_TILE_ZOOM: u8 = 22;
/// Delay after repositioning before capture.
pub const SETTLE_DELAY_MS: u64 = 300;
/// Per-tile load timeout.
pub const TILE_TIMEOUT_MS: u64 = 15_000;
/// JPEG quality used for image and document output.
pub const JPEG_QUALITY: u8 = 92;
/// Oversampling used for the confirmation preview.
pub const PREVIEW_SCALE: f32 = 1.0;
/// Oversampling used for the final export.
pub const EXPORT_SCALE: f32 = 2.0;

// Document layout
/// Distance of the title baseline from the top of the page, in mm.
pub const TITLE_OFFSET_MM: f32 = 10.0;
/// Gap between the title baseline and the image box, in mm.
pub const TITLE_GAP_MM: f32 = 7.0;

/// Output filename stem.
pub const FILE_STEM: &str = "territorio_exportado";
/// Title used when no shape carries a name.
pub const DEFAULT_TITLE: &str = "Territory";
