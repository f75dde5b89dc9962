//! The off-screen render surface.
//!
//! A surface is a fixed-size viewport fitted to the snapshot's geometry. The
//! committed records are re-instantiated on it as an SVG overlay in their final
//! presentation style; background tiles are composited underneath with
//! tiny-skia, and the overlay is rendered on top with resvg.

use super::tiles::{LoadedTile, TileId};
use crate::config::ExportConfig;
use crate::constants::{self, TILE_SIZE};
use crate::error::ExportError;
use crate::geometry::{self, GeoBounds, WorldPoint};
use crate::style::PathStyle;
use crate::types::*;
use image::{Rgba, RgbaImage};
use std::fmt::Write as _;
use std::sync::Arc;
use tiny_skia::{FilterQuality, Pixmap, PixmapPaint, Transform};

/// Font size of the shape name tooltips.
const TOOLTIP_FONT_SIZE: f32 = 12.0;

/// A rasterized surface.
#[derive(Clone)]
pub struct RasterImage {
    pixmap: Pixmap,
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl RasterImage {
    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Straight-alpha RGBA copy.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut img = RgbaImage::new(self.width(), self.height());
        for (dst, px) in img.pixels_mut().zip(self.pixmap.pixels()) {
            let c = px.demultiply();
            *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        img
    }

    /// PNG encoding of the raster.
    pub fn encode_png(&self) -> Result<Vec<u8>, ExportError> {
        self.pixmap
            .encode_png()
            .map_err(|e| ExportError::Encoding(e.to_string()))
    }
}

/// A fitted, rotated viewport holding the overlay for one export.
#[derive(Debug)]
pub struct RenderSurface {
    width: f32,
    height: f32,
    zoom: u8,
    center: WorldPoint,
    bearing: f64,
    overlay: String,
}

impl RenderSurface {
    /// Builds a surface for `snapshot`.
    ///
    /// The view is fitted to the bounds of all shapes (or of the labels when
    /// there are no shapes) with the configured padding, capped at the configured
    /// maximum zoom, then rotated by `bearing`.
    ///
    /// # Errors
    ///
    /// [`ExportError::Rendering`] if the snapshot has no geometry.
    pub fn fit(snapshot: &Territories, bearing: f64, config: &ExportConfig) -> Result<Self, ExportError> {
        let (w, h) = config.template.pixel_size();
        let (width, height) = (w as f32, h as f32);

        let shape_points = snapshot.shapes.iter().flat_map(|s| s.geometry.vertices());
        let bounds = GeoBounds::from_points(shape_points)
            .or_else(|| GeoBounds::from_points(snapshot.labels.iter().map(|l| l.anchor)))
            .ok_or_else(|| ExportError::Rendering("no geometry to frame".into()))?;

        let max_zoom = config.max_zoom.min(constants::MAX_TILE_ZOOM);
        let zoom = geometry::fit_zoom(
            &bounds,
            width,
            height,
            config.padding_px,
            config.min_zoom.min(max_zoom),
            max_zoom,
        );
        let center = geometry::project(bounds.center(), f64::from(zoom));
        log::debug!(
            "Surface {}x{} fitted at zoom {} around ({:.6}, {:.6})",
            w,
            h,
            zoom,
            bounds.center().lat,
            bounds.center().lon
        );

        let mut surface = Self {
            width,
            height,
            zoom,
            center,
            bearing,
            overlay: String::new(),
        };
        surface.overlay = surface.build_overlay(snapshot);
        Ok(surface)
    }

    /// Surface size in logical pixels.
    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// Fitted zoom level.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// The SVG overlay.
    pub fn overlay(&self) -> &str {
        &self.overlay
    }

    /// Surface coordinates of a geographic point, before rotation.
    pub fn to_surface(&self, p: GeoPoint) -> (f32, f32) {
        let w = geometry::project(p, f64::from(self.zoom));
        (
            (w.x - self.center.x) as f32 + self.width / 2.0,
            (w.y - self.center.y) as f32 + self.height / 2.0,
        )
    }

    /// Tiles covering the surface, with the surface offset of each tile's corner.
    ///
    /// With a bearing the covered area grows to the surface's circumscribed square.
    pub fn tile_coverage(&self) -> Vec<(TileId, (f32, f32))> {
        let (half_w, half_h) = if self.bearing.rem_euclid(360.0) == 0.0 {
            (f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
        } else {
            let r = f64::from(self.width).hypot(f64::from(self.height)) / 2.0;
            (r, r)
        };
        let n = 1i64 << self.zoom;
        let x0 = ((self.center.x - half_w) / TILE_SIZE).floor() as i64;
        let x1 = ((self.center.x + half_w) / TILE_SIZE).floor() as i64;
        let y0 = (((self.center.y - half_h) / TILE_SIZE).floor() as i64).max(0);
        let y1 = (((self.center.y + half_h) / TILE_SIZE).floor() as i64).min(n - 1);

        let mut tiles = Vec::new();
        for ty in y0..=y1 {
            for tx in x0..=x1 {
                let id = TileId {
                    z: self.zoom,
                    x: tx.rem_euclid(n) as u32,
                    y: ty as u32,
                };
                let offset = (
                    (tx as f64 * TILE_SIZE - self.center.x) as f32 + self.width / 2.0,
                    (ty as f64 * TILE_SIZE - self.center.y) as f32 + self.height / 2.0,
                );
                tiles.push((id, offset));
            }
        }
        tiles
    }

    /// Rasterizes tiles and overlay at `scale` onto a white background.
    ///
    /// # Errors
    ///
    /// [`ExportError::Rendering`] if the pixmap cannot be allocated or the
    /// overlay cannot be parsed.
    pub fn rasterize(
        &self,
        tiles: &[LoadedTile],
        scale: f32,
        fontdb: &Arc<fontdb::Database>,
    ) -> Result<RasterImage, ExportError> {
        let out_w = (self.width * scale).round().max(1.0) as u32;
        let out_h = (self.height * scale).round().max(1.0) as u32;
        let mut pixmap = Pixmap::new(out_w, out_h)
            .ok_or_else(|| ExportError::Rendering(format!("failed to create pixmap {}x{}", out_w, out_h)))?;
        let [r, g, b, a] = Color::WHITE.to_rgba_u8();
        pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, a));

        // Background tiles, rotated about the surface centre
        let view = Transform::from_scale(scale, scale).pre_concat(Transform::from_rotate_at(
            self.bearing as f32,
            self.width / 2.0,
            self.height / 2.0,
        ));
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        for tile in tiles {
            let (x, y) = tile.offset;
            pixmap.draw_pixmap(0, 0, tile.pixmap.as_ref(), &paint, view.pre_translate(x, y), None);
        }

        // Overlay
        let mut opt = usvg::Options::default();
        opt.fontdb = fontdb.clone();
        let tree = usvg::Tree::from_data(self.overlay.as_bytes(), &opt)
            .map_err(|e| ExportError::Rendering(format!("failed to parse overlay: {}", e)))?;
        let mut pmut = pixmap.as_mut();
        resvg::render(&tree, Transform::from_scale(scale, scale), &mut pmut);

        if pixmap.data().is_empty() {
            return Err(ExportError::Rendering("rasterization produced no data".into()));
        }
        Ok(RasterImage { pixmap })
    }

    /// Builds the SVG overlay: shapes, then name tooltips, then labels, all in
    /// final presentation style and rotated by the bearing.
    fn build_overlay(&self, snapshot: &Territories) -> String {
        let (w, h) = (self.width, self.height);
        let mut out = String::new();

        let _ = writeln!(
            out,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">"
        );
        let _ = writeln!(
            out,
            "<g transform=\"rotate({:.3} {:.1} {:.1})\">",
            self.bearing,
            w / 2.0,
            h / 2.0
        );

        for shape in &snapshot.shapes {
            let style = PathStyle::for_record(shape);
            let paint = paint_attrs(&style);
            match &shape.geometry {
                Geometry::Point(p) => {
                    let (x, y) = self.to_surface(*p);
                    let _ = writeln!(
                        out,
                        "  <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"{:.1}\" {} />",
                        x, y, style.radius, paint
                    );
                }
                Geometry::Line(a, b) => {
                    let (ax, ay) = self.to_surface(*a);
                    let (bx, by) = self.to_surface(*b);
                    let _ = writeln!(
                        out,
                        "  <path d=\"M{:.1},{:.1} L{:.1},{:.1}\" {} />",
                        ax, ay, bx, by, paint
                    );
                }
                Geometry::Polygon(ring) => {
                    let mut d = String::new();
                    for (i, p) in ring.iter().enumerate() {
                        let (x, y) = self.to_surface(*p);
                        let cmd = if i == 0 { "M" } else { " L" };
                        let _ = write!(d, "{}{:.1},{:.1}", cmd, x, y);
                    }
                    d.push_str(" Z");
                    let _ = writeln!(out, "  <path d=\"{}\" {} />", d, paint);
                }
            }
        }

        for shape in snapshot.shapes.iter().filter(|s| !s.name.trim().is_empty()) {
            let (x, y) = self.to_surface(geometry::centroid(&shape.geometry));
            let _ = writeln!(
                out,
                "  <text x=\"{:.1}\" y=\"{:.1}\" font-family=\"sans-serif\" font-size=\"{}\" font-weight=\"bold\" fill=\"#222222\" stroke=\"#ffffff\" stroke-width=\"3\" stroke-linejoin=\"round\" paint-order=\"stroke\" text-anchor=\"middle\" dominant-baseline=\"central\">{}</text>",
                x,
                y,
                TOOLTIP_FONT_SIZE,
                escape_xml(&shape.name)
            );
        }

        for label in &snapshot.labels {
            let (x, y) = self.to_surface(label.anchor);
            let _ = writeln!(
                out,
                "  <text x=\"{x:.1}\" y=\"{y:.1}\" transform=\"rotate({a:.2} {x:.1} {y:.1})\" font-family=\"sans-serif\" font-size=\"{s:.1}\" fill=\"{c}\" text-anchor=\"middle\" dominant-baseline=\"central\">{t}</text>",
                x = x,
                y = y,
                a = label.style.angle,
                s = label.style.font_size,
                c = label.style.color,
                t = escape_xml(&label.text)
            );
        }

        let _ = writeln!(out, "</g>");
        let _ = writeln!(out, "</svg>");
        out
    }
}

impl Drop for RenderSurface {
    fn drop(&mut self) {
        log::debug!("Render surface released");
    }
}

fn paint_attrs(style: &PathStyle) -> String {
    let mut attrs = format!(
        "stroke=\"{}\" stroke-width=\"{:.1}\" stroke-linejoin=\"round\" stroke-linecap=\"round\"",
        style.stroke, style.weight
    );
    if style.fill_opacity > 0.0 {
        let _ = write!(attrs, " fill=\"{}\" fill-opacity=\"{:.2}\"", style.fill, style.fill_opacity);
    } else {
        attrs.push_str(" fill=\"none\"");
    }
    if let Some([on, off]) = style.dash {
        let _ = write!(attrs, " stroke-dasharray=\"{on} {off}\"");
    }
    attrs
}

fn escape_xml(input: &str) -> String {
    let mut s = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => s.push_str("&amp;"),
            '<' => s.push_str("&lt;"),
            '>' => s.push_str("&gt;"),
            '"' => s.push_str("&quot;"),
            '\'' => s.push_str("&apos;"),
            _ => s.push(ch),
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_snapshot() -> Territories {
        let mut t = Territories::new();
        let ring = vec![
            GeoPoint::new(41.3851, 2.1701),
            GeoPoint::new(41.3870, 2.1730),
            GeoPoint::new(41.3840, 2.1740),
        ];
        let shape = ShapeRecord::new(Geometry::Polygon(ring), Color::rgb(255, 0, 0), 2.0, "Lot <A>".into());
        t.add_shape(shape);
        t
    }

    #[test]
    fn test_fit_centres_geometry_inside_padding() {
        let config = ExportConfig::default();
        let snapshot = triangle_snapshot();
        let surface = RenderSurface::fit(&snapshot, 0.0, &config).unwrap();
        let (w, h) = surface.size();
        for p in snapshot.shapes[0].geometry.vertices() {
            let (x, y) = surface.to_surface(p);
            assert!(x >= config.padding_px - 1.0 && x <= w - config.padding_px + 1.0, "x {x}");
            assert!(y >= config.padding_px - 1.0 && y <= h - config.padding_px + 1.0, "y {y}");
        }
        assert!(surface.zoom() <= config.max_zoom);
    }

    #[test]
    fn test_overlay_escapes_names_and_uses_final_style() {
        let surface = RenderSurface::fit(&triangle_snapshot(), 0.0, &ExportConfig::default()).unwrap();
        let svg = surface.overlay();
        assert!(svg.contains("Lot &lt;A&gt;"));
        assert!(svg.contains("fill-opacity=\"0.20\""));
        assert!(!svg.contains("stroke-dasharray"));
    }

    #[test]
    fn test_zoom_capped_at_tile_range() {
        let config = ExportConfig { max_zoom: 64, ..ExportConfig::default() };
        let mut t = Territories::new();
        t.add_shape(ShapeRecord::new(
            Geometry::Point(GeoPoint::new(41.0, 2.0)),
            Color::rgb(0, 0, 255),
            2.0,
            "Well".into(),
        ));
        let surface = RenderSurface::fit(&t, 0.0, &config).unwrap();
        assert_eq!(surface.zoom(), constants::MAX_TILE_ZOOM);
        assert!(!surface.tile_coverage().is_empty());
    }

    #[test]
    fn test_label_only_snapshot_fits_on_labels() {
        let mut t = Territories::new();
        let style = LabelStyle { angle: 30.0, font_size: 18.0, color: Color::rgb(0, 0, 0) };
        t.add_label(LabelRecord::new("Note".into(), GeoPoint::new(41.0, 2.0), style));
        let surface = RenderSurface::fit(&t, 0.0, &ExportConfig::default()).unwrap();
        assert_eq!(surface.zoom(), ExportConfig::default().max_zoom);
        assert!(surface.overlay().contains("rotate(30.00"));
    }

    #[test]
    fn test_coverage_grows_with_bearing() {
        let config = ExportConfig::default();
        let snapshot = triangle_snapshot();
        let flat = RenderSurface::fit(&snapshot, 0.0, &config).unwrap().tile_coverage().len();
        let rotated = RenderSurface::fit(&snapshot, 45.0, &config).unwrap().tile_coverage().len();
        assert!(flat > 0);
        assert!(rotated >= flat);
    }

    #[test]
    fn test_rasterize_without_tiles_uses_scale() {
        let surface = RenderSurface::fit(&triangle_snapshot(), 0.0, &ExportConfig::default()).unwrap();
        let fontdb = Arc::new(fontdb::Database::new());
        let raster = surface.rasterize(&[], 2.0, &fontdb).unwrap();
        assert_eq!((raster.width(), raster.height()), (908, 604));
        // Corner stays white background
        assert_eq!(raster.to_rgba_image().get_pixel(0, 0).0, [255, 255, 255, 255]);
    }
}
