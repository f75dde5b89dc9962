//! Geometry helpers shared by the drawing session and the export renderer.
//!
//! Covers shape centres, geographic bounds, the Web-Mercator projection used by
//! slippy-map tiles, zoom-to-fit, and the aspect-preserving letterbox placement
//! used when an image is framed inside a box.

use crate::constants::{MAX_LATITUDE, TILE_SIZE};
use crate::types::{GeoPoint, Geometry};
use std::f64::consts::PI;

/// Centre of a shape: the point itself, a line's midpoint, or a polygon's area centroid.
///
/// Degenerate polygons (zero area) fall back to the mean of their vertices.
pub fn centroid(geometry: &Geometry) -> GeoPoint {
    match geometry {
        Geometry::Point(p) => *p,
        Geometry::Line(a, b) => GeoPoint::new((a.lat + b.lat) / 2.0, (a.lon + b.lon) / 2.0),
        Geometry::Polygon(ring) => polygon_centroid(ring),
    }
}

fn polygon_centroid(ring: &[GeoPoint]) -> GeoPoint {
    // Shoelace over (lon, lat) relative to the first vertex to keep the terms small
    let Some(&origin) = ring.first() else {
        return GeoPoint::new(0.0, 0.0);
    };
    let mut area2 = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for (i, a) in ring.iter().enumerate() {
        let b = ring[(i + 1) % ring.len()];
        let (ax, ay) = (a.lon - origin.lon, a.lat - origin.lat);
        let (bx, by) = (b.lon - origin.lon, b.lat - origin.lat);
        let cross = ax * by - bx * ay;
        area2 += cross;
        cx += (ax + bx) * cross;
        cy += (ay + by) * cross;
    }
    if area2.abs() < 1e-15 {
        return vertex_mean(ring);
    }
    GeoPoint::new(origin.lat + cy / (3.0 * area2), origin.lon + cx / (3.0 * area2))
}

fn vertex_mean(points: &[GeoPoint]) -> GeoPoint {
    let n = points.len().max(1) as f64;
    let (lat, lon) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lon), p| (lat + p.lat, lon + p.lon));
    GeoPoint::new(lat / n, lon / n)
}

/// An axis-aligned geographic bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    /// Southern edge latitude
    pub south: f64,
    /// Western edge longitude
    pub west: f64,
    /// Northern edge latitude
    pub north: f64,
    /// Eastern edge longitude
    pub east: f64,
}

impl GeoBounds {
    /// Bounds of a single point.
    pub fn around(p: GeoPoint) -> Self {
        Self { south: p.lat, west: p.lon, north: p.lat, east: p.lon }
    }

    /// Grows the bounds to include `p`.
    pub fn extend(&mut self, p: GeoPoint) {
        self.south = self.south.min(p.lat);
        self.north = self.north.max(p.lat);
        self.west = self.west.min(p.lon);
        self.east = self.east.max(p.lon);
    }

    /// Bounds of all points, or `None` if there are none.
    pub fn from_points<I: IntoIterator<Item = GeoPoint>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let mut bounds = GeoBounds::around(iter.next()?);
        for p in iter {
            bounds.extend(p);
        }
        Some(bounds)
    }

    /// Centre of the box.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new((self.south + self.north) / 2.0, (self.west + self.east) / 2.0)
    }
}

/// A position in Web-Mercator world pixels at some zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPoint {
    /// Pixels east of the antimeridian
    pub x: f64,
    /// Pixels south of the northern projection limit
    pub y: f64,
}

/// World size in pixels at `zoom`.
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Projects a geographic point to world pixels at `zoom`.
pub fn project(p: GeoPoint, zoom: f64) -> WorldPoint {
    let size = world_size(zoom);
    let lat = p.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (p.lon + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * size;
    WorldPoint { x, y }
}

/// Inverse of [`project`].
pub fn unproject(w: WorldPoint, zoom: f64) -> GeoPoint {
    let size = world_size(zoom);
    let lon = w.x / size * 360.0 - 180.0;
    let n = PI - 2.0 * PI * w.y / size;
    let lat = n.sinh().atan().to_degrees();
    GeoPoint::new(lat, lon)
}

/// Highest integer zoom at which `bounds` fits inside a `width` × `height` surface
/// with `padding` on every side, clamped to `[min_zoom, max_zoom]`.
///
/// A bounds with no extent (a single point) fits at `max_zoom`.
pub fn fit_zoom(bounds: &GeoBounds, width: f32, height: f32, padding: f32, min_zoom: u8, max_zoom: u8) -> u8 {
    let nw = project(GeoPoint::new(bounds.north, bounds.west), 0.0);
    let se = project(GeoPoint::new(bounds.south, bounds.east), 0.0);
    let span_x = (se.x - nw.x).abs();
    let span_y = (se.y - nw.y).abs();
    let avail_x = f64::from((width - 2.0 * padding).max(1.0));
    let avail_y = f64::from((height - 2.0 * padding).max(1.0));

    let ratio = |avail: f64, span: f64| if span > 1e-12 { avail / span } else { f64::INFINITY };
    let scale = ratio(avail_x, span_x).min(ratio(avail_y, span_y));
    if !scale.is_finite() {
        return max_zoom;
    }
    let zoom = scale.log2().floor();
    zoom.clamp(f64::from(min_zoom), f64::from(max_zoom)) as u8
}

/// Which axis limited an aspect-preserving fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitAxis {
    /// The image fills the box width and is centred vertically
    Width,
    /// The image fills the box height and is centred horizontally
    Height,
}

/// Where an image lands inside a box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Drawn width
    pub width: f32,
    /// Drawn height
    pub height: f32,
    /// The constraining axis
    pub axis: FitAxis,
}

/// Fits a `src_w` × `src_h` image into the box at (`box_x`, `box_y`) of size
/// `box_w` × `box_h`, preserving aspect ratio and centring along the free axis.
///
/// # Arguments
///
/// * `src_w`, `src_h` - Source image size
/// * `box_x`, `box_y`, `box_w`, `box_h` - Target box
///
/// # Returns
///
/// The placement of the drawn image. An image wider (relative to its height)
/// than the box is width-constrained, otherwise height-constrained.
pub fn fit_within(src_w: f32, src_h: f32, box_x: f32, box_y: f32, box_w: f32, box_h: f32) -> Placement {
    let src_ratio = src_w / src_h.max(f32::EPSILON);
    let box_ratio = box_w / box_h.max(f32::EPSILON);
    let (width, height, axis) = if src_ratio > box_ratio {
        (box_w, box_w / src_ratio, FitAxis::Width)
    } else {
        (box_h * src_ratio, box_h, FitAxis::Height)
    };
    Placement {
        x: box_x + (box_w - width) / 2.0,
        y: box_y + (box_h - height) / 2.0,
        width,
        height,
        axis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_triangle_centroid() {
        let tri = Geometry::Polygon(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 3.0),
            GeoPoint::new(3.0, 0.0),
        ]);
        let c = centroid(&tri);
        assert!(close(c.lat, 1.0) && close(c.lon, 1.0), "{c:?}");
    }

    #[test]
    fn test_degenerate_polygon_uses_vertex_mean() {
        let flat = Geometry::Polygon(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 1.0),
            GeoPoint::new(0.0, 2.0),
        ]);
        let c = centroid(&flat);
        assert!(close(c.lat, 0.0) && close(c.lon, 1.0));
    }

    #[test]
    fn test_line_midpoint() {
        let c = centroid(&Geometry::Line(GeoPoint::new(1.0, 1.0), GeoPoint::new(3.0, 5.0)));
        assert_eq!(c, GeoPoint::new(2.0, 3.0));
    }

    #[test]
    fn test_projection_round_trip_near_barcelona() {
        let p = GeoPoint::new(41.3851, 2.1701);
        let back = unproject(project(p, 15.0), 15.0);
        assert!((back.lat - p.lat).abs() < 1e-9);
        assert!((back.lon - p.lon).abs() < 1e-9);
        let origin = project(GeoPoint::new(0.0, 0.0), 0.0);
        assert!(close(origin.x, 128.0) && close(origin.y, 128.0));
    }

    #[test]
    fn test_fit_zoom_caps_single_point() {
        let b = GeoBounds::around(GeoPoint::new(41.0, 2.0));
        assert_eq!(fit_zoom(&b, 400.0, 300.0, 40.0, 1, 17), 17);
    }

    #[test]
    fn test_fit_zoom_shrinks_for_large_extent() {
        let b = GeoBounds::from_points([GeoPoint::new(40.0, 0.0), GeoPoint::new(42.0, 4.0)]).unwrap();
        let z = fit_zoom(&b, 453.0, 302.0, 40.0, 1, 17);
        assert!(z < 10, "zoom {z}");
        // The fitted extent must fit inside the padded surface
        let nw = project(GeoPoint::new(42.0, 0.0), f64::from(z));
        let se = project(GeoPoint::new(40.0, 4.0), f64::from(z));
        assert!(se.x - nw.x <= 453.0 - 80.0);
        assert!(se.y - nw.y <= 302.0 - 80.0);
    }

    #[test]
    fn test_fit_within_width_constrained() {
        // 1600x900 (1.778) into 420x297 (1.414): wider than the box
        let p = fit_within(1600.0, 900.0, 0.0, 0.0, 420.0, 297.0);
        assert_eq!(p.axis, FitAxis::Width);
        assert!((p.width - 420.0).abs() < 1e-3);
        assert!((p.height - 236.25).abs() < 1e-3);
        assert!(p.x.abs() < 1e-3);
        assert!((p.y - 30.375).abs() < 1e-3);
    }

    #[test]
    fn test_fit_within_height_constrained() {
        let p = fit_within(300.0, 600.0, 10.0, 20.0, 200.0, 100.0);
        assert_eq!(p.axis, FitAxis::Height);
        assert!((p.height - 100.0).abs() < 1e-4);
        assert!((p.width - 50.0).abs() < 1e-4);
        assert!((p.x - 85.0).abs() < 1e-4);
        assert!((p.y - 20.0).abs() < 1e-4);
    }
}
