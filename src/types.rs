//! Core data types for the territory marker.
//!
//! This module defines the geographic point, colour and shape primitives, the
//! committed shape and label records, and the insertion-ordered collection that
//! owns them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for committed shapes.
pub type ShapeId = Uuid;

/// Unique identifier for committed labels.
pub type LabelId = Uuid;

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, positive north
    pub lat: f64,
    /// Longitude in degrees, positive east
    pub lon: f64,
}

impl GeoPoint {
    /// Creates a point from latitude and longitude in degrees.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns this point moved by the given latitude/longitude delta.
    pub fn offset(self, delta: GeoDelta) -> Self {
        Self {
            lat: self.lat + delta.lat,
            lon: self.lon + delta.lon,
        }
    }

    /// Delta that moves `from` onto `self`.
    pub fn delta_from(self, from: GeoPoint) -> GeoDelta {
        GeoDelta {
            lat: self.lat - from.lat,
            lon: self.lon - from.lon,
        }
    }
}

/// A coordinate difference used to translate shapes while dragging.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoDelta {
    /// Latitude difference in degrees
    pub lat: f64,
    /// Longitude difference in degrees
    pub lon: f64,
}

/// An opaque RGB colour, serialized as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Color {
    /// Pure white, used to flatten exports.
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    /// Creates a colour from its channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels as `[r, g, b, 255]`.
    pub fn to_rgba_u8(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }
}

impl Default for Color {
    fn default() -> Self {
        crate::constants::DEFAULT_COLOR
            .parse()
            .unwrap_or(Color::rgb(0x33, 0x88, 0xff))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = String;

    /// Parses `#rrggbb` or `#rgb` (the leading `#` is optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return Err(format!("invalid colour '{s}'"));
        }
        let channel = |h: &str| u8::from_str_radix(h, 16).map_err(|e| format!("invalid colour '{s}': {e}"));
        match hex.len() {
            6 => Ok(Color::rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            3 => {
                let r = channel(&hex[0..1])?;
                let g = channel(&hex[1..2])?;
                let b = channel(&hex[2..3])?;
                Ok(Color::rgb(r * 17, g * 17, b * 17))
            }
            _ => Err(format!("invalid colour '{s}': expected #rrggbb")),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

/// The kind of a shape, fully determined by its vertex count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    /// A single vertex, drawn as a marker
    Point,
    /// Two vertices, drawn as an open line
    Line,
    /// Three or more vertices, drawn as a closed outline
    Polygon,
}

impl ShapeKind {
    /// Classifies a vertex count. Returns `None` for an empty path.
    pub fn for_vertex_count(count: usize) -> Option<Self> {
        match count {
            0 => None,
            1 => Some(ShapeKind::Point),
            2 => Some(ShapeKind::Line),
            _ => Some(ShapeKind::Polygon),
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeKind::Point => "point",
            ShapeKind::Line => "line",
            ShapeKind::Polygon => "polygon",
        };
        f.write_str(name)
    }
}

/// Shape geometry, tagged by kind and carrying its vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    /// A single marker position
    Point(GeoPoint),
    /// An open segment from the first to the second vertex
    Line(GeoPoint, GeoPoint),
    /// A closed ring of at least three vertices, in drawing order
    Polygon(Vec<GeoPoint>),
}

impl Geometry {
    /// Builds the geometry for a drawn path. Returns `None` for an empty path.
    ///
    /// # Arguments
    ///
    /// * `vertices` - The vertices in drawing order
    pub fn from_vertices(vertices: &[GeoPoint]) -> Option<Self> {
        match vertices {
            [] => None,
            [p] => Some(Geometry::Point(*p)),
            [a, b] => Some(Geometry::Line(*a, *b)),
            _ => Some(Geometry::Polygon(vertices.to_vec())),
        }
    }

    /// The kind of this geometry.
    pub fn kind(&self) -> ShapeKind {
        match self {
            Geometry::Point(_) => ShapeKind::Point,
            Geometry::Line(..) => ShapeKind::Line,
            Geometry::Polygon(_) => ShapeKind::Polygon,
        }
    }

    /// The vertices in drawing order.
    pub fn vertices(&self) -> Vec<GeoPoint> {
        match self {
            Geometry::Point(p) => vec![*p],
            Geometry::Line(a, b) => vec![*a, *b],
            Geometry::Polygon(ring) => ring.clone(),
        }
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        match self {
            Geometry::Point(_) => 1,
            Geometry::Line(..) => 2,
            Geometry::Polygon(ring) => ring.len(),
        }
    }

    /// Returns the geometry with every vertex moved by `delta`. The kind is preserved.
    pub fn translated(&self, delta: GeoDelta) -> Self {
        match self {
            Geometry::Point(p) => Geometry::Point(p.offset(delta)),
            Geometry::Line(a, b) => Geometry::Line(a.offset(delta), b.offset(delta)),
            Geometry::Polygon(ring) => Geometry::Polygon(ring.iter().map(|p| p.offset(delta)).collect()),
        }
    }
}

/// A committed shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    /// Unique identifier
    pub id: ShapeId,
    /// Geometry, which also determines the kind
    pub geometry: Geometry,
    /// Stroke colour captured at commit time
    pub stroke_color: Color,
    /// Stroke weight captured at commit time
    pub stroke_weight: f32,
    /// Name shown as a permanent tooltip at the shape centre
    pub name: String,
    /// Label created together with this shape, if any
    pub label: Option<LabelId>,
}

impl ShapeRecord {
    /// Creates a shape record with a fresh id.
    pub fn new(geometry: Geometry, stroke_color: Color, stroke_weight: f32, name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            geometry,
            stroke_color,
            stroke_weight,
            name,
            label: None,
        }
    }

    /// The kind of this shape, derived from its geometry.
    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }
}

/// Visual properties of a label, snapshotted at creation or edit time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelStyle {
    /// Rotation in degrees, clockwise
    pub angle: f32,
    /// Font size in pixels
    pub font_size: f32,
    /// Text colour
    pub color: Color,
}

/// A committed free-text annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    /// Unique identifier
    pub id: LabelId,
    /// Displayed text
    pub text: String,
    /// Position the text is centred on
    pub anchor: GeoPoint,
    /// Rotation, size and colour
    pub style: LabelStyle,
    /// Shape this label was created alongside (non-owning)
    pub shape: Option<ShapeId>,
}

impl LabelRecord {
    /// Creates a standalone label with a fresh id.
    pub fn new(text: String, anchor: GeoPoint, style: LabelStyle) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            anchor,
            style,
            shape: None,
        }
    }
}

/// The committed shapes and labels, each in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Territories {
    /// Committed shapes, oldest first
    pub shapes: Vec<ShapeRecord>,
    /// Committed labels, oldest first
    pub labels: Vec<LabelRecord>,
}

impl Territories {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if there are neither shapes nor labels.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.labels.is_empty()
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.shapes.len() + self.labels.len()
    }

    /// Adds a shape and returns its id.
    pub fn add_shape(&mut self, shape: ShapeRecord) -> ShapeId {
        let id = shape.id;
        self.shapes.push(shape);
        id
    }

    /// Adds a label and returns its id.
    pub fn add_label(&mut self, label: LabelRecord) -> LabelId {
        let id = label.id;
        self.labels.push(label);
        id
    }

    /// Looks up a shape.
    pub fn shape(&self, id: ShapeId) -> Option<&ShapeRecord> {
        self.shapes.iter().find(|s| s.id == id)
    }

    /// Looks up a shape mutably.
    pub fn shape_mut(&mut self, id: ShapeId) -> Option<&mut ShapeRecord> {
        self.shapes.iter_mut().find(|s| s.id == id)
    }

    /// Looks up a label.
    pub fn label(&self, id: LabelId) -> Option<&LabelRecord> {
        self.labels.iter().find(|l| l.id == id)
    }

    /// Looks up a label mutably.
    pub fn label_mut(&mut self, id: LabelId) -> Option<&mut LabelRecord> {
        self.labels.iter_mut().find(|l| l.id == id)
    }

    /// Removes a shape, returning it.
    pub fn remove_shape(&mut self, id: ShapeId) -> Option<ShapeRecord> {
        let index = self.shapes.iter().position(|s| s.id == id)?;
        Some(self.shapes.remove(index))
    }

    /// Removes a label, returning it. A shape pointing at it loses the reference.
    pub fn remove_label(&mut self, id: LabelId) -> Option<LabelRecord> {
        let index = self.labels.iter().position(|l| l.id == id)?;
        for shape in self.shapes.iter_mut().filter(|s| s.label == Some(id)) {
            shape.label = None;
        }
        Some(self.labels.remove(index))
    }

    /// Name of the most recently committed shape.
    pub fn latest_name(&self) -> Option<&str> {
        self.shapes
            .iter()
            .rev()
            .map(|s| s.name.trim())
            .find(|n| !n.is_empty())
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        self.shapes.clear();
        self.labels.clear();
    }
}
