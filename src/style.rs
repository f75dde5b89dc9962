//! Presentation styles for draft and committed shapes.

use crate::constants::*;
use crate::types::{Color, ShapeKind, ShapeRecord};

/// How a shape outline and fill are painted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathStyle {
    /// Stroke colour
    pub stroke: Color,
    /// Stroke width in screen pixels
    pub weight: f32,
    /// Fill colour
    pub fill: Color,
    /// Fill opacity; zero means no fill
    pub fill_opacity: f32,
    /// Dash pattern, `None` for a solid stroke
    pub dash: Option<[f32; 2]>,
    /// Marker radius for point shapes
    pub radius: f32,
}

impl PathStyle {
    /// Dashed, low-opacity style of the in-progress preview.
    pub fn draft(kind: ShapeKind, color: Color) -> Self {
        match kind {
            ShapeKind::Point => Self::marker(color),
            ShapeKind::Line | ShapeKind::Polygon => Self {
                stroke: color,
                weight: DRAFT_STROKE_WEIGHT,
                fill: color,
                fill_opacity: DRAFT_FILL_OPACITY,
                dash: Some(DRAFT_DASH),
                radius: POINT_RADIUS,
            },
        }
    }

    /// Solid style applied when a shape is committed.
    pub fn committed(kind: ShapeKind, color: Color) -> Self {
        match kind {
            ShapeKind::Point => Self::marker(color),
            ShapeKind::Line => Self {
                fill_opacity: 0.0,
                ..Self::solid(color)
            },
            ShapeKind::Polygon => Self::solid(color),
        }
    }

    /// Final presentation style for a committed record, using its snapshotted colour and weight.
    pub fn for_record(record: &ShapeRecord) -> Self {
        let kind = record.kind();
        let base = Self::committed(kind, record.stroke_color);
        match kind {
            ShapeKind::Point => base,
            ShapeKind::Line | ShapeKind::Polygon => Self {
                weight: record.stroke_weight,
                ..base
            },
        }
    }

    fn solid(color: Color) -> Self {
        Self {
            stroke: color,
            weight: FINAL_STROKE_WEIGHT,
            fill: color,
            fill_opacity: FINAL_FILL_OPACITY,
            dash: None,
            radius: POINT_RADIUS,
        }
    }

    fn marker(color: Color) -> Self {
        Self {
            stroke: color,
            weight: FINAL_STROKE_WEIGHT,
            fill: color,
            fill_opacity: POINT_FILL_OPACITY,
            dash: None,
            radius: POINT_RADIUS,
        }
    }
}
