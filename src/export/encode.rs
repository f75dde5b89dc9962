//! Image output: flatten onto white, optionally letterbox onto a fixed canvas, encode.

use super::surface::RasterImage;
use crate::config::ImageFormat;
use crate::error::ExportError;
use crate::geometry::fit_within;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

/// Encodes a raster as an image file.
///
/// # Arguments
///
/// * `raster` - The rasterized surface
/// * `format` - JPEG or PNG
/// * `quality` - JPEG quality (ignored for PNG)
/// * `canvas` - Fixed output size to letterbox onto, or `None` to keep the raster size
pub fn encode_image(
    raster: &RasterImage,
    format: ImageFormat,
    quality: u8,
    canvas: Option<[u32; 2]>,
) -> Result<Vec<u8>, ExportError> {
    let rgba = raster.to_rgba_image();
    let flat = match canvas {
        Some([cw, ch]) => letterbox(&rgba, cw, ch),
        None => flatten(&rgba),
    };

    let mut bytes = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
            encoder
                .encode_image(&flat)
                .map_err(|e| ExportError::Encoding(e.to_string()))?;
        }
        ImageFormat::Png => {
            flat.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
                .map_err(|e| ExportError::Encoding(e.to_string()))?;
        }
    }
    Ok(bytes)
}

/// Composites straight-alpha pixels over white.
fn flatten(rgba: &RgbaImage) -> RgbImage {
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (dst, src) in out.pixels_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        let over = |c: u8| {
            let a = u16::from(a);
            ((u16::from(c) * a + 255 * (255 - a) + 127) / 255) as u8
        };
        *dst = Rgb([over(r), over(g), over(b)]);
    }
    out
}

/// Scales the image to fit a white `cw` × `ch` canvas, centred along the free axis.
fn letterbox(rgba: &RgbaImage, cw: u32, ch: u32) -> RgbImage {
    let placement = fit_within(rgba.width() as f32, rgba.height() as f32, 0.0, 0.0, cw as f32, ch as f32);
    let dw = placement.width.round().max(1.0) as u32;
    let dh = placement.height.round().max(1.0) as u32;
    let scaled = imageops::resize(rgba, dw, dh, FilterType::Triangle);

    let mut canvas = RgbaImage::from_pixel(cw, ch, Rgba([255, 255, 255, 255]));
    imageops::overlay(
        &mut canvas,
        &scaled,
        placement.x.round() as i64,
        placement.y.round() as i64,
    );
    flatten(&canvas)
}
