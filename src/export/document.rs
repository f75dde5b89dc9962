//! Document output: a single page sized to the card template, with a bold
//! title above the map image.

use super::encode::encode_image;
use super::surface::RasterImage;
use crate::config::{CardTemplate, ImageFormat};
use crate::constants::{TITLE_GAP_MM, TITLE_OFFSET_MM};
use crate::error::ExportError;
use crate::geometry::{fit_within, Placement};
use lopdf::{
    content::{Content, Operation},
    dictionary,
    xref::XrefType,
    Document, Object, Stream, StringFormat,
};

/// Average Helvetica-Bold advance as a fraction of the font size.
const TITLE_ADVANCE: f32 = 0.56;

fn mm_to_pt(mm: f32) -> f32 {
    mm * 72.0 / 25.4
}

/// Where things go on the page, in points from the bottom-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    /// Page width
    pub width: f32,
    /// Page height
    pub height: f32,
    /// Title baseline origin, if a title is shown
    pub title: Option<(f32, f32)>,
    /// Letterboxed image rectangle
    pub image: Placement,
}

impl PageLayout {
    /// Lays out an image of `img_w` × `img_h` pixels on `template`.
    ///
    /// The title baseline sits [`TITLE_OFFSET_MM`] below the top edge, centred.
    /// The image box starts [`TITLE_GAP_MM`] below the title (or at the top
    /// margin without one) and is inset by the margin on the other sides.
    pub fn new(template: &CardTemplate, title: Option<&str>, img_w: u32, img_h: u32) -> Result<Self, ExportError> {
        let width = mm_to_pt(template.width_mm);
        let height = mm_to_pt(template.height_mm);
        let margin = mm_to_pt(template.margin_mm);

        let (title, box_top) = match title.filter(|_| template.show_title) {
            Some(text) => {
                let size = template.title_font_pt;
                let text_w = text.chars().count() as f32 * size * TITLE_ADVANCE;
                let x = ((width - text_w) / 2.0).max(margin);
                let y = height - mm_to_pt(TITLE_OFFSET_MM);
                (Some((x, y)), height - mm_to_pt(TITLE_OFFSET_MM + TITLE_GAP_MM))
            }
            None => (None, height - margin),
        };

        let box_w = width - 2.0 * margin;
        let box_h = box_top - margin;
        if box_w <= 0.0 || box_h <= 0.0 {
            return Err(ExportError::Rendering(format!(
                "template '{}' leaves no room for the map",
                template.name
            )));
        }
        let image = fit_within(img_w as f32, img_h as f32, margin, margin, box_w, box_h);
        Ok(Self { width, height, title, image })
    }
}

/// Builds the single-page document.
pub fn encode_document(
    raster: &RasterImage,
    template: &CardTemplate,
    title: &str,
    jpeg_quality: u8,
) -> Result<Vec<u8>, ExportError> {
    let layout = PageLayout::new(template, Some(title), raster.width(), raster.height())?;
    let jpeg = encode_image(raster, ImageFormat::Jpeg, jpeg_quality, None)?;

    let mut doc = Document::with_version("1.4");
    doc.reference_table.cross_reference_type = XrefType::CrossReferenceTable;
    let id_pages = doc.new_object_id();

    let id_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let id_image = doc.add_object(
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => raster.width() as i64,
                "Height" => raster.height() as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        )
        .with_compression(false),
    );

    let mut ops = Vec::new();
    let img = &layout.image;
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new(
        "cm",
        vec![
            img.width.into(),
            0.into(),
            0.into(),
            img.height.into(),
            img.x.into(),
            img.y.into(),
        ],
    ));
    ops.push(Operation::new("Do", vec!["Im1".into()]));
    ops.push(Operation::new("Q", vec![]));

    if let Some((x, y)) = layout.title {
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec!["F1".into(), template.title_font_pt.into()]));
        ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(to_win_ansi(title), StringFormat::Literal)],
        ));
        ops.push(Operation::new("ET", vec![]));
    }

    let content = Content { operations: ops }
        .encode()
        .map_err(|e| ExportError::Encoding(e.to_string()))?;
    let id_content = doc.add_object(Stream::new(dictionary! {}, content));
    let id_resources = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => id_font },
        "XObject" => dictionary! { "Im1" => id_image },
    });
    let id_page = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => id_pages,
        "Contents" => id_content,
        "Resources" => id_resources,
    });

    doc.objects.insert(
        id_pages,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => 1,
            "Kids" => vec![id_page.into()],
            "MediaBox" => vec![0.into(), 0.into(), layout.width.into(), layout.height.into()],
        }),
    );
    let id_catalog = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => id_pages,
    });
    doc.trailer.set("Root", id_catalog);
    let id_info = doc.add_object(dictionary! {
        "Title" => text_string(title),
        "Creator" => Object::string_literal(concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))),
    });
    doc.trailer.set("Info", id_info);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

/// Document-information text: plain ASCII as is, anything else as UTF-16BE with a byte-order mark.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Latin-1 subset of WinAnsi; anything else becomes `?`.
fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
