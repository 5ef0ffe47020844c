//! Text drawn onto every page: watermarks and page numbers
//!
//! Both tools load the document, register a Helvetica font (and a graphics
//! state for opacity) once, and append a small content stream to each page
//! on top of its existing content.

use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};
use tracing::info;

use crate::error::{Error, Result};
use crate::layout::{self, VerticalPosition};
use crate::pdf::document;

/// Resource names used for the objects we add to pages
const FONT_RESOURCE: &str = "WbHelv";
const STATE_RESOURCE: &str = "WbGs";

/// Options for [`add_watermark`]
#[derive(Debug, Clone)]
pub struct WatermarkOptions {
    /// Fill opacity, 0.0 (invisible) to 1.0 (opaque)
    pub opacity: f32,
    /// Counter-clockwise rotation of the text in degrees
    pub rotation_degrees: f32,
    /// Font size in points
    pub font_size: f32,
    /// Gray level of the text, 0.0 (black) to 1.0 (white)
    pub gray: f32,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            opacity: 0.3,
            rotation_degrees: 45.0,
            font_size: 50.0,
            gray: 0.5,
        }
    }
}

impl WatermarkOptions {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(Error::InvalidOption(format!(
                "opacity must be between 0 and 1, got {}",
                self.opacity
            )));
        }
        if !(0.0..=1.0).contains(&self.gray) {
            return Err(Error::InvalidOption(format!(
                "gray level must be between 0 and 1, got {}",
                self.gray
            )));
        }
        validate_font_size(self.font_size)
    }
}

/// Options for [`add_page_numbers`]
#[derive(Debug, Clone)]
pub struct PageNumberOptions {
    /// Edge the numbers are drawn against
    pub position: VerticalPosition,
    /// Font size in points
    pub font_size: f32,
    /// Number printed on the first page
    pub start_at: u32,
    /// Label template; `{n}` is the page number and `{total}` the last number
    pub format: String,
}

impl Default for PageNumberOptions {
    fn default() -> Self {
        Self {
            position: VerticalPosition::Bottom,
            font_size: 12.0,
            start_at: 1,
            format: "{n}".to_string(),
        }
    }
}

impl PageNumberOptions {
    /// Label for the page at 0-based `index` in a document of `page_count` pages
    pub fn label(&self, index: u32, page_count: u32) -> String {
        let number = self.start_at + index;
        let total = self.start_at + page_count.saturating_sub(1);
        self.format
            .replace("{n}", &number.to_string())
            .replace("{total}", &total.to_string())
    }
}

fn validate_font_size(font_size: f32) -> Result<()> {
    if !(font_size > 0.0 && font_size.is_finite()) {
        return Err(Error::InvalidOption(format!(
            "font size must be positive, got {}",
            font_size
        )));
    }
    Ok(())
}

fn text_operand(text: &str) -> Object {
    Object::String(document::win_ansi_bytes(text), StringFormat::Literal)
}

/// Content operators for one watermark, rotated about its origin
fn watermark_operations(text: &str, x: f32, y: f32, options: &WatermarkOptions) -> Vec<Operation> {
    let radians = options.rotation_degrees.to_radians();
    let (sin, cos) = radians.sin_cos();

    vec![
        Operation::new("q", vec![]),
        Operation::new("gs", vec![Object::Name(STATE_RESOURCE.as_bytes().to_vec())]),
        Operation::new("g", vec![Object::Real(options.gray)]),
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![
                Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                Object::Real(options.font_size),
            ],
        ),
        Operation::new(
            "Tm",
            vec![
                Object::Real(cos),
                Object::Real(sin),
                Object::Real(-sin),
                Object::Real(cos),
                Object::Real(x),
                Object::Real(y),
            ],
        ),
        Operation::new("Tj", vec![text_operand(text)]),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ]
}

/// Content operators for one page number label
fn page_number_operations(label: &str, x: f32, y: f32, font_size: f32) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new("g", vec![Object::Integer(0)]),
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), Object::Real(font_size)],
        ),
        Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
        Operation::new("Tj", vec![text_operand(label)]),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ]
}

/// Draw the same text watermark in the middle of every page
pub fn add_watermark(data: &[u8], text: &str, options: &WatermarkOptions) -> Result<Vec<u8>> {
    if text.trim().is_empty() {
        return Err(Error::MissingField("watermark text"));
    }
    options.validate()?;

    let mut doc = document::load_bytes(data)?;
    let font_id = document::helvetica_font(&mut doc);
    let state_id = document::opacity_state(&mut doc, options.opacity);
    let page_ids = document::page_ids(&doc);

    for &page_id in &page_ids {
        let page = document::page_box(&doc, page_id);
        let (x, y) = layout::watermark_origin(&page, text, options.font_size);
        let content = Content {
            operations: watermark_operations(text, x, y, options),
        };

        document::add_page_resource(&mut doc, page_id, "Font", FONT_RESOURCE, font_id)?;
        document::add_page_resource(&mut doc, page_id, "ExtGState", STATE_RESOURCE, state_id)?;
        document::overlay_content(&mut doc, page_id, content.encode()?)?;
    }

    let bytes = document::serialize(&mut doc)?;
    info!(pages = page_ids.len(), text, "watermarked PDF");
    Ok(bytes)
}

/// Print the page number on every page, centered horizontally
pub fn add_page_numbers(data: &[u8], options: &PageNumberOptions) -> Result<Vec<u8>> {
    validate_font_size(options.font_size)?;

    let mut doc = document::load_bytes(data)?;
    let font_id = document::helvetica_font(&mut doc);
    let page_ids = document::page_ids(&doc);
    let page_count = page_ids.len() as u32;

    for (index, &page_id) in page_ids.iter().enumerate() {
        let label = options.label(index as u32, page_count);
        let page = document::page_box(&doc, page_id);
        let (x, y) = layout::page_number_origin(&page, &label, options.font_size, options.position);
        let content = Content {
            operations: page_number_operations(&label, x, y, options.font_size),
        };

        document::add_page_resource(&mut doc, page_id, "Font", FONT_RESOURCE, font_id)?;
        document::overlay_content(&mut doc, page_id, content.encode()?)?;
    }

    let bytes = document::serialize(&mut doc)?;
    info!(pages = page_count, "numbered pages");
    Ok(bytes)
}
