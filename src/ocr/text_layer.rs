//! Searchable text layer drawn from OCR results
//!
//! The recognized text is written in tiny, white, nearly transparent type
//! at a fixed spot on each page. Viewers can search and copy it, but it is
//! not aligned with the glyphs in the page image.

use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};
use tracing::info;

use super::OcrPageResult;
use crate::error::{Error, Result};
use crate::pdf::document;

const FONT_RESOURCE: &str = "WbOcr";
const STATE_RESOURCE: &str = "WbOcrGs";

/// Text origin on every page
pub const TEXT_ORIGIN: (f32, f32) = (10.0, 10.0);
const FONT_SIZE: f32 = 1.0;
const OPACITY: f32 = 0.01;

fn text_layer_operations(text: &str) -> Vec<Operation> {
    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new("gs", vec![Object::Name(STATE_RESOURCE.as_bytes().to_vec())]),
        Operation::new("g", vec![Object::Integer(1)]),
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), Object::Real(FONT_SIZE)],
        ),
        Operation::new("TL", vec![Object::Real(FONT_SIZE)]),
        Operation::new(
            "Td",
            vec![Object::Real(TEXT_ORIGIN.0), Object::Real(TEXT_ORIGIN.1)],
        ),
    ];

    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(document::win_ansi_bytes(line), StringFormat::Literal)],
        ));
    }

    operations.push(Operation::new("ET", vec![]));
    operations.push(Operation::new("Q", vec![]));
    operations
}

/// Overlay each result's text onto its page
///
/// Results are matched to pages by `page_number`; pages without a result
/// are left alone and results with blank text are skipped.
pub fn add_text_layer(data: &[u8], results: &[OcrPageResult]) -> Result<Vec<u8>> {
    let mut doc = document::load_bytes(data)?;
    let page_ids = document::page_ids(&doc);
    let page_count = page_ids.len() as u32;

    for result in results {
        if result.page_number < 1 || result.page_number > page_count {
            return Err(Error::PageOutOfRange {
                page: result.page_number,
                page_count,
            });
        }
    }

    let font_id = document::helvetica_font(&mut doc);
    let state_id = document::opacity_state(&mut doc, OPACITY);
    let mut layered = 0;

    for result in results.iter().filter(|r| !r.text.trim().is_empty()) {
        let page_id = page_ids[crate::pages::to_index(result.page_number)];
        let content = Content {
            operations: text_layer_operations(&result.text),
        };

        document::add_page_resource(&mut doc, page_id, "Font", FONT_RESOURCE, font_id)?;
        document::add_page_resource(&mut doc, page_id, "ExtGState", STATE_RESOURCE, state_id)?;
        document::overlay_content(&mut doc, page_id, content.encode()?)?;
        layered += 1;
    }

    let bytes = document::serialize(&mut doc)?;
    info!(pages = layered, "added searchable text layer");
    Ok(bytes)
}
