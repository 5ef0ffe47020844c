//! Page-set transforms: split, extract and delete
//!
//! Each operation validates the whole page selection first, then rebuilds
//! the page tree of a copy of the source document and serializes it.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::pages::{self, PageRange};
use crate::pdf::document;

/// Split a document into one document per range
///
/// Every range is checked before any output is produced; an invalid range
/// rejects the whole call.
pub fn split_ranges(data: &[u8], ranges: &[PageRange]) -> Result<Vec<Vec<u8>>> {
    let doc = document::load_bytes(data)?;
    let page_count = document::page_count(&doc);
    pages::validate_ranges(ranges, page_count)?;

    let outputs = ranges
        .iter()
        .map(|range| {
            let selection: Vec<u32> = range.pages().collect();
            let mut part = document::select_pages(&doc, &selection)?;
            debug!(%range, pages = selection.len(), "split part built");
            document::serialize(&mut part)
        })
        .collect::<Result<Vec<_>>>()?;

    info!(page_count, parts = outputs.len(), "split PDF by ranges");
    Ok(outputs)
}

/// Split a document into single-page documents, in page order
pub fn split_pages(data: &[u8]) -> Result<Vec<Vec<u8>>> {
    let doc = document::load_bytes(data)?;
    let page_count = document::page_count(&doc);
    if page_count == 0 {
        return Err(Error::EmptyPdf("input".to_string()));
    }

    let outputs = (1..=page_count)
        .map(|page| {
            let mut single = document::select_pages(&doc, &[page])?;
            document::serialize(&mut single)
        })
        .collect::<Result<Vec<_>>>()?;

    info!(page_count, "split PDF into single pages");
    Ok(outputs)
}

/// Build a document from the given 1-based pages, in the order given
///
/// Duplicates are kept, so this also reorders or repeats pages.
pub fn extract_pages(data: &[u8], selection: &[u32]) -> Result<Vec<u8>> {
    let doc = document::load_bytes(data)?;
    let page_count = document::page_count(&doc);
    pages::validate_page_numbers(selection, page_count)?;

    let mut extracted = document::select_pages(&doc, selection)?;
    let bytes = document::serialize(&mut extracted)?;

    info!(page_count, extracted = selection.len(), "extracted pages");
    Ok(bytes)
}

/// Remove the given 1-based pages, keeping the rest in their original order
pub fn delete_pages(data: &[u8], selection: &[u32]) -> Result<Vec<u8>> {
    let mut doc = document::load_bytes(data)?;
    let page_count = document::page_count(&doc);
    pages::validate_page_numbers(selection, page_count)?;

    let order = pages::deletion_order(selection);
    if order.len() == page_count as usize {
        return Err(Error::InvalidOption(format!(
            "cannot delete all {} pages of the document",
            page_count
        )));
    }

    let mut remaining = document::page_ids(&doc);
    for page in &order {
        remaining.remove(pages::to_index(*page));
    }

    document::rebuild_page_tree(&mut doc, &remaining)?;
    doc.prune_objects();
    let bytes = document::serialize(&mut doc)?;

    info!(page_count, deleted = order.len(), remaining = remaining.len(), "deleted pages");
    Ok(bytes)
}
