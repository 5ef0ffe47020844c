//! PDF metadata extraction

use std::path::Path;

use lopdf::{Document, Object};

use crate::error::{Error, Result};
use crate::pdf::document::{self, SourceFile};

/// Count pages by reading the Count field from the Pages dictionary
///
/// This is the number the document declares for itself. It can disagree
/// with the number of pages reachable through the page tree in damaged
/// files; [`PdfMetadata::reachable_pages`] holds the latter.
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog = doc
        .catalog()
        .map_err(|_| Error::General("No catalog in document".to_string()))?;

    let pages_ref = catalog
        .get(b"Pages")
        .map_err(|_| Error::General("No Pages in catalog".to_string()))?;

    let pages_dict = match document::resolve(doc, pages_ref)? {
        Object::Dictionary(dict) => dict,
        _ => return Err(Error::General("Pages is not a dictionary".to_string())),
    };

    let count = pages_dict
        .get(b"Count")
        .map_err(|_| Error::General("No Count in Pages".to_string()))?;

    match document::resolve(doc, count)? {
        Object::Integer(n) if *n >= 0 => Ok(*n as usize),
        _ => Err(Error::General("Count is not a non-negative integer".to_string())),
    }
}

/// PDF metadata
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Number of pages declared by the page tree root
    pub page_count: usize,
    /// Number of pages reachable by walking the page tree
    pub reachable_pages: usize,
    /// PDF version from the header, e.g. "1.7"
    pub version: String,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
}

/// Read a text entry from the Info dictionary
fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info = doc.trailer.get(b"Info").ok()?;
    let info_dict = document::resolve(doc, info).ok()?.as_dict().ok()?;
    let value = document::resolve(doc, info_dict.get(key).ok()?).ok()?;
    let bytes = value.as_str().ok()?;

    // UTF-16BE with byte order mark, otherwise treat as Latin-1
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units).ok()
    } else {
        Some(bytes.iter().map(|&b| b as char).collect())
    }
}

/// Extract metadata from an in-memory PDF
pub fn extract_metadata(source: &SourceFile) -> Result<PdfMetadata> {
    let doc = document::load(source)?;
    let page_count = count_pages_from_catalog(&doc)?;

    if page_count == 0 {
        return Err(Error::EmptyPdf(source.name.clone()));
    }

    Ok(PdfMetadata {
        page_count,
        reachable_pages: doc.get_pages().len(),
        version: doc.version.clone(),
        title: info_string(&doc, b"Title"),
        author: info_string(&doc, b"Author"),
    })
}

/// Count the number of pages in a PDF file
///
/// This is a quick operation that reads the Count field from the Pages dictionary.
pub fn count_pages(path: &Path) -> Result<usize> {
    let source = SourceFile::from_path(path)?;
    Ok(extract_metadata(&source)?.page_count)
}
