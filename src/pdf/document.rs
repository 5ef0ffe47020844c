//! Shared document plumbing on top of lopdf
//!
//! Loading and serializing, page lookup, page tree rebuilding and the
//! resource/content bookkeeping needed to draw on existing pages.

use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::layout::PageBox;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic /Parent chains in damaged files
const MAX_TREE_DEPTH: usize = 64;

/// A named input buffer
///
/// The name is only used to label errors and log lines.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self { name: name.into(), data }
    }

    /// Read a file from disk, naming it after its path
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            )));
        }
        let data = std::fs::read(path)?;
        Ok(Self::new(path.display().to_string(), data))
    }
}

/// Parse a named input into a document handle
pub fn load(source: &SourceFile) -> Result<Document> {
    let doc = Document::load_mem(&source.data).map_err(Error::in_file(&source.name))?;
    debug!(name = %source.name, pages = doc.get_pages().len(), "PDF loaded");
    Ok(doc)
}

/// Parse an unnamed buffer into a document handle
pub fn load_bytes(data: &[u8]) -> Result<Document> {
    Ok(Document::load_mem(data)?)
}

/// Serialize a document to bytes
pub fn serialize(doc: &mut Document) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

/// Number of pages reachable through the page tree
pub fn page_count(doc: &Document) -> u32 {
    doc.get_pages().len() as u32
}

/// Page object ids in page order
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Follow a reference to the object it names
pub fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

fn page_dict(doc: &Document, page_id: ObjectId) -> Result<&Dictionary> {
    Ok(doc.get_object(page_id)?.as_dict()?)
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary> {
    Ok(doc.get_object_mut(page_id)?.as_dict_mut()?)
}

/// Look up a page attribute, walking up the page tree when the page lacks it
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node_id = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_object(node_id).ok()?.as_dict().ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        node_id = node.get(b"Parent").ok()?.as_reference().ok()?;
    }
    warn!(?page_id, "page tree deeper than {} levels", MAX_TREE_DEPTH);
    None
}

/// Copy inherited attributes onto the page itself
///
/// Needed before a page is moved under a different parent, otherwise it
/// would silently lose its size, resources or rotation.
pub fn materialize_inherited(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut missing = Vec::new();
    {
        let page = page_dict(doc, page_id)?;
        for key in INHERITABLE_KEYS {
            if !page.has(key) {
                if let Some(value) = inherited_attribute(doc, page_id, key) {
                    missing.push((key, value));
                }
            }
        }
    }

    let page = page_dict_mut(doc, page_id)?;
    for (key, value) in missing {
        page.set(key.to_vec(), value);
    }
    Ok(())
}

/// Page size from the (possibly inherited) MediaBox, Letter when absent
pub fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|media_box| match resolve(doc, &media_box) {
            Ok(Object::Array(rect)) => PageBox::from_rect(rect),
            _ => None,
        })
        .unwrap_or_else(|| {
            debug!(?page_id, "page has no usable MediaBox, assuming Letter");
            PageBox::letter()
        })
}

fn catalog_id(doc: &Document) -> Result<ObjectId> {
    doc.trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| Error::General("No Root reference in trailer".to_string()))
}

/// Replace the document's page tree with a flat one holding `pages` in order
///
/// A page listed more than once is duplicated: later occurrences become new
/// page objects sharing the original's content and resources. Pages left out
/// become unreachable and are dropped by [`Document::prune_objects`].
pub fn rebuild_page_tree(doc: &mut Document, pages: &[ObjectId]) -> Result<()> {
    for &page_id in pages {
        materialize_inherited(doc, page_id)?;
    }

    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());
    let mut seen = std::collections::HashSet::new();

    for &page_id in pages {
        let kid_id = if seen.insert(page_id) {
            page_id
        } else {
            let copy = page_dict(doc, page_id)?.clone();
            doc.add_object(Object::Dictionary(copy))
        };
        page_dict_mut(doc, kid_id)?.set("Parent", Object::Reference(pages_id));
        kids.push(Object::Reference(kid_id));
    }

    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(kids.len() as i64));
    pages_object.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(pages_object));

    let catalog_id = catalog_id(doc)?;
    let catalog = doc.get_object_mut(catalog_id)?.as_dict_mut()?;
    catalog.set("Pages", Object::Reference(pages_id));
    Ok(())
}

/// Build a new document holding the given 1-based pages of `source`, in order
///
/// Page numbers must already be validated.
pub fn select_pages(source: &Document, pages: &[u32]) -> Result<Document> {
    let all = source.get_pages();
    let ids = pages
        .iter()
        .map(|number| {
            all.get(number).copied().ok_or(Error::PageOutOfRange {
                page: *number,
                page_count: all.len() as u32,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut doc = source.clone();
    rebuild_page_tree(&mut doc, &ids)?;
    doc.prune_objects();
    Ok(doc)
}

/// Add a Helvetica font object (one of the 14 standard PDF fonts)
pub fn helvetica_font(doc: &mut Document) -> ObjectId {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    doc.add_object(Object::Dictionary(font))
}

/// Add a graphics state setting fill and stroke opacity
pub fn opacity_state(doc: &mut Document, opacity: f32) -> ObjectId {
    let mut state = Dictionary::new();
    state.set("Type", Object::Name(b"ExtGState".to_vec()));
    state.set("ca", Object::Real(opacity));
    state.set("CA", Object::Real(opacity));
    doc.add_object(Object::Dictionary(state))
}

/// Register a resource under `category` (Font, ExtGState, XObject) on a page
///
/// The page gets its own direct Resources dictionary so that shared or
/// inherited resource dictionaries are not modified for other pages.
pub fn add_page_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    name: &str,
    resource_id: ObjectId,
) -> Result<()> {
    let mut resources = match inherited_attribute(doc, page_id, b"Resources") {
        Some(res) => match resolve(doc, &res)? {
            Object::Dictionary(dict) => dict.clone(),
            _ => Dictionary::new(),
        },
        None => Dictionary::new(),
    };

    let mut entries = match resources.get(category.as_bytes()) {
        Ok(entry) => match resolve(doc, entry)? {
            Object::Dictionary(dict) => dict.clone(),
            _ => Dictionary::new(),
        },
        Err(_) => Dictionary::new(),
    };
    entries.set(name, Object::Reference(resource_id));
    resources.set(category, Object::Dictionary(entries));

    page_dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(resources));
    Ok(())
}

fn content_refs(page: &Dictionary) -> Vec<Object> {
    match page.get(b"Contents") {
        Ok(Object::Array(items)) => items.clone(),
        Ok(single) => vec![single.clone()],
        Err(_) => Vec::new(),
    }
}

/// Draw `content` on top of a page's existing content
///
/// The existing content is bracketed by `q`/`Q` so any transformation it
/// leaves behind does not displace the overlay.
pub fn overlay_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), content));

    let page = page_dict_mut(doc, page_id)?;
    let existing = content_refs(page);

    let mut contents = Vec::with_capacity(existing.len() + 3);
    contents.push(Object::Reference(save_id));
    contents.extend(existing);
    contents.push(Object::Reference(restore_id));
    contents.push(Object::Reference(overlay_id));
    page.set("Contents", Object::Array(contents));
    Ok(())
}

/// Encode text for a WinAnsi-encoded string operand
///
/// Characters outside Latin-1 are replaced with `?`.
pub fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use lopdf::{Dictionary, Document, Object, Stream};

    /// Build a PDF whose page `i` (1-based) has MediaBox width `600 + i`
    ///
    /// The width tags each page so tests can check order after a reload.
    pub fn tagged_pdf(page_count: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();

        for i in 1..=page_count {
            let content = format!("BT /F1 12 Tf 72 720 Td (Page {}) Tj ET", i);
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(pages_id));
            page.set(
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(600 + i as i64),
                    Object::Integer(800),
                ]),
            );
            page.set("Contents", Object::Reference(content_id));
            kids.push(Object::Reference(doc.add_object(Object::Dictionary(page))));
        }

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(page_count as i64));
        pages.set("Kids", Object::Array(kids));
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    /// Build a 3-page PDF whose pages carry no attributes of their own
    ///
    /// The root Pages node holds a 500 x 700 MediaBox and an intermediate
    /// Pages node holds `/Rotate 90`; every page inherits both.
    pub fn nested_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let root_id = doc.new_object_id();
        let middle_id = doc.new_object_id();

        let mut kids = Vec::new();
        for i in 1..=3 {
            let content = format!("BT /F1 12 Tf 72 620 Td (Nested {}) Tj ET", i);
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(middle_id));
            page.set("Contents", Object::Reference(content_id));
            kids.push(Object::Reference(doc.add_object(Object::Dictionary(page))));
        }

        let mut middle = Dictionary::new();
        middle.set("Type", Object::Name(b"Pages".to_vec()));
        middle.set("Parent", Object::Reference(root_id));
        middle.set("Rotate", Object::Integer(90));
        middle.set("Count", Object::Integer(3));
        middle.set("Kids", Object::Array(kids));
        doc.objects.insert(middle_id, Object::Dictionary(middle));

        let mut root = Dictionary::new();
        root.set("Type", Object::Name(b"Pages".to_vec()));
        root.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(500),
                Object::Integer(700),
            ]),
        );
        root.set("Count", Object::Integer(3));
        root.set("Kids", Object::Array(vec![Object::Reference(middle_id)]));
        doc.objects.insert(root_id, Object::Dictionary(root));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(root_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    /// Page tags (MediaBox width minus 600) in page order
    pub fn page_tags(bytes: &[u8]) -> Vec<u32> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .values()
            .map(|id| super::page_box(&doc, *id).width as u32 - 600)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_select_pages_reorders_and_duplicates() {
        let doc = load_bytes(&tagged_pdf(5)).unwrap();
        let mut selected = select_pages(&doc, &[3, 1, 3]).unwrap();
        let bytes = serialize(&mut selected).unwrap();
        assert_eq!(page_tags(&bytes), vec![3, 1, 3]);
    }

    #[test]
    fn test_inherited_media_box_survives_rebuild() {
        let mut doc = load_bytes(&tagged_pdf(2)).unwrap();
        let ids = page_ids(&doc);

        // Move the MediaBox of page 1 up to the Pages node
        let media_box = page_dict_mut(&mut doc, ids[0]).unwrap().remove(b"MediaBox").unwrap();
        let parent = page_dict(&doc, ids[0]).unwrap().get(b"Parent").unwrap().as_reference().unwrap();
        doc.get_object_mut(parent).unwrap().as_dict_mut().unwrap().set("MediaBox", media_box);

        rebuild_page_tree(&mut doc, &[ids[0]]).unwrap();
        doc.prune_objects();
        assert_eq!(page_box(&doc, ids[0]).width, 601.0);
    }

    #[test]
    fn test_overlay_wraps_existing_content() {
        let mut doc = load_bytes(&tagged_pdf(1)).unwrap();
        let page_id = page_ids(&doc)[0];
        overlay_content(&mut doc, page_id, b"BT ET".to_vec()).unwrap();

        let contents = page_dict(&doc, page_id).unwrap().get(b"Contents").unwrap();
        assert_eq!(contents.as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_add_page_resource_keeps_existing_entries() {
        let mut doc = load_bytes(&tagged_pdf(1)).unwrap();
        let page_id = page_ids(&doc)[0];
        let font_a = helvetica_font(&mut doc);
        let font_b = helvetica_font(&mut doc);
        add_page_resource(&mut doc, page_id, "Font", "A", font_a).unwrap();
        add_page_resource(&mut doc, page_id, "Font", "B", font_b).unwrap();

        let resources = page_dict(&doc, page_id).unwrap().get(b"Resources").unwrap();
        let fonts = resources.as_dict().unwrap().get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.has(b"A"));
        assert!(fonts.has(b"B"));
    }

    #[test]
    fn test_win_ansi_bytes() {
        assert_eq!(win_ansi_bytes("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(win_ansi_bytes("→"), vec![b'?']);
    }
}
