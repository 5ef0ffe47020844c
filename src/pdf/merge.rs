//! PDF merging functionality using lopdf

use std::collections::BTreeMap;
use std::path::PathBuf;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::pdf::document::{self, SourceFile};

/// Minimum number of inputs a merge accepts
pub const MIN_MERGE_INPUTS: usize = 2;

/// Options for merging PDF files on disk
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Input PDF file paths in the order they should be merged
    pub input_paths: Vec<PathBuf>,
    /// Output PDF file path
    pub output_path: PathBuf,
}

/// Merge PDF documents into one, keeping input order and page order
///
/// Based on the lopdf merge example:
/// https://github.com/J-F-Liu/lopdf/blob/main/examples/merge.rs
///
/// Every input's objects are renumbered into a shared id space and a fresh
/// catalog and page tree are built over all pages.
///
/// # Example
///
/// ```no_run
/// use pdf_workbench::pdf::{merge, SourceFile};
///
/// let inputs = vec![
///     SourceFile::new("a.pdf", std::fs::read("a.pdf").unwrap()),
///     SourceFile::new("b.pdf", std::fs::read("b.pdf").unwrap()),
/// ];
/// let merged: Vec<u8> = merge(&inputs).expect("Failed to merge");
/// ```
pub fn merge(inputs: &[SourceFile]) -> Result<Vec<u8>> {
    if inputs.len() < MIN_MERGE_INPUTS {
        return Err(Error::TooFewInputs {
            required: MIN_MERGE_INPUTS,
            actual: inputs.len(),
        });
    }

    // Load all documents
    let mut documents: Vec<Document> = Vec::with_capacity(inputs.len());
    for input in inputs {
        let mut doc = document::load(input)?;
        let pages = document::page_ids(&doc);

        if pages.is_empty() {
            return Err(Error::EmptyPdf(input.name.clone()));
        }

        // Pages are about to lose their parents; pull inherited attributes down first
        for page_id in pages {
            document::materialize_inherited(&mut doc, page_id)?;
        }

        documents.push(doc);
    }

    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        // Renumber objects in this document to avoid conflicts
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        page_ids.extend(doc.get_pages().into_values());
        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.7");
    merged.objects.extend(objects);

    // Keep new_object_id() above every id we just inserted
    merged.max_id = max_id - 1;

    let pages_id = merged.new_object_id();
    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();

    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(page_ids.len() as i64));
    pages_object.set("Kids", Object::Array(kids));

    let catalog_id = merged.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    merged.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged.objects.insert(pages_id, Object::Dictionary(pages_object));
    merged.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in &page_ids {
        if let Ok(Object::Dictionary(dict)) = merged.get_object_mut(page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    // Old catalogs and page tree nodes are now unreachable
    let pruned = merged.prune_objects();
    debug!(pruned = pruned.len(), "dropped unreachable objects");

    merged.compress();
    let bytes = document::serialize(&mut merged)?;

    info!(inputs = inputs.len(), pages = page_ids.len(), "merged PDFs");
    Ok(bytes)
}

/// Merge PDF files on disk into a single output file
pub fn merge_files(options: &MergeOptions) -> Result<()> {
    if options.input_paths.len() < MIN_MERGE_INPUTS {
        return Err(Error::TooFewInputs {
            required: MIN_MERGE_INPUTS,
            actual: options.input_paths.len(),
        });
    }

    let inputs = options
        .input_paths
        .iter()
        .map(|path| SourceFile::from_path(path))
        .collect::<Result<Vec<_>>>()?;

    let merged = merge(&inputs)?;
    std::fs::write(&options.output_path, merged)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::document::test_support::{nested_pdf, page_tags, tagged_pdf};

    #[test]
    fn test_merge_keeps_input_and_page_order() {
        let inputs = vec![
            SourceFile::new("two.pdf", tagged_pdf(2)),
            SourceFile::new("three.pdf", tagged_pdf(3)),
        ];
        let merged = merge(&inputs).unwrap();
        assert_eq!(page_tags(&merged), vec![1, 2, 1, 2, 3]);
    }

    #[test]
    fn test_merge_keeps_inherited_attributes() {
        let inputs = vec![
            SourceFile::new("a.pdf", nested_pdf()),
            SourceFile::new("b.pdf", nested_pdf()),
        ];
        let merged = document::load_bytes(&merge(&inputs).unwrap()).unwrap();
        let page_ids = document::page_ids(&merged);
        assert_eq!(page_ids.len(), 6);

        for page_id in page_ids {
            let page = merged.get_object(page_id).unwrap().as_dict().unwrap();
            assert_eq!(page.get(b"Rotate").unwrap().as_i64().unwrap(), 90);
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            assert_eq!(media_box[2].as_i64().unwrap(), 500);
            assert_eq!(media_box[3].as_i64().unwrap(), 700);
        }
    }

    #[test]
    fn test_merge_rejects_single_input() {
        let inputs = vec![SourceFile::new("only.pdf", tagged_pdf(2))];
        let err = merge(&inputs).unwrap_err();
        assert!(matches!(err, Error::TooFewInputs { required: 2, actual: 1 }));
    }

    #[test]
    fn test_merge_names_unparseable_input() {
        let inputs = vec![
            SourceFile::new("good.pdf", tagged_pdf(1)),
            SourceFile::new("broken.pdf", b"not a pdf".to_vec()),
        ];
        let err = merge(&inputs).unwrap_err();
        assert!(err.to_string().contains("broken.pdf"), "{}", err);
        assert!(!err.is_validation());
    }

    #[test]
    fn test_merge_options_creation() {
        let options = MergeOptions {
            input_paths: vec![PathBuf::from("test1.pdf")],
            output_path: PathBuf::from("merged.pdf"),
        };
        assert!(matches!(merge_files(&options), Err(Error::TooFewInputs { .. })));
    }
}
