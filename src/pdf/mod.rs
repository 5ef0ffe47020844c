//! PDF manipulation module

pub mod compress;
pub mod document;
pub mod images;
pub mod merge;
pub mod metadata;
pub mod rotate;
pub mod split;
pub mod stamp;

// Re-export commonly used items
pub use compress::{compress, CompressionLevel};
pub use document::SourceFile;
pub use images::images_to_pdf;
pub use merge::{merge, merge_files, MergeOptions};
pub use metadata::{count_pages, extract_metadata, PdfMetadata};
pub use rotate::{rotate_pages, Rotation};
pub use split::{delete_pages, extract_pages, split_pages, split_ranges};
pub use stamp::{add_page_numbers, add_watermark, PageNumberOptions, WatermarkOptions};
