//! PDF Workbench Library
//!
//! A library of PDF tools built on lopdf. It provides functionality to:
//! - Merge PDFs, split them by range or into single pages
//! - Extract, reorder, delete and rotate pages
//! - Stamp watermarks and page numbers
//! - Compress documents with object streams
//! - Build PDFs from PNG/JPEG images
//! - Run OCR over images and scanned PDFs, and add a searchable text layer
//!
//! Every tool takes the input as bytes and returns new bytes; the input is
//! never modified. Page selections are validated in full before anything is
//! changed.
//!
//! # Example
//!
//! ```no_run
//! use pdf_workbench::pdf::extract_pages;
//!
//! let input = std::fs::read("report.pdf").unwrap();
//! // Pages 3 then 1
//! let output = extract_pages(&input, &[3, 1]).expect("Failed to extract pages");
//! std::fs::write("reordered.pdf", output).unwrap();
//! ```

pub mod error;
pub mod layout;
pub mod ocr;
pub mod pages;
pub mod payment;
pub mod pdf;
pub mod session;
pub mod tools;

// Re-export commonly used items
pub use error::{Error, Result};
pub use pages::PageRange;
pub use tools::Tool;
