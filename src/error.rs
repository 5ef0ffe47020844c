//! Error types for the PDF workbench library

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the PDF workbench library
///
/// Variants fall into two families: input validation failures, raised before
/// any document is mutated, and failures reported by the underlying engines
/// (PDF parser/writer, image decoder, recognizer, renderer).
#[derive(Error, Debug)]
pub enum Error {
    /// Page number outside `1..=page_count`
    #[error("Page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    /// Range with start after end, a zero start, or an end past the last page
    #[error("Invalid page range {start}-{end} (document has {page_count} pages)")]
    InvalidRange { start: u32, end: u32, page_count: u32 },

    /// Not enough input files for the operation
    #[error("At least {required} files are required, got {actual}")]
    TooFewInputs { required: usize, actual: usize },

    /// An operation was given nothing to work on
    #[error("No {0} provided")]
    EmptySelection(&'static str),

    /// Image is neither PNG nor JPEG
    #[error("Unsupported image format: {name} (only PNG and JPEG are accepted)")]
    UnsupportedImage { name: String },

    /// Rotation delta outside {90, 180, 270}
    #[error("Invalid rotation: {0} degrees (expected 90, 180 or 270)")]
    InvalidRotation(i64),

    /// Option value outside its accepted domain
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {0}")]
    EmptyPdf(String),

    /// Tool identifier with no registered tool
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Required field missing or empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// PDF processing error tied to a named input
    #[error("PDF error in {name}: {source}")]
    PdfSource {
        name: String,
        #[source]
        source: lopdf::Error,
    },

    /// Image decoding error tied to a named input
    #[error("Image error in {name}: {source}")]
    Image {
        name: String,
        #[source]
        source: image::ImageError,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Text recognition failed
    #[error("OCR error: {0}")]
    Ocr(String),

    /// Page rendering failed
    #[error("Render error: {0}")]
    Rasterize(String),

    /// Malformed document structure
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Whether this error was raised while validating caller input
    ///
    /// Validation errors never leave a partially applied result behind and
    /// can be fixed by the caller and retried.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::PageOutOfRange { .. }
                | Error::InvalidRange { .. }
                | Error::TooFewInputs { .. }
                | Error::EmptySelection(_)
                | Error::UnsupportedImage { .. }
                | Error::InvalidRotation(_)
                | Error::InvalidOption(_)
                | Error::EmptyPdf(_)
                | Error::UnknownTool(_)
                | Error::MissingField(_)
        )
    }

    /// Attach a source file name to a bare PDF engine error
    pub(crate) fn in_file(name: &str) -> impl FnOnce(lopdf::Error) -> Error + '_ {
        move |source| Error::PdfSource {
            name: name.to_string(),
            source,
        }
    }
}
