//! Registry of the available tools
//!
//! Every tool has a fixed identifier used by the CLI and by front ends to
//! refer to it. Identifiers are fixed per variant, so an unknown identifier is
//! an error instead of silently matching nothing.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A PDF tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Merge,
    Split,
    Burst,
    Extract,
    Delete,
    Rotate,
    Watermark,
    PageNumbers,
    Compress,
    ImagesToPdf,
    Ocr,
}

/// Every tool, in display order
const ALL: [Tool; 11] = [
    Tool::Merge,
    Tool::Split,
    Tool::Burst,
    Tool::Extract,
    Tool::Delete,
    Tool::Rotate,
    Tool::Watermark,
    Tool::PageNumbers,
    Tool::Compress,
    Tool::ImagesToPdf,
    Tool::Ocr,
];

impl Tool {
    /// All tools in display order
    pub fn all() -> impl Iterator<Item = Tool> {
        ALL.into_iter()
    }

    pub fn id(self) -> &'static str {
        match self {
            Tool::Merge => "merge",
            Tool::Split => "split",
            Tool::Burst => "burst",
            Tool::Extract => "extract",
            Tool::Delete => "delete",
            Tool::Rotate => "rotate",
            Tool::Watermark => "watermark",
            Tool::PageNumbers => "number",
            Tool::Compress => "compress",
            Tool::ImagesToPdf => "images",
            Tool::Ocr => "ocr",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Tool::Merge => "Merge PDF",
            Tool::Split => "Split PDF",
            Tool::Burst => "Split into pages",
            Tool::Extract => "Extract pages",
            Tool::Delete => "Delete pages",
            Tool::Rotate => "Rotate pages",
            Tool::Watermark => "Add watermark",
            Tool::PageNumbers => "Add page numbers",
            Tool::Compress => "Compress PDF",
            Tool::ImagesToPdf => "Images to PDF",
            Tool::Ocr => "OCR",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Tool::Merge => "Combine several PDFs into one, in order",
            Tool::Split => "Write each page range to its own PDF",
            Tool::Burst => "Write every page to its own PDF",
            Tool::Extract => "Copy selected pages, in the order given, to a new PDF",
            Tool::Delete => "Remove selected pages from a PDF",
            Tool::Rotate => "Turn pages by 90, 180 or 270 degrees",
            Tool::Watermark => "Stamp text diagonally across every page",
            Tool::PageNumbers => "Print page numbers at the top or bottom of every page",
            Tool::Compress => "Rewrite a PDF with compressed object streams",
            Tool::ImagesToPdf => "Turn PNG and JPEG images into PDF pages",
            Tool::Ocr => "Recognize text in scanned images and PDFs",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Tool {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        ALL.into_iter()
            .find(|tool| tool.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownTool(s.to_string()))
    }
}
