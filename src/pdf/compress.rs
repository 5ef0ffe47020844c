//! Size reduction through the PDF engine's serializer
//!
//! Nothing here compresses content by itself: unreachable objects are
//! dropped, streams are Flate-encoded and the document is written with
//! object streams, which pack many small objects into one compressed stream.

use std::fmt;
use std::str::FromStr;

use lopdf::SaveOptions;
use tracing::info;

use crate::error::{Error, Result};
use crate::pdf::document;

/// Compression quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl CompressionLevel {
    /// Objects packed into each object stream
    pub fn objects_per_batch(self) -> usize {
        match self {
            CompressionLevel::Low => 50,
            CompressionLevel::Medium => 100,
            CompressionLevel::High => 200,
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompressionLevel::Low => "low",
            CompressionLevel::Medium => "medium",
            CompressionLevel::High => "high",
        };
        f.write_str(name)
    }
}

impl FromStr for CompressionLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(CompressionLevel::Low),
            "medium" => Ok(CompressionLevel::Medium),
            "high" => Ok(CompressionLevel::High),
            other => Err(Error::InvalidOption(format!(
                "unknown compression level {:?} (expected low, medium or high)",
                other
            ))),
        }
    }
}

/// Rewrite a document with object streams and compressed content streams
pub fn compress(data: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
    let mut doc = document::load_bytes(data)?;
    let page_count = document::page_count(&doc);

    doc.prune_objects();
    doc.delete_zero_length_streams();
    doc.compress();

    let options = SaveOptions::builder()
        .use_object_streams(true)
        .use_xref_streams(true)
        .max_objects_per_stream(level.objects_per_batch())
        .build();

    let mut buffer = Vec::new();
    doc.save_with_options(&mut buffer, options)?;

    info!(
        page_count,
        %level,
        before = data.len(),
        after = buffer.len(),
        "compressed PDF"
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::document::test_support::{page_tags, tagged_pdf};

    #[test]
    fn test_level_mapping() {
        assert_eq!(CompressionLevel::Low.objects_per_batch(), 50);
        assert_eq!(CompressionLevel::Medium.objects_per_batch(), 100);
        assert_eq!(CompressionLevel::High.objects_per_batch(), 200);
        assert_eq!("HIGH".parse::<CompressionLevel>().unwrap(), CompressionLevel::High);
        assert!("max".parse::<CompressionLevel>().is_err());
    }

    #[test]
    fn test_compress_twice_keeps_pages() {
        let once = compress(&tagged_pdf(4), CompressionLevel::Medium).unwrap();
        let twice = compress(&once, CompressionLevel::Medium).unwrap();
        assert_eq!(page_tags(&once), vec![1, 2, 3, 4]);
        assert_eq!(page_tags(&twice), vec![1, 2, 3, 4]);
    }
}
