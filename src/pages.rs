//! Page number validation and translation
//!
//! Callers address pages with 1-based ordinals; the document engine works
//! with 0-based positions. Every selection is validated in full against the
//! document's page count before anything is mutated.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Inclusive range of 1-based page numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Range covering a single page
    pub fn single(page: u32) -> Self {
        Self { start: page, end: page }
    }

    /// Number of pages covered; zero for a backwards range
    pub fn len(&self) -> u32 {
        if self.end < self.start {
            return 0;
        }
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Page numbers in ascending order
    pub fn pages(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }

    /// Check `1 <= start <= end <= page_count`
    pub fn validate(&self, page_count: u32) -> Result<()> {
        if self.start < 1 || self.start > self.end || self.end > page_count {
            return Err(Error::InvalidRange {
                start: self.start,
                end: self.end,
                page_count,
            });
        }
        Ok(())
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

impl FromStr for PageRange {
    type Err = Error;

    /// Parse `"4"` or `"1-3"`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|_| Error::InvalidOption(format!("not a page number: {:?}", part.trim())))
        };

        match s.split_once('-') {
            Some((start, end)) => Ok(Self::new(parse(start)?, parse(end)?)),
            None => Ok(Self::single(parse(s)?)),
        }
    }
}

/// Validate every range against the page count; the first bad range rejects all
pub fn validate_ranges(ranges: &[PageRange], page_count: u32) -> Result<()> {
    if ranges.is_empty() {
        return Err(Error::EmptySelection("page ranges"));
    }
    ranges.iter().try_for_each(|range| range.validate(page_count))
}

/// Validate every 1-based page number against the page count
pub fn validate_page_numbers(pages: &[u32], page_count: u32) -> Result<()> {
    if pages.is_empty() {
        return Err(Error::EmptySelection("page numbers"));
    }
    for &page in pages {
        if page < 1 || page > page_count {
            return Err(Error::PageOutOfRange { page, page_count });
        }
    }
    Ok(())
}

/// Validate 0-based page indices against the page count
///
/// Errors report the offending page in 1-based terms.
pub fn validate_page_indices(indices: &[usize], page_count: u32) -> Result<()> {
    if indices.is_empty() {
        return Err(Error::EmptySelection("page indices"));
    }
    for &index in indices {
        if index >= page_count as usize {
            return Err(Error::PageOutOfRange {
                page: u32::try_from(index).map_or(u32::MAX, |i| i.saturating_add(1)),
                page_count,
            });
        }
    }
    Ok(())
}

/// Translate a validated 1-based page number to a 0-based index
pub(crate) fn to_index(page: u32) -> usize {
    page.saturating_sub(1) as usize
}

/// Validate 1-based page numbers, then translate them to 0-based indices
pub fn to_indices(pages: &[u32], page_count: u32) -> Result<Vec<usize>> {
    validate_page_numbers(pages, page_count)?;
    Ok(pages.iter().map(|&page| to_index(page)).collect())
}

/// Page numbers for deletion: deduplicated, highest first
///
/// Removing pages from the highest number down keeps the numbers of the
/// pages still pending removal stable.
pub fn deletion_order(pages: &[u32]) -> Vec<u32> {
    let mut order = pages.to_vec();
    order.sort_unstable_by(|a, b| b.cmp(a));
    order.dedup();
    order
}

/// Parse a page list such as `"1,3,5-7"` into ranges, keeping the given order
pub fn parse_page_list(list: &str) -> Result<Vec<PageRange>> {
    list.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(PageRange::from_str)
        .collect()
}

/// Flatten ranges into individual page numbers, keeping order
///
/// Ranges written backwards (`"5-3"`) expand in descending order so a
/// caller can request reversed extraction.
pub fn expand_ranges(ranges: &[PageRange]) -> Vec<u32> {
    let mut pages = Vec::new();
    for range in ranges {
        if range.start <= range.end {
            pages.extend(range.start..=range.end);
        } else {
            pages.extend((range.end..=range.start).rev());
        }
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_validation() {
        assert!(PageRange::new(1, 3).validate(10).is_ok());
        assert!(PageRange::new(4, 10).validate(10).is_ok());

        let err = PageRange::new(5, 3).validate(10).unwrap_err();
        assert!(matches!(err, Error::InvalidRange { start: 5, end: 3, page_count: 10 }));

        assert!(PageRange::new(0, 2).validate(10).is_err());
        assert!(PageRange::new(9, 11).validate(10).is_err());
    }

    #[test]
    fn test_validate_ranges_rejects_on_first_bad_range() {
        let ranges = [PageRange::new(1, 3), PageRange::new(8, 12), PageRange::new(0, 1)];
        let err = validate_ranges(&ranges, 10).unwrap_err();
        assert!(matches!(err, Error::InvalidRange { start: 8, end: 12, .. }));
        assert!(matches!(validate_ranges(&[], 10), Err(Error::EmptySelection(_))));
    }

    #[test]
    fn test_validate_page_numbers() {
        assert!(validate_page_numbers(&[3, 1, 3], 5).is_ok());
        let err = validate_page_numbers(&[1, 6], 5).unwrap_err();
        assert!(matches!(err, Error::PageOutOfRange { page: 6, page_count: 5 }));
        assert!(validate_page_numbers(&[0], 5).is_err());
    }

    #[test]
    fn test_validate_page_indices_reports_one_based() {
        assert!(validate_page_indices(&[0, 4], 5).is_ok());
        let err = validate_page_indices(&[5], 5).unwrap_err();
        assert!(matches!(err, Error::PageOutOfRange { page: 6, page_count: 5 }));
    }

    #[test]
    fn test_deletion_order_is_descending_and_unique() {
        assert_eq!(deletion_order(&[2, 4, 2, 1]), vec![4, 2, 1]);
    }

    #[test]
    fn test_parse_page_list() {
        let ranges = parse_page_list("1, 3,5-7").unwrap();
        assert_eq!(
            ranges,
            vec![PageRange::single(1), PageRange::single(3), PageRange::new(5, 7)]
        );
        assert_eq!(expand_ranges(&ranges), vec![1, 3, 5, 6, 7]);
        assert!(parse_page_list("1,x").is_err());
    }

    #[test]
    fn test_expand_reversed_range() {
        assert_eq!(expand_ranges(&[PageRange::new(3, 1)]), vec![3, 2, 1]);
    }

    #[test]
    fn test_range_display() {
        assert_eq!(PageRange::new(2, 5).to_string(), "2-5");
        assert_eq!(PageRange::single(4).to_string(), "4");
        assert_eq!(PageRange::new(1, 3).len(), 3);
    }

    #[test]
    fn test_backwards_range_is_empty() {
        assert_eq!(PageRange::new(5, 3).len(), 0);
        assert!(PageRange::new(5, 3).is_empty());
        assert!(!PageRange::single(1).is_empty());
    }

    #[test]
    fn test_to_indices_rejects_page_zero() {
        assert_eq!(to_indices(&[1, 4], 4).unwrap(), vec![0, 3]);
        let pages = expand_ranges(&parse_page_list("0").unwrap());
        let err = to_indices(&pages, 4).unwrap_err();
        assert!(matches!(err, Error::PageOutOfRange { page: 0, page_count: 4 }));
    }
}
