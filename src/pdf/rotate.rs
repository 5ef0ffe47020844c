//! Page rotation

use lopdf::{Document, Object, ObjectId};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::pages;
use crate::pdf::document;

/// Clockwise rotation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Quarter,
    Half,
    ThreeQuarters,
}

impl Rotation {
    pub fn degrees(self) -> i64 {
        match self {
            Rotation::Quarter => 90,
            Rotation::Half => 180,
            Rotation::ThreeQuarters => 270,
        }
    }
}

impl TryFrom<i64> for Rotation {
    type Error = Error;

    fn try_from(degrees: i64) -> Result<Self> {
        match degrees {
            90 => Ok(Rotation::Quarter),
            180 => Ok(Rotation::Half),
            270 => Ok(Rotation::ThreeQuarters),
            other => Err(Error::InvalidRotation(other)),
        }
    }
}

/// Stored /Rotate angle of a page, following page tree inheritance
pub fn page_rotation(doc: &Document, page_id: ObjectId) -> i64 {
    document::inherited_attribute(doc, page_id, b"Rotate")
        .and_then(|angle| document::resolve(doc, &angle).ok()?.as_i64().ok())
        .unwrap_or(0)
}

/// Rotate pages by adding `rotation` to their stored angle
///
/// `indices` are 0-based page positions; `None` rotates every page. All
/// indices are validated before any page is touched. Angles are added
/// without normalizing, so 270 + 180 is stored as 450; readers treat the
/// value modulo 360.
pub fn rotate_pages(data: &[u8], rotation: Rotation, indices: Option<&[usize]>) -> Result<Vec<u8>> {
    let mut doc = document::load_bytes(data)?;
    let page_count = document::page_count(&doc);
    let page_ids = document::page_ids(&doc);

    let targets: Vec<usize> = match indices {
        Some(indices) => {
            pages::validate_page_indices(indices, page_count)?;
            let mut targets = indices.to_vec();
            targets.sort_unstable();
            targets.dedup();
            targets
        }
        None => (0..page_ids.len()).collect(),
    };

    for &index in &targets {
        let page_id = page_ids[index];
        let existing = page_rotation(&doc, page_id);
        let updated = existing.checked_add(rotation.degrees()).ok_or_else(|| {
            Error::InvalidOption(format!(
                "page {} has an unusable /Rotate value {}",
                index + 1,
                existing
            ))
        })?;

        doc.get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Rotate", Object::Integer(updated));
        debug!(page = index + 1, existing, updated, "page rotated");
    }

    let bytes = document::serialize(&mut doc)?;
    info!(pages = targets.len(), degrees = rotation.degrees(), "rotated pages");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::document::test_support::{nested_pdf, tagged_pdf};

    fn rotations(bytes: &[u8]) -> Vec<i64> {
        let doc = document::load_bytes(bytes).unwrap();
        document::page_ids(&doc)
            .into_iter()
            .map(|id| page_rotation(&doc, id))
            .collect()
    }

    #[test]
    fn test_rotation_is_additive() {
        let once = rotate_pages(&tagged_pdf(2), Rotation::Quarter, Some(&[0])).unwrap();
        let twice = rotate_pages(&once, Rotation::Half, Some(&[0])).unwrap();
        assert_eq!(rotations(&twice), vec![270, 0]);
    }

    #[test]
    fn test_rotation_is_not_normalized() {
        let once = rotate_pages(&tagged_pdf(1), Rotation::ThreeQuarters, None).unwrap();
        let twice = rotate_pages(&once, Rotation::Half, None).unwrap();
        assert_eq!(rotations(&twice), vec![450]);
    }

    #[test]
    fn test_rotate_all_by_default() {
        let out = rotate_pages(&tagged_pdf(3), Rotation::Half, None).unwrap();
        assert_eq!(rotations(&out), vec![180, 180, 180]);
    }

    #[test]
    fn test_out_of_range_index_rejects_call() {
        let err = rotate_pages(&tagged_pdf(3), Rotation::Quarter, Some(&[0, 3])).unwrap_err();
        assert!(matches!(err, Error::PageOutOfRange { page: 4, page_count: 3 }));
    }

    #[test]
    fn test_overflowing_stored_angle_is_an_error() {
        let mut doc = document::load_bytes(&tagged_pdf(2)).unwrap();
        let page_id = document::page_ids(&doc)[1];
        doc.get_object_mut(page_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("Rotate", Object::Integer(i64::MAX));
        let data = document::serialize(&mut doc).unwrap();

        let err = rotate_pages(&data, Rotation::Quarter, None).unwrap_err();
        assert!(matches!(err, Error::InvalidOption(_)));
    }

    #[test]
    fn test_inherited_angle_is_the_base() {
        let out = rotate_pages(&nested_pdf(), Rotation::Half, Some(&[0])).unwrap();
        assert_eq!(rotations(&out), vec![270, 90, 90]);
    }

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::try_from(270).unwrap(), Rotation::ThreeQuarters);
        assert!(matches!(Rotation::try_from(45), Err(Error::InvalidRotation(45))));
    }
}
