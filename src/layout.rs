//! Page geometry and text placement calculations
//!
//! All values are PDF user-space points (1/72 inch) with the origin at the
//! bottom-left corner of the page box.

use lopdf::Object;

/// Distance of page numbers from the top or bottom edge
pub const PAGE_NUMBER_MARGIN: f32 = 30.0;

/// A page box (MediaBox) in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PageBox {
    pub fn new(width: f32, height: f32) -> Self {
        Self { x: 0.0, y: 0.0, width, height }
    }

    /// US Letter size (8.5" × 11")
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    /// A4 size (210mm × 297mm)
    pub fn a4() -> Self {
        Self::new(595.28, 841.89)
    }

    /// Build from a `[llx lly urx ury]` array
    ///
    /// Returns `None` when the array is malformed. Corners given in the
    /// "wrong" order are normalized.
    pub fn from_rect(rect: &[Object]) -> Option<Self> {
        if rect.len() != 4 {
            return None;
        }
        let nums: Vec<f32> = rect.iter().filter_map(|o| o.as_float().ok()).collect();
        if nums.len() != 4 {
            return None;
        }
        let (x0, x1) = (nums[0].min(nums[2]), nums[0].max(nums[2]));
        let (y0, y1) = (nums[1].min(nums[3]), nums[1].max(nums[3]));
        Some(Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }

    /// As a `[llx lly urx ury]` array
    pub fn to_rect(&self) -> Vec<Object> {
        vec![
            Object::Real(self.x),
            Object::Real(self.y),
            Object::Real(self.x + self.width),
            Object::Real(self.y + self.height),
        ]
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }
}

/// Edge of the page that page numbers are drawn against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalPosition {
    Top,
    #[default]
    Bottom,
}

/// Rough watermark text width: one quarter of the font size per character
///
/// This is the sizing the watermark tool has always used; it keeps long
/// watermarks roughly centered without measuring glyphs.
pub fn estimate_watermark_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size / 4.0
}

/// Text origin for a watermark centered on the page
pub fn watermark_origin(page: &PageBox, text: &str, font_size: f32) -> (f32, f32) {
    let text_width = estimate_watermark_width(text, font_size);
    (page.center_x() - text_width / 2.0, page.center_y())
}

/// Text origin for a page number centered horizontally near an edge
pub fn page_number_origin(
    page: &PageBox,
    text: &str,
    font_size: f32,
    position: VerticalPosition,
) -> (f32, f32) {
    let x = page.center_x() - helvetica_text_width(text, font_size) / 2.0;
    let y = match position {
        VerticalPosition::Bottom => page.y + PAGE_NUMBER_MARGIN,
        VerticalPosition::Top => page.y + page.height - PAGE_NUMBER_MARGIN,
    };
    (x, y)
}

/// Measured width of ASCII text set in Helvetica
///
/// Characters outside printable ASCII are counted at the average width.
pub fn helvetica_text_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| {
            let code = c as u32;
            if (32..=126).contains(&code) {
                HELVETICA_WIDTHS[(code - 32) as usize] as u32
            } else {
                556
            }
        })
        .sum();
    units as f32 * font_size / 1000.0
}

/// Helvetica advance widths for codes 32..=126, in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, // space ! " # $ % & '
    333, 333, 389, 584, 278, 333, 278, 278, // ( ) * + , - . /
    556, 556, 556, 556, 556, 556, 556, 556, // 0-7
    556, 556, 278, 278, 584, 584, 584, 556, // 8 9 : ; < = > ?
    1015, 667, 667, 722, 722, 667, 611, 778, // @ A-G
    722, 278, 500, 667, 556, 833, 722, 778, // H-O
    667, 778, 722, 667, 611, 722, 667, 944, // P-W
    667, 667, 611, 278, 278, 278, 469, 556, // X Y Z [ \ ] ^ _
    333, 556, 556, 500, 556, 556, 278, 556, // ` a-g
    556, 222, 222, 500, 222, 833, 556, 556, // h-o
    556, 556, 333, 500, 278, 556, 500, 722, // p-w
    500, 500, 500, 334, 260, 334, 584, // x y z { | } ~
];
