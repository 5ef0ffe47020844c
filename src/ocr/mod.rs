//! OCR orchestration
//!
//! Images are recognized directly. PDFs are rendered page by page at a
//! fixed upscale and each rendering is recognized, giving one result per
//! page. The recognizer is acquired once per call and always terminated.

pub mod raster;
pub mod recognizer;
pub mod text_layer;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::pdf::SourceFile;

pub use raster::Rasterizer;
pub use recognizer::{Recognition, Recognizer, RecognizerGuard, TesseractRecognizer};
pub use text_layer::add_text_layer;

/// Language used when none is given
pub const DEFAULT_LANGUAGE: &str = "eng";

/// PDF pages are rendered at this multiple of their natural size
pub const RENDER_SCALE: f32 = 2.0;

/// Options for [`recognize`]
#[derive(Debug, Clone)]
pub struct OcrOptions {
    /// Tesseract-style language code, e.g. "eng" or "deu+fra"
    pub language: String,
    /// Upscale factor for rendering PDF pages
    pub scale: f32,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            scale: RENDER_SCALE,
        }
    }
}

/// Recognized text of one page
#[derive(Debug, Clone, PartialEq)]
pub struct OcrPageResult {
    /// 1-based page number; always 1 for image input
    pub page_number: u32,
    pub text: String,
    /// Confidence score, 0 to 100
    pub confidence: f32,
}

/// What kind of file was handed to OCR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Pdf,
    Image,
}

/// Classify input by its leading bytes
///
/// PDF headers may be preceded by junk, so `%PDF-` is accepted anywhere in
/// the first kilobyte.
pub fn input_kind(source: &SourceFile) -> Result<InputKind> {
    let head = &source.data[..source.data.len().min(1024)];
    if head.windows(5).any(|w| w == b"%PDF-") {
        return Ok(InputKind::Pdf);
    }
    if image::guess_format(&source.data).is_ok() {
        return Ok(InputKind::Image);
    }
    Err(Error::UnsupportedImage {
        name: source.name.clone(),
    })
}

/// Percentage done after `done` of `total` pages
fn percent(done: u32, total: u32) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) as u64 * 100) / total as u64) as u8
}

/// Run OCR over an image or every page of a PDF
///
/// `acquire` starts a recognizer for the requested language; it is
/// terminated before this function returns, whether recognition succeeded
/// or not. `progress` receives 0 before work starts, then increasing
/// percentages, ending with 100 on success.
pub fn recognize<R, A>(
    source: &SourceFile,
    options: &OcrOptions,
    acquire: A,
    rasterizer: Option<&dyn Rasterizer>,
    mut progress: Option<&mut dyn FnMut(u8)>,
) -> Result<Vec<OcrPageResult>>
where
    R: Recognizer,
    A: FnOnce(&str) -> Result<R>,
{
    let kind = input_kind(source)?;
    let language = if options.language.trim().is_empty() {
        DEFAULT_LANGUAGE
    } else {
        options.language.trim()
    };

    // Consecutive equal values are reported once
    let mut last_reported: Option<u8> = None;
    let mut report = |value: u8| {
        if last_reported == Some(value) {
            return;
        }
        last_reported = Some(value);
        if let Some(callback) = progress.as_mut() {
            callback(value);
        }
    };

    let results = match kind {
        InputKind::Image => {
            let image = image::load_from_memory(&source.data).map_err(|e| Error::Image {
                name: source.name.clone(),
                source: e,
            })?;

            let mut recognizer = RecognizerGuard::new(acquire(language)?);
            report(0);
            let recognition = recognizer.recognize(&image)?;
            report(100);

            vec![OcrPageResult {
                page_number: 1,
                text: recognition.text,
                confidence: recognition.confidence,
            }]
        }
        InputKind::Pdf => {
            let rasterizer = rasterizer.ok_or_else(|| {
                Error::Rasterize("no page renderer available for PDF input".to_string())
            })?;

            let mut recognizer = RecognizerGuard::new(acquire(language)?);
            let mut results = Vec::new();
            report(0);

            rasterizer.rasterize(&source.data, options.scale, &mut |page_number, page_count, image| {
                let recognition = recognizer.recognize(&image)?;
                debug!(page_number, confidence = recognition.confidence, "page recognized");
                results.push(OcrPageResult {
                    page_number,
                    text: recognition.text,
                    confidence: recognition.confidence,
                });
                report(percent(page_number, page_count));
                Ok(())
            })?;

            report(100);
            results
        }
    };

    info!(name = %source.name, ?kind, language, pages = results.len(), "OCR finished");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat};
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        started_with: Option<String>,
        recognized: u32,
        terminated: u32,
    }

    struct FakeRecognizer {
        log: Rc<RefCell<Log>>,
        fail_on: Option<u32>,
    }

    impl Recognizer for FakeRecognizer {
        fn recognize(&mut self, image: &DynamicImage) -> Result<Recognition> {
            let mut log = self.log.borrow_mut();
            log.recognized += 1;
            if Some(log.recognized) == self.fail_on {
                return Err(Error::Ocr("engine crashed".to_string()));
            }
            Ok(Recognition {
                text: format!("{}x{}", image.width(), image.height()),
                confidence: 88.0,
            })
        }

        fn terminate(&mut self) {
            self.log.borrow_mut().terminated += 1;
        }
    }

    /// Renders `pages` blank pages, 10 × scale pixels wide
    struct FakeRasterizer {
        pages: u32,
    }

    impl Rasterizer for FakeRasterizer {
        fn rasterize(
            &self,
            _pdf: &[u8],
            scale: f32,
            each: &mut dyn FnMut(u32, u32, DynamicImage) -> Result<()>,
        ) -> Result<()> {
            for page in 1..=self.pages {
                let side = (10.0 * scale) as u32;
                each(page, self.pages, DynamicImage::new_luma8(side, side))?;
            }
            Ok(())
        }
    }

    fn png_source() -> SourceFile {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(7, 5).write_to(&mut out, ImageFormat::Png).unwrap();
        SourceFile::new("scan.png", out.into_inner())
    }

    fn pdf_source() -> SourceFile {
        SourceFile::new("scan.pdf", b"%PDF-1.7\n%stub".to_vec())
    }

    fn acquire_with(
        log: &Rc<RefCell<Log>>,
        fail_on: Option<u32>,
    ) -> impl FnOnce(&str) -> Result<FakeRecognizer> + '_ {
        move |language: &str| {
            log.borrow_mut().started_with = Some(language.to_string());
            Ok(FakeRecognizer { log: log.clone(), fail_on })
        }
    }

    #[test]
    fn test_image_gives_single_page_result() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut seen = Vec::new();
        let mut progress = |p: u8| seen.push(p);

        let results = recognize(
            &png_source(),
            &OcrOptions::default(),
            acquire_with(&log, None),
            None,
            Some(&mut progress),
        )
        .unwrap();

        assert_eq!(
            results,
            vec![OcrPageResult { page_number: 1, text: "7x5".to_string(), confidence: 88.0 }]
        );
        assert_eq!(seen, vec![0, 100]);
        assert_eq!(log.borrow().started_with.as_deref(), Some("eng"));
        assert_eq!(log.borrow().terminated, 1);
    }

    #[test]
    fn test_pdf_pages_rendered_at_double_scale() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut seen = Vec::new();
        let mut progress = |p: u8| seen.push(p);
        let options = OcrOptions { language: "deu".to_string(), ..Default::default() };

        let results = recognize(
            &pdf_source(),
            &options,
            acquire_with(&log, None),
            Some(&FakeRasterizer { pages: 4 }),
            Some(&mut progress),
        )
        .unwrap();

        let pages: Vec<u32> = results.iter().map(|r| r.page_number).collect();
        assert_eq!(pages, vec![1, 2, 3, 4]);
        assert!(results.iter().all(|r| r.text == "20x20"));
        assert_eq!(seen, vec![0, 25, 50, 75, 100]);
        assert_eq!(log.borrow().started_with.as_deref(), Some("deu"));
        assert_eq!(log.borrow().terminated, 1);
    }

    #[test]
    fn test_progress_for_many_pages_never_repeats() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut seen = Vec::new();
        let mut progress = |p: u8| seen.push(p);

        recognize(
            &pdf_source(),
            &OcrOptions::default(),
            acquire_with(&log, None),
            Some(&FakeRasterizer { pages: 300 }),
            Some(&mut progress),
        )
        .unwrap();

        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_recognizer_terminated_when_page_fails() {
        let log = Rc::new(RefCell::new(Log::default()));
        let err = recognize(
            &pdf_source(),
            &OcrOptions::default(),
            acquire_with(&log, Some(2)),
            Some(&FakeRasterizer { pages: 5 }),
            None,
        )
        .unwrap_err();

        assert!(matches!(err, Error::Ocr(_)));
        assert_eq!(log.borrow().recognized, 2);
        assert_eq!(log.borrow().terminated, 1);
    }

    #[test]
    fn test_pdf_without_renderer_never_starts_recognizer() {
        let log = Rc::new(RefCell::new(Log::default()));
        let err = recognize(
            &pdf_source(),
            &OcrOptions::default(),
            acquire_with(&log, None),
            None,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, Error::Rasterize(_)));
        assert!(log.borrow().started_with.is_none());
    }

    #[test]
    fn test_unknown_input_rejected() {
        let source = SourceFile::new("notes.txt", b"plain text".to_vec());
        assert!(matches!(input_kind(&source), Err(Error::UnsupportedImage { .. })));
    }
}
