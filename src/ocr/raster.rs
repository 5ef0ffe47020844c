//! Page rasterization for OCR of PDF input

use image::DynamicImage;

use crate::error::Result;

/// Renders PDF pages to pixel buffers
pub trait Rasterizer {
    /// Render every page at `scale` times its natural size, in page order
    ///
    /// `each` receives the 1-based page number, the page count and the
    /// rendered image. An error from `each` stops rendering and is returned.
    fn rasterize(
        &self,
        pdf: &[u8],
        scale: f32,
        each: &mut dyn FnMut(u32, u32, DynamicImage) -> Result<()>,
    ) -> Result<()>;
}

#[cfg(feature = "pdfium")]
pub use self::pdfium::PdfiumRasterizer;

#[cfg(feature = "pdfium")]
mod pdfium {
    use image::DynamicImage;
    use pdfium_render::prelude::*;
    use tracing::debug;

    use super::Rasterizer;
    use crate::error::{Error, Result};

    /// Rasterizer backed by the pdfium library
    pub struct PdfiumRasterizer {
        pdfium: Pdfium,
    }

    impl PdfiumRasterizer {
        /// Bind to pdfium in `library_dir` if given, else the system library
        pub fn new(library_dir: Option<&std::path::Path>) -> Result<Self> {
            let bindings = match library_dir {
                Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
                None => Pdfium::bind_to_system_library(),
            }
            .map_err(|e| Error::Rasterize(format!("cannot load pdfium: {}", e)))?;

            Ok(Self {
                pdfium: Pdfium::new(bindings),
            })
        }
    }

    impl Rasterizer for PdfiumRasterizer {
        fn rasterize(
            &self,
            pdf: &[u8],
            scale: f32,
            each: &mut dyn FnMut(u32, u32, DynamicImage) -> Result<()>,
        ) -> Result<()> {
            let document = self
                .pdfium
                .load_pdf_from_byte_slice(pdf, None)
                .map_err(|e| Error::Rasterize(e.to_string()))?;

            let page_count = document.pages().len() as u32;
            let config = PdfRenderConfig::new().scale_page_by_factor(scale);

            for (index, page) in document.pages().iter().enumerate() {
                let bitmap = page
                    .render_with_config(&config)
                    .map_err(|e| Error::Rasterize(format!("page {}: {}", index + 1, e)))?;
                let image = bitmap.as_image();
                debug!(page = index + 1, width = image.width(), height = image.height(), "page rendered");
                each(index as u32 + 1, page_count, image)?;
            }
            Ok(())
        }
    }
}
