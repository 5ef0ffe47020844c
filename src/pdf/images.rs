//! Building a PDF from PNG and JPEG images, one page per image

use std::io::Cursor;

use image::codecs::jpeg::JpegDecoder;
use image::{ExtendedColorType, ImageDecoder, ImageFormat};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::layout::PageBox;
use crate::pdf::document::{self, SourceFile};

/// Resource name of the image on its page
const IMAGE_RESOURCE: &str = "Im1";

/// An image ready to be placed as a PDF image XObject
struct EmbeddedImage {
    width: u32,
    height: u32,
    stream: Stream,
    alpha: Option<Stream>,
}

/// Accept PNG and JPEG only, judged by the file's magic bytes
fn detect_format(source: &SourceFile) -> Result<ImageFormat> {
    match image::guess_format(&source.data) {
        Ok(format @ (ImageFormat::Png | ImageFormat::Jpeg)) => Ok(format),
        _ => Err(Error::UnsupportedImage {
            name: source.name.clone(),
        }),
    }
}

fn image_error(source: &SourceFile) -> impl FnOnce(image::ImageError) -> Error + '_ {
    move |err| Error::Image {
        name: source.name.clone(),
        source: err,
    }
}

fn image_dict(width: u32, height: u32, color_space: &[u8]) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict
}

/// JPEG data is embedded untouched; the PDF viewer decodes it (DCTDecode)
///
/// CMYK JPEGs are re-encoded as RGB because their inverted-ink convention
/// varies between producers.
fn embed_jpeg(source: &SourceFile) -> Result<EmbeddedImage> {
    let decoder = JpegDecoder::new(Cursor::new(&source.data)).map_err(image_error(source))?;
    let (width, height) = decoder.dimensions();
    let color_space: &[u8] = match decoder.original_color_type() {
        ExtendedColorType::L8 => b"DeviceGray",
        ExtendedColorType::Rgb8 => b"DeviceRGB",
        other => {
            debug!(name = %source.name, ?other, "re-encoding JPEG as RGB");
            return embed_decoded(source, ImageFormat::Jpeg);
        }
    };

    let mut dict = image_dict(width, height, color_space);
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    let stream = Stream::new(dict, source.data.clone()).with_compression(false);

    Ok(EmbeddedImage { width, height, stream, alpha: None })
}

/// Decode to RGB samples; any alpha channel becomes a soft mask
fn embed_decoded(source: &SourceFile, format: ImageFormat) -> Result<EmbeddedImage> {
    let decoded = image::load_from_memory_with_format(&source.data, format)
        .map_err(image_error(source))?;
    let (width, height) = (decoded.width(), decoded.height());

    if decoded.color().has_alpha() {
        let rgba = decoded.to_rgba8();
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in rgba.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }
        Ok(EmbeddedImage {
            width,
            height,
            stream: Stream::new(image_dict(width, height, b"DeviceRGB"), rgb),
            alpha: Some(Stream::new(image_dict(width, height, b"DeviceGray"), alpha)),
        })
    } else {
        let rgb = decoded.to_rgb8().into_raw();
        Ok(EmbeddedImage {
            width,
            height,
            stream: Stream::new(image_dict(width, height, b"DeviceRGB"), rgb),
            alpha: None,
        })
    }
}

fn embed(source: &SourceFile) -> Result<EmbeddedImage> {
    match detect_format(source)? {
        ImageFormat::Jpeg => embed_jpeg(source),
        format => embed_decoded(source, format),
    }
}

/// Add one page sized to the image and drawing it edge to edge
fn add_image_page(doc: &mut Document, pages_id: ObjectId, image: EmbeddedImage) -> Result<ObjectId> {
    let EmbeddedImage { width, height, mut stream, alpha } = image;

    if let Some(mask) = alpha {
        let mask_id = doc.add_object(mask);
        stream.dict.set("SMask", Object::Reference(mask_id));
    }
    let image_id = doc.add_object(stream);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(width as i64),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(height as i64),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

    let mut xobjects = Dictionary::new();
    xobjects.set(IMAGE_RESOURCE, Object::Reference(image_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference(pages_id));
    page.set("MediaBox", Object::Array(PageBox::new(width as f32, height as f32).to_rect()));
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Reference(content_id));

    Ok(doc.add_object(Object::Dictionary(page)))
}

/// Convert images to a PDF with one page per image, in order
///
/// Each page is exactly as large as its image in pixels (one pixel per
/// point). All images are decoded before the document is assembled, so an
/// unsupported or broken image rejects the whole call.
pub fn images_to_pdf(images: &[SourceFile]) -> Result<Vec<u8>> {
    if images.is_empty() {
        return Err(Error::EmptySelection("images"));
    }

    let embedded = images.iter().map(embed).collect::<Result<Vec<_>>>()?;

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(embedded.len());
    for image in embedded {
        debug!(width = image.width, height = image.height, "adding image page");
        kids.push(Object::Reference(add_image_page(&mut doc, pages_id, image)?));
    }

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(kids.len() as i64));
    pages.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc.compress();
    let bytes = document::serialize(&mut doc)?;
    info!(images = images.len(), "converted images to PDF");
    Ok(bytes)
}
