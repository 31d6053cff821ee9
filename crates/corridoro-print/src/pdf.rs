//! Single-page PDF output and first-page PDF input
//!
//! The writer produces a page of the requested physical size with one RGB
//! image XObject stretched to fill it. The reader is the matching inverse:
//! it sizes a raster from page 1's media box at the requested dpi and
//! samples the page's first image into it.

use crate::import::{DecodedPage, PageDecoder};
use crate::raster::flatten_to_rgb;
use corridoro_core::units::{mm_to_points, POINTS_PER_INCH};
use corridoro_core::{CompositeError, DecodeError};
use image::{imageops, ImageFormat, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use flate2::read::ZlibDecoder;
use std::io::Read;
use tiny_skia::Pixmap;
use tracing::{debug, warn};

/// Largest page raster the reader will allocate
const MAX_PAGE_PIXELS: u64 = 200_000_000;

/// Deepest page tree walked when looking up inherited attributes
const MAX_TREE_DEPTH: usize = 32;

/// Write `pixmap` as the only content of a single page.
///
/// The raster is flattened over white and scaled to cover the whole
/// `page_width_mm` x `page_height_mm` page.
pub fn write_image_page(
    pixmap: &Pixmap,
    page_width_mm: f64,
    page_height_mm: f64,
    title: &str,
) -> Result<Vec<u8>, CompositeError> {
    if !(page_width_mm > 0.0 && page_height_mm > 0.0) {
        return Err(CompositeError::InvalidPage(format!(
            "{page_width_mm} x {page_height_mm} mm"
        )));
    }
    let width_pt = mm_to_points(page_width_mm) as f32;
    let height_pt = mm_to_points(page_height_mm) as f32;

    let mut doc = Document::with_version("1.5");
    let id_pages = doc.new_object_id();

    let id_image = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => pixmap.width() as i64,
            "Height" => pixmap.height() as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        flatten_to_rgb(pixmap),
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width_pt.into(),
                    0.into(),
                    0.into(),
                    height_pt.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| CompositeError::InvalidPage(e.to_string()))?;
    let id_content = doc.add_object(Stream::new(dictionary! {}, encoded));

    let id_page = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => id_pages,
        "Contents" => id_content,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => id_image,
            },
        },
    });

    doc.set_object(
        id_pages,
        dictionary! {
            "Type" => "Pages",
            "Count" => 1,
            "Kids" => vec![id_page.into()],
            "MediaBox" => vec![0.into(), 0.into(), width_pt.into(), height_pt.into()],
        },
    );

    let id_catalog = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => id_pages,
    });
    doc.trailer.set("Root", id_catalog);

    let date = chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();
    let id_info = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
        "Creator" => Object::string_literal(format!("corridoro {}", env!("CARGO_PKG_VERSION"))),
        "CreationDate" => Object::string_literal(date),
    });
    doc.trailer.set("Info", id_info);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| CompositeError::InvalidPage(e.to_string()))?;
    debug!(
        "Wrote {}x{} px page of {:.1} x {:.1} mm ({} bytes)",
        pixmap.width(),
        pixmap.height(),
        page_width_mm,
        page_height_mm,
        buffer.len()
    );
    Ok(buffer)
}

/// Rasterizes the first page of a PDF
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfPageDecoder;

impl PageDecoder for PdfPageDecoder {
    fn decode(&self, bytes: &[u8], dpi: f64) -> Result<DecodedPage, DecodeError> {
        let doc = Document::load_mem(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let page_id = doc
            .get_pages()
            .values()
            .next()
            .copied()
            .ok_or(DecodeError::NoPages)?;
        let page = doc
            .get_dictionary(page_id)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;

        let (width_pt, height_pt) = media_box(&doc, page)?;
        let width = (width_pt * dpi / POINTS_PER_INCH).floor();
        let height = (height_pt * dpi / POINTS_PER_INCH).floor();
        if width < 1.0 || height < 1.0 {
            return Err(DecodeError::Malformed(format!(
                "page of {width_pt} x {height_pt} pt has no pixels at {dpi} dpi"
            )));
        }
        if width * height > MAX_PAGE_PIXELS as f64 {
            return Err(DecodeError::UnsupportedFormat(format!(
                "page raster {width} x {height} px is too large"
            )));
        }
        let (width, height) = (width as u32, height as u32);

        let blank = || RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
        // Placement only needs the page size, so an unreadable image costs
        // the page content but not the import
        let pixels = match first_image(&doc, page).map(decode_image) {
            Some(Ok(image)) if image.dimensions() == (width, height) => image,
            Some(Ok(image)) => imageops::resize(&image, width, height, imageops::FilterType::Triangle),
            Some(Err(err)) => {
                warn!("Page {:?} image unreadable, decoding as blank: {}", page_id, err);
                blank()
            }
            None => {
                debug!("Page {:?} has no image, decoding as blank", page_id);
                blank()
            }
        };

        Ok(DecodedPage {
            width,
            height,
            pixels,
        })
    }
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Look up `key` on the page or the nearest ancestor that defines it
fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut dict = page;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(object) = dict.get(key) {
            return resolve(doc, object);
        }
        let parent: ObjectId = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Page width and height in points
fn media_box(doc: &Document, page: &Dictionary) -> Result<(f64, f64), DecodeError> {
    let malformed = || DecodeError::Malformed("page has no usable MediaBox".to_string());
    let values = inherited(doc, page, b"MediaBox")
        .and_then(|o| o.as_array().ok())
        .ok_or_else(malformed)?;
    let coords: Vec<f64> = values
        .iter()
        .filter_map(|o| resolve(doc, o).and_then(number))
        .collect();
    match coords.as_slice() {
        [x0, y0, x1, y1] => Ok(((x1 - x0).abs(), (y1 - y0).abs())),
        _ => Err(malformed()),
    }
}

fn first_image<'a>(doc: &'a Document, page: &'a Dictionary) -> Option<&'a Stream> {
    let resources = inherited(doc, page, b"Resources")?.as_dict().ok()?;
    let xobjects = resolve(doc, resources.get(b"XObject").ok()?)?.as_dict().ok()?;
    xobjects
        .iter()
        .filter_map(|(_, object)| resolve(doc, object)?.as_stream().ok())
        .find(|stream| {
            stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .is_ok_and(|name| name == b"Image")
        })
}

fn filter_name(stream: &Stream) -> Option<Vec<u8>> {
    match stream.dict.get(b"Filter").ok()? {
        Object::Name(name) => Some(name.clone()),
        Object::Array(filters) => filters.last()?.as_name().ok().map(<[u8]>::to_vec),
        _ => None,
    }
}

fn decode_image(stream: &Stream) -> Result<RgbaImage, DecodeError> {
    let filter = filter_name(stream);
    if filter.as_deref() == Some(b"DCTDecode".as_slice()) {
        return image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
            .map(|img| img.to_rgba8())
            .map_err(|e| DecodeError::Malformed(e.to_string()));
    }

    let dim = |key: &[u8]| -> Result<u32, DecodeError> {
        stream
            .dict
            .get(key)
            .ok()
            .and_then(|o| o.as_i64().ok())
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
            .ok_or_else(|| DecodeError::Malformed("image without dimensions".to_string()))
    };
    let width = dim(b"Width")?;
    let height = dim(b"Height")?;

    let bits = stream.dict.get(b"BitsPerComponent").ok().and_then(|o| o.as_i64().ok());
    let channels = match stream.dict.get(b"ColorSpace").ok().and_then(|o| o.as_name().ok()) {
        Some(b"DeviceRGB") => 3,
        Some(b"DeviceGray") => 1,
        other => {
            return Err(DecodeError::UnsupportedFormat(format!(
                "image color space {:?}",
                other.map(String::from_utf8_lossy)
            )))
        }
    };
    if bits != Some(8) {
        return Err(DecodeError::UnsupportedFormat(format!("{bits:?} bits per component")));
    }

    let data = match filter.as_deref() {
        None => stream.content.clone(),
        Some(b"FlateDecode") => inflate(&stream.content)?,
        Some(other) => {
            return Err(DecodeError::UnsupportedFormat(format!(
                "image filter {}",
                String::from_utf8_lossy(other)
            )))
        }
    };

    let expected = width as usize * height as usize * channels;
    if data.len() < expected {
        return Err(DecodeError::Malformed(format!(
            "image data holds {} of {} bytes",
            data.len(),
            expected
        )));
    }

    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for px in data[..expected].chunks_exact(channels) {
        let (r, g, b) = if channels == 1 {
            (px[0], px[0], px[0])
        } else {
            (px[0], px[1], px[2])
        };
        rgba.extend_from_slice(&[r, g, b, 255]);
    }
    RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| DecodeError::Malformed("image buffer size mismatch".to_string()))
}

/// Inflate a zlib stream; lopdf leaves image streams compressed
fn inflate(content: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut data = Vec::new();
    ZlibDecoder::new(content)
        .read_to_end(&mut data)
        .map_err(|e| DecodeError::Malformed(format!("image stream: {e}")))?;
    Ok(data)
}
