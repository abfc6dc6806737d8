//! Single-page PDF assembly with lopdf.
//!
//! The page takes the orientation of the image (landscape when wider than
//! tall) and the image is scaled uniformly to fit, then centred.

use crate::config::{PageSize, PdfImageEncoding};
use crate::error::JobError;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde::Serialize;
use std::io::Write;

/// Page orientation of a generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Where an image lands on the page, in points from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageLayout {
    pub orientation: Orientation,
    pub page_width: f32,
    pub page_height: f32,
    /// Uniform scale from image pixels to page points.
    pub ratio: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub draw_width: f32,
    pub draw_height: f32,
}

impl PageLayout {
    /// Fit an `image_width × image_height` image onto `page`.
    pub fn compute(image_width: u32, image_height: u32, page: PageSize) -> Self {
        let (short, long) = page.portrait_dimensions();
        let (iw, ih) = (image_width as f32, image_height as f32);

        let orientation = if image_width > image_height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        };
        let (page_width, page_height) = match orientation {
            Orientation::Landscape => (long, short),
            Orientation::Portrait => (short, long),
        };

        let ratio = (page_width / iw).min(page_height / ih);
        let draw_width = iw * ratio;
        let draw_height = ih * ratio;

        Self {
            orientation,
            page_width,
            page_height,
            ratio,
            offset_x: (page_width - draw_width) / 2.0,
            offset_y: (page_height - draw_height) / 2.0,
            draw_width,
            draw_height,
        }
    }

    /// Bottom edge of the image in PDF user space (origin bottom-left).
    fn pdf_y(&self) -> f32 {
        self.page_height - self.offset_y - self.draw_height
    }
}

/// Embed `img` on a single page and return the serialised PDF.
pub fn build_pdf(
    img: &DynamicImage,
    page: PageSize,
    encoding: PdfImageEncoding,
    jpeg_quality: u8,
) -> Result<Vec<u8>, JobError> {
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return Err(JobError::encode(format!("cannot place a {w}×{h} image")));
    }
    let layout = PageLayout::compute(w, h, page);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    // ── Image XObject ────────────────────────────────────────────────────
    let image_stream = match encoding {
        PdfImageEncoding::Jpeg => {
            let rgb = flatten_on_white(img);
            let mut jpeg = Vec::new();
            JpegEncoder::new_with_quality(&mut jpeg, jpeg_quality.clamp(1, 100))
                .encode_image(&rgb)
                .map_err(|e| JobError::encode(format!("JPEG: {e}")))?;
            Stream::new(image_dict(w, h, "DeviceRGB", "DCTDecode"), jpeg)
        }
        PdfImageEncoding::Lossless => {
            let rgba = img.to_rgba8();
            let rgb: Vec<u8> = rgba.pixels().flat_map(|p| [p[0], p[1], p[2]]).collect();
            let mut dict = image_dict(w, h, "DeviceRGB", "FlateDecode");

            if rgba.pixels().any(|p| p[3] < 255) {
                let alpha: Vec<u8> = rgba.pixels().map(|p| p[3]).collect();
                let mask = Stream::new(image_dict(w, h, "DeviceGray", "FlateDecode"), deflate(&alpha)?);
                let mask_id = doc.add_object(mask);
                dict.set("SMask", mask_id);
            }
            Stream::new(dict, deflate(&rgb)?)
        }
    };
    let image_id = doc.add_object(image_stream);

    // ── Content stream ───────────────────────────────────────────────────
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    layout.draw_width.into(),
                    0.0_f32.into(),
                    0.0_f32.into(),
                    layout.draw_height.into(),
                    layout.offset_x.into(),
                    layout.pdf_y().into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| JobError::encode(format!("PDF content: {e}")))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    // ── Page tree ────────────────────────────────────────────────────────
    let media_box: Vec<Object> = vec![
        0.0_f32.into(),
        0.0_f32.into(),
        layout.page_width.into(),
        layout.page_height.into(),
    ];
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => media_box,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
    });

    let kids: Vec<Object> = vec![page_id.into()];
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => 1_i64,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| JobError::encode(format!("PDF: {e}")))?;
    Ok(out)
}

fn image_dict(width: u32, height: u32, color_space: &str, filter: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8_i64,
        "Filter" => filter,
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, JobError> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data)
        .and_then(|_| enc.finish())
        .map_err(|e| JobError::encode(format!("deflate: {e}")))
}

/// Composite onto opaque white; JPEG has no alpha.
fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = a as u16;
        let blend = |c: u8| ((c as u16 * a + 255 * (255 - a) + 127) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}
