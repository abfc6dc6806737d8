//! Raster decoding and encoding.
//!
//! Sources are decoded by their declared media type, never by sniffing:
//! a file that claims `image/png` but holds JPEG bytes is a decode error.
//! SVG sources go through [`super::svg::rasterize`] first.

use crate::config::RenderOptions;
use crate::error::JobError;
use crate::pipeline::input::InputFile;
use crate::pipeline::svg;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

/// Decode a source file to pixels.
///
/// SVGs are rasterised at `scale × pixel_density`; raster sources keep their
/// native size.
pub fn decode_source(file: &InputFile, options: &RenderOptions) -> Result<DynamicImage, JobError> {
    if file.size() == 0 {
        return Err(JobError::decode(format!("'{}' is empty", file.name())));
    }
    if file.is_svg() {
        return svg::rasterize(file.bytes(), options).map(DynamicImage::ImageRgba8);
    }

    let format = ImageFormat::from_mime_type(file.media_type()).ok_or_else(|| {
        JobError::decode(format!("unsupported source type '{}'", file.media_type()))
    })?;
    let img = image::load_from_memory_with_format(file.bytes(), format)
        .map_err(|e| JobError::decode(format!("'{}': {e}", file.name())))?;

    debug!(
        "Decoded {} as {:?}: {}×{}",
        file.name(),
        format,
        img.width(),
        img.height()
    );
    Ok(img)
}

fn ensure_non_empty(img: &DynamicImage) -> Result<(), JobError> {
    if img.width() == 0 || img.height() == 0 {
        return Err(JobError::encode(format!(
            "cannot encode a {}×{} image",
            img.width(),
            img.height()
        )));
    }
    Ok(())
}

/// Lossless PNG, RGBA when the source has alpha.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, JobError> {
    ensure_non_empty(img)?;
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| JobError::encode(format!("PNG: {e}")))?;
    Ok(buf.into_inner())
}

/// Lossy WebP at `quality` (`0.0..=1.0`). Alpha is kept when present.
pub fn encode_webp(img: &DynamicImage, quality: f32) -> Result<Vec<u8>, JobError> {
    ensure_non_empty(img)?;
    let quality = quality.clamp(0.0, 1.0) * 100.0;
    let (w, h) = (img.width(), img.height());

    let result = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), w, h)
            .encode_simple(false, quality)
            .map(|m| m.to_vec())
    } else {
        let rgb = img.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), w, h)
            .encode_simple(false, quality)
            .map(|m| m.to_vec())
    };
    let encoded = result.map_err(|e| JobError::encode(format!("WebP: {e:?}")))?;

    if encoded.is_empty() {
        return Err(JobError::encode("WebP encoder produced no data"));
    }
    Ok(encoded)
}
