//! Format converters: one source file in, one artifact out.
//!
//! Converters are synchronous and CPU-bound. The orchestrator calls them from
//! the blocking pool, so they may take as long as they need without stalling
//! the heartbeat.

use crate::catalog::ConversionKind;
use crate::config::RenderOptions;
use crate::error::JobError;
use crate::output::OutputArtifact;
use crate::pipeline::input::InputFile;
use crate::pipeline::{document, raster};
use tracing::debug;

/// Turns one input file into one output artifact.
///
/// Implementations must be stateless with respect to a batch: the same
/// instance converts every file and may be shared across batches.
pub trait FormatConverter: Send + Sync {
    /// Short name for logs, e.g. `"image-to-pdf"`.
    fn name(&self) -> &str;

    /// The conversion this converter performs.
    fn kind(&self) -> ConversionKind;

    fn convert(&self, file: &InputFile, options: &RenderOptions) -> Result<OutputArtifact, JobError>;
}

/// Places any decodable image (SVG included) on a single PDF page.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageToPdf;

impl FormatConverter for ImageToPdf {
    fn name(&self) -> &str {
        "image-to-pdf"
    }

    fn kind(&self) -> ConversionKind {
        ConversionKind::ToPdf
    }

    fn convert(&self, file: &InputFile, options: &RenderOptions) -> Result<OutputArtifact, JobError> {
        // The batch scale is for raster targets; SVGs land on the page at
        // their own size.
        let intrinsic = RenderOptions {
            scale: 1.0,
            ..*options
        };
        let img = raster::decode_source(file, &intrinsic)?;
        let bytes = document::build_pdf(
            &img,
            options.page_size,
            options.pdf_image_encoding,
            options.jpeg_quality,
        )?;
        debug!("{}: {} → {} bytes of PDF", self.name(), file.name(), bytes.len());
        Ok(OutputArtifact::new(
            file.name(),
            self.kind(),
            img.width(),
            img.height(),
            bytes,
        ))
    }
}

/// SVG rasterisation, or a plain PNG re-encode for raster sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToPng;

impl FormatConverter for ToPng {
    fn name(&self) -> &str {
        "to-png"
    }

    fn kind(&self) -> ConversionKind {
        ConversionKind::ToPng
    }

    fn convert(&self, file: &InputFile, options: &RenderOptions) -> Result<OutputArtifact, JobError> {
        let img = raster::decode_source(file, options)?;
        let bytes = raster::encode_png(&img)?;
        Ok(OutputArtifact::new(
            file.name(),
            self.kind(),
            img.width(),
            img.height(),
            bytes,
        ))
    }
}

/// Lossy WebP at the configured quality.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToWebp;

impl FormatConverter for ToWebp {
    fn name(&self) -> &str {
        "to-webp"
    }

    fn kind(&self) -> ConversionKind {
        ConversionKind::ToWebp
    }

    fn convert(&self, file: &InputFile, options: &RenderOptions) -> Result<OutputArtifact, JobError> {
        let img = raster::decode_source(file, options)?;
        let bytes = raster::encode_webp(&img, options.webp_quality)?;
        Ok(OutputArtifact::new(
            file.name(),
            self.kind(),
            img.width(),
            img.height(),
            bytes,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn png(name: &str, w: u32, h: u32) -> InputFile {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([1, 2, 3])));
        InputFile::from_bytes(name, "image/png", raster::encode_png(&img).unwrap())
    }

    fn svg(name: &str) -> InputFile {
        InputFile::from_bytes(
            name,
            "image/svg+xml",
            br#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100"><circle cx="50" cy="50" r="40" fill="green"/></svg>"#.to_vec(),
        )
    }

    #[test]
    fn svg_to_png_at_scale() {
        let opts = RenderOptions {
            scale: 2.0,
            ..RenderOptions::default()
        };
        let out = ToPng.convert(&svg("logo.svg"), &opts).unwrap();
        assert_eq!(out.name, "converted-logo.png");
        assert_eq!(out.media_type, "image/png");
        assert_eq!((out.width, out.height), (400, 200));
        let back = image::load_from_memory(&out.bytes).unwrap();
        assert!(back.color().has_alpha());
    }

    #[test]
    fn png_to_png_is_a_re_encode() {
        let out = ToPng.convert(&png("a.png", 5, 6), &RenderOptions::default()).unwrap();
        assert_eq!(out.name, "converted-a.png");
        assert_eq!((out.width, out.height), (5, 6));
    }

    #[test]
    fn png_to_webp() {
        let out = ToWebp.convert(&png("photo.png", 32, 16), &RenderOptions::default()).unwrap();
        assert_eq!(out.name, "converted-photo.webp");
        assert_eq!(&out.bytes[8..12], b"WEBP");
    }

    #[test]
    fn image_to_pdf() {
        let out = ImageToPdf.convert(&png("scan.png", 100, 200), &RenderOptions::default()).unwrap();
        assert_eq!(out.name, "converted-scan.pdf");
        assert_eq!(out.media_type, "application/pdf");
        assert!(out.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn svg_to_pdf() {
        let out = ImageToPdf.convert(&svg("logo.svg"), &RenderOptions::default()).unwrap();
        assert!(out.bytes.starts_with(b"%PDF"));
        assert_eq!((out.width, out.height), (200, 100));
    }

    #[test]
    fn svg_to_pdf_ignores_scale() {
        let big = InputFile::from_bytes(
            "chart.svg",
            "image/svg+xml",
            br#"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="300"/>"#.to_vec(),
        );
        let at = |scale: f32| {
            let opts = RenderOptions {
                scale,
                ..RenderOptions::default()
            };
            ImageToPdf.convert(&big, &opts).map(|a| (a.width, a.height))
        };
        assert_eq!(at(1.0).unwrap(), (400, 300));
        assert_eq!(at(64.0).unwrap(), (400, 300));
    }

    #[test]
    fn empty_file_fails_every_converter() {
        let f = InputFile::from_bytes("empty.png", "image/png", Vec::new());
        let opts = RenderOptions::default();
        let converters: [&dyn FormatConverter; 3] = [&ImageToPdf, &ToPng, &ToWebp];
        for c in converters {
            assert!(matches!(c.convert(&f, &opts), Err(JobError::Decode { .. })), "{}", c.name());
        }
    }
}
