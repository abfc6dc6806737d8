//! Configuration types for batch conversion.
//!
//! Two structs split the knobs by lifetime:
//!
//! * [`ConversionSpec`] — what the user picked for this batch: the
//!   conversion key and the scale factor.
//! * [`ConversionConfig`] — how the pipeline behaves: encoder qualities,
//!   page size, heartbeat timing, plus the hooks (progress callback, output
//!   sink, cancellation token). Built via [`ConversionConfigBuilder`].

use crate::delivery::OutputSink;
use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Smallest accepted scale factor.
pub const MIN_SCALE: f32 = 0.5;
/// Largest accepted scale factor.
pub const MAX_SCALE: f32 = 64.0;

/// The conversion a batch should perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionSpec {
    /// Conversion-type key, e.g. `"to-png"`.
    pub conversion: String,
    /// Linear output multiplier for vector sources. Default: 1.0.
    pub scale: f32,
}

impl ConversionSpec {
    pub fn new(conversion: impl Into<String>) -> Self {
        Self {
            conversion: conversion.into(),
            scale: 1.0,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Reject scales outside `0.5..=64` (and NaN).
    pub fn validate(&self) -> Result<(), ConvertError> {
        if (MIN_SCALE..=MAX_SCALE).contains(&self.scale) {
            Ok(())
        } else {
            Err(ConvertError::InvalidScale { value: self.scale })
        }
    }
}

/// Configuration for a batch conversion run.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use fileconv::{ConversionConfig, PageSize};
///
/// let config = ConversionConfig::builder()
///     .pixel_density(2.0)
///     .webp_quality(0.9)
///     .page_size(PageSize::Letter)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Pixel density multiplied into the scale for SVG sources. Default: 1.0.
    ///
    /// Plays the part of a display's device-pixel-ratio: a scale of 1 at
    /// density 2 renders twice the SVG's nominal size.
    pub pixel_density: f32,

    /// Lossy WebP quality in `0.0..=1.0`. Default: 0.8.
    pub webp_quality: f32,

    /// JPEG quality (1–100) for images embedded in PDFs. Default: 92.
    pub jpeg_quality: u8,

    /// Page size for image-to-PDF output. Default: A4.
    pub page_size: PageSize,

    /// How images are stored inside generated PDFs. Default: JPEG.
    pub pdf_image_encoding: PdfImageEncoding,

    /// Raster size for SVGs that declare neither width/height nor a viewBox.
    /// Default: 800×600.
    pub fallback_svg_size: (u32, u32),

    /// Longest edge, in pixels, a drawing surface may have. Default: 16384.
    ///
    /// A 64× scale of an 800×600 fallback would otherwise ask for a
    /// 51 200 × 38 400 surface (~7.8 GB of RGBA).
    pub max_surface_edge: u32,

    /// Heartbeat period while a file converts. Default: 200 ms.
    pub heartbeat_interval_ms: u64,

    /// Percent added per heartbeat. Default: 10.
    pub heartbeat_step: u8,

    /// Highest percent the heartbeat may reach. Default: 90.
    pub heartbeat_cap: u8,

    /// Timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives per-file status and progress events. Default: none.
    pub progress_callback: Option<ProgressCallback>,

    /// Receives every successfully converted artifact. Default: none, in
    /// which case artifacts are returned in [`crate::output::JobResult`].
    pub output_sink: Option<Arc<dyn OutputSink>>,

    /// Cancels the files that have not started yet. Default: a fresh token.
    pub cancel_token: CancellationToken,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            pixel_density: 1.0,
            webp_quality: 0.8,
            jpeg_quality: 92,
            page_size: PageSize::default(),
            pdf_image_encoding: PdfImageEncoding::default(),
            fallback_svg_size: (800, 600),
            max_surface_edge: 16_384,
            heartbeat_interval_ms: 200,
            heartbeat_step: 10,
            heartbeat_cap: 90,
            download_timeout_secs: 120,
            progress_callback: None,
            output_sink: None,
            cancel_token: CancellationToken::new(),
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("pixel_density", &self.pixel_density)
            .field("webp_quality", &self.webp_quality)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("page_size", &self.page_size)
            .field("pdf_image_encoding", &self.pdf_image_encoding)
            .field("fallback_svg_size", &self.fallback_svg_size)
            .field("max_surface_edge", &self.max_surface_edge)
            .field("heartbeat_interval_ms", &self.heartbeat_interval_ms)
            .field("heartbeat_step", &self.heartbeat_step)
            .field("heartbeat_cap", &self.heartbeat_cap)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .field(
                "output_sink",
                &self.output_sink.as_ref().map(|_| "<dyn OutputSink>"),
            )
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The converter-facing subset of this config, for one batch.
    pub fn render_options(&self, spec: &ConversionSpec) -> RenderOptions {
        RenderOptions {
            scale: spec.scale,
            pixel_density: self.pixel_density,
            webp_quality: self.webp_quality,
            jpeg_quality: self.jpeg_quality,
            page_size: self.page_size,
            pdf_image_encoding: self.pdf_image_encoding,
            fallback_svg_size: self.fallback_svg_size,
            max_surface_edge: self.max_surface_edge,
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn pixel_density(mut self, density: f32) -> Self {
        self.config.pixel_density = density;
        self
    }

    pub fn webp_quality(mut self, q: f32) -> Self {
        self.config.webp_quality = q.clamp(0.0, 1.0);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn pdf_image_encoding(mut self, encoding: PdfImageEncoding) -> Self {
        self.config.pdf_image_encoding = encoding;
        self
    }

    pub fn fallback_svg_size(mut self, width: u32, height: u32) -> Self {
        self.config.fallback_svg_size = (width, height);
        self
    }

    pub fn max_surface_edge(mut self, px: u32) -> Self {
        self.config.max_surface_edge = px.max(1);
        self
    }

    pub fn heartbeat_interval_ms(mut self, ms: u64) -> Self {
        self.config.heartbeat_interval_ms = ms.max(1);
        self
    }

    pub fn heartbeat_step(mut self, step: u8) -> Self {
        self.config.heartbeat_step = step;
        self
    }

    pub fn heartbeat_cap(mut self, cap: u8) -> Self {
        self.config.heartbeat_cap = cap.min(99);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn output_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.config.output_sink = Some(sink);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.config.cancel_token = token;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if !(c.pixel_density.is_finite() && c.pixel_density > 0.0) {
            return Err(ConvertError::InvalidConfig(format!(
                "Pixel density must be > 0, got {}",
                c.pixel_density
            )));
        }
        if c.fallback_svg_size.0 == 0 || c.fallback_svg_size.1 == 0 {
            return Err(ConvertError::InvalidConfig(
                "Fallback SVG size must be non-zero".into(),
            ));
        }
        if let PageSize::Custom { width, height } = c.page_size {
            if !(width > 0.0 && height > 0.0) {
                return Err(ConvertError::InvalidConfig(format!(
                    "Page size must be positive, got {width}×{height}"
                )));
            }
        }
        Ok(self.config)
    }
}

/// Converter-facing settings for one batch.
///
/// Plain data: converters run on the blocking pool and receive an owned
/// copy, never the callbacks or sinks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub scale: f32,
    pub pixel_density: f32,
    pub webp_quality: f32,
    pub jpeg_quality: u8,
    pub page_size: PageSize,
    pub pdf_image_encoding: PdfImageEncoding,
    pub fallback_svg_size: (u32, u32),
    pub max_surface_edge: u32,
}

impl RenderOptions {
    /// `scale × pixel_density`: the factor applied to SVG user units.
    pub fn effective_scale(&self) -> f32 {
        self.scale * self.pixel_density
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        ConversionConfig::default().render_options(&ConversionSpec::new(""))
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Page size for generated PDFs, in PDF points (1/72 in), portrait.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PageSize {
    /// 595.28 × 841.89 pt. (default)
    #[default]
    A4,
    /// 612 × 792 pt.
    Letter,
    /// Any portrait size in points.
    Custom { width: f32, height: f32 },
}

impl PageSize {
    /// `(width, height)` in points, portrait orientation.
    pub fn portrait_dimensions(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Custom { width, height } => (width.min(height), width.max(height)),
        }
    }
}

/// How raster data is stored in a generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PdfImageEncoding {
    /// JPEG (`DCTDecode`); transparency is flattened onto white. (default)
    #[default]
    Jpeg,
    /// Flate-compressed RGB with an alpha soft mask; keeps transparency.
    Lossless,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ConversionConfig::default();
        assert_eq!(c.pixel_density, 1.0);
        assert_eq!(c.webp_quality, 0.8);
        assert_eq!(c.fallback_svg_size, (800, 600));
        assert_eq!(c.heartbeat_interval_ms, 200);
        assert_eq!(c.heartbeat_step, 10);
        assert_eq!(c.heartbeat_cap, 90);
        assert!(!c.cancel_token.is_cancelled());
    }

    #[test]
    fn scale_bounds() {
        assert!(ConversionSpec::new("to-png").validate().is_ok());
        assert!(ConversionSpec::new("to-png").with_scale(0.5).validate().is_ok());
        assert!(ConversionSpec::new("to-png").with_scale(64.0).validate().is_ok());
        assert!(matches!(
            ConversionSpec::new("to-png").with_scale(0.25).validate(),
            Err(ConvertError::InvalidScale { .. })
        ));
        assert!(ConversionSpec::new("to-png").with_scale(65.0).validate().is_err());
        assert!(ConversionSpec::new("to-png").with_scale(f32::NAN).validate().is_err());
    }

    #[test]
    fn builder_clamps() {
        let c = ConversionConfig::builder()
            .webp_quality(3.0)
            .jpeg_quality(0)
            .heartbeat_cap(150)
            .build()
            .unwrap();
        assert_eq!(c.webp_quality, 1.0);
        assert_eq!(c.jpeg_quality, 1);
        assert_eq!(c.heartbeat_cap, 99);
    }

    #[test]
    fn builder_rejects_bad_density() {
        assert!(ConversionConfig::builder().pixel_density(0.0).build().is_err());
        assert!(ConversionConfig::builder().pixel_density(f32::NAN).build().is_err());
    }

    #[test]
    fn builder_rejects_zero_fallback() {
        assert!(ConversionConfig::builder()
            .fallback_svg_size(0, 600)
            .build()
            .is_err());
    }

    #[test]
    fn effective_scale_multiplies_density() {
        let c = ConversionConfig::builder().pixel_density(2.0).build().unwrap();
        let opts = c.render_options(&ConversionSpec::new("to-png").with_scale(4.0));
        assert_eq!(opts.effective_scale(), 8.0);
    }

    #[test]
    fn page_sizes_are_portrait() {
        let (w, h) = PageSize::A4.portrait_dimensions();
        assert!(w < h);
        let (w, h) = PageSize::Custom {
            width: 800.0,
            height: 600.0,
        }
        .portrait_dimensions();
        assert_eq!((w, h), (600.0, 800.0));
    }

    #[test]
    fn debug_hides_hooks() {
        let s = format!("{:?}", ConversionConfig::default());
        assert!(s.contains("pixel_density"));
        assert!(!s.contains("CancellationToken"));
    }
}
