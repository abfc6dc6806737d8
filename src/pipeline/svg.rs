//! SVG rasterisation: resolve the raster size, then draw with resvg.
//!
//! ## Size resolution
//!
//! 1. root `width` and `height`, when both are present and non-zero;
//! 2. otherwise the third and fourth numbers of `viewBox`;
//! 3. otherwise the configured fallback (800×600).
//!
//! Lengths keep only their leading number, so `"200px"` and `"200mm"` both
//! read as 200. The surface is `round(w × s) × round(h × s)` with
//! `s = scale × pixel_density` and starts fully transparent; nothing is
//! painted behind the drawing.

use crate::config::RenderOptions;
use crate::error::JobError;
use image::{Rgba, RgbaImage};
use once_cell::sync::Lazy;
use regex::Regex;
use resvg::{tiny_skia, usvg};
use std::sync::Arc;
use tracing::debug;

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").expect("valid regex")
});

/// System fonts, loaded once, for SVGs containing `<text>`.
static FONTS: Lazy<Arc<usvg::fontdb::Database>> = Lazy::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    debug!("Loaded {} font faces", db.len());
    Arc::new(db)
});

/// Where the raster size came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionSource {
    Attributes,
    ViewBox,
    Fallback,
}

/// Nominal raster size of an SVG, before scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvgDimensions {
    pub width: f32,
    pub height: f32,
    pub source: DimensionSource,
}

impl SvgDimensions {
    /// Surface size in whole pixels at `scale`.
    pub fn surface_size(&self, scale: f32) -> (u32, u32) {
        let px = |v: f32| {
            let scaled = (v * scale).round();
            if scaled.is_finite() && scaled > 0.0 {
                scaled.min(u32::MAX as f32) as u32
            } else {
                0
            }
        };
        (px(self.width), px(self.height))
    }
}

/// Read the leading number of an SVG length; `None` unless it is > 0.
pub fn parse_length(value: &str) -> Option<f32> {
    let caps = LEADING_NUMBER.captures(value)?;
    let n: f32 = caps.get(1)?.as_str().parse().ok()?;
    (n.is_finite() && n > 0.0).then_some(n)
}

/// Width and height from a `viewBox` value (`min-x min-y width height`).
pub fn parse_view_box(value: &str) -> Option<(f32, f32)> {
    let parts: Vec<f32> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f32>())
        .collect::<Result<_, _>>()
        .ok()?;
    if parts.len() != 4 {
        return None;
    }
    let (w, h) = (parts[2], parts[3]);
    (w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0).then_some((w, h))
}

fn parse_document(text: &str) -> Result<roxmltree::Document<'_>, JobError> {
    let opts = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    roxmltree::Document::parse_with_options(text, opts)
        .map_err(|e| JobError::decode(format!("malformed SVG markup: {e}")))
}

/// Resolve the nominal raster size of an SVG document.
pub fn resolve_dimensions(text: &str, fallback: (u32, u32)) -> Result<SvgDimensions, JobError> {
    let doc = parse_document(text)?;
    let root = doc.root_element();
    if root.tag_name().name() != "svg" {
        return Err(JobError::decode(format!(
            "root element is <{}>, expected <svg>",
            root.tag_name().name()
        )));
    }

    // Percentages read as plain numbers: `width="100%"` is 100 px and still
    // wins over `viewBox`.
    let width = root.attribute("width").and_then(parse_length);
    let height = root.attribute("height").and_then(parse_length);
    if let (Some(width), Some(height)) = (width, height) {
        return Ok(SvgDimensions {
            width,
            height,
            source: DimensionSource::Attributes,
        });
    }

    if let Some((width, height)) = root.attribute("viewBox").and_then(parse_view_box) {
        return Ok(SvgDimensions {
            width,
            height,
            source: DimensionSource::ViewBox,
        });
    }

    Ok(SvgDimensions {
        width: fallback.0 as f32,
        height: fallback.1 as f32,
        source: DimensionSource::Fallback,
    })
}

/// Rasterise SVG bytes onto a transparent RGBA surface.
pub fn rasterize(data: &[u8], options: &RenderOptions) -> Result<RgbaImage, JobError> {
    if data.is_empty() {
        return Err(JobError::decode("empty SVG file"));
    }
    let text = std::str::from_utf8(data)
        .map_err(|e| JobError::decode(format!("SVG is not valid UTF-8: {e}")))?;
    let text = text.trim_start_matches('\u{feff}');

    let dims = resolve_dimensions(text, options.fallback_svg_size)?;
    let scale = options.effective_scale();
    let (width, height) = dims.surface_size(scale);
    debug!(
        "SVG {}×{} ({:?}) × {} → {}×{} px",
        dims.width, dims.height, dims.source, scale, width, height
    );

    if width == 0 || height == 0 {
        return Err(JobError::resource(format!(
            "zero-area surface {width}×{height}"
        )));
    }
    if width > options.max_surface_edge || height > options.max_surface_edge {
        return Err(JobError::resource(format!(
            "surface {width}×{height} exceeds the {} px edge limit",
            options.max_surface_edge
        )));
    }

    let usvg_options = usvg::Options {
        fontdb: Arc::clone(&FONTS),
        ..usvg::Options::default()
    };
    let tree = usvg::Tree::from_str(text, &usvg_options)
        .map_err(|e| JobError::decode(format!("unrenderable SVG: {e}")))?;

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| JobError::resource(format!("cannot allocate {width}×{height} pixmap")))?;

    // Without any declared size the drawing keeps its own user units, as a
    // browser would; otherwise it is fitted to the resolved size.
    let tree_size = tree.size();
    let transform = match dims.source {
        DimensionSource::Fallback => tiny_skia::Transform::from_scale(scale, scale),
        _ => tiny_skia::Transform::from_scale(
            dims.width / tree_size.width() * scale,
            dims.height / tree_size.height() * scale,
        ),
    };
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let mut image = RgbaImage::new(width, height);
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: (u32, u32) = (800, 600);

    fn opts(scale: f32) -> RenderOptions {
        RenderOptions {
            scale,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn explicit_attributes_win() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100" viewBox="0 0 10 10"/>"#;
        let d = resolve_dimensions(svg, FALLBACK).unwrap();
        assert_eq!((d.width, d.height), (200.0, 100.0));
        assert_eq!(d.source, DimensionSource::Attributes);
    }

    #[test]
    fn view_box_when_attributes_missing() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 300 150"/>"#;
        let d = resolve_dimensions(svg, FALLBACK).unwrap();
        assert_eq!((d.width, d.height), (300.0, 150.0));
        assert_eq!(d.source, DimensionSource::ViewBox);
    }

    #[test]
    fn view_box_when_one_attribute_is_zero() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="0" height="50" viewBox="0,0,40,20"/>"#;
        let d = resolve_dimensions(svg, FALLBACK).unwrap();
        assert_eq!((d.width, d.height), (40.0, 20.0));
    }

    #[test]
    fn fallback_when_nothing_declared() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><rect width="5" height="5"/></svg>"#;
        let d = resolve_dimensions(svg, FALLBACK).unwrap();
        assert_eq!((d.width, d.height), (800.0, 600.0));
        assert_eq!(d.source, DimensionSource::Fallback);
    }

    #[test]
    fn percentages_win_over_view_box() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100%" height="100%" viewBox="0 0 300 150"/>"#;
        let d = resolve_dimensions(svg, FALLBACK).unwrap();
        assert_eq!((d.width, d.height), (100.0, 100.0));
        assert_eq!(d.source, DimensionSource::Attributes);
    }

    #[test]
    fn units_are_ignored() {
        assert_eq!(parse_length("200px"), Some(200.0));
        assert_eq!(parse_length(" 12.5mm"), Some(12.5));
        assert_eq!(parse_length("100%"), Some(100.0));
        assert_eq!(parse_length("auto"), None);
        assert_eq!(parse_length("0"), None);
        assert_eq!(parse_length("-4"), None);
    }

    #[test]
    fn bad_view_boxes() {
        assert_eq!(parse_view_box("0 0 300 150"), Some((300.0, 150.0)));
        assert_eq!(parse_view_box("0 0 300"), None);
        assert_eq!(parse_view_box("0 0 0 150"), None);
        assert_eq!(parse_view_box("a b c d"), None);
    }

    #[test]
    fn malformed_markup_is_a_decode_error() {
        let err = resolve_dimensions("<svg width='10'", FALLBACK).unwrap_err();
        assert!(matches!(err, JobError::Decode { .. }));
    }

    #[test]
    fn non_svg_root_is_a_decode_error() {
        let err = resolve_dimensions("<html/>", FALLBACK).unwrap_err();
        assert!(matches!(err, JobError::Decode { .. }));
    }

    #[test]
    fn rasterize_scales_surface() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100"><rect width="200" height="100" fill="red"/></svg>"#;
        let img = rasterize(svg, &opts(1.0)).unwrap();
        assert_eq!(img.dimensions(), (200, 100));
        let img = rasterize(svg, &opts(2.0)).unwrap();
        assert_eq!(img.dimensions(), (400, 200));
        let px = img.get_pixel(200, 100);
        assert_eq!(px.0, [255, 0, 0, 255]);
    }

    #[test]
    fn rasterize_view_box_and_fallback() {
        let vb = br#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 300 150"/>"#;
        assert_eq!(rasterize(vb, &opts(1.0)).unwrap().dimensions(), (300, 150));

        let none = br#"<svg xmlns="http://www.w3.org/2000/svg"/>"#;
        assert_eq!(rasterize(none, &opts(0.5)).unwrap().dimensions(), (400, 300));
    }

    #[test]
    fn transparency_survives() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="5" height="10" fill="blue"/></svg>"#;
        let img = rasterize(svg, &opts(1.0)).unwrap();
        assert_eq!(img.get_pixel(1, 1).0[3], 255);
        assert_eq!(img.get_pixel(8, 1).0[3], 0);
    }

    #[test]
    fn density_multiplies_scale() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10"/>"#;
        let o = RenderOptions {
            scale: 4.0,
            pixel_density: 2.0,
            ..RenderOptions::default()
        };
        assert_eq!(rasterize(svg, &o).unwrap().dimensions(), (160, 80));
    }

    #[test]
    fn oversized_surface_is_a_resource_error() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="1000" height="1000"/>"#;
        let o = RenderOptions {
            scale: 64.0,
            ..RenderOptions::default()
        };
        assert!(matches!(
            rasterize(svg, &o).unwrap_err(),
            JobError::ResourceInit { .. }
        ));
    }

    #[test]
    fn empty_input_is_a_decode_error() {
        assert!(matches!(
            rasterize(b"", &opts(1.0)).unwrap_err(),
            JobError::Decode { .. }
        ));
    }
}
