//! Pipeline stages for file conversion.
//!
//! Each submodule implements one step. Converters in [`crate::converter`]
//! chain them; none of them knows about jobs, progress or delivery.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ svg / raster ──▶ raster (PNG, WebP)
//! (bytes)   (decode)      └─▶ document (PDF)
//! ```
//!
//! 1. [`input`]    — bytes, local path or URL to an [`input::InputFile`]
//! 2. [`svg`]      — resolve SVG dimensions and rasterise with resvg
//! 3. [`raster`]   — decode by media type; encode PNG and lossy WebP
//! 4. [`document`] — place a raster on a single PDF page

pub mod document;
pub mod input;
pub mod raster;
pub mod svg;
