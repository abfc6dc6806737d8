//! # fileconv
//!
//! Batch file conversion: SVG to PNG, raster images to WebP, and any image
//! to a single-page PDF.
//!
//! A batch is a list of files plus one conversion key (`"to-png"`,
//! `"to-webp"`, `"to-pdf"`). Files are converted one at a time in input
//! order; each carries its own status and progress, and one bad file never
//! stops the others.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files + key
//!  │
//!  ├─ 1. Pre-flight  scale in 0.5..=64, non-empty batch, key registered
//!  ├─ 2. Jobs        one Pending job per file
//!  ├─ 3. Convert     per file, in order: decode → encode (spawn_blocking),
//!  │                 heartbeat every 200 ms while it runs
//!  ├─ 4. Deliver     output sink, or kept in the result
//!  └─ 5. Output      per-file results + batch stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fileconv::{run, ConversionConfig, ConversionSpec, InputFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let files = vec![InputFile::from_path("logo.svg").await?];
//!     let spec = ConversionSpec::new("to-png").with_scale(2.0);
//!     let output = run(files, &spec, &ConversionConfig::default()).await?;
//!     for artifact in output.artifacts() {
//!         std::fs::write(&artifact.name, &artifact.bytes)?;
//!     }
//!     eprintln!("{}/{} converted", output.stats.completed_files, output.stats.total_files);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `fileconv` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! fileconv = { version = "0.2", default-features = false }
//! ```
//!
//! ## Conversions
//!
//! | Key | Sources | Output |
//! |-----|---------|--------|
//! | `to-png`  | SVG (rasterised at `scale`), PNG, JPEG, WebP, GIF, BMP | PNG with alpha |
//! | `to-webp` | the same | lossy WebP, quality 0.8 |
//! | `to-pdf`  | the same | one page, A4, image fitted and centred |
//!
//! The other keys in [`ConversionKind`] are listed by
//! [`catalog::offered_for`] but have no converter; [`run`] rejects them with
//! [`ConvertError::UnsupportedConversion`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod catalog;
pub mod config;
pub mod convert;
pub mod converter;
pub mod delivery;
pub mod error;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod registry;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use catalog::{common_conversions, offered_for, scale_applies, ConversionKind};
pub use config::{
    ConversionConfig, ConversionConfigBuilder, ConversionSpec, PageSize, PdfImageEncoding,
    RenderOptions,
};
pub use convert::{convert_paths, convert_sync, convert_to_dir, run, run_with_registry};
pub use converter::{FormatConverter, ImageToPdf, ToPng, ToWebp};
pub use delivery::{DirectorySink, MemorySink, OutputSink};
pub use error::{ConvertError, JobError};
pub use job::{Job, JobStatus};
pub use output::{BatchOutput, BatchStats, JobResult, OutputArtifact};
pub use pipeline::input::{resolve_input, InputFile};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use registry::ConverterRegistry;
pub use stream::{convert_stream, BatchEvent, BatchEventStream};
