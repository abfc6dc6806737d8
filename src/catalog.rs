//! Conversion-type keys and the options offered for each source media type.
//!
//! The keys are the strings callers pass to [`crate::convert::run`]
//! (`"to-png"`, `"to-pdf"`, …). Every key is listed here, including the
//! office-document targets that have no converter: a front-end may offer
//! them, and the registry then refuses them before any file is touched.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every conversion type a caller can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionKind {
    #[serde(rename = "to-pdf")]
    ToPdf,
    #[serde(rename = "to-png")]
    ToPng,
    #[serde(rename = "to-webp")]
    ToWebp,
    #[serde(rename = "to-jpg")]
    ToJpg,
    #[serde(rename = "to-docx")]
    ToDocx,
    #[serde(rename = "to-odt")]
    ToOdt,
    #[serde(rename = "to-xlsx")]
    ToXlsx,
    #[serde(rename = "to-ods")]
    ToOds,
    #[serde(rename = "to-pptx")]
    ToPptx,
    #[serde(rename = "to-odp")]
    ToOdp,
}

impl ConversionKind {
    pub const ALL: [ConversionKind; 10] = [
        ConversionKind::ToPdf,
        ConversionKind::ToPng,
        ConversionKind::ToWebp,
        ConversionKind::ToJpg,
        ConversionKind::ToDocx,
        ConversionKind::ToOdt,
        ConversionKind::ToXlsx,
        ConversionKind::ToOds,
        ConversionKind::ToPptx,
        ConversionKind::ToOdp,
    ];

    /// The wire key, e.g. `"to-webp"`.
    pub fn key(self) -> &'static str {
        match self {
            ConversionKind::ToPdf => "to-pdf",
            ConversionKind::ToPng => "to-png",
            ConversionKind::ToWebp => "to-webp",
            ConversionKind::ToJpg => "to-jpg",
            ConversionKind::ToDocx => "to-docx",
            ConversionKind::ToOdt => "to-odt",
            ConversionKind::ToXlsx => "to-xlsx",
            ConversionKind::ToOds => "to-ods",
            ConversionKind::ToPptx => "to-pptx",
            ConversionKind::ToOdp => "to-odp",
        }
    }

    /// Human-readable label for option lists.
    pub fn label(self) -> &'static str {
        match self {
            ConversionKind::ToPdf => "Convert to PDF",
            ConversionKind::ToPng => "Convert to PNG",
            ConversionKind::ToWebp => "Convert to WebP",
            ConversionKind::ToJpg => "Convert to JPG",
            ConversionKind::ToDocx => "Convert to Word (DOCX)",
            ConversionKind::ToOdt => "Convert to OpenDocument Text",
            ConversionKind::ToXlsx => "Convert to Excel (XLSX)",
            ConversionKind::ToOds => "Convert to OpenDocument Spreadsheet",
            ConversionKind::ToPptx => "Convert to PowerPoint (PPTX)",
            ConversionKind::ToOdp => "Convert to OpenDocument Presentation",
        }
    }

    /// File extension of the produced artifact, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ConversionKind::ToPdf => "pdf",
            ConversionKind::ToPng => "png",
            ConversionKind::ToWebp => "webp",
            ConversionKind::ToJpg => "jpg",
            ConversionKind::ToDocx => "docx",
            ConversionKind::ToOdt => "odt",
            ConversionKind::ToXlsx => "xlsx",
            ConversionKind::ToOds => "ods",
            ConversionKind::ToPptx => "pptx",
            ConversionKind::ToOdp => "odp",
        }
    }

    /// MIME type of the produced artifact.
    pub fn media_type(self) -> &'static str {
        match self {
            ConversionKind::ToPdf => "application/pdf",
            ConversionKind::ToPng => "image/png",
            ConversionKind::ToWebp => "image/webp",
            ConversionKind::ToJpg => "image/jpeg",
            ConversionKind::ToDocx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ConversionKind::ToOdt => "application/vnd.oasis.opendocument.text",
            ConversionKind::ToXlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ConversionKind::ToOds => "application/vnd.oasis.opendocument.spreadsheet",
            ConversionKind::ToPptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            ConversionKind::ToOdp => "application/vnd.oasis.opendocument.presentation",
        }
    }

    /// Whether the scale factor changes the output for this target.
    pub fn is_raster_target(self) -> bool {
        matches!(
            self,
            ConversionKind::ToPng | ConversionKind::ToJpg | ConversionKind::ToWebp
        )
    }
}

impl fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Returned when a string is not one of the known conversion keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownConversion(pub String);

impl fmt::Display for UnknownConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown conversion type '{}'", self.0)
    }
}

impl std::error::Error for UnknownConversion {}

impl FromStr for ConversionKind {
    type Err = UnknownConversion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConversionKind::ALL
            .into_iter()
            .find(|k| k.key() == wanted)
            .ok_or_else(|| UnknownConversion(s.to_string()))
    }
}

// ── Offered options ──────────────────────────────────────────────────────

use ConversionKind::*;

/// Conversions offered for a single source media type. Unknown types get none.
pub fn offered_for(media_type: &str) -> &'static [ConversionKind] {
    match media_type {
        "application/pdf" => &[ToDocx, ToOdt, ToJpg, ToPng],
        "application/msword" => &[ToDocx, ToOdt, ToPdf],
        "application/vnd.ms-excel" => &[ToXlsx, ToOds, ToPdf],
        "application/vnd.ms-powerpoint" => &[ToPptx, ToOdp, ToPdf],
        "image/svg+xml" => &[ToPng, ToJpg, ToWebp, ToPdf],
        "image/jpeg" => &[ToPng, ToWebp, ToPdf],
        "image/png" => &[ToJpg, ToWebp, ToPdf],
        "image/webp" => &[ToJpg, ToPng, ToPdf],
        _ => &[],
    }
}

/// Conversions offered for every file of a batch.
///
/// Order follows the first file; later files only filter. Once the
/// intersection is empty it stays empty, so a file with an unknown media
/// type leaves nothing in common.
pub fn common_conversions<'a, I>(media_types: I) -> Vec<ConversionKind>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut common: Option<Vec<ConversionKind>> = None;
    for media_type in media_types {
        let offered = offered_for(media_type);
        match common.as_mut() {
            Some(kinds) => kinds.retain(|k| offered.contains(k)),
            None => common = Some(offered.to_vec()),
        }
    }
    common.unwrap_or_default()
}

/// True when the scale factor matters for this batch: at least one SVG
/// source going to a raster target.
pub fn scale_applies<'a, I>(media_types: I, kind: ConversionKind) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    kind.is_raster_target() && media_types.into_iter().any(|m| m == "image/svg+xml")
}
