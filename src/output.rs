//! Result types returned by a batch run.

use crate::catalog::ConversionKind;
use crate::error::{ConvertError, JobError};
use crate::job::JobStatus;
use serde::{Deserialize, Serialize};

/// A converted file, ready to be saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputArtifact {
    /// File name for the saved artifact, e.g. `converted-logo.png`.
    pub name: String,
    /// MIME type of `bytes`.
    pub media_type: String,
    /// Pixel width of the raster that was encoded or embedded.
    pub width: u32,
    /// Pixel height of the raster that was encoded or embedded.
    pub height: u32,
    /// Encoded output.
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl OutputArtifact {
    pub fn new(source_name: &str, kind: ConversionKind, width: u32, height: u32, bytes: Vec<u8>) -> Self {
        Self {
            name: output_name(source_name, kind),
            media_type: kind.media_type().to_string(),
            width,
            height,
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Name of the artifact produced from `source_name`.
///
/// `converted-` is prefixed and the source extension swapped for the
/// target's (`photo.png` → `converted-photo.webp`). A name that already ends
/// in the target extension is kept as is (`scan.pdf` → `converted-scan.pdf`).
pub fn output_name(source_name: &str, kind: ConversionKind) -> String {
    let ext = kind.extension();
    let lower = source_name.to_ascii_lowercase();
    let encodes_target = lower.ends_with(&format!(".{ext}"))
        || (kind == ConversionKind::ToJpg && lower.ends_with(".jpeg"));
    if encodes_target {
        return format!("converted-{source_name}");
    }

    let stem = match source_name.rfind('.') {
        Some(dot) if dot > 0 => &source_name[..dot],
        _ => source_name,
    };
    format!("converted-{stem}.{ext}")
}

/// Final state of one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    /// 0-based position in the batch.
    pub index: usize,
    /// Source file name.
    pub name: String,
    pub status: JobStatus,
    /// 100 for completed files, 0 otherwise.
    pub progress: u8,
    /// Set when `status` is `Error`.
    pub error: Option<JobError>,
    /// Name of the delivered artifact, when the file completed.
    pub output_name: Option<String>,
    /// The artifact itself, kept only when no output sink is configured.
    pub output: Option<OutputArtifact>,
    /// Size of the delivered artifact; 0 unless completed.
    pub output_bytes: u64,
    /// Wall-clock time spent on this file.
    pub duration_ms: u64,
}

impl JobResult {
    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }
}

/// Batch-level counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_files: usize,
    pub completed_files: usize,
    pub failed_files: usize,
    pub cancelled_files: usize,
    /// Sum of delivered artifact sizes.
    pub output_bytes: u64,
    pub total_duration_ms: u64,
}

/// Everything a batch run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    pub conversion: ConversionKind,
    /// One entry per input file, in input order.
    pub jobs: Vec<JobResult>,
    pub stats: BatchStats,
}

impl BatchOutput {
    /// Treat any failed file as an error.
    ///
    /// Cancelled files are not failures.
    pub fn into_result(self) -> Result<Self, ConvertError> {
        if self.stats.failed_files > 0 {
            Err(ConvertError::PartialFailure {
                completed: self.stats.completed_files,
                failed: self.stats.failed_files,
                total: self.stats.total_files,
            })
        } else {
            Ok(self)
        }
    }

    /// Artifacts retained in the results (only when no sink was configured).
    pub fn artifacts(&self) -> impl Iterator<Item = &OutputArtifact> {
        self.jobs.iter().filter_map(|j| j.output.as_ref())
    }
}
