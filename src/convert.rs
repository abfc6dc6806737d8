//! Batch conversion entry points.
//!
//! Files are converted strictly one at a time, in input order. A failure is
//! recorded on its own job and the batch moves on; only pre-flight problems
//! (bad scale, empty batch, unknown key) abort a run, and they do so before
//! any job exists.
//!
//! Use [`crate::stream::convert_stream`] instead when you want the per-file
//! events as a `Stream` rather than through a callback.

use crate::config::{ConversionConfig, ConversionSpec, RenderOptions};
use crate::converter::FormatConverter;
use crate::delivery::DirectorySink;
use crate::error::{ConvertError, JobError};
use crate::job::{Job, JobStatus};
use crate::output::{BatchOutput, BatchStats, JobResult, OutputArtifact};
use crate::pipeline::input::{self, InputFile};
use crate::progress::ConversionProgressCallback;
use crate::registry::ConverterRegistry;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Convert a batch with the built-in converters.
///
/// # Returns
/// `Ok(BatchOutput)` once every file reached a terminal state, even if some
/// failed (check `output.stats.failed_files`, or call
/// [`BatchOutput::into_result`]).
///
/// # Errors
/// Returns `Err(ConvertError)` only before the first file starts:
/// - scale outside `0.5..=64`
/// - no input files
/// - conversion key with no registered converter
pub async fn run(
    files: Vec<InputFile>,
    spec: &ConversionSpec,
    config: &ConversionConfig,
) -> Result<BatchOutput, ConvertError> {
    run_with_registry(ConverterRegistry::builtin(), files, spec, config).await
}

/// Convert a batch with converters from `registry`.
pub async fn run_with_registry(
    registry: &ConverterRegistry,
    files: Vec<InputFile>,
    spec: &ConversionSpec,
    config: &ConversionConfig,
) -> Result<BatchOutput, ConvertError> {
    let total_start = Instant::now();

    // ── Step 1: Pre-flight ───────────────────────────────────────────────
    let converter = preflight(registry, files.len(), spec)?;
    let options = config.render_options(spec);
    let total = files.len();
    info!(
        "Starting batch: {} file(s), {} via {}, scale {}",
        total,
        spec.conversion,
        converter.name(),
        spec.scale
    );

    // ── Step 2: Create jobs ──────────────────────────────────────────────
    let mut jobs: Vec<Job> = files
        .into_iter()
        .enumerate()
        .map(|(index, file)| Job::new(index, file))
        .collect();
    notify(config, |cb| cb.on_batch_start(total));

    // ── Step 3: Convert sequentially ─────────────────────────────────────
    let mut results = Vec::with_capacity(total);
    for job in jobs.iter_mut() {
        results.push(drive_job(job, total, &converter, options, config).await?);
    }

    // ── Step 4: Stats ────────────────────────────────────────────────────
    let stats = BatchStats {
        total_files: total,
        completed_files: results.iter().filter(|r| r.is_completed()).count(),
        failed_files: results.iter().filter(|r| r.error.is_some()).count(),
        cancelled_files: results
            .iter()
            .filter(|r| r.status == JobStatus::Cancelled)
            .count(),
        output_bytes: results.iter().map(|r| r.output_bytes).sum(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Batch complete: {}/{} converted, {} failed, {} cancelled, {}ms",
        stats.completed_files,
        total,
        stats.failed_files,
        stats.cancelled_files,
        stats.total_duration_ms
    );
    notify(config, |cb| cb.on_batch_complete(total, stats.completed_files));

    Ok(BatchOutput {
        conversion: converter.kind(),
        jobs: results,
        stats,
    })
}

/// Resolve paths and URLs, then [`run`] the batch.
///
/// The conversion key and scale are checked before anything is read or
/// downloaded.
pub async fn convert_paths<S: AsRef<str>>(
    inputs: &[S],
    spec: &ConversionSpec,
    config: &ConversionConfig,
) -> Result<BatchOutput, ConvertError> {
    preflight(ConverterRegistry::builtin(), inputs.len(), spec)?;

    let mut files = Vec::with_capacity(inputs.len());
    for input_str in inputs {
        files.push(input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?);
    }
    run(files, spec, config).await
}

/// Convert paths and URLs, writing every artifact into `dir`.
///
/// The directory is created if needed. Any sink already set on `config` is
/// replaced by a [`DirectorySink`].
pub async fn convert_to_dir<S: AsRef<str>>(
    inputs: &[S],
    dir: impl AsRef<Path>,
    spec: &ConversionSpec,
    config: &ConversionConfig,
) -> Result<BatchOutput, ConvertError> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ConvertError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let mut config = config.clone();
    config.output_sink = Some(Arc::new(DirectorySink::new(dir)));
    convert_paths(inputs, spec, &config).await
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    files: Vec<InputFile>,
    spec: &ConversionSpec,
    config: &ConversionConfig,
) -> Result<BatchOutput, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(files, spec, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Scale, batch size and key, in that order. Nothing is created on failure.
pub(crate) fn preflight(
    registry: &ConverterRegistry,
    file_count: usize,
    spec: &ConversionSpec,
) -> Result<Arc<dyn FormatConverter>, ConvertError> {
    spec.validate()?;
    if file_count == 0 {
        return Err(ConvertError::EmptyBatch);
    }
    registry
        .resolve(&spec.conversion)
        .ok_or_else(|| ConvertError::UnsupportedConversion {
            key: spec.conversion.clone(),
        })
}

fn notify(config: &ConversionConfig, f: impl FnOnce(&dyn ConversionProgressCallback)) {
    if let Some(ref cb) = config.progress_callback {
        f(cb.as_ref());
    }
}

/// Take one job from `Pending` to a terminal state.
///
/// Only a state-machine violation (a bug) is returned as `Err`; conversion
/// and delivery failures end up on the job.
async fn drive_job(
    job: &mut Job,
    total: usize,
    converter: &Arc<dyn FormatConverter>,
    options: RenderOptions,
    config: &ConversionConfig,
) -> Result<JobResult, ConvertError> {
    let start = Instant::now();
    let index = job.index();
    let name = job.file().name().to_string();

    if config.cancel_token.is_cancelled() {
        job.cancel()?;
        debug!("[{}/{}] Cancelled before start: {}", index + 1, total, name);
        notify(config, |cb| cb.on_job_cancelled(index, total));
        return Ok(job_result(job, None, None, 0, start));
    }

    job.begin()?;
    info!("[{}/{}] Converting {} ({} bytes)", index + 1, total, name, job.file().size());
    notify(config, |cb| cb.on_job_start(index, total, &name));

    let outcome = match convert_with_heartbeat(job, total, converter, options, config).await? {
        Ok(artifact) => deliver(artifact, config).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok((artifact_name, bytes, retained)) => {
            job.complete()?;
            info!(
                "[{}/{}] {} → {} ({} bytes, {}ms)",
                index + 1,
                total,
                name,
                artifact_name,
                bytes,
                start.elapsed().as_millis()
            );
            notify(config, |cb| cb.on_job_complete(index, total, &artifact_name, bytes));
            Ok(job_result(job, Some(artifact_name), retained, bytes as u64, start))
        }
        Err(e) => {
            let message = e.to_string();
            job.fail(&message)?;
            warn!("[{}/{}] {} failed: {}", index + 1, total, name, message);
            notify(config, |cb| cb.on_job_error(index, total, &message));
            let mut result = job_result(job, None, None, 0, start);
            result.error = Some(e);
            Ok(result)
        }
    }
}

/// Run the converter on the blocking pool, ticking the heartbeat until it
/// returns.
async fn convert_with_heartbeat(
    job: &mut Job,
    total: usize,
    converter: &Arc<dyn FormatConverter>,
    options: RenderOptions,
    config: &ConversionConfig,
) -> Result<Result<OutputArtifact, JobError>, ConvertError> {
    let index = job.index();
    let file = job.file().clone();
    let conv = Arc::clone(converter);
    let mut task = tokio::task::spawn_blocking(move || conv.convert(&file, &options));

    let period = Duration::from_millis(config.heartbeat_interval_ms.max(1));
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            joined = &mut task => {
                return Ok(joined.unwrap_or_else(|e| {
                    Err(JobError::Internal {
                        detail: if e.is_panic() {
                            "converter panicked".to_string()
                        } else {
                            format!("converter task ended early: {e}")
                        },
                    })
                }));
            }
            _ = ticker.tick() => {
                if let Some(percent) = job.heartbeat(config.heartbeat_step, config.heartbeat_cap)? {
                    debug!("[{}/{}] heartbeat {}%", index + 1, total, percent);
                    notify(config, |cb| cb.on_job_progress(index, total, percent));
                }
            }
        }
    }
}

/// Hand the artifact to the sink, or keep it when there is none.
///
/// Returns `(name, size, retained artifact)`.
async fn deliver(
    artifact: OutputArtifact,
    config: &ConversionConfig,
) -> Result<(String, usize, Option<OutputArtifact>), JobError> {
    let name = artifact.name.clone();
    let size = artifact.len();

    let Some(ref sink) = config.output_sink else {
        return Ok((name, size, Some(artifact)));
    };

    let sink = Arc::clone(sink);
    let delivered = tokio::task::spawn_blocking(move || sink.deliver(&artifact))
        .await
        .map_err(|e| JobError::Delivery {
            name: name.clone(),
            detail: format!("delivery task failed: {e}"),
        })?;

    match delivered {
        Ok(()) => Ok((name, size, None)),
        Err(detail) => Err(JobError::Delivery { name, detail }),
    }
}

fn job_result(
    job: &Job,
    output_name: Option<String>,
    output: Option<OutputArtifact>,
    output_bytes: u64,
    start: Instant,
) -> JobResult {
    JobResult {
        index: job.index(),
        name: job.file().name().to_string(),
        status: job.status(),
        progress: job.progress(),
        error: None,
        output_name,
        output,
        output_bytes,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}
