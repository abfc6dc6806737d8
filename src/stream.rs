//! Streaming API: batch events as a `Stream`.
//!
//! [`convert_stream`] validates the batch, spawns it on the runtime and
//! returns immediately. Events arrive in the order the orchestrator emits
//! them: every event of file *i* before any of file *i + 1*, ending with a
//! single [`BatchEvent::Finished`]. The stream closes when the batch ends.

use crate::config::{ConversionConfig, ConversionSpec};
use crate::convert;
use crate::error::ConvertError;
use crate::job::JobStatus;
use crate::pipeline::input::InputFile;
use crate::progress::{ConversionProgressCallback, ProgressCallback};
use crate::registry::ConverterRegistry;
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::warn;

/// One observable step of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    Started { total: usize },
    JobStarted { index: usize, name: String },
    Progress { index: usize, percent: u8 },
    JobCompleted { index: usize, output_name: String, bytes: usize },
    JobFailed { index: usize, error: String },
    JobCancelled { index: usize },
    Finished { total: usize, completed: usize },
}

impl BatchEvent {
    /// Index of the job this event belongs to.
    pub fn index(&self) -> Option<usize> {
        match *self {
            BatchEvent::JobStarted { index, .. }
            | BatchEvent::Progress { index, .. }
            | BatchEvent::JobCompleted { index, .. }
            | BatchEvent::JobFailed { index, .. }
            | BatchEvent::JobCancelled { index } => Some(index),
            BatchEvent::Started { .. } | BatchEvent::Finished { .. } => None,
        }
    }

    /// The `(status, progress)` a job reached with this event.
    pub fn status_pair(&self) -> Option<(JobStatus, u8)> {
        match *self {
            BatchEvent::JobStarted { .. } => Some((JobStatus::Converting, 0)),
            BatchEvent::Progress { percent, .. } => Some((JobStatus::Converting, percent)),
            BatchEvent::JobCompleted { .. } => Some((JobStatus::Completed, 100)),
            BatchEvent::JobFailed { .. } => Some((JobStatus::Error, 0)),
            BatchEvent::JobCancelled { .. } => Some((JobStatus::Cancelled, 0)),
            BatchEvent::Started { .. } | BatchEvent::Finished { .. } => None,
        }
    }

    /// True for the event that ends a job.
    pub fn is_terminal(&self) -> bool {
        self.status_pair()
            .is_some_and(|(status, _)| status.is_terminal())
    }
}

/// A boxed stream of batch events.
pub type BatchEventStream = Pin<Box<dyn Stream<Item = BatchEvent> + Send>>;

/// Forwards callbacks into a channel, then to the caller's own callback.
struct ChannelCallback {
    tx: mpsc::UnboundedSender<BatchEvent>,
    inner: Option<ProgressCallback>,
}

impl ChannelCallback {
    fn send(&self, event: BatchEvent) {
        // A dropped receiver only means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

impl ConversionProgressCallback for ChannelCallback {
    fn on_batch_start(&self, total: usize) {
        self.send(BatchEvent::Started { total });
        if let Some(ref cb) = self.inner {
            cb.on_batch_start(total);
        }
    }

    fn on_job_start(&self, index: usize, total: usize, name: &str) {
        self.send(BatchEvent::JobStarted {
            index,
            name: name.to_string(),
        });
        if let Some(ref cb) = self.inner {
            cb.on_job_start(index, total, name);
        }
    }

    fn on_job_progress(&self, index: usize, total: usize, percent: u8) {
        self.send(BatchEvent::Progress { index, percent });
        if let Some(ref cb) = self.inner {
            cb.on_job_progress(index, total, percent);
        }
    }

    fn on_job_complete(&self, index: usize, total: usize, output_name: &str, bytes: usize) {
        self.send(BatchEvent::JobCompleted {
            index,
            output_name: output_name.to_string(),
            bytes,
        });
        if let Some(ref cb) = self.inner {
            cb.on_job_complete(index, total, output_name, bytes);
        }
    }

    fn on_job_error(&self, index: usize, total: usize, error: &str) {
        self.send(BatchEvent::JobFailed {
            index,
            error: error.to_string(),
        });
        if let Some(ref cb) = self.inner {
            cb.on_job_error(index, total, error);
        }
    }

    fn on_job_cancelled(&self, index: usize, total: usize) {
        self.send(BatchEvent::JobCancelled { index });
        if let Some(ref cb) = self.inner {
            cb.on_job_cancelled(index, total);
        }
    }

    fn on_batch_complete(&self, total: usize, completed: usize) {
        self.send(BatchEvent::Finished { total, completed });
        if let Some(ref cb) = self.inner {
            cb.on_batch_complete(total, completed);
        }
    }
}

/// Convert a batch, streaming its events.
///
/// Must be called from within a tokio runtime.
///
/// # Returns
/// - `Ok(BatchEventStream)` — the batch is running
/// - `Err(ConvertError)` — pre-flight failure; nothing was started
///
/// # Example
/// ```rust,no_run
/// use fileconv::{convert_stream, BatchEvent, ConversionConfig, ConversionSpec, InputFile};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let file = InputFile::from_path("logo.svg").await?;
/// let spec = ConversionSpec::new("to-png").with_scale(2.0);
/// let mut events = convert_stream(vec![file], spec, &ConversionConfig::default())?;
/// while let Some(event) = events.next().await {
///     if let BatchEvent::JobCompleted { output_name, bytes, .. } = event {
///         println!("{output_name}: {bytes} bytes");
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub fn convert_stream(
    files: Vec<InputFile>,
    spec: ConversionSpec,
    config: &ConversionConfig,
) -> Result<BatchEventStream, ConvertError> {
    convert::preflight(ConverterRegistry::builtin(), files.len(), &spec)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let mut config = config.clone();
    config.progress_callback = Some(Arc::new(ChannelCallback {
        tx,
        inner: config.progress_callback.take(),
    }));

    tokio::spawn(async move {
        if let Err(e) = convert::run(files, &spec, &config).await {
            warn!("Streaming batch aborted: {}", e);
        }
    });

    Ok(Box::pin(UnboundedReceiverStream::new(rx)))
}
