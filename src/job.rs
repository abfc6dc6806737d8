//! Per-file job state machine.
//!
//! ```text
//!            begin            complete
//! Pending ─────────▶ Converting ─────────▶ Completed
//!    │                    │
//!    │ cancel             │ fail
//!    ▼                    ▼
//! Cancelled             Error
//! ```
//!
//! Terminal states never transition again; [`Job::reset`] is the only way
//! back to `Pending` and it wipes progress and error (a fresh attempt, not a
//! resume). The orchestrator in [`crate::convert`] is the sole mutator.
//!
//! Progress while `Converting` is a heartbeat: it moves on a timer to show
//! the batch is alive and says nothing about how much of the file has been
//! processed.

use crate::error::ConvertError;
use crate::pipeline::input::InputFile;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a single file in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Converting,
    Completed,
    Error,
    /// The batch was cancelled before this file started.
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Error | JobStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Converting => "converting",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One input file's conversion state.
#[derive(Debug, Clone)]
pub struct Job {
    index: usize,
    file: InputFile,
    status: JobStatus,
    progress: u8,
    error: Option<String>,
}

impl Job {
    /// Create a job in `Pending` for the file at `index` in the batch.
    pub fn new(index: usize, file: InputFile) -> Self {
        Self {
            index,
            file,
            status: JobStatus::Pending,
            progress: 0,
            error: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn file(&self) -> &InputFile {
        &self.file
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// `Pending → Converting`; progress restarts at 0.
    pub fn begin(&mut self) -> Result<(), ConvertError> {
        self.expect(JobStatus::Pending, JobStatus::Converting)?;
        self.status = JobStatus::Converting;
        self.progress = 0;
        Ok(())
    }

    /// Advance the liveness heartbeat by `step`, never past `cap`.
    ///
    /// Returns the new value only when it actually moved, so callers emit a
    /// notification per visible change rather than per tick.
    pub fn heartbeat(&mut self, step: u8, cap: u8) -> Result<Option<u8>, ConvertError> {
        if self.status != JobStatus::Converting {
            return Err(ConvertError::InvalidTransition {
                from: self.status,
                to: JobStatus::Converting,
            });
        }
        let next = self.progress.saturating_add(step).min(cap.min(100));
        if next > self.progress {
            self.progress = next;
            Ok(Some(next))
        } else {
            Ok(None)
        }
    }

    /// `Converting → Completed`; progress snaps to 100.
    pub fn complete(&mut self) -> Result<(), ConvertError> {
        self.expect(JobStatus::Converting, JobStatus::Completed)?;
        self.status = JobStatus::Completed;
        self.progress = 100;
        Ok(())
    }

    /// `Converting → Error`; progress drops to 0 and the message is kept.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), ConvertError> {
        self.expect(JobStatus::Converting, JobStatus::Error)?;
        self.status = JobStatus::Error;
        self.progress = 0;
        self.error = Some(message.into());
        Ok(())
    }

    /// `Pending → Cancelled`.
    pub fn cancel(&mut self) -> Result<(), ConvertError> {
        self.expect(JobStatus::Pending, JobStatus::Cancelled)?;
        self.status = JobStatus::Cancelled;
        Ok(())
    }

    /// Put the job back to `Pending` for a brand-new attempt.
    pub fn reset(&mut self) {
        self.status = JobStatus::Pending;
        self.progress = 0;
        self.error = None;
    }

    fn expect(&self, from: JobStatus, to: JobStatus) -> Result<(), ConvertError> {
        if self.status == from {
            Ok(())
        } else {
            Err(ConvertError::InvalidTransition {
                from: self.status,
                to,
            })
        }
    }
}
