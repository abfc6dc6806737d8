//! Output delivery: where converted artifacts go.
//!
//! The orchestrator hands every successful artifact to exactly one
//! [`OutputSink::deliver`] call. Failed files never reach the sink.

use crate::output::OutputArtifact;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Receives converted artifacts.
///
/// `deliver` runs on the orchestrator's task between the converter finishing
/// and the job being marked completed; an `Err` turns the job into a failure.
pub trait OutputSink: Send + Sync {
    fn deliver(&self, artifact: &OutputArtifact) -> Result<(), String>;
}

/// Writes artifacts into a directory.
///
/// Each file is written to a temporary sibling and then renamed into place,
/// so a crash never leaves a half-written output behind.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where `artifact` ends up.
    pub fn path_for(&self, artifact: &OutputArtifact) -> PathBuf {
        self.dir.join(&artifact.name)
    }
}

impl OutputSink for DirectorySink {
    fn deliver(&self, artifact: &OutputArtifact) -> Result<(), String> {
        if artifact.name.contains('/') || artifact.name.contains('\\') {
            return Err(format!("refusing to write outside {}", self.dir.display()));
        }
        let target = self.path_for(artifact);

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| format!("temp file in {}: {e}", self.dir.display()))?;
        tmp.write_all(&artifact.bytes)
            .map_err(|e| format!("write {}: {e}", target.display()))?;
        tmp.persist(&target)
            .map_err(|e| format!("rename into {}: {}", target.display(), e.error))?;

        debug!("Wrote {} ({} bytes)", target.display(), artifact.len());
        Ok(())
    }
}

/// Keeps artifacts in memory. Useful for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySink {
    artifacts: Mutex<Vec<OutputArtifact>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far, in delivery order.
    pub fn artifacts(&self) -> Vec<OutputArtifact> {
        self.artifacts
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.artifacts.lock().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OutputSink for MemorySink {
    fn deliver(&self, artifact: &OutputArtifact) -> Result<(), String> {
        self.artifacts
            .lock()
            .map_err(|_| "memory sink poisoned".to_string())?
            .push(artifact.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ConversionKind;

    fn artifact(name: &str) -> OutputArtifact {
        OutputArtifact::new(name, ConversionKind::ToPng, 1, 1, vec![1, 2, 3, 4])
    }

    #[test]
    fn directory_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        let a = artifact("logo.svg");
        sink.deliver(&a).unwrap();

        let written = std::fs::read(dir.path().join("converted-logo.png")).unwrap();
        assert_eq!(written, vec![1, 2, 3, 4]);
    }

    #[test]
    fn directory_sink_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        sink.deliver(&artifact("a.svg")).unwrap();
        let mut second = artifact("a.svg");
        second.bytes = vec![9];
        sink.deliver(&second).unwrap();
        assert_eq!(std::fs::read(dir.path().join("converted-a.png")).unwrap(), vec![9]);
    }

    #[test]
    fn directory_sink_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("nope"));
        assert!(sink.deliver(&artifact("a.svg")).is_err());
    }

    #[test]
    fn directory_sink_rejects_path_names() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        let mut a = artifact("a.svg");
        a.name = "../escape.png".into();
        assert!(sink.deliver(&a).is_err());
    }

    #[test]
    fn memory_sink_collects_in_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());
        sink.deliver(&artifact("one.svg")).unwrap();
        sink.deliver(&artifact("two.svg")).unwrap();
        let names: Vec<_> = sink.artifacts().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["converted-one.png", "converted-two.png"]);
    }
}
