//! Where finished exports go.

use super::ExportArtifact;
use crate::error::ExportError;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Result of handing an artifact to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Written to disk
    Saved(PathBuf),
    /// Held in memory under this name
    Kept(String),
    /// The user dismissed the save dialog
    Declined,
}

/// Delivers an encoded export to the user.
pub trait OutputSink {
    /// Delivers one artifact.
    fn deliver(&self, artifact: &ExportArtifact) -> impl Future<Output = Result<Delivery, ExportError>>;
}

/// Writes artifacts into a directory under their own file name.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Creates a sink writing into `dir`; the directory is created on first delivery.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl OutputSink for DirectorySink {
    async fn deliver(&self, artifact: &ExportArtifact) -> Result<Delivery, ExportError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&artifact.file_name);
        std::fs::write(&path, &artifact.bytes)
            .map_err(|e| ExportError::Output(format!("failed to write {}: {}", path.display(), e)))?;
        log::info!("Wrote {} ({} bytes)", path.display(), artifact.bytes.len());
        Ok(Delivery::Saved(path))
    }
}

/// Asks for a location with a native save dialog.
#[derive(Debug, Clone, Default)]
pub struct SaveDialogSink;

impl OutputSink for SaveDialogSink {
    async fn deliver(&self, artifact: &ExportArtifact) -> Result<Delivery, ExportError> {
        let extension = Path::new(&artifact.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        let Some(handle) = rfd::AsyncFileDialog::new()
            .add_filter(extension.to_uppercase(), &[extension.as_str()])
            .set_file_name(&artifact.file_name)
            .save_file()
            .await
        else {
            log::info!("Save dialog dismissed for {}", artifact.file_name);
            return Ok(Delivery::Declined);
        };
        let path = handle.path().to_path_buf();
        std::fs::write(&path, &artifact.bytes)
            .map_err(|e| ExportError::Output(format!("failed to write {}: {}", path.display(), e)))?;
        log::info!("Saved {}", path.display());
        Ok(Delivery::Saved(path))
    }
}

/// Keeps artifacts in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    artifacts: Arc<Mutex<Vec<ExportArtifact>>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far.
    pub fn artifacts(&self) -> Vec<ExportArtifact> {
        self.artifacts.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl OutputSink for MemorySink {
    async fn deliver(&self, artifact: &ExportArtifact) -> Result<Delivery, ExportError> {
        self.artifacts
            .lock()
            .map_err(|_| ExportError::Output("memory sink poisoned".into()))?
            .push(artifact.clone());
        Ok(Delivery::Kept(artifact.file_name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> ExportArtifact {
        ExportArtifact {
            file_name: "territorio_exportado.png".into(),
            mime: "image/png",
            bytes: vec![1, 2, 3],
        }
    }

    #[tokio::test]
    async fn test_directory_sink_writes_file() {
        let dir = std::env::temp_dir().join(format!("territory-sink-{}", uuid::Uuid::new_v4()));
        let sink = DirectorySink::new(&dir);
        let delivery = sink.deliver(&artifact()).await.unwrap();
        let path = dir.join("territorio_exportado.png");
        assert_eq!(delivery, Delivery::Saved(path.clone()));
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_memory_sink_keeps_clones() {
        let sink = MemorySink::new();
        let observer = sink.clone();
        sink.deliver(&artifact()).await.unwrap();
        assert_eq!(observer.artifacts().len(), 1);
    }
}
