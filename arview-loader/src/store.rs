//! Local storage for the downloaded model
//!
//! There is exactly one file. Every load overwrites it and nothing deletes
//! it. Loads in flight share the path without locking; each write lands whole
//! through a rename, so a reader sees one complete body and the last write
//! wins.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::Result;

/// Name of the persisted model inside the documents directory.
pub const MODEL_FILE_NAME: &str = "model.glb";

static NEXT_TEMP: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
}

impl ModelStore {
    /// Store writing `<documents>/model.glb`.
    pub fn new(documents: impl AsRef<Path>) -> Self {
        Self::with_file_name(documents, MODEL_FILE_NAME)
    }

    pub fn with_file_name(documents: impl AsRef<Path>, file_name: &str) -> Self {
        Self {
            path: documents.as_ref().join(file_name),
        }
    }

    /// Get the default documents directory (platform-specific)
    pub fn default_documents_dir() -> PathBuf {
        directories::ProjectDirs::from("com", "arview", "arview")
            .map(|p| p.data_dir().to_path_buf())
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".arview")
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let n = NEXT_TEMP.fetch_add(1, Ordering::Relaxed);
        let mut name = self.path.file_name().map(|f| f.to_os_string()).unwrap_or_default();
        name.push(format!(".{}-{}.tmp", std::process::id(), n));
        self.path.with_file_name(name)
    }

    /// Replace the file's content with `bytes`.
    pub async fn write(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        log::debug!("Wrote {} bytes to {}", bytes.len(), self.path.display());
        Ok(())
    }
}
