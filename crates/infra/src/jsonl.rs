//! Append-only JSON lines files

use std::path::{Path, PathBuf};

use kiddo_domain::Result;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::errors::InfraError;

/// Serializes records one per line, creating the file and its parent
/// directory on first write. Appends are serialized so lines never interleave.
pub struct JsonlWriter {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl JsonlWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: tokio::sync::Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append<T: Serialize + ?Sized>(&self, record: &T) -> Result<()> {
        let mut line = serde_json::to_vec(record).map_err(InfraError::from)?;
        line.push(b'\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(InfraError::from)?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(InfraError::from)?;
        file.write_all(&line).await.map_err(InfraError::from)?;
        file.flush().await.map_err(InfraError::from)?;
        Ok(())
    }
}
