//! Output directory access.
//!
//! Every artifact a run produces (page files, consolidated sets, mining
//! results, reports, checkpoints) is a named file inside one output
//! directory. [`OutputStore`] wraps that directory with async file
//! operations and the collision-free naming from `storeops_core::naming`.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use storeops_core::naming::{unique_file_name, unique_run_base};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Errors that can occur while reading or writing output files.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether the error is a missing file.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// A directory of run artifacts.
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a file inside the store.
    #[must_use]
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Whether `name` exists in the store.
    pub async fn exists(&self, name: &str) -> bool {
        tokio::fs::try_exists(self.path(name)).await.unwrap_or(false)
    }

    /// Create the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created.
    pub async fn ensure_dir(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StoreError::io(&self.root, e))
    }

    /// Names of the files in the store. A missing directory is empty.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be read.
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.root, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.root, e))?
        {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// First free `<stem>.<ext>` name, using the `(n)` counter on collision.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be listed.
    pub async fn unique_name(&self, stem: &str, extension: &str) -> Result<String, StoreError> {
        let existing = self.list().await?;
        Ok(unique_file_name(&existing, stem, extension))
    }

    /// First run base derived from `base` that no file uses yet.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be listed.
    pub async fn run_base(&self, base: &str) -> Result<String, StoreError> {
        let existing = self.list().await?;
        Ok(unique_run_base(&existing, base))
    }

    /// Write `value` as pretty-printed JSON, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if serialization or the write fails.
    pub async fn write_json<T: Serialize + Sync>(&self, name: &str, value: &T) -> Result<PathBuf, StoreError> {
        let path = self.path(name);
        let body = serde_json::to_vec_pretty(value).map_err(|e| StoreError::json(&path, e))?;
        self.ensure_dir().await?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        Ok(path)
    }

    /// Write text, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the write fails.
    pub async fn write_text(&self, name: &str, text: &str) -> Result<PathBuf, StoreError> {
        let path = self.path(name);
        self.ensure_dir().await?;
        tokio::fs::write(&path, text)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        Ok(path)
    }

    /// Append text, creating the file if needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file cannot be opened or written.
    pub async fn append_text(&self, name: &str, text: &str) -> Result<(), StoreError> {
        self.ensure_dir().await?;
        append_file(&self.path(name), text).await
    }

    /// Read and parse a JSON file in the store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the file is missing or not valid JSON.
    pub async fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, StoreError> {
        read_json_file(&self.path(name)).await
    }

    /// Read and parse a JSON file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the file exists but cannot be read or parsed.
    pub async fn read_json_opt<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        match self.read_json(name).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Delete a file. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file exists but cannot be removed.
    pub async fn remove(&self, name: &str) -> Result<(), StoreError> {
        let path = self.path(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }
}

/// Append text to a file anywhere on disk, creating it if needed.
///
/// # Errors
///
/// Returns `StoreError::Io` if the file cannot be opened or written.
pub async fn append_file(path: &Path, text: &str) -> Result<(), StoreError> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    file.write_all(text.as_bytes())
        .await
        .map_err(|e| StoreError::io(path, e))?;
    file.flush().await.map_err(|e| StoreError::io(path, e))
}

/// Read and parse a JSON file anywhere on disk.
///
/// # Errors
///
/// Returns `StoreError` if the file is missing or not valid JSON.
pub async fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::json(path, e))
}
