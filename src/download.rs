//! Delivery of finished PDFs to the caller.

use crate::error::PiagamError;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Receives a finished document together with the temporary object URL it
/// was published under. The URL is revoked as soon as `deliver` returns.
pub trait DownloadSink: Send + Sync {
    fn deliver(&self, filename: &str, url: &str, bytes: &[u8]) -> Result<(), PiagamError>;
}

impl<T: DownloadSink + ?Sized> DownloadSink for Arc<T> {
    fn deliver(&self, filename: &str, url: &str, bytes: &[u8]) -> Result<(), PiagamError> {
        (**self).deliver(filename, url, bytes)
    }
}

/// Writes every delivered document into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, filename: &str, url: &str, bytes: &[u8]) -> Result<(), PiagamError> {
        if filename.contains(['/', '\\']) || filename.starts_with('.') {
            return Err(PiagamError::asset(format!("refusing to write {filename:?}")));
        }
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(filename);
        std::fs::write(&path, bytes)?;
        tracing::info!(path = %path.display(), url, bytes = bytes.len(), "document written");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub filename: String,
    pub url: String,
    pub bytes: Vec<u8>,
}

/// Collects deliveries in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    deliveries: Mutex<Vec<Delivery>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.deliveries.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DownloadSink for MemorySink {
    fn deliver(&self, filename: &str, url: &str, bytes: &[u8]) -> Result<(), PiagamError> {
        let mut deliveries = self
            .deliveries
            .lock()
            .map_err(|_| PiagamError::Blob("download sink poisoned".to_string()))?;
        deliveries.push(Delivery {
            filename: filename.to_string(),
            url: url.to_string(),
            bytes: bytes.to_vec(),
        });
        Ok(())
    }
}

/// What an export produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub filename: String,
    pub page_count: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} succeeded, {} failed", self.succeeded, self.failed)
    }
}
