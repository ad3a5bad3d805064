//! Temporary object URLs for generated bytes.
//!
//! Every issued URL must be revoked exactly once. [`BlobUrl`] revokes itself
//! on drop when the caller has not done so explicitly.

use crate::error::PiagamError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct BlobState {
    live: HashMap<String, Arc<Vec<u8>>>,
    issued: u64,
    revoked: u64,
}

#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    state: Arc<Mutex<BlobState>>,
    next_id: Arc<AtomicU64>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, mime: &str, bytes: Vec<u8>) -> Result<BlobUrl, PiagamError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let url = format!("blob:piagam/{mime}/{id}");
        let mut state = self.lock()?;
        state.live.insert(url.clone(), Arc::new(bytes));
        state.issued += 1;
        Ok(BlobUrl {
            url,
            store: self.clone(),
            revoked: false,
        })
    }

    /// Bytes behind a live URL.
    pub fn resolve(&self, url: &str) -> Option<Arc<Vec<u8>>> {
        self.lock().ok()?.live.get(url).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.lock().map(|s| s.live.len()).unwrap_or(0)
    }

    pub fn issued_count(&self) -> u64 {
        self.lock().map(|s| s.issued).unwrap_or(0)
    }

    pub fn revoked_count(&self) -> u64 {
        self.lock().map(|s| s.revoked).unwrap_or(0)
    }

    fn revoke_url(&self, url: &str) -> Result<(), PiagamError> {
        let mut state = self.lock()?;
        if state.live.remove(url).is_none() {
            return Err(PiagamError::Blob(format!("{url} already revoked")));
        }
        state.revoked += 1;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BlobState>, PiagamError> {
        self.state
            .lock()
            .map_err(|_| PiagamError::Blob("blob store lock poisoned".to_string()))
    }
}

#[derive(Debug)]
pub struct BlobUrl {
    url: String,
    store: BlobStore,
    revoked: bool,
}

impl BlobUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked
    }

    pub fn revoke(&mut self) -> Result<(), PiagamError> {
        if self.revoked {
            return Err(PiagamError::Blob(format!("{} already revoked", self.url)));
        }
        self.revoked = true;
        self.store.revoke_url(&self.url)
    }
}

impl Drop for BlobUrl {
    fn drop(&mut self) {
        if !self.revoked {
            self.revoked = true;
            if let Err(err) = self.store.revoke_url(&self.url) {
                tracing::warn!(url = %self.url, error = %err, "object url revoke on drop failed");
            }
        }
    }
}
