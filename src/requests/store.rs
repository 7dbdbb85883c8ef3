//! Persistence for the request list.
//!
//! The list lives under a single key, `paymentRequests`, holding the whole
//! ordered array. Every write replaces the array.

use super::PaymentRequest;
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

/// Key the request array is stored under.
pub const REQUESTS_KEY: &str = "paymentRequests";

/// Load and save the full request list.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// The stored list in insertion order; empty if nothing is stored.
    async fn load(&self) -> Result<Vec<PaymentRequest>>;

    /// Replace the stored list.
    async fn save(&self, requests: &[PaymentRequest]) -> Result<()>;
}

/// In-memory store, lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    requests: Mutex<Vec<PaymentRequest>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `requests`.
    #[must_use]
    pub fn with_requests(requests: Vec<PaymentRequest>) -> Self {
        Self {
            requests: Mutex::new(requests),
        }
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn load(&self) -> Result<Vec<PaymentRequest>> {
        Ok(self.requests.lock().clone())
    }

    async fn save(&self, requests: &[PaymentRequest]) -> Result<()> {
        *self.requests.lock() = requests.to_vec();
        Ok(())
    }
}

/// JSON document on disk.
///
/// The document is an object; the list is kept under [`REQUESTS_KEY`] and
/// any other keys are preserved across writes.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by the file at `path`. The file is created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Map<String, Value>> {
        if !fs::try_exists(&self.path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to stat request store: {e}")))?
        {
            trace!("Request store {} does not exist yet", self.path.display());
            return Ok(Map::new());
        }

        let content = fs::read(&self.path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to read request store: {e}")))?;
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }

        match serde_json::from_slice(&content)
            .map_err(|e| Error::Serialization(format!("Corrupt request store: {e}")))?
        {
            Value::Object(map) => Ok(map),
            _ => Err(Error::Serialization(
                "Request store is not a JSON object".to_string(),
            )),
        }
    }
}

#[async_trait]
impl RequestStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<PaymentRequest>> {
        let mut document = self.read_document().await?;
        let Some(list) = document.remove(REQUESTS_KEY) else {
            return Ok(Vec::new());
        };
        serde_json::from_value(list)
            .map_err(|e| Error::Serialization(format!("Corrupt payment request list: {e}")))
    }

    async fn save(&self, requests: &[PaymentRequest]) -> Result<()> {
        let mut document = self.read_document().await?;
        let list = serde_json::to_value(requests)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        document.insert(REQUESTS_KEY.to_string(), list);
        let bytes = serde_json::to_vec_pretty(&Value::Object(document))
            .map_err(|e| Error::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| Error::Storage(format!("Failed to create data directory: {e}")))?;
            }
        }

        // Atomic write: temp file + rename
        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to create temp file: {e}")))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| Error::Storage(format!("Failed to write request store: {e}")))?;
        file.flush()
            .await
            .map_err(|e| Error::Storage(format!("Failed to flush request store: {e}")))?;
        drop(file);

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to rename temp file: {e}")))?;

        debug!(
            "Saved {} payment requests to {}",
            requests.len(),
            self.path.display()
        );
        Ok(())
    }
}
