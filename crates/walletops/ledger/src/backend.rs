//! Storage backends holding the serialized ledger document.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::Value;

use crate::error::{LedgerError, Result};

/// Where the ledger document lives.
///
/// Backends move whole documents; they never interpret them. Migration and
/// typed access happen in [`crate::LedgerStore`].
pub trait LedgerBackend: Send + Sync {
    /// Read the stored document, `None` if nothing was ever written.
    fn load(&self) -> Result<Option<Value>>;

    /// Replace the stored document.
    fn store(&self, document: &Value) -> Result<()>;

    /// Delete the stored document. Returns whether one existed.
    fn remove(&self) -> Result<bool>;

    /// Human readable location, for logs.
    fn describe(&self) -> String;
}

/// JSON file backend.
///
/// Writes are atomic (write to `.tmp`, then rename) so an interrupted flush
/// leaves the previous document intact.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl LedgerBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<Value>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn store(&self, document: &Value) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(document)?;

        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn remove(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.path)?;
        Ok(true)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory backend (for testing).
///
/// Counts writes so tests can assert how many times a run touched storage.
#[derive(Default)]
pub struct InMemoryBackend {
    document: Mutex<Option<Value>>,
    writes: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-seeded with a stored document.
    pub fn with_document(document: Value) -> Self {
        Self {
            document: Mutex::new(Some(document)),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of successful `store` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// The last stored document.
    pub fn stored(&self) -> Option<Value> {
        self.document.lock().ok().and_then(|doc| doc.clone())
    }
}

impl LedgerBackend for InMemoryBackend {
    fn load(&self) -> Result<Option<Value>> {
        let doc = self
            .document
            .lock()
            .map_err(|_| LedgerError::Backend("document lock poisoned".to_string()))?;
        Ok(doc.clone())
    }

    fn store(&self, document: &Value) -> Result<()> {
        let mut doc = self
            .document
            .lock()
            .map_err(|_| LedgerError::Backend("document lock poisoned".to_string()))?;
        *doc = Some(document.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self) -> Result<bool> {
        let mut doc = self
            .document
            .lock()
            .map_err(|_| LedgerError::Backend("document lock poisoned".to_string()))?;
        Ok(doc.take().is_some())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
