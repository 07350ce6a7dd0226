//! Local cart persistence.
//!
//! The cart is mirrored into a small key/value JSON document so that it
//! survives restarts. Persistence is best effort: failures are reported to
//! the caller, which logs them and carries on with the in-memory state.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use bazaar_core::CartItem;

/// Key under which the cart lines are stored.
pub const CART_KEY: &str = "cartItems";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt storage document: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Somewhere to keep the cart between runs.
pub trait CartStorage: Send + Sync {
    /// Load the persisted cart. `Ok(None)` when nothing has been saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store is unreadable or corrupt.
    fn load(&self) -> Result<Option<Vec<CartItem>>, StorageError>;

    /// Replace the persisted cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn save(&self, items: &[CartItem]) -> Result<(), StorageError>;

    /// Remove the persisted cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn clear(&self) -> Result<(), StorageError>;
}

/// JSON file storage.
///
/// The file holds an object of string keys; only [`CART_KEY`] is touched, so
/// other keys written by other tools survive. Writes go to a sibling temp
/// file which is then renamed over the original. A document that does not
/// parse is never overwritten.
#[derive(Debug, Clone)]
pub struct FileCartStorage {
    path: PathBuf,
}

impl FileCartStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<BTreeMap<String, Value>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn write_document(&self, document: &BTreeMap<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(document)?;
        std::fs::write(&tmp, text).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CartStorage for FileCartStorage {
    fn load(&self) -> Result<Option<Vec<CartItem>>, StorageError> {
        let document = self.read_document()?;
        let Some(value) = document.get(CART_KEY) else {
            return Ok(None);
        };
        let items: Vec<CartItem> = serde_json::from_value(value.clone())?;
        debug!(path = %self.path.display(), items = items.len(), "Loaded persisted cart");
        Ok(Some(items))
    }

    fn save(&self, items: &[CartItem]) -> Result<(), StorageError> {
        let mut document = self.read_document()?;
        document.insert(CART_KEY.to_string(), serde_json::to_value(items)?);
        self.write_document(&document)
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut document = self.read_document()?;
        if document.remove(CART_KEY).is_none() && !self.path.exists() {
            return Ok(());
        }
        self.write_document(&document)
    }
}

/// In-memory storage, for tests and for runs without a storage path.
#[derive(Debug, Default)]
pub struct MemoryCartStorage {
    items: Mutex<Option<Vec<CartItem>>>,
}

impl MemoryCartStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with a cart.
    #[must_use]
    pub fn with_items(items: Vec<CartItem>) -> Self {
        Self {
            items: Mutex::new(Some(items)),
        }
    }

    /// Current contents, without going through [`CartStorage::load`].
    #[must_use]
    pub fn snapshot(&self) -> Option<Vec<CartItem>> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CartStorage for MemoryCartStorage {
    fn load(&self) -> Result<Option<Vec<CartItem>>, StorageError> {
        Ok(self.snapshot())
    }

    fn save(&self, items: &[CartItem]) -> Result<(), StorageError> {
        *self.items.lock().unwrap_or_else(PoisonError::into_inner) = Some(items.to_vec());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.items.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
