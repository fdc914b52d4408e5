//! Durable key/value storage file.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, instrument, trace};
use uuid::Uuid;

use appdesk_core::StorageError;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// A JSON object of string values stored in a single file.
///
/// Every mutation takes an exclusive lock on a sibling `.lock` file,
/// re-reads the current contents, and replaces the file atomically, so
/// several processes can share one storage file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Create a storage handle for `path`. The file is created lazily.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the storage file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read one value.
    pub fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    /// Write one value.
    #[instrument(skip(self, value), fields(path = %self.path.display()))]
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    /// Remove one value. Removing a missing key is not an error.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.update(|items| {
            items.remove(key);
        })
    }

    /// Read the whole file. A missing file is empty storage.
    pub fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let json = fs::read_to_string(&self.path).map_err(|e| self.io(e))?;
        if json.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&json).map_err(|e| StorageError::Corrupt {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn update<F>(&self, mutate: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io(e))?;
        }

        let lock = self.lock()?;

        let mut items = self.load()?;
        mutate(&mut items);
        self.write(&items)?;

        lock.unlock().map_err(|e| self.io(e))?;
        debug!(keys = items.len(), "Storage updated");
        Ok(())
    }

    fn lock(&self) -> Result<File, StorageError> {
        let lock_path = self.path.with_extension("lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| self.io(e))?;
        file.lock_exclusive().map_err(|e| self.io(e))?;
        trace!(lock = %lock_path.display(), "Acquired storage lock");
        Ok(file)
    }

    /// Write to a temporary sibling, then rename over the target.
    fn write(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(items)?;
        let tmp_path = self.path.with_extension(format!("{}.tmp", Uuid::new_v4()));

        {
            let mut file = File::create(&tmp_path).map_err(|e| self.io(e))?;
            file.write_all(json.as_bytes()).map_err(|e| self.io(e))?;
            file.sync_all().map_err(|e| self.io(e))?;
        }

        // Tokens live here; keep the file private (Unix only)
        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&tmp_path).map_err(|e| self.io(e))?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&tmp_path, perms).map_err(|e| self.io(e))?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| self.io(e))
    }

    fn io(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
