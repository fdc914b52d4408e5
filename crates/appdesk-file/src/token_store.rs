//! Token store backed by [`FileStorage`].

use std::sync::{PoisonError, RwLock};

use tracing::{debug, instrument};

use appdesk_core::{AccessToken, StorageError, TokenStore};

use crate::storage::FileStorage;

/// Storage key holding the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// A token store that survives process restarts.
///
/// The in-memory copy answers `get`, so a `set` is visible immediately even
/// if writing the file fails.
#[derive(Debug)]
pub struct FileTokenStore {
    storage: FileStorage,
    current: RwLock<Option<AccessToken>>,
}

impl FileTokenStore {
    /// Open the store, loading any token persisted by an earlier run.
    pub fn open(storage: FileStorage) -> Result<Self, StorageError> {
        let current = storage.get_item(ACCESS_TOKEN_KEY)?.map(AccessToken::new);
        debug!(
            path = %storage.path().display(),
            restored = current.is_some(),
            "Opened token store"
        );
        Ok(Self {
            storage,
            current: RwLock::new(current),
        })
    }

    /// Returns the backing storage.
    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<AccessToken> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[instrument(skip(self, token))]
    fn set(&self, token: AccessToken) -> Result<(), StorageError> {
        let value = token.as_str().to_string();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        self.storage.set_item(ACCESS_TOKEN_KEY, &value)
    }

    #[instrument(skip(self))]
    fn clear(&self) -> Result<(), StorageError> {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.storage.remove_item(ACCESS_TOKEN_KEY)
    }
}
