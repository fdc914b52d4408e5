//! Token store trait and the in-memory implementation.

use std::sync::{PoisonError, RwLock};

use crate::error::StorageError;
use crate::tokens::AccessToken;

/// Holder of the current access token.
///
/// A `set` must be visible to the very next `get`. Implementations that
/// persist the token report persistence failures from `set` and `clear`,
/// but the in-process value is updated regardless.
pub trait TokenStore: Send + Sync {
    /// Returns the current token, if any.
    fn get(&self) -> Option<AccessToken>;

    /// Replace the current token.
    fn set(&self, token: AccessToken) -> Result<(), StorageError>;

    /// Forget the current token.
    fn clear(&self) -> Result<(), StorageError>;
}

/// A token store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<AccessToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `token`.
    pub fn with_token(token: AccessToken) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<AccessToken> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, token: AccessToken) -> Result<(), StorageError> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
