//! appdesk-file - File-backed token storage.
//!
//! [`FileStorage`] is a small string key/value file that survives process
//! restarts. [`FileTokenStore`] keeps the access token in it under the
//! fixed key [`ACCESS_TOKEN_KEY`].

mod storage;
mod token_store;

pub use storage::FileStorage;
pub use token_store::{ACCESS_TOKEN_KEY, FileTokenStore};
