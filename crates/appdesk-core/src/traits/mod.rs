//! Collaborator traits the API client is composed from.

mod dispatcher;
mod token_store;

pub use dispatcher::Dispatcher;
pub use token_store::{MemoryTokenStore, TokenStore};
