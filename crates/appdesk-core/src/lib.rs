//! appdesk-core - Core types and traits for the appdesk API client.
//!
//! The HTTP client is assembled from two collaborators defined here:
//! a [`Dispatcher`] that puts requests on the wire and a [`TokenStore`]
//! that owns the current [`AccessToken`]. Every failure that reaches a
//! caller is a [`NormalizedError`], produced by the [`normalize`] module.

pub mod credentials;
pub mod error;
pub mod normalize;
pub mod resource;
pub mod tokens;
pub mod traits;
pub mod types;

pub use credentials::{Credentials, Registration};
pub use error::{ErrorKind, InvalidInputError, NormalizedError, StorageError, TransportError};
pub use resource::{Application, ApplicationInput, Resource};
pub use tokens::AccessToken;
pub use traits::{Dispatcher, MemoryTokenStore, TokenStore};
pub use types::{ApiUrl, Method, Request, Response};

/// Result type alias using the crate's normalized error.
pub type Result<T> = std::result::Result<T, NormalizedError>;
