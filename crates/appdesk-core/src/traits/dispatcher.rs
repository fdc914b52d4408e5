//! Request dispatcher trait.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::tokens::AccessToken;
use crate::types::{Request, Response};

/// Puts a request on the wire.
///
/// Any response the server sends back, including 4xx and 5xx, is returned
/// as `Ok`. `Err` means no response was received.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Send `request`, attaching `Authorization: Bearer <token>` when a
    /// token is given and sending unauthenticated otherwise.
    async fn send(
        &self,
        request: &Request,
        token: Option<&AccessToken>,
    ) -> Result<Response, TransportError>;
}
