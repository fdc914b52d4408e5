//! appdesk-http - Authenticated HTTP client for the appdesk API.
//!
//! [`HttpDispatcher`] puts requests on the wire, [`RefreshCoordinator`]
//! wraps it with transparent token refresh, and [`ApiClient`] exposes the
//! named API operations built on top of both.

mod client;
mod coordinator;
mod dispatcher;
pub mod endpoints;

pub use client::{ApiClient, AuthOutput};
pub use coordinator::{RefreshCoordinator, RefreshPhase, RefreshPolicy, Retry};
pub use dispatcher::{HttpDispatcher, HttpDispatcherBuilder};
