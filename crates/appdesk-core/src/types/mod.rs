//! Core client types.

mod api_url;
mod request;

pub use api_url::ApiUrl;
pub use request::{Method, Request, Response};
