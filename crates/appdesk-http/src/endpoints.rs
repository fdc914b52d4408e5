//! Endpoint paths and wire bodies of the authentication API.

use serde::{Deserialize, Serialize};

/// Endpoint for login.
pub const LOGIN: &str = "/login/";

/// Endpoint for account registration.
pub const REGISTER: &str = "/register/";

/// Endpoint for logout.
pub const LOGOUT: &str = "/logout/";

/// Endpoint for access token refresh. Authenticated by the refresh cookie.
pub const REFRESH: &str = "/token/refresh/";

/// Request body for login.
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Request body for register.
#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
    pub password: &'a str,
    pub password2: &'a str,
}

/// Response from login, register and refresh.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub message: Option<String>,
}
