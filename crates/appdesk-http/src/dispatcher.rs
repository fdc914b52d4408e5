//! reqwest-backed request dispatcher.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use tracing::{debug, instrument, trace};

use appdesk_core::{AccessToken, ApiUrl, Dispatcher, Method, Request, Response, TransportError};

/// HTTP dispatcher for the API.
///
/// Cookies set by the server (the refresh credential) are kept in a shared
/// jar and sent back automatically. [`HttpDispatcher::cookie_header`] and
/// [`HttpDispatcher::restore_cookies`] let a caller persist the jar between
/// runs.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: reqwest::Client,
    base: ApiUrl,
    cookies: Arc<Jar>,
    timeout: Option<Duration>,
}

/// Builder for [`HttpDispatcher`].
#[derive(Debug)]
pub struct HttpDispatcherBuilder {
    base: ApiUrl,
    timeout: Option<Duration>,
    user_agent: String,
}

impl HttpDispatcherBuilder {
    /// Per-request timeout. Without one the transport default applies.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<HttpDispatcher, TransportError> {
        let cookies = Arc::new(Jar::default());

        let mut builder = reqwest::Client::builder()
            .user_agent(self.user_agent)
            .cookie_provider(Arc::clone(&cookies));
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| TransportError::Client {
            message: e.to_string(),
        })?;

        Ok(HttpDispatcher {
            client,
            base: self.base,
            cookies,
            timeout: self.timeout,
        })
    }
}

impl HttpDispatcher {
    /// Create a dispatcher with default settings.
    pub fn new(base: ApiUrl) -> Result<Self, TransportError> {
        Self::builder(base).build()
    }

    pub fn builder(base: ApiUrl) -> HttpDispatcherBuilder {
        HttpDispatcherBuilder {
            base,
            timeout: None,
            user_agent: concat!("appdesk/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Returns the API base URL.
    pub fn base(&self) -> &ApiUrl {
        &self.base
    }

    /// Returns the cookies the jar would send to the API, as a `Cookie`
    /// header value (`name=value; name2=value2`).
    pub fn cookie_header(&self) -> Option<String> {
        self.cookies
            .cookies(self.base.as_url())
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    /// Seed the jar from a value previously returned by
    /// [`HttpDispatcher::cookie_header`].
    pub fn restore_cookies(&self, header: &str) {
        for pair in header.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            self.cookies
                .add_cookie_str(&format!("{}; Path=/", pair), self.base.as_url());
        }
    }

    fn map_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                duration_ms: self.timeout.map_or(0, |t| t.as_millis() as u64),
            }
        } else if err.is_connect() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else {
            TransportError::Http {
                message: err.to_string(),
            }
        }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    #[instrument(
        skip(self, request, token),
        fields(method = %request.method(), path = request.path(), authed = token.is_some())
    )]
    async fn send(
        &self,
        request: &Request,
        token: Option<&AccessToken>,
    ) -> Result<Response, TransportError> {
        let url = self.base.endpoint(request.path());
        debug!(%url, "Dispatching request");

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method()), &url);
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token.as_str());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.map_error(e))?;

        trace!(status, "Response received");
        Ok(Response::new(status, body))
    }
}
