//! API client: the authenticated request operation and the named API calls
//! built on it.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use appdesk_core::normalize;
use appdesk_core::{
    AccessToken, ApiUrl, Application, ApplicationInput, Credentials, Dispatcher, ErrorKind,
    Method, NormalizedError, Registration, Request, Resource, Response, Result, TokenStore,
    TransportError,
};

use crate::coordinator::{RefreshCoordinator, RefreshPolicy};
use crate::dispatcher::HttpDispatcher;
use crate::endpoints::{LOGIN, LOGOUT, LoginRequest, REGISTER, RegisterRequest, TokenResponse};

/// Output of a successful login or registration.
#[derive(Debug, Clone)]
pub struct AuthOutput {
    /// The token now held by the token store.
    pub access_token: AccessToken,
    /// Server message, sent on registration.
    pub message: Option<String>,
}

/// Client for the appdesk API.
///
/// Every call goes through a [`RefreshCoordinator`], so an expired access
/// token is refreshed and the call replayed without the caller noticing.
/// Cheap to clone; clones share the coordinator and its refresh state.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use appdesk_core::{ApiUrl, Credentials, MemoryTokenStore, Resource};
/// use appdesk_http::ApiClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let api = ApiUrl::new("https://desk.example.com/api")?;
/// let client = ApiClient::connect(api, Arc::new(MemoryTokenStore::new()))?;
///
/// client.login(&Credentials::new("alice", "hunter2")).await?;
/// for app in client.list(Resource::Applications).await? {
///     println!("{}", app);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ApiClient {
    coordinator: Arc<RefreshCoordinator>,
}

impl ApiClient {
    /// Create a client from its collaborators.
    pub fn new(dispatcher: Arc<dyn Dispatcher>, store: Arc<dyn TokenStore>) -> Self {
        Self::with_policy(dispatcher, store, RefreshPolicy::default())
    }

    pub fn with_policy(
        dispatcher: Arc<dyn Dispatcher>,
        store: Arc<dyn TokenStore>,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            coordinator: Arc::new(RefreshCoordinator::new(dispatcher, store, policy)),
        }
    }

    /// Create a client that talks HTTP to `api`.
    pub fn connect(
        api: ApiUrl,
        store: Arc<dyn TokenStore>,
    ) -> std::result::Result<Self, TransportError> {
        let dispatcher = HttpDispatcher::new(api)?;
        Ok(Self::new(Arc::new(dispatcher), store))
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Returns true while a token is held.
    pub fn is_authenticated(&self) -> bool {
        self.store().get().is_some()
    }

    fn store(&self) -> &Arc<dyn TokenStore> {
        self.coordinator.store()
    }

    // ========================================================================
    // Authenticated request
    // ========================================================================

    /// Send a JSON request with the current token and return the JSON body.
    ///
    /// An empty success body is returned as `null`.
    pub async fn authenticated_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let mut request = Request::new(method, path);
        if let Some(body) = body {
            request = request.with_body(body.clone());
        }
        self.send(&request).await
    }

    /// Send `request` and decode the success body as `T`.
    pub async fn send<T: DeserializeOwned>(&self, request: &Request) -> Result<T> {
        let response = self.coordinator.execute(request).await?;
        decode(&response)
    }

    /// GET an arbitrary protected path.
    pub async fn get_path(&self, path: &str) -> Result<Value> {
        self.authenticated_request(Method::Get, path, None).await
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Log in and store the returned access token.
    #[instrument(skip(self, credentials), fields(username = %credentials.username()))]
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthOutput> {
        info!("Logging in");
        let body = LoginRequest {
            username: credentials.username(),
            password: credentials.password(),
        };
        let request = Request::post(LOGIN).with_body(to_json(&body)?);
        self.authenticate(&request).await
    }

    /// Create an account and store the returned access token.
    #[instrument(skip(self, registration), fields(username = %registration.username()))]
    pub async fn register(&self, registration: &Registration) -> Result<AuthOutput> {
        info!("Registering account");
        let body = RegisterRequest {
            username: registration.username(),
            email: registration.email(),
            password: registration.password(),
            password2: registration.password_confirmation(),
        };
        let request = Request::post(REGISTER).with_body(to_json(&body)?);
        self.authenticate(&request).await
    }

    /// Log out. The token store is cleared whether or not the server call
    /// succeeds.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        info!("Logging out");
        let result = self
            .send::<Value>(&Request::post(LOGOUT))
            .await
            .map(|_| ());

        if let Err(e) = self.store().clear() {
            warn!(error = %e, "Failed to clear token store");
        }
        result
    }

    /// Refresh the access token now, joining a refresh already in flight.
    pub async fn refresh(&self) -> Result<AccessToken> {
        self.coordinator.refresh_token().await
    }

    async fn authenticate(&self, request: &Request) -> Result<AuthOutput> {
        let response: TokenResponse = self.send(request).await?;
        let access_token = AccessToken::new(response.access_token);

        if let Err(e) = self.store().set(access_token.clone()) {
            warn!(error = %e, "Failed to persist access token");
        }
        debug!("Access token stored");

        Ok(AuthOutput {
            access_token,
            message: response.message,
        })
    }

    // ========================================================================
    // Resources
    // ========================================================================

    /// List every item of a collection.
    #[instrument(skip(self))]
    pub async fn list(&self, resource: Resource) -> Result<Vec<Value>> {
        self.send(&Request::get(resource.collection_path())).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, resource: Resource, id: u64) -> Result<Value> {
        self.send(&Request::get(resource.item_path(id))).await
    }

    #[instrument(skip(self, item))]
    pub async fn create(&self, resource: Resource, item: &Value) -> Result<Value> {
        let request = Request::post(resource.collection_path()).with_body(item.clone());
        self.send(&request).await
    }

    /// Replace an item.
    #[instrument(skip(self, item))]
    pub async fn update(&self, resource: Resource, id: u64, item: &Value) -> Result<Value> {
        let request = Request::put(resource.item_path(id)).with_body(item.clone());
        self.send(&request).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, resource: Resource, id: u64) -> Result<()> {
        self.send::<Value>(&Request::delete(resource.item_path(id)))
            .await
            .map(|_| ())
    }

    pub async fn list_applications(&self) -> Result<Vec<Application>> {
        self.send(&Request::get(Resource::Applications.collection_path()))
            .await
    }

    pub async fn get_application(&self, id: u64) -> Result<Application> {
        self.send(&Request::get(Resource::Applications.item_path(id)))
            .await
    }

    pub async fn create_application(&self, input: &ApplicationInput) -> Result<Application> {
        let request =
            Request::post(Resource::Applications.collection_path()).with_body(to_json(input)?);
        self.send(&request).await
    }

    pub async fn update_application(
        &self,
        id: u64,
        input: &ApplicationInput,
    ) -> Result<Application> {
        let request = Request::put(Resource::Applications.item_path(id)).with_body(to_json(input)?);
        self.send(&request).await
    }

    pub async fn delete_application(&self, id: u64) -> Result<()> {
        self.delete(Resource::Applications, id).await
    }
}

/// Turn a response into a decoded body or a normalized error.
fn decode<T: DeserializeOwned>(response: &Response) -> Result<T> {
    if !response.is_success() {
        return Err(normalize::from_response(response));
    }

    response.json().map_err(|e| {
        NormalizedError::new(
            ErrorKind::Server,
            response.status(),
            format!("unexpected response body: {}", e),
        )
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| {
        NormalizedError::new(ErrorKind::Validation, 0, format!("invalid request body: {}", e))
    })
}
