//! Token refresh coordination.
//!
//! The coordinator wraps a [`Dispatcher`]. When a request is rejected with
//! 401 or 403 it obtains a fresh access token and replays the request once.
//! Requests rejected while a refresh is already in flight wait for that
//! refresh instead of starting another, and every waiter of a refresh
//! cycle observes the same outcome.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use appdesk_core::normalize;
use appdesk_core::{
    AccessToken, Dispatcher, ErrorKind, NormalizedError, Request, Response, TokenStore,
    TransportError,
};

use crate::endpoints::{LOGIN, REFRESH, TokenResponse};

type RefreshOutcome = Result<AccessToken, NormalizedError>;

/// Whether a request may still trigger a refresh-and-replay cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retry {
    /// First attempt; an authorization failure triggers a refresh.
    Allowed,
    /// Already replayed once; failures are returned as-is.
    Exhausted,
}

/// Coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    /// No refresh in flight.
    Idle,
    /// One refresh call is outstanding.
    Refreshing,
}

/// Endpoints and limits used by the coordinator.
#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    /// Path of the login endpoint. Its failures are never refreshed.
    pub login_path: String,
    /// Path of the refresh endpoint. Called without an Authorization header.
    pub refresh_path: String,
    /// Upper bound on one refresh call. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            login_path: LOGIN.to_string(),
            refresh_path: REFRESH.to_string(),
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

#[derive(Debug, Default)]
struct RefreshState {
    refreshing: bool,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

enum Role {
    Leader,
    Waiter(oneshot::Receiver<RefreshOutcome>),
}

/// Dispatches requests with the current token and refreshes it on
/// authorization failures, issuing at most one refresh call at a time.
pub struct RefreshCoordinator {
    dispatcher: Arc<dyn Dispatcher>,
    store: Arc<dyn TokenStore>,
    policy: RefreshPolicy,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new(
        dispatcher: Arc<dyn Dispatcher>,
        store: Arc<dyn TokenStore>,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            dispatcher,
            store,
            policy,
            state: Mutex::new(RefreshState::default()),
        }
    }

    /// Returns the token store this coordinator writes to.
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn policy(&self) -> &RefreshPolicy {
        &self.policy
    }

    pub fn phase(&self) -> RefreshPhase {
        if self.state().refreshing {
            RefreshPhase::Refreshing
        } else {
            RefreshPhase::Idle
        }
    }

    /// Number of requests waiting on the in-flight refresh.
    pub fn queued(&self) -> usize {
        self.state().waiters.len()
    }

    /// Dispatch `request`, refreshing the token and replaying once if the
    /// server rejects it.
    pub async fn execute(&self, request: &Request) -> Result<Response, NormalizedError> {
        self.execute_with(request, Retry::Allowed).await
    }

    /// Dispatch `request` with explicit retry eligibility.
    ///
    /// Non-success responses are returned as `Ok`; `Err` is either a
    /// request that got no response or a failed refresh.
    #[instrument(skip(self, request), fields(method = %request.method(), path = request.path()))]
    pub async fn execute_with(
        &self,
        request: &Request,
        retry: Retry,
    ) -> Result<Response, NormalizedError> {
        let token = self.store.get();
        let response = self.dispatch(request, token.as_ref()).await?;

        if !self.should_refresh(request, &response, retry) {
            return Ok(response);
        }

        debug!(status = response.status(), "Authorization failed, awaiting fresh token");
        let token = self.refresh_token().await?;

        // The replay runs with its retry exhausted: whatever it returns,
        // including another 401, goes straight back to the caller.
        self.dispatch(request, Some(&token)).await
    }

    /// Obtain a fresh access token.
    ///
    /// Starts a refresh cycle when idle; otherwise waits for the cycle in
    /// flight and returns its outcome.
    pub async fn refresh_token(&self) -> Result<AccessToken, NormalizedError> {
        let role = {
            let mut state = self.state();
            if state.refreshing {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                debug!(queued = state.waiters.len(), "Refresh in flight, queued");
                Role::Waiter(rx)
            } else {
                state.refreshing = true;
                Role::Leader
            }
        };

        match role {
            Role::Waiter(rx) => rx.await.unwrap_or_else(|_| {
                Err(NormalizedError::network("token refresh was abandoned"))
            }),
            Role::Leader => {
                let mut cycle = Cycle {
                    coordinator: self,
                    settled: false,
                };
                let outcome = self.call_refresh().await;
                cycle.settle(&outcome);
                outcome
            }
        }
    }

    fn should_refresh(&self, request: &Request, response: &Response, retry: Retry) -> bool {
        response.is_auth_failure()
            && retry == Retry::Allowed
            && !request.targets(&self.policy.login_path)
            && !request.targets(&self.policy.refresh_path)
    }

    async fn dispatch(
        &self,
        request: &Request,
        token: Option<&AccessToken>,
    ) -> Result<Response, NormalizedError> {
        self.dispatcher.send(request, token).await.map_err(|e| {
            debug!(error = %e, "No response received");
            normalize::from_transport(&e)
        })
    }

    #[instrument(skip(self))]
    async fn call_refresh(&self) -> RefreshOutcome {
        info!("Refreshing access token");

        let request = Request::post(self.policy.refresh_path.as_str());
        let call = self.dispatcher.send(&request, None);

        let result = match self.policy.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(TransportError::Timeout {
                    duration_ms: limit.as_millis() as u64,
                })),
            None => call.await,
        };

        let response = result.map_err(|e| normalize::from_transport(&e))?;
        if !response.is_success() {
            return Err(normalize::from_response(&response));
        }

        let body: TokenResponse = response.json().map_err(|e| {
            NormalizedError::new(
                ErrorKind::Server,
                response.status(),
                format!("malformed token refresh response: {}", e),
            )
        })?;

        Ok(AccessToken::new(body.access_token))
    }

    /// Apply a refresh outcome to the token store.
    fn apply(&self, outcome: &RefreshOutcome) {
        match outcome {
            Ok(token) => {
                if let Err(e) = self.store.set(token.clone()) {
                    warn!(error = %e, "Failed to persist refreshed token");
                }
            }
            Err(err) => {
                warn!(error = %err, "Token refresh failed, clearing session");
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "Failed to clear token store");
                }
            }
        }
    }

    /// End the cycle and hand `outcome` to every queued waiter,
    /// first-queued first. The token store is not touched.
    fn release(&self, outcome: &RefreshOutcome) {
        // The queue is emptied in the same critical section that ends the
        // cycle, so a new cycle always starts with an empty queue.
        let waiters = {
            let mut state = self.state();
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };

        info!(
            waiters = waiters.len(),
            success = outcome.is_ok(),
            "Refresh cycle settled"
        );
        for waiter in waiters {
            // A waiter whose caller went away has dropped its receiver.
            let _ = waiter.send(outcome.clone());
        }
    }

    fn state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("policy", &self.policy)
            .field("phase", &self.phase())
            .field("queued", &self.queued())
            .finish()
    }
}

/// Settles the cycle exactly once. If the leading future is dropped before
/// the refresh call completes, waiters are released with a cancellation
/// error and the stored token is left as it was.
struct Cycle<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl Cycle<'_> {
    fn settle(&mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        self.coordinator.apply(outcome);
        self.coordinator.release(outcome);
    }
}

impl Drop for Cycle<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!("Refresh cancelled, releasing waiters");
            self.coordinator
                .release(&Err(NormalizedError::network("token refresh was cancelled")));
        }
    }
}
