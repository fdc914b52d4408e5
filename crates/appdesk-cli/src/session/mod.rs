//! The CLI session: an API client wired to the local storage file.

pub mod storage;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use appdesk_core::{ApiUrl, Dispatcher, TokenStore};
use appdesk_file::{FileStorage, FileTokenStore};
use appdesk_http::{ApiClient, HttpDispatcher, RefreshPolicy};

use crate::cli::ApiArgs;

use storage::REFRESH_COOKIE_KEY;

/// Everything a command needs to talk to the API.
#[derive(Debug)]
pub struct CliSession {
    client: ApiClient,
    dispatcher: Arc<HttpDispatcher>,
    store: Arc<FileTokenStore>,
}

impl CliSession {
    /// Open the session described by `args`, restoring any stored token and
    /// refresh cookie.
    pub fn open(args: &ApiArgs) -> Result<Self> {
        let api = ApiUrl::new(&args.api_url).context("Invalid API URL")?;
        let path = storage::storage_path()?;
        debug!(path = %path.display(), api = %api, "Opening session");

        let store = Arc::new(
            FileTokenStore::open(FileStorage::new(&path)).context("Failed to open storage")?,
        );

        let dispatcher = Arc::new(
            HttpDispatcher::builder(api)
                .timeout(args.timeout_secs.map(Duration::from_secs))
                .build()
                .context("Failed to create HTTP client")?,
        );
        if let Some(cookie) = store
            .storage()
            .get_item(REFRESH_COOKIE_KEY)
            .context("Failed to read storage")?
        {
            dispatcher.restore_cookies(&cookie);
        }

        let policy = RefreshPolicy {
            timeout: Some(Duration::from_secs(args.refresh_timeout_secs)),
            ..RefreshPolicy::default()
        };
        let client = ApiClient::with_policy(
            Arc::clone(&dispatcher) as Arc<dyn Dispatcher>,
            Arc::clone(&store) as Arc<dyn TokenStore>,
            policy,
        );

        Ok(Self {
            client,
            dispatcher,
            store,
        })
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn api(&self) -> &ApiUrl {
        self.dispatcher.base()
    }

    pub fn storage(&self) -> &FileStorage {
        self.store.storage()
    }

    /// Returns true if an access token is stored.
    pub fn has_token(&self) -> bool {
        self.store.get().is_some()
    }

    /// Write the cookie jar back to storage.
    ///
    /// The refresh cookie is only kept while an access token is held, so a
    /// logout or a failed refresh forgets it too.
    pub fn persist_cookies(&self) -> Result<()> {
        let storage = self.store.storage();
        let stored = storage
            .get_item(REFRESH_COOKIE_KEY)
            .context("Failed to read storage")?;
        let current = self
            .dispatcher
            .cookie_header()
            .filter(|_| self.has_token());
        if stored == current {
            return Ok(());
        }

        match current {
            Some(cookie) => storage
                .set_item(REFRESH_COOKIE_KEY, &cookie)
                .context("Failed to save refresh cookie"),
            None => storage
                .remove_item(REFRESH_COOKIE_KEY)
                .context("Failed to remove refresh cookie"),
        }
    }
}
