//! Command implementations.

pub mod auth;
pub mod resources;

use anyhow::Result;
use tracing::warn;

use appdesk_core::NormalizedError;

use crate::cli::{ApiArgs, Commands};
use crate::output;
use crate::session::CliSession;

pub async fn handle(api: &ApiArgs, command: Commands) -> Result<()> {
    let session = CliSession::open(api)?;
    let signing_in = matches!(command, Commands::Login(_) | Commands::Register(_));

    let result = match command {
        Commands::Login(args) => auth::login(&session, args).await,
        Commands::Register(args) => auth::register(&session, args).await,
        Commands::Logout => auth::logout(&session).await,
        Commands::Whoami => auth::whoami(&session),
        Commands::RefreshToken => auth::refresh_token(&session).await,
        Commands::List(args) => resources::list(&session, args).await,
        Commands::Get(args) => resources::get(&session, args).await,
        Commands::Create(args) => resources::create(&session, args).await,
        Commands::Update(args) => resources::update(&session, args).await,
        Commands::Delete(args) => resources::delete(&session, args).await,
    };

    // The server may have rotated the refresh cookie during any command.
    if let Err(e) = session.persist_cookies() {
        warn!(error = %e, "Failed to persist refresh cookie");
    }

    if let Err(e) = &result
        && !signing_in
        && session_ended(e, &session)
    {
        output::error("Session expired. Run 'appdesk login' again.");
    }
    result
}

/// An authorization failure only ends the session when the refresh failed
/// too, which leaves the token store empty.
fn session_ended(error: &anyhow::Error, session: &CliSession) -> bool {
    !session.has_token()
        && error
            .chain()
            .filter_map(|cause| cause.downcast_ref::<NormalizedError>())
            .any(NormalizedError::is_authorization)
}
