//! Session commands: login, register, logout, whoami and refresh-token.

use anyhow::{Context, Result, ensure};
use clap::Args;
use colored::Colorize;

use appdesk_core::{Credentials, Registration};

use crate::output;
use crate::session::CliSession;
use crate::session::storage::REFRESH_COOKIE_KEY;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account username
    #[arg(long)]
    pub username: String,

    /// Account password
    #[arg(long, env = "APPDESK_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Username for the new account
    #[arg(long)]
    pub username: String,

    /// Contact email
    #[arg(long)]
    pub email: Option<String>,

    /// Password for the new account
    #[arg(long, env = "APPDESK_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Password confirmation (defaults to --password)
    #[arg(long)]
    pub password_confirmation: Option<String>,
}

pub async fn login(session: &CliSession, args: LoginArgs) -> Result<()> {
    eprintln!("{}", "Logging in...".dimmed());

    let credentials = Credentials::new(&args.username, &args.password);
    session
        .client()
        .login(&credentials)
        .await
        .context("Failed to login")?;

    output::success("Logged in successfully");
    println!();
    output::field("User", &args.username);
    output::field("API", session.api().as_str());

    Ok(())
}

pub async fn register(session: &CliSession, args: RegisterArgs) -> Result<()> {
    eprintln!("{}", "Registering account...".dimmed());

    let confirmation = args
        .password_confirmation
        .clone()
        .unwrap_or_else(|| args.password.clone());
    let registration =
        Registration::new(&args.username, args.email.clone(), &args.password, confirmation);

    let result = session
        .client()
        .register(&registration)
        .await
        .context("Failed to register")?;

    output::success(result.message.as_deref().unwrap_or("Account created"));
    println!();
    output::field("User", &args.username);
    output::field("API", session.api().as_str());

    Ok(())
}

pub async fn logout(session: &CliSession) -> Result<()> {
    if !session.has_token() {
        eprintln!("{}", "No active session.".dimmed());
        return Ok(());
    }

    // The local session is gone whatever the server says.
    match session.client().logout().await {
        Ok(()) => output::success("Logged out"),
        Err(e) => {
            output::error(&format!("Server logout failed: {}", e));
            output::success("Local session cleared");
        }
    }

    Ok(())
}

pub fn whoami(session: &CliSession) -> Result<()> {
    ensure!(
        session.has_token(),
        "No active session. Run 'appdesk login' first."
    );

    let refresh_cookie = session
        .storage()
        .get_item(REFRESH_COOKIE_KEY)
        .context("Failed to read storage")?;

    output::field("API", session.api().as_str());
    output::field("Storage", session.storage().path().display());
    output::field("Access token", "present");
    output::field(
        "Refresh cookie",
        if refresh_cookie.is_some() {
            "stored"
        } else {
            "none"
        },
    );

    Ok(())
}

pub async fn refresh_token(session: &CliSession) -> Result<()> {
    eprintln!("{}", "Refreshing session...".dimmed());

    session
        .client()
        .refresh()
        .await
        .context("Failed to refresh session")?;

    output::success("Session refreshed successfully");
    output::field("API", session.api().as_str());

    Ok(())
}
