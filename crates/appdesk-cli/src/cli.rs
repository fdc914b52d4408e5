//! CLI argument definitions.

use clap::{Args, Parser, Subcommand};

use appdesk_core::ApiUrl;

use crate::commands::{auth, resources};

/// Command line client for the appdesk API.
#[derive(Parser, Debug)]
#[command(name = "appdesk")]
#[command(author, version = env!("APPDESK_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub api: ApiArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection settings shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ApiArgs {
    /// API base URL
    #[arg(long, env = "APPDESK_API_URL", default_value = ApiUrl::DEFAULT, global = true)]
    pub api_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "APPDESK_TIMEOUT_SECS", global = true)]
    pub timeout_secs: Option<u64>,

    /// Upper bound on a token refresh, in seconds
    #[arg(
        long,
        env = "APPDESK_REFRESH_TIMEOUT_SECS",
        default_value_t = 30,
        global = true
    )]
    pub refresh_timeout_secs: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the access token
    Login(auth::LoginArgs),

    /// Create an account and log in
    Register(auth::RegisterArgs),

    /// Log out and forget the stored session
    Logout,

    /// Display the stored session
    Whoami,

    /// Obtain a new access token using the refresh cookie
    RefreshToken,

    /// List the items of a collection
    List(resources::ListArgs),

    /// Fetch a single item
    Get(resources::ItemArgs),

    /// Create an item from a JSON document
    Create(resources::CreateArgs),

    /// Replace an item with a JSON document
    Update(resources::UpdateArgs),

    /// Delete an item
    Delete(resources::ItemArgs),
}
