//! CRUD commands over the API collections.

use std::fs;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::Value;

use appdesk_core::{ApplicationInput, Resource};

use crate::output;
use crate::session::CliSession;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Collection to list
    #[arg(long, short, default_value = "applications")]
    pub resource: Resource,

    /// Print raw JSON instead of a summary
    #[arg(long)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Args, Debug)]
pub struct ItemArgs {
    /// Item id
    pub id: u64,

    /// Collection the item belongs to
    #[arg(long, short, default_value = "applications")]
    pub resource: Resource,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Collection to create the item in
    #[arg(long, short, default_value = "applications")]
    pub resource: Resource,

    /// JSON document, or @path to read it from a file
    #[arg(long)]
    pub data: String,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Item id
    pub id: u64,

    /// Collection the item belongs to
    #[arg(long, short, default_value = "applications")]
    pub resource: Resource,

    /// JSON document, or @path to read it from a file
    #[arg(long)]
    pub data: String,
}

pub async fn list(session: &CliSession, args: ListArgs) -> Result<()> {
    let client = session.client();

    if args.resource == Resource::Applications && !args.json && !args.pretty {
        let apps = client
            .list_applications()
            .await
            .context("Failed to list applications")?;
        if apps.is_empty() {
            eprintln!("{}", "No applications found.".dimmed());
        }
        for app in &apps {
            output::application(app);
        }
        return Ok(());
    }

    let items = client
        .list(args.resource)
        .await
        .with_context(|| format!("Failed to list {}", args.resource))?;

    if items.is_empty() {
        eprintln!("{}", format!("No {} found.", args.resource).dimmed());
    }
    for item in &items {
        output::json(item, args.pretty)?;
    }

    Ok(())
}

pub async fn get(session: &CliSession, args: ItemArgs) -> Result<()> {
    let item = session
        .client()
        .get(args.resource, args.id)
        .await
        .with_context(|| format!("Failed to fetch {} {}", args.resource, args.id))?;

    output::json(&item, true)
}

pub async fn create(session: &CliSession, args: CreateArgs) -> Result<()> {
    let document = read_document(&args.data)?;
    let client = session.client();

    if args.resource == Resource::Applications {
        let input = application_input(document)?;
        let app = client
            .create_application(&input)
            .await
            .context("Failed to create application")?;
        output::success(&format!("Created application {}", app.id));
        return output::json(&app, true);
    }

    let item = client
        .create(args.resource, &document)
        .await
        .with_context(|| format!("Failed to create item in {}", args.resource))?;
    output::success(&format!("Created item in {}", args.resource));
    output::json(&item, true)
}

pub async fn update(session: &CliSession, args: UpdateArgs) -> Result<()> {
    let document = read_document(&args.data)?;
    let client = session.client();

    if args.resource == Resource::Applications {
        let input = application_input(document)?;
        let app = client
            .update_application(args.id, &input)
            .await
            .with_context(|| format!("Failed to update application {}", args.id))?;
        output::success(&format!("Updated application {}", app.id));
        return output::json(&app, true);
    }

    let item = client
        .update(args.resource, args.id, &document)
        .await
        .with_context(|| format!("Failed to update {} {}", args.resource, args.id))?;
    output::success(&format!("Updated {} {}", args.resource, args.id));
    output::json(&item, true)
}

pub async fn delete(session: &CliSession, args: ItemArgs) -> Result<()> {
    session
        .client()
        .delete(args.resource, args.id)
        .await
        .with_context(|| format!("Failed to delete {} {}", args.resource, args.id))?;

    output::success(&format!("Deleted {} {}", args.resource, args.id));
    Ok(())
}

/// Parse a JSON document given inline or as `@path`.
fn read_document(data: &str) -> Result<Value> {
    let json = match data.strip_prefix('@') {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?
        }
        None => data.to_string(),
    };
    serde_json::from_str(&json).context("Invalid JSON document")
}

fn application_input(document: Value) -> Result<ApplicationInput> {
    serde_json::from_value(document).context("Invalid application document")
}
