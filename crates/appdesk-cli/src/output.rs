//! Output formatting helpers.

use anyhow::Result;
use chrono::{DateTime, FixedOffset, Local};
use colored::Colorize;
use serde::Serialize;

use appdesk_core::Application;

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a labeled field.
pub fn field(label: &str, value: impl std::fmt::Display) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print a value as JSON, one document per line unless `pretty`.
pub fn json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

/// Print a one-line summary of an application, with times in local time.
pub fn application(app: &Application) {
    let end = app
        .end_time
        .map(local_time)
        .unwrap_or_else(|| "open".to_string());
    println!(
        "{:>5}  {}  {}  {}  {} → {}",
        app.id,
        app.identifier.bold(),
        app.status_name.as_deref().unwrap_or("-"),
        app.location_name.as_deref().unwrap_or("-"),
        local_time(app.start_time),
        end,
    );
}

fn local_time(time: DateTime<FixedOffset>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
