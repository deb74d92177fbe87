//! Status command implementation.

use colored::Colorize;
use serde::Serialize;

use super::{overrides, state_path};
use crate::cli::Cli;
use crate::config::{load_config, resolve_store_config, StoreBackend};
use crate::error::Result;
use crate::session::EditSession;

/// Output for status command.
#[derive(Serialize)]
struct StatusOutput {
    store: Option<serde_json::Value>,
    state_path: String,
    session: Option<SessionInfo>,
}

#[derive(Serialize)]
struct SessionInfo {
    label: Option<String>,
    row_count: usize,
    version: u64,
    has_unsaved_changes: bool,
    loaded_at: String,
}

/// Execute status command.
///
/// Reads only local state; the store is not contacted.
pub fn execute(cli: &Cli, json: bool) -> Result<()> {
    let path = state_path(cli)?;
    let file = load_config()?;
    // Soft: an unconfigured store is reported, not an error
    let store = resolve_store_config(overrides(cli), &file).ok();
    let session = EditSession::open(&path)?;

    if json {
        let output = StatusOutput {
            store: store.as_ref().map(crate::config::StoreConfig::redacted_json),
            state_path: path.display().to_string(),
            session: session.as_ref().map(|s| SessionInfo {
                label: s.label().map(str::to_string),
                row_count: s.table().len(),
                version: s.version(),
                has_unsaved_changes: s.has_unsaved_changes(),
                loaded_at: s.loaded_at().to_rfc3339(),
            }),
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("Order Book Status");
    println!("=================");
    println!();

    match &store {
        Some(config) => match &config.backend {
            StoreBackend::Rest { url, .. } => {
                println!("Store:   {url} ({})", config.table);
            }
            StoreBackend::Sqlite { path } => {
                println!("Store:   sqlite {} ({})", path.display(), config.table);
            }
        },
        None => println!("Store:   {}", "not configured".dimmed()),
    }
    println!("Session: {}", path.display());
    println!();

    if let Some(s) = &session {
        match s.label() {
            Some(label) => println!("Currently loaded: {}", label.bold()),
            None => println!("{}", "No data loaded.".dimmed()),
        }
        println!("  Rows:    {}", s.table().len());
        println!("  Version: {}", s.version());
        println!("  Loaded:  {}", s.loaded_at().format("%Y-%m-%d %H:%M:%S UTC"));
        if s.has_unsaved_changes() {
            println!("  {}", "Unsaved changes".yellow().bold());
        } else {
            println!("  No unsaved changes");
        }
    } else {
        println!("No edit session.");
        println!();
        println!("Start one with: orderbook pull");
    }

    Ok(())
}
