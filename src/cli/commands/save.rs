//! Save command implementation.

use colored::Colorize;
use serde::Serialize;

use super::{open_sync, runtime, state_path};
use crate::cli::Cli;
use crate::config::{load_config, resolve_update_password};
use crate::error::{Error, Result};
use crate::session::EditSession;
use crate::sync::SaveStats;

#[derive(Serialize)]
struct SaveOutput<'a> {
    saved: bool,
    label: Option<&'a str>,
    #[serde(flatten)]
    stats: &'a SaveStats,
}

/// Publish the edit buffer if `password` matches the update password.
///
/// The password is checked before the store is contacted; a mismatch leaves
/// both the session and the store untouched.
pub fn execute(cli: &Cli, password: &str, json: bool) -> Result<()> {
    let path = state_path(cli)?;
    let mut session = EditSession::open(&path)?.ok_or(Error::NoSession)?;

    let file = load_config()?;
    let secret = resolve_update_password(&file);
    EditSession::check_password(password, &secret)?;

    let sync = open_sync(cli, &file)?;
    let stats = runtime()?.block_on(session.commit(&sync, password, &secret))?;
    session.persist(&path)?;

    if json {
        let output = SaveOutput {
            saved: true,
            label: session.label(),
            stats: &stats,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if !cli.quiet {
        if stats.inserted == 0 {
            println!("{} The order book is now empty.", "Saved.".green().bold());
        } else {
            println!(
                "{} {} rows in {} batches",
                "Saved".green().bold(),
                stats.inserted,
                stats.batches
            );
        }
        if let Some(label) = session.label() {
            println!("Currently loaded: {}", label.bold());
        }
    }

    Ok(())
}
