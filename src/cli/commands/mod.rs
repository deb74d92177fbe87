//! Command implementations.

pub mod completions;
pub mod config;
pub mod save;
pub mod status;
pub mod table;
pub mod version;

use std::path::{Path, PathBuf};

use tokio::runtime::Runtime;
use tracing::debug;

use crate::cli::Cli;
use crate::config::{resolve_state_path, resolve_store_config, ConfigFile, Overrides};
use crate::error::{Error, Result};
use crate::session::EditSession;
use crate::store::{connect, AnyStore, OrderStore};
use crate::sync::TableSync;

/// Create the tokio runtime a command blocks on.
pub(crate) fn runtime() -> Result<Runtime> {
    Runtime::new().map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}

pub(crate) fn overrides(cli: &Cli) -> Overrides<'_> {
    Overrides {
        url: cli.url.as_deref(),
        key: cli.key.as_deref(),
        table: cli.table.as_deref(),
    }
}

/// Resolve the edit session file.
pub(crate) fn state_path(cli: &Cli) -> Result<PathBuf> {
    resolve_state_path(cli.state.as_deref()).ok_or_else(|| {
        Error::Config("Could not determine home directory for the session file".to_string())
    })
}

/// Build the store handle for this process.
pub(crate) fn open_sync(cli: &Cli, file: &ConfigFile) -> Result<TableSync<AnyStore>> {
    let config = resolve_store_config(overrides(cli), file)?;
    let store = connect(&config)?;
    debug!(store = %store.describe(), "Connected");
    Ok(TableSync::new(store))
}

/// Open the persisted session, or load a fresh one from the store and
/// persist it.
pub(crate) fn open_or_load(cli: &Cli, file: &ConfigFile, path: &Path) -> Result<EditSession> {
    if let Some(session) = EditSession::open(path)? {
        return Ok(session);
    }
    let sync = open_sync(cli, file)?;
    let session = runtime()?.block_on(EditSession::load_from(&sync))?;
    session.persist(path)?;
    Ok(session)
}
