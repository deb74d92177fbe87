//! Remote order book stores.
//!
//! The sync contract talks to its authoritative table only through
//! [`OrderStore`]: fetch every row, delete every row, insert a batch.
//!
//! - [`RestStore`] - PostgREST endpoint (e.g. a Supabase project)
//! - [`SqliteStore`] - Local SQLite file with the same table layout
//!
//! [`connect`] is the single construction point. The CLI calls it once per
//! process and passes the handle down.

mod rest;
mod row;
mod sqlite;

pub use rest::{RestStore, DELETE_ALL_SENTINEL, FETCH_PAGE_SIZE};
pub use row::{StoredRow, ID_COLUMN, LABEL_COLUMN};
pub use sqlite::SqliteStore;

use std::future::Future;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{Error, Result};

/// A row as returned by the store, keyed by storage column name.
pub type StoredObject = serde_json::Map<String, serde_json::Value>;

/// Trait for order book stores.
///
/// Implementations do no retrying of their own; failures propagate.
pub trait OrderStore: Send + Sync {
    /// Short description of the backend for logs and status output.
    fn describe(&self) -> String;

    /// Fetch every row.
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<StoredObject>>> + Send;

    /// Delete every row unconditionally.
    fn delete_all(&self) -> impl Future<Output = Result<()>> + Send;

    /// Insert one batch of rows.
    fn insert(&self, rows: &[StoredRow]) -> impl Future<Output = Result<()>> + Send;
}

/// A store chosen at runtime from configuration.
#[derive(Debug)]
pub enum AnyStore {
    Rest(RestStore),
    Sqlite(SqliteStore),
}

impl OrderStore for AnyStore {
    fn describe(&self) -> String {
        match self {
            Self::Rest(store) => store.describe(),
            Self::Sqlite(store) => store.describe(),
        }
    }

    async fn fetch_all(&self) -> Result<Vec<StoredObject>> {
        match self {
            Self::Rest(store) => store.fetch_all().await,
            Self::Sqlite(store) => store.fetch_all().await,
        }
    }

    async fn delete_all(&self) -> Result<()> {
        match self {
            Self::Rest(store) => store.delete_all().await,
            Self::Sqlite(store) => store.delete_all().await,
        }
    }

    async fn insert(&self, rows: &[StoredRow]) -> Result<()> {
        match self {
            Self::Rest(store) => store.insert(rows).await,
            Self::Sqlite(store) => store.insert(rows).await,
        }
    }
}

/// Construct the store described by `config`.
///
/// # Errors
///
/// Returns an error if the table name is not a plain identifier, the SQLite
/// file cannot be opened, or the HTTP client cannot be built.
pub fn connect(config: &StoreConfig) -> Result<AnyStore> {
    match &config.backend {
        StoreBackend::Rest { url, key } => Ok(AnyStore::Rest(RestStore::new(
            url.clone(),
            key.clone(),
            config.table.clone(),
        )?)),
        StoreBackend::Sqlite { path } => Ok(AnyStore::Sqlite(SqliteStore::open(
            path,
            &config.table,
        )?)),
    }
}

/// Table names end up in SQL and in request paths, so only plain
/// identifiers pass.
pub(crate) fn validate_table_name(table: &str) -> Result<()> {
    let valid = !table.is_empty()
        && !table.starts_with(|c: char| c.is_ascii_digit())
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::Config(format!("invalid table name: {table}")))
    }
}
