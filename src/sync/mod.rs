//! Normalization and synchronization contract.
//!
//! This module is the core of the tool:
//!
//! - **Normalize**: arbitrary edit buffer → canonical table
//! - **Load**: store → canonical table + batch label
//! - **Save**: canonical table → store, full replace (delete all, insert in
//!   batches of 500)
//!
//! # Example
//!
//! ```ignore
//! use orderbook::store::SqliteStore;
//! use orderbook::sync::{normalize, TableSync};
//!
//! let sync = TableSync::new(SqliteStore::open_memory()?);
//! let table = normalize(&edited)?;
//! sync.save(&table, Some("orders.xlsx")).await?;
//! let loaded = sync.load().await?;
//! ```

mod contract;
mod normalize;

pub use contract::{LoadedTable, SaveStats, TableSync, INSERT_BATCH_SIZE};
pub use normalize::{
    normalize, normalize_with_report, parse_date, parse_date_str, parse_price, NormalizeReport,
};
