//! Order book sync
//!
//! This crate provides the core functionality for the `orderbook` CLI tool:
//! a normalize/load/save contract that keeps a hosted order book table in a
//! single canonical shape.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (Field, OrderRecord, Table, RawTable)
//! - [`sync`] - Normalization and the load/save contract
//! - [`store`] - Store backends (PostgREST, SQLite)
//! - [`session`] - Persisted edit session
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod session;
pub mod store;
pub mod sync;

pub use error::{Error, Result};

/// Global CSV output flag (set when `--format csv`).
pub static CSV_OUTPUT: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Check if CSV output is requested.
#[inline]
pub fn is_csv() -> bool {
    CSV_OUTPUT.load(std::sync::atomic::Ordering::Relaxed)
}

/// Escape a value for CSV output (wrap in quotes if it contains a comma, quote, or line break).
pub fn csv_escape(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
