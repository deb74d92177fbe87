//! Data model for the order book.
//!
//! - [`Field`] - The eight canonical columns and their storage names
//! - [`OrderRecord`] / [`Table`] - Canonical, typed rows
//! - [`Cell`] / [`RawTable`] - Untyped edit buffers prior to normalization

mod cell;
mod order;
mod raw;

pub use cell::Cell;
pub use order::{Field, OrderRecord, Table};
pub use raw::RawTable;
