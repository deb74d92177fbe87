//! Storage row shape for the `order_book` table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::OrderRecord;

/// Storage-only column holding the batch label.
pub const LABEL_COLUMN: &str = "uploaded_name";

/// Storage-only surrogate key column.
pub const ID_COLUMN: &str = "id";

/// One row as written to the store.
///
/// `scheduled_date` serializes as an ISO-8601 calendar date (`YYYY-MM-DD`)
/// or null. The surrogate `id` is assigned by the store and never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRow {
    pub wo: String,
    pub quote: String,
    pub po_number: String,
    pub status: String,
    pub customer_name: String,
    pub model_description: String,
    pub scheduled_date: Option<NaiveDate>,
    pub price: Option<f64>,
    pub uploaded_name: String,
}

impl StoredRow {
    /// Map a canonical record to its storage shape, stamped with `label`.
    #[must_use]
    pub fn from_record(record: &OrderRecord, label: &str) -> Self {
        Self {
            wo: record.wo.trim().to_string(),
            quote: record.quote.clone(),
            po_number: record.po_number.clone(),
            status: record.status.clone(),
            customer_name: record.customer_name.clone(),
            model_description: record.model_description.clone(),
            scheduled_date: record.scheduled_date,
            price: record.price.filter(|p| p.is_finite()),
            uploaded_name: label.to_string(),
        }
    }
}
