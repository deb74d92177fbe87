//! Full-replace synchronization with the store.
//!
//! # Strategy
//!
//! `save` deletes every stored row and then inserts the whole table in
//! batches of [`INSERT_BATCH_SIZE`]. Nothing spans the delete and the
//! inserts: if the process dies between them the store is left empty, and
//! a failed batch leaves the earlier batches in place. Two concurrent saves
//! against the same table may interleave. None of this is guarded.
//!
//! `load` reads every stored row back into the canonical table and reports
//! the batch label stamped on the first row.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::normalize::{parse_date, parse_price};
use crate::error::Result;
use crate::model::{Cell, Field, OrderRecord, Table};
use crate::store::{OrderStore, StoredObject, StoredRow, LABEL_COLUMN};

/// Maximum rows per insert call.
pub const INSERT_BATCH_SIZE: usize = 500;

/// Result of [`TableSync::load`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTable {
    pub table: Table,
    /// Batch label of the last save, if the store holds any rows.
    pub label: Option<String>,
}

impl LoadedTable {
    /// Empty table, all canonical columns, no label.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            table: Table::empty(),
            label: None,
        }
    }
}

/// Statistics for a save operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveStats {
    /// Rows inserted.
    pub inserted: usize,
    /// Insert calls made.
    pub batches: usize,
}

/// The normalization and synchronization contract over one store.
#[derive(Debug)]
pub struct TableSync<S> {
    store: S,
}

impl<S: OrderStore> TableSync<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch every stored row as a canonical table.
    ///
    /// Storage columns are renamed to canonical fields; `uploaded_name`, `id`
    /// and unknown columns are dropped. Dates go through
    /// [`parse_date`](super::parse_date), prices become nullable numbers, text
    /// becomes non-null strings. Only canonical columns the store returned
    /// are marked present.
    ///
    /// # Errors
    ///
    /// Propagates any store error.
    pub async fn load(&self) -> Result<LoadedTable> {
        let objects = self.store.fetch_all().await?;

        let Some(first) = objects.first() else {
            info!(store = %self.store.describe(), "Store is empty");
            return Ok(LoadedTable::empty());
        };

        let label = first.get(LABEL_COLUMN).and_then(label_from_value);
        let columns: Vec<Field> = objects
            .iter()
            .flat_map(|o| o.keys())
            .filter_map(|column| Field::from_storage_column(column))
            .collect();
        let rows: Vec<OrderRecord> = objects.iter().map(record_from_stored).collect();

        info!(
            rows = rows.len(),
            label = label.as_deref().unwrap_or(""),
            "Loaded order book"
        );
        Ok(LoadedTable {
            table: Table::new(columns, rows),
            label,
        })
    }

    /// Replace the store contents with `table`, stamping every row with
    /// `label` (empty if `None`).
    ///
    /// The delete always runs, so saving an empty table empties the store.
    ///
    /// # Errors
    ///
    /// Propagates any store error. A failure after the delete leaves the
    /// store partially written.
    pub async fn save(&self, table: &Table, label: Option<&str>) -> Result<SaveStats> {
        self.store.delete_all().await?;
        debug!(store = %self.store.describe(), "Deleted all stored rows");

        let mut stats = SaveStats::default();
        if table.is_empty() {
            warn!(store = %self.store.describe(), "Saved an empty order book; the store is now empty");
            return Ok(stats);
        }

        let label = label.unwrap_or_default();
        let rows: Vec<StoredRow> = table
            .rows()
            .iter()
            .map(|r| StoredRow::from_record(r, label))
            .collect();

        for batch in rows.chunks(INSERT_BATCH_SIZE) {
            debug!(batch = stats.batches + 1, rows = batch.len(), "Inserting batch");
            self.store.insert(batch).await?;
            stats.batches += 1;
            stats.inserted += batch.len();
        }

        info!(rows = stats.inserted, batches = stats.batches, label, "Saved order book");
        Ok(stats)
    }
}

fn label_from_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn record_from_stored(object: &StoredObject) -> OrderRecord {
    let cell = |field: Field| {
        object
            .get(field.storage_column())
            .map_or(Cell::Null, Cell::from)
    };

    let mut record = OrderRecord {
        scheduled_date: parse_date(&cell(Field::ScheduledDate)),
        price: parse_price(&cell(Field::Price)),
        ..Default::default()
    };
    for field in Field::ALL.into_iter().filter(|f| f.is_text()) {
        record.set_text(field, cell(field).to_text());
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{Cell, RawTable};
    use crate::store::SqliteStore;
    use crate::sync::normalize;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::Mutex;

    /// In-memory store that records every call.
    #[derive(Default)]
    struct RecordingStore {
        rows: Mutex<Vec<StoredObject>>,
        insert_sizes: Mutex<Vec<usize>>,
        deletes: Mutex<usize>,
        fail_insert: bool,
    }

    impl OrderStore for RecordingStore {
        fn describe(&self) -> String {
            "recording".to_string()
        }

        async fn fetch_all(&self) -> Result<Vec<StoredObject>> {
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn delete_all(&self) -> Result<()> {
            self.rows.lock().unwrap().clear();
            *self.deletes.lock().unwrap() += 1;
            Ok(())
        }

        async fn insert(&self, rows: &[StoredRow]) -> Result<()> {
            if self.fail_insert {
                return Err(Error::Store {
                    status: 413,
                    message: "payload too large".into(),
                });
            }
            self.insert_sizes.lock().unwrap().push(rows.len());
            let mut stored = self.rows.lock().unwrap();
            for row in rows {
                match serde_json::to_value(row).unwrap() {
                    Value::Object(obj) => stored.push(obj),
                    _ => unreachable!(),
                }
            }
            Ok(())
        }
    }

    fn record(wo: &str) -> OrderRecord {
        OrderRecord {
            wo: wo.to_string(),
            customer_name: "Acme".to_string(),
            model_description: "Model".to_string(),
            scheduled_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            price: Some(1234.5),
            ..Default::default()
        }
    }

    fn edited_buffer() -> RawTable {
        RawTable::from_json_records(&[
            json!({
                "WO": "  A-1 ", "Quote": "Q1", "PO Number": 4411, "Status": "Open",
                "Customer Name": "Acme", "Model Description": "Widget",
                "Scheduled Date": "1/15/2024", "Price": "$1,234.50", "Notes": "x"
            }),
            json!({
                "WO": "", "Quote": "Q2", "PO Number": "", "Status": "Open",
                "Customer Name": "", "Model Description": "",
                "Scheduled Date": "2024-02-01", "Price": 5
            }),
            json!({
                "WO": "B-2", "Quote": null, "PO Number": null, "Status": null,
                "Customer Name": null, "Model Description": null,
                "Scheduled Date": "NaT", "Price": "garbage"
            }),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_load_empty_store() {
        let sync = TableSync::new(RecordingStore::default());
        let loaded = sync.load().await.unwrap();
        assert_eq!(loaded, LoadedTable::empty());
        assert_eq!(loaded.table.columns(), &Field::ALL);
    }

    #[tokio::test]
    async fn test_round_trip_equals_normalized_input() {
        let sync = TableSync::new(SqliteStore::open_memory().unwrap());
        let normalized = normalize(&edited_buffer()).unwrap();
        assert_eq!(normalized.len(), 2);

        sync.save(&normalized, Some("orders.xlsx")).await.unwrap();
        let loaded = sync.load().await.unwrap();

        assert_eq!(loaded.table, normalized);
        assert_eq!(loaded.label.as_deref(), Some("orders.xlsx"));
    }

    #[tokio::test]
    async fn test_save_empty_table_empties_store() {
        let sync = TableSync::new(SqliteStore::open_memory().unwrap());
        sync.save(&Table::with_rows(vec![record("1")]), Some("first"))
            .await
            .unwrap();

        let stats = sync.save(&Table::empty(), Some("second")).await.unwrap();
        assert_eq!(stats, SaveStats::default());

        let loaded = sync.load().await.unwrap();
        assert!(loaded.table.is_empty());
        assert_eq!(loaded.label, None);
    }

    #[tokio::test]
    async fn test_last_save_label_wins() {
        let sync = TableSync::new(SqliteStore::open_memory().unwrap());
        let table = Table::with_rows(vec![record("1"), record("2")]);

        sync.save(&table, Some("january.xlsx")).await.unwrap();
        sync.save(&table, Some("february.xlsx")).await.unwrap();

        let loaded = sync.load().await.unwrap();
        assert_eq!(loaded.label.as_deref(), Some("february.xlsx"));
        assert_eq!(loaded.table.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_label_stored_as_empty_string() {
        let sync = TableSync::new(RecordingStore::default());
        sync.save(&Table::with_rows(vec![record("1")]), None)
            .await
            .unwrap();

        let stored = sync.store().rows.lock().unwrap().clone();
        assert_eq!(stored[0][LABEL_COLUMN], "");
        assert_eq!(sync.load().await.unwrap().label.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_inserts_in_batches_of_500() {
        let sync = TableSync::new(RecordingStore::default());
        let rows = (0..1201).map(|i| record(&i.to_string())).collect();

        let stats = sync.save(&Table::with_rows(rows), Some("big")).await.unwrap();

        assert_eq!(stats, SaveStats { inserted: 1201, batches: 3 });
        assert_eq!(*sync.store().insert_sizes.lock().unwrap(), vec![500, 500, 201]);
        assert_eq!(*sync.store().deletes.lock().unwrap(), 1);
        assert_eq!(sync.load().await.unwrap().table.len(), 1201);
    }

    #[tokio::test]
    async fn test_insert_failure_propagates_after_delete() {
        let store = RecordingStore {
            fail_insert: true,
            ..Default::default()
        };
        store.rows.lock().unwrap().push(
            json!({"wo": "old", "uploaded_name": "before"})
                .as_object()
                .unwrap()
                .clone(),
        );
        let sync = TableSync::new(store);

        let err = sync
            .save(&Table::with_rows(vec![record("1")]), Some("after"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store { status: 413, .. }));
        // The delete already ran; nothing was inserted.
        assert!(sync.store().rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_coerces_stored_values() {
        let store = RecordingStore::default();
        store.rows.lock().unwrap().push(
            json!({
                "id": 7,
                "wo": "W-1",
                "quote": null,
                "po_number": 12345,
                "status": "Open",
                "customer_name": "Acme",
                "model_description": "M",
                "scheduled_date": "2024-03-09T00:00:00+00:00",
                "price": "99.50",
                "uploaded_name": "batch",
                "extra": "dropped"
            })
            .as_object()
            .unwrap()
            .clone(),
        );
        let sync = TableSync::new(store);

        let loaded = sync.load().await.unwrap();
        let row = &loaded.table.rows()[0];
        assert_eq!(row.wo, "W-1");
        assert_eq!(row.quote, "");
        assert_eq!(row.po_number, "12345");
        assert_eq!(row.scheduled_date, NaiveDate::from_ymd_opt(2024, 3, 9));
        assert_eq!(row.price, Some(99.5));
        assert_eq!(loaded.table.columns(), &Field::ALL);
    }

    #[tokio::test]
    async fn test_load_keeps_only_present_columns() {
        let store = RecordingStore::default();
        store.rows.lock().unwrap().push(
            json!({"id": 1, "wo": "W-1", "price": null, "customer_name": "Acme"})
                .as_object()
                .unwrap()
                .clone(),
        );
        let sync = TableSync::new(store);

        let loaded = sync.load().await.unwrap();
        assert_eq!(
            loaded.table.columns(),
            &[Field::Wo, Field::CustomerName, Field::Price]
        );
        assert_eq!(loaded.label, None);
        assert_eq!(loaded.table.rows()[0].price, None);
    }

    #[tokio::test]
    async fn test_loaded_table_renormalizes_unchanged() {
        let sync = TableSync::new(SqliteStore::open_memory().unwrap());
        let normalized = normalize(&edited_buffer()).unwrap();
        sync.save(&normalized, Some("x")).await.unwrap();

        let loaded = sync.load().await.unwrap().table;
        let mut raw = loaded.to_raw();
        raw.push_row(vec![Cell::Null; 8]);
        assert_eq!(normalize(&raw).unwrap(), loaded);
    }
}
