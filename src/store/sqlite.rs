//! SQLite store.
//!
//! Keeps the order book in a local SQLite file using the same column layout
//! as the hosted table, so either backend round-trips identically.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection};
use serde_json::Value;

use super::{validate_table_name, OrderStore, StoredObject, StoredRow, ID_COLUMN, LABEL_COLUMN};
use crate::model::Field;
use crate::error::{Error, Result};

/// SQLite-backed order book store.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    table: String,
    location: String,
}

impl SqliteStore {
    /// Open (or create) a store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table name is not a plain identifier or the
    /// database cannot be opened.
    pub fn open(path: &Path, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::with_connection(conn, table, path.display().to_string())
    }

    /// Open an in-memory store (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, "order_book", ":memory:".to_string())
    }

    fn with_connection(conn: Connection, table: &str, location: String) -> Result<Self> {
        conn.execute_batch(&schema_sql(table))?;
        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
            location,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Other("SQLite connection lock poisoned".to_string()))
    }

    fn select_all(&self) -> Result<Vec<StoredObject>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, wo, quote, po_number, status, customer_name, model_description,
                    scheduled_date, price, uploaded_name
             FROM {} ORDER BY id",
            self.table
        ))?;

        let rows = stmt
            .query_map([], |row| {
                let mut obj = StoredObject::new();
                obj.insert(ID_COLUMN.into(), Value::from(row.get::<_, i64>(0)?));
                // Text columns follow the canonical order in the SELECT
                for (i, field) in Field::ALL.into_iter().filter(|f| f.is_text()).enumerate() {
                    obj.insert(
                        field.storage_column().into(),
                        row.get::<_, Option<String>>(i + 1)?.map_or(Value::Null, Value::from),
                    );
                }
                obj.insert(
                    Field::ScheduledDate.storage_column().into(),
                    row.get::<_, Option<String>>(7)?.map_or(Value::Null, Value::from),
                );
                obj.insert(
                    Field::Price.storage_column().into(),
                    row.get::<_, Option<f64>>(8)?.map_or(Value::Null, Value::from),
                );
                obj.insert(
                    LABEL_COLUMN.into(),
                    row.get::<_, Option<String>>(9)?.map_or(Value::Null, Value::from),
                );
                Ok(obj)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn delete_rows(&self) -> Result<usize> {
        let conn = self.lock()?;
        Ok(conn.execute(&format!("DELETE FROM {}", self.table), [])?)
    }

    /// Insert one batch inside a single transaction.
    fn insert_rows(&self, rows: &[StoredRow]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (wo, quote, po_number, status, customer_name,
                                 model_description, scheduled_date, price, uploaded_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                self.table
            ))?;
            for row in rows {
                stmt.execute(params![
                    row.wo,
                    row.quote,
                    row.po_number,
                    row.status,
                    row.customer_name,
                    row.model_description,
                    row.scheduled_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    row.price,
                    row.uploaded_name,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

impl OrderStore for SqliteStore {
    fn describe(&self) -> String {
        format!("sqlite {} ({})", self.location, self.table)
    }

    async fn fetch_all(&self) -> Result<Vec<StoredObject>> {
        self.select_all()
    }

    async fn delete_all(&self) -> Result<()> {
        self.delete_rows().map(|_| ())
    }

    async fn insert(&self, rows: &[StoredRow]) -> Result<()> {
        self.insert_rows(rows)
    }
}

fn schema_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            wo TEXT,
            quote TEXT,
            po_number TEXT,
            status TEXT,
            customer_name TEXT,
            model_description TEXT,
            scheduled_date TEXT,
            price REAL,
            uploaded_name TEXT
        );"
    )
}
