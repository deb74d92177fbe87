//! Edit session state.
//!
//! An edit session is the working copy a user edits between saves: the
//! canonical table, the batch label last loaded, whether there are unsaved
//! changes, and a version counter bumped on every applied edit.
//!
//! Sessions persist as a single JSON file (see
//! [`resolve_state_path`](crate::config::resolve_state_path)) written
//! atomically: temp file, then rename.

use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::{RawTable, Table};
use crate::store::OrderStore;
use crate::sync::{normalize_with_report, LoadedTable, NormalizeReport, SaveStats, TableSync};

/// Persisted edit session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditSession {
    table: Table,
    label: Option<String>,
    has_unsaved_changes: bool,
    version: u64,
    loaded_at: DateTime<Utc>,
}

impl EditSession {
    /// Start a session from a freshly loaded table.
    #[must_use]
    pub fn from_loaded(loaded: LoadedTable) -> Self {
        Self {
            table: loaded.table,
            label: loaded.label,
            has_unsaved_changes: false,
            version: 0,
            loaded_at: Utc::now(),
        }
    }

    /// Start a session by loading from the store.
    ///
    /// # Errors
    ///
    /// Propagates any store error.
    pub async fn load_from<S: OrderStore>(sync: &TableSync<S>) -> Result<Self> {
        sync.load().await.map(Self::from_loaded)
    }

    #[must_use]
    pub fn table(&self) -> &Table {
        &self.table
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.has_unsaved_changes
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Replace the buffer with the normalized form of an edited table.
    ///
    /// Marks the session unsaved and bumps the version. A `label` replaces
    /// the batch label that the next save will stamp.
    ///
    /// # Errors
    ///
    /// Returns `MissingColumns` if the edited table lacks a canonical
    /// column; the session is left unchanged.
    pub fn apply(&mut self, edited: &RawTable, label: Option<String>) -> Result<NormalizeReport> {
        let (table, report) = normalize_with_report(edited)?;

        if report.has_degraded_cells() {
            warn!(
                dates = report.degraded_dates,
                prices = report.degraded_prices,
                "Unparseable cells were cleared"
            );
        }

        self.table = table;
        if label.is_some() {
            self.label = label;
        }
        self.has_unsaved_changes = true;
        self.version += 1;
        info!(
            rows = report.kept_rows,
            dropped = report.dropped_blank_rows,
            version = self.version,
            "Applied edits"
        );
        Ok(report)
    }

    /// Compare a provided password with the configured secret.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPassword` on mismatch.
    pub fn check_password(provided: &str, secret: &str) -> Result<()> {
        if provided == secret {
            Ok(())
        } else {
            Err(Error::InvalidPassword)
        }
    }

    /// Save the buffer to the store if the password matches, then clear the
    /// unsaved flag.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPassword` without touching the store on mismatch, or
    /// propagates a store error (the session stays unsaved).
    pub async fn commit<S: OrderStore>(
        &mut self,
        sync: &TableSync<S>,
        password: &str,
        secret: &str,
    ) -> Result<SaveStats> {
        Self::check_password(password, secret)?;

        let stats = sync.save(&self.table, self.label.as_deref()).await?;
        self.has_unsaved_changes = false;
        Ok(stats)
    }

    /// Read a persisted session. Returns `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Write the session atomically (temp file, then rename), owner-only on Unix.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any file operation fails.
    pub fn persist(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        let temp_path = path.with_extension("json.tmp");
        {
            let mut opts = fs::OpenOptions::new();
            opts.write(true).create(true).truncate(true);
            #[cfg(unix)]
            opts.mode(0o600);
            let mut file = opts.open(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.flush()?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Delete a persisted session. Returns `true` if one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn remove(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Field;
    use crate::store::SqliteStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn edited(rows: &[serde_json::Value]) -> RawTable {
        RawTable::from_json_records(rows).unwrap()
    }

    fn full_row(wo: &str) -> serde_json::Value {
        json!({
            "WO": wo, "Quote": "", "PO Number": "PO", "Status": "Open",
            "Customer Name": "Acme", "Model Description": "M",
            "Scheduled Date": "2024-01-15", "Price": "$10"
        })
    }

    #[tokio::test]
    async fn test_apply_then_commit() {
        let sync = TableSync::new(SqliteStore::open_memory().unwrap());
        let mut session = EditSession::load_from(&sync).await.unwrap();
        assert!(!session.has_unsaved_changes());
        assert_eq!(session.label(), None);

        let report = session
            .apply(&edited(&[full_row("1"), full_row("2")]), Some("orders.csv".into()))
            .unwrap();
        assert_eq!(report.kept_rows, 2);
        assert!(session.has_unsaved_changes());
        assert_eq!(session.version(), 1);

        let stats = session.commit(&sync, "pw", "pw").await.unwrap();
        assert_eq!(stats.inserted, 2);
        assert!(!session.has_unsaved_changes());

        let reloaded = EditSession::load_from(&sync).await.unwrap();
        assert_eq!(reloaded.table(), session.table());
        assert_eq!(reloaded.label(), Some("orders.csv"));
    }

    #[tokio::test]
    async fn test_wrong_password_leaves_store_untouched() {
        let sync = TableSync::new(SqliteStore::open_memory().unwrap());
        let mut first = EditSession::from_loaded(LoadedTable::empty());
        first.apply(&edited(&[full_row("keep")]), None).unwrap();
        first.commit(&sync, "secret", "secret").await.unwrap();

        let mut session = EditSession::load_from(&sync).await.unwrap();
        session.apply(&edited(&[]), None).unwrap_err();
        session
            .apply(&edited(&[full_row("replace")]), None)
            .unwrap();

        let err = session.commit(&sync, "guess", "secret").await.unwrap_err();
        assert!(matches!(err, Error::InvalidPassword));
        assert!(session.has_unsaved_changes());

        let stored = sync.load().await.unwrap();
        assert_eq!(stored.table.rows()[0].wo, "keep");
    }

    #[test]
    fn test_apply_missing_columns_keeps_session() {
        let mut session = EditSession::from_loaded(LoadedTable::empty());
        let err = session
            .apply(&edited(&[json!({"WO": "1"})]), Some("x".into()))
            .unwrap_err();
        assert!(matches!(err, Error::MissingColumns { .. }));
        assert!(!session.has_unsaved_changes());
        assert_eq!(session.version(), 0);
        assert_eq!(session.label(), None);
    }

    #[test]
    fn test_apply_without_label_keeps_previous() {
        let mut session = EditSession::from_loaded(LoadedTable {
            table: Table::empty(),
            label: Some("loaded.xlsx".into()),
        });
        session.apply(&edited(&[full_row("1")]), None).unwrap();
        assert_eq!(session.label(), Some("loaded.xlsx"));
        assert_eq!(session.table().columns(), &Field::ALL);
    }

    #[test]
    fn test_persist_open_remove() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state").join("session.json");

        assert_eq!(EditSession::open(&path).unwrap(), None);

        let mut session = EditSession::from_loaded(LoadedTable::empty());
        session.apply(&edited(&[full_row("1")]), Some("l".into())).unwrap();
        session.persist(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = EditSession::open(&path).unwrap().unwrap();
        assert_eq!(reopened, session);

        assert!(EditSession::remove(&path).unwrap());
        assert!(!EditSession::remove(&path).unwrap());
    }

    #[test]
    fn test_check_password() {
        assert!(EditSession::check_password("admin123", "admin123").is_ok());
        assert!(EditSession::check_password("Admin123", "admin123").is_err());
        assert!(EditSession::check_password("", "admin123").is_err());
    }
}
