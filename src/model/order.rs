//! Canonical order records and tables.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::cell::Cell;
use super::raw::RawTable;

/// One of the eight canonical order book columns.
///
/// Declaration order is the canonical column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "WO")]
    Wo,
    #[serde(rename = "Quote")]
    Quote,
    #[serde(rename = "PO Number")]
    PoNumber,
    #[serde(rename = "Status")]
    Status,
    #[serde(rename = "Customer Name")]
    CustomerName,
    #[serde(rename = "Model Description")]
    ModelDescription,
    #[serde(rename = "Scheduled Date")]
    ScheduledDate,
    #[serde(rename = "Price")]
    Price,
}

impl Field {
    /// All canonical columns, in canonical order.
    pub const ALL: [Self; 8] = [
        Self::Wo,
        Self::Quote,
        Self::PoNumber,
        Self::Status,
        Self::CustomerName,
        Self::ModelDescription,
        Self::ScheduledDate,
        Self::Price,
    ];

    /// Free-text columns other than WO.
    pub const TEXT: [Self; 5] = [
        Self::Quote,
        Self::PoNumber,
        Self::Status,
        Self::CustomerName,
        Self::ModelDescription,
    ];

    /// Columns of which at least one must be non-blank for a row to be kept.
    pub const IDENTIFYING: [Self; 3] = [Self::Wo, Self::CustomerName, Self::ModelDescription];

    /// Canonical (display) column name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Wo => "WO",
            Self::Quote => "Quote",
            Self::PoNumber => "PO Number",
            Self::Status => "Status",
            Self::CustomerName => "Customer Name",
            Self::ModelDescription => "Model Description",
            Self::ScheduledDate => "Scheduled Date",
            Self::Price => "Price",
        }
    }

    /// Column name in the remote `order_book` table.
    #[must_use]
    pub const fn storage_column(self) -> &'static str {
        match self {
            Self::Wo => "wo",
            Self::Quote => "quote",
            Self::PoNumber => "po_number",
            Self::Status => "status",
            Self::CustomerName => "customer_name",
            Self::ModelDescription => "model_description",
            Self::ScheduledDate => "scheduled_date",
            Self::Price => "price",
        }
    }

    /// Position in the canonical order.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Look up a field by its storage column name.
    #[must_use]
    pub fn from_storage_column(column: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.storage_column() == column)
    }

    /// True for every column stored as a non-null string.
    #[must_use]
    pub const fn is_text(self) -> bool {
        !matches!(self, Self::ScheduledDate | Self::Price)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One order book row in canonical shape.
///
/// Text fields are never null; an absent date or price is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(rename = "WO")]
    pub wo: String,
    #[serde(rename = "Quote")]
    pub quote: String,
    #[serde(rename = "PO Number")]
    pub po_number: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Customer Name")]
    pub customer_name: String,
    #[serde(rename = "Model Description")]
    pub model_description: String,
    #[serde(rename = "Scheduled Date")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(rename = "Price")]
    pub price: Option<f64>,
}

impl OrderRecord {
    /// Borrow a text field. Returns `None` for the date and price columns.
    #[must_use]
    pub fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Wo => Some(&self.wo),
            Field::Quote => Some(&self.quote),
            Field::PoNumber => Some(&self.po_number),
            Field::Status => Some(&self.status),
            Field::CustomerName => Some(&self.customer_name),
            Field::ModelDescription => Some(&self.model_description),
            Field::ScheduledDate | Field::Price => None,
        }
    }

    /// Set a text field. Ignored for the date and price columns.
    pub fn set_text(&mut self, field: Field, value: String) {
        match field {
            Field::Wo => self.wo = value,
            Field::Quote => self.quote = value,
            Field::PoNumber => self.po_number = value,
            Field::Status => self.status = value,
            Field::CustomerName => self.customer_name = value,
            Field::ModelDescription => self.model_description = value,
            Field::ScheduledDate | Field::Price => {}
        }
    }

    /// A row is blank when WO, Customer Name and Model Description are all
    /// empty after trimming.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        Field::IDENTIFYING
            .iter()
            .all(|f| self.text(*f).is_none_or(|s| s.trim().is_empty()))
    }

    /// The value of one column as an edit-buffer cell.
    #[must_use]
    pub fn cell(&self, field: Field) -> Cell {
        match field {
            Field::ScheduledDate => self.scheduled_date.map_or(Cell::Null, Cell::Date),
            Field::Price => self.price.map_or(Cell::Null, Cell::Number),
            text => Cell::Text(self.text(text).unwrap_or_default().to_string()),
        }
    }

    /// Human-readable rendering of one column (dates `YYYY-MM-DD`,
    /// prices `$1234.50`, absent values blank).
    #[must_use]
    pub fn display(&self, field: Field) -> String {
        match field {
            Field::ScheduledDate => self
                .scheduled_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            Field::Price => self.price.map(|p| format!("${p:.2}")).unwrap_or_default(),
            text => self.text(text).unwrap_or_default().to_string(),
        }
    }
}

/// The canonical table: records plus the canonical columns present.
///
/// Columns are always kept in canonical order. A table produced by
/// normalization carries all eight; a table loaded from a store that lacks
/// a column omits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Field>,
    rows: Vec<OrderRecord>,
}

impl Default for Table {
    fn default() -> Self {
        Self::empty()
    }
}

impl Table {
    /// An empty table with every canonical column.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            columns: Field::ALL.to_vec(),
            rows: Vec::new(),
        }
    }

    /// A table with every canonical column.
    #[must_use]
    pub fn with_rows(rows: Vec<OrderRecord>) -> Self {
        Self {
            columns: Field::ALL.to_vec(),
            rows,
        }
    }

    /// A table with an explicit column subset. Columns are sorted into
    /// canonical order and deduplicated.
    #[must_use]
    pub fn new(mut columns: Vec<Field>, rows: Vec<OrderRecord>) -> Self {
        columns.sort_unstable();
        columns.dedup();
        Self { columns, rows }
    }

    #[must_use]
    pub fn columns(&self) -> &[Field] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[OrderRecord] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Convert back into an edit buffer with canonical column names.
    ///
    /// Only present columns are emitted.
    #[must_use]
    pub fn to_raw(&self) -> RawTable {
        let mut raw = RawTable::new(self.columns.iter().map(|f| f.name().to_string()).collect());
        for row in &self.rows {
            raw.push_row(self.columns.iter().map(|f| row.cell(*f)).collect());
        }
        raw
    }

    /// JSON objects keyed by canonical column name, present columns only.
    #[must_use]
    pub fn to_json_records(&self) -> Vec<serde_json::Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut obj = serde_json::Map::new();
                for field in &self.columns {
                    let value = match field {
                        Field::ScheduledDate => row
                            .scheduled_date
                            .map_or(serde_json::Value::Null, |d| {
                                serde_json::Value::String(d.format("%Y-%m-%d").to_string())
                            }),
                        Field::Price => row.price.map_or(serde_json::Value::Null, |p| {
                            serde_json::Number::from_f64(p)
                                .map_or(serde_json::Value::Null, serde_json::Value::Number)
                        }),
                        text => serde_json::Value::String(
                            row.text(*text).unwrap_or_default().to_string(),
                        ),
                    };
                    obj.insert(field.name().to_string(), value);
                }
                serde_json::Value::Object(obj)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(wo: &str, customer: &str, model: &str) -> OrderRecord {
        OrderRecord {
            wo: wo.to_string(),
            customer_name: customer.to_string(),
            model_description: model.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_field_from_storage_column() {
        for field in Field::ALL {
            assert_eq!(Field::from_storage_column(field.storage_column()), Some(field));
        }
        assert_eq!(Field::from_storage_column("WO"), None);
        assert_eq!(Field::from_storage_column("uploaded_name"), None);
    }

    #[test]
    fn test_field_order_is_canonical() {
        let names: Vec<_> = Field::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            [
                "WO",
                "Quote",
                "PO Number",
                "Status",
                "Customer Name",
                "Model Description",
                "Scheduled Date",
                "Price"
            ]
        );
        assert!(Field::ALL.iter().enumerate().all(|(i, f)| f.index() == i));
    }

    #[test]
    fn test_is_blank() {
        assert!(record("", "", "").is_blank());
        assert!(record("  ", "\t", " ").is_blank());
        assert!(!record("WO-1", "", "").is_blank());
        assert!(!record("", "Acme", "").is_blank());
        assert!(!record("", "", "Model X").is_blank());

        let mut populated = record("", "", "");
        populated.quote = "Q-9".into();
        populated.price = Some(10.0);
        assert!(populated.is_blank());
    }

    #[test]
    fn test_display_formats() {
        let mut row = record("1", "Acme", "M");
        row.scheduled_date = NaiveDate::from_ymd_opt(2024, 1, 5);
        row.price = Some(1234.5);
        assert_eq!(row.display(Field::ScheduledDate), "2024-01-05");
        assert_eq!(row.display(Field::Price), "$1234.50");
        assert_eq!(row.display(Field::CustomerName), "Acme");

        let empty = OrderRecord::default();
        assert_eq!(empty.display(Field::Price), "");
        assert_eq!(empty.display(Field::ScheduledDate), "");
    }

    #[test]
    fn test_table_new_sorts_columns() {
        let table = Table::new(vec![Field::Price, Field::Wo, Field::Price], vec![]);
        assert_eq!(table.columns(), &[Field::Wo, Field::Price]);
    }

    #[test]
    fn test_to_json_records_present_columns_only() {
        let mut row = record("7", "Acme", "M");
        row.price = Some(2.5);
        let table = Table::new(vec![Field::Wo, Field::Price], vec![row]);
        let records = table.to_json_records();
        assert_eq!(records.len(), 1);
        let obj = records[0].as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["WO"], "7");
        assert_eq!(obj["Price"], 2.5);
    }

    #[test]
    fn test_serde_uses_canonical_names() {
        let table = Table::with_rows(vec![record("1", "Acme", "M")]);
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["columns"][2], "PO Number");
        assert_eq!(json["rows"][0]["Customer Name"], "Acme");

        let back: Table = serde_json::from_value(json).unwrap();
        assert_eq!(back, table);
    }
}
