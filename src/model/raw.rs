//! Raw edit buffers read from edited files.
//!
//! Two input shapes are accepted:
//!
//! - **JSON**: an array of objects keyed by column name, or an object with a
//!   `rows` array of such objects (the shape `orderbook show --json` prints)
//! - **CSV**: a header row of column names followed by data rows
//!
//! No typing happens here; every value is kept as a [`Cell`] for
//! normalization to coerce.

use std::fs;
use std::path::Path;

use serde_json::Value;

use super::cell::Cell;
use crate::error::{Error, Result};

/// A tabular edit buffer with arbitrary named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows read as null in the missing positions.
    pub fn push_row(&mut self, cells: Vec<Cell>) {
        self.rows.push(cells);
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Index of the first column with this exact name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Build from JSON records.
    ///
    /// Columns are the union of all keys, in order of first appearance.
    /// Keys missing from a record read as null.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if any element is not a JSON object.
    pub fn from_json_records(records: &[Value]) -> Result<Self> {
        let mut columns: Vec<String> = Vec::new();
        for (i, record) in records.iter().enumerate() {
            let obj = record.as_object().ok_or_else(|| {
                Error::InvalidInput(format!("row {} is not a JSON object", i + 1))
            })?;
            for key in obj.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let mut table = Self::new(columns);
        for record in records {
            let obj = record.as_object();
            let cells = table
                .columns
                .iter()
                .map(|c| obj.and_then(|o| o.get(c)).map_or(Cell::Null, Cell::from))
                .collect();
            table.rows.push(cells);
        }
        Ok(table)
    }

    /// Parse JSON text (records array or `{"rows": [...]}`).
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON or has the wrong shape.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)?;
        match &value {
            Value::Array(records) => Self::from_json_records(records),
            Value::Object(obj) => match obj.get("rows") {
                Some(Value::Array(records)) => Self::from_json_records(records),
                _ => Err(Error::InvalidInput(
                    "expected a JSON array of rows or an object with a `rows` array".to_string(),
                )),
            },
            _ => Err(Error::InvalidInput(
                "expected a JSON array of rows".to_string(),
            )),
        }
    }

    /// Parse CSV text with a header row.
    ///
    /// Quoted fields may contain commas, doubled quotes and newlines.
    /// An empty unquoted field reads as null; `""` reads as empty text.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` on an empty document or an unterminated quote.
    pub fn from_csv_str(content: &str) -> Result<Self> {
        let mut records = parse_csv(content.strip_prefix('\u{feff}').unwrap_or(content))?;
        if records.is_empty() {
            return Err(Error::InvalidInput("CSV has no header row".to_string()));
        }

        let header = records.remove(0);
        let columns = header
            .into_iter()
            .map(|f| f.map(|s| s.trim().to_string()).unwrap_or_default())
            .collect();
        let mut table = Self::new(columns);
        for record in records {
            if record.len() == 1 && record[0].is_none() {
                continue;
            }
            table
                .rows
                .push(record.into_iter().map(Cell::from).collect());
        }
        Ok(table)
    }

    /// Read an edited table from disk, choosing the format by extension
    /// (`.json` or `.csv`), or by sniffing the first non-blank character.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if the path does not exist, or a parse error.
    pub fn read_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = fs::read_to_string(path)?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Self::from_json_str(&content),
            Some("csv") => Self::from_csv_str(&content),
            _ if content.trim_start().starts_with(['[', '{']) => Self::from_json_str(&content),
            _ => Self::from_csv_str(&content),
        }
    }
}

/// Split CSV text into records. `None` marks an empty unquoted field.
fn parse_csv(content: &str) -> Result<Vec<Vec<Option<String>>>> {
    let mut records = Vec::new();
    let mut record: Vec<Option<String>> = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                other => field.push(other),
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                quoted = true;
            }
            ',' => record.push(take_field(&mut field, &mut quoted)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(take_field(&mut field, &mut quoted));
                records.push(std::mem::take(&mut record));
            }
            other => field.push(other),
        }
    }

    if in_quotes {
        return Err(Error::InvalidInput("unterminated quoted CSV field".to_string()));
    }
    if !field.is_empty() || quoted || !record.is_empty() {
        record.push(take_field(&mut field, &mut quoted));
        records.push(record);
    }

    Ok(records)
}

fn take_field(field: &mut String, quoted: &mut bool) -> Option<String> {
    let value = std::mem::take(field);
    let was_quoted = std::mem::replace(quoted, false);
    if value.is_empty() && !was_quoted {
        None
    } else {
        Some(value)
    }
}
