//! Edit-buffer normalization.
//!
//! Turns an arbitrary [`RawTable`] into the canonical [`Table`]:
//!
//! - Restrict to the eight canonical columns, in canonical order
//! - Trim WO
//! - Coerce Scheduled Date through [`parse_date`] and Price through [`parse_price`]
//! - Fill null text with the empty string
//! - Drop rows whose WO, Customer Name and Model Description are all blank
//!
//! Parsing is lenient: a cell that cannot be read as a date or price becomes
//! `None`, never an error. [`normalize_with_report`] counts such cells so a
//! caller can warn about them.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Cell, Field, OrderRecord, RawTable, Table};

/// Text values that mean "no date" (compared after trimming, case-sensitive).
const NULL_DATE_LITERALS: [&str; 2] = ["None", "NaT"];

/// Date-only layouts, tried in order. Two-digit years go before four-digit
/// ones because `%Y` would happily read `24` as year 24.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
];

/// Date-time layouts; the time part is discarded.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Read a cell as a calendar date.
///
/// Null, blank, `"None"` and `"NaT"` give `None`. Date-times are truncated
/// to their date. Text is parsed leniently; anything unrecognized gives
/// `None`. Numbers are not interpreted as dates.
#[must_use]
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::DateTime(dt) => Some(dt.date()),
        Cell::Text(s) => parse_date_str(s),
        Cell::Null | Cell::Number(_) | Cell::Bool(_) => None,
    }
}

/// Lenient text-to-date parsing. See [`parse_date`].
#[must_use]
pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() || NULL_DATE_LITERALS.contains(&s) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Read a cell as a price.
///
/// Null, NaN and blank text give `None`. Otherwise `$` and `,` are
/// stripped from the string form and the rest parsed as `f64`; failures
/// and non-finite results give `None`.
#[must_use]
pub fn parse_price(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Null => None,
        Cell::Number(n) => n.is_finite().then_some(*n),
        other => {
            let text = other.to_text();
            if text.trim().is_empty() {
                return None;
            }
            let cleaned: String = text.chars().filter(|c| *c != '$' && *c != ',').collect();
            cleaned
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
        }
    }
}

/// What normalization did to an edit buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    /// Rows in the edit buffer.
    pub input_rows: usize,
    /// Rows kept in the canonical table.
    pub kept_rows: usize,
    /// Rows dropped because WO, Customer Name and Model Description were blank.
    pub dropped_blank_rows: usize,
    /// Non-blank Scheduled Date cells that could not be parsed (kept as absent).
    pub degraded_dates: usize,
    /// Non-blank Price cells that could not be parsed (kept as absent).
    pub degraded_prices: usize,
}

impl NormalizeReport {
    /// True if any non-blank date or price was silently dropped.
    #[must_use]
    pub fn has_degraded_cells(&self) -> bool {
        self.degraded_dates > 0 || self.degraded_prices > 0
    }
}

/// Normalize an edit buffer into the canonical table.
///
/// Deterministic and idempotent: normalizing `normalize(t)?.to_raw()` gives
/// the same table back.
///
/// # Errors
///
/// Returns `MissingColumns` if any canonical column is absent from `raw`.
pub fn normalize(raw: &RawTable) -> Result<Table> {
    normalize_with_report(raw).map(|(table, _)| table)
}

/// [`normalize`], also reporting dropped rows and degraded cells.
///
/// # Errors
///
/// Returns `MissingColumns` if any canonical column is absent from `raw`.
pub fn normalize_with_report(raw: &RawTable) -> Result<(Table, NormalizeReport)> {
    let indices = required_indices(raw)?;
    let mut report = NormalizeReport {
        input_rows: raw.rows().len(),
        ..Default::default()
    };

    let mut rows = Vec::with_capacity(raw.rows().len());
    for cells in raw.rows() {
        let cell = |field: Field| cells.get(indices[field.index()]).unwrap_or(&Cell::Null);

        let mut record = OrderRecord {
            wo: cell(Field::Wo).to_text().trim().to_string(),
            ..Default::default()
        };
        for field in Field::TEXT {
            record.set_text(field, cell(field).to_text());
        }

        let date_cell = cell(Field::ScheduledDate);
        record.scheduled_date = parse_date(date_cell);
        if record.scheduled_date.is_none() && !is_null_date(date_cell) {
            report.degraded_dates += 1;
        }

        let price_cell = cell(Field::Price);
        record.price = parse_price(price_cell);
        if record.price.is_none() && !price_cell.is_blank() && !is_non_finite(price_cell) {
            report.degraded_prices += 1;
        }

        if record.is_blank() {
            report.dropped_blank_rows += 1;
            continue;
        }
        rows.push(record);
    }

    report.kept_rows = rows.len();
    Ok((Table::with_rows(rows), report))
}

/// Positions of the canonical columns in `raw`, indexed by [`Field::index`].
fn required_indices(raw: &RawTable) -> Result<[usize; 8]> {
    let mut indices = [0usize; 8];
    let mut missing = Vec::new();
    for field in Field::ALL {
        match raw.column_index(field.name()) {
            Some(i) => indices[field.index()] = i,
            None => missing.push(field.name().to_string()),
        }
    }

    if missing.is_empty() {
        Ok(indices)
    } else {
        Err(Error::MissingColumns { missing })
    }
}

fn is_null_date(cell: &Cell) -> bool {
    match cell {
        Cell::Text(s) => {
            let s = s.trim();
            s.is_empty() || NULL_DATE_LITERALS.contains(&s)
        }
        other => other.is_null(),
    }
}

fn is_non_finite(cell: &Cell) -> bool {
    matches!(cell, Cell::Number(n) if !n.is_finite())
}
