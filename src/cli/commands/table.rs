//! Table commands: show, pull, apply, discard.

use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use tracing::info;

use super::{open_or_load, open_sync, runtime, state_path};
use crate::cli::Cli;
use crate::config::load_config;
use crate::error::Result;
use crate::model::{Field, RawTable, Table};
use crate::session::EditSession;
use crate::sync::{LoadedTable, NormalizeReport};

#[derive(Serialize)]
struct TableOutput<'a> {
    label: Option<&'a str>,
    has_unsaved_changes: bool,
    version: u64,
    count: usize,
    columns: Vec<&'static str>,
    rows: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct ApplyOutput<'a> {
    label: Option<&'a str>,
    version: u64,
    #[serde(flatten)]
    report: &'a NormalizeReport,
}

#[derive(Serialize)]
struct DiscardOutput {
    discarded: bool,
}

/// Show the edit buffer, loading it from the store if there is no session.
pub fn execute_show(cli: &Cli, json: bool) -> Result<()> {
    let path = state_path(cli)?;
    let session = open_or_load(cli, &load_config()?, &path)?;
    print_session(&session, json)
}

/// Reload from the store into a fresh session.
pub fn execute_pull(cli: &Cli, json: bool) -> Result<()> {
    let path = state_path(cli)?;
    let sync = open_sync(cli, &load_config()?)?;

    if let Some(previous) = EditSession::open(&path)? {
        if previous.has_unsaved_changes() && !json && !cli.quiet {
            eprintln!(
                "{}",
                format!("Discarding unsaved changes (version {}).", previous.version()).yellow()
            );
        }
    }

    let session = runtime()?.block_on(EditSession::load_from(&sync))?;
    session.persist(&path)?;
    info!(rows = session.table().len(), "Pulled order book");
    print_session(&session, json)
}

/// Replace the edit buffer with the normalized contents of `file`.
pub fn execute_apply(cli: &Cli, file: &Path, label: Option<&str>, json: bool) -> Result<()> {
    let path = state_path(cli)?;
    let raw = RawTable::read_file(file)?;

    let mut session = match EditSession::open(&path)? {
        Some(session) => session,
        None => EditSession::from_loaded(LoadedTable::empty()),
    };

    // Without --label the batch keeps the label it was loaded with
    let report = session.apply(&raw, label.map(str::to_string))?;
    session.persist(&path)?;

    if json {
        let output = ApplyOutput {
            label: session.label(),
            version: session.version(),
            report: &report,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }

    println!(
        "{} {} rows from {} (version {})",
        "Applied".green().bold(),
        report.kept_rows,
        file.display(),
        session.version()
    );
    if report.dropped_blank_rows > 0 {
        println!("  Dropped {} blank rows", report.dropped_blank_rows);
    }
    if report.has_degraded_cells() {
        println!(
            "  {}",
            format!(
                "Cleared {} unreadable dates and {} unreadable prices",
                report.degraded_dates, report.degraded_prices
            )
            .yellow()
        );
    }
    println!("{}", "Unsaved changes. Run `orderbook save` to publish.".yellow());
    Ok(())
}

/// Delete the edit session file.
pub fn execute_discard(cli: &Cli, json: bool) -> Result<()> {
    let path = state_path(cli)?;
    let discarded = EditSession::remove(&path)?;

    if json {
        println!("{}", serde_json::to_string(&DiscardOutput { discarded })?);
    } else if !cli.quiet {
        if discarded {
            println!("Discarded edit session.");
        } else {
            println!("No edit session.");
        }
    }
    Ok(())
}

fn print_session(session: &EditSession, json: bool) -> Result<()> {
    let table = session.table();

    if crate::is_csv() {
        print_csv(table);
    } else if json {
        let output = TableOutput {
            label: session.label(),
            has_unsaved_changes: session.has_unsaved_changes(),
            version: session.version(),
            count: table.len(),
            columns: table.columns().iter().map(|f| f.name()).collect(),
            rows: table.to_json_records(),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        match session.label() {
            Some(label) => println!("Currently loaded: {}", label.bold()),
            None => println!("{}", "No data loaded.".dimmed()),
        }
        if session.has_unsaved_changes() {
            println!("{}", "You have unsaved changes.".yellow().bold());
        }
        println!();
        if table.is_empty() {
            println!("No orders.");
        } else {
            print_table(table);
        }
    }

    Ok(())
}

/// CSV with canonical headers; the output can be edited and applied back.
fn print_csv(table: &Table) {
    let header: Vec<String> = table
        .columns()
        .iter()
        .map(|f| crate::csv_escape(f.name()))
        .collect();
    println!("{}", header.join(","));
    for row in table.rows() {
        let cells: Vec<String> = table
            .columns()
            .iter()
            .map(|f| crate::csv_escape(&row.cell(*f).to_text()))
            .collect();
        println!("{}", cells.join(","));
    }
}

fn print_table(table: &Table) {
    let columns = table.columns();
    let cells: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| columns.iter().map(|f| row.display(*f)).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, f)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(f.name().len()))
                .max()
                .unwrap_or_default()
        })
        .collect();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(f, w)| format!("{:<w$}", f.name(), w = *w))
        .collect();
    println!("{}", header.join("  ").bold());

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(columns.iter().zip(&widths))
            .map(|(value, (field, w))| {
                if *field == Field::Price {
                    format!("{value:>w$}", w = *w)
                } else {
                    format!("{value:<w$}", w = *w)
                }
            })
            .collect();
        println!("{}", line.join("  ").trim_end());
    }
    println!();
    println!("{} orders", table.len());
}
