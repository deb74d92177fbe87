//! Integration tests for the `orderbook` binary against a temporary SQLite store.

use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const EDITS_CSV: &str = "\
WO,Quote,PO Number,Status,Customer Name,Model Description,Scheduled Date,Price,Notes
  1001  ,Q-1,PO-9,Open,Acme,Pump,01/15/2024,\"$1,234.50\",rush
1002,,PO-10,Hold,Globex,Valve,not-a-date,TBD,
,,PO-11,,,,2024-02-01,5,
";

/// Build a command isolated from the caller's environment and home directory.
fn orderbook(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("orderbook").unwrap();
    cmd.env("HOME", home)
        .env("ORDERBOOK_URL", format!("sqlite:{}", home.join("store.db").display()))
        .env("ORDERBOOK_STATE", home.join("session.json"))
        .env_remove("ORDERBOOK_KEY")
        .env_remove("ORDERBOOK_TABLE")
        .env_remove("ORDERBOOK_UPDATE_PASSWORD")
        .env_remove("UPDATE_PASSWORD")
        .env_remove("SUPABASE_URL")
        .env_remove("SUPABASE_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).unwrap_or_else(|e| panic!("bad JSON {stdout:?}: {e}"))
}

fn write_edits(home: &Path) -> std::path::PathBuf {
    let path = home.join("edits.csv");
    fs::write(&path, EDITS_CSV).unwrap();
    path
}

#[test]
fn test_apply_save_show_round_trip() {
    let home = TempDir::new().unwrap();
    let edits = write_edits(home.path());

    let output = orderbook(home.path())
        .arg("apply")
        .arg(&edits)
        .args(["--label", "edits.csv", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    let applied = stdout_json(&output);
    assert_eq!(applied["kept_rows"], 2);
    assert_eq!(applied["dropped_blank_rows"], 1);
    assert_eq!(applied["degraded_dates"], 1);
    assert_eq!(applied["degraded_prices"], 1);
    assert_eq!(applied["label"], "edits.csv");
    assert_eq!(applied["version"], 1);

    let output = orderbook(home.path())
        .args(["save", "--password", "admin123", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    let saved = stdout_json(&output);
    assert_eq!(saved["inserted"], 2);
    assert_eq!(saved["batches"], 1);

    // Drop the local session so `show` reloads from the store
    orderbook(home.path()).arg("discard").assert().success();

    let output = orderbook(home.path()).args(["show", "--json"]).output().unwrap();
    assert!(output.status.success(), "{output:?}");
    let shown = stdout_json(&output);
    assert_eq!(shown["label"], "edits.csv");
    assert_eq!(shown["has_unsaved_changes"], false);
    assert_eq!(shown["count"], 2);
    assert_eq!(shown["rows"][0]["WO"], "1001");
    assert_eq!(shown["rows"][0]["Scheduled Date"], "2024-01-15");
    assert_eq!(shown["rows"][0]["Price"], 1234.5);
    assert_eq!(shown["rows"][1]["WO"], "1002");
    assert!(shown["rows"][1]["Scheduled Date"].is_null());
    assert!(shown["rows"][1]["Price"].is_null());
    assert!(shown["rows"][0].get("Notes").is_none());
}

#[test]
fn test_wrong_password_is_rejected() {
    let home = TempDir::new().unwrap();
    let edits = write_edits(home.path());

    orderbook(home.path()).arg("apply").arg(&edits).assert().success();

    let output = orderbook(home.path())
        .args(["save", "--password", "guess", "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(5));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("INVALID_PASSWORD"), "{stderr}");

    // Session is still unsaved and the store was never written
    let output = orderbook(home.path()).args(["status", "--json"]).output().unwrap();
    let status = stdout_json(&output);
    assert_eq!(status["session"]["has_unsaved_changes"], true);
    assert!(!home.path().join("store.db").exists());
}

#[test]
fn test_configured_password_replaces_default() {
    let home = TempDir::new().unwrap();
    let edits = write_edits(home.path());

    orderbook(home.path()).arg("apply").arg(&edits).assert().success();

    orderbook(home.path())
        .env("ORDERBOOK_UPDATE_PASSWORD", "s3cret")
        .args(["save", "--password", "admin123"])
        .assert()
        .code(5);

    orderbook(home.path())
        .env("ORDERBOOK_UPDATE_PASSWORD", "s3cret")
        .args(["save", "--password", "s3cret"])
        .assert()
        .success();
}

#[test]
fn test_save_without_session() {
    let home = TempDir::new().unwrap();
    orderbook(home.path())
        .args(["save", "--password", "admin123"])
        .assert()
        .code(3);
}

#[test]
fn test_apply_missing_columns() {
    let home = TempDir::new().unwrap();
    let edits = home.path().join("partial.json");
    fs::write(&edits, r#"[{"WO": "1", "Customer Name": "Acme"}]"#).unwrap();

    let output = orderbook(home.path())
        .arg("apply")
        .arg(&edits)
        .arg("--json")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("MISSING_COLUMNS"), "{stderr}");
    assert!(!home.path().join("session.json").exists());
}

#[test]
fn test_show_empty_store() {
    let home = TempDir::new().unwrap();
    let output = orderbook(home.path()).args(["show", "--json"]).output().unwrap();
    assert!(output.status.success(), "{output:?}");
    let shown = stdout_json(&output);
    assert_eq!(shown["count"], 0);
    assert!(shown["label"].is_null());
    assert_eq!(shown["columns"].as_array().unwrap().len(), 8);
}

#[test]
fn test_csv_export_can_be_applied_back() {
    let home = TempDir::new().unwrap();
    let edits = write_edits(home.path());
    orderbook(home.path()).arg("apply").arg(&edits).assert().success();

    let output = orderbook(home.path())
        .args(["show", "--format", "csv"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    let csv = String::from_utf8(output.stdout).unwrap();
    assert!(csv.starts_with(
        "WO,Quote,PO Number,Status,Customer Name,Model Description,Scheduled Date,Price\n"
    ));

    let exported = home.path().join("exported.csv");
    fs::write(&exported, &csv).unwrap();
    let output = orderbook(home.path())
        .arg("apply")
        .arg(&exported)
        .arg("--json")
        .output()
        .unwrap();
    let applied = stdout_json(&output);
    assert_eq!(applied["kept_rows"], 2);
    assert_eq!(applied["dropped_blank_rows"], 0);
    assert_eq!(applied["degraded_dates"], 0);
    assert_eq!(applied["version"], 2);
    assert!(applied["label"].is_null());
}

#[test]
fn test_label_survives_export_and_reapply() {
    let home = TempDir::new().unwrap();
    let march = home.path().join("march_orders.csv");
    fs::write(&march, EDITS_CSV).unwrap();

    orderbook(home.path())
        .arg("apply")
        .arg(&march)
        .args(["--label", "march_orders.csv"])
        .assert()
        .success();
    orderbook(home.path())
        .args(["save", "--password", "admin123"])
        .assert()
        .success();

    // Round-trip the stored table through a scratch CSV without --label
    orderbook(home.path()).arg("pull").assert().success();
    let output = orderbook(home.path())
        .args(["show", "--format", "csv"])
        .output()
        .unwrap();
    let tweak = home.path().join("tweak.csv");
    fs::write(&tweak, output.stdout).unwrap();

    let output = orderbook(home.path())
        .arg("apply")
        .arg(&tweak)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout_json(&output)["label"], "march_orders.csv");

    orderbook(home.path())
        .args(["save", "--password", "admin123"])
        .assert()
        .success();
    orderbook(home.path()).arg("discard").assert().success();

    let output = orderbook(home.path()).args(["show", "--json"]).output().unwrap();
    let shown = stdout_json(&output);
    assert_eq!(shown["label"], "march_orders.csv");
    assert_eq!(shown["count"], 2);
}

#[test]
fn test_version_json() {
    let home = TempDir::new().unwrap();
    let output = orderbook(home.path()).args(["version", "--json"]).output().unwrap();
    let version = stdout_json(&output);
    assert_eq!(version["version"], env!("CARGO_PKG_VERSION"));
}
