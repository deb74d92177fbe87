//! Configuration management.
//!
//! Resolves where the order book lives and how to reach it.
//!
//! # Resolution Order
//!
//! Every setting follows the same priority:
//! 1. Explicit CLI flag
//! 2. Environment variable (`ORDERBOOK_*`, with the Supabase-style names as
//!    fallbacks)
//! 3. `~/.orderbook/config.json`
//! 4. Built-in default
//!
//! # Store Selection
//!
//! An `http://` or `https://` URL selects the PostgREST store and requires an
//! API key. `sqlite:<path>`, or a path ending in `.db`/`.sqlite`/`.sqlite3`,
//! selects the SQLite store.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default remote table name.
pub const DEFAULT_TABLE: &str = "order_book";

/// Update password used when none is configured.
pub const DEFAULT_UPDATE_PASSWORD: &str = "admin123";

const URL_VARS: &[&str] = &["ORDERBOOK_URL", "SUPABASE_URL"];
const KEY_VARS: &[&str] = &["ORDERBOOK_KEY", "SUPABASE_KEY"];
const TABLE_VARS: &[&str] = &["ORDERBOOK_TABLE"];
const PASSWORD_VARS: &[&str] = &["ORDERBOOK_UPDATE_PASSWORD", "UPDATE_PASSWORD"];
const STATE_VARS: &[&str] = &["ORDERBOOK_STATE"];

/// Contents of `~/.orderbook/config.json`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_password: Option<String>,
}

/// Which store implementation to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Rest { url: String, key: String },
    Sqlite { path: PathBuf },
}

/// Everything needed to construct a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub table: String,
}

impl StoreConfig {
    /// JSON view with the API key redacted.
    #[must_use]
    pub fn redacted_json(&self) -> serde_json::Value {
        match &self.backend {
            StoreBackend::Rest { url, key } => serde_json::json!({
                "backend": "postgrest",
                "url": url,
                "key": redact(key),
                "table": self.table,
            }),
            StoreBackend::Sqlite { path } => serde_json::json!({
                "backend": "sqlite",
                "path": path.display().to_string(),
                "table": self.table,
            }),
        }
    }
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides<'a> {
    pub url: Option<&'a str>,
    pub key: Option<&'a str>,
    pub table: Option<&'a str>,
}

/// Get the `~/.orderbook` directory.
#[must_use]
pub fn orderbook_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".orderbook"))
}

/// Get the config file path.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    orderbook_dir().map(|dir| dir.join("config.json"))
}

/// Load a config file. A missing file yields the defaults.
///
/// # Errors
///
/// Returns `Config` if the file exists but cannot be read or parsed.
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// Load `~/.orderbook/config.json`, or the defaults if there is none.
///
/// # Errors
///
/// Returns `Config` if the file exists but is unreadable or malformed.
pub fn load_config() -> Result<ConfigFile> {
    match config_path() {
        Some(path) => load_config_file(&path),
        None => Ok(ConfigFile::default()),
    }
}

/// Resolve the store configuration from flags, environment and file.
///
/// # Errors
///
/// Returns `Config` if no URL is configured, the URL is not recognized, or a
/// PostgREST URL has no API key.
pub fn resolve_store_config(overrides: Overrides<'_>, file: &ConfigFile) -> Result<StoreConfig> {
    resolve_store_config_with(overrides, file, |name| std::env::var(name).ok())
}

/// [`resolve_store_config`] with an injectable environment lookup.
///
/// # Errors
///
/// See [`resolve_store_config`].
pub fn resolve_store_config_with(
    overrides: Overrides<'_>,
    file: &ConfigFile,
    env: impl Fn(&str) -> Option<String>,
) -> Result<StoreConfig> {
    let url = pick(overrides.url, URL_VARS, file.url.as_deref(), &env)
        .ok_or_else(|| Error::Config("no store URL configured".to_string()))?;
    let key = pick(overrides.key, KEY_VARS, file.key.as_deref(), &env);
    let table = pick(overrides.table, TABLE_VARS, file.table.as_deref(), &env)
        .unwrap_or_else(|| DEFAULT_TABLE.to_string());

    Ok(StoreConfig {
        backend: parse_backend(&url, key)?,
        table,
    })
}

/// Resolve the password that gates saves.
///
/// Unlike the store settings, a password that is set but empty counts as
/// set: `UPDATE_PASSWORD=""` makes the empty string the password. The
/// default applies only when no variable or file entry exists.
#[must_use]
pub fn resolve_update_password(file: &ConfigFile) -> String {
    resolve_update_password_with(file, |name| std::env::var(name).ok())
}

/// [`resolve_update_password`] with an injectable environment lookup.
#[must_use]
pub fn resolve_update_password_with(
    file: &ConfigFile,
    env: impl Fn(&str) -> Option<String>,
) -> String {
    PASSWORD_VARS
        .iter()
        .find_map(|v| env(v))
        .or_else(|| file.update_password.clone())
        .unwrap_or_else(|| DEFAULT_UPDATE_PASSWORD.to_string())
}

/// Resolve the edit-session state file.
///
/// Priority: explicit path, `ORDERBOOK_STATE`, `~/.orderbook/session.json`.
#[must_use]
pub fn resolve_state_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = pick(None, STATE_VARS, None, &|name: &str| std::env::var(name).ok()) {
        return Some(PathBuf::from(path));
    }
    orderbook_dir().map(|dir| dir.join("session.json"))
}

/// Choose a store implementation from a URL.
fn parse_backend(url: &str, key: Option<String>) -> Result<StoreBackend> {
    let url = url.trim();

    if url.starts_with("http://") || url.starts_with("https://") {
        let key = key.ok_or_else(|| {
            Error::Config(format!("an API key is required for {url} (set ORDERBOOK_KEY)"))
        })?;
        return Ok(StoreBackend::Rest {
            url: url.to_string(),
            key,
        });
    }

    if let Some(path) = url.strip_prefix("sqlite:") {
        let path = path.strip_prefix("//").unwrap_or(path);
        if path.is_empty() {
            return Err(Error::Config("sqlite: URL has no path".to_string()));
        }
        return Ok(StoreBackend::Sqlite {
            path: PathBuf::from(path),
        });
    }

    let lower = url.to_ascii_lowercase();
    if [".db", ".sqlite", ".sqlite3"].iter().any(|ext| lower.ends_with(ext)) {
        return Ok(StoreBackend::Sqlite {
            path: PathBuf::from(url),
        });
    }

    Err(Error::Config(format!(
        "unrecognized store URL '{url}' (expected http(s)://, sqlite:<path>, or a .db file)"
    )))
}

/// First non-blank value among the flag, the environment variables and the file.
fn pick(
    flag: Option<&str>,
    vars: &[&str],
    file: Option<&str>,
    env: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    let non_blank = |s: &str| (!s.trim().is_empty()).then(|| s.to_string());

    flag.and_then(non_blank)
        .or_else(|| vars.iter().find_map(|v| env(v).as_deref().and_then(non_blank)))
        .or_else(|| file.and_then(non_blank))
}

fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}
