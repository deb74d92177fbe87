//! Error types for the order book tool.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=store, 3=not_found, 4=validation, etc.)
//! - Retryability flags
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers
//!
//! Malformed date and price cells are never errors; they degrade to an
//! absent value during normalization. Everything that reaches this type is
//! either a store failure, a bad input file, or a rejected save.

use thiserror::Error;

/// Result type alias for order book operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Store (exit 2)
    StoreError,
    HttpError,
    DatabaseError,

    // Not Found (exit 3)
    NoSession,
    FileNotFound,

    // Validation (exit 4)
    MissingColumns,
    InvalidInput,

    // Auth (exit 5)
    InvalidPassword,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::StoreError => "STORE_ERROR",
            Self::HttpError => "HTTP_ERROR",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::NoSession => "NO_SESSION",
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::MissingColumns => "MISSING_COLUMNS",
            Self::InvalidInput => "INVALID_INPUT",
            Self::InvalidPassword => "INVALID_PASSWORD",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::StoreError | Self::HttpError | Self::DatabaseError => 2,
            Self::NoSession | Self::FileNotFound => 3,
            Self::MissingColumns | Self::InvalidInput => 4,
            Self::InvalidPassword => 5,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether the caller may retry the same operation.
    ///
    /// True for transport failures and for input files that can be fixed
    /// and re-applied. A rejected password is final for that attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::HttpError | Self::MissingColumns | Self::InvalidInput | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in order book operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Store request failed ({status}): {message}")]
    Store { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("No edit session")]
    NoSession,

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Missing required columns: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Incorrect password. Changes not saved.")]
    InvalidPassword,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Store { .. } => ErrorCode::StoreError,
            Self::Http(_) => ErrorCode::HttpError,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::NoSession => ErrorCode::NoSession,
            Self::FileNotFound { .. } => ErrorCode::FileNotFound,
            Self::MissingColumns { .. } => ErrorCode::MissingColumns,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::InvalidPassword => ErrorCode::InvalidPassword,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NoSession => Some(
                "No local edit session.\n  \
                 Load one:  orderbook pull\n  \
                 Or edit:   orderbook apply <file>"
                    .to_string(),
            ),

            Self::FileNotFound { path } => Some(format!(
                "Check the path '{path}'. Export the current table with `orderbook show --format csv`."
            )),

            Self::MissingColumns { .. } => Some(format!(
                "The edited table must contain every canonical column: {}",
                crate::model::Field::ALL
                    .iter()
                    .map(|f| f.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),

            Self::InvalidPassword => Some(
                "Set ORDERBOOK_UPDATE_PASSWORD or `update_password` in ~/.orderbook/config.json"
                    .to_string(),
            ),

            Self::Store { status, .. } if *status == 401 || *status == 403 => Some(
                "The store rejected the API key. Check ORDERBOOK_KEY.".to_string(),
            ),

            Self::Config(msg) if msg.contains("URL") => Some(
                "Set ORDERBOOK_URL (https://<project>.supabase.co or sqlite:<path>) \
                 or pass --url"
                    .to_string(),
            ),

            Self::Store { .. }
            | Self::Http(_)
            | Self::Database(_)
            | Self::InvalidInput(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
