//! Version command implementation.

use crate::error::Result;
use serde::Serialize;

#[derive(Serialize)]
struct VersionOutput<'a> {
    version: &'a str,
    build: &'a str,
    insert_batch_size: usize,
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let build = if cfg!(debug_assertions) {
        "dev"
    } else {
        "release"
    };

    if json {
        let output = VersionOutput {
            version,
            build,
            insert_batch_size: crate::sync::INSERT_BATCH_SIZE,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("orderbook version {version} ({build})");
    Ok(())
}
