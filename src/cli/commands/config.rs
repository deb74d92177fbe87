//! Config command implementation.

use serde::Serialize;

use super::{overrides, state_path};
use crate::cli::{Cli, ConfigCommands};
use crate::config::{
    config_path, load_config, resolve_store_config, resolve_update_password,
    DEFAULT_UPDATE_PASSWORD,
};
use crate::error::Result;

#[derive(Serialize)]
struct ConfigOutput {
    config_file: Option<String>,
    store: serde_json::Value,
    state_path: String,
    update_password: &'static str,
}

/// Execute config commands.
pub fn execute(command: &ConfigCommands, cli: &Cli, json: bool) -> Result<()> {
    match command {
        ConfigCommands::Show => execute_show(cli, json),
    }
}

fn execute_show(cli: &Cli, json: bool) -> Result<()> {
    let file = load_config()?;
    let store = resolve_store_config(overrides(cli), &file)?;
    let path = state_path(cli)?;
    let update_password = if resolve_update_password(&file) == DEFAULT_UPDATE_PASSWORD {
        "default"
    } else {
        "configured"
    };

    let output = ConfigOutput {
        config_file: config_path()
            .filter(|p| p.exists())
            .map(|p| p.display().to_string()),
        store: store.redacted_json(),
        state_path: path.display().to_string(),
        update_password,
    };

    if json {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}
