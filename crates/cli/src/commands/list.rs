use std::path::PathBuf;

use callsheet_core::ExportPair;
use serde::Serialize;

use crate::commands::export::EXIT_CONFIG;
use crate::commands::{load_config, CommandResult};

const COMMAND: &str = "list";

#[derive(Debug, Serialize)]
struct ExportListing<'a> {
    command: &'static str,
    status: &'static str,
    exports: &'a [ExportPair],
}

/// Prints the configured export pairs. Makes no network calls.
pub fn run(config_path: Option<PathBuf>, json: bool) -> CommandResult {
    let config = match load_config(config_path, true) {
        Ok(config) => config,
        Err(error) if json => {
            let message = error.to_string();
            return CommandResult::failure(COMMAND, "config_validation", message, EXIT_CONFIG);
        }
        Err(error) => return CommandResult::plain(EXIT_CONFIG, format!("error: {error}")),
    };

    if json {
        let listing = ExportListing { command: COMMAND, status: "ok", exports: &config.exports };
        return match serde_json::to_string(&listing) {
            Ok(output) => CommandResult::plain(0, output),
            Err(error) => CommandResult::failure(COMMAND, "serialization", error.to_string(), 1),
        };
    }

    CommandResult::plain(0, render_table(&config.exports))
}

fn render_table(exports: &[ExportPair]) -> String {
    let name_width = exports.iter().map(|pair| pair.name.len()).max().unwrap_or(0).max(4);
    let id_width = exports.iter().map(|pair| pair.assistant_id.len()).max().unwrap_or(0).max(9);

    let mut lines = vec![format!("{:<name_width$}  {:<id_width$}  RANGE", "NAME", "ASSISTANT")];
    lines.extend(exports.iter().map(|pair| {
        format!("{:<name_width$}  {:<id_width$}  {}", pair.name, pair.assistant_id, pair.range)
    }));
    lines.join("\n")
}
