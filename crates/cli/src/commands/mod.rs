pub mod export;
pub mod list;

use std::path::PathBuf;

use callsheet_core::{AppConfig, ConfigError, ExportOutcome, LoadOptions};
use serde::Serialize;

/// Loads configuration for a command. An explicit `--config` path must exist.
/// `exports_only` skips the credential checks for commands that stay offline.
pub fn load_config(
    config_path: Option<PathBuf>,
    exports_only: bool,
) -> Result<AppConfig, ConfigError> {
    let require_file = config_path.is_some();
    AppConfig::load(LoadOptions {
        config_path,
        require_file,
        exports_only,
        ..LoadOptions::default()
    })
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome<'a> {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    exports: Option<&'a [ExportOutcome]>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            exports: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            exports: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// JSON report of an export run. `failure` carries the error class, message
    /// and exit code of the error that stopped the run.
    pub fn export_report(
        command: &str,
        message: impl Into<String>,
        exports: &[ExportOutcome],
        failure: Option<(&str, u8)>,
    ) -> Self {
        let (status, error_class, exit_code) = match failure {
            Some((error_class, exit_code)) => ("error", Some(error_class.to_string()), exit_code),
            None => ("ok", None, 0),
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: status.to_string(),
            error_class,
            message: message.into(),
            exports: Some(exports),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Human-readable output with an explicit exit code.
    pub fn plain(exit_code: u8, output: impl Into<String>) -> Self {
        Self { exit_code, output: output.into() }
    }
}

fn serialize_payload(payload: CommandOutcome<'_>) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
