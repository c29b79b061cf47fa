use std::path::PathBuf;

use anyhow::Context;
use callsheet_core::{
    AppConfig, CallLogSource, ExportError, ExportPipeline, ExportSelection, RelevanceFilter,
    RunReport, SheetSink,
};
use callsheet_sheets::GoogleSheetsClient;
use callsheet_vapi::VapiClient;
use tokio::runtime::{Builder, Runtime};

use crate::commands::{load_config, CommandResult};
use crate::logging;

const COMMAND: &str = "export";

pub const EXIT_UNKNOWN_EXPORT: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_FETCH: u8 = 4;
pub const EXIT_SHEET_WRITE: u8 = 5;

#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub selection: ExportSelection,
    pub config_path: Option<PathBuf>,
    pub dry_run: bool,
    pub json: bool,
}

pub fn run(options: ExportOptions) -> CommandResult {
    let config = match load_config(options.config_path.clone(), false) {
        Ok(config) => config,
        Err(error) => {
            return failure(&options, "config_validation", error.to_string(), EXIT_CONFIG);
        }
    };
    logging::init(&config.logging);

    let source = VapiClient::from_config(&config.vapi);
    let sink = match GoogleSheetsClient::from_config(&config.sheets) {
        Ok(sink) => sink,
        Err(error) => {
            return failure(&options, "config_validation", error.to_string(), EXIT_CONFIG);
        }
    };

    execute(&config, &source, &sink, &options)
}

/// Runs the selected exports against the given source and sink.
pub fn execute(
    config: &AppConfig,
    source: &dyn CallLogSource,
    sink: &dyn SheetSink,
    options: &ExportOptions,
) -> CommandResult {
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return failure(options, "runtime_init", format!("{error:#}"), EXIT_RUNTIME);
        }
    };

    let pipeline = ExportPipeline::new(source, sink, RelevanceFilter::from_config(&config.filter))
        .dry_run(options.dry_run);
    let report = runtime.block_on(pipeline.run(&config.exports, &options.selection));

    render(&report, options)
}

fn runtime() -> anyhow::Result<Runtime> {
    Builder::new_current_thread().enable_all().build().context("failed to initialize async runtime")
}

fn exit_code(error: &ExportError) -> u8 {
    match error {
        ExportError::UnknownExport { .. } => EXIT_UNKNOWN_EXPORT,
        ExportError::Fetch { .. } => EXIT_FETCH,
        ExportError::Write { .. } => EXIT_SHEET_WRITE,
    }
}

fn render(report: &RunReport, options: &ExportOptions) -> CommandResult {
    let completed = report.outcomes.len();

    if options.json {
        let stopped_by =
            report.error.as_ref().map(|error| (error.error_class(), exit_code(error)));
        let message = match &report.error {
            Some(error) => error.to_string(),
            None if options.dry_run => format!("dry run: {completed} export(s) prepared"),
            None => format!("{completed} export(s) completed"),
        };
        return CommandResult::export_report(COMMAND, message, &report.outcomes, stopped_by);
    }

    let mut lines: Vec<String> = report
        .outcomes
        .iter()
        .map(|outcome| {
            if outcome.dry_run {
                format!(
                    "dry run: {} rows ({} cells) prepared for {} ({}).",
                    outcome.rows, outcome.prepared_cells, outcome.export, outcome.range
                )
            } else {
                format!("{} cells updated for {}.", outcome.updated_cells, outcome.export)
            }
        })
        .collect();

    let code = match &report.error {
        Some(error) => {
            lines.push(format!("error: {error}"));
            exit_code(error)
        }
        None => 0,
    };
    CommandResult::plain(code, lines.join("\n"))
}

fn failure(
    options: &ExportOptions,
    error_class: &str,
    message: String,
    exit_code: u8,
) -> CommandResult {
    if options.json {
        CommandResult::failure(COMMAND, error_class, message, exit_code)
    } else {
        CommandResult::plain(exit_code, format!("error: {message}"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use callsheet_core::{
        AppConfig, CallListQuery, CallLogSource, CallRecord, CellValue, ExportPair,
        ExportSelection, FetchError, SheetSink, UpdateSummary, WriteError,
    };
    use serde_json::Value;

    use super::{execute, ExportOptions, EXIT_FETCH, EXIT_SHEET_WRITE, EXIT_UNKNOWN_EXPORT};

    #[derive(Default)]
    struct StubSource {
        requests: Mutex<usize>,
        fail: bool,
    }

    #[async_trait]
    impl CallLogSource for StubSource {
        async fn list_calls(&self, query: &CallListQuery) -> Result<Vec<CallRecord>, FetchError> {
            *self.requests.lock().expect("request lock") += 1;
            if self.fail {
                return Err(FetchError::Status { status: 401, body: "unauthorized".to_string() });
            }
            Ok(vec![CallRecord {
                id: format!("{}-call", query.assistant_id),
                created_at: Some("2024-05-01T09:59:00Z".to_string()),
                started_at: Some("2024-05-01T10:00:00Z".to_string()),
                ended_at: Some("2024-05-01T10:02:00Z".to_string()),
                ..CallRecord::default()
            }])
        }
    }

    #[derive(Default)]
    struct StubSink {
        ranges: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl SheetSink for StubSink {
        async fn overwrite_range(
            &self,
            range: &str,
            values: &[Vec<CellValue>],
        ) -> Result<UpdateSummary, WriteError> {
            if self.fail {
                return Err(WriteError::Auth("invalid_grant".to_string()));
            }
            self.ranges.lock().expect("range lock").push(range.to_string());
            Ok(UpdateSummary {
                updated_cells: values.iter().map(|row| row.len() as u64).sum(),
                ..UpdateSummary::default()
            })
        }
    }

    fn config() -> AppConfig {
        AppConfig {
            exports: vec![
                ExportPair::new("pepfactor_outbound", "asst-out"),
                ExportPair::new("pepfactor_inbound", "asst-in"),
            ],
            ..AppConfig::default()
        }
    }

    fn options(selection: ExportSelection, json: bool) -> ExportOptions {
        ExportOptions { selection, config_path: None, dry_run: false, json }
    }

    #[test]
    fn prints_one_line_per_export() {
        let source = StubSource::default();
        let sink = StubSink::default();

        let result = execute(&config(), &source, &sink, &options(ExportSelection::All, false));

        assert_eq!(result.exit_code, 0);
        assert_eq!(
            result.output,
            "16 cells updated for pepfactor_outbound.\n16 cells updated for pepfactor_inbound."
        );
        assert_eq!(
            *sink.ranges.lock().expect("range lock"),
            vec!["pepfactor_outbound!A1:H".to_string(), "pepfactor_inbound!A1:H".to_string()]
        );
    }

    #[test]
    fn unknown_export_exits_without_requests() {
        let source = StubSource::default();
        let sink = StubSink::default();

        let result = execute(
            &config(),
            &source,
            &sink,
            &options(ExportSelection::Named("greycorp".to_string()), true),
        );

        assert_eq!(result.exit_code, EXIT_UNKNOWN_EXPORT);
        let payload: Value = serde_json::from_str(&result.output).expect("json output");
        assert_eq!(payload["error_class"], "unknown_export");
        assert_eq!(payload["exports"], Value::Array(Vec::new()));
        assert_eq!(*source.requests.lock().expect("request lock"), 0);
        assert!(sink.ranges.lock().expect("range lock").is_empty());
    }

    #[test]
    fn fetch_failure_exits_nonzero_with_message() {
        let source = StubSource { fail: true, ..StubSource::default() };
        let sink = StubSink::default();

        let result = execute(&config(), &source, &sink, &options(ExportSelection::All, false));

        assert_eq!(result.exit_code, EXIT_FETCH);
        assert!(result.output.starts_with("error: fetching calls for `pepfactor_outbound` failed"));
        assert_eq!(*source.requests.lock().expect("request lock"), 1);
    }

    #[test]
    fn write_failure_exits_nonzero() {
        let source = StubSource::default();
        let sink = StubSink { fail: true, ..StubSink::default() };

        let result = execute(&config(), &source, &sink, &options(ExportSelection::All, true));

        assert_eq!(result.exit_code, EXIT_SHEET_WRITE);
        let payload: Value = serde_json::from_str(&result.output).expect("json output");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "sheet_write");
    }

    #[test]
    fn dry_run_reports_prepared_rows() {
        let source = StubSource::default();
        let sink = StubSink::default();
        let mut dry_run = options(ExportSelection::Named("pepfactor_inbound".to_string()), false);
        dry_run.dry_run = true;

        let result = execute(&config(), &source, &sink, &dry_run);

        assert_eq!(result.exit_code, 0);
        assert_eq!(
            result.output,
            "dry run: 1 rows (16 cells) prepared for pepfactor_inbound (pepfactor_inbound!A1:H)."
        );
        assert!(sink.ranges.lock().expect("range lock").is_empty());
    }
}
