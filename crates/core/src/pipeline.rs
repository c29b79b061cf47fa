//! Fetch, filter and write, once per configured export pair.

use serde::Serialize;
use tracing::info;

use crate::config::ExportPair;
use crate::domain::row::sheet_values;
use crate::errors::ExportError;
use crate::fetch::{fetch_all_calls, CallLogSource};
use crate::filter::RelevanceFilter;
use crate::sink::SheetSink;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportSelection {
    All,
    Named(String),
}

impl ExportSelection {
    pub fn from_arg(arg: Option<String>) -> Self {
        arg.map(Self::Named).unwrap_or(Self::All)
    }

    /// Resolves the selection against the configured pairs, keeping their order.
    pub fn resolve<'c>(&self, pairs: &'c [ExportPair]) -> Result<Vec<&'c ExportPair>, ExportError> {
        match self {
            Self::All => Ok(pairs.iter().collect()),
            Self::Named(name) => pairs
                .iter()
                .find(|pair| &pair.name == name)
                .map(|pair| vec![pair])
                .ok_or_else(|| ExportError::UnknownExport {
                    name: name.clone(),
                    known: configured_names(pairs),
                }),
        }
    }
}

fn configured_names(pairs: &[ExportPair]) -> String {
    pairs.iter().map(|pair| pair.name.as_str()).collect::<Vec<_>>().join(", ")
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportOutcome {
    pub export: String,
    pub range: String,
    pub calls_fetched: usize,
    pub rows: usize,
    pub prepared_cells: u64,
    pub updated_cells: u64,
    pub dry_run: bool,
}

/// Outcomes of the pairs that finished, plus the error that stopped the run.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<ExportOutcome>,
    pub error: Option<ExportError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

pub struct ExportPipeline<'a> {
    source: &'a dyn CallLogSource,
    sink: &'a dyn SheetSink,
    filter: RelevanceFilter,
    dry_run: bool,
}

impl<'a> ExportPipeline<'a> {
    pub fn new(
        source: &'a dyn CallLogSource,
        sink: &'a dyn SheetSink,
        filter: RelevanceFilter,
    ) -> Self {
        Self { source, sink, filter, dry_run: false }
    }

    /// Fetch and filter only; nothing is written.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Runs the selected pairs in configuration order and stops at the first
    /// failure. An unknown selection fails before any request is made.
    pub async fn run(&self, pairs: &[ExportPair], selection: &ExportSelection) -> RunReport {
        let selected = match selection.resolve(pairs) {
            Ok(selected) => selected,
            Err(error) => return RunReport { outcomes: Vec::new(), error: Some(error) },
        };

        let mut report = RunReport::default();
        for pair in selected {
            match self.run_pair(pair).await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(error) => {
                    report.error = Some(error);
                    break;
                }
            }
        }
        report
    }

    pub async fn run_pair(&self, pair: &ExportPair) -> Result<ExportOutcome, ExportError> {
        let calls = fetch_all_calls(self.source, &pair.assistant_id)
            .await
            .map_err(|source| ExportError::Fetch { export: pair.name.clone(), source })?;
        info!(
            event_name = "export.fetch.completed",
            export = %pair.name,
            calls = calls.len(),
            "total calls fetched"
        );

        let rows = self.filter.apply(&calls);
        let row_count = rows.len();
        let values = sheet_values(rows);
        let prepared_cells = values.iter().map(|row| row.len() as u64).sum();
        info!(
            event_name = "export.filter.completed",
            export = %pair.name,
            rows = row_count,
            min_duration_secs = self.filter.min_duration_secs(),
            "filtered relevant calls"
        );

        let updated_cells = if self.dry_run {
            0
        } else {
            let summary = self
                .sink
                .overwrite_range(&pair.range, &values)
                .await
                .map_err(|source| ExportError::Write { export: pair.name.clone(), source })?;
            info!(
                event_name = "export.sheet.updated",
                export = %pair.name,
                range = %pair.range,
                updated_cells = summary.updated_cells,
                "sheet range overwritten"
            );
            summary.updated_cells
        };

        Ok(ExportOutcome {
            export: pair.name.clone(),
            range: pair.range.clone(),
            calls_fetched: calls.len(),
            rows: row_count,
            prepared_cells,
            updated_cells,
            dry_run: self.dry_run,
        })
    }
}
