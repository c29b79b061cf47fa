pub mod config;
pub mod domain;
pub mod errors;
pub mod fetch;
pub mod filter;
pub mod pipeline;
pub mod sink;

pub use config::{AppConfig, ConfigError, ExportPair, LoadOptions};
pub use domain::call::{CallAnalysis, CallRecord, Customer};
pub use domain::row::{sheet_values, CellValue, FilteredRow, HEADER, NOT_AVAILABLE};
pub use errors::{ExportError, FetchError, WriteError};
pub use fetch::{fetch_all_calls, CallListQuery, CallLogPager, CallLogSource, PAGE_SIZE};
pub use filter::RelevanceFilter;
pub use pipeline::{ExportOutcome, ExportPipeline, ExportSelection, RunReport};
pub use sink::{SheetSink, UpdateSummary};
