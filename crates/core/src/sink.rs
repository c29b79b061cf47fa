use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::row::CellValue;
use crate::errors::WriteError;

/// What the spreadsheet reported after an overwrite.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    #[serde(default)]
    pub updated_range: Option<String>,
    #[serde(default)]
    pub updated_rows: u64,
    #[serde(default)]
    pub updated_columns: u64,
    #[serde(default)]
    pub updated_cells: u64,
}

/// Destination spreadsheet. `range` is `SheetName!A1:H` style; values are
/// entered as if typed by a user.
#[async_trait]
pub trait SheetSink: Send + Sync {
    async fn overwrite_range(
        &self,
        range: &str,
        values: &[Vec<CellValue>],
    ) -> Result<UpdateSummary, WriteError>;
}
