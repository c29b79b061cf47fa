use serde::{Deserialize, Serialize};

/// Sentinel written for optional fields the call did not carry.
pub const NOT_AVAILABLE: &str = "N/A";

pub const HEADER: [&str; 8] = [
    "ID",
    "Phone Number",
    "Duration (seconds)",
    "Start Time",
    "End Time",
    "Summary",
    "Success Evaluation",
    "Transcript",
];

/// A single spreadsheet cell. Serializes to a bare JSON string or number.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// A call that passed the relevance filter, already reshaped for the sheet.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilteredRow {
    pub id: String,
    pub phone: String,
    pub duration_secs: f64,
    pub started_at: String,
    pub ended_at: String,
    pub summary: String,
    pub success_evaluation: String,
    pub transcript: String,
}

impl FilteredRow {
    pub fn into_cells(self) -> Vec<CellValue> {
        vec![
            self.id.into(),
            self.phone.into(),
            self.duration_secs.into(),
            self.started_at.into(),
            self.ended_at.into(),
            self.summary.into(),
            self.success_evaluation.into(),
            self.transcript.into(),
        ]
    }
}

/// Header row followed by one row per filtered call.
pub fn sheet_values(rows: Vec<FilteredRow>) -> Vec<Vec<CellValue>> {
    let mut values = Vec::with_capacity(rows.len() + 1);
    values.push(HEADER.iter().copied().map(CellValue::from).collect());
    values.extend(rows.into_iter().map(FilteredRow::into_cells));
    values
}
