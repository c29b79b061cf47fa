use std::path::Path;

use async_trait::async_trait;
use callsheet_core::config::SheetsConfig;
use callsheet_core::{CellValue, SheetSink, UpdateSummary, WriteError};
use reqwest::{Client, Url};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{ServiceAccountTokenProvider, TokenProvider};
use crate::SheetsError;

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Cells are parsed as if typed into the sheet, so numbers and dates in text
/// cells are recognised.
const VALUE_INPUT_OPTION: &str = "USER_ENTERED";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: &'a [Vec<CellValue>],
}

#[derive(Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Deserialize)]
struct GoogleErrorBody {
    #[serde(default)]
    message: String,
}

pub struct GoogleSheetsClient {
    client: Client,
    api_base: String,
    spreadsheet_id: String,
    tokens: Box<dyn TokenProvider>,
}

impl GoogleSheetsClient {
    pub fn new(
        client: Client,
        spreadsheet_id: impl Into<String>,
        tokens: Box<dyn TokenProvider>,
    ) -> Self {
        Self {
            client,
            api_base: SHEETS_API_BASE.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            tokens,
        }
    }

    pub fn with_service_account(spreadsheet_id: impl Into<String>, key_path: &Path) -> Self {
        let client = Client::new();
        let tokens = ServiceAccountTokenProvider::new(client.clone(), key_path);
        Self::new(client, spreadsheet_id, Box::new(tokens))
    }

    pub fn from_config(config: &SheetsConfig) -> Result<Self, SheetsError> {
        let key_path = config.service_account_file.as_deref().ok_or_else(|| {
            SheetsError::InvalidCredentials("no service account file configured".to_string())
        })?;
        Ok(Self::with_service_account(config.spreadsheet_id.clone(), key_path))
    }

    /// Points the client at another API root, e.g. a local stub.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn values_url(&self, range: &str) -> Result<Url, SheetsError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|_| SheetsError::InvalidEndpoint(self.api_base.clone()))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::InvalidEndpoint(self.api_base.clone()))?
            .pop_if_empty()
            .push(&self.spreadsheet_id)
            .push("values")
            .push(range);
        url.query_pairs_mut().append_pair("valueInputOption", VALUE_INPUT_OPTION);
        Ok(url)
    }

    /// `spreadsheets.values.update`: replaces `range` with `values`.
    pub async fn update_values(
        &self,
        range: &str,
        values: &[Vec<CellValue>],
    ) -> Result<UpdateSummary, SheetsError> {
        let url = self.values_url(range)?;
        let token = self.tokens.access_token().await?;
        let body = ValueRange { range, major_dimension: "ROWS", values };

        debug!(
            event_name = "export.sheet.update_request",
            range = %range,
            rows = values.len(),
            "sending values update"
        );
        let response = self
            .client
            .put(url)
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GoogleErrorEnvelope>(&raw)
                .map(|envelope| envelope.error.message)
                .ok()
                .filter(|message| !message.is_empty())
                .unwrap_or(raw);
            return Err(SheetsError::Api { status: status.as_u16(), message });
        }

        Ok(response.json::<UpdateSummary>().await?)
    }
}

#[async_trait]
impl SheetSink for GoogleSheetsClient {
    async fn overwrite_range(
        &self,
        range: &str,
        values: &[Vec<CellValue>],
    ) -> Result<UpdateSummary, WriteError> {
        self.update_values(range, values).await.map_err(WriteError::from)
    }
}
