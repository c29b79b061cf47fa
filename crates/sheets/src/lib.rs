//! Google Sheets writer authenticated with a service-account key.
//!
//! - `auth`: service-account key loading and the JWT bearer grant
//! - `client`: `spreadsheets.values.update` with `USER_ENTERED` input

pub mod auth;
pub mod client;

use std::path::PathBuf;

use callsheet_core::WriteError;
use thiserror::Error;

pub use auth::{ServiceAccountKey, ServiceAccountTokenProvider, TokenProvider, SPREADSHEETS_SCOPE};
pub use client::GoogleSheetsClient;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service account key not found at {0}")]
    CredentialsNotFound(PathBuf),
    #[error("could not read service account key {path}: {source}")]
    ReadCredentials { path: PathBuf, source: std::io::Error },
    #[error("invalid service account key: {0}")]
    InvalidCredentials(String),
    #[error("could not sign token assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("token exchange failed with status {status}: {body}")]
    TokenExchange { status: u16, body: String },
    #[error("sheets API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid sheets endpoint `{0}`")]
    InvalidEndpoint(String),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<SheetsError> for WriteError {
    fn from(error: SheetsError) -> Self {
        match error {
            SheetsError::Api { status, message } => Self::Status { status, message },
            SheetsError::Http(error) if error.is_decode() => Self::Decode(error.to_string()),
            SheetsError::Http(error) => Self::Transport(error.to_string()),
            SheetsError::InvalidEndpoint(endpoint) => {
                Self::Transport(format!("invalid sheets endpoint `{endpoint}`"))
            }
            SheetsError::Json(error) => Self::Decode(error.to_string()),
            other @ (SheetsError::CredentialsNotFound(_)
            | SheetsError::ReadCredentials { .. }
            | SheetsError::InvalidCredentials(_)
            | SheetsError::Signing(_)
            | SheetsError::TokenExchange { .. }) => Self::Auth(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use callsheet_core::WriteError;

    use super::SheetsError;

    #[test]
    fn credential_failures_surface_as_auth_errors() {
        let error = WriteError::from(SheetsError::CredentialsNotFound(PathBuf::from("sa.json")));
        assert_eq!(error, WriteError::Auth("service account key not found at sa.json".to_string()));

        let error = WriteError::from(SheetsError::TokenExchange {
            status: 400,
            body: "invalid_grant".to_string(),
        });
        assert!(matches!(error, WriteError::Auth(ref message)
            if message.contains("invalid_grant")));
    }

    #[test]
    fn api_failures_keep_their_status() {
        let error = WriteError::from(SheetsError::Api {
            status: 403,
            message: "The caller does not have permission".to_string(),
        });
        assert_eq!(
            error,
            WriteError::Status {
                status: 403,
                message: "The caller does not have permission".to_string()
            }
        );
    }
}
