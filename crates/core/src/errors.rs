use thiserror::Error;

/// Failure while paging through the call-log API.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("call log request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("call log transport failure: {0}")]
    Transport(String),
    #[error("call log response could not be decoded: {0}")]
    Decode(String),
    #[error("call `{call_id}` closes a full page but has no createdAt cursor")]
    MissingCursor { call_id: String },
}

/// Failure while overwriting a sheet range.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WriteError {
    #[error("sheet authentication failed: {0}")]
    Auth(String),
    #[error("sheet update failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("sheet transport failure: {0}")]
    Transport(String),
    #[error("sheet response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExportError {
    #[error("unknown export `{name}` (configured: {known})")]
    UnknownExport { name: String, known: String },
    #[error("fetching calls for `{export}` failed: {source}")]
    Fetch {
        export: String,
        #[source]
        source: FetchError,
    },
    #[error("writing `{export}` failed: {source}")]
    Write {
        export: String,
        #[source]
        source: WriteError,
    },
}

impl ExportError {
    /// Stable machine-readable class used in command reports.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::UnknownExport { .. } => "unknown_export",
            Self::Fetch { .. } => "fetch",
            Self::Write { .. } => "sheet_write",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ExportError, FetchError, WriteError};

    #[test]
    fn unknown_export_lists_configured_names() {
        let error = ExportError::UnknownExport {
            name: "typo".to_owned(),
            known: "pepfactor_outbound, pepfactor_inbound".to_owned(),
        };

        assert_eq!(
            error.to_string(),
            "unknown export `typo` (configured: pepfactor_outbound, pepfactor_inbound)"
        );
        assert_eq!(error.error_class(), "unknown_export");
    }

    #[test]
    fn fetch_error_keeps_export_name_and_status() {
        let error = ExportError::Fetch {
            export: "greycorp_inbound".to_owned(),
            source: FetchError::Status { status: 401, body: "unauthorized".to_owned() },
        };

        let message = error.to_string();
        assert!(message.contains("greycorp_inbound"));
        assert!(message.contains("401"));
        assert_eq!(error.error_class(), "fetch");
    }

    #[test]
    fn write_error_maps_to_sheet_write_class() {
        let error = ExportError::Write {
            export: "greycorp_outbound".to_owned(),
            source: WriteError::Auth("invalid_grant".to_owned()),
        };

        assert_eq!(error.error_class(), "sheet_write");
    }
}
