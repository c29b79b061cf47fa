//! Service-account authentication (OAuth2 JWT bearer grant).
//!
//! The key file is the JSON document downloaded from the Google Cloud console.
//! A signed RS256 assertion is exchanged at the key's `token_uri` for a
//! short-lived access token.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::SheetsError;

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<SecretString, SheetsError>;
}

#[derive(Clone, Debug)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key_id: Option<String>,
    pub private_key: SecretString,
    pub token_uri: String,
}

#[derive(Deserialize)]
struct RawServiceAccountKey {
    #[serde(rename = "type", default)]
    key_type: Option<String>,
    client_email: String,
    #[serde(default)]
    private_key_id: Option<String>,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// Claims of the signed assertion sent to the token endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, SheetsError> {
        let key: RawServiceAccountKey = serde_json::from_str(raw)
            .map_err(|error| SheetsError::InvalidCredentials(error.to_string()))?;

        if let Some(key_type) = key.key_type.as_deref() {
            if key_type != "service_account" {
                return Err(SheetsError::InvalidCredentials(format!(
                    "expected a `service_account` key, found `{key_type}`"
                )));
            }
        }
        if key.client_email.trim().is_empty() {
            return Err(SheetsError::InvalidCredentials("client_email is empty".to_string()));
        }

        Ok(Self {
            client_email: key.client_email,
            private_key_id: key.private_key_id,
            private_key: key.private_key.into(),
            token_uri: key.token_uri,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, SheetsError> {
        let raw = fs::read_to_string(path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                SheetsError::CredentialsNotFound(path.to_path_buf())
            } else {
                SheetsError::ReadCredentials { path: path.to_path_buf(), source }
            }
        })?;
        Self::from_json(&raw)
    }

    pub fn claims(&self, scope: &str, now: DateTime<Utc>) -> AssertionClaims {
        let iat = now.timestamp();
        AssertionClaims {
            iss: self.client_email.clone(),
            scope: scope.to_string(),
            aud: self.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        }
    }

    pub fn signed_assertion(&self, scope: &str, now: DateTime<Utc>) -> Result<String, SheetsError> {
        let key = EncodingKey::from_rsa_pem(self.private_key.expose_secret().as_bytes())?;
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();
        Ok(jsonwebtoken::encode(&header, &self.claims(scope, now), &key)?)
    }
}

/// Trades a signed assertion for an access token at `token_uri`.
pub async fn exchange_assertion(
    client: &Client,
    token_uri: &str,
    assertion: &str,
) -> Result<SecretString, SheetsError> {
    let response = client
        .post(token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SheetsError::TokenExchange { status: status.as_u16(), body });
    }

    let token: TokenResponse = response.json().await?;
    if token.access_token.is_empty() {
        return Err(SheetsError::TokenExchange {
            status: status.as_u16(),
            body: "response carried an empty access_token".to_string(),
        });
    }
    debug!(
        event_name = "export.sheet.token_issued",
        expires_in = token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS),
        "service account access token issued"
    );

    Ok(token.access_token.into())
}

/// Reads the key file and requests a fresh token on every call, so nothing
/// touches the disk or the network until a sheet is actually written.
#[derive(Clone, Debug)]
pub struct ServiceAccountTokenProvider {
    client: Client,
    key_path: PathBuf,
    scope: String,
}

impl ServiceAccountTokenProvider {
    pub fn new(client: Client, key_path: impl Into<PathBuf>) -> Self {
        Self { client, key_path: key_path.into(), scope: SPREADSHEETS_SCOPE.to_string() }
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self) -> Result<SecretString, SheetsError> {
        let key = ServiceAccountKey::from_file(&self.key_path)?;
        let assertion = key.signed_assertion(&self.scope, Utc::now())?;
        exchange_assertion(&self.client, &key.token_uri, &assertion).await
    }
}
