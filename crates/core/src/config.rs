use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_VAPI_URL: &str = "https://api.vapi.ai/call";
pub const DEFAULT_MIN_DURATION_SECS: u64 = 20;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub vapi: VapiConfig,
    pub sheets: SheetsConfig,
    pub filter: FilterConfig,
    pub exports: Vec<ExportPair>,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct VapiConfig {
    pub base_url: String,
    pub bearer_token: SecretString,
}

#[derive(Clone, Debug)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub service_account_file: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterConfig {
    pub min_duration_secs: u64,
    pub excluded_numbers: Vec<String>,
}

/// One (source, destination) pair: every call of `assistant_id` lands in `range`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPair {
    pub name: String,
    pub assistant_id: String,
    pub range: String,
}

impl ExportPair {
    pub fn new(name: impl Into<String>, assistant_id: impl Into<String>) -> Self {
        let name = name.into();
        let range = default_range(&name);
        Self { name, assistant_id: assistant_id.into(), range }
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub vapi_base_url: Option<String>,
    pub bearer_token: Option<String>,
    pub spreadsheet_id: Option<String>,
    pub service_account_file: Option<PathBuf>,
    pub min_duration_secs: Option<u64>,
    pub exports: Option<Vec<ExportPair>>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    /// Validate only the export pairs and logging; credentials may be absent.
    pub exports_only: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            vapi: VapiConfig {
                base_url: DEFAULT_VAPI_URL.to_string(),
                bearer_token: String::new().into(),
            },
            sheets: SheetsConfig { spreadsheet_id: String::new(), service_account_file: None },
            filter: FilterConfig {
                min_duration_secs: DEFAULT_MIN_DURATION_SECS,
                excluded_numbers: Vec::new(),
            },
            exports: Vec::new(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

/// `{name}!A1:H`, quoting the sheet name unless it is a bare identifier.
fn default_range(name: &str) -> String {
    let bare = name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if bare {
        format!("{name}!A1:H")
    } else {
        format!("'{}'!A1:H", name.replace('\'', "''"))
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("callsheet.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        if options.exports_only {
            validate_exports(&config.exports)?;
            validate_logging(&config.logging)?;
        } else {
            config.validate()?;
        }

        Ok(config)
    }

    /// Looks up a configured pair by name.
    pub fn export(&self, name: &str) -> Option<&ExportPair> {
        self.exports.iter().find(|pair| pair.name == name)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(vapi) = patch.vapi {
            if let Some(base_url) = vapi.base_url {
                self.vapi.base_url = base_url;
            }
            if let Some(bearer_token_value) = vapi.bearer_token {
                self.vapi.bearer_token = secret_value(bearer_token_value);
            }
        }

        if let Some(sheets) = patch.sheets {
            if let Some(spreadsheet_id) = sheets.spreadsheet_id {
                self.sheets.spreadsheet_id = spreadsheet_id;
            }
            if let Some(service_account_file) = sheets.service_account_file {
                self.sheets.service_account_file = Some(service_account_file);
            }
        }

        if let Some(filter) = patch.filter {
            if let Some(min_duration_secs) = filter.min_duration_secs {
                self.filter.min_duration_secs = min_duration_secs;
            }
            if let Some(excluded_numbers) = filter.excluded_numbers {
                self.filter.excluded_numbers = excluded_numbers;
            }
        }

        if let Some(exports) = patch.exports {
            self.exports = exports
                .into_iter()
                .map(|export| {
                    let range = export.range.unwrap_or_else(|| default_range(&export.name));
                    ExportPair { name: export.name, assistant_id: export.assistant_id, range }
                })
                .collect();
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CALLSHEET_VAPI_URL") {
            self.vapi.base_url = value;
        }
        if let Some(value) = read_env("CALLSHEET_BEARER_TOKEN") {
            self.vapi.bearer_token = secret_value(value);
        }

        if let Some(value) = read_env("CALLSHEET_SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = value;
        }
        if let Some(value) = read_env("CALLSHEET_SERVICE_ACCOUNT_FILE") {
            self.sheets.service_account_file = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("CALLSHEET_MIN_DURATION_SECS") {
            self.filter.min_duration_secs = parse_u64("CALLSHEET_MIN_DURATION_SECS", &value)?;
        }
        if let Some(value) = read_env("CALLSHEET_EXCLUDED_NUMBERS") {
            self.filter.excluded_numbers = split_list(&value);
        }

        if let Some(value) = read_env("CALLSHEET_EXPORTS") {
            self.exports = parse_exports("CALLSHEET_EXPORTS", &value)?;
        }

        let log_level =
            read_env("CALLSHEET_LOGGING_LEVEL").or_else(|| read_env("CALLSHEET_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CALLSHEET_LOGGING_FORMAT").or_else(|| read_env("CALLSHEET_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.vapi_base_url {
            self.vapi.base_url = base_url;
        }
        if let Some(bearer_token) = overrides.bearer_token {
            self.vapi.bearer_token = secret_value(bearer_token);
        }
        if let Some(spreadsheet_id) = overrides.spreadsheet_id {
            self.sheets.spreadsheet_id = spreadsheet_id;
        }
        if let Some(service_account_file) = overrides.service_account_file {
            self.sheets.service_account_file = Some(service_account_file);
        }
        if let Some(min_duration_secs) = overrides.min_duration_secs {
            self.filter.min_duration_secs = min_duration_secs;
        }
        if let Some(exports) = overrides.exports {
            self.exports = exports;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_vapi(&self.vapi)?;
        validate_sheets(&self.sheets)?;
        validate_exports(&self.exports)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("callsheet.toml"), PathBuf::from("config/callsheet.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_vapi(vapi: &VapiConfig) -> Result<(), ConfigError> {
    let base_url = vapi.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "vapi.base_url must start with http:// or https://".to_string(),
        ));
    }

    if vapi.bearer_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "vapi.bearer_token is required. Copy the private API key from the Vapi dashboard into CALLSHEET_BEARER_TOKEN".to_string(),
        ));
    }

    Ok(())
}

fn validate_sheets(sheets: &SheetsConfig) -> Result<(), ConfigError> {
    if sheets.spreadsheet_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "sheets.spreadsheet_id is required (the id segment of the spreadsheet URL)"
                .to_string(),
        ));
    }

    let missing_file = sheets
        .service_account_file
        .as_ref()
        .map(|path| path.as_os_str().is_empty())
        .unwrap_or(true);
    if missing_file {
        return Err(ConfigError::Validation(
            "sheets.service_account_file is required (path to the service-account JSON key)"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_exports(exports: &[ExportPair]) -> Result<(), ConfigError> {
    if exports.is_empty() {
        return Err(ConfigError::Validation(
            "at least one export is required (add [[exports]] entries or set CALLSHEET_EXPORTS)"
                .to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for export in exports {
        if export.name.trim().is_empty() {
            return Err(ConfigError::Validation("exports.name must not be empty".to_string()));
        }
        if !seen.insert(export.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "exports.name `{}` is configured more than once",
                export.name
            )));
        }
        if export.assistant_id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "exports.assistant_id is required for `{}`",
                export.name
            )));
        }
        if !export.range.contains('!') {
            return Err(ConfigError::Validation(format!(
                "exports.range `{}` for `{}` must look like `SheetName!A1:H`",
                export.range, export.name
            )));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

// `name=assistant_id` or `name=assistant_id@Sheet!A1:H`, comma separated.
fn parse_exports(key: &str, value: &str) -> Result<Vec<ExportPair>, ConfigError> {
    let invalid =
        || ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() };

    split_list(value)
        .into_iter()
        .map(|entry| {
            let (name, target) = entry.split_once('=').ok_or_else(invalid)?;
            let (assistant_id, range) = match target.split_once('@') {
                Some((assistant_id, range)) => (assistant_id.trim(), Some(range.trim())),
                None => (target.trim(), None),
            };
            let name = name.trim();
            if name.is_empty() || assistant_id.is_empty() {
                return Err(invalid());
            }
            let mut pair = ExportPair::new(name, assistant_id);
            if let Some(range) = range.filter(|range| !range.is_empty()) {
                pair.range = range.to_string();
            }
            Ok(pair)
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    vapi: Option<VapiPatch>,
    sheets: Option<SheetsPatch>,
    filter: Option<FilterPatch>,
    exports: Option<Vec<ExportPatch>>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct VapiPatch {
    base_url: Option<String>,
    bearer_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SheetsPatch {
    spreadsheet_id: Option<String>,
    service_account_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct FilterPatch {
    min_duration_secs: Option<u64>,
    excluded_numbers: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ExportPatch {
    name: String,
    assistant_id: String,
    range: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
