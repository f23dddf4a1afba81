use crate::error::ConfigError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const STORE_NAME_VAR: &str = "FILE_SEARCH_STORE_NAME";
pub const DISPLAY_NAME_VAR: &str = "PDF_STORE_DISPLAY_NAME";
pub const FOLDER_VAR: &str = "PDF_FOLDER";
pub const MODEL_VAR: &str = "GEMINI_MODEL";
pub const API_BASE_VAR: &str = "GEMINI_API_BASE";
pub const POLL_INTERVAL_VAR: &str = "PDF_KB_POLL_INTERVAL_SECS";
pub const OPERATION_TIMEOUT_VAR: &str = "PDF_KB_OPERATION_TIMEOUT_SECS";

pub const DEFAULT_DISPLAY_NAME: &str = "My Books Store";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 600;

/// Startup configuration, read once and passed to every component.
#[derive(Clone)]
pub struct Settings {
    pub api_key: String,
    pub default_store: Option<String>,
    pub display_name: String,
    pub default_folder: Option<PathBuf>,
    pub model: String,
    pub api_base: Url,
    pub poll_interval: Duration,
    pub operation_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key/value source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_key = read(API_KEY_VAR).ok_or(ConfigError::MissingCredential { key: API_KEY_VAR })?;

        let api_base = read(API_BASE_VAR).unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = parse_base_url(&api_base)?;

        Ok(Self {
            api_key,
            default_store: read(STORE_NAME_VAR),
            display_name: read(DISPLAY_NAME_VAR).unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
            default_folder: read(FOLDER_VAR).map(PathBuf::from),
            model: read(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base,
            poll_interval: Duration::from_secs(parse_secs(
                POLL_INTERVAL_VAR,
                read(POLL_INTERVAL_VAR),
                DEFAULT_POLL_INTERVAL_SECS,
            )?),
            operation_timeout: Duration::from_secs(parse_secs(
                OPERATION_TIMEOUT_VAR,
                read(OPERATION_TIMEOUT_VAR),
                DEFAULT_OPERATION_TIMEOUT_SECS,
            )?),
        })
    }

    /// An explicit store wins over the configured default; the result may be empty.
    pub fn effective_store(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .or(self.default_store.as_deref())
            .unwrap_or_default()
            .to_string()
    }

    pub fn effective_display_name(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(self.display_name.as_str())
            .to_string()
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("default_store", &self.default_store)
            .field("display_name", &self.display_name)
            .field("default_folder", &self.default_folder)
            .field("model", &self.model)
            .field("api_base", &self.api_base.as_str())
            .field("poll_interval", &self.poll_interval)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    // Relative joins need a trailing slash to keep any path prefix.
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };

    Url::parse(&normalized).map_err(|error| ConfigError::InvalidValue {
        key: API_BASE_VAR,
        details: error.to_string(),
    })
}

fn parse_secs(key: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };

    let secs = raw.parse::<u64>().map_err(|error| ConfigError::InvalidValue {
        key,
        details: format!("{raw:?}: {error}"),
    })?;

    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key,
            details: "must be greater than zero".to_string(),
        });
    }

    Ok(secs)
}
