//! # CLI settings
//!
//! Settings are read from the environment first and then overridden by
//! explicit command-line flags.
//!
//! - `CAPSTAN_BUNDLE` - Bundle identifier to load (default: `builtin`)
//! - `CAPSTAN_CONFIG` - Path to the agent configuration document
//! - `CAPSTAN_LOG_FORMAT` - `json` (default) or `pretty`

use clap::ValueEnum;
use std::{env, path::PathBuf, str::FromStr};

pub const ENV_BUNDLE: &str = "CAPSTAN_BUNDLE";
pub const ENV_CONFIG: &str = "CAPSTAN_CONFIG";
pub const ENV_LOG_FORMAT: &str = "CAPSTAN_LOG_FORMAT";

pub const DEFAULT_BUNDLE: &str = "builtin";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("No configuration document given. Pass --config or set {ENV_CONFIG}")]
    MissingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("expected 'json' or 'pretty', got '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bundle: String,
    pub config: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Settings {
    /// Configuration path, required by commands that read a document.
    pub fn require_config(&self) -> Result<&PathBuf, SettingsError> {
        self.config.as_ref().ok_or(SettingsError::MissingConfig)
    }
}

#[derive(Debug, Clone)]
pub struct SettingsBuilder {
    bundle: String,
    config: Option<PathBuf>,
    log_format: LogFormat,
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self {
            bundle: DEFAULT_BUNDLE.to_string(),
            config: None,
            log_format: LogFormat::default(),
        }
    }
}

impl SettingsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the environment.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidEnvVar` when a variable is set to an
    /// empty or unrecognised value.
    pub fn from_env() -> Result<Self, SettingsError> {
        let mut builder = Self::default();
        if let Some(bundle) = get_env_string(ENV_BUNDLE)? {
            builder = builder.bundle(Some(bundle));
        }
        if let Some(path) = get_env_string(ENV_CONFIG)? {
            builder = builder.config(Some(PathBuf::from(path)));
        }
        if let Some(format) = get_env_string(ENV_LOG_FORMAT)? {
            let format = format
                .parse::<LogFormat>()
                .map_err(|message| SettingsError::InvalidEnvVar {
                    key: ENV_LOG_FORMAT.to_string(),
                    message,
                })?;
            builder = builder.log_format(Some(format));
        }
        Ok(builder)
    }

    /// Override the bundle identifier when `bundle` is given.
    #[must_use]
    pub fn bundle(mut self, bundle: Option<String>) -> Self {
        if let Some(bundle) = bundle {
            self.bundle = bundle;
        }
        self
    }

    #[must_use]
    pub fn config(mut self, config: Option<PathBuf>) -> Self {
        if config.is_some() {
            self.config = config;
        }
        self
    }

    #[must_use]
    pub fn log_format(mut self, format: Option<LogFormat>) -> Self {
        if let Some(format) = format {
            self.log_format = format;
        }
        self
    }

    pub fn build(self) -> Settings {
        Settings {
            bundle: self.bundle,
            config: self.config,
            log_format: self.log_format,
        }
    }
}

fn get_env_string(key: &str) -> Result<Option<String>, SettingsError> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() => Err(SettingsError::InvalidEnvVar {
            key: key.to_string(),
            message: "must not be empty".to_string(),
        }),
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(SettingsError::InvalidEnvVar {
            key: key.to_string(),
            message: "not valid unicode".to_string(),
        }),
    }
}
