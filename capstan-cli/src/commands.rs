use capstan::{
    BundleLoader, BundleMetadata, CapstanError, ConfigDocument, ExtensionCategory,
    ResolvedSummary, apply_defaults, bootstrap, builtin_source,
};
use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::settings::{Settings, SettingsError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Capstan(#[from] CapstanError),

    #[error("Failed to render output: {0}")]
    Render(String),
}

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Bundle contents as seen by configuration authors.
#[derive(Debug, Serialize)]
pub struct BundleReport {
    pub metadata: BundleMetadata,
    /// Available types per configuration section.
    pub types: BTreeMap<&'static str, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ResolveReport {
    pub bundle: String,
    pub services: ResolvedSummary,
    /// Top-level sections handed through to the orchestrator untouched.
    pub passthrough: Vec<String>,
}

fn loader() -> BundleLoader {
    BundleLoader::new(builtin_source())
}

fn read_document(path: &Path) -> CliResult<ConfigDocument> {
    ConfigDocument::from_path(path).map_err(|err| CliError::Capstan(err.into()))
}

pub async fn inspect(settings: &Settings) -> CliResult<BundleReport> {
    let bundle = loader()
        .load_bundle(&settings.bundle)
        .await
        .map_err(CapstanError::from)?;

    let types = ExtensionCategory::ALL
        .into_iter()
        .filter(|category| *category != ExtensionCategory::Logger)
        .map(|category| (category.as_str(), bundle.type_names(category)))
        .collect();

    tracing::debug!(bundle = %settings.bundle, "Inspected bundle");
    Ok(BundleReport {
        metadata: bundle.metadata.clone(),
        types,
        defaults: bundle.defaults.as_ref().map(ConfigDocument::to_value),
    })
}

/// Configuration document with the bundle's defaults merged underneath.
pub async fn merge(settings: &Settings) -> CliResult<Value> {
    let document = read_document(settings.require_config()?)?;
    let bundle = loader()
        .load_bundle(&settings.bundle)
        .await
        .map_err(CapstanError::from)?;
    Ok(apply_defaults(&document, bundle.defaults.as_ref()).to_value())
}

pub async fn resolve(settings: &Settings) -> CliResult<ResolveReport> {
    let document = read_document(settings.require_config()?)?;
    let ready = bootstrap(&loader(), &settings.bundle, &document).await?;

    tracing::info!(
        bundle = %ready.bundle.name(),
        tools = ready.services.tools.len(),
        plugins = ready.services.plugins.len(),
        "Resolved agent configuration"
    );
    Ok(ResolveReport {
        bundle: ready.bundle.name().to_string(),
        services: ready.services.summary(),
        passthrough: ready.config.passthrough.keys().cloned().collect(),
    })
}

pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).map_err(|e| CliError::Render(e.to_string()))
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| CliError::Render(e.to_string()))
        }
    }
}
