//! Identifier plus configuration document to resolved services, in one call.

use crate::bundle::CapabilityBundle;
use crate::config::{AgentConfig, ConfigDocument, apply_defaults};
use crate::error::CapstanResult;
use crate::loader::BundleLoader;
use crate::resolver::{ResolvedServices, resolve_services};

/// Everything produced on the way to a running agent.
#[derive(Debug)]
pub struct Bootstrapped {
    pub bundle: CapabilityBundle,
    pub config: AgentConfig,
    pub services: ResolvedServices,
}

/// Load the bundle, merge its defaults under `document`, convert the result
/// and resolve it.
pub async fn bootstrap(
    loader: &BundleLoader,
    identifier: &str,
    document: &ConfigDocument,
) -> CapstanResult<Bootstrapped> {
    let bundle = loader.load_bundle(identifier).await?;
    let merged = apply_defaults(document, bundle.defaults.as_ref());
    let config = AgentConfig::from_document(&merged)?;
    let services = resolve_services(&config, &bundle).await?;
    Ok(Bootstrapped {
        bundle,
        config,
        services,
    })
}
