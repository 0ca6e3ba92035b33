//! Reference lifecycle plugins and their factories.

pub mod audit;
pub mod rate_limit;

use capstan_core::Plugin;
use capstan_resolver::{FactoryResult, PluginFactory, plugin_factory};
use std::sync::Arc;

pub use audit::{AuditConfig, AuditPlugin, AuditRecord};
pub use rate_limit::{RateLimitConfig, RateLimitPlugin};

/// `audit`: `{ hooks?, includePayload? }`.
pub fn audit_plugin_factory() -> Arc<dyn PluginFactory> {
    plugin_factory(|config: AuditConfig| -> FactoryResult<Arc<dyn Plugin>> {
        Ok(Arc::new(AuditPlugin::new(config)))
    })
}

/// `rate-limit`: `{ maxToolCalls?, windowSecs? }`.
pub fn rate_limit_plugin_factory() -> Arc<dyn PluginFactory> {
    plugin_factory(|config: RateLimitConfig| -> FactoryResult<Arc<dyn Plugin>> {
        Ok(Arc::new(RateLimitPlugin::new(config)))
    })
}
