//! Logger forwarding to `tracing`.
//!
//! Records below the configured level are dropped here, before the
//! subscriber's own filter sees them.

use capstan_core::{LogLevel, Logger};
use capstan_resolver::{FactoryResult, LoggerFactory, logger_factory};
use serde::Deserialize;
use std::sync::Arc;

pub const DEFAULT_COMPONENT: &str = "agent";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TracingLoggerConfig {
    #[serde(default)]
    pub level: Option<LogLevel>,
    #[serde(default)]
    pub component: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TracingLogger {
    level: LogLevel,
    component: Arc<str>,
}

impl TracingLogger {
    pub fn new(level: LogLevel, component: impl Into<Arc<str>>) -> Self {
        Self {
            level,
            component: component.into(),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new(LogLevel::default(), DEFAULT_COMPONENT)
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        if !self.enabled(level) {
            return;
        }
        let component = &*self.component;
        match level {
            LogLevel::Trace => tracing::trace!(component, "{message}"),
            LogLevel::Debug => tracing::debug!(component, "{message}"),
            LogLevel::Info => tracing::info!(component, "{message}"),
            LogLevel::Warn => tracing::warn!(component, "{message}"),
            LogLevel::Error => tracing::error!(component, "{message}"),
        }
    }

    fn level(&self) -> LogLevel {
        self.level
    }

    fn child(&self, component: &str) -> Arc<dyn Logger> {
        Arc::new(Self::new(
            self.level,
            format!("{}.{component}", self.component),
        ))
    }
}

/// Logger factory: `{ level?, component? }`.
pub fn tracing_logger_factory() -> Arc<dyn LoggerFactory> {
    logger_factory(|config: TracingLoggerConfig| -> FactoryResult<Arc<dyn Logger>> {
        Ok(Arc::new(TracingLogger::new(
            config.level.unwrap_or_default(),
            config.component.unwrap_or_else(|| DEFAULT_COMPONENT.to_string()),
        )))
    })
}
