//! Source-type → plugin lookup
//!
//! Populate a registry at start-up, then share it behind an `Arc`; lookups
//! take `&self` and need no locking.

use crate::collector::{Collector, CollectorPlugin};
use crate::error::{CollectorError, Result};
use crate::http::{self, HttpCollectorPlugin};
use crate::metric_config::{AutoscalingTarget, MetricConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn CollectorPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in plugin registered
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(http::COLLECTOR_TYPE, Arc::new(HttpCollectorPlugin::new()?));
        Ok(registry)
    }

    /// Register `plugin` for `source_type`, returning any plugin it replaces
    pub fn register(
        &mut self,
        source_type: impl Into<String>,
        plugin: Arc<dyn CollectorPlugin>,
    ) -> Option<Arc<dyn CollectorPlugin>> {
        let source_type = source_type.into();
        debug!(source_type = %source_type, "Registering collector plugin");

        let previous = self.plugins.insert(source_type.clone(), plugin);
        if previous.is_some() {
            warn!(source_type = %source_type, "Replaced existing collector plugin");
        }
        previous
    }

    pub fn resolve(&self, source_type: &str) -> Result<Arc<dyn CollectorPlugin>> {
        self.plugins
            .get(source_type)
            .cloned()
            .ok_or_else(|| CollectorError::UnknownSourceType {
                source_type: source_type.to_string(),
            })
    }

    /// Resolve the plugin named by `config.collector_type` and build a collector
    pub fn new_collector(
        &self,
        target: &AutoscalingTarget,
        config: &MetricConfig,
        interval: Duration,
    ) -> Result<Box<dyn Collector>> {
        self.resolve(&config.collector_type)?
            .new_collector(target, config, interval)
    }

    pub fn source_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}
