//! Configuration for the metric collector binary
//!
//! Command-line flags (with environment fallbacks) select a YAML file that
//! lists autoscaling targets and the metrics collected for each.

use crate::collector::Collector;
use crate::metric_config::{AutoscalingTarget, MetricConfig};
use crate::registry::PluginRegistry;
use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the metric collector binary
#[derive(Debug, Clone, Parser)]
#[command(name = "demon-metric-collector")]
#[command(about = "Polls metric sources and reports the aggregated value of each metric")]
pub struct Config {
    /// YAML file describing targets and their metrics
    #[arg(long, env)]
    pub metrics_file: PathBuf,

    /// Refresh interval for metrics that do not set their own
    #[arg(long, env, default_value = "30s", value_parser = parse_poll_interval)]
    pub default_interval: Duration,

    /// Fetch every metric once, print the results and exit
    #[arg(long = "once", env = "POLL_ONCE")]
    pub poll_once: bool,

    /// Output logs in JSON format
    #[arg(long, env)]
    pub log_json: bool,
}

/// Poll periods must be non-zero; a zero tick would never yield
fn parse_poll_interval(raw: &str) -> std::result::Result<Duration, String> {
    let interval = humantime::parse_duration(raw.trim()).map_err(|e| e.to_string())?;
    if interval.is_zero() {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(interval)
}

impl Config {
    /// Parse configuration from command-line args and environment variables
    pub fn parse_config() -> Self {
        Config::parse()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsFile {
    pub targets: Vec<TargetMetrics>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetMetrics {
    #[serde(flatten)]
    pub target: AutoscalingTarget,
    #[serde(default)]
    pub metrics: Vec<MetricEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricEntry {
    #[serde(flatten)]
    pub config: MetricConfig,
    /// Humantime duration, e.g. `15s`
    #[serde(default)]
    pub interval: Option<String>,
}

impl MetricEntry {
    pub fn interval(&self, default: Duration) -> Result<Duration> {
        match &self.interval {
            Some(raw) => humantime::parse_duration(raw.trim()).with_context(|| {
                format!(
                    "Invalid interval '{}' for metric {}",
                    raw, self.config.metric.name
                )
            }),
            None => Ok(default),
        }
    }
}

/// A collector together with the names used when reporting it
pub struct BoundCollector {
    pub target: String,
    pub metric: String,
    pub collector: Box<dyn Collector>,
}

impl MetricsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read metrics file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse metrics file {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Build every collector up front so configuration errors stop start-up
    pub fn build_collectors(
        &self,
        registry: &PluginRegistry,
        default_interval: Duration,
    ) -> Result<Vec<BoundCollector>> {
        let mut collectors = Vec::new();

        for entry in &self.targets {
            let target = &entry.target;
            for metric in &entry.metrics {
                let interval = metric.interval(default_interval)?;
                let collector = registry
                    .new_collector(target, &metric.config, interval)
                    .with_context(|| {
                        format!(
                            "Failed to build collector for {}/{} metric {}",
                            target.namespace, target.name, metric.config.metric.name
                        )
                    })?;

                collectors.push(BoundCollector {
                    target: format!("{}/{}", target.namespace, target.name),
                    metric: metric.config.metric.name.clone(),
                    collector,
                });
            }
        }

        Ok(collectors)
    }
}
