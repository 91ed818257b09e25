//! Collector and plugin traits
//!
//! A plugin validates a `MetricConfig` once and builds a collector bound to it.
//! The caller then invokes `get_metrics` on its own schedule.

use crate::error::Result;
use crate::metric_config::{AutoscalingTarget, MetricConfig, MetricIdentifier, MetricSourceType};
use crate::quantity::Quantity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One collected value, owned by the caller once returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricValue {
    pub metric_type: MetricSourceType,
    pub namespace: String,
    pub metric: MetricIdentifier,
    pub value: Quantity,
    pub timestamp: DateTime<Utc>,
}

/// A source of metric values bound to one (target, metric) pair
#[async_trait]
pub trait Collector: Send + Sync {
    /// Fetch the current value(s); a fetch either fully succeeds or fails
    async fn get_metrics(&self) -> Result<Vec<MetricValue>>;

    /// Staleness window supplied at construction
    fn interval(&self) -> Duration;
}

/// Factory for one source type
pub trait CollectorPlugin: Send + Sync {
    fn new_collector(
        &self,
        target: &AutoscalingTarget,
        config: &MetricConfig,
        interval: Duration,
    ) -> Result<Box<dyn Collector>>;
}
