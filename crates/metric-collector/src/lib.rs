//! Metric collector - pluggable sources of scaling metric values
//!
//! A `PluginRegistry` maps source types to `CollectorPlugin`s. A plugin
//! validates a `MetricConfig` and builds a `Collector`; the caller then polls
//! `get_metrics` on its own schedule. The built-in `json-path` plugin fetches
//! a JSON document over HTTP, extracts numeric samples with a path expression
//! and reduces them to one exact `Quantity`.

pub mod aggregator;
pub mod collector;
pub mod config;
pub mod error;
pub mod http;
pub mod jsonpath;
pub mod metric_config;
pub mod quantity;
pub mod registry;

pub use aggregator::{aggregate, Aggregator};
pub use collector::{Collector, CollectorPlugin, MetricValue};
pub use config::{Config, MetricsFile};
pub use error::CollectorError;
pub use http::{EndpointSpec, HttpCollector, HttpCollectorPlugin};
pub use jsonpath::{extract, JsonPath};
pub use metric_config::{
    AutoscalingTarget, LabelSelector, MetricConfig, MetricIdentifier, MetricSourceType,
    ScaleTargetRef,
};
pub use quantity::Quantity;
pub use registry::PluginRegistry;
