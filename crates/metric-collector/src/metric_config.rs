//! Metric identity and the loosely-typed configuration handed to plugins

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of scaling metric a value is reported as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricSourceType {
    External,
    Pods,
    Object,
}

impl fmt::Display for MetricSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricSourceType::External => "External",
            MetricSourceType::Pods => "Pods",
            MetricSourceType::Object => "Object",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricIdentifier {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
}

impl MetricIdentifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: None,
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.selector
            .get_or_insert_with(LabelSelector::default)
            .match_labels
            .insert(key.into(), value.into());
        self
    }
}

/// Reference to the workload being scaled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleTargetRef {
    pub kind: String,
    pub name: String,
    pub api_version: String,
}

/// The autoscaler a collector works on behalf of
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalingTarget {
    pub name: String,
    pub namespace: String,
    pub scale_target_ref: ScaleTargetRef,
}

impl AutoscalingTarget {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        scale_target_ref: ScaleTargetRef,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            scale_target_ref,
        }
    }
}

/// One logical metric: identity, source type tag, and raw string settings.
///
/// `config` is only read by the plugin that builds the collector; it never
/// travels past construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricConfig {
    #[serde(rename = "type")]
    pub metric_type: MetricSourceType,
    pub metric: MetricIdentifier,
    pub collector_type: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

impl MetricConfig {
    pub fn new(
        metric_type: MetricSourceType,
        metric: MetricIdentifier,
        collector_type: impl Into<String>,
    ) -> Self {
        Self {
            metric_type,
            metric,
            collector_type: collector_type.into(),
            config: BTreeMap::new(),
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_config_deserializes_from_yaml() {
        let raw = r#"
type: External
metric:
  name: queue-depth
  selector:
    matchLabels:
      identifier: queue-depth
collectorType: json-path
config:
  endpoint: http://stats:9090/metrics
  json-path: $.queue.depth
"#;
        let config: MetricConfig = serde_yaml::from_str(raw).unwrap();
        assert_eq!(config.metric_type, MetricSourceType::External);
        assert_eq!(config.collector_type, "json-path");
        assert_eq!(
            config.config.get("json-path").map(String::as_str),
            Some("$.queue.depth")
        );
        assert_eq!(
            config.metric,
            MetricIdentifier::new("queue-depth").with_label("identifier", "queue-depth")
        );
    }

    #[test]
    fn test_builder_helpers() {
        let config = MetricConfig::new(
            MetricSourceType::Pods,
            MetricIdentifier::new("rps"),
            "json-path",
        )
        .with_config("endpoint", "http://app:8080/stats");

        assert_eq!(config.config.len(), 1);
        assert!(config.metric.selector.is_none());
        assert_eq!(config.metric_type.to_string(), "Pods");
    }
}
