//! HTTP/JSON-path collector
//!
//! Fetches a JSON document from a fixed endpoint, extracts numeric samples
//! with a path expression and reduces them with the configured aggregator.

use crate::aggregator::Aggregator;
use crate::collector::{Collector, CollectorPlugin, MetricValue};
use crate::error::{CollectorError, Result};
use crate::jsonpath::{self, JsonPath};
use crate::metric_config::{AutoscalingTarget, MetricConfig, MetricIdentifier, MetricSourceType};
use crate::quantity::Quantity;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Url;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

pub const COLLECTOR_TYPE: &str = "json-path";

pub const ENDPOINT_KEY: &str = "endpoint";
pub const JSON_PATH_KEY: &str = "json-path";
pub const AGGREGATOR_KEY: &str = "aggregator";
pub const TIMEOUT_KEY: &str = "timeout";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Validated settings for one HTTP collector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSpec {
    pub url: Url,
    pub json_path: JsonPath,
    pub aggregator: Aggregator,
    pub timeout: Duration,
    pub interval: Duration,
}

impl EndpointSpec {
    /// Validate the raw string settings of a metric config
    pub fn from_config(config: &BTreeMap<String, String>, interval: Duration) -> Result<Self> {
        let url = parse_endpoint(required(config, ENDPOINT_KEY)?)?;

        let json_path = JsonPath::parse(required(config, JSON_PATH_KEY)?)
            .map_err(|message| CollectorError::invalid_config(JSON_PATH_KEY, message))?;

        let aggregator = match config.get(AGGREGATOR_KEY) {
            Some(name) => name.parse()?,
            None => Aggregator::default(),
        };

        let timeout = match config.get(TIMEOUT_KEY) {
            Some(raw) => {
                let timeout = humantime::parse_duration(raw.trim())
                    .map_err(|e| CollectorError::invalid_config(TIMEOUT_KEY, e.to_string()))?;
                if timeout.is_zero() {
                    return Err(CollectorError::invalid_config(
                        TIMEOUT_KEY,
                        "timeout must be greater than zero",
                    ));
                }
                timeout
            }
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            url,
            json_path,
            aggregator,
            timeout,
            interval,
        })
    }
}

fn required<'a>(config: &'a BTreeMap<String, String>, key: &str) -> Result<&'a str> {
    match config.get(key).map(|v| v.trim()) {
        Some(value) if !value.is_empty() => Ok(value),
        Some(_) => Err(CollectorError::invalid_config(key, "value must not be empty")),
        None => Err(CollectorError::invalid_config(key, "required key is missing")),
    }
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| {
        CollectorError::invalid_config(ENDPOINT_KEY, format!("invalid URL '{}': {}", raw, e))
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(CollectorError::invalid_config(
            ENDPOINT_KEY,
            format!("unsupported scheme '{}', expected http or https", other),
        )),
    }
}

struct CachedFetch {
    fetched_at: Instant,
    metrics: Vec<MetricValue>,
}

/// Collector that polls one JSON endpoint
pub struct HttpCollector {
    client: reqwest::Client,
    spec: EndpointSpec,
    metric_type: MetricSourceType,
    namespace: String,
    metric: MetricIdentifier,
    // Held across the fetch so concurrent callers share one request
    last_fetch: Mutex<Option<CachedFetch>>,
}

impl HttpCollector {
    pub fn new(
        client: reqwest::Client,
        target: &AutoscalingTarget,
        config: &MetricConfig,
        spec: EndpointSpec,
    ) -> Self {
        Self {
            client,
            spec,
            metric_type: config.metric_type,
            namespace: target.namespace.clone(),
            metric: config.metric.clone(),
            last_fetch: Mutex::new(None),
        }
    }

    async fn fetch_value(&self) -> Result<Quantity> {
        let url = self.spec.url.as_str();
        debug!(
            metric = %self.metric.name,
            url = %url,
            aggregator = %self.spec.aggregator,
            "Fetching metric source"
        );

        let response = self
            .client
            .get(self.spec.url.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .timeout(self.spec.timeout)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::SourceUnavailable {
                url: url.to_string(),
                status: Some(status.as_u16()),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.request_error(e))?;

        let document: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| CollectorError::MalformedResponse {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let samples = jsonpath::extract(&document, &self.spec.json_path)?;
        let value = self.spec.aggregator.aggregate(&samples)?;

        debug!(
            metric = %self.metric.name,
            samples = samples.len(),
            value = %value,
            "Collected metric value"
        );
        Ok(value)
    }

    fn request_error(&self, e: reqwest::Error) -> CollectorError {
        let message = if e.is_timeout() {
            format!("request timed out after {:?}", self.spec.timeout)
        } else {
            e.to_string()
        };
        CollectorError::SourceUnavailable {
            url: self.spec.url.to_string(),
            status: e.status().map(|s| s.as_u16()),
            message,
        }
    }
}

#[async_trait]
impl Collector for HttpCollector {
    async fn get_metrics(&self) -> Result<Vec<MetricValue>> {
        let mut last_fetch = self.last_fetch.lock().await;

        if let Some(cached) = last_fetch.as_ref() {
            if cached.fetched_at.elapsed() < self.spec.interval {
                debug!(metric = %self.metric.name, "Returning cached metric value");
                return Ok(cached.metrics.clone());
            }
        }

        let value = self.fetch_value().await?;
        let metrics = vec![MetricValue {
            metric_type: self.metric_type,
            namespace: self.namespace.clone(),
            metric: self.metric.clone(),
            value,
            timestamp: Utc::now(),
        }];

        *last_fetch = if self.spec.interval.is_zero() {
            None
        } else {
            Some(CachedFetch {
                fetched_at: Instant::now(),
                metrics: metrics.clone(),
            })
        };

        Ok(metrics)
    }

    fn interval(&self) -> Duration {
        self.spec.interval
    }
}

/// Builds `HttpCollector`s that share one connection pool
#[derive(Clone)]
pub struct HttpCollectorPlugin {
    client: reqwest::Client,
}

impl HttpCollectorPlugin {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(concat!("demon-metric-collector/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CollectorError::ClientBuild {
                message: e.to_string(),
            })?;

        Ok(Self::with_client(client))
    }

    /// Use a caller-provided client, e.g. one shared with other subsystems
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl CollectorPlugin for HttpCollectorPlugin {
    fn new_collector(
        &self,
        target: &AutoscalingTarget,
        config: &MetricConfig,
        interval: Duration,
    ) -> Result<Box<dyn Collector>> {
        let spec = EndpointSpec::from_config(&config.config, interval)?;
        debug!(
            target = %target.name,
            namespace = %target.namespace,
            metric = %config.metric.name,
            url = %spec.url,
            json_path = %spec.json_path,
            "Built HTTP collector"
        );
        Ok(Box::new(HttpCollector::new(
            self.client.clone(),
            target,
            config,
            spec,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn invalid_key(err: CollectorError) -> String {
        match err {
            CollectorError::InvalidConfig { key, .. } => key,
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_spec_defaults() {
        let spec = EndpointSpec::from_config(
            &settings(&[
                (ENDPOINT_KEY, "http://stats:9090/metrics"),
                (JSON_PATH_KEY, "$.values"),
            ]),
            Duration::from_secs(30),
        )
        .unwrap();

        assert_eq!(spec.aggregator, Aggregator::Sum);
        assert_eq!(spec.timeout, DEFAULT_TIMEOUT);
        assert_eq!(spec.interval, Duration::from_secs(30));
        assert_eq!(spec.url.as_str(), "http://stats:9090/metrics");
        assert_eq!(spec.json_path.to_string(), "$.values");
    }

    #[test]
    fn test_spec_explicit_settings() {
        let spec = EndpointSpec::from_config(
            &settings(&[
                (ENDPOINT_KEY, "https://stats/metrics"),
                (JSON_PATH_KEY, "$.shards[*].lag"),
                (AGGREGATOR_KEY, "average"),
                (TIMEOUT_KEY, "750ms"),
            ]),
            Duration::ZERO,
        )
        .unwrap();

        assert_eq!(spec.aggregator, Aggregator::Avg);
        assert_eq!(spec.timeout, Duration::from_millis(750));
    }

    #[test]
    fn test_missing_required_keys() {
        let err = EndpointSpec::from_config(
            &settings(&[(JSON_PATH_KEY, "$.values")]),
            Duration::ZERO,
        )
        .unwrap_err();
        assert_eq!(invalid_key(err), ENDPOINT_KEY);

        let err = EndpointSpec::from_config(
            &settings(&[(ENDPOINT_KEY, "http://stats/metrics")]),
            Duration::ZERO,
        )
        .unwrap_err();
        assert_eq!(invalid_key(err), JSON_PATH_KEY);

        let err = EndpointSpec::from_config(
            &settings(&[(ENDPOINT_KEY, "  "), (JSON_PATH_KEY, "$.values")]),
            Duration::ZERO,
        )
        .unwrap_err();
        assert_eq!(invalid_key(err), ENDPOINT_KEY);
    }

    #[test]
    fn test_malformed_values() {
        let cases = [
            (
                settings(&[(ENDPOINT_KEY, "not a url"), (JSON_PATH_KEY, "$.v")]),
                ENDPOINT_KEY,
            ),
            (
                settings(&[(ENDPOINT_KEY, "ftp://stats/metrics"), (JSON_PATH_KEY, "$.v")]),
                ENDPOINT_KEY,
            ),
            (
                settings(&[(ENDPOINT_KEY, "http://stats"), (JSON_PATH_KEY, "$..v")]),
                JSON_PATH_KEY,
            ),
            (
                settings(&[
                    (ENDPOINT_KEY, "http://stats"),
                    (JSON_PATH_KEY, "$.v"),
                    (TIMEOUT_KEY, "soon"),
                ]),
                TIMEOUT_KEY,
            ),
            (
                settings(&[
                    (ENDPOINT_KEY, "http://stats"),
                    (JSON_PATH_KEY, "$.v"),
                    (TIMEOUT_KEY, "0s"),
                ]),
                TIMEOUT_KEY,
            ),
        ];

        for (config, key) in cases {
            let err = EndpointSpec::from_config(&config, Duration::ZERO).unwrap_err();
            assert_eq!(invalid_key(err), key);
        }
    }

    #[test]
    fn test_unknown_aggregator_fails_construction() {
        let err = EndpointSpec::from_config(
            &settings(&[
                (ENDPOINT_KEY, "http://stats/metrics"),
                (JSON_PATH_KEY, "$.values"),
                (AGGREGATOR_KEY, "median"),
            ]),
            Duration::ZERO,
        )
        .unwrap_err();
        assert_eq!(
            err,
            CollectorError::UnsupportedAggregator {
                name: "median".to_string()
            }
        );
    }

    #[test]
    fn test_plugin_creation() {
        assert!(HttpCollectorPlugin::new().is_ok());
    }
}
