//! Metric collector binary - builds collectors from a metrics file and polls them

use metric_collector::config::BoundCollector;
use metric_collector::{Config, MetricsFile, PluginRegistry};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration
    let config = Config::parse_config();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting Demon Metric Collector");
    info!("Configuration:");
    info!("  Metrics file: {}", config.metrics_file.display());
    info!("  Default interval: {:?}", config.default_interval);
    info!("  Poll once: {}", config.poll_once);

    let registry = PluginRegistry::with_defaults()?;
    info!("Registered collector types: {:?}", registry.source_types());

    let metrics_file = MetricsFile::load(&config.metrics_file)?;
    let collectors = metrics_file.build_collectors(&registry, config.default_interval)?;
    info!("Built {} collector(s)", collectors.len());

    if config.poll_once {
        return poll_once(collectors).await;
    }

    let mut tasks = Vec::with_capacity(collectors.len());
    for bound in collectors {
        tasks.push(tokio::spawn(poll_forever(bound, config.default_interval)));
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping collectors");
    for task in tasks {
        task.abort();
    }
    Ok(())
}

/// Fetch every metric once; fails if any fetch failed
async fn poll_once(collectors: Vec<BoundCollector>) -> anyhow::Result<()> {
    let mut failures = 0;

    for bound in &collectors {
        match bound.collector.get_metrics().await {
            Ok(values) => {
                for value in values {
                    println!(
                        "{}\t{}\t{}\t{}",
                        bound.target, bound.metric, value.value, value.timestamp
                    );
                }
            }
            Err(e) => {
                failures += 1;
                error!(target_ref = %bound.target, metric = %bound.metric, error = %e, "Fetch failed");
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} metric fetch(es) failed", failures, collectors.len());
    }
    Ok(())
}

/// Poll one collector on its interval until the task is aborted
async fn poll_forever(bound: BoundCollector, default_interval: Duration) {
    let interval = match bound.collector.interval() {
        d if d.is_zero() => default_interval,
        d => d,
    };
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;

        match bound.collector.get_metrics().await {
            Ok(values) => {
                for value in values {
                    info!(
                        target_ref = %bound.target,
                        metric = %bound.metric,
                        value = %value.value,
                        metric_type = %value.metric_type,
                        "Collected metric"
                    );
                }
            }
            Err(e) if e.is_fetch_error() => {
                warn!(
                    target_ref = %bound.target,
                    metric = %bound.metric,
                    error = %e,
                    "Metric fetch failed, will retry next interval"
                );
            }
            Err(e) => {
                error!(
                    target_ref = %bound.target,
                    metric = %bound.metric,
                    error = %e,
                    "Collector misconfigured, stopping"
                );
                return;
            }
        }
    }
}
