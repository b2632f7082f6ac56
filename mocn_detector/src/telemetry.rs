use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Deserialize;
use std::net::SocketAddr;

const TICKS: &str = "mocn_ticks";
const OBSERVATIONS_RECORDED: &str = "mocn_observations_recorded";
const MOCN_DETECTED: &str = "mocn_detected";
const INSERT_FAILURES: &str = "mocn_insert_failures";
const REFRESH_INTERVAL: &str = "mocn_refresh_interval_seconds";

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Scrape endpoint for metrics
    #[serde(default = "default_metrics_endpoint")]
    pub endpoint: SocketAddr,
}

fn default_metrics_endpoint() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 19000))
}

/// Install the Prometheus scrape endpoint
pub fn start_metrics(settings: &Settings) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(settings.endpoint)
        .install()?;
    tracing::info!(endpoint = %settings.endpoint, "metrics scrape endpoint listening");
    Ok(())
}

pub fn tick() {
    metrics::counter!(TICKS).increment(1);
}

pub fn observation_recorded(is_mocn_detected: bool) {
    metrics::counter!(OBSERVATIONS_RECORDED).increment(1);
    if is_mocn_detected {
        metrics::counter!(MOCN_DETECTED).increment(1);
    }
}

pub fn insert_failed() {
    metrics::counter!(INSERT_FAILURES).increment(1);
}

pub fn refresh_interval(seconds: u32) {
    metrics::gauge!(REFRESH_INTERVAL).set(seconds as f64);
}
