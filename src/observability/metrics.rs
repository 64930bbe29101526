//! Prometheus export for the request-path metrics.
//!
//! Components record through the `metrics` facade unconditionally. Without an
//! installed recorder those calls are no-ops.

use crate::config::MetricsSettings;
use crate::{Error, Result};
use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default exporter port.
pub const DEFAULT_METRICS_PORT: u16 = 9464;

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are recorded at all.
    pub enabled: bool,
    /// Scrape endpoint address.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: scrape_addr(DEFAULT_METRICS_PORT),
        }
    }
}

impl MetricsConfig {
    /// Builds metrics configuration from environment variables only.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_settings(None)
    }

    /// Builds metrics configuration from config settings with env overrides.
    #[must_use]
    pub fn from_settings(settings: Option<&MetricsSettings>) -> Self {
        let mut config = Self::default();
        if let Some(settings) = settings {
            config.enabled = settings.enabled.unwrap_or(config.enabled);
            if let Some(port) = settings.port {
                config.listen_addr = scrape_addr(port);
            }
        }

        if let Ok(value) = std::env::var("SIGHTLINE_METRICS_ENABLED") {
            config.enabled = matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(port) = crate::config::env_parse::<u16>("SIGHTLINE_METRICS_PORT") {
            config.listen_addr = scrape_addr(port);
        }
        config
    }
}

fn scrape_addr(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)
}

/// Handle to the installed Prometheus recorder.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    prometheus: PrometheusHandle,
}

impl MetricsHandle {
    /// Renders all metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.prometheus.render()
    }
}

/// Installs the global Prometheus recorder.
///
/// With `expose` set the scrape endpoint is served on `listen_addr`; this
/// requires a running tokio runtime. Otherwise metrics are only available
/// through [`MetricsHandle::render`].
///
/// # Errors
///
/// Returns an error if a global recorder is already installed, if `expose`
/// is set outside a runtime, or if the listener cannot be bound.
pub fn install_prometheus(config: &MetricsConfig, expose: bool) -> Result<Option<MetricsHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    let install_failed = |e: &dyn std::fmt::Display| Error::OperationFailed {
        operation: "metrics_recorder_install".to_string(),
        cause: e.to_string(),
    };

    let prometheus = if expose {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| install_failed(&e))?;
        let _guard = runtime.enter();
        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(config.listen_addr)
            .build()
            .map_err(|e| install_failed(&e))?;
        let handle = recorder.handle();
        metrics::set_global_recorder(recorder).map_err(|e| install_failed(&e))?;
        runtime.spawn(exporter);
        handle
    } else {
        PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| install_failed(&e))?
    };

    describe_metrics();
    tracing::debug!(addr = %config.listen_addr, expose, "Metrics recorder installed");
    Ok(Some(MetricsHandle { prometheus }))
}

/// Registers help text for every metric the crate records.
pub fn describe_metrics() {
    describe_counter!("router_decisions_total", "Routing decisions by pipeline and path");
    describe_histogram!("router_latency_us", Unit::Microseconds, "Time to route one utterance");

    describe_counter!("tier_requests_total", "Cascade outcomes by status");
    describe_counter!("tier_attempts_total", "Tier attempts by tier and outcome");
    describe_counter!("tier_retries_total", "Transport retries within one tier");
    describe_counter!("tier_last_resort_total", "Requests that fell through to a degraded tier");
    describe_counter!("tier_transitions_total", "Tier health changes");
    describe_counter!("tier_probes_total", "Health probes by tier and result");
    describe_gauge!("tier_degraded", "1 while a tier is exhausted or failed");
    describe_histogram!(
        "tier_attempt_duration_ms",
        Unit::Milliseconds,
        "Duration of a single tier attempt"
    );

    describe_counter!("worker_jobs_submitted_total", "Deep analysis jobs submitted");
    describe_counter!("worker_jobs_total", "Deep analysis jobs by final status");

    describe_counter!("aggregator_merges_total", "Detection merges performed");
    describe_counter!("aggregator_dropped_total", "Detection records dropped as invalid");
    describe_histogram!("aggregator_output_size", "Records in a merged detection set");

    describe_gauge!("vocabulary_size", "Phrases in the active vocabulary");
    describe_counter!("vocabulary_learned_total", "Phrases added by origin");
    describe_counter!("vocabulary_extraction_failures_total", "Failed phrase extractions");
    describe_counter!("vocabulary_persist_failures_total", "Failed vocabulary writes");
    describe_counter!("vocabulary_persist_over_budget_total", "Vocabulary writes over budget");
    describe_histogram!(
        "vocabulary_persist_duration_ms",
        Unit::Milliseconds,
        "Time to write the vocabulary store"
    );
    describe_counter!("vocabulary_detector_push_failures_total", "Failed detector reconfigurations");

    describe_counter!("detector_failures_total", "Detector errors by detector");
    describe_counter!("perception_capture_failures_total", "Frame capture errors");
    describe_counter!("event_bus_publish_total", "Telemetry events published");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registry_smoke() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            describe_metrics();
            metrics::counter!("router_decisions_total", "pipeline" => "fast").increment(1);
        });
        let rendered = handle.render();
        assert!(rendered.contains("router_decisions_total"));
        assert!(rendered.contains("# HELP router_decisions_total"));
    }

    #[test]
    fn test_disabled_installs_nothing() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert!(install_prometheus(&config, false).unwrap().is_none());
    }
}
