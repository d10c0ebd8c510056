//! Telemetry setup for the steward.
//!
//! This module centralizes configuration and initialization of observability:
//!
//! * Reading the metrics exporter settings from environment variables into
//!   [`TelemetryConfig`].
//! * Setting up logging/tracing via `tracing-subscriber`.
//! * Installing the Prometheus metrics exporter when configured.
//!
//! Call [`initialize_tracing`] once at startup to configure tracing and
//! metrics.

use std::net::SocketAddr;

use eyre::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Configuration for telemetry (tracing + metrics) of the service.
///
/// Typically constructed from environment variables via
/// [`TelemetryConfig::try_from_env`] and passed to [`initialize_tracing`]
/// during startup.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Metrics exporter, if any.
    pub metrics: Option<PrometheusMetricsConfig>,
}

impl TelemetryConfig {
    /// Build a [`TelemetryConfig`] from environment variables.
    ///
    /// Reads `METRICS_EXPORTER` to decide whether a metrics exporter is
    /// installed; the only supported backend is `prometheus`.
    pub fn try_from_env() -> eyre::Result<Self> {
        let metrics = match std::env::var("METRICS_EXPORTER") {
            Ok(choice) => match choice.trim().to_lowercase().as_str() {
                "prometheus" => Some(
                    PrometheusMetricsConfig::try_from_env()
                        .context("during constructing Prometheus metrics exporter from environment")?,
                ),
                _ => eyre::bail!(
                    "environment: METRICS_EXPORTER must be \"prometheus\", not \"{}\"",
                    choice
                ),
            },
            Err(std::env::VarError::NotPresent) => None,
            Err(e) => {
                eyre::bail!("Failed to read METRICS_EXPORTER from environment: {}", e);
            }
        };
        Ok(Self { metrics })
    }
}

/// Prometheus scrape metrics exporter configuration (the service exposes
/// metrics over HTTP).
#[derive(Debug, Clone)]
pub struct PrometheusMetricsConfig {
    pub(crate) bind_addr: Option<SocketAddr>,
}

impl PrometheusMetricsConfig {
    /// Build a [`PrometheusMetricsConfig`] from environment variable
    /// `METRICS_PROMETHEUS_BIND_ADDR` (optional).
    pub fn try_from_env() -> eyre::Result<Self> {
        match std::env::var("METRICS_PROMETHEUS_BIND_ADDR") {
            Ok(bind_addr) => Ok(PrometheusMetricsConfig {
                bind_addr: Some(
                    bind_addr
                        .parse()
                        .context("during reading METRICS_PROMETHEUS_BIND_ADDR from environment")?,
                ),
            }),
            Err(std::env::VarError::NotPresent) => Ok(PrometheusMetricsConfig { bind_addr: None }),
            Err(e) => {
                eyre::bail!(
                    "Failed to read METRICS_PROMETHEUS_BIND_ADDR from environment: {}",
                    e
                );
            }
        }
    }
}

/// Initialize the metrics exporter according to [`PrometheusMetricsConfig`].
///
/// Called internally by [`initialize_tracing`] once configuration is loaded.
pub fn initialize_metrics(config: &PrometheusMetricsConfig) -> eyre::Result<()> {
    tracing::debug!("Setting up Prometheus scrape metrics exporter ..");
    let builder = if let Some(bind_addr) = config.bind_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(bind_addr)
    } else {
        metrics_exporter_prometheus::PrometheusBuilder::new()
    };
    builder
        .install()
        .context("during installing Prometheus scrape metrics exporter as global recorder")?;
    Ok(())
}

/// Initializes structured logging/tracing for the service.
///
/// Installs a `tracing-subscriber` registry with human-readable formatting
/// and an environment-based filter. If the configuration also contains
/// metrics settings, [`initialize_metrics`] is called automatically.
///
/// This is intended as a one-time setup call during service startup.
pub fn initialize_tracing(config: &TelemetryConfig) -> eyre::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_line_number(false),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "steward_service=trace,warn".into()),
        )
        .init();

    if let Some(metrics_conf) = &config.metrics {
        initialize_metrics(metrics_conf)?;
    }

    Ok(())
}
