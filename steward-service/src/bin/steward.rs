//! Token Steward Binary
//!
//! This is the main entry point for the steward service. It initializes
//! tracing and metrics, and starts the service with configuration from
//! command-line arguments or environment variables.

use std::{process::ExitCode, sync::Arc};

use clap::Parser as _;
use steward_service::{
    EnvSecretsProvider, FileSecretsProvider, PemFileTokenServer, SecretsProviderService,
    config::StewardConfig,
};

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    let telemetry_config = steward_service::telemetry::TelemetryConfig::try_from_env()?;
    steward_service::telemetry::initialize_tracing(&telemetry_config)?;
    steward_service::metrics::describe_metrics();
    tracing::info!("{}", steward_service::version_info());

    let config = StewardConfig::parse();
    let secrets_provider: SecretsProviderService = match &config.secrets_file {
        Some(path) => Arc::new(FileSecretsProvider::new(path.clone(), config.environment)),
        None => Arc::new(EnvSecretsProvider::new(&config.secrets_var)),
    };
    let token_server = Arc::new(PemFileTokenServer);

    let result = steward_service::start(
        config,
        secrets_provider,
        token_server,
        steward_service::default_shutdown_signal(),
    )
    .await;
    match result {
        Ok(()) => {
            tracing::info!("good night!");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            // we don't want to double print the error therefore we just return FAILURE
            tracing::error!("{err:?}");
            Ok(ExitCode::FAILURE)
        }
    }
}
