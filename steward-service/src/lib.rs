#![deny(missing_docs)]
//! Epoch-based key rotation service for a blind-token issuance server.
//!
//! The steward provisions and rotates the monthly key material of a token
//! server without restarting it. It loads a per-epoch secrets bundle once at
//! startup, renders the current epoch's signing key, commitment, and a
//! two-epoch redemption key file to disk, and instructs the token server to
//! hot-swap its active key set whenever the calendar month (UTC) rolls over.
//!
//! The main entry point is [`start`]. It expects:
//! - a [`SecretsProviderService`], the startup-time source of the bundle, and
//! - a [`TokenServerService`], the serving component's hot-reload entry
//!   point.
//!
//! Projects embedding the steward next to an in-process token server
//! implement [`TokenServer`] themselves; the bundled binary uses
//! [`PemFileTokenServer`] for out-of-process deployments. The general
//! workflow is:
//!
//! 1) `start` loads the bundle and performs the mandatory initial key load
//!    for the current epoch. Failure here is returned to the caller; the
//!    process must not begin serving without valid key material.
//! 2) A single background task polls the clock (default every minute) and
//!    cycles keys exactly when the epoch changes. Reload failures are logged
//!    and retried on the next poll; the token server keeps serving the
//!    previous, fully-valid key set in the meantime.
//! 3) A small axum surface serves health probes, the build version, and the
//!    current epoch's commitment.

use std::future::Future;
use std::sync::Arc;

use eyre::Context as _;
use tokio_util::sync::CancellationToken;

use crate::config::StewardConfig;
use crate::services::key_materializer::KeyMaterializer;
use crate::services::reload::ReloadCoordinator;
use crate::services::rotation_watcher::rotation_watcher_task;
use crate::services::secrets_store::SecretsStore;
use steward_types::EpochId;

pub(crate) mod api;
pub mod config;
pub mod metrics;
pub mod telemetry;
pub(crate) mod services;

pub use services::{
    key_materializer, reload, rotation_watcher, secrets_provider, secrets_store, token_server,
};
pub use services::secrets_provider::{
    EnvSecretsProvider, FileSecretsProvider, SecretsProvider, SecretsProviderService,
};
pub use services::token_server::{PemFileTokenServer, TokenServer, TokenServerService};

/// Shared state of the axum handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<SecretsStore>,
}

/// Starts the steward: loads the secrets bundle, performs the mandatory
/// initial key load, spawns the rotation watcher, and serves the HTTP
/// surface until `shutdown_signal` resolves.
///
/// Any initialization failure is returned to the caller; the caller alone
/// decides whether to exit the process.
pub async fn start(
    config: StewardConfig,
    secrets_provider: SecretsProviderService,
    token_server: TokenServerService,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> eyre::Result<()> {
    tracing::info!("starting token steward with config: {config:#?}");

    let bundle = secrets_provider
        .load_bundle()
        .await
        .context("while loading secrets bundle")?;
    let store = Arc::new(SecretsStore::new(bundle));
    let materializer = KeyMaterializer::new(Arc::clone(&store), config.artifact_paths());
    let coordinator = ReloadCoordinator::new(materializer, token_server, config.reload_timeout);

    // The process must not begin serving without valid key material for the
    // current epoch.
    let initial_epoch = EpochId::current();
    tracing::info!("performing initial key load for epoch {initial_epoch}..");
    coordinator
        .reload(initial_epoch)
        .await
        .context("while performing the initial key load")?;

    let cancellation_token = spawn_shutdown_task(shutdown_signal);

    tracing::info!(
        "spawning rotation watcher with poll interval {}",
        humantime::format_duration(config.poll_interval)
    );
    let rotation_watcher = tokio::spawn(rotation_watcher_task(
        EpochId::current,
        coordinator,
        config.poll_interval,
        initial_epoch,
        cancellation_token.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .context("while binding tcp listener")?;
    let router = api::routes(AppState { store });
    tracing::info!(
        "starting axum server on {}",
        listener
            .local_addr()
            .map(|x| x.to_string())
            .unwrap_or(String::from("invalid addr"))
    );
    let axum_result = axum::serve(listener, router)
        .with_graceful_shutdown({
            let cancellation_token = cancellation_token.clone();
            async move { cancellation_token.cancelled().await }
        })
        .await;
    tracing::info!("axum server shutdown");
    if let Err(err) = axum_result {
        tracing::error!("got error from axum: {err:?}");
    }

    cancellation_token.cancel();
    rotation_watcher
        .await
        .context("while joining rotation watcher")??;
    Ok(())
}

fn spawn_shutdown_task(
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> CancellationToken {
    let cancellation_token = CancellationToken::new();
    let task_token = cancellation_token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown_signal => {
                tracing::info!("Received EXTERNAL shutdown");
                task_token.cancel();
            }
            _ = task_token.cancelled() => {
                tracing::info!("Received INTERNAL shutdown");
            }
        }
    });
    cancellation_token
}

/// The default shutdown signal for the steward. Triggered when pressing
/// CTRL+C on most systems.
pub async fn default_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Returns cargo package name, cargo package version, and the git hash of
/// the repository that was used to build the binary.
pub fn version_info() -> String {
    format!(
        "{} {} ({})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        option_env!("GIT_HASH").unwrap_or(git_version::git_version!(fallback = "UNKNOWN"))
    )
}
