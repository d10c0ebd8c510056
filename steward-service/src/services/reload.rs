//! One all-or-nothing key reload.
//!
//! [`ReloadCoordinator::reload`] materializes and persists an epoch's
//! artifacts, then instructs the token server to adopt them. The first error
//! encountered is returned; on any failure the server's previously active key
//! set remains in effect, so a failed reload is always safe to retry.

use std::sync::Arc;
use std::time::Duration;

use steward_types::EpochId;
use tracing::instrument;

use crate::services::key_materializer::{ArtifactWriteError, KeyMaterializer};
use crate::services::secrets_store::SecretsStoreError;
use crate::services::token_server::TokenServerService;

/// Errors surfaced by [`ReloadCoordinator::reload`].
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    /// The target epoch cannot be resolved against the provisioned bundle.
    #[error(transparent)]
    Secrets(#[from] SecretsStoreError),
    /// Persisting an artifact failed.
    #[error(transparent)]
    Artifact(#[from] ArtifactWriteError),
    /// The token server refused the new key material.
    #[error("token server rejected the new key material: {0}")]
    Rejected(eyre::Report),
    /// The token server did not answer within the configured bound.
    #[error("token server reload timed out after {0:?}")]
    TimedOut(Duration),
}

/// Orchestrates materialization, persistence, and the token server's key
/// swap.
pub struct ReloadCoordinator {
    materializer: KeyMaterializer,
    token_server: TokenServerService,
    reload_timeout: Duration,
}

impl ReloadCoordinator {
    /// Creates a coordinator driving the given token server.
    pub fn new(
        materializer: KeyMaterializer,
        token_server: TokenServerService,
        reload_timeout: Duration,
    ) -> Self {
        Self {
            materializer,
            token_server,
            reload_timeout,
        }
    }

    /// Materializes and persists the epoch's artifacts, then instructs the
    /// token server to swap its active key set.
    ///
    /// The server call runs in its own task under `reload_timeout`: a token
    /// server that panics or hangs surfaces as a [`ReloadError`] here instead
    /// of wedging or tearing down the rotation loop.
    #[instrument(level = "info", skip(self))]
    pub async fn reload(&self, epoch: EpochId) -> Result<(), ReloadError> {
        let set = self.materializer.materialize(epoch)?;
        self.materializer.persist(&set)?;

        let token_server = Arc::clone(&self.token_server);
        let paths = self.materializer.paths().clone();
        let mut load = tokio::spawn(async move {
            token_server
                .load_keys(&paths.signing_key, &paths.commitment, &paths.redemption_keys)
                .await
        });
        match tokio::time::timeout(self.reload_timeout, &mut load).await {
            Ok(Ok(Ok(()))) => {
                tracing::info!("token server adopted key material for epoch {epoch}");
                Ok(())
            }
            Ok(Ok(Err(err))) => Err(ReloadError::Rejected(err)),
            Ok(Err(join_err)) => Err(ReloadError::Rejected(eyre::eyre!(
                "token server reload task failed: {join_err}"
            ))),
            Err(_) => {
                load.abort();
                Err(ReloadError::TimedOut(self.reload_timeout))
            }
        }
    }
}
