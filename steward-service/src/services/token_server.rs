//! Serving-component boundary.
//!
//! This module defines the [`TokenServer`] trait, the hot-reload entry point
//! of the token server the steward provisions keys for. The steward itself
//! performs no token cryptography; it only renders artifacts and asks the
//! server to swap its active key set.
//!
//! Current `TokenServer` implementations:
//! - [`PemFileTokenServer`] (validates artifact shape; used by the bundled
//!   binary)

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use eyre::Context as _;
use tracing::instrument;

/// Dynamic trait object for the token server service.
///
/// Must be `Send + Sync` to work with async contexts (e.g., Axum).
pub type TokenServerService = Arc<dyn TokenServer + Send + Sync>;

/// Hot-reload entry point of the serving component.
///
/// Implementations read the three artifact paths and atomically swap their
/// active key set; a failure must leave the previously active key set in
/// effect. Any error (or panic) raised here is treated by the steward as a
/// recoverable rejection, never as a fatal event outside the mandatory
/// initial load.
#[async_trait]
pub trait TokenServer {
    /// Reads the three artifacts and swaps the active key set.
    async fn load_keys(
        &self,
        signing_key: &Path,
        commitment: &Path,
        redemption_keys: &Path,
    ) -> eyre::Result<()>;
}

/// Stand-in implementation for deployments where the token server runs out of
/// process and re-reads the artifacts on its own schedule.
///
/// Checks that the rendered artifacts have the shape the downstream parser
/// demands: PEM blocks for the key files (the parser chokes on stray
/// surrounding newlines) and JSON for the commitment. Embedders with an
/// in-process token server implement [`TokenServer`] directly and pass it to
/// [`crate::start`].
pub struct PemFileTokenServer;

#[async_trait]
impl TokenServer for PemFileTokenServer {
    #[instrument(level = "debug", skip(self))]
    async fn load_keys(
        &self,
        signing_key: &Path,
        commitment: &Path,
        redemption_keys: &Path,
    ) -> eyre::Result<()> {
        let key = tokio::fs::read_to_string(signing_key)
            .await
            .context("while reading signing key artifact")?;
        ensure_pem(&key, signing_key)?;

        let commitment_blob = tokio::fs::read_to_string(commitment)
            .await
            .context("while reading commitment artifact")?;
        serde_json::from_str::<serde_json::Value>(&commitment_blob)
            .with_context(|| format!("commitment at {} is not valid JSON", commitment.display()))?;

        let redemption_blob = tokio::fs::read_to_string(redemption_keys)
            .await
            .context("while reading redemption key artifact")?;
        ensure_pem(&redemption_blob, redemption_keys)?;

        tracing::info!("token server key set swapped");
        Ok(())
    }
}

fn ensure_pem(data: &str, path: &Path) -> eyre::Result<()> {
    eyre::ensure!(
        data.contains("-----BEGIN"),
        "no PEM block in {}",
        path.display()
    );
    eyre::ensure!(
        !data.starts_with('\n') && !data.ends_with('\n'),
        "stray surrounding newlines in {}",
        path.display()
    );
    Ok(())
}
