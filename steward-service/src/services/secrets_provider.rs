//! Provisioning-input sources for the steward.
//!
//! This module defines the [`SecretsProvider`] trait, which is used to load
//! the per-epoch [`SecretsBundle`] exactly once at startup.
//!
//! Current `SecretsProvider` implementations:
//! - [`EnvSecretsProvider`] (JSON bundle in an environment variable, the
//!   transport used by the deployment charts)
//! - [`FileSecretsProvider`] (dev-only JSON file)

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use eyre::Context as _;
use secrecy::{ExposeSecret as _, SecretString};
use steward_types::SecretsBundle;
use tracing::instrument;

use crate::config::Environment;

/// Dynamic trait object for the secrets provider service.
///
/// Must be `Send + Sync` to work with async contexts (e.g., Axum).
pub type SecretsProviderService = Arc<dyn SecretsProvider + Send + Sync>;

/// Trait that implementations of provisioning sources must provide.
///
/// A provider is consulted once at startup; there is no live refresh.
#[async_trait]
pub trait SecretsProvider {
    /// Loads the provisioned secrets bundle.
    async fn load_bundle(&self) -> eyre::Result<SecretsBundle>;
}

/// Reads the bundle from an environment variable holding JSON.
pub struct EnvSecretsProvider {
    var: String,
}

impl EnvSecretsProvider {
    /// Creates a provider reading the given environment variable.
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl SecretsProvider for EnvSecretsProvider {
    #[instrument(level = "info", skip_all)]
    async fn load_bundle(&self) -> eyre::Result<SecretsBundle> {
        tracing::info!("loading secrets bundle from ${}...", self.var);
        let raw = SecretString::from(
            std::env::var(&self.var)
                .with_context(|| format!("while reading {} from the environment", self.var))?,
        );
        serde_json::from_str(raw.expose_secret()).context("while parsing secrets bundle JSON")
    }
}

/// Dev-only file source for local runs.
pub struct FileSecretsProvider {
    path: PathBuf,
}

impl FileSecretsProvider {
    /// Creates a provider reading the given JSON file. Panics outside the
    /// `dev` environment.
    pub fn new(path: PathBuf, environment: Environment) -> Self {
        environment.assert_is_dev();
        Self { path }
    }
}

#[async_trait]
impl SecretsProvider for FileSecretsProvider {
    #[instrument(level = "info", skip_all)]
    async fn load_bundle(&self) -> eyre::Result<SecretsBundle> {
        tracing::info!("loading secrets bundle from {}...", self.path.display());
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("while reading {}", self.path.display()))?;
        serde_json::from_str(&raw).context("while parsing secrets bundle JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE: &str = r#"{"keys":{"2024-02":"KEY_FEB"},"commitments":{"2024-02":"C_FEB"}}"#;

    #[tokio::test]
    async fn env_provider_parses_the_bundle() {
        std::env::set_var("STEWARD_TEST_SECRETS", BUNDLE);
        let bundle = EnvSecretsProvider::new("STEWARD_TEST_SECRETS")
            .load_bundle()
            .await
            .unwrap();
        assert_eq!(bundle.keys.len(), 1);
        assert_eq!(bundle.commitments.len(), 1);
    }

    #[tokio::test]
    async fn env_provider_fails_on_an_absent_variable() {
        assert!(
            EnvSecretsProvider::new("STEWARD_TEST_SECRETS_ABSENT")
                .load_bundle()
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn file_provider_parses_the_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        std::fs::write(&path, BUNDLE).unwrap();
        let bundle = FileSecretsProvider::new(path, Environment::Dev)
            .load_bundle()
            .await
            .unwrap();
        assert_eq!(bundle.keys.len(), 1);
    }

    #[test]
    #[should_panic(expected = "Is not dev environment")]
    fn file_provider_refuses_prod() {
        let _ = FileSecretsProvider::new(PathBuf::from("/dev/null"), Environment::Prod);
    }
}
