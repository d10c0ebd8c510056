//! Configuration types and CLI/environment parsing for the steward.
//!
//! Embedders with a more detailed config can use the exposed
//! [`StewardConfig`] and flatten it with `#[clap(flatten)]`.
//!
//! Additionally this module defines the [`Environment`] to assert dev-only
//! code.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};

use crate::services::key_materializer::ArtifactPaths;

/// The environment the service is running in.
///
/// Main usage for the `Environment` is to call
/// [`Environment::assert_is_dev`]. Services that are intended for `dev` only
/// (like the file-based secrets provider) shall assert that they are called
/// from the `dev` environment.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Environment {
    /// Production environment.
    Prod,
    /// Development environment.
    Dev,
}

impl Environment {
    /// Asserts that `Environment` is `dev`. Panics if not the case.
    pub fn assert_is_dev(&self) {
        assert!(matches!(self, Environment::Dev), "Is not dev environment")
    }
}

/// The configuration for the token-steward rotation service.
///
/// It can be configured via environment variables or command line arguments
/// using `clap`.
#[derive(Parser, Debug)]
pub struct StewardConfig {
    /// The environment of the steward (either `prod` or `dev`).
    #[clap(long, env = "STEWARD_ENVIRONMENT", default_value = "prod")]
    pub environment: Environment,

    /// Name of the environment variable holding the provisioned secrets
    /// bundle as JSON.
    #[clap(long, env = "STEWARD_SECRETS_VAR", default_value = "SECRETS")]
    pub secrets_var: String,

    /// Dev-only: load the secrets bundle from this JSON file instead of the
    /// environment.
    #[clap(long, env = "STEWARD_SECRETS_FILE")]
    pub secrets_file: Option<PathBuf>,

    /// Poll interval of the rotation watcher.
    ///
    /// Also the backoff after a failed reload: the same target epoch is
    /// re-attempted on the next tick.
    #[clap(
        long,
        env = "STEWARD_POLL_INTERVAL",
        default_value = "1min",
        value_parser = humantime::parse_duration
    )]
    pub poll_interval: Duration,

    /// Upper bound on a single token-server reload call.
    #[clap(
        long,
        env = "STEWARD_RELOAD_TIMEOUT",
        default_value = "30s",
        value_parser = humantime::parse_duration
    )]
    pub reload_timeout: Duration,

    /// Where the current epoch's signing key is rendered for the token
    /// server.
    #[clap(
        long,
        env = "STEWARD_SIGNING_KEY_PATH",
        default_value = "/tmp/steward_key.pem"
    )]
    pub signing_key_path: PathBuf,

    /// Where the current epoch's commitment is rendered for the token server.
    #[clap(
        long,
        env = "STEWARD_COMMITMENT_PATH",
        default_value = "/tmp/steward_commitment.json"
    )]
    pub commitment_path: PathBuf,

    /// Where the redemption key file (current + previous epoch) is rendered.
    #[clap(
        long,
        env = "STEWARD_REDEMPTION_KEYS_PATH",
        default_value = "/tmp/steward_redeem_keys.pem"
    )]
    pub redemption_keys_path: PathBuf,

    /// The bind addr of the health/info server.
    #[clap(long, env = "STEWARD_BIND_ADDR", default_value = "127.0.0.1:8080")]
    pub bind_addr: SocketAddr,
}

impl StewardConfig {
    /// The artifact locations handed to the materializer and the token
    /// server.
    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            signing_key: self.signing_key_path.clone(),
            commitment: self.commitment_path.clone(),
            redemption_keys: self.redemption_keys_path.clone(),
        }
    }
}
