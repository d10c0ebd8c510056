//! Renders an epoch's key material to the filesystem.
//!
//! [`KeyMaterializer::materialize`] resolves one target epoch into a
//! [`KeyMaterialSet`]; [`KeyMaterializer::persist`] writes the three
//! artifacts the token server reads. Writes go through a temp file in the
//! destination directory followed by a rename, because the token server may
//! re-read the artifacts on its own schedule and must never observe a
//! partially-written file.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use steward_types::{Commitment, EpochId, SigningKey};
use tracing::instrument;

use crate::services::secrets_store::{SecretsStore, SecretsStoreError};

/// I/O failure while persisting an artifact.
#[derive(Debug, thiserror::Error)]
#[error("cannot write artifact {}: {source}", path.display())]
pub struct ArtifactWriteError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
}

/// The filesystem locations of the rendered artifacts.
#[derive(Clone, Debug)]
pub struct ArtifactPaths {
    /// The current epoch's signing key, verbatim.
    pub signing_key: PathBuf,
    /// The current epoch's commitment, verbatim.
    pub commitment: PathBuf,
    /// Current + previous epoch signing keys, newline-joined.
    pub redemption_keys: PathBuf,
}

/// The resolved, renderable key material for one target epoch.
///
/// Recomputed in full on every epoch transition; the previous set is simply
/// overwritten once the new one is handed to the token server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyMaterialSet {
    /// The epoch this set was materialized for.
    pub epoch: EpochId,
    /// The epoch's signing key.
    pub signing_key: SigningKey,
    /// The epoch's commitment.
    pub commitment: Commitment,
    /// The redemption key material spanning this epoch and the previous one.
    pub redemption_blob: String,
}

/// Resolves epochs against the [`SecretsStore`] and renders the artifacts the
/// token server consumes.
pub struct KeyMaterializer {
    store: Arc<SecretsStore>,
    paths: ArtifactPaths,
}

impl KeyMaterializer {
    /// Creates a materializer rendering into the given locations.
    pub fn new(store: Arc<SecretsStore>, paths: ArtifactPaths) -> Self {
        Self { store, paths }
    }

    /// The artifact locations this materializer renders into.
    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Resolves the given epoch into a [`KeyMaterialSet`].
    ///
    /// The target epoch's signing key and commitment are resolved strictly;
    /// only the previous-epoch segment of the redemption blob is lenient. A
    /// missing previous-epoch key therefore never fails materialization.
    #[instrument(level = "debug", skip(self))]
    pub fn materialize(&self, epoch: EpochId) -> Result<KeyMaterialSet, SecretsStoreError> {
        let signing_key = self.store.resolve_key(&epoch)?.clone();
        let commitment = self.store.resolve_commitment(&epoch)?.clone();
        let redemption_blob = self.store.redemption_material(&epoch);
        Ok(KeyMaterialSet {
            epoch,
            signing_key,
            commitment,
            redemption_blob,
        })
    }

    /// Writes the three artifacts with owner-only permissions, overwriting
    /// any prior contents.
    ///
    /// The writes are not transactional across artifacts, but each individual
    /// artifact is replaced atomically.
    #[instrument(level = "debug", skip_all, fields(epoch = %set.epoch))]
    pub fn persist(&self, set: &KeyMaterialSet) -> Result<(), ArtifactWriteError> {
        write_owner_only(&self.paths.signing_key, set.signing_key.expose_secret())?;
        write_owner_only(&self.paths.commitment, set.commitment.as_str())?;
        write_owner_only(&self.paths.redemption_keys, &set.redemption_blob)?;
        tracing::debug!("rendered key material for epoch {}", set.epoch);
        Ok(())
    }
}

/// Writes `data` to `path` with mode 0600 via temp-file-then-rename, so a
/// concurrent reader sees either the old or the new contents, never a torn
/// write.
fn write_owner_only(path: &Path, data: &str) -> Result<(), ArtifactWriteError> {
    let tmp = path.with_extension("tmp");
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt as _;
        options.mode(0o600);
    }
    options
        .open(&tmp)
        .and_then(|mut file| {
            file.write_all(data.as_bytes())?;
            file.sync_all()
        })
        .and_then(|_| std::fs::rename(&tmp, path))
        .map_err(|source| ArtifactWriteError {
            path: path.to_owned(),
            source,
        })
}
