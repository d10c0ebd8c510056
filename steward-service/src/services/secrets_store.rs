//! Epoch-keyed lookup over the provisioned secrets bundle.
//!
//! The store is built once from the provisioning input and is immutable for
//! the process lifetime. It offers two lookup policies:
//!
//! - strict resolution ([`SecretsStore::resolve_key`],
//!   [`SecretsStore::resolve_commitment`]) which fails with a typed error
//!   when the epoch is absent, and
//! - the lenient [`SecretsStore::redemption_material`] composition, where an
//!   absent signing key contributes an empty segment.

use steward_types::{Commitment, EpochId, SecretsBundle, SigningKey};

/// Errors returned by the [`SecretsStore`] strict resolution operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretsStoreError {
    /// No signing key was provisioned for the epoch.
    #[error("no signing key provisioned for epoch {0}")]
    MissingKey(EpochId),
    /// No commitment was provisioned for the epoch.
    #[error("no commitment provisioned for epoch {0}")]
    MissingCommitment(EpochId),
}

/// Immutable per-epoch key material, loaded once from the provisioning input.
///
/// Installing a fresh bundle requires restarting the process with new
/// provisioning input; there is deliberately no live refresh path.
#[derive(Clone, Debug)]
pub struct SecretsStore {
    bundle: SecretsBundle,
}

impl SecretsStore {
    /// Wraps the provisioned bundle.
    pub fn new(bundle: SecretsBundle) -> Self {
        tracing::info!(
            "provisioned {} signing keys and {} commitments",
            bundle.keys.len(),
            bundle.commitments.len()
        );
        Self { bundle }
    }

    /// Resolves the signing key for the given epoch.
    pub fn resolve_key(&self, epoch: &EpochId) -> Result<&SigningKey, SecretsStoreError> {
        self.bundle
            .keys
            .get(epoch)
            .ok_or(SecretsStoreError::MissingKey(*epoch))
    }

    /// Resolves the commitment for the given epoch.
    pub fn resolve_commitment(&self, epoch: &EpochId) -> Result<&Commitment, SecretsStoreError> {
        self.bundle
            .commitments
            .get(epoch)
            .ok_or(SecretsStoreError::MissingCommitment(*epoch))
    }

    /// Composes the redemption key material for the given epoch: the epoch's
    /// signing key and the previous epoch's signing key, newline-joined.
    ///
    /// Lookups here are lenient: an absent key (target or previous)
    /// contributes an empty segment instead of failing. Leading and trailing
    /// newlines are trimmed off to keep the token server's PEM parser from
    /// choking; interior newlines are left alone.
    pub fn redemption_material(&self, epoch: &EpochId) -> String {
        let previous = epoch.previous();
        let current_key = self
            .bundle
            .keys
            .get(epoch)
            .map(SigningKey::expose_secret)
            .unwrap_or_default();
        let previous_key = self
            .bundle
            .keys
            .get(&previous)
            .map(SigningKey::expose_secret)
            .unwrap_or_default();
        if previous_key.is_empty() {
            tracing::warn!("no signing key for previous epoch {previous}");
        }
        format!("{current_key}\n{previous_key}")
            .trim_matches('\n')
            .to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn epoch(s: &str) -> EpochId {
        s.parse().expect("valid epoch id")
    }

    fn store(keys: &[(&str, &str)], commitments: &[(&str, &str)]) -> SecretsStore {
        SecretsStore::new(SecretsBundle {
            keys: keys
                .iter()
                .map(|(e, k)| (epoch(e), SigningKey::new(*k)))
                .collect(),
            commitments: commitments
                .iter()
                .map(|(e, c)| (epoch(e), Commitment::new(*c)))
                .collect::<HashMap<_, _>>(),
        })
    }

    #[test]
    fn strict_resolution_succeeds_for_present_epochs() {
        let store = store(&[("2024-02", "KEY_FEB")], &[("2024-02", "C_FEB")]);
        assert_eq!(
            store.resolve_key(&epoch("2024-02")).unwrap(),
            &SigningKey::new("KEY_FEB")
        );
        assert_eq!(
            store.resolve_commitment(&epoch("2024-02")).unwrap(),
            &Commitment::new("C_FEB")
        );
    }

    #[test]
    fn strict_resolution_fails_for_absent_epochs() {
        let store = store(&[("2024-02", "KEY_FEB")], &[("2024-02", "C_FEB")]);
        assert_eq!(
            store.resolve_key(&epoch("2024-03")),
            Err(SecretsStoreError::MissingKey(epoch("2024-03")))
        );
        assert_eq!(
            store.resolve_commitment(&epoch("2024-03")),
            Err(SecretsStoreError::MissingCommitment(epoch("2024-03")))
        );
    }

    #[test]
    fn redemption_material_joins_current_and_previous() {
        let store = store(
            &[("2024-01", "KEY_JAN"), ("2024-02", "KEY_FEB")],
            &[("2024-01", "C_JAN"), ("2024-02", "C_FEB")],
        );
        assert_eq!(
            store.redemption_material(&epoch("2024-02")),
            "KEY_FEB\nKEY_JAN"
        );
    }

    #[test]
    fn redemption_material_trims_missing_previous_segment() {
        let store = store(&[("2024-02", "KEY_FEB")], &[("2024-02", "C_FEB")]);
        assert_eq!(store.redemption_material(&epoch("2024-02")), "KEY_FEB");
    }

    #[test]
    fn redemption_material_is_lenient_for_both_epochs() {
        let store = store(&[], &[]);
        assert_eq!(store.redemption_material(&epoch("2024-02")), "");
    }

    #[test]
    fn redemption_material_keeps_interior_newlines() {
        let store = store(
            &[
                ("2024-01", "-----BEGIN-----\nJAN\n-----END-----"),
                ("2024-02", "-----BEGIN-----\nFEB\n-----END-----"),
            ],
            &[],
        );
        assert_eq!(
            store.redemption_material(&epoch("2024-02")),
            "-----BEGIN-----\nFEB\n-----END-----\n-----BEGIN-----\nJAN\n-----END-----"
        );
    }

    #[test]
    fn redemption_material_trims_only_outer_newlines() {
        let store = store(&[("2024-02", "\nKEY_FEB\n")], &[]);
        assert_eq!(store.redemption_material(&epoch("2024-02")), "KEY_FEB");
    }
}
