//! Merges freshly checked versions with archived history.
//!
//! A [`Ledger`] is seeded with the archive's history, in archive order, and
//! remembers the fingerprint of every entry. Each entry is decoded and
//! validated like a version taken from a request. Recording the handler's versions
//! appends those not seen before, in handler order, and collects their
//! serialized bytes so the caller can archive them.

use std::collections::HashSet;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::context::Context;
use crate::fingerprint::{Fingerprint, FingerprintStrategy};
use crate::materialize::{InputError, materialize_bytes};
use crate::validate::Validate;

/// Errors raised while reconciling versions with history.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// An archived entry did not decode into the version type or failed
    /// its validation hook.
    #[error("error parsing archived resource version: {source}")]
    ArchivedVersion {
        /// Why the entry was rejected.
        #[source]
        source: InputError,
    },

    /// A checked version could not be serialized.
    #[error("error serializing version for archival: {source}")]
    SerializeVersion {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },
}

/// The outcome of merging a check result with history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled<V> {
    /// Archived versions followed by new ones.
    pub versions: Vec<V>,
    /// Serialized new versions, in the order they were returned.
    pub unarchived: Vec<Vec<u8>>,
}

/// Versions seen so far, keyed by content fingerprint.
#[derive(Debug)]
pub struct Ledger<V> {
    strategy: FingerprintStrategy,
    seen: HashSet<Fingerprint>,
    versions: Vec<V>,
}

impl<V> Ledger<V>
where
    V: Serialize + DeserializeOwned + Validate,
{
    /// Seeds a ledger with archived entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::ArchivedVersion`] when an entry does not
    /// decode or fails validation.
    pub fn replay(
        ctx: &Context,
        strategy: FingerprintStrategy,
        history: &[Vec<u8>],
    ) -> Result<Self, ReconcileError> {
        let mut seen = HashSet::with_capacity(history.len());
        let mut versions = Vec::with_capacity(history.len());
        for entry in history {
            let version = materialize_bytes(ctx, entry)
                .map_err(|source| ReconcileError::ArchivedVersion { source })?;
            versions.push(version);
            seen.insert(strategy.fingerprint(entry));
        }
        Ok(Self {
            strategy,
            seen,
            versions,
        })
    }

    /// Appends unseen versions from `fresh` and returns the merged list.
    ///
    /// A fingerprint collision makes a new version look archived; it is then
    /// dropped from the result rather than reported.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::SerializeVersion`] when a version cannot be
    /// serialized.
    pub fn record(mut self, fresh: Vec<V>) -> Result<Reconciled<V>, ReconcileError> {
        let mut unarchived = Vec::new();
        for version in fresh {
            let serialized = serde_json::to_vec(&version)
                .map_err(|source| ReconcileError::SerializeVersion { source })?;
            if self.seen.insert(self.strategy.fingerprint(&serialized)) {
                self.versions.push(version);
                unarchived.push(serialized);
            }
        }
        Ok(Reconciled {
            versions: self.versions,
            unarchived,
        })
    }
}
