//! Archive configuration as embedded in a resource's source.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ARCHIVE_TARGET, Archive, ArchiveError, MemoryArchive};
use crate::fingerprint::FingerprintStrategy;
use crate::validate::Validate;

/// Settings shared by every backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Return the full history on `check` even when the orchestrator already
    /// knows a version. Useful when pinned versions were orphaned, for
    /// example after rotating credentials.
    pub force_history: bool,
    /// Digest used to recognise archived versions.
    pub fingerprint: FingerprintStrategy,
}

/// Configuration for [`MemoryArchive`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Serialized versions the archive starts with, oldest first.
    pub history: Vec<String>,
}

/// Archive section of a resource's source configuration.
///
/// ```json
/// { "force_history": true, "inmem": { "history": ["{\"ref\":\"a\"}"] } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Settings shared by every backend.
    #[serde(flatten)]
    pub settings: Settings,
    /// In-memory backend.
    #[serde(default, alias = "memory", skip_serializing_if = "Option::is_none")]
    pub inmem: Option<MemoryConfig>,
}

impl ArchiveConfig {
    /// Decodes a configuration from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidConfig`] when the value does not decode.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ArchiveError> {
        serde_json::from_value(value).map_err(|source| ArchiveError::InvalidConfig {
            source: Arc::new(source),
        })
    }

    /// Opens the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NoProvider`] when no backend section is set.
    pub fn open(&self) -> Result<Box<dyn Archive>, ArchiveError> {
        let Some(memory) = &self.inmem else {
            return Err(ArchiveError::NoProvider);
        };
        debug!(
            target: ARCHIVE_TARGET,
            entries = memory.history.len(),
            force_history = self.settings.force_history,
            fingerprint = %self.settings.fingerprint,
            "opening in-memory archive"
        );
        Ok(Box::new(MemoryArchive::from_config(memory, self.settings)))
    }
}

impl Validate for ArchiveConfig {}
