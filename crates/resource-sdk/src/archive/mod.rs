//! Out-of-band version history.
//!
//! An orchestrator may forget a resource's versions when its configuration
//! changes. An [`Archive`] keeps them somewhere the orchestrator does not
//! control so a later `check` can replay them. The dispatcher owns the archive
//! for one invocation through an [`ArchiveSession`], which closes it on every
//! exit path.

mod config;
mod memory;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::context::Context;
use crate::dispatch::Invocation;
use crate::error::BoxError;
use crate::fingerprint::FingerprintStrategy;

pub use self::config::{ArchiveConfig, MemoryConfig, Settings};
pub use self::memory::MemoryArchive;

pub(crate) const ARCHIVE_TARGET: &str = "resource_sdk::archive";

/// Errors reported by archive backends.
#[derive(Debug, Clone, Error)]
pub enum ArchiveError {
    /// The configuration named no backend.
    #[error("no valid provider config found")]
    NoProvider,

    /// The configuration could not be decoded.
    #[error("invalid config: {source}")]
    InvalidConfig {
        /// Underlying decode error.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// The handle was used after being closed.
    #[error("archive is closed")]
    Closed,

    /// The backend failed.
    #[error("{source}")]
    Backend {
        /// Error reported by the backend.
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
}

impl ArchiveError {
    /// Wraps a backend failure.
    #[must_use]
    pub fn backend(source: impl Into<BoxError>) -> Self {
        let boxed: BoxError = source.into();
        Self::Backend {
            source: Arc::from(boxed),
        }
    }
}

/// A durable, ordered log of serialized versions.
///
/// Entries are opaque bytes; the dispatcher serializes versions before
/// storing them and decodes them when replaying history.
pub trait Archive {
    /// Releases the backend. Called exactly once per invocation.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot flush or release its state.
    fn close(&mut self, ctx: &Context) -> Result<(), ArchiveError>;

    /// Returns archived versions, oldest first.
    ///
    /// `latest` is the version the orchestrator already knows about, if any.
    /// Backends typically return nothing when it is set, unless configured to
    /// always return their full history.
    ///
    /// # Errors
    ///
    /// Returns an error when the history cannot be read.
    fn history(
        &mut self,
        ctx: &Context,
        latest: Option<Vec<u8>>,
    ) -> Result<Vec<Vec<u8>>, ArchiveError>;

    /// Appends versions, in order.
    ///
    /// # Errors
    ///
    /// Returns an error when the versions cannot be stored durably.
    fn put(&mut self, ctx: &Context, versions: &[Vec<u8>]) -> Result<(), ArchiveError>;

    /// Returns the digest used to recognise already archived versions.
    fn fingerprint(&self) -> FingerprintStrategy {
        FingerprintStrategy::default()
    }
}

/// Owns an optional archive for one invocation and closes it on drop.
///
/// Close failures cannot change the invocation's outcome at that point, so
/// they are written to the diagnostic stream and logged.
pub struct ArchiveSession<'ctx> {
    ctx: &'ctx Context,
    archive: Option<Box<dyn Archive>>,
}

impl<'ctx> ArchiveSession<'ctx> {
    /// Takes ownership of `archive` for the lifetime of the session.
    #[must_use]
    pub const fn new(ctx: &'ctx Context, archive: Option<Box<dyn Archive>>) -> Self {
        Self { ctx, archive }
    }

    /// Returns `true` when an archive is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.archive.is_some()
    }

    /// Returns the archive, if one is configured.
    pub fn archive(&mut self) -> Option<&mut (dyn Archive + 'static)> {
        self.archive.as_deref_mut()
    }

    /// Returns the configured archive's digest, or the default without one.
    #[must_use]
    pub fn fingerprint(&self) -> FingerprintStrategy {
        self.archive
            .as_ref()
            .map_or_else(FingerprintStrategy::default, |archive| archive.fingerprint())
    }
}

impl Drop for ArchiveSession<'_> {
    fn drop(&mut self) {
        let Some(mut archive) = self.archive.take() else {
            return;
        };
        let ctx = self.ctx;
        let error = match Invocation::capture(|| archive.close(ctx).map_err(Into::into)) {
            Invocation::Returned(()) => {
                debug!(target: ARCHIVE_TARGET, "archive closed");
                return;
            }
            Invocation::Failed(error) => error.to_string(),
            Invocation::Panicked(message) => format!("close panicked: {message}"),
        };
        warn!(target: ARCHIVE_TARGET, %error, "error closing archive");
        ctx.report(format_args!("error closing archive: {error}"));
    }
}

impl std::fmt::Debug for ArchiveSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveSession")
            .field("configured", &self.is_configured())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
