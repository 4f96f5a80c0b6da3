//! Error types shared across the dispatcher.
//!
//! Errors are `thiserror`-derived enums carrying structured context. Handler
//! code reports failures as [`BoxError`] so resources can use whichever error
//! types they like; the dispatcher wraps them with the action that failed.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::action::SignatureError;
use crate::archive::ArchiveError;
use crate::materialize::InputError;
use crate::reconcile::ReconcileError;
use crate::workspace::PathError;

/// Boxed error type returned by resource handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which request argument an input failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument {
    /// The `source` configuration block.
    Source,
    /// The `version` block.
    Version,
    /// The `params` block.
    Params,
}

impl Argument {
    /// Returns the request key for the argument.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Version => "version",
            Self::Params => "params",
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One argument that failed to materialize.
#[derive(Debug, Error)]
#[error("error parsing {argument} argument: {source}")]
pub struct ArgumentError {
    /// The offending argument.
    pub argument: Argument,
    /// What went wrong.
    #[source]
    pub source: InputError,
}

/// Every input failure of one request, reported together.
#[derive(Debug, Error)]
pub struct InputErrors {
    errors: Vec<ArgumentError>,
}

impl InputErrors {
    /// Wraps the collected failures.
    #[must_use]
    pub const fn new(errors: Vec<ArgumentError>) -> Self {
        Self { errors }
    }

    /// Returns the individual failures in argument order.
    #[must_use]
    pub fn errors(&self) -> &[ArgumentError] {
        &self.errors
    }

    /// Returns `true` when any failure refers to `argument`.
    #[must_use]
    pub fn mentions(&self, argument: Argument) -> bool {
        self.errors.iter().any(|error| error.argument == argument)
    }
}

impl fmt::Display for InputErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_list(f, self.errors.iter())
    }
}

/// Renders one error inline, or several as a bulleted list.
pub(crate) fn write_list<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl ExactSizeIterator<Item = T>,
) -> fmt::Result {
    let count = items.len();
    if count == 1 {
        for item in items {
            write!(f, "{item}")?;
        }
        return Ok(());
    }
    write!(f, "{count} errors occurred:")?;
    for item in items {
        write!(f, "\n\t* {item}")?;
    }
    Ok(())
}

/// Errors that end one invocation of the dispatcher.
///
/// Every variant is fatal. The process entrypoint prints the message to
/// standard error and exits with a non-zero status; nothing is written to
/// standard output.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The resource's declared signature does not fit the action contract.
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// The working directory argument was missing or unusable.
    #[error(transparent)]
    Path(#[from] PathError),

    /// Standard input could not be read.
    #[error("error reading input: {source}")]
    ReadInput {
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Standard input was not a JSON request envelope.
    #[error("error reading input: invalid json: {source}")]
    InvalidJson {
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// One or more request arguments failed to decode or validate.
    #[error(transparent)]
    Inputs(#[from] InputErrors),

    /// The resource's `initialize` hook failed.
    #[error("error initializing resource: {source}")]
    Initialize {
        /// Error returned by the hook.
        #[source]
        source: BoxError,
    },

    /// The resource could not provide its archive.
    #[error("error initializing archive: {source}")]
    ArchiveInit {
        /// Error returned by the archive provider.
        #[source]
        source: BoxError,
    },

    /// The known version could not be serialized as a history hint.
    #[error("error fetching archive history: error serializing latest version: {source}")]
    SerializeLatest {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Archived history could not be fetched.
    #[error("error hydrating archived version history: {source}")]
    ArchiveHistory {
        /// Error reported by the archive.
        #[source]
        source: ArchiveError,
    },

    /// The most recent archived entry could not become the check input.
    #[error("error parsing archived version history: {source}")]
    ArchivedLatest {
        /// Why the entry was rejected.
        #[source]
        source: InputError,
    },

    /// Merging handler output with archived history failed.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// New check versions could not be archived.
    #[error("error archiving new versions: {source}")]
    ArchivePutVersions {
        /// Error reported by the archive.
        #[source]
        source: ArchiveError,
    },

    /// The published version could not be archived.
    #[error("error archiving new version: {source}")]
    ArchivePutVersion {
        /// Error reported by the archive.
        #[source]
        source: ArchiveError,
    },

    /// The invocation was cancelled before the handler ran.
    #[error("operation cancelled")]
    Cancelled,

    /// The handler returned an error.
    #[error("{action} failed: {source}")]
    Handler {
        /// Action that failed, such as `check`.
        action: &'static str,
        /// Error returned by the handler.
        #[source]
        source: BoxError,
    },

    /// A handler or hook panicked.
    #[error("{action} panicked: {message}")]
    Panicked {
        /// Action or hook that panicked.
        action: &'static str,
        /// Description of the panic payload.
        message: String,
    },

    /// A publish handler returned no version.
    #[error("result missing required version")]
    MissingVersion,

    /// The response could not be serialized.
    #[error("error writing response: {source}")]
    SerializeResponse {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// The response could not be written to standard output.
    #[error("error writing response: {source}")]
    WriteResponse {
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}
