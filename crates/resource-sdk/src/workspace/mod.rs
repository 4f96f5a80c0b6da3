//! Directory handed to `in` and `out` handlers.
//!
//! The orchestrator passes the directory as the first command-line argument.
//! Rather than changing the process working directory, the dispatcher opens
//! a capability handle on it and handlers resolve every path relative to
//! that handle.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cap_std::ambient_authority;
use cap_std::fs::Dir;
use thiserror::Error;

/// Errors raised while resolving the working directory.
#[derive(Debug, Clone, Error)]
pub enum PathError {
    /// No directory argument was given.
    #[error("invalid operation: path argument required")]
    Missing,

    /// The argument does not name an existing directory.
    #[error("path must be valid directory")]
    NotDirectory {
        /// The rejected path.
        path: PathBuf,
    },

    /// The directory exists but could not be opened.
    #[error("error opening directory {}: {source}", path.display())]
    Open {
        /// The directory that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

/// A validated working directory.
///
/// # Example
///
/// ```
/// use resource_sdk::Workspace;
///
/// let tmp = tempfile::tempdir().expect("tempdir");
/// let workspace = Workspace::open(tmp.path()).expect("open workspace");
/// workspace.dir().write("ref", "abc123").expect("write file");
/// assert_eq!(workspace.dir().read_to_string("ref").expect("read"), "abc123");
/// ```
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    dir: Dir,
}

impl Workspace {
    /// Opens `path` after checking that it is a directory.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::NotDirectory`] when the path does not exist or is
    /// not a directory, and [`PathError::Open`] when it cannot be opened.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, PathError> {
        let path = root.as_ref();
        if !path.is_dir() {
            return Err(PathError::NotDirectory {
                path: path.to_path_buf(),
            });
        }
        let dir = Dir::open_ambient_dir(path, ambient_authority()).map_err(|source| {
            PathError::Open {
                path: path.to_path_buf(),
                source: Arc::new(source),
            }
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            dir,
        })
    }

    /// Opens the directory named by an optional command-line argument.
    ///
    /// The argument is used as given, so paths that are not valid UTF-8 are
    /// opened unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::Missing`] when `argument` is `None` or empty,
    /// otherwise as [`Workspace::open`].
    pub fn from_argument(argument: Option<&OsStr>) -> Result<Self, PathError> {
        argument
            .filter(|path| !path.is_empty())
            .ok_or(PathError::Missing)
            .and_then(Self::open)
    }

    /// Returns the path the workspace was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the capability handle on the directory.
    #[must_use]
    pub const fn dir(&self) -> &Dir {
        &self.dir
    }
}
