//! Framework for writing pipeline resources.
//!
//! A resource tracks versions of some external artefact on behalf of a
//! pipeline orchestrator. The orchestrator runs the resource as a short-lived
//! process, once per action: `check` lists new versions, `in` fetches one
//! version into a directory, and `out` publishes a new version from a
//! directory. Each process reads one JSON request from standard input and
//! writes one JSON response to standard output.
//!
//! Resource authors implement [`Resource`] with typed source, version and
//! parameter records. The dispatcher handles the rest:
//!
//! - validating the handler signatures against the action contracts;
//! - decoding and validating request fragments into the declared records;
//! - resolving the working directory into a [`Workspace`];
//! - replaying and extending an optional version [`archive`], so versions
//!   survive orchestrator configuration changes;
//! - closing the resource and archive on every exit path;
//! - writing either the response or a single error line.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::process::ExitCode;
//!
//! use resource_sdk::{BoxError, Context, NoParams, Operation, Resource, Validate};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct Source {
//!     uri: String,
//! }
//! impl Validate for Source {}
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Version {
//!     digest: String,
//! }
//! impl Validate for Version {}
//!
//! struct Image;
//!
//! impl Resource for Image {
//!     type Source = Source;
//!     type Version = Version;
//!     type GetParams = NoParams;
//!     type PutParams = NoParams;
//!
//!     fn check(
//!         &mut self,
//!         _ctx: &Context,
//!         source: &Source,
//!         _version: Option<&Version>,
//!     ) -> Result<Vec<Version>, BoxError> {
//!         Ok(vec![Version { digest: format!("sha256:{}", source.uri.len()) }])
//!     }
//! }
//!
//! fn main() -> ExitCode {
//!     resource_sdk::main(Operation::Check, Image)
//! }
//! ```

pub mod action;
pub mod archive;
pub mod config;
pub mod context;
pub mod dispatch;
mod entrypoint;
pub mod error;
pub mod fingerprint;
pub mod materialize;
pub mod protocol;
pub mod reconcile;
mod resource;
pub mod telemetry;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
mod validate;
pub mod workspace;

#[cfg(test)]
mod tests;

pub use self::action::Operation;
pub use self::archive::{Archive, ArchiveConfig, ArchiveError, MemoryArchive};
pub use self::context::{CancellationToken, Context};
pub use self::dispatch::exec;
pub use self::entrypoint::{main, run};
pub use self::error::{BoxError, ExecError};
pub use self::fingerprint::FingerprintStrategy;
pub use self::protocol::{Metadata, Output, Request, Response};
pub use self::resource::{NotImplemented, Resource, signatures, validate_signatures};
pub use self::validate::{NoParams, Validate};
pub use self::workspace::Workspace;
