//! Demonstration resource that tracks colour-tagged refs.
//!
//! The resource shows the shape of a typical implementation. The source
//! names a colour and, optionally, a version archive. `check` echoes the
//! version it is given. `in` writes the ref into the workspace and `out`
//! publishes the ref found in a workspace file. The `check`, `in` and `out`
//! binaries each fix one operation.

use std::io;
use std::sync::Arc;

use resource_sdk::{
    Archive, ArchiveConfig, BoxError, Context, Output, Resource, Validate, Workspace,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

const DEMO_TARGET: &str = "resource_demo";

/// Workspace file written by `in` and read by default by `out`.
pub const REF_FILE: &str = "ref";

/// Errors raised by the demonstration resource.
#[derive(Debug, Clone, Error)]
pub enum DemoError {
    /// The source named an unsupported colour.
    #[error("color must be one of blue, green: got {color}")]
    Color {
        /// Rejected colour.
        color: String,
    },

    /// A version carried an empty ref.
    #[error("ref is required")]
    MissingRef,

    /// A workspace file could not be written.
    #[error("error writing {file}: {source}")]
    Write {
        /// File relative to the workspace.
        file: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// A workspace file could not be read.
    #[error("error reading {file}: {source}")]
    Read {
        /// File relative to the workspace.
        file: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The ref file held no ref.
    #[error("{file} does not contain a ref")]
    EmptyRef {
        /// File relative to the workspace.
        file: String,
    },
}

/// Pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Source {
    /// Either `blue` or `green`.
    #[serde(default)]
    pub color: String,
    /// Optional version archive.
    #[serde(default)]
    pub archive: Option<ArchiveConfig>,
}

impl Validate for Source {
    fn validate(&self, _ctx: &Context) -> Result<(), BoxError> {
        match self.color.as_str() {
            "blue" | "green" => Ok(()),
            _ => Err(DemoError::Color {
                color: self.color.clone(),
            }
            .into()),
        }
    }
}

/// One revision of the tracked ref.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// The ref itself.
    #[serde(rename = "ref")]
    pub reference: String,
}

impl Version {
    /// Creates a version for `reference`.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }
}

impl Validate for Version {
    fn validate(&self, _ctx: &Context) -> Result<(), BoxError> {
        if self.reference.is_empty() {
            return Err(DemoError::MissingRef.into());
        }
        Ok(())
    }
}

/// Parameters for `in`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct GetParams {
    /// Reported as metadata only.
    #[serde(default)]
    pub shallow: bool,
}

impl Validate for GetParams {}

/// Parameters for `out`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PutParams {
    /// Workspace file holding the ref to publish; defaults to [`REF_FILE`].
    #[serde(default)]
    pub file: Option<String>,
}

impl Validate for PutParams {}

/// The demonstration resource.
#[derive(Debug, Default)]
pub struct DemoResource;

impl Resource for DemoResource {
    type Source = Source;
    type Version = Version;
    type GetParams = GetParams;
    type PutParams = PutParams;

    fn archive(
        &mut self,
        _ctx: &Context,
        source: &Source,
    ) -> Result<Option<Box<dyn Archive>>, BoxError> {
        source
            .archive
            .as_ref()
            .map(ArchiveConfig::open)
            .transpose()
            .map_err(Into::into)
    }

    fn check(
        &mut self,
        _ctx: &Context,
        _source: &Source,
        version: Option<&Version>,
    ) -> Result<Vec<Version>, BoxError> {
        Ok(version.cloned().into_iter().collect())
    }

    fn get(
        &mut self,
        ctx: &Context,
        source: &Source,
        version: &Version,
        workspace: &Workspace,
        params: &GetParams,
    ) -> Result<Output<Version>, BoxError> {
        workspace
            .dir()
            .write(REF_FILE, &version.reference)
            .map_err(|error| DemoError::Write {
                file: REF_FILE.to_owned(),
                source: Arc::new(error),
            })?;
        info!(target: DEMO_TARGET, reference = %version.reference, "fetched ref");
        ctx.report(format_args!(
            "fetched {} ref {}",
            source.color, version.reference
        ));
        Ok(Output::new(version.clone())
            .with_metadata("color", source.color.as_str())
            .with_metadata("shallow", params.shallow.to_string()))
    }

    fn put(
        &mut self,
        ctx: &Context,
        source: &Source,
        workspace: &Workspace,
        params: &PutParams,
    ) -> Result<Output<Version>, BoxError> {
        let file = params.file.as_deref().unwrap_or(REF_FILE);
        let contents = workspace
            .dir()
            .read_to_string(file)
            .map_err(|error| DemoError::Read {
                file: file.to_owned(),
                source: Arc::new(error),
            })?;
        let reference = contents.trim();
        if reference.is_empty() {
            return Err(DemoError::EmptyRef {
                file: file.to_owned(),
            }
            .into());
        }
        info!(target: DEMO_TARGET, reference, "publishing ref");
        ctx.report(format_args!("publishing {} ref {reference}", source.color));
        Ok(Output::new(Version::new(reference)).with_metadata("color", source.color.as_str()))
    }
}
