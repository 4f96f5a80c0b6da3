//! The trait resource authors implement.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::action::{
    ARCHIVE, ActionSpec, CLOSE, INITIALIZE, Kind, Operation, Signature, SignatureError, TypeInfo,
};
use crate::archive::Archive;
use crate::context::Context;
use crate::error::BoxError;
use crate::protocol::{Metadata, Output};
use crate::validate::Validate;
use crate::workspace::Workspace;

/// Returned by the default `get` and `put` implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{action} not implemented")]
pub struct NotImplemented {
    /// The missing action.
    pub action: &'static str,
}

/// A pipeline resource.
///
/// The four associated types describe the JSON records the orchestrator
/// sends; each must deserialize from a JSON object and implement
/// [`Validate`]. Only [`check`](Resource::check) is required. The other
/// hooks default to doing nothing, and `get`/`put` default to failing with
/// [`NotImplemented`].
///
/// # Example
///
/// ```
/// use resource_sdk::{BoxError, Context, NoParams, Resource, Validate};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Default, Deserialize)]
/// struct Source {
///     start: u64,
/// }
/// impl Validate for Source {}
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Version {
///     n: u64,
/// }
/// impl Validate for Version {}
///
/// struct Counter;
///
/// impl Resource for Counter {
///     type Source = Source;
///     type Version = Version;
///     type GetParams = NoParams;
///     type PutParams = NoParams;
///
///     fn check(
///         &mut self,
///         _ctx: &Context,
///         source: &Source,
///         version: Option<&Version>,
///     ) -> Result<Vec<Version>, BoxError> {
///         let n = version.map_or(source.start, |v| v.n + 1);
///         Ok(vec![Version { n }])
///     }
/// }
/// ```
pub trait Resource {
    /// Static configuration from the pipeline.
    type Source: DeserializeOwned + Default + Validate + 'static;
    /// Identifies one revision of the tracked artefact.
    type Version: Serialize + DeserializeOwned + Validate + 'static;
    /// Parameters for `in`.
    type GetParams: DeserializeOwned + Default + Validate + 'static;
    /// Parameters for `out`.
    type PutParams: DeserializeOwned + Default + Validate + 'static;

    /// Runs before every action with the validated source.
    ///
    /// # Errors
    ///
    /// An error aborts the invocation.
    fn initialize(&mut self, _ctx: &Context, _source: &Self::Source) -> Result<(), BoxError> {
        Ok(())
    }

    /// Opens the version archive for `check` and `out`, if the resource uses
    /// one.
    ///
    /// # Errors
    ///
    /// An error aborts the invocation.
    fn archive(
        &mut self,
        _ctx: &Context,
        _source: &Self::Source,
    ) -> Result<Option<Box<dyn Archive>>, BoxError> {
        Ok(None)
    }

    /// Lists versions after `version`, oldest first.
    ///
    /// `version` is the latest version the orchestrator knows about, or the
    /// latest archived one when the orchestrator knows none.
    ///
    /// # Errors
    ///
    /// An error fails the `check`.
    fn check(
        &mut self,
        ctx: &Context,
        source: &Self::Source,
        version: Option<&Self::Version>,
    ) -> Result<Vec<Self::Version>, BoxError>;

    /// Fetches `version` into `workspace`.
    ///
    /// Returning an [`Output`] without a version reports only metadata and
    /// echoes `version` back to the orchestrator.
    ///
    /// # Errors
    ///
    /// An error fails the `in`.
    fn get(
        &mut self,
        _ctx: &Context,
        _source: &Self::Source,
        _version: &Self::Version,
        _workspace: &Workspace,
        _params: &Self::GetParams,
    ) -> Result<Output<Self::Version>, BoxError> {
        Err(NotImplemented { action: "in" }.into())
    }

    /// Publishes a new version from `workspace`.
    ///
    /// # Errors
    ///
    /// An error fails the `out`. An [`Output`] without a version is also
    /// treated as a failure.
    fn put(
        &mut self,
        _ctx: &Context,
        _source: &Self::Source,
        _workspace: &Workspace,
        _params: &Self::PutParams,
    ) -> Result<Output<Self::Version>, BoxError> {
        Err(NotImplemented { action: "out" }.into())
    }

    /// Runs once after the action, whatever its outcome.
    ///
    /// # Errors
    ///
    /// An error is reported on the diagnostic stream but does not change the
    /// invocation's result.
    fn close(&mut self, _ctx: &Context) -> Result<(), BoxError> {
        Ok(())
    }
}

fn context() -> TypeInfo {
    TypeInfo::new::<Context>(Kind::Context)
}

fn error() -> TypeInfo {
    TypeInfo::new::<BoxError>(Kind::Error)
}

/// Derives the signature of every handler `operation` calls on `R`.
#[must_use]
pub fn signatures<R: Resource + ?Sized>(
    operation: Operation,
) -> Vec<(&'static ActionSpec, Signature)> {
    let source = TypeInfo::value::<R::Source>;
    let version = TypeInfo::value::<R::Version>;
    let workspace = || TypeInfo::new::<Workspace>(Kind::Workspace);
    let metadata = || TypeInfo::new::<Vec<Metadata>>(Kind::Metadata);

    let mut derived = vec![
        (
            &INITIALIZE,
            Signature::new(vec![context(), source()], vec![error()]),
        ),
        (&CLOSE, Signature::new(vec![context()], vec![error()])),
    ];
    let action = match operation {
        Operation::Check => Signature::new(
            vec![context(), source(), version()],
            vec![TypeInfo::sequence_of::<R::Version>(), error()],
        ),
        Operation::In => Signature::new(
            vec![
                context(),
                source(),
                version(),
                workspace(),
                TypeInfo::value::<R::GetParams>(),
            ],
            vec![version(), metadata(), error()],
        ),
        Operation::Out => Signature::new(
            vec![
                context(),
                source(),
                workspace(),
                TypeInfo::value::<R::PutParams>(),
            ],
            vec![version(), metadata(), error()],
        ),
    };
    derived.push((operation.action(), action));
    if operation != Operation::In {
        derived.push((
            &ARCHIVE,
            Signature::new(
                vec![context(), source()],
                vec![
                    TypeInfo::new::<Option<Box<dyn Archive>>>(Kind::Archive),
                    error(),
                ],
            ),
        ));
    }
    derived
}

/// Validates every handler `operation` calls on `R`.
///
/// # Errors
///
/// Returns a [`SignatureError`] listing the violations of all handlers.
pub fn validate_signatures<R: Resource + ?Sized>(
    operation: Operation,
) -> Result<(), SignatureError> {
    let mut errors = signatures::<R>(operation)
        .into_iter()
        .filter_map(|(spec, signature)| spec.validate(&signature).err());
    let Some(mut failure) = errors.next() else {
        return Ok(());
    };
    for next in errors {
        failure.merge(next);
    }
    Err(failure)
}
