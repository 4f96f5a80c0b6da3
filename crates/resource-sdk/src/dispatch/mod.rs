//! Runs one invocation of a resource.
//!
//! [`exec`] validates the resource's handler signatures, resolves the
//! workspace, reads the request from stdin, materializes the handler's
//! arguments, calls the handler and reconciles its result with the version
//! archive, then writes the response to stdout. On failure nothing is
//! written to stdout; the error is returned for the caller to report.
//!
//! The resource is closed on every path once the request has been decoded,
//! after the archive session releases its handle.

mod invocation;

use std::ffi::OsString;
use std::io::{Read, Write};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

pub use self::invocation::Invocation;
use self::invocation::{ResourceGuard, shield};
use crate::action::Operation;
use crate::archive::ArchiveSession;
use crate::context::Context;
use crate::error::{Argument, ArgumentError, ExecError, InputErrors};
use crate::materialize::{
    InputError, materialize, materialize_bytes, materialize_optional, materialize_required,
};
use crate::protocol::{Request, Response, encode};
use crate::reconcile::{Ledger, ReconcileError};
use crate::resource::{Resource, validate_signatures};
use crate::validate::Validate;
use crate::workspace::Workspace;

pub(crate) const DISPATCH_TARGET: &str = "resource_sdk::dispatch";

enum Target {
    Check,
    Fetch(Workspace),
    Publish(Workspace),
}

impl Target {
    fn resolve(operation: Operation, args: &[OsString]) -> Result<Self, ExecError> {
        let argument = || args.first().map(OsString::as_os_str);
        Ok(match operation {
            Operation::Check => Self::Check,
            Operation::In => Self::Fetch(Workspace::from_argument(argument())?),
            Operation::Out => Self::Publish(Workspace::from_argument(argument())?),
        })
    }
}

/// Runs `operation` against `resource`.
///
/// `args` are the process arguments after the program name; `in` and `out`
/// take the workspace directory as the first one.
///
/// # Errors
///
/// Returns an [`ExecError`] describing the first fatal failure. When an error
/// is returned nothing has been written to `stdout`.
///
/// # Example
///
/// ```
/// use resource_sdk::{BoxError, Context, NoParams, Operation, Resource, Validate, exec};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Default, Deserialize)]
/// struct Source {}
/// impl Validate for Source {}
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Version {
///     id: String,
/// }
/// impl Validate for Version {}
///
/// struct Fixed;
///
/// impl Resource for Fixed {
///     type Source = Source;
///     type Version = Version;
///     type GetParams = NoParams;
///     type PutParams = NoParams;
///
///     fn check(
///         &mut self,
///         _ctx: &Context,
///         _source: &Source,
///         _version: Option<&Version>,
///     ) -> Result<Vec<Version>, BoxError> {
///         Ok(vec![Version { id: "1".into() }])
///     }
/// }
///
/// let ctx = Context::new(Vec::new());
/// let mut stdout = Vec::new();
/// exec(&ctx, Operation::Check, &mut Fixed, &mut &b"{}"[..], &mut stdout, &[])
///     .expect("check succeeds");
/// assert_eq!(stdout, b"[{\"id\":\"1\"}]\n");
/// ```
pub fn exec<R: Resource>(
    ctx: &Context,
    operation: Operation,
    resource: &mut R,
    stdin: &mut impl Read,
    stdout: &mut impl Write,
    args: &[OsString],
) -> Result<(), ExecError> {
    debug!(target: DISPATCH_TARGET, %operation, "validating resource signatures");
    validate_signatures::<R>(operation)?;
    let target = Target::resolve(operation, args)?;

    let mut input = Vec::new();
    stdin
        .read_to_end(&mut input)
        .map_err(|source| ExecError::ReadInput {
            source: Arc::new(source),
        })?;
    let request = Request::parse(&input).map_err(|source| ExecError::InvalidJson { source })?;

    info!(target: DISPATCH_TARGET, %operation, "running action");
    let response = match target {
        Target::Check => check(ctx, resource, &request)?,
        Target::Fetch(workspace) => fetch(ctx, resource, &request, &workspace)?,
        Target::Publish(workspace) => publish(ctx, resource, &request, &workspace)?,
    };

    stdout
        .write_all(&response)
        .and_then(|()| stdout.flush())
        .map_err(|source| ExecError::WriteResponse {
            source: Arc::new(source),
        })?;
    debug!(target: DISPATCH_TARGET, %operation, "response written");
    Ok(())
}

fn check<R: Resource>(
    ctx: &Context,
    res: &mut R,
    request: &Request<'_>,
) -> Result<Vec<u8>, ExecError> {
    let (source, known) = check_inputs::<R>(ctx, request)?;
    let mut guard = ResourceGuard::new(ctx, res);
    guard.initialize(&source)?;
    let mut session = ArchiveSession::new(ctx, guard.open_archive(&source)?);

    let history = fetch_history(ctx, &mut session, known.as_ref())?;
    let version = known.map_or_else(|| adopt_latest(ctx, &history), |given| Ok(Some(given)))?;
    let strategy = shield(|| session.fingerprint())?;
    let ledger = Ledger::replay(ctx, strategy, &history)?;

    let fresh = guard.call("check", |handler| {
        handler.check(ctx, &source, version.as_ref())
    })?;
    let reconciled = ledger.record(fresh)?;
    archive_new(ctx, &mut session, &reconciled.unarchived)?;
    respond(&reconciled.versions)
}

fn fetch<R: Resource>(
    ctx: &Context,
    res: &mut R,
    request: &Request<'_>,
    workspace: &Workspace,
) -> Result<Vec<u8>, ExecError> {
    let (source, requested, params) = fetch_inputs::<R>(ctx, request)?;
    let mut guard = ResourceGuard::new(ctx, res);
    guard.initialize(&source)?;

    let output = guard.call("in", |handler| {
        handler.get(ctx, &source, &requested, workspace, &params)
    })?;
    let (returned, metadata) = output.into_parts();
    respond(&Response::new(returned.unwrap_or(requested), metadata))
}

fn publish<R: Resource>(
    ctx: &Context,
    res: &mut R,
    request: &Request<'_>,
    workspace: &Workspace,
) -> Result<Vec<u8>, ExecError> {
    let (source, params) = publish_inputs::<R>(ctx, request)?;
    let mut guard = ResourceGuard::new(ctx, res);
    guard.initialize(&source)?;
    let mut session = ArchiveSession::new(ctx, guard.open_archive(&source)?);

    let output = guard.call("out", |handler| {
        handler.put(ctx, &source, workspace, &params)
    })?;
    let (published, metadata) = output.into_parts();
    let Some(version) = published else {
        return Err(ExecError::MissingVersion);
    };
    archive_published(ctx, &mut session, &version)?;
    respond(&Response::new(version, metadata))
}

fn fetch_history<V: Serialize>(
    ctx: &Context,
    session: &mut ArchiveSession<'_>,
    known: Option<&V>,
) -> Result<Vec<Vec<u8>>, ExecError> {
    let Some(archive) = session.archive() else {
        return Ok(Vec::new());
    };
    let latest = known
        .map(serde_json::to_vec)
        .transpose()
        .map_err(|source| ExecError::SerializeLatest { source })?;
    info!(
        target: DISPATCH_TARGET,
        hinted = latest.is_some(),
        "fetching archived resource version history"
    );
    shield(|| archive.history(ctx, latest))?
        .map_err(|source| ExecError::ArchiveHistory { source })
}

fn adopt_latest<V>(ctx: &Context, history: &[Vec<u8>]) -> Result<Option<V>, ExecError>
where
    V: DeserializeOwned + Validate,
{
    let Some(latest) = history.last() else {
        return Ok(None);
    };
    info!(
        target: DISPATCH_TARGET,
        "using existing resource version from version history"
    );
    materialize_bytes(ctx, latest)
        .map(Some)
        .map_err(|source| ExecError::ArchivedLatest { source })
}

fn archive_new(
    ctx: &Context,
    session: &mut ArchiveSession<'_>,
    batch: &[Vec<u8>],
) -> Result<(), ExecError> {
    let Some(archive) = session.archive().filter(|_| !batch.is_empty()) else {
        return Ok(());
    };
    info!(target: DISPATCH_TARGET, count = batch.len(), "archiving new versions");
    shield(|| archive.put(ctx, batch))?
        .map_err(|source| ExecError::ArchivePutVersions { source })
}

fn archive_published<V: Serialize>(
    ctx: &Context,
    session: &mut ArchiveSession<'_>,
    version: &V,
) -> Result<(), ExecError> {
    let Some(archive) = session.archive() else {
        return Ok(());
    };
    let serialized = serde_json::to_vec(version)
        .map_err(|source| ReconcileError::SerializeVersion { source })?;
    info!(target: DISPATCH_TARGET, "archiving new version");
    shield(|| archive.put(ctx, &[serialized]))?
        .map_err(|source| ExecError::ArchivePutVersion { source })
}

fn respond<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, ExecError> {
    encode(value).map_err(|source| ExecError::SerializeResponse { source })
}

fn tag<T>(argument: Argument, result: Result<T, InputError>) -> Result<T, ArgumentError> {
    result.map_err(|source| ArgumentError { argument, source })
}

fn gather(failures: impl IntoIterator<Item = Option<ArgumentError>>) -> InputErrors {
    InputErrors::new(failures.into_iter().flatten().collect())
}

type CheckInputs<R> = (<R as Resource>::Source, Option<<R as Resource>::Version>);
type FetchInputs<R> = (
    <R as Resource>::Source,
    <R as Resource>::Version,
    <R as Resource>::GetParams,
);
type PublishInputs<R> = (<R as Resource>::Source, <R as Resource>::PutParams);

fn check_inputs<R: Resource>(
    ctx: &Context,
    request: &Request<'_>,
) -> Result<CheckInputs<R>, InputErrors> {
    let source_input = tag(Argument::Source, materialize(ctx, request.source(), false));
    let version_input = tag(
        Argument::Version,
        materialize_optional(ctx, request.version()),
    );
    match (source_input, version_input) {
        (Ok(source), Ok(version)) => Ok((source, version)),
        (source_result, version_result) => {
            Err(gather([source_result.err(), version_result.err()]))
        }
    }
}

fn fetch_inputs<R: Resource>(
    ctx: &Context,
    request: &Request<'_>,
) -> Result<FetchInputs<R>, InputErrors> {
    let source_input = tag(Argument::Source, materialize(ctx, request.source(), false));
    let version_input = tag(
        Argument::Version,
        materialize_required(ctx, request.version()),
    );
    let params_input = tag(Argument::Params, materialize(ctx, request.params(), false));
    match (source_input, version_input, params_input) {
        (Ok(source), Ok(version), Ok(params)) => Ok((source, version, params)),
        (source_result, version_result, params_result) => Err(gather([
            source_result.err(),
            version_result.err(),
            params_result.err(),
        ])),
    }
}

fn publish_inputs<R: Resource>(
    ctx: &Context,
    request: &Request<'_>,
) -> Result<PublishInputs<R>, InputErrors> {
    let source_input = tag(Argument::Source, materialize(ctx, request.source(), false));
    let params_input = tag(Argument::Params, materialize(ctx, request.params(), false));
    match (source_input, params_input) {
        (Ok(source), Ok(params)) => Ok((source, params)),
        (source_result, params_result) => {
            Err(gather([source_result.err(), params_result.err()]))
        }
    }
}
