//! Process entrypoints for resource binaries.

use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::process::ExitCode;

use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{debug, warn};

use crate::action::Operation;
use crate::config::RuntimeConfig;
use crate::context::{CancellationToken, Context};
use crate::dispatch::exec;
use crate::resource::Resource;
use crate::telemetry;

const ENTRYPOINT_TARGET: &str = "resource_sdk::entrypoint";

/// Runs `operation` as a resource process and returns its exit status.
///
/// Reads runtime settings from the environment, installs telemetry, turns
/// SIGINT and SIGTERM into cancellation, then dispatches with the process's
/// standard streams and arguments.
///
/// # Example
///
/// ```no_run
/// use std::process::ExitCode;
/// # use resource_sdk::{BoxError, Context, NoParams, Resource};
/// # struct Git;
/// # impl Resource for Git {
/// #     type Source = NoParams;
/// #     type Version = serde_json::Value;
/// #     type GetParams = NoParams;
/// #     type PutParams = NoParams;
/// #     fn check(
/// #         &mut self,
/// #         _ctx: &Context,
/// #         _source: &NoParams,
/// #         _version: Option<&serde_json::Value>,
/// #     ) -> Result<Vec<serde_json::Value>, BoxError> {
/// #         Ok(Vec::new())
/// #     }
/// # }
///
/// fn main() -> ExitCode {
///     resource_sdk::main(resource_sdk::Operation::Check, Git)
/// }
/// ```
#[must_use]
pub fn main<R: Resource>(operation: Operation, resource: R) -> ExitCode {
    let mut handler = resource;
    let config = match RuntimeConfig::from_env() {
        Ok(config) => config,
        Err(error) => return fail(&mut io::stderr(), &error),
    };
    if let Err(error) = telemetry::initialise(&config) {
        return fail(&mut io::stderr(), &error);
    }

    let token = CancellationToken::new();
    for signal in [SIGINT, SIGTERM] {
        if let Err(error) = signal_hook::flag::register(signal, token.flag()) {
            warn!(target: ENTRYPOINT_TARGET, signal, %error, "failed to register signal handler");
        }
    }
    let ctx = Context::stderr().with_cancellation(token);

    run(
        &ctx,
        operation,
        &mut handler,
        std::env::args_os(),
        &mut io::stdin().lock(),
        &mut io::stdout().lock(),
        &mut io::stderr(),
    )
}

/// Dispatches one invocation and converts the outcome into an exit status.
///
/// `args` includes the program name, as [`std::env::args_os`] does. On
/// failure the error is written to `stderr` as a single line.
#[must_use]
pub fn run<R, A, I, O, E>(
    ctx: &Context,
    operation: Operation,
    resource: &mut R,
    args: A,
    stdin: &mut I,
    stdout: &mut O,
    stderr: &mut E,
) -> ExitCode
where
    R: Resource,
    A: IntoIterator<Item = OsString>,
    I: Read,
    O: Write,
    E: Write,
{
    let positional: Vec<OsString> = args.into_iter().skip(1).collect();
    match exec(ctx, operation, resource, stdin, stdout, &positional) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => fail(stderr, &error),
    }
}

fn fail(stderr: &mut impl Write, error: &dyn std::error::Error) -> ExitCode {
    debug!(target: ENTRYPOINT_TARGET, %error, "invocation failed");
    writeln!(stderr, "{error}").ok();
    ExitCode::FAILURE
}
