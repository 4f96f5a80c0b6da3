//! The boundary between the dispatcher and resource code.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use super::DISPATCH_TARGET;
use crate::archive::Archive;
use crate::context::Context;
use crate::error::{BoxError, ExecError};
use crate::resource::Resource;

/// How a call into resource code ended.
#[derive(Debug)]
pub enum Invocation<T> {
    /// The handler returned a value.
    Returned(T),
    /// The handler returned an error.
    Failed(BoxError),
    /// The handler panicked; carries the panic message.
    Panicked(String),
}

impl<T> Invocation<T> {
    /// Runs `call`, catching any panic it raises.
    pub fn capture(call: impl FnOnce() -> Result<T, BoxError>) -> Self {
        match panic::catch_unwind(AssertUnwindSafe(call)) {
            Ok(Ok(value)) => Self::Returned(value),
            Ok(Err(error)) => Self::Failed(error),
            Err(payload) => Self::Panicked(describe(payload.as_ref())),
        }
    }

    /// Converts the outcome, wrapping failures with the action name.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Handler`] or [`ExecError::Panicked`].
    pub fn into_result(self, action: &'static str) -> Result<T, ExecError> {
        self.map_failure(action, |source| ExecError::Handler { action, source })
    }

    fn map_failure(
        self,
        action: &'static str,
        failed: impl FnOnce(BoxError) -> ExecError,
    ) -> Result<T, ExecError> {
        match self {
            Self::Returned(value) => Ok(value),
            Self::Failed(source) => Err(failed(source)),
            Self::Panicked(message) => Err(ExecError::Panicked { action, message }),
        }
    }
}

/// Calls into an archive backend, turning a panic into
/// [`ExecError::Panicked`] for the `archive` action.
pub(super) fn shield<T>(call: impl FnOnce() -> T) -> Result<T, ExecError> {
    panic::catch_unwind(AssertUnwindSafe(call)).map_err(|payload| {
        let message = describe(payload.as_ref());
        warn!(target: DISPATCH_TARGET, %message, "archive backend panicked");
        ExecError::Panicked {
            action: "archive",
            message,
        }
    })
}

fn describe(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("unknown panic payload"))
}

/// Holds the resource for one invocation and closes it on drop.
pub(super) struct ResourceGuard<'a, R: Resource> {
    ctx: &'a Context,
    resource: &'a mut R,
}

impl<'a, R: Resource> ResourceGuard<'a, R> {
    pub(super) const fn new(ctx: &'a Context, resource: &'a mut R) -> Self {
        Self { ctx, resource }
    }

    pub(super) fn initialize(&mut self, source: &R::Source) -> Result<(), ExecError> {
        let ctx = self.ctx;
        let resource = &mut *self.resource;
        Invocation::capture(|| resource.initialize(ctx, source))
            .map_failure("initialize", |cause| ExecError::Initialize { source: cause })
    }

    pub(super) fn open_archive(
        &mut self,
        source: &R::Source,
    ) -> Result<Option<Box<dyn Archive>>, ExecError> {
        let ctx = self.ctx;
        let resource = &mut *self.resource;
        Invocation::capture(|| resource.archive(ctx, source))
            .map_failure("archive", |cause| ExecError::ArchiveInit { source: cause })
    }

    /// Invokes a handler unless the invocation has been cancelled.
    pub(super) fn call<T>(
        &mut self,
        action: &'static str,
        handler: impl FnOnce(&mut R) -> Result<T, BoxError>,
    ) -> Result<T, ExecError> {
        if self.ctx.is_cancelled() {
            warn!(target: DISPATCH_TARGET, action, "cancelled before invoking handler");
            return Err(ExecError::Cancelled);
        }
        let resource = &mut *self.resource;
        Invocation::capture(|| handler(resource)).into_result(action)
    }
}

impl<R: Resource> Drop for ResourceGuard<'_, R> {
    fn drop(&mut self) {
        let ctx = self.ctx;
        let resource = &mut *self.resource;
        let error = match Invocation::capture(|| resource.close(ctx)) {
            Invocation::Returned(()) => {
                debug!(target: DISPATCH_TARGET, "resource closed");
                return;
            }
            Invocation::Failed(error) => error.to_string(),
            Invocation::Panicked(message) => format!("close panicked: {message}"),
        };
        warn!(target: DISPATCH_TARGET, %error, "error closing resource");
        ctx.report(format_args!("error closing resource: {error}"));
    }
}
