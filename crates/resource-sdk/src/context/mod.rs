//! Invocation context threaded through every handler call.
//!
//! A [`Context`] carries two things: a [`CancellationToken`] that signal
//! handlers (or callers) flip when the orchestrator asks the resource to stop,
//! and the diagnostic stream. The diagnostic stream is the only channel a
//! handler may use for human-readable output, because standard output is
//! reserved for the protocol response.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

const CONTEXT_TARGET: &str = "resource_sdk::context";

/// Shared, cloneable cancellation flag.
///
/// Cancellation is advisory. The dispatcher checks the token before invoking
/// a handler; handlers that block for long periods should poll
/// [`CancellationToken::is_cancelled`] themselves.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the token as cancelled.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called or a
    /// registered signal has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Returns the underlying flag so signal handlers can set it directly.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Invocation context passed as the first argument to every handler.
///
/// Cloning a context is cheap; clones share the cancellation flag and the
/// diagnostic writer.
///
/// # Example
///
/// ```
/// use std::io::Write;
/// use resource_sdk::Context;
///
/// let ctx = Context::new(Vec::new());
/// writeln!(ctx.diagnostics(), "fetching artefact").expect("write");
/// assert!(!ctx.is_cancelled());
/// ```
#[derive(Clone)]
pub struct Context {
    cancellation: CancellationToken,
    diagnostics: SharedWriter,
}

impl Context {
    /// Creates a context writing diagnostics to `writer`.
    #[must_use]
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            cancellation: CancellationToken::new(),
            diagnostics: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Creates a context writing diagnostics to the process standard error.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Replaces the cancellation token, typically with one wired to signals.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns the cancellation token shared by this context.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns `true` when the invocation has been asked to stop.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Locks and returns the diagnostic stream for the duration of the guard.
    ///
    /// A poisoned lock is recovered, so diagnostics written after a handler
    /// panic still reach the stream.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics<'_> {
        let guard = match self.diagnostics.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Diagnostics { guard }
    }

    /// Writes one line to the diagnostic stream, logging a failed write.
    pub fn report(&self, message: fmt::Arguments<'_>) {
        if let Err(error) = writeln!(self.diagnostics(), "{message}") {
            warn!(target: CONTEXT_TARGET, %error, "failed to write diagnostic");
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancellation", &self.cancellation)
            .finish_non_exhaustive()
    }
}

/// Scoped, locked access to the diagnostic stream.
pub struct Diagnostics<'a> {
    guard: MutexGuard<'a, Box<dyn Write + Send>>,
}

impl Write for Diagnostics<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.guard.flush()
    }
}

#[cfg(test)]
mod tests;
