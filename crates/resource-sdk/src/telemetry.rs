//! Structured telemetry initialisation for resource processes.
//!
//! Standard output carries the protocol response, so the process subscriber
//! writes to standard error. The SDK logs under `resource_sdk::*` targets,
//! which the configured filter can address one subsystem at a time, e.g.
//! `RESOURCE_LOG_FILTER=warn,resource_sdk::archive=debug`.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, MakeWriter};

use crate::config::{LogFormat, RuntimeConfig};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

type BoxedSubscriber = Box<dyn Subscriber + Send + Sync>;

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Later calls return a fresh [`TelemetryHandle`] without touching the global
/// state again.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparsable filter directive and
/// [`TelemetryError::Subscriber`] when another subscriber is already
/// installed.
pub fn initialise(config: &RuntimeConfig) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| {
            let subscriber = build_subscriber(config, io::stderr, io::stderr().is_terminal())?;
            tracing::subscriber::set_global_default(subscriber)
                .map_err(TelemetryError::Subscriber)
        })
        .map(|_| TelemetryHandle)
}

/// Builds the subscriber for `config` without installing it.
///
/// Colour codes are emitted only when `ansi` is set; JSON output never
/// carries them.
pub(crate) fn build_subscriber<W>(
    config: &RuntimeConfig,
    writer: W,
    ansi: bool,
) -> Result<BoxedSubscriber, TelemetryError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(writer)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: BoxedSubscriber = match config.log_format() {
        LogFormat::Json => Box::new(builder.with_ansi(false).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.with_ansi(ansi).compact().finish()),
    };
    Ok(subscriber)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tracing::{debug, info, warn};

    use super::*;
    use crate::config::{LOG_FILTER_ENV, LOG_FORMAT_ENV};
    use crate::testing::SharedBuffer;

    fn config(filter: &str, format: &str) -> RuntimeConfig {
        RuntimeConfig::from_lookup(|name| match name {
            LOG_FILTER_ENV => Some(filter.to_owned()),
            LOG_FORMAT_ENV => Some(format.to_owned()),
            _ => None,
        })
        .expect("config")
    }

    /// Emits one event on each of two SDK targets and returns the log text.
    fn capture(config: &RuntimeConfig, ansi: bool) -> String {
        let buffer = SharedBuffer::new();
        let sink = buffer.clone();
        let subscriber =
            build_subscriber(config, move || sink.clone(), ansi).expect("subscriber");
        tracing::subscriber::with_default(subscriber, || {
            info!(target: "resource_sdk::dispatch", operation = "check", "dispatching");
            debug!(target: "resource_sdk::archive", "archive closed");
        });
        buffer.text()
    }

    #[test]
    fn initialise_is_idempotent() {
        let config = RuntimeConfig::default();
        initialise(&config).expect("first initialisation");
        initialise(&config).expect("second initialisation");
    }

    #[test]
    fn invalid_filter_is_reported() {
        let err = build_subscriber(&config("sdk=loudest", "compact"), io::sink, false)
            .err()
            .expect("invalid filter");
        assert!(matches!(err, TelemetryError::Filter(_)));
    }

    #[rstest]
    #[case::default_level("info", true, false)]
    #[case::archive_verbose("info,resource_sdk::archive=debug", true, true)]
    #[case::dispatch_silenced("debug,resource_sdk::dispatch=off", false, true)]
    fn filter_scopes_sdk_targets(
        #[case] filter: &str,
        #[case] dispatch: bool,
        #[case] archive: bool,
    ) {
        let text = capture(&config(filter, "compact"), false);
        assert_eq!(text.contains("dispatching"), dispatch, "got: {text}");
        assert_eq!(text.contains("archive closed"), archive, "got: {text}");
    }

    #[test]
    fn json_lines_carry_the_target_and_fields() {
        let text = capture(&config("info", "json"), true);
        let line = text.lines().next().expect("one log line");
        let event: serde_json::Value = serde_json::from_str(line).expect("json log line");
        assert_eq!(event["target"], "resource_sdk::dispatch");
        assert_eq!(event["level"], "INFO");
        assert_eq!(event["message"], "dispatching");
        assert_eq!(event["operation"], "check");
        assert!(!text.contains('\u{1b}'), "got: {text}");
    }

    #[rstest]
    #[case::plain(false)]
    #[case::coloured(true)]
    fn compact_colour_follows_the_terminal(#[case] ansi: bool) {
        let text = capture(&config("info", "compact"), ansi);
        assert!(text.contains("resource_sdk::dispatch"), "got: {text}");
        assert_eq!(text.contains('\u{1b}'), ansi, "got: {text}");
    }

    #[test]
    fn warnings_reach_the_supplied_writer_only() {
        let buffer = SharedBuffer::new();
        let sink = buffer.clone();
        let subscriber = build_subscriber(&config("warn", "compact"), move || sink.clone(), false)
            .expect("subscriber");
        tracing::subscriber::with_default(subscriber, || {
            warn!(target: "resource_sdk::context", "diagnostics write failed");
        });
        let text = buffer.text();
        assert_eq!(text.lines().count(), 1, "got: {text}");
        assert!(text.contains("WARN"), "got: {text}");
    }
}
