//! Unit tests for the invocation context.

use std::io::Write;

use rstest::rstest;

use super::*;
use crate::testing::capturing_context;

#[test]
fn new_token_is_not_cancelled() {
    let token = CancellationToken::new();
    assert!(!token.is_cancelled());
}

#[test]
fn cancel_is_visible_through_clones() {
    let token = CancellationToken::new();
    let clone = token.clone();
    token.cancel();
    assert!(clone.is_cancelled());
}

#[test]
fn setting_the_raw_flag_cancels_the_token() {
    let token = CancellationToken::new();
    token.flag().store(true, Ordering::SeqCst);
    assert!(token.is_cancelled());
}

#[test]
fn context_observes_installed_token() {
    let token = CancellationToken::new();
    let ctx = Context::new(Vec::new()).with_cancellation(token.clone());
    assert!(!ctx.is_cancelled());
    token.cancel();
    assert!(ctx.is_cancelled());
}

#[rstest]
#[case::single_line(&["archiving new version"], "archiving new version\n")]
#[case::multiple_lines(&["one", "two"], "one\ntwo\n")]
fn diagnostics_reach_the_configured_writer(#[case] lines: &[&str], #[case] expected: &str) {
    let (ctx, buffer) = capturing_context();
    for line in lines {
        writeln!(ctx.diagnostics(), "{line}").expect("write diagnostics");
    }
    assert_eq!(buffer.text(), expected);
}

#[test]
fn clones_share_the_diagnostic_stream() {
    let (ctx, buffer) = capturing_context();
    let clone = ctx.clone();
    write!(clone.diagnostics(), "from clone").expect("write diagnostics");
    assert_eq!(buffer.text(), "from clone");
}

#[test]
fn report_appends_a_line() {
    let (ctx, buffer) = capturing_context();
    ctx.report(format_args!("error closing archive: {}", "disk full"));
    ctx.report(format_args!("done"));
    assert_eq!(buffer.text(), "error closing archive: disk full\ndone\n");
}

#[test]
fn debug_output_omits_the_writer() {
    let ctx = Context::new(Vec::new());
    let rendered = format!("{ctx:?}");
    assert!(rendered.contains("Context"), "unexpected debug output: {rendered}");
}
