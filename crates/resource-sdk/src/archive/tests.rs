//! Unit tests for the archive contract, configuration and memory backend.

use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::testing::capturing_context;
use crate::tests::MockBackend;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[fixture]
fn ctx() -> Context {
    Context::new(Vec::new())
}

fn seeded(settings: Settings) -> MemoryArchive {
    MemoryArchive::with_history([r#"{"id":"1"}"#, r#"{"id":"2"}"#], settings)
}

fn bytes(json: &str) -> Vec<u8> {
    json.as_bytes().to_vec()
}

// ---------------------------------------------------------------------------
// Memory backend
// ---------------------------------------------------------------------------

#[rstest]
fn history_without_hint_returns_everything(ctx: Context) {
    let mut archive = seeded(Settings::default());
    let history = archive.history(&ctx, None).expect("history");
    assert_eq!(history, vec![bytes(r#"{"id":"1"}"#), bytes(r#"{"id":"2"}"#)]);
}

#[rstest]
#[case::hint_respected(false, 0)]
#[case::forced(true, 2)]
fn latest_hint_follows_force_history(
    ctx: Context,
    #[case] force_history: bool,
    #[case] expected: usize,
) {
    let settings = Settings {
        force_history,
        ..Settings::default()
    };
    let mut archive = seeded(settings);
    let history = archive
        .history(&ctx, Some(bytes(r#"{"id":"2"}"#)))
        .expect("history");
    assert_eq!(history.len(), expected);
}

#[rstest]
fn put_appends_in_order_and_skips_known_entries(ctx: Context) {
    let mut archive = seeded(Settings::default());
    archive
        .put(
            &ctx,
            &[
                bytes(r#"{"id":"2"}"#),
                bytes(r#"{"id":"3"}"#),
                bytes(r#"{"id":"3"}"#),
                bytes(r#"{"id":"4"}"#),
            ],
        )
        .expect("put");
    assert_eq!(
        archive.entries_lossy(),
        vec![
            r#"{"id":"1"}"#,
            r#"{"id":"2"}"#,
            r#"{"id":"3"}"#,
            r#"{"id":"4"}"#
        ]
    );
}

#[rstest]
#[case::md5(FingerprintStrategy::Md5)]
#[case::sha256(FingerprintStrategy::Sha256)]
fn repeated_puts_are_idempotent(ctx: Context, #[case] fingerprint: FingerprintStrategy) {
    let mut archive = MemoryArchive::new(Settings {
        fingerprint,
        ..Settings::default()
    });
    let batch = [bytes(r#"{"id":"a"}"#), bytes(r#"{"id":"b"}"#)];
    archive.put(&ctx, &batch).expect("first put");
    let after_first = archive.entries();
    archive.put(&ctx, &batch).expect("second put");
    assert_eq!(archive.entries(), after_first);
    assert_eq!(archive.fingerprint(), fingerprint);
}

#[rstest]
fn clones_share_storage(ctx: Context) {
    let observer = MemoryArchive::default();
    let mut writer = observer.clone();
    writer.put(&ctx, &[bytes(r#"{"id":"9"}"#)]).expect("put");
    assert_eq!(observer.entries_lossy(), vec![r#"{"id":"9"}"#]);
}

#[rstest]
fn closed_handle_rejects_use(ctx: Context) {
    let mut archive = seeded(Settings::default());
    archive.close(&ctx).expect("close");
    assert!(archive.is_closed());
    assert!(matches!(
        archive.history(&ctx, None),
        Err(ArchiveError::Closed)
    ));
    assert!(matches!(
        archive.put(&ctx, &[bytes("{}")]),
        Err(ArchiveError::Closed)
    ));
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[rstest]
fn config_decodes_flattened_settings() {
    let config = ArchiveConfig::from_value(json!({
        "force_history": true,
        "fingerprint": "sha256",
        "inmem": { "history": [r#"{"id":"1"}"#] }
    }))
    .expect("decode config");

    assert!(config.settings.force_history);
    assert_eq!(config.settings.fingerprint, FingerprintStrategy::Sha256);
    assert_eq!(
        config.inmem,
        Some(MemoryConfig {
            history: vec![r#"{"id":"1"}"#.to_owned()]
        })
    );
}

#[rstest]
fn memory_alias_is_accepted() {
    let config = ArchiveConfig::from_value(json!({ "memory": {} })).expect("decode config");
    assert_eq!(config.inmem, Some(MemoryConfig::default()));
    assert_eq!(config.settings, Settings::default());
}

#[rstest]
fn open_without_backend_fails() {
    let err = ArchiveConfig::default()
        .open()
        .err()
        .expect("no backend configured");
    assert!(matches!(err, ArchiveError::NoProvider));
    assert_eq!(err.to_string(), "no valid provider config found");
}

#[rstest]
fn invalid_config_is_reported() {
    let err = ArchiveConfig::from_value(json!({ "force_history": "yes" }))
        .expect_err("wrong type");
    assert!(err.to_string().starts_with("invalid config: "), "got: {err}");
}

#[rstest]
fn opened_memory_archive_serves_seeded_history(ctx: Context) {
    let config = ArchiveConfig::from_value(json!({
        "inmem": { "history": [r#"{"id":"1"}"#] }
    }))
    .expect("decode config");
    let mut archive = config.open().expect("open archive");
    let history = archive.history(&ctx, None).expect("history");
    assert_eq!(history, vec![bytes(r#"{"id":"1"}"#)]);
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[rstest]
fn session_closes_the_archive_once_on_drop() {
    let (ctx, diagnostics) = capturing_context();
    let mut backend = MockBackend::new();
    backend.expect_close().times(1).returning(|_| Ok(()));
    backend
        .expect_fingerprint()
        .return_const(FingerprintStrategy::Sha256);

    {
        let session = ArchiveSession::new(&ctx, Some(Box::new(backend)));
        assert!(session.is_configured());
        assert_eq!(session.fingerprint(), FingerprintStrategy::Sha256);
    }

    assert_eq!(diagnostics.text(), "");
}

#[rstest]
fn session_reports_close_failures_to_diagnostics() {
    let (ctx, diagnostics) = capturing_context();
    let mut backend = MockBackend::new();
    backend
        .expect_close()
        .times(1)
        .returning(|_| Err(ArchiveError::backend("bucket unavailable")));

    drop(ArchiveSession::new(&ctx, Some(Box::new(backend))));

    assert_eq!(
        diagnostics.text(),
        "error closing archive: bucket unavailable\n"
    );
}

#[rstest]
fn empty_session_uses_default_fingerprint(ctx: Context) {
    let mut session = ArchiveSession::new(&ctx, None);
    assert!(!session.is_configured());
    assert!(session.archive().is_none());
    assert_eq!(session.fingerprint(), FingerprintStrategy::Md5);
}

#[rstest]
fn session_forwards_calls_to_the_archive() {
    let (ctx, _) = capturing_context();
    let mut backend = MockBackend::new();
    backend
        .expect_put()
        .withf(|_, versions| versions == [br#"{"id":"1"}"#.to_vec()])
        .times(1)
        .returning(|_, _| Ok(()));
    backend.expect_close().times(1).returning(|_| Ok(()));

    let mut session = ArchiveSession::new(&ctx, Some(Box::new(backend)));
    session
        .archive()
        .expect("configured")
        .put(&ctx, &[bytes(r#"{"id":"1"}"#)])
        .expect("put");
}
