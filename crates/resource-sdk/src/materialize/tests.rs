//! Unit tests for argument materialization.

use rstest::{fixture, rstest};
use serde::Deserialize;

use super::*;

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
struct Version {
    #[serde(default)]
    id: String,
}

impl Validate for Version {
    fn validate(&self, _ctx: &Context) -> Result<(), BoxError> {
        if self.id.is_empty() {
            return Err("id is required".into());
        }
        if !self.id.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("id must be numeric, got {}", self.id).into());
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
struct Params {
    #[serde(default)]
    color: String,
}

impl Validate for Params {}

#[fixture]
fn ctx() -> Context {
    Context::new(Vec::new())
}

fn raw(json: &str) -> Box<RawValue> {
    RawValue::from_string(json.to_owned()).expect("valid raw json")
}

#[rstest]
fn decodes_present_fragment(ctx: Context) {
    let fragment = raw(r#"{"id":"123456"}"#);
    let version: Version = materialize(&ctx, Some(&fragment), true).expect("materialize");
    assert_eq!(version.id, "123456");
}

#[rstest]
#[case::absent(None)]
#[case::null(Some("null"))]
fn required_absent_fragment_is_missing(ctx: Context, #[case] json: Option<&str>) {
    let fragment = json.map(raw);
    let err = materialize::<Version>(&ctx, fragment.as_deref(), true)
        .expect_err("absent required input should fail");
    assert!(matches!(err, InputError::Missing));
    assert_eq!(err.to_string(), "missing required input");
}

#[rstest]
#[case::absent(None)]
#[case::null(Some("null"))]
fn optional_absent_fragment_yields_zero_value(ctx: Context, #[case] json: Option<&str>) {
    let fragment = json.map(raw);
    let params: Params = materialize(&ctx, fragment.as_deref(), false).expect("materialize");
    assert_eq!(params, Params::default());
}

#[rstest]
fn zero_value_is_still_validated(ctx: Context) {
    let err = materialize::<Version>(&ctx, None, false).expect_err("zero value is invalid");
    assert!(matches!(err, InputError::Invalid { .. }));
    assert!(err.to_string().contains("id is required"), "got: {err}");
}

#[rstest]
#[case::wrong_field_type(r#"{"id":5}"#)]
#[case::not_an_object(r#""text""#)]
fn type_mismatch_is_a_decode_error(ctx: Context, #[case] json: &str) {
    let fragment = raw(json);
    let err = materialize::<Version>(&ctx, Some(&fragment), false)
        .expect_err("mismatched input should fail");
    assert!(matches!(err, InputError::Decode { .. }));
    assert!(
        err.to_string().starts_with("error unmarshalling input: "),
        "got: {err}"
    );
}

#[rstest]
fn validation_failure_preserves_message(ctx: Context) {
    let fragment = raw(r#"{"id":"foo"}"#);
    let err = materialize::<Version>(&ctx, Some(&fragment), true)
        .expect_err("non-numeric id should fail");
    assert_eq!(err.to_string(), "invalid input: id must be numeric, got foo");
}

#[rstest]
fn optional_materialization_skips_absent_values(ctx: Context) {
    let version: Option<Version> = materialize_optional(&ctx, None).expect("materialize");
    assert!(version.is_none());
    let null = raw("null");
    let version: Option<Version> = materialize_optional(&ctx, Some(&null)).expect("materialize");
    assert!(version.is_none());
}

#[rstest]
fn optional_materialization_validates_present_values(ctx: Context) {
    let fragment = raw(r#"{"id":""}"#);
    let err = materialize_optional::<Version>(&ctx, Some(&fragment))
        .expect_err("empty id should fail");
    assert!(matches!(err, InputError::Invalid { .. }));
}

#[rstest]
fn required_materialization_reports_missing(ctx: Context) {
    let err = materialize_required::<Version>(&ctx, None).expect_err("missing");
    assert!(matches!(err, InputError::Missing));
}

#[rstest]
fn archived_bytes_are_decoded_and_validated(ctx: Context) {
    let version: Version = materialize_bytes(&ctx, br#"{"id":"7"}"#).expect("decode");
    assert_eq!(version.id, "7");
    let err = materialize_bytes::<Version>(&ctx, br#"{"id":"x"}"#).expect_err("invalid");
    assert!(matches!(err, InputError::Invalid { .. }));
}
