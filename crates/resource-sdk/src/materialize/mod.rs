//! Turns raw request fragments into typed, validated arguments.
//!
//! A fragment is a borrowed [`RawValue`] slice of the request buffer. The
//! materializer decodes it into the handler's declared type, or builds the
//! zero value when the fragment is absent and the argument is optional, then
//! runs the type's [`Validate`] hook.

use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use thiserror::Error;

use crate::context::Context;
use crate::error::BoxError;
use crate::validate::Validate;

/// Why a single argument could not be materialized.
#[derive(Debug, Error)]
pub enum InputError {
    /// A required argument was absent or `null`.
    #[error("missing required input")]
    Missing,

    /// The fragment did not decode into the declared type.
    #[error("error unmarshalling input: {source}")]
    Decode {
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// The type's validation hook rejected the value.
    #[error("invalid input: {source}")]
    Invalid {
        /// Error returned by the hook.
        #[source]
        source: BoxError,
    },
}

/// Materializes an argument whose zero value is acceptable.
///
/// # Errors
///
/// Returns [`InputError::Missing`] when `required` is set and the fragment is
/// absent or `null`, [`InputError::Decode`] when decoding fails, and
/// [`InputError::Invalid`] when validation fails.
pub fn materialize<T>(
    ctx: &Context,
    fragment: Option<&RawValue>,
    required: bool,
) -> Result<T, InputError>
where
    T: DeserializeOwned + Default + Validate,
{
    let value = match present(fragment) {
        Some(raw) => decode(raw)?,
        None if required => return Err(InputError::Missing),
        None => T::default(),
    };
    validate(ctx, value)
}

/// Materializes an argument that is optional and has no zero value.
///
/// Absent and `null` fragments yield `None` without running validation.
///
/// # Errors
///
/// Returns [`InputError::Decode`] or [`InputError::Invalid`] for a present
/// fragment that fails to decode or validate.
pub fn materialize_optional<T>(
    ctx: &Context,
    fragment: Option<&RawValue>,
) -> Result<Option<T>, InputError>
where
    T: DeserializeOwned + Validate,
{
    present(fragment)
        .map(|raw| decode(raw).and_then(|value| validate(ctx, value)))
        .transpose()
}

/// Materializes an argument that must be present.
///
/// # Errors
///
/// Returns [`InputError::Missing`] for an absent or `null` fragment, otherwise
/// as [`materialize_optional`].
pub fn materialize_required<T>(ctx: &Context, fragment: Option<&RawValue>) -> Result<T, InputError>
where
    T: DeserializeOwned + Validate,
{
    materialize_optional(ctx, fragment)?.ok_or(InputError::Missing)
}

/// Decodes and validates an archived entry, which is always required.
pub(crate) fn materialize_bytes<T>(ctx: &Context, bytes: &[u8]) -> Result<T, InputError>
where
    T: DeserializeOwned + Validate,
{
    let value =
        serde_json::from_slice(bytes).map_err(|source| InputError::Decode { source })?;
    validate(ctx, value)
}

fn present(fragment: Option<&RawValue>) -> Option<&RawValue> {
    fragment.filter(|raw| raw.get().trim() != "null")
}

fn decode<T: DeserializeOwned>(raw: &RawValue) -> Result<T, InputError> {
    serde_json::from_str(raw.get()).map_err(|source| InputError::Decode { source })
}

fn validate<T: Validate>(ctx: &Context, value: T) -> Result<T, InputError> {
    value
        .validate(ctx)
        .map_err(|source| InputError::Invalid { source })?;
    Ok(value)
}

#[cfg(test)]
mod tests;
