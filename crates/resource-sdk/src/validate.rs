//! Opt-in validation hook for resource input types.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::BoxError;

/// Self-validation hook for source, version, and parameter records.
///
/// Every input type must implement the trait, but the method defaults to a
/// no-op, so types without rules simply write `impl Validate for T {}`. The
/// materializer calls [`Validate::validate`] after decoding (or after building
/// the zero value when the input was absent) and reports a failure as
/// `invalid input: <message>`.
///
/// # Example
///
/// ```
/// use resource_sdk::{BoxError, Context, Validate};
///
/// #[derive(Default, serde::Deserialize)]
/// struct Source {
///     uri: String,
/// }
///
/// impl Validate for Source {
///     fn validate(&self, _ctx: &Context) -> Result<(), BoxError> {
///         if self.uri.is_empty() {
///             return Err("uri is required".into());
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Validate {
    /// Checks the value, returning a description of the first problem found.
    ///
    /// # Errors
    ///
    /// Returns the implementation's own error when the value is unacceptable.
    fn validate(&self, ctx: &Context) -> Result<(), BoxError> {
        let _ = ctx;
        Ok(())
    }
}

/// Empty record for resources that take no parameters or configuration.
///
/// Deserializes from `{}` (and from any object, ignoring unknown keys) so the
/// orchestrator can always send a params block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoParams {}

impl Validate for NoParams {}

impl Validate for serde_json::Value {}

impl Validate for serde_json::Map<String, serde_json::Value> {}

impl<K, V, S> Validate for HashMap<K, V, S> {}

impl<K, V> Validate for BTreeMap<K, V> {}

// Non-record types compile so that the signature check can report them.
impl Validate for String {}

impl Validate for bool {}

impl Validate for u64 {}

impl Validate for i64 {}

impl<T> Validate for Vec<T> {}
