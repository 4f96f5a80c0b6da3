//! Declared handler signatures and the violations found in them.

use std::any::{TypeId, type_name};
use std::fmt;

use serde::de::DeserializeOwned;
use thiserror::Error;

use super::shape::Shape;
use crate::error::write_list;

/// What a declared parameter or return value is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// The invocation [`Context`](crate::Context).
    Context,
    /// The [`Workspace`](crate::Workspace) for path-scoped actions.
    Workspace,
    /// A value decoded from JSON, with the shape it decodes from.
    Value(Shape),
    /// A sequence of decoded values; the element shape is recorded.
    Sequence(Shape),
    /// A list of [`Metadata`](crate::Metadata) pairs.
    Metadata,
    /// An optional boxed [`Archive`](crate::Archive).
    Archive,
    /// An error-capable value.
    Error,
    /// Anything else.
    Other,
}

/// One declared parameter or return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    name: &'static str,
    id: TypeId,
    kind: Kind,
}

impl TypeInfo {
    /// Describes a type with an explicit kind.
    #[must_use]
    pub fn new<T: ?Sized + 'static>(kind: Kind) -> Self {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
            kind,
        }
    }

    /// Describes a JSON-decoded value, probing its shape.
    #[must_use]
    pub fn value<T: DeserializeOwned + 'static>() -> Self {
        Self::new::<T>(Kind::Value(Shape::of::<T>()))
    }

    /// Describes a sequence whose elements are `T`; the recorded type is `T`.
    #[must_use]
    pub fn sequence_of<T: DeserializeOwned + 'static>() -> Self {
        Self::new::<T>(Kind::Sequence(Shape::of::<T>()))
    }

    /// Returns the type's name as reported by the compiler.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns what the type is.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    /// Returns `true` when both describe the same concrete type.
    #[must_use]
    pub fn same_type(&self, other: &Self) -> bool {
        self.id == other.id
    }

    /// Returns `true` for a JSON value that can hold a keyed record.
    #[must_use]
    pub const fn is_record(&self) -> bool {
        matches!(self.kind, Kind::Value(shape) if shape.is_record())
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Parameter and return types of one handler, in declaration order.
///
/// Typed resources have their signatures derived automatically; building one
/// by hand is useful when checking erased handlers or in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    inputs: Vec<TypeInfo>,
    outputs: Vec<TypeInfo>,
}

impl Signature {
    /// Creates a signature from its parts.
    #[must_use]
    pub const fn new(inputs: Vec<TypeInfo>, outputs: Vec<TypeInfo>) -> Self {
        Self { inputs, outputs }
    }

    /// Returns the declared parameter types.
    #[must_use]
    pub fn inputs(&self) -> &[TypeInfo] {
        &self.inputs
    }

    /// Returns the declared return types.
    #[must_use]
    pub fn outputs(&self) -> &[TypeInfo] {
        &self.outputs
    }
}

/// One way a signature departs from its action contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureViolation {
    /// Wrong number of parameters.
    #[error("expected method to require {expected} arguments, got {actual}")]
    ArgumentCount {
        /// Parameters the action requires.
        expected: usize,
        /// Parameters declared.
        actual: usize,
    },

    /// A parameter of the wrong type.
    #[error("argument {index} must be {expected}, got {actual}")]
    Argument {
        /// Zero-based parameter position.
        index: usize,
        /// Description of the required type.
        expected: &'static str,
        /// Name of the declared type.
        actual: &'static str,
    },

    /// Wrong number of return values.
    #[error("requires {expected} return {}, got {actual}", plural(*expected))]
    ReturnCount {
        /// Return values the action requires.
        expected: usize,
        /// Return values declared.
        actual: usize,
    },

    /// A return value of the wrong type.
    #[error("{position} return value must be {expected}, got {actual}")]
    Return {
        /// Ordinal position, such as `first`.
        position: &'static str,
        /// Description of the required type.
        expected: &'static str,
        /// Name of the declared type.
        actual: &'static str,
    },

    /// The final return value cannot carry a failure.
    #[error("last return value must be of type error")]
    MissingError,

    /// Version input and output types differ.
    #[error("version input and output must be same type")]
    VersionMismatch,
}

const fn plural(count: usize) -> &'static str {
    if count == 1 { "value" } else { "values" }
}

/// Every violation found in one or more handler signatures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct SignatureError {
    violations: Vec<(&'static str, SignatureViolation)>,
}

impl SignatureError {
    pub(crate) const fn new(violations: Vec<(&'static str, SignatureViolation)>) -> Self {
        Self { violations }
    }

    /// Returns each violation alongside the method it was found in.
    #[must_use]
    pub fn violations(&self) -> &[(&'static str, SignatureViolation)] {
        &self.violations
    }

    pub(crate) fn merge(&mut self, other: Self) {
        self.violations.extend(other.violations);
    }
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid resource signature: ")?;
        write_list(
            f,
            self.violations
                .iter()
                .map(|(method, violation)| format!("{method}: {violation}")),
        )
    }
}
