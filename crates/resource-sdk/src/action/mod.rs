//! Action descriptors and handler signature validation.
//!
//! Each supported action has a static [`ActionSpec`] describing the arguments
//! it passes to a handler and the values it expects back. The table is fixed:
//! resources implement exactly these shapes and nothing else.
//!
//! [`ActionSpec::validate`] checks a declared [`Signature`] against its
//! descriptor and collects every violation instead of stopping at the first,
//! so a resource author sees the whole list in one run.

mod shape;
mod signature;

use strum::{Display, EnumString, IntoStaticStr};

pub use self::shape::Shape;
pub use self::signature::{Kind, Signature, SignatureError, SignatureViolation, TypeInfo};

/// The action a resource binary performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Operation {
    /// Discover versions.
    Check,
    /// Fetch one version into a directory.
    In,
    /// Publish a new version from a directory.
    Out,
}

impl Operation {
    /// Parses an operation name, ignoring case and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`strum::ParseError`] for anything other than `check`, `in` or
    /// `out`.
    pub fn parse(value: &str) -> Result<Self, strum::ParseError> {
        value.trim().parse()
    }

    /// Returns the operation name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Returns the descriptor of the handler this operation invokes.
    #[must_use]
    pub const fn action(self) -> &'static ActionSpec {
        match self {
            Self::Check => &CHECK,
            Self::In => &IN,
            Self::Out => &OUT,
        }
    }

    /// Returns `true` when the operation takes a directory argument.
    #[must_use]
    pub fn requires_path(self) -> bool {
        self.action().requires_path()
    }
}

/// One argument an action passes to its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    /// The invocation context.
    Context,
    /// The resource's source configuration.
    Source,
    /// A version record.
    Version,
    /// Action parameters.
    Params,
    /// The working directory.
    Path,
}

impl ArgumentKind {
    const fn expected(self) -> &'static str {
        match self {
            Self::Context => "of type Context",
            Self::Source | Self::Version | Self::Params => "a keyed record",
            Self::Path => "of type Workspace",
        }
    }

    fn accepts(self, info: &TypeInfo) -> bool {
        match self {
            Self::Context => info.kind() == Kind::Context,
            Self::Source | Self::Version | Self::Params => info.is_record(),
            Self::Path => info.kind() == Kind::Workspace,
        }
    }
}

/// What an action expects a handler to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// Only an error.
    Error,
    /// A sequence of versions and an error.
    Versions,
    /// A version, metadata and an error.
    VersionAndMetadata,
    /// An optional archive and an error.
    Archive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Versions,
    Version,
    Metadata,
    Archive,
    Error,
}

impl Slot {
    const fn expected(self) -> &'static str {
        match self {
            Self::Versions => "a sequence of version records",
            Self::Version => "a version record",
            Self::Metadata => "a metadata sequence",
            Self::Archive => "an optional archive",
            Self::Error => "of type error",
        }
    }

    fn accepts(self, info: &TypeInfo) -> bool {
        match self {
            Self::Versions => matches!(info.kind(), Kind::Sequence(shape) if shape.is_record()),
            Self::Version => info.is_record(),
            Self::Metadata => info.kind() == Kind::Metadata,
            Self::Archive => info.kind() == Kind::Archive,
            Self::Error => info.kind() == Kind::Error,
        }
    }
}

impl ReturnShape {
    const fn slots(self) -> &'static [Slot] {
        match self {
            Self::Error => &[Slot::Error],
            Self::Versions => &[Slot::Versions, Slot::Error],
            Self::VersionAndMetadata => &[Slot::Version, Slot::Metadata, Slot::Error],
            Self::Archive => &[Slot::Archive, Slot::Error],
        }
    }

    /// Returns how many values the shape consists of.
    #[must_use]
    pub const fn arity(self) -> usize {
        self.slots().len()
    }
}

/// Static description of one action's calling convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpec {
    name: &'static str,
    arguments: &'static [ArgumentKind],
    returns: ReturnShape,
}

/// Opens the archive for a source.
pub const ARCHIVE: ActionSpec = ActionSpec {
    name: "archive",
    arguments: &[ArgumentKind::Context, ArgumentKind::Source],
    returns: ReturnShape::Archive,
};

/// Prepares the resource before any other action.
pub const INITIALIZE: ActionSpec = ActionSpec {
    name: "initialize",
    arguments: &[ArgumentKind::Context, ArgumentKind::Source],
    returns: ReturnShape::Error,
};

/// Discovers versions after an optional known version.
pub const CHECK: ActionSpec = ActionSpec {
    name: "check",
    arguments: &[
        ArgumentKind::Context,
        ArgumentKind::Source,
        ArgumentKind::Version,
    ],
    returns: ReturnShape::Versions,
};

/// Fetches a version into the working directory.
pub const IN: ActionSpec = ActionSpec {
    name: "get",
    arguments: &[
        ArgumentKind::Context,
        ArgumentKind::Source,
        ArgumentKind::Version,
        ArgumentKind::Path,
        ArgumentKind::Params,
    ],
    returns: ReturnShape::VersionAndMetadata,
};

/// Publishes a new version from the working directory.
pub const OUT: ActionSpec = ActionSpec {
    name: "put",
    arguments: &[
        ArgumentKind::Context,
        ArgumentKind::Source,
        ArgumentKind::Path,
        ArgumentKind::Params,
    ],
    returns: ReturnShape::VersionAndMetadata,
};

/// Releases the resource after the action.
pub const CLOSE: ActionSpec = ActionSpec {
    name: "close",
    arguments: &[ArgumentKind::Context],
    returns: ReturnShape::Error,
};

impl ActionSpec {
    /// Returns the handler method name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the arguments passed to the handler, in order.
    #[must_use]
    pub const fn arguments(&self) -> &'static [ArgumentKind] {
        self.arguments
    }

    /// Returns the values the handler must return.
    #[must_use]
    pub const fn returns(&self) -> ReturnShape {
        self.returns
    }

    /// Returns `true` when the handler receives a working directory.
    #[must_use]
    pub fn requires_path(&self) -> bool {
        self.arguments.contains(&ArgumentKind::Path)
    }

    /// Checks a declared signature against this descriptor.
    ///
    /// # Errors
    ///
    /// Returns a [`SignatureError`] listing every violation found.
    pub fn validate(&self, signature: &Signature) -> Result<(), SignatureError> {
        let mut violations = Vec::new();
        self.check_arguments(signature.inputs(), &mut violations);
        self.check_returns(signature.outputs(), &mut violations);
        if self.versions_differ(signature) {
            violations.push(SignatureViolation::VersionMismatch);
        }

        if violations.is_empty() {
            return Ok(());
        }
        Err(SignatureError::new(
            violations.into_iter().map(|v| (self.name, v)).collect(),
        ))
    }

    fn check_arguments(&self, inputs: &[TypeInfo], violations: &mut Vec<SignatureViolation>) {
        if inputs.len() != self.arguments.len() {
            violations.push(SignatureViolation::ArgumentCount {
                expected: self.arguments.len(),
                actual: inputs.len(),
            });
        }
        for (index, (kind, info)) in self.arguments.iter().zip(inputs).enumerate() {
            if !kind.accepts(info) {
                violations.push(SignatureViolation::Argument {
                    index,
                    expected: kind.expected(),
                    actual: info.name(),
                });
            }
        }
    }

    fn check_returns(&self, outputs: &[TypeInfo], violations: &mut Vec<SignatureViolation>) {
        let slots = self.returns.slots();
        if outputs.len() != slots.len() {
            violations.push(SignatureViolation::ReturnCount {
                expected: slots.len(),
                actual: outputs.len(),
            });
        }

        let Some((last, leading)) = outputs.split_last() else {
            return;
        };
        if last.kind() != Kind::Error {
            violations.push(SignatureViolation::MissingError);
        }
        for (index, (slot, info)) in slots.iter().zip(leading).enumerate() {
            if *slot != Slot::Error && !slot.accepts(info) {
                violations.push(SignatureViolation::Return {
                    position: ordinal(index),
                    expected: slot.expected(),
                    actual: info.name(),
                });
            }
        }
    }

    fn versions_differ(&self, signature: &Signature) -> bool {
        let input = self
            .arguments
            .iter()
            .zip(signature.inputs())
            .find(|(kind, _)| **kind == ArgumentKind::Version)
            .map(|(_, info)| info);
        let output = self
            .returns
            .slots()
            .iter()
            .zip(signature.outputs())
            .find(|(slot, _)| matches!(slot, Slot::Version | Slot::Versions))
            .map(|(_, info)| info);
        input
            .zip(output)
            .is_some_and(|(declared, returned)| !declared.same_type(returned))
    }
}

const fn ordinal(index: usize) -> &'static str {
    match index {
        0 => "first",
        1 => "second",
        2 => "third",
        _ => "trailing",
    }
}
