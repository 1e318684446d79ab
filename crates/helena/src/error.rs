use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::value::Value;

/// Result type alias for operations that can produce a core error.
pub type RunResult<T> = Result<T, RunError>;

/// Result type alias for executions that can stop on an error or a host
/// control-flow code.
pub type ExecResult<T> = Result<T, Interrupt>;

/// Failure families surfaced by the core.
///
/// Uses strum derives for automatic `Display` and `Into<&'static str>`
/// implementations; the string form matches the variant name exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Structural parse failures: unmatched or mismatched delimiters, open
    /// strings and comments, nesting overflow.
    Syntax,
    /// A word that fits none of the five word categories.
    InvalidWord,
    /// Variable name with no binding in the `VariableResolver`.
    UnresolvedVariable,
    /// Command name with no binding in the `CommandResolver`.
    UnresolvedCommand,
    /// Index selector built from a nil index.
    InvalidIndex,
    /// Keyed or generic selector built from an empty key or rule list.
    EmptySelector,
    /// Selection applied to a value that does not support it.
    NotSelectable,
    IndexOutOfRange,
    UnknownKey,
    /// Value could not be coerced to an integer.
    InvalidInteger,
    /// Value has no canonical string representation.
    NoStringRepresentation,
    /// Failure reported by a host command, custom value, or custom selector.
    Host,
}

/// A typed core error: a failure family plus a human-readable message.
///
/// Messages are part of the observable behavior (hosts match on them in
/// tests and diagnostics), so they are built by the constructors below
/// rather than ad hoc at call sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    kind: ErrorKind,
    message: String,
}

impl RunError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The failure family of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    pub(crate) fn invalid_word() -> Self {
        Self::new(ErrorKind::InvalidWord, "invalid word structure")
    }

    pub(crate) fn unresolved_variable(name: &str) -> Self {
        Self::new(ErrorKind::UnresolvedVariable, format!("cannot resolve variable {name}"))
    }

    pub(crate) fn unresolved_command(name: &str) -> Self {
        Self::new(ErrorKind::UnresolvedCommand, format!("cannot resolve command {name}"))
    }

    pub(crate) fn invalid_index() -> Self {
        Self::new(ErrorKind::InvalidIndex, "invalid index")
    }

    pub(crate) fn empty_selector() -> Self {
        Self::new(ErrorKind::EmptySelector, "empty selector")
    }

    pub(crate) fn not_index_selectable() -> Self {
        Self::new(ErrorKind::NotSelectable, "value is not index-selectable")
    }

    pub(crate) fn not_key_selectable() -> Self {
        Self::new(ErrorKind::NotSelectable, "value is not key-selectable")
    }

    pub(crate) fn not_selectable() -> Self {
        Self::new(ErrorKind::NotSelectable, "value is not selectable")
    }

    pub(crate) fn index_out_of_range() -> Self {
        Self::new(ErrorKind::IndexOutOfRange, "index out of range")
    }

    pub(crate) fn unknown_key() -> Self {
        Self::new(ErrorKind::UnknownKey, "unknown key")
    }

    pub(crate) fn invalid_integer() -> Self {
        Self::new(ErrorKind::InvalidInteger, "invalid integer")
    }

    pub(crate) fn nil_no_string_representation() -> Self {
        Self::new(ErrorKind::NoStringRepresentation, "nil has no string representation")
    }

    pub(crate) fn no_string_representation() -> Self {
        Self::new(ErrorKind::NoStringRepresentation, "value has no string representation")
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RunError {}

/// Host-defined control-flow code carried through the executor unchanged.
///
/// The core gives no meaning to specific codes; command layers use them for
/// return/yield/break/continue style flow and intercept them at their own
/// boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlCode(pub u32);

/// Why an execution stopped before producing a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Interrupt {
    /// A typed error; aborts execution and surfaces to the caller.
    Error(RunError),
    /// A host control-flow code with its payload, propagated unchanged.
    Code(ControlCode, Value),
}

impl From<RunError> for Interrupt {
    fn from(error: RunError) -> Self {
        Self::Error(error)
    }
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(error) => error.fmt(f),
            Self::Code(code, _) => write!(f, "control code {}", code.0),
        }
    }
}
