use std::sync::Arc;

use crate::{value::ValueType, Identifier};

/// Represents a result type for operations in this crate.
///
/// This `Result` type is a standard Rust `Result` type where the error variant is defined by the
/// [`Error`] enum.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors that can occur while building or evaluating rule sets.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A function or accessor received a value of a type outside of its accepted set.
    #[error("type mismatch: expected {}, found {found}", ValueType::describe(.expected))]
    TypeMismatch {
        /// Value types accepted at this position.
        expected: &'static [ValueType],
        /// Actual type of the value.
        found: ValueType,
    },

    /// An expression referenced a name that is bound neither in the environment nor in the
    /// enclosing rules.
    #[error("unresolved reference to `{0}`")]
    UnresolvedReference(Identifier),

    /// `getAttr` followed a path through a record that has no such field.
    #[error("attribute `{0}` not found")]
    AttributeNotFound(Identifier),

    /// Rule set is malformed (unknown function, wrong arity, invalid template, etc.). This is a
    /// defect in the rule set and is never retried.
    #[error("invalid rule set: {0}")]
    InvalidRuleSet(String),

    /// Rule set document is not valid JSON or does not follow the rule set schema.
    #[error("error parsing rule set")]
    // serde_json::Error is not clonable, so we're wrapping it in an Arc.
    Json(#[source] Arc<serde_json::Error>),

    /// A parameter marked as required was not supplied and has no default.
    #[error("missing required parameter `{0}`")]
    MissingRequiredParameter(Identifier),

    /// Every rule in a tree was skipped.
    #[error("no rules matched")]
    NoRuleMatched,

    /// Rule set explicitly rejected the supplied parameters. The message explains why the
    /// combination is unsupported and should be shown to the user as-is.
    #[error("{0}")]
    RuleDefined(String),

    /// Nothing was registered for the requested service.
    #[error("endpoint provider for `{0}` is not available")]
    CapabilityNotAvailable(String),

    /// Built-in partition table could not be loaded.
    #[error("invalid partition data: {0}")]
    InvalidPartitionData(String),
}

impl Error {
    /// Return `true` if the error was produced by an explicit error rule, i.e., the rule set
    /// worked as intended and rejected the supplied parameters. All other errors signal a defect
    /// in the rule set, its parameters, or the caller.
    pub fn is_rule_defined(&self) -> bool {
        matches!(self, Error::RuleDefined(_))
    }

    pub(crate) fn type_mismatch(expected: &'static [ValueType], found: ValueType) -> Error {
        Error::TypeMismatch { expected, found }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Json(Arc::new(value))
    }
}
