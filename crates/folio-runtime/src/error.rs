//! Runtime kernel errors.
//!
//! Everything here is fatal for the docstep that raised it: the caller
//! keeps the previous state, which is never mutated in place.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("unknown member '{field}' on {on}")]
    UnknownMember { on: String, field: String },

    #[error("{context}: expected {expected}, got {got}")]
    TypeMismatch {
        context: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("{function} expects {expected} argument(s), got {got}")]
    WrongArgCount {
        function: String,
        expected: &'static str,
        got: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow evaluating '{0}'")]
    IntegerOverflow(&'static str),

    #[error("neighbors.{0}() used outside a grid-scoped rule")]
    NeighborsOutsideGrid(String),

    #[error("rule '{rule}' condition must be boolean, got {got}")]
    NonBooleanCondition { rule: String, got: &'static str },

    #[error("unsupported assignment target '{0}' (expected a param name, 'cell.content' or 'cell.dynamic')")]
    UnsupportedAssignTarget(String),

    #[error("param '{param}': value '{value}' is not one of the declared variants")]
    InvalidEnumValue { param: String, value: String },

    #[error("param '{param}': initial value has the wrong type for {ty}")]
    InvalidInitialValue { param: String, ty: &'static str },

    #[error("ref('{0}') does not resolve to any declared label")]
    UnresolvedRef(String),

    #[error("assets.pick matched no asset")]
    NoAssetMatched,

    #[error("{0} requires a non-empty list")]
    EmptyListArgument(String),
}
