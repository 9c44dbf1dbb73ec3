//! Runtime errors raised while evaluating a Jam program.

use thiserror::Error;

/// Runtime error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Variable lookup failed.
    #[error("unbound variable '{0}'")]
    UnboundVariable(String),

    /// A binding was read before its definition finished evaluating.
    #[error("'{0}' referenced before its definition was evaluated")]
    ForwardReference(String),

    /// An operator or primitive received a value of the wrong kind.
    #[error("type mismatch: '{op}' cannot be applied to {value}")]
    TypeMismatch { op: String, value: String },

    #[error("division by zero")]
    DivisionByZero,

    /// Checked arithmetic overflowed.
    #[error("integer overflow in '{0}'")]
    IntegerOverflow(String),

    /// Application of a value that is neither a closure nor a primitive.
    #[error("{0} is not a function")]
    NotAFunction(String),

    #[error("{callee} expects {expected} argument(s) but was given {actual}")]
    ArityMismatch {
        callee: String,
        expected: usize,
        actual: usize,
    },

    /// A list primitive received a value that is not a list.
    #[error("'{prim}' requires a list, got {value}")]
    NotAList { prim: String, value: String },

    /// Nested calls and forces exceeded the configured depth limit.
    #[error("evaluation depth limit of {0} exceeded")]
    DepthExceeded(usize),
}

impl EvalError {
    pub(crate) fn type_mismatch(op: impl Into<String>, value: impl ToString) -> Self {
        EvalError::TypeMismatch {
            op: op.into(),
            value: value.to_string(),
        }
    }

    pub(crate) fn not_a_list(prim: impl Into<String>, value: impl ToString) -> Self {
        EvalError::NotAList {
            prim: prim.into(),
            value: value.to_string(),
        }
    }
}

/// Result alias for evaluation.
pub type EvalResult<T> = Result<T, EvalError>;
