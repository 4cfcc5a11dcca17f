//! Evaluation errors and control-flow signals.

use spell_types::{CompileError, RuntimeTrapError, Span, SpellError};
use thiserror::Error;

use crate::value::Value;

/// Evaluation error: traps, unresolved names, and the non-local control flow
/// of `return`, `break` and `continue`.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    #[error(transparent)]
    Trap(#[from] RuntimeTrapError),

    /// A name that is not visible at the point of use.
    #[error("unknown name `{name}`")]
    UnknownName { name: String, span: Span },

    /// `return` statement (used internally for control flow)
    #[error("return")]
    Return(Value),

    /// `break` statement (used internally for control flow)
    #[error("break")]
    Break,

    /// `continue` statement (used internally for control flow)
    #[error("continue")]
    Continue,
}

impl EvalError {
    pub(crate) fn type_error(message: impl Into<String>, span: Span) -> Self {
        EvalError::Trap(RuntimeTrapError::TypeError {
            message: message.into(),
            span,
        })
    }
}

impl From<EvalError> for SpellError {
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::Trap(trap) => SpellError::Trap(trap),
            EvalError::UnknownName { name, span } => {
                SpellError::Compile(CompileError::UnknownCommand { name, span })
            }
            // The parser rejects jumps outside loops and the evaluator
            // absorbs top-level `return`, so these only surface on misuse.
            EvalError::Return(_) | EvalError::Break | EvalError::Continue => {
                SpellError::Trap(RuntimeTrapError::TypeError {
                    message: format!("`{err}` used outside of its statement"),
                    span: Span::point(1, 1),
                })
            }
        }
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
