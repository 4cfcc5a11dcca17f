//! Shared types for the spell toolchain.
//!
//! This crate defines the AST of the spell dialect, source spans,
//! diagnostics and the error taxonomy, plus the maze model and the
//! action/outcome data exchanged between the interpreter and the runner.

mod action;
mod error;
mod maze;
mod outcome;
mod span;
pub mod ast;

pub use action::{Action, TorchMap, TorchState};
pub use error::{
    CompileError, CompileErrors, ErrorCategory, ErrorCode, RuntimeTrapError, SpellDiagnostic,
    SpellError, MAX_ERRORS, SPELLING_HINT,
};
pub use maze::{Direction, Maze, MazeError, Position, StepCheck, Tile};
pub use outcome::{FailReason, RunOutcome};
pub use span::{SourceFile, Span};

/// Result type used throughout the spell toolchain.
pub type Result<T> = std::result::Result<T, SpellError>;
