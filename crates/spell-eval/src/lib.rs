//! Spell tree-walking evaluator.
//!
//! Executes a parsed spell against a maze snapshot in a sandbox whose only
//! outside names are the approved commands, and returns the ordered list of
//! primitive actions the spell asked for. Evaluation is bounded by an action
//! ceiling, a gas watchdog and a call-depth limit.

mod env;
pub mod error;
mod evaluator;
mod primitives;
mod resolve;
mod value;

pub use error::{EvalError, EvalResult};
pub use evaluator::{
    EvalLimits, Evaluator, DEFAULT_ACTION_CEILING, DEFAULT_GAS_LIMIT, DEFAULT_MAX_CALL_DEPTH,
    DEFAULT_MAX_STRING_LENGTH,
};
pub use primitives::{BindingTable, Primitive, SpellCursor, UNDEFINED};
pub use resolve::check_names;
pub use value::{Closure, Value};

use spell_types::ast::Program;
use spell_types::{Action, Maze, Position, SpellError};

/// Check a parsed spell for unknown names, then run it.
pub fn evaluate(
    program: &Program,
    maze: &Maze,
    start: Position,
    table: &BindingTable,
    limits: EvalLimits,
) -> Result<Vec<Action>, SpellError> {
    check_names(program, table)?;
    Evaluator::new(maze, start, table, limits).run(program)
}
