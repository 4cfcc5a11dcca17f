//! Spell compiler: orchestrates the full compilation pipeline.
//!
//! ```text
//! Spell source → Lexer → Parser → Name check → Evaluator → Action[]
//! ```
//!
//! "Compiling" a spell means running it once against a simulated cursor and
//! keeping the moves and torch commands it asks for. The resulting action
//! list is pure data, bounded by the action ceiling, and is replayed later by
//! the movement runner.

pub mod chapter;
pub mod requirements;

pub use chapter::{Attempt, Chapter, ChapterBook, ChapterError};
pub use requirements::{check_required_commands, RequirementReport};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use spell_eval::{
    BindingTable, EvalLimits, DEFAULT_ACTION_CEILING, DEFAULT_GAS_LIMIT, DEFAULT_MAX_CALL_DEPTH,
    DEFAULT_MAX_STRING_LENGTH,
};
use spell_lexer::{LexResult, Lexer};
use spell_parser::Parser;
use spell_types::ast::Program;
use spell_types::{
    Action, CompileError, ErrorCategory, Maze, Position, SourceFile, SpellDiagnostic, SpellError,
};

/// File name used in diagnostics; spells come from an editor, not a file.
pub const SPELL_FILENAME: &str = "spell.js";

// ══════════════════════════════════════════════════════════════════════════════
// Options
// ══════════════════════════════════════════════════════════════════════════════

/// Knobs for one compilation. Every field has a default, so `{}` is a valid
/// JSON configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
    pub action_ceiling: usize,
    pub gas_limit: u64,
    pub max_call_depth: usize,
    pub max_string_length: usize,
    /// Narrow the binding table to these commands. `None` allows all nine.
    pub allowed_commands: Option<BTreeSet<String>>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            action_ceiling: DEFAULT_ACTION_CEILING,
            gas_limit: DEFAULT_GAS_LIMIT,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            allowed_commands: None,
        }
    }
}

impl CompileOptions {
    pub fn limits(&self) -> EvalLimits {
        EvalLimits {
            action_ceiling: self.action_ceiling,
            gas_limit: self.gas_limit,
            max_call_depth: self.max_call_depth,
            max_string_length: self.max_string_length,
        }
    }

    pub fn binding_table(&self) -> BindingTable {
        match &self.allowed_commands {
            Some(allowed) => BindingTable::restricted(allowed.iter().map(String::as_str)),
            None => BindingTable::standard(),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Pipeline
// ══════════════════════════════════════════════════════════════════════════════

/// Lex and parse a spell, collecting every syntax error from both stages.
pub fn parse(source_file: &SourceFile) -> Result<Program, CompileError> {
    let LexResult { tokens, mut errors } = Lexer::new(source_file).lex();
    let parsed = Parser::new(tokens, source_file).parse();
    errors.extend(parsed.errors);
    if errors.has_errors() {
        Err(CompileError::Syntax(errors))
    } else {
        Ok(parsed.program)
    }
}

/// Compile a spell with default options.
pub fn compile(source: &str, maze: &Maze, start: Position) -> Result<Vec<Action>, SpellError> {
    compile_with_options(source, maze, start, &CompileOptions::default())
}

/// Compile a spell into the ordered list of actions it performs when cast
/// from `start`.
pub fn compile_with_options(
    source: &str,
    maze: &Maze,
    start: Position,
    options: &CompileOptions,
) -> Result<Vec<Action>, SpellError> {
    let _span = tracing::debug_span!("compile", bytes = source.len(), %start).entered();

    let source_file = SourceFile::new(SPELL_FILENAME, source);
    let result = parse(&source_file).map_err(SpellError::from).and_then(|program| {
        spell_eval::evaluate(
            &program,
            maze,
            start,
            &options.binding_table(),
            options.limits(),
        )
    });

    match &result {
        Ok(actions) => tracing::debug!(actions = actions.len(), "spell compiled"),
        Err(err) => tracing::debug!(category = %err.category(), error = %err, "spell rejected"),
    }
    result
}

/// Hex SHA-256 of the spell text, for caching and replay logs.
pub fn source_hash(source: &str) -> String {
    format!("{:x}", Sha256::digest(source.as_bytes()))
}

// ══════════════════════════════════════════════════════════════════════════════
// Serializable result
// ══════════════════════════════════════════════════════════════════════════════

/// Outcome of a compilation in a shape the browser host can consume as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    pub success: bool,
    pub actions: Option<Vec<Action>>,
    pub error: Option<ErrorReport>,
    pub source_hash: String,
}

/// A compile failure, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub category: ErrorCategory,
    /// The learner-facing sentence.
    pub message: String,
    pub diagnostics: Vec<SpellDiagnostic>,
}

impl ErrorReport {
    pub fn new(err: &SpellError, source_file: &SourceFile) -> Self {
        Self {
            category: err.category(),
            message: err.learner_message(),
            diagnostics: err.diagnostics(source_file),
        }
    }
}

/// Compile and package the outcome as a [`CompileResult`].
pub fn compile_to_result(
    source: &str,
    maze: &Maze,
    start: Position,
    options: &CompileOptions,
) -> CompileResult {
    let source_hash = source_hash(source);
    let _span = tracing::debug_span!("compile_result", hash = %source_hash).entered();
    match compile_with_options(source, maze, start, options) {
        Ok(actions) => CompileResult {
            success: true,
            actions: Some(actions),
            error: None,
            source_hash,
        },
        Err(err) => {
            let source_file = SourceFile::new(SPELL_FILENAME, source);
            CompileResult {
                success: false,
                actions: None,
                error: Some(ErrorReport::new(&err, &source_file)),
                source_hash,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_json_defaults() {
        let options: CompileOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, CompileOptions::default());
        let options: CompileOptions =
            serde_json::from_str(r#"{"actionCeiling":5,"allowedCommands":["moveUp"]}"#).unwrap();
        assert_eq!(options.action_ceiling, 5);
        assert_eq!(options.gas_limit, DEFAULT_GAS_LIMIT);
        assert!(options.binding_table().contains("moveUp"));
        assert!(!options.binding_table().contains("moveDown"));
    }

    #[test]
    fn test_source_hash_is_stable_hex() {
        let hash = source_hash("moveRight();");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, source_hash("moveRight();"));
        assert_ne!(hash, source_hash("moveLeft();"));
    }

    #[test]
    fn test_parse_merges_lexer_and_parser_errors() {
        let sf = SourceFile::new(SPELL_FILENAME, "let x = 'open\nmoveRight(");
        match parse(&sf) {
            Err(CompileError::Syntax(errors)) => assert!(errors.errors.len() >= 2),
            other => panic!("expected syntax errors, got {other:?}"),
        }
    }
}
