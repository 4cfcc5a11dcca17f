use crate::maze::Position;
use crate::span::{SourceFile, Span};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum number of diagnostics kept before fail-fast.
pub const MAX_ERRORS: usize = 20;

/// Hint appended to every compile-time failure shown to a learner.
pub const SPELLING_HINT: &str =
    "Check your spelling; only approved spell commands are available.";

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// The text is not a well-formed spell.
    Syntax,
    /// The spell names something outside the approved commands.
    Scope,
    /// The spell is well formed but failed while being cast.
    Trap,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Scope => write!(f, "scope"),
            Self::Trap => write!(f, "trap"),
        }
    }
}

/// Numeric error code (E100–E399).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax errors (E100–E199) ──
    pub const UNEXPECTED_TOKEN: Self = Self(100);
    pub const UNCLOSED_DELIMITER: Self = Self(101);
    pub const UNTERMINATED_STRING: Self = Self(102);
    pub const UNSUPPORTED_SYNTAX: Self = Self(103);
    pub const INVALID_ASSIGNMENT_TARGET: Self = Self(104);
    pub const NESTING_LIMIT_EXCEEDED: Self = Self(105);
    pub const MISSING_INITIALIZER: Self = Self(106);
    pub const JUMP_OUTSIDE_LOOP: Self = Self(107);

    // ── Scope errors (E200–E299) ──
    pub const UNKNOWN_COMMAND: Self = Self(200);

    // ── Trap errors (E300–E399) ──
    pub const TORCH_NOT_UNDERFOOT: Self = Self(300);
    pub const ACTION_CEILING_EXCEEDED: Self = Self(301);
    pub const WATCHDOG_EXPIRED: Self = Self(302);
    pub const RECURSION_LIMIT: Self = Self(303);
    pub const TYPE_ERROR: Self = Self(304);
    pub const STRING_TOO_LONG: Self = Self(305);

    pub fn category(self) -> ErrorCategory {
        match self.0 {
            200..=299 => ErrorCategory::Scope,
            300..=399 => ErrorCategory::Trap,
            _ => ErrorCategory::Syntax,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A structured diagnostic about a spell.
///
/// Hosts render these directly; they never need to parse free-form strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellDiagnostic {
    pub file: String,
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub message: String,
    #[serde(flatten)]
    pub span: Span,
    /// The exact source line, for context.
    pub source_line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl SpellDiagnostic {
    pub fn new(
        file: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            code,
            category: code.category(),
            message: message.into(),
            span,
            source_line: source_line.into(),
            suggestion: None,
        }
    }

    /// Build a diagnostic, pulling the source line out of `source`.
    pub fn at(
        source: &SourceFile,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        let line = source.line(span.start_line).unwrap_or("");
        Self::new(&source.name, code, message, span, line)
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for SpellDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}",
            self.span, self.code, self.category, self.message
        )
    }
}

impl std::error::Error for SpellDiagnostic {}

/// Diagnostics collected by the lexer and parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileErrors {
    pub errors: Vec<SpellDiagnostic>,
    pub total_errors: usize,
}

impl CompileErrors {
    pub fn empty() -> Self {
        Self {
            errors: Vec::new(),
            total_errors: 0,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// True once [`MAX_ERRORS`] errors have been reported.
    pub fn is_full(&self) -> bool {
        self.total_errors >= MAX_ERRORS
    }

    /// Add an error, respecting the [`MAX_ERRORS`] limit.
    pub fn push_error(&mut self, error: SpellDiagnostic) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    pub fn extend(&mut self, other: CompileErrors) {
        let dropped = other.total_errors.saturating_sub(other.errors.len());
        for error in other.errors {
            self.push_error(error);
        }
        self.total_errors += dropped;
    }

    pub fn first(&self) -> Option<&SpellDiagnostic> {
        self.errors.first()
    }
}

/// The spell could not be turned into actions because of how it is written.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("{}", describe_syntax(.0))]
    Syntax(CompileErrors),

    #[error("`{name}` is not an approved spell command. {}", SPELLING_HINT)]
    UnknownCommand { name: String, span: Span },
}

fn describe_syntax(errors: &CompileErrors) -> String {
    match errors.first() {
        Some(first) => format!(
            "Syntax error on line {}: {}. {SPELLING_HINT}",
            first.span.start_line, first.message
        ),
        None => format!("Syntax error. {SPELLING_HINT}"),
    }
}

/// The spell was well formed but broke a rule while it was being cast.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeTrapError {
    #[error("You must be standing on a torch to light it (you are at {at}).")]
    TorchNotUnderfoot { at: Position, span: Span },

    #[error("Your spell produced more than {limit} actions. Did you write an infinite loop?")]
    ActionCeilingExceeded { limit: usize },

    #[error("Your spell ran for too long without finishing. Check for an infinite loop.")]
    Watchdog { limit: u64 },

    #[error("Your spell called its own functions more than {depth} levels deep.")]
    RecursionLimit { depth: usize, span: Span },

    #[error("{message}")]
    TypeError { message: String, span: Span },

    #[error("Your spell built a piece of text longer than {limit} characters.")]
    StringTooLong { limit: usize, span: Span },
}

impl RuntimeTrapError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::TorchNotUnderfoot { .. } => ErrorCode::TORCH_NOT_UNDERFOOT,
            Self::ActionCeilingExceeded { .. } => ErrorCode::ACTION_CEILING_EXCEEDED,
            Self::Watchdog { .. } => ErrorCode::WATCHDOG_EXPIRED,
            Self::RecursionLimit { .. } => ErrorCode::RECURSION_LIMIT,
            Self::TypeError { .. } => ErrorCode::TYPE_ERROR,
            Self::StringTooLong { .. } => ErrorCode::STRING_TOO_LONG,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::TorchNotUnderfoot { span, .. }
            | Self::RecursionLimit { span, .. }
            | Self::TypeError { span, .. }
            | Self::StringTooLong { span, .. } => Some(*span),
            Self::ActionCeilingExceeded { .. } | Self::Watchdog { .. } => None,
        }
    }
}

/// Any failure of `compile`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpellError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Trap(#[from] RuntimeTrapError),
}

impl SpellError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SpellError::Compile(CompileError::Syntax(_)) => ErrorCategory::Syntax,
            SpellError::Compile(CompileError::UnknownCommand { .. }) => ErrorCategory::Scope,
            SpellError::Trap(_) => ErrorCategory::Trap,
        }
    }

    pub fn is_trap(&self) -> bool {
        matches!(self, SpellError::Trap(_))
    }

    /// The sentence shown to the learner.
    ///
    /// Traps are framed as a spell casting error because the fix is a logic
    /// change, not a typo.
    pub fn learner_message(&self) -> String {
        match self {
            SpellError::Compile(err) => err.to_string(),
            SpellError::Trap(trap) => format!("Spell casting error: {trap}"),
        }
    }

    /// Structured diagnostics for editor integration.
    pub fn diagnostics(&self, source: &SourceFile) -> Vec<SpellDiagnostic> {
        match self {
            SpellError::Compile(CompileError::Syntax(errors)) => errors.errors.clone(),
            SpellError::Compile(CompileError::UnknownCommand { name, span }) => {
                vec![SpellDiagnostic::at(
                    source,
                    ErrorCode::UNKNOWN_COMMAND,
                    format!("`{name}` is not an approved spell command"),
                    *span,
                )
                .with_suggestion(SPELLING_HINT)]
            }
            SpellError::Trap(trap) => {
                let span = trap.span().unwrap_or_else(|| Span::point(1, 1));
                vec![SpellDiagnostic::at(source, trap.code(), trap.to_string(), span)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(line: u32, message: &str) -> SpellDiagnostic {
        SpellDiagnostic::new(
            "spell.js",
            ErrorCode::UNEXPECTED_TOKEN,
            message,
            Span::point(line, 1),
            "",
        )
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::UNEXPECTED_TOKEN.category(), ErrorCategory::Syntax);
        assert_eq!(ErrorCode::JUMP_OUTSIDE_LOOP.category(), ErrorCategory::Syntax);
        assert_eq!(ErrorCode::UNKNOWN_COMMAND.category(), ErrorCategory::Scope);
        assert_eq!(ErrorCode::TORCH_NOT_UNDERFOOT.category(), ErrorCategory::Trap);
        assert_eq!(ErrorCode::TYPE_ERROR.category(), ErrorCategory::Trap);
        assert_eq!(ErrorCode::STRING_TOO_LONG.category(), ErrorCategory::Trap);
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::UNKNOWN_COMMAND.to_string(), "E200");
    }

    #[test]
    fn test_diagnostic_json_field_names() {
        let err = SpellDiagnostic::new(
            "spell.js",
            ErrorCode::UNEXPECTED_TOKEN,
            "expected ')', got ';'",
            Span::new(2, 10, 2, 11),
            "moveRight(;",
        )
        .with_suggestion("close the call with ')'");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"line\":2"));
        assert!(json.contains("\"column\":10"));
        assert!(json.contains("\"end_column\":11"));
        assert!(json.contains("\"category\":\"syntax\""));
        assert!(json.contains("\"suggestion\""));
        let back: SpellDiagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_compile_errors_max_limit() {
        let mut errs = CompileErrors::empty();
        for i in 0..25 {
            errs.push_error(diag(i + 1, "bad"));
        }
        assert_eq!(errs.errors.len(), MAX_ERRORS);
        assert_eq!(errs.total_errors, 25);
        assert!(errs.is_full());
    }

    #[test]
    fn test_compile_errors_extend_keeps_total() {
        let mut a = CompileErrors::empty();
        a.push_error(diag(1, "a"));
        let mut b = CompileErrors::empty();
        b.push_error(diag(2, "b"));
        b.push_error(diag(3, "c"));
        a.extend(b);
        assert_eq!(a.total_errors, 3);
        assert_eq!(a.errors.len(), 3);
    }

    #[test]
    fn test_unknown_command_message_names_identifier() {
        let err = SpellError::from(CompileError::UnknownCommand {
            name: "moveForward".into(),
            span: Span::point(1, 1),
        });
        let msg = err.learner_message();
        assert!(msg.starts_with("`moveForward` is not an approved spell command"));
        assert!(msg.contains("only approved spell commands are available"));
        assert_eq!(err.category(), ErrorCategory::Scope);
    }

    #[test]
    fn test_syntax_message_cites_first_line() {
        let mut errs = CompileErrors::empty();
        errs.push_error(diag(3, "expected ')', got ';'"));
        let err = SpellError::from(CompileError::Syntax(errs));
        assert_eq!(
            err.learner_message(),
            format!("Syntax error on line 3: expected ')', got ';'. {SPELLING_HINT}")
        );
        assert_eq!(err.category(), ErrorCategory::Syntax);
    }

    #[test]
    fn test_trap_messages_are_framed_as_casting_errors() {
        let err = SpellError::from(RuntimeTrapError::ActionCeilingExceeded { limit: 1000 });
        assert!(err.is_trap());
        assert_eq!(
            err.learner_message(),
            "Spell casting error: Your spell produced more than 1000 actions. Did you write an infinite loop?"
        );
        let torch = RuntimeTrapError::TorchNotUnderfoot {
            at: Position::new(0, 0),
            span: Span::point(1, 1),
        };
        assert!(torch.to_string().contains("must be standing on a torch"));
    }

    #[test]
    fn test_trap_diagnostics_carry_code() {
        let source = SourceFile::new("spell.js", "lightTorch();");
        let err = SpellError::from(RuntimeTrapError::TorchNotUnderfoot {
            at: Position::new(0, 0),
            span: Span::new(1, 1, 1, 12),
        });
        let diags = err.diagnostics(&source);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, ErrorCode::TORCH_NOT_UNDERFOOT);
        assert_eq!(diags[0].source_line, "lightTorch();");
    }
}
