//! Core parser infrastructure: token cursor, error reporting, helpers.

use spell_lexer::token::{Token, TokenKind};
use spell_types::ast::{Ident, Program};
use spell_types::{CompileErrors, ErrorCode, SourceFile, Span, SpellDiagnostic};

/// Maximum combined statement/expression nesting depth.
pub const MAX_NESTING_DEPTH: u32 = 64;

/// The spell parser.
///
/// Consumes a token stream produced by the lexer and builds an AST.
/// Collects errors and attempts recovery when possible.
pub struct Parser<'src> {
    tokens: Vec<Token>,
    pos: usize,
    source_file: &'src SourceFile,
    errors: CompileErrors,
    /// Current statement/expression nesting depth.
    depth: u32,
    /// Number of enclosing loops within the current function body.
    pub(crate) loop_depth: u32,
}

/// Result of parsing.
///
/// `program` holds whatever could be recovered; it is only meaningful when
/// `errors` is empty.
pub struct ParseResult {
    pub program: Program,
    pub errors: CompileErrors,
}

impl<'src> Parser<'src> {
    /// Create a new parser from a token stream and source file.
    pub fn new(tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        let mut tokens = tokens;
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let span = tokens.last().map_or(Span::point(1, 1), |t| t.span);
            tokens.push(Token::new(TokenKind::Eof, span));
        }
        Self {
            tokens,
            pos: 0,
            source_file,
            errors: CompileErrors::empty(),
            depth: 0,
            loop_depth: 0,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Returns the current token without advancing.
    pub(crate) fn peek(&self) -> &Token {
        let idx = self.pos.min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    /// Returns the kind of the current token.
    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Returns the previously consumed token's span.
    pub(crate) fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            Span::point(1, 1)
        }
    }

    /// Returns the span of the current token.
    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    /// Index of the current token.
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    /// Returns `true` if the current token is `Eof`.
    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    /// Check if the current token matches the given kind exactly.
    pub(crate) fn check_exact(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check_exact(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Look ahead by `n` tokens from current position.
    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    /// True when the current token starts on a later line than the previous
    /// token ended.
    pub(crate) fn on_new_line(&self) -> bool {
        self.pos > 0 && self.current_span().start_line > self.previous_span().end_line
    }

    // ── Statement Terminators ─────────────────────────────────────────────────

    /// Consume the `;` ending a statement.
    ///
    /// The semicolon may be left out before a line break, a closing brace
    /// or the end of the spell.
    pub(crate) fn expect_semicolon(&mut self) {
        if self.eat(&TokenKind::Semicolon)
            || self.at_end()
            || self.check_exact(&TokenKind::RBrace)
            || self.on_new_line()
        {
            return;
        }
        self.error_at_current(
            ErrorCode::UNEXPECTED_TOKEN,
            format!("expected ';' after statement, got '{}'", self.peek_kind()),
        );
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Expect a specific token kind. Returns the token if matched, or emits an error.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Token> {
        if self.check_exact(expected) {
            Some(self.advance())
        } else {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expected '{}', got '{}'", expected, self.peek_kind()),
            );
            None
        }
    }

    /// Expect a closing delimiter opened at `open`.
    pub(crate) fn expect_closing(&mut self, expected: &TokenKind, open: Span) -> Option<Token> {
        if self.check_exact(expected) {
            return Some(self.advance());
        }
        let code = if self.at_end() {
            ErrorCode::UNCLOSED_DELIMITER
        } else {
            ErrorCode::UNEXPECTED_TOKEN
        };
        let message = format!("expected '{}', got '{}'", expected, self.peek_kind());
        let suggestion = format!("the opening bracket is on line {}", open.start_line);
        self.error_with_suggestion(code, message, self.current_span(), suggestion);
        None
    }

    /// Expect an identifier token. Returns the name and span.
    pub(crate) fn expect_identifier(&mut self) -> Option<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            kind if kind.is_keyword() => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("'{kind}' is a reserved word and cannot be used as a name"),
                );
                None
            }
            _ => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected a name, got '{}'", self.peek_kind()),
                );
                None
            }
        }
    }

    // ── Nesting ───────────────────────────────────────────────────────────────

    /// Enter one nesting level. Reports an error and returns `false` once
    /// [`MAX_NESTING_DEPTH`] is exceeded.
    pub(crate) fn enter(&mut self) -> bool {
        if self.depth >= MAX_NESTING_DEPTH {
            self.error_at_current(
                ErrorCode::NESTING_LIMIT_EXCEEDED,
                format!("spell is nested too deeply (more than {MAX_NESTING_DEPTH} levels)"),
            );
            return false;
        }
        self.depth += 1;
        true
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    /// Report an error at the current token position.
    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    /// Report an error at a specific span.
    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let error = SpellDiagnostic::at(self.source_file, code, message, span);
        self.errors.push_error(error);
    }

    pub(crate) fn error_with_suggestion(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        suggestion: impl Into<String>,
    ) {
        let error =
            SpellDiagnostic::at(self.source_file, code, message, span).with_suggestion(suggestion);
        self.errors.push_error(error);
    }

    /// Returns `true` if we've hit the error limit and should stop.
    pub(crate) fn too_many_errors(&self) -> bool {
        self.errors.is_full()
    }

    // ── Synchronization ───────────────────────────────────────────────────────

    /// Skip tokens until we reach a synchronization point.
    /// Used after an error to resume at a known-good position.
    pub(crate) fn synchronize(&mut self) {
        while !self.at_end() {
            match self.peek_kind() {
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::Let
                | TokenKind::Const
                | TokenKind::Var
                | TokenKind::Function
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::For
                | TokenKind::Return
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::RBrace => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Synchronize after a failed statement that began at token index
    /// `before`, always making progress unless at a closing brace.
    pub(crate) fn recover_from(&mut self, before: usize) {
        self.synchronize();
        if self.pos == before && !self.at_end() && !self.check_exact(&TokenKind::RBrace) {
            self.advance();
        }
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the token stream into a `Program` AST.
    pub fn parse(mut self) -> ParseResult {
        let program = self.parse_program();
        ParseResult {
            program,
            errors: self.errors,
        }
    }

    fn parse_program(&mut self) -> Program {
        let start = self.current_span();
        let mut body = Vec::new();
        while !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            if self.check_exact(&TokenKind::RBrace) {
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "unmatched '}'");
                self.advance();
                continue;
            }
            let before = self.pos;
            match self.parse_statement() {
                Some(stmt) => body.push(stmt),
                None => self.recover_from(before),
            }
        }
        let span = start.merge(self.previous_span());
        Program { body, span }
    }
}
