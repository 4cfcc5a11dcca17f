//! Core spell lexer: converts source text to a token stream.
//!
//! Features:
//! - Every token of the spell dialect (keywords, operators, punctuation, literals)
//! - `//` line comments and `/* */` block comments are skipped
//! - Whitespace, including newlines, is insignificant
//! - Error recovery: collects up to 20 errors instead of stopping at the first

use spell_types::{CompileErrors, ErrorCode, SourceFile, Span, SpellDiagnostic};

use crate::token::{Token, TokenKind};

/// The spell lexer.
///
/// Converts source text into a vector of [`Token`]s, collecting up to
/// [`spell_types::MAX_ERRORS`] errors along the way.
pub struct Lexer<'src> {
    text: &'src str,
    source: &'src [u8],
    source_file: &'src SourceFile,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based).
    col: u32,
    errors: CompileErrors,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    pub errors: CompileErrors,
}

impl<'src> Lexer<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            text: &source_file.source,
            source: source_file.source.as_bytes(),
            source_file,
            pos: 0,
            line: 1,
            col: 1,
            errors: CompileErrors::empty(),
        }
    }

    /// Lex the entire source file into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();

        loop {
            if self.errors.is_full() {
                break;
            }
            let token = self.scan_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, self.current_span()));
        }

        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    /// Advance by one character (not byte), keeping line/column in step.
    fn advance(&mut self) -> Option<char> {
        let ch = self.text[self.pos..].chars().next()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn eat_byte(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let err = SpellDiagnostic::at(self.source_file, code, message, span);
        self.errors.push_error(err);
    }

    fn emit_error_with_suggestion(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        suggestion: impl Into<String>,
    ) {
        let err =
            SpellDiagnostic::at(self.source_file, code, message, span).with_suggestion(suggestion);
        self.errors.push_error(err);
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip whitespace and comments. Newlines are not significant in spells.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(ch) = self.peek() {
                        if ch == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => self.skip_block_comment(),
                _ => return,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        let start_line = self.line;
        let start_col = self.col;
        self.advance();
        self.advance();
        loop {
            match self.peek() {
                None => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error_with_suggestion(
                        ErrorCode::UNCLOSED_DELIMITER,
                        "Unterminated block comment",
                        span,
                        "Close the comment with */",
                    );
                    return;
                }
                Some(b'*') if self.peek_at(1) == Some(b'/') => {
                    self.advance();
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Token scanning
    // ─────────────────────────────────────────────────────────────

    fn scan_token(&mut self) -> Token {
        loop {
            self.skip_trivia();

            if self.errors.is_full() {
                return Token::new(TokenKind::Eof, self.current_span());
            }

            let start_line = self.line;
            let start_col = self.col;
            let start_pos = self.pos;
            let Some(ch) = self.advance() else {
                return Token::new(TokenKind::Eof, self.current_span());
            };

            let kind = match ch {
                '"' | '\'' => self.scan_string(ch, start_line, start_col),
                '0'..='9' => self.scan_number(start_pos),
                c if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                    self.scan_identifier(start_pos)
                }

                '+' => {
                    if self.eat_byte(b'+') {
                        TokenKind::PlusPlus
                    } else if self.eat_byte(b'=') {
                        TokenKind::PlusEq
                    } else {
                        TokenKind::Plus
                    }
                }
                '-' => {
                    if self.eat_byte(b'-') {
                        TokenKind::MinusMinus
                    } else if self.eat_byte(b'=') {
                        TokenKind::MinusEq
                    } else {
                        TokenKind::Minus
                    }
                }
                '*' => self.with_eq(TokenKind::Star, TokenKind::StarEq),
                '/' => self.with_eq(TokenKind::Slash, TokenKind::SlashEq),
                '%' => self.with_eq(TokenKind::Percent, TokenKind::PercentEq),
                '=' => {
                    if self.eat_byte(b'=') {
                        self.with_eq(TokenKind::EqEq, TokenKind::EqEqEq)
                    } else {
                        TokenKind::Eq
                    }
                }
                '!' => {
                    if self.eat_byte(b'=') {
                        self.with_eq(TokenKind::BangEq, TokenKind::BangEqEq)
                    } else {
                        TokenKind::Bang
                    }
                }
                '<' => self.with_eq(TokenKind::Less, TokenKind::LessEq),
                '>' => self.with_eq(TokenKind::Greater, TokenKind::GreaterEq),
                '&' if self.eat_byte(b'&') => TokenKind::AmpAmp,
                '|' if self.eat_byte(b'|') => TokenKind::PipePipe,
                '?' => TokenKind::Question,
                ':' => TokenKind::Colon,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,
                ',' => TokenKind::Comma,
                ';' => TokenKind::Semicolon,
                '.' => TokenKind::Dot,

                '`' => {
                    self.skip_template_literal();
                    let span = self.span_from(start_line, start_col);
                    self.emit_error_with_suggestion(
                        ErrorCode::UNSUPPORTED_SYNTAX,
                        "Template strings are not available in spells",
                        span,
                        "Use \"double\" or 'single' quotes",
                    );
                    continue;
                }
                '&' | '|' => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error_with_suggestion(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("Unexpected character '{ch}'"),
                        span,
                        format!("Did you mean '{ch}{ch}'?"),
                    );
                    continue;
                }
                other => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("Unexpected character '{other}'"),
                        span,
                    );
                    // Error recovery: skip the character and try again
                    continue;
                }
            };

            return Token::new(kind, self.span_from(start_line, start_col));
        }
    }

    /// `plain` unless the next byte is `=`, in which case consume it and
    /// return `with_eq`.
    fn with_eq(&mut self, plain: TokenKind, with_eq: TokenKind) -> TokenKind {
        if self.eat_byte(b'=') {
            with_eq
        } else {
            plain
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Literals & identifiers
    // ─────────────────────────────────────────────────────────────

    fn scan_number(&mut self, start_pos: usize) -> TokenKind {
        while let Some(b'0'..=b'9') = self.peek() {
            self.advance();
        }
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            self.advance();
            while let Some(b'0'..=b'9') = self.peek() {
                self.advance();
            }
        }
        let value = self.text[start_pos..self.pos].parse().unwrap_or(0.0);
        TokenKind::NumberLit(value)
    }

    fn scan_identifier(&mut self, start_pos: usize) -> TokenKind {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'$' {
                self.advance();
            } else {
                break;
            }
        }
        let text = &self.text[start_pos..self.pos];
        TokenKind::from_keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()))
    }

    /// Scan a string literal after its opening quote.
    fn scan_string(&mut self, quote: char, start_line: u32, start_col: u32) -> TokenKind {
        let mut buf = String::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error_with_suggestion(
                        ErrorCode::UNTERMINATED_STRING,
                        "Unterminated string literal",
                        span,
                        format!("Close the string with {quote}"),
                    );
                    return TokenKind::StringLiteral(buf);
                }
                Some(b'\\') => {
                    if let Some(escaped) = self.scan_escape_sequence() {
                        buf.push(escaped);
                    }
                }
                Some(_) => {
                    let Some(ch) = self.advance() else { continue };
                    if ch == quote {
                        return TokenKind::StringLiteral(buf);
                    }
                    buf.push(ch);
                }
            }
        }
    }

    /// Scan an escape sequence starting at the `\`.
    fn scan_escape_sequence(&mut self) -> Option<char> {
        let start_line = self.line;
        let start_col = self.col;
        self.advance();
        match self.advance() {
            Some('n') => Some('\n'),
            Some('t') => Some('\t'),
            Some('r') => Some('\r'),
            Some('0') => Some('\0'),
            Some(ch @ ('"' | '\'' | '\\')) => Some(ch),
            Some(ch) => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("Invalid escape sequence '\\{ch}'"),
                    span,
                );
                Some(ch)
            }
            None => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::UNTERMINATED_STRING,
                    "Unexpected end of spell in escape sequence",
                    span,
                );
                None
            }
        }
    }

    fn skip_template_literal(&mut self) {
        while let Some(ch) = self.advance() {
            if ch == '`' {
                return;
            }
        }
    }
}
