//! Token types for the spell lexer.
//!
//! Defines [`TokenKind`] covering every lexeme of the spell dialect and
//! [`Token`], which pairs a kind with a source [`Span`].

use spell_types::Span;
use std::fmt;

/// All reserved words of the spell dialect.
///
/// These cannot be used as variable or function names. The lexer recognises
/// each one and emits a specific keyword token instead of
/// [`TokenKind::Identifier`].
pub const ALL_KEYWORDS: &[&str] = &[
    // Declarations (4)
    "let", "const", "var", "function",
    // Control flow (9)
    "if", "else", "while", "do", "for", "return", "break", "continue", "in",
    // Literals (3)
    "true", "false", "null",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the spell lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns `true` if this token is a reserved keyword.
    pub fn is_keyword(&self) -> bool {
        self.kind.is_keyword()
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

/// Every token kind in the spell dialect.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────

    /// Numeric literal: `42`, `3.5`
    NumberLit(f64),
    /// String literal with escapes resolved: `"left"`, `'up'`
    StringLiteral(String),
    True,
    False,
    Null,

    /// Variable, function, or spell command name: `steps`, `moveRight`
    Identifier(String),

    // ── Keywords ─────────────────────────────────────────────

    Let,
    Const,
    Var,
    Function,
    If,
    Else,
    While,
    Do,
    For,
    Return,
    Break,
    Continue,
    /// `in` is reserved so `for (x in y)` can be rejected clearly.
    In,

    // ── Operators ────────────────────────────────────────────

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    EqEq,
    EqEqEq,
    BangEq,
    BangEqEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    AmpAmp,
    PipePipe,
    Bang,
    Question,
    Colon,

    // ── Punctuation ──────────────────────────────────────────

    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    /// Not part of the dialect; lexed so the parser can explain why.
    Dot,
    /// Not part of the dialect; lexed so the parser can explain why.
    LBracket,
    /// Not part of the dialect; lexed so the parser can explain why.
    RBracket,

    Eof,
}

impl TokenKind {
    /// Look up a reserved word. Returns `None` for ordinary identifiers.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "var" => TokenKind::Var,
            "function" => TokenKind::Function,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "for" => TokenKind::For,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "in" => TokenKind::In,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => return None,
        })
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Let
                | TokenKind::Const
                | TokenKind::Var
                | TokenKind::Function
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::For
                | TokenKind::Return
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::In
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::NumberLit(n) => return write!(f, "{n}"),
            TokenKind::StringLiteral(s) => return write!(f, "\"{s}\""),
            TokenKind::Identifier(s) => return f.write_str(s),
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::Let => "let",
            TokenKind::Const => "const",
            TokenKind::Var => "var",
            TokenKind::Function => "function",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::Do => "do",
            TokenKind::For => "for",
            TokenKind::Return => "return",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::In => "in",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            TokenKind::Eq => "=",
            TokenKind::PlusEq => "+=",
            TokenKind::MinusEq => "-=",
            TokenKind::StarEq => "*=",
            TokenKind::SlashEq => "/=",
            TokenKind::PercentEq => "%=",
            TokenKind::EqEq => "==",
            TokenKind::EqEqEq => "===",
            TokenKind::BangEq => "!=",
            TokenKind::BangEqEq => "!==",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::LessEq => "<=",
            TokenKind::GreaterEq => ">=",
            TokenKind::AmpAmp => "&&",
            TokenKind::PipePipe => "||",
            TokenKind::Bang => "!",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Dot => ".",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Eof => "end of file",
        };
        f.write_str(text)
    }
}
