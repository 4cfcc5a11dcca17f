//! Requirement checker: which chapter-mandated constructs a spell uses.
//!
//! A syntactic scan over the token stream. It looks for the presence of a
//! construct anywhere in the text, not whether that code ever runs, so a
//! `while` inside an unreachable branch still counts. Comments and string
//! contents are never scanned because the lexer has already removed them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use spell_lexer::{Lexer, TokenKind};
use spell_types::SourceFile;

use crate::SPELL_FILENAME;

/// Result of [`check_required_commands`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementReport {
    pub all_met: bool,
    /// Unmet concepts, in the order they were required.
    pub missing: Vec<String>,
}

/// Check that `source` uses every concept in `required`.
///
/// A concept is one of:
/// - a control keyword (`while`, `for`, `if`, `else`, `do`, `function`,
///   `return`, `break`, `continue`, `let`, `const`, `var`)
/// - an alias: `loop` (any of `while`/`for`/`do`), `conditional` (`if` or
///   `?:`), `variable` (any of `let`/`const`/`var`)
/// - any other name, met by a call `name(`
pub fn check_required_commands<S: AsRef<str>>(source: &str, required: &[S]) -> RequirementReport {
    let usage = Usage::scan(source);
    let missing: Vec<String> = required
        .iter()
        .map(AsRef::as_ref)
        .filter(|concept| !usage.meets(concept))
        .map(str::to_string)
        .collect();
    RequirementReport {
        all_met: missing.is_empty(),
        missing,
    }
}

/// Keywords and called names seen in one spell.
#[derive(Debug, Default)]
struct Usage {
    keywords: BTreeSet<String>,
    calls: BTreeSet<String>,
    ternary: bool,
}

impl Usage {
    fn scan(source: &str) -> Self {
        let source_file = SourceFile::new(SPELL_FILENAME, source);
        // Lex errors are ignored: a half-typed spell still gets feedback.
        let tokens = Lexer::new(&source_file).lex().tokens;

        let mut usage = Usage::default();
        for (i, token) in tokens.iter().enumerate() {
            match &token.kind {
                TokenKind::Identifier(name) => {
                    if matches!(tokens.get(i + 1).map(|t| &t.kind), Some(TokenKind::LParen)) {
                        usage.calls.insert(name.clone());
                    }
                }
                TokenKind::Question => usage.ternary = true,
                kind if kind.is_keyword() => {
                    usage.keywords.insert(kind.to_string());
                }
                _ => {}
            }
        }
        usage
    }

    fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.contains(keyword)
    }

    fn meets(&self, concept: &str) -> bool {
        match concept {
            "loop" => ["while", "for", "do"].iter().any(|k| self.has_keyword(k)),
            "conditional" => self.has_keyword("if") || self.ternary,
            "variable" => ["let", "const", "var"].iter().any(|k| self.has_keyword(k)),
            "while" | "for" | "if" | "else" | "do" | "function" | "return" | "break"
            | "continue" | "let" | "const" | "var" => self.has_keyword(concept),
            name => self.calls.contains(name),
        }
    }
}
