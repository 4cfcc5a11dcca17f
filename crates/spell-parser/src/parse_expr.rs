//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 10. `=`, `+=`, `-=`, `*=`, `/=`, `%=` (right-associative)
//! 9. `? :`
//! 8. `||`
//! 7. `&&`
//! 6. `==`, `!=`, `===`, `!==`
//! 5. `<`, `>`, `<=`, `>=`
//! 4. `+`, `-`
//! 3. `*`, `/`, `%`
//! 2. unary `!`, `-`, `+`, prefix `++`/`--`
//! 1. postfix `++`/`--`, call `f(a, b)`

use spell_lexer::token::TokenKind;
use spell_types::ast::*;
use spell_types::{ErrorCode, Span};

use crate::parser::Parser;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse an expression.
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        if !self.enter() {
            return None;
        }
        let result = self.parse_assignment();
        self.leave();
        result
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `Assign = Conditional [ AssignOp Expression ]`
    fn parse_assignment(&mut self) -> Option<Expr> {
        let left = self.parse_conditional()?;
        let op = match self.peek_kind() {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::Add,
            TokenKind::MinusEq => AssignOp::Sub,
            TokenKind::StarEq => AssignOp::Mul,
            TokenKind::SlashEq => AssignOp::Div,
            TokenKind::PercentEq => AssignOp::Mod,
            _ => return Some(left),
        };
        self.advance(); // consume operator
        let target = self.variable_target(&left, "you can only assign to a variable name")?;
        let value = self.parse_expression()?;
        let span = left.span.merge(value.span);
        Some(Expr::new(
            ExprKind::Assign {
                target,
                op,
                value: Box::new(value),
            },
            span,
        ))
    }

    /// The identifier an assignment or update writes to.
    fn variable_target(&mut self, expr: &Expr, message: &str) -> Option<Ident> {
        match &expr.kind {
            ExprKind::Identifier(name) => Some(Ident::new(name.clone(), expr.span)),
            ExprKind::Paren(inner) => self.variable_target(inner, message),
            _ => {
                self.error_with_suggestion(
                    ErrorCode::INVALID_ASSIGNMENT_TARGET,
                    message,
                    expr.span,
                    "put a variable name there, like: steps = steps + 1",
                );
                None
            }
        }
    }

    /// `Conditional = Or [ "?" Expression ":" Expression ]`
    fn parse_conditional(&mut self) -> Option<Expr> {
        let condition = self.parse_or()?;
        if !self.eat(&TokenKind::Question) {
            return Some(condition);
        }
        let then_expr = self.parse_expression()?;
        self.expect(&TokenKind::Colon)?;
        let else_expr = self.parse_expression()?;
        let span = condition.span.merge(else_expr.span);
        Some(Expr::new(
            ExprKind::Conditional {
                condition: Box::new(condition),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        ))
    }

    /// `Or = And { "||" And }`
    fn parse_or(&mut self) -> Option<Expr> {
        self.parse_left_assoc(
            Self::parse_and,
            |kind| (*kind == TokenKind::PipePipe).then_some(LogicalOp::Or),
            logical,
        )
    }

    /// `And = Equality { "&&" Equality }`
    fn parse_and(&mut self) -> Option<Expr> {
        self.parse_left_assoc(
            Self::parse_equality,
            |kind| (*kind == TokenKind::AmpAmp).then_some(LogicalOp::And),
            logical,
        )
    }

    /// `Equality = Relational { EqOp Relational }`
    fn parse_equality(&mut self) -> Option<Expr> {
        self.parse_left_assoc(
            Self::parse_relational,
            |kind| match kind {
                TokenKind::EqEq => Some(BinOp::LooseEq),
                TokenKind::BangEq => Some(BinOp::LooseNotEq),
                TokenKind::EqEqEq => Some(BinOp::StrictEq),
                TokenKind::BangEqEq => Some(BinOp::StrictNotEq),
                _ => None,
            },
            binary,
        )
    }

    /// `Relational = Additive { RelOp Additive }`
    fn parse_relational(&mut self) -> Option<Expr> {
        self.parse_left_assoc(
            Self::parse_additive,
            |kind| match kind {
                TokenKind::Less => Some(BinOp::Less),
                TokenKind::Greater => Some(BinOp::Greater),
                TokenKind::LessEq => Some(BinOp::LessEq),
                TokenKind::GreaterEq => Some(BinOp::GreaterEq),
                _ => None,
            },
            binary,
        )
    }

    /// `Additive = Multiplicative { ("+" | "-") Multiplicative }`
    fn parse_additive(&mut self) -> Option<Expr> {
        self.parse_left_assoc(
            Self::parse_multiplicative,
            |kind| match kind {
                TokenKind::Plus => Some(BinOp::Add),
                TokenKind::Minus => Some(BinOp::Sub),
                _ => None,
            },
            binary,
        )
    }

    /// `Multiplicative = Unary { ("*" | "/" | "%") Unary }`
    fn parse_multiplicative(&mut self) -> Option<Expr> {
        self.parse_left_assoc(
            Self::parse_unary,
            |kind| match kind {
                TokenKind::Star => Some(BinOp::Mul),
                TokenKind::Slash => Some(BinOp::Div),
                TokenKind::Percent => Some(BinOp::Mod),
                _ => None,
            },
            binary,
        )
    }

    /// `operand { op operand }`, folded to the left.
    ///
    /// Each operator in the chain deepens the tree by one node, so each one
    /// counts as a nesting level.
    fn parse_left_assoc<Op>(
        &mut self,
        operand: fn(&mut Self) -> Option<Expr>,
        operator: fn(&TokenKind) -> Option<Op>,
        build: fn(Expr, Op, Expr) -> Expr,
    ) -> Option<Expr> {
        let mut left = operand(self)?;
        let mut levels = 0;
        let result = loop {
            let Some(op) = operator(self.peek_kind()) else {
                break Some(left);
            };
            if !self.enter() {
                break None;
            }
            levels += 1;
            self.advance();
            match operand(self) {
                Some(right) => left = build(left, op, right),
                None => break None,
            }
        };
        for _ in 0..levels {
            self.leave();
        }
        result
    }

    /// `Unary = ("!" | "-" | "+" | "++" | "--") Unary | Postfix`
    fn parse_unary(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let op = match self.peek_kind() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::PlusPlus | TokenKind::MinusMinus => return self.parse_prefix_update(),
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_nested_unary()?;
        let span = start.merge(operand.span);
        Some(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_nested_unary(&mut self) -> Option<Expr> {
        if !self.enter() {
            return None;
        }
        let operand = self.parse_unary();
        self.leave();
        operand
    }

    /// `++name` / `--name`
    fn parse_prefix_update(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let op = update_op(&self.advance().kind);
        let operand = self.parse_nested_unary()?;
        let target = self.variable_target(&operand, "'++' and '--' only work on a variable name")?;
        let span = start.merge(operand.span);
        Some(Expr::new(
            ExprKind::Update {
                target,
                op,
                prefix: true,
            },
            span,
        ))
    }

    /// `Postfix = Call [ "++" | "--" ]`
    ///
    /// A postfix operator must sit on the same line as its operand.
    fn parse_postfix(&mut self) -> Option<Expr> {
        let expr = self.parse_call()?;
        if !matches!(
            self.peek_kind(),
            TokenKind::PlusPlus | TokenKind::MinusMinus
        ) || self.on_new_line()
        {
            return Some(expr);
        }
        let token = self.advance();
        let op = update_op(&token.kind);
        let target = self.variable_target(&expr, "'++' and '--' only work on a variable name")?;
        let span = expr.span.merge(token.span);
        Some(Expr::new(
            ExprKind::Update {
                target,
                op,
                prefix: false,
            },
            span,
        ))
    }

    /// `Call = Primary { "(" Args ")" }`
    ///
    /// Member access and indexing are recognised only to be rejected.
    fn parse_call(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        let mut levels = 0;
        let result = loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    if !self.enter() {
                        break None;
                    }
                    levels += 1;
                    let open = self.advance().span;
                    let Some(args) = self.parse_arguments(open) else {
                        break None;
                    };
                    let span = expr.span.merge(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                TokenKind::Dot => {
                    let span = expr.span.merge(self.current_span());
                    self.error_with_suggestion(
                        ErrorCode::UNSUPPORTED_SYNTAX,
                        "'.' (member access) is not available in spells",
                        span,
                        "call spell commands directly, like moveRight()",
                    );
                    break None;
                }
                TokenKind::LBracket => {
                    let span = expr.span.merge(self.current_span());
                    self.error_with_suggestion(
                        ErrorCode::UNSUPPORTED_SYNTAX,
                        "indexing with '[ ]' is not available in spells",
                        span,
                        "keep each value in its own variable",
                    );
                    break None;
                }
                _ => break Some(expr),
            }
        };
        for _ in 0..levels {
            self.leave();
        }
        result
    }

    /// Parse call arguments after the opening `(`, through the closing `)`.
    fn parse_arguments(&mut self, open: Span) -> Option<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.check_exact(&TokenKind::RParen) {
            args.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_closing(&TokenKind::RParen, open)?;
        Some(args)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let kind = match self.peek_kind().clone() {
            TokenKind::NumberLit(n) => ExprKind::NumberLit(n),
            TokenKind::StringLiteral(s) => ExprKind::StringLit(s),
            TokenKind::True => ExprKind::BoolLit(true),
            TokenKind::False => ExprKind::BoolLit(false),
            TokenKind::Null => ExprKind::NullLit,
            TokenKind::Identifier(name) => ExprKind::Identifier(name),

            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect_closing(&TokenKind::RParen, start)?;
                let span = start.merge(self.previous_span());
                return Some(Expr::new(ExprKind::Paren(Box::new(inner)), span));
            }

            TokenKind::LBracket => {
                self.error_with_suggestion(
                    ErrorCode::UNSUPPORTED_SYNTAX,
                    "array literals are not available in spells",
                    start,
                    "repeat commands with a loop instead of a list",
                );
                return None;
            }
            TokenKind::LBrace => {
                self.error_with_suggestion(
                    ErrorCode::UNSUPPORTED_SYNTAX,
                    "object literals are not available in spells",
                    start,
                    "keep each value in its own variable",
                );
                return None;
            }
            TokenKind::Function => {
                self.error_with_suggestion(
                    ErrorCode::UNSUPPORTED_SYNTAX,
                    "function expressions are not available in spells",
                    start,
                    "declare a named function: function name() { ... }",
                );
                return None;
            }

            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected an expression, got '{other}'"),
                );
                return None;
            }
        };
        self.advance();
        Some(Expr::new(kind, start))
    }
}

fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}

fn logical(left: Expr, op: LogicalOp, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Logical {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}

fn update_op(kind: &TokenKind) -> UpdateOp {
    if *kind == TokenKind::MinusMinus {
        UpdateOp::Decrement
    } else {
        UpdateOp::Increment
    }
}
