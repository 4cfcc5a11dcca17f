//! Statement parsing.

use std::rc::Rc;

use crate::parser::Parser;
use spell_lexer::token::TokenKind;
use spell_types::ast::*;
use spell_types::ErrorCode;

impl<'src> Parser<'src> {
    /// Parse a block of statements: `{ stmts... }`
    pub(crate) fn parse_block(&mut self) -> Option<Block> {
        let start = self.current_span();
        self.expect(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) && !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            let before = self.position();
            match self.parse_statement() {
                Some(stmt) => stmts.push(stmt),
                None => self.recover_from(before),
            }
        }
        self.expect_closing(&TokenKind::RBrace, start)?;
        let span = start.merge(self.previous_span());
        Some(Block { stmts, span })
    }

    /// Parse a single statement.
    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        if !self.enter() {
            return None;
        }
        let stmt = self.parse_statement_inner();
        self.leave();
        stmt
    }

    fn parse_statement_inner(&mut self) -> Option<Stmt> {
        match self.peek_kind() {
            TokenKind::LBrace => self.parse_block().map(Stmt::Block),
            TokenKind::Let | TokenKind::Const | TokenKind::Var => {
                let decl = self.parse_var_decl()?;
                self.expect_semicolon();
                Some(Stmt::VarDecl(decl))
            }
            TokenKind::Function => self.parse_function_decl(),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::Do => self.parse_do_while_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Break | TokenKind::Continue => self.parse_jump_stmt(),
            TokenKind::Semicolon => Some(Stmt::Empty(self.advance().span)),
            TokenKind::Else => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    "'else' must follow the statement of an 'if'",
                );
                None
            }
            _ => {
                let expr = self.parse_expression()?;
                let span = expr.span;
                self.expect_semicolon();
                Some(Stmt::Expr(ExprStmt { expr, span }))
            }
        }
    }

    /// `let a = 1, b;` / `const c = 2;` / `var d;` (without the `;`)
    pub(crate) fn parse_var_decl(&mut self) -> Option<VarDecl> {
        let start = self.current_span();
        let kind = match self.advance().kind {
            TokenKind::Const => DeclKind::Const,
            TokenKind::Var => DeclKind::Var,
            _ => DeclKind::Let,
        };
        let mut declarators = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let init = if self.eat(&TokenKind::Eq) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            if kind == DeclKind::Const && init.is_none() {
                self.error_with_suggestion(
                    ErrorCode::MISSING_INITIALIZER,
                    format!("const '{}' must be given a value", name.name),
                    name.span,
                    format!("write it as: const {} = ...;", name.name),
                );
            }
            declarators.push(Declarator { name, init });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let span = start.merge(self.previous_span());
        Some(VarDecl {
            kind,
            declarators,
            span,
        })
    }

    /// `function name(a, b) { ... }`
    fn parse_function_decl(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `function`
        if self.check_exact(&TokenKind::LParen) {
            self.error_with_suggestion(
                ErrorCode::UNEXPECTED_TOKEN,
                "a function needs a name",
                self.current_span(),
                "write it as: function name() { ... }",
            );
            return None;
        }
        let name = self.expect_identifier()?;
        let open = self.expect(&TokenKind::LParen)?.span;
        let mut params = Vec::new();
        if !self.check_exact(&TokenKind::RParen) {
            loop {
                params.push(self.expect_identifier()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect_closing(&TokenKind::RParen, open)?;

        // Loops around a declaration do not extend into its body.
        let outer_loops = std::mem::replace(&mut self.loop_depth, 0);
        let body = self.parse_block();
        self.loop_depth = outer_loops;
        let body = body?;

        let span = start.merge(body.span);
        Some(Stmt::Function(Rc::new(FunctionDecl {
            name,
            params,
            body,
            span,
        })))
    }

    /// `(condition)` as used by `if`, `while` and `do ... while`.
    fn parse_paren_condition(&mut self) -> Option<Expr> {
        let open = self.expect(&TokenKind::LParen)?.span;
        let condition = self.parse_expression()?;
        self.expect_closing(&TokenKind::RParen, open)?;
        Some(condition)
    }

    /// `if (cond) stmt [else stmt]`
    fn parse_if_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `if`
        let condition = self.parse_paren_condition()?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        let span = start.merge(self.previous_span());
        Some(Stmt::If(IfStmt {
            condition,
            then_branch,
            else_branch,
            span,
        }))
    }

    /// Parse a loop body with `break`/`continue` permitted.
    fn parse_loop_body(&mut self) -> Option<Box<Stmt>> {
        self.loop_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;
        body.map(Box::new)
    }

    /// `while (cond) stmt`
    fn parse_while_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `while`
        let condition = self.parse_paren_condition()?;
        let body = self.parse_loop_body()?;
        let span = start.merge(self.previous_span());
        Some(Stmt::While(WhileStmt {
            condition,
            body,
            span,
        }))
    }

    /// `do stmt while (cond);`
    fn parse_do_while_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `do`
        let body = self.parse_loop_body()?;
        self.expect(&TokenKind::While)?;
        let condition = self.parse_paren_condition()?;
        self.eat(&TokenKind::Semicolon);
        let span = start.merge(self.previous_span());
        Some(Stmt::DoWhile(DoWhileStmt {
            body,
            condition,
            span,
        }))
    }

    /// `for (init; cond; update) stmt`
    fn parse_for_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `for`
        let open = self.expect(&TokenKind::LParen)?.span;

        if self.is_for_in_or_of() {
            self.error_with_suggestion(
                ErrorCode::UNSUPPORTED_SYNTAX,
                "for...in and for...of loops are not available in spells",
                start.merge(self.current_span()),
                "use a counting loop: for (let i = 0; i < 3; i++) { ... }",
            );
            return None;
        }

        let init = if self.eat(&TokenKind::Semicolon) {
            None
        } else {
            let init = match self.peek_kind() {
                TokenKind::Let | TokenKind::Const | TokenKind::Var => {
                    ForInit::VarDecl(self.parse_var_decl()?)
                }
                _ => ForInit::Expr(self.parse_expression()?),
            };
            self.expect(&TokenKind::Semicolon)?;
            Some(init)
        };

        let condition = if self.check_exact(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;

        let update = if self.check_exact(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_closing(&TokenKind::RParen, open)?;

        let body = self.parse_loop_body()?;
        let span = start.merge(self.previous_span());
        Some(Stmt::For(ForStmt {
            init,
            condition,
            update,
            body,
            span,
        }))
    }

    /// `x in`, `let x in`, `x of`, `const x of` right after `for (`.
    fn is_for_in_or_of(&self) -> bool {
        let binding_at = match self.peek_kind() {
            TokenKind::Let | TokenKind::Const | TokenKind::Var => 1,
            _ => 0,
        };
        if !matches!(self.look_ahead(binding_at), TokenKind::Identifier(_)) {
            return false;
        }
        match self.look_ahead(binding_at + 1) {
            TokenKind::In => true,
            TokenKind::Identifier(word) => word == "of",
            _ => false,
        }
    }

    /// `return [expr];`
    fn parse_return_stmt(&mut self) -> Option<Stmt> {
        let start = self.advance().span; // eat `return`
        let value = if self.check_exact(&TokenKind::Semicolon)
            || self.check_exact(&TokenKind::RBrace)
            || self.at_end()
            || self.on_new_line()
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let span = start.merge(self.previous_span());
        self.expect_semicolon();
        Some(Stmt::Return(ReturnStmt { value, span }))
    }

    /// `break;` / `continue;`
    fn parse_jump_stmt(&mut self) -> Option<Stmt> {
        let token = self.advance();
        let is_break = token.kind == TokenKind::Break;
        if self.loop_depth == 0 {
            self.error_at(
                ErrorCode::JUMP_OUTSIDE_LOOP,
                format!("'{}' can only be used inside a loop", token.kind),
                token.span,
            );
        }
        self.expect_semicolon();
        Some(if is_break {
            Stmt::Break(token.span)
        } else {
            Stmt::Continue(token.span)
        })
    }
}
