//! Parser tests for the spell dialect.
//!
//! Covers: statements, declarations, loops, functions, operator precedence,
//! optional semicolons, rejected JavaScript features, and error recovery.

use spell_lexer::Lexer;
use spell_parser::{ParseResult, Parser, MAX_NESTING_DEPTH};
use spell_types::ast::*;
use spell_types::{ErrorCode, SourceFile};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn parse(source: &str) -> ParseResult {
    let sf = SourceFile::new("spell.js", source);
    let lexed = Lexer::new(&sf).lex();
    assert!(
        !lexed.errors.has_errors(),
        "unexpected lex errors: {:?}",
        lexed.errors.errors
    );
    Parser::new(lexed.tokens, &sf).parse()
}

/// Parse and assert no errors; return the statements.
fn parse_ok(source: &str) -> Vec<Stmt> {
    let result = parse(source);
    assert!(
        !result.errors.has_errors(),
        "unexpected errors for {source:?}: {:?}",
        result.errors.errors
    );
    result.program.body
}

/// Parse and return the first error's code.
fn first_error_code(source: &str) -> ErrorCode {
    let result = parse(source);
    result
        .errors
        .first()
        .unwrap_or_else(|| panic!("expected a parse error for {source:?}"))
        .code
}

/// Parse a single expression statement and return its expression.
fn parse_expr(source: &str) -> Expr {
    let mut stmts = parse_ok(source);
    assert_eq!(stmts.len(), 1);
    match stmts.remove(0) {
        Stmt::Expr(ExprStmt { expr, .. }) => expr,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

fn callee_name(expr: &Expr) -> &str {
    match &expr.kind {
        ExprKind::Call { callee, .. } => match &callee.kind {
            ExprKind::Identifier(name) => name,
            other => panic!("callee is not an identifier: {other:?}"),
        },
        other => panic!("expected call, got {other:?}"),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_empty_spell() {
    assert!(parse_ok("").is_empty());
    assert!(parse_ok("  // just a comment\n").is_empty());
}

#[test]
fn test_call_statements() {
    let stmts = parse_ok("moveRight();\nmoveDown();");
    assert_eq!(stmts.len(), 2);
    let Stmt::Expr(first) = &stmts[0] else {
        panic!("expected expression statement")
    };
    assert_eq!(callee_name(&first.expr), "moveRight");
}

#[test]
fn test_semicolons_optional_at_line_end() {
    let stmts = parse_ok("moveRight()\nmoveRight()\n{ moveUp() }");
    assert_eq!(stmts.len(), 3);
}

#[test]
fn test_two_statements_on_one_line_need_semicolon() {
    assert_eq!(
        first_error_code("moveRight() moveLeft()"),
        ErrorCode::UNEXPECTED_TOKEN
    );
}

#[test]
fn test_empty_statement() {
    let stmts = parse_ok(";;moveUp();");
    assert!(matches!(stmts[0], Stmt::Empty(_)));
    assert_eq!(stmts.len(), 3);
}

#[test]
fn test_var_declarations() {
    let stmts = parse_ok("let a = 1, b; const c = 2; var d = a + c;");
    let Stmt::VarDecl(decl) = &stmts[0] else {
        panic!("expected let")
    };
    assert_eq!(decl.kind, DeclKind::Let);
    assert_eq!(decl.declarators.len(), 2);
    assert!(decl.declarators[1].init.is_none());
    assert!(matches!(&stmts[1], Stmt::VarDecl(d) if d.kind == DeclKind::Const));
    assert!(matches!(&stmts[2], Stmt::VarDecl(d) if d.kind == DeclKind::Var));
}

#[test]
fn test_const_requires_initializer() {
    assert_eq!(first_error_code("const x;"), ErrorCode::MISSING_INITIALIZER);
}

#[test]
fn test_reserved_word_as_name() {
    let result = parse("let while = 3;");
    let err = result.errors.first().expect("error");
    assert!(err.message.contains("reserved word"));
}

#[test]
fn test_if_else_chain() {
    let stmts = parse_ok(
        "if (canMoveRight()) { moveRight(); } else if (canMoveDown()) moveDown(); else { moveUp(); }",
    );
    let Stmt::If(stmt) = &stmts[0] else {
        panic!("expected if")
    };
    assert!(matches!(*stmt.then_branch, Stmt::Block(_)));
    let Some(else_branch) = &stmt.else_branch else {
        panic!("expected else")
    };
    assert!(matches!(**else_branch, Stmt::If(_)));
}

#[test]
fn test_dangling_else_binds_to_nearest_if() {
    let stmts = parse_ok("if (a) if (b) moveUp(); else moveDown();");
    let Stmt::If(outer) = &stmts[0] else {
        panic!("expected if")
    };
    assert!(outer.else_branch.is_none());
    let Stmt::If(inner) = &*outer.then_branch else {
        panic!("expected nested if")
    };
    assert!(inner.else_branch.is_some());
}

#[test]
fn test_stray_else() {
    assert_eq!(first_error_code("else moveUp();"), ErrorCode::UNEXPECTED_TOKEN);
}

// ══════════════════════════════════════════════════════════════════════════════
// Loops
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_while_loop() {
    let stmts = parse_ok("while (canMoveRight()) { moveRight(); }");
    assert!(matches!(stmts[0], Stmt::While(_)));
}

#[test]
fn test_do_while_loop() {
    let stmts = parse_ok("do { moveRight(); } while (canMoveRight()); moveUp();");
    assert!(matches!(stmts[0], Stmt::DoWhile(_)));
    assert_eq!(stmts.len(), 2);
}

#[test]
fn test_counting_for_loop() {
    let stmts = parse_ok("for (let i = 0; i < 3; i++) { moveRight(); }");
    let Stmt::For(stmt) = &stmts[0] else {
        panic!("expected for")
    };
    assert!(matches!(stmt.init, Some(ForInit::VarDecl(_))));
    assert!(stmt.condition.is_some());
    assert!(matches!(
        stmt.update.as_ref().map(|e| &e.kind),
        Some(ExprKind::Update {
            prefix: false,
            op: UpdateOp::Increment,
            ..
        })
    ));
}

#[test]
fn test_for_loop_parts_optional() {
    let stmts = parse_ok("for (;;) { break; }");
    let Stmt::For(stmt) = &stmts[0] else {
        panic!("expected for")
    };
    assert!(stmt.init.is_none() && stmt.condition.is_none() && stmt.update.is_none());
}

#[test]
fn test_for_in_and_of_rejected() {
    assert_eq!(
        first_error_code("for (let x in things) { moveUp(); }"),
        ErrorCode::UNSUPPORTED_SYNTAX
    );
    assert_eq!(
        first_error_code("for (const step of steps) { step(); }"),
        ErrorCode::UNSUPPORTED_SYNTAX
    );
    let result = parse("for (x in y) {}");
    assert!(result.errors.first().unwrap().suggestion.is_some());
}

#[test]
fn test_break_continue_inside_loop() {
    parse_ok("while (true) { if (canMoveUp()) break; continue; }");
}

#[test]
fn test_break_outside_loop() {
    assert_eq!(first_error_code("break;"), ErrorCode::JUMP_OUTSIDE_LOOP);
    assert_eq!(
        first_error_code("if (true) { continue; }"),
        ErrorCode::JUMP_OUTSIDE_LOOP
    );
}

#[test]
fn test_loop_does_not_extend_into_function_body() {
    assert_eq!(
        first_error_code("while (true) { function f() { break; } f(); }"),
        ErrorCode::JUMP_OUTSIDE_LOOP
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Functions
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_function_declaration() {
    let stmts = parse_ok("function walk(n, dir) { return n; }");
    let Stmt::Function(decl) = &stmts[0] else {
        panic!("expected function")
    };
    assert_eq!(decl.name.name, "walk");
    let params: Vec<_> = decl.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(params, vec!["n", "dir"]);
    assert!(matches!(decl.body.stmts[0], Stmt::Return(ReturnStmt { value: Some(_), .. })));
}

#[test]
fn test_anonymous_function_rejected() {
    let result = parse("function () { moveUp(); }");
    let err = result.errors.first().expect("error");
    assert!(err.message.contains("needs a name"));
}

#[test]
fn test_function_expression_rejected() {
    assert_eq!(
        first_error_code("let f = function () { moveUp(); };"),
        ErrorCode::UNSUPPORTED_SYNTAX
    );
}

#[test]
fn test_return_without_value_at_line_end() {
    let stmts = parse_ok("return\nmoveUp()");
    assert!(matches!(stmts[0], Stmt::Return(ReturnStmt { value: None, .. })));
    assert_eq!(stmts.len(), 2);
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_multiplication_binds_tighter() {
    let expr = parse_expr("1 + 2 * 3;");
    let ExprKind::Binary { op, right, .. } = expr.kind else {
        panic!("expected binary")
    };
    assert_eq!(op, BinOp::Add);
    assert!(matches!(right.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
}

#[test]
fn test_and_binds_tighter_than_or() {
    let expr = parse_expr("a || b && c;");
    let ExprKind::Logical { op, right, .. } = expr.kind else {
        panic!("expected logical")
    };
    assert_eq!(op, LogicalOp::Or);
    assert!(matches!(
        right.kind,
        ExprKind::Logical {
            op: LogicalOp::And,
            ..
        }
    ));
}

#[test]
fn test_equality_operators() {
    for (src, expected) in [
        ("a == b;", BinOp::LooseEq),
        ("a != b;", BinOp::LooseNotEq),
        ("a === b;", BinOp::StrictEq),
        ("a !== b;", BinOp::StrictNotEq),
    ] {
        let expr = parse_expr(src);
        assert!(
            matches!(expr.kind, ExprKind::Binary { op, .. } if op == expected),
            "{src}"
        );
    }
}

#[test]
fn test_assignment_is_right_associative() {
    let expr = parse_expr("a = b = 3;");
    let ExprKind::Assign { target, value, .. } = expr.kind else {
        panic!("expected assignment")
    };
    assert_eq!(target.name, "a");
    assert!(matches!(value.kind, ExprKind::Assign { .. }));
}

#[test]
fn test_compound_assignment() {
    let expr = parse_expr("steps += 2;");
    assert!(matches!(
        expr.kind,
        ExprKind::Assign {
            op: AssignOp::Add,
            ..
        }
    ));
}

#[test]
fn test_invalid_assignment_target() {
    assert_eq!(
        first_error_code("moveRight() = 3;"),
        ErrorCode::INVALID_ASSIGNMENT_TARGET
    );
    assert_eq!(first_error_code("++5;"), ErrorCode::INVALID_ASSIGNMENT_TARGET);
}

#[test]
fn test_conditional_expression() {
    let expr = parse_expr("canMoveUp() ? moveUp() : moveDown();");
    assert!(matches!(expr.kind, ExprKind::Conditional { .. }));
}

#[test]
fn test_unary_and_prefix_update() {
    let expr = parse_expr("!canMoveUp();");
    assert!(matches!(
        expr.kind,
        ExprKind::Unary {
            op: UnaryOp::Not,
            ..
        }
    ));
    let expr = parse_expr("--n;");
    assert!(matches!(
        expr.kind,
        ExprKind::Update {
            op: UpdateOp::Decrement,
            prefix: true,
            ..
        }
    ));
}

#[test]
fn test_postfix_update_must_share_line() {
    // `a\n++b` is two statements: `a` then `++b`.
    let stmts = parse_ok("a\n++b");
    assert_eq!(stmts.len(), 2);
}

#[test]
fn test_primitive_as_value_and_call_chain() {
    let stmts = parse_ok("let step = moveRight; step(); pick()();");
    let Stmt::Expr(chained) = &stmts[2] else {
        panic!("expected expression")
    };
    let ExprKind::Call { callee, .. } = &chained.expr.kind else {
        panic!("expected call")
    };
    assert!(matches!(callee.kind, ExprKind::Call { .. }));
}

#[test]
fn test_call_arguments() {
    let expr = parse_expr("walk(3, 'right', n + 1,);");
    let ExprKind::Call { args, .. } = expr.kind else {
        panic!("expected call")
    };
    assert_eq!(args.len(), 3);
}

// ══════════════════════════════════════════════════════════════════════════════
// Rejected syntax
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_member_access_rejected_with_suggestion() {
    let result = parse("console.log('hi');");
    let err = result.errors.first().expect("error");
    assert_eq!(err.code, ErrorCode::UNSUPPORTED_SYNTAX);
    assert!(err.suggestion.as_deref().unwrap().contains("moveRight()"));
}

#[test]
fn test_indexing_and_literals_rejected() {
    assert_eq!(first_error_code("x[0];"), ErrorCode::UNSUPPORTED_SYNTAX);
    assert_eq!(first_error_code("let a = [1, 2];"), ErrorCode::UNSUPPORTED_SYNTAX);
    assert_eq!(first_error_code("let o = {};"), ErrorCode::UNSUPPORTED_SYNTAX);
}

// ══════════════════════════════════════════════════════════════════════════════
// Errors & recovery
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_missing_paren_reports_line() {
    let result = parse("moveRight();\nmoveRight(;\nmoveUp();");
    let err = result.errors.first().expect("error");
    assert_eq!(err.span.start_line, 2);
    assert_eq!(err.source_line, "moveRight(;");
}

#[test]
fn test_unclosed_block() {
    assert_eq!(
        first_error_code("while (true) { moveUp();"),
        ErrorCode::UNCLOSED_DELIMITER
    );
}

#[test]
fn test_unmatched_closing_brace() {
    assert_eq!(first_error_code("moveUp(); }"), ErrorCode::UNEXPECTED_TOKEN);
}

#[test]
fn test_recovers_and_reports_multiple_errors() {
    let result = parse("moveRight(;\nlet = 3;\nmoveUp();");
    assert_eq!(result.errors.total_errors, 2);
    // The good statement after the errors still parses.
    assert!(result
        .program
        .body
        .iter()
        .any(|s| matches!(s, Stmt::Expr(e) if callee_name(&e.expr) == "moveUp")));
}

#[test]
fn test_nesting_limit() {
    let depth = MAX_NESTING_DEPTH as usize + 5;
    let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(first_error_code(&source), ErrorCode::NESTING_LIMIT_EXCEEDED);
}

#[test]
fn test_long_operator_chain_hits_nesting_limit() {
    let source = format!("let x = 1{}\nmoveRight();", "+1".repeat(10_000));
    let result = parse(&source);
    assert!(result
        .errors
        .errors
        .iter()
        .any(|e| e.code == ErrorCode::NESTING_LIMIT_EXCEEDED));
}

#[test]
fn test_long_call_chain_hits_nesting_limit() {
    let source = format!("moveRight{}", "()".repeat(10_000));
    assert_eq!(first_error_code(&source), ErrorCode::NESTING_LIMIT_EXCEEDED);
}

#[test]
fn test_logical_chain_hits_nesting_limit() {
    let source = format!("let ok = a{}", " && a".repeat(5_000));
    assert_eq!(first_error_code(&source), ErrorCode::NESTING_LIMIT_EXCEEDED);
}

#[test]
fn test_short_operator_chain_is_fine() {
    let source = format!("let x = 1{}", " + 1".repeat(20));
    parse_ok(&source);
}

#[test]
fn test_reasonable_nesting_is_fine() {
    let source = "if (a) { while (b) { for (;;) { if (c) { moveUp(); } break; } } }";
    parse_ok(source);
}
