//! Static passes over a spell before it runs: the unknown-name check and
//! `var` hoisting.

use std::collections::BTreeSet;

use spell_types::ast::*;
use spell_types::CompileError;

use crate::primitives::BindingTable;

/// Reject any referenced name that the spell never declares and the binding
/// table does not provide.
///
/// Reports the first such name in source order. Scoping mistakes (a name
/// declared somewhere, but not visible where it is used) are left for the
/// evaluator to catch.
pub fn check_names(program: &Program, table: &BindingTable) -> Result<(), CompileError> {
    let mut declared = BTreeSet::new();
    collect_declarations(&program.body, &mut declared);
    let checker = NameCheck { declared, table };
    checker.stmts(&program.body)
}

/// `var` names declared directly in `stmts`, including inside nested blocks
/// and loops but not inside nested functions.
pub(crate) fn hoisted_vars(stmts: &[Stmt]) -> Vec<String> {
    let mut names = Vec::new();
    for stmt in stmts {
        collect_vars(stmt, &mut names);
    }
    names
}

fn collect_vars(stmt: &Stmt, names: &mut Vec<String>) {
    match stmt {
        Stmt::VarDecl(decl) if decl.kind == DeclKind::Var => {
            names.extend(decl.declarators.iter().map(|d| d.name.name.clone()));
        }
        Stmt::If(s) => {
            collect_vars(&s.then_branch, names);
            if let Some(else_branch) = &s.else_branch {
                collect_vars(else_branch, names);
            }
        }
        Stmt::While(s) => collect_vars(&s.body, names),
        Stmt::DoWhile(s) => collect_vars(&s.body, names),
        Stmt::For(s) => {
            if let Some(ForInit::VarDecl(decl)) = &s.init {
                if decl.kind == DeclKind::Var {
                    names.extend(decl.declarators.iter().map(|d| d.name.name.clone()));
                }
            }
            collect_vars(&s.body, names);
        }
        Stmt::Block(block) => {
            for stmt in &block.stmts {
                collect_vars(stmt, names);
            }
        }
        _ => {}
    }
}

fn collect_declarations(stmts: &[Stmt], out: &mut BTreeSet<String>) {
    for stmt in stmts {
        collect_declarations_in(stmt, out);
    }
}

fn collect_declarations_in(stmt: &Stmt, out: &mut BTreeSet<String>) {
    match stmt {
        Stmt::VarDecl(decl) => add_declarators(decl, out),
        Stmt::Function(decl) => {
            out.insert(decl.name.name.clone());
            out.extend(decl.params.iter().map(|p| p.name.clone()));
            collect_declarations(&decl.body.stmts, out);
        }
        Stmt::If(s) => {
            collect_declarations_in(&s.then_branch, out);
            if let Some(else_branch) = &s.else_branch {
                collect_declarations_in(else_branch, out);
            }
        }
        Stmt::While(s) => collect_declarations_in(&s.body, out),
        Stmt::DoWhile(s) => collect_declarations_in(&s.body, out),
        Stmt::For(s) => {
            if let Some(ForInit::VarDecl(decl)) = &s.init {
                add_declarators(decl, out);
            }
            collect_declarations_in(&s.body, out);
        }
        Stmt::Block(block) => collect_declarations(&block.stmts, out),
        Stmt::Return(_) | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Expr(_) | Stmt::Empty(_) => {}
    }
}

fn add_declarators(decl: &VarDecl, out: &mut BTreeSet<String>) {
    out.extend(decl.declarators.iter().map(|d| d.name.name.clone()));
}

struct NameCheck<'a> {
    declared: BTreeSet<String>,
    table: &'a BindingTable,
}

impl NameCheck<'_> {
    fn name(&self, name: &str, span: spell_types::Span) -> Result<(), CompileError> {
        if self.declared.contains(name) || self.table.contains(name) {
            Ok(())
        } else {
            Err(CompileError::UnknownCommand {
                name: name.to_string(),
                span,
            })
        }
    }

    fn stmts(&self, stmts: &[Stmt]) -> Result<(), CompileError> {
        stmts.iter().try_for_each(|s| self.stmt(s))
    }

    fn stmt(&self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::VarDecl(decl) => self.var_decl(decl),
            Stmt::Function(decl) => self.stmts(&decl.body.stmts),
            Stmt::If(s) => {
                self.expr(&s.condition)?;
                self.stmt(&s.then_branch)?;
                match &s.else_branch {
                    Some(else_branch) => self.stmt(else_branch),
                    None => Ok(()),
                }
            }
            Stmt::While(s) => {
                self.expr(&s.condition)?;
                self.stmt(&s.body)
            }
            Stmt::DoWhile(s) => {
                self.stmt(&s.body)?;
                self.expr(&s.condition)
            }
            Stmt::For(s) => {
                match &s.init {
                    Some(ForInit::VarDecl(decl)) => self.var_decl(decl)?,
                    Some(ForInit::Expr(e)) => self.expr(e)?,
                    None => {}
                }
                if let Some(condition) = &s.condition {
                    self.expr(condition)?;
                }
                if let Some(update) = &s.update {
                    self.expr(update)?;
                }
                self.stmt(&s.body)
            }
            Stmt::Block(block) => self.stmts(&block.stmts),
            Stmt::Return(ret) => match &ret.value {
                Some(value) => self.expr(value),
                None => Ok(()),
            },
            Stmt::Expr(s) => self.expr(&s.expr),
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) => Ok(()),
        }
    }

    fn var_decl(&self, decl: &VarDecl) -> Result<(), CompileError> {
        decl.declarators
            .iter()
            .filter_map(|d| d.init.as_ref())
            .try_for_each(|init| self.expr(init))
    }

    fn expr(&self, expr: &Expr) -> Result<(), CompileError> {
        match &expr.kind {
            ExprKind::NumberLit(_)
            | ExprKind::StringLit(_)
            | ExprKind::BoolLit(_)
            | ExprKind::NullLit => Ok(()),
            ExprKind::Identifier(name) => self.name(name, expr.span),
            ExprKind::Call { callee, args } => {
                self.expr(callee)?;
                args.iter().try_for_each(|a| self.expr(a))
            }
            ExprKind::Unary { operand, .. } => self.expr(operand),
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.expr(left)?;
                self.expr(right)
            }
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                self.expr(condition)?;
                self.expr(then_expr)?;
                self.expr(else_expr)
            }
            ExprKind::Assign { target, value, .. } => {
                self.name(&target.name, target.span)?;
                self.expr(value)
            }
            ExprKind::Update { target, .. } => self.name(&target.name, target.span),
            ExprKind::Paren(inner) => self.expr(inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spell_types::Span;

    fn ident_expr(name: &str, col: u32) -> Expr {
        Expr::new(ExprKind::Identifier(name.into()), Span::new(1, col, 1, col))
    }

    fn call(name: &str, col: u32) -> Stmt {
        let expr = Expr::new(
            ExprKind::Call {
                callee: Box::new(ident_expr(name, col)),
                args: vec![],
            },
            Span::point(1, col),
        );
        Stmt::Expr(ExprStmt {
            span: expr.span,
            expr,
        })
    }

    fn program(body: Vec<Stmt>) -> Program {
        Program {
            body,
            span: Span::point(1, 1),
        }
    }

    #[test]
    fn test_known_names_pass() {
        let p = program(vec![call("moveRight", 1), call("undefined", 5)]);
        assert!(check_names(&p, &BindingTable::standard()).is_ok());
    }

    #[test]
    fn test_first_unknown_name_reported() {
        let p = program(vec![
            call("moveRight", 1),
            call("moveForward", 14),
            call("jump", 30),
        ]);
        let err = check_names(&p, &BindingTable::standard()).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownCommand {
                name: "moveForward".into(),
                span: Span::new(1, 14, 1, 14),
            }
        );
    }

    #[test]
    fn test_restricted_table_rejects_other_commands() {
        let p = program(vec![call("moveLeft", 1)]);
        let table = BindingTable::restricted(["moveRight"]);
        assert!(matches!(
            check_names(&p, &table),
            Err(CompileError::UnknownCommand { name, .. }) if name == "moveLeft"
        ));
    }

    #[test]
    fn test_hoisted_vars_skip_nested_functions() {
        let var = |name: &str| {
            Stmt::VarDecl(VarDecl {
                kind: DeclKind::Var,
                declarators: vec![Declarator {
                    name: Ident::new(name, Span::point(1, 1)),
                    init: None,
                }],
                span: Span::point(1, 1),
            })
        };
        let nested = Stmt::Function(std::rc::Rc::new(FunctionDecl {
            name: Ident::new("f", Span::point(1, 1)),
            params: vec![],
            body: Block {
                stmts: vec![var("inner")],
                span: Span::point(1, 1),
            },
            span: Span::point(1, 1),
        }));
        let block = Stmt::Block(Block {
            stmts: vec![var("b")],
            span: Span::point(1, 1),
        });
        let names = hoisted_vars(&[var("a"), block, nested]);
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }
}
