//! Core statement and expression evaluator.
//!
//! Walks the spell AST once, recording every move and torch command on a
//! [`SpellCursor`]. Nothing here touches the real avatar: the result is a
//! plain action list for the runner to replay.

use std::rc::Rc;

use spell_types::ast::*;
use spell_types::{Action, Maze, Position, RuntimeTrapError, Span, SpellError};

use crate::env::{AlreadyDeclared, AssignError, Environment};
use crate::error::{EvalError, EvalResult};
use crate::primitives::{BindingTable, Primitive, SpellCursor};
use crate::resolve::hoisted_vars;
use crate::value::{Closure, Value};

/// Most actions a single spell may produce.
pub const DEFAULT_ACTION_CEILING: usize = 1000;
/// Evaluation steps allowed before the watchdog fires.
pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000;
/// Deepest nesting of user function calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 100;
/// Longest string, in bytes, that `+` may build.
pub const DEFAULT_MAX_STRING_LENGTH: usize = 64 * 1024;

/// Resource bounds for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalLimits {
    pub action_ceiling: usize,
    pub gas_limit: u64,
    pub max_call_depth: usize,
    pub max_string_length: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            action_ceiling: DEFAULT_ACTION_CEILING,
            gas_limit: DEFAULT_GAS_LIMIT,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
        }
    }
}

/// The tree-walking evaluator for a single spell run.
pub struct Evaluator<'m> {
    env: Environment,
    cursor: SpellCursor<'m>,
    /// Gas counter: one unit per statement and per expression.
    gas: u64,
    limits: EvalLimits,
    call_depth: usize,
}

impl<'m> Evaluator<'m> {
    pub fn new(maze: &'m Maze, start: Position, table: &BindingTable, limits: EvalLimits) -> Self {
        Self {
            env: Environment::new(table),
            cursor: SpellCursor::new(maze, start, limits.action_ceiling),
            gas: 0,
            limits,
            call_depth: 0,
        }
    }

    /// Gas consumed so far.
    pub fn gas_used(&self) -> u64 {
        self.gas
    }

    /// Run the whole spell and hand back the recorded actions.
    ///
    /// A top-level `return` ends the spell early without error.
    pub fn run(mut self, program: &Program) -> Result<Vec<Action>, SpellError> {
        self.hoist_vars(&program.body);
        match self.exec_stmts(&program.body) {
            Ok(()) | Err(EvalError::Return(_)) => Ok(self.cursor.into_actions()),
            Err(err) => Err(err.into()),
        }
    }

    /// Consume one unit of gas. Returns error if exhausted.
    fn tick(&mut self) -> EvalResult<()> {
        self.gas += 1;
        if self.gas > self.limits.gas_limit {
            Err(RuntimeTrapError::Watchdog {
                limit: self.limits.gas_limit,
            }
            .into())
        } else {
            Ok(())
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Hoisting
    // ══════════════════════════════════════════════════════════════════════

    fn hoist_vars(&mut self, stmts: &[Stmt]) {
        for name in hoisted_vars(stmts) {
            // `var` never collides.
            let _ = self.env.declare(&name, None, DeclKind::Var);
        }
    }

    /// Bind every function declared directly in `stmts` to the current scope.
    fn hoist_functions(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            if let Stmt::Function(decl) = stmt {
                let closure = Closure {
                    decl: Rc::clone(decl),
                    scope: self.env.current_scope(),
                };
                self.env
                    .define_function(&decl.name.name, Value::Function(Rc::new(closure)));
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    fn exec_stmts(&mut self, stmts: &[Stmt]) -> EvalResult<()> {
        self.hoist_functions(stmts);
        stmts.iter().try_for_each(|stmt| self.exec_stmt(stmt))
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> EvalResult<()> {
        self.tick()?;
        match stmt {
            Stmt::VarDecl(decl) => self.exec_var_decl(decl),
            // Bound when the enclosing block was entered.
            Stmt::Function(_) => Ok(()),
            Stmt::If(s) => {
                if self.eval_expr(&s.condition)?.is_truthy() {
                    self.exec_stmt(&s.then_branch)
                } else if let Some(else_branch) = &s.else_branch {
                    self.exec_stmt(else_branch)
                } else {
                    Ok(())
                }
            }
            Stmt::While(s) => {
                while self.eval_expr(&s.condition)?.is_truthy() {
                    if !self.exec_loop_body(&s.body)? {
                        break;
                    }
                }
                Ok(())
            }
            Stmt::DoWhile(s) => {
                loop {
                    if !self.exec_loop_body(&s.body)? {
                        break;
                    }
                    if !self.eval_expr(&s.condition)?.is_truthy() {
                        break;
                    }
                }
                Ok(())
            }
            Stmt::For(s) => {
                self.env.push_scope();
                let result = self.exec_for(s);
                self.env.pop_scope();
                result
            }
            Stmt::Block(block) => {
                self.env.push_scope();
                let result = self.exec_stmts(&block.stmts);
                self.env.pop_scope();
                result
            }
            Stmt::Return(ret) => {
                let value = match &ret.value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Undefined,
                };
                Err(EvalError::Return(value))
            }
            Stmt::Break(_) => Err(EvalError::Break),
            Stmt::Continue(_) => Err(EvalError::Continue),
            Stmt::Expr(s) => self.eval_expr(&s.expr).map(drop),
            Stmt::Empty(_) => Ok(()),
        }
    }

    /// Run one loop iteration. Returns `false` when the loop should stop.
    fn exec_loop_body(&mut self, body: &Stmt) -> EvalResult<bool> {
        match self.exec_stmt(body) {
            Ok(()) | Err(EvalError::Continue) => Ok(true),
            Err(EvalError::Break) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn exec_for(&mut self, s: &ForStmt) -> EvalResult<()> {
        match &s.init {
            Some(ForInit::VarDecl(decl)) => self.exec_var_decl(decl)?,
            Some(ForInit::Expr(expr)) => {
                self.eval_expr(expr)?;
            }
            None => {}
        }
        loop {
            if let Some(condition) = &s.condition {
                if !self.eval_expr(condition)?.is_truthy() {
                    break;
                }
            }
            if !self.exec_loop_body(&s.body)? {
                break;
            }
            if let Some(update) = &s.update {
                self.eval_expr(update)?;
            }
        }
        Ok(())
    }

    fn exec_var_decl(&mut self, decl: &VarDecl) -> EvalResult<()> {
        for declarator in &decl.declarators {
            let value = match &declarator.init {
                Some(init) => Some(self.eval_expr(init)?),
                None => None,
            };
            self.declare(&declarator.name, value, decl.kind)?;
        }
        Ok(())
    }

    fn declare(&mut self, name: &Ident, value: Option<Value>, kind: DeclKind) -> EvalResult<()> {
        self.env
            .declare(&name.name, value, kind)
            .map_err(|AlreadyDeclared| {
                EvalError::type_error(
                    format!("`{}` has already been declared in this block.", name.name),
                    name.span,
                )
            })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    /// Evaluate an expression to a Value.
    pub fn eval_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        self.tick()?;
        match &expr.kind {
            ExprKind::NumberLit(n) => Ok(Value::Number(*n)),
            ExprKind::StringLit(s) => Ok(Value::String(s.clone())),
            ExprKind::BoolLit(b) => Ok(Value::Bool(*b)),
            ExprKind::NullLit => Ok(Value::Null),
            ExprKind::Identifier(name) => self.lookup(name, expr.span),

            ExprKind::Call { callee, args } => self.eval_call(callee, args, expr.span),
            ExprKind::Unary { op, operand } => {
                let value = self.eval_expr(operand)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                })
            }
            ExprKind::Binary { left, op, right } => {
                let lhs = self.eval_expr(left)?;
                let rhs = self.eval_expr(right)?;
                self.binary(*op, &lhs, &rhs, expr.span)
            }
            ExprKind::Logical { left, op, right } => {
                let lhs = self.eval_expr(left)?;
                let short_circuits = match op {
                    LogicalOp::And => !lhs.is_truthy(),
                    LogicalOp::Or => lhs.is_truthy(),
                };
                if short_circuits {
                    Ok(lhs)
                } else {
                    self.eval_expr(right)
                }
            }
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                if self.eval_expr(condition)?.is_truthy() {
                    self.eval_expr(then_expr)
                } else {
                    self.eval_expr(else_expr)
                }
            }
            ExprKind::Assign { target, op, value } => self.eval_assign(target, *op, value),
            ExprKind::Update { target, op, prefix } => {
                let old = self.lookup(&target.name, target.span)?.to_number();
                let new = match op {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.store(target, Value::Number(new))?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            ExprKind::Paren(inner) => self.eval_expr(inner),
        }
    }

    fn lookup(&self, name: &str, span: Span) -> EvalResult<Value> {
        self.env.get(name).ok_or_else(|| EvalError::UnknownName {
            name: name.to_string(),
            span,
        })
    }

    fn eval_assign(&mut self, target: &Ident, op: AssignOp, value: &Expr) -> EvalResult<Value> {
        let new_value = match op.binary() {
            None => self.eval_expr(value)?,
            Some(bin) => {
                let current = self.lookup(&target.name, target.span)?;
                let rhs = self.eval_expr(value)?;
                self.binary(bin, &current, &rhs, target.span.merge(value.span))?
            }
        };
        self.store(target, new_value.clone())?;
        Ok(new_value)
    }

    /// [`apply_binary`], refusing string results past the length limit.
    fn binary(&self, op: BinOp, lhs: &Value, rhs: &Value, span: Span) -> EvalResult<Value> {
        let value = apply_binary(op, lhs, rhs);
        match &value {
            Value::String(text) if text.len() > self.limits.max_string_length => {
                Err(RuntimeTrapError::StringTooLong {
                    limit: self.limits.max_string_length,
                    span,
                }
                .into())
            }
            _ => Ok(value),
        }
    }

    fn store(&mut self, target: &Ident, value: Value) -> EvalResult<()> {
        self.env
            .assign(&target.name, value)
            .map_err(|err| match err {
                AssignError::Undeclared => EvalError::UnknownName {
                    name: target.name.clone(),
                    span: target.span,
                },
                AssignError::Constant => EvalError::type_error(
                    format!(
                        "`{}` cannot be changed. Use `let` for values that change.",
                        target.name
                    ),
                    target.span,
                ),
            })
    }

    // ── Calls ─────────────────────────────────────────────────────────────

    fn eval_call(&mut self, callee: &Expr, args: &[Expr], span: Span) -> EvalResult<Value> {
        let function = self.eval_expr(callee)?;
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expr(arg)?);
        }
        match function {
            Value::Primitive(primitive) => self.call_primitive(primitive, span),
            Value::Function(closure) => self.call_function(&closure, values, span),
            other => {
                let what = match &callee.kind {
                    ExprKind::Identifier(name) => format!("`{name}`"),
                    _ => "This value".to_string(),
                };
                Err(EvalError::type_error(
                    format!("{what} is not a function, it is {}.", other.type_name()),
                    span,
                ))
            }
        }
    }

    /// Spell commands ignore their arguments.
    fn call_primitive(&mut self, primitive: Primitive, span: Span) -> EvalResult<Value> {
        match primitive.direction() {
            Some(direction) if primitive.is_query() => {
                Ok(Value::Bool(self.cursor.can_step(direction)))
            }
            Some(direction) => {
                self.cursor.step(direction)?;
                Ok(Value::Undefined)
            }
            None => {
                self.cursor.light_torch(span)?;
                Ok(Value::Undefined)
            }
        }
    }

    fn call_function(
        &mut self,
        closure: &Closure,
        args: Vec<Value>,
        span: Span,
    ) -> EvalResult<Value> {
        if self.call_depth >= self.limits.max_call_depth {
            return Err(RuntimeTrapError::RecursionLimit {
                depth: self.limits.max_call_depth,
                span,
            }
            .into());
        }
        self.call_depth += 1;
        let caller = self.env.enter_function(Rc::clone(&closure.scope));
        let result = self.exec_function_body(&closure.decl, args);
        self.env.exit_function(caller);
        self.call_depth -= 1;

        match result {
            Ok(()) => Ok(Value::Undefined),
            Err(EvalError::Return(value)) => Ok(value),
            Err(e) => Err(e),
        }
    }

    fn exec_function_body(&mut self, decl: &FunctionDecl, args: Vec<Value>) -> EvalResult<()> {
        let mut args = args.into_iter();
        for param in &decl.params {
            let value = args.next().unwrap_or(Value::Undefined);
            self.declare(param, Some(value), DeclKind::Var)?;
        }
        self.hoist_vars(&decl.body.stmts);
        self.exec_stmts(&decl.body.stmts)
    }
}

/// Apply a binary operator with JavaScript's coercions.
fn apply_binary(op: BinOp, lhs: &Value, rhs: &Value) -> Value {
    match op {
        BinOp::Add => {
            if concatenates(lhs) || concatenates(rhs) {
                Value::String(format!("{lhs}{rhs}"))
            } else {
                Value::Number(lhs.to_number() + rhs.to_number())
            }
        }
        BinOp::Sub => Value::Number(lhs.to_number() - rhs.to_number()),
        BinOp::Mul => Value::Number(lhs.to_number() * rhs.to_number()),
        BinOp::Div => Value::Number(lhs.to_number() / rhs.to_number()),
        BinOp::Mod => Value::Number(lhs.to_number() % rhs.to_number()),
        BinOp::LooseEq => Value::Bool(lhs.loose_eq(rhs)),
        BinOp::LooseNotEq => Value::Bool(!lhs.loose_eq(rhs)),
        BinOp::StrictEq => Value::Bool(lhs.strict_eq(rhs)),
        BinOp::StrictNotEq => Value::Bool(!lhs.strict_eq(rhs)),
        BinOp::Less | BinOp::Greater | BinOp::LessEq | BinOp::GreaterEq => {
            Value::Bool(compare(op, lhs, rhs))
        }
    }
}

/// Strings and functions turn `+` into concatenation.
fn concatenates(value: &Value) -> bool {
    matches!(
        value,
        Value::String(_) | Value::Function(_) | Value::Primitive(_)
    )
}

fn compare(op: BinOp, lhs: &Value, rhs: &Value) -> bool {
    if let (Value::String(a), Value::String(b)) = (lhs, rhs) {
        return match op {
            BinOp::Less => a < b,
            BinOp::Greater => a > b,
            BinOp::LessEq => a <= b,
            _ => a >= b,
        };
    }
    // NaN compares false either way.
    let (a, b) = (lhs.to_number(), rhs.to_number());
    match op {
        BinOp::Less => a < b,
        BinOp::Greater => a > b,
        BinOp::LessEq => a <= b,
        _ => a >= b,
    }
}
