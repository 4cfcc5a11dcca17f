//! Scoped variable environment for the spell evaluator.
//!
//! Scopes form a parent-linked chain: block scopes for `let`/`const`,
//! function scopes for parameters and `var`, then the global scope, and
//! finally the builtins scope holding the binding table.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use spell_types::ast::DeclKind;

use crate::primitives::{BindingTable, UNDEFINED};
use crate::value::Value;

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    constant: bool,
}

/// A single scope level.
pub struct Scope {
    bindings: RefCell<BTreeMap<String, Binding>>,
    parent: Option<Rc<Scope>>,
    /// Function bodies and the global scope; `var` declarations land here.
    function_scope: bool,
    /// Set once a function value has been stored here.
    holds_functions: Cell<bool>,
}

impl Scope {
    fn new(parent: Option<Rc<Scope>>, function_scope: bool) -> Self {
        Self {
            bindings: RefCell::new(BTreeMap::new()),
            parent,
            function_scope,
            holds_functions: Cell::new(false),
        }
    }

    fn find(self: &Rc<Self>, name: &str) -> Option<Rc<Scope>> {
        let mut scope = Some(Rc::clone(self));
        while let Some(s) = scope {
            if s.bindings.borrow().contains_key(name) {
                return Some(s);
            }
            scope = s.parent.clone();
        }
        None
    }
}

/// Why an assignment was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignError {
    /// No scope declares the name.
    Undeclared,
    /// The name is a `const` or a builtin.
    Constant,
}

/// A `let`/`const` name declared twice in the same scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyDeclared;

/// Scoped variable environment with push/pop semantics.
///
/// Variables are looked up from the innermost scope outward.
pub struct Environment {
    current: Rc<Scope>,
    /// Scopes that store function values. A closure keeps its defining scope
    /// alive, so these are emptied on drop to release the cycle.
    holders: Vec<Rc<Scope>>,
}

impl Environment {
    /// Create an environment whose outermost scope exposes `table`.
    pub fn new(table: &BindingTable) -> Self {
        let builtins = Scope::new(None, false);
        {
            let mut bindings = builtins.bindings.borrow_mut();
            bindings.insert(
                UNDEFINED.to_string(),
                Binding {
                    value: Value::Undefined,
                    constant: true,
                },
            );
            for primitive in table.primitives() {
                bindings.insert(
                    primitive.name().to_string(),
                    Binding {
                        value: Value::Primitive(primitive),
                        constant: true,
                    },
                );
            }
        }
        let global = Scope::new(Some(Rc::new(builtins)), true);
        Self {
            current: Rc::new(global),
            holders: Vec::new(),
        }
    }

    /// Push a new block scope.
    pub fn push_scope(&mut self) {
        let parent = Rc::clone(&self.current);
        self.current = Rc::new(Scope::new(Some(parent), false));
    }

    /// Pop the innermost scope.
    pub fn pop_scope(&mut self) {
        if let Some(parent) = self.current.parent.clone() {
            self.current = parent;
        }
    }

    /// The innermost scope, for closures to capture.
    pub fn current_scope(&self) -> Rc<Scope> {
        Rc::clone(&self.current)
    }

    /// Enter a function body whose closure captured `captured`. Returns the
    /// caller's scope, to be handed back to [`Environment::exit_function`].
    pub fn enter_function(&mut self, captured: Rc<Scope>) -> Rc<Scope> {
        let frame = Rc::new(Scope::new(Some(captured), true));
        std::mem::replace(&mut self.current, frame)
    }

    pub fn exit_function(&mut self, caller: Rc<Scope>) {
        self.current = caller;
    }

    /// Declare a name.
    ///
    /// `let`/`const` go in the current scope and may not repeat there.
    /// `var` goes in the nearest function scope; redeclaring it keeps the
    /// existing binding and only overwrites the value when one is given.
    pub fn declare(
        &mut self,
        name: &str,
        value: Option<Value>,
        kind: DeclKind,
    ) -> Result<(), AlreadyDeclared> {
        match kind {
            DeclKind::Var => {
                let scope = self.function_scope();
                let existing = scope.bindings.borrow().contains_key(name);
                if existing && value.is_none() {
                    return Ok(());
                }
                let value = value.unwrap_or(Value::Undefined);
                self.store(&scope, name, value, false);
                Ok(())
            }
            DeclKind::Let | DeclKind::Const => {
                if self.current.bindings.borrow().contains_key(name) {
                    return Err(AlreadyDeclared);
                }
                let scope = Rc::clone(&self.current);
                let value = value.unwrap_or(Value::Undefined);
                self.store(&scope, name, value, kind == DeclKind::Const);
                Ok(())
            }
        }
    }

    /// Bind a hoisted function declaration in the current scope, replacing
    /// any earlier declaration of the same name there.
    pub fn define_function(&mut self, name: &str, value: Value) {
        let scope = Rc::clone(&self.current);
        self.store(&scope, name, value, false);
    }

    /// Look up a variable, searching from innermost to outermost scope.
    pub fn get(&self, name: &str) -> Option<Value> {
        let scope = self.current.find(name)?;
        let bindings = scope.bindings.borrow();
        bindings.get(name).map(|b| b.value.clone())
    }

    /// Update a variable in the first scope where it exists.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), AssignError> {
        let scope = self.current.find(name).ok_or(AssignError::Undeclared)?;
        if scope
            .bindings
            .borrow()
            .get(name)
            .is_some_and(|b| b.constant)
        {
            return Err(AssignError::Constant);
        }
        self.store(&scope, name, value, false);
        Ok(())
    }

    fn function_scope(&self) -> Rc<Scope> {
        let mut scope = Rc::clone(&self.current);
        while !scope.function_scope {
            match scope.parent.clone() {
                Some(parent) => scope = parent,
                None => break,
            }
        }
        scope
    }

    fn store(&mut self, scope: &Rc<Scope>, name: &str, value: Value, constant: bool) {
        if matches!(value, Value::Function(_)) && !scope.holds_functions.replace(true) {
            self.holders.push(Rc::clone(scope));
        }
        scope
            .bindings
            .borrow_mut()
            .insert(name.to_string(), Binding { value, constant });
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        for scope in self.holders.drain(..) {
            scope.bindings.borrow_mut().clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Primitive;

    fn env() -> Environment {
        Environment::new(&BindingTable::standard())
    }

    #[test]
    fn test_builtins_visible_and_constant() {
        let mut env = env();
        assert_eq!(
            env.get("moveUp"),
            Some(Value::Primitive(Primitive::MoveUp))
        );
        assert_eq!(env.get("undefined"), Some(Value::Undefined));
        assert_eq!(
            env.assign("moveUp", Value::Number(1.0)),
            Err(AssignError::Constant)
        );
    }

    #[test]
    fn test_restricted_table_hides_commands() {
        let env = Environment::new(&BindingTable::restricted(["moveRight"]));
        assert!(env.get("moveRight").is_some());
        assert!(env.get("moveLeft").is_none());
    }

    #[test]
    fn test_block_scoping() {
        let mut env = env();
        env.declare("x", Some(Value::Number(1.0)), DeclKind::Let).unwrap();
        env.push_scope();
        env.declare("x", Some(Value::Number(2.0)), DeclKind::Let).unwrap();
        assert_eq!(env.get("x"), Some(Value::Number(2.0)));
        env.pop_scope();
        assert_eq!(env.get("x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_let_redeclaration_rejected() {
        let mut env = env();
        env.declare("x", None, DeclKind::Let).unwrap();
        assert_eq!(env.declare("x", None, DeclKind::Let), Err(AlreadyDeclared));
    }

    #[test]
    fn test_var_goes_to_function_scope() {
        let mut env = env();
        env.push_scope();
        env.declare("v", Some(Value::Number(3.0)), DeclKind::Var).unwrap();
        env.pop_scope();
        assert_eq!(env.get("v"), Some(Value::Number(3.0)));
        env.declare("v", None, DeclKind::Var).unwrap();
        assert_eq!(env.get("v"), Some(Value::Number(3.0)));
    }

    #[test]
    fn test_const_assignment_refused() {
        let mut env = env();
        env.declare("c", Some(Value::Number(1.0)), DeclKind::Const).unwrap();
        assert_eq!(env.assign("c", Value::Number(2.0)), Err(AssignError::Constant));
        assert_eq!(
            env.assign("missing", Value::Null),
            Err(AssignError::Undeclared)
        );
    }

    #[test]
    fn test_function_frame_sees_captured_scope_only() {
        let mut env = env();
        env.declare("g", Some(Value::Number(1.0)), DeclKind::Let).unwrap();
        let captured = env.current_scope();
        env.push_scope();
        env.declare("local", Some(Value::Number(2.0)), DeclKind::Let).unwrap();
        let caller = env.enter_function(captured);
        assert_eq!(env.get("g"), Some(Value::Number(1.0)));
        assert!(env.get("local").is_none());
        env.exit_function(caller);
        assert_eq!(env.get("local"), Some(Value::Number(2.0)));
    }
}
