//! Runtime values of the spell dialect.

use std::fmt;
use std::rc::Rc;

use spell_types::ast::FunctionDecl;

use crate::env::Scope;
use crate::primitives::Primitive;

/// A spell value.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
    Undefined,
    /// A user-declared function together with the scope it was declared in.
    Function(Rc<Closure>),
    /// One of the approved spell commands, used as a value.
    Primitive(Primitive),
}

/// A function declaration closed over its defining scope.
pub struct Closure {
    pub decl: Rc<FunctionDecl>,
    pub(crate) scope: Rc<Scope>,
}

impl fmt::Debug for Closure {
    // The captured scope may refer back to this closure.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.decl.name.name)
            .finish_non_exhaustive()
    }
}

impl Value {
    /// JavaScript truthiness: `0`, `NaN`, `""`, `false`, `null` and
    /// `undefined` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Null | Value::Undefined => false,
            Value::Function(_) | Value::Primitive(_) => true,
        }
    }

    /// The `typeof`-style name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
            Value::Undefined => "undefined",
            Value::Function(_) | Value::Primitive(_) => "function",
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Primitive(_))
    }

    /// Numeric conversion as done by arithmetic and comparison operators.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Bool(true) => 1.0,
            Value::Bool(false) | Value::Null => 0.0,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Value::Undefined | Value::Function(_) | Value::Primitive(_) => f64::NAN,
        }
    }

    /// `===`: same type and same value; functions compare by identity.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) | (Value::Undefined, Value::Undefined) => true,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Primitive(a), Value::Primitive(b)) => a == b,
            _ => false,
        }
    }

    /// `==`: strict equality, except that `null` and `undefined` are equal
    /// to each other.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null | Value::Undefined, Value::Null | Value::Undefined) => true,
            _ => self.strict_eq(other),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_eq(other)
    }
}

/// String conversion, as used by `+` when either side is a string.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => f.write_str("null"),
            Value::Undefined => f.write_str("undefined"),
            Value::Function(closure) => write!(f, "function {}() {{ ... }}", closure.decl.name.name),
            Value::Primitive(p) => write!(f, "function {}() {{ [spell command] }}", p.name()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        // Covers -0 as well.
        "0".to_string()
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        let falsy = [
            Value::Number(0.0),
            Value::Number(f64::NAN),
            Value::String(String::new()),
            Value::Bool(false),
            Value::Null,
            Value::Undefined,
        ];
        for v in &falsy {
            assert!(!v.is_truthy(), "{v:?} should be falsy");
        }
        let truthy = [
            Value::Number(-1.0),
            Value::String("0".into()),
            Value::Bool(true),
            Value::Primitive(Primitive::MoveUp),
        ];
        for v in &truthy {
            assert!(v.is_truthy(), "{v:?} should be truthy");
        }
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Value::String(" 42 ".into()).to_number(), 42.0);
        assert_eq!(Value::String("".into()).to_number(), 0.0);
        assert!(Value::String("abc".into()).to_number().is_nan());
        assert_eq!(Value::Bool(true).to_number(), 1.0);
        assert_eq!(Value::Null.to_number(), 0.0);
        assert!(Value::Undefined.to_number().is_nan());
    }

    #[test]
    fn test_equality() {
        assert!(Value::Null.loose_eq(&Value::Undefined));
        assert!(!Value::Null.strict_eq(&Value::Undefined));
        assert!(!Value::Number(1.0).loose_eq(&Value::String("1".into())));
        assert!(!Value::Number(f64::NAN).strict_eq(&Value::Number(f64::NAN)));
        assert!(Value::Primitive(Primitive::MoveUp).strict_eq(&Value::Primitive(Primitive::MoveUp)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Number(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Value::Undefined.to_string(), "undefined");
        assert_eq!(Value::Bool(true).to_string(), "true");
    }
}
