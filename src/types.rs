use crate::environment::Environment;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A parsed expression. Trees are immutable once parsed; list forms are
/// reference counted so closures can hold on to their bodies cheaply.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Symbol(String),
    EmptyList,          // The `null` literal
    List(Rc<[Expr]>),   // One matched pair of parentheses
}

impl Expr {
    /// Classifies a single non-parenthesis token.
    /// Tries an integer, then a float, then the boolean literals; anything else is a symbol.
    pub fn atom(token: &str) -> Expr {
        if let Ok(n) = token.parse::<i64>() {
            return Expr::Integer(n);
        }
        if let Ok(x) = token.parse::<f64>() {
            return Expr::Float(x);
        }
        match token {
            "#t" => Expr::Boolean(true),
            "#f" => Expr::Boolean(false),
            "null" => Expr::EmptyList,
            _ => Expr::Symbol(token.to_string()),
        }
    }

    pub fn list(elements: Vec<Expr>) -> Expr {
        Expr::List(elements.into())
    }

    pub fn symbol(name: &str) -> Expr {
        Expr::Symbol(name.to_string())
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Expr::Symbol(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Integer(n) => write!(f, "{}", n),
            Expr::Float(x) => write!(f, "{:?}", x),
            Expr::Boolean(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Expr::Symbol(s) => write!(f, "{}", s),
            Expr::EmptyList => write!(f, "null"),
            Expr::List(elements) => write_sequence(f, elements.iter()),
        }
    }
}

fn write_sequence<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = T>,
) -> fmt::Result {
    write!(f, "(")?;
    let mut first = true;
    for item in items {
        if !first {
            write!(f, " ")?;
        }
        write!(f, "{}", item)?;
        first = false;
    }
    write!(f, ")")
}

/// A user-defined procedure: the parameter names and body of the `lambda`
/// form it was created from, plus the environment it was created in.
pub struct Closure {
    pub params: Vec<String>,
    pub body: Expr,
    pub env: Rc<RefCell<Environment>>,
}

// The captured environment may contain this closure, so it is left out.
impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.params)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

/// The result of evaluating an expression.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String), // Produced by `read-line`
    List(Vec<Value>),
    Closure(Rc<Closure>),
    Void, // Result of forms evaluated only for effect
}

impl Value {
    /// Only `#f` is false.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Closure(_) => "closure",
            Value::Void => "void",
        }
    }
}

// Closures compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Void, Value::Void) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Boolean(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::String(s) => write!(f, "{}", s),
            Value::List(items) => write_sequence(f, items.iter()),
            Value::Closure(closure) => {
                write!(f, "#<closure ")?;
                write_sequence(f, closure.params.iter())?;
                write!(f, ">")
            }
            Value::Void => Ok(()),
        }
    }
}
