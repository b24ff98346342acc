//! Built-in operators.
//!
//! Built-ins are a fixed set matched by name at the head of a form. They are
//! not values: they cannot be shadowed, rebound, or passed as arguments.
//! `and`/`or` short-circuit and are evaluated by the evaluator; everything
//! else receives its operands fully evaluated, left to right.

use crate::evaluator::{EvalError, EvalResult};
use crate::types::Value;
use std::cmp::Ordering;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Builtin {
    Add,
    Sub,
    Mul,
    Div,
    List,
    And,
    Or,
    Cons,
    Lt,
    Gt,
    Eq,
    Ge,
    Le,
    Car,
    Cdr,
    IsNull,
    Modulo,
    Not,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Any,
}

impl Builtin {
    pub const ALL: [Builtin; 18] = [
        Builtin::Add,
        Builtin::Sub,
        Builtin::Mul,
        Builtin::Div,
        Builtin::List,
        Builtin::And,
        Builtin::Or,
        Builtin::Cons,
        Builtin::Lt,
        Builtin::Gt,
        Builtin::Eq,
        Builtin::Ge,
        Builtin::Le,
        Builtin::Car,
        Builtin::Cdr,
        Builtin::IsNull,
        Builtin::Modulo,
        Builtin::Not,
    ];

    pub fn from_name(name: &str) -> Option<Builtin> {
        Builtin::ALL.into_iter().find(|b| b.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Add => "+",
            Builtin::Sub => "-",
            Builtin::Mul => "*",
            Builtin::Div => "/",
            Builtin::List => "list",
            Builtin::And => "and",
            Builtin::Or => "or",
            Builtin::Cons => "cons",
            Builtin::Lt => "<",
            Builtin::Gt => ">",
            Builtin::Eq => "=",
            Builtin::Ge => ">=",
            Builtin::Le => "<=",
            Builtin::Car => "car",
            Builtin::Cdr => "cdr",
            Builtin::IsNull => "null?",
            Builtin::Modulo => "modulo",
            Builtin::Not => "not",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Builtin::Add | Builtin::Sub | Builtin::Mul | Builtin::Div => Arity::AtLeast(1),
            Builtin::List | Builtin::And | Builtin::Or => Arity::Any,
            Builtin::Cons
            | Builtin::Lt
            | Builtin::Gt
            | Builtin::Eq
            | Builtin::Ge
            | Builtin::Le
            | Builtin::Modulo => Arity::Exact(2),
            Builtin::Car | Builtin::Cdr | Builtin::IsNull | Builtin::Not => Arity::Exact(1),
        }
    }

    /// Operators whose operands must be evaluated one at a time.
    pub fn is_short_circuit(self) -> bool {
        matches!(self, Builtin::And | Builtin::Or)
    }

    fn arity_error(self, count: usize) -> EvalError {
        let expected = match self.arity() {
            Arity::Exact(n) => format!("exactly {}", n),
            Arity::AtLeast(n) => format!("at least {}", n),
            Arity::Any => "any number of".to_string(),
        };
        EvalError::InvalidArguments(format!(
            "'{}' expects {} arguments, got {}",
            self.name(),
            expected,
            count
        ))
    }

    pub fn check_arity(self, count: usize) -> EvalResult<()> {
        match self.arity() {
            Arity::Exact(n) if count != n => Err(self.arity_error(count)),
            Arity::AtLeast(n) if count < n => Err(self.arity_error(count)),
            _ => Ok(()),
        }
    }

    /// Applies an eager operator to already evaluated operands.
    pub fn apply(self, args: Vec<Value>) -> EvalResult {
        self.check_arity(args.len())?;
        match self {
            Builtin::Add | Builtin::Sub | Builtin::Mul | Builtin::Div => {
                fold_numbers(self, args)
            }
            Builtin::List => Ok(Value::List(args)),
            Builtin::Cons => prim_cons(args),
            Builtin::Lt => compare(self, &args, |o| o == Ordering::Less),
            Builtin::Gt => compare(self, &args, |o| o == Ordering::Greater),
            Builtin::Ge => compare(self, &args, |o| o != Ordering::Less),
            Builtin::Le => compare(self, &args, |o| o != Ordering::Greater),
            Builtin::Eq => Ok(Value::Boolean(values_equal(&args[0], &args[1]))),
            Builtin::Car => prim_car(args),
            Builtin::Cdr => prim_cdr(args),
            Builtin::IsNull => Ok(Value::Boolean(
                matches!(&args[0], Value::List(items) if items.is_empty()),
            )),
            Builtin::Modulo => prim_modulo(&args[0], &args[1]),
            Builtin::Not => Ok(Value::Boolean(!args[0].is_truthy())),
            Builtin::And | Builtin::Or => Err(EvalError::UnexpectedError(format!(
                "'{}' must be evaluated lazily",
                self.name()
            ))),
        }
    }
}

fn type_mismatch(builtin: Builtin, expected: &'static str, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        operator: builtin.name(),
        expected,
        found: found.type_name(),
    }
}

// Integers stay integers until a float shows up.
#[derive(Debug, Copy, Clone, PartialEq)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn from_value(builtin: Builtin, value: &Value) -> EvalResult<Number> {
        match value {
            Value::Integer(n) => Ok(Number::Int(*n)),
            Value::Float(x) => Ok(Number::Float(*x)),
            other => Err(type_mismatch(builtin, "number", other)),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(x) => x,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Number::Int(n) => Value::Integer(n),
            Number::Float(x) => Value::Float(x),
        }
    }
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let quotient = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Some(quotient - 1)
    } else {
        Some(quotient)
    }
}

fn floor_mod(a: i64, b: i64) -> Option<i64> {
    // Every integer is a multiple of -1; checked_rem rejects i64::MIN here
    if b == -1 {
        return Some(0);
    }
    let remainder = a.checked_rem(b)?;
    if remainder != 0 && ((remainder < 0) != (b < 0)) {
        Some(remainder + b)
    } else {
        Some(remainder)
    }
}

fn not_arithmetic(builtin: Builtin) -> EvalError {
    EvalError::UnexpectedError(format!("'{}' is not an arithmetic operator", builtin.name()))
}

fn arithmetic(builtin: Builtin, left: Number, right: Number) -> EvalResult<Number> {
    match (left, right) {
        (Number::Int(a), Number::Int(b)) => {
            let result = match builtin {
                Builtin::Add => a.checked_add(b),
                Builtin::Sub => a.checked_sub(b),
                Builtin::Mul => a.checked_mul(b),
                Builtin::Div if b == 0 => return Err(EvalError::DivisionByZero),
                Builtin::Div => floor_div(a, b),
                _ => return Err(not_arithmetic(builtin)),
            };
            result
                .map(Number::Int)
                .ok_or(EvalError::Overflow(builtin.name()))
        }
        (a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            let result = match builtin {
                Builtin::Add => a + b,
                Builtin::Sub => a - b,
                Builtin::Mul => a * b,
                Builtin::Div if b == 0.0 => return Err(EvalError::DivisionByZero),
                Builtin::Div => a / b,
                _ => return Err(not_arithmetic(builtin)),
            };
            Ok(Number::Float(result))
        }
    }
}

/// Left fold over the operands in order; a single operand is returned as is.
fn fold_numbers(builtin: Builtin, args: Vec<Value>) -> EvalResult {
    let mut numbers = args.iter().map(|arg| Number::from_value(builtin, arg));
    let Some(first) = numbers.next() else {
        return Err(builtin.arity_error(0));
    };
    let mut acc = first?;
    for number in numbers {
        acc = arithmetic(builtin, acc, number?)?;
    }
    Ok(acc.into_value())
}

fn compare<F: Fn(Ordering) -> bool>(builtin: Builtin, args: &[Value], test: F) -> EvalResult {
    let [left, right] = args else {
        return Err(builtin.arity_error(args.len()));
    };
    let ordering = match (
        Number::from_value(builtin, left)?,
        Number::from_value(builtin, right)?,
    ) {
        (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
        (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
    };
    // NaN compares false against everything
    Ok(Value::Boolean(ordering.is_some_and(test)))
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
            *a as f64 == *b
        }
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        _ => left == right,
    }
}

/// Moves exactly `N` operands out of the argument vector.
fn take_args<const N: usize>(builtin: Builtin, args: Vec<Value>) -> EvalResult<[Value; N]> {
    let count = args.len();
    args.try_into()
        .map_err(|_: Vec<Value>| builtin.arity_error(count))
}

fn prim_cons(args: Vec<Value>) -> EvalResult {
    let [head, tail] = take_args(Builtin::Cons, args)?;
    match tail {
        Value::List(mut items) => {
            items.insert(0, head);
            Ok(Value::List(items))
        }
        other => Err(type_mismatch(Builtin::Cons, "list", &other)),
    }
}

/// Unwraps the single operand of `car`/`cdr`, which must be a non-empty list.
fn expect_pair(builtin: Builtin, args: Vec<Value>) -> EvalResult<Vec<Value>> {
    let [arg] = take_args(builtin, args)?;
    match arg {
        Value::List(items) if items.is_empty() => Err(EvalError::EmptyList(builtin.name())),
        Value::List(items) => Ok(items),
        other => Err(type_mismatch(builtin, "list", &other)),
    }
}

fn prim_car(args: Vec<Value>) -> EvalResult {
    let items = expect_pair(Builtin::Car, args)?;
    items
        .into_iter()
        .next()
        .ok_or(EvalError::EmptyList(Builtin::Car.name()))
}

fn prim_cdr(args: Vec<Value>) -> EvalResult {
    let mut items = expect_pair(Builtin::Cdr, args)?;
    items.remove(0);
    Ok(Value::List(items))
}

fn prim_modulo(left: &Value, right: &Value) -> EvalResult {
    let builtin = Builtin::Modulo;
    match (
        Number::from_value(builtin, left)?,
        Number::from_value(builtin, right)?,
    ) {
        (_, Number::Int(0)) => Err(EvalError::DivisionByZero),
        (Number::Int(a), Number::Int(b)) => floor_mod(a, b)
            .map(Value::Integer)
            .ok_or(EvalError::Overflow(builtin.name())),
        (a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            let remainder = a % b;
            if remainder != 0.0 && ((remainder < 0.0) != (b < 0.0)) {
                Ok(Value::Float(remainder + b))
            } else {
                Ok(Value::Float(remainder))
            }
        }
    }
}
