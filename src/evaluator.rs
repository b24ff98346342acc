use crate::console::Console;
use crate::environment::{EnvError, Environment};
use crate::primitives::Builtin;
use crate::types::{Closure, Expr, Value};
use log::{debug, trace};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;

// --- Evaluation Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    EnvError(#[from] EnvError), // Lookup, definition and assignment failures
    #[error("Syntax Error: {0}")]
    Syntax(String), // Malformed special form
    #[error("Procedure expects {expected} arguments, got {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("Expected a procedure, but got {0}")]
    NotAProcedure(String),
    #[error("Invalid arguments - {0}")]
    InvalidArguments(String), // Built-in arity
    #[error("'{operator}' expects a {expected}, but got a {found}")]
    TypeMismatch {
        operator: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("'{0}' of an empty list")]
    EmptyList(&'static str),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Integer overflow in '{0}'")]
    Overflow(&'static str),
    #[error("read-line: no more input")]
    EndOfInput,
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Unexpected Error: {0}")]
    UnexpectedError(String),
}

/// Coarse classification of evaluation failures.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Name,
    Runtime,
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::Syntax(_) => ErrorKind::Syntax,
            EvalError::EnvError(_) | EvalError::ArityMismatch { .. } => ErrorKind::Name,
            _ => ErrorKind::Runtime,
        }
    }
}

impl From<std::io::Error> for EvalError {
    fn from(err: std::io::Error) -> Self {
        EvalError::Io(err.to_string())
    }
}

// Result type alias for convenience
pub type EvalResult<T = Value> = Result<T, EvalError>;

fn syntax_error(message: &str) -> EvalError {
    EvalError::Syntax(message.to_string())
}

const SPECIAL_FORMS: [&str; 10] = [
    "if",
    "cond",
    "let",
    "define",
    "lambda",
    "set!",
    "begin",
    "display",
    "write-line",
    "read-line",
];

/// Names handled by the evaluator itself rather than looked up: special forms,
/// built-in operators and the `null`/`else` literals.
pub fn special_form_identifiers() -> HashSet<String> {
    SPECIAL_FORMS
        .iter()
        .copied()
        .chain(Builtin::ALL.iter().map(|b| b.name()))
        .chain(["null", "else"])
        .map(str::to_string)
        .collect()
}

// --- Evaluate Function ---

/// Evaluates an expression within the given environment.
///
/// Recursion here is plain host recursion; there is no tail-call
/// optimisation, so unbounded user recursion exhausts the stack.
pub fn evaluate(
    expr: &Expr,
    env: &Rc<RefCell<Environment>>,
    io: &mut dyn Console,
) -> EvalResult {
    match expr {
        Expr::EmptyList => Ok(Value::List(Vec::new())),
        // `else` is always true so it can close a `cond`
        Expr::Symbol(name) if name == "else" => Ok(Value::Boolean(true)),
        Expr::Symbol(name) => {
            let value = env.borrow().lookup(name)?;
            Ok(value)
        }
        Expr::Integer(n) => Ok(Value::Integer(*n)),
        Expr::Float(x) => Ok(Value::Float(*x)),
        Expr::Boolean(b) => Ok(Value::Boolean(*b)),
        Expr::List(elements) => match &elements[..] {
            [] => Err(syntax_error("cannot evaluate an empty form ()")),
            [head, operands @ ..] => evaluate_form(head, operands, env, io),
        },
    }
}

fn evaluate_form(
    head: &Expr,
    operands: &[Expr],
    env: &Rc<RefCell<Environment>>,
    io: &mut dyn Console,
) -> EvalResult {
    if let Expr::Symbol(name) = head {
        if let Some(builtin) = Builtin::from_name(name) {
            return evaluate_builtin(builtin, operands, env, io);
        }
        match name.as_str() {
            "if" => return evaluate_if(operands, env, io),
            "cond" => return evaluate_cond(operands, env, io),
            "let" => return evaluate_let(operands, env, io),
            "define" => return evaluate_define(operands, env, io),
            "lambda" => return evaluate_lambda(operands, env),
            "set!" => return evaluate_set(operands, env, io),
            "begin" => return evaluate_begin(operands, env, io),
            "display" => return evaluate_display(operands, env, io, false),
            "write-line" => return evaluate_display(operands, env, io, true),
            "read-line" => return evaluate_read_line(operands, io),
            _ => {}
        }
    }
    evaluate_application(head, operands, env, io)
}

fn evaluate_builtin(
    builtin: Builtin,
    operands: &[Expr],
    env: &Rc<RefCell<Environment>>,
    io: &mut dyn Console,
) -> EvalResult {
    if builtin.is_short_circuit() {
        return evaluate_short_circuit(builtin, operands, env, io);
    }
    let mut args = Vec::with_capacity(operands.len());
    for operand in operands {
        args.push(evaluate(operand, env, io)?);
    }
    builtin.apply(args)
}

/// `and` stops at the first false operand, `or` at the first true one.
/// Operands after the stopping point are never evaluated.
fn evaluate_short_circuit(
    builtin: Builtin,
    operands: &[Expr],
    env: &Rc<RefCell<Environment>>,
    io: &mut dyn Console,
) -> EvalResult {
    match builtin {
        Builtin::And => {
            let mut last = Value::Boolean(true);
            for operand in operands {
                let value = evaluate(operand, env, io)?;
                if !value.is_truthy() {
                    return Ok(Value::Boolean(false));
                }
                last = value;
            }
            Ok(last)
        }
        _ => {
            for operand in operands {
                let value = evaluate(operand, env, io)?;
                if value.is_truthy() {
                    return Ok(value);
                }
            }
            Ok(Value::Boolean(false))
        }
    }
}

fn evaluate_if(
    operands: &[Expr],
    env: &Rc<RefCell<Environment>>,
    io: &mut dyn Console,
) -> EvalResult {
    let [condition, consequent, alternate] = operands else {
        return Err(syntax_error(
            "if expects a condition, a consequent and an alternate",
        ));
    };
    if evaluate(condition, env, io)?.is_truthy() {
        evaluate(consequent, env, io)
    } else {
        evaluate(alternate, env, io)
    }
}

fn evaluate_cond(
    operands: &[Expr],
    env: &Rc<RefCell<Environment>>,
    io: &mut dyn Console,
) -> EvalResult {
    for clause in operands {
        let Expr::List(parts) = clause else {
            return Err(syntax_error("cond clauses must be (predicate result) pairs"));
        };
        let [predicate, result] = &parts[..] else {
            return Err(syntax_error("cond clauses must be (predicate result) pairs"));
        };
        if evaluate(predicate, env, io)?.is_truthy() {
            return evaluate(result, env, io);
        }
    }
    Err(syntax_error("cond statement without else branch"))
}

fn binding_pair(binding: &Expr) -> EvalResult<(&str, &Expr)> {
    if let Expr::List(parts) = binding {
        if let [Expr::Symbol(name), value] = &parts[..] {
            return Ok((name.as_str(), value));
        }
    }
    Err(syntax_error("let bindings must be (name value) pairs"))
}

/// Binding values are all evaluated in the outer environment, so they cannot
/// see each other; the body runs in one new frame holding all of them.
fn evaluate_let(
    operands: &[Expr],
    env: &Rc<RefCell<Environment>>,
    io: &mut dyn Console,
) -> EvalResult {
    let [Expr::List(bindings), body] = operands else {
        return Err(syntax_error("let expects a binding list and a body"));
    };
    let mut values = Vec::with_capacity(bindings.len());
    for binding in bindings.iter() {
        let (name, value_expr) = binding_pair(binding)?;
        values.push((name.to_string(), evaluate(value_expr, env, io)?));
    }
    let frame = Environment::with_bindings(values, Some(env.clone()))?;
    evaluate(body, &frame, io)
}

fn evaluate_define(
    operands: &[Expr],
    env: &Rc<RefCell<Environment>>,
    io: &mut dyn Console,
) -> EvalResult {
    let [Expr::Symbol(name), value_expr] = operands else {
        return Err(syntax_error("define expects a symbol and a value"));
    };
    let value = evaluate(value_expr, env, io)?;
    debug!("define {} = {}", name, value);
    env.borrow_mut().define(name, value)?;
    Ok(Value::Void)
}

fn evaluate_lambda(operands: &[Expr], env: &Rc<RefCell<Environment>>) -> EvalResult {
    let [Expr::List(param_exprs), body] = operands else {
        return Err(syntax_error("lambda expects a parameter list and a body"));
    };
    let mut params: Vec<String> = Vec::with_capacity(param_exprs.len());
    for param in param_exprs.iter() {
        match param.as_symbol() {
            Some(name) if params.iter().any(|p| p == name) => {
                return Err(EvalError::Syntax(format!(
                    "duplicate lambda parameter '{}'",
                    name
                )));
            }
            Some(name) => params.push(name.to_string()),
            None => return Err(syntax_error("lambda parameters must be symbols")),
        }
    }
    Ok(Value::Closure(Rc::new(Closure {
        params,
        body: body.clone(),
        env: env.clone(),
    })))
}

fn evaluate_set(
    operands: &[Expr],
    env: &Rc<RefCell<Environment>>,
    io: &mut dyn Console,
) -> EvalResult {
    let [Expr::Symbol(name), value_expr] = operands else {
        return Err(syntax_error("set! expects a symbol and a value"));
    };
    let value = evaluate(value_expr, env, io)?;
    debug!("set! {} = {}", name, value);
    env.borrow_mut().set(name, value)?;
    Ok(Value::Void)
}

fn evaluate_begin(
    operands: &[Expr],
    env: &Rc<RefCell<Environment>>,
    io: &mut dyn Console,
) -> EvalResult {
    let mut result = Value::Void;
    for expr in operands {
        result = evaluate(expr, env, io)?;
    }
    Ok(result)
}

fn evaluate_display(
    operands: &[Expr],
    env: &Rc<RefCell<Environment>>,
    io: &mut dyn Console,
    newline: bool,
) -> EvalResult {
    let [operand] = operands else {
        return Err(syntax_error("display and write-line expect exactly one operand"));
    };
    let value = evaluate(operand, env, io)?;
    let mut text = value.to_string();
    if newline {
        text.push('\n');
    }
    io.write(&text)?;
    Ok(Value::Void)
}

fn evaluate_read_line(operands: &[Expr], io: &mut dyn Console) -> EvalResult {
    if !operands.is_empty() {
        return Err(syntax_error("read-line takes no operands"));
    }
    match io.read_line()? {
        Some(line) => Ok(Value::String(line)),
        None => Err(EvalError::EndOfInput),
    }
}

/// Calls a closure. When the head is a plain name, that name is also bound
/// to the closure inside the call frame so the body can call itself.
fn evaluate_application(
    head: &Expr,
    operands: &[Expr],
    env: &Rc<RefCell<Environment>>,
    io: &mut dyn Console,
) -> EvalResult {
    let closure = match evaluate(head, env, io)? {
        Value::Closure(closure) => closure,
        other => {
            return Err(EvalError::NotAProcedure(format!(
                "{} '{}' in {}",
                other.type_name(),
                other,
                head
            )));
        }
    };

    let mut args = Vec::with_capacity(operands.len());
    for operand in operands {
        args.push(evaluate(operand, env, io)?);
    }
    if args.len() != closure.params.len() {
        return Err(EvalError::ArityMismatch {
            expected: closure.params.len(),
            found: args.len(),
        });
    }

    trace!("apply {} to {} argument(s)", head, args.len());
    let bindings = closure.params.iter().cloned().zip(args);
    let frame = Environment::with_bindings(bindings, Some(closure.env.clone()))?;
    if let Expr::Symbol(name) = head {
        frame
            .borrow_mut()
            .bind(name, Value::Closure(closure.clone()));
    }
    evaluate(&closure.body, &frame, io)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::BufferConsole;
    use crate::parser::parse_str;

    fn int(n: i64) -> Value {
        Value::Integer(n)
    }

    fn sym(s: &str) -> Expr {
        Expr::symbol(s)
    }

    fn list(elements: &[Expr]) -> Expr {
        Expr::list(elements.to_vec())
    }

    // Evaluates every form in `input`, returning the last result.
    fn eval_str(input: &str, env: &Rc<RefCell<Environment>>) -> EvalResult {
        let program = match parse_str(input) {
            Ok(program) => program,
            Err(e) => panic!("Parsing failed for input '{}': {}", input, e),
        };
        let mut console = BufferConsole::new();
        let mut result = Value::Void;
        for expr in &program {
            result = evaluate(expr, env, &mut console)?;
        }
        Ok(result)
    }

    fn assert_eval(input: &str, expected: Value) {
        let env = Environment::new();
        match eval_str(input, &env) {
            Ok(result) => assert_eq!(result, expected, "Input: '{}'", input),
            Err(e) => panic!("Evaluation failed for input '{}': {}", input, e),
        }
    }

    fn assert_eval_error(input: &str, expected_error_variant: &EvalError) {
        let env = Environment::new();
        match eval_str(input, &env) {
            Ok(result) => panic!(
                "Expected evaluation to fail for input '{}', but got: {:?}",
                input, result
            ),
            Err(e) => assert_eq!(
                std::mem::discriminant(&e),
                std::mem::discriminant(expected_error_variant),
                "Input: '{}', Expected error variant like {:?}, got: {:?}",
                input,
                expected_error_variant,
                e
            ),
        }
    }

    fn unbound(name: &str) -> EvalError {
        EvalError::EnvError(EnvError::Unbound(name.to_string()))
    }

    fn syntax() -> EvalError {
        EvalError::Syntax(String::new())
    }

    #[test]
    fn test_eval_self_evaluating() {
        assert_eval("123", int(123));
        assert_eval("-4.5", Value::Float(-4.5));
        assert_eval("#t", Value::Boolean(true));
        assert_eval("#f", Value::Boolean(false));
        assert_eval("null", Value::List(vec![]));
        assert_eval("else", Value::Boolean(true));
    }

    #[test]
    fn test_eval_add_tree() {
        let env = Environment::new();
        let expr = list(&[sym("+"), Expr::Integer(10), Expr::Integer(25), Expr::Integer(0)]);
        let result = evaluate(&expr, &env, &mut BufferConsole::new());
        assert_eq!(result, Ok(int(35)));
    }

    #[test]
    fn test_eval_symbol_lookup() {
        let env = Environment::new();
        env.borrow_mut().define("x", int(100)).unwrap();
        assert_eq!(eval_str("x", &env), Ok(int(100)));
        assert_eq!(eval_str("y", &env), Err(unbound("y")));
    }

    #[test]
    fn test_eval_if() {
        assert_eval("(if #t 3 4)", int(3));
        assert_eval("(if #f 3 4)", int(4));
        assert_eval("(if 0 1 2)", int(1));
        assert_eval("(if null 1 2)", int(1));
        assert_eval("(if (< 1 2) (+ 1 1) undefined)", int(2));
        assert_eval("(if (> 1 2) undefined (* 3 3))", int(9));
    }

    #[test]
    fn test_eval_if_error_arity() {
        assert_eval_error("(if)", &syntax());
        assert_eval_error("(if #t 1)", &syntax());
        assert_eval_error("(if #t 1 2 3)", &syntax());
        assert_eval_error("(if unbound 1 2)", &unbound("unbound"));
    }

    #[test]
    fn test_eval_cond() {
        assert_eval("(cond ((> 4 3) 1) (else 0))", int(1));
        assert_eval("(cond ((> 4 4) 1) (else 0))", int(0));
        assert_eval("(cond (#f 1) ((= 1 1) 2) (else 3))", int(2));
        // Later predicates are not evaluated once a clause matches
        assert_eval("(cond (#t 1) (undefined 2))", int(1));
    }

    #[test]
    fn test_eval_cond_without_match_is_syntax_error() {
        assert_eval_error("(cond ((> 1 2) 1))", &syntax());
        assert_eval_error("(cond)", &syntax());
        assert_eval_error("(cond (#t))", &syntax());
        assert_eval_error("(cond 5)", &syntax());
    }

    #[test]
    fn test_eval_let() {
        let env = Environment::new();
        assert_eq!(
            eval_str("(let ((x 3) (y 10)) (+ x y))", &env),
            Ok(int(13))
        );
        assert_eq!(eval_str("x", &env), Err(unbound("x")));
        assert_eq!(eval_str("y", &env), Err(unbound("y")));
    }

    #[test]
    fn test_eval_let_bindings_do_not_see_each_other() {
        let env = Environment::new();
        eval_str("(define x 1)", &env).unwrap();
        // y is computed from the outer x, not the x bound alongside it
        assert_eq!(eval_str("(let ((x 10) (y x)) (+ x y))", &env), Ok(int(11)));
        assert_eq!(
            eval_str("(let ((a 1) (b a)) b)", &env),
            Err(unbound("a"))
        );
    }

    #[test]
    fn test_eval_let_errors() {
        assert_eval_error("(let ((x 1) (x 2)) x)", &unbound("x"));
        assert_eval_error("(let ((x)) x)", &syntax());
        assert_eval_error("(let ((1 2)) 1)", &syntax());
        assert_eval_error("(let x 1)", &syntax());
        assert_eval_error("(let ((x 1)))", &syntax());
    }

    #[test]
    fn test_eval_define() {
        let env = Environment::new();
        assert_eq!(eval_str("(define a 3)", &env), Ok(Value::Void));
        assert_eq!(env.borrow().lookup("a"), Ok(int(3)));
        assert_eq!(eval_str("(define b (+ a 1)) b", &env), Ok(int(4)));
    }

    #[test]
    fn test_eval_define_twice_is_name_error() {
        let env = Environment::new();
        eval_str("(define a 3)", &env).unwrap();
        let err = eval_str("(define a 4)", &env).unwrap_err();
        assert_eq!(
            err,
            EvalError::EnvError(EnvError::AlreadyDefined("a".to_string()))
        );
        assert_eq!(err.kind(), ErrorKind::Name);
        assert_eq!(env.borrow().lookup("a"), Ok(int(3)));
    }

    #[test]
    fn test_eval_define_failure_leaves_no_binding() {
        let env = Environment::new();
        assert!(eval_str("(define a (car null))", &env).is_err());
        assert_eq!(env.borrow().lookup("a"), Err(EnvError::Unbound("a".to_string())));
        assert_eval_error("(define 1 2)", &syntax());
        assert_eval_error("(define a)", &syntax());
    }

    #[test]
    fn test_eval_set() {
        let env = Environment::new();
        env.borrow_mut().define("a", int(0)).unwrap();
        assert_eq!(eval_str("(set! a 10)", &env), Ok(Value::Void));
        assert_eq!(env.borrow().lookup("a"), Ok(int(10)));
    }

    #[test]
    fn test_eval_set_undefined_is_name_error() {
        let env = Environment::new();
        let err = eval_str("(set! missing 1)", &env).unwrap_err();
        assert_eq!(err, unbound("missing"));
        assert_eq!(err.kind(), ErrorKind::Name);
        assert!(env.borrow().lookup("missing").is_err());
    }

    #[test]
    fn test_eval_begin() {
        assert_eval("(begin (define a 0) (set! a 10) a)", int(10));
        assert_eval("(begin)", Value::Void);
    }

    #[test]
    fn test_eval_anonymous_lambda() {
        let env = Environment::new();
        assert_eq!(eval_str("((lambda (x) (+ x x)) 7)", &env), Ok(int(14)));
        // Nothing leaks into the defining environment
        assert!(env.borrow().get_identifiers().is_empty());
    }

    #[test]
    fn test_eval_closure() {
        let env = Environment::new();
        eval_str("(define add3 (lambda (x) (+ x 3)))", &env).unwrap();
        assert_eq!(eval_str("(add3 10)", &env), Ok(int(13)));
        eval_str("(define ifthen (lambda (x) (if #t x 3)))", &env).unwrap();
        assert_eq!(eval_str("(ifthen 10)", &env), Ok(int(10)));
    }

    #[test]
    fn test_eval_recursion() {
        let env = Environment::new();
        eval_str(
            "(define factorial (lambda (n) (if (< n 1) 1 (* n (factorial (- n 1))))))",
            &env,
        )
        .unwrap();
        assert_eq!(eval_str("(factorial 5)", &env), Ok(int(120)));

        eval_str(
            "(define sumto (lambda (n) (if (< n 1) 0 (+ n (sumto (- n 1))))))",
            &env,
        )
        .unwrap();
        assert_eq!(eval_str("(sumto 3)", &env), Ok(int(6)));
    }

    #[test]
    fn test_self_reference_is_bound_in_call_frame() {
        // The closure captures an empty frame, so the recursive call only
        // resolves through the name bound at call time.
        let env = Environment::new();
        let closure_env = Environment::new();
        let fact = eval_str(
            "(lambda (n) (if (< n 1) 1 (* n (fact (- n 1)))))",
            &closure_env,
        )
        .unwrap();
        env.borrow_mut().define("fact", fact).unwrap();
        assert_eq!(eval_str("(fact 4)", &env), Ok(int(24)));
    }

    #[test]
    fn test_mutual_recursion_through_shared_frame() {
        let env = Environment::new();
        eval_str(
            "(define even? (lambda (n) (if (= n 0) #t (odd? (- n 1)))))
             (define odd? (lambda (n) (if (= n 0) #f (even? (- n 1)))))",
            &env,
        )
        .unwrap();
        assert_eq!(eval_str("(even? 10)", &env), Ok(Value::Boolean(true)));
        assert_eq!(eval_str("(odd? 7)", &env), Ok(Value::Boolean(true)));
    }

    #[test]
    fn test_closure_sees_set_on_captured_frame() {
        let env = Environment::new();
        eval_str(
            "(define make-counter (lambda ()
                (let ((count 0))
                  (lambda () (begin (set! count (+ count 1)) count)))))
             (define counter (make-counter))",
            &env,
        )
        .unwrap();
        assert_eq!(eval_str("(counter)", &env), Ok(int(1)));
        assert_eq!(eval_str("(counter)", &env), Ok(int(2)));
        assert_eq!(eval_str("count", &env), Err(unbound("count")));
    }

    #[test]
    fn test_closure_captures_lexical_scope() {
        let env = Environment::new();
        eval_str(
            "(define make-adder (lambda (n) (lambda (x) (+ x n))))
             (define add5 (make-adder 5))
             (define n 100)",
            &env,
        )
        .unwrap();
        assert_eq!(eval_str("(add5 1)", &env), Ok(int(6)));
    }

    #[test]
    fn test_define_inside_call_does_not_escape() {
        let env = Environment::new();
        eval_str("(define f (lambda (x) (begin (define y x) y)))", &env).unwrap();
        assert_eq!(eval_str("(f 3)", &env), Ok(int(3)));
        assert_eq!(eval_str("y", &env), Err(unbound("y")));
        // A fresh frame per call, so defining y again is fine
        assert_eq!(eval_str("(f 4)", &env), Ok(int(4)));
    }

    #[test]
    fn test_eval_application_errors() {
        assert_eval_error("((lambda (x) x))", &EvalError::ArityMismatch { expected: 0, found: 0 });
        assert_eval_error(
            "((lambda (x) x) 1 2)",
            &EvalError::ArityMismatch { expected: 0, found: 0 },
        );
        assert_eval_error("(1 2 3)", &EvalError::NotAProcedure(String::new()));
        assert_eval_error("(undefined-fn 1)", &unbound("undefined-fn"));
        assert_eval_error("()", &syntax());
        assert_eval_error("(lambda (x x) x)", &syntax());
        assert_eval_error("(lambda (1) x)", &syntax());
        assert_eval_error("(lambda x x)", &syntax());
    }

    #[test]
    fn test_arity_mismatch_is_name_class() {
        let env = Environment::new();
        let err = eval_str("((lambda (x) x))", &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Name);
    }

    #[test]
    fn test_eval_and_or() {
        assert_eval("(and (> 2 1) (= 1 1) #t)", Value::Boolean(true));
        assert_eval("(and (> 2 1) (= 1 2) #t)", Value::Boolean(false));
        assert_eval("(or (> 2 10) (= 1 1) #f)", Value::Boolean(true));
        assert_eval("(or (> 2 10) (= 1 2) #f)", Value::Boolean(false));
        assert_eval("(and 1 2 3)", int(3));
        assert_eval("(or #f 7)", int(7));
        assert_eval("(and)", Value::Boolean(true));
        assert_eval("(or)", Value::Boolean(false));
    }

    #[test]
    fn test_and_or_short_circuit() {
        assert_eval("(and #f undefined-symbol)", Value::Boolean(false));
        assert_eval("(or #t undefined-symbol)", Value::Boolean(true));
        assert_eval_error("(and #t undefined-symbol)", &unbound("undefined-symbol"));
        assert_eval_error("(or #f undefined-symbol)", &unbound("undefined-symbol"));
    }

    #[test]
    fn test_short_circuit_skips_side_effects() {
        let env = Environment::new();
        eval_str("(define hits 0)", &env).unwrap();
        eval_str("(or #t (set! hits 1))", &env).unwrap();
        eval_str("(and #f (set! hits 2))", &env).unwrap();
        assert_eq!(eval_str("hits", &env), Ok(int(0)));
    }

    #[test]
    fn test_operands_evaluated_left_to_right() {
        let env = Environment::new();
        let mut console = BufferConsole::new();
        let program = parse_str(
            "(+ (begin (write-line 1) 1) (begin (write-line 2) 2) (begin (write-line 3) 3))",
        )
        .unwrap();
        assert_eq!(evaluate(&program[0], &env, &mut console), Ok(int(6)));
        assert_eq!(console.output(), "1\n2\n3\n");
    }

    #[test]
    fn test_builtins_cannot_be_shadowed() {
        let env = Environment::new();
        eval_str("(define + (lambda (a b) 0))", &env).unwrap();
        assert_eq!(eval_str("(+ 1 2)", &env), Ok(int(3)));
    }

    #[test]
    fn test_eval_list_builtins() {
        assert_eval(
            "(list 1 2 (+ 1 2))",
            Value::List(vec![int(1), int(2), int(3)]),
        );
        assert_eval("(car (list 1 2 3))", int(1));
        assert_eval("(cdr (list 1 2 3))", Value::List(vec![int(2), int(3)]));
        assert_eval("(cons 1 null)", Value::List(vec![int(1)]));
        assert_eval("(null? null)", Value::Boolean(true));
        assert_eval("(null? (cdr (list 1)))", Value::Boolean(true));
        assert_eval("(null? (list 1))", Value::Boolean(false));
    }

    #[test]
    fn test_car_of_empty_list_is_runtime_error() {
        let env = Environment::new();
        let err = eval_str("(car null)", &env).unwrap_err();
        assert_eq!(err, EvalError::EmptyList("car"));
        assert_eq!(err.kind(), ErrorKind::Runtime);
        let err = eval_str("(cdr null)", &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
    }

    #[test]
    fn test_eval_modulo_and_not() {
        assert_eval("(modulo 9 3)", int(0));
        assert_eval("(modulo 10 3)", int(1));
        assert_eval("(modulo 11 3)", int(2));
        assert_eval("(not #f)", Value::Boolean(true));
        assert_eval("(not #t)", Value::Boolean(false));
        assert_eval("(not null)", Value::Boolean(false));
    }

    #[test]
    fn test_display_and_write_line() {
        let env = Environment::new();
        let mut console = BufferConsole::new();
        let program =
            parse_str("(display 1) (display (list 1 2)) (write-line #t) (write-line 2.5)")
                .unwrap();
        for expr in &program {
            assert_eq!(evaluate(expr, &env, &mut console), Ok(Value::Void));
        }
        assert_eq!(console.output(), "1(1 2)#t\n2.5\n");
        assert_eval_error("(display)", &syntax());
        assert_eval_error("(write-line 1 2)", &syntax());
    }

    #[test]
    fn test_read_line() {
        let env = Environment::new();
        let mut console = BufferConsole::with_input(["hello world"]);
        let program = parse_str("(read-line) (read-line)").unwrap();
        assert_eq!(
            evaluate(&program[0], &env, &mut console),
            Ok(Value::String("hello world".to_string()))
        );
        assert_eq!(
            evaluate(&program[1], &env, &mut console),
            Err(EvalError::EndOfInput)
        );
        assert_eval_error("(read-line 1)", &syntax());
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let env = Environment::new();
        eval_str("(define sq (lambda (x) (* x x)))", &env).unwrap();
        let first = eval_str("(sq (+ 2 3))", &env);
        let second = eval_str("(sq (+ 2 3))", &env);
        assert_eq!(first, Ok(int(25)));
        assert_eq!(first, second);
    }

    #[test]
    fn test_special_form_identifiers() {
        let identifiers = special_form_identifiers();
        for name in ["if", "cond", "set!", "read-line", "car", "null?", "else"] {
            assert!(identifiers.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn test_call_frames_released_after_return() {
        let env = Environment::new();
        eval_str("((lambda (x) (+ x 1)) 1)", &env).unwrap();
        assert_eq!(Rc::strong_count(&env), 1);

        // A closure stored in the frame it captures keeps that frame alive
        eval_str("(define f (lambda (x) x))", &env).unwrap();
        assert_eq!(Rc::strong_count(&env), 2);
        eval_str("(f 1)", &env).unwrap();
        assert_eq!(Rc::strong_count(&env), 2);
    }
}
