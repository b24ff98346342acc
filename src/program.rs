//! Program driver: runs whole programs, or single REPL inputs, against a
//! caller-owned environment.

use crate::console::{Console, StdConsole};
use crate::environment::Environment;
use crate::evaluator::{EvalError, EvalResult, evaluate};
use crate::lexer::tokenize;
use crate::parser::{ParseError, parse_str, parse_tokens};
use crate::types::{Expr, Value};
use log::debug;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LisError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Evaluates one expression, writing to stdout and reading from stdin.
pub fn eval_in_env(expr: &Expr, env: &Rc<RefCell<Environment>>) -> EvalResult {
    evaluate(expr, env, &mut StdConsole)
}

/// Evaluates top-level forms in order, stopping at the first error.
/// Returns the value of the last form.
pub fn run(
    program: &[Expr],
    env: &Rc<RefCell<Environment>>,
    io: &mut dyn Console,
) -> EvalResult {
    let mut result = Value::Void;
    for expr in program {
        debug!("eval {}", expr);
        result = evaluate(expr, env, io)?;
    }
    Ok(result)
}

/// Tokenizes, parses and runs a sequence of source lines, e.g. a file.
/// Nothing is evaluated if the text does not parse.
pub fn run_lines<I>(
    lines: I,
    env: &Rc<RefCell<Environment>>,
    io: &mut dyn Console,
) -> Result<Value, LisError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let program = parse_tokens(tokenize(lines))?;
    Ok(run(&program, env, io)?)
}

pub fn run_str(
    source: &str,
    env: &Rc<RefCell<Environment>>,
    io: &mut dyn Console,
) -> Result<Value, LisError> {
    run_lines(source.lines(), env, io)
}

/// Evaluates one REPL input as a unit: if any form fails, the bindings of
/// `env` are put back the way they were before the input, so only
/// successful inputs leave a mark on the persistent environment.
///
/// Only `env`'s own frame is rolled back. A `set!` that reached into a frame
/// captured by an existing closure stays applied.
pub fn eval_input(
    source: &str,
    env: &Rc<RefCell<Environment>>,
    io: &mut dyn Console,
) -> Result<Value, LisError> {
    let program = parse_str(source)?;
    let snapshot = env.borrow().snapshot();
    match run(&program, env, io) {
        Ok(value) => Ok(value),
        Err(err) => {
            debug!("rolling back input after error: {}", err);
            env.borrow_mut().restore(snapshot);
            Err(err.into())
        }
    }
}
