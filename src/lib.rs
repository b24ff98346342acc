// Declare modules publicly so they are part of the library interface
pub mod console;
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod pretty_print;
pub mod primitives;
pub mod program;
pub mod source;
pub mod types;

pub use console::{BufferConsole, Console, StdConsole};
pub use environment::{EnvError, Environment};
pub use evaluator::{ErrorKind, EvalError, EvalResult, evaluate};
pub use lexer::{Token, TokenKind, tokenize};
pub use parser::{ParseError, Parser, parse_str, parse_tokens};
pub use program::{LisError, eval_in_env, eval_input, run, run_lines, run_str};
pub use source::Span;
pub use types::{Closure, Expr, Value};
