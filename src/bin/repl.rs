use std::cell::RefCell;
use std::rc::Rc;

use lis::{Environment, StdConsole, TokenKind, Value, eval_input, evaluator, tokenize};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Completer, Helper, Highlighter, Hinter, Validator};

const DEFAULT_HISTORY_FILE: &str = "lis_history.txt";

struct LisCompleter {
    env: Rc<RefCell<Environment>>,
}

impl LisCompleter {
    fn new(env: Rc<RefCell<Environment>>) -> Self {
        LisCompleter { env }
    }
}

impl rustyline::completion::Completer for LisCompleter {
    type Candidate = String;
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        // Only complete when the cursor sits right after an atom
        let prefix = match tokenize([&line[..pos]]).last() {
            Some(token) if token.kind == TokenKind::Atom && line[..pos].ends_with(&token.text) => {
                token.text
            }
            _ => return Ok((pos, vec![])),
        };
        let mut candidates: Vec<String> = self
            .env
            .borrow()
            .get_identifiers()
            .union(&evaluator::special_form_identifiers())
            .filter_map(|id| id.strip_prefix(prefix.as_str()).map(str::to_string))
            .filter(|suffix| !suffix.is_empty())
            .collect();
        candidates.sort();
        Ok((pos, candidates))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct InputValidator {
    #[rustyline(Validator)]
    validator: LisValidator,
    #[rustyline(Highlighter)]
    highlighter: LisHighlighter,
    #[rustyline(Completer)]
    completer: LisCompleter,
}

struct LisValidator;

impl Validator for LisValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let mut depth = 0usize;
        for (i, c) in ctx.input().chars().enumerate() {
            match c {
                '(' => depth += 1,
                ')' if depth == 0 => {
                    return Ok(ValidationResult::Invalid(Some(format!(
                        "  - Unmatched ')' at position {}",
                        i
                    ))));
                }
                ')' => depth -= 1,
                _ => {}
            }
        }
        // Keep reading lines until every '(' is closed
        if depth > 0 {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

struct LisHighlighter;

impl Highlighter for LisHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> std::borrow::Cow<'l, str> {
        // (index in line, index in highlighted) of each open '('
        let mut stack: Vec<(usize, usize)> = Vec::new();
        let mut highlighted = String::new();

        for (i, c) in line.char_indices() {
            match c {
                '(' => {
                    stack.push((i, highlighted.len()));
                    highlighted.push(c);
                }
                ')' => match stack.pop() {
                    // Cursor right after either paren of the pair
                    Some((open, matching_pos)) if pos == i + 1 || pos == open + 1 => {
                        highlighted.push_str(&format!("\x1b[34m{}\x1b[0m", c)); // Blue for matching parens
                        highlighted.replace_range(matching_pos..=matching_pos, "\x1b[1;34m(\x1b[0m");
                    }
                    Some(_) => highlighted.push(c),
                    None => highlighted.push_str(&format!("\x1b[31m{}\x1b[0m", c)), // Red for unmatched closing parens
                },
                _ => highlighted.push(c),
            }
        }

        std::borrow::Cow::Owned(highlighted)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

fn print_result(value: &Value) {
    if !matches!(value, Value::Void) {
        println!("{}", value);
    }
}

fn main() -> rustyline::Result<()> {
    env_logger::init();

    println!("lis REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl-D to quit.");

    let history_file =
        std::env::var("LIS_HISTORY").unwrap_or_else(|_| DEFAULT_HISTORY_FILE.to_string());

    // Persistent across inputs; a failed input leaves it as it was.
    let global_env = Environment::new();
    let h = InputValidator {
        highlighter: LisHighlighter,
        validator: LisValidator,
        completer: LisCompleter::new(global_env.clone()),
    };
    let edit_mode = match std::env::var("LIS_EDIT_MODE").as_deref() {
        Ok("vi") => rustyline::EditMode::Vi,
        _ => rustyline::EditMode::Emacs,
    };
    let config = rustyline::config::Config::builder()
        .edit_mode(edit_mode)
        .auto_add_history(false)
        .build();
    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(h));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if rl.load_history(&history_file).is_err() {
        println!("No previous history.");
    }

    let mut console = StdConsole;
    loop {
        match rl.readline("lis> ") {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let trimmed_input = line.trim();
                if trimmed_input.is_empty() {
                    continue;
                }
                if trimmed_input.eq_ignore_ascii_case("exit") {
                    break;
                }

                match eval_input(trimmed_input, &global_env, &mut console) {
                    Ok(value) => print_result(&value),
                    Err(e) => {
                        if e.pretty_print("REPL", trimmed_input).is_err() {
                            eprintln!("Error: {}", e);
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                println!("\nLeaving lis.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history(&history_file)
}
