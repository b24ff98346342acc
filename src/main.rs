use std::io::{IsTerminal, Read};
use std::process::ExitCode;
use std::{env, fs, io};

use lis::{Environment, StdConsole, run_str};

const USAGE: &str = "\
usage: lis FILE
       lis < FILE

Runs a lis program. A program read from standard input has no input left
for (read-line); use `repl` for interactive sessions.";

fn main() -> ExitCode {
    env_logger::init();

    let (name, source) = match env::args().nth(1) {
        Some(flag) if flag == "-h" || flag == "--help" => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Some(path) => match fs::read_to_string(&path) {
            Ok(source) => (path, source),
            Err(e) => {
                eprintln!("Error: cannot read '{}': {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None if io::stdin().is_terminal() => {
            eprintln!("{}", USAGE);
            return ExitCode::FAILURE;
        }
        None => {
            let mut source = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut source) {
                eprintln!("Error: cannot read standard input: {}", e);
                return ExitCode::FAILURE;
            }
            ("<stdin>".to_string(), source)
        }
    };

    // One fresh global environment per run; any error ends the run.
    let global_env = Environment::new();
    match run_str(&source, &global_env, &mut StdConsole) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            if e.pretty_print(&name, &source).is_err() {
                eprintln!("Error: {}", e);
            }
            ExitCode::FAILURE
        }
    }
}
