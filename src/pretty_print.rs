use crate::environment::EnvError;
use crate::evaluator::{ErrorKind, EvalError};
use crate::parser::ParseError;
use crate::program::LisError;
use ariadne::{Config, IndexType, Label, Report, ReportKind, Source};
use std::io;
use std::ops::Range;

type Spanned<'a> = (&'a str, Range<usize>);

// Spans are byte offsets; ariadne counts chars unless told otherwise.
fn report_config() -> Config {
    Config::default().with_index_type(IndexType::Byte)
}

impl ParseError {
    fn report<'a>(&self, name: &'a str, input: &str) -> Report<'a, Spanned<'a>> {
        let range = self.span().to_range(input);
        let builder = match self {
            ParseError::UnexpectedCloseParen { .. } => {
                Report::build(ReportKind::Error, (name, range.clone()))
                    .with_message("Syntax Error: unexpected \")\"")
                    .with_label(
                        Label::new((name, range))
                            .with_message("This parenthesis does not close anything"),
                    )
            }
            ParseError::UnclosedParen { .. } => {
                Report::build(ReportKind::Error, (name, range.clone()))
                    .with_message("Syntax Error: unexpected end of input")
                    .with_label(
                        Label::new((name, range)).with_message("This parenthesis is never closed"),
                    )
            }
        };
        builder.with_config(report_config()).finish()
    }

    pub fn pretty_print(&self, name: &str, input: &str) -> io::Result<()> {
        self.report(name, input).eprint((name, Source::from(input)))
    }
}

impl EvalError {
    fn headline(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Syntax => "Syntax Error",
            ErrorKind::Name => "Name Error",
            ErrorKind::Runtime => "Runtime Error",
        }
    }

    fn label(&self) -> String {
        match self {
            EvalError::EnvError(err @ EnvError::Unbound(_)) => {
                format!("`{}` is not defined in any enclosing scope", err.symbol())
            }
            EvalError::EnvError(err @ EnvError::AlreadyDefined(_)) => format!(
                "`{}` is already defined in this scope; use set! to change it",
                err.symbol()
            ),
            other => other.to_string(),
        }
    }

    /// Evaluation errors carry no source position, so the whole input is labelled.
    pub fn pretty_print(&self, name: &str, input: &str) -> io::Result<()> {
        let range: Range<usize> = 0..input.len();
        Report::build(ReportKind::Error, (name, range.clone()))
            .with_config(report_config())
            .with_message(self.headline())
            .with_label(Label::new((name, range)).with_message(self.label()))
            .finish()
            .eprint((name, Source::from(input)))
    }
}

impl LisError {
    pub fn pretty_print(&self, name: &str, input: &str) -> io::Result<()> {
        match self {
            LisError::Parse(err) => err.pretty_print(name, input),
            LisError::Eval(err) => err.pretty_print(name, input),
        }
    }
}
