use logos::Logos;
use std::collections::VecDeque;
use std::fmt;

use crate::source::Span;

/// A line is split on ASCII whitespace, then every word is split around
/// parentheses. Everything else is an atom, so lexing never fails.
#[derive(Logos, Debug, Copy, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\n\r\f\v]+")]
pub enum TokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[regex(r"[^ \t\n\r\f\v()]+")]
    Atom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Lazy token stream over a sequence of source lines.
///
/// Only the tokens of the line currently being consumed are buffered;
/// the next line is not read until those are exhausted.
pub struct Tokens<I> {
    lines: I,
    line: usize,
    pending: VecDeque<Token>,
}

impl<I> Tokens<I> {
    fn lex_line(&mut self, line: &str) {
        let index = self.line;
        self.line += 1;
        self.pending
            .extend(TokenKind::lexer(line).spanned().map(|(result, range)| {
                Token {
                    // Every non-whitespace character matches a rule; treat anything
                    // logos still rejects as part of an atom.
                    kind: result.unwrap_or(TokenKind::Atom),
                    text: line[range.clone()].to_string(),
                    span: Span::new(index, range.start, range.end),
                }
            }));
    }
}

impl<I> Iterator for Tokens<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            let line = self.lines.next()?;
            self.lex_line(line.as_ref());
        }
    }
}

/// Tokenizes any sequence of text lines, e.g. `source.lines()` or a single
/// REPL input wrapped in a one-element array.
pub fn tokenize<I>(lines: I) -> Tokens<I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    Tokens {
        lines: lines.into_iter(),
        line: 0,
        pending: VecDeque::new(),
    }
}
