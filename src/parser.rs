use crate::lexer::{Token, TokenKind, tokenize};
use crate::source::Span;
use crate::types::Expr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Syntax Error [{span}]: Unexpected \")\"")]
    UnexpectedCloseParen { span: Span },
    #[error("Syntax Error [{span}]: Unexpected end of input, \"(\" is never closed")]
    UnclosedParen { span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedCloseParen { span } | ParseError::UnclosedParen { span } => *span,
        }
    }
}

// Result type alias for convenience
pub type ParseResult<T> = Result<T, ParseError>;

/// Recursive-descent parser. The token source is consumed exactly once;
/// after an error the remaining tokens are meaningless.
pub struct Parser<I> {
    tokens: I,
}

impl<I: Iterator<Item = Token>> Parser<I> {
    pub fn new(tokens: I) -> Self {
        Parser { tokens }
    }

    fn next_token(&mut self) -> Option<Token> {
        self.tokens.next()
    }

    /// Parses the next top-level expression, or returns `None` once the tokens run out.
    pub fn parse_expr(&mut self) -> Option<ParseResult<Expr>> {
        let token = self.next_token()?;
        Some(self.parse_expr_with_token(token))
    }

    fn parse_expr_with_token(&mut self, token: Token) -> ParseResult<Expr> {
        match token.kind {
            TokenKind::LParen => self.parse_list(token.span),
            // A ')' reaching here was not consumed by any open list
            TokenKind::RParen => Err(ParseError::UnexpectedCloseParen { span: token.span }),
            TokenKind::Atom => Ok(Expr::atom(&token.text)),
        }
    }

    /// Parses the elements following a '(' up to and including its matching ')'.
    fn parse_list(&mut self, open: Span) -> ParseResult<Expr> {
        let mut elements = Vec::new();
        loop {
            match self.next_token() {
                Some(Token {
                    kind: TokenKind::RParen,
                    ..
                }) => return Ok(Expr::list(elements)),
                Some(token) => elements.push(self.parse_expr_with_token(token)?),
                None => return Err(ParseError::UnclosedParen { span: open }),
            }
        }
    }

    /// Parses every remaining top-level expression.
    pub fn parse(mut self) -> ParseResult<Vec<Expr>> {
        let mut program = Vec::new();
        while let Some(expr) = self.parse_expr() {
            program.push(expr?);
        }
        Ok(program)
    }
}

pub fn parse_tokens<I>(tokens: I) -> ParseResult<Vec<Expr>>
where
    I: IntoIterator<Item = Token>,
{
    Parser::new(tokens.into_iter()).parse()
}

// Helper function to lex and parse a string directly (useful for tests and REPL)
pub fn parse_str(input: &str) -> ParseResult<Vec<Expr>> {
    parse_tokens(tokenize(input.lines()))
}
