use crate::ast::Span;

use super::token::Token;

/// A read position over a finite token list.
///
/// Reading past the end yields an end-of-input token positioned after the
/// last real token, so parse rules never have to special-case exhaustion.
#[derive(Debug, Clone)]
pub struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
    eof: Token,
    /// Cleared while parsing a `for` head, where `in` ends the expression.
    pub allow_in: bool,
}

impl Cursor {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        let eof = match tokens.last() {
            Some(last) if last.is_eof() => tokens.pop().unwrap_or_else(|| Token::eof(Span::default())),
            Some(last) => {
                let end = last.span.end;
                let column = last.span.column + last.value.chars().count() as u32;
                Token::eof(Span::new(end, end, last.span.line, column))
            }
            None => Token::eof(Span::default()),
        };
        Self {
            tokens,
            pos: 0,
            eof,
            allow_in: true,
        }
    }

    /// Index of the next token to be read.
    pub fn index(&self) -> usize {
        self.pos
    }

    pub fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    pub fn peek_nth(&self, n: usize) -> &Token {
        self.tokens.get(self.pos + n).unwrap_or(&self.eof)
    }

    pub fn token_at(&self, index: usize) -> &Token {
        self.tokens.get(index).unwrap_or(&self.eof)
    }

    pub fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub fn previous(&self) -> Option<&Token> {
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i))
    }

    /// Span of the last consumed token, or the start of input.
    pub fn previous_span(&self) -> Span {
        self.previous().map(|t| t.span).unwrap_or(self.eof.span)
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn check_punct(&self, value: &str) -> bool {
        self.peek().is_punct(value)
    }

    pub fn eat_punct(&mut self, value: &str) -> bool {
        if self.check_punct(value) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn check_keyword(&self, value: &str) -> bool {
        self.peek().is_keyword(value)
    }

    pub fn eat_keyword(&mut self, value: &str) -> bool {
        if self.check_keyword(value) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Index of the bracket closing the one at `open`, if balanced.
    pub fn matching_close(&self, open: usize) -> Option<usize> {
        let mut stack: Vec<&'static str> = Vec::new();
        for (index, token) in self.tokens.iter().enumerate().skip(open) {
            if let Some(close) = token.closing_bracket() {
                stack.push(close);
            } else if token.is_closing_bracket() {
                match stack.pop() {
                    Some(expected) if token.value == expected => {
                        if stack.is_empty() {
                            return Some(index);
                        }
                    }
                    _ => return None,
                }
            }
        }
        None
    }
}
