//! Host-language lexer.
//!
//! Each token is recognized by the pest grammar in `tokens.pest`, one token
//! at a time, because whether `/` starts a regular expression depends on the
//! previous token and a PEG cannot see that on its own.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use pest::Parser;
use pest_derive::Parser;
use tracing::trace;

use crate::ast::Span;
use crate::{err_ctx, err_msg, MacroJsError};

use super::token::{Token, TokenKind};

#[derive(Parser)]
#[grammar = "syntax/tokens.pest"]
struct TokenGrammar;

static KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "break", "case", "catch", "const", "continue", "default", "delete", "do", "else", "false",
        "finally", "for", "function", "if", "in", "instanceof", "new", "null", "return", "switch",
        "this", "throw", "true", "try", "typeof", "var", "void", "while",
    ]
    .into_iter()
    .collect()
});

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(word)
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Byte offsets at which each line starts.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        let mut chars = source.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            match c {
                '\r' if matches!(chars.peek(), Some((_, '\n'))) => {}
                c if is_line_terminator(c) => starts.push(i + c.len_utf8()),
                _ => {}
            }
        }
        Self { starts }
    }

    /// 1-based line and 0-based character column of a byte offset.
    fn locate(&self, source: &str, offset: usize) -> (u32, u32) {
        let line = self.starts.partition_point(|start| *start <= offset);
        let line_start = self.starts.get(line.saturating_sub(1)).copied().unwrap_or(0);
        let column = source
            .get(line_start..offset)
            .map(|text| text.chars().count())
            .unwrap_or(0);
        (line as u32, column as u32)
    }
}

/// Whether a `/` after `previous` starts a regular expression literal
/// rather than a division operator.
fn regex_allowed(previous: Option<&Token>) -> bool {
    let Some(token) = previous else {
        return true;
    };
    match token.kind {
        TokenKind::Num | TokenKind::BigInt | TokenKind::String | TokenKind::Regex => false,
        TokenKind::Name => false,
        TokenKind::Keyword => !matches!(token.value.as_str(), "this" | "true" | "false" | "null"),
        TokenKind::Punct => !matches!(token.value.as_str(), ")" | "]" | "}" | "++" | "--"),
        TokenKind::Eof => true,
    }
}

/// Splits source text into tokens, ending with a single `Eof` token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, MacroJsError> {
    let lines = LineIndex::new(source);
    let span_at = |start: usize, end: usize| {
        let (line, column) = lines.locate(source, start);
        Span::new(start, end, line, column)
    };

    let mut tokens: Vec<Token> = Vec::new();
    let mut offset = 0;
    loop {
        let rest = &source[offset..];
        let trivia_len = TokenGrammar::parse(Rule::trivia, rest)
            .ok()
            .and_then(|mut pairs| pairs.next())
            .map(|pair| pair.as_str().len())
            .unwrap_or(0);
        let newline_before = rest[..trivia_len].contains(is_line_terminator);
        offset += trivia_len;

        let rest = &source[offset..];
        if rest.is_empty() {
            let mut eof = Token::eof(span_at(offset, offset));
            eof.newline_before = newline_before;
            tokens.push(eof);
            return Ok(tokens);
        }
        if rest.starts_with("/*") {
            return Err(err_ctx!(Syntax, span_at(offset, offset + 2), "Unterminated comment"));
        }

        let rule = if regex_allowed(tokens.last()) {
            Rule::regex_or_token
        } else {
            Rule::token
        };
        let pair = TokenGrammar::parse(rule, rest)
            .ok()
            .and_then(|mut pairs| pairs.next())
            .and_then(|pair| pair.into_inner().next());
        let Some(pair) = pair else {
            let found = rest.chars().next().unwrap_or(' ');
            let message = match found {
                '"' | '\'' => "Unterminated string constant".to_string(),
                '/' => "Unterminated regular expression".to_string(),
                c => format!("Unexpected character '{c}'"),
            };
            return Err(err_ctx!(Syntax, span_at(offset, offset + found.len_utf8()), "{}", message));
        };

        let text = pair.as_str();
        let kind = match pair.as_rule() {
            Rule::identifier if is_keyword(text) => TokenKind::Keyword,
            Rule::identifier => TokenKind::Name,
            Rule::number => TokenKind::Num,
            Rule::bigint => TokenKind::BigInt,
            Rule::string => TokenKind::String,
            Rule::regex => TokenKind::Regex,
            Rule::punctuator => TokenKind::Punct,
            other => return Err(err_msg!(Internal, "lexer produced unexpected rule {:?}", other)),
        };
        let end = offset + text.len();
        let mut token = Token::new(kind, text, span_at(offset, end));
        token.newline_before = newline_before;
        trace!(kind = kind.as_str(), value = text, "token");
        tokens.push(token);
        offset = end;
    }
}
