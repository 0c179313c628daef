use serde::Serialize;

use crate::ast::Span;
use crate::macros::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Name,
    Keyword,
    Num,
    BigInt,
    String,
    Regex,
    Punct,
    Eof,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Name => "name",
            TokenKind::Keyword => "keyword",
            TokenKind::Num => "num",
            TokenKind::BigInt => "bigint",
            TokenKind::String => "string",
            TokenKind::Regex => "regex",
            TokenKind::Punct => "punct",
            TokenKind::Eof => "eof",
        }
    }
}

/// A lexical token: kind, raw source text and position.
///
/// Tokens are the currency of the macro system. Invocation arguments and
/// macro bodies are stored as token lists and re-parsed after substitution,
/// so a token must carry everything needed to parse it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub span: Span,
    /// A line terminator separates this token from the previous one.
    pub newline_before: bool,
    /// Hygiene color fixed when the token was captured inside an expansion.
    /// Source tokens have none.
    pub color: Option<Color>,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            value: value.into(),
            span,
            newline_before: false,
            color: None,
        }
    }

    pub fn eof(span: Span) -> Self {
        Self::new(TokenKind::Eof, "", span)
    }

    /// A token that does not come from the source, positioned at `at`.
    pub fn synthetic(kind: TokenKind, value: &str, at: &Token) -> Self {
        Self::new(kind, value, at.span)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    pub fn is_punct(&self, value: &str) -> bool {
        self.kind == TokenKind::Punct && self.value == value
    }

    pub fn is_keyword(&self, value: &str) -> bool {
        self.kind == TokenKind::Keyword && self.value == value
    }

    pub fn is_name(&self) -> bool {
        self.kind == TokenKind::Name
    }

    /// A contextual word such as `let`, `of` or `macro`.
    pub fn is_word(&self, value: &str) -> bool {
        self.kind == TokenKind::Name && self.value == value
    }

    /// Tokens accepted by a `literal` capture.
    pub fn is_literal(&self) -> bool {
        match self.kind {
            TokenKind::Num | TokenKind::BigInt | TokenKind::String | TokenKind::Regex => true,
            TokenKind::Keyword => matches!(self.value.as_str(), "true" | "false" | "null"),
            TokenKind::Name => self.value == "undefined",
            TokenKind::Punct | TokenKind::Eof => false,
        }
    }

    /// Same kind and same text; positions are ignored.
    pub fn same_as(&self, other: &Token) -> bool {
        self.kind == other.kind && self.value == other.value
    }

    /// The closer matching an opening bracket.
    pub fn closing_bracket(&self) -> Option<&'static str> {
        if self.kind != TokenKind::Punct {
            return None;
        }
        match self.value.as_str() {
            "(" => Some(")"),
            "[" => Some("]"),
            "{" => Some("}"),
            _ => None,
        }
    }

    pub fn is_closing_bracket(&self) -> bool {
        self.kind == TokenKind::Punct && matches!(self.value.as_str(), ")" | "]" | "}")
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_eof() {
            write!(f, "end of input")
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// Renders tokens back to readable text, one space between tokens.
pub fn render_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&token.value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(kind: TokenKind, value: &str) -> Token {
        Token::new(kind, value, Span::default())
    }

    #[test]
    fn literal_tokens() {
        assert!(tok(TokenKind::Num, "123").is_literal());
        assert!(tok(TokenKind::BigInt, "123n").is_literal());
        assert!(tok(TokenKind::Regex, "/match/").is_literal());
        assert!(tok(TokenKind::Keyword, "null").is_literal());
        assert!(tok(TokenKind::Name, "undefined").is_literal());
        assert!(!tok(TokenKind::Keyword, "this").is_literal());
        assert!(!tok(TokenKind::Name, "foo").is_literal());
    }

    #[test]
    fn comparison_ignores_position() {
        let a = Token::new(TokenKind::Num, "1", Span::new(0, 1, 1, 0));
        let b = Token::new(TokenKind::Num, "1", Span::new(9, 10, 4, 2));
        assert!(a.same_as(&b));
        assert!(!a.same_as(&tok(TokenKind::String, "1")));
    }

    #[test]
    fn render_joins_with_spaces() {
        let tokens = vec![
            tok(TokenKind::Name, "a"),
            tok(TokenKind::Punct, "+"),
            tok(TokenKind::Num, "1"),
        ];
        assert_eq!(render_tokens(&tokens), "a + 1");
    }
}
