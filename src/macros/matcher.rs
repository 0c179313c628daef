//! Matching invocation tokens against pattern alternatives.
//!
//! Alternatives are tried in declaration order. An alternative matches only
//! if it consumes every argument token; the first one that does wins and
//! later ones are never tried.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::ast::{MacroInvocation, Span};
use crate::compiler::Session;
use crate::syntax::{Grammar, Token, TokenKind};
use crate::{expansion_err, MacroJsError};

use super::parser::MacroParser;
use super::types::{CaptureKind, MacroPattern, MacroPatternArgument};

/// Captured tokens, one tree level per repetition depth.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Tokens(Vec<Token>),
    Repeated(Vec<Fragment>),
}

impl Fragment {
    /// The fragment reached by following `path` through repetition levels.
    pub fn at(&self, path: &[usize]) -> Option<&Fragment> {
        match path.split_first() {
            None => Some(self),
            Some((index, rest)) => match self {
                Fragment::Repeated(items) => items.get(*index)?.at(rest),
                Fragment::Tokens(_) => None,
            },
        }
    }

    /// Number of occurrences at this level of a repeated fragment.
    pub fn occurrences(&self) -> Option<usize> {
        match self {
            Fragment::Repeated(items) => Some(items.len()),
            Fragment::Tokens(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Number of repetition groups enclosing the variable in the pattern.
    pub depth: usize,
    pub fragment: Fragment,
}

/// Variable bindings produced by a successful match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    entries: HashMap<String, Binding>,
}

impl Bindings {
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn take(&mut self, name: &str) -> Option<Binding> {
        self.entries.remove(name)
    }

    /// Binds `name`, refusing a second binding of the same name.
    fn bind(&mut self, name: &str, depth: usize, fragment: Fragment) -> bool {
        if self.entries.contains_key(name) {
            return false;
        }
        self.entries.insert(name.to_string(), Binding { depth, fragment });
        true
    }
}

pub struct PatternMatcher<'a> {
    session: &'a mut Session,
    invocation: &'a MacroInvocation,
    macro_name: &'a str,
    /// Index of the next unmatched invocation token.
    index: usize,
}

impl<'a> PatternMatcher<'a> {
    pub fn new(session: &'a mut Session, invocation: &'a MacroInvocation, macro_name: &'a str) -> Self {
        Self {
            session,
            invocation,
            macro_name,
            index: 0,
        }
    }

    /// Index of the first alternative that matches, with its bindings.
    pub fn match_patterns(&mut self, patterns: &[MacroPattern]) -> Result<(usize, Bindings), MacroJsError> {
        let total = self.invocation.tokens.len();
        for (position, pattern) in patterns.iter().enumerate() {
            self.index = 0;
            let mut bindings = Bindings::default();
            let matched = self.match_arguments(&pattern.arguments, &mut bindings, 0)?;
            if matched && self.index == total {
                debug!(
                    macro_name = self.macro_name,
                    alternative = position,
                    captures = bindings.len(),
                    "selected pattern alternative"
                );
                return Ok((position, bindings));
            }
            trace!(
                macro_name = self.macro_name,
                alternative = position,
                consumed = self.index,
                total,
                "pattern alternative rejected"
            );
        }
        Err(expansion_err!(
            self.macro_name,
            self.invocation.span,
            "no matches found for macro {}",
            self.macro_name
        ))
    }

    fn current(&self) -> Option<&Token> {
        self.invocation.tokens.get(self.index)
    }

    fn match_arguments(
        &mut self,
        arguments: &[MacroPatternArgument],
        bindings: &mut Bindings,
        depth: usize,
    ) -> Result<bool, MacroJsError> {
        for argument in arguments {
            if !self.match_argument(argument, bindings, depth)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn match_argument(
        &mut self,
        argument: &MacroPatternArgument,
        bindings: &mut Bindings,
        depth: usize,
    ) -> Result<bool, MacroJsError> {
        match argument {
            MacroPatternArgument::Literal(expected) => match self.current() {
                Some(token) if token.same_as(expected) => {
                    self.index += 1;
                    Ok(true)
                }
                _ => Ok(false),
            },
            MacroPatternArgument::Variable { name, kind, span } => {
                let Some(tokens) = self.capture(*kind)? else {
                    return Ok(false);
                };
                if !bindings.bind(name, depth, Fragment::Tokens(tokens)) {
                    return Err(self.duplicate(name, *span));
                }
                Ok(true)
            }
            MacroPatternArgument::Repetition {
                content,
                separator,
                span,
            } => {
                self.match_repetition(content, separator, *span, bindings, depth)?;
                Ok(true)
            }
        }
    }

    /// Matches zero or more occurrences of `content` separated by `separator`.
    /// A failed occurrence is rolled back together with the separator before it.
    fn match_repetition(
        &mut self,
        content: &[MacroPatternArgument],
        separator: &Token,
        span: Span,
        bindings: &mut Bindings,
        depth: usize,
    ) -> Result<(), MacroJsError> {
        let mut iterations: Vec<Bindings> = Vec::new();
        let mut restore = self.index;
        loop {
            let mut iteration = Bindings::default();
            if !self.match_arguments(content, &mut iteration, depth + 1)? {
                self.index = restore;
                break;
            }
            iterations.push(iteration);
            restore = self.index;
            match self.current() {
                Some(token) if token.same_as(separator) => self.index += 1,
                _ => break,
            }
        }

        let mut names = Vec::new();
        for argument in content {
            argument.collect_variables(depth + 1, &mut names);
        }
        for (name, name_depth) in names {
            let fragments = iterations
                .iter_mut()
                .map(|iteration| {
                    iteration
                        .take(&name)
                        .map(|binding| binding.fragment)
                        .unwrap_or(Fragment::Repeated(Vec::new()))
                })
                .collect();
            if !bindings.bind(&name, name_depth, Fragment::Repeated(fragments)) {
                return Err(self.duplicate(&name, span));
            }
        }
        Ok(())
    }

    fn duplicate(&self, name: &str, span: Span) -> MacroJsError {
        expansion_err!(self.macro_name, span, "duplicate binding {}", name)
    }

    fn capture(&mut self, kind: CaptureKind) -> Result<Option<Vec<Token>>, MacroJsError> {
        let Some(token) = self.current().cloned() else {
            return Ok(None);
        };
        let captured = match kind {
            CaptureKind::Literal if token.is_literal() => Some(vec![token]),
            CaptureKind::Ident if token.kind == TokenKind::Name => Some(vec![token]),
            CaptureKind::Literal | CaptureKind::Ident => None,
            CaptureKind::Expr => return Ok(self.capture_parsed(kind, &token)),
            CaptureKind::Stmt => return Ok(self.capture_parsed(kind, &token)),
        };
        if captured.is_some() {
            self.index += 1;
        }
        Ok(captured)
    }

    /// Sub-parses the remaining tokens and captures exactly what the parse
    /// consumed. Expressions are wrapped in parentheses so they keep their
    /// grouping wherever they are substituted.
    fn capture_parsed(&mut self, kind: CaptureKind, first: &Token) -> Option<Vec<Token>> {
        let rest = self.invocation.tokens[self.index..].to_vec();
        let mut parser = MacroParser::nested(&mut *self.session, rest, &self.invocation.scope_stack);
        let parsed = match kind {
            CaptureKind::Stmt => parser.parse_statement().map(|_| ()),
            _ => parser.parse_assignment().map(|_| ()),
        };
        let consumed = parser.consumed();
        if let Err(error) = parsed {
            trace!(macro_name = self.macro_name, capture = kind.as_str(), %error, "capture did not parse");
            return None;
        }
        if consumed == 0 {
            return None;
        }
        let slice = &self.invocation.tokens[self.index..self.index + consumed];
        self.index += consumed;
        let tokens = match kind {
            CaptureKind::Expr => {
                let mut tokens = Vec::with_capacity(consumed + 2);
                tokens.push(Token::synthetic(TokenKind::Punct, "(", first));
                tokens.extend_from_slice(slice);
                tokens.push(Token::synthetic(TokenKind::Punct, ")", first));
                tokens
            }
            _ => slice.to_vec(),
        };
        Some(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Stmt};
    use crate::syntax::{render_tokens, tokenize};

    fn matched(source: &str) -> Result<(usize, Bindings), MacroJsError> {
        let mut session = Session::new();
        let program = MacroParser::new(&mut session, tokenize(source).unwrap()).parse_program()?;
        let invocation = match program.body.last() {
            Some(Stmt::Expression {
                expression: Expr::MacroInvocation(invocation),
                ..
            }) => invocation.clone(),
            other => panic!("not an invocation: {other:?}"),
        };
        let declaration = session.macros.get(invocation.macro_id).unwrap().clone();
        PatternMatcher::new(&mut session, &invocation, &declaration.name).match_patterns(&declaration.patterns)
    }

    fn text(fragment: &Fragment) -> String {
        match fragment {
            Fragment::Tokens(tokens) => render_tokens(tokens),
            Fragment::Repeated(_) => panic!("expected tokens"),
        }
    }

    #[test]
    fn partial_consumption_moves_on() {
        let (index, bindings) =
            matched("macro m { ($a:literal) => { $a } ($a:literal, $b:literal) => { $a } }\nm(1, 2);").unwrap();
        assert_eq!(index, 1);
        assert_eq!(bindings.len(), 2);
        assert_eq!(text(&bindings.get("b").unwrap().fragment), "2");
    }

    #[test]
    fn expr_captures_stop_at_the_separator_and_are_grouped() {
        let (_, bindings) = matched("macro m { ($a:expr, $b:expr) => { $a } }\nm(f(1, 2) + 3, x);").unwrap();
        assert_eq!(text(&bindings.get("a").unwrap().fragment), "( f ( 1 , 2 ) + 3 )");
        assert_eq!(text(&bindings.get("b").unwrap().fragment), "( x )");
    }

    #[test]
    fn repetition_builds_one_level_per_depth() {
        let (_, bindings) =
            matched("macro rows { ($([$($x:literal),]),) => { 0 } }\nrows([1, 2], [], [3]);").unwrap();
        let binding = bindings.get("x").unwrap();
        assert_eq!(binding.depth, 2);
        assert_eq!(binding.fragment.occurrences(), Some(3));
        assert_eq!(binding.fragment.at(&[1]).and_then(Fragment::occurrences), Some(0));
        assert_eq!(text(binding.fragment.at(&[0, 1]).unwrap()), "2");
        assert!(binding.fragment.at(&[1, 0]).is_none());
    }

    #[test]
    fn ident_rejects_keywords_and_literals() {
        assert!(matched("macro m { ($a:ident) => { $a } }\nm(this);").is_err());
        assert!(matched("macro m { ($a:ident) => { $a } }\nm('x');").is_err());
        assert!(matched("macro m { ($a:ident) => { $a } }\nm(x);").is_ok());
    }
}
