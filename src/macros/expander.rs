//! Instantiating a matched pattern body and re-parsing it under hygiene.

use tracing::debug;

use crate::ast::{MacroInvocation, Program};
use crate::compiler::Session;
use crate::syntax::{render_tokens, Token};
use crate::{err_ctx, expansion_err, MacroJsError};

use super::hygiene::{Hygiene, TokenScope};
use super::matcher::{Bindings, Fragment, PatternMatcher};
use super::parser::{capture_name, MacroParser};
use super::scope::Color;
use super::tokentree::{consume_token_tree, TokenTreeError};

/// The parsed result of one expansion.
#[derive(Debug, Clone)]
pub struct Expansion {
    pub program: Program,
    /// Color given to body-introduced bindings; `None` when the body bound nothing.
    pub color: Option<Color>,
    /// Which pattern alternative was selected.
    pub pattern_index: usize,
}

pub struct Expander<'a> {
    session: &'a mut Session,
    invocation: &'a MacroInvocation,
}

impl<'a> Expander<'a> {
    pub fn new(session: &'a mut Session, invocation: &'a MacroInvocation) -> Self {
        Self { session, invocation }
    }

    pub fn expand(self) -> Result<Expansion, MacroJsError> {
        let invocation = self.invocation;
        let declaration = self
            .session
            .macros
            .get(invocation.macro_id)
            .cloned()
            .ok_or_else(|| {
                err_ctx!(
                    Internal,
                    invocation.span,
                    "macro {} resolved to an unregistered declaration",
                    invocation.name.name
                )
            })?;

        let (pattern_index, bindings) =
            PatternMatcher::new(&mut *self.session, invocation, &declaration.name).match_patterns(&declaration.patterns)?;
        let body = declaration
            .patterns
            .get(pattern_index)
            .map(|pattern| pattern.body.as_slice())
            .unwrap_or_default();

        let mut transcriber = Transcriber {
            macro_name: &declaration.name,
            bindings: &bindings,
            output: Vec::new(),
        };
        transcriber.transcribe(body, &mut Vec::new())?;
        let (tokens, origins): (Vec<Token>, Vec<TokenScope>) = transcriber.output.into_iter().unzip();
        debug!(
            macro_name = %declaration.name,
            alternative = pattern_index,
            tokens = tokens.len(),
            "instantiated macro body"
        );

        let hygiene = Hygiene::new(origins, declaration.scope_stack.clone(), invocation.scope_stack.clone());
        let mut parser = MacroParser::nested(&mut *self.session, tokens, &declaration.scope_stack).with_hygiene(hygiene);
        let program = parser.parse_program().map_err(|error| match error {
            MacroJsError::Syntax { .. } => {
                error.with_related(invocation.span, format!("while expanding {}", declaration.name))
            }
            other => other,
        })?;
        Ok(Expansion {
            program,
            color: parser.assigned_color(),
            pattern_index,
        })
    }
}

/// Walks a body template, substituting captures and unrolling repetition groups.
struct Transcriber<'b> {
    macro_name: &'b str,
    bindings: &'b Bindings,
    output: Vec<(Token, TokenScope)>,
}

impl Transcriber<'_> {
    /// `path` holds the iteration index of every enclosing repetition group.
    fn transcribe(&mut self, template: &[Token], path: &mut Vec<usize>) -> Result<(), MacroJsError> {
        let mut index = 0;
        while let Some(token) = template.get(index) {
            let opens_group = token.is_word("$") && template.get(index + 1).is_some_and(|next| next.is_punct("("));
            if opens_group {
                let mut rest = template[index + 2..].iter().cloned();
                let group = consume_token_tree(")", || rest.next()).map_err(|error| match error {
                    TokenTreeError::Mismatched(close) => {
                        err_ctx!(Syntax, close.span, "Unexpected token {}", close)
                    }
                    TokenTreeError::UnexpectedEnd => {
                        err_ctx!(Syntax, token.span, "Unterminated repetition group in macro body")
                    }
                })?;
                let separator = rest
                    .next()
                    .ok_or_else(|| err_ctx!(Syntax, token.span, "Expected a separator after repetition group"))?;
                index = template.len() - rest.len();
                self.transcribe_repetition(token, &group, &separator, path)?;
                continue;
            }
            match capture_name(token) {
                Some(name) => self.substitute(name, token, path)?,
                None => self.output.push((token.clone(), TokenScope::Body)),
            }
            index += 1;
        }
        Ok(())
    }

    fn transcribe_repetition(
        &mut self,
        dollar: &Token,
        group: &[Token],
        separator: &Token,
        path: &mut Vec<usize>,
    ) -> Result<(), MacroJsError> {
        let count = self.repetition_count(dollar, group, path)?;
        for iteration in 0..count {
            if iteration > 0 {
                self.output.push((separator.clone(), TokenScope::Body));
            }
            path.push(iteration);
            let result = self.transcribe(group, path);
            path.pop();
            result?;
        }
        Ok(())
    }

    /// The one occurrence count shared by every repeated capture the group references.
    fn repetition_count(&self, dollar: &Token, group: &[Token], path: &[usize]) -> Result<usize, MacroJsError> {
        let mut count: Option<(&str, usize)> = None;
        for name in group.iter().filter_map(capture_name) {
            let Some(binding) = self.bindings.get(name) else {
                continue;
            };
            if binding.depth <= path.len() {
                continue;
            }
            let occurrences = binding
                .fragment
                .at(path)
                .and_then(Fragment::occurrences)
                .ok_or_else(|| err_ctx!(Internal, dollar.span, "capture {} has no occurrences at {:?}", name, path))?;
            match count {
                None => count = Some((name, occurrences)),
                Some((first, expected)) if expected != occurrences => {
                    return Err(expansion_err!(
                        self.macro_name,
                        dollar.span,
                        "repetition count mismatch: {} has {} occurrences but {} has {}",
                        first,
                        expected,
                        name,
                        occurrences
                    ));
                }
                Some(_) => {}
            }
        }
        count.map(|(_, occurrences)| occurrences).ok_or_else(|| {
            expansion_err!(
                self.macro_name,
                dollar.span,
                "repetition group `$( {} )` references no repeated capture",
                render_tokens(group)
            )
        })
    }

    fn substitute(&mut self, name: &str, placeholder: &Token, path: &[usize]) -> Result<(), MacroJsError> {
        let binding = self
            .bindings
            .get(name)
            .ok_or_else(|| expansion_err!(self.macro_name, placeholder.span, "unbound capture ${}", name))?;
        if binding.depth != path.len() {
            return Err(expansion_err!(
                self.macro_name,
                placeholder.span,
                "capture ${} is bound at repetition depth {} but used at depth {}",
                name,
                binding.depth,
                path.len()
            ));
        }
        let Some(Fragment::Tokens(tokens)) = binding.fragment.at(path) else {
            return Err(err_ctx!(
                Internal,
                placeholder.span,
                "capture {} has no tokens at {:?}",
                name,
                path
            ));
        };
        for (position, token) in tokens.iter().enumerate() {
            let mut token = token.clone();
            if position == 0 {
                token.newline_before = placeholder.newline_before;
            }
            self.output.push((token, TokenScope::Invocation));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Stmt};
    use crate::syntax::tokenize;
    use crate::ErrorType;

    /// Parses `source` and expands its last statement, which must be an invocation.
    fn expand_last(source: &str) -> Result<Expansion, MacroJsError> {
        let mut session = Session::new();
        let program = MacroParser::new(&mut session, tokenize(source).unwrap()).parse_program()?;
        let invocation = match program.body.last() {
            Some(Stmt::Expression {
                expression: Expr::MacroInvocation(invocation),
                ..
            }) => invocation.clone(),
            other => panic!("not an invocation: {other:?}"),
        };
        Expander::new(&mut session, &invocation).expand()
    }

    fn expression_of(expansion: &Expansion) -> &Expr {
        match &expansion.program.body[0] {
            Stmt::Expression { expression, .. } => expression,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn first_fully_consuming_alternative_is_selected() {
        let expansion = expand_last(
            "macro foo { ($a:literal) => { $a } ($a:literal, $b:literal) => { $a + $b } }\nfoo(1, 2);",
        )
        .unwrap();
        assert_eq!(expansion.pattern_index, 1);
        assert!(matches!(expression_of(&expansion), Expr::Binary { .. }));
    }

    #[test]
    fn repetitions_unroll_with_separators() {
        let expansion = expand_last("macro arr { ($($x:literal),) => { [$($x),] } }\narr(1, 'two', 3n);").unwrap();
        match expression_of(&expansion) {
            Expr::Array { elements, .. } => assert_eq!(elements.len(), 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn zero_repetitions_are_legal() {
        let expansion = expand_last("macro arr { ($($x:literal),) => { [$($x),] } }\narr();").unwrap();
        match expression_of(&expansion) {
            Expr::Array { elements, .. } => assert!(elements.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn mismatched_repetition_counts_fail() {
        let err = expand_last(
            "macro zip { ($($a:literal),; $($b:literal),) => { [$([$a, $b]),] } }\nzip(1, 2; 3);",
        )
        .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Expansion);
        assert!(err.message().contains("repetition count mismatch"), "{err}");
    }

    #[test]
    fn repetition_without_captures_fails() {
        let err = expand_last("macro m { ($($a:literal),) => { $(0), } }\nm(1);").unwrap_err();
        assert!(err.message().contains("references no repeated capture"), "{err}");
    }

    #[test]
    fn capture_used_at_wrong_depth_fails() {
        let err = expand_last("macro m { ($($a:literal),) => { $a } }\nm(1, 2);").unwrap_err();
        assert!(err.message().contains("bound at repetition depth 1 but used at depth 0"), "{err}");
    }

    #[test]
    fn unbound_capture_fails() {
        let err = expand_last("macro m { ($a:literal) => { $b } }\nm(1);").unwrap_err();
        assert_eq!(err.to_string(), "in m: unbound capture $b (1:28)");
    }

    #[test]
    fn duplicate_capture_fails() {
        let err = expand_last("macro m { ($a:literal, $a:literal) => { $a } }\nm(1, 2);").unwrap_err();
        assert_eq!(err.message(), "duplicate binding a");
    }

    #[test]
    fn no_match_names_the_macro() {
        let err = expand_last("macro m { ($a:ident) => { $a } }\nm(1);").unwrap_err();
        assert_eq!(err.message(), "no matches found for macro m");
    }

    #[test]
    fn body_bindings_are_colored_and_captures_are_not() {
        let expansion =
            expand_last("macro foo { ($name:ident) => { let $name = 1; let two = 2; } }\nfoo(bar);").unwrap();
        assert_eq!(expansion.color.map(|c| c.value()), Some(1));
        let names: Vec<_> = expansion
            .program
            .body
            .iter()
            .map(|stmt| match stmt {
                Stmt::Variable(decl) => decl.declarations[0].id.name.clone(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(names, ["bar", "two_1"]);
    }

    #[test]
    fn expression_captures_keep_their_grouping() {
        let expansion = expand_last("macro twice { ($e:expr) => { $e * 2 } }\ntwice(1 + 1);").unwrap();
        match expression_of(&expansion) {
            Expr::Binary { left, .. } => assert!(matches!(**left, Expr::Binary { .. })),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn nested_repetitions_follow_their_own_counts() {
        let expansion = expand_last(
            "macro rows { ($([$($x:literal),]),) => { [$([$($x),]),] } }\nrows([1, 2], [], [3]);",
        )
        .unwrap();
        match expression_of(&expansion) {
            Expr::Array { elements, .. } => {
                let lengths: Vec<_> = elements
                    .iter()
                    .map(|row| match row {
                        Expr::Array { elements, .. } => elements.len(),
                        other => panic!("unexpected {other:?}"),
                    })
                    .collect();
                assert_eq!(lengths, [2, 0, 1]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
