//! The macro-aware grammar.
//!
//! [`MacroParser`] decorates the host grammar through [`Grammar`] hooks:
//!
//! - `parse_statement` recognizes `macro name { ... }` declarations;
//! - `parse_identifier_expression` recognizes `name(...)` calls to a visible
//!   macro and captures the arguments as a raw token tree;
//! - `declare_binding` / `resolve_reference` apply hygiene colors when the
//!   parser is re-reading an expansion.

use tracing::debug;

use crate::ast::{Expr, Identifier, MacroDeclarationStmt, MacroInvocation, Program, Stmt};
use crate::compiler::Session;
use crate::syntax::grammar::{expect_punct, finish_span, parse_program};
use crate::syntax::{expression, statement, Cursor, Grammar, Token};
use crate::{err_ctx, MacroJsError};

use super::hygiene::{Hygiene, TokenScope};
use super::scope::{Color, ScopeId, ScopeStack};
use super::tokentree::{consume_token_tree, TokenTreeError};
use super::types::{CaptureKind, MacroDeclaration, MacroId, MacroPattern, MacroPatternArgument};

pub struct MacroParser<'s> {
    session: &'s mut Session,
    cursor: Cursor,
    root: ScopeId,
    scope_stack: ScopeStack,
    hygiene: Option<Hygiene>,
}

impl<'s> MacroParser<'s> {
    /// A parser over `tokens` with a fresh root scope.
    pub fn new(session: &'s mut Session, tokens: Vec<Token>) -> Self {
        let root = session.scopes.alloc();
        Self {
            session,
            cursor: Cursor::new(tokens),
            root,
            scope_stack: im::vector![root],
            hygiene: None,
        }
    }

    /// A parser that sees the macros of `outer`, with a scratch scope on top
    /// so nothing it declares leaks into `outer`.
    pub fn nested(session: &'s mut Session, tokens: Vec<Token>, outer: &ScopeStack) -> Self {
        let root = session.scopes.alloc();
        let mut scope_stack = outer.clone();
        scope_stack.push_back(root);
        Self {
            session,
            cursor: Cursor::new(tokens),
            root,
            scope_stack,
            hygiene: None,
        }
    }

    pub fn with_hygiene(mut self, hygiene: Hygiene) -> Self {
        self.hygiene = Some(hygiene);
        self
    }

    pub fn parse_program(&mut self) -> Result<Program, MacroJsError> {
        parse_program(self)
    }

    /// Number of tokens consumed so far.
    pub fn consumed(&self) -> usize {
        self.cursor.index()
    }

    /// The color allocated by this expansion, if any binding needed one.
    pub fn assigned_color(&self) -> Option<Color> {
        self.hygiene.as_ref().and_then(Hygiene::color)
    }

    fn current_scope(&self) -> ScopeId {
        self.scope_stack.back().copied().unwrap_or(self.root)
    }

    // ------------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------------

    fn parse_macro_declaration(&mut self) -> Result<Stmt, MacroJsError> {
        let start = self.cursor.advance().span;
        let name_token = self.cursor.advance();
        let name = Identifier::new(name_token.value.clone(), name_token.span);
        let scope = self.current_scope();
        // The macro name is a binding of this scope, but never colored.
        self.session.scopes.mark_color(scope, &name.name, None);

        expect_punct(self, "{")?;
        let mut patterns = Vec::new();
        while !self.cursor.check_punct("}") {
            if self.cursor.peek().is_eof() {
                return Err(err_ctx!(
                    Syntax,
                    self.cursor.peek().span,
                    "Unexpected end of input in macro {}",
                    name.name
                ));
            }
            patterns.push(self.parse_macro_pattern()?);
        }
        self.cursor.advance();
        let span = finish_span(self, start);
        if patterns.is_empty() {
            return Err(err_ctx!(Syntax, span, "macro {} declares no patterns", name.name));
        }

        let declaration = MacroDeclaration {
            name: name.name.clone(),
            patterns,
            scope_stack: self.scope_stack.clone(),
            span,
        };
        let alternatives = declaration.patterns.len();
        let macro_id = self.session.macros.register(declaration);
        self.session.scopes.register_macro(scope, &name.name, macro_id);
        debug!(macro_name = %name.name, alternatives, line = span.line, "declared macro");
        Ok(Stmt::MacroDeclaration(MacroDeclarationStmt {
            name,
            macro_id,
            span,
        }))
    }

    fn parse_macro_pattern(&mut self) -> Result<MacroPattern, MacroJsError> {
        let start = expect_punct(self, "(")?.span;
        let arguments = self.parse_pattern_arguments(")")?;
        expect_punct(self, ")")?;
        expect_punct(self, "=>")?;
        expect_punct(self, "{")?;
        let body = self.parse_token_tree("}")?;
        Ok(MacroPattern {
            arguments,
            body,
            span: finish_span(self, start),
        })
    }

    /// Pattern arguments up to (not including) `end` at bracket depth zero.
    fn parse_pattern_arguments(&mut self, end: &'static str) -> Result<Vec<MacroPatternArgument>, MacroJsError> {
        let mut arguments = Vec::new();
        let mut open: Vec<&'static str> = Vec::new();
        loop {
            let token = self.cursor.peek().clone();
            if token.is_eof() {
                return Err(err_ctx!(Syntax, token.span, "Unexpected end of input in macro pattern"));
            }
            match open.last().copied() {
                None if token.is_punct(end) => return Ok(arguments),
                Some(close) if token.is_punct(close) => {
                    open.pop();
                    arguments.push(MacroPatternArgument::Literal(self.cursor.advance()));
                    continue;
                }
                _ => {}
            }
            if let Some(close) = token.closing_bracket() {
                open.push(close);
                arguments.push(MacroPatternArgument::Literal(self.cursor.advance()));
            } else if token.is_closing_bracket() {
                return Err(err_ctx!(Syntax, token.span, "Unexpected token {}", token));
            } else {
                arguments.push(self.parse_pattern_argument()?);
            }
        }
    }

    fn parse_pattern_argument(&mut self) -> Result<MacroPatternArgument, MacroJsError> {
        let token = self.cursor.peek().clone();
        if token.is_word("$") && self.cursor.peek_nth(1).is_punct("(") {
            self.cursor.advance();
            self.cursor.advance();
            let content = self.parse_pattern_arguments(")")?;
            expect_punct(self, ")")?;
            let separator = self.cursor.advance();
            if separator.is_eof() {
                return Err(err_ctx!(
                    Syntax,
                    separator.span,
                    "Expected a separator after repetition group"
                ));
            }
            return Ok(MacroPatternArgument::Repetition {
                content,
                separator,
                span: finish_span(self, token.span),
            });
        }
        if let Some(name) = capture_name(&token) {
            self.cursor.advance();
            expect_punct(self, ":")?;
            let kind_token = self.cursor.advance();
            let kind = Some(&kind_token)
                .filter(|t| t.is_name())
                .and_then(|t| CaptureKind::parse(&t.value))
                .ok_or_else(|| {
                    err_ctx!(
                        Syntax,
                        kind_token.span,
                        "Unknown capture kind '{}', expected literal, ident, expr or stmt",
                        kind_token
                    )
                })?;
            return Ok(MacroPatternArgument::Variable {
                name: name.to_string(),
                kind,
                span: token.span,
            });
        }
        Ok(MacroPatternArgument::Literal(self.cursor.advance()))
    }

    fn parse_token_tree(&mut self, end: &'static str) -> Result<Vec<Token>, MacroJsError> {
        let cursor = &mut self.cursor;
        let result = consume_token_tree(end, || Some(cursor.advance()));
        result.map_err(|error| match error {
            TokenTreeError::Mismatched(token) => {
                err_ctx!(Syntax, token.span, "Unexpected token {}", token)
            }
            TokenTreeError::UnexpectedEnd => err_ctx!(
                Syntax,
                self.cursor.peek().span,
                "Unexpected end of input, expected '{}'",
                end
            ),
        })
    }

    // ------------------------------------------------------------------------
    // Invocations
    // ------------------------------------------------------------------------

    fn parse_macro_invocation(&mut self, macro_id: MacroId) -> Result<Expr, MacroJsError> {
        let name_token = self.cursor.advance();
        self.cursor.advance();
        let first = self.cursor.index();
        let mut tokens = self.parse_token_tree(")")?;
        self.fix_captured_colors(&mut tokens, first)?;
        let span = finish_span(self, name_token.span);
        debug!(
            macro_name = %name_token.value,
            tokens = tokens.len(),
            line = span.line,
            "captured macro invocation"
        );
        Ok(Expr::MacroInvocation(MacroInvocation {
            name: Identifier::new(name_token.value, name_token.span),
            macro_id,
            tokens,
            scope_stack: self.scope_stack.clone(),
            span,
        }))
    }

    /// Macro lookup: an expansion first looks where the token was written,
    /// then falls back to the parser's own scopes.
    fn lookup_macro(&self, name: &str, index: usize) -> Result<Option<MacroId>, MacroJsError> {
        if let Some(hygiene) = &self.hygiene {
            let stack = hygiene.scope_stack(hygiene.origin(index)?);
            if let Some(id) = self.session.scopes.find_macro(stack, name) {
                return Ok(Some(id));
            }
        }
        Ok(self.session.scopes.find_macro(&self.scope_stack, name))
    }

    /// The color an identifier token resolves to. Body tokens are looked
    /// up in the declaration scopes; invocation tokens keep the color they
    /// were captured with, so a name the caller wrote is never renamed by an
    /// unrelated expansion.
    fn token_color(&self, index: usize, name: &str) -> Result<Option<Color>, MacroJsError> {
        let Some(hygiene) = &self.hygiene else {
            return Ok(None);
        };
        Ok(match hygiene.origin(index)? {
            TokenScope::Body => self.session.scopes.find_color(hygiene.scope_stack(TokenScope::Body), name),
            TokenScope::Invocation => self.cursor.token_at(index).color,
        })
    }

    fn color_identifier(&self, id: &mut Identifier, index: usize) -> Result<(), MacroJsError> {
        if let Some(color) = self.token_color(index, &id.name)? {
            id.apply_color(color);
        }
        Ok(())
    }

    /// Names captured for a nested invocation carry the color they have here,
    /// before later expansions can change the marks of the scopes involved.
    fn fix_captured_colors(&self, tokens: &mut [Token], first: usize) -> Result<(), MacroJsError> {
        if self.hygiene.is_none() {
            return Ok(());
        }
        for (offset, token) in tokens.iter_mut().enumerate() {
            if token.is_name() && capture_name(token).is_none() {
                token.color = self.token_color(first + offset, &token.value)?;
            }
        }
        Ok(())
    }
}

/// `$name` tokens name pattern variables; a lone `$` does not.
pub(crate) fn capture_name(token: &Token) -> Option<&str> {
    if token.is_name() && token.value.len() > 1 {
        token.value.strip_prefix('$')
    } else {
        None
    }
}

impl Grammar for MacroParser<'_> {
    fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    fn enter_scope(&mut self) {
        let scope = self.session.scopes.alloc();
        self.scope_stack.push_back(scope);
    }

    fn exit_scope(&mut self) {
        if self.scope_stack.len() > 1 {
            self.scope_stack.pop_back();
        }
    }

    fn declare_binding(&mut self, id: &mut Identifier, token_index: usize) -> Result<(), MacroJsError> {
        let carried = self.cursor.token_at(token_index).color;
        let own = self.current_scope();
        let session = &mut *self.session;
        match self.hygiene.as_mut() {
            Some(hygiene) => {
                let origin = hygiene.origin(token_index)?;
                let color = match origin {
                    TokenScope::Body => Some(hygiene.color_or_insert_with(|| session.allocate_color())),
                    TokenScope::Invocation => carried,
                };
                if let Some(owner) = hygiene.scope_stack(origin).back().copied() {
                    session.scopes.mark_color(owner, &id.name, color);
                }
            }
            // A plain binding shadows any color an outer scope holds for the name.
            None => session.scopes.mark_color(own, &id.name, None),
        }
        self.color_identifier(id, token_index)
    }

    fn resolve_reference(&mut self, id: &mut Identifier, token_index: usize) -> Result<(), MacroJsError> {
        self.color_identifier(id, token_index)
    }

    fn parse_statement(&mut self) -> Result<Stmt, MacroJsError> {
        if self.cursor.peek().is_word("macro") && self.cursor.peek_nth(1).is_name() {
            return self.parse_macro_declaration();
        }
        statement::parse_statement(self)
    }

    fn parse_identifier_expression(&mut self) -> Result<Expr, MacroJsError> {
        let index = self.cursor.index();
        let token = self.cursor.peek();
        if token.is_name() && self.cursor.peek_nth(1).is_punct("(") {
            let name = token.value.clone();
            if let Some(macro_id) = self.lookup_macro(&name, index)? {
                return self.parse_macro_invocation(macro_id);
            }
        }
        expression::parse_identifier_reference(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::tokenize;

    fn parse(session: &mut Session, source: &str) -> Result<Program, MacroJsError> {
        MacroParser::new(session, tokenize(source).unwrap()).parse_program()
    }

    fn only_declaration<'a>(session: &'a Session) -> &'a MacroDeclaration {
        let (_, declaration) = session.macros.iter().next().unwrap();
        declaration
    }

    #[test]
    fn declaration_patterns_are_parsed_structurally() {
        let mut session = Session::new();
        let program = parse(
            &mut session,
            "macro add { ($arg:literal) => { $arg } ($first:literal, $($rest:literal),) => { $first + add($($rest),) } }",
        )
        .unwrap();
        assert!(matches!(program.body[0], Stmt::MacroDeclaration(_)));
        let declaration = only_declaration(&session);
        assert_eq!(declaration.patterns.len(), 2);
        match &declaration.patterns[1].arguments[2] {
            MacroPatternArgument::Repetition { content, separator, .. } => {
                assert_eq!(separator.value, ",");
                assert!(matches!(&content[0], MacroPatternArgument::Variable { name, kind: CaptureKind::Literal, .. } if name == "rest"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            crate::syntax::render_tokens(&declaration.patterns[1].body),
            "$first + add ( $ ( $rest ) , )"
        );
    }

    #[test]
    fn bracketed_literals_in_patterns() {
        let mut session = Session::new();
        parse(&mut session, "macro m { ([$x:ident]) => { $x } }").unwrap();
        let arguments = &only_declaration(&session).patterns[0].arguments;
        assert_eq!(arguments.len(), 3);
        assert!(matches!(&arguments[0], MacroPatternArgument::Literal(t) if t.value == "["));
        assert!(matches!(&arguments[2], MacroPatternArgument::Literal(t) if t.value == "]"));
    }

    #[test]
    fn invocations_capture_raw_tokens() {
        let mut session = Session::new();
        let err = parse(&mut session, "macro m { ($e:expr) => { $e } }\nlet x = m(1 +, [ )] );").unwrap_err();
        assert!(err.to_string().starts_with("Unexpected token )"));

        let mut session = Session::new();
        let program = parse(&mut session, "macro m { ($e:expr) => { $e } }\nlet x = m(1 + * 2);").unwrap();
        match &program.body[1] {
            Stmt::Variable(decl) => match &decl.declarations[0].init {
                Some(Expr::MacroInvocation(invocation)) => {
                    assert_eq!(crate::syntax::render_tokens(&invocation.tokens), "1 + * 2");
                }
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn macros_are_not_hoisted() {
        let mut session = Session::new();
        let program = parse(&mut session, "foo(1);\nmacro foo { ($x:literal) => { $x } }\nfoo(2);").unwrap();
        assert!(matches!(
            &program.body[0],
            Stmt::Expression { expression: Expr::Call { .. }, .. }
        ));
        assert!(matches!(
            &program.body[2],
            Stmt::Expression { expression: Expr::MacroInvocation(_), .. }
        ));
    }

    #[test]
    fn macros_are_block_scoped() {
        let mut session = Session::new();
        let program = parse(&mut session, "{ macro foo { () => { 1 } } foo(); }\nfoo();").unwrap();
        assert!(matches!(
            &program.body[1],
            Stmt::Expression { expression: Expr::Call { .. }, .. }
        ));
    }

    #[test]
    fn malformed_declarations_are_syntax_errors() {
        for source in [
            "macro m { ($x:thing) => { $x } }",
            "macro m { ($x) => { $x } }",
            "macro m { ($x:expr) { $x } }",
            "macro m { }",
            "macro m { ($x:expr) => { $x }",
            "macro m { ($($x:expr)) => { $x } }",
        ] {
            let mut session = Session::new();
            let err = parse(&mut session, source).unwrap_err();
            assert_eq!(err.error_type(), crate::ErrorType::Syntax, "{source}");
        }
    }
}
