//! The parser capability interface.
//!
//! Base rules live in [`super::statement`] and [`super::expression`] as free
//! functions generic over [`Grammar`]. Whenever a rule needs a statement, an
//! expression or an identifier it calls back through the trait, so an
//! implementation that overrides a hook sees every occurrence, including the
//! nested ones.

use crate::ast::{Expr, Identifier, Program, Span, Stmt};
use crate::{err_ctx, MacroJsError};

use super::cursor::Cursor;
use super::token::Token;
use super::{expression, statement};

pub trait Grammar {
    fn cursor(&self) -> &Cursor;
    fn cursor_mut(&mut self) -> &mut Cursor;

    fn enter_scope(&mut self) {}

    fn exit_scope(&mut self) {}

    /// Called for every identifier that introduces a binding. `token_index`
    /// is the cursor index of the identifier's token.
    fn declare_binding(&mut self, _id: &mut Identifier, _token_index: usize) -> Result<(), MacroJsError> {
        Ok(())
    }

    /// Called for every identifier read in expression position.
    fn resolve_reference(&mut self, _id: &mut Identifier, _token_index: usize) -> Result<(), MacroJsError> {
        Ok(())
    }

    fn parse_statement(&mut self) -> Result<Stmt, MacroJsError> {
        statement::parse_statement(self)
    }

    fn parse_expression(&mut self) -> Result<Expr, MacroJsError> {
        expression::parse_expression(self)
    }

    fn parse_assignment(&mut self) -> Result<Expr, MacroJsError> {
        expression::parse_assignment(self)
    }

    /// Parses an identifier in expression position.
    fn parse_identifier_expression(&mut self) -> Result<Expr, MacroJsError> {
        expression::parse_identifier_reference(self)
    }

    fn raise_at(&self, span: Span, message: &str) -> MacroJsError {
        err_ctx!(Syntax, span, "{}", message)
    }
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

pub fn unexpected<G: Grammar + ?Sized>(p: &G) -> MacroJsError {
    let token = p.cursor().peek();
    if token.is_eof() {
        p.raise_at(token.span, "Unexpected end of input")
    } else {
        p.raise_at(token.span, &format!("Unexpected token {}", token))
    }
}

pub fn expect_punct<G: Grammar + ?Sized>(p: &mut G, value: &str) -> Result<Token, MacroJsError> {
    if p.cursor().check_punct(value) {
        Ok(p.cursor_mut().advance())
    } else {
        let token = p.cursor().peek();
        Err(p.raise_at(token.span, &format!("Expected '{}' but found {}", value, token)))
    }
}

pub fn expect_keyword<G: Grammar + ?Sized>(p: &mut G, value: &str) -> Result<Token, MacroJsError> {
    if p.cursor().check_keyword(value) {
        Ok(p.cursor_mut().advance())
    } else {
        let token = p.cursor().peek();
        Err(p.raise_at(token.span, &format!("Expected '{}' but found {}", value, token)))
    }
}

/// Consumes a statement terminator, applying automatic semicolon insertion.
pub fn consume_semicolon<G: Grammar + ?Sized>(p: &mut G) -> Result<(), MacroJsError> {
    if p.cursor_mut().eat_punct(";") {
        return Ok(());
    }
    let next = p.cursor().peek();
    if next.is_punct("}") || next.is_eof() || next.newline_before {
        Ok(())
    } else {
        Err(unexpected(p))
    }
}

/// Reads a plain identifier without declaring or resolving it.
pub fn expect_identifier<G: Grammar + ?Sized>(p: &mut G) -> Result<Identifier, MacroJsError> {
    if p.cursor().peek().is_name() {
        let token = p.cursor_mut().advance();
        Ok(Identifier::new(token.value, token.span))
    } else {
        Err(unexpected(p))
    }
}

/// Reads an identifier that introduces a binding.
pub fn parse_binding_identifier<G: Grammar + ?Sized>(p: &mut G) -> Result<Identifier, MacroJsError> {
    let index = p.cursor().index();
    let mut id = expect_identifier(p)?;
    p.declare_binding(&mut id, index)?;
    Ok(id)
}

/// Span from `start` to the end of the last consumed token.
pub fn finish_span<G: Grammar + ?Sized>(p: &G, start: Span) -> Span {
    start.to(p.cursor().previous_span())
}

pub fn parse_program<G: Grammar + ?Sized>(p: &mut G) -> Result<Program, MacroJsError> {
    let start = p.cursor().peek().span;
    let mut body = Vec::new();
    while !p.cursor().peek().is_eof() {
        body.push(p.parse_statement()?);
    }
    Ok(Program {
        body,
        span: finish_span(p, start),
    })
}

/// The host grammar with no extensions.
pub struct PlainParser {
    cursor: Cursor,
}

impl PlainParser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            cursor: Cursor::new(tokens),
        }
    }
}

impl Grammar for PlainParser {
    fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }
}
