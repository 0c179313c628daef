//! Per-expansion hygiene context.
//!
//! An expansion re-parses a token list assembled from two sources: tokens
//! written in the macro body and tokens captured from the invocation. Each
//! identifier is resolved against the scope stack of the place its token
//! came from, and only body-introduced bindings receive the expansion's color.

use serde::Serialize;

use crate::{err_msg, MacroJsError};

use super::scope::{Color, ScopeStack};

/// Where an assembled token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenScope {
    /// Written in the macro body (including repetition separators).
    Body,
    /// Substituted from a capture of the invocation's arguments.
    Invocation,
}

#[derive(Debug, Clone)]
pub struct Hygiene {
    origins: Vec<TokenScope>,
    declaration_stack: ScopeStack,
    invocation_stack: ScopeStack,
    color: Option<Color>,
}

impl Hygiene {
    pub fn new(origins: Vec<TokenScope>, declaration_stack: ScopeStack, invocation_stack: ScopeStack) -> Self {
        Self {
            origins,
            declaration_stack,
            invocation_stack,
            color: None,
        }
    }

    /// Origin of the token at `index` in the assembled list.
    pub fn origin(&self, index: usize) -> Result<TokenScope, MacroJsError> {
        self.origins.get(index).copied().ok_or_else(|| {
            err_msg!(
                Internal,
                "identifier at token {} cannot be traced to the macro body or the invocation",
                index
            )
        })
    }

    pub fn scope_stack(&self, origin: TokenScope) -> &ScopeStack {
        match origin {
            TokenScope::Body => &self.declaration_stack,
            TokenScope::Invocation => &self.invocation_stack,
        }
    }

    /// The expansion's color, if one has been allocated yet.
    pub fn color(&self) -> Option<Color> {
        self.color
    }

    /// Returns the expansion's color, allocating it with `allocate` on first use.
    pub fn color_or_insert_with(&mut self, allocate: impl FnOnce() -> Color) -> Color {
        *self.color.get_or_insert_with(allocate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorType;

    #[test]
    fn color_is_allocated_once() {
        let mut hygiene = Hygiene::new(vec![TokenScope::Body], ScopeStack::new(), ScopeStack::new());
        let mut calls = 0;
        let first = hygiene.color_or_insert_with(|| {
            calls += 1;
            Color::new(7)
        });
        let second = hygiene.color_or_insert_with(|| Color::new(8));
        assert_eq!((first, second, calls), (Color::new(7), Color::new(7), 1));
    }

    #[test]
    fn untraceable_token_is_an_internal_error() {
        let hygiene = Hygiene::new(vec![TokenScope::Invocation], ScopeStack::new(), ScopeStack::new());
        assert_eq!(hygiene.origin(0).ok(), Some(TokenScope::Invocation));
        let err = hygiene.origin(3).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Internal);
    }
}
