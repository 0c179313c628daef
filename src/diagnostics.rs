//!
//! ****************************************************************************************
//! ** Error construction for macrojs (`err_msg!`, `err_ctx!`, `expansion_err!`)          **
//! ****************************************************************************************
//!
//! # Overview
//!
//! Every failure the compiler can produce is a [`MacroJsError`]. There are three kinds:
//!
//! - **Syntax**: malformed host code, malformed macro declarations, patterns or
//!   invocation token trees, unbalanced brackets.
//! - **Expansion**: no pattern alternative matches, duplicate capture names, captures
//!   referenced at the wrong repetition depth, repetition counts that disagree, or an
//!   expansion of the wrong shape spliced into expression position. Always names the macro.
//! - **Internal**: a compiler invariant was violated. Never produced by well-formed input.
//!
//! All of them are fatal for the compile unit. Nothing is retried and no partial output
//! is kept.
//!
//! # Error Construction Macros
//!
//! - `err_msg!(Internal, "printer received a macro declaration")` for message-only errors.
//! - `err_ctx!(Syntax, span, "Unexpected token {}", token)` when a position is known.
//! - `expansion_err!(name, span, "duplicate binding {}", var)` for expansion failures.
//!
//! The source text is attached once, at the outermost boundary, with
//! [`MacroJsError::with_source`]. Inner code only ever records spans.
//!
//! ****************************************************************************************

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

use crate::ast::Span;

pub type SourceArc = Arc<NamedSource<String>>;

/// Type-safe error classification, used by fixtures and tests instead of string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    Syntax,
    Expansion,
    Internal,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Syntax => "Syntax",
            ErrorType::Expansion => "Expansion",
            ErrorType::Internal => "Internal",
        }
    }

    /// Accepts the names used in fixture files (`Syntax`, `SyntaxError`, ...), case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        let lowered = name.trim().to_ascii_lowercase();
        match lowered.trim_end_matches("error") {
            "syntax" => Some(ErrorType::Syntax),
            "expansion" => Some(ErrorType::Expansion),
            "internal" | "internalcompiler" => Some(ErrorType::Internal),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single additional label for multi-span diagnostics.
#[derive(Debug, Clone)]
pub struct RelatedLabel {
    pub span: Span,
    pub label: String,
}

/// Minimal, composable error context for diagnostics.
#[derive(Debug, Default, Clone)]
pub struct ErrorContext {
    /// The source the span points into, attached at the outermost boundary.
    pub source: Option<SourceArc>,
    /// The primary span for this error (if any).
    pub span: Option<Span>,
    /// An optional help message.
    pub help: Option<String>,
    /// Additional labeled spans, e.g. the macro declaration behind an expansion failure.
    pub related: Vec<RelatedLabel>,
}

impl ErrorContext {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_span(span: Span) -> Self {
        Self {
            span: Some(span),
            ..Self::default()
        }
    }

    pub fn with_help(span: Span, help: impl Into<String>) -> Self {
        Self {
            span: Some(span),
            help: Some(help.into()),
            ..Self::default()
        }
    }

    /// ` (line:column)` when a span is known, empty otherwise.
    pub fn location_suffix(&self) -> String {
        match self.span {
            Some(span) => format!(" ({}:{})", span.line, span.column),
            None => String::new(),
        }
    }
}

/// Unified error type for every compiler failure mode.
#[derive(Debug, Error)]
pub enum MacroJsError {
    #[error("{message}{}", .ctx.location_suffix())]
    Syntax { message: String, ctx: ErrorContext },

    #[error("in {macro_name}: {message}{}", .ctx.location_suffix())]
    Expansion {
        macro_name: String,
        message: String,
        ctx: ErrorContext,
    },

    #[error("internal compiler error: {message}")]
    Internal { message: String, ctx: ErrorContext },
}

impl MacroJsError {
    fn get_ctx(&self) -> &ErrorContext {
        match self {
            MacroJsError::Syntax { ctx, .. } => ctx,
            MacroJsError::Expansion { ctx, .. } => ctx,
            MacroJsError::Internal { ctx, .. } => ctx,
        }
    }

    fn get_ctx_mut(&mut self) -> &mut ErrorContext {
        match self {
            MacroJsError::Syntax { ctx, .. } => ctx,
            MacroJsError::Expansion { ctx, .. } => ctx,
            MacroJsError::Internal { ctx, .. } => ctx,
        }
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            MacroJsError::Syntax { .. } => ErrorType::Syntax,
            MacroJsError::Expansion { .. } => ErrorType::Expansion,
            MacroJsError::Internal { .. } => ErrorType::Internal,
        }
    }

    /// The bare message, without macro name or position.
    pub fn message(&self) -> &str {
        match self {
            MacroJsError::Syntax { message, .. }
            | MacroJsError::Expansion { message, .. }
            | MacroJsError::Internal { message, .. } => message,
        }
    }

    pub fn span(&self) -> Option<Span> {
        self.get_ctx().span
    }

    /// Attaches the named source text, keeping any source that is already present.
    pub fn with_source(mut self, name: &str, text: &str) -> Self {
        let ctx = self.get_ctx_mut();
        if ctx.source.is_none() {
            ctx.source = Some(Arc::new(NamedSource::new(name, text.to_string())));
        }
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.get_ctx_mut().help = Some(help.into());
        self
    }

    pub fn with_related(mut self, span: Span, label: impl Into<String>) -> Self {
        self.get_ctx_mut().related.push(RelatedLabel {
            span,
            label: label.into(),
        });
        self
    }

    /// Fills in a position for errors raised without one.
    pub fn or_at(mut self, span: Span) -> Self {
        let ctx = self.get_ctx_mut();
        if ctx.span.is_none() {
            ctx.span = Some(span);
        }
        self
    }
}

fn label_len(span: Span) -> usize {
    if span.end > span.start {
        span.end - span.start
    } else {
        1
    }
}

impl Diagnostic for MacroJsError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let code = match self {
            MacroJsError::Syntax { .. } => "macrojs::syntax",
            MacroJsError::Expansion { .. } => "macrojs::expansion",
            MacroJsError::Internal { .. } => "macrojs::internal",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.get_ctx()
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.get_ctx()
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let ctx = self.get_ctx();
        // Labels without source text would point at nothing.
        ctx.source.as_ref()?;
        let mut labels = Vec::new();
        if let Some(span) = ctx.span {
            labels.push(LabeledSpan::new(
                Some(self.message().to_string()),
                span.start,
                label_len(span),
            ));
        }
        for rel in &ctx.related {
            labels.push(LabeledSpan::new(
                Some(rel.label.clone()),
                rel.span.start,
                label_len(rel.span),
            ));
        }
        if labels.is_empty() {
            None
        } else {
            Some(Box::new(labels.into_iter()))
        }
    }
}

/// Constructs a `MacroJsError` variant with a formatted message and no position.
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $($fmt:tt)+) => {
        $crate::MacroJsError::$variant {
            message: format!($($fmt)+),
            ctx: $crate::ErrorContext::none(),
        }
    };
}

/// Constructs a `MacroJsError` variant with a formatted message at a span.
#[macro_export]
macro_rules! err_ctx {
    ($variant:ident, $span:expr, $($fmt:tt)+) => {
        $crate::MacroJsError::$variant {
            message: format!($($fmt)+),
            ctx: $crate::ErrorContext::with_span($span),
        }
    };
}

/// Constructs an expansion error for the named macro at a span.
#[macro_export]
macro_rules! expansion_err {
    ($macro_name:expr, $span:expr, $($fmt:tt)+) => {
        $crate::MacroJsError::Expansion {
            macro_name: ($macro_name).to_string(),
            message: format!($($fmt)+),
            ctx: $crate::ErrorContext::with_span($span),
        }
    };
}

#[cfg(test)]
mod diagnostics_tests {
    use miette::Report;

    use super::*;

    fn span_at(start: usize, end: usize, line: u32, column: u32) -> Span {
        Span {
            start,
            end,
            line,
            column,
        }
    }

    #[test]
    fn syntax_errors_display_position() {
        let err = err_ctx!(Syntax, span_at(4, 5, 2, 7), "Unexpected token {}", ")");
        assert_eq!(err.to_string(), "Unexpected token ) (2:7)");
        assert_eq!(err.error_type(), ErrorType::Syntax);
    }

    #[test]
    fn expansion_errors_name_the_macro() {
        let err = expansion_err!("foo", span_at(0, 3, 1, 0), "no matches found for macro {}", "foo");
        assert_eq!(err.to_string(), "in foo: no matches found for macro foo (1:0)");
        assert_eq!(err.message(), "no matches found for macro foo");
    }

    #[test]
    fn internal_errors_have_no_position() {
        let err = err_msg!(Internal, "identifier {} has no source token", "x");
        assert_eq!(err.to_string(), "internal compiler error: identifier x has no source token");
        assert!(err.span().is_none());
    }

    #[test]
    fn report_renders_labels_help_and_code() {
        let source = "let x = foo(1, 2);";
        let err = expansion_err!("foo", span_at(8, 17, 1, 8), "no matches found for macro foo")
            .with_help("check the pattern alternatives declared for foo")
            .with_related(span_at(0, 3, 1, 0), "declared here")
            .with_source("input.js", source);
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("macrojs::expansion"));
        assert!(output.contains("declared here"));
        assert!(output.contains("check the pattern alternatives"));
    }

    #[test]
    fn with_source_keeps_the_first_source() {
        let err = err_ctx!(Syntax, span_at(0, 1, 1, 0), "bad")
            .with_source("a.js", "x")
            .with_source("b.js", "y");
        let ctx = err.get_ctx();
        let name = ctx.source.as_ref().map(|s| s.name().to_string());
        assert_eq!(name.as_deref(), Some("a.js"));
    }

    #[test]
    fn error_type_names_parse_loosely() {
        assert_eq!(ErrorType::parse("SyntaxError"), Some(ErrorType::Syntax));
        assert_eq!(ErrorType::parse("expansion"), Some(ErrorType::Expansion));
        assert_eq!(ErrorType::parse("InternalCompilerError"), Some(ErrorType::Internal));
        assert_eq!(ErrorType::parse("Eval"), None);
    }
}
