//! Macro declarations, patterns and the registry that owns them.

use serde::Serialize;

use crate::ast::Span;
use crate::syntax::Token;

use super::scope::ScopeStack;

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Index of a declaration in the session's [`MacroRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MacroId(u32);

// ============================================================================
// PATTERNS
// ============================================================================

/// How a pattern variable consumes invocation tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CaptureKind {
    /// One literal token: number, big integer, string, regex, `true`, `false`, `null`, `undefined`.
    Literal,
    /// One plain identifier.
    Ident,
    /// The longest assignment expression that parses from here.
    Expr,
    /// One complete statement.
    Stmt,
}

impl CaptureKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "literal" => Some(CaptureKind::Literal),
            "ident" => Some(CaptureKind::Ident),
            "expr" => Some(CaptureKind::Expr),
            "stmt" => Some(CaptureKind::Stmt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureKind::Literal => "literal",
            CaptureKind::Ident => "ident",
            CaptureKind::Expr => "expr",
            CaptureKind::Stmt => "stmt",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MacroPatternArgument {
    /// Matches one token of the same kind and text.
    Literal(Token),
    /// `$name:kind`; `name` is stored without the `$`.
    Variable {
        name: String,
        kind: CaptureKind,
        span: Span,
    },
    /// `$( ... )sep`: zero or more occurrences joined by `separator`.
    Repetition {
        content: Vec<MacroPatternArgument>,
        separator: Token,
        span: Span,
    },
}

impl MacroPatternArgument {
    /// Every variable bound by this argument, with the repetition depth it is
    /// bound at when the argument itself sits at `depth`.
    pub fn collect_variables(&self, depth: usize, out: &mut Vec<(String, usize)>) {
        match self {
            MacroPatternArgument::Literal(_) => {}
            MacroPatternArgument::Variable { name, .. } => out.push((name.clone(), depth)),
            MacroPatternArgument::Repetition { content, .. } => {
                for argument in content {
                    argument.collect_variables(depth + 1, out);
                }
            }
        }
    }
}

/// One `( arguments ) => { body }` alternative.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroPattern {
    pub arguments: Vec<MacroPatternArgument>,
    /// Raw body tokens, without the enclosing braces.
    pub body: Vec<Token>,
    pub span: Span,
}

/// A declared macro. `scope_stack` is the declaring parser's scope stack,
/// taken when the declaration was read; later bindings in those scopes stay
/// visible through it.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroDeclaration {
    pub name: String,
    pub patterns: Vec<MacroPattern>,
    pub scope_stack: ScopeStack,
    pub span: Span,
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Every macro declared during a compile session, in declaration order.
/// Visibility is decided by scopes, not by the registry.
#[derive(Debug, Clone, Default)]
pub struct MacroRegistry {
    declarations: Vec<MacroDeclaration>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, declaration: MacroDeclaration) -> MacroId {
        let id = MacroId(self.declarations.len() as u32);
        self.declarations.push(declaration);
        id
    }

    pub fn get(&self, id: MacroId) -> Option<&MacroDeclaration> {
        self.declarations.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MacroId, &MacroDeclaration)> {
        self.declarations
            .iter()
            .enumerate()
            .map(|(i, decl)| (MacroId(i as u32), decl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::TokenKind;

    fn variable(name: &str) -> MacroPatternArgument {
        MacroPatternArgument::Variable {
            name: name.to_string(),
            kind: CaptureKind::Literal,
            span: Span::default(),
        }
    }

    #[test]
    fn variables_report_their_repetition_depth() {
        let comma = Token::new(TokenKind::Punct, ",", Span::default());
        let pattern = MacroPatternArgument::Repetition {
            content: vec![
                variable("a"),
                MacroPatternArgument::Repetition {
                    content: vec![variable("b")],
                    separator: comma.clone(),
                    span: Span::default(),
                },
            ],
            separator: comma,
            span: Span::default(),
        };
        let mut out = Vec::new();
        pattern.collect_variables(0, &mut out);
        assert_eq!(out, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
    }

    #[test]
    fn registry_hands_out_sequential_ids() {
        let mut registry = MacroRegistry::new();
        let decl = MacroDeclaration {
            name: "foo".to_string(),
            patterns: Vec::new(),
            scope_stack: ScopeStack::new(),
            span: Span::default(),
        };
        let first = registry.register(decl.clone());
        let second = registry.register(decl);
        assert_ne!(first, second);
        assert_eq!(registry.get(second).map(|d| d.name.as_str()), Some("foo"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn capture_kinds_round_trip_names() {
        for name in ["literal", "ident", "expr", "stmt"] {
            assert_eq!(CaptureKind::parse(name).map(|k| k.as_str()), Some(name));
        }
        assert_eq!(CaptureKind::parse("tt"), None);
    }
}
