//! AST module for macrojs
//!
//! The program tree produced by the host grammar and consumed by the compile
//! pass and the printer. Two node kinds exist only before compilation:
//! [`Stmt::MacroDeclaration`] and [`Expr::MacroInvocation`]. A compiled
//! program never contains either.

// ============================================================================
// IMPORTS
// ============================================================================

use serde::Serialize;

use crate::macros::{Color, MacroId, ScopeStack};
use crate::syntax::Token;

pub mod ops;

pub use ops::{AssignOp, BinaryOp, UnaryOp, UpdateOp};

// ============================================================================
// SOURCE LOCATIONS
// ============================================================================

/// A region of the source text.
///
/// `start`/`end` are byte offsets; `line` (1-based) and `column` (0-based,
/// in characters) locate `start` for diagnostics and source maps.
///
/// # Examples
///
/// ```rust
/// use macrojs::ast::Span;
/// let a = Span::new(0, 3, 1, 0);
/// let b = Span::new(6, 9, 2, 2);
/// let merged = a.merge(b);
/// assert_eq!((merged.start, merged.end, merged.line), (0, 9, 1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// The smallest span covering both; the position comes from the earlier one.
    pub fn merge(self, other: Span) -> Span {
        let (first, _) = if other.start < self.start {
            (other, self)
        } else {
            (self, other)
        };
        Span {
            start: first.start,
            end: self.end.max(other.end),
            line: first.line,
            column: first.column,
        }
    }

    /// Span from the start of `self` to the end of `last`.
    pub fn to(self, last: Span) -> Span {
        Span {
            end: last.end.max(self.start),
            ..self
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// ============================================================================
// PROGRAM AND STATEMENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Stmt {
    Expression {
        expression: Expr,
        span: Span,
    },
    Variable(VariableDeclaration),
    Function(Function),
    Return {
        argument: Option<Expr>,
        span: Span,
    },
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
        span: Span,
    },
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
        span: Span,
    },
    ForEach {
        kind: ForEachKind,
        left: ForHead,
        right: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
        span: Span,
    },
    Break {
        span: Span,
    },
    Continue {
        span: Span,
    },
    Throw {
        argument: Expr,
        span: Span,
    },
    Try {
        block: Block,
        handler: Option<CatchClause>,
        finalizer: Option<Block>,
        span: Span,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
        span: Span,
    },
    Block(Block),
    Empty {
        span: Span,
    },
    MacroDeclaration(MacroDeclarationStmt),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Expression { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::If { span, .. }
            | Stmt::For { span, .. }
            | Stmt::ForEach { span, .. }
            | Stmt::While { span, .. }
            | Stmt::DoWhile { span, .. }
            | Stmt::Break { span }
            | Stmt::Continue { span }
            | Stmt::Throw { span, .. }
            | Stmt::Try { span, .. }
            | Stmt::Switch { span, .. }
            | Stmt::Empty { span } => *span,
            Stmt::Variable(decl) => decl.span,
            Stmt::Function(function) => function.span,
            Stmt::Block(block) => block.span,
            Stmt::MacroDeclaration(decl) => decl.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

impl VarKind {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "var" => Some(VarKind::Var),
            "let" => Some(VarKind::Let),
            "const" => Some(VarKind::Const),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VarKind::Var => "var",
            VarKind::Let => "let",
            VarKind::Const => "const",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDeclaration {
    pub kind: VarKind,
    pub declarations: Vec<VariableDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDeclarator {
    pub id: Identifier,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ForInit {
    Variable(VariableDeclaration),
    Expression(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ForEachKind {
    In,
    Of,
}

impl ForEachKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForEachKind::In => "in",
            ForEachKind::Of => "of",
        }
    }
}

/// Left side of a `for…in` / `for…of` head.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ForHead {
    Variable { kind: VarKind, id: Identifier },
    Target(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatchClause {
    pub param: Option<Identifier>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwitchCase {
    /// `None` for `default:`.
    pub test: Option<Expr>,
    pub consequent: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Function {
    pub id: Option<Identifier>,
    pub params: Vec<Identifier>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrowFunction {
    pub params: Vec<Identifier>,
    pub body: ArrowBody,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ArrowBody {
    Expression(Expr),
    Block(Block),
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

/// An identifier as it appears in the program tree.
///
/// Hygiene renames it in place: `name` becomes `two_1` while `source_name`
/// keeps `two`, so the source map can point back at the original spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

impl Identifier {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
            source_name: None,
        }
    }

    pub fn is_colored(&self) -> bool {
        self.source_name.is_some()
    }

    /// Renames the identifier to `<name>_<color>`. Applies at most once.
    pub fn apply_color(&mut self, color: Color) {
        if self.is_colored() {
            return;
        }
        let original = std::mem::take(&mut self.name);
        self.name = format!("{original}_{color}");
        self.source_name = Some(original);
    }

    /// The spelling written in the source, before any renaming.
    pub fn original_name(&self) -> &str {
        self.source_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LiteralKind {
    Number,
    BigInt,
    String,
    Boolean,
    Null,
    Regex,
}

/// A literal, kept as its raw source text so numeric, string and regex
/// spellings survive capture, substitution and printing unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Literal {
    pub kind: LiteralKind,
    pub raw: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub key: PropertyKey,
    pub value: Expr,
    pub shorthand: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PropertyKey {
    Identifier(String),
    /// Raw string literal, quotes included.
    String(String),
    /// Raw numeric literal.
    Number(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MemberProperty {
    Named(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Expr {
    Identifier(Identifier),
    Literal(Literal),
    This {
        span: Span,
    },
    Array {
        elements: Vec<Expr>,
        span: Span,
    },
    Object {
        properties: Vec<Property>,
        span: Span,
    },
    Function(Box<Function>),
    Arrow(Box<ArrowFunction>),
    Unary {
        operator: UnaryOp,
        argument: Box<Expr>,
        span: Span,
    },
    Update {
        operator: UpdateOp,
        prefix: bool,
        argument: Box<Expr>,
        span: Span,
    },
    Binary {
        operator: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Assign {
        operator: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
        span: Span,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
        optional: bool,
        span: Span,
    },
    New {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
        span: Span,
    },
    Member {
        object: Box<Expr>,
        property: MemberProperty,
        optional: bool,
        span: Span,
    },
    Sequence {
        expressions: Vec<Expr>,
        span: Span,
    },
    MacroInvocation(MacroInvocation),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Identifier(id) => id.span,
            Expr::Literal(lit) => lit.span,
            Expr::Function(function) => function.span,
            Expr::Arrow(arrow) => arrow.span,
            Expr::MacroInvocation(invocation) => invocation.span,
            Expr::This { span }
            | Expr::Array { span, .. }
            | Expr::Object { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Update { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Conditional { span, .. }
            | Expr::Call { span, .. }
            | Expr::New { span, .. }
            | Expr::Member { span, .. }
            | Expr::Sequence { span, .. } => *span,
        }
    }

    /// Valid left-hand side of an assignment or update.
    pub fn is_assignment_target(&self) -> bool {
        matches!(
            self,
            Expr::Identifier(_) | Expr::Member { .. } | Expr::MacroInvocation(_)
        )
    }
}

// ============================================================================
// MACRO NODES
// ============================================================================

/// A `macro name { ... }` declaration left in place by the parser.
/// The declaration itself lives in the session's macro registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroDeclarationStmt {
    pub name: Identifier,
    pub macro_id: MacroId,
    pub span: Span,
}

/// An unexpanded `name(...)` call to a visible macro.
///
/// `tokens` are the raw argument tokens between the parentheses;
/// `scope_stack` is the parser's scope stack where the call was written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroInvocation {
    pub name: Identifier,
    pub macro_id: MacroId,
    pub tokens: Vec<Token>,
    pub scope_stack: ScopeStack,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_takes_position_of_earlier_span() {
        let a = Span::new(10, 12, 3, 4);
        let b = Span::new(2, 5, 1, 2);
        assert_eq!(a.merge(b), Span::new(2, 12, 1, 2));
    }

    #[test]
    fn coloring_renames_once_and_keeps_source_spelling() {
        let mut id = Identifier::new("two", Span::default());
        id.apply_color(Color::new(1));
        id.apply_color(Color::new(2));
        assert_eq!(id.name, "two_1");
        assert_eq!(id.original_name(), "two");
        assert!(id.is_colored());
    }

    #[test]
    fn statements_serialize_with_type_tag() {
        let stmt = Stmt::Empty {
            span: Span::new(0, 1, 1, 0),
        };
        let json = serde_json::to_value(&stmt).unwrap_or_default();
        assert_eq!(json["type"], "Empty");
    }
}
