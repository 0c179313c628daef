//! Host language front end: lexer, token cursor and the base grammar.
//!
//! The base grammar is deliberately open. [`Grammar`] is the capability
//! interface the macro layer decorates; [`PlainParser`] is the undecorated
//! host language.

pub mod cursor;
pub mod expression;
pub mod grammar;
pub mod lexer;
pub mod statement;
pub mod token;

pub use cursor::Cursor;
pub use grammar::{parse_program, Grammar, PlainParser};
pub use lexer::tokenize;
pub use token::{render_tokens, Token, TokenKind};

use crate::ast::Program;
use crate::MacroJsError;

/// Parses plain host-language source (no macro support).
pub fn parse_source(source: &str) -> Result<Program, MacroJsError> {
    let mut parser = PlainParser::new(tokenize(source)?);
    parse_program(&mut parser)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, Expr, ForHead, Stmt};

    fn parse(source: &str) -> Vec<Stmt> {
        parse_source(source).unwrap().body
    }

    fn expression(source: &str) -> Expr {
        match parse(source).remove(0) {
            Stmt::Expression { expression, .. } => expression,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn binary_precedence_and_associativity() {
        match expression("1 + 2 * 3 - 4;") {
            Expr::Binary {
                operator, left, ..
            } => {
                assert_eq!(operator, BinaryOp::Sub);
                assert!(matches!(*left, Expr::Binary { operator: BinaryOp::Add, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
        match expression("2 ** 3 ** 2") {
            Expr::Binary { right, .. } => {
                assert!(matches!(*right, Expr::Binary { operator: BinaryOp::Exp, .. }))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn automatic_semicolon_insertion() {
        let body = parse("let a = 1\nlet b = a\nb++\n");
        assert_eq!(body.len(), 3);
    }

    #[test]
    fn missing_semicolon_on_one_line_is_an_error() {
        let err = parse_source("let a = 1 let b = 2").unwrap_err();
        assert_eq!(err.to_string(), "Unexpected token let (1:10)");
    }

    #[test]
    fn for_statements() {
        let body = parse(
            "for (let i = 0; i < n; i++) {}\nfor (const k in obj) {}\nfor (x of xs) x;\nfor (;;) break;",
        );
        assert!(matches!(body[0], Stmt::For { .. }));
        match &body[1] {
            Stmt::ForEach { left: ForHead::Variable { id, .. }, .. } => assert_eq!(id.name, "k"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(&body[2], Stmt::ForEach { left: ForHead::Target(_), .. }));
        assert!(matches!(body[3], Stmt::For { init: None, test: None, .. }));
    }

    #[test]
    fn arrows_objects_and_calls() {
        let body = parse("const f = (a, b) => ({ a, b: b + 1 });\nf(1, 2)?.a.b[0];\nnew Foo(1).bar;");
        assert_eq!(body.len(), 3);
    }

    #[test]
    fn control_flow_statements() {
        let body = parse(
            "function f(x) { if (x) return 1; else { return } }\n\
             try { f() } catch (e) { throw e } finally { done() }\n\
             switch (x) { case 1: y(); break; default: z() }\n\
             do { x-- } while (x > 0)\n\
             while (true) continue;",
        );
        assert_eq!(body.len(), 5);
    }

    #[test]
    fn regex_and_division_in_expressions() {
        assert!(matches!(expression("a / 2 / b"), Expr::Binary { .. }));
        assert!(matches!(expression("x = /ab+c/i"), Expr::Assign { .. }));
    }

    #[test]
    fn macro_keyword_is_an_ordinary_name_for_the_plain_grammar() {
        let err = parse_source("macro foo { }").unwrap_err();
        assert!(err.to_string().starts_with("Unexpected token foo"));
    }
}
