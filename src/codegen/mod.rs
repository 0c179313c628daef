//! # Code Generation
//!
//! Prints a compiled, macro-free [`Program`] back to source text with a fixed
//! layout, and optionally a version 3 source map from generated positions to
//! the spans the tree was parsed from.

mod printer;
pub mod sourcemap;

pub use sourcemap::SourceMap;

use tracing::debug;

use crate::ast::Program;
use crate::MacroJsError;

use printer::Printer;
use sourcemap::SourceMapBuilder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintOptions {
    /// Recorded as the map's only entry in `sources`.
    pub source_name: String,
    /// Recorded as the map's `file`.
    pub file: Option<String>,
    pub emit_source_map: bool,
    pub sources_content: Option<String>,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            source_name: "input.js".to_string(),
            file: None,
            emit_source_map: false,
            sources_content: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenResult {
    pub code: String,
    pub map: Option<SourceMap>,
}

/// Prints `program`. Fails if a macro declaration or invocation is still in the tree.
pub fn print(program: &Program, options: &PrintOptions) -> Result<CodegenResult, MacroJsError> {
    let builder = options.emit_source_map.then(SourceMapBuilder::new);
    let mut printer = Printer::new(builder);
    printer.print_program(program)?;
    let (code, builder) = printer.finish();
    let map = builder.map(|builder| {
        builder.build(
            options.file.clone(),
            &options.source_name,
            options.sources_content.clone(),
        )
    });
    debug!(bytes = code.len(), source_map = map.is_some(), "generated code");
    Ok(CodegenResult { code, map })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_source;
    use crate::ErrorType;

    fn reprint(source: &str) -> String {
        print(&parse_source(source).unwrap(), &PrintOptions::default()).unwrap().code
    }

    #[test]
    fn statement_layout() {
        assert_eq!(
            reprint("if (a) { b() } else if (c) d(); else { e = 1 }"),
            "if (a) {\n    b();\n} else if (c) d(); else {\n    e = 1;\n}\n"
        );
        assert_eq!(
            reprint("for (let i = 0; i < n; i++) { for (const k of xs) log(k) }"),
            "for (let i = 0; i < n; i++) {\n    for (const k of xs) log(k);\n}\n"
        );
        assert_eq!(reprint("while (x) ;"), "while (x);\n");
        assert_eq!(
            reprint("switch (x) { case 1: a(); break; default: b() }"),
            "switch (x) {\n    case 1:\n        a();\n        break;\n    default:\n        b();\n}\n"
        );
        assert_eq!(
            reprint("try { a() } catch (e) { b(e) } finally { c() }"),
            "try {\n    a();\n} catch (e) {\n    b(e);\n} finally {\n    c();\n}\n"
        );
        assert_eq!(reprint("function f(a, b) { return a }"), "function f(a, b) {\n    return a;\n}\n");
    }

    #[test]
    fn parentheses_follow_precedence() {
        assert_eq!(reprint("(1 + 2) * 3;"), "(1 + 2) * 3;\n");
        assert_eq!(reprint("1 + (2 + 3);"), "1 + (2 + 3);\n");
        assert_eq!(reprint("1 + 2 + 3;"), "1 + 2 + 3;\n");
        assert_eq!(reprint("(2 ** 3) ** 2;"), "(2 ** 3) ** 2;\n");
        assert_eq!(reprint("(-2) ** 2;"), "(-2) ** 2;\n");
        assert_eq!(reprint("a ?? (b || c);"), "a ?? (b || c);\n");
        assert_eq!(reprint("(a, b);"), "a, b;\n");
        assert_eq!(reprint("f((a, b));"), "f((a, b));\n");
        assert_eq!(reprint("x = a ? b : c;"), "x = a ? b : c;\n");
        assert_eq!(reprint("(a = 1) + 2;"), "(a = 1) + 2;\n");
        assert_eq!(reprint("- -x;"), "- -x;\n");
        assert_eq!(reprint("typeof x;"), "typeof x;\n");
    }

    #[test]
    fn ambiguous_statement_starts_are_wrapped() {
        assert_eq!(reprint("({ a: 1 }).a;"), "({ a: 1 }.a);\n");
        assert_eq!(reprint("(function () {})();"), "(function() {}());\n");
        assert_eq!(reprint("f = () => ({ a });"), "f = () => ({ a });\n");
    }

    #[test]
    fn literals_keep_their_spelling() {
        assert_eq!(
            reprint("[0x1F, 1_000, 10n, 'single', \"double\", /re[/]x/gi, null, true, undefined];"),
            "[0x1F, 1_000, 10n, 'single', \"double\", /re[/]x/gi, null, true, undefined];\n"
        );
        assert_eq!(reprint("(1).toString();"), "(1).toString();\n");
    }

    #[test]
    fn source_map_names_original_spellings() {
        let mut program = parse_source("let two = 2;\ntwo;").unwrap();
        if let crate::ast::Stmt::Variable(decl) = &mut program.body[0] {
            decl.declarations[0].id.apply_color(crate::macros::Color::new(1));
        }
        let options = PrintOptions {
            emit_source_map: true,
            ..PrintOptions::default()
        };
        let result = print(&program, &options).unwrap();
        assert_eq!(result.code, "let two_1 = 2;\ntwo;\n");
        let map = result.map.unwrap();
        assert_eq!(map.sources, ["input.js"]);
        assert_eq!(map.names, ["two"]);
        assert!(map.mappings.contains(';'));
    }

    #[test]
    fn macro_nodes_are_rejected() {
        let mut session = crate::compiler::Session::new();
        let tokens = crate::syntax::tokenize("macro m { () => { 1 } }").unwrap();
        let program = crate::macros::MacroParser::new(&mut session, tokens).parse_program().unwrap();
        let err = print(&program, &PrintOptions::default()).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Internal);
    }
}
