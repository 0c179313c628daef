//! # Compiler
//!
//! The compile pipeline for one unit of source:
//!
//! ```text
//! source ──tokenize──▶ tokens ──MacroParser──▶ Program (with macro nodes)
//!        ──CompilePass──▶ Program (macro free) ──codegen──▶ code + source map
//! ```
//!
//! A [`Compiler`] owns the [`Session`] all of these share: the scope arena,
//! the macro registry, the hygiene color counter and the expansion trace.
//! Any error aborts the whole unit; nothing partial is returned.

pub mod pass;
pub mod session;

pub use pass::CompilePass;
pub use session::{ExpansionStep, Session};

use crate::ast::Program;
use crate::codegen::{self, CodegenResult, PrintOptions};
use crate::macros::MacroParser;
use crate::syntax::tokenize;
use crate::MacroJsError;

/// Options for one compile unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Name the source is reported under, in diagnostics and the source map.
    pub source_name: String,
    /// Record every expansion into the session trace.
    pub record_trace: bool,
    pub emit_source_map: bool,
    /// Embed the source text in the source map's `sourcesContent`.
    pub include_sources_content: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            source_name: "input.js".to_string(),
            record_trace: false,
            emit_source_map: true,
            include_sources_content: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct Compiler {
    session: Session,
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            session: Session::new(),
            options,
        }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn trace(&self) -> &[ExpansionStep] {
        self.session.trace()
    }

    /// Parses source text into a program that may still contain macro nodes.
    pub fn parse_program(&mut self, source: &str) -> Result<Program, MacroJsError> {
        let tokens = tokenize(source)?;
        MacroParser::new(&mut self.session, tokens).parse_program()
    }

    /// Expands every macro in `program`.
    pub fn compile(&mut self, program: Program) -> Result<Program, MacroJsError> {
        CompilePass::new(&mut self.session, self.options.record_trace).run(program)
    }

    /// Parses and compiles `source`.
    pub fn expand_source(&mut self, source: &str) -> Result<Program, MacroJsError> {
        let program = self.parse_program(source)?;
        self.compile(program)
    }

    /// Prints a compiled program. `source` is embedded in the source map when
    /// `include_sources_content` is set.
    pub fn codegen(&self, program: &Program, source: Option<&str>) -> Result<CodegenResult, MacroJsError> {
        let options = PrintOptions {
            source_name: self.options.source_name.clone(),
            file: None,
            emit_source_map: self.options.emit_source_map,
            sources_content: source
                .filter(|_| self.options.include_sources_content)
                .map(str::to_string),
        };
        codegen::print(program, &options)
    }
}

/// Compiles `source` to code in one call, attaching the source text to any
/// error so it renders with a snippet.
pub fn compile_source(source: &str, options: CompileOptions) -> Result<CodegenResult, MacroJsError> {
    let source_name = options.source_name.clone();
    let mut compiler = Compiler::new(options);
    compile_with(&mut compiler, source).map_err(|error| error.with_source(&source_name, source))
}

fn compile_with(compiler: &mut Compiler, source: &str) -> Result<CodegenResult, MacroJsError> {
    let program = compiler.expand_source(source)?;
    compiler.codegen(&program, Some(source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Stmt};
    use crate::ErrorType;

    fn compile(source: &str) -> Result<String, MacroJsError> {
        compile_source(source, CompileOptions::default()).map(|result| result.code)
    }

    fn contains_macro_nodes(stmts: &[Stmt]) -> bool {
        let text = format!("{stmts:?}");
        text.contains("MacroInvocation") || text.contains("MacroDeclaration")
    }

    #[test]
    fn declarations_are_removed() {
        assert_eq!(compile("macro m { () => { 1 } }\nlet x = 2;").unwrap(), "let x = 2;\n");
    }

    #[test]
    fn statement_position_splices_every_statement() {
        let code = compile("macro two { () => { a(); b(); } }\ntwo();\nc();").unwrap();
        assert_eq!(code, "a();\nb();\nc();\n");
    }

    #[test]
    fn statement_position_may_expand_to_nothing() {
        let code = compile("macro nothing { () => { } }\nnothing();\nc();").unwrap();
        assert_eq!(code, "c();\n");
    }

    #[test]
    fn single_statement_slots_get_a_block() {
        let code = compile("macro two { () => { a(); b(); } }\nif (x) two();").unwrap();
        assert_eq!(code, "if (x) {\n    a();\n    b();\n}\n");
    }

    #[test]
    fn expression_position_rejects_other_shapes() {
        let cases = [
            ("macro m { () => { } }\nlet x = m();", "macro expansion yielded no expressions or statements"),
            (
                "macro m { () => { a(); b(); } }\nlet x = m();",
                "macro attempted to expand multiple statements into expression position",
            ),
            (
                "macro m { () => { let a = 1; } }\nlet x = m();",
                "macro attempted to expand statement into expression position",
            ),
        ];
        for (source, message) in cases {
            let err = compile(source).unwrap_err();
            assert_eq!(err.error_type(), ErrorType::Expansion, "{source}");
            assert_eq!(err.message(), message);
        }
    }

    #[test]
    fn nested_invocations_are_fully_expanded() {
        let mut compiler = Compiler::default();
        let program = compiler
            .expand_source(
                "macro inc { ($e:expr) => { $e + 1 } }\nmacro twice { ($e:expr) => { inc(inc($e)) } }\nlet x = [twice(inc(0))];",
            )
            .unwrap();
        assert!(!contains_macro_nodes(&program.body));
        match &program.body[0] {
            Stmt::Variable(decl) => assert!(matches!(decl.declarations[0].init, Some(Expr::Array { .. }))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn compiling_twice_is_deterministic() {
        let source = "macro foo { ($n:ident) => { let $n = 1; let two = 2; } }\nfoo(a);\nfoo(b);";
        assert_eq!(compile(source).unwrap(), compile(source).unwrap());
    }

    #[test]
    fn trace_records_each_expansion_in_order() {
        let mut compiler = Compiler::new(CompileOptions {
            record_trace: true,
            ..CompileOptions::default()
        });
        compiler
            .expand_source("macro id { ($e:expr) => { $e } }\nlet x = id(id(1));")
            .unwrap();
        let trace = compiler.trace();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].input, "id ( 1 )");
        assert_eq!(trace[1].input, "1");
        assert!(trace.iter().all(|step| step.expansion.is_some()));
    }

    #[test]
    fn errors_carry_the_source() {
        let err = compile("let x = ;").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Syntax);
        assert!(miette::Diagnostic::source_code(&err).is_some());
    }
}
