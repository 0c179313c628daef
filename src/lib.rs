//! Hygienic, pattern-matched syntactic macros for a JavaScript-like language.
//!
//! Source text is tokenized, parsed by a grammar extended with `macro`
//! declarations and invocations, expanded at compile time and printed back
//! as plain code with an optional source map.

pub use crate::compiler::{compile_source, CompileOptions, Compiler};
pub use crate::diagnostics::{ErrorContext, ErrorType, MacroJsError};

pub mod ast;
pub mod cli;
pub mod codegen;
pub mod compiler;
pub mod diagnostics;
pub mod macros;
pub mod syntax;
pub mod test_harness;
