//! The macrojs Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions. Handlers return `miette::Result`; a failing
//! handler is rendered as a miette report on stderr and exits with status 1.

use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::Parser;
use miette::{IntoDiagnostic, Report, WrapErr};
use tracing_subscriber::EnvFilter;

use crate::cli::args::{Command, MacroJsArgs};
use crate::compiler::{CompileOptions, Compiler};
use crate::syntax::tokenize;
use crate::test_harness::{self, TestConfig};
use crate::MacroJsError;

pub mod args;
pub mod output;

/// Environment variable holding the `tracing` filter directives.
pub const LOG_ENV: &str = "MACROJS_LOG";

/// The main entry point for the CLI.
pub fn run() {
    init_tracing();
    let args = MacroJsArgs::parse();

    let result = match args.command {
        Command::Expand {
            file,
            output,
            source_map,
            sources_content,
        } => handle_expand(&file, output.as_deref(), source_map.as_deref(), sources_content),
        Command::Trace { file } => handle_trace(&file),
        Command::Tokens { file } => handle_tokens(&file),
        Command::Ast { file, expanded } => handle_ast(&file, expanded),
        Command::Macros { file } => handle_macros(&file),
        Command::Test { path, filter } => handle_test(path, filter),
    };

    if let Err(report) = result {
        eprintln!("{report:?}");
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

fn handle_expand(
    file: &Path,
    output: Option<&Path>,
    source_map: Option<&Path>,
    sources_content: bool,
) -> miette::Result<()> {
    let source = read_source(file)?;
    let options = CompileOptions {
        source_name: display_name(file),
        emit_source_map: source_map.is_some(),
        include_sources_content: sources_content,
        ..CompileOptions::default()
    };
    let mut compiler = Compiler::new(options);
    let mut result = with_source(&mut compiler, &source, |compiler| {
        let program = compiler.expand_source(&source)?;
        compiler.codegen(&program, Some(&source))
    })?;

    match output {
        Some(path) => write_file(path, &result.code)?,
        None => print!("{}", result.code),
    }
    if let (Some(path), Some(map)) = (source_map, result.map.as_mut()) {
        map.file = output.and_then(|out| out.file_name()).map(|name| name.to_string_lossy().into_owned());
        write_file(path, &map.to_json()?)?;
    }
    Ok(())
}

fn handle_trace(file: &Path) -> miette::Result<()> {
    let source = read_source(file)?;
    let mut compiler = Compiler::new(CompileOptions {
        source_name: display_name(file),
        record_trace: true,
        emit_source_map: false,
        ..CompileOptions::default()
    });
    with_source(&mut compiler, &source, |compiler| compiler.expand_source(&source).map(|_| ()))?;
    if compiler.trace().is_empty() {
        println!("No macro expansions.");
        return Ok(());
    }
    output::print_trace(compiler.trace())?;
    Ok(())
}

fn handle_tokens(file: &Path) -> miette::Result<()> {
    let source = read_source(file)?;
    let tokens = tokenize(&source).map_err(|e| e.with_source(&display_name(file), &source))?;
    output::print_tokens(&tokens);
    Ok(())
}

fn handle_ast(file: &Path, expanded: bool) -> miette::Result<()> {
    let source = read_source(file)?;
    let mut compiler = Compiler::new(CompileOptions {
        source_name: display_name(file),
        ..CompileOptions::default()
    });
    let program = with_source(&mut compiler, &source, |compiler| {
        if expanded {
            compiler.expand_source(&source)
        } else {
            compiler.parse_program(&source)
        }
    })?;
    let json = serde_json::to_string_pretty(&program).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

fn handle_macros(file: &Path) -> miette::Result<()> {
    let source = read_source(file)?;
    let mut compiler = Compiler::new(CompileOptions {
        source_name: display_name(file),
        ..CompileOptions::default()
    });
    with_source(&mut compiler, &source, |compiler| compiler.parse_program(&source).map(|_| ()))?;
    let macros = compiler.session().macros.iter().map(|(_, declaration)| declaration);
    output::print_macros(macros);
    Ok(())
}

fn handle_test(path: PathBuf, filter: Option<String>) -> miette::Result<()> {
    let config = TestConfig {
        test_root: path,
        filter,
        ..TestConfig::default()
    };
    let summary = test_harness::run_all_tests(&config);
    if summary.failed > 0 {
        return Err(miette::miette!("{} of {} tests failed", summary.failed, summary.total()));
    }
    Ok(())
}

// ============================================================================
// HELPERS
// ============================================================================

fn read_source(path: &Path) -> miette::Result<String> {
    fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", path.display()))
}

fn write_file(path: &Path, contents: &str) -> miette::Result<()> {
    fs::write(path, contents)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to write {}", path.display()))
}

fn display_name(path: &Path) -> String {
    path.display().to_string()
}

/// Runs `f` on the compiler and attaches the source text to its error.
fn with_source<T>(
    compiler: &mut Compiler,
    source: &str,
    f: impl FnOnce(&mut Compiler) -> Result<T, MacroJsError>,
) -> miette::Result<T> {
    let name = compiler.options().source_name.clone();
    f(compiler).map_err(|error| Report::new(error.with_source(&name, source)))
}
