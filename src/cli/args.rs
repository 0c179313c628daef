//! Defines the command-line arguments and subcommands for the macrojs CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "macrojs",
    version,
    about = "Hygienic, pattern-matched syntactic macros, expanded at compile time."
)]
pub struct MacroJsArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Expand every macro and print the resulting code.
    Expand {
        /// The source file to compile.
        #[arg(required = true)]
        file: PathBuf,
        /// Write the code here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write a version 3 source map to this path.
        #[arg(long = "source-map")]
        source_map: Option<PathBuf>,
        /// Embed the source text in the source map.
        #[arg(long = "sources-content")]
        sources_content: bool,
    },
    /// Show each macro expansion step with diffs.
    Trace {
        /// The source file to trace.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Print the token stream of a file.
    Tokens {
        /// The source file to tokenize.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Print the program tree as JSON.
    Ast {
        /// The source file to parse.
        #[arg(required = true)]
        file: PathBuf,
        /// Print the tree after macro expansion.
        #[arg(long)]
        expanded: bool,
    },
    /// List the macros a file declares.
    Macros {
        /// The source file to scan.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Discover and run the YAML fixture suites in a directory.
    Test {
        /// The directory containing `*.yaml` suites.
        #[arg(default_value = "tests/suites")]
        path: PathBuf,
        /// Only run tests whose name contains this text.
        #[arg(long)]
        filter: Option<String>,
    },
}
