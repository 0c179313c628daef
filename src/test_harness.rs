//! macrojs Fixture Harness
//!
//! Discovers YAML fixture suites, runs every case through the full
//! parse → expand → print pipeline and reports the results.
//!
//! # Test Format
//!
//! ```yaml
//! - name: "test name"
//!   input: "macro id { ($x:expr) => { $x } } id(1);"
//!   expected: "1;"                 # for success tests
//!   expect_error: "no matches"     # message substring, for error tests
//!   expect_error_type: "Expansion" # optional error classification
//!   skip: false                    # optional, defaults to false
//!   only: false                    # optional, defaults to false
//! ```
//!
//! `expected` is itself parsed and printed before comparison, so fixtures may
//! be written in any layout.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use macrojs::test_harness::{run_all_tests, TestConfig};
//!
//! let summary = run_all_tests(&TestConfig::default());
//! if summary.failed > 0 {
//!     std::process::exit(1);
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::codegen::{self, PrintOptions};
use crate::compiler::{compile_source, CompileOptions};
use crate::syntax::parse_source;
use crate::{ErrorType, MacroJsError};

// =============================================================================
// CORE TYPES
// =============================================================================

/// A single fixture case.
#[derive(Debug, Deserialize, Clone)]
pub struct TestCase {
    pub name: String,
    pub input: String,
    pub expected: Option<String>,
    pub expect_error: Option<String>,
    pub expect_error_type: Option<String>,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub only: bool,
}

impl TestCase {
    fn expects_error(&self) -> bool {
        self.expect_error.is_some() || self.expect_error_type.is_some()
    }
}

/// The outcome of one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestResult {
    Pass {
        file: String,
        name: String,
    },
    Fail {
        file: String,
        name: String,
        error: String,
        actual: Option<String>,
    },
    Skipped {
        file: String,
        name: String,
        reason: String,
    },
}

/// Configuration for discovery and reporting.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub test_root: PathBuf,
    pub use_colors: bool,
    /// Case-insensitive substring a case name must contain.
    pub filter: Option<String>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            test_root: PathBuf::from("tests/suites"),
            use_colors: atty::is(atty::Stream::Stderr),
            filter: None,
        }
    }
}

const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

impl TestConfig {
    pub fn colorize(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl TestSummary {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    fn from_results(results: &[TestResult]) -> Self {
        let mut summary = TestSummary::default();
        for result in results {
            match result {
                TestResult::Pass { .. } => summary.passed += 1,
                TestResult::Fail { .. } => summary.failed += 1,
                TestResult::Skipped { .. } => summary.skipped += 1,
            }
        }
        summary
    }
}

// =============================================================================
// DISCOVERY AND LOADING
// =============================================================================

/// Finds every `.yaml`/`.yml` file under `root`, in path order.
pub fn discover_yaml_files<P: AsRef<Path>>(root: P) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file()
                && e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

pub fn load_test_cases(path: &Path) -> Result<Vec<TestCase>, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    serde_yaml::from_str::<Vec<TestCase>>(&content)
        .map_err(|e| format!("failed to parse YAML in {}: {}", path.display(), e))
}

pub fn skip_reason(case: &TestCase, has_only: bool, filter: Option<&str>) -> Option<String> {
    if has_only && !case.only {
        return Some("not marked 'only' in 'only' mode".to_string());
    }
    if case.skip {
        return Some("marked 'skip'".to_string());
    }
    if let Some(f) = filter {
        if !case.name.to_lowercase().contains(&f.to_lowercase()) {
            return Some(format!("filtered out by substring: {f}"));
        }
    }
    None
}

// =============================================================================
// EXECUTION
// =============================================================================

fn compile(input: &str) -> Result<String, MacroJsError> {
    let options = CompileOptions {
        emit_source_map: false,
        ..CompileOptions::default()
    };
    compile_source(input, options).map(|result| result.code)
}

/// Parses and reprints an expected output so layout differences don't count.
fn normalize(expected: &str) -> Result<String, MacroJsError> {
    let program = parse_source(expected)?;
    Ok(codegen::print(&program, &PrintOptions::default())?.code)
}

fn error_matches(case: &TestCase, error: &MacroJsError) -> Result<(), String> {
    if let Some(expected) = case.expect_error_type.as_deref() {
        let wanted = ErrorType::parse(expected)
            .ok_or_else(|| format!("unknown error type in fixture: {expected}"))?;
        if error.error_type() != wanted {
            return Err(format!(
                "expected {} error but got {}: {}",
                wanted,
                error.error_type(),
                error
            ));
        }
    }
    if let Some(expected) = case.expect_error.as_deref() {
        if !error.to_string().contains(expected) {
            return Err(format!("expected error containing '{expected}' but got: {error}"));
        }
    }
    Ok(())
}

/// Runs one case through the compiler and compares the outcome.
pub fn run_test_case(file: &str, case: &TestCase) -> TestResult {
    debug!(file, name = %case.name, "running fixture");
    let fail = |error: String, actual: Option<String>| TestResult::Fail {
        file: file.to_string(),
        name: case.name.clone(),
        error,
        actual,
    };
    let pass = || TestResult::Pass {
        file: file.to_string(),
        name: case.name.clone(),
    };

    match (compile(&case.input), case.expects_error()) {
        (Ok(code), true) => fail("expected an error but compilation succeeded".to_string(), Some(code)),
        (Err(error), true) => match error_matches(case, &error) {
            Ok(()) => pass(),
            Err(message) => fail(message, None),
        },
        (Err(error), false) => fail(error.to_string(), None),
        (Ok(code), false) => {
            let Some(expected) = case.expected.as_deref() else {
                return pass();
            };
            match normalize(expected) {
                Ok(expected) if expected == code => pass(),
                Ok(expected) => fail(format!("output did not match expected\n{expected}"), Some(code)),
                Err(error) => fail(format!("fixture's expected output does not parse: {error}"), Some(code)),
            }
        }
    }
}

// =============================================================================
// REPORTING
// =============================================================================

pub fn report_results(results: &[TestResult], config: &TestConfig) {
    for result in results {
        match result {
            TestResult::Pass { file, name } => {
                println!("{}: {} [{}]", config.colorize("PASS", GREEN), name, file)
            }
            TestResult::Fail { .. } => print_failure(result, config),
            TestResult::Skipped { file, name, reason } => println!(
                "{}: {} [{}] ({})",
                config.colorize("SKIP", YELLOW),
                name,
                file,
                reason
            ),
        }
    }

    let summary = TestSummary::from_results(results);
    println!(
        "\nTest summary: total {}, {} {}, {} {}, {} {}",
        summary.total(),
        config.colorize("passed", GREEN),
        summary.passed,
        config.colorize("failed", RED),
        summary.failed,
        config.colorize("skipped", YELLOW),
        summary.skipped,
    );

    if summary.failed > 0 {
        eprintln!("\nFailed tests:");
        for result in results {
            if let TestResult::Fail { name, .. } = result {
                eprintln!("  - {name}");
            }
        }
    }
}

fn print_failure(result: &TestResult, config: &TestConfig) {
    let TestResult::Fail {
        file,
        name,
        error,
        actual,
    } = result
    else {
        return;
    };
    eprintln!("{}: {} [{}]", config.colorize("FAIL", RED), name, file);
    match (error.strip_prefix("output did not match expected\n"), actual) {
        (Some(expected), Some(actual)) => {
            eprintln!("  Error: output did not match expected");
            print_diff(expected, actual, config);
        }
        _ => {
            eprintln!("  Error: {error}");
            if let Some(actual) = actual {
                eprintln!("  Actual: {}", actual.trim_end());
            }
        }
    }
}

fn print_diff(expected: &str, actual: &str, config: &TestConfig) {
    let expected_lines: Vec<_> = expected.lines().collect();
    let actual_lines: Vec<_> = actual.lines().collect();
    for i in 0..expected_lines.len().max(actual_lines.len()) {
        let exp = expected_lines.get(i).copied().unwrap_or("");
        let act = actual_lines.get(i).copied().unwrap_or("");
        if exp != act {
            eprintln!("  - expected: {}", config.colorize(exp, GREEN));
            eprintln!("  + actual:   {}", config.colorize(act, RED));
        } else {
            eprintln!("    {exp}");
        }
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Collects every case under the configured root without running it.
///
/// A file that fails to load becomes a single failing result.
pub fn collect_results(config: &TestConfig) -> Vec<TestResult> {
    let mut cases = Vec::new();
    let mut results = Vec::new();

    for path in discover_yaml_files(&config.test_root) {
        let file = path.display().to_string();
        match load_test_cases(&path) {
            Ok(loaded) => cases.extend(loaded.into_iter().map(|case| (file.clone(), case))),
            Err(error) => results.push(TestResult::Fail {
                name: "<load>".to_string(),
                file,
                error,
                actual: None,
            }),
        }
    }

    let has_only = cases.iter().any(|(_, case)| case.only);
    for (file, case) in cases {
        let result = match skip_reason(&case, has_only, config.filter.as_deref()) {
            Some(reason) => TestResult::Skipped {
                file,
                name: case.name,
                reason,
            },
            None => run_test_case(&file, &case),
        };
        results.push(result);
    }
    results
}

/// Runs every suite under the configured root, prints a report and returns the counts.
pub fn run_all_tests(config: &TestConfig) -> TestSummary {
    let results = collect_results(config);
    report_results(&results, config);
    TestSummary::from_results(&results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(input: &str) -> TestCase {
        TestCase {
            name: "case".to_string(),
            input: input.to_string(),
            expected: None,
            expect_error: None,
            expect_error_type: None,
            skip: false,
            only: false,
        }
    }

    #[test]
    fn expected_output_is_layout_insensitive() {
        let mut c = case("macro id { ($x:expr) => { $x } } if (a) { id(1) }");
        c.expected = Some("if (a)\n{ 1; }".to_string());
        assert!(matches!(run_test_case("f.yaml", &c), TestResult::Pass { .. }));
    }

    #[test]
    fn error_cases_check_message_and_type() {
        let mut c = case("macro m { (1) => { 1 } } m(2);");
        c.expect_error = Some("no matches found for macro m".to_string());
        c.expect_error_type = Some("ExpansionError".to_string());
        assert!(matches!(run_test_case("f.yaml", &c), TestResult::Pass { .. }));

        c.expect_error_type = Some("Syntax".to_string());
        assert!(matches!(run_test_case("f.yaml", &c), TestResult::Fail { .. }));
    }

    #[test]
    fn unexpected_success_fails() {
        let mut c = case("1;");
        c.expect_error = Some("anything".to_string());
        match run_test_case("f.yaml", &c) {
            TestResult::Fail { actual, .. } => assert_eq!(actual.as_deref(), Some("1;\n")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn only_and_filter_skip_cases() {
        let mut c = case("1;");
        assert!(skip_reason(&c, true, None).is_some());
        c.only = true;
        assert!(skip_reason(&c, true, None).is_none());
        assert!(skip_reason(&c, false, Some("CA")).is_none());
        assert!(skip_reason(&c, false, Some("other")).is_some());
    }

    #[test]
    fn suites_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.yaml"),
            "- name: one\n  input: \"1;\"\n  expected: \"1;\"\n- name: two\n  input: \"2;\"\n  skip: true\n",
        )
        .unwrap();
        fs::write(dir.path().join("b.yml"), "not: [a list").unwrap();
        let config = TestConfig {
            test_root: dir.path().to_path_buf(),
            use_colors: false,
            filter: None,
        };
        let summary = TestSummary::from_results(&collect_results(&config));
        assert_eq!(summary, TestSummary { passed: 1, failed: 1, skipped: 1 });
    }
}
