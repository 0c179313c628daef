// Fixture runner: uses the shared test_harness module
// Usage: cargo run --bin test_runner [filter] [suite-dir]

use std::env;
use std::path::PathBuf;

use macrojs::test_harness::{self, TestConfig};

fn main() {
    let mut args = env::args().skip(1);
    let mut config = TestConfig {
        filter: args.next(),
        ..TestConfig::default()
    };
    if let Some(root) = args.next() {
        config.test_root = PathBuf::from(root);
    }
    let summary = test_harness::run_all_tests(&config);
    if summary.failed > 0 {
        std::process::exit(1);
    }
}
