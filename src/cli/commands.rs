//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use crate::config::HarnessConfig;

use super::test_runner::{ConsoleReporter, TestHarness};
use super::{CliError, CliResult, ExitCode};

fn harness(config: HarnessConfig) -> CliResult<TestHarness> {
    TestHarness::from_config(config).map_err(|e| CliError::failure(format!("Error: {}", e)))
}

/// Compile and run the suite described by `config`.
///
/// Exit code is `0` only if every non-blacklisted test passed.
pub fn run_suite(config: HarnessConfig, verbose: bool) -> CliResult<ExitCode> {
    let harness = harness(config)?;
    let mut reporter = ConsoleReporter::stdout(verbose);

    let report = harness
        .run(&mut reporter)
        .map_err(|e| CliError::failure(format!("Error: {}", e)))?;

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        // Tests failed - return error with empty message (report already printed)
        Err(CliError::new("", ExitCode(report.exit_status())))
    }
}

/// Print the tests that `run` would process, marking blacklisted ones.
pub fn list_tests(config: HarnessConfig) -> CliResult<ExitCode> {
    let harness = harness(config)?;
    let cases = harness
        .collect()
        .map_err(|e| CliError::failure(format!("Error: {}", e)))?;

    if cases.is_empty() {
        println!("No tests collected");
        return Ok(ExitCode::SUCCESS);
    }

    for case in &cases {
        if harness.config().is_blacklisted(&case.file_name) {
            println!("{} (skipped)", case.file_name);
        } else {
            println!("{} -> {}", case.file_name, case.output_path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Print every registered language strategy.
pub fn list_languages(config: &HarnessConfig) -> CliResult<ExitCode> {
    let registry = config
        .registry()
        .map_err(|e| CliError::failure(format!("Error: {}", e)))?;

    for strategy in registry.iter() {
        println!("{}: {}", strategy.id, strategy.description);
        println!("    compile: {}", strategy.compile);
        println!("    run:     {}", strategy.run);
    }
    Ok(ExitCode::SUCCESS)
}
