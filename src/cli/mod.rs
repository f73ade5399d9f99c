//! CLI module for the polytest harness
//!
//! ## Commands
//!
//! - `run` - Compile and run every test of one language (default when no subcommand is given)
//! - `list` - Show the discovered tests and which of them are blacklisted
//! - `languages` - Show the registered language strategies
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//! - `test_interfaces` - Discovery and process-execution boundaries
//! - `test_runner` - Orchestration and reporting
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;
pub mod test_interfaces;
pub mod test_runner;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use crate::config::HarnessConfig;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Compile and run language test suites
#[derive(Parser, Debug)]
#[command(name = "polytest")]
#[command(version = VERSION)]
#[command(about = "Compile and run language test suites", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Options that pick the suite: where it lives, which language, what to skip.
#[derive(Args, Debug, Default, Clone)]
pub struct SuiteArgs {
    /// JSON config file (CLI flags override its values)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Test root; sources are read from <TESTS_DIR>/<LANGUAGE>/ (default: tests)
    #[arg(long = "tests-dir", value_name = "DIR")]
    pub tests_dir: Option<PathBuf>,
    /// Artifact root; binaries are written to <OUTPUT_DIR>/<LANGUAGE>/ (default: bin)
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
    /// Language identifier, also the test file extension (default: cpp)
    #[arg(short, long, value_name = "ID")]
    pub language: Option<String>,
    /// Test file name to skip (repeatable)
    #[arg(short, long = "skip", value_name = "FILE")]
    pub skip: Vec<String>,
    /// Only include tests whose file name contains EXPR
    #[arg(short = 'k', value_name = "EXPR")]
    pub filter: Option<String>,
}

impl SuiteArgs {
    /// Defaults, then the config file, then CLI overrides.
    pub fn to_config(&self) -> CliResult<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::from_file(path).map_err(|e| CliError::failure(format!("Error: {}", e)))?,
            None => HarnessConfig::default(),
        };

        if let Some(dir) = &self.tests_dir {
            config.tests_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(language) = &self.language {
            config.language = language.clone();
        }
        if let Some(filter) = &self.filter {
            config.filter = Some(filter.clone());
        }
        Ok(config.with_blacklist(self.skip.iter().cloned()))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile and run every test of one language
    Run {
        #[command(flatten)]
        suite: SuiteArgs,
        /// Verbose output (per-test durations)
        #[arg(short, long)]
        verbose: bool,
        /// Keep going after a failure instead of stopping at the first one
        #[arg(long = "no-fail-fast")]
        no_fail_fast: bool,
    },

    /// List discovered tests without compiling anything
    List {
        #[command(flatten)]
        suite: SuiteArgs,
    },

    /// List registered language strategies
    Languages {
        /// JSON config file with custom languages
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
pub fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Some(Command::Run {
            suite,
            verbose,
            no_fail_fast,
        }) => {
            let config = suite.to_config()?;
            let config = if no_fail_fast { config.with_fail_fast(false) } else { config };
            commands::run_suite(config, verbose)
        }
        Some(Command::List { suite }) => commands::list_tests(suite.to_config()?),
        Some(Command::Languages { config }) => {
            let suite = SuiteArgs {
                config,
                ..SuiteArgs::default()
            };
            commands::list_languages(&suite.to_config()?)
        }
        // Default: run the suite with default settings
        None => commands::run_suite(HarnessConfig::default(), false),
    }
}

// ============================================================================
// Tests
// ============================================================================
