//! Test runner implementation (compile, then execute)
//!
//! ## Flow
//!
//! For the configured language the runner resolves a strategy, discovers
//! `<tests_dir>/<language>/*.<language>`, creates `<output_dir>/<language>/`, and then
//! walks the cases in discovery order:
//!
//! ```text
//! Pending ─┬─ blacklisted ──────────────────────────────► Skipped
//!          └─ Compiling ─┬─ exit != 0 ──────────────────► CompileFailed (abort)
//!                        └─ exit == 0 ─ Running ─┬─ exit != 0 ► RunFailed (abort)
//!                                                └─ exit == 0 ► Passed
//! ```
//!
//! A case never reaches `Running` unless its compile step exited with 0. With `fail_fast`
//! (the default) the first failure stops the run; the remaining cases are reported as not run.
//!
//! ## TestReporter Trait
//!
//! Reporting is separated from execution through [`TestReporter`]. Captured compiler and
//! artifact output is handed to the reporter for every attempted case, including the one that
//! stops the run.

use std::fmt::Display;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

use super::test_interfaces::{
    FsTestDiscovery, ProcessExecutor, ProcessResult, SystemExecutor, TestCase, TestDiscovery, TestError,
};
use crate::config::{ConfigError, HarnessConfig};
use crate::strategy::{LanguageStrategy, StrategyRegistry};

// ============================================================================
// Outcomes
// ============================================================================

/// Terminal state of one test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Blacklisted; neither compiled nor run
    Skipped,
    CompileFailed { compile: ProcessResult },
    RunFailed { compile: ProcessResult, run: ProcessResult },
    Passed { compile: ProcessResult, run: ProcessResult },
}

impl RunOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::CompileFailed { .. } | RunOutcome::RunFailed { .. })
    }

    pub fn compile_result(&self) -> Option<&ProcessResult> {
        match self {
            RunOutcome::Skipped => None,
            RunOutcome::CompileFailed { compile }
            | RunOutcome::RunFailed { compile, .. }
            | RunOutcome::Passed { compile, .. } => Some(compile),
        }
    }

    pub fn run_result(&self) -> Option<&ProcessResult> {
        match self {
            RunOutcome::RunFailed { run, .. } | RunOutcome::Passed { run, .. } => Some(run),
            _ => None,
        }
    }
}

/// A case together with how it ended.
#[derive(Debug, Clone)]
pub struct CaseResult {
    pub case: TestCase,
    pub outcome: RunOutcome,
    pub duration: Duration,
}

/// Summary of test run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Cases never attempted because an earlier one failed
    pub not_run: usize,
    pub duration: Duration,
}

impl TestSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Everything a run produced, in discovery order.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub language: String,
    pub results: Vec<CaseResult>,
    pub not_run: Vec<TestCase>,
    pub duration: Duration,
}

impl RunReport {
    /// True when no attempted case failed.
    pub fn is_success(&self) -> bool {
        !self.results.iter().any(|r| r.outcome.is_failure())
    }

    /// Process exit status for this run: `0` or `1`.
    pub fn exit_status(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }

    pub fn first_failure(&self) -> Option<&CaseResult> {
        self.results.iter().find(|r| r.outcome.is_failure())
    }

    pub fn outcome_of(&self, file_name: &str) -> Option<&RunOutcome> {
        self.results
            .iter()
            .find(|r| r.case.file_name == file_name)
            .map(|r| &r.outcome)
    }

    pub fn summary(&self) -> TestSummary {
        let mut summary = TestSummary {
            total: self.results.len() + self.not_run.len(),
            not_run: self.not_run.len(),
            duration: self.duration,
            ..TestSummary::default()
        };
        for result in &self.results {
            match result.outcome {
                RunOutcome::Skipped => summary.skipped += 1,
                RunOutcome::Passed { .. } => summary.passed += 1,
                RunOutcome::CompileFailed { .. } | RunOutcome::RunFailed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}

// ============================================================================
// Test Reporter Trait
// ============================================================================

/// Trait for reporting test execution results.
///
/// Implement this trait to customize test output format.
pub trait TestReporter {
    /// Called once discovery and filtering are done
    fn on_collection_complete(&mut self, _cases: &[TestCase]) {}

    /// Called before a case is compiled; blacklisted cases skip this
    fn on_test_start(&mut self, _case: &TestCase) {}

    /// Called when a case reaches a terminal state
    fn on_test_complete(&mut self, result: &CaseResult);

    /// Called when the run ends, normally or by fail-fast
    fn on_run_complete(&mut self, summary: &TestSummary);
}

/// Reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl TestReporter for SilentReporter {
    fn on_test_complete(&mut self, _result: &CaseResult) {}

    fn on_run_complete(&mut self, _summary: &TestSummary) {}
}

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Default console reporter
///
/// Prints captured compiler and artifact output verbatim, followed by a status line per case
/// and a summary at the end.
pub struct ConsoleReporter<W: Write = io::Stdout> {
    out: W,
    pub verbose: bool,
    pub color: bool,
}

impl ConsoleReporter<io::Stdout> {
    /// Reporter on stdout; colors only when stdout is a terminal.
    pub fn stdout(verbose: bool) -> Self {
        let color = io::stdout().is_terminal();
        Self::new(io::stdout(), verbose, color)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, verbose: bool, color: bool) -> Self {
        Self { out, verbose, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, code: &str, text: impl Display) -> String {
        if self.color {
            format!("{}{}{}", code, text, RESET)
        } else {
            text.to_string()
        }
    }

    // Console output is best-effort; a closed pipe must not abort the run
    fn line(&mut self, text: impl Display) {
        let _ = writeln!(self.out, "{}", text);
    }

    fn streams(&mut self, stage: &str, result: &ProcessResult) {
        if !result.stdout.is_empty() {
            let _ = write!(self.out, "{}", result.stdout);
            if !result.stdout.ends_with('\n') {
                self.line("");
            }
        }
        if !result.stderr.is_empty() {
            let _ = write!(self.out, "{}", result.stderr);
            if !result.stderr.ends_with('\n') {
                self.line("");
            }
        }
        if !result.success() {
            let msg = self.paint(RED, format!("{} exited with code {}", stage, result.exit_code));
            self.line(msg);
        }
    }
}

impl<W: Write> TestReporter for ConsoleReporter<W> {
    fn on_collection_complete(&mut self, cases: &[TestCase]) {
        if cases.is_empty() {
            self.line("No tests collected");
            return;
        }
        let header = self.paint(BOLD, "=================== test session starts ===================");
        self.line(header);
        self.line(format!("collected {} item(s)", cases.len()));
        self.line("");
    }

    fn on_test_start(&mut self, case: &TestCase) {
        self.line(format!("Running test: {}", case.file_name));
    }

    fn on_test_complete(&mut self, result: &CaseResult) {
        if let Some(compile) = result.outcome.compile_result() {
            self.streams("compiler", compile);
        }
        if let Some(run) = result.outcome.run_result() {
            self.streams("test binary", run);
        }

        let status = match &result.outcome {
            RunOutcome::Skipped => self.paint(YELLOW, "SKIPPED (blacklisted)"),
            RunOutcome::Passed { .. } => self.paint(GREEN, "PASSED"),
            RunOutcome::CompileFailed { .. } => self.paint(RED, "FAILED (compile)"),
            RunOutcome::RunFailed { .. } => self.paint(RED, "FAILED (run)"),
        };

        if self.verbose && !matches!(result.outcome, RunOutcome::Skipped) {
            self.line(format!(
                "{} {} ({}ms)",
                result.case.file_name,
                status,
                result.duration.as_millis()
            ));
        } else {
            self.line(format!("{} {}", result.case.file_name, status));
        }
    }

    fn on_run_complete(&mut self, summary: &TestSummary) {
        let mut parts = Vec::new();
        if summary.passed > 0 {
            parts.push(format!("{} passed", summary.passed));
        }
        if summary.failed > 0 {
            parts.push(format!("{} failed", summary.failed));
        }
        if summary.skipped > 0 {
            parts.push(format!("{} skipped", summary.skipped));
        }
        if summary.not_run > 0 {
            parts.push(format!("{} not run", summary.not_run));
        }
        if parts.is_empty() {
            parts.push("no tests ran".to_string());
        }

        let color = if summary.is_success() { GREEN } else { RED };
        let text = format!(
            "=================== {} in {:.2}s ===================",
            parts.join(", "),
            summary.duration.as_secs_f64()
        );
        self.line("");
        let text = self.paint(color, text);
        self.line(text);
        let _ = self.out.flush();
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Exit code recorded when a compiled artifact cannot be launched (shell "command not found").
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = 127;

/// The orchestrator: discovery, blacklist filtering, compile, execute, report.
pub struct TestHarness<D = FsTestDiscovery, E = SystemExecutor> {
    config: HarnessConfig,
    registry: StrategyRegistry,
    discovery: D,
    executor: E,
}

impl TestHarness {
    /// Harness over the real filesystem and real processes.
    pub fn new(config: HarnessConfig, registry: StrategyRegistry) -> Self {
        Self {
            config,
            registry,
            discovery: FsTestDiscovery,
            executor: SystemExecutor,
        }
    }

    /// Harness whose registry is the builtins plus the config's custom languages.
    pub fn from_config(config: HarnessConfig) -> Result<Self, ConfigError> {
        let registry = config.registry()?;
        Ok(Self::new(config, registry))
    }
}

impl<D: TestDiscovery, E: ProcessExecutor> TestHarness<D, E> {
    pub fn with_discovery<D2: TestDiscovery>(self, discovery: D2) -> TestHarness<D2, E> {
        TestHarness {
            config: self.config,
            registry: self.registry,
            discovery,
            executor: self.executor,
        }
    }

    pub fn with_executor<E2: ProcessExecutor>(self, executor: E2) -> TestHarness<D, E2> {
        TestHarness {
            config: self.config,
            registry: self.registry,
            discovery: self.discovery,
            executor,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Resolve the strategy and discover the cases, applying the keyword filter.
    ///
    /// Blacklisted cases are kept; they become `Skipped` during [`run`](Self::run).
    pub fn collect(&self) -> Result<Vec<TestCase>, TestError> {
        let language = self.config.language.as_str();
        self.registry.get(language)?;

        let tests_dir = self.config.language_tests_dir();
        let output_dir = self.config.language_output_dir();
        let files = self.discovery.discover(&tests_dir, language)?;

        for name in &self.config.blacklist {
            if !files.contains(name) {
                tracing::warn!(file = %name, dir = %tests_dir.display(), "blacklisted file not found");
            }
        }

        let cases = files
            .iter()
            .filter(|f| match &self.config.filter {
                Some(keyword) => f.contains(keyword.as_str()),
                None => true,
            })
            .map(|f| TestCase::new(f, language, &tests_dir, &output_dir))
            .collect();
        Ok(cases)
    }

    /// Run the whole suite.
    ///
    /// Returns `Err` for harness errors (unsupported language, unreadable test directory,
    /// output directory creation, unlaunchable compiler). Compile and run failures are
    /// outcomes inside the returned report.
    #[tracing::instrument(skip_all, fields(language = %self.config.language))]
    pub fn run(&self, reporter: &mut dyn TestReporter) -> Result<RunReport, TestError> {
        let start = Instant::now();
        let strategy = self.registry.get(&self.config.language)?;

        let cases = self.collect()?;
        reporter.on_collection_complete(&cases);

        let output_dir = self.config.language_output_dir();
        fs::create_dir_all(&output_dir).map_err(|source| TestError::OutputDir {
            path: output_dir.clone(),
            source,
        })?;

        let mut results = Vec::with_capacity(cases.len());
        let mut pending = cases.into_iter();

        for case in pending.by_ref() {
            if !self.config.is_blacklisted(&case.file_name) {
                reporter.on_test_start(&case);
            }
            let case_start = Instant::now();
            let outcome = self.run_case(strategy, &case)?;
            tracing::debug!(test = %case.file_name, ?outcome, "case finished");

            let failed = outcome.is_failure();
            let result = CaseResult {
                case,
                outcome,
                duration: case_start.elapsed(),
            };
            reporter.on_test_complete(&result);
            results.push(result);

            if failed && self.config.fail_fast {
                break;
            }
        }

        let report = RunReport {
            language: self.config.language.clone(),
            results,
            not_run: pending.collect(),
            duration: start.elapsed(),
        };
        reporter.on_run_complete(&report.summary());
        Ok(report)
    }

    /// Drive one case to its terminal state.
    ///
    /// An artifact that cannot be launched is a `RunFailed` case with exit code
    /// [`LAUNCH_FAILURE_EXIT_CODE`]; a compiler that cannot be launched is a harness error.
    pub fn run_case(&self, strategy: &LanguageStrategy, case: &TestCase) -> Result<RunOutcome, TestError> {
        if self.config.is_blacklisted(&case.file_name) {
            return Ok(RunOutcome::Skipped);
        }

        let compile = self.compile(strategy, case)?;
        if !compile.success() {
            return Ok(RunOutcome::CompileFailed { compile });
        }

        let run = match self.execute(strategy, case) {
            Ok(run) => run,
            Err(err @ TestError::Spawn { .. }) => {
                tracing::warn!(test = %case.file_name, error = %err, "artifact could not be launched");
                ProcessResult {
                    stderr: err.to_string(),
                    exit_code: LAUNCH_FAILURE_EXIT_CODE,
                    ..ProcessResult::default()
                }
            }
            Err(err) => return Err(err),
        };
        if run.success() {
            Ok(RunOutcome::Passed { compile, run })
        } else {
            Ok(RunOutcome::RunFailed { compile, run })
        }
    }

    /// Compile stage: source → artifact at `case.output_path`.
    pub fn compile(&self, strategy: &LanguageStrategy, case: &TestCase) -> Result<ProcessResult, TestError> {
        let command = strategy.compile_command(&case.source_path, &case.output_path);
        self.executor.execute(&command)
    }

    /// Execution stage: run the artifact with no extra arguments.
    pub fn execute(&self, strategy: &LanguageStrategy, case: &TestCase) -> Result<ProcessResult, TestError> {
        let command = strategy.run_command(&case.output_path);
        self.executor.execute(&command)
    }
}
