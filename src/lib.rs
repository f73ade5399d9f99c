#![forbid(unsafe_code)]
//! polytest: a multi-language compile-and-run test harness
//!
//! The harness discovers test sources for one language, compiles each into a binary with an
//! external toolchain, runs the binary, and reports pass/fail. A blacklist skips selected
//! files. Languages are plugged in through the [`strategy`] registry.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module
//!   enforces `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod config;
pub mod strategy;

pub use cli::test_interfaces::{ProcessExecutor, ProcessResult, TestCase, TestDiscovery, TestError};
pub use cli::test_runner::{ConsoleReporter, RunOutcome, RunReport, TestHarness, TestReporter, TestSummary};
pub use config::{ConfigError, HarnessConfig, LanguageTemplate};
pub use strategy::{CommandSpec, LanguageStrategy, StrategyRegistry, UnsupportedLanguage};
