//! Test runner I/O boundary interfaces
//!
//! This module defines trait-based abstractions for the two places the harness touches the
//! outside world:
//! - Test discovery (directory listing)
//! - Process execution (compiler and artifact invocation + output capture)
//!
//! The orchestrator in `test_runner.rs` only talks to these traits, so tests can swap in a
//! fake executor that returns scripted results.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::strategy::{CommandSpec, UnsupportedLanguage};

/// Errors that stop a harness run before or during case processing.
#[derive(Debug, Error)]
pub enum TestError {
    #[error(transparent)]
    UnsupportedLanguage(#[from] UnsupportedLanguage),

    #[error("failed to read test directory '{}': {source}", path.display())]
    Discovery { path: PathBuf, source: io::Error },

    #[error("failed to create output directory '{}': {source}", path.display())]
    OutputDir { path: PathBuf, source: io::Error },

    #[error("failed to launch '{program}': {source}")]
    Spawn { program: String, source: io::Error },
}

// ============================================================================
// Data
// ============================================================================

/// One discovered test source paired with its artifact path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// File name without the language extension
    pub name: String,
    /// File name as found on disk (what the blacklist matches against)
    pub file_name: String,
    pub source_path: PathBuf,
    pub output_path: PathBuf,
}

impl TestCase {
    /// Build a case for `file_name` inside `tests_dir`, with its artifact in `output_dir`.
    pub fn new(file_name: &str, language: &str, tests_dir: &Path, output_dir: &Path) -> Self {
        let name = strip_language_extension(file_name, language).unwrap_or(file_name);
        Self {
            name: name.to_string(),
            file_name: file_name.to_string(),
            source_path: tests_dir.join(file_name),
            output_path: output_dir.join(name),
        }
    }
}

/// Captured result of one external process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessResult {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; `-1` when the process was terminated by a signal
    pub exit_code: i32,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// `name.<language>` → `name`; `None` when the extension doesn't match or the stem is empty.
pub fn strip_language_extension<'a>(file_name: &'a str, language: &str) -> Option<&'a str> {
    let stem = file_name.strip_suffix(language)?.strip_suffix('.')?;
    if stem.is_empty() { None } else { Some(stem) }
}

// ============================================================================
// Test Discovery Interface
// ============================================================================

/// List candidate test files.
pub trait TestDiscovery {
    /// File names directly inside `dir` whose name ends with `.<language>`, sorted.
    fn discover(&self, dir: &Path, language: &str) -> Result<Vec<String>, TestError>;
}

/// Filesystem-based discovery (no recursion, no content inspection).
#[derive(Debug, Default, Clone, Copy)]
pub struct FsTestDiscovery;

impl TestDiscovery for FsTestDiscovery {
    fn discover(&self, dir: &Path, language: &str) -> Result<Vec<String>, TestError> {
        let io_err = |source: io::Error| TestError::Discovery {
            path: dir.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            if !entry.path().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::debug!(path = %entry.path().display(), "skipping non UTF-8 file name");
                continue;
            };
            if strip_language_extension(&name, language).is_some() {
                files.push(name);
            }
        }

        files.sort();
        Ok(files)
    }
}

// ============================================================================
// Process Executor Interface
// ============================================================================

/// Run an external command to completion and capture its output.
pub trait ProcessExecutor {
    fn execute(&self, command: &CommandSpec) -> Result<ProcessResult, TestError>;
}

/// Runs commands with `std::process::Command` (no shell), blocking until both pipes are drained.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl ProcessExecutor for SystemExecutor {
    fn execute(&self, command: &CommandSpec) -> Result<ProcessResult, TestError> {
        tracing::debug!(command = %command, "spawning");

        let output = command.to_command().output().map_err(|source| TestError::Spawn {
            program: command.program.clone(),
            source,
        })?;

        Ok(ProcessResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}
