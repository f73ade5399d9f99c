//! Harness configuration
//!
//! Settings are fixed when the harness is constructed and never re-read during a run. They
//! come from defaults, an optional JSON file, and CLI overrides (applied in that order).
//!
//! ```json
//! {
//!   "tests_dir": "tests",
//!   "output_dir": "bin",
//!   "language": "cpp",
//!   "blacklist": ["thread.cpp"],
//!   "languages": {
//!     "zig": { "compile": ["zig", "build-exe", "{source}", "-femit-bin={output}"], "run": ["{output}"] }
//!   }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::strategy::{CommandTemplate, LanguageStrategy, StrategyRegistry};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },

    #[error("invalid config '{}': {source}", path.display())]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("language '{language}' has an empty {stage} command")]
    EmptyTemplate { language: String, stage: &'static str },
}

/// A language defined in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LanguageTemplate {
    pub compile: Vec<String>,
    pub run: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl LanguageTemplate {
    /// Convert into a strategy for `language`.
    pub fn to_strategy(&self, language: &str) -> Result<LanguageStrategy, ConfigError> {
        let empty = |stage| ConfigError::EmptyTemplate {
            language: language.to_string(),
            stage,
        };
        let compile = CommandTemplate::new(self.compile.iter().cloned()).ok_or_else(|| empty("compile"))?;
        let run = CommandTemplate::new(self.run.iter().cloned()).ok_or_else(|| empty("run"))?;

        let description = self.description.clone().unwrap_or_else(|| "custom".to_string());
        Ok(LanguageStrategy::new(language, compile, run).with_description(description))
    }
}

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Test root; sources live in `<tests_dir>/<language>/`
    pub tests_dir: PathBuf,
    /// Artifact root; binaries go to `<output_dir>/<language>/`
    pub output_dir: PathBuf,
    /// Language identifier (also the file extension)
    pub language: String,
    /// Test file names that are never compiled or run
    pub blacklist: BTreeSet<String>,
    /// Stop at the first compile or run failure
    pub fail_fast: bool,
    /// Only run cases whose file name contains this substring
    pub filter: Option<String>,
    /// Additional (or overriding) language strategies
    pub languages: BTreeMap<String, LanguageTemplate>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            tests_dir: PathBuf::from("tests"),
            output_dir: PathBuf::from("bin"),
            language: "cpp".to_string(),
            blacklist: BTreeSet::new(),
            fail_fast: true,
            filter: None,
            languages: BTreeMap::new(),
        }
    }
}

impl HarnessConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check custom language templates.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (language, template) in &self.languages {
            template.to_strategy(language)?;
        }
        Ok(())
    }

    /// Built-in strategies plus the custom ones from this config.
    pub fn registry(&self) -> Result<StrategyRegistry, ConfigError> {
        let mut registry = StrategyRegistry::builtin();
        for (language, template) in &self.languages {
            if let Some(previous) = registry.register(template.to_strategy(language)?) {
                tracing::debug!(language = %previous.id, "config overrides builtin strategy");
            }
        }
        Ok(registry)
    }

    /// `<tests_dir>/<language>`
    pub fn language_tests_dir(&self) -> PathBuf {
        self.tests_dir.join(&self.language)
    }

    /// `<output_dir>/<language>`
    pub fn language_output_dir(&self) -> PathBuf {
        self.output_dir.join(&self.language)
    }

    pub fn is_blacklisted(&self, file_name: &str) -> bool {
        self.blacklist.contains(file_name)
    }

    pub fn with_tests_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tests_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Add file names to the blacklist
    pub fn with_blacklist<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_language_template(mut self, language: impl Into<String>, template: LanguageTemplate) -> Self {
        self.languages.insert(language.into(), template);
        self
    }
}
