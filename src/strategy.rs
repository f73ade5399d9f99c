//! Language strategy registry.
//!
//! A strategy describes how to compile one language's test files and how to run the resulting
//! artifact. Strategies are **data**: each one is a pair of argument-vector templates in which
//! the placeholders [`SOURCE_PLACEHOLDER`] and [`OUTPUT_PLACEHOLDER`] are substituted. Building
//! a command is therefore a pure lookup-and-fill with no I/O.
//!
//! ## Notes
//! - Built-in strategies live in the const table [`BUILTIN_STRATEGIES`]. Adding a language is
//!   adding one row there (or one entry in the harness config), never a change to the runner.
//! - Lookup is **case-sensitive**: `cpp` and `CPP` are different identifiers.
//! - Commands are never passed through a shell, so paths with spaces need no quoting.
//!
//! ## Examples
//! ```rust
//! use std::path::Path;
//! use polytest::strategy::StrategyRegistry;
//!
//! let registry = StrategyRegistry::builtin();
//! let cmd = registry.resolve_run_command("cpp", Path::new("bin/cpp/add")).unwrap();
//! assert_eq!(cmd.program, "bin/cpp/add");
//! assert!(cmd.args.is_empty());
//!
//! assert!(registry.resolve_run_command("cobol", Path::new("x")).is_err());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::process::Command;

use thiserror::Error;

/// Placeholder replaced by the test source path.
pub const SOURCE_PLACEHOLDER: &str = "{source}";

/// Placeholder replaced by the artifact path.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Requested language has no registered strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported language: '{language}'")]
pub struct UnsupportedLanguage {
    pub language: String,
}

// ============================================================================
// Commands
// ============================================================================

/// A fully formed external command: a program name plus its ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Convert into a `std::process::Command` (no shell).
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_word(f, &self.program)?;
        for arg in &self.args {
            f.write_str(" ")?;
            write_word(f, arg)?;
        }
        Ok(())
    }
}

// Display only; commands are never handed to a shell
fn write_word(f: &mut fmt::Formatter<'_>, word: &str) -> fmt::Result {
    if word.is_empty() || word.contains(char::is_whitespace) {
        write!(f, "{:?}", word)
    } else {
        f.write_str(word)
    }
}

// ============================================================================
// Templates
// ============================================================================

/// An argument-vector template. The first element is the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    parts: Vec<String>,
}

impl CommandTemplate {
    /// Build a template; returns `None` when `parts` is empty.
    pub fn new<I, S>(parts: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parts: Vec<String> = parts.into_iter().map(Into::into).collect();
        if parts.is_empty() { None } else { Some(Self { parts }) }
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Substitute placeholders and produce a command.
    ///
    /// Placeholders may appear anywhere inside an element (e.g. `-femit-bin={output}`).
    /// Unknown `{...}` sequences are left untouched.
    pub fn fill(&self, source: Option<&Path>, output: &Path) -> CommandSpec {
        let source = source.map(|p| p.to_string_lossy());
        let output = output.to_string_lossy();

        let mut filled = self
            .parts
            .iter()
            .map(|part| substitute(part, source.as_deref(), &output));

        // `parts` is never empty (enforced by `new`)
        let program = filled.next().unwrap_or_default();
        CommandSpec::new(program).args(filled)
    }
}

// Single left-to-right pass so text coming from a substituted path is never expanded again
fn substitute(part: &str, source: Option<&str>, output: &str) -> String {
    let mut filled = String::with_capacity(part.len());
    let mut rest = part;
    while let Some(at) = rest.find('{') {
        filled.push_str(&rest[..at]);
        let tail = &rest[at..];
        if let Some(after) = tail.strip_prefix(OUTPUT_PLACEHOLDER) {
            filled.push_str(output);
            rest = after;
        } else if let (Some(source), Some(after)) = (source, tail.strip_prefix(SOURCE_PLACEHOLDER)) {
            filled.push_str(source);
            rest = after;
        } else {
            filled.push('{');
            rest = &tail[1..];
        }
    }
    filled.push_str(rest);
    filled
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts.join(" "))
    }
}

// ============================================================================
// Strategies
// ============================================================================

/// Where a strategy came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategySource {
    Builtin,
    Config,
}

/// How to compile and run test files of one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageStrategy {
    /// Language identifier; also the test subdirectory name and the file extension.
    pub id: String,
    pub description: String,
    pub compile: CommandTemplate,
    pub run: CommandTemplate,
    pub source: StrategySource,
}

impl LanguageStrategy {
    pub fn new(id: impl Into<String>, compile: CommandTemplate, run: CommandTemplate) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            compile,
            run,
            source: StrategySource::Config,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn compile_command(&self, source: &Path, output: &Path) -> CommandSpec {
        self.compile.fill(Some(source), output)
    }

    pub fn run_command(&self, output: &Path) -> CommandSpec {
        self.run.fill(None, output)
    }
}

/// Const metadata for a built-in strategy.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinStrategy {
    pub id: &'static str,
    pub description: &'static str,
    pub compile: &'static [&'static str],
    pub run: &'static [&'static str],
}

/// Built-in strategies, one row per language.
pub const BUILTIN_STRATEGIES: &[BuiltinStrategy] = &[
    BuiltinStrategy {
        id: "cpp",
        description: "C++17 with GoogleTest (g++)",
        compile: &[
            "g++",
            "-fdiagnostics-color=always",
            "-g",
            "-std=c++17",
            SOURCE_PLACEHOLDER,
            "-o",
            OUTPUT_PLACEHOLDER,
            "-lgtest",
            "-lgtest_main",
            "-pthread",
            "-I",
            "cget/include/",
            "-L",
            "cget/lib/",
        ],
        run: &[OUTPUT_PLACEHOLDER],
    },
    BuiltinStrategy {
        id: "c",
        description: "C11 (gcc)",
        compile: &["gcc", "-g", "-std=c11", SOURCE_PLACEHOLDER, "-o", OUTPUT_PLACEHOLDER],
        run: &[OUTPUT_PLACEHOLDER],
    },
    BuiltinStrategy {
        id: "rs",
        description: "Rust libtest binary (rustc --test)",
        compile: &[
            "rustc",
            "--edition",
            "2021",
            "--test",
            SOURCE_PLACEHOLDER,
            "-o",
            OUTPUT_PLACEHOLDER,
        ],
        run: &[OUTPUT_PLACEHOLDER],
    },
];

impl From<&BuiltinStrategy> for LanguageStrategy {
    fn from(builtin: &BuiltinStrategy) -> Self {
        // Built-in rows always carry non-empty templates
        let compile = CommandTemplate {
            parts: builtin.compile.iter().map(|s| s.to_string()).collect(),
        };
        let run = CommandTemplate {
            parts: builtin.run.iter().map(|s| s.to_string()).collect(),
        };
        Self {
            id: builtin.id.to_string(),
            description: builtin.description.to_string(),
            compile,
            run,
            source: StrategySource::Builtin,
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Language identifier → strategy. Built once at startup, read-only during a run.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, LanguageStrategy>,
}

impl StrategyRegistry {
    /// A registry with no languages.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding every entry of [`BUILTIN_STRATEGIES`].
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for builtin in BUILTIN_STRATEGIES {
            registry.register(LanguageStrategy::from(builtin));
        }
        registry
    }

    /// Register a strategy, returning the one it replaced (if any).
    pub fn register(&mut self, strategy: LanguageStrategy) -> Option<LanguageStrategy> {
        self.strategies.insert(strategy.id.clone(), strategy)
    }

    pub fn contains(&self, language: &str) -> bool {
        self.strategies.contains_key(language)
    }

    pub fn get(&self, language: &str) -> Result<&LanguageStrategy, UnsupportedLanguage> {
        self.strategies.get(language).ok_or_else(|| UnsupportedLanguage {
            language: language.to_string(),
        })
    }

    pub fn resolve_compile_command(
        &self,
        language: &str,
        source: &Path,
        output: &Path,
    ) -> Result<CommandSpec, UnsupportedLanguage> {
        Ok(self.get(language)?.compile_command(source, output))
    }

    pub fn resolve_run_command(&self, language: &str, output: &Path) -> Result<CommandSpec, UnsupportedLanguage> {
        Ok(self.get(language)?.run_command(output))
    }

    /// Strategies ordered by identifier.
    pub fn iter(&self) -> impl Iterator<Item = &LanguageStrategy> {
        self.strategies.values()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_ids_unique() {
        let mut seen = HashSet::new();
        for builtin in BUILTIN_STRATEGIES {
            assert!(seen.insert(builtin.id), "duplicate builtin strategy: {}", builtin.id);
            assert!(!builtin.compile.is_empty(), "empty compile template: {}", builtin.id);
            assert!(!builtin.run.is_empty(), "empty run template: {}", builtin.id);
        }
    }

    #[test]
    fn test_builtin_compile_templates_use_both_placeholders() {
        for builtin in BUILTIN_STRATEGIES {
            assert!(builtin.compile.contains(&SOURCE_PLACEHOLDER), "{}", builtin.id);
            assert!(builtin.compile.contains(&OUTPUT_PLACEHOLDER), "{}", builtin.id);
        }
    }

    #[test]
    fn test_cpp_compile_command() {
        let registry = StrategyRegistry::builtin();
        let cmd = registry
            .resolve_compile_command("cpp", Path::new("tests/cpp/add.cpp"), Path::new("bin/cpp/add"))
            .unwrap();
        assert_eq!(cmd.program, "g++");
        assert!(cmd.args.contains(&"tests/cpp/add.cpp".to_string()));
        let o = cmd.args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(cmd.args[o + 1], "bin/cpp/add");
        assert!(cmd.args.contains(&"-lgtest_main".to_string()));
    }

    #[test]
    fn test_unsupported_language_names_identifier() {
        let registry = StrategyRegistry::builtin();
        let err = registry
            .resolve_compile_command("cobol", Path::new("a.cobol"), Path::new("a"))
            .unwrap_err();
        assert_eq!(err.language, "cobol");
        assert_eq!(err.to_string(), "unsupported language: 'cobol'");
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let registry = StrategyRegistry::builtin();
        assert!(registry.contains("cpp"));
        assert!(!registry.contains("CPP"));
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = StrategyRegistry::builtin();
        let custom = LanguageStrategy::new(
            "cpp",
            CommandTemplate::new(["clang++", "{source}", "-o", "{output}"]).unwrap(),
            CommandTemplate::new(["{output}"]).unwrap(),
        );
        let replaced = registry.register(custom).unwrap();
        assert_eq!(replaced.source, StrategySource::Builtin);
        let cmd = registry
            .resolve_compile_command("cpp", Path::new("a.cpp"), Path::new("out/a"))
            .unwrap();
        assert_eq!(cmd.program, "clang++");
    }

    #[test]
    fn test_fill_inside_element() {
        let template = CommandTemplate::new(["zig", "build-exe", "{source}", "-femit-bin={output}"]).unwrap();
        let cmd = template.fill(Some(Path::new("t/a.zig")), Path::new("bin/zig/a"));
        assert_eq!(cmd.args, vec!["build-exe", "t/a.zig", "-femit-bin=bin/zig/a"]);
    }

    #[test]
    fn test_run_template_leaves_source_placeholder() {
        let template = CommandTemplate::new(["sh", "{output}", "{source}"]).unwrap();
        let cmd = template.fill(None, Path::new("bin/sh/a"));
        assert_eq!(cmd.args, vec!["bin/sh/a", "{source}"]);
    }

    #[test]
    fn test_fill_does_not_expand_placeholders_inside_paths() {
        let template = CommandTemplate::new(["g++", "{source}", "-o", "{output}"]).unwrap();
        let cmd = template.fill(Some(Path::new("tests/cpp/{output}.cpp")), Path::new("bin/cpp/{source}"));
        assert_eq!(cmd.program, "g++");
        assert_eq!(cmd.args, vec!["tests/cpp/{output}.cpp", "-o", "bin/cpp/{source}"]);
    }

    #[test]
    fn test_fill_keeps_unknown_braces() {
        let template = CommandTemplate::new(["run", "{name}-{output}", "{", "{{output}}"]).unwrap();
        let cmd = template.fill(None, Path::new("out"));
        assert_eq!(cmd.args, vec!["{name}-out", "{", "{out}"]);
    }

    #[test]
    fn test_template_parts_from_config_order() {
        let template = CommandTemplate::new(vec!["sh".to_string(), "{output}".to_string()]).unwrap();
        assert_eq!(template.parts(), ["sh", "{output}"]);
        assert_eq!(template.to_string(), "sh {output}");
    }

    #[test]
    fn test_empty_template_rejected() {
        assert!(CommandTemplate::new(Vec::<String>::new()).is_none());
    }

    #[test]
    fn test_command_display_quotes_spaces() {
        let cmd = CommandSpec::new("g++").arg("my test.cpp").arg("-o").arg("out");
        assert_eq!(cmd.to_string(), "g++ \"my test.cpp\" -o out");
    }
}
