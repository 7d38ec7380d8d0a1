//! Engine metadata and construction.

use crate::engine::ScriptEngine;
use crate::error::ScriptResult;

/// Parameter key for the engine name
pub const ENGINE: &str = "engine";
/// Parameter key for the engine version
pub const ENGINE_VERSION: &str = "engine_version";
/// Parameter key for the short engine name
pub const NAME: &str = "name";
/// Parameter key for the language name
pub const LANGUAGE: &str = "language";
/// Parameter key for the language version
pub const LANGUAGE_VERSION: &str = "language_version";

/// Describes the QuickJS engine and creates [`ScriptEngine`]s
#[derive(Debug, Clone, Default)]
pub struct ScriptEngineFactory;

impl ScriptEngineFactory {
    /// Create the factory
    pub fn new() -> Self {
        Self
    }

    /// Full engine name
    pub fn engine_name(&self) -> &'static str {
        "QuickJS"
    }

    /// Version of this engine integration
    pub fn engine_version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Short names the engine can be looked up by
    pub fn names(&self) -> &'static [&'static str] {
        &["js", "javascript", "quickjs", "QuickJS"]
    }

    /// File extensions of scripts the engine runs
    pub fn extensions(&self) -> &'static [&'static str] {
        &["js", "mjs"]
    }

    /// MIME types of scripts the engine runs
    pub fn mime_types(&self) -> &'static [&'static str] {
        &["text/javascript", "application/javascript"]
    }

    /// Scripting language name
    pub fn language_name(&self) -> &'static str {
        "JavaScript"
    }

    /// Scripting language version
    pub fn language_version(&self) -> &'static str {
        "ES2023"
    }

    /// Standard parameter lookup
    pub fn parameter(&self, key: &str) -> Option<&'static str> {
        match key {
            ENGINE => Some(self.engine_name()),
            ENGINE_VERSION => Some(self.engine_version()),
            NAME => self.names().first().copied(),
            LANGUAGE => Some(self.language_name()),
            LANGUAGE_VERSION => Some(self.language_version()),
            _ => None,
        }
    }

    /// Whether `name` is one of the engine's names (case-insensitive)
    pub fn has_name(&self, name: &str) -> bool {
        self.names().iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    /// Whether scripts with `extension` (without the dot) are handled
    pub fn has_extension(&self, extension: &str) -> bool {
        self.extensions()
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension.trim_start_matches('.')))
    }

    /// Source text calling method `method` on `object`
    pub fn method_call_syntax(&self, object: &str, method: &str, args: &[&str]) -> String {
        format!("{}.{}({})", object, method, args.join(", "))
    }

    /// Program made of `statements`, one per line
    pub fn program(&self, statements: &[&str]) -> String {
        statements
            .iter()
            .map(|s| format!("{};", s.trim_end_matches(';')))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Create an engine with its own runtime
    pub fn script_engine(&self) -> ScriptResult<ScriptEngine> {
        ScriptEngine::with_factory(self.clone())
    }
}
