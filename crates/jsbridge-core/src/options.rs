//! Runtime configuration and statistics

use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Engine-wide limits for a [`Runtime`](crate::Runtime)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeOptions {
    /// Allocator budget in bytes (None = unlimited)
    pub memory_limit: Option<usize>,

    /// Maximum engine stack size in bytes (None = engine default)
    pub max_stack_size: Option<usize>,

    /// Wall-clock budget per outermost engine entry (None = unlimited)
    #[serde(rename = "script_timeout_ms", deserialize_with = "deserialize_millis")]
    pub script_runtime_limit: Option<Duration>,
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}

impl RuntimeOptions {
    /// Create options without any limits
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Set the allocator budget
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    /// Set the maximum stack size
    pub fn with_max_stack_size(mut self, bytes: usize) -> Self {
        self.max_stack_size = Some(bytes);
        self
    }

    /// Set the wall-clock budget
    pub fn with_script_runtime_limit(mut self, limit: Duration) -> Self {
        self.script_runtime_limit = Some(limit);
        self
    }
}

/// Engine allocator statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Bytes currently allocated through the engine allocator
    pub malloc_size: u64,

    /// Configured allocator limit (0 = unlimited)
    pub malloc_limit: u64,

    /// Bytes used by engine data structures
    pub memory_used_size: u64,

    /// Number of live engine objects
    pub object_count: u64,

    /// Number of live strings
    pub string_count: u64,

    /// Number of live script functions
    pub function_count: u64,

    /// Number of live arrays
    pub array_count: u64,
}

/// Snapshot of runtime bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Contexts that have not been released
    pub live_contexts: usize,

    /// Handles held by those contexts
    pub live_handles: usize,

    /// Whether a script is executing
    pub running: bool,

    /// Configured wall-clock budget
    pub script_runtime_limit: Option<Duration>,

    /// Configured allocator budget
    pub memory_limit: Option<usize>,
}
