//! Error types surfaced by the bridge
//!
//! Every failure that reaches a caller, whether raised by script code, by a host
//! callback invoked from script, by the execution governor, or by misuse of a
//! released handle, is reported as a [`BridgeError`]. Callers branch on
//! [`BridgeError::kind`] rather than on message text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Error raised by host code that was called from a script
pub type HostError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// `(file:line)` or `(file:line:column)` inside a stack frame
static FRAME_LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(([^()]*?):(\d+)(?::(\d+))?\)").expect("frame location pattern is valid")
});

/// `at file:line` frames without a function name
static BARE_LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"at\s+([^\s()]+?):(\d+)(?::(\d+))?\s*$").expect("bare location pattern is valid")
});

/// Best-effort position of a failure inside script source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptLocation {
    /// Script file name as reported by the engine
    pub file: Option<String>,
    /// One-based line number
    pub line: Option<u32>,
    /// One-based column number, when the engine reports it
    pub column: Option<u32>,
}

impl ScriptLocation {
    /// Parse the innermost script frame out of an engine stack trace.
    ///
    /// Frames that belong to native functions carry no position and are skipped,
    /// so a failure raised inside a host callback resolves to the script line that
    /// called it. Parsing never fails; unknown parts are left as `None`.
    pub fn parse(stack: &str) -> Self {
        for frame in stack.lines() {
            let captures = FRAME_LOCATION
                .captures(frame)
                .or_else(|| BARE_LOCATION.captures(frame.trim_end()));
            if let Some(captures) = captures {
                return Self {
                    file: captures
                        .get(1)
                        .map(|m| m.as_str().to_string())
                        .filter(|f| !f.is_empty()),
                    line: captures.get(2).and_then(|m| m.as_str().parse().ok()),
                    column: captures.get(3).and_then(|m| m.as_str().parse().ok()),
                };
            }
        }
        Self::default()
    }

    /// Whether any part of the location is known
    pub fn is_known(&self) -> bool {
        self.file.is_some() || self.line.is_some()
    }
}

impl fmt::Display for ScriptLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{}:{}", file, line),
            (Some(file), None) => write!(f, "{}", file),
            (None, Some(line)) => write!(f, "line {}", line),
            (None, None) => write!(f, "<unknown>"),
        }
    }
}

fn location_suffix(location: &ScriptLocation) -> String {
    if location.is_known() {
        format!(" ({})", location)
    } else {
        String::new()
    }
}

fn limit_suffix(limit: &Option<usize>) -> String {
    match limit {
        Some(bytes) => format!(" (limit {} bytes)", bytes),
        None => String::new(),
    }
}

/// Coarse classification of a [`BridgeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Script code threw
    Script,
    /// A host callback invoked from script failed
    HostCallback,
    /// The wall-clock budget ran out
    Interrupted,
    /// The memory budget ran out
    OutOfMemory,
    /// A released handle, context, or runtime was used
    InvalidHandle,
    /// A value has no mapping across the boundary
    UnsupportedValue,
    /// A view index was outside `[0, len)`
    IndexOutOfRange,
    /// A value did not have the requested type
    TypeMismatch,
    /// A global or interface member does not exist
    NotFound,
    /// A value that was called is not a function
    NotCallable,
    /// The resource is in use by running script code
    Busy,
    /// Any other engine failure
    Engine,
}

/// Errors surfaced by the bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Script code threw an exception
    #[error("{message}{}", location_suffix(.location))]
    Script {
        /// Exception message
        message: String,
        /// Where in the script the exception was raised
        location: ScriptLocation,
    },

    /// A host callback invoked from script returned an error
    #[error("Host callback failed: {message}{}", location_suffix(.location))]
    HostCallback {
        /// Rendered message of the host error
        message: String,
        /// Script call site of the callback
        location: ScriptLocation,
        /// The original host error
        #[source]
        cause: HostError,
    },

    /// The wall-clock budget was exceeded
    #[error("Script interrupted: runtime limit of {limit:?} exceeded")]
    Interrupted {
        /// Configured limit
        limit: Duration,
    },

    /// The allocator budget was exceeded
    #[error("Script ran out of memory{}", limit_suffix(.limit))]
    OutOfMemory {
        /// Configured limit in bytes, if known
        limit: Option<usize>,
    },

    /// Operation on a released resource
    #[error("Invalid handle: {0} has been released")]
    InvalidHandle(&'static str),

    /// Value cannot cross the boundary
    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),

    /// View index outside `[0, len)`
    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Length observed when the request was checked
        len: usize,
    },

    /// Value had the wrong type
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: &'static str,
        /// Actual type name
        got: String,
    },

    /// Wrong number of arguments for an interface method
    #[error("{name} expects {expected} arguments, got {got}")]
    ArityMismatch {
        /// Method name
        name: String,
        /// Declared arity
        expected: usize,
        /// Number of arguments supplied
        got: usize,
    },

    /// Name does not resolve to a value
    #[error("{0} is not defined")]
    NotFound(String),

    /// Value is not callable
    #[error("{0} is not a function")]
    NotCallable(String),

    /// Resource is in use by running script code
    #[error("The {0} is in use by a running script")]
    Busy(&'static str),

    /// Other engine failure
    #[error("Engine error: {0}")]
    Engine(String),
}

impl BridgeError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Script { .. } => ErrorKind::Script,
            BridgeError::HostCallback { .. } => ErrorKind::HostCallback,
            BridgeError::Interrupted { .. } => ErrorKind::Interrupted,
            BridgeError::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            BridgeError::InvalidHandle(_) => ErrorKind::InvalidHandle,
            BridgeError::UnsupportedValue(_) => ErrorKind::UnsupportedValue,
            BridgeError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            BridgeError::TypeMismatch { .. } | BridgeError::ArityMismatch { .. } => {
                ErrorKind::TypeMismatch
            }
            BridgeError::NotFound(_) => ErrorKind::NotFound,
            BridgeError::NotCallable(_) => ErrorKind::NotCallable,
            BridgeError::Busy(_) => ErrorKind::Busy,
            BridgeError::Engine(_) => ErrorKind::Engine,
        }
    }

    /// Message without the location suffix
    pub fn message(&self) -> String {
        match self {
            BridgeError::Script { message, .. } | BridgeError::HostCallback { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }

    /// Script location, for script and host callback errors
    pub fn location(&self) -> Option<&ScriptLocation> {
        match self {
            BridgeError::Script { location, .. } | BridgeError::HostCallback { location, .. } => {
                Some(location)
            }
            _ => None,
        }
    }

    /// Script file name, when known
    pub fn file(&self) -> Option<&str> {
        self.location().and_then(|l| l.file.as_deref())
    }

    /// Script line number, when known
    pub fn line(&self) -> Option<u32> {
        self.location().and_then(|l| l.line)
    }

    /// The original host error of a failed callback
    pub fn host_cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            BridgeError::HostCallback { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }

    /// Whether the wall-clock budget was exceeded
    pub fn is_interrupted(&self) -> bool {
        self.kind() == ErrorKind::Interrupted
    }

    /// Whether the memory budget was exceeded
    pub fn is_out_of_memory(&self) -> bool {
        self.kind() == ErrorKind::OutOfMemory
    }

    pub(crate) fn type_mismatch(expected: &'static str, got: impl Into<String>) -> Self {
        BridgeError::TypeMismatch {
            expected,
            got: got.into(),
        }
    }
}
