//! Script engine error types.

use jsbridge_core::{BridgeError, ErrorKind, ScriptLocation};

/// Errors raised by the script engine facade.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Failure inside the bridge: script exception, interrupt, and so on
    #[error("{0}")]
    Bridge(#[from] BridgeError),

    /// Reading script source failed
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// An engine attribute had a value of the wrong type
    #[error("Invalid value for attribute {name}: {reason}")]
    InvalidAttribute {
        /// Attribute key
        name: String,
        /// What was wrong with the value
        reason: String,
    },
}

impl ScriptError {
    /// Bridge error kind, if the failure came from the bridge
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ScriptError::Bridge(err) => Some(err.kind()),
            _ => None,
        }
    }

    /// Script location, when known
    pub fn location(&self) -> Option<&ScriptLocation> {
        match self {
            ScriptError::Bridge(err) => err.location(),
            _ => None,
        }
    }

    /// Script line number, when known
    pub fn line(&self) -> Option<u32> {
        match self {
            ScriptError::Bridge(err) => err.line(),
            _ => None,
        }
    }

    /// Script file name, when known
    pub fn file(&self) -> Option<&str> {
        match self {
            ScriptError::Bridge(err) => err.file(),
            _ => None,
        }
    }
}

/// Result type for the script engine facade
pub type ScriptResult<T> = Result<T, ScriptError>;
