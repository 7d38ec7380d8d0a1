//! JS Bridge Script Engine
//!
//! A script-engine facade over `jsbridge-core`:
//! - [`ScriptEngine`] evaluates scripts with scoped [`Bindings`]
//! - [`ScriptEngineFactory`] describes the engine and creates instances
//! - [`TIMEOUT`] and [`MEMORY_LIMIT`] attributes configure the runtime

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bindings;
pub mod engine;
pub mod error;
pub mod factory;

pub use bindings::{Bindings, ScopeKind, ScriptContext};
pub use engine::{ScriptEngine, MEMORY_LIMIT, TIMEOUT};
pub use error::{ScriptError, ScriptResult};
pub use factory::ScriptEngineFactory;
