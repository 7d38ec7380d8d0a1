//! JS Bridge Core
//!
//! Embeds the QuickJS engine and exposes it to host code:
//! - Value marshaling between host values and engine values
//! - Live array, object, and function views backed by rooted handles
//! - Cascading release of contexts and handles
//! - Wall-clock and memory budgets for script execution
//! - Translation of engine exceptions into typed errors
//! - Interface proxies and reflective wrapping of host objects
//!
//! # Example
//!
//! ```ignore
//! use jsbridge_core::{HostFunction, Runtime};
//!
//! let runtime = Runtime::new()?;
//! let context = runtime.create_context()?;
//! context.set_global("greet", HostFunction::function(|name: String| format!("Hello {}", name)))?;
//! let greeting: String = context.eval_as("greet('world')")?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod array;
pub mod context;
pub mod convert;
pub mod error;
pub mod function;
pub mod governor;
pub mod interface;
pub mod js_function;
pub mod lifecycle;
pub mod object;
pub mod options;
pub mod reflect;
pub mod runtime;
pub mod value;

mod handle;
mod locale;
mod marshal;
mod translate;

pub use array::{JsArray, JsArrayIter};
pub use context::{Context, WeakContext};
pub use convert::FromHostValue;
pub use error::{BridgeError, BridgeResult, ErrorKind, HostError, ScriptLocation};
pub use function::HostFunction;
pub use governor::{BudgetWindow, ExecutionGovernor};
pub use interface::{CapabilitySet, DefaultMethod, InterfaceProxy, MethodSpec};
pub use js_function::JsFunction;
pub use lifecycle::CloseReport;
pub use object::{JsObject, JsObjectEntry};
pub use options::{MemoryUsage, RuntimeOptions, RuntimeStats};
pub use reflect::{create_map_of, Operation, Reflect, ValueKind};
pub use runtime::Runtime;
pub use value::HostValue;
