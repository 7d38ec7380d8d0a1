//! Script engine facade over one runtime.
//!
//! Every `eval` runs in a fresh context: global-scope bindings are copied in
//! first, then engine-scope bindings, so engine values shadow global ones.
//! After a successful evaluation, engine-scope names the script reassigned
//! are copied back. The context of the most recent evaluation is kept alive
//! so returned views stay usable and so `invoke_function` and `get_interface`
//! can reach the functions the script defined.
//!
//! # Example
//!
//! ```rust,ignore
//! use jsbridge_core::HostValue;
//! use jsbridge_script::{ScriptEngine, TIMEOUT};
//!
//! let mut engine = ScriptEngine::new()?;
//! engine.put(TIMEOUT, 1000)?;
//! engine.put("x", 20)?;
//! engine.eval("x = x + 1; function twice(v) { return v * 2; }")?;
//! assert_eq!(engine.get("x"), Some(&HostValue::Int(21)));
//! let value = engine.invoke_function("twice", &[HostValue::Int(21)])?;
//! ```

use crate::bindings::{Bindings, ScopeKind, ScriptContext};
use crate::error::{ScriptError, ScriptResult};
use crate::factory::ScriptEngineFactory;
use jsbridge_core::{CapabilitySet, Context, HostValue, InterfaceProxy, Runtime};
use std::io::Read;
use std::time::Duration;

/// Engine attribute: wall-clock budget per evaluation in milliseconds (0 removes it)
pub const TIMEOUT: &str = "jsbridge.timeout";

/// Engine attribute: allocator budget in bytes
pub const MEMORY_LIMIT: &str = "jsbridge.memoryLimit";

fn is_attribute(name: &str) -> bool {
    name == TIMEOUT || name == MEMORY_LIMIT
}

fn non_negative(name: &str, value: &HostValue) -> ScriptResult<u64> {
    let invalid = |reason: &str| ScriptError::InvalidAttribute {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    match value {
        HostValue::Int(i) => u64::try_from(*i).map_err(|_| invalid("must not be negative")),
        HostValue::Float(f) if f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64 => Ok(*f as u64),
        HostValue::Float(_) => Err(invalid("must be a non-negative whole number")),
        HostValue::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| invalid("must be a non-negative whole number")),
        other => Err(invalid(&format!("expected a number, got {}", other.type_name()))),
    }
}

/// Plain copy of `value` that can be bound in another context.
///
/// Returns `None` for values holding script functions or views, which belong to the
/// context that produced them.
fn portable(value: HostValue) -> Option<HostValue> {
    fn holds_handle(value: &HostValue) -> bool {
        match value {
            HostValue::Function(_) | HostValue::Array(_) | HostValue::Object(_) => true,
            HostValue::List(items) => items.iter().any(holds_handle),
            HostValue::Map(entries) => entries.values().any(holds_handle),
            _ => false,
        }
    }
    let copy = value.snapshot().ok()?;
    (!holds_handle(&copy)).then_some(copy)
}

/// Script engine backed by one QuickJS runtime
pub struct ScriptEngine {
    factory: ScriptEngineFactory,
    runtime: Runtime,
    context: ScriptContext,
    last: Option<Context>,
}

impl ScriptEngine {
    /// Create an engine with a new unlimited runtime
    pub fn new() -> ScriptResult<Self> {
        Self::with_factory(ScriptEngineFactory::new())
    }

    pub(crate) fn with_factory(factory: ScriptEngineFactory) -> ScriptResult<Self> {
        Ok(Self::with_runtime(factory, Runtime::new()?))
    }

    /// Create an engine on an existing runtime, keeping its limits
    pub fn with_runtime(factory: ScriptEngineFactory, runtime: Runtime) -> Self {
        Self {
            factory,
            runtime,
            context: ScriptContext::new(),
            last: None,
        }
    }

    /// Evaluate `source` with the engine's bindings
    pub fn eval(&mut self, source: &str) -> ScriptResult<HostValue> {
        self.eval_with_bindings(source, &Bindings::new())
    }

    /// Evaluate `source` with `extra` bound on top of the engine's bindings.
    ///
    /// `extra` is not updated from the script.
    pub fn eval_with_bindings(&mut self, source: &str, extra: &Bindings) -> ScriptResult<HostValue> {
        self.apply_attributes()?;
        let context = self.fresh_context()?;
        bind_all(&context, extra)?;

        let value = context.eval(source)?;
        self.copy_back(&context);
        self.last = Some(context);
        Ok(value)
    }

    /// Read all of `reader` and evaluate it
    pub fn eval_reader(&mut self, mut reader: impl Read) -> ScriptResult<HostValue> {
        let mut source = String::new();
        reader.read_to_string(&mut source)?;
        self.eval(&source)
    }

    /// Bind a value in the engine scope.
    ///
    /// [`TIMEOUT`] and [`MEMORY_LIMIT`] reconfigure the runtime immediately.
    pub fn put(&mut self, name: &str, value: impl Into<HostValue>) -> ScriptResult<()> {
        let value = value.into();
        self.apply_attribute(name, &value)?;
        self.context.set_attribute(name, value, ScopeKind::Engine);
        Ok(())
    }

    /// Value bound in the engine scope
    pub fn get(&self, name: &str) -> Option<&HostValue> {
        self.context.attribute_in(name, ScopeKind::Engine)
    }

    /// Bindings of a scope
    pub fn bindings(&self, scope: ScopeKind) -> &Bindings {
        self.context.bindings(scope)
    }

    /// Mutable bindings of a scope
    pub fn bindings_mut(&mut self, scope: ScopeKind) -> &mut Bindings {
        self.context.bindings_mut(scope)
    }

    /// Replace the bindings of a scope
    pub fn set_bindings(&mut self, bindings: Bindings, scope: ScopeKind) {
        self.context.set_bindings(bindings, scope);
    }

    /// New empty bindings
    pub fn create_bindings(&self) -> Bindings {
        Bindings::new()
    }

    /// The engine's scoped bindings
    pub fn context(&self) -> &ScriptContext {
        &self.context
    }

    /// Replace the scoped bindings
    pub fn set_context(&mut self, context: ScriptContext) {
        self.context = context;
    }

    /// The factory that describes this engine
    pub fn factory(&self) -> &ScriptEngineFactory {
        &self.factory
    }

    /// The underlying runtime
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Call a global function defined by the last evaluation.
    ///
    /// Without a previous evaluation a fresh context holding only the
    /// bindings is used.
    pub fn invoke_function(&mut self, name: &str, args: &[HostValue]) -> ScriptResult<HostValue> {
        let context = self.current_context()?;
        Ok(context.invoke(name, args)?)
    }

    /// Proxy over functions defined by the last evaluation.
    ///
    /// # Arguments
    /// * `namespace` - Global object holding the methods, or `None` for globals
    /// * `capabilities` - Methods the proxy exposes
    pub fn get_interface(
        &mut self,
        namespace: Option<&str>,
        capabilities: CapabilitySet,
    ) -> ScriptResult<InterfaceProxy> {
        let context = self.current_context()?;
        Ok(context.get_interface(namespace, capabilities))
    }

    fn current_context(&mut self) -> ScriptResult<Context> {
        if let Some(context) = &self.last {
            if !context.is_closed() {
                return Ok(context.clone());
            }
        }
        self.apply_attributes()?;
        let context = self.fresh_context()?;
        self.last = Some(context.clone());
        Ok(context)
    }

    fn fresh_context(&self) -> ScriptResult<Context> {
        let context = self.runtime.create_context()?;
        for scope in ScopeKind::ALL.iter().rev() {
            bind_all(&context, self.context.bindings(*scope))?;
        }
        log::debug!(
            "context {} prepared with {} engine and {} global bindings",
            context.id(),
            self.context.bindings(ScopeKind::Engine).len(),
            self.context.bindings(ScopeKind::Global).len()
        );
        Ok(context)
    }

    fn apply_attributes(&self) -> ScriptResult<()> {
        for name in [TIMEOUT, MEMORY_LIMIT] {
            if let Some(value) = self.context.attribute(name) {
                self.apply_attribute(name, value)?;
            }
        }
        Ok(())
    }

    fn apply_attribute(&self, name: &str, value: &HostValue) -> ScriptResult<()> {
        match name {
            TIMEOUT => {
                let millis = non_negative(name, value)?;
                let limit = (millis > 0).then(|| Duration::from_millis(millis));
                self.runtime.set_script_runtime_limit(limit);
            }
            MEMORY_LIMIT => {
                let bytes = non_negative(name, value)?;
                let bytes = usize::try_from(bytes)
                    .ok()
                    .filter(|b| *b > 0)
                    .ok_or_else(|| ScriptError::InvalidAttribute {
                        name: name.to_string(),
                        reason: "must be a positive byte count".to_string(),
                    })?;
                self.runtime.with_memory_limit(bytes)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Update engine-scope bindings the script reassigned
    fn copy_back(&mut self, context: &Context) {
        let names: Vec<String> = self
            .context
            .bindings(ScopeKind::Engine)
            .keys()
            .filter(|name| !is_attribute(name))
            .map(str::to_string)
            .collect();
        let bindings = self.context.bindings_mut(ScopeKind::Engine);
        for name in names {
            let current = match context.get_global(&name) {
                Ok(value) => value,
                Err(err) => {
                    log::debug!("cannot read back binding '{}': {}", name, err);
                    continue;
                }
            };
            let Some(current) = portable(current) else {
                continue;
            };
            if bindings.get(&name) != Some(&current) {
                bindings.insert(&name, current);
            }
        }
    }
}

fn bind_all(context: &Context, bindings: &Bindings) -> ScriptResult<()> {
    for (name, value) in bindings {
        if is_attribute(name) {
            continue;
        }
        context.set_global(name, value.clone())?;
    }
    Ok(())
}
