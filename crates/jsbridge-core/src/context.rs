//! Script contexts
//!
//! A [`Context`] is an isolated global namespace inside a [`Runtime`]. It owns
//! the handle table that roots every engine value the host holds a view of,
//! and it is the entry point for evaluation and invocation.
//!
//! Every engine entry pins the numeric locale, opens a budget window when it
//! can run script code, and reuses the executing engine context when the
//! entry is reentrant (a host callback calling back into the same context).
//!
//! [`Runtime`]: crate::Runtime

use crate::array::JsArray;
use crate::convert::FromHostValue;
use crate::error::{BridgeError, BridgeResult, HostError};
use crate::handle::{Handle, HandleKind};
use crate::interface::{CapabilitySet, InterfaceProxy};
use crate::lifecycle::{CloseReport, Dependents, Release};
use crate::marshal::{to_engine, to_host};
use crate::object::JsObject;
use crate::runtime::RuntimeInner;
use crate::translate::EngineResultExt;
use crate::value::HostValue;
use rquickjs::context::EvalOptions;
use rquickjs::function::{Rest, This};
use rquickjs::{Ctx, Function, Persistent, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

pub(crate) struct ContextInner {
    id: u64,

    /// Rooted engine values, keyed by handle id.
    /// Emptied before the engine context is dropped.
    handles: RefCell<HashMap<u64, Persistent<Value<'static>>>>,

    native: RefCell<Option<rquickjs::Context>>,

    runtime: Rc<RuntimeInner>,

    dependents: Dependents,

    next_handle: Cell<u64>,

    /// Errors raised by host callbacks, waiting to be claimed by the entry
    /// that receives the exception
    host_errors: RefCell<HashMap<u64, HostError>>,

    next_host_error: Cell<u64>,
}

impl ContextInner {
    pub(crate) fn new(id: u64, runtime: Rc<RuntimeInner>, native: rquickjs::Context) -> Rc<Self> {
        let inner = Rc::new(Self {
            id,
            handles: RefCell::new(HashMap::new()),
            native: RefCell::new(Some(native)),
            runtime,
            dependents: Dependents::default(),
            next_handle: Cell::new(1),
            host_errors: RefCell::new(HashMap::new()),
            next_host_error: Cell::new(1),
        });
        let dependent: Weak<ContextInner> = Rc::downgrade(&inner);
        inner.runtime.add_context(id, dependent);
        inner
    }

    pub(crate) fn runtime(&self) -> &RuntimeInner {
        &self.runtime
    }

    fn is_closed(&self) -> bool {
        self.native.borrow().is_none()
    }

    /// Run `f` inside the engine context.
    ///
    /// `governed` entries open a budget window. Reentrant entries run on the
    /// already executing engine context instead of locking it again.
    pub(crate) fn enter<R, F>(self: &Rc<Self>, governed: bool, f: F) -> BridgeResult<R>
    where
        F: for<'js> FnOnce(&Ctx<'js>) -> BridgeResult<R>,
    {
        let runtime = &self.runtime;
        let _locale = runtime.locale.enter();
        let _window = governed.then(|| runtime.governor.enter());

        if let Some(ctx) = runtime.active_ctx(self.id)? {
            return f(&ctx);
        }

        let native = self
            .native
            .borrow()
            .clone()
            .ok_or(BridgeError::InvalidHandle("context"))?;
        let result = native.with(|ctx| {
            let _active = runtime.activate(self.id, &ctx);
            f(&ctx)
        });
        drop(native);

        self.discard_host_errors();
        runtime.flush_graveyard();
        result
    }

    /// Root a value and return its handle id
    pub(crate) fn root<'js>(&self, ctx: &Ctx<'js>, value: Value<'js>) -> BridgeResult<u64> {
        if self.is_closed() {
            return Err(BridgeError::InvalidHandle("context"));
        }
        let id = self.next_handle.get();
        self.next_handle.set(id + 1);
        self.handles
            .try_borrow_mut()
            .map_err(|_| BridgeError::Busy("context"))?
            .insert(id, Persistent::save(ctx, value));
        Ok(id)
    }

    pub(crate) fn add_dependent(&self, id: u64, dependent: Weak<dyn Release>) {
        self.dependents.register(id, dependent);
    }

    /// The rooted value for a handle id
    pub(crate) fn restore<'js>(&self, ctx: &Ctx<'js>, id: u64) -> BridgeResult<Value<'js>> {
        let persistent = self
            .handles
            .borrow()
            .get(&id)
            .cloned()
            .ok_or(BridgeError::InvalidHandle("handle"))?;
        persistent.restore(ctx).or_translate(ctx, self)
    }

    /// Drop the root for a handle id
    pub(crate) fn forget(&self, id: u64) -> BridgeResult<()> {
        self.dependents.unregister(id);
        let removed = self
            .handles
            .try_borrow_mut()
            .map_err(|_| BridgeError::Busy("context"))?
            .remove(&id);
        drop(removed);
        Ok(())
    }

    pub(crate) fn handle_count(&self) -> usize {
        self.handles.borrow().len()
    }

    pub(crate) fn park_host_error(&self, error: HostError) -> u64 {
        let id = self.next_host_error.get();
        self.next_host_error.set(id + 1);
        self.host_errors.borrow_mut().insert(id, error);
        id
    }

    pub(crate) fn take_host_error(&self, id: u64) -> Option<HostError> {
        self.host_errors.borrow_mut().remove(&id)
    }

    /// Drop host errors whose exceptions were caught by the script
    fn discard_host_errors(&self) {
        let unclaimed = std::mem::take(&mut *self.host_errors.borrow_mut());
        for (id, error) in unclaimed {
            log::debug!("context {}: host error {} was handled by the script: {}", self.id, id, error);
        }
    }

    fn close(&self) -> BridgeResult<CloseReport> {
        if self.is_closed() {
            return Ok(CloseReport::default());
        }
        if self.runtime.is_active_context(self.id) {
            return Err(BridgeError::Busy("context"));
        }

        let report = self.dependents.release_all(&format!("context {}", self.id));
        let handles = std::mem::take(
            &mut *self
                .handles
                .try_borrow_mut()
                .map_err(|_| BridgeError::Busy("context"))?,
        );
        drop(handles);
        self.host_errors.borrow_mut().clear();

        let native = self.native.borrow_mut().take();
        if let Some(native) = native {
            self.runtime.bury(native);
        }
        self.runtime.remove_context(self.id);
        log::debug!("context {} closed", self.id);
        Ok(report)
    }
}

impl Release for ContextInner {
    fn release(&self) -> BridgeResult<()> {
        self.close().map(|_| ())
    }

    fn describe(&self) -> String {
        format!("context {}", self.id)
    }

    fn dependent_count(&self) -> usize {
        self.handle_count()
    }
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("failed to release dropped context {}: {}", self.id, err);
        }
    }
}

/// Resolve a dotted path from the global object.
///
/// Returns the containing object (used as `this`) and the value.
fn resolve_path<'js>(
    ctx: &Ctx<'js>,
    context: &ContextInner,
    path: &str,
) -> BridgeResult<(Value<'js>, Value<'js>)> {
    let mut this = ctx.globals().into_value();
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let object = this
            .as_object()
            .ok_or_else(|| BridgeError::NotFound(path.to_string()))?;
        let value: Value<'js> = object.get(segment).or_translate(ctx, context)?;
        if value.is_undefined() {
            return Err(BridgeError::NotFound(path.to_string()));
        }
        if segments.peek().is_none() {
            return Ok((this, value));
        }
        this = value;
    }
    Err(BridgeError::NotFound(path.to_string()))
}

fn eval_options() -> EvalOptions {
    let mut options = EvalOptions::default();
    options.strict = false;
    options
}

/// Isolated script namespace
///
/// Cloning a `Context` yields another reference to the same namespace.
///
/// A host callback bound inside a context is owned by that context. A callback
/// that captures a `Context` clone therefore keeps its own context alive, and
/// dropping every other reference no longer releases it. Callbacks that call
/// back into their context should capture a [`WeakContext`] from
/// [`Context::downgrade`] instead.
#[derive(Clone)]
pub struct Context {
    inner: Rc<ContextInner>,
}

impl Context {
    pub(crate) fn from_inner(inner: Rc<ContextInner>) -> Self {
        Self { inner }
    }

    /// Numeric id, unique within the owning runtime
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Non-owning reference, for capture by host callbacks
    pub fn downgrade(&self) -> WeakContext {
        WeakContext {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Bind a host value to a global name
    pub fn set_global(&self, name: &str, value: impl Into<HostValue>) -> BridgeResult<()> {
        let value = value.into();
        let inner = &self.inner;
        inner.enter(true, |ctx| {
            let value = to_engine(ctx, inner, &value)?;
            ctx.globals().set(name, value).or_translate(ctx, inner)
        })
    }

    /// Read a global; missing globals read as `Null`
    pub fn get_global(&self, name: &str) -> BridgeResult<HostValue> {
        let inner = &self.inner;
        inner.enter(true, |ctx| {
            let value: Value<'_> = ctx.globals().get(name).or_translate(ctx, inner)?;
            to_host(ctx, inner, value)
        })
    }

    /// Read a global as a typed value
    pub fn get_global_as<T: FromHostValue>(&self, name: &str) -> BridgeResult<T> {
        T::from_host(self.get_global(name)?)
    }

    /// Evaluate script source
    ///
    /// # Arguments
    /// * `source` - Script text
    ///
    /// # Returns
    /// * `Ok(HostValue)` - Completion value of the script
    /// * `Err(BridgeError)` - Script error, host callback error, interrupt, or
    ///   out-of-memory
    pub fn eval(&self, source: &str) -> BridgeResult<HostValue> {
        self.eval_bytes(source.as_bytes().to_vec())
    }

    /// Evaluate script source that is already encoded as UTF-8 bytes.
    ///
    /// The buffer is handed to the engine without another copy.
    pub fn eval_bytes(&self, source: Vec<u8>) -> BridgeResult<HostValue> {
        let inner = &self.inner;
        inner.enter(true, move |ctx| {
            let value: Value<'_> = ctx
                .eval_with_options(source, eval_options())
                .or_translate(ctx, inner)?;
            to_host(ctx, inner, value)
        })
    }

    /// Evaluate and convert the result
    pub fn eval_as<T: FromHostValue>(&self, source: &str) -> BridgeResult<T> {
        T::from_host(self.eval(source)?)
    }

    /// Call a function bound under `name`.
    ///
    /// `name` may be a dotted path (`"math.add"`); the containing object is
    /// passed as `this`. Works for script functions and host callbacks alike.
    pub fn invoke(&self, name: &str, args: &[HostValue]) -> BridgeResult<HostValue> {
        let inner = &self.inner;
        inner.enter(true, |ctx| {
            let (this, target) = resolve_path(ctx, inner, name)?;
            let function: Function<'_> = target
                .into_function()
                .ok_or_else(|| BridgeError::NotCallable(name.to_string()))?;
            let args = args
                .iter()
                .map(|arg| to_engine(ctx, inner, arg))
                .collect::<BridgeResult<Vec<_>>>()?;
            let result: Value<'_> = function
                .call((This(this), Rest(args)))
                .or_translate(ctx, inner)?;
            to_host(ctx, inner, result)
        })
    }

    /// Call a function and convert the result
    pub fn invoke_as<T: FromHostValue>(&self, name: &str, args: &[HostValue]) -> BridgeResult<T> {
        T::from_host(self.invoke(name, args)?)
    }

    /// Proxy whose methods forward to `invoke("namespace.method", args)`
    ///
    /// # Arguments
    /// * `namespace` - Global object holding the methods, or `None` for globals
    /// * `capabilities` - Method names, arities, and host-side defaults
    pub fn get_interface(&self, namespace: Option<&str>, capabilities: CapabilitySet) -> InterfaceProxy {
        InterfaceProxy::new(self.clone(), namespace.map(str::to_string), capabilities)
    }

    /// Create an empty engine array
    pub fn new_array(&self) -> BridgeResult<JsArray> {
        let inner = &self.inner;
        inner.enter(false, |ctx| {
            let array = rquickjs::Array::new(ctx.clone()).or_translate(ctx, inner)?;
            let handle = Handle::register(inner, ctx, array.into_value(), HandleKind::Array)?;
            Ok(JsArray::new(handle))
        })
    }

    /// Create an empty engine object
    pub fn new_object(&self) -> BridgeResult<JsObject> {
        let inner = &self.inner;
        inner.enter(false, |ctx| {
            let object = rquickjs::Object::new(ctx.clone()).or_translate(ctx, inner)?;
            let handle = Handle::register(inner, ctx, object.into_value(), HandleKind::Object)?;
            Ok(JsObject::new(handle))
        })
    }

    /// Number of engine values rooted for the host
    pub fn handle_count(&self) -> usize {
        self.inner.handle_count()
    }

    /// Release every handle produced by this context, then the context.
    ///
    /// Closing twice is a no-op. Fails with `Busy` when called from a host
    /// callback running inside this context.
    pub fn close(&self) -> BridgeResult<CloseReport> {
        self.inner.close()
    }

    /// Whether the context or its runtime has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Non-owning reference to a [`Context`]
#[derive(Clone, Default)]
pub struct WeakContext {
    inner: Weak<ContextInner>,
}

impl WeakContext {
    /// The context, if it has not been dropped
    pub fn upgrade(&self) -> Option<Context> {
        self.inner.upgrade().map(Context::from_inner)
    }

    /// The context, failing with `InvalidHandle` once it has been dropped
    pub fn context(&self) -> BridgeResult<Context> {
        self.upgrade().ok_or(BridgeError::InvalidHandle("context"))
    }
}

impl fmt::Debug for WeakContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakContext")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.inner.id)
            .field("closed", &self.is_closed())
            .field("handles", &self.handle_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Runtime;

    fn context() -> (Runtime, Context) {
        let runtime = Runtime::new().unwrap();
        let context = runtime.create_context().unwrap();
        (runtime, context)
    }

    #[test]
    fn test_globals_round_trip() {
        let (_runtime, context) = context();
        context.set_global("a", 3).unwrap();
        assert_eq!(context.get_global("a").unwrap(), HostValue::Int(3));
        assert_eq!(context.get_global("missing").unwrap(), HostValue::Null);
    }

    #[test]
    fn test_weak_context_does_not_keep_context_alive() {
        let (_runtime, context) = context();
        let weak = context.downgrade();
        assert_eq!(weak.context().unwrap().id(), context.id());
        drop(context);
        assert!(weak.upgrade().is_none());
        assert!(matches!(weak.context(), Err(BridgeError::InvalidHandle(_))));
    }

    #[test]
    fn test_eval_bytes() {
        let (_runtime, context) = context();
        let result = context.eval_bytes(b"3 + 4 + 7".to_vec()).unwrap();
        assert_eq!(result, HostValue::Int(14));
    }

    #[test]
    fn test_sloppy_mode_assignment_creates_global() {
        let (_runtime, context) = context();
        context.eval("counter = 1; counter += 1").unwrap();
        assert_eq!(context.get_global("counter").unwrap(), HostValue::Int(2));
    }

    #[test]
    fn test_invoke_dotted_path_binds_this() {
        let (_runtime, context) = context();
        context
            .eval("var tc = { base: 10, add: function(x) { return this.base + x; } };")
            .unwrap();
        let result = context.invoke("tc.add", &[HostValue::Int(5)]).unwrap();
        assert_eq!(result, HostValue::Int(15));
    }

    #[test]
    fn test_invoke_missing_and_non_callable() {
        let (_runtime, context) = context();
        context.eval("var n = 1;").unwrap();
        assert!(matches!(
            context.invoke("nothing", &[]).unwrap_err(),
            BridgeError::NotFound(_)
        ));
        assert!(matches!(
            context.invoke("n", &[]).unwrap_err(),
            BridgeError::NotCallable(_)
        ));
        assert!(matches!(
            context.invoke("n.x.y", &[]).unwrap_err(),
            BridgeError::NotFound(_)
        ));
    }

    #[test]
    fn test_handles_are_tracked_and_released() {
        let (_runtime, context) = context();
        let array = context.eval("[1, 2, 3]").unwrap();
        let object = context.new_object().unwrap();
        assert_eq!(context.handle_count(), 2);

        drop(array);
        assert_eq!(context.handle_count(), 1);
        object.release().unwrap();
        assert_eq!(context.handle_count(), 0);
    }

    #[test]
    fn test_closed_context_fails_fast() {
        let (_runtime, context) = context();
        let array = context.new_array().unwrap();
        let report = context.close().unwrap();
        assert_eq!(report.released, 1);
        assert!(context.is_closed());
        assert!(matches!(
            context.eval("1").unwrap_err(),
            BridgeError::InvalidHandle("context")
        ));
        assert!(matches!(array.len().unwrap_err(), BridgeError::InvalidHandle(_)));
        assert!(context.close().unwrap().is_clean());
    }
}
