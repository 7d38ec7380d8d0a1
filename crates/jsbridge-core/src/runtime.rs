//! Engine runtime: the root of the ownership tree
//!
//! A [`Runtime`] owns one engine instance with its allocator, memory budget,
//! stack limit, and interrupt hook. Contexts created from it are registered
//! as dependents and released when the runtime closes.
//!
//! A runtime and everything derived from it is single-threaded (`!Send`).
//! Hosts that need cross-thread access must confine the runtime to one
//! thread and send work to it.

use crate::context::{Context, ContextInner};
use crate::error::{BridgeError, BridgeResult};
use crate::governor::ExecutionGovernor;
use crate::lifecycle::{CloseReport, Dependents, Release};
use crate::locale::NumericLocale;
use crate::options::{MemoryUsage, RuntimeOptions, RuntimeStats};
use rquickjs::Ctx;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct RuntimeInner {
    /// Contexts released while the engine was busy, freed on the next exit
    graveyard: RefCell<Vec<rquickjs::Context>>,

    native: RefCell<Option<rquickjs::Runtime>>,

    pub(crate) governor: Arc<ExecutionGovernor>,

    pub(crate) locale: NumericLocale,

    memory_limit: Cell<Option<usize>>,

    contexts: Dependents,

    next_context: Cell<u64>,

    /// Engine contexts currently executing, innermost last
    active: RefCell<Vec<(u64, Ctx<'static>)>>,
}

impl RuntimeInner {
    fn new(options: &RuntimeOptions) -> BridgeResult<Self> {
        let native = rquickjs::Runtime::new()?;
        if let Some(bytes) = options.memory_limit {
            native.set_memory_limit(bytes);
        }
        if let Some(bytes) = options.max_stack_size {
            native.set_max_stack_size(bytes);
        }

        let governor = Arc::new(ExecutionGovernor::new(options.script_runtime_limit));
        let poll = Arc::clone(&governor);
        native.set_interrupt_handler(Some(Box::new(move || poll.should_interrupt())));

        Ok(Self {
            graveyard: RefCell::new(Vec::new()),
            native: RefCell::new(Some(native)),
            governor,
            locale: NumericLocale::new(),
            memory_limit: Cell::new(options.memory_limit),
            contexts: Dependents::default(),
            next_context: Cell::new(1),
            active: RefCell::new(Vec::new()),
        })
    }

    pub(crate) fn memory_limit(&self) -> Option<usize> {
        self.memory_limit.get()
    }

    fn is_closed(&self) -> bool {
        self.native.borrow().is_none()
    }

    pub(crate) fn is_active(&self) -> bool {
        !self.active.borrow().is_empty()
    }

    pub(crate) fn is_active_context(&self, context: u64) -> bool {
        self.active.borrow().iter().any(|(id, _)| *id == context)
    }

    /// Run `f` on the native runtime while no script is executing
    fn with_native<R>(&self, f: impl FnOnce(&rquickjs::Runtime) -> R) -> BridgeResult<R> {
        if self.is_active() {
            return Err(BridgeError::Busy("runtime"));
        }
        let native = self.native.borrow();
        let native = native.as_ref().ok_or(BridgeError::InvalidHandle("runtime"))?;
        Ok(f(native))
    }

    /// The executing engine context for `context`, if this is a reentrant entry.
    ///
    /// Entering a different context while one is executing is refused: the
    /// engine runtime is locked for the duration of the outer entry.
    pub(crate) fn active_ctx(&self, context: u64) -> BridgeResult<Option<Ctx<'static>>> {
        match self.active.borrow().last() {
            None => Ok(None),
            Some((id, ctx)) if *id == context => Ok(Some(ctx.clone())),
            Some(_) => Err(BridgeError::Busy("runtime")),
        }
    }

    /// Record `ctx` as executing until the guard drops
    pub(crate) fn activate<'a>(&'a self, context: u64, ctx: &Ctx<'_>) -> ActiveGuard<'a> {
        // SAFETY: the entry only lives on the active stack while the guard is
        // alive, and the guard is dropped inside the `Context::with` closure
        // that produced `ctx`. Reentrant users receive the context through a
        // higher-ranked closure, so no value derived from it escapes.
        let ctx: Ctx<'static> = unsafe { std::mem::transmute::<Ctx<'_>, Ctx<'static>>(ctx.clone()) };
        self.active.borrow_mut().push((context, ctx));
        ActiveGuard { runtime: self }
    }

    /// Free a released engine context, deferring while the engine is busy
    pub(crate) fn bury(&self, context: rquickjs::Context) {
        if self.is_active() {
            self.graveyard.borrow_mut().push(context);
        } else {
            drop(context);
        }
    }

    pub(crate) fn flush_graveyard(&self) {
        if !self.is_active() {
            let buried = std::mem::take(&mut *self.graveyard.borrow_mut());
            drop(buried);
        }
    }

    fn next_context_id(&self) -> u64 {
        let id = self.next_context.get();
        self.next_context.set(id + 1);
        id
    }

    pub(crate) fn add_context(&self, id: u64, context: Weak<dyn Release>) {
        self.contexts.register(id, context);
    }

    pub(crate) fn remove_context(&self, id: u64) {
        self.contexts.unregister(id);
    }

    fn close(&self) -> BridgeResult<CloseReport> {
        if self.is_closed() {
            return Ok(CloseReport::default());
        }
        if self.is_active() {
            return Err(BridgeError::Busy("runtime"));
        }
        let report = self.contexts.release_all("runtime");
        self.graveyard.borrow_mut().clear();
        let native = self.native.borrow_mut().take();
        drop(native);
        log::debug!("runtime closed");
        Ok(report)
    }
}

impl Drop for RuntimeInner {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("failed to release dropped runtime: {}", err);
        }
    }
}

/// Pops the active engine context on drop
pub(crate) struct ActiveGuard<'a> {
    runtime: &'a RuntimeInner,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.runtime.active.borrow_mut().pop();
    }
}

/// Engine runtime
///
/// # Example
/// ```ignore
/// use jsbridge_core::{HostValue, Runtime};
/// use std::time::Duration;
///
/// let runtime = Runtime::new()?;
/// runtime.with_script_runtime_limit(Duration::from_secs(1));
/// let context = runtime.create_context()?;
/// context.set_global("a", 3)?;
/// assert_eq!(context.eval("a + 4")?, HostValue::Int(7));
/// runtime.close()?;
/// ```
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime without limits
    pub fn new() -> BridgeResult<Self> {
        Self::with_options(RuntimeOptions::default())
    }

    /// Create a runtime with the given limits
    ///
    /// # Arguments
    /// * `options` - Memory budget, stack size, and wall-clock budget
    ///
    /// # Returns
    /// * `Ok(Runtime)` - Runtime with the interrupt hook installed
    /// * `Err(BridgeError)` - The engine could not be created
    pub fn with_options(options: RuntimeOptions) -> BridgeResult<Self> {
        let inner = RuntimeInner::new(&options)?;
        log::debug!(
            "runtime created (memory limit {:?}, stack size {:?}, runtime limit {:?})",
            options.memory_limit,
            options.max_stack_size,
            options.script_runtime_limit
        );
        Ok(Self {
            inner: Rc::new(inner),
        })
    }

    /// Configure the wall-clock budget for script execution.
    ///
    /// Applies to every outermost `eval`, `invoke`, and function call made
    /// after this point.
    pub fn with_script_runtime_limit(&self, limit: Duration) -> &Self {
        self.inner.governor.set_limit(Some(limit));
        self
    }

    /// Remove or replace the wall-clock budget
    pub fn set_script_runtime_limit(&self, limit: Option<Duration>) {
        self.inner.governor.set_limit(limit);
    }

    /// Configured wall-clock budget
    pub fn script_runtime_limit(&self) -> Option<Duration> {
        self.inner.governor.limit()
    }

    /// Configure the allocator budget in bytes
    pub fn with_memory_limit(&self, bytes: usize) -> BridgeResult<&Self> {
        self.inner.with_native(|rt| rt.set_memory_limit(bytes))?;
        self.inner.memory_limit.set(Some(bytes));
        Ok(self)
    }

    /// Configured allocator budget
    pub fn memory_limit(&self) -> Option<usize> {
        self.inner.memory_limit()
    }

    /// Create a context and register it as a dependent of this runtime
    pub fn create_context(&self) -> BridgeResult<Context> {
        let native = self.inner.with_native(rquickjs::Context::full)??;
        let id = self.inner.next_context_id();
        let inner = ContextInner::new(id, Rc::clone(&self.inner), native);
        log::debug!("context {} created", id);
        Ok(Context::from_inner(inner))
    }

    /// Release every context, then the engine itself.
    ///
    /// Failures releasing individual contexts are logged and collected in the
    /// report. Closing twice is a no-op. Fails with `Busy` when called from a
    /// host callback while a script is executing.
    pub fn close(&self) -> BridgeResult<CloseReport> {
        self.inner.close()
    }

    /// Whether the runtime has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Allocator statistics
    pub fn memory_usage(&self) -> BridgeResult<MemoryUsage> {
        self.inner.with_native(|rt| {
            let usage = rt.memory_usage();
            let count = |v: i64| u64::try_from(v).unwrap_or(0);
            MemoryUsage {
                malloc_size: count(usage.malloc_size),
                malloc_limit: count(usage.malloc_limit),
                memory_used_size: count(usage.memory_used_size),
                object_count: count(usage.obj_count),
                string_count: count(usage.str_count),
                function_count: count(usage.js_func_count),
                array_count: count(usage.array_count),
            }
        })
    }

    /// Run the engine's cycle collector
    pub fn run_gc(&self) -> BridgeResult<()> {
        self.inner.with_native(|rt| rt.run_gc())
    }

    /// Bookkeeping snapshot
    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            live_contexts: self.inner.contexts.live(),
            live_handles: self.inner.contexts.nested(),
            running: self.inner.governor.is_running(),
            script_runtime_limit: self.inner.governor.limit(),
            memory_limit: self.inner.memory_limit(),
        }
    }

    /// The governor enforcing this runtime's wall-clock budget.
    ///
    /// The governor is thread-safe, so a watchdog thread may observe
    /// `is_running` and `elapsed` while a script executes.
    pub fn governor(&self) -> Arc<ExecutionGovernor> {
        Arc::clone(&self.inner.governor)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("closed", &self.is_closed())
            .field("memory_limit", &self.memory_limit())
            .field("script_runtime_limit", &self.script_runtime_limit())
            .finish()
    }
}
