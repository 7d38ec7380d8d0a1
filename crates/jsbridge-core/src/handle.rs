//! Handles to engine values held by the host
//!
//! The engine value itself stays in the owning context's handle table, rooted
//! by a [`Persistent`](rquickjs::Persistent). The host side only holds the
//! table id. An id of 0 means the handle has been released; every operation
//! checks it before touching the engine.

use crate::context::ContextInner;
use crate::error::{BridgeError, BridgeResult};
use crate::lifecycle::Release;
use rquickjs::{Ctx, Value};
use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

/// What a handle refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandleKind {
    Function,
    Array,
    Object,
}

impl HandleKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            HandleKind::Function => "function",
            HandleKind::Array => "array",
            HandleKind::Object => "object",
        }
    }
}

pub(crate) struct HandleCell {
    /// Table id; 0 once released
    id: Cell<u64>,
    kind: HandleKind,
    context: Rc<ContextInner>,
}

impl Release for HandleCell {
    fn release(&self) -> BridgeResult<()> {
        let id = self.id.replace(0);
        if id == 0 {
            return Ok(());
        }
        self.context.forget(id)
    }

    fn describe(&self) -> String {
        format!("{} handle", self.kind.as_str())
    }
}

impl Drop for HandleCell {
    fn drop(&mut self) {
        if let Err(err) = Release::release(self) {
            log::warn!("failed to release dropped {} handle: {}", self.kind.as_str(), err);
        }
    }
}

/// Shared reference to one handle table entry.
///
/// Clones refer to the same entry; releasing through any clone releases it
/// for all of them.
#[derive(Clone)]
pub(crate) struct Handle(Rc<HandleCell>);

impl Handle {
    /// Root `value` in the context's table and register the handle as a
    /// dependent of the context
    pub(crate) fn register<'js>(
        context: &Rc<ContextInner>,
        ctx: &Ctx<'js>,
        value: Value<'js>,
        kind: HandleKind,
    ) -> BridgeResult<Self> {
        let id = context.root(ctx, value)?;
        let cell = Rc::new(HandleCell {
            id: Cell::new(id),
            kind,
            context: Rc::clone(context),
        });
        let dependent: Weak<HandleCell> = Rc::downgrade(&cell);
        context.add_dependent(id, dependent);
        Ok(Handle(cell))
    }

    /// Table id, failing fast once released
    pub(crate) fn id(&self) -> BridgeResult<u64> {
        match self.0.id.get() {
            0 => Err(BridgeError::InvalidHandle(self.0.kind.as_str())),
            id => Ok(id),
        }
    }

    pub(crate) fn is_released(&self) -> bool {
        self.0.id.get() == 0
    }

    pub(crate) fn release(&self) -> BridgeResult<()> {
        Release::release(self.0.as_ref())
    }

    pub(crate) fn context(&self) -> &Rc<ContextInner> {
        &self.0.context
    }

    /// Whether both refer to the same table entry
    pub(crate) fn same_entry(&self, other: &Handle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The rooted value, for passing the handle back into its own context
    pub(crate) fn restore<'js>(&self, ctx: &Ctx<'js>, context: &ContextInner) -> BridgeResult<Value<'js>> {
        if !std::ptr::eq(self.0.context.as_ref(), context) {
            return Err(BridgeError::UnsupportedValue(format!(
                "{} handle belongs to another context",
                self.0.kind.as_str()
            )));
        }
        context.restore(ctx, self.id()?)
    }

    /// Enter the owning context and run `f` on the rooted value.
    ///
    /// `governed` entries open a budget window; use it for operations that
    /// run script code.
    pub(crate) fn with_value<R, F>(&self, governed: bool, f: F) -> BridgeResult<R>
    where
        F: for<'js> FnOnce(&Ctx<'js>, &Rc<ContextInner>, Value<'js>) -> BridgeResult<R>,
    {
        let id = self.id()?;
        let context = &self.0.context;
        context.enter(governed, |ctx| {
            let value = context.restore(ctx, id)?;
            f(ctx, context, value)
        })
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &self.0.kind)
            .field("id", &self.0.id.get())
            .finish()
    }
}
