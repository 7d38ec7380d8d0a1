//! Script functions held by the host

use crate::convert::FromHostValue;
use crate::error::{BridgeError, BridgeResult, HostError};
use crate::function::HostFunction;
use crate::handle::Handle;
use crate::marshal::{to_engine, to_host};
use crate::translate::EngineResultExt;
use crate::value::HostValue;
use rquickjs::function::Rest;
use rquickjs::{Function, Value};
use std::fmt;

/// Handle to a script function
///
/// Calling it runs script code, so every call is governed by the runtime's
/// execution limit. Equality is engine identity: two `JsFunction`s are equal
/// when they refer to the same script function, even through separate handles.
#[derive(Clone)]
pub struct JsFunction {
    handle: Handle,
    name: Option<String>,
}

impl JsFunction {
    pub(crate) fn new(handle: Handle, name: Option<String>) -> Self {
        Self { handle, name }
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    /// The function's `name` property at the time it crossed to the host
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Call the function with `this` undefined
    pub fn call(&self, args: &[HostValue]) -> BridgeResult<HostValue> {
        self.handle.with_value(true, |ctx, context, value| {
            let kind = value.type_name();
            let function: Function<'_> = value
                .into_function()
                .ok_or_else(|| BridgeError::type_mismatch("function", kind))?;
            let args = args
                .iter()
                .map(|arg| to_engine(ctx, context, arg))
                .collect::<BridgeResult<Vec<_>>>()?;
            let result: Value<'_> = function.call((Rest(args),)).or_translate(ctx, context)?;
            to_host(ctx, context, result)
        })
    }

    /// Call and convert the result
    pub fn call_as<T: FromHostValue>(&self, args: &[HostValue]) -> BridgeResult<T> {
        T::from_host(self.call(args)?)
    }

    /// Adapt into a host callable.
    ///
    /// The callable keeps the handle alive; it fails with `InvalidHandle`
    /// once the handle or its context is released.
    pub fn into_host_function(self) -> HostFunction {
        HostFunction::variadic(move |args| self.call(args).map_err(HostError::from))
    }

    /// Release the handle; further calls fail with `InvalidHandle`
    pub fn release(&self) -> BridgeResult<()> {
        self.handle.release()
    }

    /// Whether the handle has been released
    pub fn is_released(&self) -> bool {
        self.handle.is_released()
    }
}

impl PartialEq for JsFunction {
    fn eq(&self, other: &Self) -> bool {
        if self.handle.same_entry(&other.handle) {
            return true;
        }
        self.handle
            .with_value(false, |ctx, context, value| {
                let other = other.handle.restore(ctx, context)?;
                Ok(value == other)
            })
            .unwrap_or(false)
    }
}

impl fmt::Debug for JsFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsFunction")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .finish()
    }
}
