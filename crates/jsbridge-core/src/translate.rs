//! Error Translator
//!
//! Converts engine failures into [`BridgeError`] and host callback failures
//! into engine exceptions.
//!
//! A failing host callback cannot carry a Rust error object through script
//! frames, so the error is parked in the context under a numeric id and the
//! thrown script `Error` records that id. When the exception reaches the host
//! again the id is resolved back to the original error, which becomes the
//! `cause` of a [`BridgeError::HostCallback`].

use crate::context::ContextInner;
use crate::error::{BridgeError, HostError, ScriptLocation};
use rquickjs::{Ctx, Exception, Value};

/// Property on thrown errors that links them to a parked host error
pub(crate) const HOST_ERROR_KEY: &str = "hostErrorId";

const INTERRUPTED_MARKER: &str = "interrupted";
const OUT_OF_MEMORY_MARKER: &str = "out of memory";

/// Translate an engine result inside an engine entry
pub(crate) trait EngineResultExt<T> {
    fn or_translate(self, ctx: &Ctx<'_>, context: &ContextInner) -> Result<T, BridgeError>;
}

impl<T> EngineResultExt<T> for rquickjs::Result<T> {
    fn or_translate(self, ctx: &Ctx<'_>, context: &ContextInner) -> Result<T, BridgeError> {
        self.map_err(|error| engine_error(ctx, error, context))
    }
}

/// Translate an engine error, consuming any pending exception
pub(crate) fn engine_error(ctx: &Ctx<'_>, error: rquickjs::Error, context: &ContextInner) -> BridgeError {
    let runtime = context.runtime();
    let translated = match error {
        rquickjs::Error::Exception => {
            let thrown = ctx.catch();
            thrown_error(thrown, context)
        }
        rquickjs::Error::Allocation => BridgeError::OutOfMemory {
            limit: runtime.memory_limit(),
        },
        other => BridgeError::Engine(other.to_string()),
    };
    if runtime.governor.is_running() && runtime.governor.was_interrupted() {
        if let Some(limit) = runtime.governor.limit() {
            return BridgeError::Interrupted { limit };
        }
    }
    translated
}

fn thrown_error(thrown: Value<'_>, context: &ContextInner) -> BridgeError {
    let Some(exception) = thrown.as_exception() else {
        return BridgeError::Script {
            message: describe_thrown(&thrown),
            location: ScriptLocation::default(),
        };
    };

    let message = exception.message().unwrap_or_default();
    let location = exception
        .stack()
        .map(|stack| ScriptLocation::parse(&stack))
        .unwrap_or_default();

    let parked = exception
        .as_object()
        .get::<_, Value<'_>>(HOST_ERROR_KEY)
        .ok()
        .and_then(|id| id.as_number())
        .and_then(|id| context.take_host_error(id as u64));
    if let Some(cause) = parked {
        return host_callback_error(cause, location);
    }

    let runtime = context.runtime();
    if message.contains(OUT_OF_MEMORY_MARKER) {
        return BridgeError::OutOfMemory {
            limit: runtime.memory_limit(),
        };
    }
    if message == INTERRUPTED_MARKER {
        if let Some(limit) = runtime.governor.limit() {
            return BridgeError::Interrupted { limit };
        }
    }
    BridgeError::Script { message, location }
}

/// Budget failures raised by a nested entry keep their own kind
fn host_callback_error(cause: HostError, location: ScriptLocation) -> BridgeError {
    match cause.downcast::<BridgeError>() {
        Ok(bridge) if bridge.is_interrupted() || bridge.is_out_of_memory() => *bridge,
        Ok(bridge) => BridgeError::HostCallback {
            message: bridge.to_string(),
            location,
            cause: bridge,
        },
        Err(cause) => BridgeError::HostCallback {
            message: cause.to_string(),
            location,
            cause,
        },
    }
}

fn describe_thrown(thrown: &Value<'_>) -> String {
    if let Some(s) = thrown.as_string() {
        if let Ok(s) = s.to_string() {
            return s;
        }
    }
    if let Some(n) = thrown.as_number() {
        return n.to_string();
    }
    if let Some(b) = thrown.as_bool() {
        return b.to_string();
    }
    format!("uncaught {}", thrown.type_name())
}

/// Park a host error and throw a script `Error` that refers to it
pub(crate) fn throw_host_error(ctx: &Ctx<'_>, context: &ContextInner, error: HostError) -> rquickjs::Error {
    let message = error.to_string();
    let id = context.park_host_error(error);
    match Exception::from_message(ctx.clone(), &message) {
        Ok(exception) => {
            if let Err(err) = exception.as_object().set(HOST_ERROR_KEY, id as f64) {
                return err;
            }
            ctx.throw(exception.into_value())
        }
        Err(err) => err,
    }
}

impl From<rquickjs::Error> for BridgeError {
    /// Translation for failures outside an engine entry, where no exception
    /// can be pending
    fn from(error: rquickjs::Error) -> Self {
        match error {
            rquickjs::Error::Allocation => BridgeError::OutOfMemory { limit: None },
            other => BridgeError::Engine(other.to_string()),
        }
    }
}
