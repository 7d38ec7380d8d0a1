//! Value Marshaler
//!
//! Converts between [`HostValue`] and engine values inside an engine entry.
//!
//! | Host                         | Engine                            |
//! |------------------------------|-----------------------------------|
//! | `Null`                       | `null` (and `undefined` on return) |
//! | `Bool` / `Int` / `Float`     | boolean / integer / float number  |
//! | `String`                     | string                            |
//! | `List`                       | new array, elements converted     |
//! | `Map`                        | new object, values converted      |
//! | `Callback`                   | new native function               |
//! | `Function` / `Array` / `Object` | the rooted engine value itself |
//!
//! Engine arrays, objects, and functions returned to the host are rooted in
//! the context's handle table and come back as live views.

use crate::array::JsArray;
use crate::context::ContextInner;
use crate::error::{BridgeError, BridgeResult, HostError};
use crate::function::HostFunction;
use crate::handle::{Handle, HandleKind};
use crate::js_function::JsFunction;
use crate::object::JsObject;
use crate::translate::{throw_host_error, EngineResultExt};
use crate::value::HostValue;
use rquickjs::function::Rest;
use rquickjs::{Array, Ctx, Exception, Function, Object, Type, Value};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Maximum nesting of copied containers; also stops cyclic engine objects
const MAX_DEPTH: usize = 64;

/// Convert a host value into an engine value
pub(crate) fn to_engine<'js>(
    ctx: &Ctx<'js>,
    context: &Rc<ContextInner>,
    value: &HostValue,
) -> BridgeResult<Value<'js>> {
    to_engine_recursive(ctx, context, value, 0)
}

fn to_engine_recursive<'js>(
    ctx: &Ctx<'js>,
    context: &Rc<ContextInner>,
    value: &HostValue,
    depth: usize,
) -> BridgeResult<Value<'js>> {
    if depth >= MAX_DEPTH {
        return Err(BridgeError::UnsupportedValue(format!(
            "nesting deeper than {} levels",
            MAX_DEPTH
        )));
    }

    Ok(match value {
        HostValue::Null => Value::new_null(ctx.clone()),
        HostValue::Bool(b) => Value::new_bool(ctx.clone(), *b),
        HostValue::Int(i) => Value::new_int(ctx.clone(), *i),
        HostValue::Float(f) => Value::new_float(ctx.clone(), *f),
        HostValue::String(s) => rquickjs::String::from_str(ctx.clone(), s)
            .or_translate(ctx, context)?
            .into_value(),
        HostValue::List(items) => {
            let array = Array::new(ctx.clone()).or_translate(ctx, context)?;
            for (index, item) in items.iter().enumerate() {
                let item = to_engine_recursive(ctx, context, item, depth + 1)?;
                array.set(index, item).or_translate(ctx, context)?;
            }
            array.into_value()
        }
        HostValue::Map(entries) => {
            let object = Object::new(ctx.clone()).or_translate(ctx, context)?;
            for (key, item) in entries {
                let item = to_engine_recursive(ctx, context, item, depth + 1)?;
                object.set(key.as_str(), item).or_translate(ctx, context)?;
            }
            object.into_value()
        }
        HostValue::Callback(function) => host_function(ctx, context, function)?,
        HostValue::Function(function) => function.handle().restore(ctx, context)?,
        HostValue::Array(array) => array.handle().restore(ctx, context)?,
        HostValue::Object(object) => object.handle().restore(ctx, context)?,
    })
}

/// Convert an engine value into a host value.
///
/// Arrays, objects, and functions are rooted and returned as live views.
pub(crate) fn to_host<'js>(
    ctx: &Ctx<'js>,
    context: &Rc<ContextInner>,
    value: Value<'js>,
) -> BridgeResult<HostValue> {
    match value.type_of() {
        Type::Uninitialized | Type::Undefined | Type::Null => Ok(HostValue::Null),
        Type::Bool => Ok(value.as_bool().map(HostValue::Bool).unwrap_or_default()),
        Type::Int => Ok(value.as_int().map(HostValue::Int).unwrap_or_default()),
        Type::Float => Ok(value.as_float().map(number_to_host).unwrap_or_default()),
        Type::String => {
            let text = match value.as_string() {
                Some(s) => s.to_string().or_translate(ctx, context)?,
                None => String::new(),
            };
            Ok(HostValue::String(text))
        }
        Type::Array => {
            let handle = Handle::register(context, ctx, value, HandleKind::Array)?;
            Ok(HostValue::Array(JsArray::new(handle)))
        }
        Type::Function | Type::Constructor => {
            let name = function_name(&value);
            let handle = Handle::register(context, ctx, value, HandleKind::Function)?;
            Ok(HostValue::Function(JsFunction::new(handle, name)))
        }
        Type::Object | Type::Exception | Type::Promise => {
            let handle = Handle::register(context, ctx, value, HandleKind::Object)?;
            Ok(HostValue::Object(JsObject::new(handle)))
        }
        other => Err(BridgeError::UnsupportedValue(format!(
            "engine {:?} values have no host mapping",
            other
        ))),
    }
}

/// Engine numbers with an integral value in `i32` range become `Int`,
/// whichever representation the engine chose. `-0.0` stays a float.
fn number_to_host(n: f64) -> HostValue {
    let integral = n.fract() == 0.0 && n >= i32::MIN as f64 && n <= i32::MAX as f64;
    if integral && !(n == 0.0 && n.is_sign_negative()) {
        HostValue::Int(n as i32)
    } else {
        HostValue::Float(n)
    }
}

/// Copy an engine value into plain host containers.
///
/// Arrays and objects become `List` and `Map` recursively; functions are
/// still rooted and returned as handles.
pub(crate) fn snapshot<'js>(
    ctx: &Ctx<'js>,
    context: &Rc<ContextInner>,
    value: Value<'js>,
) -> BridgeResult<HostValue> {
    snapshot_recursive(ctx, context, value, 0)
}

fn snapshot_recursive<'js>(
    ctx: &Ctx<'js>,
    context: &Rc<ContextInner>,
    value: Value<'js>,
    depth: usize,
) -> BridgeResult<HostValue> {
    if depth >= MAX_DEPTH {
        return Err(BridgeError::UnsupportedValue(format!(
            "nesting deeper than {} levels",
            MAX_DEPTH
        )));
    }

    match value.type_of() {
        Type::Array => {
            let Some(array) = value.into_array() else {
                return Ok(HostValue::Null);
            };
            let mut items = Vec::with_capacity(array.len());
            for index in 0..array.len() {
                let item: Value<'js> = array.get(index).or_translate(ctx, context)?;
                items.push(snapshot_recursive(ctx, context, item, depth + 1)?);
            }
            Ok(HostValue::List(items))
        }
        Type::Object => {
            let Some(object) = value.into_object() else {
                return Ok(HostValue::Null);
            };
            snapshot_object(ctx, context, &object, depth).map(HostValue::Map)
        }
        _ => to_host(ctx, context, value),
    }
}

/// Copy the own enumerable properties of an object
pub(crate) fn snapshot_object<'js>(
    ctx: &Ctx<'js>,
    context: &Rc<ContextInner>,
    object: &Object<'js>,
    depth: usize,
) -> BridgeResult<HashMap<String, HostValue>> {
    let mut entries = HashMap::new();
    for key in object.keys::<String>() {
        let key = key.or_translate(ctx, context)?;
        let item: Value<'js> = object.get(key.as_str()).or_translate(ctx, context)?;
        let item = snapshot_recursive(ctx, context, item, depth + 1)?;
        entries.insert(key, item);
    }
    Ok(entries)
}

fn function_name(value: &Value<'_>) -> Option<String> {
    value
        .as_object()
        .and_then(|object| object.get::<_, Option<String>>("name").ok())
        .flatten()
        .filter(|name| !name.is_empty())
}

/// Wrap a host callable as an engine function.
///
/// The wrapper holds the context weakly; once the context is gone, calls
/// throw instead of touching freed state.
fn host_function<'js>(
    ctx: &Ctx<'js>,
    context: &Rc<ContextInner>,
    function: &HostFunction,
) -> BridgeResult<Value<'js>> {
    let scope = Rc::downgrade(context);
    let function = function.clone();
    let native = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, args: Rest<Value<'js>>| -> rquickjs::Result<Value<'js>> {
            call_host(&ctx, &scope, &function, args.0)
        },
    )
    .or_translate(ctx, context)?;
    Ok(native.into_value())
}

fn call_host<'js>(
    ctx: &Ctx<'js>,
    scope: &Weak<ContextInner>,
    function: &HostFunction,
    args: Vec<Value<'js>>,
) -> rquickjs::Result<Value<'js>> {
    let Some(context) = scope.upgrade() else {
        return Err(Exception::throw_message(ctx, "context has been closed"));
    };

    let result = args
        .into_iter()
        .map(|arg| to_host(ctx, &context, arg))
        .collect::<BridgeResult<Vec<_>>>()
        .map_err(HostError::from)
        .and_then(|args| function.call(&args))
        .and_then(|value| to_engine(ctx, &context, &value).map_err(HostError::from));

    result.map_err(|error| throw_host_error(ctx, &context, error))
}
