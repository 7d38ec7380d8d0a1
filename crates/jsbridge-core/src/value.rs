//! Host-side values exchanged with the engine
//!
//! Plain containers (`List`, `Map`) are copies: handing one to the engine
//! materializes a fresh engine array or object. The handle-bearing variants
//! (`Function`, `Array`, `Object`) refer to live engine values owned by a
//! [`Context`](crate::Context).

use crate::array::JsArray;
use crate::error::{BridgeError, BridgeResult};
use crate::function::HostFunction;
use crate::js_function::JsFunction;
use crate::object::JsObject;
use std::collections::HashMap;
use std::fmt;

/// Value on the host side of the bridge
#[derive(Debug, Clone)]
pub enum HostValue {
    /// Absent value; both engine `null` and `undefined` map here
    Null,

    /// Boolean value
    Bool(bool),

    /// 32-bit signed integer
    Int(i32),

    /// 64-bit floating point number
    Float(f64),

    /// String value
    String(String),

    /// Ordered sequence, copied element by element into the engine
    List(Vec<HostValue>),

    /// String-keyed mapping, copied key by key into the engine
    Map(HashMap<String, HostValue>),

    /// Host callable exposed to script code
    Callback(HostFunction),

    /// Engine function handle
    Function(JsFunction),

    /// Live view over an engine array
    Array(JsArray),

    /// Live view over an engine object
    Object(JsObject),
}

impl HostValue {
    /// Check if this value is absent
    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Bool(_) => "bool",
            HostValue::Int(_) => "int",
            HostValue::Float(_) => "float",
            HostValue::String(_) => "string",
            HostValue::List(_) => "list",
            HostValue::Map(_) => "map",
            HostValue::Callback(_) => "callback",
            HostValue::Function(_) => "function",
            HostValue::Array(_) => "array",
            HostValue::Object(_) => "object",
        }
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer payload
    pub fn as_int(&self) -> Option<i32> {
        match self {
            HostValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric payload, widening integers
    pub fn as_float(&self) -> Option<f64> {
        match self {
            HostValue::Int(i) => Some(f64::from(*i)),
            HostValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// String payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// List payload
    pub fn as_list(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Map payload
    pub fn as_map(&self) -> Option<&HashMap<String, HostValue>> {
        match self {
            HostValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a key in a map or a live object view.
    ///
    /// Returns `Null` for missing keys and for values that are not mappings.
    pub fn get(&self, key: &str) -> BridgeResult<HostValue> {
        match self {
            HostValue::Map(entries) => Ok(entries.get(key).cloned().unwrap_or(HostValue::Null)),
            HostValue::Object(object) => object.get(key),
            _ => Ok(HostValue::Null),
        }
    }

    /// Copy the value into plain host containers.
    ///
    /// Live arrays and objects become `List` and `Map`, recursively. Function
    /// handles and callbacks are kept as they are.
    pub fn snapshot(&self) -> BridgeResult<HostValue> {
        match self {
            HostValue::List(items) => items
                .iter()
                .map(HostValue::snapshot)
                .collect::<BridgeResult<Vec<_>>>()
                .map(HostValue::List),
            HostValue::Map(entries) => entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), v.snapshot()?)))
                .collect::<BridgeResult<HashMap<_, _>>>()
                .map(HostValue::Map),
            HostValue::Array(array) => array.to_vec().map(HostValue::List),
            HostValue::Object(object) => object.to_map().map(HostValue::Map),
            other => Ok(other.clone()),
        }
    }

    /// Build a value from JSON.
    ///
    /// Numbers that fit in an `i32` become `Int`, all others `Float`.
    pub fn from_json(json: serde_json::Value) -> HostValue {
        match json {
            serde_json::Value::Null => HostValue::Null,
            serde_json::Value::Bool(b) => HostValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64().and_then(|i| i32::try_from(i).ok()) {
                Some(i) => HostValue::Int(i),
                None => HostValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => HostValue::String(s),
            serde_json::Value::Array(items) => {
                HostValue::List(items.into_iter().map(HostValue::from_json).collect())
            }
            serde_json::Value::Object(entries) => HostValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, HostValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Render the value as JSON.
    ///
    /// Live views are read through; callables have no JSON form and are
    /// rejected. Non-finite floats become `null`.
    pub fn to_json(&self) -> BridgeResult<serde_json::Value> {
        Ok(match self {
            HostValue::Null => serde_json::Value::Null,
            HostValue::Bool(b) => serde_json::Value::Bool(*b),
            HostValue::Int(i) => serde_json::Value::from(*i),
            HostValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            HostValue::String(s) => serde_json::Value::String(s.clone()),
            HostValue::List(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(HostValue::to_json)
                    .collect::<BridgeResult<Vec<_>>>()?,
            ),
            HostValue::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.to_json()?)))
                    .collect::<BridgeResult<serde_json::Map<_, _>>>()?,
            ),
            HostValue::Array(_) | HostValue::Object(_) => self.snapshot()?.to_json()?,
            HostValue::Callback(_) | HostValue::Function(_) => {
                return Err(BridgeError::UnsupportedValue(format!(
                    "{} has no JSON representation",
                    self.type_name()
                )))
            }
        })
    }
}

impl Default for HostValue {
    fn default() -> Self {
        HostValue::Null
    }
}

impl PartialEq for HostValue {
    /// Structural equality. Numbers compare by value, so `Int(3)` equals
    /// `Float(3.0)`. Live views compare by content, so a view over `[1, 2]`
    /// equals `List([1, 2])`; callables compare by identity.
    fn eq(&self, other: &Self) -> bool {
        use HostValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Int(a), Float(b)) | (Float(b), Int(a)) => f64::from(*a) == *b,
            (String(a), String(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Callback(a), Callback(b)) => a == b,
            (Function(a), Function(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            (Array(view), List(items)) | (List(items), Array(view)) => {
                view.to_vec().map(|v| &v == items).unwrap_or(false)
            }
            (Object(view), Map(entries)) | (Map(entries), Object(view)) => {
                view.to_map().map(|m| &m == entries).unwrap_or(false)
            }
            _ => false,
        }
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Null => write!(f, "null"),
            HostValue::Bool(b) => write!(f, "{}", b),
            HostValue::Int(i) => write!(f, "{}", i),
            HostValue::Float(fl) => write!(f, "{}", fl),
            HostValue::String(s) => write!(f, "\"{}\"", s),
            HostValue::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            HostValue::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            HostValue::Callback(_) => write!(f, "[host function]"),
            HostValue::Function(function) => match function.name() {
                Some(name) => write!(f, "[function {}]", name),
                None => write!(f, "[function]"),
            },
            HostValue::Array(_) => write!(f, "[array]"),
            HostValue::Object(_) => write!(f, "[object]"),
        }
    }
}

// ============================================================================
// Conversions into HostValue
// ============================================================================

impl From<()> for HostValue {
    fn from(_: ()) -> Self {
        HostValue::Null
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        HostValue::Bool(b)
    }
}

impl From<i32> for HostValue {
    fn from(i: i32) -> Self {
        HostValue::Int(i)
    }
}

impl From<i16> for HostValue {
    fn from(i: i16) -> Self {
        HostValue::Int(i32::from(i))
    }
}

impl From<i8> for HostValue {
    fn from(i: i8) -> Self {
        HostValue::Int(i32::from(i))
    }
}

impl From<u16> for HostValue {
    fn from(i: u16) -> Self {
        HostValue::Int(i32::from(i))
    }
}

impl From<u8> for HostValue {
    fn from(i: u8) -> Self {
        HostValue::Int(i32::from(i))
    }
}

impl From<f64> for HostValue {
    fn from(f: f64) -> Self {
        HostValue::Float(f)
    }
}

impl From<f32> for HostValue {
    fn from(f: f32) -> Self {
        HostValue::Float(f64::from(f))
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::String(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::String(s)
    }
}

impl<T: Into<HostValue>> From<Vec<T>> for HostValue {
    fn from(items: Vec<T>) -> Self {
        HostValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<HostValue>> From<HashMap<String, T>> for HostValue {
    fn from(entries: HashMap<String, T>) -> Self {
        HostValue::Map(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(HostValue::Null)
    }
}

impl From<HostFunction> for HostValue {
    fn from(f: HostFunction) -> Self {
        HostValue::Callback(f)
    }
}

impl From<JsFunction> for HostValue {
    fn from(f: JsFunction) -> Self {
        HostValue::Function(f)
    }
}

impl From<JsArray> for HostValue {
    fn from(a: JsArray) -> Self {
        HostValue::Array(a)
    }
}

impl From<JsObject> for HostValue {
    fn from(o: JsObject) -> Self {
        HostValue::Object(o)
    }
}
