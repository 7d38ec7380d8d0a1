//! Typed extraction from [`HostValue`].
//!
//! Implement `FromHostValue` to let a type be used as a typed callback
//! parameter or as the target of `eval_as`/`invoke_as`/`call_as`.
//!
//! Numeric coercion is explicit:
//! - `f64` accepts `Int` and widens it.
//! - `i32` accepts `Float` only when the value is integral and in range;
//!   `2.0` converts, `2.5` is a type mismatch.
//!
//! # Example
//!
//! ```ignore
//! use jsbridge_core::{BridgeResult, FromHostValue, HostValue};
//!
//! struct Point { x: f64, y: f64 }
//!
//! impl FromHostValue for Point {
//!     fn from_host(value: HostValue) -> BridgeResult<Self> {
//!         Ok(Point {
//!             x: f64::from_host(value.get("x")?)?,
//!             y: f64::from_host(value.get("y")?)?,
//!         })
//!     }
//! }
//! ```

use crate::array::JsArray;
use crate::error::{BridgeError, BridgeResult};
use crate::function::HostFunction;
use crate::js_function::JsFunction;
use crate::object::JsObject;
use crate::value::HostValue;
use std::collections::HashMap;

/// Convert a host value into a Rust type
pub trait FromHostValue: Sized {
    /// Convert, failing with a type mismatch when the value has the wrong shape
    fn from_host(value: HostValue) -> BridgeResult<Self>;
}

impl FromHostValue for HostValue {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        Ok(value)
    }
}

impl FromHostValue for () {
    fn from_host(_: HostValue) -> BridgeResult<Self> {
        Ok(())
    }
}

impl FromHostValue for bool {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Bool(b) => Ok(b),
            other => Err(BridgeError::type_mismatch("bool", other.type_name())),
        }
    }
}

impl FromHostValue for i32 {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Int(i) => Ok(i),
            HostValue::Float(f)
                if f.fract() == 0.0 && f >= f64::from(i32::MIN) && f <= f64::from(i32::MAX) =>
            {
                Ok(f as i32)
            }
            HostValue::Float(f) => Err(BridgeError::type_mismatch("int", format!("float {}", f))),
            other => Err(BridgeError::type_mismatch("int", other.type_name())),
        }
    }
}

impl FromHostValue for f64 {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        value
            .as_float()
            .ok_or_else(|| BridgeError::type_mismatch("float", value.type_name()))
    }
}

impl FromHostValue for String {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::String(s) => Ok(s),
            other => Err(BridgeError::type_mismatch("string", other.type_name())),
        }
    }
}

impl<T: FromHostValue> FromHostValue for Option<T> {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Null => Ok(None),
            other => T::from_host(other).map(Some),
        }
    }
}

impl<T: FromHostValue> FromHostValue for Vec<T> {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        let items = match value {
            HostValue::List(items) => items,
            HostValue::Array(array) => array.to_vec()?,
            other => return Err(BridgeError::type_mismatch("list", other.type_name())),
        };
        items.into_iter().map(T::from_host).collect()
    }
}

impl<T: FromHostValue> FromHostValue for HashMap<String, T> {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        let entries = match value {
            HostValue::Map(entries) => entries,
            HostValue::Object(object) => object.to_map()?,
            other => return Err(BridgeError::type_mismatch("map", other.type_name())),
        };
        entries
            .into_iter()
            .map(|(k, v)| Ok((k, T::from_host(v)?)))
            .collect()
    }
}

impl FromHostValue for HostFunction {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Callback(f) => Ok(f),
            HostValue::Function(f) => Ok(f.into_host_function()),
            other => Err(BridgeError::type_mismatch("function", other.type_name())),
        }
    }
}

impl FromHostValue for JsFunction {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Function(f) => Ok(f),
            other => Err(BridgeError::type_mismatch("function", other.type_name())),
        }
    }
}

impl FromHostValue for JsArray {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Array(a) => Ok(a),
            other => Err(BridgeError::type_mismatch("array", other.type_name())),
        }
    }
}

impl FromHostValue for JsObject {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Object(o) => Ok(o),
            other => Err(BridgeError::type_mismatch("object", other.type_name())),
        }
    }
}
