//! Live view over an engine object
//!
//! Same contract as [`JsArray`](crate::JsArray): reads and writes go to the
//! engine every time. Keys are the object's own enumerable string keys.

use crate::error::{BridgeError, BridgeResult};
use crate::handle::Handle;
use crate::marshal::{snapshot_object, to_engine, to_host};
use crate::translate::EngineResultExt;
use crate::value::HostValue;
use rquickjs::{Object, Value};
use std::collections::HashMap;
use std::fmt;

fn as_object(value: Value<'_>) -> BridgeResult<Object<'_>> {
    let kind = value.type_name();
    value
        .into_object()
        .ok_or_else(|| BridgeError::type_mismatch("object", kind))
}

/// Live engine object
#[derive(Clone)]
pub struct JsObject {
    handle: Handle,
}

impl JsObject {
    pub(crate) fn new(handle: Handle) -> Self {
        Self { handle }
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Number of own enumerable keys
    pub fn len(&self) -> BridgeResult<usize> {
        Ok(self.keys()?.len())
    }

    /// Whether the object has no own enumerable keys
    pub fn is_empty(&self) -> BridgeResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Value under `key`; missing keys read as `Null`
    pub fn get(&self, key: &str) -> BridgeResult<HostValue> {
        self.handle.with_value(true, |ctx, context, value| {
            let object = as_object(value)?;
            let item: Value<'_> = object.get(key).or_translate(ctx, context)?;
            to_host(ctx, context, item)
        })
    }

    /// Store `item` under `key`, returning the previous value (`Null` if none)
    pub fn set(&self, key: &str, item: impl Into<HostValue>) -> BridgeResult<HostValue> {
        let item = item.into();
        self.handle.with_value(true, |ctx, context, value| {
            let object = as_object(value)?;
            let previous: Value<'_> = object.get(key).or_translate(ctx, context)?;
            let previous = to_host(ctx, context, previous)?;
            let item = to_engine(ctx, context, &item)?;
            object.set(key, item).or_translate(ctx, context)?;
            Ok(previous)
        })
    }

    /// Whether `key` is present
    pub fn contains_key(&self, key: &str) -> BridgeResult<bool> {
        self.handle.with_value(true, |ctx, context, value| {
            as_object(value)?.contains_key(key).or_translate(ctx, context)
        })
    }

    /// Delete `key`, returning the removed value (`Null` if none)
    pub fn remove(&self, key: &str) -> BridgeResult<HostValue> {
        self.handle.with_value(true, |ctx, context, value| {
            let object = as_object(value)?;
            let previous: Value<'_> = object.get(key).or_translate(ctx, context)?;
            let previous = to_host(ctx, context, previous)?;
            object.remove(key).or_translate(ctx, context)?;
            Ok(previous)
        })
    }

    /// Own enumerable keys at the time of the call
    pub fn keys(&self) -> BridgeResult<Vec<String>> {
        self.handle.with_value(true, |ctx, context, value| {
            as_object(value)?
                .keys::<String>()
                .map(|key| key.or_translate(ctx, context))
                .collect()
        })
    }

    /// Values of the own enumerable keys, in key order
    pub fn values(&self) -> BridgeResult<Vec<HostValue>> {
        self.keys()?.iter().map(|key| self.get(key)).collect()
    }

    /// Entries whose values are read live from the object
    pub fn entries(&self) -> BridgeResult<Vec<JsObjectEntry>> {
        Ok(self
            .keys()?
            .into_iter()
            .map(|key| JsObjectEntry {
                object: self.clone(),
                key,
            })
            .collect())
    }

    /// Delete every own enumerable key
    pub fn clear(&self) -> BridgeResult<()> {
        self.handle.with_value(true, |ctx, context, value| {
            let object = as_object(value)?;
            let keys = object
                .keys::<String>()
                .collect::<rquickjs::Result<Vec<_>>>()
                .or_translate(ctx, context)?;
            for key in keys {
                object.remove(key.as_str()).or_translate(ctx, context)?;
            }
            Ok(())
        })
    }

    /// Copy of the whole object, nested containers included
    pub fn to_map(&self) -> BridgeResult<HashMap<String, HostValue>> {
        self.handle.with_value(true, |ctx, context, value| {
            let object = as_object(value)?;
            snapshot_object(ctx, context, &object, 0)
        })
    }

    /// Release the handle; further operations fail with `InvalidHandle`
    pub fn release(&self) -> BridgeResult<()> {
        self.handle.release()
    }

    /// Whether the handle has been released
    pub fn is_released(&self) -> bool {
        self.handle.is_released()
    }
}

impl PartialEq for JsObject {
    fn eq(&self, other: &Self) -> bool {
        if self.handle.same_entry(&other.handle) {
            return true;
        }
        match (self.to_map(), other.to_map()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for JsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsObject").field("handle", &self.handle).finish()
    }
}

/// Key of a [`JsObject`] paired with live access to its value
#[derive(Debug, Clone)]
pub struct JsObjectEntry {
    object: JsObject,
    key: String,
}

impl JsObjectEntry {
    /// The key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current value under the key
    pub fn value(&self) -> BridgeResult<HostValue> {
        self.object.get(&self.key)
    }

    /// Replace the value under the key, returning the previous one
    pub fn set_value(&self, item: impl Into<HostValue>) -> BridgeResult<HostValue> {
        self.object.set(&self.key, item)
    }
}
