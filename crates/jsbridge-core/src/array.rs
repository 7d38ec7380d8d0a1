//! Live view over an engine array
//!
//! Every operation is a round trip into the engine; nothing is cached on
//! the host side, so mutations made by script code between two calls are
//! always observed. Index operations read the current length first and fail
//! with `IndexOutOfRange` before touching any element.
//!
//! Element access can run script code (accessors, `splice`), so every
//! operation runs inside a budget window.

use crate::context::ContextInner;
use crate::error::{BridgeError, BridgeResult};
use crate::handle::Handle;
use crate::marshal::{snapshot, to_engine, to_host};
use crate::translate::EngineResultExt;
use crate::value::HostValue;
use rquickjs::function::This;
use rquickjs::{Array, Ctx, Function, Value};
use std::fmt;
use std::rc::Rc;

fn as_array(value: Value<'_>) -> BridgeResult<Array<'_>> {
    let kind = value.type_name();
    value
        .into_array()
        .ok_or_else(|| BridgeError::type_mismatch("array", kind))
}

fn check_index(index: usize, len: usize) -> BridgeResult<()> {
    if index < len {
        Ok(())
    } else {
        Err(BridgeError::IndexOutOfRange { index, len })
    }
}

/// `Array.prototype.splice` called on `array`
fn splice<'js>(
    ctx: &Ctx<'js>,
    context: &Rc<ContextInner>,
    array: &Array<'js>,
    index: usize,
    delete: usize,
    insert: Option<Value<'js>>,
) -> BridgeResult<()> {
    let splice: Function<'js> = array.as_object().get("splice").or_translate(ctx, context)?;
    let this = This(array.clone());
    let result: rquickjs::Result<Value<'js>> = match insert {
        Some(item) => splice.call((this, index as f64, delete as f64, item)),
        None => splice.call((this, index as f64, delete as f64)),
    };
    result.or_translate(ctx, context).map(|_| ())
}

/// Live engine array
#[derive(Clone)]
pub struct JsArray {
    handle: Handle,
}

impl JsArray {
    pub(crate) fn new(handle: Handle) -> Self {
        Self { handle }
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Current length
    pub fn len(&self) -> BridgeResult<usize> {
        self.handle
            .with_value(true, |_, _, value| Ok(as_array(value)?.len()))
    }

    /// Whether the array is currently empty
    pub fn is_empty(&self) -> BridgeResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> BridgeResult<HostValue> {
        self.handle.with_value(true, |ctx, context, value| {
            let array = as_array(value)?;
            check_index(index, array.len())?;
            let item: Value<'_> = array.get(index).or_translate(ctx, context)?;
            to_host(ctx, context, item)
        })
    }

    /// Replace the element at `index`, returning the previous element
    pub fn set(&self, index: usize, item: impl Into<HostValue>) -> BridgeResult<HostValue> {
        let item = item.into();
        self.handle.with_value(true, |ctx, context, value| {
            let array = as_array(value)?;
            check_index(index, array.len())?;
            let previous: Value<'_> = array.get(index).or_translate(ctx, context)?;
            let previous = to_host(ctx, context, previous)?;
            let item = to_engine(ctx, context, &item)?;
            array.set(index, item).or_translate(ctx, context)?;
            Ok(previous)
        })
    }

    /// Append an element at the current end
    pub fn push(&self, item: impl Into<HostValue>) -> BridgeResult<()> {
        let item = item.into();
        self.handle.with_value(true, |ctx, context, value| {
            let array = as_array(value)?;
            let item = to_engine(ctx, context, &item)?;
            array.set(array.len(), item).or_translate(ctx, context)
        })
    }

    /// Append every element of `items`
    pub fn extend<I>(&self, items: I) -> BridgeResult<()>
    where
        I: IntoIterator,
        I::Item: Into<HostValue>,
    {
        for item in items {
            self.push(item)?;
        }
        Ok(())
    }

    /// Insert an element at `index`, shifting later elements; `index` may equal the length
    pub fn insert(&self, index: usize, item: impl Into<HostValue>) -> BridgeResult<()> {
        let item = item.into();
        self.handle.with_value(true, |ctx, context, value| {
            let array = as_array(value)?;
            check_index(index, array.len() + 1)?;
            let item = to_engine(ctx, context, &item)?;
            splice(ctx, context, &array, index, 0, Some(item))
        })
    }

    /// Remove the element at `index`, returning it
    pub fn remove(&self, index: usize) -> BridgeResult<HostValue> {
        self.handle.with_value(true, |ctx, context, value| {
            let array = as_array(value)?;
            check_index(index, array.len())?;
            let removed: Value<'_> = array.get(index).or_translate(ctx, context)?;
            let removed = to_host(ctx, context, removed)?;
            splice(ctx, context, &array, index, 1, None)?;
            Ok(removed)
        })
    }

    /// Remove every element
    pub fn clear(&self) -> BridgeResult<()> {
        self.handle.with_value(true, |ctx, context, value| {
            let array = as_array(value)?;
            array.as_object().set("length", 0).or_translate(ctx, context)
        })
    }

    /// Position of the first element equal to `needle`
    pub fn index_of(&self, needle: &HostValue) -> BridgeResult<Option<usize>> {
        for (index, item) in self.iter().enumerate() {
            if &item? == needle {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Whether an element equal to `needle` exists
    pub fn contains(&self, needle: &HostValue) -> BridgeResult<bool> {
        Ok(self.index_of(needle)?.is_some())
    }

    /// Live iterator; each step re-reads the length and the element
    pub fn iter(&self) -> JsArrayIter {
        JsArrayIter {
            array: self.clone(),
            index: 0,
            done: false,
        }
    }

    /// Copy of the whole array, nested containers included
    pub fn to_vec(&self) -> BridgeResult<Vec<HostValue>> {
        self.handle.with_value(true, |ctx, context, value| {
            match snapshot(ctx, context, value)? {
                HostValue::List(items) => Ok(items),
                other => Err(BridgeError::type_mismatch("array", other.type_name())),
            }
        })
    }

    /// Copy of the elements in `start..end`.
    ///
    /// Sub-ranges are copies, not live windows: later changes to the array
    /// are not reflected in the returned vector.
    pub fn copy_range(&self, start: usize, end: usize) -> BridgeResult<Vec<HostValue>> {
        self.handle.with_value(true, |ctx, context, value| {
            let array = as_array(value)?;
            let len = array.len();
            if end > len {
                return Err(BridgeError::IndexOutOfRange { index: end, len });
            }
            if start > end {
                return Err(BridgeError::IndexOutOfRange { index: start, len: end });
            }
            (start..end)
                .map(|index| {
                    let item: Value<'_> = array.get(index).or_translate(ctx, context)?;
                    to_host(ctx, context, item)
                })
                .collect()
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

impl PartialEq for JsArray {
    /// Element-by-element comparison of the current contents
    fn eq(&self, other: &Self) -> bool {
        if self.handle.same_entry(&other.handle) {
            return true;
        }
        match (self.to_vec(), other.to_vec()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for JsArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsArray").field("handle", &self.handle).finish()
    }
}

impl<'a> IntoIterator for &'a JsArray {
    type Item = BridgeResult<HostValue>;
    type IntoIter = JsArrayIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`JsArray`]
pub struct JsArrayIter {
    array: JsArray,
    index: usize,
    done: bool,
}

impl Iterator for JsArrayIter {
    type Item = BridgeResult<HostValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.array.get(self.index) {
            Ok(item) => {
                self.index += 1;
                Some(Ok(item))
            }
            Err(BridgeError::IndexOutOfRange { .. }) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
