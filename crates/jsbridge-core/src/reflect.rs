//! Exposing host objects to script code as mappings of callables
//!
//! A type describes its operations through [`Reflect`]; [`create_map_of`]
//! keeps the ones whose parameter and return kinds the marshaler can carry
//! and turns each into a variadic callback under its name. The resulting
//! map becomes a plain script object when passed into a context.

use crate::function::HostFunction;
use crate::value::HostValue;
use std::collections::HashMap;
use std::fmt;

/// Kind of a value crossing the boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    /// No value (`()` / `Null`)
    Unit,
    /// Boolean
    Bool,
    /// 32-bit integer
    Int,
    /// Double
    Float,
    /// String
    String,
    /// Copied sequence
    List,
    /// Copied string-keyed mapping
    Map,
    /// Host or script function
    Function,
    /// Live script array
    Array,
    /// Live script object
    Object,
    /// Any marshalable value
    Any,
    /// A host type with no script representation
    Opaque(&'static str),
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Opaque(name) => write!(f, "{}", name),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Whether values of `kind` can be marshaled
pub fn is_supported(kind: &ValueKind) -> bool {
    !matches!(kind, ValueKind::Opaque(_))
}

/// One public operation of a host object
#[derive(Debug, Clone)]
pub struct Operation {
    /// Name the operation is exposed under
    pub name: String,
    /// Parameter kinds, in order
    pub params: Vec<ValueKind>,
    /// Return kind
    pub returns: ValueKind,
    /// The operation in the variadic calling convention
    pub invoke: HostFunction,
}

impl Operation {
    /// Describe an operation
    pub fn new(name: &str, params: Vec<ValueKind>, returns: ValueKind, invoke: HostFunction) -> Self {
        Self {
            name: name.to_string(),
            params,
            returns,
            invoke,
        }
    }

    /// Whether every parameter and the return kind can be marshaled
    pub fn is_supported(&self) -> bool {
        self.params.iter().all(is_supported) && is_supported(&self.returns)
    }
}

/// Host types that can enumerate their operations
pub trait Reflect {
    /// Public operations, in declaration order
    fn operations(&self) -> Vec<Operation>;
}

/// Build a string-keyed mapping of callables from a host object.
///
/// Unsupported operations are skipped. When several operations share a name,
/// the first supported one wins.
pub fn create_map_of(target: &dyn Reflect) -> HashMap<String, HostValue> {
    let mut map = HashMap::new();
    for operation in target.operations() {
        if !operation.is_supported() {
            log::debug!(
                "skipping operation '{}': ({}) -> {} cannot be marshaled",
                operation.name,
                operation
                    .params
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
                operation.returns
            );
            continue;
        }
        if map.contains_key(&operation.name) {
            log::debug!("skipping overload of '{}'", operation.name);
            continue;
        }
        map.insert(operation.name, HostValue::Callback(operation.invoke));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counter {
        count: Rc<Cell<i32>>,
    }

    impl Reflect for Counter {
        fn operations(&self) -> Vec<Operation> {
            let count = self.count.clone();
            let get = self.count.clone();
            vec![
                Operation::new(
                    "increment",
                    vec![ValueKind::Int],
                    ValueKind::Int,
                    HostFunction::function(move |by: i32| {
                        count.set(count.get() + by);
                        count.get()
                    }),
                ),
                Operation::new(
                    "get",
                    vec![],
                    ValueKind::Int,
                    HostFunction::supplier(move || get.get()),
                ),
                Operation::new(
                    "get",
                    vec![ValueKind::Int],
                    ValueKind::Int,
                    HostFunction::function(|x: i32| x),
                ),
                Operation::new(
                    "handle",
                    vec![],
                    ValueKind::Opaque("std::fs::File"),
                    HostFunction::supplier(|| ()),
                ),
            ]
        }
    }

    #[test]
    fn test_supported_kinds() {
        assert!(is_supported(&ValueKind::Any));
        assert!(is_supported(&ValueKind::Unit));
        assert!(!is_supported(&ValueKind::Opaque("Thread")));
    }

    #[test]
    fn test_create_map_skips_unsupported_and_overloads() {
        let counter = Counter {
            count: Rc::new(Cell::new(0)),
        };
        let map = create_map_of(&counter);
        let mut names: Vec<_> = map.keys().cloned().collect();
        names.sort();
        assert_eq!(names, vec!["get", "increment"]);

        let HostValue::Callback(increment) = &map["increment"] else {
            panic!("expected callback");
        };
        assert_eq!(increment.call(&[5.into()]).unwrap(), HostValue::Int(5));
        let HostValue::Callback(get) = &map["get"] else {
            panic!("expected callback");
        };
        assert_eq!(get.arity(), Some(0));
        assert_eq!(get.call(&[]).unwrap(), HostValue::Int(5));
    }
}
