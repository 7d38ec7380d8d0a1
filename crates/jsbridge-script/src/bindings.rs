//! Named values visible to scripts, grouped by scope.
//!
//! Lookups search the engine scope first, then the global scope. When
//! values are copied into a script context the order is reversed, so engine
//! bindings shadow global ones.

use jsbridge_core::HostValue;
use std::collections::hash_map;
use std::collections::HashMap;

/// Scope a binding lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// Private to one engine
    Engine,
    /// Shared between engines created from the same context
    Global,
}

impl ScopeKind {
    /// All scopes, highest precedence first
    pub const ALL: [ScopeKind; 2] = [ScopeKind::Engine, ScopeKind::Global];
}

/// String-keyed set of host values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: HashMap<String, HostValue>,
}

impl Bindings {
    /// Create empty bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` to `name`, returning the previous value
    pub fn insert(&mut self, name: &str, value: impl Into<HostValue>) -> Option<HostValue> {
        self.values.insert(name.to_string(), value.into())
    }

    /// Value bound to `name`
    pub fn get(&self, name: &str) -> Option<&HostValue> {
        self.values.get(name)
    }

    /// Remove a binding
    pub fn remove(&mut self, name: &str) -> Option<HostValue> {
        self.values.remove(name)
    }

    /// Whether `name` is bound
    pub fn contains_key(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no bindings
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bound names
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// All bindings
    pub fn iter(&self) -> hash_map::Iter<'_, String, HostValue> {
        self.values.iter()
    }
}

impl<'a> IntoIterator for &'a Bindings {
    type Item = (&'a String, &'a HostValue);
    type IntoIter = hash_map::Iter<'a, String, HostValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl<K: Into<String>, V: Into<HostValue>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Engine-scope and global-scope bindings of one engine
#[derive(Debug, Clone, Default)]
pub struct ScriptContext {
    engine: Bindings,
    global: Bindings,
}

impl ScriptContext {
    /// Create a context with empty scopes
    pub fn new() -> Self {
        Self::default()
    }

    /// Bindings of a scope
    pub fn bindings(&self, scope: ScopeKind) -> &Bindings {
        match scope {
            ScopeKind::Engine => &self.engine,
            ScopeKind::Global => &self.global,
        }
    }

    /// Mutable bindings of a scope
    pub fn bindings_mut(&mut self, scope: ScopeKind) -> &mut Bindings {
        match scope {
            ScopeKind::Engine => &mut self.engine,
            ScopeKind::Global => &mut self.global,
        }
    }

    /// Replace the bindings of a scope
    pub fn set_bindings(&mut self, bindings: Bindings, scope: ScopeKind) {
        *self.bindings_mut(scope) = bindings;
    }

    /// Bind a value in a scope
    pub fn set_attribute(&mut self, name: &str, value: impl Into<HostValue>, scope: ScopeKind) {
        self.bindings_mut(scope).insert(name, value);
    }

    /// Value of `name` in a scope
    pub fn attribute_in(&self, name: &str, scope: ScopeKind) -> Option<&HostValue> {
        self.bindings(scope).get(name)
    }

    /// Remove `name` from a scope
    pub fn remove_attribute(&mut self, name: &str, scope: ScopeKind) -> Option<HostValue> {
        self.bindings_mut(scope).remove(name)
    }

    /// Value of `name` in the highest-precedence scope that binds it
    pub fn attribute(&self, name: &str) -> Option<&HostValue> {
        ScopeKind::ALL
            .iter()
            .find_map(|scope| self.attribute_in(name, *scope))
    }

    /// Scope that binds `name`, highest precedence first
    pub fn attribute_scope(&self, name: &str) -> Option<ScopeKind> {
        ScopeKind::ALL
            .into_iter()
            .find(|scope| self.bindings(*scope).contains_key(name))
    }
}
