//! Interface proxies over script objects
//!
//! A [`CapabilitySet`] describes an interface: method names, optional arities,
//! and host-side default implementations. [`Context::get_interface`] turns it
//! into an [`InterfaceProxy`] that forwards every non-default method to
//! `invoke("namespace.method", args)`.
//!
//! [`Context::get_interface`]: crate::Context::get_interface

use crate::context::Context;
use crate::convert::FromHostValue;
use crate::error::{BridgeError, BridgeResult};
use crate::value::HostValue;
use std::fmt;
use std::rc::Rc;

/// Host-side implementation of a default method.
///
/// Receives the proxy so it can call the forwarded methods.
pub type DefaultMethod = Rc<dyn Fn(&InterfaceProxy, &[HostValue]) -> BridgeResult<HostValue>>;

/// One method of an interface
#[derive(Clone)]
pub struct MethodSpec {
    name: String,
    arity: Option<usize>,
    default: Option<DefaultMethod>,
}

impl MethodSpec {
    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared arity, `None` when any number of arguments is accepted
    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    /// Whether the method is implemented on the host side
    pub fn is_default(&self) -> bool {
        self.default.is_some()
    }
}

impl fmt::Debug for MethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSpec")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("default", &self.is_default())
            .finish()
    }
}

/// Description of an interface
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    methods: Vec<MethodSpec>,
}

impl CapabilitySet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a method forwarded to script code with a fixed arity
    pub fn method(self, name: &str, arity: usize) -> Self {
        self.push(name, Some(arity), None)
    }

    /// Add a method forwarded to script code accepting any arguments
    pub fn variadic_method(self, name: &str) -> Self {
        self.push(name, None, None)
    }

    /// Add a method implemented on the host side
    pub fn default_method<F>(self, name: &str, arity: usize, f: F) -> Self
    where
        F: Fn(&InterfaceProxy, &[HostValue]) -> BridgeResult<HostValue> + 'static,
    {
        self.push(name, Some(arity), Some(Rc::new(f)))
    }

    fn push(mut self, name: &str, arity: Option<usize>, default: Option<DefaultMethod>) -> Self {
        self.methods.retain(|m| m.name != name);
        self.methods.push(MethodSpec {
            name: name.to_string(),
            arity,
            default,
        });
        self
    }

    /// Look up a method
    pub fn get(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Whether a method exists
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All method names, in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.methods.iter().map(|m| m.name.as_str()).collect()
    }

    /// All methods
    pub fn methods(&self) -> &[MethodSpec] {
        &self.methods
    }

    /// Number of methods
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Proxy implementing a [`CapabilitySet`] on top of a context
#[derive(Debug, Clone)]
pub struct InterfaceProxy {
    context: Context,
    namespace: Option<String>,
    capabilities: CapabilitySet,
}

impl InterfaceProxy {
    pub(crate) fn new(context: Context, namespace: Option<String>, capabilities: CapabilitySet) -> Self {
        Self {
            context,
            namespace,
            capabilities,
        }
    }

    /// Call a method of the interface.
    ///
    /// Default methods run on the host; all others are invoked in the
    /// context under `namespace.method`.
    pub fn call(&self, method: &str, args: &[HostValue]) -> BridgeResult<HostValue> {
        let spec = self
            .capabilities
            .get(method)
            .ok_or_else(|| BridgeError::NotFound(self.qualified(method)))?;
        if let Some(arity) = spec.arity {
            if args.len() != arity {
                return Err(BridgeError::ArityMismatch {
                    name: self.qualified(method),
                    expected: arity,
                    got: args.len(),
                });
            }
        }
        match &spec.default {
            Some(default) => default(self, args),
            None => self.context.invoke(&self.qualified(method), args),
        }
    }

    /// Call a method and convert the result
    pub fn call_as<T: FromHostValue>(&self, method: &str, args: &[HostValue]) -> BridgeResult<T> {
        T::from_host(self.call(method, args)?)
    }

    /// Name the method is invoked under
    pub fn qualified(&self, method: &str) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}.{}", namespace, method),
            None => method.to_string(),
        }
    }

    /// Namespace of the proxy
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The interface description
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// The context calls are forwarded to
    pub fn context(&self) -> &Context {
        &self.context
    }
}
