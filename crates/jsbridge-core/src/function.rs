//! Host callables exposed to script code
//!
//! Every host callable is stored in the same variadic shape: a slice of
//! arguments in, one value out. The typed constructors adapt fixed-arity
//! closures to that shape. Missing arguments are read as `Null` and surplus
//! arguments are ignored, matching how script functions treat their parameters.

use crate::convert::FromHostValue;
use crate::error::HostError;
use crate::value::HostValue;
use std::fmt;
use std::rc::Rc;

type Callable = dyn Fn(&[HostValue]) -> Result<HostValue, HostError>;

/// Host function callable from script code
#[derive(Clone)]
pub struct HostFunction {
    callable: Rc<Callable>,
    arity: Option<usize>,
}

fn arg<A: FromHostValue>(args: &[HostValue], index: usize) -> Result<A, HostError> {
    let value = args.get(index).cloned().unwrap_or(HostValue::Null);
    A::from_host(value).map_err(HostError::from)
}

impl HostFunction {
    /// Free-arity function receiving all arguments as a slice
    pub fn variadic<F>(f: F) -> Self
    where
        F: Fn(&[HostValue]) -> Result<HostValue, HostError> + 'static,
    {
        Self {
            callable: Rc::new(f),
            arity: None,
        }
    }

    /// Free-arity function that declares how many arguments it expects
    pub fn with_arity<F>(arity: usize, f: F) -> Self
    where
        F: Fn(&[HostValue]) -> Result<HostValue, HostError> + 'static,
    {
        Self {
            callable: Rc::new(f),
            arity: Some(arity),
        }
    }

    /// Zero-argument function producing a value
    pub fn supplier<R, F>(f: F) -> Self
    where
        R: Into<HostValue>,
        F: Fn() -> R + 'static,
    {
        Self::with_arity(0, move |_| Ok(f().into()))
    }

    /// One-argument function
    pub fn function<A, R, F>(f: F) -> Self
    where
        A: FromHostValue,
        R: Into<HostValue>,
        F: Fn(A) -> R + 'static,
    {
        Self::with_arity(1, move |args| Ok(f(arg(args, 0)?).into()))
    }

    /// Two-argument function
    pub fn bi_function<A, B, R, F>(f: F) -> Self
    where
        A: FromHostValue,
        B: FromHostValue,
        R: Into<HostValue>,
        F: Fn(A, B) -> R + 'static,
    {
        Self::with_arity(2, move |args| Ok(f(arg(args, 0)?, arg(args, 1)?).into()))
    }

    /// One-argument function with no result
    pub fn consumer<A, F>(f: F) -> Self
    where
        A: FromHostValue,
        F: Fn(A) + 'static,
    {
        Self::with_arity(1, move |args| {
            f(arg(args, 0)?);
            Ok(HostValue::Null)
        })
    }

    /// Two-argument function with no result
    pub fn bi_consumer<A, B, F>(f: F) -> Self
    where
        A: FromHostValue,
        B: FromHostValue,
        F: Fn(A, B) + 'static,
    {
        Self::with_arity(2, move |args| {
            f(arg(args, 0)?, arg(args, 1)?);
            Ok(HostValue::Null)
        })
    }

    /// One-argument function that can fail
    pub fn try_function<A, R, F>(f: F) -> Self
    where
        A: FromHostValue,
        R: Into<HostValue>,
        F: Fn(A) -> Result<R, HostError> + 'static,
    {
        Self::with_arity(1, move |args| Ok(f(arg(args, 0)?)?.into()))
    }

    /// Two-argument function that can fail
    pub fn try_bi_function<A, B, R, F>(f: F) -> Self
    where
        A: FromHostValue,
        B: FromHostValue,
        R: Into<HostValue>,
        F: Fn(A, B) -> Result<R, HostError> + 'static,
    {
        Self::with_arity(2, move |args| Ok(f(arg(args, 0)?, arg(args, 1)?)?.into()))
    }

    /// Call the function directly from the host
    pub fn call(&self, args: &[HostValue]) -> Result<HostValue, HostError> {
        (self.callable)(args)
    }

    /// Declared arity, `None` for variadic functions
    pub fn arity(&self) -> Option<usize> {
        self.arity
    }
}

impl PartialEq for HostFunction {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callable, &other.callable)
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFunction")
            .field("arity", &self.arity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use std::cell::RefCell;

    #[test]
    fn test_supplier() {
        let f = HostFunction::supplier(|| "Hello");
        assert_eq!(f.arity(), Some(0));
        assert_eq!(f.call(&[]).unwrap(), HostValue::from("Hello"));
    }

    #[test]
    fn test_function_pads_missing_arguments() {
        let f = HostFunction::function(|name: Option<String>| {
            format!("Hello {}", name.unwrap_or_else(|| "nobody".to_string()))
        });
        assert_eq!(f.call(&[]).unwrap(), HostValue::from("Hello nobody"));
        assert_eq!(
            f.call(&["Ann".into(), "ignored".into()]).unwrap(),
            HostValue::from("Hello Ann")
        );
    }

    #[test]
    fn test_bi_function() {
        let add = HostFunction::bi_function(|a: i32, b: i32| a + b);
        assert_eq!(add.call(&[2.into(), 3.into()]).unwrap(), HostValue::Int(5));
    }

    #[test]
    fn test_argument_type_mismatch_is_an_error() {
        let f = HostFunction::function(|x: i32| x * 2);
        let err = f.call(&["nope".into()]).unwrap_err();
        let bridge = err.downcast::<BridgeError>().unwrap();
        assert!(matches!(*bridge, BridgeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_consumers_return_null() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let f = HostFunction::bi_consumer(move |a: String, b: f64| {
            sink.borrow_mut().push(format!("{}={}", a, b));
        });
        assert_eq!(f.call(&["x".into(), 1.5.into()]).unwrap(), HostValue::Null);
        assert_eq!(seen.borrow().as_slice(), ["x=1.5".to_string()]);
    }

    #[test]
    fn test_try_function_propagates_error() {
        let f = HostFunction::try_function(|x: i32| -> Result<i32, HostError> {
            if x < 0 {
                Err("negative".into())
            } else {
                Ok(x)
            }
        });
        assert_eq!(f.call(&[1.into()]).unwrap(), HostValue::Int(1));
        assert_eq!(f.call(&[(-1).into()]).unwrap_err().to_string(), "negative");
    }

    #[test]
    fn test_identity_equality() {
        let f = HostFunction::supplier(|| 1);
        let g = HostFunction::supplier(|| 1);
        assert_eq!(f, f.clone());
        assert_ne!(f, g);
    }
}
