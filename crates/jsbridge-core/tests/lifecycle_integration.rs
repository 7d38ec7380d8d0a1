//! Resource lifecycle integration tests
//!
//! Tests validate:
//! - Closing a runtime cascades to contexts and their handles
//! - Released handles fail fast instead of touching the engine
//! - Release and close are idempotent, in any order with drop-driven cleanup
//! - Creating and dropping resources in a loop keeps engine memory bounded
//! - Scopes in use by running script code refuse to close
//!
//! # Running Tests
//! ```bash
//! cargo test --test lifecycle_integration
//! ```

use jsbridge_core::{BridgeError, HostFunction, HostValue, JsArray, JsFunction, JsObject, Runtime};

// ===== Cascading Close Tests =====

#[test]
fn test_runtime_close_releases_everything() {
    let runtime = Runtime::new().unwrap();
    let context = runtime.create_context().unwrap();
    context
        .eval("var a = [1, 2]; var o = { k: 1 }; function f() { return 1; }")
        .unwrap();
    let array: JsArray = context.get_global_as("a").unwrap();
    let object: JsObject = context.get_global_as("o").unwrap();
    let function: JsFunction = context.get_global_as("f").unwrap();
    let extra = context.new_array().unwrap();
    assert_eq!(context.handle_count(), 4);
    assert_eq!(runtime.stats().live_contexts, 1);
    assert_eq!(runtime.stats().live_handles, 4);

    let report = runtime.close().unwrap();
    assert!(report.is_clean());
    assert_eq!(report.released, 1);
    assert!(runtime.is_closed());
    assert!(context.is_closed());

    assert!(array.is_released());
    assert!(object.is_released());
    assert!(function.is_released());
    assert!(extra.is_released());
    assert!(matches!(array.len().unwrap_err(), BridgeError::InvalidHandle("array")));
    assert!(matches!(function.call(&[]).unwrap_err(), BridgeError::InvalidHandle("function")));
    assert!(matches!(
        context.eval("1").unwrap_err(),
        BridgeError::InvalidHandle("context")
    ));
    assert!(matches!(
        runtime.create_context().unwrap_err(),
        BridgeError::InvalidHandle("runtime")
    ));
}

#[test]
fn test_context_close_releases_its_handles_only() {
    let runtime = Runtime::new().unwrap();
    let first = runtime.create_context().unwrap();
    let second = runtime.create_context().unwrap();
    let a = first.new_array().unwrap();
    let b = second.new_array().unwrap();

    let report = first.close().unwrap();
    assert_eq!(report.released, 1);
    assert!(a.is_released());
    assert!(!b.is_released());
    assert_eq!(runtime.stats().live_contexts, 1);

    b.push(1).unwrap();
    assert_eq!(second.eval("1 + 1").unwrap(), HostValue::Int(2));
}

#[test]
fn test_contexts_are_isolated() {
    let runtime = Runtime::new().unwrap();
    let first = runtime.create_context().unwrap();
    let second = runtime.create_context().unwrap();
    first.set_global("shared", 1).unwrap();
    assert_eq!(second.get_global("shared").unwrap(), HostValue::Null);
    assert_ne!(first.id(), second.id());
}

// ===== Idempotent Release Tests =====

#[test]
fn test_close_twice_is_a_no_op() {
    let runtime = Runtime::new().unwrap();
    let context = runtime.create_context().unwrap();
    let array = context.new_array().unwrap();

    array.release().unwrap();
    array.release().unwrap();
    assert_eq!(context.handle_count(), 0);

    context.close().unwrap();
    let again = context.close().unwrap();
    assert_eq!(again.released, 0);

    runtime.close().unwrap();
    runtime.close().unwrap();
}

#[test]
fn test_release_after_scope_close() {
    let runtime = Runtime::new().unwrap();
    let context = runtime.create_context().unwrap();
    let object = context.new_object().unwrap();
    runtime.close().unwrap();
    object.release().unwrap();
    context.close().unwrap();
    drop(object);
    drop(context);
}

#[test]
fn test_drop_without_close() {
    let runtime = Runtime::new().unwrap();
    let context = runtime.create_context().unwrap();
    let array = context.new_array().unwrap();
    let function: JsFunction = context.eval_as("(function() { return 2; })").unwrap();
    drop(runtime);
    // The context keeps the engine alive until it is dropped
    assert_eq!(function.call(&[]).unwrap(), HostValue::Int(2));
    array.push(1).unwrap();
    drop(context);
    assert_eq!(array.len().unwrap(), 1);
}

#[test]
fn test_drop_releases_context_with_reentrant_callback() {
    let runtime = Runtime::new().unwrap();
    let context = runtime.create_context().unwrap();
    let weak = context.downgrade();
    context
        .set_global(
            "again",
            HostFunction::variadic(move |_| Ok(weak.context()?.eval("40 + 2")?)),
        )
        .unwrap();
    assert_eq!(context.eval("again()").unwrap(), HostValue::Int(42));
    assert_eq!(runtime.stats().live_contexts, 1);

    drop(context);
    assert_eq!(runtime.stats().live_contexts, 0);
}

#[test]
fn test_dropped_views_release_their_roots() {
    let runtime = Runtime::new().unwrap();
    let context = runtime.create_context().unwrap();
    {
        let _a = context.new_array().unwrap();
        let _o = context.new_object().unwrap();
        assert_eq!(context.handle_count(), 2);
    }
    assert_eq!(context.handle_count(), 0);

    let array = context.new_array().unwrap();
    let clone = array.clone();
    drop(array);
    assert_eq!(context.handle_count(), 1);
    clone.push(1).unwrap();
    drop(clone);
    assert_eq!(context.handle_count(), 0);
}

// ===== Bounded Memory Tests =====

#[test]
fn test_create_and_drop_loop_is_bounded() {
    let runtime = Runtime::new().unwrap();

    let churn = |rounds: usize| {
        for i in 0..rounds {
            let context = runtime.create_context().unwrap();
            context
                .eval(&format!(
                    "var data = []; for (var j = 0; j < 100; j++) data.push('item' + j + '{}');",
                    i
                ))
                .unwrap();
            let _array: JsArray = context.get_global_as("data").unwrap();
            let _function: JsFunction = context.eval_as("(function() {})").unwrap();
            let _object = context.new_object().unwrap();
        }
        runtime.run_gc().unwrap();
    };

    churn(50);
    let baseline = runtime.memory_usage().unwrap().memory_used_size;
    churn(500);
    let after = runtime.memory_usage().unwrap().memory_used_size;

    assert_eq!(runtime.stats().live_contexts, 0);
    assert!(
        after < baseline + 512 * 1024,
        "memory grew from {} to {} bytes",
        baseline,
        after
    );
}

#[test]
fn test_handle_churn_in_one_context_is_bounded() {
    let runtime = Runtime::new().unwrap();
    let context = runtime.create_context().unwrap();
    context.eval("function make() { return { payload: 'x'.repeat(1000) }; }").unwrap();
    for _ in 0..5_000 {
        let _object: JsObject = context.invoke_as("make", &[]).unwrap();
    }
    assert_eq!(context.handle_count(), 0);
    runtime.run_gc().unwrap();
    assert!(runtime.memory_usage().unwrap().memory_used_size < 8 * 1024 * 1024);
}

// ===== Busy Scope Tests =====

#[test]
fn test_scopes_refuse_to_close_while_running() {
    let runtime = Runtime::new().unwrap();
    let context = runtime.create_context().unwrap();

    let inner_runtime = runtime.clone();
    let inner_context = context.downgrade();
    context
        .set_global(
            "tryClose",
            HostFunction::supplier(move || {
                let runtime_busy = matches!(inner_runtime.close(), Err(BridgeError::Busy(_)));
                let context_busy = inner_context
                    .upgrade()
                    .is_some_and(|context| matches!(context.close(), Err(BridgeError::Busy(_))));
                let gc_busy = matches!(inner_runtime.run_gc(), Err(BridgeError::Busy(_)));
                runtime_busy && context_busy && gc_busy
            }),
        )
        .unwrap();

    assert_eq!(context.eval("tryClose()").unwrap(), HostValue::Bool(true));
    assert!(!context.is_closed());
    runtime.close().unwrap();
}

#[test]
fn test_other_context_is_busy_during_callback() {
    let runtime = Runtime::new().unwrap();
    let first = runtime.create_context().unwrap();
    let second = runtime.create_context().unwrap();

    let other = second.clone();
    first
        .set_global(
            "peek",
            HostFunction::supplier(move || matches!(other.eval("1"), Err(BridgeError::Busy(_)))),
        )
        .unwrap();
    assert_eq!(first.eval("peek()").unwrap(), HostValue::Bool(true));
    assert_eq!(second.eval("1").unwrap(), HostValue::Int(1));
}
