//! Execution governance and error translation integration tests
//!
//! Tests validate:
//! - Wall-clock budgets interrupt runaway scripts with bounded overshoot
//! - View and global access that runs accessors is governed too
//! - An interrupt does not change the kind of later errors
//! - Memory budgets surface as out-of-memory errors
//! - Host callback failures keep their cause and script location
//! - Script exceptions carry message and line
//! - Reentrant callbacks share the outer budget
//! - Interface proxies forward to script functions
//!
//! # Running Tests
//! ```bash
//! cargo test --test execution_integration
//! ```

use jsbridge_core::{
    BridgeError, CapabilitySet, Context, ErrorKind, HostError, HostFunction, HostValue, JsObject,
    Runtime, RuntimeOptions,
};
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct LookupError(String);

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no entry for '{}'", self.0)
    }
}

impl std::error::Error for LookupError {}

fn setup() -> (Runtime, Context) {
    let runtime = Runtime::new().unwrap();
    let context = runtime.create_context().unwrap();
    (runtime, context)
}

// ===== Interrupt Tests =====

#[test]
fn test_infinite_loop_is_interrupted() {
    let (runtime, context) = setup();
    runtime.with_script_runtime_limit(Duration::from_secs(1));

    let start = Instant::now();
    let err = context.eval("while (true) {}").unwrap_err();
    let elapsed = start.elapsed();

    assert!(err.is_interrupted(), "unexpected error: {}", err);
    assert!(err.to_string().contains("interrupted"));
    assert!(elapsed >= Duration::from_secs(1), "interrupted early after {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1500), "overshoot: {:?}", elapsed);
}

#[test]
fn test_context_is_usable_after_interrupt() {
    let (runtime, context) = setup();
    runtime.with_script_runtime_limit(Duration::from_millis(100));
    assert!(context.eval("for (;;) {}").unwrap_err().is_interrupted());
    assert_eq!(context.eval("1 + 2").unwrap(), HostValue::Int(3));
    assert!(!runtime.governor().is_running());
}

#[test]
fn test_interrupt_cannot_be_caught_by_script() {
    let (runtime, context) = setup();
    runtime.with_script_runtime_limit(Duration::from_millis(100));
    let err = context
        .eval("var caught = false; try { while (true) {} } catch (e) { caught = true; } caught")
        .unwrap_err();
    assert!(err.is_interrupted());
}

#[test]
fn test_interrupt_while_calling_function() {
    let (runtime, context) = setup();
    context.eval("function spin() { for (;;) {} }").unwrap();
    runtime.with_script_runtime_limit(Duration::from_millis(200));
    let start = Instant::now();
    let err = context.invoke("spin", &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Interrupted);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_budget_is_shared_with_reentrant_calls() {
    let (runtime, context) = setup();
    runtime.with_script_runtime_limit(Duration::from_millis(300));

    let inner = context.downgrade();
    context
        .set_global(
            "nested",
            HostFunction::variadic(move |_| {
                inner.context()?.eval("for (;;) {}")?;
                Ok(HostValue::Null)
            }),
        )
        .unwrap();

    let start = Instant::now();
    let err = context.eval("nested()").unwrap_err();
    assert!(err.is_interrupted(), "unexpected error: {}", err);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_no_limit_never_interrupts() {
    let (runtime, context) = setup();
    assert_eq!(runtime.script_runtime_limit(), None);
    assert_eq!(
        context
            .eval("var n = 0; for (var i = 0; i < 2000000; i++) n += i % 3; n")
            .unwrap(),
        HostValue::Int(1999999)
    );
}

#[test]
fn test_view_access_is_governed() {
    let (runtime, context) = setup();
    context
        .eval("var slow = { get spin() { for (;;) {} } };")
        .unwrap();
    let slow: JsObject = context.get_global_as("slow").unwrap();
    runtime.with_script_runtime_limit(Duration::from_millis(200));

    let start = Instant::now();
    let err = slow.get("spin").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Interrupted);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_global_access_is_governed() {
    let (runtime, context) = setup();
    context
        .eval("Object.defineProperty(globalThis, 'spin', { get: function() { for (;;) {} } });")
        .unwrap();
    runtime.with_script_runtime_limit(Duration::from_millis(200));

    let start = Instant::now();
    let err = context.get_global("spin").unwrap_err();
    assert!(err.is_interrupted(), "unexpected error: {}", err);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_later_errors_are_not_reported_as_interrupts() {
    let (runtime, context) = setup();
    context
        .eval("var o = { get bad() { throw new Error('getter failed'); } };")
        .unwrap();
    let o: JsObject = context.get_global_as("o").unwrap();

    runtime.with_script_runtime_limit(Duration::from_millis(50));
    assert!(context.eval("for (;;) {}").unwrap_err().is_interrupted());

    let err = o.get("bad").unwrap_err();
    assert!(!err.is_interrupted(), "unexpected error: {}", err);
    assert_eq!(err.kind(), ErrorKind::Script);
    assert!(err.message().contains("getter failed"));

    let err = context.eval("null.x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Script);
}

// ===== Memory Budget Tests =====

#[test]
fn test_memory_limit_raises_out_of_memory() {
    let runtime =
        Runtime::with_options(RuntimeOptions::default().with_memory_limit(8 * 1024 * 1024)).unwrap();
    let context = runtime.create_context().unwrap();
    let err = context
        .eval("var hog = []; while (true) { hog.push('x'.repeat(4096) + hog.length); }")
        .unwrap_err();
    assert!(err.is_out_of_memory(), "unexpected error: {}", err);
    assert_eq!(runtime.memory_limit(), Some(8 * 1024 * 1024));
}

#[test]
fn test_memory_limit_can_be_set_later() {
    let (runtime, context) = setup();
    runtime.with_memory_limit(8 * 1024 * 1024).unwrap();
    let err = context
        .eval("var hog = []; for (;;) hog.push(new Array(10000).fill(1.5));")
        .unwrap_err();
    assert!(err.is_out_of_memory(), "unexpected error: {}", err);
}

// ===== Error Translation Tests =====

#[test]
fn test_script_error_has_message_and_line() {
    let (_runtime, context) = setup();
    let err = context
        .eval("var x = 1;\nvar y = 2;\nthrow new Error('bad state');")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Script);
    assert!(err.message().contains("bad state"));
    assert_eq!(err.line(), Some(3));
    assert!(err.to_string().contains("bad state"));
}

#[test]
fn test_syntax_error_is_a_script_error() {
    let (_runtime, context) = setup();
    let err = context.eval("var = ;").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Script);
}

#[test]
fn test_thrown_non_error_values() {
    let (_runtime, context) = setup();
    assert_eq!(context.eval("throw 'plain'").unwrap_err().message(), "plain");
    assert_eq!(context.eval("throw 42").unwrap_err().message(), "42");
}

#[test]
fn test_host_error_keeps_cause_and_location() {
    let (_runtime, context) = setup();
    context
        .set_global(
            "lookup",
            HostFunction::try_function(|key: String| -> Result<HostValue, HostError> {
                Err(Box::new(LookupError(key)))
            }),
        )
        .unwrap();

    let err = context
        .eval("var a = 1;\nvar b = 2;\nlookup('missing');")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HostCallback);
    assert_eq!(err.line(), Some(3));

    let cause = err.host_cause().unwrap();
    let lookup = cause.downcast_ref::<LookupError>().unwrap();
    assert_eq!(lookup.0, "missing");
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_host_error_can_be_caught_by_script() {
    let (_runtime, context) = setup();
    context
        .set_global(
            "fail",
            HostFunction::variadic(|_| Err(Box::new(LookupError("k".into())) as HostError)),
        )
        .unwrap();
    assert_eq!(
        context
            .eval("try { fail(); 'no' } catch (e) { e.message }")
            .unwrap(),
        HostValue::from("no entry for 'k'")
    );
    // Handled errors do not leak into later failures
    let err = context.eval("throw new Error('later')").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Script);
}

#[test]
fn test_invoke_missing_function() {
    let (_runtime, context) = setup();
    context.eval("var notFn = 3; var ns = {};").unwrap();
    assert!(matches!(
        context.invoke("nothing", &[]).unwrap_err(),
        BridgeError::NotFound(_)
    ));
    assert!(matches!(
        context.invoke("ns.deeper.fn", &[]).unwrap_err(),
        BridgeError::NotFound(_)
    ));
    assert!(matches!(
        context.invoke("notFn", &[]).unwrap_err(),
        BridgeError::NotCallable(_)
    ));
}

// ===== Reentrancy Tests =====

#[test]
fn test_reentrant_callback() {
    let (_runtime, context) = setup();
    let inner = context.downgrade();
    context
        .set_global(
            "evalTwice",
            HostFunction::try_function(move |code: String| {
                let value: i32 = inner.context()?.eval_as(&code)?;
                Ok::<_, HostError>(value * 2)
            }),
        )
        .unwrap();
    context.eval("var base = 20;").unwrap();
    assert_eq!(
        context.eval("evalTwice('base + 1') + 1").unwrap(),
        HostValue::Int(43)
    );
}

#[test]
fn test_callback_calls_back_into_script_function() {
    let (_runtime, context) = setup();
    context.eval("function inc(x) { return x + 1; }").unwrap();
    let inner = context.downgrade();
    context
        .set_global(
            "viaHost",
            HostFunction::try_function(move |x: i32| {
                inner
                    .context()
                    .and_then(|context| context.invoke("inc", &[x.into()]))
                    .map_err(HostError::from)
            }),
        )
        .unwrap();
    assert_eq!(context.eval("viaHost(viaHost(1))").unwrap(), HostValue::Int(3));
}

// ===== Interface Proxy Tests =====

#[test]
fn test_interface_proxy_forwards_calls() {
    let (_runtime, context) = setup();
    context
        .eval("var calc = { add: function(a, b) { return a + b; }, neg: function(a) { return -a; } };")
        .unwrap();
    let capabilities = CapabilitySet::new()
        .method("add", 2)
        .method("neg", 1)
        .default_method("sub", 2, |proxy, args| {
            let negated = proxy.call("neg", &args[1..])?;
            proxy.call("add", &[args[0].clone(), negated])
        });
    let calc = context.get_interface(Some("calc"), capabilities);
    assert_eq!(calc.call_as::<i32>("add", &[2.into(), 3.into()]).unwrap(), 5);
    assert_eq!(calc.call_as::<i32>("sub", &[10.into(), 4.into()]).unwrap(), 6);
}
