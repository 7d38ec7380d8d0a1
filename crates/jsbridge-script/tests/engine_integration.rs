//! Script engine facade integration tests
//!
//! Tests validate:
//! - Bindings from both scopes reach the script, engine scope winning
//! - Reassigned engine-scope bindings are copied back after eval
//! - Functions defined by one eval can be invoked and proxied afterwards
//! - Engine attributes configure the runtime budgets
//! - Scripts can be read from files
//!
//! # Running Tests
//! ```bash
//! cargo test -p jsbridge-script --test engine_integration
//! ```

use jsbridge_core::{CapabilitySet, ErrorKind, HostFunction, HostValue};
use jsbridge_script::{Bindings, ScopeKind, ScriptEngine, ScriptEngineFactory, TIMEOUT};
use std::io::Write;
use std::time::{Duration, Instant};

fn engine() -> ScriptEngine {
    ScriptEngineFactory::new().script_engine().unwrap()
}

// ===== Bindings =====

#[test]
fn test_eval_sees_bindings() {
    let mut engine = engine();
    engine.put("a", 40).unwrap();
    engine
        .bindings_mut(ScopeKind::Global)
        .insert("b", 2);
    assert_eq!(engine.eval("a + b").unwrap(), HostValue::Int(42));
}

#[test]
fn test_engine_scope_shadows_global_scope() {
    let mut engine = engine();
    engine
        .bindings_mut(ScopeKind::Global)
        .insert("who", "global");
    engine.put("who", "engine").unwrap();
    assert_eq!(engine.eval("who").unwrap(), HostValue::from("engine"));
}

#[test]
fn test_reassigned_binding_copied_back() {
    let mut engine = engine();
    engine.put("counter", 1).unwrap();
    engine.eval("counter = counter + 1;").unwrap();
    assert_eq!(engine.get("counter"), Some(&HostValue::Int(2)));

    engine.eval("counter = counter * 10;").unwrap();
    assert_eq!(engine.get("counter"), Some(&HostValue::Int(20)));
}

#[test]
fn test_failed_eval_keeps_bindings() {
    let mut engine = engine();
    engine.put("counter", 1).unwrap();
    let err = engine
        .eval("counter = 5; throw new Error('stop');")
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Script));
    assert_eq!(engine.get("counter"), Some(&HostValue::Int(1)));
}

#[test]
fn test_eval_with_extra_bindings() {
    let mut engine = engine();
    engine.put("base", 10).unwrap();
    let extra: Bindings = vec![("delta", 5)].into_iter().collect();
    assert_eq!(
        engine.eval_with_bindings("base + delta", &extra).unwrap(),
        HostValue::Int(15)
    );
    // extra bindings do not persist into the next eval
    assert_eq!(engine.eval("typeof delta").unwrap(), HostValue::from("undefined"));
}

#[test]
fn test_host_function_binding() {
    let mut engine = engine();
    engine
        .put("greet", HostFunction::function(|name: String| format!("Hello {}", name)))
        .unwrap();
    assert_eq!(engine.eval("greet('World')").unwrap(), HostValue::from("Hello World"));
}

// ===== Invocation =====

#[test]
fn test_invoke_function_after_eval() {
    let mut engine = engine();
    engine
        .eval("function twice(v) { return v * 2; }")
        .unwrap();
    assert_eq!(
        engine.invoke_function("twice", &[HostValue::Int(21)]).unwrap(),
        HostValue::Int(42)
    );
}

#[test]
fn test_invoke_missing_function() {
    let mut engine = engine();
    let err = engine.invoke_function("nothing", &[]).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
}

#[test]
fn test_get_interface_mixes_host_and_script_functions() {
    let mut engine = engine();
    engine
        .put("f1", HostFunction::function(|a: String| format!("Hello {}", a)))
        .unwrap();
    engine
        .eval("function f2(a) { return 'Hello from JS dear ' + a; }")
        .unwrap();

    let proxy = engine
        .get_interface(None, CapabilitySet::new().method("f1", 1).method("f2", 1))
        .unwrap();
    assert_eq!(
        proxy.call_as::<String>("f1", &["World".into()]).unwrap(),
        "Hello World"
    );
    assert_eq!(
        proxy.call_as::<String>("f2", &["World".into()]).unwrap(),
        "Hello from JS dear World"
    );
}

// ===== Attributes =====

#[test]
fn test_timeout_attribute_interrupts() {
    let mut engine = engine();
    engine.put(TIMEOUT, 200).unwrap();

    let start = Instant::now();
    let err = engine.eval("while (true) {}").unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Interrupted));
    assert!(start.elapsed() < Duration::from_secs(2));

    // the engine keeps working after an interrupt
    assert_eq!(engine.eval("1 + 1").unwrap(), HostValue::Int(2));
}

#[test]
fn test_attributes_not_visible_to_script() {
    let mut engine = engine();
    engine.put(TIMEOUT, 1000).unwrap();
    assert_eq!(
        engine.eval("typeof globalThis['jsbridge.timeout']").unwrap(),
        HostValue::from("undefined")
    );
}

// ===== Sources =====

#[test]
fn test_eval_reader_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "var total = 0;").unwrap();
    writeln!(file, "for (var i = 1; i <= 10; i++) {{ total += i; }}").unwrap();
    writeln!(file, "total;").unwrap();

    let mut engine = engine();
    let source = std::fs::File::open(file.path()).unwrap();
    assert_eq!(engine.eval_reader(source).unwrap(), HostValue::Int(55));
}

#[test]
fn test_script_error_location() {
    let mut engine = engine();
    let err = engine
        .eval("var a = 1;\nvar b = 2;\nthrow new Error('line three');")
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Script));
    assert_eq!(err.line(), Some(3));
    assert!(err.to_string().contains("line three"));
}

#[test]
fn test_returned_view_stays_usable() {
    let mut engine = engine();
    let value = engine.eval("[1, 2, 3]").unwrap();
    let HostValue::Array(array) = value else {
        panic!("expected an array view, got {:?}", value);
    };
    assert_eq!(array.len().unwrap(), 3);
    array.push(4).unwrap();
    assert_eq!(array.len().unwrap(), 4);
}
