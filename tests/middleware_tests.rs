//! Middleware ordering and short-circuit behavior (spec.md §4.4/§8).

use std::collections::HashMap;

use gsh_script::value::{NativeToolValue, ObjectValue, Value};
use gsh_script::{Evaluator, InterpreterOptions};

fn recording_handler(log: std::rc::Rc<std::cell::RefCell<Vec<&'static str>>>, name: &'static str, handled: bool) -> Value {
    let invoker = move |args: HashMap<String, Value>| {
        log.borrow_mut().push(name);
        let next = args.get("next").cloned();
        if handled {
            let mut out = ObjectValue::new();
            out.set_plain("handled", Value::Bool(true));
            out.set_plain("by", Value::string(name));
            return Ok(Value::object(out));
        }
        match next {
            Some(next_tool) => Ok(next_tool),
            None => Ok(Value::Null),
        }
    };
    Value::NativeTool(std::rc::Rc::new(NativeToolValue {
        name: name.to_string(),
        description: "test handler".to_string(),
        parameters_schema: serde_json::json!({ "properties": { "next": {} } }),
        param_names: vec!["next".to_string()],
        invoker: Box::new(invoker),
    }))
}

#[test]
fn handlers_run_in_registration_order_until_one_handles() {
    let evaluator = Evaluator::new(InterpreterOptions::default());
    let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));

    let first = recording_handler(log.clone(), "first", false);
    let second = recording_handler(log.clone(), "second", true);
    let third = recording_handler(log.clone(), "third", false);

    evaluator.middleware().register("beforeExec", first);
    evaluator.middleware().register("beforeExec", second);
    evaluator.middleware().register("beforeExec", third);

    let mut ctx = ObjectValue::new();
    ctx.set_plain("input", Value::string("ls"));
    let result = evaluator.emit_event("beforeExec", ctx).unwrap();

    assert_eq!(*log.borrow(), vec!["first", "second"]);
    let result = result.expect("second handler marked the event handled");
    match result {
        Value::Object(obj) => {
            let obj = obj.borrow();
            let by = obj.get("by").unwrap_or(Value::Null);
            assert!(by.eq_value(&Value::string("second")));
        }
        other => panic!("expected an object result, got {}", other.to_display_string()),
    }
}

#[test]
fn no_handler_handles_means_no_short_circuit() {
    let evaluator = Evaluator::new(InterpreterOptions::default());
    let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));

    evaluator.middleware().register("beforeExec", recording_handler(log.clone(), "first", false));
    evaluator.middleware().register("beforeExec", recording_handler(log.clone(), "second", false));

    let ctx = ObjectValue::new();
    let result = evaluator.emit_event("beforeExec", ctx).unwrap();

    assert_eq!(*log.borrow(), vec!["first", "second"]);
    assert!(result.is_none());
}

#[test]
fn removed_handler_by_id_is_skipped() {
    let evaluator = Evaluator::new(InterpreterOptions::default());
    let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));

    let id = evaluator.middleware().register("beforeExec", recording_handler(log.clone(), "first", true));
    evaluator.middleware().remove_by_id("beforeExec", id);

    let ctx = ObjectValue::new();
    let result = evaluator.emit_event("beforeExec", ctx).unwrap();

    assert!(log.borrow().is_empty());
    assert!(result.is_none());
}
