//! Structural equality, canonical rendering, and deep-copy for `Value`
//! (spec.md §3).

use super::{ObjectValue, Value};

pub fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            if rc_ptr_eq_array(x, y) {
                return true;
            }
            let x = x.borrow();
            let y = y.borrow();
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| value_eq(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            if rc_ptr_eq_object(x, y) {
                return true;
            }
            let x = x.borrow();
            let y = y.borrow();
            if x.len() != y.len() {
                return false;
            }
            x.keys().all(|k| {
                y.has(k)
                    && x.get(k)
                        .ok()
                        .zip(y.get(k).ok())
                        .map(|(a, b)| value_eq(&a, &b))
                        .unwrap_or(false)
            })
        }
        (Value::Tool(x), Value::Tool(y)) => std::rc::Rc::ptr_eq(x, y),
        (Value::NativeTool(x), Value::NativeTool(y)) => std::rc::Rc::ptr_eq(x, y),
        (Value::Model(x), Value::Model(y)) => std::rc::Rc::ptr_eq(x, y),
        (Value::Agent(x), Value::Agent(y)) => std::rc::Rc::ptr_eq(x, y),
        (Value::Conversation(x), Value::Conversation(y)) => std::rc::Rc::ptr_eq(x, y),
        (Value::MCPProxy(x), Value::MCPProxy(y)) => x.server == y.server,
        (Value::MCPTool(x), Value::MCPTool(y)) => x.server == y.server && x.tool == y.tool,
        _ => false,
    }
}

// Named helpers to avoid clippy's `ptr_eq`-on-Rc ambiguity reading as a
// value comparison at call sites above.
fn rc_ptr_eq_array(a: &std::rc::Rc<std::cell::RefCell<Vec<Value>>>, b: &std::rc::Rc<std::cell::RefCell<Vec<Value>>>) -> bool {
    std::rc::Rc::ptr_eq(a, b)
}
fn rc_ptr_eq_object(a: &std::rc::Rc<std::cell::RefCell<ObjectValue>>, b: &std::rc::Rc<std::cell::RefCell<ObjectValue>>) -> bool {
    std::rc::Rc::ptr_eq(a, b)
}

pub fn to_display_string(value: &Value, nested: bool) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Number(n) => format_number(*n),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => {
            if nested {
                format!("{:?}", s.as_ref())
            } else {
                s.to_string()
            }
        }
        Value::Array(items) => {
            let rendered: Vec<String> = items
                .borrow()
                .iter()
                .map(|v| to_display_string(v, true))
                .collect();
            format!("[{}]", rendered.join(", "))
        }
        Value::Object(obj) => {
            let obj = obj.borrow();
            let rendered: Vec<String> = obj
                .keys()
                .map(|k| {
                    let v = obj.get(k).unwrap_or(Value::Null);
                    format!("{}: {}", k, to_display_string(&v, true))
                })
                .collect();
            format!("{{{}}}", rendered.join(", "))
        }
        Value::Map(m) => {
            let m = m.borrow();
            let rendered: Vec<String> = m
                .keys_in_order()
                .map(|k| {
                    let v = m.get(k).cloned().unwrap_or(Value::Null);
                    format!(
                        "{} => {}",
                        to_display_string(&k.to_value(), true),
                        to_display_string(&v, true)
                    )
                })
                .collect();
            format!("Map{{{}}}", rendered.join(", "))
        }
        Value::Set(s) => {
            let s = s.borrow();
            let rendered: Vec<String> = s.values().iter().map(|v| to_display_string(v, true)).collect();
            format!("Set{{{}}}", rendered.join(", "))
        }
        Value::Tool(t) => format!("<tool {}>", t.name),
        Value::NativeTool(t) => format!("<native tool {}>", t.name),
        Value::Model(m) => format!("<model {}>", m.borrow().name),
        Value::Agent(a) => format!("<agent {}>", a.borrow().name),
        Value::Conversation(_) => "<conversation>".to_string(),
        Value::MCPProxy(p) => format!("<mcp {}>", p.server),
        Value::MCPTool(t) => format!("<mcp tool {}.{}>", t.server, t.tool),
        Value::Error(e) => format!("<error {}: {}>", e.kind, e.message),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

pub fn deep_copy(value: &Value) -> Value {
    match value {
        Value::Null | Value::Number(_) | Value::String(_) | Value::Bool(_) => value.clone(),
        Value::Array(items) => {
            Value::array(items.borrow().iter().map(deep_copy).collect())
        }
        Value::Object(obj) => Value::object(obj.borrow().deep_copy()),
        Value::Map(m) => {
            let m = m.borrow();
            let mut out = super::OrderedMap::default();
            for key in m.keys_in_order() {
                if let Some(v) = m.get(key) {
                    out.insert(key.clone(), deep_copy(v));
                }
            }
            Value::Map(std::rc::Rc::new(std::cell::RefCell::new(out)))
        }
        Value::Set(s) => {
            let mut out = super::OrderedSet::default();
            for v in s.borrow().values() {
                out.add(deep_copy(v));
            }
            Value::Set(std::rc::Rc::new(std::cell::RefCell::new(out)))
        }
        // Primitive-handle values: the function/closure/late-bound
        // identity is immutable, so copies share the reference, matching
        // spec.md §3 ("the functions themselves are considered immutable").
        Value::Tool(_)
        | Value::NativeTool(_)
        | Value::Model(_)
        | Value::Agent(_)
        | Value::Conversation(_)
        | Value::MCPProxy(_)
        | Value::MCPTool(_)
        | Value::Error(_) => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrays_compare_structurally() {
        let a = Value::array(vec![Value::Number(1.0), Value::string("x")]);
        let b = Value::array(vec![Value::Number(1.0), Value::string("x")]);
        assert!(value_eq(&a, &b));
    }

    #[test]
    fn nested_strings_are_quoted_standalone_not() {
        let v = Value::array(vec![Value::string("hi")]);
        assert_eq!(to_display_string(&v, false), "[\"hi\"]");
        assert_eq!(to_display_string(&Value::string("hi"), false), "hi");
    }
}
