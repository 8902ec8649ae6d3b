//! PTY-backed `exec` round trips (spec.md §4.6/§8 scenario 6), mirroring
//! the teacher's `vtcode-core/tests/pty_tests.rs` shape: spawn a real shell
//! command through the same tool the evaluator exposes and check the
//! resulting envelope.

use gsh_script::config::ExecWriter;
use gsh_script::exec::ExecTool;
use gsh_script::value::Value;
use std::sync::{Arc, Mutex};

fn field(result: &Value, key: &str) -> Value {
    match result {
        Value::Object(obj) => obj.borrow().get(key).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

#[test]
fn echo_hello_round_trips_through_a_pty() {
    let tool = ExecTool::new(std::env::temp_dir(), 64 * 1024, 10);
    let result = tool.exec("echo hello", None, None, None);

    let output = field(&result, "output");
    match output {
        Value::String(s) => assert!(s.contains("hello"), "unexpected output: {s}"),
        other => panic!("expected exec output to be a string, got {}", other.to_display_string()),
    }
    let exit_code = field(&result, "exitCode");
    match exit_code {
        Value::Number(n) => assert_eq!(n, 0.0),
        other => panic!("expected exitCode to be a number, got {}", other.to_display_string()),
    }
    assert!(field(&result, "error").eq_value(&Value::Null));
}

#[test]
fn nonzero_exit_code_is_surfaced_as_data_not_an_error() {
    let tool = ExecTool::new(std::env::temp_dir(), 64 * 1024, 10);
    let result = tool.exec("exit 3", None, None, None);

    assert!(field(&result, "error").eq_value(&Value::Null));
    match field(&result, "exitCode") {
        Value::Number(n) => assert_eq!(n, 3.0),
        other => panic!("expected exitCode to be a number, got {}", other.to_display_string()),
    }
}

#[test]
fn relative_working_directory_is_rejected() {
    let tool = ExecTool::new(std::env::temp_dir(), 64 * 1024, 10);
    let result = tool.exec("pwd", Some("relative/path"), None, None);

    match field(&result, "error") {
        Value::String(s) => assert!(s.contains("absolute"), "unexpected message: {s}"),
        other => panic!("expected a domain error, got {}", other.to_display_string()),
    }
}

#[test]
fn nonexistent_working_directory_is_rejected() {
    let tool = ExecTool::new(std::env::temp_dir(), 64 * 1024, 10);
    let dir = std::env::temp_dir().join("gsh-script-tests-does-not-exist");
    let result = tool.exec("pwd", Some(dir.to_str().unwrap()), None, None);

    assert!(!field(&result, "error").eq_value(&Value::Null));
}

#[test]
fn output_beyond_the_cap_is_truncated() {
    let tool = ExecTool::new(std::env::temp_dir(), 16, 10);
    let result = tool.exec("yes x | head -c 4096", None, None, None);

    match field(&result, "truncated") {
        Value::Bool(b) => assert!(b, "expected truncated=true for output past the cap"),
        _ => panic!("expected a truncated flag on a capped run"),
    }
}

struct CollectingWriter(Mutex<Vec<u8>>);

impl ExecWriter for CollectingWriter {
    fn write_chunk(&self, chunk: &[u8]) {
        self.0.lock().unwrap().extend_from_slice(chunk);
    }
}

#[test]
fn live_writer_receives_the_same_output_as_the_returned_value() {
    let tool = ExecTool::new(std::env::temp_dir(), 64 * 1024, 10);
    let writer = Arc::new(CollectingWriter(Mutex::new(Vec::new())));
    let result = tool.exec("echo hello", None, None, Some(writer.clone() as Arc<dyn ExecWriter>));

    let tee_output = String::from_utf8(writer.0.lock().unwrap().clone()).unwrap();
    assert!(tee_output.contains("hello"), "unexpected tee output: {tee_output}");

    match field(&result, "output") {
        Value::String(s) => assert!(s.contains("hello")),
        other => panic!("expected exec output to be a string, got {}", other.to_display_string()),
    }
}
