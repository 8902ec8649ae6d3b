//! `Regexp.*` and string built-ins through real script source (spec.md
//! §4.7/§4.10/§8).

use gsh_script::value::Value;
use gsh_script::{Evaluator, InterpreterOptions};

fn eval(source: &str) -> gsh_script::EvalOutcome {
    let mut ev = Evaluator::new(InterpreterOptions::default());
    ev.eval_string(source, None)
}

#[test]
fn regexp_test_and_find_all_roundtrip() {
    let outcome = eval(r#"Regexp.findAll("a1 b22 c333", "[0-9]+");"#);
    assert!(outcome.errors.is_empty(), "unexpected errors");
    match outcome.final_result {
        Value::Array(items) => {
            let items = items.borrow();
            let rendered: Vec<String> = items.iter().map(|v| v.to_display_string()).collect();
            assert_eq!(rendered, vec!["1", "22", "333"]);
        }
        other => panic!("expected an array, got {}", other.to_display_string()),
    }
}

#[test]
fn regexp_replace_all_substitutes_every_match() {
    let outcome = eval(r#"Regexp.replaceAll("a-b-c", "-", "_");"#);
    assert!(outcome.errors.is_empty());
    match outcome.final_result {
        Value::String(s) => assert_eq!(s.as_ref(), "a_b_c"),
        other => panic!("expected a string, got {}", other.to_display_string()),
    }
}

#[test]
fn invalid_pattern_is_a_domain_error_not_a_panic() {
    let outcome = eval(r#"Regexp.test("x", "(unterminated");"#);
    assert!(!outcome.errors.is_empty(), "an invalid pattern should surface as an evaluator error");
}

#[test]
fn substring_swaps_a_reversed_range_end_to_end() {
    let outcome = eval(r#""abcdefgh".substring(6, 2) == "abcdefgh".substring(2, 6);"#);
    assert!(outcome.errors.is_empty(), "unexpected errors");
    assert!(matches!(outcome.final_result, Value::Bool(true)));
}

#[test]
fn string_methods_chain_through_the_builtin_dispatch_table() {
    let outcome = eval(r#"" Hello World ".trim().toLowerCase().split(" ");"#);
    assert!(outcome.errors.is_empty(), "unexpected errors");
    match outcome.final_result {
        Value::Array(items) => {
            let items = items.borrow();
            let rendered: Vec<String> = items.iter().map(|v| v.to_display_string()).collect();
            assert_eq!(rendered, vec!["hello", "world"]);
        }
        other => panic!("expected an array, got {}", other.to_display_string()),
    }
}
