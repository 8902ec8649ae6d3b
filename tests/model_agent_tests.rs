//! `model`/`agent` declaration validation and the `gsh.agents.push` path
//! (spec.md §4.1/§4.3/§8), exercised through real script source rather than
//! calling the evaluator's internals directly.

use gsh_script::{Evaluator, InterpreterOptions};

fn run(evaluator: &mut Evaluator, source: &str) -> gsh_script::EvalOutcome {
    evaluator.eval_string(source, None)
}

#[test]
fn model_declaration_requires_provider_and_model_fields() {
    let mut evaluator = Evaluator::new(InterpreterOptions::default());
    let outcome = run(&mut evaluator, r#"model m = { provider: "openai" };"#);
    assert!(!outcome.errors.is_empty(), "missing `model` field should be rejected");
}

#[test]
fn well_formed_model_and_agent_declarations_succeed() {
    let mut evaluator = Evaluator::new(InterpreterOptions::default());
    let outcome = run(
        &mut evaluator,
        r#"
        model m = { provider: "openai", model: "gpt-4o-mini" };
        agent a = { model: m, systemPrompt: "be terse" };
        gsh.agents.push(a);
        "#,
    );
    assert!(outcome.errors.is_empty(), "unexpected errors: {:?}", outcome.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>());
}

#[test]
fn agent_push_rejects_the_reserved_default_name() {
    let mut evaluator = Evaluator::new(InterpreterOptions::default());
    let outcome = run(
        &mut evaluator,
        r#"
        model m = { provider: "openai", model: "gpt-4o-mini" };
        agent default = { model: m };
        gsh.agents.push(default);
        "#,
    );
    assert!(!outcome.errors.is_empty(), "pushing an agent named `default` should be rejected");
}

#[test]
fn agent_push_rejects_duplicate_names() {
    let mut evaluator = Evaluator::new(InterpreterOptions::default());
    let outcome = run(
        &mut evaluator,
        r#"
        model m = { provider: "openai", model: "gpt-4o-mini" };
        agent a = { model: m };
        gsh.agents.push(a);
        gsh.agents.push(a);
        "#,
    );
    assert!(!outcome.errors.is_empty(), "pushing two agents named `a` should be rejected on the second push");
}

#[test]
fn distinctly_named_agents_can_both_be_pushed() {
    let mut evaluator = Evaluator::new(InterpreterOptions::default());
    let outcome = run(
        &mut evaluator,
        r#"
        model m = { provider: "openai", model: "gpt-4o-mini" };
        agent a = { model: m };
        agent b = { model: m };
        gsh.agents.push(a);
        gsh.agents.push(b);
        "#,
    );
    assert!(outcome.errors.is_empty(), "unexpected errors: {:?}", outcome.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>());
}

#[test]
fn agent_added_hook_fires_exactly_once_per_push() {
    let evaluator = Evaluator::new(InterpreterOptions::default());
    let count = std::rc::Rc::new(std::cell::Cell::new(0));
    {
        let count = count.clone();
        evaluator.set_on_agent_added(move |_agent| {
            count.set(count.get() + 1);
        });
    }
    let mut evaluator = evaluator;
    let outcome = run(
        &mut evaluator,
        r#"
        model m = { provider: "openai", model: "gpt-4o-mini" };
        agent a = { model: m };
        gsh.agents.push(a);
        "#,
    );
    assert!(outcome.errors.is_empty());
    assert_eq!(count.get(), 1);
}

#[test]
fn current_agent_must_reference_a_known_agent() {
    let mut evaluator = Evaluator::new(InterpreterOptions::default());
    let outcome = run(
        &mut evaluator,
        r#"
        model m = { provider: "openai", model: "gpt-4o-mini" };
        agent a = { model: m };
        gsh.agents.push(a);
        gsh.currentAgent = "a";
        gsh.currentAgent = "nonexistent";
        "#,
    );
    assert!(!outcome.errors.is_empty(), "assigning an unknown agent name to currentAgent should fail");
}
