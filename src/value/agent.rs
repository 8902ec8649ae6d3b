//! `AgentValue` — `{model, systemPrompt, tools}` with an immutable `name`
//! (spec.md §3).

use super::Value;

#[derive(Clone)]
pub struct AgentValue {
    pub name: String,
    pub model: Value,
    pub system_prompt: String,
    pub tools: Vec<Value>,
}

impl AgentValue {
    pub fn new(name: impl Into<String>, model: Value, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model,
            system_prompt: system_prompt.into(),
            tools: Vec::new(),
        }
    }
}
