//! `ModelValue` — a named LLM endpoint configuration (spec.md §3, grounded
//! on `vtcode-config::core::provider`'s per-provider settings structs).

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ModelValue {
    pub name: String,
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
    pub top_p: Option<f64>,
    pub headers: HashMap<String, String>,
}

impl ModelValue {
    pub fn new(name: impl Into<String>, provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            model: model.into(),
            api_key: None,
            base_url: None,
            temperature: None,
            max_tokens: None,
            top_p: None,
            headers: HashMap::new(),
        }
    }

    pub fn effective_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
    }
}
