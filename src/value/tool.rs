//! `ToolValue` / `NativeToolValue` (spec.md §3 Domain entities).

use super::Value;
use crate::env::Environment;
use crate::eval::InterpError;
use std::rc::Rc;

/// Annotated parameter/return types accepted at call boundaries (spec.md
/// §4.1 "Type checks").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Null,
    Number,
    String,
    Bool,
    Array,
    Object,
    Map,
    Set,
    Tool,
    Model,
    Agent,
    Conversation,
    Error,
    Any,
}

impl TypeTag {
    pub fn matches(self, value: &Value) -> bool {
        self == TypeTag::Any || self == value.type_tag()
    }

    pub fn from_annotation(name: &str) -> Option<Self> {
        Some(match name {
            "number" => TypeTag::Number,
            "string" => TypeTag::String,
            "bool" => TypeTag::Bool,
            "array" => TypeTag::Array,
            "object" => TypeTag::Object,
            "any" => TypeTag::Any,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub type_annotation: Option<TypeTag>,
}

/// User-defined procedure: captures the declaring environment so its body
/// closes over the declaration site (spec.md §3/§4.1).
pub struct ToolValue {
    pub name: String,
    pub params: Vec<ParamSpec>,
    pub return_type: Option<TypeTag>,
    pub captured_env: Environment,
    pub body: Rc<dyn crate::eval::BlockBody>,
}

impl ToolValue {
    pub fn check_args(&self, args: &[Value]) -> Result<(), InterpError> {
        if args.len() != self.params.len() {
            return Err(InterpError::arity(self.params.len(), args.len()));
        }
        for (param, arg) in self.params.iter().zip(args.iter()) {
            if let Some(expected) = param.type_annotation {
                if !expected.matches(arg) {
                    return Err(InterpError::type_error(format!(
                        "parameter `{}` expects {:?}, got {:?}",
                        param.name,
                        expected,
                        arg.type_tag()
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn check_return(&self, value: &Value) -> Result<(), InterpError> {
        if let Some(expected) = self.return_type {
            if !expected.matches(value) {
                return Err(InterpError::type_error(format!(
                    "return value expects {:?}, got {:?}",
                    expected,
                    value.type_tag()
                )));
            }
        }
        Ok(())
    }
}

/// Host-implemented tool: name, description, a JSON-Schema-like parameter
/// spec (reused verbatim for the LLM provider's tool-call payloads, spec.md
/// §4.5 point 4), and an invoker over a key->value argument map.
pub struct NativeToolValue {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
    /// Declared parameter order, so a positional script call
    /// (`gsh.tools.exec("ls", "/tmp")`) can be mapped onto the named-argument
    /// `invoker` the same way an LLM tool call (which always arrives as a
    /// JSON object) already does.
    pub param_names: Vec<String>,
    pub invoker: Box<dyn Fn(std::collections::HashMap<String, Value>) -> Result<Value, InterpError>>,
}

impl NativeToolValue {
    pub fn param_count(&self) -> usize {
        self.parameters_schema
            .get("properties")
            .and_then(|p| p.as_object())
            .map(|o| o.len())
            .unwrap_or(0)
    }
}
