//! Embedded scripting interpreter for an AI-assisted shell.
//!
//! The crate is organized the way `vtcode-core` organizes its subsystems:
//! one top-level module per concern (`value`, `env`, `eval`, `bridge`,
//! `middleware`, `llm`, `exec`, `tools`, `mcp`, `regex_cache`, `strings`,
//! `ui`, `config`), each free to grow its own submodule tree.

pub mod bridge;
pub mod config;
pub mod env;
pub mod eval;
pub mod exec;
pub mod llm;
pub mod mcp;
pub mod middleware;
pub mod regex_cache;
pub mod strings;
pub mod tools;
pub mod ui;
pub mod value;

pub use config::{InterpreterOptions, REPLContext, SDKConfig};
pub use env::Environment;
pub use eval::{EvalOutcome, Evaluator, InterpError};
pub use value::Value;

use std::sync::Arc;

/// Host-facing entry point. Owns the global environment, the `gsh.*` bridge,
/// the regex cache, the middleware manager, and the MCP manager, and is the
/// single object a host constructs to run scripts.
pub struct Interpreter {
    evaluator: Evaluator,
}

impl Interpreter {
    /// `New(options) -> Interpreter` (spec.md §6).
    pub fn new(options: InterpreterOptions) -> Self {
        Self {
            evaluator: Evaluator::new(options),
        }
    }

    /// Parses then evaluates `source`, optionally seeding the top-level
    /// frame with `captures` before running.
    pub fn eval_string(
        &mut self,
        source: &str,
        captures: Option<std::collections::HashMap<String, Value>>,
    ) -> EvalOutcome {
        self.evaluator.eval_string(source, captures)
    }

    /// Evaluates an already-parsed program (see `eval::ProgramTrait` for
    /// hosts that bring their own parser front-end).
    pub fn eval(&mut self, program: &dyn eval::ProgramTrait) -> EvalOutcome {
        self.evaluator.eval(program)
    }

    pub fn call_tool(
        &mut self,
        tool: &Value,
        args: std::collections::HashMap<String, Value>,
    ) -> Result<Value, InterpError> {
        self.evaluator.call_tool(tool, args)
    }

    pub fn sdk_config(&self) -> Arc<SDKConfig> {
        self.evaluator.sdk_config()
    }

    pub fn get_event_handlers(&self, event: &str) -> Vec<u64> {
        self.evaluator.middleware().handler_ids(event)
    }

    pub fn emit_event(
        &mut self,
        event: &str,
        ctx: value::ObjectValue,
    ) -> Result<Option<Value>, InterpError> {
        self.evaluator.emit_event(event, ctx)
    }

    /// Stops all spinners, disconnects MCP servers, and invalidates
    /// outstanding streaming reads.
    pub fn close(&mut self) {
        self.evaluator.close();
    }
}
