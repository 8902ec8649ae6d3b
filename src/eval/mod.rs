//! The tree-walking evaluator (spec.md §4.1, §9): statement/expression
//! execution, call dispatch across user/native/MCP tools, declaration
//! handling for `tool`/`model`/`agent`/`mcp`, and the middleware chain
//! driver that backs `gsh.use`/`gsh.remove`/event emission.
//!
//! `Evaluator` is cheap to clone (every field is `Rc`-based) so the
//! middleware chain's synthetic `next` callable can close over one without
//! fighting the borrow checker across the recursive calls a script might
//! make into it.

pub mod ast;
mod builtins;
mod error;
mod lexer;
mod parser;
mod signals;

pub use error::InterpError;
pub use parser::parse_program;
pub use signals::{Flow, Signal};

use crate::bridge::{self, BridgeState};
use crate::config::{InterpreterOptions, SDKConfig};
use crate::env::Environment;
use crate::exec::ExecTool;
use crate::mcp::{MCPManager, TransportConfig};
use crate::middleware::MiddlewareRegistry;
use crate::regex_cache::RegexCache;
use crate::ui::SpinnerManager;
use crate::value::{
    AgentValue, MCPProxyValue, MCPToolValue, MapKey, ModelValue, NativeToolValue, ObjectValue,
    ToolValue, TypeTag, Value,
};
use ast::{AssignTarget, BinOp, Expr, Literal, ParamDecl, Stmt, UnOp};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

/// Implemented by whatever a host hands `Evaluator::eval` a parsed program
/// as (spec.md §1/§6: the lexer/parser are named external collaborators;
/// `ast::Program` is the concrete implementation `eval_string` uses).
pub trait ProgramTrait {
    fn statements(&self) -> &[Stmt];
}

/// A `tool` body captured by a closure (spec.md §3).
pub trait BlockBody {
    fn statements(&self) -> &[Stmt];
}

/// What a top-level `Eval`/`EvalString` run produced (spec.md §6): the
/// value of the last top-level expression (or an explicit top-level
/// `return`), the bindings the run introduced directly in its frame, and
/// any errors encountered (evaluation stops at the first one).
pub struct EvalOutcome {
    pub final_result: Value,
    pub variables: HashMap<String, Value>,
    pub errors: Vec<InterpError>,
}

#[derive(Clone)]
pub struct Evaluator {
    global: Environment,
    bridge_state: Rc<BridgeState>,
    cancelled: Rc<Cell<bool>>,
    // Kept alive for the lifetime of the evaluator: MCP/HTTP calls block on
    // this runtime's handle from the otherwise-synchronous evaluator loop
    // (spec.md §9: "a synchronous call dispatch bridging into async I/O").
    _runtime: Rc<tokio::runtime::Runtime>,
}

impl Evaluator {
    pub fn new(options: InterpreterOptions) -> Self {
        let runtime = Rc::new(
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("failed to start the interpreter's background async runtime"),
        );
        let sdk_config = SDKConfig::new();
        let workspace_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let exec_tool = Rc::new(ExecTool::new(
            workspace_root,
            options.exec_output_cap_bytes,
            options.exec_default_timeout_secs,
        ));
        let regex_cache = Rc::new(RegexCache::new(options.regex_cache_capacity));
        let middleware = Rc::new(MiddlewareRegistry::new());
        let mcp = Rc::new(MCPManager::new());
        let spinners = Rc::new(SpinnerManager::new());

        let bridge_state = Rc::new(BridgeState {
            sdk_config,
            exec_tool,
            regex_cache: regex_cache.clone(),
            middleware,
            mcp,
            mcp_runtime: runtime.handle().clone(),
            spinners,
            output_cap_bytes: options.exec_output_cap_bytes,
            grep_backend_override: options.grep_backend_override.clone(),
            models: Rc::new(RefCell::new(HashMap::new())),
            agents: Rc::new(RefCell::new(Vec::new())),
            current_agent: Rc::new(RefCell::new(None)),
            on_agent_added: RefCell::new(None),
            on_agent_switch: RefCell::new(None),
        });

        let global = Environment::root();
        global.define("gsh", Value::object(bridge::build_gsh(bridge_state.clone())));
        global.define("Regexp", Value::object(build_regexp(regex_cache.clone())));

        Self {
            global,
            bridge_state,
            cancelled: Rc::new(Cell::new(false)),
            _runtime: runtime,
        }
    }

    pub fn sdk_config(&self) -> Arc<SDKConfig> {
        self.bridge_state.sdk_config.clone()
    }

    pub fn middleware(&self) -> &MiddlewareRegistry {
        &self.bridge_state.middleware
    }

    /// Installs `REPLContext.onAgentAdded` (spec.md §3/§4.3).
    pub fn set_on_agent_added(&self, hook: impl Fn(&Value) + 'static) {
        *self.bridge_state.on_agent_added.borrow_mut() = Some(Box::new(hook));
    }

    /// Installs `REPLContext.onAgentSwitch` (spec.md §3/§4.3).
    pub fn set_on_agent_switch(&self, hook: impl Fn(&str) + 'static) {
        *self.bridge_state.on_agent_switch.borrow_mut() = Some(Box::new(hook));
    }

    /// Requests cancellation; checked cooperatively between top-level
    /// statements and loop iterations (spec.md §9).
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn close(&self) {
        self.bridge_state.spinners.stop_all();
        self.bridge_state.mcp.disconnect_all();
    }

    // ---- top-level driving ----------------------------------------------

    pub fn eval_string(
        &mut self,
        source: &str,
        captures: Option<HashMap<String, Value>>,
    ) -> EvalOutcome {
        match parse_program(source) {
            Ok(program) => self.eval_with_captures(&program, captures),
            Err(e) => EvalOutcome {
                final_result: Value::Null,
                variables: HashMap::new(),
                errors: vec![e],
            },
        }
    }

    pub fn eval(&mut self, program: &dyn ProgramTrait) -> EvalOutcome {
        self.eval_with_captures(program, None)
    }

    fn eval_with_captures(
        &self,
        program: &dyn ProgramTrait,
        captures: Option<HashMap<String, Value>>,
    ) -> EvalOutcome {
        let frame = self.global.child();
        if let Some(caps) = captures {
            for (name, value) in caps {
                frame.define(name, value);
            }
        }

        let mut final_result = Value::Null;
        let mut errors = Vec::new();

        for stmt in program.statements() {
            if self.cancelled.get() {
                errors.push(InterpError::Cancelled);
                break;
            }
            match stmt {
                Stmt::Expr(expr) => match self.eval_expr(&frame, expr) {
                    Ok(v) => final_result = v,
                    Err(e) => {
                        errors.push(e);
                        break;
                    }
                },
                other => match self.exec_stmt(&frame, other) {
                    Ok(Flow::Normal) => {}
                    Ok(Flow::Signal(Signal::Return(v))) => {
                        final_result = v;
                        break;
                    }
                    Ok(Flow::Signal(Signal::Break | Signal::Continue)) => {
                        errors.push(InterpError::Control(
                            "break/continue outside a loop".to_string(),
                        ));
                        break;
                    }
                    Err(e) => {
                        errors.push(e);
                        break;
                    }
                },
            }
        }

        EvalOutcome {
            final_result,
            variables: frame.own_bindings(),
            errors,
        }
    }

    pub fn call_tool(&self, tool: &Value, args: HashMap<String, Value>) -> Result<Value, InterpError> {
        match tool {
            Value::Tool(t) => {
                let positional: Vec<Value> = t
                    .params
                    .iter()
                    .map(|p| args.get(&p.name).cloned().unwrap_or(Value::Null))
                    .collect();
                self.call_user_tool(t, positional)
            }
            Value::NativeTool(nt) => (nt.invoker)(args),
            Value::MCPTool(mt) => self.call_mcp_tool(mt, vec![Value::object(map_to_object(args))]),
            other => Err(InterpError::type_error(format!(
                "value of type {:?} is not callable",
                other.type_tag()
            ))),
        }
    }

    /// `gsh.use`/`gsh.remove`'s runtime counterpart: drives `event`'s
    /// handler chain to completion and collapses the result the way
    /// `EmitEvent` promises (spec.md §4.4): `Some` only when a handler set
    /// `handled: true`, `None` on fall-through.
    pub fn emit_event(
        &self,
        event: &str,
        ctx: ObjectValue,
    ) -> Result<Option<Value>, InterpError> {
        let result = self.execute_chain(event, Value::object(ctx))?;
        let handled = matches!(&result, Value::Object(o) if o.borrow().get("handled").map(|v| v.truthy()).unwrap_or(false));
        Ok(if handled { Some(result) } else { None })
    }

    /// Lower-level form of `emit_event` that always returns the
    /// `{handled, input}` object, never collapsing a fall-through to
    /// `None` — used by `emit_event` and by `next()`'s own invoker.
    fn execute_chain(&self, event: &str, ctx: Value) -> Result<Value, InterpError> {
        let chain = Rc::new(self.bridge_state.middleware.snapshot(event));
        self.run_chain_step(chain, 0, ctx)
    }

    fn run_chain_step(&self, chain: Rc<Vec<Value>>, index: usize, ctx: Value) -> Result<Value, InterpError> {
        if index >= chain.len() {
            return Ok(chain_result(false, extract_input(&ctx)));
        }
        let handler = chain[index].clone();
        let next = self.make_next(chain, index + 1, ctx.clone());
        let raw = self.call_value(handler, vec![ctx.clone(), next])?;
        Ok(normalize_chain_result(raw, &ctx))
    }

    fn make_next(&self, chain: Rc<Vec<Value>>, index: usize, current_ctx: Value) -> Value {
        let evaluator = self.clone();
        Value::NativeTool(Rc::new(NativeToolValue {
            name: "next".to_string(),
            description: "advances the middleware chain".to_string(),
            parameters_schema: serde_json::json!({ "properties": { "ctx": {} } }),
            param_names: vec!["ctx".to_string()],
            invoker: Box::new(move |mut args: HashMap<String, Value>| {
                let ctx = match args.remove("ctx") {
                    Some(v) if !matches!(v, Value::Null) => v,
                    _ => current_ctx.clone(),
                };
                evaluator.run_chain_step(chain.clone(), index, ctx)
            }),
        }))
    }

    // ---- call dispatch ----------------------------------------------------

    pub fn call_value(&self, callee: Value, args: Vec<Value>) -> Result<Value, InterpError> {
        match callee {
            Value::Tool(t) => self.call_user_tool(&t, args),
            Value::NativeTool(nt) => {
                let mut map = HashMap::with_capacity(nt.param_names.len());
                for (i, name) in nt.param_names.iter().enumerate() {
                    map.insert(name.clone(), args.get(i).cloned().unwrap_or(Value::Null));
                }
                (nt.invoker)(map)
            }
            Value::MCPTool(mt) => self.call_mcp_tool(&mt, args),
            other => Err(InterpError::type_error(format!(
                "value of type {:?} is not callable",
                other.type_tag()
            ))),
        }
    }

    fn call_user_tool(&self, t: &Rc<ToolValue>, args: Vec<Value>) -> Result<Value, InterpError> {
        t.check_args(&args)?;
        let call_env = t.captured_env.child();
        for (param, arg) in t.params.iter().zip(args) {
            call_env.define(param.name.clone(), arg);
        }
        let flow = self.exec_stmts(&call_env, t.body.statements())?;
        let result = match flow {
            Flow::Normal => Value::Null,
            Flow::Signal(Signal::Return(v)) => v,
            Flow::Signal(Signal::Break | Signal::Continue) => {
                return Err(InterpError::Control(
                    "break/continue escaped a tool call".to_string(),
                ));
            }
        };
        t.check_return(&result)?;
        Ok(result)
    }

    fn call_mcp_tool(&self, mt: &MCPToolValue, args: Vec<Value>) -> Result<Value, InterpError> {
        let arg_map: HashMap<String, Value> = match args.len() {
            0 => HashMap::new(),
            1 => match &args[0] {
                Value::Object(o) => {
                    let o = o.borrow();
                    o.keys()
                        .map(|k| (k.to_string(), o.get(k).unwrap_or(Value::Null)))
                        .collect()
                }
                other => {
                    let mut m = HashMap::new();
                    m.insert("value".to_string(), other.clone());
                    m
                }
            },
            _ => {
                return Err(InterpError::type_error(
                    "an MCP tool call accepts a single object (or positional value) argument",
                ))
            }
        };
        let mcp = self.bridge_state.mcp.clone();
        let server = mt.server.clone();
        let tool = mt.tool.clone();
        self.bridge_state
            .mcp_runtime
            .block_on(async move { mcp.call_tool(&server, &tool, arg_map).await })
    }

    /// The `.push` special case on `gsh.agents` (spec.md §4.3): validated
    /// and distinguished from a generic array's `.push` by `Rc` identity
    /// against the one array the bridge itself built.
    fn agents_push(&self, args: &[Value]) -> Result<Value, InterpError> {
        let agent_value = args.first().cloned().ok_or_else(|| InterpError::arity(1, 0))?;
        let agent_rc = match &agent_value {
            Value::Agent(a) => a.clone(),
            _ => return Err(InterpError::type_error("gsh.agents.push expects an agent value")),
        };
        let name = agent_rc.borrow().name.clone();
        if name == "default" {
            return Err(InterpError::domain("agent name `default` is reserved"));
        }
        {
            let agents = self.bridge_state.agents.borrow();
            let duplicate = agents.iter().any(|existing| {
                matches!(existing, Value::Agent(a) if a.borrow().name == name)
            });
            if duplicate {
                return Err(InterpError::domain(format!(
                    "an agent named `{name}` already exists"
                )));
            }
        }
        self.bridge_state.agents.borrow_mut().push(agent_value.clone());
        if let Some(hook) = self.bridge_state.on_agent_added.borrow().as_ref() {
            hook(&agent_value);
        }
        Ok(Value::Number(self.bridge_state.agents.borrow().len() as f64))
    }

    fn try_builtin_method(
        &self,
        recv: &Value,
        method: &str,
        args: &[Value],
    ) -> Result<Option<Value>, InterpError> {
        Ok(match recv {
            Value::String(s) => Some(builtins::call_string_method(s, method, args)?),
            Value::Array(arr) => {
                if method == "push" && Rc::ptr_eq(arr, &self.bridge_state.agents) {
                    Some(self.agents_push(args)?)
                } else {
                    Some(builtins::call_array_method(arr, method, args)?)
                }
            }
            Value::Map(m) => Some(builtins::call_map_method(m, method, args)?),
            Value::Set(s) => Some(builtins::call_set_method(s, method, args)?),
            _ => None,
        })
    }

    // ---- statements ---------------------------------------------------

    fn exec_stmts(&self, env: &Environment, stmts: &[Stmt]) -> Result<Flow, InterpError> {
        for stmt in stmts {
            match self.exec_stmt(env, stmt)? {
                Flow::Normal => continue,
                signal => return Ok(signal),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmts_new_scope(&self, env: &Environment, stmts: &[Stmt]) -> Result<Flow, InterpError> {
        let child = env.child();
        self.exec_stmts(&child, stmts)
    }

    fn exec_stmt(&self, env: &Environment, stmt: &Stmt) -> Result<Flow, InterpError> {
        match stmt {
            Stmt::Expr(e) => {
                self.eval_expr(env, e)?;
                Ok(Flow::Normal)
            }
            Stmt::Assign { target, value } => {
                self.exec_assign(env, target, value)?;
                Ok(Flow::Normal)
            }
            Stmt::If { cond, then_branch, else_branch } => {
                if self.eval_expr(env, cond)?.truthy() {
                    self.exec_stmts_new_scope(env, then_branch)
                } else if let Some(eb) = else_branch {
                    self.exec_stmts_new_scope(env, eb)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { cond, body } => self.exec_while(env, cond, body),
            Stmt::ForOf { binding, iterable, body } => self.exec_for_of(env, binding, iterable, body),
            Stmt::Block(stmts) => self.exec_stmts_new_scope(env, stmts),
            Stmt::Break => Ok(Flow::Signal(Signal::Break)),
            Stmt::Continue => Ok(Flow::Signal(Signal::Continue)),
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(e) => self.eval_expr(env, e)?,
                    None => Value::Null,
                };
                Ok(Flow::Signal(Signal::Return(value)))
            }
            Stmt::ToolDecl { name, params, return_type, body } => {
                self.exec_tool_decl(env, name, params, *return_type, body);
                Ok(Flow::Normal)
            }
            Stmt::ModelDecl { name, config } => {
                self.exec_model_decl(env, name, config)?;
                Ok(Flow::Normal)
            }
            Stmt::AgentDecl { name, config } => {
                self.exec_agent_decl(env, name, config)?;
                Ok(Flow::Normal)
            }
            Stmt::McpDecl { name, config } => {
                self.exec_mcp_decl(env, name, config)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn exec_while(&self, env: &Environment, cond: &Expr, body: &[Stmt]) -> Result<Flow, InterpError> {
        let loop_frame = env.child();
        loop {
            if self.cancelled.get() {
                return Err(InterpError::Cancelled);
            }
            if !self.eval_expr(&loop_frame, cond)?.truthy() {
                break;
            }
            match self.exec_stmts(&loop_frame, body)? {
                Flow::Normal | Flow::Signal(Signal::Continue) => {}
                Flow::Signal(Signal::Break) => break,
                signal @ Flow::Signal(Signal::Return(_)) => return Ok(signal),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_for_of(
        &self,
        env: &Environment,
        binding: &str,
        iterable: &Expr,
        body: &[Stmt],
    ) -> Result<Flow, InterpError> {
        let iterable_value = self.eval_expr(env, iterable)?;
        let items: Vec<Value> = match &iterable_value {
            Value::Array(arr) => arr.borrow().clone(),
            Value::String(s) => s.chars().map(|c| Value::string(c.to_string())).collect(),
            Value::Set(s) => s.borrow().values().to_vec(),
            other => {
                return Err(InterpError::type_error(format!(
                    "for-of requires an array, string, or set, got {:?}",
                    other.type_tag()
                )))
            }
        };
        let loop_frame = env.child();
        for item in items {
            if self.cancelled.get() {
                return Err(InterpError::Cancelled);
            }
            loop_frame.define(binding.to_string(), item);
            match self.exec_stmts(&loop_frame, body)? {
                Flow::Normal | Flow::Signal(Signal::Continue) => {}
                Flow::Signal(Signal::Break) => break,
                signal @ Flow::Signal(Signal::Return(_)) => return Ok(signal),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_assign(&self, env: &Environment, target: &AssignTarget, value_expr: &Expr) -> Result<(), InterpError> {
        let value = self.eval_expr(env, value_expr)?;
        match target {
            AssignTarget::Identifier(name) => {
                if env.has(name) {
                    env.update(name, value)
                } else {
                    env.define(name.clone(), value);
                    Ok(())
                }
            }
            AssignTarget::Member { object, property } => {
                let recv = self.eval_expr(env, object)?;
                write_member(&recv, property, value)
            }
            AssignTarget::Index { object, index } => {
                let recv = self.eval_expr(env, object)?;
                let idx = self.eval_expr(env, index)?;
                write_index(&recv, &idx, value)
            }
        }
    }

    fn exec_tool_decl(&self, env: &Environment, name: &str, params: &[ParamDecl], return_type: Option<TypeTag>, body: &[Stmt]) {
        let params = params
            .iter()
            .map(|p| crate::value::ParamSpec {
                name: p.name.clone(),
                type_annotation: p.type_annotation,
            })
            .collect();
        let tool = ToolValue {
            name: name.to_string(),
            params,
            return_type,
            captured_env: env.clone(),
            body: ast::block_body(body.to_vec()),
        };
        env.define(name.to_string(), Value::Tool(Rc::new(tool)));
    }

    /// `model name { ... }` (spec.md §3 ModelValue): `provider`/`model` are
    /// required string fields; the rest are optional and typed.
    fn exec_model_decl(&self, env: &Environment, name: &str, config: &Expr) -> Result<(), InterpError> {
        let cfg = self.eval_expr(env, config)?;
        let obj = match &cfg {
            Value::Object(o) => o.clone(),
            _ => return Err(InterpError::type_error("a model declaration's config must be an object")),
        };
        let obj = obj.borrow();
        let get_string = |key: &str| -> Option<String> {
            match obj.get(key).ok()? {
                Value::String(s) => Some(s.to_string()),
                _ => None,
            }
        };
        let provider = get_string("provider")
            .ok_or_else(|| InterpError::domain(format!("model `{name}` is missing its required `provider` field")))?;
        let model_name = get_string("model")
            .ok_or_else(|| InterpError::domain(format!("model `{name}` is missing its required `model` field")))?;

        let mut mv = ModelValue::new(name, provider, model_name);
        mv.api_key = get_string("apiKey");
        mv.base_url = get_string("baseURL");
        mv.temperature = match obj.get("temperature").ok() {
            Some(Value::Number(n)) => Some(n),
            _ => None,
        };
        mv.max_tokens = match obj.get("maxTokens").ok() {
            Some(Value::Number(n)) => Some(n as u64),
            _ => None,
        };
        mv.top_p = match obj.get("topP").ok() {
            Some(Value::Number(n)) => Some(n),
            _ => None,
        };
        if let Ok(Value::Object(headers)) = obj.get("headers") {
            let headers = headers.borrow();
            for key in headers.keys() {
                if let Ok(Value::String(v)) = headers.get(key) {
                    mv.headers.insert(key.to_string(), v.to_string());
                }
            }
        }
        drop(obj);

        env.define(name.to_string(), Value::Model(Rc::new(RefCell::new(mv))));
        Ok(())
    }

    /// `agent name { ... }` (spec.md §3 AgentValue): requires a `model`
    /// field holding a model value; `systemPrompt`/`tools` default to
    /// `""`/`[]`.
    fn exec_agent_decl(&self, env: &Environment, name: &str, config: &Expr) -> Result<(), InterpError> {
        let cfg = self.eval_expr(env, config)?;
        let obj = match &cfg {
            Value::Object(o) => o.clone(),
            _ => return Err(InterpError::type_error("an agent declaration's config must be an object")),
        };
        let obj = obj.borrow();
        let model = match obj.get("model").ok() {
            Some(m @ Value::Model(_)) => m,
            _ => {
                return Err(InterpError::domain(format!(
                    "agent `{name}` requires a `model` field holding a model value"
                )))
            }
        };
        let system_prompt = match obj.get("systemPrompt").ok() {
            Some(Value::String(s)) => s.to_string(),
            Some(Value::Null) | None => String::new(),
            _ => return Err(InterpError::type_error("agent `systemPrompt` must be a string")),
        };
        let tools = match obj.get("tools").ok() {
            Some(Value::Array(items)) => items.borrow().clone(),
            Some(Value::Null) | None => Vec::new(),
            _ => return Err(InterpError::type_error("agent `tools` must be an array")),
        };
        drop(obj);

        let mut av = AgentValue::new(name, model, system_prompt);
        av.tools = tools;
        env.define(name.to_string(), Value::Agent(Rc::new(RefCell::new(av))));
        Ok(())
    }

    /// `mcp name { ... }` (spec.md §4.8): either `{command, [args]}` for a
    /// stdio server or `{url, [headers]}` for an HTTP one.
    fn exec_mcp_decl(&self, env: &Environment, name: &str, config: &Expr) -> Result<(), InterpError> {
        if self.bridge_state.mcp.has_server(name) {
            return Err(InterpError::domain(format!("an MCP server named `{name}` is already registered")));
        }
        let cfg = self.eval_expr(env, config)?;
        let obj = match &cfg {
            Value::Object(o) => o.clone(),
            _ => return Err(InterpError::type_error("an mcp declaration's config must be an object")),
        };
        let obj = obj.borrow();
        let transport = if let Ok(Value::String(command)) = obj.get("command") {
            let args = match obj.get("args").ok() {
                Some(Value::Array(items)) => items.borrow().iter().map(Value::to_display_string).collect(),
                _ => Vec::new(),
            };
            TransportConfig::Stdio { command: command.to_string(), args }
        } else if let Ok(Value::String(url)) = obj.get("url") {
            let mut headers = HashMap::new();
            if let Ok(Value::Object(h)) = obj.get("headers") {
                let h = h.borrow();
                for key in h.keys() {
                    if let Ok(Value::String(v)) = h.get(key) {
                        headers.insert(key.to_string(), v.to_string());
                    }
                }
            }
            TransportConfig::Http { base_url: url.to_string(), headers }
        } else {
            return Err(InterpError::domain(format!(
                "mcp `{name}` requires either a `command` or `url` field"
            )));
        };
        drop(obj);

        self.bridge_state.mcp.register_server(name.to_string(), transport);
        env.define(name.to_string(), Value::MCPProxy(Rc::new(MCPProxyValue { server: name.to_string() })));
        Ok(())
    }

    // ---- expressions ----------------------------------------------------

    fn eval_expr(&self, env: &Environment, expr: &Expr) -> Result<Value, InterpError> {
        match expr {
            Expr::Literal(lit) => Ok(literal_value(lit)),
            Expr::Identifier(name) => env.get(name),
            Expr::Array(items) => {
                let values = items
                    .iter()
                    .map(|e| self.eval_expr(env, e))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::array(values))
            }
            Expr::Object(entries) => {
                let mut obj = ObjectValue::new();
                for (key, value_expr) in entries {
                    let value = self.eval_expr(env, value_expr)?;
                    obj.set_plain(key.clone(), value);
                }
                Ok(Value::object(obj))
            }
            Expr::Member { object, property } => {
                let recv = self.eval_expr(env, object)?;
                read_member(&recv, property)
            }
            Expr::Index { object, index } => {
                let recv = self.eval_expr(env, object)?;
                let idx = self.eval_expr(env, index)?;
                read_index(&recv, &idx)
            }
            Expr::Call { callee, args } => self.eval_call(env, callee, args),
            Expr::Unary { op, expr } => {
                let value = self.eval_expr(env, expr)?;
                match op {
                    UnOp::Neg => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(InterpError::type_error("unary `-` requires a number")),
                    },
                    UnOp::Not => Ok(Value::Bool(!value.truthy())),
                }
            }
            Expr::Binary { op, left, right } => self.eval_binary(env, *op, left, right),
            Expr::Conditional { cond, then_branch, else_branch } => {
                if self.eval_expr(env, cond)?.truthy() {
                    self.eval_expr(env, then_branch)
                } else {
                    self.eval_expr(env, else_branch)
                }
            }
        }
    }

    fn eval_call(&self, env: &Environment, callee: &Expr, args: &[Expr]) -> Result<Value, InterpError> {
        let arg_values = args
            .iter()
            .map(|a| self.eval_expr(env, a))
            .collect::<Result<Vec<_>, _>>()?;

        if let Expr::Member { object, property } = callee {
            let recv = self.eval_expr(env, object)?;
            if let Some(result) = self.try_builtin_method(&recv, property, &arg_values)? {
                return Ok(result);
            }
            let member = read_member(&recv, property)?;
            return self.call_value(member, arg_values);
        }

        let callee_value = self.eval_expr(env, callee)?;
        self.call_value(callee_value, arg_values)
    }

    fn eval_binary(&self, env: &Environment, op: BinOp, left: &Expr, right: &Expr) -> Result<Value, InterpError> {
        if matches!(op, BinOp::And | BinOp::Or) {
            let l = self.eval_expr(env, left)?;
            return match op {
                BinOp::And => {
                    if l.truthy() {
                        self.eval_expr(env, right)
                    } else {
                        Ok(l)
                    }
                }
                BinOp::Or => {
                    if l.truthy() {
                        Ok(l)
                    } else {
                        self.eval_expr(env, right)
                    }
                }
                _ => unreachable!(),
            };
        }

        let l = self.eval_expr(env, left)?;
        let r = self.eval_expr(env, right)?;
        match op {
            BinOp::Add => match (&l, &r) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Ok(Value::string(format!("{}{}", l.to_display_string(), r.to_display_string())))
                }
                _ => Err(InterpError::type_error("`+` requires two numbers or at least one string operand")),
            },
            BinOp::Sub => numeric_op(&l, &r, |a, b| a - b),
            BinOp::Mul => numeric_op(&l, &r, |a, b| a * b),
            BinOp::Div => numeric_op(&l, &r, |a, b| a / b),
            BinOp::Mod => numeric_op(&l, &r, |a, b| a % b),
            BinOp::Eq => Ok(Value::Bool(l.eq_value(&r))),
            BinOp::NotEq => Ok(Value::Bool(!l.eq_value(&r))),
            BinOp::Lt => compare(&l, &r, |o| o.is_lt()),
            BinOp::Lte => compare(&l, &r, |o| o.is_le()),
            BinOp::Gt => compare(&l, &r, |o| o.is_gt()),
            BinOp::Gte => compare(&l, &r, |o| o.is_ge()),
            BinOp::And | BinOp::Or => unreachable!("handled above"),
        }
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::string(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
    }
}

fn numeric_op(l: &Value, r: &Value, f: impl Fn(f64, f64) -> f64) -> Result<Value, InterpError> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(f(*a, *b))),
        _ => Err(InterpError::type_error("arithmetic operators require two numbers")),
    }
}

fn compare(l: &Value, r: &Value, accept: impl Fn(std::cmp::Ordering) -> bool) -> Result<Value, InterpError> {
    let ordering = match (l, r) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b).ok_or_else(|| InterpError::domain("NaN is not ordered"))?,
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => return Err(InterpError::type_error("comparison operators require two numbers or two strings")),
    };
    Ok(Value::Bool(accept(ordering)))
}

/// Reads a property off any receiver type (spec.md §4.1: "member access
/// reads the descriptor's effective value"), generalized to give
/// Array/String/Map/Set their handful of read-only properties (`.length`,
/// `.size`) without routing them through the descriptor machinery that's
/// really for `ObjectValue`.
fn read_member(recv: &Value, property: &str) -> Result<Value, InterpError> {
    match recv {
        Value::Object(o) => o.borrow().get(property),
        Value::Array(a) => Ok(match property {
            "length" => Value::Number(a.borrow().len() as f64),
            _ => Value::Null,
        }),
        Value::String(s) => Ok(match property {
            "length" => Value::Number(s.chars().count() as f64),
            _ => Value::Null,
        }),
        Value::Map(m) => Ok(match property {
            "size" => Value::Number(m.borrow().len() as f64),
            _ => Value::Null,
        }),
        Value::Set(s) => Ok(match property {
            "size" => Value::Number(s.borrow().len() as f64),
            _ => Value::Null,
        }),
        Value::Model(m) => {
            let m = m.borrow();
            Ok(match property {
                "name" => Value::string(m.name.clone()),
                "provider" => Value::string(m.provider.clone()),
                "model" => Value::string(m.model.clone()),
                "apiKey" => m.api_key.clone().map(Value::string).unwrap_or(Value::Null),
                "baseURL" => m.base_url.clone().map(Value::string).unwrap_or(Value::Null),
                "temperature" => m.temperature.map(Value::Number).unwrap_or(Value::Null),
                "maxTokens" => m.max_tokens.map(|t| Value::Number(t as f64)).unwrap_or(Value::Null),
                "topP" => m.top_p.map(Value::Number).unwrap_or(Value::Null),
                "headers" => {
                    let mut obj = ObjectValue::new();
                    for (k, v) in &m.headers {
                        obj.set_plain(k.clone(), Value::string(v.clone()));
                    }
                    Value::object(obj)
                }
                _ => Value::Null,
            })
        }
        Value::Agent(a) => {
            let a = a.borrow();
            Ok(match property {
                "name" => Value::string(a.name.clone()),
                "model" => a.model.clone(),
                "systemPrompt" => Value::string(a.system_prompt.clone()),
                "tools" => Value::array(a.tools.clone()),
                _ => Value::Null,
            })
        }
        Value::Conversation(c) => Ok(match property {
            "length" => Value::Number(c.borrow().messages.len() as f64),
            _ => Value::Null,
        }),
        Value::MCPProxy(p) => Ok(Value::MCPTool(Rc::new(MCPToolValue {
            server: p.server.clone(),
            tool: property.to_string(),
        }))),
        Value::Error(e) => Ok(match property {
            "kind" => Value::string(e.kind),
            "message" => Value::string(e.message.clone()),
            _ => Value::Null,
        }),
        other => Err(InterpError::type_error(format!(
            "cannot read property `{property}` of {:?}",
            other.type_tag()
        ))),
    }
}

fn read_index(recv: &Value, idx: &Value) -> Result<Value, InterpError> {
    match recv {
        Value::Array(arr) => {
            let i = match idx {
                Value::Number(n) => *n as i64,
                _ => return Err(InterpError::type_error("an array index must be a number")),
            };
            if i < 0 {
                return Ok(Value::Null);
            }
            Ok(arr.borrow().get(i as usize).cloned().unwrap_or(Value::Null))
        }
        Value::Object(obj) => obj.borrow().get(&idx.to_display_string()),
        Value::String(s) => {
            let i = match idx {
                Value::Number(n) => *n as i64,
                _ => return Err(InterpError::type_error("a string index must be a number")),
            };
            if i < 0 {
                return Ok(Value::Null);
            }
            Ok(s.chars().nth(i as usize).map(|c| Value::string(c.to_string())).unwrap_or(Value::Null))
        }
        Value::Map(m) => {
            let key = MapKey::from_value(idx).ok_or_else(|| InterpError::domain("map keys must be string/number/bool"))?;
            Ok(m.borrow().get(&key).cloned().unwrap_or(Value::Null))
        }
        other => Err(InterpError::type_error(format!("cannot index into {:?}", other.type_tag()))),
    }
}

fn write_member(recv: &Value, property: &str, value: Value) -> Result<(), InterpError> {
    match recv {
        Value::Object(o) => o.borrow_mut().set(property, value),
        Value::Agent(a) => {
            let mut a = a.borrow_mut();
            match property {
                "name" => Err(InterpError::domain("agent `name` is read-only")),
                "model" => match value {
                    Value::Model(_) => {
                        a.model = value;
                        Ok(())
                    }
                    _ => Err(InterpError::type_error("agent `model` must be a model value")),
                },
                "systemPrompt" => match &value {
                    Value::String(s) => {
                        a.system_prompt = s.to_string();
                        Ok(())
                    }
                    _ => Err(InterpError::type_error("agent `systemPrompt` must be a string")),
                },
                "tools" => match &value {
                    Value::Array(items) => {
                        a.tools = items.borrow().clone();
                        Ok(())
                    }
                    _ => Err(InterpError::type_error("agent `tools` must be an array")),
                },
                other => Err(InterpError::domain(format!("agent has no writable property `{other}`"))),
            }
        }
        Value::Model(m) => {
            let mut m = m.borrow_mut();
            match property {
                "name" => Err(InterpError::domain("model `name` is read-only")),
                "apiKey" => set_optional_string(&mut m.api_key, value, "apiKey"),
                "baseURL" => set_optional_string(&mut m.base_url, value, "baseURL"),
                "temperature" => set_optional_number(&mut m.temperature, value, "temperature"),
                "maxTokens" => match value {
                    Value::Number(n) => {
                        m.max_tokens = Some(n as u64);
                        Ok(())
                    }
                    Value::Null => {
                        m.max_tokens = None;
                        Ok(())
                    }
                    _ => Err(InterpError::type_error("model `maxTokens` must be a number")),
                },
                "topP" => set_optional_number(&mut m.top_p, value, "topP"),
                other => Err(InterpError::domain(format!("model has no writable property `{other}`"))),
            }
        }
        other => Err(InterpError::type_error(format!(
            "cannot assign property `{property}` on {:?}",
            other.type_tag()
        ))),
    }
}

fn set_optional_string(slot: &mut Option<String>, value: Value, field: &str) -> Result<(), InterpError> {
    match value {
        Value::String(s) => {
            *slot = Some(s.to_string());
            Ok(())
        }
        Value::Null => {
            *slot = None;
            Ok(())
        }
        _ => Err(InterpError::type_error(format!("model `{field}` must be a string"))),
    }
}

fn set_optional_number(slot: &mut Option<f64>, value: Value, field: &str) -> Result<(), InterpError> {
    match value {
        Value::Number(n) => {
            *slot = Some(n);
            Ok(())
        }
        Value::Null => {
            *slot = None;
            Ok(())
        }
        _ => Err(InterpError::type_error(format!("model `{field}` must be a number"))),
    }
}

fn write_index(recv: &Value, idx: &Value, value: Value) -> Result<(), InterpError> {
    match recv {
        Value::Array(arr) => {
            let i = match idx {
                Value::Number(n) => *n as i64,
                _ => return Err(InterpError::type_error("an array index must be a number")),
            };
            if i < 0 {
                return Err(InterpError::domain("array index must not be negative"));
            }
            let i = i as usize;
            let mut items = arr.borrow_mut();
            if i < items.len() {
                items[i] = value;
                Ok(())
            } else if i == items.len() {
                items.push(value);
                Ok(())
            } else {
                Err(InterpError::domain(
                    "index out of bounds: an array only grows by one past its current length",
                ))
            }
        }
        Value::Object(o) => o.borrow_mut().set(&idx.to_display_string(), value),
        Value::Map(m) => {
            let key = MapKey::from_value(idx).ok_or_else(|| InterpError::domain("map keys must be string/number/bool"))?;
            m.borrow_mut().insert(key, value);
            Ok(())
        }
        other => Err(InterpError::type_error(format!("cannot index-assign on {:?}", other.type_tag()))),
    }
}

fn extract_input(ctx: &Value) -> Value {
    match ctx {
        Value::Object(o) => o.borrow().get("input").unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn chain_result(handled: bool, input: Value) -> Value {
    let mut obj = ObjectValue::new();
    obj.set_plain("handled", Value::Bool(handled));
    obj.set_plain("input", input);
    Value::object(obj)
}

fn normalize_chain_result(raw: Value, original_ctx: &Value) -> Value {
    match raw {
        Value::Object(o) => {
            let o = o.borrow();
            let handled = o.get("handled").map(|v| v.truthy()).unwrap_or(false);
            let input = match o.get("input") {
                Ok(Value::Null) | Err(_) => extract_input(original_ctx),
                Ok(v) => v,
            };
            chain_result(handled, input)
        }
        _ => chain_result(false, extract_input(original_ctx)),
    }
}

fn map_to_object(args: HashMap<String, Value>) -> ObjectValue {
    let mut obj = ObjectValue::new();
    for (key, value) in args {
        obj.set_plain(key, value);
    }
    obj
}

/// Builds the global `Regexp` object (spec.md §4.7/§4.10): each static
/// method is a `NativeTool` over `builtins::call_regexp_static`, reusing
/// the same positional-argument marshalling every other native tool call
/// goes through.
fn build_regexp(cache: Rc<RegexCache>) -> ObjectValue {
    let methods: &[(&str, &[&str])] = &[
        ("test", &["s", "pattern"]),
        ("match", &["s", "pattern"]),
        ("findAll", &["s", "pattern", "limit"]),
        ("replace", &["s", "pattern", "replacement"]),
        ("replaceAll", &["s", "pattern", "replacement"]),
        ("split", &["s", "pattern", "limit"]),
        ("escape", &["s"]),
    ];

    let mut obj = ObjectValue::new();
    for (method, param_names) in methods {
        let cache = cache.clone();
        let method_name = method.to_string();
        let param_names: Vec<String> = param_names.iter().map(|p| p.to_string()).collect();
        obj.set_plain(
            *method,
            Value::NativeTool(Rc::new(NativeToolValue {
                name: method.to_string(),
                description: format!("Regexp.{method}"),
                parameters_schema: serde_json::json!({ "properties": {} }),
                param_names: param_names.clone(),
                invoker: Box::new(move |args: HashMap<String, Value>| {
                    let positional: Vec<Value> = param_names
                        .iter()
                        .map(|p| args.get(p).cloned().unwrap_or(Value::Null))
                        .collect();
                    builtins::call_regexp_static(&cache, &method_name, &positional)
                }),
            })),
        );
    }
    obj
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Evaluator {
        Evaluator::new(InterpreterOptions::default())
    }

    #[test]
    fn eval_string_returns_the_last_expression_value() {
        let mut ev = fresh();
        let outcome = ev.eval_string("1 + 2;\n3 * 4;", None);
        assert!(outcome.errors.is_empty());
        assert!(matches!(outcome.final_result, Value::Number(n) if n == 12.0));
    }

    #[test]
    fn tool_declaration_and_call_roundtrip() {
        let mut ev = fresh();
        let outcome = ev.eval_string(
            "tool add(a, b) { return a + b; }\nadd(2, 3);",
            None,
        );
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert!(matches!(outcome.final_result, Value::Number(n) if n == 5.0));
    }

    #[test]
    fn closures_capture_their_declaration_environment() {
        let mut ev = fresh();
        let outcome = ev.eval_string(
            "tool makeAdder(n) { tool adder(x) { return x + n; } return adder; }\nadd5 = makeAdder(5);\nadd5(10);",
            None,
        );
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert!(matches!(outcome.final_result, Value::Number(n) if n == 15.0));
    }

    #[test]
    fn agents_push_rejects_the_reserved_default_name() {
        let ev = fresh();
        let agent = Value::Agent(Rc::new(RefCell::new(AgentValue::new(
            "default",
            Value::Model(Rc::new(RefCell::new(ModelValue::new("m", "openai", "gpt-4")))),
            "",
        ))));
        let err = ev.agents_push(&[agent]).unwrap_err();
        assert!(matches!(err, InterpError::Domain(_)));
    }

    #[test]
    fn agents_push_rejects_duplicate_names() {
        let ev = fresh();
        let model = Value::Model(Rc::new(RefCell::new(ModelValue::new("m", "openai", "gpt-4"))));
        let first = Value::Agent(Rc::new(RefCell::new(AgentValue::new("scout", model.clone(), ""))));
        let second = Value::Agent(Rc::new(RefCell::new(AgentValue::new("scout", model, ""))));
        ev.agents_push(&[first]).unwrap();
        let err = ev.agents_push(&[second]).unwrap_err();
        assert!(matches!(err, InterpError::Domain(_)));
    }

    #[test]
    fn emit_event_returns_none_when_no_handler_sets_handled() {
        let ev = fresh();
        ev.bridge_state.middleware.register(
            "command.input",
            Value::NativeTool(Rc::new(NativeToolValue {
                name: "passthrough".into(),
                description: String::new(),
                parameters_schema: serde_json::json!({}),
                param_names: vec!["ctx".into(), "next".into()],
                invoker: Box::new(|_| Ok(Value::Null)),
            })),
        );
        let mut ctx = ObjectValue::new();
        ctx.set_plain("input", Value::string("ls"));
        let result = ev.emit_event("command.input", ctx).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn emit_event_short_circuits_when_a_handler_reports_handled() {
        let ev = fresh();
        ev.bridge_state.middleware.register(
            "command.input",
            Value::NativeTool(Rc::new(NativeToolValue {
                name: "intercept".into(),
                description: String::new(),
                parameters_schema: serde_json::json!({}),
                param_names: vec!["ctx".into(), "next".into()],
                invoker: Box::new(|_| {
                    let mut out = ObjectValue::new();
                    out.set_plain("handled", Value::Bool(true));
                    Ok(Value::object(out))
                }),
            })),
        );
        let mut ctx = ObjectValue::new();
        ctx.set_plain("input", Value::string("#skip"));
        let result = ev.emit_event("command.input", ctx).unwrap();
        assert!(result.is_some());
    }

    #[test]
    fn for_of_over_array_sums_elements() {
        let mut ev = fresh();
        let outcome = ev.eval_string(
            "total = 0;\nfor (x of [1, 2, 3]) { total = total + x; }\ntotal;",
            None,
        );
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert!(matches!(outcome.final_result, Value::Number(n) if n == 6.0));
    }

    #[test]
    fn array_index_assignment_one_past_length_appends() {
        let mut ev = fresh();
        let outcome = ev.eval_string("a = [1, 2]; a[2] = 3; a.length;", None);
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert!(matches!(outcome.final_result, Value::Number(n) if n == 3.0));
    }

    #[test]
    fn array_index_assignment_beyond_length_plus_one_is_an_error() {
        let mut ev = fresh();
        let outcome = ev.eval_string("a = [1]; a[5] = 3;", None);
        assert_eq!(outcome.errors.len(), 1);
    }

    #[test]
    fn regexp_match_returns_capture_groups() {
        let mut ev = fresh();
        let outcome = ev.eval_string(r#"Regexp.match("2024-01-02", "(\\d+)-(\\d+)-(\\d+)");"#, None);
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert!(matches!(outcome.final_result, Value::Array(_)));
    }
}
