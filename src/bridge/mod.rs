//! Assembles the `gsh.*` host object (spec.md §4.2) — the "core
//! innovation" named in spec.md §3: every live piece of host state (models,
//! agents, current agent, last command, history, tools, ui, middleware
//! registration) is exposed as one `ObjectValue` built entirely out of
//! `Descriptor`s, so script code reads/writes it exactly like any other
//! object while getters/setters run host logic underneath.

use crate::config::SDKConfig;
use crate::eval::InterpError;
use crate::exec::ExecTool;
use crate::mcp::MCPManager;
use crate::middleware::MiddlewareRegistry;
use crate::regex_cache::RegexCache;
use crate::tools::{grep, view_file};
use crate::ui::{CursorOps, SpinnerManager, Style};
use crate::value::{Descriptor, NativeToolValue, ObjectValue, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// Shared host-side state the `gsh.*` bridge closes over. Everything is
/// `Rc`/single-threaded except `SDKConfig`, which a host may also poke from
/// outside a script turn.
pub struct BridgeState {
    pub sdk_config: Arc<SDKConfig>,
    pub exec_tool: Rc<ExecTool>,
    pub regex_cache: Rc<RegexCache>,
    pub middleware: Rc<MiddlewareRegistry>,
    pub mcp: Rc<MCPManager>,
    pub mcp_runtime: tokio::runtime::Handle,
    pub spinners: Rc<SpinnerManager>,
    pub output_cap_bytes: usize,
    pub grep_backend_override: Option<String>,
    pub models: Rc<RefCell<HashMap<String, Value>>>,
    pub agents: Rc<RefCell<Vec<Value>>>,
    pub current_agent: Rc<RefCell<Option<String>>>,
    /// Host-installed hooks behind `REPLContext.onAgentAdded`/`onAgentSwitch`
    /// (spec.md §3/§4.3). Rust-level callbacks, not script-reachable — a
    /// script only ever observes their *effects* (an agent appearing in
    /// `gsh.agents`, `currentAgent` changing).
    pub on_agent_added: RefCell<Option<Box<dyn Fn(&Value)>>>,
    pub on_agent_switch: RefCell<Option<Box<dyn Fn(&str)>>>,
}

fn native(
    name: &str,
    description: &str,
    param_names: &[&str],
    f: impl Fn(HashMap<String, Value>) -> Result<Value, InterpError> + 'static,
) -> Value {
    let properties: serde_json::Map<String, serde_json::Value> = param_names
        .iter()
        .map(|p| (p.to_string(), serde_json::json!({})))
        .collect();
    Value::NativeTool(Rc::new(NativeToolValue {
        name: name.to_string(),
        description: description.to_string(),
        parameters_schema: serde_json::json!({ "properties": properties }),
        param_names: param_names.iter().map(|p| p.to_string()).collect(),
        invoker: Box::new(f),
    }))
}

fn arg(args: &HashMap<String, Value>, name: &str) -> Value {
    args.get(name).cloned().unwrap_or(Value::Null)
}

fn arg_str(args: &HashMap<String, Value>, name: &str) -> Option<String> {
    match args.get(name) {
        Some(Value::String(s)) => Some(s.to_string()),
        _ => None,
    }
}

fn arg_num(args: &HashMap<String, Value>, name: &str) -> Option<f64> {
    match args.get(name) {
        Some(Value::Number(n)) => Some(*n),
        _ => None,
    }
}

/// Builds the `gsh` object from scratch (spec.md §6: constructed once at
/// `Interpreter::new`).
pub fn build_gsh(state: Rc<BridgeState>) -> ObjectValue {
    let mut gsh = ObjectValue::new();

    gsh.define("version", Descriptor::read_only(Value::string(env!("CARGO_PKG_VERSION"))));

    gsh.define("models", Descriptor::plain(Value::object(build_models(state.clone()))));
    // `gsh.agents` is the live array itself (not a wrapper object) so
    // indexing/iteration work through the same generic Array semantics
    // every other array gets; `.push`'s extra validation and its
    // `onAgentAdded` callback are special-cased in the evaluator's method
    // dispatch by identity against this exact `Rc` (spec.md §4.3).
    gsh.define("agents", Descriptor::plain(Value::Array(state.agents.clone())));

    {
        let state = state.clone();
        gsh.define(
            "currentAgent",
            Descriptor::getter_setter(
                Rc::new({
                    let state = state.clone();
                    move |_| {
                        Ok(state
                            .current_agent
                            .borrow()
                            .clone()
                            .map(Value::string)
                            .unwrap_or(Value::Null))
                    }
                }),
                Rc::new(move |args| {
                    let name = match args.first() {
                        Some(Value::String(s)) => s.to_string(),
                        _ => return Err(InterpError::type_error("currentAgent must be set to a string name")),
                    };
                    let known = state
                        .agents
                        .borrow()
                        .iter()
                        .any(|a| matches!(a, Value::Agent(av) if av.borrow().name == name));
                    if !known {
                        return Err(InterpError::domain(format!("no agent named `{name}` in gsh.agents")));
                    }
                    *state.current_agent.borrow_mut() = Some(name.clone());
                    if let Some(hook) = state.on_agent_switch.borrow().as_ref() {
                        hook(&name);
                    }
                    Ok(Value::Null)
                }),
            ),
        );
    }

    {
        let state = state.clone();
        gsh.define(
            "lastCommand",
            Descriptor::read_only_getter(Rc::new(move |_| {
                let ctx = state.sdk_config.repl_context();
                let mut obj = ObjectValue::new();
                obj.set_plain(
                    "command",
                    ctx.last_command.map(Value::string).unwrap_or(Value::Null),
                );
                obj.set_plain(
                    "exitCode",
                    ctx.last_exit_code.map(|c| Value::Number(c as f64)).unwrap_or(Value::Null),
                );
                obj.set_plain(
                    "durationMs",
                    ctx.last_duration_ms.map(|d| Value::Number(d as f64)).unwrap_or(Value::Null),
                );
                Ok(Value::object(obj))
            })),
        );
    }

    gsh.define("history", Descriptor::read_only(Value::object(build_history(state.clone()))));
    gsh.define("tools", Descriptor::read_only(Value::object(build_tools(state.clone()))));
    gsh.define("mcp", Descriptor::read_only(Value::object(build_mcp(state.clone()))));
    gsh.define("ui", Descriptor::read_only(Value::object(build_ui(state.clone()))));

    {
        let middleware = state.middleware.clone();
        gsh.set_plain(
            "use",
            native(
                "use",
                "registers a middleware handler for `event`",
                &["event", "tool"],
                move |args| {
                    let event = arg_str(&args, "event")
                        .ok_or_else(|| InterpError::type_error("use(event, tool): event must be a string"))?;
                    let tool = arg(&args, "tool");
                    let param_count = match &tool {
                        Value::Tool(t) => t.params.len(),
                        Value::NativeTool(nt) => nt.param_names.len(),
                        _ => return Err(InterpError::type_error("use(event, tool): tool must be callable")),
                    };
                    if param_count != 2 {
                        return Err(InterpError::arity(2, param_count));
                    }
                    Ok(Value::Number(middleware.register(event, tool) as f64))
                },
            ),
        );
    }
    {
        let middleware = state.middleware.clone();
        gsh.set_plain(
            "remove",
            native(
                "remove",
                "removes a middleware handler by id or tool identity",
                &["event", "toolOrId"],
                move |args| {
                    let event = arg_str(&args, "event")
                        .ok_or_else(|| InterpError::type_error("remove(event, toolOrId): event must be a string"))?;
                    match args.get("toolOrId") {
                        Some(Value::Number(id)) => Ok(Value::Bool(middleware.remove_by_id(&event, *id as u64))),
                        Some(other) => Ok(Value::Bool(middleware.remove_by_tool(&event, other))),
                        None => Err(InterpError::arity(2, 1)),
                    }
                },
            ),
        );
    }

    gsh
}

fn build_models(state: Rc<BridgeState>) -> ObjectValue {
    let mut obj = ObjectValue::new();
    for tier in ["lite", "workhorse", "premium"] {
        let state = state.clone();
        let tier_name = tier.to_string();
        let getter_state = state.clone();
        let getter_tier = tier_name.clone();
        let setter_tier = tier_name.clone();
        obj.define(
            tier,
            Descriptor::getter_setter(
                Rc::new(move |_| {
                    Ok(getter_state
                        .models
                        .borrow()
                        .get(&getter_tier)
                        .cloned()
                        .unwrap_or(Value::Null))
                }),
                Rc::new(move |args| {
                    let model = args.first().cloned().unwrap_or(Value::Null);
                    match model {
                        Value::Model(_) => {
                            state.models.borrow_mut().insert(setter_tier.clone(), model);
                        }
                        Value::Null => {
                            state.models.borrow_mut().remove(&setter_tier);
                        }
                        _ => {
                            return Err(InterpError::type_error(format!(
                                "gsh.models.{setter_tier} must be assigned a model value or null"
                            )));
                        }
                    }
                    Ok(Value::Null)
                }),
            ),
        );
    }
    obj
}

fn build_history(state: Rc<BridgeState>) -> ObjectValue {
    let mut obj = ObjectValue::new();
    {
        let state = state.clone();
        obj.set_plain(
            "getRecent",
            native(
                "getRecent",
                "the most recent commands, default limit 10",
                &["limit"],
                move |args| {
                    let limit = arg_num(&args, "limit").unwrap_or(10.0) as usize;
                    Ok(Value::array(
                        state
                            .sdk_config
                            .recent_history(limit)
                            .into_iter()
                            .map(|h| {
                                let mut o = ObjectValue::new();
                                o.set_plain("command", Value::string(h.command));
                                o.set_plain("exitCode", Value::Number(h.exit_code as f64));
                                o.set_plain(
                                    "timestamp",
                                    h.timestamp.map(|t| Value::Number(t as f64)).unwrap_or(Value::Null),
                                );
                                Value::object(o)
                            })
                            .collect(),
                    ))
                },
            ),
        );
    }
    {
        let state = state.clone();
        obj.set_plain(
            "findPrefix",
            native(
                "findPrefix",
                "the most recent commands starting with `prefix`",
                &["prefix", "limit"],
                move |args| {
                    let prefix = arg_str(&args, "prefix").unwrap_or_default();
                    let limit = arg_num(&args, "limit").unwrap_or(10.0) as usize;
                    Ok(Value::array(
                        state
                            .sdk_config
                            .find_prefix(&prefix, limit)
                            .into_iter()
                            .map(|h| {
                                let mut o = ObjectValue::new();
                                o.set_plain("command", Value::string(h.command));
                                o.set_plain("exitCode", Value::Number(h.exit_code as f64));
                                o.set_plain(
                                    "timestamp",
                                    h.timestamp.map(|t| Value::Number(t as f64)).unwrap_or(Value::Null),
                                );
                                Value::object(o)
                            })
                            .collect(),
                    ))
                },
            ),
        );
    }
    obj
}

fn build_tools(state: Rc<BridgeState>) -> ObjectValue {
    let mut obj = ObjectValue::new();
    {
        let state = state.clone();
        obj.set_plain(
            "exec",
            native(
                "exec",
                "runs a shell command in a PTY and returns its result as data",
                &["command", "workingDirectory", "timeout"],
                move |args| {
                    let command = arg_str(&args, "command")
                        .ok_or_else(|| InterpError::type_error("exec(command, ...) requires a string command"))?;
                    let working_directory = arg_str(&args, "workingDirectory");
                    let timeout = arg_num(&args, "timeout").map(|t| t as u64);
                    Ok(state.exec_tool.exec(
                        &command,
                        working_directory.as_deref(),
                        timeout,
                        state.sdk_config.exec_writer(),
                    ))
                },
            ),
        );
    }
    {
        let state = state.clone();
        obj.set_plain(
            "grep",
            native(
                "grep",
                "searches `path` for `pattern` using the best available backend",
                &["pattern", "path"],
                move |args| {
                    let pattern = arg_str(&args, "pattern")
                        .ok_or_else(|| InterpError::type_error("grep(pattern, path) requires a string pattern"))?;
                    let path = arg_str(&args, "path").unwrap_or_else(|| ".".to_string());
                    let backend = grep::detect_backend(state.grep_backend_override.as_deref(), &path);
                    Ok(grep::grep(&pattern, &path, backend, state.output_cap_bytes))
                },
            ),
        );
    }
    {
        let state = state.clone();
        obj.set_plain(
            "viewFile",
            native(
                "viewFile",
                "renders a file with line numbers, optionally windowed",
                &["path", "start", "end"],
                move |args| {
                    let path = arg_str(&args, "path")
                        .ok_or_else(|| InterpError::type_error("viewFile(path, ...) requires a string path"))?;
                    let window = match (arg_num(&args, "start"), arg_num(&args, "end")) {
                        (Some(s), Some(e)) => Some((s as usize, e as usize)),
                        _ => None,
                    };
                    Ok(view_file::view_file(&path, window, state.output_cap_bytes))
                },
            ),
        );
    }
    obj
}

fn build_mcp(state: Rc<BridgeState>) -> ObjectValue {
    let mut obj = ObjectValue::new();
    {
        let state = state.clone();
        obj.define(
            "servers",
            Descriptor::read_only_getter(Rc::new(move |_| {
                Ok(Value::array(
                    state.mcp.server_names().into_iter().map(Value::string).collect(),
                ))
            })),
        );
    }
    {
        let state = state.clone();
        obj.set_plain(
            "list",
            native(
                "list",
                "the tool names a registered MCP server currently exposes",
                &["serverName"],
                move |args| {
                    let server = arg_str(&args, "serverName")
                        .ok_or_else(|| InterpError::type_error("mcp.list(serverName) requires a string"))?;
                    let mcp = state.mcp.clone();
                    let names = state
                        .mcp_runtime
                        .block_on(async move { mcp.list_tools(&server).await })?;
                    Ok(Value::array(names.into_iter().map(Value::string).collect()))
                },
            ),
        );
    }
    obj
}

fn build_ui(state: Rc<BridgeState>) -> ObjectValue {
    let mut obj = ObjectValue::new();
    {
        let spinners = state.spinners.clone();
        obj.set_plain(
            "spinner",
            native(
                "spinner",
                "starts an animated spinner with the given label, returns an id",
                &["label", "id"],
                move |args| {
                    let label = arg_str(&args, "label").unwrap_or_default();
                    let id = arg_num(&args, "id").map(|n| n as u64);
                    Ok(Value::Number(spinners.start(label, id) as f64))
                },
            ),
        );
    }
    {
        let spinners = state.spinners.clone();
        obj.set_plain(
            "setSpinnerMessage",
            native(
                "setSpinnerMessage",
                "updates the addressed spinner's label, or the active one if `id` is omitted",
                &["label", "id"],
                move |args| {
                    let label = arg_str(&args, "label").unwrap_or_default();
                    let id = arg_num(&args, "id").map(|n| n as u64);
                    spinners.set_message(label, id);
                    Ok(Value::Null)
                },
            ),
        );
    }
    {
        let spinners = state.spinners.clone();
        obj.set_plain(
            "stopSpinner",
            native(
                "stopSpinner",
                "stops a spinner started with gsh.ui.spinner",
                &["id"],
                move |args| {
                    if let Some(id) = arg_num(&args, "id") {
                        spinners.stop(id as u64);
                    }
                    Ok(Value::Null)
                },
            ),
        );
    }
    obj.set_plain(
        "write",
        native(
            "write",
            "writes raw text to stdout",
            &["text"],
            |args| {
                let text = arg_str(&args, "text").unwrap_or_default();
                CursorOps::write(&text).map_err(|e| InterpError::external(e.to_string()))?;
                Ok(Value::Null)
            },
        ),
    );
    obj.set_plain(
        "clearLine",
        native("clearLine", "clears the current terminal line", &[], |_| {
            CursorOps::clear_line().map_err(|e| InterpError::external(e.to_string()))?;
            Ok(Value::Null)
        }),
    );
    obj.set_plain(
        "clearLines",
        native("clearLines", "clears the previous `n` terminal lines", &["n"], |args| {
            let n = arg_num(&args, "n").unwrap_or(1.0).max(0.0) as u16;
            CursorOps::clear_lines(n).map_err(|e| InterpError::external(e.to_string()))?;
            Ok(Value::Null)
        }),
    );
    obj.set_plain(
        "moveCursor",
        native(
            "moveCursor",
            "moves the cursor relative to its current position",
            &["dx", "dy"],
            |args| {
                let dx = arg_num(&args, "dx").unwrap_or(0.0) as i32;
                let dy = arg_num(&args, "dy").unwrap_or(0.0) as i32;
                CursorOps::move_cursor(dx, dy).map_err(|e| InterpError::external(e.to_string()))?;
                Ok(Value::Null)
            },
        ),
    );

    let mut styles = ObjectValue::new();
    for name in ["primary", "success", "error", "dim", "bold", "italic"] {
        let style = Style::from_name(name).expect("listed name is valid");
        styles.set_plain(
            name,
            native(
                name,
                "wraps text in this semantic style's ANSI codes",
                &["text"],
                move |args| Ok(Value::string(style.apply(&arg_str(&args, "text").unwrap_or_default()))),
            ),
        );
    }
    obj.set_plain("styles", Value::object(styles));
    obj
}
