//! MCP proxy layer (spec.md §4.8): `gsh.mcp` is a read-only bridge over a
//! set of registered MCP servers, each reached either over stdio
//! (subprocess) or HTTP. `MCPProxyValue`/`MCPToolValue` are late-bound —
//! they carry a server/tool *name*, resolved against the live registry at
//! call time rather than at construction (spec.md §9) — so a script can
//! hold a proxy/tool reference across a server reconnect.
//!
//! Grounded on `vtcode-core/src/config/mcp.rs`'s `McpTransportConfig`
//! (stdio vs. HTTP) and `vtcode-core/src/mcp_client.rs`'s call/result
//! shape.

mod transport;

pub use transport::{ContentBlock, McpTransport, StdioTransport, HttpTransport};

use crate::eval::InterpError;
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub enum TransportConfig {
    Stdio { command: String, args: Vec<String> },
    Http { base_url: String, headers: HashMap<String, String> },
}

struct RegisteredServer {
    config: TransportConfig,
    transport: Option<Arc<dyn McpTransport>>,
}

/// Owns every registered MCP server. Shared behind `Arc` + `RwLock` since a
/// late-bound `MCPProxyValue`/`MCPToolValue` looks the server up again on
/// every call.
#[derive(Default)]
pub struct MCPManager {
    servers: RwLock<HashMap<String, RegisteredServer>>,
}

impl MCPManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_server(&self, name: impl Into<String>, config: TransportConfig) {
        self.servers.write().insert(
            name.into(),
            RegisteredServer {
                config,
                transport: None,
            },
        );
    }

    pub fn server_names(&self) -> Vec<String> {
        self.servers.read().keys().cloned().collect()
    }

    pub fn has_server(&self, name: &str) -> bool {
        self.servers.read().contains_key(name)
    }

    /// Drops every live transport handle so the next call against a server
    /// reconnects from scratch (`Interpreter::close`, spec.md §5 resource
    /// lifecycles). Registrations themselves are left intact.
    pub fn disconnect_all(&self) {
        for server in self.servers.write().values_mut() {
            server.transport = None;
        }
    }

    /// `gsh.mcp.list(serverName)`: the tool names a server currently
    /// exposes.
    pub async fn list_tools(&self, server: &str) -> Result<Vec<String>, InterpError> {
        let transport = self.transport_for(server)?;
        transport
            .list_tools()
            .await
            .map_err(|e| InterpError::external(e.to_string()))
    }

    /// Calls `server.tool` with `args`, mapping the MCP content-block
    /// result onto a `Value` (spec.md §4.8: text -> string, multiple
    /// blocks -> array, structured content -> recursive JSON conversion).
    pub async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        args: HashMap<String, Value>,
    ) -> Result<Value, InterpError> {
        let transport = self.transport_for(server)?;
        let json_args = args
            .into_iter()
            .map(|(k, v)| (k, value_to_json(&v)))
            .collect();
        let blocks = transport
            .call_tool(tool, json_args)
            .await
            .map_err(|e| InterpError::external(e.to_string()))?;
        Ok(blocks_to_value(blocks))
    }

    fn transport_for(&self, server: &str) -> Result<Arc<dyn McpTransport>, InterpError> {
        let mut servers = self.servers.write();
        let entry = servers
            .get_mut(server)
            .ok_or_else(|| InterpError::name(format!("unknown MCP server `{server}`")))?;
        if entry.transport.is_none() {
            entry.transport = Some(match &entry.config {
                TransportConfig::Stdio { command, args } => {
                    Arc::new(StdioTransport::new(command.clone(), args.clone())) as Arc<dyn McpTransport>
                }
                TransportConfig::Http { base_url, headers } => {
                    Arc::new(HttpTransport::new(base_url.clone(), headers.clone())) as Arc<dyn McpTransport>
                }
            });
        }
        Ok(entry.transport.clone().expect("just populated"))
    }
}

fn blocks_to_value(blocks: Vec<ContentBlock>) -> Value {
    if blocks.len() == 1 {
        single_block_to_value(&blocks[0])
    } else {
        Value::array(blocks.iter().map(single_block_to_value).collect())
    }
}

fn single_block_to_value(block: &ContentBlock) -> Value {
    match block {
        ContentBlock::Text(text) => Value::string(text.clone()),
        ContentBlock::Structured(json) => json_to_value(json),
    }
}

fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
        serde_json::Value::String(s) => Value::string(s.clone()),
        serde_json::Value::Array(items) => Value::array(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => {
            let mut obj = crate::value::ObjectValue::new();
            for (k, v) in map {
                obj.set_plain(k.clone(), json_to_value(v));
            }
            Value::object(obj)
        }
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::json!(n),
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::Array(items) => {
            serde_json::Value::Array(items.borrow().iter().map(value_to_json).collect())
        }
        Value::Object(obj) => {
            let obj = obj.borrow();
            let mut map = serde_json::Map::new();
            for key in obj.keys() {
                if let Ok(v) = obj.get(key) {
                    map.insert(key.to_string(), value_to_json(&v));
                }
            }
            serde_json::Value::Object(map)
        }
        other => serde_json::Value::String(other.to_display_string()),
    }
}
