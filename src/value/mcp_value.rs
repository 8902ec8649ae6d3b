//! Late-bound MCP proxy values (spec.md §3/§4.8/§9: "MCP tools as
//! late-bound references").

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MCPProxyValue {
    pub server: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MCPToolValue {
    pub server: String,
    pub tool: String,
}
