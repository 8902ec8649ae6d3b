//! The two MCP transports: a subprocess speaking JSON-RPC over stdio, or a
//! plain HTTP endpoint. Grounded on `vtcode-core/src/mcp/rmcp_transport.rs`
//! and `rmcp_client.rs`'s stdio/HTTP transport split.

use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub enum ContentBlock {
    Text(String),
    Structured(serde_json::Value),
}

#[async_trait]
pub trait McpTransport: Send + Sync {
    async fn list_tools(&self) -> anyhow::Result<Vec<String>>;
    async fn call_tool(
        &self,
        tool: &str,
        args: HashMap<String, serde_json::Value>,
    ) -> anyhow::Result<Vec<ContentBlock>>;
}

/// Speaks newline-delimited JSON-RPC to a long-lived child process (spec.md
/// §4.8's stdio transport).
pub struct StdioTransport {
    command: String,
    args: Vec<String>,
    next_id: Mutex<u64>,
}

impl StdioTransport {
    pub fn new(command: String, args: Vec<String>) -> Self {
        Self {
            command,
            args,
            next_id: Mutex::new(0),
        }
    }

    async fn request(&self, method: &str, params: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let mut id_guard = self.next_id.lock().await;
        *id_guard += 1;
        let id = *id_guard;
        drop(id_guard);

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let mut stdin = child.stdin.take().expect("piped");
        stdin.write_all(payload.to_string().as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        drop(stdin);

        let stdout = child.stdout.take().expect("piped");
        let mut lines = BufReader::new(stdout).lines();
        let response = loop {
            match lines.next_line().await? {
                Some(line) if !line.trim().is_empty() => break serde_json::from_str::<serde_json::Value>(&line)?,
                Some(_) => continue,
                None => anyhow::bail!("MCP server closed stdout before replying"),
            }
        };
        child.kill().await.ok();

        if let Some(error) = response.get("error") {
            anyhow::bail!("MCP server error: {error}");
        }
        Ok(response.get("result").cloned().unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn list_tools(&self) -> anyhow::Result<Vec<String>> {
        let result = self.request("tools/list", serde_json::json!({})).await?;
        Ok(result
            .get("tools")
            .and_then(|t| t.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|t| t.get("name").and_then(|n| n.as_str()).map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn call_tool(
        &self,
        tool: &str,
        args: HashMap<String, serde_json::Value>,
    ) -> anyhow::Result<Vec<ContentBlock>> {
        let result = self
            .request(
                "tools/call",
                serde_json::json!({ "name": tool, "arguments": args }),
            )
            .await?;
        Ok(parse_content(&result))
    }
}

/// An HTTP-exposed MCP server (spec.md §4.8's HTTP transport), grounded on
/// the teacher's `reqwest`-based provider client pattern.
pub struct HttpTransport {
    base_url: String,
    headers: HashMap<String, String>,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: String, headers: HashMap<String, String>) -> Self {
        Self {
            base_url,
            headers,
            client: reqwest::Client::new(),
        }
    }

    fn request_builder(&self, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.post(format!("{}{path}", self.base_url));
        for (k, v) in &self.headers {
            req = req.header(k, v);
        }
        req
    }
}

#[async_trait]
impl McpTransport for HttpTransport {
    async fn list_tools(&self) -> anyhow::Result<Vec<String>> {
        let resp: serde_json::Value = self
            .request_builder("/tools/list")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp
            .get("tools")
            .and_then(|t| t.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|t| t.get("name").and_then(|n| n.as_str()).map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn call_tool(
        &self,
        tool: &str,
        args: HashMap<String, serde_json::Value>,
    ) -> anyhow::Result<Vec<ContentBlock>> {
        let resp: serde_json::Value = self
            .request_builder("/tools/call")
            .json(&serde_json::json!({ "name": tool, "arguments": args }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(parse_content(&resp))
    }
}

fn parse_content(result: &serde_json::Value) -> Vec<ContentBlock> {
    result
        .get("content")
        .and_then(|c| c.as_array())
        .map(|blocks| {
            blocks
                .iter()
                .map(|b| match b.get("type").and_then(|t| t.as_str()) {
                    Some("text") => ContentBlock::Text(
                        b.get("text").and_then(|t| t.as_str()).unwrap_or("").to_string(),
                    ),
                    _ => ContentBlock::Structured(b.clone()),
                })
                .collect()
        })
        .unwrap_or_else(|| vec![ContentBlock::Structured(result.clone())])
}
