//! Interpreter configuration and host-facing SDK handle (SPEC_FULL.md §2.3),
//! grounded on `vtcode-config::core::config::CoreAgentConfig` (a
//! serde-`Deserialize` settings struct the host builds up-front, the crate
//! itself never reading files from disk).

use crate::value::Value;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InterpreterOptions {
    /// Capacity of the compiled-regex LRU cache (spec.md §4.7).
    pub regex_cache_capacity: usize,
    /// Default timeout, in seconds, for `gsh.tools.exec` when the caller
    /// doesn't supply one (spec.md §4.6).
    pub exec_default_timeout_secs: u64,
    /// Byte cap applied to captured exec/grep/viewFile output before
    /// truncation (spec.md §4.6/§4.9).
    pub exec_output_cap_bytes: usize,
    /// Force a specific grep backend instead of auto-detecting
    /// rg > git grep > POSIX grep (spec.md §4.9).
    pub grep_backend_override: Option<String>,
    /// Tracing target prefix override; defaults to `"gsh"` so modules log
    /// under `gsh::eval`, `gsh::llm`, etc. (SPEC_FULL.md §2.1).
    pub tracing_target_prefix: Option<String>,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            regex_cache_capacity: 64,
            exec_default_timeout_secs: 60,
            exec_output_cap_bytes: 50 * 1024,
            grep_backend_override: None,
            tracing_target_prefix: None,
        }
    }
}

/// What the host has told the SDK about the current REPL turn (spec.md
/// §4.2's `gsh.lastCommand`/history surface draws on this).
#[derive(Debug, Clone, Default)]
pub struct REPLContext {
    pub last_command: Option<String>,
    pub last_exit_code: Option<i32>,
    pub last_duration_ms: Option<u64>,
}

/// A single `{model, tier}` entry as seen through `gsh.models` (spec.md
/// §4.2).
#[derive(Debug, Clone)]
pub struct ModelEntry {
    pub tier: String,
    pub model: Value,
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub command: String,
    pub exit_code: i32,
    pub timestamp: Option<i64>,
}

/// Disk-persisted shell history is named in spec.md §1 as an external
/// collaborator ("out of scope... named interfaces"); this trait is that
/// named interface. `gsh.history.getRecent`/`findPrefix` (spec.md §4.2)
/// delegate to whatever the host installs via `SDKConfig::set_history_provider`;
/// with none installed they return `[]` (spec.md §4.2: "when no provider is
/// installed, returns `[]`").
pub trait HistoryProvider: Send + Sync {
    /// Oldest-first, most recent `limit` entries (spec.md §4.2).
    fn recent(&self, limit: usize) -> Vec<HistoryEntry>;
    fn find_prefix(&self, prefix: &str, limit: usize) -> Vec<HistoryEntry>;
}

/// The "optional live writer" named in spec.md §4.6 point 3 / §5's
/// `safeWriter` requirement: `gsh.tools.exec` tees PTY output into this, as
/// it arrives, alongside its own internal capture buffer. Installed with
/// `SDKConfig::set_exec_writer`; with none installed, exec output is only
/// ever returned in the result value, never streamed live.
pub trait ExecWriter: Send + Sync {
    fn write_chunk(&self, chunk: &[u8]);
}

/// Host-facing handle shared between the `Interpreter` and the `gsh.*`
/// bridge it assembles; `Arc<RwLock<_>>` because a host may read it (e.g.
/// `UpdateLastCommand`) from outside the single-threaded evaluator while a
/// script turn is in flight.
pub struct SDKConfig {
    inner: RwLock<SDKConfigInner>,
}

#[derive(Default)]
struct SDKConfigInner {
    repl_context: REPLContext,
    history_provider: Option<Arc<dyn HistoryProvider>>,
    exec_writer: Option<Arc<dyn ExecWriter>>,
}

impl Default for SDKConfig {
    fn default() -> Self {
        Self {
            inner: RwLock::new(SDKConfigInner::default()),
        }
    }
}

impl SDKConfig {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_repl_context(&self, ctx: REPLContext) {
        self.inner.write().repl_context = ctx;
    }

    pub fn repl_context(&self) -> REPLContext {
        self.inner.read().repl_context.clone()
    }

    pub fn update_last_command(&self, command: String, exit_code: i32, duration_ms: u64) {
        let mut inner = self.inner.write();
        inner.repl_context.last_command = Some(command);
        inner.repl_context.last_exit_code = Some(exit_code);
        inner.repl_context.last_duration_ms = Some(duration_ms);
    }

    /// `SDKConfig().SetHistoryProvider(p)` (spec.md §6).
    pub fn set_history_provider(&self, provider: Arc<dyn HistoryProvider>) {
        self.inner.write().history_provider = Some(provider);
    }

    /// `gsh.history.getRecent(limit=10)` (spec.md §4.2).
    pub fn recent_history(&self, limit: usize) -> Vec<HistoryEntry> {
        match &self.inner.read().history_provider {
            Some(p) => p.recent(limit),
            None => Vec::new(),
        }
    }

    /// `gsh.history.findPrefix(prefix, limit)` (spec.md §4.2).
    pub fn find_prefix(&self, prefix: &str, limit: usize) -> Vec<HistoryEntry> {
        match &self.inner.read().history_provider {
            Some(p) => p.find_prefix(prefix, limit),
            None => Vec::new(),
        }
    }

    /// Installs the live writer `gsh.tools.exec` tees PTY output into
    /// (spec.md §4.6 point 3).
    pub fn set_exec_writer(&self, writer: Arc<dyn ExecWriter>) {
        self.inner.write().exec_writer = Some(writer);
    }

    pub fn exec_writer(&self) -> Option<Arc<dyn ExecWriter>> {
        self.inner.read().exec_writer.clone()
    }
}

/// A model tier name declared at construction time (spec.md §4.2: "lite,
/// workhorse, premium tiers").
pub type ModelTiers = HashMap<String, Value>;
