//! Event/middleware registry (spec.md §4.4): `gsh.use(event, tool)` appends
//! an ordered handler; `gsh.remove(event, toolOrId)` removes one. The actual
//! `next(ctx)` chain-driving recursion lives in `eval`, since running a
//! handler means invoking the evaluator's tool-call machinery; this module
//! only owns the ordered registry itself.
//!
//! Grounded on `vtcode-core`'s hook-registration pattern for tool-call
//! middleware (ordered, registration-order dispatch, short-circuit on a
//! handled result) — generalized here to arbitrary named events.

use crate::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;

struct Handler {
    id: u64,
    tool: Value,
}

#[derive(Default)]
pub struct MiddlewareManager {
    next_id: u64,
    handlers: HashMap<String, Vec<Handler>>,
}

/// Wrapped in `RwLock` so a snapshot can be taken and released before the
/// chain runs (spec.md §9: middleware lists are read under lock then
/// released, so a handler that itself calls `gsh.use`/`gsh.remove` doesn't
/// deadlock or observe a half-mutated list mid-chain).
pub struct MiddlewareRegistry {
    inner: RwLock<MiddlewareManager>,
}

impl Default for MiddlewareRegistry {
    fn default() -> Self {
        Self {
            inner: RwLock::new(MiddlewareManager::default()),
        }
    }
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, event: impl Into<String>, tool: Value) -> u64 {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let id = inner.next_id;
        inner
            .handlers
            .entry(event.into())
            .or_default()
            .push(Handler { id, tool });
        id
    }

    /// Removes by id, or by tool identity if `id` is `None` (spec.md §4.4:
    /// `remove(event, toolOrId)` accepts either).
    pub fn remove_by_id(&self, event: &str, id: u64) -> bool {
        let mut inner = self.inner.write();
        if let Some(list) = inner.handlers.get_mut(event) {
            let before = list.len();
            list.retain(|h| h.id != id);
            return list.len() != before;
        }
        false
    }

    pub fn remove_by_tool(&self, event: &str, tool: &Value) -> bool {
        let mut inner = self.inner.write();
        if let Some(list) = inner.handlers.get_mut(event) {
            let before = list.len();
            list.retain(|h| !h.tool.eq_value(tool));
            return list.len() != before;
        }
        false
    }

    pub fn handler_ids(&self, event: &str) -> Vec<u64> {
        let inner = self.inner.read();
        inner
            .handlers
            .get(event)
            .map(|list| list.iter().map(|h| h.id).collect())
            .unwrap_or_default()
    }

    /// A point-in-time copy of the ordered handler list for `event`, taken
    /// and released before the caller drives the chain.
    pub fn snapshot(&self, event: &str) -> Vec<Value> {
        let inner = self.inner.read();
        inner
            .handlers
            .get(event)
            .map(|list| list.iter().map(|h| h.tool.clone()).collect())
            .unwrap_or_default()
    }
}
