//! SSE line parsing and streaming tool-call-fragment accumulation (spec.md
//! §4.5), grounded on
//! `vtcode-core/src/llm/providers/openai/stream_decoder.rs`'s `data: ...` /
//! `data: [DONE]` handling and per-index tool-call fragment accumulation.

use crate::value::ToolCall;
use std::collections::BTreeMap;

/// One decoded SSE `data:` payload, or the terminal `[DONE]` marker.
pub enum SseEvent {
    Data(serde_json::Value),
    Done,
}

/// Parses a single SSE line. Lines that aren't `data: ...` (blank
/// keep-alives, `event: ...`, comments) are ignored by returning `None`.
pub fn parse_sse_line(line: &str) -> Option<SseEvent> {
    let payload = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:"))?;
    let payload = payload.trim();
    if payload == "[DONE]" {
        return Some(SseEvent::Done);
    }
    serde_json::from_str(payload).ok().map(SseEvent::Data)
}

/// Accumulates streamed tool-call fragments keyed by their `index` field,
/// since providers stream a tool call's name/arguments in pieces rather
/// than all at once (spec.md §4.5 point 5).
#[derive(Default)]
pub struct ToolCallAccumulator {
    fragments: BTreeMap<u64, ToolCallFragment>,
}

#[derive(Default, Clone)]
struct ToolCallFragment {
    id: String,
    name: String,
    arguments: String,
    /// Set once `OnToolPending` has fired for this index, so a later chunk
    /// that repeats the same `id`/`name` (some providers do) never fires it
    /// twice (spec.md §4.5 point 7: "exactly once per call").
    pending_fired: bool,
}

impl ToolCallAccumulator {
    /// Accumulates one chunk's fragment for `index` and returns a
    /// just-became-pending `ToolCall` the first time both `id` and `name`
    /// are known for that index, so the caller can fire `OnToolPending`
    /// inline during streaming rather than after the stream ends (spec.md
    /// §4.5 point 7).
    pub fn accumulate(
        &mut self,
        index: u64,
        id: Option<&str>,
        name: Option<&str>,
        arguments_delta: Option<&str>,
    ) -> Option<ToolCall> {
        let entry = self.fragments.entry(index).or_default();
        if let Some(id) = id {
            entry.id = id.to_string();
        }
        if let Some(name) = name {
            entry.name.push_str(name);
        }
        if let Some(delta) = arguments_delta {
            entry.arguments.push_str(delta);
        }
        if !entry.pending_fired && !entry.id.is_empty() && !entry.name.is_empty() {
            entry.pending_fired = true;
            Some(ToolCall {
                id: entry.id.clone(),
                name: entry.name.clone(),
                arguments_json: String::new(),
            })
        } else {
            None
        }
    }

    pub fn finish(self) -> Vec<ToolCall> {
        self.fragments
            .into_values()
            .map(|f| ToolCall {
                id: f.id,
                name: f.name,
                arguments_json: f.arguments,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_marker_recognized() {
        assert!(matches!(parse_sse_line("data: [DONE]"), Some(SseEvent::Done)));
    }

    #[test]
    fn accumulates_fragments_by_index() {
        let mut acc = ToolCallAccumulator::default();
        acc.accumulate(0, Some("call_1"), Some("get_weather"), Some("{\"a\":"));
        acc.accumulate(0, None, None, Some("1}"));
        let calls = acc.finish();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "get_weather");
        assert_eq!(calls[0].arguments_json, "{\"a\":1}");
    }

    #[test]
    fn pending_fires_exactly_once_per_call_index() {
        let mut acc = ToolCallAccumulator::default();
        assert!(acc.accumulate(0, Some("call_1"), None, Some("ignored")).is_none());
        let pending = acc.accumulate(0, None, Some("get_weather"), Some("{}"));
        assert_eq!(pending.unwrap().name, "get_weather");
        // A later chunk for the same index (more argument fragments) must
        // not fire a second pending notification.
        assert!(acc.accumulate(0, None, None, Some("more")).is_none());
    }
}
