//! `gsh.tools.viewFile` (spec.md §4.9): line-numbered file rendering with
//! an optional `[start, end]` window and middle-truncation once the
//! rendered text would exceed the output cap.

use crate::value::{ObjectValue, Value};
use std::fs;

pub fn view_file(path: &str, window: Option<(usize, usize)>, output_cap_bytes: usize) -> Value {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            let mut obj = ObjectValue::new();
            obj.set_plain("error", Value::string(format!("failed to read `{path}`: {e}")));
            return Value::object(obj);
        }
    };

    let lines: Vec<&str> = contents.lines().collect();
    let (start, end) = window.unwrap_or((1, lines.len()));
    let start = start.max(1);
    let end = end.min(lines.len());

    let mut rendered = String::new();
    if start <= end {
        for (offset, line) in lines[start - 1..end].iter().enumerate() {
            rendered.push_str(&format!("{:>6}\t{}\n", start + offset, line));
        }
    }

    let truncated = rendered.len() > output_cap_bytes;
    if truncated {
        rendered = middle_truncate(&rendered, output_cap_bytes);
    }

    let mut obj = ObjectValue::new();
    obj.set_plain("content", Value::string(rendered));
    obj.set_plain("totalLines", Value::Number(lines.len() as f64));
    if truncated {
        obj.set_plain("truncated", Value::Bool(true));
    }
    Value::object(obj)
}

fn middle_truncate(text: &str, cap: usize) -> String {
    if text.len() <= cap {
        return text.to_string();
    }
    let marker = "\n... [truncated] ...\n";
    let remaining = cap.saturating_sub(marker.len());
    let half = remaining / 2;
    let head = take_chars_within(text, half);
    let tail = take_chars_within_from_end(text, remaining - head.len());
    format!("{head}{marker}{tail}")
}

fn take_chars_within(text: &str, byte_budget: usize) -> String {
    let mut out = String::new();
    for c in text.chars() {
        if out.len() + c.len_utf8() > byte_budget {
            break;
        }
        out.push(c);
    }
    out
}

fn take_chars_within_from_end(text: &str, byte_budget: usize) -> String {
    let mut out: Vec<char> = Vec::new();
    let mut used = 0;
    for c in text.chars().rev() {
        if used + c.len_utf8() > byte_budget {
            break;
        }
        used += c.len_utf8();
        out.push(c);
    }
    out.reverse();
    out.into_iter().collect()
}
