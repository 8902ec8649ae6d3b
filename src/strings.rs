//! String built-ins (spec.md §4.7), indexed by Unicode scalar value (code
//! point), not UTF-8 byte offset — the chars-vec-then-index pattern mirrors
//! how `vtcode-core`'s diff/context-window slicing avoids splitting
//! multi-byte characters.

use crate::eval::InterpError;

fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

pub fn to_upper_case(s: &str) -> String {
    s.to_uppercase()
}

pub fn to_lower_case(s: &str) -> String {
    s.to_lowercase()
}

pub fn split(s: &str, sep: &str) -> Vec<String> {
    if sep.is_empty() {
        chars(s).into_iter().map(|c| c.to_string()).collect()
    } else {
        s.split(sep).map(str::to_string).collect()
    }
}

pub fn trim(s: &str) -> String {
    s.trim().to_string()
}

pub fn trim_start(s: &str) -> String {
    s.trim_start().to_string()
}

pub fn trim_end(s: &str) -> String {
    s.trim_end().to_string()
}

pub fn index_of(s: &str, needle: &str) -> i64 {
    let cs = chars(s);
    let ns = chars(needle);
    if ns.is_empty() {
        return 0;
    }
    if ns.len() > cs.len() {
        return -1;
    }
    for i in 0..=(cs.len() - ns.len()) {
        if cs[i..i + ns.len()] == ns[..] {
            return i as i64;
        }
    }
    -1
}

pub fn last_index_of(s: &str, needle: &str) -> i64 {
    let cs = chars(s);
    let ns = chars(needle);
    if ns.is_empty() {
        return cs.len() as i64;
    }
    if ns.len() > cs.len() {
        return -1;
    }
    for i in (0..=(cs.len() - ns.len())).rev() {
        if cs[i..i + ns.len()] == ns[..] {
            return i as i64;
        }
    }
    -1
}

/// `substring(start, end)`: clamped to `[0, len]`; a reversed range swaps
/// rather than producing an empty string, so `substring(a, b) ==
/// substring(b, a)` always (spec.md §4.7/§8).
pub fn substring(s: &str, start: i64, end: Option<i64>) -> Result<String, InterpError> {
    let cs = chars(s);
    let len = cs.len() as i64;
    let start = start.clamp(0, len) as usize;
    let end = end.unwrap_or(len).clamp(0, len) as usize;
    let (start, end) = if start > end { (end, start) } else { (start, end) };
    Ok(cs[start..end].iter().collect())
}

/// Like `substring` but negative indices count from the end (spec.md §4.7
/// distinguishes `slice` from `substring` on this point).
pub fn slice(s: &str, start: i64, end: Option<i64>) -> Result<String, InterpError> {
    let cs = chars(s);
    let len = cs.len() as i64;
    let normalize = |i: i64| -> i64 {
        if i < 0 {
            (len + i).max(0)
        } else {
            i.min(len)
        }
    };
    let start = normalize(start) as usize;
    let end = normalize(end.unwrap_or(len)) as usize;
    if start > end {
        return Ok(String::new());
    }
    Ok(cs[start..end].iter().collect())
}

pub fn starts_with(s: &str, prefix: &str) -> bool {
    s.starts_with(prefix)
}

pub fn ends_with(s: &str, suffix: &str) -> bool {
    s.ends_with(suffix)
}

pub fn includes(s: &str, needle: &str) -> bool {
    s.contains(needle)
}

pub fn replace(s: &str, from: &str, to: &str) -> String {
    s.replacen(from, to, 1)
}

pub fn replace_all(s: &str, from: &str, to: &str) -> String {
    s.replace(from, to)
}

pub fn repeat(s: &str, count: i64) -> Result<String, InterpError> {
    if count < 0 {
        return Err(InterpError::domain("repeat count must be non-negative"));
    }
    Ok(s.repeat(count as usize))
}

pub fn pad_start(s: &str, target_len: i64, pad: &str) -> String {
    pad_to(s, target_len, pad, true)
}

pub fn pad_end(s: &str, target_len: i64, pad: &str) -> String {
    pad_to(s, target_len, pad, false)
}

fn pad_to(s: &str, target_len: i64, pad: &str, at_start: bool) -> String {
    let cs = chars(s);
    let target_len = target_len.max(0) as usize;
    if cs.len() >= target_len || pad.is_empty() {
        return s.to_string();
    }
    let pad_chars = chars(pad);
    let needed = target_len - cs.len();
    let mut filler: Vec<char> = Vec::with_capacity(needed);
    while filler.len() < needed {
        filler.extend(pad_chars.iter().take(needed - filler.len()));
    }
    if at_start {
        filler.into_iter().chain(cs).collect()
    } else {
        cs.into_iter().chain(filler).collect()
    }
}

pub fn char_at(s: &str, index: i64) -> Result<String, InterpError> {
    if index < 0 {
        return Ok(String::new());
    }
    Ok(chars(s)
        .get(index as usize)
        .map(|c| c.to_string())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_handles_negative_indices() {
        assert_eq!(slice("hello", -3, None).unwrap(), "llo");
    }

    #[test]
    fn substring_clamps_out_of_range() {
        assert_eq!(substring("hi", -5, Some(50)).unwrap(), "hi");
    }

    #[test]
    fn substring_swaps_a_reversed_range() {
        let s = "hello world";
        assert_eq!(
            substring(s, 7, Some(2)).unwrap(),
            substring(s, 2, Some(7)).unwrap()
        );
    }

    #[test]
    fn index_of_is_code_point_indexed() {
        assert_eq!(index_of("a\u{1F600}b", "b"), 2);
    }

    #[test]
    fn pad_start_repeats_pad_string_to_fit() {
        assert_eq!(pad_start("7", 4, "0"), "0007");
    }
}
