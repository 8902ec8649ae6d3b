//! LRU-bounded compiled-pattern cache plus the `Regexp.*` built-ins
//! (spec.md §4.7), grounded on `vtcode-core/src/skills/context_manager.rs`'s
//! `lru::LruCache` usage for its own compiled-artifact cache.

use crate::eval::InterpError;
use lru::LruCache;
use regex::Regex;
use std::cell::RefCell;
use std::num::NonZeroUsize;

pub struct RegexCache {
    cache: RefCell<LruCache<String, Regex>>,
}

impl RegexCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            cache: RefCell::new(LruCache::new(capacity)),
        }
    }

    /// Compiles `pattern` on a cache miss and inserts it; a compile failure
    /// is never cached (spec.md §4.7 edge case: "invalid patterns are never
    /// inserted into the cache").
    pub fn get(&self, pattern: &str) -> Result<Regex, InterpError> {
        if let Some(re) = self.cache.borrow_mut().get(pattern) {
            return Ok(re.clone());
        }
        let re = Regex::new(pattern)
            .map_err(|e| InterpError::domain(format!("invalid regex `{pattern}`: {e}")))?;
        self.cache.borrow_mut().put(pattern.to_string(), re.clone());
        Ok(re)
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }
}

pub fn test(cache: &RegexCache, text: &str, pattern: &str) -> Result<bool, InterpError> {
    Ok(cache.get(pattern)?.is_match(text))
}

/// `Regexp.match(s, pat)`: the whole match followed by each capture group,
/// `None` entries for groups that didn't participate (spec.md §4.7/§4.10).
/// `None` overall (not `Some(vec![])`) when the pattern doesn't match at
/// all.
pub fn find_match(
    cache: &RegexCache,
    text: &str,
    pattern: &str,
) -> Result<Option<Vec<Option<String>>>, InterpError> {
    let re = cache.get(pattern)?;
    Ok(re.captures(text).map(|caps| {
        caps.iter()
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect()
    }))
}

pub fn find_all(
    cache: &RegexCache,
    text: &str,
    pattern: &str,
    limit: Option<usize>,
) -> Result<Vec<String>, InterpError> {
    let re = cache.get(pattern)?;
    let iter = re.find_iter(text).map(|m| m.as_str().to_string());
    Ok(match limit {
        Some(n) => iter.take(n).collect(),
        None => iter.collect(),
    })
}

pub fn replace(cache: &RegexCache, text: &str, pattern: &str, replacement: &str) -> Result<String, InterpError> {
    Ok(cache.get(pattern)?.replace(text, replacement).into_owned())
}

pub fn replace_all(cache: &RegexCache, text: &str, pattern: &str, replacement: &str) -> Result<String, InterpError> {
    Ok(cache.get(pattern)?.replace_all(text, replacement).into_owned())
}

pub fn split(
    cache: &RegexCache,
    text: &str,
    pattern: &str,
    limit: Option<usize>,
) -> Result<Vec<String>, InterpError> {
    let re = cache.get(pattern)?;
    Ok(match limit {
        Some(n) if n > 0 => re.splitn(text, n).map(|s| s.to_string()).collect(),
        _ => re.split(text).map(|s| s.to_string()).collect(),
    })
}

pub fn escape(text: &str) -> String {
    regex::escape(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_pattern_is_not_cached() {
        let cache = RegexCache::new(4);
        assert!(cache.get("(unterminated").is_err());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn evicts_strict_lru_order() {
        let cache = RegexCache::new(2);
        cache.get("a").unwrap();
        cache.get("b").unwrap();
        cache.get("a").unwrap(); // touch `a`, making `b` the LRU entry
        cache.get("c").unwrap(); // evicts `b`
        assert_eq!(cache.len(), 2);
    }
}
