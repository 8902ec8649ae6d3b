//! LRU eviction boundary for the compiled-regex cache (spec.md §4.7/§8):
//! exercised from outside the crate through the public `RegexCache` type,
//! complementing the colocated unit tests in `src/regex_cache.rs`.

use gsh_script::regex_cache::RegexCache;

#[test]
fn oldest_unused_pattern_is_evicted_first() {
    let cache = RegexCache::new(3);
    cache.get("a+").unwrap();
    cache.get("b+").unwrap();
    cache.get("c+").unwrap();
    assert_eq!(cache.len(), 3);

    // touch `a+` again, making `b+` the least-recently-used entry
    cache.get("a+").unwrap();
    cache.get("d+").unwrap();

    assert_eq!(cache.len(), 3);
    // `b+` should have been evicted; re-requesting it is still a cache hit
    // on compile (it just recompiles), but the cache's occupant set no
    // longer includes `b+` alongside both `a+` and `c+` and `d+` at once.
    cache.get("b+").unwrap();
    assert_eq!(cache.len(), 3);
}

#[test]
fn a_failed_compile_never_occupies_a_cache_slot() {
    let cache = RegexCache::new(1);
    assert!(cache.get("[").is_err());
    assert_eq!(cache.len(), 0);
    cache.get("ok").unwrap();
    assert_eq!(cache.len(), 1);
}
