//! LRU Line Store Tests.

use pipesim_core::common::LineAddr;
use pipesim_core::core::units::cache::LruCache;
use proptest::prelude::*;

#[test]
fn two_line_cache_evicts_least_recent() {
    let mut cache: LruCache<()> = LruCache::new(2, 2);
    for addr in [0, 2, 4] {
        let line = cache.line_of(addr);
        let _ = cache.put(line, ());
    }
    assert!(!cache.touch(cache.line_of(0)), "address 0 was evicted");

    assert!(cache.touch(cache.line_of(4)));
    let evicted = cache.put(cache.line_of(6), ());
    assert_eq!(evicted, Some((LineAddr(2), ())));
    assert!(cache.contains(cache.line_of(4)));
    assert!(cache.contains(cache.line_of(6)));
    assert!(!cache.contains(cache.line_of(2)));
}

#[test]
fn get_refreshes_recency() {
    let mut cache = LruCache::new(2, 4);
    let _ = cache.put(LineAddr(0), 'a');
    let _ = cache.put(LineAddr(4), 'b');
    assert_eq!(cache.get(LineAddr(0)), Some(&'a'));
    assert_eq!(cache.put(LineAddr(8), 'c'), Some((LineAddr(4), 'b')));
}

#[test]
fn peek_does_not_refresh_recency() {
    let mut cache = LruCache::new(2, 4);
    let _ = cache.put(LineAddr(0), 'a');
    let _ = cache.put(LineAddr(4), 'b');
    assert_eq!(cache.peek(LineAddr(0)), Some(&'a'));
    assert_eq!(cache.put(LineAddr(8), 'c'), Some((LineAddr(0), 'a')));
}

proptest! {
    /// Against a reference recency list: same residency, same victims.
    #[test]
    fn matches_reference_model(
        capacity in 1usize..5,
        ops in proptest::collection::vec((any::<bool>(), 0u32..8), 1..60),
    ) {
        let mut cache = LruCache::new(capacity, 4);
        let mut model: Vec<LineAddr> = Vec::new();

        for (insert, n) in ops {
            let line = LineAddr(n * 4);
            if insert {
                let victim = cache.put(line, n).map(|(l, _)| l);
                let expected = if let Some(pos) = model.iter().position(|l| *l == line) {
                    let _ = model.remove(pos);
                    None
                } else if model.len() == capacity {
                    model.pop()
                } else {
                    None
                };
                model.insert(0, line);
                prop_assert_eq!(victim, expected);
            } else {
                let hit = cache.touch(line);
                prop_assert_eq!(hit, model.contains(&line));
                if let Some(pos) = model.iter().position(|l| *l == line) {
                    let l = model.remove(pos);
                    model.insert(0, l);
                }
            }
            prop_assert!(cache.len() <= capacity);
        }
    }
}
