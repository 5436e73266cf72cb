//! Shared outer level.
//!
//! Sits between the private L1 data caches and main memory. It provides:
//! 1. **Fill Latency:** A line fill costs the shared-cache latency on a hit and the
//!    memory latency otherwise.
//! 2. **Tag Tracking:** The optional shared cache tracks which lines it holds; line
//!    data always lives in main memory, which every write-back updates.

use crate::common::addr::LineAddr;
use crate::config::Config;
use crate::core::units::cache::LruCache;

/// Optional shared cache in front of memory.
#[derive(Debug)]
pub struct SharedLevel {
    /// Present only when the shared cache is enabled.
    tags: Option<LruCache<()>>,
    /// Shared cache hit latency in cycles.
    hit_latency: u64,
    /// Main memory latency in cycles.
    memory_latency: u64,
}

impl SharedLevel {
    /// Builds the shared level from `config.cache.shared` and `config.memory`.
    pub fn new(config: &Config) -> Self {
        let shared = &config.cache.shared;
        Self {
            tags: shared
                .enabled
                .then(|| LruCache::new(shared.lines, shared.line_bytes)),
            hit_latency: shared.latency,
            memory_latency: config.memory.latency,
        }
    }

    /// Main memory latency in cycles.
    pub const fn memory_latency(&self) -> u64 {
        self.memory_latency
    }

    /// Cycles needed to bring `line` into a private cache.
    ///
    /// Misses install the line in the shared cache.
    pub fn fill(&mut self, line: LineAddr) -> u64 {
        let Some(tags) = self.tags.as_mut() else {
            return self.memory_latency;
        };
        if tags.touch(line) {
            return self.hit_latency;
        }
        let _ = tags.put(line, ());
        self.memory_latency
    }

    /// Records a line written back from a private cache.
    pub fn write_back(&mut self, line: LineAddr) {
        if let Some(tags) = self.tags.as_mut() {
            let _ = tags.put(line, ());
        }
    }

    /// Whether the shared cache currently holds `line`.
    pub fn holds(&self, line: LineAddr) -> bool {
        self.tags.as_ref().is_some_and(|t| t.contains(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Variant;

    #[test]
    fn second_fill_hits_shared_cache() {
        let config = Config::for_variant(Variant::Cached);
        let mut shared = SharedLevel::new(&config);
        let line = LineAddr(0x100);
        assert_eq!(shared.fill(line), config.memory.latency);
        assert_eq!(shared.fill(line), config.cache.shared.latency);
    }

    #[test]
    fn disabled_shared_cache_always_costs_memory() {
        let config = Config::default();
        let mut shared = SharedLevel::new(&config);
        shared.write_back(LineAddr(0));
        assert!(!shared.holds(LineAddr(0)));
        assert_eq!(shared.fill(LineAddr(0)), config.memory.latency);
    }
}
