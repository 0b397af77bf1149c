//! Process-wide atomic counters, one owned struct instead of file-scope globals.
//! `blocklistDomains` isn't duplicated here: `CacheLayer` is the only component that
//! mutates it, so it stays the single source of truth (`CacheLayer::blocklist_domains`)
//! instead of drifting out of sync with a copy.

use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Default)]
pub struct Counters {
    processed_queries: AtomicU32,
    blocked_queries: AtomicU32,
    cache_hits: AtomicU32,
    in_cache_count: AtomicU32,
}

impl Counters {
    pub fn new() -> Counters {
        Counters::default()
    }

    pub fn incr_processed(&self) {
        self.processed_queries.fetch_add(1, Ordering::AcqRel);
    }

    pub fn incr_blocked(&self) {
        self.blocked_queries.fetch_add(1, Ordering::AcqRel);
    }

    pub fn incr_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::AcqRel);
    }

    pub fn set_in_cache_count(&self, value: u32) {
        self.in_cache_count.store(value, Ordering::Release);
    }

    pub fn processed_queries(&self) -> u32 {
        self.processed_queries.load(Ordering::Acquire)
    }

    pub fn blocked_queries(&self) -> u32 {
        self.blocked_queries.load(Ordering::Acquire)
    }

    pub fn cache_hits(&self) -> u32 {
        self.cache_hits.load(Ordering::Acquire)
    }

    pub fn in_cache_count(&self) -> u32 {
        self.in_cache_count.load(Ordering::Acquire)
    }

    pub fn snapshot(&self, queue_depth: u32) -> CounterSnapshot {
        CounterSnapshot {
            processed: self.processed_queries(),
            blocked: self.blocked_queries(),
            cache_hits: self.cache_hits(),
            in_cache: self.in_cache_count(),
            queue_depth,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CounterSnapshot {
    pub processed: u32,
    pub blocked: u32,
    pub cache_hits: u32,
    pub in_cache: u32,
    pub queue_depth: u32,
}
