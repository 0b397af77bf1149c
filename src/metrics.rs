//! Prometheus metrics for the core counters and latency series, exposed by the
//! control plane's `GET /metrics`.
//!
//! One gauge per counter and one gauge per latency average. The `register_*!`
//! macros register each series into the process-wide default registry, and
//! `render` gathers straight from it with `prometheus::gather()`.

use lazy_static::lazy_static;
use prometheus::{register_int_gauge, Encoder, IntGauge, TextEncoder};

lazy_static! {
    pub static ref PROCESSED_QUERIES: IntGauge = register_int_gauge!(
        "shieldns_processed_queries_total",
        "Total DNS queries dequeued by a worker"
    )
    .unwrap();
    pub static ref BLOCKED_QUERIES: IntGauge = register_int_gauge!(
        "shieldns_blocked_queries_total",
        "Total queries answered from the blocklist"
    )
    .unwrap();
    pub static ref CACHE_HITS: IntGauge = register_int_gauge!(
        "shieldns_cache_hits_total",
        "Total queries answered from the positive cache"
    )
    .unwrap();
    pub static ref IN_CACHE_COUNT: IntGauge = register_int_gauge!(
        "shieldns_in_cache_entries",
        "Current number of entries in the positive cache"
    )
    .unwrap();
    pub static ref BLOCKLIST_DOMAINS: IntGauge = register_int_gauge!(
        "shieldns_blocklist_domains",
        "Current number of domains in the blocklist"
    )
    .unwrap();
    pub static ref QUEUE_DEPTH: IntGauge = register_int_gauge!(
        "shieldns_queue_depth",
        "Current number of requests waiting in the work queue"
    )
    .unwrap();
}

/// Pulls the current values out of `context` into the gauges above, then
/// renders the default registry in Prometheus text exposition format.
pub fn render(context: &crate::context::AppContext) -> String {
    let snapshot = context.counters.snapshot(context.queue.depth());
    PROCESSED_QUERIES.set(snapshot.processed as i64);
    BLOCKED_QUERIES.set(snapshot.blocked as i64);
    CACHE_HITS.set(snapshot.cache_hits as i64);
    IN_CACHE_COUNT.set(snapshot.in_cache as i64);
    BLOCKLIST_DOMAINS.set(context.cache.blocklist_domains() as i64);
    QUEUE_DEPTH.set(snapshot.queue_depth as i64);

    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    encoder.encode(&families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap_or_default()
}
