//! The worker pool: dequeues a request, tries the positive cache, then the
//! blocklist, then forwards to the configured upstream, caching any A records in
//! the reply. Each worker is its own thread, dequeuing independently from the
//! shared work queue.

use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread::{self, Builder};
use std::time::Instant;

use crate::context::AppContext;
use crate::dns::protocol::{Packet, QueryType, Record};
use crate::queue::RequestDescriptor;
use crate::synth::Synthesizer;

const UPSTREAM_RECV_BUF: usize = 4096;
const UPSTREAM_PORT: u16 = 53;

pub struct WorkerPool {
    context: Arc<AppContext>,
}

impl WorkerPool {
    pub fn new(context: Arc<AppContext>) -> WorkerPool {
        WorkerPool { context }
    }

    /// Spawns `count` worker threads, each with its own clone of `socket` (used
    /// to send replies back to clients) and independently dequeuing from the
    /// shared `WorkQueue`.
    pub fn spawn(
        &self,
        count: usize,
        socket: &UdpSocket,
    ) -> std::io::Result<Vec<thread::JoinHandle<()>>> {
        let mut handles = Vec::with_capacity(count.max(1));
        for id in 0..count.max(1) {
            let context = self.context.clone();
            let socket = socket.try_clone()?;
            let handle = Builder::new()
                .name(format!("worker-{}", id))
                .spawn(move || worker_loop(context, socket))?;
            handles.push(handle);
        }
        Ok(handles)
    }
}

fn worker_loop(context: Arc<AppContext>, socket: UdpSocket) {
    loop {
        if context.is_shutting_down() {
            return;
        }

        let request = context.queue.dequeue();
        context.counters.incr_processed();
        handle_request(&context, &socket, request);
    }
}

fn handle_request(context: &AppContext, socket: &UdpSocket, request: RequestDescriptor) {
    let start = Instant::now();

    let query = match Packet::from_bytes(&request.bytes) {
        Ok(q) => q,
        Err(e) => {
            log::warn!("dropping malformed query from {}: {}", request.client_addr, e);
            return;
        }
    };

    let Some(question) = query.questions.first() else {
        log::warn!("dropping query with no question section from {}", request.client_addr);
        return;
    };
    if !matches!(question.qtype, QueryType::A) {
        forward_upstream(context, socket, &request.client_addr, &query, &request.bytes);
        return;
    }

    let domain = question.name.clone();

    let cache_lookup_start = Instant::now();
    let positive_hit = context.cache.get_positive(&domain);
    context
        .stats
        .cache_lookup_latency
        .add(cache_lookup_start.elapsed().as_secs_f64());

    if let Some(ip) = positive_hit {
        context.counters.incr_cache_hits();
        reply_synthesized(context, socket, &request.client_addr, &query, &ip, start);
        return;
    }

    if context.ad_cache_enabled() {
        if let Some(ip) = context.cache.get_block(&domain) {
            context.counters.incr_blocked();
            reply_synthesized(context, socket, &request.client_addr, &query, &ip, start);
            return;
        }
    }

    forward_upstream(context, socket, &request.client_addr, &query, &request.bytes);
    context
        .stats
        .uncached_response_latency
        .add(start.elapsed().as_secs_f64());
}

fn reply_synthesized(
    context: &AppContext,
    socket: &UdpSocket,
    client_addr: &SocketAddr,
    query: &Packet,
    ip: &str,
    start: Instant,
) {
    let reply = match Synthesizer::synthesize(query, ip).and_then(|p| Synthesizer::serialize(&p)) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("failed to synthesize reply for {}: {}", client_addr, e);
            return;
        }
    };

    if let Err(e) = socket.send_to(&reply, client_addr) {
        log::warn!("failed to send synthesized reply to {}: {}", client_addr, e);
        return;
    }

    context
        .stats
        .cached_response_latency
        .add(start.elapsed().as_secs_f64());
}

fn forward_upstream(
    context: &AppContext,
    socket: &UdpSocket,
    client_addr: &SocketAddr,
    query: &Packet,
    raw: &[u8],
) {
    let upstream_socket = match UdpSocket::bind(("0.0.0.0", 0)) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("failed to create upstream socket: {}", e);
            return;
        }
    };

    let upstream = context.upstream();
    if let Err(e) = upstream_socket.send_to(raw, (upstream, UPSTREAM_PORT)) {
        log::warn!("failed to forward query to upstream {}: {}", upstream, e);
        return;
    }

    let mut buf = [0u8; UPSTREAM_RECV_BUF];
    let len = match upstream_socket.recv(&mut buf) {
        Ok(n) => n,
        Err(e) => {
            log::warn!("failed to receive reply from upstream {}: {}", upstream, e);
            return;
        }
    };
    let reply_bytes = &buf[..len];

    if let Err(e) = socket.send_to(reply_bytes, client_addr) {
        log::warn!("failed to forward upstream reply to {}: {}", client_addr, e);
        return;
    }

    if let Ok(reply) = Packet::from_bytes(reply_bytes) {
        cache_a_records(context, query, &reply);
    }
}

fn cache_a_records(context: &AppContext, query: &Packet, reply: &Packet) {
    let Some(question) = query.questions.first() else {
        return;
    };
    let now = crate::cache::keyed_map::now_unix();

    for answer in &reply.answers {
        if let Record::A { addr, ttl, .. } = answer {
            let expires_at = now.saturating_add(*ttl);
            context
                .cache
                .add_positive(&question.name, &addr.to_string(), expires_at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::protocol::{Question, QueryType};
    use std::net::Ipv4Addr;

    fn test_context() -> Arc<AppContext> {
        let dir = tempfile::tempdir().unwrap();
        let context = AppContext::new(dir.path(), 0, 0).unwrap();
        // AppContext only reads paths under `dir` during construction above;
        // nothing in these tests touches disk afterward, so dropping the
        // tempdir here is fine.
        drop(dir);
        context
    }

    fn query_for(domain: &str) -> Packet {
        let mut packet = Packet::new();
        packet
            .questions
            .push(Question::new(domain.to_string(), QueryType::A));
        packet
    }

    #[test]
    fn caches_a_records_from_an_upstream_reply_with_ttl_derived_expiry() {
        let context = test_context();
        let query = query_for("test.example");

        let mut reply = Packet::new();
        reply.answers.push(Record::A {
            domain: "test.example".to_string(),
            addr: Ipv4Addr::new(1, 2, 3, 4),
            ttl: 300,
        });

        let before = crate::cache::keyed_map::now_unix();
        cache_a_records(&context, &query, &reply);
        let after = crate::cache::keyed_map::now_unix();

        let cached = context.cache.positive.get("test.example").unwrap();
        assert_eq!(cached.ip, "1.2.3.4");
        assert!(cached.expires_at >= before + 300 && cached.expires_at <= after + 300);
    }

    #[test]
    fn non_a_answers_are_not_cached() {
        let context = test_context();
        let query = query_for("test.example");

        let mut reply = Packet::new();
        reply.answers.push(Record::Other {
            domain: "test.example".to_string(),
            qtype: 16,
            ttl: 300,
            data: vec![1, 2, 3],
        });

        cache_a_records(&context, &query, &reply);
        assert!(context.cache.positive.get("test.example").is_none());
    }

    #[test]
    fn a_second_upstream_answer_does_not_refresh_an_existing_entry() {
        let context = test_context();
        context
            .cache
            .add_positive("test.example", "9.9.9.9", 0);
        let query = query_for("test.example");

        let mut reply = Packet::new();
        reply.answers.push(Record::A {
            domain: "test.example".to_string(),
            addr: Ipv4Addr::new(1, 2, 3, 4),
            ttl: 300,
        });

        cache_a_records(&context, &query, &reply);

        // add_positive is insert-if-absent: the existing answer wins until it expires.
        assert_eq!(
            context.cache.positive.get("test.example").unwrap().ip,
            "9.9.9.9"
        );
    }
}

