//! A thread-safe chained hash table mapping `url -> Record`, hashed with DJB2 and
//! resized by doubling whenever the load factor would exceed 0.75.
//!
//! This is hand-rolled rather than built on `std::collections::HashMap` or `dashmap`
//! because the resize/load-factor/chaining behavior is exactly what's under test here
//! (see `tests/keyed_map.rs`) — reaching for a ready-made map would hide the mechanism
//! this module exists to provide.

use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use derive_more::{Display, Error};
use parking_lot::Mutex;

const INITIAL_CAPACITY: usize = 16_384;
const MAX_LOAD_FACTOR: f64 = 0.75;
const RESIZE_FACTOR: usize = 2;

#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum MapError {
    #[display(fmt = "url must not be empty")]
    EmptyUrl,
}

pub type Result<T> = std::result::Result<T, MapError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    Added,
    Updated,
}

/// `(url, ip, expiresAt)` triple. `expires_at == 0` means "never expires".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub url: String,
    pub ip: String,
    pub expires_at: u32,
}

impl Record {
    pub fn new(url: impl Into<String>, ip: impl Into<String>, expires_at: u32) -> Record {
        Record {
            url: url.into(),
            ip: ip.into(),
            expires_at,
        }
    }

    fn is_expired(&self, now: u32) -> bool {
        self.expires_at != 0 && now > self.expires_at
    }

    fn has_valid_ip(&self) -> bool {
        Ipv4Addr::from_str(&self.ip).is_ok()
    }
}

struct Node {
    record: Record,
}

struct Inner {
    buckets: Vec<Vec<Node>>,
    size: usize,
}

impl Inner {
    fn with_capacity(capacity: usize) -> Inner {
        let mut buckets = Vec::with_capacity(capacity);
        buckets.resize_with(capacity, Vec::new);
        Inner { buckets, size: 0 }
    }

    fn capacity(&self) -> usize {
        self.buckets.len()
    }

    fn index_of(&self, url: &str) -> usize {
        djb2(url) % self.capacity()
    }

    fn load_factor_after_one_more(&self) -> f64 {
        (self.size + 1) as f64 / self.capacity() as f64
    }

    fn resize(&mut self) {
        let new_capacity = self.capacity() * RESIZE_FACTOR;
        let mut new_buckets: Vec<Vec<Node>> = Vec::with_capacity(new_capacity);
        new_buckets.resize_with(new_capacity, Vec::new);

        for bucket in self.buckets.drain(..) {
            for node in bucket {
                let idx = djb2(&node.record.url) % new_capacity;
                // Reinsert at the head of the target bucket, matching the chained
                // hash table's insertion order.
                new_buckets[idx].insert(0, node);
            }
        }

        self.buckets = new_buckets;
    }
}

/// `hash = 5381; hash = hash*33 + c` per byte, as specified.
fn djb2(s: &str) -> usize {
    let mut hash: u64 = 5381;
    for b in s.as_bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(*b as u64);
    }
    hash as usize
}

pub fn now_unix() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

pub struct KeyedMap {
    inner: Mutex<Inner>,
}

impl KeyedMap {
    pub fn new() -> KeyedMap {
        KeyedMap {
            inner: Mutex::new(Inner::with_capacity(INITIAL_CAPACITY)),
        }
    }

    /// Starts at `capacity` instead of `INITIAL_CAPACITY`. Exposed for tests that
    /// need to trigger a resize without inserting tens of thousands of records.
    pub fn with_capacity(capacity: usize) -> KeyedMap {
        KeyedMap {
            inner: Mutex::new(Inner::with_capacity(capacity.max(1))),
        }
    }

    /// Inserts or overwrites `record` by `record.url`. Resizes first if the insertion
    /// would push the load factor above 0.75 (a pure overwrite never resizes).
    pub fn put(&self, record: Record) -> Result<PutOutcome> {
        if record.url.is_empty() {
            return Err(MapError::EmptyUrl);
        }

        let mut inner = self.inner.lock();

        let idx = inner.index_of(&record.url);
        if let Some(node) = inner.buckets[idx]
            .iter_mut()
            .find(|n| n.record.url == record.url)
        {
            node.record.ip = record.ip;
            node.record.expires_at = record.expires_at;
            return Ok(PutOutcome::Updated);
        }

        if inner.load_factor_after_one_more() > MAX_LOAD_FACTOR {
            inner.resize();
        }

        let idx = inner.index_of(&record.url);
        inner.buckets[idx].insert(0, Node { record });
        inner.size += 1;

        Ok(PutOutcome::Added)
    }

    pub fn get(&self, url: &str) -> Option<Record> {
        let inner = self.inner.lock();
        let idx = inner.index_of(url);
        inner
            .buckets[idx]
            .iter()
            .find(|n| n.record.url == url)
            .map(|n| n.record.clone())
    }

    pub fn contains(&self, url: &str) -> bool {
        let inner = self.inner.lock();
        let idx = inner.index_of(url);
        inner.buckets[idx].iter().any(|n| n.record.url == url)
    }

    pub fn remove(&self, url: &str) -> bool {
        let mut inner = self.inner.lock();
        let idx = inner.index_of(url);
        let bucket = &mut inner.buckets[idx];
        if let Some(pos) = bucket.iter().position(|n| n.record.url == url) {
            bucket.remove(pos);
            inner.size -= 1;
            true
        } else {
            false
        }
    }

    pub fn size(&self) -> usize {
        self.inner.lock().size
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Removes entries with a syntactically invalid IP or an expired, non-zero TTL.
    /// Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = now_unix();
        let mut inner = self.inner.lock();
        let mut removed = 0;
        for bucket in inner.buckets.iter_mut() {
            let before = bucket.len();
            bucket.retain(|n| n.record.has_valid_ip() && !n.record.is_expired(now));
            removed += before - bucket.len();
        }
        inner.size -= removed;
        removed
    }

    /// Removes all entries; capacity is unchanged.
    pub fn wipe(&self) {
        let mut inner = self.inner.lock();
        for bucket in inner.buckets.iter_mut() {
            bucket.clear();
        }
        inner.size = 0;
    }
}

impl Default for KeyedMap {
    fn default() -> Self {
        Self::new()
    }
}
