//! Wraps a positive-answer cache and a blocklist (adcache), each an independent
//! `KeyedMap`, and enforces the domain/IP validation and normalization rules that sit
//! in front of them.

use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::cache::keyed_map::{KeyedMap, PutOutcome, Record};
use crate::control::blocklist_manifest::BlocklistManifest;
use crate::control::local_overrides::LocalOverrides;

#[derive(Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Conflict,
}

pub struct CacheLayer {
    pub positive: KeyedMap,
    pub blocklist: KeyedMap,
    blocklist_domains: AtomicU32,
}

impl CacheLayer {
    pub fn new() -> CacheLayer {
        CacheLayer {
            positive: KeyedMap::new(),
            blocklist: KeyedMap::new(),
            blocklist_domains: AtomicU32::new(0),
        }
    }

    pub fn blocklist_domains(&self) -> u32 {
        self.blocklist_domains.load(Ordering::Acquire)
    }

    /// 1–253 chars total; labels of 1–63 chars in `[A-Za-z0-9-]`, none starting or
    /// ending with `-`; final character of the whole name not `-`.
    pub fn is_valid_domain(domain: &str) -> bool {
        if domain.is_empty() || domain.len() > 253 {
            return false;
        }
        if domain.ends_with('-') {
            return false;
        }

        for label in domain.split('.') {
            if label.is_empty() || label.len() > 63 {
                return false;
            }
            if label.starts_with('-') || label.ends_with('-') {
                return false;
            }
            if !label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-')
            {
                return false;
            }
        }

        true
    }

    pub fn is_valid_ipv4(ip: &str) -> bool {
        Ipv4Addr::from_str(ip).is_ok()
    }

    /// Strips a leading `http://`/`https://` scheme, truncates at the first `/`,
    /// strips one trailing `.`, and lowercases.
    pub fn normalize(input: &str) -> String {
        let without_scheme = input
            .strip_prefix("https://")
            .or_else(|| input.strip_prefix("http://"))
            .unwrap_or(input);
        let up_to_path = without_scheme.split('/').next().unwrap_or("");
        let no_trailing_dot = up_to_path.strip_suffix('.').unwrap_or(up_to_path);
        no_trailing_dot.to_ascii_lowercase()
    }

    pub fn get_positive(&self, url: &str) -> Option<String> {
        self.positive.get(url).map(|r| r.ip)
    }

    pub fn get_block(&self, url: &str) -> Option<String> {
        self.blocklist.get(url).map(|r| r.ip)
    }

    pub fn contains_positive(&self, url: &str) -> bool {
        self.positive.contains(url)
    }

    pub fn contains_block(&self, url: &str) -> bool {
        self.blocklist.contains(url)
    }

    /// Rejects if `url` is already present; otherwise validates and inserts.
    pub fn add_positive(&self, url: &str, ip: &str, expires_at: u32) -> AddOutcome {
        if self.positive.contains(url) {
            return AddOutcome::Conflict;
        }
        if !Self::is_valid_domain(url) || !Self::is_valid_ipv4(ip) {
            return AddOutcome::Conflict;
        }
        match self.positive.put(Record::new(url, ip, expires_at)) {
            Ok(PutOutcome::Added) => AddOutcome::Added,
            _ => AddOutcome::Conflict,
        }
    }

    pub fn remove_positive(&self, url: &str) -> bool {
        self.positive.remove(url)
    }

    /// Inserts with `expires_at = 0`; increments `blocklistDomains` only for a
    /// genuinely new node (a re-add of an already-blocked domain is a no-op count-wise).
    pub fn add_block(&self, url: &str, ip: &str) -> AddOutcome {
        if !Self::is_valid_domain(url) || !Self::is_valid_ipv4(ip) {
            return AddOutcome::Conflict;
        }
        match self.blocklist.put(Record::new(url, ip, 0)) {
            Ok(PutOutcome::Added) => {
                self.blocklist_domains.fetch_add(1, Ordering::AcqRel);
                AddOutcome::Added
            }
            Ok(PutOutcome::Updated) => AddOutcome::Added,
            Err(_) => AddOutcome::Conflict,
        }
    }

    pub fn wipe_blocklist(&self) {
        self.blocklist.wipe();
        self.blocklist_domains.store(0, Ordering::Release);
    }

    /// Delegates to the positive cache's sweep; callers are expected to feed the
    /// result into `Counters::set_in_cache_count`.
    pub fn sweep(&self) -> usize {
        self.positive.sweep()
    }

    /// Local overrides do not affect `blocklistDomains` — they are not blocklist
    /// entries.
    pub fn reload_local_overrides(&self, overrides: &LocalOverrides) -> std::io::Result<()> {
        for entry in overrides.entries() {
            if !Self::is_valid_ipv4(&entry.ip) || !Self::is_valid_domain(&entry.domain) {
                continue;
            }
            let domain = Self::normalize(&entry.domain);
            self.positive.remove(&domain);
            let _ = self.positive.put(Record::new(domain, entry.ip.clone(), 0));
        }
        Ok(())
    }

    /// Iterates enabled blocklist files per the manifest, parsing `hosts(5)`-style
    /// lines: comments (`# ...`) skipped, one or two whitespace-separated tokens,
    /// a bare domain becomes `0.0.0.0 domain`, a swapped IP/domain order is repaired.
    pub fn load_blocklists(
        &self,
        manifest: &BlocklistManifest,
        listdata_dir: &std::path::Path,
    ) -> std::io::Result<()> {
        for entry in manifest.enabled_entries() {
            let path = listdata_dir.join(entry.file_name());
            let contents = match std::fs::read_to_string(&path) {
                Ok(c) => c,
                Err(_) => continue,
            };

            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                let mut tokens = line.split_whitespace();
                let first = match tokens.next() {
                    Some(t) => t,
                    None => continue,
                };
                let second = tokens.next();

                let (mut ip, mut domain) = match second {
                    Some(second) => (first.to_string(), second.to_string()),
                    None => ("0.0.0.0".to_string(), first.to_string()),
                };

                if Self::is_valid_ipv4(&domain) && Self::is_valid_domain(&ip) {
                    std::mem::swap(&mut ip, &mut domain);
                }

                let domain = Self::normalize(&domain);
                if !Self::is_valid_domain(&domain) || !Self::is_valid_ipv4(&ip) {
                    continue;
                }

                self.add_block(&domain, &ip);
            }
        }
        Ok(())
    }
}

impl Default for CacheLayer {
    fn default() -> Self {
        Self::new()
    }
}
