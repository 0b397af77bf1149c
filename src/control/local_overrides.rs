//! CRUD over `localDNS.txt`: administrator-entered `<ip> <domain> [<name>]`
//! overrides that take precedence over both the positive cache and the
//! blocklist.
//!
//! Reloading overrides never touches the blocklist counter: local overrides are
//! not blocklist entries, even though they both live inside the positive cache.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use derive_more::{Display, Error, From};

#[derive(Debug, Display, From, Error)]
pub enum OverrideError {
    Io(std::io::Error),
}

pub type Result<T> = std::result::Result<T, OverrideError>;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LocalEntry {
    pub ip: String,
    pub domain: String,
    pub name: String,
}

/// The parsed, in-memory contents of `localDNS.txt`.
pub struct LocalOverrides {
    path: PathBuf,
    entries: Vec<LocalEntry>,
}

impl LocalOverrides {
    pub fn load(path: impl AsRef<Path>) -> Result<LocalOverrides> {
        let path = path.as_ref().to_path_buf();
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let entries = contents
            .lines()
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                let ip = parts.next()?.to_string();
                let domain = parts.next()?.to_string();
                let name = parts.next().unwrap_or("").to_string();
                Some(LocalEntry { ip, domain, name })
            })
            .collect();

        Ok(LocalOverrides { path, entries })
    }

    pub fn entries(&self) -> &[LocalEntry] {
        &self.entries
    }

    pub fn find(&self, domain: &str) -> Option<&LocalEntry> {
        self.entries.iter().find(|e| e.domain == domain)
    }

    /// Appends a validated entry and persists the file. Caller is expected to have
    /// already checked `ip`/`domain` validity (via `CacheLayer`); this just guards
    /// against an empty domain or IP reaching the file.
    pub fn add(&mut self, ip: &str, domain: &str, name: &str) -> Result<()> {
        if ip.is_empty() || domain.is_empty() {
            return Ok(());
        }
        self.entries.retain(|e| e.domain != domain);
        self.entries.push(LocalEntry {
            ip: ip.to_string(),
            domain: domain.to_string(),
            name: name.to_string(),
        });
        self.persist()
    }

    /// Removes every entry for `domain`. Returns whether anything was removed.
    pub fn remove(&mut self, domain: &str) -> Result<bool> {
        let before = self.entries.len();
        self.entries.retain(|e| e.domain != domain);
        let removed = self.entries.len() != before;
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    fn persist(&self) -> Result<()> {
        let mut out = String::new();
        for e in &self.entries {
            out.push_str(&e.ip);
            out.push(' ');
            out.push_str(&e.domain);
            out.push(' ');
            out.push_str(&e.name);
            out.push('\n');
        }
        crate::config::write_atomically(&self.path, out.as_bytes())
            .map_err(|e| OverrideError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn add_then_find_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("localDNS.txt");
        let mut overrides = LocalOverrides::load(&path).unwrap();
        overrides.add("10.0.0.5", "printer.lan", "office printer").unwrap();

        let reloaded = LocalOverrides::load(&path).unwrap();
        let entry = reloaded.find("printer.lan").unwrap();
        assert_eq!(entry.ip, "10.0.0.5");
        assert_eq!(entry.name, "office printer");
    }

    #[test]
    fn remove_drops_the_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("localDNS.txt");
        let mut overrides = LocalOverrides::load(&path).unwrap();
        overrides.add("10.0.0.5", "printer.lan", "").unwrap();
        assert!(overrides.remove("printer.lan").unwrap());
        assert!(overrides.find("printer.lan").is_none());
    }

    #[test]
    fn add_replaces_existing_domain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("localDNS.txt");
        let mut overrides = LocalOverrides::load(&path).unwrap();
        overrides.add("10.0.0.5", "printer.lan", "old").unwrap();
        overrides.add("10.0.0.6", "printer.lan", "new").unwrap();
        assert_eq!(overrides.entries().len(), 1);
        assert_eq!(overrides.find("printer.lan").unwrap().ip, "10.0.0.6");
    }
}
