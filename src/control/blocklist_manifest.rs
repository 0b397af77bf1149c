//! CRUD over `lists.txt`: the manifest of blocklist source URLs and their
//! enabled/disabled state, each backed by a downloaded file under `listdata/`.
//!
//! Enable/disable set the literal requested state unconditionally, rather than
//! toggling relative to whatever the entry's current state happens to be.

use std::fs;
use std::path::{Path, PathBuf};

use derive_more::{Display, Error, From};

#[derive(Debug, Display, From, Error)]
pub enum ManifestError {
    Io(std::io::Error),
}

pub type Result<T> = std::result::Result<T, ManifestError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum AdlistStatus {
    Enabled,
    Disabled,
}

impl AdlistStatus {
    fn as_str(self) -> &'static str {
        match self {
            AdlistStatus::Enabled => "enabled",
            AdlistStatus::Disabled => "disabled",
        }
    }

    fn parse(s: &str) -> Option<AdlistStatus> {
        match s {
            "enabled" => Some(AdlistStatus::Enabled),
            "disabled" => Some(AdlistStatus::Disabled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AdlistEntry {
    pub url: String,
    pub status: AdlistStatus,
}

impl AdlistEntry {
    /// The basename this list is downloaded to under `listdata/`, derived from
    /// the URL's last path segment.
    pub fn file_name(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }
}

pub struct BlocklistManifest {
    path: PathBuf,
    entries: Vec<AdlistEntry>,
}

impl BlocklistManifest {
    pub fn load(path: impl AsRef<Path>) -> Result<BlocklistManifest> {
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
                let url = parts.next()?.to_string();
                let status = AdlistStatus::parse(parts.next()?)?;
                Some(AdlistEntry { url, status })
            })
            .collect();

        Ok(BlocklistManifest { path, entries })
    }

    pub fn entries(&self) -> &[AdlistEntry] {
        &self.entries
    }

    pub fn enabled_entries(&self) -> impl Iterator<Item = &AdlistEntry> {
        self.entries
            .iter()
            .filter(|e| e.status == AdlistStatus::Enabled)
    }

    pub fn status_of(&self, url: &str) -> Option<AdlistStatus> {
        self.entries.iter().find(|e| e.url == url).map(|e| e.status)
    }

    /// Appends a new source, enabled by default, matching `addAdlistFile`.
    pub fn add(&mut self, url: &str) -> Result<()> {
        self.entries.retain(|e| e.url != url);
        self.entries.push(AdlistEntry {
            url: url.to_string(),
            status: AdlistStatus::Enabled,
        });
        self.persist()
    }

    /// Removes a source from the manifest. Returns whether it was present.
    pub fn remove(&mut self, url: &str) -> Result<bool> {
        let before = self.entries.len();
        self.entries.retain(|e| e.url != url);
        let removed = self.entries.len() != before;
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Sets `url`'s status to exactly `status`, regardless of its current value.
    pub fn set_status(&mut self, url: &str, status: AdlistStatus) -> Result<bool> {
        let Some(entry) = self.entries.iter_mut().find(|e| e.url == url) else {
            return Ok(false);
        };
        entry.status = status;
        self.persist()?;
        Ok(true)
    }

    fn persist(&self) -> Result<()> {
        let mut out = String::new();
        for e in &self.entries {
            out.push_str(&e.url);
            out.push(' ');
            out.push_str(e.status.as_str());
            out.push('\n');
        }
        crate::config::write_atomically(&self.path, out.as_bytes())
            .map_err(|e| ManifestError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
    }
}
