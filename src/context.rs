//! Process-wide shared state, constructed once at startup and handed by `Arc` to
//! the receiver, worker pool, sweeper, and control plane: one struct owning every
//! piece of runtime state a thread might need, rather than passing a dozen
//! separate arguments around.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use derive_more::{Display, Error, From};
use parking_lot::Mutex;
use sysinfo::SystemExt;

use crate::cache::layer::CacheLayer;
use crate::config::{Config, ConfigError};
use crate::control::blocklist_manifest::{BlocklistManifest, ManifestError};
use crate::control::local_overrides::{LocalOverrides, OverrideError};
use crate::counters::Counters;
use crate::queue::WorkQueue;
use crate::stats::StatsWindows;

#[derive(Debug, Display, From, Error)]
pub enum ContextError {
    Config(ConfigError),
    Manifest(ManifestError),
    Overrides(OverrideError),
    Io(std::io::Error),
}

pub type Result<T> = std::result::Result<T, ContextError>;

/// On-disk layout under the configured data directory: a `metadata/` directory for
/// the flat config/manifest files and a `listdata/` directory for blocklist bodies.
pub struct Paths {
    pub data_file: PathBuf,
    pub lists_file: PathBuf,
    pub local_dns_file: PathBuf,
    pub listdata_dir: PathBuf,
}

impl Paths {
    pub fn new(data_dir: impl AsRef<Path>) -> Paths {
        let root = data_dir.as_ref();
        Paths {
            data_file: root.join("metadata/data.txt"),
            lists_file: root.join("metadata/lists.txt"),
            local_dns_file: root.join("metadata/localDNS.txt"),
            listdata_dir: root.join("listdata"),
        }
    }
}

pub struct AppContext {
    pub paths: Paths,
    pub cache: CacheLayer,
    pub queue: Arc<WorkQueue>,
    pub counters: Counters,
    pub stats: StatsWindows,
    pub config: Mutex<Config>,
    pub manifest: Mutex<BlocklistManifest>,
    pub overrides: Mutex<LocalOverrides>,
    pub upstream: Mutex<Ipv4Addr>,
    pub ad_cache_enabled: AtomicBool,
    pub threads: AtomicUsize,
    pub dns_port: u16,
    pub api_port: u16,
    pub shutting_down: AtomicBool,
}

impl AppContext {
    pub fn new(data_dir: impl AsRef<Path>, dns_port: u16, api_port: u16) -> Result<Arc<AppContext>> {
        let paths = Paths::new(data_dir.as_ref());
        std::fs::create_dir_all(&paths.listdata_dir)?;
        if let Some(parent) = paths.data_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let config = Config::load(&paths.data_file)?;
        let manifest = BlocklistManifest::load(&paths.lists_file)?;
        let overrides = LocalOverrides::load(&paths.local_dns_file)?;

        let upstream = config.upstream;
        let threads = config
            .threads
            .unwrap_or_else(default_thread_count);

        let mut cache = CacheLayer::new();
        cache.reload_local_overrides(&overrides)?;
        cache.load_blocklists(&manifest, &paths.listdata_dir)?;

        Ok(Arc::new(AppContext {
            paths,
            cache,
            queue: WorkQueue::new(),
            counters: Counters::new(),
            stats: StatsWindows::new(),
            config: Mutex::new(config),
            manifest: Mutex::new(manifest),
            overrides: Mutex::new(overrides),
            upstream: Mutex::new(upstream),
            ad_cache_enabled: AtomicBool::new(true),
            threads: AtomicUsize::new(threads),
            dns_port,
            api_port,
            shutting_down: AtomicBool::new(false),
        }))
    }

    pub fn upstream(&self) -> Ipv4Addr {
        *self.upstream.lock()
    }

    pub fn ad_cache_enabled(&self) -> bool {
        self.ad_cache_enabled.load(Ordering::Acquire)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    pub fn request_shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
    }
}

fn default_thread_count() -> usize {
    let mut system = sysinfo::System::new();
    system.refresh_cpu();
    system.physical_core_count().unwrap_or(1).max(1)
}

pub fn parse_ipv4(s: &str) -> Option<Ipv4Addr> {
    Ipv4Addr::from_str(s).ok()
}
