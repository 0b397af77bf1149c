//! Persisted admin configuration: `data.txt` holds credentials, thread count, and
//! upstream IP on fixed line numbers. Writes go through a temp-file-then-rename so a
//! crash mid-write never leaves `data.txt` truncated.

use std::fs;
use std::io::Write;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use derive_more::{Display, Error, From};

#[derive(Debug, Display, From, Error)]
pub enum ConfigError {
    Io(std::io::Error),
    #[display(fmt = "data.txt is malformed: {}", _0)]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub salt_hex: String,
    pub hash_hex: String,
}

/// In-memory view of `data.txt`'s three lines: `<user> <salt> <hash>`,
/// `THREADS <n>`, `UPSTREAM <ip>`.
#[derive(Debug, Clone)]
pub struct Config {
    pub path: PathBuf,
    pub credentials: Option<Credentials>,
    pub threads: Option<usize>,
    pub upstream: Ipv4Addr,
}

const DEFAULT_UPSTREAM: &str = "1.1.1.1";

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref().to_path_buf();
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let mut lines = contents.lines();

        let credentials = lines.next().and_then(|line| {
            let mut parts = line.split_whitespace();
            let username = parts.next()?.to_string();
            let salt_hex = parts.next()?.to_string();
            let hash_hex = parts.next()?.to_string();
            Some(Credentials {
                username,
                salt_hex,
                hash_hex,
            })
        });

        let threads = lines
            .next()
            .and_then(|line| line.strip_prefix("THREADS "))
            .and_then(|n| n.trim().parse::<usize>().ok());

        let upstream = lines
            .next()
            .and_then(|line| line.strip_prefix("UPSTREAM "))
            .and_then(|ip| Ipv4Addr::from_str(ip.trim()).ok())
            .unwrap_or_else(|| Ipv4Addr::from_str(DEFAULT_UPSTREAM).unwrap());

        Ok(Config {
            path,
            credentials,
            threads,
            upstream,
        })
    }

    pub fn save(&self) -> Result<()> {
        let mut out = String::new();
        match &self.credentials {
            Some(c) => out.push_str(&format!("{} {} {}\n", c.username, c.salt_hex, c.hash_hex)),
            None => out.push('\n'),
        }
        out.push_str(&format!(
            "THREADS {}\n",
            self.threads.map(|t| t.to_string()).unwrap_or_default()
        ));
        out.push_str(&format!("UPSTREAM {}\n", self.upstream));

        write_atomically(&self.path, out.as_bytes())
    }

    pub fn set_upstream(&mut self, upstream: Ipv4Addr) -> Result<()> {
        self.upstream = upstream;
        self.save()
    }

    pub fn set_threads(&mut self, threads: usize) -> Result<()> {
        self.threads = Some(threads);
        self.save()
    }

    pub fn set_credentials(&mut self, credentials: Credentials) -> Result<()> {
        self.credentials = Some(credentials);
        self.save()
    }
}

/// Writes `contents` to a sibling temp file and renames it over `path`, so a crash
/// or concurrent reader never observes a partially written file.
pub fn write_atomically(path: impl AsRef<Path>, contents: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let tmp_path = dir.join(format!(
        ".{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("data")
    ));

    {
        let mut tmp = fs::File::create(&tmp_path)?;
        tmp.write_all(contents)?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}
