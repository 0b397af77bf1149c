//! Periodic maintenance thread: sweeps expired cache entries, keeps the
//! in-cache counter in sync, rotates the admin log file, and logs the current
//! counters. Wakes on a `Condvar::wait_for` timeout so a future shutdown signal
//! can wake it early instead of it sleeping through the whole interval.

use std::sync::Arc;
use std::thread::{self, Builder};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::context::AppContext;

const SWEEP_INTERVAL: Duration = Duration::from_secs(5);
const LOG_ROTATE_LINES: usize = 500;

pub struct Sweeper {
    context: Arc<AppContext>,
}

impl Sweeper {
    pub fn new(context: Arc<AppContext>) -> Sweeper {
        Sweeper { context }
    }

    pub fn spawn(self) -> std::io::Result<thread::JoinHandle<()>> {
        Builder::new().name("sweeper".into()).spawn(move || {
            let gate = Mutex::new(());
            let condvar = Condvar::new();

            loop {
                let mut guard = gate.lock();
                condvar.wait_for(&mut guard, SWEEP_INTERVAL);
                drop(guard);

                if self.context.is_shutting_down() {
                    return;
                }

                self.run_once();
            }
        })
    }

    fn run_once(&self) {
        let swept = self.context.cache.sweep();
        if swept > 0 {
            log::info!("swept {} expired cache entries", swept);
        }
        self.context
            .counters
            .set_in_cache_count(self.context.cache.positive.size() as u32);

        if let Err(e) = self.rotate_log_if_needed() {
            log::warn!("failed to rotate admin log: {}", e);
        }

        let snapshot = self.context.counters.snapshot(self.context.queue.depth());
        log::info!(
            "processed={} blocked={} cache_hits={} in_cache={} queue_depth={}",
            snapshot.processed,
            snapshot.blocked,
            snapshot.cache_hits,
            snapshot.in_cache,
            snapshot.queue_depth
        );
    }

    fn rotate_log_if_needed(&self) -> std::io::Result<()> {
        let log_path = self.context.paths.data_file.with_file_name("server.log");
        let contents = match std::fs::read_to_string(&log_path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        let line_count = contents.lines().count();
        if line_count <= LOG_ROTATE_LINES {
            return Ok(());
        }

        let tail: String = contents
            .lines()
            .skip(line_count - LOG_ROTATE_LINES)
            .collect::<Vec<_>>()
            .join("\n");
        crate::config::write_atomically(&log_path, tail.as_bytes())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}
