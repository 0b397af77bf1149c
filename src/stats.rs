//! Fixed-window rolling average, used for three named latency series:
//! `cache_lookup_latency`, `uncached_response_latency`, `cached_response_latency`.
//!
//! A circular buffer of doubles with a running sum, one mutex per series, logging
//! each sample at `trace` level through the `log` crate so a busy forwarder doesn't
//! flood its own logs.

use parking_lot::Mutex;

pub const DEFAULT_WINDOW_SIZE: usize = 500;

struct Inner {
    values: Vec<f64>,
    capacity: usize,
    index: usize,
    count: usize,
    sum: f64,
}

impl Inner {
    fn add(&mut self, value: f64) {
        if self.count < self.capacity {
            self.values.push(value);
            self.sum += value;
            self.count += 1;
        } else {
            self.sum -= self.values[self.index];
            self.sum += value;
            self.values[self.index] = value;
        }
        self.index = (self.index + 1) % self.capacity;
    }

    fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

pub struct StatsWindow {
    name: &'static str,
    inner: Mutex<Inner>,
}

impl StatsWindow {
    pub fn new(name: &'static str, capacity: usize) -> StatsWindow {
        StatsWindow {
            name,
            inner: Mutex::new(Inner {
                values: Vec::with_capacity(capacity),
                capacity: capacity.max(1),
                index: 0,
                count: 0,
                sum: 0.0,
            }),
        }
    }

    pub fn add(&self, value: f64) {
        let mut inner = self.inner.lock();
        inner.add(value);
        log::trace!("{} sample: {:.6}s", self.name, value);
    }

    pub fn average(&self) -> f64 {
        self.inner.lock().average()
    }

    pub fn count(&self) -> usize {
        self.inner.lock().count
    }
}

/// The three named latency series, all created with the default 500-sample window.
pub struct StatsWindows {
    pub cache_lookup_latency: StatsWindow,
    pub uncached_response_latency: StatsWindow,
    pub cached_response_latency: StatsWindow,
}

impl StatsWindows {
    pub fn new() -> StatsWindows {
        StatsWindows {
            cache_lookup_latency: StatsWindow::new("cache_lookup_latency", DEFAULT_WINDOW_SIZE),
            uncached_response_latency: StatsWindow::new(
                "uncached_response_latency",
                DEFAULT_WINDOW_SIZE,
            ),
            cached_response_latency: StatsWindow::new(
                "cached_response_latency",
                DEFAULT_WINDOW_SIZE,
            ),
        }
    }
}

impl Default for StatsWindows {
    fn default() -> Self {
        Self::new()
    }
}
