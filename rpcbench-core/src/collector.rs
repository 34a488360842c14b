use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::config::LatencyMode;

/// Latency accumulated for one connection.
#[derive(Debug, Clone, PartialEq)]
pub enum LatencySamples {
    /// Every sample, in arrival order.
    Detailed(Vec<f64>),
    /// Running sum and count; memory stays constant however long the run is.
    Aggregate { sum: f64, count: u64 },
}

impl LatencySamples {
    fn empty(mode: LatencyMode) -> Self {
        match mode {
            LatencyMode::Detailed => Self::Detailed(Vec::new()),
            LatencyMode::Aggregate => Self::Aggregate { sum: 0.0, count: 0 },
        }
    }

    fn add(&mut self, latency_ms: f64) {
        match self {
            Self::Detailed(samples) => samples.push(latency_ms),
            Self::Aggregate { sum, count } => {
                *sum += latency_ms;
                *count += 1;
            }
        }
    }

    pub fn count(&self) -> u64 {
        match self {
            Self::Detailed(samples) => samples.len() as u64,
            Self::Aggregate { count, .. } => *count,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrozenEntry {
    pub requests: u64,
    pub latency: LatencySamples,
}

/// Collector contents at the moment of the freeze.
#[derive(Debug, Clone)]
pub struct FrozenSamples {
    pub mode: LatencyMode,
    pub entries: Vec<FrozenEntry>,
}

#[derive(Debug)]
struct Entry {
    requests: AtomicU64,
    latency: Mutex<LatencySamples>,
}

/// Per-connection request counters and latency samples.
///
/// Each entry has a single writer (its connection's driver), so the entry mutex is
/// uncontended; the counter is atomic so progress reporting can read it while the run
/// is in flight.
#[derive(Debug)]
pub struct SampleCollector {
    mode: LatencyMode,
    frozen: AtomicBool,
    entries: Box<[Entry]>,
}

impl SampleCollector {
    pub fn new(mode: LatencyMode, connections: usize) -> Self {
        let entries = (0..connections)
            .map(|_| Entry {
                requests: AtomicU64::new(0),
                latency: Mutex::new(LatencySamples::empty(mode)),
            })
            .collect();

        Self {
            mode,
            frozen: AtomicBool::new(false),
            entries,
        }
    }

    pub fn mode(&self) -> LatencyMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Records one completed request. Returns `false` (and records nothing) once frozen.
    pub fn record(&self, connection: usize, latency_ms: f64) -> bool {
        let Some(entry) = self.entries.get(connection) else {
            return false;
        };

        let mut latency = entry
            .latency
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Checked under the entry lock: `freeze` takes the same lock after raising the flag,
        // so a write is either fully in the snapshot or rejected.
        if self.frozen.load(Ordering::Acquire) {
            return false;
        }

        latency.add(latency_ms);
        entry.requests.fetch_add(1, Ordering::Relaxed);
        true
    }

    pub fn requests(&self, connection: usize) -> u64 {
        self.entries
            .get(connection)
            .map_or(0, |e| e.requests.load(Ordering::Relaxed))
    }

    pub fn requests_total(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| e.requests.load(Ordering::Relaxed))
            .sum()
    }

    pub fn connection_requests(&self) -> Vec<u64> {
        self.entries
            .iter()
            .map(|e| e.requests.load(Ordering::Relaxed))
            .collect()
    }

    /// Closes the collector to writers and moves the accumulated samples out.
    ///
    /// Entries are read once: a second call yields empty latency data.
    pub fn freeze(&self) -> FrozenSamples {
        self.frozen.store(true, Ordering::Release);

        let entries = self
            .entries
            .iter()
            .map(|e| {
                let mut latency = e
                    .latency
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                FrozenEntry {
                    requests: e.requests.load(Ordering::Relaxed),
                    latency: std::mem::replace(&mut *latency, LatencySamples::empty(self.mode)),
                }
            })
            .collect();

        FrozenSamples {
            mode: self.mode,
            entries,
        }
    }
}
