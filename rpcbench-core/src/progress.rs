use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::collector::SampleCollector;
use crate::signal::Signal;
use crate::stats;

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub tick: u64,
    pub elapsed: Duration,
    pub interval: Duration,

    /// Total requests completed so far.
    pub requests_total: u64,

    /// Requests/sec observed during the last progress interval.
    pub requests_per_sec: f64,

    /// Least and most requests completed by a single connection; a wide gap points at
    /// starved or stalled connections.
    pub connection_requests_min: u64,
    pub connection_requests_max: u64,
}

pub type ProgressFn = Arc<dyn Fn(ProgressUpdate) + Send + Sync + 'static>;

pub(crate) fn spawn_ticker(
    collector: Arc<SampleCollector>,
    stop: Arc<Signal>,
    started: Instant,
    every: Duration,
    progress: ProgressFn,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // The first tick is immediate; the first report should cover a full interval.
        interval.tick().await;

        let mut tick: u64 = 0;
        let mut last_at = started;
        let mut prev_total: u64 = 0;

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = stop.wait() => break,
            }

            let now = Instant::now();
            let dt = now.duration_since(last_at);
            last_at = now;

            let counts = collector.connection_requests();
            let requests_total: u64 = counts.iter().sum();
            let requests_per_sec =
                stats::requests_per_sec(requests_total, prev_total, dt.as_secs_f64() * 1000.0)
                    .unwrap_or(0.0);
            prev_total = requests_total;
            tick = tick.saturating_add(1);

            (progress)(ProgressUpdate {
                tick,
                elapsed: now.duration_since(started),
                interval: dt,
                requests_total,
                requests_per_sec,
                connection_requests_min: counts.iter().copied().min().unwrap_or(0),
                connection_requests_max: counts.iter().copied().max().unwrap_or(0),
            });
        }
    })
}
