use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::collector::SampleCollector;
use crate::config::{JobConfig, JobDescriptor, JobOptions};
use crate::driver::{self, DriverContext};
use crate::error::{Error, ErrorLog};
use crate::pool::{ChannelPool, CloseReason, Connection, Connector};
use crate::progress;
use crate::scenario::Workload;
use crate::signal::{Signal, StopGate};
use crate::stats::{self, LatencySummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum JobState {
    #[default]
    Initialized,
    Running,
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobResult {
    pub state: JobState,

    /// Newline-joined error lines; empty when the job ran cleanly.
    pub error: String,

    /// Measured run duration, from the first driver launch to the stop.
    pub elapsed: Option<Duration>,

    pub requests: u64,
    pub requests_per_sec: Option<f64>,
    pub latency: Option<LatencySummary>,

    pub connection_requests: Vec<u64>,
    pub connection_requests_min: u64,
    pub connection_requests_max: u64,
}

impl JobResult {
    pub fn has_errors(&self) -> bool {
        !self.error.is_empty()
    }
}

struct ActiveRun {
    collector: Arc<SampleCollector>,
    started: Instant,
}

/// One benchmark job: opens the channel pool, drives it for the configured duration and
/// publishes the run statistics exactly once.
///
/// `start` and `stop` may be called from different tasks; share the job behind an `Arc`.
pub struct Job<K: Connector> {
    connector: Arc<K>,
    options: JobOptions,

    record: Arc<Mutex<JobResult>>,
    errors: Arc<ErrorLog>,

    started: AtomicBool,
    gate: StopGate,
    stop: Arc<Signal>,
    published: Signal,

    run: OnceLock<ActiveRun>,
    pool: Mutex<Option<ChannelPool<K::Channel>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<K: Connector> Job<K> {
    pub fn new(connector: K, options: JobOptions) -> Self {
        Self {
            connector: Arc::new(connector),
            options,
            record: Arc::new(Mutex::new(JobResult::default())),
            errors: Arc::new(ErrorLog::default()),
            started: AtomicBool::new(false),
            gate: StopGate::new(),
            stop: Arc::new(Signal::new()),
            published: Signal::new(),
            run: OnceLock::new(),
            pool: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> JobState {
        lock(&self.record).state
    }

    /// Runs the job to completion: until `duration` elapses or [`Job::stop`] is called.
    ///
    /// Configuration and connection failures do not surface as `Err`; they end the job in
    /// `Completed` with the failure in [`JobResult::error`].
    pub async fn start(&self, descriptor: &JobDescriptor) -> JobResult {
        if self.started.swap(true, Ordering::AcqRel) {
            tracing::warn!("job already started; ignoring second start");
            return self.result();
        }

        if self.gate.is_closed() {
            tracing::info!("job stopped before start");
            return self.result();
        }

        let cfg = match JobConfig::from_descriptor(descriptor) {
            Ok(cfg) => cfg,
            Err(err) => return self.abandon(err),
        };

        tracing::info!(
            target = %cfg.target,
            connections = cfg.connections,
            scenario = %cfg.scenario,
            latency = %cfg.latency_mode,
            duration = ?cfg.duration,
            "starting job"
        );

        let pool = match ChannelPool::open(&self.connector, &cfg.target, cfg.connections).await {
            Ok(pool) => pool,
            Err(err) => return self.abandon(err),
        };

        let conns = pool.connections().to_vec();
        let collector = Arc::new(SampleCollector::new(cfg.latency_mode, conns.len()));
        let workload = Arc::new(Workload::new(&cfg, &self.options));
        *lock(&self.pool) = Some(pool);

        let started = Instant::now();
        let _ = self.run.set(ActiveRun {
            collector: collector.clone(),
            started,
        });

        {
            let mut record = lock(&self.record);
            if record.state == JobState::Initialized {
                record.state = JobState::Running;
            }
        }

        // A stop that raced with initialization has already published; don't launch anything.
        if !self.gate.is_closed() {
            self.launch(&conns, &workload, &collector, started);

            tokio::select! {
                _ = tokio::time::sleep(cfg.duration) => {
                    tracing::debug!("job duration elapsed");
                }
                _ = self.stop.wait() => {
                    tracing::debug!("job stop requested");
                }
            }

            self.finish();
        }

        self.published.wait().await;
        self.result()
    }

    /// Stops the job. Idempotent: only the first call (or the duration deadline, whichever
    /// comes first) publishes statistics.
    pub async fn stop(&self) {
        self.stop.fire();
        if self.finish() {
            tracing::info!("job stopped");
        }
    }

    /// Tears the job down: stops it, closes every connection, waits for the drivers and
    /// then for the grace delay.
    pub async fn release(&self) {
        self.stop().await;

        let pool = lock(&self.pool).take();
        if let Some(pool) = pool {
            pool.close_all().await;
        }

        let tasks = std::mem::take(&mut *lock(&self.tasks));
        let aborts: Vec<_> = tasks.iter().map(JoinHandle::abort_handle).collect();
        let joined = async {
            for task in tasks {
                let _ = task.await;
            }
        };

        // In-flight requests finish within the request timeout; a disabled timeout still gets
        // a bounded wait.
        let patience = self.options.request_timeout.max(Duration::from_secs(1));
        if tokio::time::timeout(patience, joined)
            .await
            .is_err()
        {
            tracing::warn!("drivers did not finish in time; aborting");
            for abort in aborts {
                abort.abort();
            }
        }

        if !self.options.grace.is_zero() {
            tokio::time::sleep(self.options.grace).await;
        }

        tracing::debug!("job released");
    }

    /// Snapshot of the current result.
    pub fn result(&self) -> JobResult {
        let mut result = lock(&self.record).clone();
        result.error = self.errors.joined();
        result
    }

    fn launch(
        &self,
        conns: &[Arc<Connection<K::Channel>>],
        workload: &Arc<Workload>,
        collector: &Arc<SampleCollector>,
        started: Instant,
    ) {
        let mut tasks = lock(&self.tasks);

        for conn in conns {
            if let Some(closed) = conn.take_close_signal() {
                tasks.push(tokio::spawn(watch_close(
                    conn.index(),
                    closed,
                    self.record.clone(),
                    self.errors.clone(),
                )));
            }
        }

        for conn in conns {
            tasks.push(tokio::spawn(driver::run_connection(DriverContext {
                conn: conn.clone(),
                workload: workload.clone(),
                collector: collector.clone(),
                stop: self.stop.clone(),
                errors: self.errors.clone(),
            })));
        }

        if let Some(progress) = &self.options.progress {
            tasks.push(progress::spawn_ticker(
                collector.clone(),
                self.stop.clone(),
                started,
                self.options.progress_interval,
                progress.clone(),
            ));
        }
    }

    /// Initialization failed: complete without running anything.
    fn abandon(&self, err: Error) -> JobResult {
        tracing::error!(error = %err, "job failed to start");
        self.errors.push(err.to_string());

        if self.gate.try_enter() {
            self.stop.fire();
            lock(&self.record).state = JobState::Completed;
            self.published.fire();
        }

        self.result()
    }

    /// The stop sequence. Runs at most once over the job's lifetime; returns whether this
    /// caller ran it.
    fn finish(&self) -> bool {
        if !self.gate.try_enter() {
            return false;
        }
        self.stop.fire();

        match self.run.get() {
            Some(run) => {
                let elapsed = run.started.elapsed();
                let report = stats::summarize(run.collector.freeze(), elapsed);

                if let Some(failure) = report.failure {
                    tracing::warn!(error = %failure, "run produced no statistics");
                    self.errors.push(failure.to_string());
                }

                tracing::info!(
                    requests = report.requests,
                    requests_per_sec = report.requests_per_sec.unwrap_or(0.0),
                    elapsed = ?elapsed,
                    "job completed"
                );
                tracing::debug!(
                    min = report.connection_requests_min,
                    max = report.connection_requests_max,
                    "requests per connection"
                );

                let mut record = lock(&self.record);
                record.requests = report.requests;
                record.requests_per_sec = report.requests_per_sec;
                record.latency = report.latency;
                record.connection_requests = report.connection_requests;
                record.connection_requests_min = report.connection_requests_min;
                record.connection_requests_max = report.connection_requests_max;
                record.state = JobState::Completed;
                record.elapsed = Some(elapsed);
            }
            None => {
                lock(&self.record).state = JobState::Completed;
            }
        }

        self.published.fire();
        true
    }
}

impl<K: Connector> Drop for Job<K> {
    fn drop(&mut self) {
        // Drivers loop until the stop signal; never leave them running unowned.
        self.stop.fire();
        for task in lock(&self.tasks).drain(..) {
            task.abort();
        }
    }
}

async fn watch_close(
    index: usize,
    closed: oneshot::Receiver<CloseReason>,
    record: Arc<Mutex<JobResult>>,
    errors: Arc<ErrorLog>,
) {
    let Ok(reason) = closed.await else {
        return;
    };

    // Held across the append so the check can't interleave with the stop sequence.
    let record = lock(&record);
    if record.state == JobState::Running && reason != CloseReason::Shutdown {
        tracing::warn!(connection = index, %reason, "connection closed unexpectedly");
        errors.push(format!("connection {index} closed unexpectedly: {reason}"));
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
