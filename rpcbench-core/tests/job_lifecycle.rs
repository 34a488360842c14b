mod support;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rpcbench_core::{Job, JobOptions, JobResult, JobState, MAX_CONNECTIONS, ProgressUpdate};
use support::{Failure, ScriptedConnector, unary_descriptor, with_latency};

fn quiet_options() -> JobOptions {
    JobOptions {
        grace: Duration::ZERO,
        ..JobOptions::default()
    }
}

fn spawn_start(
    job: &Arc<Job<ScriptedConnector>>,
    desc: rpcbench_core::JobDescriptor,
) -> tokio::task::JoinHandle<JobResult> {
    let job = job.clone();
    tokio::spawn(async move { job.start(&desc).await })
}

#[tokio::test(start_paused = true)]
async fn failing_connection_does_not_stop_the_others() {
    let connector = ScriptedConnector::with_delay(Duration::from_millis(1)).failing(
        2,
        10,
        Failure::Status,
    );
    let job = Job::new(connector, quiet_options());

    let res = job
        .start(&unary_descriptor(4, Duration::from_secs(1)))
        .await;

    assert_eq!(res.state, JobState::Completed);
    assert!(
        res.error.contains("connection 2"),
        "unexpected error text: {}",
        res.error
    );
    assert_eq!(res.connection_requests.len(), 4);
    assert_eq!(res.connection_requests[2], 10);
    for (i, n) in res.connection_requests.iter().enumerate() {
        if i != 2 {
            assert!(*n > 10, "connection {i} completed only {n} requests");
        }
    }
    assert_eq!(res.requests, res.connection_requests.iter().sum::<u64>());
    assert_eq!(res.connection_requests_min, 10);
    assert!(res.requests_per_sec.is_some_and(|rps| rps > 0.0));

    job.release().await;
}

#[tokio::test(start_paused = true)]
async fn stop_publishes_once_when_called_twice() {
    let job = Arc::new(Job::new(
        ScriptedConnector::with_delay(Duration::from_millis(5)),
        quiet_options(),
    ));
    let run = spawn_start(&job, unary_descriptor(2, Duration::from_secs(60)));

    tokio::time::sleep(Duration::from_millis(200)).await;
    job.stop().await;
    let first = job.result();

    tokio::time::sleep(Duration::from_millis(200)).await;
    job.stop().await;
    let second = job.result();

    assert_eq!(first.state, JobState::Completed);
    assert_eq!(first, second);
    assert!(first.requests > 0);
    assert!(first.error.is_empty(), "unexpected error: {}", first.error);

    let from_start = run
        .await
        .unwrap_or_else(|e| panic!("start task panicked: {e}"));
    assert_eq!(from_start, first);

    job.release().await;
}

#[tokio::test(start_paused = true)]
async fn concurrent_stops_publish_once() {
    let job = Arc::new(Job::new(
        ScriptedConnector::with_delay(Duration::from_millis(5)),
        quiet_options(),
    ));
    let run = spawn_start(&job, unary_descriptor(3, Duration::from_secs(60)));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (a, b) = (job.clone(), job.clone());
    let stops = [
        tokio::spawn(async move { a.stop().await }),
        tokio::spawn(async move { b.stop().await }),
    ];
    for stop in stops {
        stop.await
            .unwrap_or_else(|e| panic!("stop task panicked: {e}"));
    }

    let res = run
        .await
        .unwrap_or_else(|e| panic!("start task panicked: {e}"));
    assert_eq!(res.state, JobState::Completed);
    assert_eq!(res, job.result());

    job.release().await;
}

#[tokio::test(start_paused = true)]
async fn stop_at_the_deadline_publishes_once() {
    let duration = Duration::from_millis(500);
    let job = Arc::new(Job::new(
        ScriptedConnector::with_delay(Duration::from_millis(5)),
        quiet_options(),
    ));
    let run = spawn_start(&job, unary_descriptor(2, duration));

    // Connections open without delay, so this stop lands on the same tick as the deadline.
    tokio::time::sleep(duration).await;
    job.stop().await;
    let after_stop = job.result();

    let res = run
        .await
        .unwrap_or_else(|e| panic!("start task panicked: {e}"));
    assert_eq!(res.state, JobState::Completed);
    assert_eq!(res, after_stop);
    assert!(res.error.is_empty(), "unexpected error: {}", res.error);

    let elapsed = res
        .elapsed
        .unwrap_or_else(|| panic!("elapsed should be recorded"));
    assert!(elapsed >= duration && elapsed < duration + Duration::from_millis(5));

    let rps = res
        .requests_per_sec
        .unwrap_or_else(|| panic!("requests_per_sec should be published"));
    let expected = res.requests as f64 / elapsed.as_secs_f64();
    assert!((rps - expected).abs() < 1e-6, "rps={rps} expected={expected}");

    job.stop().await;
    job.release().await;
    assert_eq!(job.result().requests_per_sec, res.requests_per_sec);
    assert_eq!(job.result().requests, res.requests);
}

#[tokio::test(start_paused = true)]
async fn responses_after_stop_are_not_counted() {
    let job = Arc::new(Job::new(
        ScriptedConnector::with_delay(Duration::from_millis(100)),
        quiet_options(),
    ));
    let run = spawn_start(&job, with_latency(unary_descriptor(1, Duration::from_secs(60))));

    tokio::time::sleep(Duration::from_millis(250)).await;
    job.stop().await;

    // Let the in-flight third request land.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let res = run
        .await
        .unwrap_or_else(|e| panic!("start task panicked: {e}"));
    assert_eq!(res.requests, 2);
    assert_eq!(job.result().requests, 2);

    let elapsed = res
        .elapsed
        .unwrap_or_else(|| panic!("elapsed should be recorded"));
    assert!(elapsed >= Duration::from_millis(250) && elapsed < Duration::from_millis(300));

    job.release().await;
}

#[tokio::test(start_paused = true)]
async fn lost_connection_while_running_is_reported() {
    let connector =
        ScriptedConnector::with_delay(Duration::from_millis(1)).failing(0, 3, Failure::Lost);
    let job = Job::new(connector, quiet_options());

    let res = job
        .start(&unary_descriptor(2, Duration::from_millis(500)))
        .await;

    assert_eq!(res.state, JobState::Completed);
    assert!(
        res.error.contains("connection 0 closed unexpectedly"),
        "unexpected error text: {}",
        res.error
    );
    assert_eq!(res.connection_requests[0], 3);

    let lines: Vec<&str> = res
        .error
        .lines()
        .filter(|l| l.starts_with("connection 0"))
        .collect();
    assert_eq!(lines.len(), 1, "lost connection reported more than once: {lines:?}");

    job.release().await;
}

#[tokio::test(start_paused = true)]
async fn teardown_closes_do_not_count_as_errors() {
    let connector = ScriptedConnector::with_delay(Duration::from_millis(2));
    let closed = connector.closed.clone();
    let job = Job::new(connector, quiet_options());

    let res = job
        .start(&unary_descriptor(3, Duration::from_millis(100)))
        .await;
    job.release().await;

    assert_eq!(closed.load(Ordering::Relaxed), 3);
    assert!(res.error.is_empty(), "unexpected error: {}", res.error);
    assert!(job.result().error.is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_before_start_completes_without_connecting() {
    let connector = ScriptedConnector::default();
    let connects = connector.connects.clone();
    let job = Job::new(connector, quiet_options());

    job.stop().await;
    assert_eq!(job.state(), JobState::Completed);

    let res = job
        .start(&unary_descriptor(2, Duration::from_secs(1)))
        .await;
    assert_eq!(res.state, JobState::Completed);
    assert_eq!(res.requests, 0);
    assert_eq!(connects.load(Ordering::Relaxed), 0);
}

#[tokio::test(start_paused = true)]
async fn invalid_config_completes_with_error() {
    let job = Job::new(ScriptedConnector::default(), quiet_options());
    let res = job
        .start(&unary_descriptor(0, Duration::from_secs(1)))
        .await;
    assert_eq!(res.state, JobState::Completed);
    assert!(res.error.contains("connections"), "unexpected: {}", res.error);

    let job = Job::new(ScriptedConnector::default(), quiet_options());
    let mut desc = unary_descriptor(1, Duration::from_secs(1));
    desc.properties.clear();
    let res = job.start(&desc).await;
    assert_eq!(res.state, JobState::Completed);
    assert!(res.error.contains("Scenario"), "unexpected: {}", res.error);

    // A later stop neither changes the result nor publishes again.
    job.stop().await;
    assert_eq!(job.result(), res);
}

#[tokio::test(start_paused = true)]
async fn oversized_connection_count_completes_with_error() {
    for connections in [MAX_CONNECTIONS + 1, usize::MAX] {
        let connector = ScriptedConnector::default();
        let connects = connector.connects.clone();
        let job = Job::new(connector, quiet_options());

        let res = job
            .start(&unary_descriptor(connections, Duration::from_secs(1)))
            .await;
        assert_eq!(res.state, JobState::Completed);
        assert!(res.error.contains("connections"), "unexpected: {}", res.error);
        assert_eq!(connects.load(Ordering::Relaxed), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn second_start_returns_current_result() {
    let connector = ScriptedConnector::with_delay(Duration::from_millis(10));
    let connects = connector.connects.clone();
    let job = Job::new(connector, quiet_options());
    let desc = unary_descriptor(1, Duration::from_millis(100));

    let first = job.start(&desc).await;
    let second = job.start(&desc).await;

    assert_eq!(first, second);
    assert_eq!(connects.load(Ordering::Relaxed), 1);

    job.release().await;
}

#[tokio::test(start_paused = true)]
async fn zero_requests_report_a_failed_run() {
    // Every request takes longer than the whole run.
    let job = Job::new(
        ScriptedConnector::with_delay(Duration::from_secs(10)),
        quiet_options(),
    );
    let res = job
        .start(&unary_descriptor(1, Duration::from_millis(50)))
        .await;

    assert_eq!(res.state, JobState::Completed);
    assert_eq!(res.requests, 0);
    assert!(res.requests_per_sec.is_none());
    assert!(res.error.contains("job failed to run"), "unexpected: {}", res.error);
}

#[tokio::test(start_paused = true)]
async fn detailed_latency_includes_percentiles() {
    let job = Job::new(
        ScriptedConnector::with_delay(Duration::from_millis(1)),
        quiet_options(),
    );
    let res = job
        .start(&with_latency(unary_descriptor(2, Duration::from_millis(200))))
        .await;

    let latency = res
        .latency
        .unwrap_or_else(|| panic!("expected a latency summary"));
    assert!(latency.percentiles.is_some());

    let job = Job::new(
        ScriptedConnector::with_delay(Duration::from_millis(1)),
        quiet_options(),
    );
    let res = job
        .start(&unary_descriptor(2, Duration::from_millis(200)))
        .await;
    let latency = res
        .latency
        .unwrap_or_else(|| panic!("expected a latency summary"));
    assert!(latency.percentiles.is_none());
}

#[tokio::test(start_paused = true)]
async fn progress_reports_each_interval() {
    let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::default();
    let sink = updates.clone();

    let options = JobOptions {
        grace: Duration::ZERO,
        progress: Some(Arc::new(move |u: ProgressUpdate| {
            sink.lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(u);
        })),
        progress_interval: Duration::from_millis(100),
        ..JobOptions::default()
    };
    let job = Job::new(
        ScriptedConnector::with_delay(Duration::from_millis(1)),
        options,
    );

    let res = job
        .start(&unary_descriptor(2, Duration::from_millis(1050)))
        .await;
    job.release().await;

    let updates = updates
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    assert!(updates.len() >= 9, "got {} updates", updates.len());
    for (i, u) in updates.iter().enumerate() {
        assert_eq!(u.tick, i as u64 + 1);
        assert!(u.requests_total <= res.requests);
        assert!(u.connection_requests_min <= u.connection_requests_max);
    }
    assert!(updates.iter().any(|u| u.requests_per_sec > 0.0));
}
