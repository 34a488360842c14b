use std::process::Command;

use anyhow::Context as _;
use rpcbench_testserver::BenchServer;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ProgressLine {
    tick: u64,
    total_requests: u64,
}

#[derive(Debug, Deserialize)]
struct Latency {
    average: f64,
    p50: Option<f64>,
    max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SummaryLine {
    state: String,
    total_requests: u64,
    requests_per_sec: Option<f64>,
    connection_requests: Vec<u64>,
    latency: Option<Latency>,
    errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind")]
enum JsonLine {
    #[serde(rename = "progress")]
    Progress(ProgressLine),

    #[serde(rename = "summary")]
    Summary(SummaryLine),
}

#[tokio::test]
async fn json_output_reports_progress_and_summary() -> anyhow::Result<()> {
    let server = BenchServer::start().await.context("start test server")?;
    let target = server.target();
    let exe = env!("CARGO_BIN_EXE_rpcbench");

    let out = tokio::task::spawn_blocking(move || {
        Command::new(exe)
            .arg("run")
            .arg("--target")
            .arg(&target)
            .arg("--scenario")
            .arg("unary")
            .arg("--connections")
            .arg("3")
            .arg("--duration")
            .arg("2500ms")
            .arg("--collect-latency")
            .arg("--property")
            .arg("ResponseSize=32")
            .arg("--grace")
            .arg("0s")
            .arg("--output")
            .arg("json")
            .output()
    })
    .await
    .context("spawn_blocking join")?
    .context("run rpcbench binary")?;

    let served = server.stats().requests_total();
    server.shutdown().await;

    let stdout = String::from_utf8_lossy(&out.stdout);
    anyhow::ensure!(
        out.status.success(),
        "rpcbench failed\nstdout:\n{stdout}\nstderr:\n{}",
        String::from_utf8_lossy(&out.stderr)
    );

    let mut progress = Vec::new();
    let mut summary = None;
    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        match serde_json::from_str::<JsonLine>(line)
            .with_context(|| format!("parse json line: {line}"))?
        {
            JsonLine::Progress(p) => progress.push(p),
            JsonLine::Summary(s) => summary = Some(s),
        }
    }

    let summary = summary.context("missing summary line")?;
    anyhow::ensure!(summary.state == "Completed");
    anyhow::ensure!(summary.errors.is_empty(), "errors: {:?}", summary.errors);
    anyhow::ensure!(summary.total_requests > 0);
    anyhow::ensure!(summary.total_requests <= served);
    anyhow::ensure!(summary.connection_requests.len() == 3);
    anyhow::ensure!(summary.requests_per_sec.is_some_and(|rps| rps > 0.0));

    let latency = summary.latency.context("missing latency")?;
    anyhow::ensure!(latency.average.is_finite());
    anyhow::ensure!(latency.p50.is_some() && latency.max.is_some());

    anyhow::ensure!(progress.len() >= 2, "expected progress lines, got {}", progress.len());
    for (i, p) in progress.iter().enumerate() {
        anyhow::ensure!(p.tick == i as u64 + 1);
        anyhow::ensure!(p.total_requests <= summary.total_requests);
    }

    Ok(())
}
