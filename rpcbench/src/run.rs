use anyhow::Context as _;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rpcbench_core::{
    ConnectOptions, CredentialBundle, GrpcConnector, Job, JobConfig, JobDescriptor, JobOptions,
    PROP_COLLECT_LATENCY,
};

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);

    let desc = job_descriptor(&args).map_err(RunError::InvalidInput)?;

    // Reject bad input up front so it maps to an input error rather than a failed run.
    JobConfig::from_descriptor(&desc)
        .context("invalid job")
        .map_err(RunError::InvalidInput)?;

    let credentials = load_credentials(&args)
        .await
        .map_err(RunError::InvalidInput)?;

    let connector = GrpcConnector::new(ConnectOptions {
        connect_timeout: Some(args.timeout).filter(|t| !t.is_zero()),
        credentials,
    });

    let options = JobOptions {
        request_timeout: args.timeout,
        grace: args.grace,
        clock_offset_ms: args.clock_offset_ms,
        progress: out.progress(),
        ..JobOptions::default()
    };

    let job = Arc::new(Job::new(connector, options));

    let stopper = {
        let job = job.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received; stopping");
                job.stop().await;
            }
        })
    };

    out.print_header(&desc);
    let res = job.start(&desc).await;
    stopper.abort();

    out.print_summary(&res)
        .context("failed to print summary")
        .map_err(RunError::RuntimeError)?;

    job.release().await;

    Ok(ExitCode::from_job_result(&res))
}

fn job_descriptor(args: &RunArgs) -> anyhow::Result<JobDescriptor> {
    let mut properties = HashMap::new();
    if args.collect_latency {
        properties.insert(PROP_COLLECT_LATENCY.to_string(), "true".to_string());
    }
    properties.extend(parse_properties(&args.properties)?);

    Ok(JobDescriptor {
        connections: args.connections,
        duration: args.duration,
        target: args.target.clone(),
        scenario: args.scenario.clone(),
        properties,
    })
}

fn parse_properties(pairs: &[String]) -> anyhow::Result<HashMap<String, String>> {
    let mut out = HashMap::with_capacity(pairs.len());

    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            anyhow::bail!("invalid --property `{pair}` (expected KEY=VALUE)");
        };

        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("invalid --property `{pair}` (empty key)");
        }

        out.insert(key.to_string(), value.to_string());
    }

    Ok(out)
}

async fn load_credentials(args: &RunArgs) -> anyhow::Result<Option<CredentialBundle>> {
    if !args.tls_requested() {
        return Ok(None);
    }

    Ok(Some(CredentialBundle {
        ca_pem: read_pem(args.ca.as_deref()).await?,
        client_cert_pem: read_pem(args.cert.as_deref()).await?,
        client_key_pem: read_pem(args.key.as_deref()).await?,
        domain_name: args.domain.clone(),
    }))
}

async fn read_pem(path: Option<&Path>) -> anyhow::Result<Option<Vec<u8>>> {
    let Some(path) = path else {
        return Ok(None);
    };

    let pem = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read PEM file: {}", path.display()))?;
    Ok(Some(pem))
}
