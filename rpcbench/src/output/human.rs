use std::sync::Arc;

mod format;
mod progress;
mod summary;

use format::{format_elapsed, format_rate};
use progress::HumanProgress;
use summary::render;

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, desc: &rpcbench_core::JobDescriptor) {
        println!("target: {}", desc.target);
        println!(
            "scenario: {} connections={} duration={}",
            desc.scenario.as_deref().unwrap_or("-"),
            desc.connections,
            format_elapsed(desc.duration)
        );

        let mut props: Vec<_> = desc.properties.iter().collect();
        props.sort();
        for (k, v) in props {
            println!("property: {k}={v}");
        }
        println!();

        self.progress.set_total(desc.duration);
    }

    fn progress(&self) -> Option<rpcbench_core::ProgressFn> {
        let progress = self.progress.clone();

        Some(Arc::new(move |u| {
            let message = format!(
                "elapsed={} rps={} requests={} conn_min={} conn_max={}",
                format_elapsed(u.elapsed),
                format_rate(u.requests_per_sec),
                u.requests_total,
                u.connection_requests_min,
                u.connection_requests_max
            );
            progress.update(u.elapsed, message);
        }))
    }

    fn print_summary(&self, res: &rpcbench_core::JobResult) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", render(res));

        if res.has_errors() {
            eprintln!("errors:");
            for line in res.error.lines() {
                eprintln!("  {line}");
            }
        }

        Ok(())
    }
}
