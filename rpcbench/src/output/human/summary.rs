use std::fmt::Write as _;

use rpcbench_core::JobResult;

use super::format::*;

pub(crate) fn render(res: &JobResult) -> String {
    let mut out = String::new();

    out.push_str("summary\n");
    writeln!(&mut out, "  state: {}", res.state).ok();

    if let Some(elapsed) = res.elapsed {
        writeln!(&mut out, "  elapsed: {}", format_elapsed(elapsed)).ok();
    }

    writeln!(
        &mut out,
        "  requests: {} ({} connections, min {} max {})",
        res.requests,
        res.connection_requests.len(),
        res.connection_requests_min,
        res.connection_requests_max
    )
    .ok();

    match res.requests_per_sec {
        Some(rps) => writeln!(&mut out, "  requests/sec: {rps:.2}").ok(),
        None => writeln!(&mut out, "  requests/sec: n/a").ok(),
    };

    match &res.latency {
        Some(l) => {
            write!(&mut out, "  latency = avg={}", format_latency_ms(l.average)).ok();
            if let Some(p) = &l.percentiles {
                write!(
                    &mut out,
                    " p50={} p75={} p90={} p99={} max={}",
                    format_latency_ms(p.p50),
                    format_latency_ms(p.p75),
                    format_latency_ms(p.p90),
                    format_latency_ms(p.p99),
                    format_latency_ms(p.p100)
                )
                .ok();
            }
            out.push('\n');
        }
        None => out.push_str("  latency: n/a\n"),
    }

    out
}
