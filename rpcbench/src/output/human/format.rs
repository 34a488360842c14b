use std::time::Duration;

pub(crate) fn format_rate(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.0}")
    } else {
        "0".to_string()
    }
}

/// Latency in milliseconds, rendered in the largest unit that keeps it readable.
pub(crate) fn format_latency_ms(ms: f64) -> String {
    if !ms.is_finite() {
        return "n/a".to_string();
    }

    let abs = ms.abs();
    if abs >= 1000.0 {
        format!("{:.2}s", ms / 1000.0)
    } else if abs >= 1.0 {
        format!("{ms:.2}ms")
    } else {
        format!("{:.0}us", ms * 1000.0)
    }
}

/// Rounded to whole milliseconds so humantime prints a short value.
pub(crate) fn format_elapsed(d: Duration) -> String {
    let ms = u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
    humantime::format_duration(Duration::from_millis(ms)).to_string()
}
