use std::time::{SystemTime, UNIX_EPOCH};

/// Wall clock in nanoseconds since the unix epoch (0 if the clock is before the epoch).
pub fn unix_nanos_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Observed latency in milliseconds: `(received - server stamp) + clock offset`.
pub fn latency_ms(received_unix_nanos: i64, server_unix_nanos: i64, clock_offset_ms: f64) -> f64 {
    let delta = received_unix_nanos.saturating_sub(server_unix_nanos);
    delta as f64 / 1_000_000.0 + clock_offset_ms
}
