//! Shared time helpers.
//!
//! The engine's notion of "now" is a monotonic wall-clock reading in seconds,
//! used for order timestamps, GTD expiry comparisons, and latency sampling.
//! Sourcing the clock beyond this is an external concern.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as fractional seconds since the Unix epoch.
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
