//! Per-operation latency sampling with a bounded ring buffer.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Summary statistics for one tracked operation's latency samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub count: usize,
    pub min_nanos: u64,
    pub max_nanos: u64,
    pub mean_nanos: f64,
    pub p50_nanos: u64,
    pub p90_nanos: Option<u64>,
    pub p99_nanos: Option<u64>,
}

/// Keeps, per named operation, the last `capacity` elapsed-time samples.
pub struct LatencyMeter {
    capacity: usize,
    samples: HashMap<&'static str, VecDeque<u64>>,
}

impl LatencyMeter {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: HashMap::new(),
        }
    }

    pub fn record(&mut self, operation: &'static str, elapsed: Duration) {
        let ring = self.samples.entry(operation).or_default();
        if ring.len() == self.capacity {
            ring.pop_front();
        }
        ring.push_back(elapsed.as_nanos() as u64);
    }

    /// `None` if the operation has never been recorded.
    pub fn stats(&self, operation: &str) -> Option<LatencyStats> {
        let ring = self.samples.get(operation)?;
        if ring.is_empty() {
            return None;
        }
        let mut sorted: Vec<u64> = ring.iter().copied().collect();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u128 = sorted.iter().map(|&v| v as u128).sum();
        let mean_nanos = sum as f64 / count as f64;

        let percentile = |p: f64| -> u64 {
            let idx = ((p * count as f64).ceil() as usize).saturating_sub(1).min(count - 1);
            sorted[idx]
        };

        Some(LatencyStats {
            count,
            min_nanos: sorted[0],
            max_nanos: sorted[count - 1],
            mean_nanos,
            p50_nanos: percentile(0.50),
            p90_nanos: if count >= 10 { Some(percentile(0.90)) } else { None },
            p99_nanos: if count >= 10 { Some(percentile(0.99)) } else { None },
        })
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
