//! Engine-level counters and the aggregated statistics view.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub num_orders_added: u64,
    pub num_orders_modified: u64,
    pub num_orders_cancelled: u64,
    pub num_trades_executed: u64,
    pub total_volume_traded: f64,
    pub bid_levels: usize,
    pub ask_levels: usize,
    pub total_orders: usize,
    pub bid_orders: usize,
    pub ask_orders: usize,
    pub trade_history_size: usize,
    pub best_bid: Option<f64>,
    pub best_ask: Option<f64>,
}

/// Mutable running counters owned by an engine. `Statistics` is the
/// point-in-time view derived from these plus the live side books.
#[derive(Debug, Default)]
pub struct Counters {
    pub num_orders_added: u64,
    pub num_orders_modified: u64,
    pub num_orders_cancelled: u64,
    pub num_trades_executed: u64,
    pub total_volume_traded: f64,
}

impl Counters {
    pub fn reset(&mut self) {
        *self = Counters::default();
    }
}
