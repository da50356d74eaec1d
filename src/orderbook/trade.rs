//! Immutable trade records and fee calculation.

use serde::{Deserialize, Serialize};

/// An executed trade between a maker and a taker. Once appended to an
/// engine's trade history, a `Trade` is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: String,
    pub maker_order_id: String,
    pub taker_order_id: String,
    pub price: f64,
    pub quantity: f64,
    pub timestamp: f64,
    pub maker_fee: f64,
    pub taker_fee: f64,
    pub maker_user_id: Option<String>,
    pub taker_user_id: Option<String>,
}

impl Trade {
    /// `price * quantity`, the notional value exchanged.
    pub fn value(&self) -> f64 {
        self.price * self.quantity
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Builder-style constructor for trades, computing fees from a pair of
/// notional-fraction rates unless the caller overrides them explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeeSchedule {
    pub maker_fee_rate: f64,
    pub taker_fee_rate: f64,
}

impl FeeSchedule {
    pub fn new(maker_fee_rate: f64, taker_fee_rate: f64) -> Self {
        Self {
            maker_fee_rate,
            taker_fee_rate,
        }
    }

    /// Fee owed by the maker on a fill of the given notional value.
    pub fn maker_fee(&self, notional: f64) -> f64 {
        notional * self.maker_fee_rate
    }

    /// Fee owed by the taker on a fill of the given notional value.
    pub fn taker_fee(&self, notional: f64) -> f64 {
        notional * self.taker_fee_rate
    }
}
