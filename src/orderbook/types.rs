//! Core value types: sides, time-in-force, and the resting `Order`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the book an order rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Opposite side, used to pick which book a taker matches against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Parses `"buy"`/`"bid"` and `"sell"`/`"ask"`, case-insensitively.
    pub fn parse(s: &str) -> Option<Side> {
        match s.to_ascii_lowercase().as_str() {
            "buy" | "bid" => Some(Side::Buy),
            "sell" | "ask" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Order lifetime policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Good till cancelled.
    Gtc,
    /// Immediate or cancel.
    Ioc,
    /// Fill or kill.
    Fok,
    /// Good till date; requires `expiry_time`.
    Gtd,
}

impl Default for TimeInForce {
    fn default() -> Self {
        TimeInForce::Gtc
    }
}

impl TimeInForce {
    /// Parses the four TIF codes case-insensitively.
    pub fn parse(s: &str) -> Option<TimeInForce> {
        match s.to_ascii_uppercase().as_str() {
            "GTC" => Some(TimeInForce::Gtc),
            "IOC" => Some(TimeInForce::Ioc),
            "FOK" => Some(TimeInForce::Fok),
            "GTD" => Some(TimeInForce::Gtd),
            _ => None,
        }
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeInForce::Gtc => "GTC",
            TimeInForce::Ioc => "IOC",
            TimeInForce::Fok => "FOK",
            TimeInForce::Gtd => "GTD",
        };
        write!(f, "{s}")
    }
}

/// A resting or in-flight order.
///
/// `quantity` is decremented in place as fills occur; once it reaches zero
/// the order is removed from its price level and its id index entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
    pub timestamp: f64,
    pub time_in_force: TimeInForce,
    pub expiry_time: Option<f64>,
    pub user_id: Option<String>,
}

impl Order {
    /// Validates the invariants from the data model: positive price and
    /// quantity, and an expiry time whenever the TIF is GTD.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.price > 0.0) {
            return Err("price must be positive".to_string());
        }
        if !(self.quantity > 0.0) {
            return Err("quantity must be positive".to_string());
        }
        if self.time_in_force == TimeInForce::Gtd && self.expiry_time.is_none() {
            return Err("GTD orders require an expiry_time".to_string());
        }
        Ok(())
    }
}

/// A plain, externally-facing view of an order, returned by `get_order`.
///
/// Distinct from `Order` so the manager can attach a `symbol` field without
/// coupling engine internals to routing concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
    pub order_id: String,
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
    pub timestamp: f64,
    pub time_in_force: TimeInForce,
    pub expiry_time: Option<f64>,
    pub user_id: Option<String>,
    pub symbol: Option<String>,
}

impl OrderView {
    /// JSON-encodes this view, for a binding layer that needs to hand it
    /// across a transport this crate itself has no opinion about.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<&Order> for OrderView {
    fn from(o: &Order) -> Self {
        OrderView {
            order_id: o.order_id.clone(),
            side: o.side,
            price: o.price,
            quantity: o.quantity,
            timestamp: o.timestamp,
            time_in_force: o.time_in_force,
            expiry_time: o.expiry_time,
            user_id: o.user_id.clone(),
            symbol: None,
        }
    }
}
