//! Prelude module that re-exports the commonly used types and traits.
//!
//! ```rust
//! use matching_engine::prelude::*;
//! ```

pub use crate::orderbook::{
    AddOrderRequest, EngineConfig, EngineError, Level, LatencyStats, ManagerError,
    ManagerStatistics, MarketManager, MatchingEngine, Order, OrderBookSnapshot, OrderView, Side,
    Statistics, TimeInForce, Trade,
};
pub use crate::utils::now_secs;
