//! Matching engine internals: types, the per-symbol engine, and the
//! multi-symbol market manager.

pub mod config;
pub mod engine;
pub mod error;
pub mod expiry;
pub mod latency;
pub mod manager;
pub mod matching;
pub mod price_level;
pub mod side_book;
pub mod snapshot;
pub mod statistics;
pub mod trade;
pub mod types;

pub use config::EngineConfig;
pub use engine::{AddOrderRequest, MatchingEngine};
pub use error::{EngineError, ManagerError};
pub use expiry::ExpiryReaper;
pub use latency::LatencyStats;
pub use manager::{MarketManager, ManagerStatistics};
pub use snapshot::{Level, OrderBookSnapshot};
pub use statistics::Statistics;
pub use trade::Trade;
pub use types::{Order, OrderView, Side, TimeInForce};
