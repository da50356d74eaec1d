//! # Matching Engine
//!
//! An in-memory limit order book matching engine for a single trading
//! venue. Given a stream of order operations against a symbol, it maintains
//! the resting order book, matches incoming orders against the opposite
//! side under price-time priority, emits trade records, and exposes
//! queryable market-depth snapshots. A thin market manager composes many
//! per-symbol engines behind a single order-id namespace and maps users to
//! their resting orders.
//!
//! ## Design
//!
//! - **Side book** (`orderbook::side_book`): a balanced ordered map keyed by
//!   price, with a doubly-indexed FIFO per level, giving `O(log L)` best /
//!   insert / remove and amortised `O(1)` FIFO enqueue/dequeue.
//! - **Matching engine** (`orderbook::engine`): owns both side books, the
//!   id index, the bounded trade history, the latency meter, and the depth
//!   cache, all serialized behind a single reentrant mutex per engine.
//! - **Market manager** (`orderbook::manager`): owns one engine per symbol
//!   and the order→symbol / user→{order} cross-indices, serialized behind
//!   its own reentrant mutex with the engine mutex nested inside.
//!
//! ## Concurrency
//!
//! All engine-public and manager-public operations are fully serialized:
//! a per-engine reentrant mutex, and a manager-level reentrant mutex with
//! the manager acquired outer and the engine inner. Reentrancy lets the
//! manager call back into the same engine (and lets `modify_order`'s
//! cancel-and-replace path call back into `add_order`) without deadlock.
//! Batch operations (`batch_add_orders`, `batch_cancel_orders`) are
//! linearized as a single step.
//!
//! ## Non-goals
//!
//! Persistence, wire protocols, authentication, market-data dissemination,
//! wallet/balance checks, and configuration loading from files or the
//! environment are all out of scope; this crate is a library-level engine,
//! not a venue binary.

pub mod orderbook;
mod utils;

pub use orderbook::{
    AddOrderRequest, EngineConfig, EngineError, ExpiryReaper, Level, LatencyStats, ManagerError,
    ManagerStatistics, MarketManager, MatchingEngine, Order, OrderBookSnapshot, OrderView, Side,
    Statistics, TimeInForce, Trade,
};
pub use utils::now_secs;

pub mod prelude;
