//! The per-symbol matching engine: owns both side books, the id index, the
//! trade history, and the latency/caching ancillaries, all behind a single
//! reentrant mutex so every public call is linearizable.

use super::config::EngineConfig;
use super::error::{EngineError, EngineResult};
use super::latency::{LatencyMeter, LatencyStats};
use super::matching::{fok_precheck, run_matching_loop};
use super::price_level::PriceLevel;
use super::side_book::SideBook;
use super::snapshot::{DepthSnapshotCache, Level, OrderBookSnapshot};
use super::statistics::{Counters, Statistics};
use super::trade::{FeeSchedule, Trade};
use super::types::{Order, OrderView, Side, TimeInForce};
use crate::utils::now_secs;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::time::Instant;
use uuid::Uuid;

fn new_order_id() -> String {
    Uuid::new_v4().to_string()
}

fn new_trade_id() -> String {
    Uuid::new_v4().to_string()
}

/// One entry of a `batch_add_orders` call; shares validation and TIF
/// semantics with `add_order`.
#[derive(Debug, Clone)]
pub struct AddOrderRequest {
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
    pub order_id: Option<String>,
    pub time_in_force: Option<TimeInForce>,
    pub expiry_time: Option<f64>,
    pub user_id: Option<String>,
}

struct EngineInner {
    config: EngineConfig,
    bids: SideBook,
    asks: SideBook,
    order_side: HashMap<String, Side>,
    trade_history: VecDeque<Trade>,
    latency: LatencyMeter,
    cache: DepthSnapshotCache,
    counters: Counters,
}

impl EngineInner {
    fn book(&self, side: Side) -> &SideBook {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn book_mut(&mut self, side: Side) -> &mut SideBook {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    fn fees(&self) -> FeeSchedule {
        FeeSchedule::new(self.config.maker_fee_rate, self.config.taker_fee_rate)
    }

    fn push_trade(&mut self, trade: Trade) {
        if self.trade_history.len() == self.config.max_trade_history {
            self.trade_history.pop_front();
        }
        self.trade_history.push_back(trade);
    }
}

/// A single-symbol limit order book and matching engine.
pub struct MatchingEngine {
    inner: ReentrantMutex<RefCell<EngineInner>>,
}

impl MatchingEngine {
    pub fn new(config: EngineConfig) -> Self {
        let latency = LatencyMeter::new(config.latency_sample_capacity);
        Self {
            inner: ReentrantMutex::new(RefCell::new(EngineInner {
                config,
                bids: SideBook::new(Side::Buy),
                asks: SideBook::new(Side::Sell),
                order_side: HashMap::new(),
                trade_history: VecDeque::new(),
                latency,
                cache: DepthSnapshotCache::default(),
                counters: Counters::default(),
            })),
        }
    }

    pub fn symbol(&self) -> String {
        let guard = self.inner.lock();
        guard.borrow().config.symbol.clone()
    }

    pub fn check_expiry_interval(&self) -> f64 {
        let guard = self.inner.lock();
        guard.borrow().config.check_expiry_interval
    }

    fn with_lock<R>(&self, f: impl FnOnce(&mut EngineInner) -> R) -> R {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        f(&mut inner)
    }

    pub fn add_order(
        &self,
        side: Side,
        price: f64,
        quantity: f64,
        order_id: Option<String>,
        time_in_force: Option<TimeInForce>,
        expiry_time: Option<f64>,
        user_id: Option<String>,
    ) -> EngineResult<String> {
        self.with_lock(|inner| {
            let start = Instant::now();
            let result = add_order_locked(
                inner,
                side,
                price,
                quantity,
                order_id,
                time_in_force,
                expiry_time,
                user_id,
            );
            inner.latency.record("add_order", start.elapsed());
            result
        })
    }

    pub fn batch_add_orders(&self, requests: Vec<AddOrderRequest>) -> Vec<String> {
        self.with_lock(|inner| {
            let start = Instant::now();
            let ids = batch_add_orders_locked(inner, requests);
            inner.latency.record("batch_add_orders", start.elapsed());
            ids
        })
    }

    pub fn modify_order(
        &self,
        order_id: &str,
        new_price: Option<f64>,
        new_quantity: Option<f64>,
        new_expiry_time: Option<f64>,
    ) -> EngineResult<bool> {
        self.with_lock(|inner| {
            let start = Instant::now();
            let result = modify_order_locked(inner, order_id, new_price, new_quantity, new_expiry_time);
            inner.latency.record("modify_order", start.elapsed());
            result
        })
    }

    pub fn cancel_order(&self, order_id: &str) -> bool {
        self.with_lock(|inner| {
            let start = Instant::now();
            let result = cancel_order_locked(inner, order_id);
            inner.latency.record("cancel_order", start.elapsed());
            result
        })
    }

    pub fn batch_cancel_orders(&self, order_ids: Vec<String>) -> HashMap<String, bool> {
        self.with_lock(|inner| {
            let start = Instant::now();
            let result = order_ids
                .into_iter()
                .map(|id| {
                    let ok = cancel_order_locked(inner, &id);
                    (id, ok)
                })
                .collect();
            inner.latency.record("batch_cancel_orders", start.elapsed());
            result
        })
    }

    pub fn get_snapshot(&self, depth: usize) -> OrderBookSnapshot {
        self.with_lock(|inner| {
            let start = Instant::now();
            let snap = inner.cache.snapshot(&inner.bids, &inner.asks, depth);
            inner.latency.record("get_snapshot", start.elapsed());
            snap
        })
    }

    pub fn get_order_depth_at_price(&self, side: Side, price: f64) -> Option<Level> {
        self.with_lock(|inner| {
            let start = Instant::now();
            let level = inner.book(side).level_at(price).map(level_to_view);
            inner
                .latency
                .record("get_order_depth_at_price", start.elapsed());
            level
        })
    }

    pub fn get_order(&self, order_id: &str) -> Option<OrderView> {
        self.with_lock(|inner| {
            let side = *inner.order_side.get(order_id)?;
            inner.book(side).get(order_id).map(OrderView::from)
        })
    }

    pub fn get_trade_history(&self, limit: usize) -> Vec<Trade> {
        self.with_lock(|inner| inner.trade_history.iter().rev().take(limit).cloned().collect())
    }

    pub fn get_statistics(&self) -> Statistics {
        self.with_lock(|inner| Statistics {
            num_orders_added: inner.counters.num_orders_added,
            num_orders_modified: inner.counters.num_orders_modified,
            num_orders_cancelled: inner.counters.num_orders_cancelled,
            num_trades_executed: inner.counters.num_trades_executed,
            total_volume_traded: inner.counters.total_volume_traded,
            bid_levels: inner.bids.level_count(),
            ask_levels: inner.asks.level_count(),
            total_orders: inner.bids.order_count() + inner.asks.order_count(),
            bid_orders: inner.bids.order_count(),
            ask_orders: inner.asks.order_count(),
            trade_history_size: inner.trade_history.len(),
            best_bid: inner.bids.best(),
            best_ask: inner.asks.best(),
        })
    }

    pub fn get_latency_stats(&self, operation: &str) -> Option<LatencyStats> {
        self.with_lock(|inner| inner.latency.stats(operation))
    }

    pub fn clear(&self) {
        self.with_lock(|inner| {
            inner.bids.clear();
            inner.asks.clear();
            inner.order_side.clear();
            inner.trade_history.clear();
            inner.counters.reset();
            inner.cache.invalidate();
        })
    }

    /// Cancels every resting GTD order whose `expiry_time` has passed.
    /// Invoked by the background reaper thread (§4.7); also callable
    /// directly, e.g. from the market manager's `clean_expired_orders`.
    pub fn sweep_expired(&self) -> usize {
        self.with_lock(sweep_expired_locked)
    }

    /// All ids currently resting in this engine, in no particular order.
    /// Used by the market manager to clean up cross-indices on
    /// `delete_market` and `clear_market`.
    pub fn resting_order_ids(&self) -> Vec<String> {
        self.with_lock(|inner| inner.order_side.keys().cloned().collect())
    }
}

fn level_to_view(level: &PriceLevel) -> Level {
    Level {
        price: level.price,
        quantity: level.total_quantity(),
        order_count: level.order_count(),
    }
}

fn add_order_locked(
    inner: &mut EngineInner,
    side: Side,
    price: f64,
    quantity: f64,
    order_id: Option<String>,
    time_in_force: Option<TimeInForce>,
    expiry_time: Option<f64>,
    user_id: Option<String>,
) -> EngineResult<String> {
    let tif = time_in_force.unwrap_or_default();
    let order_id = order_id.unwrap_or_else(new_order_id);
    let order = Order {
        order_id: order_id.clone(),
        side,
        price,
        quantity,
        timestamp: now_secs(),
        time_in_force: tif,
        expiry_time,
        user_id,
    };
    order.validate().map_err(EngineError::invalid_argument)?;
    inner.counters.num_orders_added += 1;

    let opposite_side = side.opposite();
    let price_improvement = inner.config.enable_price_improvement;

    if tif == TimeInForce::Fok
        && !fok_precheck(side, price, quantity, inner.book(opposite_side), price_improvement)
    {
        // Insufficient liquidity at acceptable prices: discard with no trades.
        return Ok(order_id);
    }

    let mut taker = order.clone();
    let fees = inner.fees();
    let now = order.timestamp;
    let (trades, exhausted_makers) = run_matching_loop(
        &mut taker,
        inner.book_mut(opposite_side),
        price_improvement,
        fees,
        now,
        &mut new_trade_id,
    );

    for id in &exhausted_makers {
        inner.order_side.remove(id);
    }
    if !trades.is_empty() {
        inner.cache.invalidate();
    }
    inner.counters.num_trades_executed += trades.len() as u64;
    for trade in trades {
        inner.counters.total_volume_traded += trade.quantity;
        tracing::info!(
            trade_id = %trade.trade_id,
            price = trade.price,
            quantity = trade.quantity,
            "trade executed"
        );
        inner.push_trade(trade);
    }

    if matches!(tif, TimeInForce::Gtc | TimeInForce::Gtd) && taker.quantity > 0.0 {
        inner.book_mut(side).insert(taker);
        inner.order_side.insert(order_id.clone(), side);
        inner.cache.invalidate();
    }

    Ok(order_id)
}

fn batch_add_orders_locked(inner: &mut EngineInner, requests: Vec<AddOrderRequest>) -> Vec<String> {
    struct Pending {
        order_id: String,
        order: Order,
    }

    let mut order_ids = Vec::with_capacity(requests.len());
    let mut pendings: Vec<Pending> = Vec::new();

    for req in requests {
        let tif = req.time_in_force.unwrap_or_default();
        let order_id = req.order_id.unwrap_or_else(new_order_id);
        order_ids.push(order_id.clone());

        let order = Order {
            order_id: order_id.clone(),
            side: req.side,
            price: req.price,
            quantity: req.quantity,
            timestamp: now_secs(),
            time_in_force: tif,
            expiry_time: req.expiry_time,
            user_id: req.user_id,
        };
        if order.validate().is_err() {
            tracing::warn!(order_id = %order_id, "batch entry failed validation, skipped");
            continue;
        }
        inner.counters.num_orders_added += 1;

        let opposite_side = req.side.opposite();
        let price_improvement = inner.config.enable_price_improvement;
        if tif == TimeInForce::Fok
            && !fok_precheck(
                req.side,
                req.price,
                req.quantity,
                inner.book(opposite_side),
                price_improvement,
            )
        {
            continue;
        }

        let mut taker = order.clone();
        let fees = inner.fees();
        let now = order.timestamp;
        let (trades, exhausted_makers) = run_matching_loop(
            &mut taker,
            inner.book_mut(opposite_side),
            price_improvement,
            fees,
            now,
            &mut new_trade_id,
        );
        for id in &exhausted_makers {
            inner.order_side.remove(id);
        }
        if !trades.is_empty() {
            inner.cache.invalidate();
        }
        inner.counters.num_trades_executed += trades.len() as u64;
        for trade in trades {
            inner.counters.total_volume_traded += trade.quantity;
            inner.push_trade(trade);
        }

        if matches!(tif, TimeInForce::Gtc | TimeInForce::Gtd) && taker.quantity > 0.0 {
            pendings.push(Pending {
                order_id: order_id.clone(),
                order: taker,
            });
        }
    }

    // Phase 2: insert surviving residuals in list order. Deferring this
    // until every entry has matched against the book-at-batch-entry is
    // what keeps a batch from self-crossing (S8).
    for pending in pendings {
        let side = pending.order.side;
        inner.book_mut(side).insert(pending.order);
        inner.order_side.insert(pending.order_id, side);
    }
    if !order_ids.is_empty() {
        inner.cache.invalidate();
    }

    order_ids
}

fn modify_order_locked(
    inner: &mut EngineInner,
    order_id: &str,
    new_price: Option<f64>,
    new_quantity: Option<f64>,
    new_expiry_time: Option<f64>,
) -> EngineResult<bool> {
    let Some(&side) = inner.order_side.get(order_id) else {
        return Ok(false);
    };
    let Some(current) = inner.book(side).get(order_id).cloned() else {
        tracing::error!(order_id, "order indexed but missing from side book");
        return Ok(false);
    };

    match new_price {
        Some(price) if price != current.price => {
            // Cancel-and-replace: resubmitted under the same id with a
            // fresh timestamp, so it can trade on the way back in (S6).
            cancel_order_locked(inner, order_id);

            let quantity = new_quantity.unwrap_or(current.quantity);
            let expiry_time = new_expiry_time.or(current.expiry_time);
            match add_order_locked(
                inner,
                side,
                price,
                quantity,
                Some(order_id.to_string()),
                Some(current.time_in_force),
                expiry_time,
                current.user_id.clone(),
            ) {
                Ok(_) => {
                    inner.counters.num_orders_modified += 1;
                    Ok(true)
                }
                Err(err) => {
                    // Restore the pre-modification order verbatim.
                    inner.book_mut(side).insert(current.clone());
                    inner.order_side.insert(order_id.to_string(), side);
                    Err(err)
                }
            }
        }
        _ => {
            if let Some(q) = new_quantity {
                if !(q > 0.0) {
                    return Err(EngineError::invalid_argument("quantity must be positive"));
                }
            }
            let Some(mut order) = inner.book_mut(side).remove(order_id) else {
                return Ok(false);
            };
            let original = order.clone();
            if let Some(q) = new_quantity {
                order.quantity = q;
            }
            if let Some(e) = new_expiry_time {
                order.expiry_time = Some(e);
            }
            order.timestamp = now_secs();

            if let Err(msg) = order.validate() {
                inner.book_mut(side).insert(original);
                return Err(EngineError::invalid_argument(msg));
            }

            inner.book_mut(side).insert(order);
            inner.counters.num_orders_modified += 1;
            inner.cache.invalidate();
            Ok(true)
        }
    }
}

fn cancel_order_locked(inner: &mut EngineInner, order_id: &str) -> bool {
    let Some(side) = inner.order_side.remove(order_id) else {
        return false;
    };
    match inner.book_mut(side).remove(order_id) {
        Some(_) => {
            inner.counters.num_orders_cancelled += 1;
            inner.cache.invalidate();
            true
        }
        None => {
            tracing::error!(order_id, "order indexed but missing from side book");
            false
        }
    }
}

fn sweep_expired_locked(inner: &mut EngineInner) -> usize {
    let now = now_secs();
    let expired: Vec<String> = inner
        .order_side
        .iter()
        .filter_map(|(id, &side)| {
            let order = inner.book(side).get(id)?;
            let expired = order.time_in_force == TimeInForce::Gtd
                && order.expiry_time.is_some_and(|e| e <= now);
            expired.then(|| id.clone())
        })
        .collect();

    let mut count = 0;
    for id in expired {
        if cancel_order_locked(inner, &id) {
            tracing::debug!(order_id = %id, "GTD order expired and was cancelled");
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> MatchingEngine {
        MatchingEngine::new(EngineConfig::new("TEST"))
    }

    // S1 — Simple cross.
    #[test]
    fn scenario_simple_cross() {
        let e = engine();
        e.add_order(Side::Buy, 100.0, 1.0, Some("b1".into()), None, None, None)
            .unwrap();
        e.add_order(Side::Buy, 99.0, 1.0, Some("b2".into()), None, None, None)
            .unwrap();
        e.add_order(Side::Sell, 101.0, 1.0, Some("a1".into()), None, None, None)
            .unwrap();
        e.add_order(Side::Sell, 100.0, 2.0, Some("a2".into()), None, None, None)
            .unwrap();
        e.add_order(Side::Buy, 100.0, 2.0, Some("t".into()), None, None, None)
            .unwrap();

        let trades = e.get_trade_history(10);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].maker_order_id, "a2");
        assert_eq!(trades[0].price, 100.0);
        assert_eq!(trades[0].quantity, 2.0);
        assert!(e.get_order("t").is_none());

        let snap = e.get_snapshot(10);
        assert_eq!(snap.asks, vec![Level { price: 101.0, quantity: 1.0, order_count: 1 }]);
        assert_eq!(
            snap.bids,
            vec![
                Level { price: 100.0, quantity: 1.0, order_count: 1 },
                Level { price: 99.0, quantity: 1.0, order_count: 1 },
            ]
        );
    }

    // S2 — FIFO at a level.
    #[test]
    fn scenario_fifo_at_a_level() {
        let e = engine();
        e.add_order(Side::Sell, 100.0, 1.0, Some("a1".into()), None, None, None)
            .unwrap();
        e.add_order(Side::Sell, 100.0, 1.0, Some("a2".into()), None, None, None)
            .unwrap();
        e.add_order(Side::Buy, 100.0, 1.0, Some("t".into()), None, None, None)
            .unwrap();

        let trades = e.get_trade_history(10);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].maker_order_id, "a1");
        assert!(e.get_order("a2").is_some());
    }

    // S3 — FOK kill.
    #[test]
    fn scenario_fok_kill() {
        let e = engine();
        e.add_order(Side::Sell, 100.0, 1.0, Some("a1".into()), None, None, None)
            .unwrap();
        e.add_order(Side::Sell, 101.0, 1.0, Some("a2".into()), None, None, None)
            .unwrap();
        e.add_order(
            Side::Buy,
            101.0,
            3.0,
            Some("t".into()),
            Some(TimeInForce::Fok),
            None,
            None,
        )
        .unwrap();

        assert!(e.get_trade_history(10).is_empty());
        assert!(e.get_order("t").is_none());
        assert!(e.get_order("a1").is_some());
        assert!(e.get_order("a2").is_some());
    }

    // S4 — IOC partial.
    #[test]
    fn scenario_ioc_partial() {
        let e = engine();
        e.add_order(Side::Sell, 100.0, 1.0, Some("a1".into()), None, None, None)
            .unwrap();
        e.add_order(Side::Sell, 102.0, 1.0, Some("a2".into()), None, None, None)
            .unwrap();
        e.add_order(
            Side::Buy,
            101.0,
            3.0,
            Some("t".into()),
            Some(TimeInForce::Ioc),
            None,
            None,
        )
        .unwrap();

        let trades = e.get_trade_history(10);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, 100.0);
        assert_eq!(trades[0].quantity, 1.0);
        assert!(e.get_order("t").is_none());
        let snap = e.get_snapshot(10);
        assert_eq!(snap.asks, vec![Level { price: 102.0, quantity: 1.0, order_count: 1 }]);
    }

    // S6 — Modify price.
    #[test]
    fn scenario_modify_price_resets_priority_and_can_trade() {
        let e = engine();
        e.add_order(Side::Buy, 100.0, 1.0, Some("x".into()), None, None, None)
            .unwrap();
        let ok = e.modify_order("x", Some(101.0), None, None).unwrap();
        assert!(ok);
        e.add_order(Side::Sell, 101.0, 1.0, Some("a".into()), None, None, None)
            .unwrap();

        let trades = e.get_trade_history(10);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].maker_order_id, "x");
        assert_eq!(trades[0].price, 101.0);
    }

    // S7 — Price improvement.
    #[test]
    fn scenario_price_improvement() {
        let mut config = EngineConfig::new("TEST");
        config.enable_price_improvement = true;
        let e = MatchingEngine::new(config);
        e.add_order(Side::Sell, 100.0, 1.0, Some("a".into()), None, None, None)
            .unwrap();
        e.add_order(Side::Buy, 90.0, 1.0, Some("t".into()), None, None, None)
            .unwrap();

        let trades = e.get_trade_history(10);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, 100.0);
    }

    // S8 — Batch self-cross protection.
    #[test]
    fn scenario_batch_self_cross_protection() {
        let e = engine();
        let ids = e.batch_add_orders(vec![
            AddOrderRequest {
                side: Side::Sell,
                price: 100.0,
                quantity: 1.0,
                order_id: Some("s".into()),
                time_in_force: None,
                expiry_time: None,
                user_id: None,
            },
            AddOrderRequest {
                side: Side::Buy,
                price: 100.0,
                quantity: 1.0,
                order_id: Some("b".into()),
                time_in_force: None,
                expiry_time: None,
                user_id: None,
            },
        ]);
        assert_eq!(ids, vec!["s".to_string(), "b".to_string()]);
        assert!(e.get_trade_history(10).is_empty());
        assert!(e.get_order("s").is_some());
        assert!(e.get_order("b").is_some());
    }

    #[test]
    fn cancel_is_idempotent() {
        let e = engine();
        e.add_order(Side::Buy, 100.0, 1.0, Some("a".into()), None, None, None)
            .unwrap();
        assert!(e.cancel_order("a"));
        assert!(!e.cancel_order("a"));
    }

    #[test]
    fn invalid_argument_rejects_non_positive_price() {
        let e = engine();
        let err = e.add_order(Side::Buy, -1.0, 1.0, None, None, None, None);
        assert!(err.is_err());
    }

    #[test]
    fn gtd_without_expiry_is_rejected() {
        let e = engine();
        let err = e.add_order(Side::Buy, 100.0, 1.0, None, Some(TimeInForce::Gtd), None, None);
        assert!(err.is_err());
    }

    #[test]
    fn sweep_expired_cancels_past_due_gtd_orders() {
        let e = engine();
        e.add_order(
            Side::Buy,
            100.0,
            1.0,
            Some("g".into()),
            Some(TimeInForce::Gtd),
            Some(0.0),
            None,
        )
        .unwrap();
        let removed = e.sweep_expired();
        assert_eq!(removed, 1);
        assert!(e.get_order("g").is_none());
        assert_eq!(e.get_statistics().num_orders_cancelled, 1);
    }

    #[test]
    fn trade_history_is_bounded_by_max_trade_history() {
        let mut config = EngineConfig::new("TEST");
        config.max_trade_history = 2;
        let e = MatchingEngine::new(config);
        for i in 0..5 {
            e.add_order(Side::Sell, 100.0, 1.0, Some(format!("a{i}")), None, None, None)
                .unwrap();
            e.add_order(Side::Buy, 100.0, 1.0, Some(format!("b{i}")), None, None, None)
                .unwrap();
        }
        assert_eq!(e.get_trade_history(100).len(), 2);
    }
}
