//! The multi-symbol market manager: owns one matching engine per symbol and
//! maintains the order→symbol and user→{order} cross-indices.

use super::config::EngineConfig;
use super::engine::MatchingEngine;
use super::error::{ManagerError, ManagerResult};
use super::expiry::ExpiryReaper;
use super::snapshot::OrderBookSnapshot;
use super::statistics::Statistics;
use super::types::{OrderView, Side, TimeInForce};
use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Aggregated statistics across every market, plus the per-symbol detail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagerStatistics {
    pub total_orders_added: u64,
    pub total_orders_modified: u64,
    pub total_orders_cancelled: u64,
    pub total_trades_executed: u64,
    pub total_volume_traded: f64,
    pub per_symbol: HashMap<String, Statistics>,
}

struct ManagerInner {
    default_config: EngineConfig,
    markets: HashMap<String, Arc<MatchingEngine>>,
    reapers: HashMap<String, ExpiryReaper>,
    order_to_symbol: HashMap<String, String>,
    user_orders: HashMap<String, HashSet<String>>,
}

/// Owns every per-symbol `MatchingEngine` and routes order operations by
/// symbol (or, for id-addressed operations, by the order→symbol index).
pub struct MarketManager {
    inner: ReentrantMutex<RefCell<ManagerInner>>,
}

impl MarketManager {
    pub fn new(default_config: EngineConfig) -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(ManagerInner {
                default_config,
                markets: HashMap::new(),
                reapers: HashMap::new(),
                order_to_symbol: HashMap::new(),
                user_orders: HashMap::new(),
            })),
        }
    }

    fn with_lock<R>(&self, f: impl FnOnce(&mut ManagerInner) -> R) -> R {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        f(&mut inner)
    }

    pub fn create_market(
        &self,
        symbol: &str,
        config_override: Option<EngineConfig>,
    ) -> ManagerResult<Arc<MatchingEngine>> {
        self.with_lock(|inner| {
            if inner.markets.contains_key(symbol) {
                return Err(ManagerError::AlreadyExists(symbol.to_string()));
            }
            let mut config = config_override.unwrap_or_else(|| inner.default_config.clone());
            config.symbol = symbol.to_string();
            let engine = Arc::new(MatchingEngine::new(config));
            if let Some(reaper) = ExpiryReaper::spawn(Arc::clone(&engine), symbol.to_string()) {
                inner.reapers.insert(symbol.to_string(), reaper);
            }
            inner.markets.insert(symbol.to_string(), Arc::clone(&engine));
            Ok(engine)
        })
    }

    /// Cancels every resting order in the market, clears its cross-indices,
    /// and drops the engine (and its reaper thread, if any).
    pub fn delete_market(&self, symbol: &str) -> bool {
        self.with_lock(|inner| {
            let Some(engine) = inner.markets.get(symbol).cloned() else {
                return false;
            };
            for order_id in engine.resting_order_ids() {
                let user_id = engine.get_order(&order_id).and_then(|v| v.user_id);
                engine.cancel_order(&order_id);
                deregister(inner, &order_id, user_id.as_deref());
            }
            inner.reapers.remove(symbol);
            inner.markets.remove(symbol);
            true
        })
    }

    pub fn has_market(&self, symbol: &str) -> bool {
        self.with_lock(|inner| inner.markets.contains_key(symbol))
    }

    pub fn get_market(&self, symbol: &str) -> Option<Arc<MatchingEngine>> {
        self.with_lock(|inner| inner.markets.get(symbol).cloned())
    }

    pub fn list_markets(&self) -> Vec<String> {
        self.with_lock(|inner| inner.markets.keys().cloned().collect())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn place_order(
        &self,
        symbol: &str,
        side: Side,
        price: f64,
        quantity: f64,
        order_id: Option<String>,
        time_in_force: Option<TimeInForce>,
        expiry_time: Option<f64>,
        user_id: Option<String>,
    ) -> ManagerResult<String> {
        self.with_lock(|inner| {
            let engine = inner
                .markets
                .get(symbol)
                .cloned()
                .ok_or_else(|| ManagerError::MarketNotFound(symbol.to_string()))?;

            let placed_id = engine
                .add_order(side, price, quantity, order_id, time_in_force, expiry_time, user_id.clone())
                .map_err(|source| ManagerError::Engine {
                    symbol: symbol.to_string(),
                    source,
                })?;

            if engine.get_order(&placed_id).is_some() {
                inner
                    .order_to_symbol
                    .insert(placed_id.clone(), symbol.to_string());
                if let Some(uid) = user_id {
                    inner.user_orders.entry(uid).or_default().insert(placed_id.clone());
                }
            }
            Ok(placed_id)
        })
    }

    pub fn cancel_order(&self, order_id: &str) -> bool {
        self.with_lock(|inner| {
            let Some(symbol) = inner.order_to_symbol.get(order_id).cloned() else {
                return false;
            };
            let Some(engine) = inner.markets.get(&symbol).cloned() else {
                tracing::error!(order_id, symbol, "order indexed to a market that no longer exists");
                inner.order_to_symbol.remove(order_id);
                return false;
            };
            let user_id = engine.get_order(order_id).and_then(|v| v.user_id);
            let cancelled = engine.cancel_order(order_id);
            if cancelled {
                deregister(inner, order_id, user_id.as_deref());
            }
            cancelled
        })
    }

    pub fn modify_order(
        &self,
        order_id: &str,
        new_price: Option<f64>,
        new_quantity: Option<f64>,
        new_expiry_time: Option<f64>,
    ) -> ManagerResult<bool> {
        self.with_lock(|inner| {
            let Some(symbol) = inner.order_to_symbol.get(order_id).cloned() else {
                return Ok(false);
            };
            let engine = inner
                .markets
                .get(&symbol)
                .cloned()
                .ok_or_else(|| ManagerError::MarketNotFound(symbol.clone()))?;

            let user_id_before = engine.get_order(order_id).and_then(|v| v.user_id);
            let result = engine
                .modify_order(order_id, new_price, new_quantity, new_expiry_time)
                .map_err(|source| ManagerError::Engine {
                    symbol: symbol.clone(),
                    source,
                })?;

            match engine.get_order(order_id) {
                Some(view) => {
                    inner.order_to_symbol.insert(order_id.to_string(), symbol.clone());
                    if let Some(uid) = view.user_id {
                        inner.user_orders.entry(uid).or_default().insert(order_id.to_string());
                    }
                }
                None => deregister(inner, order_id, user_id_before.as_deref()),
            }
            Ok(result)
        })
    }

    pub fn get_order(&self, order_id: &str) -> Option<OrderView> {
        self.with_lock(|inner| {
            let symbol = inner.order_to_symbol.get(order_id)?;
            let engine = inner.markets.get(symbol)?;
            let mut view = engine.get_order(order_id)?;
            view.symbol = Some(symbol.clone());
            Some(view)
        })
    }

    pub fn get_user_orders(&self, user_id: &str) -> Vec<OrderView> {
        self.with_lock(|inner| {
            let Some(ids) = inner.user_orders.get(user_id) else {
                return Vec::new();
            };
            ids.iter()
                .filter_map(|id| {
                    let symbol = inner.order_to_symbol.get(id)?;
                    let engine = inner.markets.get(symbol)?;
                    let mut view = engine.get_order(id)?;
                    view.symbol = Some(symbol.clone());
                    Some(view)
                })
                .collect()
        })
    }

    pub fn get_market_snapshot(&self, symbol: &str, depth: usize) -> Option<OrderBookSnapshot> {
        self.with_lock(|inner| {
            let engine = inner.markets.get(symbol)?;
            let mut snap = engine.get_snapshot(depth);
            snap.symbol = Some(symbol.to_string());
            Some(snap)
        })
    }

    /// Sweeps every market for expired GTD orders, deregistering any ids
    /// the sweep cancelled. Returns how many were removed per symbol.
    pub fn clean_expired_orders(&self) -> HashMap<String, usize> {
        self.with_lock(|inner| {
            let symbols: Vec<String> = inner.markets.keys().cloned().collect();
            let mut removed_by_symbol = HashMap::new();
            for symbol in symbols {
                let engine = inner.markets.get(&symbol).cloned().unwrap();
                let before: HashSet<String> = engine.resting_order_ids().into_iter().collect();
                let removed = engine.sweep_expired();
                if removed > 0 {
                    let after: HashSet<String> = engine.resting_order_ids().into_iter().collect();
                    for id in before.difference(&after) {
                        deregister(inner, id, None);
                    }
                }
                removed_by_symbol.insert(symbol, removed);
            }
            removed_by_symbol
        })
    }

    pub fn clear_market(&self, symbol: &str) -> bool {
        self.with_lock(|inner| {
            let Some(engine) = inner.markets.get(symbol).cloned() else {
                return false;
            };
            for order_id in engine.resting_order_ids() {
                deregister(inner, &order_id, None);
            }
            engine.clear();
            true
        })
    }

    pub fn get_statistics(&self) -> ManagerStatistics {
        self.with_lock(|inner| {
            let mut agg = ManagerStatistics::default();
            for (symbol, engine) in &inner.markets {
                let stats = engine.get_statistics();
                agg.total_orders_added += stats.num_orders_added;
                agg.total_orders_modified += stats.num_orders_modified;
                agg.total_orders_cancelled += stats.num_orders_cancelled;
                agg.total_trades_executed += stats.num_trades_executed;
                agg.total_volume_traded += stats.total_volume_traded;
                agg.per_symbol.insert(symbol.clone(), stats);
            }
            agg
        })
    }
}

/// Removes an order's entries from both cross-indices. Every code path that
/// makes an order stop resting funnels through here, so the indices cannot
/// drift out of sync with the engines (§9).
fn deregister(inner: &mut ManagerInner, order_id: &str, user_id: Option<&str>) {
    inner.order_to_symbol.remove(order_id);
    if let Some(uid) = user_id {
        if let Some(set) = inner.user_orders.get_mut(uid) {
            set.remove(order_id);
            if set.is_empty() {
                inner.user_orders.remove(uid);
            }
        }
    } else {
        // user_id unknown at the call site (e.g. after an expiry sweep):
        // scrub the id out of every user's set rather than leave it dangling.
        inner.user_orders.retain(|_, set| {
            set.remove(order_id);
            !set.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> MarketManager {
        MarketManager::new(EngineConfig::default())
    }

    #[test]
    fn create_market_rejects_duplicate_symbol() {
        let m = manager();
        m.create_market("BTC-USD", None).unwrap();
        let err = m.create_market("BTC-USD", None);
        assert!(matches!(err, Err(ManagerError::AlreadyExists(_))));
    }

    #[test]
    fn place_order_on_unknown_symbol_is_market_not_found() {
        let m = manager();
        let err = m.place_order("NOPE", Side::Buy, 1.0, 1.0, None, None, None, None);
        assert!(matches!(err, Err(ManagerError::MarketNotFound(_))));
    }

    #[test]
    fn place_order_registers_cross_indices() {
        let m = manager();
        m.create_market("BTC-USD", None).unwrap();
        let id = m
            .place_order(
                "BTC-USD",
                Side::Buy,
                100.0,
                1.0,
                Some("o1".into()),
                None,
                None,
                Some("alice".into()),
            )
            .unwrap();

        let view = m.get_order(&id).unwrap();
        assert_eq!(view.symbol.as_deref(), Some("BTC-USD"));
        assert_eq!(m.get_user_orders("alice").len(), 1);
    }

    #[test]
    fn cancel_clears_cross_indices() {
        let m = manager();
        m.create_market("BTC-USD", None).unwrap();
        let id = m
            .place_order(
                "BTC-USD",
                Side::Buy,
                100.0,
                1.0,
                Some("o1".into()),
                None,
                None,
                Some("alice".into()),
            )
            .unwrap();

        assert!(m.cancel_order(&id));
        assert!(m.get_order(&id).is_none());
        assert!(m.get_user_orders("alice").is_empty());
        assert!(!m.cancel_order(&id));
    }

    #[test]
    fn delete_market_cancels_resting_orders_and_drops_engine() {
        let m = manager();
        m.create_market("BTC-USD", None).unwrap();
        let id = m
            .place_order(
                "BTC-USD",
                Side::Buy,
                100.0,
                1.0,
                Some("o1".into()),
                None,
                None,
                Some("alice".into()),
            )
            .unwrap();

        assert!(m.delete_market("BTC-USD"));
        assert!(!m.has_market("BTC-USD"));
        assert!(m.get_order(&id).is_none());
        assert!(m.get_user_orders("alice").is_empty());
    }
}
