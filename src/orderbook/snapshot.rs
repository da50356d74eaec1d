//! Aggregated depth views and the cache that memoizes them.

use super::side_book::SideBook;
use serde::{Deserialize, Serialize};

/// Aggregated resting interest at a single price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: f64,
    pub quantity: f64,
    pub order_count: usize,
}

/// Top-N aggregated view of both sides of a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
    pub symbol: Option<String>,
}

impl OrderBookSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn aggregate(book: &SideBook, depth: usize) -> Vec<Level> {
    book.iter_from_best()
        .take(depth)
        .map(|level| Level {
            price: level.price,
            quantity: level.total_quantity(),
            order_count: level.order_count(),
        })
        .collect()
}

/// Caches the last snapshot built, keyed by the depth it was built to.
/// Any book mutation calls `invalidate`, which clears the cache; the next
/// `snapshot` call rebuilds from the side books. This is strictly a
/// latency optimization: correctness never depends on the cache being hit.
#[derive(Default)]
pub struct DepthSnapshotCache {
    cached: Option<(usize, OrderBookSnapshot)>,
}

impl DepthSnapshotCache {
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Returns a snapshot of at least `depth` levels per side, rebuilding
    /// from the side books if the cache is empty or too shallow.
    pub fn snapshot(&mut self, bids: &SideBook, asks: &SideBook, depth: usize) -> OrderBookSnapshot {
        if let Some((cached_depth, snap)) = &self.cached {
            if *cached_depth >= depth {
                return OrderBookSnapshot {
                    bids: snap.bids.iter().take(depth).cloned().collect(),
                    asks: snap.asks.iter().take(depth).cloned().collect(),
                    symbol: snap.symbol.clone(),
                };
            }
        }
        let snap = OrderBookSnapshot {
            bids: aggregate(bids, depth),
            asks: aggregate(asks, depth),
            symbol: None,
        };
        self.cached = Some((depth, snap.clone()));
        snap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::types::{Order, Side, TimeInForce};

    fn order(id: &str, side: Side, price: f64, qty: f64) -> Order {
        Order {
            order_id: id.into(),
            side,
            price,
            quantity: qty,
            timestamp: 0.0,
            time_in_force: TimeInForce::Gtc,
            expiry_time: None,
            user_id: None,
        }
    }

    #[test]
    fn aggregates_quantity_and_count_per_level() {
        let mut bids = SideBook::new(Side::Buy);
        bids.insert(order("a", Side::Buy, 100.0, 1.0));
        bids.insert(order("b", Side::Buy, 100.0, 2.0));
        let asks = SideBook::new(Side::Sell);

        let mut cache = DepthSnapshotCache::default();
        let snap = cache.snapshot(&bids, &asks, 10);
        assert_eq!(snap.bids.len(), 1);
        assert_eq!(snap.bids[0].quantity, 3.0);
        assert_eq!(snap.bids[0].order_count, 2);
    }

    #[test]
    fn invalidate_forces_rebuild() {
        let mut bids = SideBook::new(Side::Buy);
        bids.insert(order("a", Side::Buy, 100.0, 1.0));
        let asks = SideBook::new(Side::Sell);

        let mut cache = DepthSnapshotCache::default();
        let _ = cache.snapshot(&bids, &asks, 10);
        bids.insert(order("b", Side::Buy, 100.0, 1.0));
        cache.invalidate();
        let snap = cache.snapshot(&bids, &asks, 10);
        assert_eq!(snap.bids[0].quantity, 2.0);
    }
}
