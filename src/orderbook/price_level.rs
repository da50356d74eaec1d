//! A single `(side, price)` level: a FIFO queue of resting orders.
//!
//! Orders live in a `HashMap` keyed by id for O(1) lookup/mutation; a
//! `VecDeque` of ids gives FIFO arrival order. Partial fills mutate the
//! order in place without touching the queue. Full fills and cancels remove
//! the id from the map but leave it in the queue; such stale ids are skipped
//! (and popped) lazily the next time they surface at the front, which keeps
//! every queue operation amortised O(1) without an eager O(N) scan.

use super::types::Order;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Default)]
pub struct PriceLevel {
    pub price: f64,
    orders: HashMap<String, Order>,
    queue: VecDeque<String>,
}

impl PriceLevel {
    pub fn new(price: f64) -> Self {
        Self {
            price,
            orders: HashMap::new(),
            queue: VecDeque::new(),
        }
    }

    /// Appends `order` to the tail of the FIFO.
    pub fn push(&mut self, order: Order) {
        self.queue.push_back(order.order_id.clone());
        self.orders.insert(order.order_id.clone(), order);
    }

    /// Removes a specific order by id, wherever it sits in the queue. The
    /// queue slot is left as a stale entry, compacted lazily.
    pub fn remove(&mut self, order_id: &str) -> Option<Order> {
        let removed = self.orders.remove(order_id);
        if removed.is_some() {
            self.compact_front();
        }
        removed
    }

    pub fn get(&self, order_id: &str) -> Option<&Order> {
        self.orders.get(order_id)
    }

    pub fn get_mut(&mut self, order_id: &str) -> Option<&mut Order> {
        self.orders.get_mut(order_id)
    }

    /// True once every order has been removed; the side book drops levels
    /// that reach this state.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn total_quantity(&self) -> f64 {
        self.orders.values().map(|o| o.quantity).sum()
    }

    /// Iterates live orders in FIFO arrival order, skipping stale ids.
    pub fn iter_fifo(&self) -> impl Iterator<Item = &Order> {
        self.queue.iter().filter_map(move |id| self.orders.get(id))
    }

    /// Drops queue entries at the front that no longer have a live order,
    /// bounding the queue's growth relative to the number of live orders.
    fn compact_front(&mut self) {
        while let Some(front) = self.queue.front() {
            if self.orders.contains_key(front) {
                break;
            }
            self.queue.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::types::{Side, TimeInForce};

    fn order(id: &str, qty: f64, ts: f64) -> Order {
        Order {
            order_id: id.into(),
            side: Side::Sell,
            price: 100.0,
            quantity: qty,
            timestamp: ts,
            time_in_force: TimeInForce::Gtc,
            expiry_time: None,
            user_id: None,
        }
    }

    #[test]
    fn fifo_order_is_preserved_across_partial_removal() {
        let mut level = PriceLevel::new(100.0);
        level.push(order("a", 1.0, 1.0));
        level.push(order("b", 1.0, 2.0));
        level.push(order("c", 1.0, 3.0));

        level.remove("a");
        let ids: Vec<&str> = level.iter_fifo().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(level.order_count(), 2);
    }

    #[test]
    fn level_reports_empty_after_all_orders_removed() {
        let mut level = PriceLevel::new(100.0);
        level.push(order("a", 1.0, 1.0));
        level.remove("a");
        assert!(level.is_empty());
    }

    #[test]
    fn total_quantity_sums_live_orders_only() {
        let mut level = PriceLevel::new(100.0);
        level.push(order("a", 2.0, 1.0));
        level.push(order("b", 3.0, 2.0));
        assert_eq!(level.total_quantity(), 5.0);
        level.remove("a");
        assert_eq!(level.total_quantity(), 3.0);
    }
}
