//! One side (bids or asks) of a symbol's book: a price-ordered map of
//! levels plus an `order_id -> price` index for O(1) removal by id.

use super::price_level::PriceLevel;
use super::types::{Order, Side};
use ordered_float::OrderedFloat;
use std::collections::{BTreeMap, HashMap};

pub struct SideBook {
    side: Side,
    levels: BTreeMap<OrderedFloat<f64>, PriceLevel>,
    order_price: HashMap<String, OrderedFloat<f64>>,
}

impl SideBook {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            order_price: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn order_count(&self) -> usize {
        self.order_price.len()
    }

    /// Places `order` at the tail of its price level's FIFO, creating the
    /// level if this is the first order at that price.
    pub fn insert(&mut self, order: Order) {
        let key = OrderedFloat(order.price);
        self.order_price.insert(order.order_id.clone(), key);
        self.levels
            .entry(key)
            .or_insert_with(|| PriceLevel::new(order.price))
            .push(order);
    }

    /// Removes an order by id. Destroys the level if it is now empty.
    pub fn remove(&mut self, order_id: &str) -> Option<Order> {
        let key = self.order_price.remove(order_id)?;
        let level = self.levels.get_mut(&key)?;
        let removed = level.remove(order_id);
        if level.is_empty() {
            self.levels.remove(&key);
        }
        removed
    }

    pub fn get(&self, order_id: &str) -> Option<&Order> {
        let key = self.order_price.get(order_id)?;
        self.levels.get(key)?.get(order_id)
    }

    pub fn get_mut(&mut self, order_id: &str) -> Option<&mut Order> {
        let key = self.order_price.get(order_id)?;
        self.levels.get_mut(key)?.get_mut(order_id)
    }

    /// Best price: highest for bids, lowest for asks. `None` if empty.
    pub fn best(&self) -> Option<f64> {
        match self.side {
            Side::Buy => self.levels.keys().next_back().map(|k| k.0),
            Side::Sell => self.levels.keys().next().map(|k| k.0),
        }
    }

    pub fn level_at(&self, price: f64) -> Option<&PriceLevel> {
        self.levels.get(&OrderedFloat(price))
    }

    pub fn level_at_mut(&mut self, price: f64) -> Option<&mut PriceLevel> {
        self.levels.get_mut(&OrderedFloat(price))
    }

    /// Removes an order's id-index entry without touching the level. Used
    /// by the matching loop, which removes orders from their level directly
    /// while walking it and must keep the id index in sync.
    pub fn forget_id(&mut self, order_id: &str) {
        self.order_price.remove(order_id);
    }

    /// Drops a level entirely once the matching loop has emptied it.
    pub fn drop_level_if_empty(&mut self, price: f64) {
        let key = OrderedFloat(price);
        if self.levels.get(&key).is_some_and(PriceLevel::is_empty) {
            self.levels.remove(&key);
        }
    }

    /// Levels in matching order: asks ascending, bids descending.
    pub fn iter_from_best(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        match self.side {
            Side::Buy => Box::new(self.levels.values().rev()),
            Side::Sell => Box::new(self.levels.values()),
        }
    }

    pub fn clear(&mut self) {
        self.levels.clear();
        self.order_price.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::types::TimeInForce;

    fn order(id: &str, side: Side, price: f64, qty: f64, ts: f64) -> Order {
        Order {
            order_id: id.into(),
            side,
            price,
            quantity: qty,
            timestamp: ts,
            time_in_force: TimeInForce::Gtc,
            expiry_time: None,
            user_id: None,
        }
    }

    #[test]
    fn bids_best_is_highest_price() {
        let mut book = SideBook::new(Side::Buy);
        book.insert(order("a", Side::Buy, 99.0, 1.0, 1.0));
        book.insert(order("b", Side::Buy, 100.0, 1.0, 2.0));
        assert_eq!(book.best(), Some(100.0));
    }

    #[test]
    fn asks_best_is_lowest_price() {
        let mut book = SideBook::new(Side::Sell);
        book.insert(order("a", Side::Sell, 101.0, 1.0, 1.0));
        book.insert(order("b", Side::Sell, 100.0, 1.0, 2.0));
        assert_eq!(book.best(), Some(100.0));
    }

    #[test]
    fn removing_last_order_at_a_price_destroys_the_level() {
        let mut book = SideBook::new(Side::Buy);
        book.insert(order("a", Side::Buy, 100.0, 1.0, 1.0));
        assert_eq!(book.level_count(), 1);
        book.remove("a");
        assert_eq!(book.level_count(), 0);
        assert_eq!(book.best(), None);
    }

    #[test]
    fn iter_from_best_orders_bids_descending_and_asks_ascending() {
        let mut bids = SideBook::new(Side::Buy);
        bids.insert(order("a", Side::Buy, 99.0, 1.0, 1.0));
        bids.insert(order("b", Side::Buy, 100.0, 1.0, 2.0));
        let prices: Vec<f64> = bids.iter_from_best().map(|l| l.price).collect();
        assert_eq!(prices, vec![100.0, 99.0]);

        let mut asks = SideBook::new(Side::Sell);
        asks.insert(order("c", Side::Sell, 101.0, 1.0, 1.0));
        asks.insert(order("d", Side::Sell, 100.0, 1.0, 2.0));
        let prices: Vec<f64> = asks.iter_from_best().map(|l| l.price).collect();
        assert_eq!(prices, vec![100.0, 101.0]);
    }
}
