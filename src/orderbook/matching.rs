//! The matching algorithm: crossing predicate, FOK pre-check, and the
//! price-time priority matching loop.

use super::side_book::SideBook;
use super::trade::{FeeSchedule, Trade};
use super::types::{Order, Side};

fn crosses(taker_side: Side, taker_price: f64, level_price: f64) -> bool {
    match taker_side {
        Side::Buy => level_price <= taker_price,
        Side::Sell => level_price >= taker_price,
    }
}

/// Walks the opposite side, without mutating it, accumulating quantity
/// available at acceptable prices. Returns `true` once that sum reaches
/// `taker_quantity`, short-circuiting before scanning the whole book.
pub fn fok_precheck(
    taker_side: Side,
    taker_price: f64,
    taker_quantity: f64,
    opposite: &SideBook,
    price_improvement: bool,
) -> bool {
    let mut available = 0.0;
    for level in opposite.iter_from_best() {
        let crossed = crosses(taker_side, taker_price, level.price);
        if !crossed && !price_improvement {
            break;
        }
        available += level.total_quantity();
        if available >= taker_quantity {
            return true;
        }
    }
    available >= taker_quantity
}

/// Runs the matching loop for `taker` against `opposite`, mutating both the
/// taker's quantity and the opposite side book in place. Returns the trades
/// produced, in the order they were generated, and the ids of maker orders
/// that were fully consumed (for the caller to drop from its own indices).
pub fn run_matching_loop(
    taker: &mut Order,
    opposite: &mut SideBook,
    price_improvement: bool,
    fees: FeeSchedule,
    now: f64,
    next_trade_id: &mut impl FnMut() -> String,
) -> (Vec<Trade>, Vec<String>) {
    let mut trades = Vec::new();
    let mut exhausted_makers = Vec::new();

    while taker.quantity > 0.0 {
        let Some(best_price) = opposite.best() else {
            break;
        };
        if !crosses(taker.side, taker.price, best_price) && !price_improvement {
            break;
        }

        let maker_ids: Vec<String> = match opposite.level_at(best_price) {
            Some(level) => level.iter_fifo().map(|o| o.order_id.clone()).collect(),
            None => break,
        };

        for maker_id in maker_ids {
            if taker.quantity <= 0.0 {
                break;
            }
            let (maker_user_id, taker_fill_qty) = {
                let Some(maker) = opposite.get_mut(&maker_id) else {
                    continue; // stale id left behind by an earlier partial removal
                };
                let q = taker.quantity.min(maker.quantity);
                maker.quantity -= q;
                (maker.user_id.clone(), q)
            };

            taker.quantity -= taker_fill_qty;
            trades.push(Trade {
                trade_id: next_trade_id(),
                maker_order_id: maker_id.clone(),
                taker_order_id: taker.order_id.clone(),
                price: best_price,
                quantity: taker_fill_qty,
                timestamp: now,
                maker_fee: fees.maker_fee(best_price * taker_fill_qty),
                taker_fee: fees.taker_fee(best_price * taker_fill_qty),
                maker_user_id,
                taker_user_id: taker.user_id.clone(),
            });

            let exhausted = opposite
                .get(&maker_id)
                .map(|m| m.quantity <= 0.0)
                .unwrap_or(true);
            if exhausted {
                opposite.remove(&maker_id);
                exhausted_makers.push(maker_id);
            }
        }
        opposite.drop_level_if_empty(best_price);
    }

    (trades, exhausted_makers)
}
