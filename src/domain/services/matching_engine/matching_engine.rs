//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the core matching engine logic for processing orders and generating trades.
// The matching engine follows price-time priority to ensure fair order execution.
//
// | Component                | Description                                               |
// |--------------------------|-----------------------------------------------------------|
// | MatchingEngine           | Owns the book, sequences orders and runs the match loop   |
// | MatchResult              | Represents the outcome of a submission                    |
// | CancelResult             | Represents the outcome of a cancellation                  |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Return Type           |
// |-------------------------|---------------------------------------------------|-----------------------|
// | submit                  | Match a new limit order and rest the remainder    | MatchingResult<..>    |
// | cancel                  | Remove a resting order                            | CancelResult          |
// | restore                 | Rebuild the book from previously open orders      | usize                 |
// | best_bid / best_ask     | Head of the best level on each side               | Option<&Order>        |
// | find_order              | Resting order by id                               | Option<&Order>        |
//--------------------------------------------------------------------------------------------------

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::models::types::{Order, OrderId, OrderStatus, Price, Side, Trade};
use crate::domain::services::orderbook::depth::DepthSnapshot;
use crate::domain::services::orderbook::orderbook::OrderBook;

use super::{MatchingError, MatchingResult};

/// Represents the outcome of a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// The incoming order after matching; its status is the final status
    pub order: Order,

    /// Trades generated, in the order the fills occurred
    pub trades: Vec<Trade>,

    /// Resting orders touched by this match, in fill order, with their new state
    pub affected_orders: Vec<Order>,
}

impl MatchResult {
    pub fn final_status(&self) -> OrderStatus {
        self.order.status
    }

    /// Sum of all trade quantities.
    pub fn filled_quantity(&self) -> u64 {
        self.trades.iter().map(|trade| trade.quantity).sum()
    }
}

/// Represents the outcome of a cancellation.
#[derive(Debug, Clone, PartialEq)]
pub struct CancelResult {
    pub found: bool,
    pub side: Option<Side>,
    /// The removed order, marked `Cancelled`
    pub order: Option<Order>,
}

impl CancelResult {
    fn not_found() -> Self {
        Self {
            found: false,
            side: None,
            order: None,
        }
    }
}

/// Returns true when an incoming order at `limit` can trade against a resting `price`.
#[inline]
fn crosses(side: Side, limit: Price, resting: Price) -> bool {
    match side {
        Side::Buy => limit >= resting,
        Side::Sell => limit <= resting,
    }
}

/// The core matching engine responsible for processing orders and generating trades.
///
/// # Price-Time Priority
///
/// * Better prices are matched first (higher bids, lower asks)
/// * At the same price level, orders are matched in the order they were accepted (FIFO)
///
/// The engine is a plain owned value with no interior locking. Callers that
/// share it across tasks go through [`OrderBookWorker`], which gives it a single
/// writer.
///
/// [`OrderBookWorker`]: crate::domain::services::orderbook::orderbook_worker::OrderBookWorker
#[derive(Debug, Clone)]
pub struct MatchingEngine {
    /// The order book this engine is managing
    order_book: OrderBook,

    /// Sequence counter for assigning order priorities
    next_sequence_id: u64,

    /// Sequence counter for trades
    next_trade_sequence: u64,
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingEngine {
    /// Creates a new matching engine with an empty book.
    pub fn new() -> Self {
        Self {
            order_book: OrderBook::new(),
            next_sequence_id: 1,
            next_trade_sequence: 1,
        }
    }

    /// Processes a new limit order.
    ///
    /// The order is assigned the next sequence id, matched against the opposite
    /// side while prices cross, and any remainder rests on its own side at the
    /// tail of its price level.
    ///
    /// # Errors
    ///
    /// Returns `MatchingError` before any book mutation if:
    /// * The quantity is zero (`InvalidQuantity`)
    /// * An order with the same id is already resting (`DuplicateOrderId`)
    /// * Resting the order could push its price level past `u64::MAX` (`QuantityOverflow`)
    pub fn submit(&mut self, mut order: Order) -> MatchingResult<MatchResult> {
        if order.quantity == 0 {
            return Err(MatchingError::InvalidQuantity(order.quantity));
        }
        if self.order_book.contains(&order.id) {
            return Err(MatchingError::DuplicateOrderId(order.id));
        }
        // Matching only touches the other side, so the remainder lands on a level
        // whose total is known now. Reject before any fill if it could not be held.
        let resting = self.order_book.volume_at_price(order.side, order.price).unwrap_or(0);
        if resting.checked_add(order.quantity).is_none() {
            return Err(MatchingError::QuantityOverflow {
                id: order.id,
                price: order.price,
            });
        }

        order.sequence_id = self.next_sequence_id;
        self.next_sequence_id += 1;
        order.original_quantity = order.quantity;
        order.status = OrderStatus::Open;

        let (trades, affected_orders) = self.match_order(&mut order);

        if order.quantity == 0 {
            order.status = OrderStatus::Filled;
        } else {
            order.status = if order.quantity < order.original_quantity {
                OrderStatus::Partial
            } else {
                OrderStatus::Open
            };
            self.order_book.add_order(order.clone())?;
            debug!(
                order_id = %order.id,
                side = %order.side,
                price = %order.price,
                quantity = order.quantity,
                "order resting"
            );
        }

        debug!(
            order_id = %order.id,
            trades = trades.len(),
            status = %order.status,
            "order processed"
        );

        Ok(MatchResult {
            order,
            trades,
            affected_orders,
        })
    }

    /// Matches an order against the opposite side of the book.
    ///
    /// Levels are visited strictly best to worst, so the first resting order that
    /// does not cross ends the loop: nothing further along can cross either.
    fn match_order(&mut self, order: &mut Order) -> (Vec<Trade>, Vec<Order>) {
        let opposite_side = order.side.opposite();
        let mut trades = Vec::new();
        let mut affected = Vec::new();

        while order.quantity > 0 {
            let Some(best) = self.order_book.peek_best_order(opposite_side) else {
                break;
            };
            if !crosses(order.side, order.price, best.price) {
                break;
            }

            let fill_quantity = order.quantity.min(best.quantity);
            let Some(maker) = self.order_book.fill_best(opposite_side, fill_quantity) else {
                unreachable!("best {} order vanished during fill", opposite_side);
            };
            order.fill(fill_quantity);

            let trade = Trade {
                id: Uuid::new_v4(),
                sequence: self.next_trade_sequence,
                taker_order_id: order.id.clone(),
                maker_order_id: maker.id.clone(),
                taker_side: order.side,
                price: maker.price,
                quantity: fill_quantity,
                created_at: Utc::now(),
            };
            self.next_trade_sequence += 1;

            debug!(
                taker = %trade.taker_order_id,
                maker = %trade.maker_order_id,
                price = %trade.price,
                quantity = trade.quantity,
                "trade executed"
            );

            trades.push(trade);
            affected.push(maker);
        }

        (trades, affected)
    }

    /// Cancels a resting order.
    ///
    /// Unknown ids, and ids of orders that are already filled or cancelled,
    /// come back with `found == false`.
    pub fn cancel(&mut self, order_id: &OrderId) -> CancelResult {
        let Some(mut order) = self.order_book.remove_order(order_id) else {
            return CancelResult::not_found();
        };

        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        debug!(order_id = %order.id, side = %order.side, "order cancelled");

        CancelResult {
            found: true,
            side: Some(order.side),
            order: Some(order),
        }
    }

    /// Rebuilds the book from orders that were open or partially filled before a restart.
    ///
    /// Orders are inserted without matching, in their stored sequence order and
    /// keeping their stored sequence ids. An id that does not come after the
    /// previous one (missing or duplicated) is moved up just enough to keep the
    /// queue strictly ordered. Terminal, empty and duplicate orders are skipped.
    /// New submissions continue after the largest restored sequence id.
    ///
    /// # Returns
    /// The orders placed on the book, as they now rest
    pub fn restore<I>(&mut self, orders: I) -> Vec<Order>
    where
        I: IntoIterator<Item = Order>,
    {
        let mut orders: Vec<Order> = orders.into_iter().collect();
        orders.sort_by(|a, b| {
            a.sequence_id
                .cmp(&b.sequence_id)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });

        let mut restored = Vec::with_capacity(orders.len());
        for mut order in orders {
            if order.quantity == 0 || order.status.is_terminal() {
                warn!(order_id = %order.id, status = %order.status, "skipping non-resting order on restore");
                continue;
            }

            let stored_sequence = order.sequence_id;
            order.sequence_id = stored_sequence.max(self.next_sequence_id);
            if order.sequence_id != stored_sequence {
                warn!(
                    order_id = %order.id,
                    stored = stored_sequence,
                    assigned = order.sequence_id,
                    "restored order resequenced"
                );
            }
            order.status = if order.quantity < order.original_quantity {
                OrderStatus::Partial
            } else {
                OrderStatus::Open
            };

            match self.order_book.add_order(order.clone()) {
                Ok(()) => {
                    self.next_sequence_id = order.sequence_id + 1;
                    restored.push(order);
                }
                Err(err) => warn!(error = %err, "skipping order on restore"),
            }
        }

        if let (Some(bid), Some(ask)) = (self.order_book.best_bid(), self.order_book.best_ask()) {
            if bid >= ask {
                warn!(%bid, %ask, "restored book is crossed");
            }
        }
        info!(
            restored = restored.len(),
            next_sequence_id = self.next_sequence_id,
            "order book restored"
        );
        restored
    }

    /// Continues trade numbering after `last_sequence`, the largest trade
    /// sequence already recorded. Never moves the counter backwards.
    pub fn resume_trade_sequence(&mut self, last_sequence: u64) {
        self.next_trade_sequence = self.next_trade_sequence.max(last_sequence + 1);
    }

    /// Best resting buy order (highest price, oldest first).
    pub fn best_bid(&self) -> Option<&Order> {
        self.order_book.get_best_bid()
    }

    /// Best resting sell order (lowest price, oldest first).
    pub fn best_ask(&self) -> Option<&Order> {
        self.order_book.get_best_ask()
    }

    pub fn find_order(&self, order_id: &OrderId) -> Option<&Order> {
        self.order_book.get_order_by_id(order_id)
    }

    pub fn spread(&self) -> Option<Decimal> {
        self.order_book.spread()
    }

    pub fn depth(&self, limit: usize) -> DepthSnapshot {
        self.order_book.depth(limit)
    }

    /// Number of resting orders.
    pub fn order_count(&self) -> usize {
        self.order_book.len()
    }

    /// Gets the current state of the order book.
    pub fn order_book(&self) -> &OrderBook {
        &self.order_book
    }
}
