//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements a limit order book for a single trading instrument.
// It maintains bid and ask orders in price-time priority (FIFO) order.
//
// | Component    | Description                                                               |
// |--------------|---------------------------------------------------------------------------|
// | OrderBook    | Main order book structure managing bids and asks                          |
// | BookSide     | Price-ordered levels of one side                                          |
// | PriceLevel   | Orders at the same price, processed first-in-first-out                    |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                               | Return Type                  |
// |-----------------------|-------------------------------------------|------------------------------|
// | add_order             | Adds order at the tail of its level       | Result<(), OrderbookError>   |
// | remove_order          | Removes order by id                       | Option<Order>                |
// | peek_best_order       | Gets next order without removing it       | Option<&Order>               |
// | fill_best             | Fills against the head of the best level  | Option<Order>                |
// | best_bid / best_ask   | Best prices                               | Option<Price>                |
// | spread                | Current spread                            | Option<Decimal>              |
// | depth                 | Aggregated top-of-book snapshot           | DepthSnapshot                |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::domain::models::types::{Order, OrderId, Price, Side};

use super::OrderbookError;
use super::book_side::BookSide;
use super::depth::DepthSnapshot;
use super::price_level::PriceLevel;

/// The main order book structure that maintains bid and ask orders in price-time priority.
///
/// Every resting order is reachable from exactly one price level and from
/// `order_map`, which records where it rests. The two are updated together.
#[derive(Debug, Clone)]
pub struct OrderBook {
    /// Bid side orders, best (highest) price first
    bids: BookSide,
    /// Ask side orders, best (lowest) price first
    asks: BookSide,
    /// Location of every resting order: (side, price, sequence id)
    order_map: HashMap<OrderId, (Side, Price, u64)>,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBook {
    /// Creates a new empty order book.
    pub fn new() -> Self {
        Self {
            bids: BookSide::new(Side::Buy),
            asks: BookSide::new(Side::Sell),
            order_map: HashMap::new(),
        }
    }

    #[inline]
    fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    #[inline]
    fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Gets an order by its ID.
    ///
    /// # Returns
    /// * `Some(&Order)` - Reference to the resting order
    /// * `None` - If no order with that ID is resting
    pub fn get_order_by_id(&self, order_id: &OrderId) -> Option<&Order> {
        let (side, price, sequence_id) = self.order_map.get(order_id)?;
        self.side(*side).get(*price, *sequence_id)
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.order_map.contains_key(order_id)
    }

    /// Adds an order at the back of the queue for its price.
    ///
    /// # Errors
    /// * `ZeroQuantity` - the order has nothing left to trade
    /// * `TerminalStatus` - the order is already filled or cancelled
    /// * `DuplicateOrder` - an order with the same id is already resting
    /// * `QuantityOverflow` - the level's total quantity would exceed `u64::MAX`
    pub fn add_order(&mut self, order: Order) -> Result<(), OrderbookError> {
        if order.quantity == 0 {
            return Err(OrderbookError::ZeroQuantity(order.id));
        }
        if order.status.is_terminal() {
            return Err(OrderbookError::TerminalStatus {
                id: order.id,
                status: order.status,
            });
        }
        if self.order_map.contains_key(&order.id) {
            return Err(OrderbookError::DuplicateOrder(order.id));
        }
        let fits = self
            .side(order.side)
            .level(order.price)
            .is_none_or(|level| level.can_hold(order.quantity));
        if !fits {
            return Err(OrderbookError::QuantityOverflow {
                id: order.id,
                price: order.price,
            });
        }

        self.order_map
            .insert(order.id.clone(), (order.side, order.price, order.sequence_id));
        self.side_mut(order.side).insert(order);
        Ok(())
    }

    /// Removes an order from the order book.
    ///
    /// A missing id is an ordinary outcome (the order may already have been
    /// filled), so it is reported as `None` rather than an error.
    pub fn remove_order(&mut self, order_id: &OrderId) -> Option<Order> {
        let (side, price, sequence_id) = self.order_map.remove(order_id)?;
        let order = self.side_mut(side).remove(price, sequence_id);
        assert!(order.is_some(), "index entry for {} points at no order", order_id);
        order
    }

    /// Gets the next order to be matched on `side` without removing it from the book.
    ///
    /// # Notes
    /// - For bids, returns the highest priced order
    /// - For asks, returns the lowest priced order
    /// - Within a price level, returns the first order (FIFO)
    #[inline]
    pub fn peek_best_order(&self, side: Side) -> Option<&Order> {
        self.side(side).best()
    }

    /// Fills `quantity` against the best order on `side`.
    ///
    /// Returns the maker's state after the fill. A maker that reaches zero is no
    /// longer in the book when this returns.
    pub fn fill_best(&mut self, side: Side, quantity: u64) -> Option<Order> {
        let maker = self.side_mut(side).fill_best(quantity)?;
        if maker.quantity == 0 {
            self.order_map.remove(&maker.id);
        }
        Some(maker)
    }

    /// Gets the best bid order (highest price, oldest first).
    #[inline]
    pub fn get_best_bid(&self) -> Option<&Order> {
        self.peek_best_order(Side::Buy)
    }

    /// Gets the best ask order (lowest price, oldest first).
    #[inline]
    pub fn get_best_ask(&self) -> Option<&Order> {
        self.peek_best_order(Side::Sell)
    }

    #[inline]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best_price()
    }

    #[inline]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best_price()
    }

    /// Returns the spread between the best ask and best bid prices.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask.inner() - bid.inner()),
            _ => None,
        }
    }

    /// Returns the total remaining quantity at a price level.
    pub fn volume_at_price(&self, side: Side, price: Price) -> Option<u64> {
        self.side(side).level(price).map(PriceLevel::total_quantity)
    }

    pub fn order_count_at_price(&self, side: Side, price: Price) -> usize {
        self.side(side).level(price).map_or(0, PriceLevel::order_count)
    }

    /// Orders resting at a price, in time priority.
    pub fn orders_at_price(&self, side: Side, price: Price) -> Vec<&Order> {
        self.side(side)
            .level(price)
            .map(|level| level.iter().collect())
            .unwrap_or_default()
    }

    /// Number of distinct price levels on a side.
    pub fn level_count(&self, side: Side) -> usize {
        self.side(side).level_count()
    }

    /// Aggregated view of the top `limit` levels of each side.
    pub fn depth(&self, limit: usize) -> DepthSnapshot {
        DepthSnapshot::capture(&self.bids, &self.asks, limit)
    }

    /// Total number of resting orders.
    pub fn len(&self) -> usize {
        self.order_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order_map.is_empty()
    }

    /// All resting orders, bids then asks, each side best price first and FIFO within a price.
    pub fn resting_orders(&self) -> impl Iterator<Item = &Order> {
        self.bids
            .levels()
            .chain(self.asks.levels())
            .flat_map(PriceLevel::iter)
    }
}
