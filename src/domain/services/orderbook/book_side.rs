//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// One side of the book: price -> PriceLevel, ordered by a BTreeMap.
//
// | Side | Best price                    | Iteration (best first) |
// |------|-------------------------------|------------------------|
// | Buy  | highest key (`last_key_value`)| descending             |
// | Sell | lowest key (`first_key_value`)| ascending              |
//
// A level whose queue becomes empty is deleted in the same call that emptied
// it, so every key in the map has at least one order of positive quantity.
//--------------------------------------------------------------------------------------------------

use std::collections::BTreeMap;

use crate::domain::models::types::{Order, Price, Side};

use super::price_level::PriceLevel;

#[derive(Debug, Clone)]
pub struct BookSide {
    side: Side,
    levels: BTreeMap<Price, PriceLevel>,
}

impl BookSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Appends the order at the tail of its price level, creating the level if absent.
    pub fn insert(&mut self, order: Order) {
        debug_assert_eq!(order.side, self.side);
        self.levels
            .entry(order.price)
            .or_insert_with(|| PriceLevel::new(order.price))
            .push_back(order);
    }

    /// Removes one order by its location, dropping the level if it empties.
    pub fn remove(&mut self, price: Price, sequence_id: u64) -> Option<Order> {
        let level = self.levels.get_mut(&price)?;
        let order = level.remove(sequence_id)?;
        if level.is_empty() {
            self.levels.remove(&price);
        }
        Some(order)
    }

    pub fn get(&self, price: Price, sequence_id: u64) -> Option<&Order> {
        self.levels.get(&price).and_then(|level| level.get(sequence_id))
    }

    /// Returns the best price level.
    #[inline]
    pub fn best_level(&self) -> Option<&PriceLevel> {
        let level = match self.side {
            Side::Buy => self.levels.last_key_value(),
            Side::Sell => self.levels.first_key_value(),
        }
        .map(|(_, level)| level)?;

        assert!(!level.is_empty(), "empty {} level at {} left in book", self.side, level.price());
        Some(level)
    }

    /// Returns the order at the head of the best price's queue.
    pub fn best(&self) -> Option<&Order> {
        let order = self.best_level()?.front()?;
        assert!(order.quantity > 0, "zero quantity order {} resting", order.id);
        Some(order)
    }

    #[inline]
    pub fn best_price(&self) -> Option<Price> {
        self.best_level().map(PriceLevel::price)
    }

    /// Fills `quantity` against the best order and returns the maker's new state.
    ///
    /// The level is dropped when the fill empties it.
    pub fn fill_best(&mut self, quantity: u64) -> Option<Order> {
        let price = self.best_price()?;
        let level = self.levels.get_mut(&price)?;
        let maker = level.fill_front(quantity)?;
        if level.is_empty() {
            self.levels.remove(&price);
        }
        Some(maker)
    }

    /// Iterates price levels best first.
    pub fn levels(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        match self.side {
            Side::Buy => Box::new(self.levels.values().rev()),
            Side::Sell => Box::new(self.levels.values()),
        }
    }

    pub fn level(&self, price: Price) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn order_count(&self) -> usize {
        self.levels.values().map(PriceLevel::order_count).sum()
    }

    /// Quantity across all levels. Each level fits a u64, the side as a whole may not.
    pub fn total_quantity(&self) -> u128 {
        self.levels
            .values()
            .map(|level| u128::from(level.total_quantity()))
            .sum()
    }
}
