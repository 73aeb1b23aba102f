//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Aggregated, point-in-time views of the book.
//
// | Component       | Description                                                |
// |-----------------|------------------------------------------------------------|
// | DepthLevel      | Aggregated volume information at a specific price          |
// | DepthSnapshot   | Immutable view of the top N levels on each side            |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::models::types::Price;

use super::book_side::BookSide;
use super::price_level::PriceLevel;

/// Represents an aggregated price level in the depth view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevel {
    /// The price for this level
    pub price: Price,
    /// Total remaining quantity at this price level
    pub quantity: u64,
    /// Number of orders at this price level
    pub order_count: usize,
}

impl From<&PriceLevel> for DepthLevel {
    fn from(level: &PriceLevel) -> Self {
        Self {
            price: level.price(),
            quantity: level.total_quantity(),
            order_count: level.order_count(),
        }
    }
}

/// An immutable snapshot of order book depth at a specific point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthSnapshot {
    /// Bid price levels ordered by price descending (best bids first)
    pub bids: Vec<DepthLevel>,
    /// Ask price levels ordered by price ascending (best asks first)
    pub asks: Vec<DepthLevel>,
    /// Timestamp when this snapshot was taken
    pub timestamp: DateTime<Utc>,
}

impl DepthSnapshot {
    pub(crate) fn capture(bids: &BookSide, asks: &BookSide, limit: usize) -> Self {
        Self {
            bids: bids.levels().take(limit).map(DepthLevel::from).collect(),
            asks: asks.levels().take(limit).map(DepthLevel::from).collect(),
            timestamp: Utc::now(),
        }
    }

    /// Returns the best bid price if available
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|level| level.price)
    }

    /// Returns the best ask price if available
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|level| level.price)
    }

    /// Returns the spread (best ask - best bid) if both sides are present
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask.inner() - bid.inner()),
            _ => None,
        }
    }
}
