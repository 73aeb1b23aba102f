use thiserror::Error;

use crate::domain::models::types::{OrderId, Price, TypeError};
use crate::domain::services::orderbook::OrderbookError;

pub mod matching_engine;

/// Re-export key types for convenience
pub use self::matching_engine::{CancelResult, MatchResult, MatchingEngine};

/// Errors that can occur during matching engine operations.
///
/// "No match" is never an error: an empty book or a price that does not cross
/// is a successful submission with zero trades.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchingError {
    /// Side outside {BUY, SELL}; rejected before the book is touched
    #[error("Invalid order side: {0}")]
    InvalidOrderSide(String),

    /// Price missing, zero or negative
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// Quantity of zero
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u64),

    /// An order with the same id is already resting
    #[error("Order {0} is already resting in the book")]
    DuplicateOrderId(OrderId),

    /// Resting the order would push its price level's total past `u64::MAX`
    #[error("Order {id} would overflow the total quantity resting at {price}")]
    QuantityOverflow { id: OrderId, price: Price },

    /// Order not resting in the book (unknown, filled or cancelled)
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    /// Orderbook error occurred
    #[error("Orderbook error: {0}")]
    Orderbook(#[from] OrderbookError),

    /// The worker that owns the book is gone
    #[error("Matching engine unavailable: {0}")]
    WorkerUnavailable(String),
}

impl From<TypeError> for MatchingError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidSide(side) => Self::InvalidOrderSide(side),
            TypeError::InvalidPrice(price) => Self::InvalidPrice(price),
            TypeError::InvalidQuantity(quantity) => Self::InvalidQuantity(quantity),
        }
    }
}

/// Type alias for Result with MatchingError
pub type MatchingResult<T> = Result<T, MatchingError>;
