use thiserror::Error;

use crate::domain::models::types::{OrderId, OrderStatus, Price};

pub mod book_side;
pub mod depth;
pub mod orderbook;
pub mod orderbook_worker;
pub mod price_level;

/// Errors that can occur within the orderbook service.
///
/// These are raised when an order cannot be placed on the book at all. Lookups
/// and removals of unknown ids are not errors and return `None` instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrderbookError {
    /// An order with the same id is already resting
    #[error("Order {0} is already in the orderbook")]
    DuplicateOrder(OrderId),

    /// Orders with nothing left to trade never rest
    #[error("Order {0} has zero quantity")]
    ZeroQuantity(OrderId),

    /// Filled or cancelled orders never rest
    #[error("Order {id} is {status} and cannot rest")]
    TerminalStatus { id: OrderId, status: OrderStatus },

    /// The level's total quantity would no longer fit in a u64
    #[error("Order {id} would overflow the total quantity resting at {price}")]
    QuantityOverflow { id: OrderId, price: Price },
}
