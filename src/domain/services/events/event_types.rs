//--------------------------------------------------------------------------------------------------
// STRUCTS & ENUMS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods       |
// |-------------------------|---------------------------------------------------|-------------------|
// | MatchingEngineEvent     | Event variants for the matching engine            | event_type        |
// | EventError              | Error types for event processing                  |                   |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::models::types::{Order, Trade};

/// Errors that can occur in the event system
#[derive(Error, Debug, Clone)]
pub enum EventError {
    /// Failed to process an event
    #[error("Failed to process event: {0}")]
    ProcessingError(String),
}

/// Type alias for Result with EventError
pub type EventResult<T> = Result<T, EventError>;

/// Represents events that can occur in the matching engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchingEngineEvent {
    /// Generated when the remainder of an order rests on the book
    OrderAdded {
        /// The order as it rests
        order: Order,
        /// Timestamp when the event occurred
        timestamp: DateTime<Utc>,
    },

    /// Generated when an order trades (as taker or maker), partially or fully
    OrderMatched {
        /// The order after the fill
        order: Order,
        /// Quantity of the order filled in this match
        matched_quantity: u64,
        /// Timestamp when the event occurred
        timestamp: DateTime<Utc>,
    },

    /// Generated when an order is cancelled
    OrderCancelled {
        /// The order that was cancelled
        order: Order,
        /// Timestamp when the event occurred
        timestamp: DateTime<Utc>,
    },

    /// Generated when a trade is executed
    TradeExecuted {
        /// The trade that was executed
        trade: Trade,
        /// Timestamp when the event occurred
        timestamp: DateTime<Utc>,
    },
}

impl MatchingEngineEvent {
    pub const ALL_TYPES: [&'static str; 4] =
        ["OrderAdded", "OrderMatched", "OrderCancelled", "TradeExecuted"];

    /// Name of the variant, used to route events to handlers.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::OrderAdded { .. } => "OrderAdded",
            Self::OrderMatched { .. } => "OrderMatched",
            Self::OrderCancelled { .. } => "OrderCancelled",
            Self::TradeExecuted { .. } => "TradeExecuted",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::OrderAdded { timestamp, .. }
            | Self::OrderMatched { timestamp, .. }
            | Self::OrderCancelled { timestamp, .. }
            | Self::TradeExecuted { timestamp, .. } => *timestamp,
        }
    }
}
