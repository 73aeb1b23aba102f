//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                   | Description                               | Key Methods         |
// |------------------------|-------------------------------------------|---------------------|
// | CreateOrderRequest     | Request to create an order                | into_order          |
// | CreateOrderResponse    | Result of a submission                    | from MatchResult    |
// | OrderResponse          | Order details                             | from Order          |
// | CancelOrderResponse    | Result of a cancellation                  |                     |
// | OrderBookResponse      | Top of book plus aggregated depth         | from DepthSnapshot  |
// | TradeResponse          | Trade details                             | from Trade          |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::types::{Order, OrderId, OrderRequest, OrderStatus, Price, Side, Trade, TypeError};
use crate::domain::services::matching_engine::MatchResult;
use crate::domain::services::orderbook::depth::{DepthLevel, DepthSnapshot};

/// Request to create a new limit order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Optional client supplied identifier; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    /// "BUY" or "SELL"
    pub side: String,
    /// Limit price, strictly positive. JSON numbers are read digit for digit, never through f64
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub price: Decimal,
    /// Quantity, strictly positive
    pub quantity: u64,
}

impl CreateOrderRequest {
    /// Validates the request and converts it into an order.
    pub fn into_order(self) -> Result<Order, TypeError> {
        Order::try_from(OrderRequest {
            id: self.id,
            side: self.side,
            price: self.price,
            quantity: self.quantity,
        })
    }
}

/// Response for a trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeResponse {
    pub id: Uuid,
    pub sequence: u64,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub taker_order_id: OrderId,
    pub maker_order_id: OrderId,
    /// Execution price (the maker's price)
    pub price: Price,
    pub quantity: u64,
    pub created_at: DateTime<Utc>,
}

impl From<Trade> for TradeResponse {
    fn from(trade: Trade) -> Self {
        Self {
            id: trade.id,
            sequence: trade.sequence,
            buy_order_id: trade.buy_order_id().clone(),
            sell_order_id: trade.sell_order_id().clone(),
            taker_order_id: trade.taker_order_id,
            maker_order_id: trade.maker_order_id,
            price: trade.price,
            quantity: trade.quantity,
            created_at: trade.created_at,
        }
    }
}

/// Response for a submitted order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub remaining_quantity: u64,
    pub filled_quantity: u64,
    pub trades: Vec<TradeResponse>,
    pub message: String,
}

impl From<MatchResult> for CreateOrderResponse {
    fn from(result: MatchResult) -> Self {
        let message = match result.order.status {
            OrderStatus::Filled => "Order filled",
            OrderStatus::Partial => "Order partially filled, remainder resting",
            _ => "Order placed successfully",
        };

        Self {
            order_id: result.order.id,
            status: result.order.status,
            remaining_quantity: result.order.quantity,
            filled_quantity: result.order.original_quantity - result.order.quantity,
            trades: result.trades.into_iter().map(TradeResponse::from).collect(),
            message: message.to_string(),
        }
    }
}

/// Response for an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub side: Side,
    pub price: Price,
    pub original_quantity: u64,
    pub remaining_quantity: u64,
    pub filled_quantity: u64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            filled_quantity: order.filled_quantity(),
            id: order.id,
            side: order.side,
            price: order.price,
            original_quantity: order.original_quantity,
            remaining_quantity: order.quantity,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Response for a cancelled order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub side: Side,
}

/// Price level in the order book response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceLevelResponse {
    pub price: Price,
    /// Total remaining quantity at this price level
    pub quantity: u64,
    pub order_count: usize,
}

impl From<DepthLevel> for PriceLevelResponse {
    fn from(level: DepthLevel) -> Self {
        Self {
            price: level.price,
            quantity: level.quantity,
            order_count: level.order_count,
        }
    }
}

/// Query parameters for the order book endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderBookQuery {
    /// Number of levels per side
    pub depth: Option<usize>,
}

/// Response for the order book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookResponse {
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub spread: Option<Decimal>,
    /// Bid side price levels (descending order by price)
    pub bids: Vec<PriceLevelResponse>,
    /// Ask side price levels (ascending order by price)
    pub asks: Vec<PriceLevelResponse>,
    pub timestamp: DateTime<Utc>,
}

impl From<DepthSnapshot> for OrderBookResponse {
    fn from(snapshot: DepthSnapshot) -> Self {
        Self {
            best_bid: snapshot.best_bid(),
            best_ask: snapshot.best_ask(),
            spread: snapshot.spread(),
            bids: snapshot.bids.into_iter().map(PriceLevelResponse::from).collect(),
            asks: snapshot.asks.into_iter().map(PriceLevelResponse::from).collect(),
            timestamp: snapshot.timestamp,
        }
    }
}
