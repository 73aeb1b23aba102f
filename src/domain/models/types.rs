//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the core data types used throughout the matching engine,
// including orders, trades, prices and the status/side enums.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | ENUMS              | Closed sets of values (Side, OrderStatus).                       |
// | VALUE TYPES        | Price (exact decimal) and OrderId (opaque identifier).           |
// | STRUCTS            | Orders, inbound order requests and trades.                       |
// | Potential Errors   | Errors raised while validating inbound values.                   |
// | TESTS              | Contains unit tests for the defined types.                       |
//--------------------------------------------------------------------------------------------------

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

//--------------------------------------------------------------------------------------------------
//  ENUMS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                 |
// |---------------|---------------------------------------------|
// | Side          | Represents the side of an order (Buy/Sell). |
// | OrderStatus   | Represents the status of an order.          |
//--------------------------------------------------------------------------------------------------

/// Represents the side of an order (Buy or Sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// A buy order, resting on the bid side.
    Buy,
    /// A sell order, resting on the ask side.
    Sell,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            _ => Err(TypeError::InvalidSide(s.to_string())),
        }
    }
}

/// Represents the lifecycle status of an order within the matching engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Accepted and resting with its full original quantity.
    Open,
    /// Some quantity has traded, the remainder is still live.
    Partial,
    /// No quantity remains.
    Filled,
    /// Removed from the book on request.
    Cancelled,
}

impl OrderStatus {
    /// Returns true for statuses an order can never leave.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Partial => "PARTIAL",
            Self::Filled => "FILLED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//--------------------------------------------------------------------------------------------------
//  VALUE TYPES
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                           |
// |---------------|-------------------------------------------------------|
// | Price         | Strictly positive exact decimal, used as a map key.   |
// | OrderId       | Opaque order identifier, never reused.                |
//--------------------------------------------------------------------------------------------------

/// Newtype wrapper for a limit price.
///
/// Backed by `Decimal` and normalized on construction, so `100`, `100.0` and
/// `100.00` are the same key in every price index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Creates a price, rejecting zero and negative values.
    pub fn new(value: Decimal) -> Result<Self, TypeError> {
        if value <= Decimal::ZERO {
            return Err(TypeError::InvalidPrice(value.to_string()));
        }
        Ok(Self(value.normalize()))
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Price {
    type Error = TypeError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl FromStr for Price {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|_| TypeError::InvalidPrice(s.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque identifier of an order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh UUID v4 based identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for OrderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

//--------------------------------------------------------------------------------------------------
//  STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                       |
// |---------------|---------------------------------------------------|
// | Order         | A resting or incoming limit order.                |
// | OrderRequest  | Unvalidated order as received from a caller.      |
// | Trade         | A completed fill between a taker and a maker.     |
//--------------------------------------------------------------------------------------------------

/// Represents a limit order.
///
/// `quantity` is the remaining quantity and only ever decreases. The engine
/// owns `status` and `sequence_id`; callers should not set them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier for the order.
    pub id: OrderId,
    /// Side of the order (Buy or Sell).
    pub side: Side,
    /// Limit price.
    pub price: Price,
    /// Quantity at submission.
    pub original_quantity: u64,
    /// Remaining quantity available to trade.
    pub quantity: u64,
    /// Current status of the order.
    pub status: OrderStatus,
    /// Sequence number assigned by the engine upon acceptance (for time priority).
    pub sequence_id: u64,
    /// Timestamp of order creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update to the order.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new open limit order with the given identifier.
    pub fn new(id: impl Into<OrderId>, side: Side, price: Price, quantity: u64) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            side,
            price,
            original_quantity: quantity,
            quantity,
            status: OrderStatus::Open,
            sequence_id: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Quantity traded so far.
    #[inline]
    pub fn filled_quantity(&self) -> u64 {
        self.original_quantity - self.quantity
    }

    /// Removes `quantity` from the remaining quantity.
    ///
    /// Callers never fill more than what remains; the subtraction is checked so a
    /// violation is caught instead of wrapping.
    pub(crate) fn fill(&mut self, quantity: u64) {
        self.quantity = self
            .quantity
            .checked_sub(quantity)
            .unwrap_or_else(|| panic!("fill of {} exceeds remaining {} on order {}", quantity, self.quantity, self.id));
        self.updated_at = Utc::now();
    }
}

/// An order as received from a caller, before validation.
///
/// The side is kept as free text here; converting into an [`Order`] is the only
/// place an unknown side can be expressed, and it is rejected there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Optional caller supplied identifier; one is generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub side: String,
    pub price: Decimal,
    pub quantity: u64,
}

impl TryFrom<OrderRequest> for Order {
    type Error = TypeError;

    fn try_from(request: OrderRequest) -> Result<Self, Self::Error> {
        let side = Side::from_str(&request.side)?;
        let price = Price::new(request.price)?;
        if request.quantity == 0 {
            return Err(TypeError::InvalidQuantity(request.quantity));
        }
        let id = match request.id {
            Some(id) if !id.trim().is_empty() => OrderId::new(id),
            _ => OrderId::generate(),
        };
        Ok(Order::new(id, side, price, request.quantity))
    }
}

/// Represents a completed trade resulting from matching two orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique identifier for the trade.
    pub id: Uuid,
    /// Engine sequence number of the fill, strictly increasing.
    pub sequence: u64,
    /// ID of the order that matched the resting order (taker).
    pub taker_order_id: OrderId,
    /// ID of the order that was resting on the book (maker).
    pub maker_order_id: OrderId,
    /// Side of the taker.
    pub taker_side: Side,
    /// Execution price, always the maker's price.
    pub price: Price,
    /// Quantity traded.
    pub quantity: u64,
    /// Timestamp when the trade occurred.
    pub created_at: DateTime<Utc>,
}

impl Trade {
    pub fn buy_order_id(&self) -> &OrderId {
        match self.taker_side {
            Side::Buy => &self.taker_order_id,
            Side::Sell => &self.maker_order_id,
        }
    }

    pub fn sell_order_id(&self) -> &OrderId {
        match self.taker_side {
            Side::Buy => &self.maker_order_id,
            Side::Sell => &self.taker_order_id,
        }
    }

    /// Price times quantity, exact.
    pub fn notional(&self) -> Decimal {
        self.price.inner() * Decimal::from(self.quantity)
    }
}

//--------------------------------------------------------------------------------------------------
//  Potential Errors
//--------------------------------------------------------------------------------------------------
/// Represents errors that can occur during type validation or conversion within this module.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// Occurs when attempting to create a `Side` from an unrecognized string.
    #[error("Invalid side specified: {0}")]
    InvalidSide(String),

    /// Occurs when a price is zero, negative or not a decimal.
    #[error("Invalid price specified: {0}")]
    InvalidPrice(String),

    /// Occurs when a quantity is zero.
    #[error("Invalid quantity specified: {0}")]
    InvalidQuantity(u64),
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                            | Description                                   |
// |---------------------------------|-----------------------------------------------|
// | test_side_parsing               | Only BUY and SELL are accepted.               |
// | test_price_normalization        | Equal decimals compare and hash equal.        |
// | test_price_rejects_non_positive | Zero and negative prices are invalid.         |
// | test_order_request_conversion   | Validation of inbound requests.               |
// | test_trade_buy_sell_ids         | Buy/sell ids derived from the taker side.     |
//--------------------------------------------------------------------------------------------------
