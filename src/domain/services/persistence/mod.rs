use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::types::{Order, OrderId, Trade};

pub mod in_memory;

pub use self::in_memory::InMemoryRepository;

/// Storage collaborator for orders and trades.
///
/// The matching engine never waits on storage to decide a match; the worker
/// calls the repository after a command has been applied to the book.
/// Implementations must be thread-safe.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts an order, replacing any previous record with the same id.
    async fn save_order(&self, order: &Order) -> RepositoryResult<()>;

    /// Updates an existing order record.
    ///
    /// # Returns
    /// * `Err(RepositoryError::OrderNotFound)` - If the order was never saved
    async fn update_order(&self, order: &Order) -> RepositoryResult<()>;

    /// Appends trades in the order given.
    async fn save_trades(&self, trades: &[Trade]) -> RepositoryResult<()>;

    async fn get_order(&self, order_id: &OrderId) -> RepositoryResult<Option<Order>>;

    /// Orders with status OPEN or PARTIAL, oldest first.
    async fn open_orders(&self) -> RepositoryResult<Vec<Order>>;

    /// Largest trade sequence saved so far, 0 when no trade has been saved.
    async fn max_trade_sequence(&self) -> RepositoryResult<u64>;
}

/// Errors that can occur while reading or writing orders and trades.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("Order {0} not found in repository")]
    OrderNotFound(OrderId),

    /// The backing store failed
    #[error("Storage error: {0}")]
    Storage(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
use mockall::mock;

#[cfg(test)]
mock! {
    pub OrderRepository {}

    #[async_trait]
    impl OrderRepository for OrderRepository {
        async fn save_order(&self, order: &Order) -> RepositoryResult<()>;
        async fn update_order(&self, order: &Order) -> RepositoryResult<()>;
        async fn save_trades(&self, trades: &[Trade]) -> RepositoryResult<()>;
        async fn get_order(&self, order_id: &OrderId) -> RepositoryResult<Option<Order>>;
        async fn open_orders(&self) -> RepositoryResult<Vec<Order>>;
        async fn max_trade_sequence(&self) -> RepositoryResult<u64>;
    }
}
