//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Process-local implementation of OrderRepository. Used by the binary when no
// external store is configured, and by tests.
//
// | Component            | Description                                          |
// |----------------------|------------------------------------------------------|
// | InMemoryRepository   | Orders keyed by id plus an append-only trade log     |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::models::types::{Order, OrderId, OrderStatus, Trade};

use super::{OrderRepository, RepositoryError, RepositoryResult};

/// Orders and trades held in memory behind `parking_lot` locks.
///
/// Locks are never held across an await point.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    orders: RwLock<HashMap<OrderId, Order>>,
    trades: RwLock<Vec<Trade>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the repository, e.g. with orders left open by a previous run.
    pub fn with_orders<I: IntoIterator<Item = Order>>(orders: I) -> Self {
        let repository = Self::new();
        {
            let mut map = repository.orders.write();
            for order in orders {
                map.insert(order.id.clone(), order);
            }
        }
        repository
    }

    /// All trades saved so far, in save order.
    pub fn trades(&self) -> Vec<Trade> {
        self.trades.read().clone()
    }

    /// Trades in which `order_id` took part, as taker or maker.
    pub fn trades_for_order(&self, order_id: &OrderId) -> Vec<Trade> {
        self.trades
            .read()
            .iter()
            .filter(|trade| &trade.taker_order_id == order_id || &trade.maker_order_id == order_id)
            .cloned()
            .collect()
    }

    pub fn order_count(&self) -> usize {
        self.orders.read().len()
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepository {
    async fn save_order(&self, order: &Order) -> RepositoryResult<()> {
        self.orders.write().insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn update_order(&self, order: &Order) -> RepositoryResult<()> {
        let mut orders = self.orders.write();
        match orders.get_mut(&order.id) {
            Some(existing) => {
                *existing = order.clone();
                Ok(())
            }
            None => Err(RepositoryError::OrderNotFound(order.id.clone())),
        }
    }

    async fn save_trades(&self, trades: &[Trade]) -> RepositoryResult<()> {
        self.trades.write().extend_from_slice(trades);
        Ok(())
    }

    async fn get_order(&self, order_id: &OrderId) -> RepositoryResult<Option<Order>> {
        Ok(self.orders.read().get(order_id).cloned())
    }

    async fn open_orders(&self) -> RepositoryResult<Vec<Order>> {
        let mut open: Vec<Order> = self
            .orders
            .read()
            .values()
            .filter(|order| matches!(order.status, OrderStatus::Open | OrderStatus::Partial))
            .cloned()
            .collect();
        open.sort_by(|a, b| {
            a.sequence_id
                .cmp(&b.sequence_id)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(open)
    }

    async fn max_trade_sequence(&self) -> RepositoryResult<u64> {
        Ok(self
            .trades
            .read()
            .iter()
            .map(|trade| trade.sequence)
            .max()
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::types::{Price, Side};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tokio_test::block_on;
    use uuid::Uuid;

    fn order(id: &str, sequence_id: u64, status: OrderStatus) -> Order {
        let mut order = Order::new(id, Side::Sell, Price::new(dec!(10)).unwrap(), 3);
        order.sequence_id = sequence_id;
        order.status = status;
        order
    }

    #[test]
    fn test_save_and_get() {
        let repository = InMemoryRepository::new();
        block_on(repository.save_order(&order("a", 1, OrderStatus::Open))).unwrap();

        let found = block_on(repository.get_order(&OrderId::from("a"))).unwrap();
        assert_eq!(found.unwrap().sequence_id, 1);
        assert!(block_on(repository.get_order(&OrderId::from("b"))).unwrap().is_none());
    }

    #[test]
    fn test_update_requires_existing_order() {
        let repository = InMemoryRepository::new();
        let mut a = order("a", 1, OrderStatus::Open);

        assert_eq!(
            block_on(repository.update_order(&a)),
            Err(RepositoryError::OrderNotFound(OrderId::from("a")))
        );

        block_on(repository.save_order(&a)).unwrap();
        a.status = OrderStatus::Filled;
        block_on(repository.update_order(&a)).unwrap();
        let stored = block_on(repository.get_order(&a.id)).unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Filled);
    }

    #[test]
    fn test_open_orders_filters_and_sorts() {
        let repository = InMemoryRepository::with_orders(vec![
            order("late", 7, OrderStatus::Partial),
            order("done", 2, OrderStatus::Filled),
            order("early", 3, OrderStatus::Open),
            order("gone", 4, OrderStatus::Cancelled),
        ]);

        let open = block_on(repository.open_orders()).unwrap();
        let ids: Vec<&str> = open.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    fn trade(sequence: u64, maker: &str) -> Trade {
        Trade {
            id: Uuid::new_v4(),
            sequence,
            taker_order_id: OrderId::from("b1"),
            maker_order_id: OrderId::from(maker),
            taker_side: Side::Buy,
            price: Price::new(dec!(10)).unwrap(),
            quantity: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_trades_for_order() {
        let repository = InMemoryRepository::new();
        let trade = trade(1, "s1");
        block_on(repository.save_trades(&[trade.clone()])).unwrap();

        assert_eq!(repository.trades_for_order(&OrderId::from("s1")), vec![trade]);
        assert!(repository.trades_for_order(&OrderId::from("x")).is_empty());
    }

    #[test]
    fn test_max_trade_sequence() {
        let repository = InMemoryRepository::new();
        assert_eq!(block_on(repository.max_trade_sequence()).unwrap(), 0);

        block_on(repository.save_trades(&[trade(4, "s1"), trade(9, "s2")])).unwrap();
        block_on(repository.save_trades(&[trade(7, "s3")])).unwrap();
        assert_eq!(block_on(repository.max_trade_sequence()).unwrap(), 9);
    }
}
