//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// A price level holds every resting order at one price in time priority.
//
// Orders are keyed by their engine sequence id in a BTreeMap, so the head of
// the queue is the smallest key and an order can be taken out of the middle
// of the queue in O(log n) once its sequence id is known (the book keeps an
// id -> (side, price, sequence) index for that).
//--------------------------------------------------------------------------------------------------

use std::collections::BTreeMap;

use crate::domain::models::types::{Order, OrderStatus, Price};

/// Represents a price level in the order book, maintaining a FIFO queue of orders
/// at the same price point.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// The price for this level
    price: Price,
    /// FIFO queue of orders at this price level, keyed by sequence id
    orders: BTreeMap<u64, Order>,
    /// Total remaining quantity of all orders at this price level
    total_quantity: u64,
}

impl PriceLevel {
    /// Creates a new empty price level with the given price.
    pub fn new(price: Price) -> Self {
        Self {
            price,
            orders: BTreeMap::new(),
            total_quantity: 0,
        }
    }

    #[inline]
    pub fn price(&self) -> Price {
        self.price
    }

    /// Appends an order at the tail of the queue.
    ///
    /// # Panics
    /// If the order's price differs from the level, its quantity is zero, its
    /// sequence id does not come after every order already queued, or the level
    /// cannot hold its quantity (see `can_hold`). Callers check these first.
    pub fn push_back(&mut self, order: Order) {
        assert_eq!(order.price, self.price, "order {} queued at wrong level", order.id);
        assert!(order.quantity > 0, "zero quantity order {} cannot rest", order.id);
        assert!(
            self.can_hold(order.quantity),
            "order {} overflows level {}",
            order.id,
            self.price
        );
        if let Some((&last, _)) = self.orders.last_key_value() {
            assert!(
                order.sequence_id > last,
                "sequence {} of order {} is not after tail {}",
                order.sequence_id,
                order.id,
                last
            );
        }

        self.total_quantity += order.quantity;
        self.orders.insert(order.sequence_id, order);
    }

    /// Whether `quantity` more can rest here without the total overflowing.
    #[inline]
    pub fn can_hold(&self, quantity: u64) -> bool {
        self.total_quantity.checked_add(quantity).is_some()
    }

    /// Returns the next order to be matched without removing it from the queue.
    ///
    /// # Returns
    /// * `Some(&Order)` - Reference to the oldest order at this price
    /// * `None` - If there are no orders at this price level
    #[inline]
    pub fn front(&self) -> Option<&Order> {
        self.orders.first_key_value().map(|(_, order)| order)
    }

    /// Fills `quantity` against the order at the head of the queue.
    ///
    /// A partially filled head keeps its position and becomes `Partial`. A head
    /// that reaches zero is popped and comes back `Filled`. Either way the
    /// returned order is the maker's state after the fill.
    pub fn fill_front(&mut self, quantity: u64) -> Option<Order> {
        let mut entry = self.orders.first_entry()?;
        let order = entry.get_mut();
        order.fill(quantity);
        self.total_quantity -= quantity;

        if order.quantity == 0 {
            let mut filled = entry.remove();
            filled.status = OrderStatus::Filled;
            Some(filled)
        } else {
            order.status = OrderStatus::Partial;
            Some(order.clone())
        }
    }

    /// Removes the order with the given sequence id from anywhere in the queue.
    pub fn remove(&mut self, sequence_id: u64) -> Option<Order> {
        let order = self.orders.remove(&sequence_id)?;
        self.total_quantity -= order.quantity;
        Some(order)
    }

    pub fn get(&self, sequence_id: u64) -> Option<&Order> {
        self.orders.get(&sequence_id)
    }

    /// Returns true if this price level has no orders.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Returns the number of orders at this price level.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn total_quantity(&self) -> u64 {
        self.total_quantity
    }

    /// Iterates the queue in time priority.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::types::Side;
    use rust_decimal_macros::dec;

    fn order(id: &str, sequence_id: u64, quantity: u64) -> Order {
        let mut order = Order::new(id, Side::Sell, Price::new(dec!(100)).unwrap(), quantity);
        order.sequence_id = sequence_id;
        order
    }

    fn level() -> PriceLevel {
        PriceLevel::new(Price::new(dec!(100)).unwrap())
    }

    #[test]
    fn test_fifo_front() {
        let mut level = level();
        level.push_back(order("a", 1, 5));
        level.push_back(order("b", 2, 1));

        assert_eq!(level.front().unwrap().id.as_str(), "a");
        assert_eq!(level.total_quantity(), 6);
        assert_eq!(level.order_count(), 2);
    }

    #[test]
    fn test_partial_fill_keeps_position() {
        let mut level = level();
        level.push_back(order("a", 1, 5));
        level.push_back(order("b", 2, 5));

        let maker = level.fill_front(2).unwrap();
        assert_eq!(maker.status, OrderStatus::Partial);
        assert_eq!(maker.quantity, 3);
        assert_eq!(level.front().unwrap().id.as_str(), "a");
        assert_eq!(level.total_quantity(), 8);
    }

    #[test]
    fn test_full_fill_pops_front() {
        let mut level = level();
        level.push_back(order("a", 1, 5));
        level.push_back(order("b", 2, 5));

        let maker = level.fill_front(5).unwrap();
        assert_eq!(maker.status, OrderStatus::Filled);
        assert_eq!(maker.quantity, 0);
        assert_eq!(level.front().unwrap().id.as_str(), "b");
        assert_eq!(level.order_count(), 1);
    }

    #[test]
    fn test_remove_from_middle() {
        let mut level = level();
        level.push_back(order("a", 1, 1));
        level.push_back(order("b", 2, 2));
        level.push_back(order("c", 3, 3));

        let removed = level.remove(2).unwrap();
        assert_eq!(removed.id.as_str(), "b");
        assert_eq!(level.total_quantity(), 4);
        let ids: Vec<&str> = level.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(level.remove(2).is_none());
    }

    #[test]
    fn test_fill_on_empty_level() {
        let mut level = level();
        assert!(level.fill_front(1).is_none());
        assert!(level.is_empty());
    }

    #[test]
    fn test_can_hold_up_to_u64_max() {
        let mut level = level();
        level.push_back(order("a", 1, u64::MAX - 1));

        assert!(level.can_hold(1));
        assert!(!level.can_hold(2));
        level.remove(1);
        assert!(level.can_hold(u64::MAX));
    }

    #[test]
    #[should_panic]
    fn test_overflowing_push_panics() {
        let mut level = level();
        level.push_back(order("a", 1, u64::MAX));
        level.push_back(order("b", 2, 1));
    }

    #[test]
    #[should_panic]
    fn test_out_of_order_sequence_panics() {
        let mut level = level();
        level.push_back(order("a", 5, 1));
        level.push_back(order("b", 4, 1));
    }
}
