//--------------------------------------------------------------------------------------------------
// TEST MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// End-to-end matching scenarios through the public engine API, plus a randomized comparison
// against a naive reference book that re-sorts every resting order on each match.
//--------------------------------------------------------------------------------------------------

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use order_matching_engine::{MatchingEngine, Order, OrderId, OrderStatus, Price, Side};

fn limit(id: &str, side: Side, price: Decimal, quantity: u64) -> Order {
    Order::new(id, side, Price::new(price).unwrap(), quantity)
}

#[test]
fn fifo_within_a_price_level() {
    let mut engine = MatchingEngine::new();
    engine.submit(limit("s1", Side::Sell, dec!(100), 2)).unwrap();
    engine.submit(limit("s2", Side::Sell, dec!(100), 3)).unwrap();

    let result = engine.submit(limit("b1", Side::Buy, dec!(100), 4)).unwrap();

    let fills: Vec<(&str, u64)> = result
        .trades
        .iter()
        .map(|t| (t.maker_order_id.as_str(), t.quantity))
        .collect();
    assert_eq!(fills, vec![("s1", 2), ("s2", 2)]);
    assert_eq!(result.order.quantity, 0);
    assert_eq!(result.order.status, OrderStatus::Filled);
}

#[test]
fn best_price_is_taken_first() {
    let mut engine = MatchingEngine::new();
    engine.submit(limit("s2", Side::Sell, dec!(102), 5)).unwrap();
    engine.submit(limit("s1", Side::Sell, dec!(100), 5)).unwrap();

    let result = engine.submit(limit("b1", Side::Buy, dec!(105), 3)).unwrap();

    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.trades[0].maker_order_id.as_str(), "s1");
    assert_eq!(result.trades[0].price.inner(), dec!(100));
    assert_eq!(engine.order_book().volume_at_price(Side::Sell, Price::new(dec!(102)).unwrap()), Some(5));
}

#[test]
fn partial_fill_rests_remainder() {
    let mut engine = MatchingEngine::new();
    engine.submit(limit("s1", Side::Sell, dec!(100), 6)).unwrap();

    let result = engine.submit(limit("b1", Side::Buy, dec!(100), 10)).unwrap();

    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.trades[0].quantity, 6);
    assert_eq!(result.order.status, OrderStatus::Partial);
    assert_eq!(result.affected_orders[0].status, OrderStatus::Filled);
    assert_eq!(engine.find_order(&OrderId::from("b1")).unwrap().quantity, 4);
    assert!(engine.find_order(&OrderId::from("s1")).is_none());
}

#[test]
fn non_crossing_order_only_inserts() {
    let mut engine = MatchingEngine::new();
    engine.submit(limit("s1", Side::Sell, dec!(105), 10)).unwrap();
    let asks_before = engine.depth(10).asks;

    let result = engine.submit(limit("b1", Side::Buy, dec!(95), 10)).unwrap();

    assert!(result.trades.is_empty());
    assert_eq!(result.order.status, OrderStatus::Open);
    assert_eq!(engine.depth(10).asks, asks_before);
    assert_eq!(engine.best_bid().unwrap().price.inner(), dec!(95));
    assert_eq!(engine.spread(), Some(dec!(10)));
}

#[test]
fn cancellation_is_idempotent() {
    let mut engine = MatchingEngine::new();
    engine.submit(limit("s1", Side::Sell, dec!(100), 1)).unwrap();

    assert!(engine.cancel(&OrderId::from("s1")).found);
    assert!(!engine.cancel(&OrderId::from("s1")).found);
    assert!(!engine.cancel(&OrderId::from("never-seen")).found);
    assert_eq!(engine.order_count(), 0);
}

#[test]
fn multi_level_sweep() {
    let mut engine = MatchingEngine::new();
    engine.submit(limit("s1", Side::Sell, dec!(95), 3)).unwrap();
    engine.submit(limit("s2", Side::Sell, dec!(100), 4)).unwrap();

    let result = engine.submit(limit("b1", Side::Buy, dec!(100), 10)).unwrap();

    let fills: Vec<(Decimal, u64)> = result
        .trades
        .iter()
        .map(|t| (t.price.inner(), t.quantity))
        .collect();
    assert_eq!(fills, vec![(dec!(95), 3), (dec!(100), 4)]);
    assert_eq!(result.order.status, OrderStatus::Partial);
    assert_eq!(result.order.quantity, 3);
    assert!(engine.best_ask().is_none());
}

//--------------------------------------------------------------------------------------------------
// Reference comparison
//--------------------------------------------------------------------------------------------------

/// Deterministic xorshift generator so failures are reproducible.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

#[derive(Clone)]
struct RefOrder {
    seq: u64,
    id: String,
    side: Side,
    ticks: i64,
    quantity: u64,
}

/// Naive book: a flat list, re-sorted by priority for every fill.
#[derive(Default)]
struct ReferenceBook {
    resting: Vec<RefOrder>,
    next_seq: u64,
}

impl ReferenceBook {
    /// Returns (maker id, price ticks, quantity) per fill.
    fn submit(&mut self, id: &str, side: Side, ticks: i64, mut quantity: u64) -> Vec<(String, i64, u64)> {
        let mut fills = Vec::new();
        while quantity > 0 {
            let mut candidates: Vec<usize> = (0..self.resting.len())
                .filter(|&i| {
                    let o = &self.resting[i];
                    o.side != side
                        && match side {
                            Side::Buy => ticks >= o.ticks,
                            Side::Sell => ticks <= o.ticks,
                        }
                })
                .collect();
            candidates.sort_by_key(|&i| {
                let o = &self.resting[i];
                let price_key = match side {
                    Side::Buy => o.ticks,
                    Side::Sell => -o.ticks,
                };
                (price_key, o.seq)
            });
            let Some(&best) = candidates.first() else {
                break;
            };

            let fill = quantity.min(self.resting[best].quantity);
            quantity -= fill;
            self.resting[best].quantity -= fill;
            fills.push((self.resting[best].id.clone(), self.resting[best].ticks, fill));
            if self.resting[best].quantity == 0 {
                self.resting.remove(best);
            }
        }

        if quantity > 0 {
            self.next_seq += 1;
            self.resting.push(RefOrder {
                seq: self.next_seq,
                id: id.to_string(),
                side,
                ticks,
                quantity,
            });
        }
        fills
    }

    fn cancel(&mut self, id: &str) -> bool {
        match self.resting.iter().position(|o| o.id == id) {
            Some(i) => {
                self.resting.remove(i);
                true
            }
            None => false,
        }
    }

    fn total(&self, side: Side) -> u64 {
        self.resting.iter().filter(|o| o.side == side).map(|o| o.quantity).sum()
    }
}

fn ticks_to_decimal(ticks: i64) -> Decimal {
    Decimal::new(ticks, 2)
}

#[test]
fn matches_reference_book_on_random_flow() {
    let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
    let mut engine = MatchingEngine::new();
    let mut reference = ReferenceBook::default();
    let mut submitted: Vec<String> = Vec::new();

    for step in 0..2_000 {
        if !submitted.is_empty() && rng.below(5) == 0 {
            let id = submitted[rng.below(submitted.len() as u64) as usize].clone();
            let found = engine.cancel(&OrderId::from(id.as_str())).found;
            assert_eq!(found, reference.cancel(&id), "cancel {} at step {}", id, step);
            continue;
        }

        let id = format!("o{}", step);
        let side = if rng.below(2) == 0 { Side::Buy } else { Side::Sell };
        // Prices 99.90 ..= 100.10 so the book crosses often
        let ticks = 9_990 + rng.below(21) as i64;
        let quantity = 1 + rng.below(20);

        let result = engine
            .submit(limit(&id, side, ticks_to_decimal(ticks), quantity))
            .unwrap();
        let expected = reference.submit(&id, side, ticks, quantity);

        let actual: Vec<(String, i64, u64)> = result
            .trades
            .iter()
            .map(|t| {
                let ticks = (t.price.inner() * Decimal::from(100))
                    .trunc()
                    .to_string()
                    .parse::<i64>()
                    .unwrap();
                (t.maker_order_id.to_string(), ticks, t.quantity)
            })
            .collect();
        assert_eq!(actual, expected, "fills differ at step {}", step);

        let filled: u64 = result.trades.iter().map(|t| t.quantity).sum();
        assert!(filled <= quantity);
        assert_eq!(result.order.quantity, quantity - filled);

        // The book never stays crossed
        if let (Some(bid), Some(ask)) = (engine.order_book().best_bid(), engine.order_book().best_ask()) {
            assert!(bid < ask, "crossed book at step {}", step);
        }

        let depth = engine.depth(usize::MAX);
        let bids: u64 = depth.bids.iter().map(|l| l.quantity).sum();
        let asks: u64 = depth.asks.iter().map(|l| l.quantity).sum();
        assert_eq!(bids, reference.total(Side::Buy));
        assert_eq!(asks, reference.total(Side::Sell));

        submitted.push(id);
    }
}
