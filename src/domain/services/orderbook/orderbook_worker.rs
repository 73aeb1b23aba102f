//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements a thread worker that owns the matching engine. Every operation on the
// book is a message to this worker, so exactly one submission or cancellation is ever in flight.
//
// | Component           | Description                                                 |
// |---------------------|-------------------------------------------------------------|
// | OrderBookWorker     | Worker thread owning the MatchingEngine                     |
// | OrderBookClient     | Cloneable client interface to interact with the worker      |
// | OrderBookCommand    | Commands sent to the worker                                 |
//
//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name               | Description                                       | Key Methods         |
// |--------------------|---------------------------------------------------|---------------------|
// | OrderBookWorker    | Worker thread managing the engine                 | start               |
// |                    |                                                   | handle_command      |
// |--------------------|---------------------------------------------------|---------------------|
// | OrderBookClient    | Client interface to worker                        | submit_order        |
// |                    |                                                   | cancel_order        |
// |                    |                                                   | get_depth           |
//
//--------------------------------------------------------------------------------------------------
// ENUMS
//--------------------------------------------------------------------------------------------------
// | Name               | Description                                       | Variants            |
// |--------------------|---------------------------------------------------|---------------------|
// | OrderBookCommand   | Commands sent to worker                           | SubmitOrder         |
// |                    |                                                   | CancelOrder         |
// |                    |                                                   | GetBestBid/Ask      |
// |                    |                                                   | FindOrder           |
// |                    |                                                   | GetDepth            |
// |                    |                                                   | Shutdown            |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::Utc;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::domain::models::types::{Order, OrderId};
use crate::domain::services::events::{EventBus, MatchingEngineEvent};
use crate::domain::services::matching_engine::{
    CancelResult, MatchResult, MatchingEngine, MatchingError, MatchingResult,
};
use crate::domain::services::orderbook::depth::DepthSnapshot;
use crate::domain::services::persistence::OrderRepository;

/// Default capacity of the command channel.
pub const DEFAULT_COMMAND_BUFFER: usize = 1000;

/// Commands that can be sent to the OrderBookWorker
#[derive(Debug)]
enum OrderBookCommand {
    /// Match an order and rest any remainder
    SubmitOrder {
        order: Order,
        response_tx: oneshot::Sender<MatchingResult<MatchResult>>,
    },

    /// Remove a resting order from the book
    CancelOrder {
        order_id: OrderId,
        response_tx: oneshot::Sender<CancelResult>,
    },

    /// Get the best bid order
    GetBestBid {
        response_tx: oneshot::Sender<Option<Order>>,
    },

    /// Get the best ask order
    GetBestAsk {
        response_tx: oneshot::Sender<Option<Order>>,
    },

    /// Look up a resting order
    FindOrder {
        order_id: OrderId,
        response_tx: oneshot::Sender<Option<Order>>,
    },

    /// Get the current market depth
    GetDepth {
        limit: usize,
        response_tx: oneshot::Sender<DepthSnapshot>,
    },

    /// Shut down the worker thread
    Shutdown,
}

/// Worker thread that owns the matching engine and serializes every operation on it.
pub struct OrderBookWorker {
    /// The engine being managed by this worker
    engine: MatchingEngine,

    /// Where orders and trades are recorded after each command
    repository: Arc<dyn OrderRepository>,

    /// Where events are published after each command
    event_bus: EventBus,

    /// Capacity of the command channel
    command_buffer: usize,
}

impl OrderBookWorker {
    /// Creates a new worker with an empty engine.
    ///
    /// # Arguments
    /// * `repository` - Storage for orders and trades; open orders are restored from it on start
    /// * `event_bus` - Bus on which order and trade events are published
    pub fn new(repository: Arc<dyn OrderRepository>, event_bus: EventBus) -> Self {
        Self {
            engine: MatchingEngine::new(),
            repository,
            event_bus,
            command_buffer: DEFAULT_COMMAND_BUFFER,
        }
    }

    pub fn with_command_buffer(mut self, command_buffer: usize) -> Self {
        self.command_buffer = command_buffer.max(1);
        self
    }

    /// Starts the worker thread and returns a client to interact with it.
    ///
    /// Open orders are restored from the repository before the first command is
    /// processed. Commands sent in the meantime wait in the channel.
    ///
    /// # Returns
    /// A client that can be used to send commands to this worker, and the thread handle
    pub fn start(self) -> (OrderBookClient, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(self.command_buffer);
        let client = OrderBookClient::new(command_tx);

        let handle = thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!("Failed to create tokio runtime for OrderBookWorker: {}", e);
                    return;
                }
            };

            rt.block_on(self.run(command_rx));
        });

        (client, handle)
    }

    /// Main worker loop that processes commands
    async fn run(mut self, mut command_rx: Receiver<OrderBookCommand>) {
        self.restore().await;
        info!(resting = self.engine.order_count(), "OrderBookWorker started");

        while let Some(cmd) = command_rx.recv().await {
            match cmd {
                OrderBookCommand::Shutdown => break,
                _ => self.handle_command(cmd).await,
            }
        }

        info!("OrderBookWorker stopped");
    }

    /// Rebuilds the book and resumes both sequence counters from storage.
    ///
    /// Restored orders whose sequence id had to move are written back, so the
    /// next restart sees the same queue order.
    async fn restore(&mut self) {
        match self.repository.max_trade_sequence().await {
            Ok(last) => self.engine.resume_trade_sequence(last),
            Err(e) => error!("Failed to load last trade sequence: {}", e),
        }

        let stored = match self.repository.open_orders().await {
            Ok(orders) => orders,
            Err(e) => {
                error!("Failed to load open orders, starting with an empty book: {}", e);
                return;
            }
        };
        let stored_sequences: HashMap<OrderId, u64> = stored
            .iter()
            .map(|order| (order.id.clone(), order.sequence_id))
            .collect();

        for order in self.engine.restore(stored) {
            if stored_sequences.get(&order.id) == Some(&order.sequence_id) {
                continue;
            }
            if let Err(e) = self.repository.update_order(&order).await {
                error!(order_id = %order.id, "Failed to persist restored sequence: {}", e);
            }
        }
    }

    /// Processes a single command
    async fn handle_command(&mut self, cmd: OrderBookCommand) {
        match cmd {
            OrderBookCommand::SubmitOrder { order, response_tx } => {
                let result = self.engine.submit(order);
                if let Ok(ref match_result) = result {
                    self.persist_match(match_result).await;
                    self.publish_match(match_result);
                }
                let _ = response_tx.send(result);
            }

            OrderBookCommand::CancelOrder {
                order_id,
                response_tx,
            } => {
                let result = self.engine.cancel(&order_id);
                if let Some(ref order) = result.order {
                    if let Err(e) = self.repository.update_order(order).await {
                        error!(order_id = %order.id, "Failed to persist cancellation: {}", e);
                    }
                    self.event_bus.publish(MatchingEngineEvent::OrderCancelled {
                        order: order.clone(),
                        timestamp: Utc::now(),
                    });
                }
                let _ = response_tx.send(result);
            }

            OrderBookCommand::GetBestBid { response_tx } => {
                let _ = response_tx.send(self.engine.best_bid().cloned());
            }

            OrderBookCommand::GetBestAsk { response_tx } => {
                let _ = response_tx.send(self.engine.best_ask().cloned());
            }

            OrderBookCommand::FindOrder {
                order_id,
                response_tx,
            } => {
                let _ = response_tx.send(self.engine.find_order(&order_id).cloned());
            }

            OrderBookCommand::GetDepth { limit, response_tx } => {
                let _ = response_tx.send(self.engine.depth(limit));
            }

            OrderBookCommand::Shutdown => {
                // Handled in the run loop
            }
        }
    }

    /// Records the taker, every touched maker and the trades.
    ///
    /// Failures are logged only. The match has already happened in the book and
    /// is not undone.
    async fn persist_match(&self, result: &MatchResult) {
        if let Err(e) = self.repository.save_order(&result.order).await {
            error!(order_id = %result.order.id, "Failed to persist order: {}", e);
        }

        for maker in &result.affected_orders {
            if let Err(e) = self.repository.update_order(maker).await {
                error!(order_id = %maker.id, "Failed to persist matched order: {}", e);
            }
        }

        if !result.trades.is_empty() {
            if let Err(e) = self.repository.save_trades(&result.trades).await {
                error!(
                    order_id = %result.order.id,
                    trades = result.trades.len(),
                    "Failed to persist trades: {}",
                    e
                );
            }
        }
    }

    /// Publishes, per fill, the trade then the maker's update, followed by the
    /// taker's fill and resting remainder.
    fn publish_match(&self, result: &MatchResult) {
        let timestamp = Utc::now();
        let mut events = Vec::with_capacity(result.trades.len() * 2 + 2);

        for (trade, maker) in result.trades.iter().zip(&result.affected_orders) {
            events.push(MatchingEngineEvent::TradeExecuted {
                trade: trade.clone(),
                timestamp,
            });
            events.push(MatchingEngineEvent::OrderMatched {
                order: maker.clone(),
                matched_quantity: trade.quantity,
                timestamp,
            });
        }

        let taker = &result.order;
        if taker.filled_quantity() > 0 {
            events.push(MatchingEngineEvent::OrderMatched {
                order: taker.clone(),
                matched_quantity: taker.filled_quantity(),
                timestamp,
            });
        }
        if taker.quantity > 0 {
            events.push(MatchingEngineEvent::OrderAdded {
                order: taker.clone(),
                timestamp,
            });
        }

        let published = events.len();
        let delivered = self.event_bus.publish_all(events);
        debug!(order_id = %taker.id, published, delivered, "match events published");
    }
}

/// Client interface to interact with the OrderBookWorker
#[derive(Debug, Clone)]
pub struct OrderBookClient {
    command_tx: Sender<OrderBookCommand>,
}

impl OrderBookClient {
    fn new(command_tx: Sender<OrderBookCommand>) -> Self {
        Self { command_tx }
    }

    /// Sends a command built around a fresh response channel and waits for the reply.
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> OrderBookCommand,
    ) -> MatchingResult<T> {
        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx.send(build(response_tx)).await.map_err(|_| {
            MatchingError::WorkerUnavailable("OrderBookWorker channel closed".to_string())
        })?;

        response_rx.await.map_err(|_| {
            MatchingError::WorkerUnavailable(
                "Failed to receive response from OrderBookWorker".to_string(),
            )
        })
    }

    /// Submits a limit order for matching.
    ///
    /// # Arguments
    /// * `order` - The order to match; its status and sequence id are assigned by the engine
    ///
    /// # Returns
    /// The trades and final order state, or the reason the order was rejected
    pub async fn submit_order(&self, order: Order) -> MatchingResult<MatchResult> {
        debug!(order_id = %order.id, "submitting order");
        self.request(|response_tx| OrderBookCommand::SubmitOrder { order, response_tx })
            .await?
    }

    /// Cancels a resting order. An unknown id is reported with `found == false`.
    pub async fn cancel_order(&self, order_id: OrderId) -> MatchingResult<CancelResult> {
        self.request(|response_tx| OrderBookCommand::CancelOrder {
            order_id,
            response_tx,
        })
        .await
    }

    /// Gets the best bid order.
    pub async fn get_best_bid(&self) -> MatchingResult<Option<Order>> {
        self.request(|response_tx| OrderBookCommand::GetBestBid { response_tx })
            .await
    }

    /// Gets the best ask order.
    pub async fn get_best_ask(&self) -> MatchingResult<Option<Order>> {
        self.request(|response_tx| OrderBookCommand::GetBestAsk { response_tx })
            .await
    }

    pub async fn find_order(&self, order_id: OrderId) -> MatchingResult<Option<Order>> {
        self.request(|response_tx| OrderBookCommand::FindOrder {
            order_id,
            response_tx,
        })
        .await
    }

    /// Gets the current market depth.
    ///
    /// # Arguments
    /// * `limit` - Maximum number of price levels to include per side
    pub async fn get_depth(&self, limit: usize) -> MatchingResult<DepthSnapshot> {
        self.request(|response_tx| OrderBookCommand::GetDepth { limit, response_tx })
            .await
    }

    /// Shuts down the worker thread. Commands already queued ahead of this one are processed.
    pub async fn shutdown(&self) -> MatchingResult<()> {
        self.command_tx
            .send(OrderBookCommand::Shutdown)
            .await
            .map_err(|_| {
                MatchingError::WorkerUnavailable("OrderBookWorker channel closed".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::types::{OrderStatus, Price, Side};
    use crate::domain::services::persistence::{
        InMemoryRepository, MockOrderRepository, RepositoryError,
    };
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn create_test_order(id: &str, side: Side, price: Decimal, quantity: u64) -> Order {
        Order::new(id, side, Price::new(price).unwrap(), quantity)
    }

    fn start_worker(repository: Arc<dyn OrderRepository>) -> (OrderBookClient, EventBus) {
        let event_bus = EventBus::new(64);
        let worker = OrderBookWorker::new(repository, event_bus.clone());
        let (client, _handle) = worker.start();
        (client, event_bus)
    }

    #[tokio::test]
    async fn test_submit_and_query() {
        let (client, _bus) = start_worker(Arc::new(InMemoryRepository::new()));

        let bid = create_test_order("b1", Side::Buy, dec!(100), 5);
        let ask = create_test_order("s1", Side::Sell, dec!(101), 3);
        client.submit_order(bid).await.expect("Failed to add bid order");
        client.submit_order(ask).await.expect("Failed to add ask order");

        let best_bid = client.get_best_bid().await.unwrap().unwrap();
        assert_eq!(best_bid.id.as_str(), "b1");
        let best_ask = client.get_best_ask().await.unwrap().unwrap();
        assert_eq!(best_ask.id.as_str(), "s1");

        let depth = client.get_depth(10).await.unwrap();
        assert_eq!(depth.bids.len(), 1);
        assert_eq!(depth.asks.len(), 1);
        assert_eq!(depth.spread(), Some(dec!(1)));

        client.shutdown().await.expect("Failed to shut down worker");
    }

    #[tokio::test]
    async fn test_match_is_persisted() {
        let repository = Arc::new(InMemoryRepository::new());
        let (client, _bus) = start_worker(repository.clone());

        client
            .submit_order(create_test_order("s1", Side::Sell, dec!(100), 4))
            .await
            .unwrap();
        let result = client
            .submit_order(create_test_order("b1", Side::Buy, dec!(100), 10))
            .await
            .unwrap();

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.final_status(), OrderStatus::Partial);

        let maker = repository.get_order(&OrderId::from("s1")).await.unwrap().unwrap();
        assert_eq!(maker.status, OrderStatus::Filled);
        assert_eq!(maker.quantity, 0);
        let taker = repository.get_order(&OrderId::from("b1")).await.unwrap().unwrap();
        assert_eq!(taker.quantity, 6);
        assert_eq!(repository.trades().len(), 1);

        client.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_via_client() {
        let repository = Arc::new(InMemoryRepository::new());
        let (client, _bus) = start_worker(repository.clone());

        client
            .submit_order(create_test_order("b1", Side::Buy, dec!(100), 5))
            .await
            .unwrap();

        let cancelled = client.cancel_order(OrderId::from("b1")).await.unwrap();
        assert!(cancelled.found);
        assert_eq!(cancelled.side, Some(Side::Buy));
        assert!(client.get_best_bid().await.unwrap().is_none());
        assert!(client.find_order(OrderId::from("b1")).await.unwrap().is_none());

        let stored = repository.get_order(&OrderId::from("b1")).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);

        let again = client.cancel_order(OrderId::from("b1")).await.unwrap();
        assert!(!again.found);

        client.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_events_published_in_fill_order() {
        let repository = Arc::new(InMemoryRepository::new());
        let event_bus = EventBus::new(64);
        let mut events = event_bus.subscribe();
        let (client, _handle) = OrderBookWorker::new(repository, event_bus).start();

        client
            .submit_order(create_test_order("s1", Side::Sell, dec!(100), 2))
            .await
            .unwrap();
        client
            .submit_order(create_test_order("b1", Side::Buy, dec!(100), 5))
            .await
            .unwrap();

        let mut types = Vec::new();
        while let Ok(event) = events.try_recv() {
            types.push(event.event_type());
        }
        assert_eq!(
            types,
            vec![
                "OrderAdded",    // s1 rests
                "TradeExecuted", // b1 x s1
                "OrderMatched",  // s1 filled
                "OrderMatched",  // b1 partially filled
                "OrderAdded",    // b1 remainder rests
            ]
        );

        client.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_restores_open_orders_on_start() {
        let mut partial = create_test_order("s2", Side::Sell, dec!(101), 2);
        partial.original_quantity = 5;
        partial.status = OrderStatus::Partial;
        partial.sequence_id = 2;
        let mut open = create_test_order("s1", Side::Sell, dec!(101), 3);
        open.sequence_id = 1;
        let mut filled = create_test_order("s0", Side::Sell, dec!(99), 0);
        filled.status = OrderStatus::Filled;

        let repository = Arc::new(InMemoryRepository::with_orders(vec![partial, open, filled]));
        let (client, _bus) = start_worker(repository);

        let depth = client.get_depth(5).await.unwrap();
        assert_eq!(depth.asks.len(), 1);
        assert_eq!(depth.asks[0].quantity, 5);
        assert_eq!(depth.asks[0].order_count, 2);
        assert_eq!(client.get_best_ask().await.unwrap().unwrap().id.as_str(), "s1");

        let result = client
            .submit_order(create_test_order("b1", Side::Buy, dec!(101), 4))
            .await
            .unwrap();
        let makers: Vec<&str> = result.trades.iter().map(|t| t.maker_order_id.as_str()).collect();
        assert_eq!(makers, vec!["s1", "s2"]);

        client.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_priority_and_trade_numbering_survive_restarts() {
        let mut s_old = create_test_order("s_old", Side::Sell, dec!(100), 5);
        s_old.sequence_id = 10;
        let repository = Arc::new(InMemoryRepository::with_orders(vec![s_old]));

        // First run: s_new queues behind the restored s_old
        let (client, _bus) = start_worker(repository.clone());
        let s_new = client
            .submit_order(create_test_order("s_new", Side::Sell, dec!(100), 5))
            .await
            .unwrap();
        assert_eq!(s_new.order.sequence_id, 11);
        let first = client
            .submit_order(create_test_order("b1", Side::Buy, dec!(100), 1))
            .await
            .unwrap();
        assert_eq!(first.trades[0].maker_order_id.as_str(), "s_old");
        assert_eq!(first.trades[0].sequence, 1);
        client.shutdown().await.unwrap();

        let stored = repository.get_order(&OrderId::from("s_new")).await.unwrap().unwrap();
        assert_eq!(stored.sequence_id, 11);

        // Second run: same queue order, trade numbering continues
        let (client, _bus) = start_worker(repository.clone());
        let second = client
            .submit_order(create_test_order("b2", Side::Buy, dec!(100), 5))
            .await
            .unwrap();
        let fills: Vec<(&str, u64, u64)> = second
            .trades
            .iter()
            .map(|t| (t.maker_order_id.as_str(), t.quantity, t.sequence))
            .collect();
        assert_eq!(fills, vec![("s_old", 4, 2), ("s_new", 1, 3)]);

        let b3 = client
            .submit_order(create_test_order("b3", Side::Buy, dec!(99), 1))
            .await
            .unwrap();
        assert_eq!(b3.order.sequence_id, 13);
        client.shutdown().await.unwrap();

        let sequences: Vec<u64> = repository.trades().iter().map(|t| t.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_restore_writes_back_moved_sequences() {
        let mut first = create_test_order("s1", Side::Sell, dec!(100), 1);
        first.sequence_id = 0;
        let mut second = create_test_order("s2", Side::Sell, dec!(100), 1);
        second.sequence_id = 0;
        second.created_at = first.created_at + chrono::Duration::milliseconds(1);
        let repository = Arc::new(InMemoryRepository::with_orders(vec![second, first]));

        let (client, _bus) = start_worker(repository.clone());
        // Any reply means the restore has completed
        assert_eq!(client.get_best_ask().await.unwrap().unwrap().id.as_str(), "s1");
        client.shutdown().await.unwrap();

        let s1 = repository.get_order(&OrderId::from("s1")).await.unwrap().unwrap();
        let s2 = repository.get_order(&OrderId::from("s2")).await.unwrap().unwrap();
        assert_eq!((s1.sequence_id, s2.sequence_id), (1, 2));
    }

    #[tokio::test]
    async fn test_overflowing_order_rejected_and_worker_survives() {
        let (client, _bus) = start_worker(Arc::new(InMemoryRepository::new()));
        let half = u64::MAX / 2 + 1;

        client
            .submit_order(create_test_order("s1", Side::Sell, dec!(100), half))
            .await
            .unwrap();
        let result = client
            .submit_order(create_test_order("s2", Side::Sell, dec!(100), half))
            .await;
        assert!(matches!(result, Err(MatchingError::QuantityOverflow { .. })));

        let depth = client.get_depth(5).await.unwrap();
        assert_eq!(depth.asks[0].quantity, half);
        assert_eq!(depth.asks[0].order_count, 1);

        client.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_undo_match() {
        let mut repository = MockOrderRepository::new();
        repository.expect_open_orders().returning(|| Ok(Vec::new()));
        repository.expect_max_trade_sequence().returning(|| Ok(0));
        repository
            .expect_save_order()
            .returning(|_| Err(RepositoryError::Storage("disk full".to_string())));
        repository
            .expect_update_order()
            .times(1)
            .returning(|_| Err(RepositoryError::Storage("disk full".to_string())));
        repository
            .expect_save_trades()
            .times(1)
            .returning(|_| Err(RepositoryError::Storage("disk full".to_string())));

        let (client, _bus) = start_worker(Arc::new(repository));

        client
            .submit_order(create_test_order("s1", Side::Sell, dec!(100), 3))
            .await
            .unwrap();
        let result = client
            .submit_order(create_test_order("b1", Side::Buy, dec!(100), 3))
            .await
            .expect("match succeeds even when storage fails");

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.final_status(), OrderStatus::Filled);
        assert!(client.get_best_ask().await.unwrap().is_none());

        client.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejections_reach_the_client() {
        let (client, _bus) = start_worker(Arc::new(InMemoryRepository::new()));

        client
            .submit_order(create_test_order("b1", Side::Buy, dec!(100), 5))
            .await
            .unwrap();
        let duplicate = client
            .submit_order(create_test_order("b1", Side::Buy, dec!(100), 5))
            .await;
        assert_eq!(
            duplicate,
            Err(MatchingError::DuplicateOrderId(OrderId::from("b1")))
        );

        client.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_worker_unavailable_after_shutdown() {
        let (client, _bus) = start_worker(Arc::new(InMemoryRepository::new()));
        client.shutdown().await.unwrap();

        let result = client.get_best_bid().await;
        assert!(matches!(result, Err(MatchingError::WorkerUnavailable(_))));
    }
}
