//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Fan-out of matching engine events. The worker publishes after every command;
// the dispatcher takes the full stream and WebSocket clients take trades only.
//
// | Component          | Description                                                   |
// |--------------------|---------------------------------------------------------------|
// | EventBus           | Broadcast sender shared by the worker and the API             |
// | TradeSubscription  | Trade-only view of the bus that counts events lost to lag      |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name               | Description                                      | Return Type          |
// |--------------------|--------------------------------------------------|----------------------|
// | publish            | Sends one event to every live subscriber         | usize                |
// | publish_all        | Sends a batch in order                           | usize                |
// | subscribe          | Full event stream                                | broadcast::Receiver  |
// | subscribe_trades   | Executed trades only                             | TradeSubscription    |
//--------------------------------------------------------------------------------------------------

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{trace, warn};

use super::event_types::MatchingEngineEvent;
use crate::domain::models::types::Trade;

/// Default number of events buffered per subscriber.
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 1024;

/// Broadcast bus for matching engine events.
///
/// Publishing never blocks and never fails the caller: an event with nobody
/// listening is dropped. A subscriber more than `capacity` events behind
/// loses the oldest ones.
///
/// # Examples
///
/// ```
/// use order_matching_engine::domain::services::events::EventBus;
///
/// let event_bus = EventBus::new(16);
/// let trades = event_bus.subscribe_trades();
/// assert_eq!(event_bus.subscriber_count(), 1);
/// drop(trades);
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MatchingEngineEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUS_CAPACITY)
    }
}

impl EventBus {
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publishes an event and returns how many subscribers it reached.
    pub fn publish(&self, event: MatchingEngineEvent) -> usize {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(receivers) => {
                trace!(event_type, receivers, "event published");
                receivers
            }
            Err(_) => {
                trace!(event_type, "event dropped, no subscribers");
                0
            }
        }
    }

    /// Publishes events in order. Returns the number that reached at least one subscriber.
    pub fn publish_all<I>(&self, events: I) -> usize
    where
        I: IntoIterator<Item = MatchingEngineEvent>,
    {
        events
            .into_iter()
            .map(|event| self.publish(event))
            .filter(|receivers| *receivers > 0)
            .count()
    }

    /// Every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<MatchingEngineEvent> {
        self.sender.subscribe()
    }

    /// Trades executed after this call.
    pub fn subscribe_trades(&self) -> TradeSubscription {
        TradeSubscription {
            receiver: self.sender.subscribe(),
            lagged: 0,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Trade-only subscription.
///
/// Order lifecycle events are skipped. Events lost because the subscriber fell
/// behind are counted in `lagged`, whatever their type.
#[derive(Debug)]
pub struct TradeSubscription {
    receiver: broadcast::Receiver<MatchingEngineEvent>,
    lagged: u64,
}

impl TradeSubscription {
    /// Waits for the next executed trade.
    ///
    /// # Returns
    /// * `Some(Trade)` - The next trade in execution order
    /// * `None` - Once every publisher is gone
    pub async fn next_trade(&mut self) -> Option<Trade> {
        loop {
            match self.receiver.recv().await {
                Ok(MatchingEngineEvent::TradeExecuted { trade, .. }) => return Some(trade),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    self.lagged += skipped;
                    warn!(skipped, total = self.lagged, "trade subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Events dropped so far because this subscriber fell behind.
    pub fn lagged(&self) -> u64 {
        self.lagged
    }
}
