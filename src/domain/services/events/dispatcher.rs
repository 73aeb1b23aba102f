//--------------------------------------------------------------------------------------------------
// STRUCTS & TRAITS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods       |
// |-------------------------|---------------------------------------------------|-------------------|
// | EventDispatcher         | Routes events to registered handlers              | register, start   |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::event_bus::EventBus;
use super::handlers::EventHandler;

type HandlerRegistry = HashMap<&'static str, Vec<Arc<dyn EventHandler>>>;

/// Dispatches events from the bus to registered handlers
pub struct EventDispatcher {
    /// Event bus for receiving events
    event_bus: EventBus,
    /// Map of event types to handlers
    handlers: Arc<RwLock<HandlerRegistry>>,
    /// Buffer size for event processing
    buffer_size: usize,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("buffer_size", &self.buffer_size)
            .field("event_bus", &self.event_bus)
            .finish_non_exhaustive()
    }
}

impl EventDispatcher {
    /// Creates a new event dispatcher with default buffer size.
    ///
    /// # Arguments
    /// * `event_bus` - The event bus to subscribe to for events
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            event_bus,
            handlers: Arc::new(RwLock::new(HashMap::new())),
            buffer_size: 100,
        }
    }

    /// Sets the buffer size for event processing.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Registers a handler for the event types it declares in `event_types()`.
    pub async fn register_handler(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        let event_types = handler.event_types();

        for event_type in &event_types {
            handlers
                .entry(*event_type)
                .or_default()
                .push(Arc::clone(&handler));
        }

        debug!("Registered handler for event types: {:?}", event_types);
    }

    /// Number of handlers registered for an event type.
    pub async fn handler_count(&self, event_type: &str) -> usize {
        self.handlers
            .read()
            .await
            .get(event_type)
            .map_or(0, Vec::len)
    }

    /// Starts the dispatcher to process events in the background.
    ///
    /// The subscription is taken before this returns, so every event published
    /// afterwards is delivered. Must be called from within a tokio runtime.
    ///
    /// # Returns
    /// A JoinHandle that completes once the event bus is closed
    pub fn start(self) -> JoinHandle<()> {
        let handlers = Arc::clone(&self.handlers);
        let mut receiver = self.event_bus.subscribe();
        let buffer_size = self.buffer_size;

        tokio::spawn(async move {
            info!("Event dispatcher started");

            let (tx, mut rx) = mpsc::channel(buffer_size);

            let receiver_task = tokio::spawn(async move {
                loop {
                    match receiver.recv().await {
                        Ok(event) => {
                            if let Err(e) = tx.send(event).await {
                                error!("Failed to send event to processing buffer: {}", e);
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Event dispatcher lagged, {} events skipped", skipped);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            });

            while let Some(event) = rx.recv().await {
                let event_type = event.event_type();

                let handlers_lock = handlers.read().await;
                match handlers_lock.get(event_type) {
                    Some(event_handlers) => {
                        // Awaited in turn so each handler sees events in publish order
                        for handler in event_handlers {
                            if let Err(e) = handler.handle_event(event.clone()).await {
                                error!("Handler failed to process event: {}", e);
                            }
                        }
                    }
                    None => debug!("No handlers registered for event type: {}", event_type),
                }
            }

            if let Err(e) = receiver_task.await {
                error!("Receiver task failed: {}", e);
            }

            info!("Event dispatcher stopped");
        })
    }
}
