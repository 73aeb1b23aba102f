//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements an event-driven architecture for the matching engine, allowing
// for non-blocking event emission and processing off the matching path.
//
// | Component                | Description                                                |
// |--------------------------|------------------------------------------------------------|
// | MatchingEngineEvent      | Enum representing all possible events in the system        |
// | EventBus                 | Central hub for publishing and subscribing to events       |
// | EventHandler             | Trait for components that can handle events                |
// | EventDispatcher          | Component that routes events to registered handlers        |
//--------------------------------------------------------------------------------------------------

mod dispatcher;
mod event_bus;
mod event_types;
mod handlers;


pub use dispatcher::EventDispatcher;
pub use event_bus::{EventBus, TradeSubscription, DEFAULT_EVENT_BUS_CAPACITY};
pub use event_types::{EventError, EventResult, MatchingEngineEvent};
pub use handlers::{EventHandler, EventLogger, JournalEventHandler};
