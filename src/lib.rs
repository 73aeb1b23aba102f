pub mod api;
pub mod config;
pub mod domain;

// Re-export key types for easier usage
pub use api::{Api, AppState};
pub use config::{Args, Config, ConfigError};
pub use domain::models::types::{Order, OrderId, OrderRequest, OrderStatus, Price, Side, Trade, TypeError};
pub use domain::services::events::{
    EventBus, EventDispatcher, EventError, EventHandler, EventLogger, EventResult,
    JournalEventHandler, MatchingEngineEvent, TradeSubscription,
};
pub use domain::services::matching_engine::{
    CancelResult, MatchResult, MatchingEngine, MatchingError, MatchingResult,
};
pub use domain::services::orderbook::depth::{DepthLevel, DepthSnapshot};
pub use domain::services::orderbook::orderbook::OrderBook;
pub use domain::services::orderbook::orderbook_worker::{OrderBookClient, OrderBookWorker};
pub use domain::services::orderbook::OrderbookError;
pub use domain::services::persistence::{
    InMemoryRepository, OrderRepository, RepositoryError, RepositoryResult,
};
