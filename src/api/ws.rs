//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                                       | Return Type |
// |-----------------------|---------------------------------------------------|-------------|
// | trades_ws             | Upgrade and stream executed trades as JSON text   | Response    |
// | stream_trades         | Pump trades into a socket until either side ends  | ()          |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocketUpgrade},
        Extension,
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tracing::{debug, warn};

use super::{AppState, TradeResponse};
use crate::domain::services::events::TradeSubscription;

/// Upgrades the connection and streams every executed trade to the client.
pub async fn trades_ws(
    ws: WebSocketUpgrade,
    Extension(state): Extension<Arc<AppState>>,
) -> Response {
    // Subscribe before the upgrade so no trade between handshake and first poll is missed
    let trades = state.event_bus.subscribe_trades();
    ws.on_upgrade(move |socket| {
        let (sender, receiver) = socket.split();
        stream_trades(sender, receiver, trades)
    })
}

/// Sends each trade as a `TradeResponse` JSON text frame.
///
/// Ends when the client closes or errors, when a send fails, or when the bus
/// goes away. Anything else the client sends is ignored.
async fn stream_trades<S, R, E>(mut sender: S, mut receiver: R, mut trades: TradeSubscription)
where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, E>> + Unpin,
{
    debug!("WebSocket client connected");

    loop {
        tokio::select! {
            trade = trades.next_trade() => {
                let Some(trade) = trade else { break };
                let text = match serde_json::to_string(&TradeResponse::from(trade)) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode trade: {}", e);
                        continue;
                    }
                };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!(lagged = trades.lagged(), "WebSocket client disconnected");
}
