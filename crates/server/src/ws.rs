use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use shared::domain::ConnectionId;
use tracing::{debug, info, warn};

use crate::{app_state::AppState, registry::PeerHandle};

pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let connection_id = state.allocate_connection_id();
    ws.max_message_size(state.max_frame_bytes)
        .on_upgrade(move |socket| ws_connection(state, socket, connection_id))
}

/// Runs one client connection: a writer task drains the peer's outbound
/// queue while this task handles inbound frames in arrival order.
async fn ws_connection(state: Arc<AppState>, socket: WebSocket, connection_id: ConnectionId) {
    let (mut sender, mut receiver) = socket.split();
    let (handle, mut outbound) = PeerHandle::channel(connection_id);
    state.dispatcher.on_connect(handle);

    let send_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(v) => v,
                Err(error) => {
                    warn!(%connection_id, %error, "failed to encode outbound frame");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => state.dispatcher.on_text(connection_id, &text),
            Ok(Message::Binary(bytes)) => {
                debug!(%connection_id, len = bytes.len(), "ignoring binary frame")
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Err(error) => {
                info!(%connection_id, %error, "websocket receive failed");
                break;
            }
        }
    }

    state.dispatcher.on_disconnect(connection_id);
    send_task.abort();
}
