//! Live location WebSocket endpoint.

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use domain::models::{ClientMessage, ServerMessage};
use futures_util::{SinkExt, StreamExt};

use crate::app::AppState;
use crate::channel::{LiveChannel, OutboundFrame};

/// GET /api/v1/live
pub async fn live_channel(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let channel = state.channel.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, channel))
}

async fn handle_socket(socket: WebSocket, channel: LiveChannel) {
    let (mut sink, mut stream) = socket.split();
    let (conn_id, mut rx) = channel.register().await;

    // Writer task drains the connection's outbound queue into the socket.
    // It exits when the queue's sender is dropped (connection removed from
    // the registry) or a close frame goes out.
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                OutboundFrame::Message(message) => {
                    let text = match serde_json::to_string(&message) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize channel message");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                OutboundFrame::Close(code) => {
                    let _ = sink
                        .send(Message::Close(Some(CloseFrame {
                            code,
                            reason: "server shutting down".into(),
                        })))
                        .await;
                    break;
                }
            }
        }
    });

    channel.send(conn_id, ServerMessage::Connected).await;

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Subscribe { vehicle_id }) => {
                    channel.subscribe(conn_id, vehicle_id).await;
                    channel
                        .send(conn_id, ServerMessage::Subscribed { vehicle_id })
                        .await;
                }
                Ok(ClientMessage::Unsubscribe { vehicle_id }) => {
                    channel.unsubscribe(conn_id, vehicle_id).await;
                    channel
                        .send(conn_id, ServerMessage::Unsubscribed { vehicle_id })
                        .await;
                }
                Err(e) => {
                    tracing::debug!(connection_id = %conn_id, error = %e, "Malformed channel message");
                    channel
                        .send(
                            conn_id,
                            ServerMessage::Error {
                                message: format!("unrecognized message: {e}"),
                            },
                        )
                        .await;
                }
            },
            Message::Close(_) => break,
            // Pings are answered by axum; binary frames are not part of
            // the protocol.
            _ => {}
        }
    }

    channel.close(conn_id).await;
    let _ = writer.await;
}
