//! The reconnecting live location client actor.

use std::collections::HashSet;
use std::time::Duration;

use domain::models::{
    ClientMessage, ServerMessage, CLIENT_DISCONNECT_CLOSE_CODE, SERVER_SHUTDOWN_CLOSE_CODE,
};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::{frame::coding::CloseCode, CloseFrame},
    tungstenite::Message,
    MaybeTlsStream, WebSocketStream,
};
use uuid::Uuid;

use crate::backoff::backoff_delay;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Full WebSocket URL, e.g. `ws://host:8080/api/v1/live`.
    pub url: String,
    pub reconnect_base: Duration,
    pub reconnect_max: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_base: Duration::from_millis(500),
            reconnect_max: Duration::from_secs(30),
        }
    }
}

/// Connection lifecycle as observed through [`LiveLocationClient::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    Connecting,
    Open,
    Disconnected,
    Closed,
}

#[derive(Debug, Clone)]
pub struct ClientStatus {
    pub state: ClientState,
    pub last_error: Option<String>,
}

enum Command {
    Subscribe(Uuid),
    Unsubscribe(Uuid),
    Disconnect,
    Reconnect,
}

/// Handle to the client actor. Dropping it stops the actor.
pub struct LiveLocationClient {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ClientStatus>,
}

impl LiveLocationClient {
    /// Spawn the actor and start connecting.
    ///
    /// `on_event` receives every server message exactly once, in arrival
    /// order. It runs on the actor task, so it must not block.
    pub fn connect<F>(config: ClientConfig, on_event: F) -> Self
    where
        F: FnMut(ServerMessage) + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ClientStatus {
            state: ClientState::Idle,
            last_error: None,
        });

        let actor = Actor {
            config,
            commands: command_rx,
            status: status_tx,
            on_event,
            desired: HashSet::new(),
            sent: HashSet::new(),
            attempt: 0,
        };
        tokio::spawn(actor.run());

        Self {
            commands: command_tx,
            status: status_rx,
        }
    }

    /// Add a vehicle to the desired subscription set.
    pub fn subscribe(&self, vehicle_id: Uuid) {
        let _ = self.commands.send(Command::Subscribe(vehicle_id));
    }

    /// Remove a vehicle from the desired subscription set.
    pub fn unsubscribe(&self, vehicle_id: Uuid) {
        let _ = self.commands.send(Command::Unsubscribe(vehicle_id));
    }

    /// Close the connection and suppress auto-reconnect until
    /// [`reconnect`](Self::reconnect) is called.
    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }

    /// Resume connecting after an explicit disconnect.
    pub fn reconnect(&self) {
        let _ = self.commands.send(Command::Reconnect);
    }

    /// Watch the connection state and last transport error.
    pub fn status(&self) -> watch::Receiver<ClientStatus> {
        self.status.clone()
    }
}

enum SessionEnd {
    /// Transport dropped or the server closed abnormally; reconnect.
    Dropped(Option<String>),
    /// Caller asked for the close; do not reconnect.
    Closed,
    /// Command channel gone, the handle was dropped.
    HandleGone,
}

enum IdleEnd {
    Resume,
    HandleGone,
}

struct Actor<F> {
    config: ClientConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<ClientStatus>,
    on_event: F,
    /// What the caller wants to be subscribed to.
    desired: HashSet<Uuid>,
    /// What the current connection has been told. Cleared on every reconnect.
    sent: HashSet<Uuid>,
    attempt: u32,
}

impl<F> Actor<F>
where
    F: FnMut(ServerMessage) + Send + 'static,
{
    async fn run(mut self) {
        loop {
            self.publish(ClientState::Connecting, None);

            match connect_async(&self.config.url).await {
                Ok((ws, _)) => {
                    self.attempt = 0;
                    self.publish(ClientState::Open, None);
                    match self.drive_session(ws).await {
                        SessionEnd::Dropped(reason) => {
                            tracing::warn!(
                                url = %self.config.url,
                                reason = reason.as_deref().unwrap_or("unknown"),
                                "Live channel connection lost"
                            );
                            self.publish(ClientState::Disconnected, reason);
                        }
                        SessionEnd::Closed => match self.idle_until_reconnect().await {
                            IdleEnd::Resume => continue,
                            IdleEnd::HandleGone => return,
                        },
                        SessionEnd::HandleGone => return,
                    }
                }
                Err(e) => {
                    tracing::warn!(url = %self.config.url, error = %e, "Failed to connect");
                    self.publish(ClientState::Disconnected, Some(e.to_string()));
                }
            }

            let delay = backoff_delay(
                self.attempt,
                self.config.reconnect_base,
                self.config.reconnect_max,
            );
            self.attempt = self.attempt.saturating_add(1);

            match self.wait_out_backoff(delay).await {
                SessionEnd::Dropped(_) => continue,
                SessionEnd::Closed => match self.idle_until_reconnect().await {
                    IdleEnd::Resume => continue,
                    IdleEnd::HandleGone => return,
                },
                SessionEnd::HandleGone => return,
            }
        }
    }

    async fn drive_session(&mut self, ws: WsStream) -> SessionEnd {
        let (mut sink, mut stream) = ws.split();

        // Server-side subscription state did not survive the reconnect.
        // Replay the full desired set, then diff from here on.
        self.sent.clear();
        for vehicle_id in self.desired.clone() {
            if send_client_message(&mut sink, &ClientMessage::Subscribe { vehicle_id })
                .await
                .is_err()
            {
                return SessionEnd::Dropped(Some("send failed".to_string()));
            }
            self.sent.insert(vehicle_id);
        }

        loop {
            tokio::select! {
                inbound = stream.next() => match inbound {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(event) => (self.on_event)(event),
                        Err(e) => {
                            tracing::debug!(error = %e, "Ignoring unrecognized server message");
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        let code = frame.as_ref().map(|f| u16::from(f.code));
                        // The distinguished shutdown code means the server is
                        // going away on purpose; stay down until the caller
                        // asks to reconnect.
                        if code == Some(SERVER_SHUTDOWN_CLOSE_CODE) {
                            tracing::info!("Server shut the channel down");
                            return SessionEnd::Closed;
                        }
                        let reason = code
                            .map(|c| format!("closed by server: {c}"))
                            .unwrap_or_else(|| "closed by server".to_string());
                        return SessionEnd::Dropped(Some(reason));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return SessionEnd::Dropped(Some(e.to_string())),
                    None => return SessionEnd::Dropped(Some("connection closed".to_string())),
                },
                command = self.commands.recv() => match command {
                    Some(Command::Subscribe(vehicle_id)) => {
                        self.desired.insert(vehicle_id);
                        if !self.sent.contains(&vehicle_id) {
                            if send_client_message(&mut sink, &ClientMessage::Subscribe { vehicle_id })
                                .await
                                .is_err()
                            {
                                return SessionEnd::Dropped(Some("send failed".to_string()));
                            }
                            self.sent.insert(vehicle_id);
                        }
                    }
                    Some(Command::Unsubscribe(vehicle_id)) => {
                        self.desired.remove(&vehicle_id);
                        if self.sent.remove(&vehicle_id)
                            && send_client_message(&mut sink, &ClientMessage::Unsubscribe { vehicle_id })
                                .await
                                .is_err()
                        {
                            return SessionEnd::Dropped(Some("send failed".to_string()));
                        }
                    }
                    Some(Command::Disconnect) => {
                        let _ = sink
                            .send(Message::Close(Some(CloseFrame {
                                code: CloseCode::from(CLIENT_DISCONNECT_CLOSE_CODE),
                                reason: "client disconnect".into(),
                            })))
                            .await;
                        return SessionEnd::Closed;
                    }
                    Some(Command::Reconnect) => {}
                    None => {
                        let _ = sink
                            .send(Message::Close(Some(CloseFrame {
                                code: CloseCode::from(CLIENT_DISCONNECT_CLOSE_CODE),
                                reason: "client dropped".into(),
                            })))
                            .await;
                        return SessionEnd::HandleGone;
                    }
                },
            }
        }
    }

    /// Disconnected state: a single cancellable reconnect timer.
    async fn wait_out_backoff(&mut self, delay: Duration) -> SessionEnd {
        let timer = tokio::time::sleep(delay);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                _ = &mut timer => return SessionEnd::Dropped(None),
                command = self.commands.recv() => match command {
                    Some(Command::Subscribe(vehicle_id)) => { self.desired.insert(vehicle_id); }
                    Some(Command::Unsubscribe(vehicle_id)) => { self.desired.remove(&vehicle_id); }
                    Some(Command::Disconnect) => return SessionEnd::Closed,
                    Some(Command::Reconnect) => return SessionEnd::Dropped(None),
                    None => return SessionEnd::HandleGone,
                },
            }
        }
    }

    /// Closed state: nothing happens until `reconnect()`.
    async fn idle_until_reconnect(&mut self) -> IdleEnd {
        self.publish(ClientState::Closed, None);
        self.attempt = 0;

        loop {
            match self.commands.recv().await {
                Some(Command::Subscribe(vehicle_id)) => {
                    self.desired.insert(vehicle_id);
                }
                Some(Command::Unsubscribe(vehicle_id)) => {
                    self.desired.remove(&vehicle_id);
                }
                Some(Command::Disconnect) => {}
                Some(Command::Reconnect) => return IdleEnd::Resume,
                None => return IdleEnd::HandleGone,
            }
        }
    }

    fn publish(&self, state: ClientState, last_error: Option<String>) {
        let _ = self.status.send(ClientStatus { state, last_error });
    }
}

async fn send_client_message<S>(
    sink: &mut S,
    message: &ClientMessage,
) -> Result<(), tokio_tungstenite::tungstenite::Error>
where
    S: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let text = serde_json::to_string(message).unwrap_or_default();
    sink.send(Message::text(text)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_starts_connecting() {
        // No server is listening; the client should report the failure
        // through the watch channel without panicking.
        let client = LiveLocationClient::connect(
            ClientConfig {
                url: "ws://127.0.0.1:1/api/v1/live".to_string(),
                reconnect_base: Duration::from_millis(50),
                reconnect_max: Duration::from_millis(200),
            },
            |_| {},
        );

        let mut status = client.status();
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                status.changed().await.unwrap();
                let snapshot = status.borrow().clone();
                if snapshot.state == ClientState::Disconnected {
                    assert!(snapshot.last_error.is_some());
                    break;
                }
            }
        })
        .await
        .expect("Never observed Disconnected state");
    }
}
