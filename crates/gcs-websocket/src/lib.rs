//! # GCS WebSocket Server
//!
//! Real-time WebSocket server streaming simulation events to the dashboard.
//! Supports:
//! - Broadcast to all connected clients
//! - Per-client event-type subscriptions
//! - Mission start/end commands from the client
//!
//! ## Protocol
//!
//! Messages are JSON-encoded using the types from `gcs_core::events`:
//! - Server → Client: `ServerMessage` (a `Snapshot` is sent first on connect)
//! - Client → Server: `ClientMessage`

pub mod error;
pub mod hub;

pub use error::{WsError, WsResult};
pub use hub::WebSocketHub;

use gcs_core::{ClientMessage, Event, ServerMessage};

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::{Error as TungsteniteError, Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Interval between server heartbeats
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Start the WebSocket server
pub async fn start_server(hub: Arc<WebSocketHub>, port: u16) -> WsResult<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("WebSocket server listening on ws://{}", addr);
    serve(hub, listener).await
}

/// Accept connections on an already-bound listener
pub async fn serve(hub: Arc<WebSocketHub>, listener: TcpListener) -> WsResult<()> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let hub = hub.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(hub, stream, addr).await {
                        error!("WebSocket connection error from {}: {}", addr, e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept WebSocket connection: {}", e);
            }
        }
    }
}

/// Handle a single WebSocket connection
async fn handle_connection(
    hub: Arc<WebSocketHub>,
    stream: TcpStream,
    addr: SocketAddr,
) -> WsResult<()> {
    let ws_stream = accept_async(stream).await?;
    let (ws_sender, ws_receiver) = ws_stream.split();

    let client_id = Uuid::new_v4();
    info!("WebSocket client {} connected from {}", client_id, addr);

    serve_client(hub, client_id, ws_sender, ws_receiver).await
}

/// Keep `client_id` registered with the hub for the lifetime of one session
async fn serve_client<S, R>(
    hub: Arc<WebSocketHub>,
    client_id: Uuid,
    ws_sender: S,
    ws_receiver: R,
) -> WsResult<()>
where
    S: Sink<Message, Error = TungsteniteError> + Unpin,
    R: Stream<Item = Result<Message, TungsteniteError>> + Send + Unpin + 'static,
{
    let broadcast_rx = hub.register_client(client_id);
    let result = run_session(&hub, client_id, broadcast_rx, ws_sender, ws_receiver).await;
    hub.unregister_client(client_id);
    info!("WebSocket client {} disconnected", client_id);
    result
}

/// Pump one client: initial snapshot, then events, replies and heartbeats
async fn run_session<S, R>(
    hub: &Arc<WebSocketHub>,
    client_id: Uuid,
    mut broadcast_rx: broadcast::Receiver<Event>,
    mut ws_sender: S,
    mut ws_receiver: R,
) -> WsResult<()>
where
    S: Sink<Message, Error = TungsteniteError> + Unpin,
    R: Stream<Item = Result<Message, TungsteniteError>> + Send + Unpin + 'static,
{
    // Initial state
    if let Some(snapshot) = hub.current_snapshot() {
        let msg = serde_json::to_string(&ServerMessage::Snapshot(Box::new(snapshot)))?;
        ws_sender.send(Message::Text(msg.into())).await?;
    }

    // Direct replies to this client
    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerMessage>(16);

    let hub_clone = hub.clone();
    let mut incoming_handle = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    match handle_client_message(&hub_clone, client_id, text.as_str()) {
                        Ok(Some(reply)) => {
                            if reply_tx.send(reply).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!("Error handling client message: {}", e);
                            let reply = ServerMessage::Error {
                                code: "BAD_MESSAGE".to_string(),
                                message: e.to_string(),
                            };
                            if reply_tx.send(reply).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                Ok(Message::Ping(_)) => {
                    // tungstenite answers pings itself
                    debug!("Received ping from {}", client_id);
                }
                Ok(Message::Close(_)) => {
                    info!("Client {} sent close frame", client_id);
                    break;
                }
                Ok(Message::Binary(_)) => {
                    warn!("Received unexpected binary message from {}", client_id);
                }
                Err(e) => {
                    error!("Error receiving message from {}: {}", client_id, e);
                    break;
                }
                _ => {}
            }
        }
    });

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;

    loop {
        let outgoing = tokio::select! {
            result = broadcast_rx.recv() => {
                match result {
                    Ok(event) => {
                        if !hub.wants(client_id, event.event_type) {
                            continue;
                        }
                        ServerMessage::Event(event)
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Client {} lagged by {} messages", client_id, n);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Broadcast channel closed");
                        break;
                    }
                }
            }
            Some(reply) = reply_rx.recv() => reply,
            _ = heartbeat.tick() => ServerMessage::Ping {
                timestamp: chrono::Utc::now().timestamp_millis(),
            },
            _ = &mut incoming_handle => break,
        };

        match serde_json::to_string(&outgoing) {
            Ok(json) => {
                if let Err(e) = ws_sender.send(Message::Text(json.into())).await {
                    error!("Failed to send to client {}: {}", client_id, e);
                    break;
                }
            }
            Err(e) => {
                error!("Failed to serialize message: {}", e);
            }
        }
    }

    incoming_handle.abort();
    Ok(())
}

/// Handle a message from a client, returning a direct reply if any
fn handle_client_message(
    hub: &WebSocketHub,
    client_id: Uuid,
    text: &str,
) -> WsResult<Option<ServerMessage>> {
    let msg: ClientMessage = serde_json::from_str(text)?;

    match msg {
        ClientMessage::Subscribe { event_types } => {
            debug!("Client {} subscribing to {:?}", client_id, event_types);
            hub.subscribe(client_id, event_types);
        }
        ClientMessage::Unsubscribe { event_types } => {
            debug!("Client {} unsubscribing from {:?}", client_id, event_types);
            hub.unsubscribe(client_id, event_types);
        }
        ClientMessage::GetSnapshot => {
            debug!("Client {} requesting snapshot", client_id);
            return Ok(hub
                .current_snapshot()
                .map(|s| ServerMessage::Snapshot(Box::new(s))));
        }
        ClientMessage::Command(command) => {
            info!("Client {} sent mission command {:?}", client_id, command);
            hub.handle_command(command);
        }
        ClientMessage::Ping { timestamp } => {
            debug!("Client {} ping: {}", client_id, timestamp);
        }
    }

    Ok(None)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gcs_core::{Event, EventType, MissionCommand, TelemetrySnapshot, FALLBACK_HOME};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_tungstenite::connect_async;

    #[test]
    fn test_hub_creation() {
        let hub = WebSocketHub::new();
        assert_eq!(hub.client_count(), 0);
    }

    #[test]
    fn test_get_snapshot_reply() {
        let hub = WebSocketHub::new();
        hub.set_snapshot_source(TelemetrySnapshot::default);

        let reply = handle_client_message(&hub, Uuid::new_v4(), r#"{"type":"GetSnapshot"}"#)
            .unwrap();
        assert!(matches!(reply, Some(ServerMessage::Snapshot(_))));
    }

    #[test]
    fn test_mission_command_forwarded() {
        let hub = WebSocketHub::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        hub.set_command_handler(move |cmd| {
            assert_eq!(cmd, MissionCommand::End);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let reply =
            handle_client_message(&hub, Uuid::new_v4(), r#"{"type":"Command","payload":"END"}"#)
                .unwrap();
        assert!(reply.is_none());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_client_ping_needs_no_reply() {
        let hub = WebSocketHub::new();
        let reply = handle_client_message(
            &hub,
            Uuid::new_v4(),
            r#"{"type":"Ping","payload":{"timestamp":1}}"#,
        )
        .unwrap();
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn test_failed_initial_send_unregisters_client() {
        let hub = Arc::new(WebSocketHub::new());
        hub.set_snapshot_source(TelemetrySnapshot::default);

        let closed_sink = Box::pin(futures_util::sink::unfold((), |(), _msg: Message| async {
            Err::<(), _>(TungsteniteError::ConnectionClosed)
        }));
        let silent = futures_util::stream::pending::<Result<Message, TungsteniteError>>();

        let result = serve_client(hub.clone(), Uuid::new_v4(), closed_sink, silent).await;

        assert!(matches!(result, Err(WsError::WebSocket(_))));
        assert_eq!(hub.client_count(), 0);
    }

    #[test]
    fn test_malformed_message() {
        let hub = WebSocketHub::new();
        let result = handle_client_message(&hub, Uuid::new_v4(), "not json");
        assert!(matches!(result, Err(WsError::Json(_))));
    }

    async fn next_server_message<S>(stream: &mut S) -> ServerMessage
    where
        S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(text.as_str()).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("unexpected frame: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_snapshot_then_events() {
        let hub = Arc::new(WebSocketHub::new());
        hub.set_snapshot_source(TelemetrySnapshot::default);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(hub.clone(), listener));

        let (mut client, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

        let first = next_server_message(&mut client).await;
        assert!(matches!(first, ServerMessage::Snapshot(_)));

        hub.broadcast(Event::home_resolved(FALLBACK_HOME));
        match next_server_message(&mut client).await {
            ServerMessage::Event(event) => {
                assert_eq!(event.event_type, EventType::HomePositionResolved)
            }
            other => panic!("expected event, got {:?}", other),
        }

        client
            .send(Message::Text(r#"{"type":"GetSnapshot"}"#.into()))
            .await
            .unwrap();
        assert!(matches!(
            next_server_message(&mut client).await,
            ServerMessage::Snapshot(_)
        ));
    }
}
