//! WebSocket connection hub
//!
//! Tracks connected dashboard clients, their event-type subscriptions, and
//! fans engine events out to them.

use gcs_core::{Event, EventType, MissionCommand, TelemetrySnapshot};

use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Broadcast channel capacity
const BROADCAST_CAPACITY: usize = 1024;

type CommandHandler = Box<dyn Fn(MissionCommand) + Send + Sync>;
type SnapshotSource = Box<dyn Fn() -> TelemetrySnapshot + Send + Sync>;

/// WebSocket connection hub
pub struct WebSocketHub {
    /// Broadcast sender for events
    broadcast_tx: broadcast::Sender<Event>,
    /// Connected clients
    clients: DashMap<Uuid, ClientState>,
    /// Total message count
    message_count: AtomicUsize,
    /// Mission start/end requests from clients
    command_handler: RwLock<Option<CommandHandler>>,
    /// Current telemetry, sent on connect and on request
    snapshot_source: RwLock<Option<SnapshotSource>>,
}

/// State for a connected client
#[derive(Debug)]
struct ClientState {
    /// Subscribed event types (None = all)
    subscriptions: Option<HashSet<EventType>>,
    /// Connection timestamp
    connected_at: chrono::DateTime<chrono::Utc>,
}

impl WebSocketHub {
    /// Create a new WebSocket hub
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);

        Self {
            broadcast_tx,
            clients: DashMap::new(),
            message_count: AtomicUsize::new(0),
            command_handler: RwLock::new(None),
            snapshot_source: RwLock::new(None),
        }
    }

    /// Register a new client and return a broadcast receiver
    pub fn register_client(&self, client_id: Uuid) -> broadcast::Receiver<Event> {
        let state = ClientState {
            subscriptions: None,
            connected_at: chrono::Utc::now(),
        };

        self.clients.insert(client_id, state);
        info!("Client {} registered ({} total)", client_id, self.clients.len());

        self.broadcast_tx.subscribe()
    }

    /// Unregister a client
    pub fn unregister_client(&self, client_id: Uuid) {
        if let Some((_, state)) = self.clients.remove(&client_id) {
            let connected_for = chrono::Utc::now() - state.connected_at;
            info!(
                "Client {} unregistered after {}s ({} remaining)",
                client_id,
                connected_for.num_seconds(),
                self.clients.len()
            );
        }
    }

    /// Get number of connected clients
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Broadcast an event to all clients
    pub fn broadcast(&self, event: Event) {
        self.message_count.fetch_add(1, Ordering::Relaxed);

        // Drops if no receivers
        let _ = self.broadcast_tx.send(event);
    }

    /// Whether `client_id` should receive events of `event_type`
    pub fn wants(&self, client_id: Uuid, event_type: EventType) -> bool {
        self.clients
            .get(&client_id)
            .map(|c| match &c.subscriptions {
                None => true,
                Some(types) => types.contains(&event_type),
            })
            .unwrap_or(false)
    }

    /// Restrict a client to specific event types
    pub fn subscribe(&self, client_id: Uuid, event_types: Option<Vec<EventType>>) {
        if let Some(mut client) = self.clients.get_mut(&client_id) {
            client.subscriptions = event_types.map(|types| types.into_iter().collect());
            debug!("Client {} subscriptions updated", client_id);
        }
    }

    /// Drop event types from a client's subscriptions
    pub fn unsubscribe(&self, client_id: Uuid, event_types: Option<Vec<EventType>>) {
        if let Some(mut client) = self.clients.get_mut(&client_id) {
            match event_types {
                Some(types) => {
                    let subs = client
                        .subscriptions
                        .get_or_insert_with(|| EventType::ALL.into_iter().collect());
                    for t in types {
                        subs.remove(&t);
                    }
                }
                None => client.subscriptions = Some(HashSet::new()),
            }
            debug!("Client {} unsubscribed", client_id);
        }
    }

    /// Set command handler callback
    pub fn set_command_handler<F>(&self, handler: F)
    where
        F: Fn(MissionCommand) + Send + Sync + 'static,
    {
        *self.command_handler.write() = Some(Box::new(handler));
    }

    /// Handle a command from a client
    pub fn handle_command(&self, command: MissionCommand) {
        if let Some(ref handler) = *self.command_handler.read() {
            handler(command);
        } else {
            warn!("No command handler registered");
        }
    }

    /// Set where the current snapshot comes from
    pub fn set_snapshot_source<F>(&self, source: F)
    where
        F: Fn() -> TelemetrySnapshot + Send + Sync + 'static,
    {
        *self.snapshot_source.write() = Some(Box::new(source));
    }

    /// Current snapshot, if a source is registered
    pub fn current_snapshot(&self) -> Option<TelemetrySnapshot> {
        self.snapshot_source.read().as_ref().map(|source| source())
    }

    /// Get total messages broadcast
    pub fn message_count(&self) -> usize {
        self.message_count.load(Ordering::Relaxed)
    }
}

impl Default for WebSocketHub {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
