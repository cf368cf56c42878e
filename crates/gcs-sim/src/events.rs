//! Event bus for engine event distribution

use gcs_core::{Event, EventType};

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Default number of events kept for late joiners
const DEFAULT_HISTORY: usize = 256;

/// Broadcasts engine events and keeps a short history
#[derive(Clone)]
pub struct EventBus {
    /// Broadcast sender for events
    sender: broadcast::Sender<Event>,
    /// Event history (last N events)
    history: Arc<RwLock<VecDeque<Event>>>,
    /// Maximum history size
    max_history: usize,
}

impl EventBus {
    /// Create a new event bus
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));

        Self {
            sender,
            history: Arc::new(RwLock::new(VecDeque::with_capacity(DEFAULT_HISTORY))),
            max_history: DEFAULT_HISTORY,
        }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publish an event
    pub fn publish(&self, event: Event) {
        {
            let mut history = self.history.write();
            history.push_back(event.clone());
            while history.len() > self.max_history {
                history.pop_front();
            }
        }

        let event_type = event.event_type;
        // Nobody listening is fine
        let receivers = self.sender.send(event).unwrap_or(0);

        debug!("Event {:?} published to {} receivers", event_type, receivers);
    }

    /// Get the most recent `count` events, oldest first
    pub fn get_recent(&self, count: usize) -> Vec<Event> {
        let history = self.history.read();
        let start = history.len().saturating_sub(count);
        history.iter().skip(start).cloned().collect()
    }

    /// Most recent events of one type, oldest first
    pub fn get_recent_of(&self, event_type: EventType, count: usize) -> Vec<Event> {
        let history = self.history.read();
        let mut matching: Vec<Event> = history
            .iter()
            .rev()
            .filter(|e| e.event_type == event_type)
            .take(count)
            .cloned()
            .collect();
        matching.reverse();
        matching
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
