//! Push fan-out layer (component D).
//!
//! Each subscriber owns a bounded priority queue (`subscriber::Subscriber`)
//! rather than sharing a single broadcast channel per room, so one slow
//! reader's backpressure never throttles delivery to the rest of a room.
//! A shared flush tick drains every subscriber's queue on an interval.

pub mod envelope;
pub mod rooms;
pub mod subscriber;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use envelope::{Message, Priority, PushEvent, WireEnvelope};
pub use rooms::RoomId;
pub use subscriber::{ConnectionId, Subscriber};

#[derive(Debug, Clone, Copy)]
pub struct PushConfig {
    pub backpressure_threshold: usize,
    pub batch_interval: StdDuration,
    pub max_batch_size: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            backpressure_threshold: 100,
            batch_interval: StdDuration::from_millis(100),
            max_batch_size: 50,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct PushStats {
    pub total_connections: u64,
    pub active_connections: u64,
    pub provider_connections: u64,
    pub dashboard_connections: u64,
    pub messages_sent: u64,
    pub messages_dropped: u64,
    pub avg_batch_size: f64,
}

pub struct PushLayer {
    config: PushConfig,
    rooms: DashMap<RoomId, HashSet<ConnectionId>>,
    subscribers: DashMap<ConnectionId, Mutex<Subscriber>>,
    total_connections: AtomicU64,
    total_disconnections: AtomicU64,
}

impl PushLayer {
    pub fn new(config: PushConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            rooms: DashMap::new(),
            subscribers: DashMap::new(),
            total_connections: AtomicU64::new(0),
            total_disconnections: AtomicU64::new(0),
        })
    }

    /// Register a new connection and send the `CONNECTED` welcome directly
    /// (outside the priority queue — it is not a lifecycle event emission).
    pub fn connect(
        &self,
        is_provider: bool,
        provider_id: Option<crate::domain::ProviderId>,
        transport: mpsc::Sender<WireEnvelope>,
    ) -> ConnectionId {
        let id = ConnectionId::new();
        let mut subscriber = Subscriber::new(id, is_provider, provider_id, transport);
        subscriber.try_deliver(WireEnvelope::Single {
            event_type: "connected".to_string(),
            payload: serde_json::json!({ "connectionId": id.to_string() }),
            timestamp: chrono::Utc::now().timestamp_millis(),
        });
        self.subscribers.insert(id, Mutex::new(subscriber));
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        id
    }

    pub fn join(&self, conn: ConnectionId, room: RoomId) {
        if let Some(entry) = self.subscribers.get(&conn) {
            entry.lock().rooms.insert(room.clone());
        }
        self.rooms.entry(room).or_default().insert(conn);
    }

    pub fn leave(&self, conn: ConnectionId, room: &RoomId) {
        if let Some(entry) = self.subscribers.get(&conn) {
            entry.lock().rooms.remove(room);
        }
        if let Some(mut members) = self.rooms.get_mut(room) {
            members.remove(&conn);
        }
    }

    /// Send a one-shot snapshot (current intent + bids) as a single MEDIUM
    /// message, outside of batching, per the re-join rule in spec §4.4.
    pub fn send_snapshot(&self, conn: ConnectionId, intent: &crate::domain::Intent, bids: &[crate::domain::Bid]) {
        if let Some(entry) = self.subscribers.get(&conn) {
            let mut subscriber = entry.lock();
            subscriber.try_deliver(WireEnvelope::Single {
                event_type: "intent:snapshot".to_string(),
                payload: serde_json::json!({ "intent": intent, "bids": bids }),
                timestamp: chrono::Utc::now().timestamp_millis(),
            });
        }
    }

    pub fn disconnect(&self, conn: ConnectionId) {
        if let Some((_, subscriber)) = self.subscribers.remove(&conn) {
            let rooms: Vec<RoomId> = subscriber.lock().rooms.iter().cloned().collect();
            for room in rooms {
                if let Some(mut members) = self.rooms.get_mut(&room) {
                    members.remove(&conn);
                }
            }
            self.total_disconnections.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn mark_unhealthy(&self, conn: ConnectionId) {
        if let Some(entry) = self.subscribers.get(&conn) {
            entry.lock().mark_unhealthy();
        }
    }

    /// Enqueue a domain event onto every subscriber in its target rooms.
    /// Never awaits — safe to call from the engine's per-intent critical
    /// section without risking a blocked producer.
    pub fn emit(&self, event: PushEvent) {
        let message: Message = (&event).into();
        let mut targeted: HashSet<ConnectionId> = HashSet::new();
        for room in event.rooms() {
            if let Some(members) = self.rooms.get(&room) {
                targeted.extend(members.iter().copied());
            }
        }
        for conn in targeted {
            if let Some(entry) = self.subscribers.get(&conn) {
                let mut subscriber = entry.lock();
                if !subscriber.healthy {
                    continue;
                }
                let queued = subscriber.enqueue(
                    message.clone(),
                    self.config.backpressure_threshold,
                    2 * self.config.backpressure_threshold,
                );
                if !queued {
                    tracing::debug!(connection = %conn, event = event.name(), "dropped LOW-priority message under backpressure");
                }
            }
        }
    }

    /// One flush pass over every healthy, pending subscriber. Called by the
    /// shared flush tick spawned in `main`.
    pub fn flush_once(&self) {
        for entry in self.subscribers.iter() {
            let mut subscriber = entry.value().lock();
            if !subscriber.healthy || !subscriber.has_pending() {
                continue;
            }
            let envelopes = subscriber.drain_batch(self.config.max_batch_size);
            for envelope in envelopes {
                subscriber.try_deliver(envelope);
            }
        }
    }

    pub fn spawn_flush_task(self: &Arc<Self>) -> JoinHandle<()> {
        let layer = Arc::clone(self);
        let interval = self.config.batch_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                layer.flush_once();
            }
        })
    }

    pub fn stats(&self) -> PushStats {
        let mut stats = PushStats::default();
        stats.total_connections = self.total_connections.load(Ordering::Relaxed);
        let disconnected = self.total_disconnections.load(Ordering::Relaxed);
        stats.active_connections = stats.total_connections.saturating_sub(disconnected);
        let mut batch_sizes = 0.0;
        let mut count = 0u64;
        for entry in self.subscribers.iter() {
            let subscriber = entry.value().lock();
            if subscriber.is_provider {
                stats.provider_connections += 1;
            }
            if subscriber.rooms.contains(&RoomId::Dashboard) {
                stats.dashboard_connections += 1;
            }
            stats.messages_sent += subscriber.messages_sent;
            stats.messages_dropped += subscriber.dropped_count;
            batch_sizes += subscriber.ema_batch_size;
            count += 1;
        }
        stats.avg_batch_size = if count > 0 { batch_sizes / count as f64 } else { 0.0 };
        stats
    }
}
