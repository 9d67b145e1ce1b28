use std::collections::{HashSet, VecDeque};
use std::fmt;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::ProviderId;

use super::envelope::{Message, Priority, WireEnvelope};
use super::rooms::RoomId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        ConnectionId(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A push-layer connection: its room memberships and its bounded,
/// priority-aware outbound queue. Synchronization is per-subscriber only —
/// no lock is ever held across subscribers.
pub struct Subscriber {
    pub id: ConnectionId,
    pub rooms: HashSet<RoomId>,
    pub is_provider: bool,
    pub provider_id: Option<ProviderId>,
    pub healthy: bool,
    pub dropped_count: u64,
    pub messages_sent: u64,
    pub ema_batch_size: f64,
    queue: VecDeque<Message>,
    transport: mpsc::Sender<WireEnvelope>,
}

const EMA_ALPHA: f64 = 0.1;

impl Subscriber {
    pub fn new(
        id: ConnectionId,
        is_provider: bool,
        provider_id: Option<ProviderId>,
        transport: mpsc::Sender<WireEnvelope>,
    ) -> Self {
        Self {
            id,
            rooms: HashSet::new(),
            is_provider,
            provider_id,
            healthy: true,
            dropped_count: 0,
            messages_sent: 0,
            ema_batch_size: 0.0,
            queue: VecDeque::new(),
            transport,
        }
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Enqueue one message under the capacity/eviction policy from spec
    /// §4.4. Returns `true` if the message was queued, `false` if dropped.
    pub fn enqueue(&mut self, message: Message, capacity: usize, hard_cap: usize) -> bool {
        if self.queue.len() < capacity {
            self.queue.push_back(message);
            return true;
        }

        if message.priority == Priority::Low {
            self.dropped_count += 1;
            return false;
        }

        if let Some(pos) = self.queue.iter().position(|m| m.priority == Priority::Low) {
            self.queue.remove(pos);
            self.dropped_count += 1;
            self.queue.push_back(message);
            return true;
        }

        if self.queue.len() < hard_cap {
            self.queue.push_back(message);
            return true;
        }

        if let Some(pos) = self.queue.iter().position(|m| m.priority == Priority::Medium) {
            self.queue.remove(pos);
            self.dropped_count += 1;
        }
        // If only HIGH remains queued, the message is still enqueued: HIGH
        // delivery is never dropped even if this briefly exceeds hard_cap.
        self.queue.push_back(message);
        true
    }

    /// Drain up to `max_batch_size` messages, stable-sorted HIGH first,
    /// grouping same-event messages into a single `<event>_batch` envelope.
    pub fn drain_batch(&mut self, max_batch_size: usize) -> Vec<WireEnvelope> {
        let take = max_batch_size.min(self.queue.len());
        let mut drained: Vec<Message> = self.queue.drain(..take).collect();
        drained.sort_by_key(|m| m.priority);

        self.ema_batch_size = if self.messages_sent == 0 && drained.is_empty() {
            self.ema_batch_size
        } else {
            EMA_ALPHA * drained.len() as f64 + (1.0 - EMA_ALPHA) * self.ema_batch_size
        };

        let mut envelopes = Vec::new();
        let mut idx = 0;
        while idx < drained.len() {
            let event = drained[idx].event;
            let mut group = vec![drained[idx].payload.clone()];
            let timestamp = drained[idx].timestamp.timestamp_millis();
            idx += 1;
            while idx < drained.len() && drained[idx].event == event {
                group.push(drained[idx].payload.clone());
                idx += 1;
            }
            let envelope = if group.len() == 1 {
                WireEnvelope::Single {
                    event_type: event.to_string(),
                    payload: group.into_iter().next().unwrap(),
                    timestamp,
                }
            } else {
                WireEnvelope::Batch {
                    event_type: format!("{event}_batch"),
                    count: group.len(),
                    payload: group,
                    timestamp,
                }
            };
            envelopes.push(envelope);
        }
        envelopes
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Send one envelope to the transport task. Non-blocking: a full or
    /// closed channel marks the subscriber unhealthy rather than awaiting.
    pub fn try_deliver(&mut self, envelope: WireEnvelope) {
        match self.transport.try_send(envelope) {
            Ok(()) => self.messages_sent += 1,
            Err(_) => self.healthy = false,
        }
    }

    pub fn mark_unhealthy(&mut self) {
        self.healthy = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn msg(priority: Priority) -> Message {
        msg_with_event("stats", priority)
    }

    fn msg_with_event(event: &'static str, priority: Priority) -> Message {
        Message {
            event,
            payload: serde_json::json!({}),
            priority,
            timestamp: Utc::now(),
        }
    }

    fn make_subscriber() -> Subscriber {
        let (tx, _rx) = mpsc::channel(1024);
        Subscriber::new(ConnectionId::new(), false, None, tx)
    }

    #[test]
    fn scenario_s4_backpressure_sequence() {
        let mut sub = make_subscriber();
        let capacity = 4;
        let hard_cap = 8;

        assert!(sub.enqueue(msg(Priority::Low), capacity, hard_cap));
        assert!(sub.enqueue(msg(Priority::Low), capacity, hard_cap));
        assert!(sub.enqueue(msg(Priority::Low), capacity, hard_cap));
        // queue: [L, L, L] (3/4)
        assert!(sub.enqueue(msg(Priority::Low), capacity, hard_cap));
        // queue full at capacity: [L, L, L, L]
        assert!(sub.enqueue(msg_with_event("intent:completed", Priority::High), capacity, hard_cap));
        // evicts oldest L: [L, L, L, H]
        assert!(sub.enqueue(msg_with_event("intent:completed", Priority::High), capacity, hard_cap));
        // evicts oldest L: [L, L, H, H]
        assert_eq!(sub.queue_len(), 4);
        assert_eq!(sub.dropped_count, 2);

        let envelopes = sub.drain_batch(10);
        // stable sort puts both H first (submission order preserved), then both L;
        // distinct events (intent:completed vs stats) keep the two priority
        // classes from collapsing into one batch
        assert_eq!(envelopes.len(), 2);
        match &envelopes[0] {
            WireEnvelope::Batch { event_type, count, .. } => {
                assert_eq!(event_type, "intent:completed_batch");
                assert_eq!(*count, 2);
            }
            _ => panic!("expected a batch of 2 HIGH messages first"),
        }
        match &envelopes[1] {
            WireEnvelope::Batch { event_type, count, .. } => {
                assert_eq!(event_type, "stats_batch");
                assert_eq!(*count, 2);
            }
            _ => panic!("expected a batch of 2 LOW messages second"),
        }
    }

    #[test]
    fn low_priority_dropped_when_full_and_no_low_to_evict() {
        let mut sub = make_subscriber();
        let capacity = 2;
        let hard_cap = 4;
        assert!(sub.enqueue(msg(Priority::High), capacity, hard_cap));
        assert!(sub.enqueue(msg(Priority::High), capacity, hard_cap));
        assert!(!sub.enqueue(msg(Priority::Low), capacity, hard_cap));
        assert_eq!(sub.dropped_count, 1);
        assert_eq!(sub.queue_len(), 2);
    }

    #[test]
    fn high_is_never_dropped_even_past_hard_cap() {
        let mut sub = make_subscriber();
        let capacity = 2;
        let hard_cap = 3;
        for _ in 0..5 {
            assert!(sub.enqueue(msg(Priority::High), capacity, hard_cap));
        }
        assert_eq!(sub.dropped_count, 0);
    }
}
