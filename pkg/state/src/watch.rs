//! Change feed of the state store.
//!
//! Every write gets the next sequence number. The most recent writes are kept
//! for replay (`events_since`) and all of them are broadcast to live
//! subscribers. A subscriber that falls behind the channel sees
//! `RecvError::Lagged` and has to rebuild its view from the store.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Put,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchEvent {
    pub seq: u64,
    pub event_type: EventType,
    pub key: String,
    /// New value for `Put`, absent for `Delete`.
    #[serde(default)]
    pub value: Option<Vec<u8>>,
}

impl WatchEvent {
    /// An empty prefix matches every key.
    pub fn matches(&self, prefix: &str) -> bool {
        self.key.starts_with(prefix)
    }
}

struct Retained {
    last_seq: u64,
    recent: VecDeque<WatchEvent>,
    capacity: usize,
}

#[derive(Clone)]
pub struct EventLog {
    retained: Arc<Mutex<Retained>>,
    tx: broadcast::Sender<WatchEvent>,
}

impl EventLog {
    /// Keep up to `capacity` events for replay.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(16));
        Self {
            retained: Arc::new(Mutex::new(Retained {
                last_seq: 0,
                recent: VecDeque::with_capacity(capacity),
                capacity,
            })),
            tx,
        }
    }

    /// Sequence and broadcast one write. The lock is held while sending so
    /// subscribers observe writes in sequence order.
    pub async fn emit(&self, event_type: EventType, key: String, value: Option<Vec<u8>>) {
        let mut retained = self.retained.lock().await;
        retained.last_seq += 1;
        let event = WatchEvent {
            seq: retained.last_seq,
            event_type,
            key,
            value,
        };
        if retained.capacity > 0 {
            if retained.recent.len() == retained.capacity {
                retained.recent.pop_front();
            }
            retained.recent.push_back(event.clone());
        }
        // nobody listening is not an error
        let _ = self.tx.send(event);
    }

    pub async fn current_seq(&self) -> u64 {
        self.retained.lock().await.last_seq
    }

    /// Retained events with a sequence number above `after`, oldest first.
    /// Events older than the retention window are silently absent.
    pub async fn events_since(&self, after: u64) -> Vec<WatchEvent> {
        let retained = self.retained.lock().await;
        let start = retained.recent.partition_point(|e| e.seq <= after);
        retained.recent.range(start..).cloned().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn log_with(keys: &[&str], capacity: usize) -> EventLog {
        let log = EventLog::new(capacity);
        for key in keys {
            log.emit(EventType::Put, key.to_string(), Some(b"v".to_vec()))
                .await;
        }
        log
    }

    #[tokio::test]
    async fn replay_window_keeps_the_newest_events() {
        let log = log_with(&["a", "b", "c"], 2).await;
        let keys: Vec<String> = log
            .events_since(0)
            .await
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["b", "c"]);
        assert_eq!(log.current_seq().await, 3);
    }

    #[tokio::test]
    async fn replay_starts_after_the_given_sequence() {
        let log = log_with(&["a", "b", "c", "d"], 8).await;
        let seqs: Vec<u64> = log.events_since(2).await.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![3, 4]);
        assert!(log.events_since(4).await.is_empty());
    }

    #[tokio::test]
    async fn subscribers_receive_live_events() {
        let log = EventLog::new(8);
        let mut rx = log.subscribe();
        log.emit(EventType::Delete, "x".to_string(), None).await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.key, "x");
        assert_eq!(event.event_type, EventType::Delete);
        assert!(event.matches(""));
        assert!(!event.matches("y"));
    }
}
