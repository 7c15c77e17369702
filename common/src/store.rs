use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, FixedOffset, Local};

/// One timestamped value received for a channel.
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub value: f64,
    /// Optional producer-supplied status label, passed through verbatim.
    pub status: Option<String>,
    pub timestamp: DateTime<FixedOffset>,
}

impl Reading {
    /// Creates a reading stamped with the current wall-clock time.
    pub fn now(value: f64, status: Option<String>) -> Self {
        Self { value, status, timestamp: Local::now().fixed_offset() }
    }
}

/// Lifecycle of the broker connection, as shown in the dashboard header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// The last attempt failed; waiting before reconnecting.
    Backoff,
}

/// Per-channel latest reading plus a capped history buffer, and the last
/// reconciled connection state.
///
/// Owned by the render side and mutated only through [`crate::reconcile`];
/// everything else reads. Entries are created lazily on the first reading
/// for a channel and live for the process lifetime.
pub struct StateStore {
    latest: HashMap<String, Reading>,
    history: HashMap<String, VecDeque<Reading>>,
    connection: ConnectionState,
    history_cap: usize,
}

impl StateStore {
    pub fn new(history_cap: usize) -> Self {
        Self {
            latest: HashMap::new(),
            history: HashMap::new(),
            connection: ConnectionState::default(),
            history_cap,
        }
    }

    /// The most recently reconciled reading for `topic`, if any arrived yet.
    pub fn latest(&self, topic: &str) -> Option<&Reading> {
        self.latest.get(topic)
    }

    /// The retained readings for `topic`, oldest first.
    pub fn history(&self, topic: &str) -> impl Iterator<Item = &Reading> {
        self.history.get(topic).into_iter().flatten()
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Records a reading: latest and history are updated together so the two
    /// views never disagree. Evicts the oldest entry once the buffer exceeds
    /// its cap.
    pub(crate) fn record(&mut self, topic: &str, reading: Reading) {
        let buffer = self.history.entry(topic.to_string()).or_default();
        buffer.push_back(reading.clone());
        while buffer.len() > self.history_cap {
            buffer.pop_front();
        }

        self.latest.insert(topic.to_string(), reading);
    }

    pub(crate) fn set_connection(&mut self, state: ConnectionState) {
        self.connection = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_and_history_update_together() {
        let mut store = StateStore::new(200);
        store.record("alat/suhu", Reading::now(21.0, None));
        store.record("alat/suhu", Reading::now(24.5, Some("OK".into())));

        assert_eq!(store.latest("alat/suhu").unwrap().value, 24.5);
        let values: Vec<f64> = store.history("alat/suhu").map(|r| r.value).collect();
        assert_eq!(values, [21.0, 24.5]);
    }

    #[test]
    fn history_evicts_oldest_beyond_cap() {
        let mut store = StateStore::new(3);
        for value in 0..5 {
            store.record("alat/asap", Reading::now(value as f64, None));
        }

        let values: Vec<f64> = store.history("alat/asap").map(|r| r.value).collect();
        assert_eq!(values, [2.0, 3.0, 4.0]);
        assert_eq!(store.latest("alat/asap").unwrap().value, 4.0);
    }

    #[test]
    fn unknown_topic_reads_as_empty() {
        let store = StateStore::new(200);
        assert!(store.latest("alat/cahaya").is_none());
        assert_eq!(store.history("alat/cahaya").count(), 0);
    }
}
