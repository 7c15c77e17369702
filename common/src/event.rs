use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::store::{ConnectionState, Reading};

/// A normalized event handed from the connection manager to the render-side
/// reconciler. Produced on the broker thread, consumed exactly once per
/// render tick.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundEvent {
    /// A successfully decoded sensor reading.
    SensorReading { topic: String, reading: Reading },
    /// The broker connection moved to a new state.
    ConnectionStatus(ConnectionState),
    /// A payload that could not be decoded; carried for logging only and
    /// never applied to the store.
    DecodeError { topic: String, payload: String },
}

/// Thread-safe FIFO for passing events between the broker thread and the
/// render tick. `push` never blocks the producer; `drain_all` removes every
/// queued event at once, preserving arrival order.
///
/// The queue is unbounded. Capping it, together with an overflow policy,
/// is left as an extension point.
#[derive(Clone, Default)]
pub struct EventQueue(Arc<Mutex<VecDeque<InboundEvent>>>);

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `event` to the queue.
    ///
    /// # Panics
    ///
    /// If locking the internally used mutex fails.
    pub fn push(&self, event: InboundEvent) {
        self.0.lock().unwrap().push_back(event);
    }

    /// Removes and returns all queued events in arrival order.
    ///
    /// # Panics
    ///
    /// If locking the internally used mutex fails.
    pub fn drain_all(&self) -> Vec<InboundEvent> {
        self.0.lock().unwrap().drain(..).collect()
    }
}
