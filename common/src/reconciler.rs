use log::warn;

use crate::event::{EventQueue, InboundEvent};
use crate::store::StateStore;

/// Drains the inbound queue and applies every event to the store, in arrival
/// order. Called once per render tick, before classification.
///
/// Decode errors never mutate state; they are only surfaced to the log.
pub fn reconcile(queue: &EventQueue, store: &mut StateStore) {
    for event in queue.drain_all() {
        match event {
            InboundEvent::SensorReading { topic, reading } => store.record(&topic, reading),
            InboundEvent::ConnectionStatus(state) => store.set_connection(state),
            InboundEvent::DecodeError { topic, payload } => {
                warn!("dropping undecodable payload on {topic}: {payload}");
            }
        }
    }
}
