//! Broker connection management.
//!
//! The connection manager owns the subscribe/receive/reconnect lifecycle on
//! its own thread and communicates with the render side exclusively through
//! the inbound event queue. The broker sits behind the
//! [`BrokerConnector`]/[`BrokerSession`] seam, so the manager can be driven
//! by scripted sessions in tests.

mod mqtt;

pub use mqtt::{MqttConnector, MqttPublisher};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::event::{EventQueue, InboundEvent};
use crate::registry::Registry;
use crate::store::{ConnectionState, Reading};

/// A broker-side failure. Always recovered by backing off and reconnecting;
/// surfaced to the user only through the connection indicator.
#[derive(Debug, Error)]
#[error("broker connection failed: {reason}")]
pub struct BrokerError {
    reason: String,
}

impl BrokerError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Failure to hand an outbound command to the broker. Logged, never fatal.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("not connected to the broker")]
    NotConnected,
    #[error("publish rejected: {0}")]
    Rejected(String),
}

/// A raw inbound message, before decoding.
#[derive(Clone, Debug, PartialEq)]
pub struct RawMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// A live broker session with all sensor subscriptions in place.
pub trait BrokerSession {
    /// Blocks until the next inbound message arrives. Errors once the
    /// connection drops; the manager then backs off and reconnects.
    fn next_message(&mut self) -> Result<RawMessage, BrokerError>;
}

/// Establishes broker sessions: one connect call subscribes every sensor
/// channel of the registry. Implemented over MQTT in production and by
/// scripted fakes in tests.
pub trait BrokerConnector {
    type Session: BrokerSession;

    fn connect(&mut self, registry: &Registry) -> Result<Self::Session, BrokerError>;
}

/// Outbound half of the broker link: publishes plain-text actuation
/// commands.
pub trait CommandSink {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError>;
}

pub type CommandSinkPointer = Arc<dyn CommandSink + Send + Sync>;

/// Wire shape of a sensor payload.
#[derive(Deserialize)]
struct RawReading {
    value: f64,
    status: Option<String>,
}

/// Decodes one raw message into the event the reconciler consumes. A failed
/// decode drops the message; only the connection is ever retried.
fn decode(message: RawMessage) -> InboundEvent {
    match serde_json::from_slice::<RawReading>(&message.payload) {
        Ok(raw) => InboundEvent::SensorReading {
            topic: message.topic,
            reading: Reading::now(raw.value, raw.status),
        },
        Err(err) => {
            debug!("decode failed on {}: {err}", message.topic);
            InboundEvent::DecodeError {
                topic: message.topic,
                payload: String::from_utf8_lossy(&message.payload).into_owned(),
            }
        }
    }
}

/// Owns the subscription lifecycle: connect, subscribe, receive, reconnect
/// with a fixed backoff. Touches no shared state other than the event
/// queue.
pub struct ConnectionManager<C: BrokerConnector> {
    connector: C,
    registry: Arc<Registry>,
    queue: EventQueue,
    backoff: Duration,
    shutdown: Arc<AtomicBool>,
}

impl<C: BrokerConnector> ConnectionManager<C> {
    pub fn new(
        connector: C,
        registry: Arc<Registry>,
        queue: EventQueue,
        backoff: Duration,
    ) -> Self {
        Self {
            connector,
            registry,
            queue,
            backoff,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Raise this flag to stop the loop before its next reconnect attempt.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Starts the connection loop on its own background thread.
    pub fn spawn(self) -> std::thread::JoinHandle<()>
    where
        C: Send + 'static,
    {
        std::thread::spawn(move || self.run())
    }

    /// Runs the connection loop. Does not return until the shutdown flag is
    /// raised; there is no retry limit.
    pub fn run(mut self) {
        while !self.shutdown.load(Ordering::Relaxed) {
            self.queue.push(InboundEvent::ConnectionStatus(ConnectionState::Connecting));
            match self.connector.connect(&self.registry) {
                Ok(mut session) => {
                    info!(
                        "connected, {} channels subscribed",
                        self.registry.sensor_channels().count()
                    );
                    self.queue.push(InboundEvent::ConnectionStatus(ConnectionState::Connected));
                    self.pump(&mut session);
                }
                Err(err) => warn!("{err}"),
            }
            self.queue.push(InboundEvent::ConnectionStatus(ConnectionState::Backoff));
            std::thread::sleep(self.backoff);
        }
        self.queue.push(InboundEvent::ConnectionStatus(ConnectionState::Disconnected));
        info!("connection manager stopped");
    }

    /// Forwards decoded messages until the session drops.
    fn pump(&self, session: &mut C::Session) {
        loop {
            match session.next_message() {
                Ok(message) => self.queue.push(decode(message)),
                Err(err) => {
                    warn!("{err}");
                    return;
                }
            }
        }
    }
}
