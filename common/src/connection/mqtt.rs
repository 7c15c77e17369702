use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;
use rumqttc::{Client, ConnectReturnCode, Connection, Event, MqttOptions, Packet, QoS};

use super::{BrokerConnector, BrokerError, BrokerSession, CommandSink, PublishError, RawMessage};
use crate::config::MonitorConfig;
use crate::registry::Registry;

/// Broker keep-alive; besides the reconnect backoff this is the only
/// per-connection timing parameter.
const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Capacity of rumqttc's outgoing request channel.
const REQUEST_CAP: usize = 64;

type SharedClient = Arc<Mutex<Option<Client>>>;

/// Establishes MQTT sessions over rumqttc's synchronous client and keeps
/// the shared publish handle pointing at the live connection.
pub struct MqttConnector {
    options: MqttOptions,
    publish_handle: SharedClient,
}

impl MqttConnector {
    /// Builds the connector and its paired publisher from the validated
    /// configuration.
    pub fn new(config: &MonitorConfig) -> (Self, MqttPublisher) {
        let client_id = format!("smart-monitor-{}", std::process::id());
        let mut options = MqttOptions::new(client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(KEEP_ALIVE);

        let publish_handle: SharedClient = Arc::new(Mutex::new(None));
        let publisher = MqttPublisher { client: publish_handle.clone() };

        (Self { options, publish_handle }, publisher)
    }
}

impl BrokerConnector for MqttConnector {
    type Session = MqttSession;

    fn connect(&mut self, registry: &Registry) -> Result<MqttSession, BrokerError> {
        let (client, mut connection) = Client::new(self.options.clone(), REQUEST_CAP);

        // Subscriptions are queued now and flushed to the broker right
        // after the CONNACK.
        for channel in registry.sensor_channels() {
            client
                .subscribe(&channel.topic, QoS::AtMostOnce)
                .map_err(|e| BrokerError::new(format!("subscribe {}: {e}", channel.topic)))?;
        }

        // Drive the event loop until the broker acknowledges the connection.
        loop {
            match connection.recv() {
                Ok(Ok(Event::Incoming(Packet::ConnAck(ack)))) => {
                    if ack.code == ConnectReturnCode::Success {
                        *self.publish_handle.lock().unwrap() = Some(client);
                        return Ok(MqttSession { connection });
                    }
                    return Err(BrokerError::new(format!("broker refused: {:?}", ack.code)));
                }
                Ok(Ok(event)) => debug!("pre-connack event: {event:?}"),
                Ok(Err(err)) => return Err(BrokerError::new(err.to_string())),
                Err(err) => return Err(BrokerError::new(format!("{err:?}"))),
            }
        }
    }
}

/// One live MQTT connection with all sensor subscriptions in place.
pub struct MqttSession {
    connection: Connection,
}

impl BrokerSession for MqttSession {
    fn next_message(&mut self) -> Result<RawMessage, BrokerError> {
        loop {
            match self.connection.recv() {
                Ok(Ok(Event::Incoming(Packet::Publish(publish)))) => {
                    return Ok(RawMessage {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    });
                }
                // Pings, acks and outgoing notifications carry no readings.
                Ok(Ok(_)) => continue,
                Ok(Err(err)) => return Err(BrokerError::new(err.to_string())),
                Err(err) => return Err(BrokerError::new(format!("{err:?}"))),
            }
        }
    }
}

/// Publishes plain-text commands through whatever client is currently
/// connected. Handles stay valid across reconnects; publishing while the
/// connection is down yields an error the caller logs and moves on from.
#[derive(Clone)]
pub struct MqttPublisher {
    client: SharedClient,
}

impl CommandSink for MqttPublisher {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        let guard = self.client.lock().unwrap();
        match guard.as_ref() {
            // try_publish keeps the render thread off the network: the
            // packet is handed to rumqttc's own thread or rejected at once.
            Some(client) => client
                .try_publish(topic, QoS::AtMostOnce, false, payload)
                .map_err(|e| PublishError::Rejected(e.to_string())),
            None => Err(PublishError::NotConnected),
        }
    }
}
