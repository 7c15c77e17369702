use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::registry::{Channel, ChannelRole, Registry};

/// Startup-time configuration failures. These abort the process before any
/// connection attempt is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid broker address: {0}")]
    BrokerAddress(String),
    #[error("invalid channel registry: {0}")]
    Registry(String),
    #[error("invalid {name}: must be greater than zero")]
    NonPositive { name: &'static str },
}

fn default_broker_port() -> u16 {
    1883
}

fn default_history_cap() -> usize {
    200
}

fn default_backoff_secs() -> u64 {
    3
}

fn default_tick_millis() -> u64 {
    1000
}

/// Everything the dashboard recognizes: broker address, the channel
/// registry, the actuation topic and the timing/buffering knobs.
#[derive(Deserialize, Clone, Debug)]
pub struct MonitorConfig {
    pub broker_host: String,
    #[serde(default = "default_broker_port")]
    pub broker_port: u16,
    /// Sensor channels, in the order the classifier expects its features.
    pub channels: Vec<Channel>,
    pub actuation_topic: String,
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
}

impl MonitorConfig {
    /// The built-in configuration matching the reference deployment.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_str(include_str!("./default_config.json"))
    }

    /// Loads a configuration override from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_str(&std::fs::read_to_string(path)?)
    }

    fn from_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.broker_host.trim().is_empty() {
            return Err(ConfigError::BrokerAddress("empty host".into()));
        }
        if self.broker_port == 0 {
            return Err(ConfigError::BrokerAddress("port must be non-zero".into()));
        }
        if self.channels.is_empty() {
            return Err(ConfigError::Registry("no sensor channels configured".into()));
        }
        for channel in &self.channels {
            if channel.topic.trim().is_empty() {
                return Err(ConfigError::Registry(format!(
                    "channel {:?} has an empty topic",
                    channel.label
                )));
            }
            if channel.role == ChannelRole::Actuation {
                return Err(ConfigError::Registry(format!(
                    "channel {} must use the actuation_topic option instead of role \"actuation\"",
                    channel.topic
                )));
            }
        }
        let mut topics: Vec<&str> = self.channels.iter().map(|c| c.topic.as_str()).collect();
        topics.sort_unstable();
        if topics.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(ConfigError::Registry("duplicate channel topic".into()));
        }
        if self.actuation_topic.trim().is_empty() {
            return Err(ConfigError::Registry("empty actuation topic".into()));
        }
        if self.history_cap == 0 {
            return Err(ConfigError::NonPositive { name: "history_cap" });
        }
        if self.backoff_secs == 0 {
            return Err(ConfigError::NonPositive { name: "backoff_secs" });
        }
        if self.tick_millis == 0 {
            return Err(ConfigError::NonPositive { name: "tick_millis" });
        }
        Ok(())
    }

    /// Builds the immutable channel registry.
    pub fn registry(&self) -> Registry {
        Registry::new(self.channels.clone(), self.actuation_topic.clone())
    }

    /// Delay between reconnection attempts.
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    /// Interval of the render tick driving reconcile, classify and render.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_is_valid() {
        let config = MonitorConfig::builtin().unwrap();

        assert_eq!(config.broker_host, "broker.hivemq.com");
        assert_eq!(config.broker_port, 1883);
        assert_eq!(config.history_cap, 200);
        assert_eq!(config.backoff_secs, 3);

        let registry = config.registry();
        assert_eq!(registry.sensor_channels().count(), 3);
        assert_eq!(registry.required_channels().count(), 3);
        assert_eq!(registry.actuation_topic(), "alat/buzzer/sic");
    }

    #[test]
    fn empty_host_is_fatal() {
        let err = MonitorConfig::from_str(
            r#"{ "broker_host": " ", "channels": [{ "topic": "t", "label": "T" }],
                 "actuation_topic": "a" }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::BrokerAddress(_)));
    }

    #[test]
    fn duplicate_topics_are_fatal() {
        let err = MonitorConfig::from_str(
            r#"{ "broker_host": "localhost",
                 "channels": [{ "topic": "t", "label": "A" }, { "topic": "t", "label": "B" }],
                 "actuation_topic": "a" }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Registry(_)));
    }

    #[test]
    fn zero_history_cap_is_fatal() {
        let err = MonitorConfig::from_str(
            r#"{ "broker_host": "localhost", "channels": [{ "topic": "t", "label": "T" }],
                 "actuation_topic": "a", "history_cap": 0 }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NonPositive { name: "history_cap" }));
    }

    #[test]
    fn malformed_json_is_fatal() {
        assert!(matches!(MonitorConfig::from_str("{"), Err(ConfigError::Parse(_))));
    }
}
