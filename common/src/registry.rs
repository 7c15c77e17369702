use serde::{Deserialize, Serialize};

/// The role a channel plays on the message broker.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChannelRole {
    /// The channel carries inbound sensor readings.
    #[default]
    Sensor,
    /// The channel carries outbound actuation commands.
    Actuation,
}

/// A named sensor or actuation endpoint on the message broker.
///
/// The topic string is the channel's identity; label and unit are only used
/// for display.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Channel {
    pub topic: String,
    pub label: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub role: ChannelRole,
    /// Whether the classifier needs a current reading from this channel
    /// before it may evaluate.
    #[serde(default)]
    pub required: bool,
}

/// The fixed set of channels the dashboard works with.
///
/// Built once at startup from the configuration and immutable afterwards.
/// Sensor channels keep their declaration order, which also fixes the order
/// of the classifier's feature vector.
pub struct Registry {
    channels: Vec<Channel>,
    actuation_topic: String,
}

impl Registry {
    pub fn new(sensors: Vec<Channel>, actuation_topic: String) -> Self {
        let mut channels = sensors;
        channels.push(Channel {
            topic: actuation_topic.clone(),
            label: String::new(),
            unit: String::new(),
            role: ChannelRole::Actuation,
            required: false,
        });

        Self { channels, actuation_topic }
    }

    /// All sensor channels, in declaration order.
    pub fn sensor_channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter().filter(|c| c.role == ChannelRole::Sensor)
    }

    /// The sensor channels the classifier needs, in declaration order.
    pub fn required_channels(&self) -> impl Iterator<Item = &Channel> {
        self.sensor_channels().filter(|c| c.required)
    }

    /// The topic actuation commands are published to.
    pub fn actuation_topic(&self) -> &str {
        &self.actuation_topic
    }

    pub fn find(&self, topic: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.topic == topic)
    }
}
