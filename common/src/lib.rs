//! Core pipeline of the smart-monitor dashboard: channel registry, broker
//! connection management, event reconciliation and alert actuation.
//!
//! A UI frontend (see the `winit` crate) drives this pipeline from its
//! periodic render tick and reads the reconciled state back for display.
//! The only object shared between the frontend's thread and the broker
//! thread is the [`event::EventQueue`].

pub mod actuator;
pub mod classifier;
pub mod config;
pub mod connection;
pub mod event;
pub mod reconciler;
pub mod registry;
pub mod store;

pub use actuator::{Actuator, Command, Evaluation};
pub use classifier::{Classifier, ClassifierPointer, ThresholdClassifier, ALERT_LABEL};
pub use config::{ConfigError, MonitorConfig};
pub use connection::{
    BrokerConnector, BrokerError, BrokerSession, CommandSink, CommandSinkPointer,
    ConnectionManager, MqttConnector, MqttPublisher, PublishError, RawMessage,
};
pub use event::{EventQueue, InboundEvent};
pub use reconciler::reconcile;
pub use registry::{Channel, ChannelRole, Registry};
pub use store::{ConnectionState, Reading, StateStore};
