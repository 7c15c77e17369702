use log::{error, warn};

use crate::classifier::{ClassifierPointer, ALERT_LABEL};
use crate::connection::CommandSinkPointer;
use crate::registry::Registry;
use crate::store::StateStore;

/// Binary actuation command published to the actuation channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    On,
    Off,
}

impl Command {
    /// Wire payload, plain text without an envelope.
    pub fn payload(self) -> &'static str {
        match self {
            Command::On => "ON",
            Command::Off => "OFF",
        }
    }
}

/// Outcome of one evaluation pass, kept around for the dashboard status
/// line.
#[derive(Clone, Debug, PartialEq)]
pub enum Evaluation {
    /// Not every required channel has reported yet; nothing was published.
    AwaitingData,
    /// The classifier failed; nothing was published and the caller keeps
    /// showing the previous status.
    Failed,
    /// The classifier produced a label and the matching command went out.
    Classified { label: String, command: Command },
}

/// Turns accumulated readings into an outbound command, once per render
/// tick.
pub struct Actuator {
    classifier: ClassifierPointer,
    sink: CommandSinkPointer,
}

impl Actuator {
    pub fn new(classifier: ClassifierPointer, sink: CommandSinkPointer) -> Self {
        Self { classifier, sink }
    }

    /// Runs after reconciliation. Builds the feature vector from the
    /// required channels' latest values (registry declaration order),
    /// classifies, and publishes the mapped command.
    ///
    /// The publish is level-triggered: the command goes out on every
    /// evaluation with complete data, whether or not it changed.
    pub fn evaluate(&self, registry: &Registry, store: &StateStore) -> Evaluation {
        let mut features = Vec::new();
        for channel in registry.required_channels() {
            match store.latest(&channel.topic) {
                Some(reading) => features.push(reading.value),
                None => return Evaluation::AwaitingData,
            }
        }

        let label = match self.classifier.classify(&features) {
            Ok(label) => label,
            Err(err) => {
                error!("classification failed: {err}");
                return Evaluation::Failed;
            }
        };

        let command = if label == ALERT_LABEL { Command::On } else { Command::Off };
        if let Err(err) = self.sink.publish(registry.actuation_topic(), command.payload()) {
            warn!("could not publish {} command: {err}", command.payload());
        }

        Evaluation::Classified { label, command }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::connection::{CommandSink, PublishError};
    use crate::registry::{Channel, ChannelRole};
    use crate::store::Reading;
    use std::sync::{Arc, Mutex};

    struct FixedClassifier(&'static str);

    impl Classifier for FixedClassifier {
        fn classify(&self, _features: &[f64]) -> Result<String, Box<dyn std::error::Error>> {
            Ok(self.0.to_string())
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn classify(&self, _features: &[f64]) -> Result<String, Box<dyn std::error::Error>> {
            Err("model unavailable".into())
        }
    }

    /// Records which features were seen, for the declaration-order check.
    struct SpyClassifier(Arc<Mutex<Vec<Vec<f64>>>>);

    impl Classifier for SpyClassifier {
        fn classify(&self, features: &[f64]) -> Result<String, Box<dyn std::error::Error>> {
            self.0.lock().unwrap().push(features.to_vec());
            Ok("NORMAL".to_string())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink(Arc<Mutex<Vec<(String, String)>>>);

    impl CommandSink for RecordingSink {
        fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
            self.0.lock().unwrap().push((topic.to_string(), payload.to_string()));
            Ok(())
        }
    }

    fn test_registry() -> Registry {
        let sensor = |topic: &str| Channel {
            topic: topic.into(),
            label: topic.into(),
            unit: String::new(),
            role: ChannelRole::Sensor,
            required: true,
        };
        Registry::new(
            vec![sensor("alat/suhu"), sensor("alat/asap"), sensor("alat/cahaya")],
            "alat/buzzer/sic".into(),
        )
    }

    fn full_store(registry: &Registry) -> StateStore {
        let mut store = StateStore::new(200);
        for (i, channel) in registry.sensor_channels().enumerate() {
            store.record(&channel.topic, Reading::now(10.0 * (i + 1) as f64, None));
        }
        store
    }

    #[test]
    fn missing_required_channel_publishes_nothing() {
        let registry = test_registry();
        let mut store = StateStore::new(200);
        store.record("alat/suhu", Reading::now(21.0, None));

        let sink = RecordingSink::default();
        let actuator = Actuator::new(Box::new(FixedClassifier(ALERT_LABEL)), Arc::new(sink.clone()));

        assert_eq!(actuator.evaluate(&registry, &store), Evaluation::AwaitingData);
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn alert_label_publishes_on() {
        let registry = test_registry();
        let store = full_store(&registry);
        let sink = RecordingSink::default();
        let actuator = Actuator::new(Box::new(FixedClassifier(ALERT_LABEL)), Arc::new(sink.clone()));

        let evaluation = actuator.evaluate(&registry, &store);

        assert_eq!(
            evaluation,
            Evaluation::Classified { label: ALERT_LABEL.into(), command: Command::On }
        );
        assert_eq!(
            sink.0.lock().unwrap().as_slice(),
            [("alat/buzzer/sic".to_string(), "ON".to_string())]
        );
    }

    #[test]
    fn non_alert_label_publishes_off() {
        let registry = test_registry();
        let store = full_store(&registry);
        let sink = RecordingSink::default();
        let actuator = Actuator::new(Box::new(FixedClassifier("NORMAL")), Arc::new(sink.clone()));

        actuator.evaluate(&registry, &store);

        assert_eq!(
            sink.0.lock().unwrap().as_slice(),
            [("alat/buzzer/sic".to_string(), "OFF".to_string())]
        );
    }

    #[test]
    fn command_is_resent_every_evaluation() {
        let registry = test_registry();
        let store = full_store(&registry);
        let sink = RecordingSink::default();
        let actuator = Actuator::new(Box::new(FixedClassifier("NORMAL")), Arc::new(sink.clone()));

        actuator.evaluate(&registry, &store);
        actuator.evaluate(&registry, &store);

        assert_eq!(sink.0.lock().unwrap().len(), 2);
    }

    #[test]
    fn classifier_failure_skips_the_actuation() {
        let registry = test_registry();
        let store = full_store(&registry);
        let sink = RecordingSink::default();
        let actuator = Actuator::new(Box::new(FailingClassifier), Arc::new(sink.clone()));

        assert_eq!(actuator.evaluate(&registry, &store), Evaluation::Failed);
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn features_follow_registry_declaration_order() {
        let registry = test_registry();
        let store = full_store(&registry);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let actuator =
            Actuator::new(Box::new(SpyClassifier(seen.clone())), Arc::new(RecordingSink::default()));

        actuator.evaluate(&registry, &store);

        assert_eq!(seen.lock().unwrap().as_slice(), [vec![10.0, 20.0, 30.0]]);
    }
}
