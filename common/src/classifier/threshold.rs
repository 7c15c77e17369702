use serde::Deserialize;
use thiserror::Error;

use super::Classifier;

#[derive(Debug, Error)]
#[error("feature vector has {got} values, model expects {want}")]
pub struct FeatureShapeError {
    got: usize,
    want: usize,
}

/// Per-feature decision rule.
#[derive(Deserialize, Clone, Debug)]
struct FeatureRule {
    /// Name of the feature, for log readability only.
    #[allow(dead_code)]
    name: String,
    /// Readings at or above this value vote for the alert label.
    alert_above: f64,
}

/// Decision-rule classifier: any feature at or above its threshold yields
/// the alert label. The rules ship as embedded JSON so a deployment can
/// swap them without touching code.
#[derive(Deserialize, Clone, Debug)]
pub struct ThresholdClassifier {
    /// One rule per feature, in registry declaration order.
    rules: Vec<FeatureRule>,
    alert_label: String,
    normal_label: String,
}

impl ThresholdClassifier {
    pub fn new() -> Result<Self, serde_json::Error> {
        let json_data = std::include_str!("./thresholds.json");

        serde_json::from_str::<Self>(json_data)
    }
}

impl Classifier for ThresholdClassifier {
    fn classify(&self, features: &[f64]) -> Result<String, Box<dyn std::error::Error>> {
        if features.len() != self.rules.len() {
            return Err(FeatureShapeError { got: features.len(), want: self.rules.len() }.into());
        }

        let alert = features.iter().zip(&self.rules).any(|(value, rule)| *value >= rule.alert_above);

        Ok(if alert { self.alert_label.clone() } else { self.normal_label.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ALERT_LABEL;

    #[test]
    fn embedded_rules_parse() {
        let classifier = ThresholdClassifier::new().unwrap();
        assert_eq!(classifier.rules.len(), 3);
        assert_eq!(classifier.alert_label, ALERT_LABEL);
    }

    #[test]
    fn any_feature_over_threshold_raises_the_alert() {
        let classifier = ThresholdClassifier::new().unwrap();

        // temperature, smoke, light — all nominal
        let label = classifier.classify(&[24.0, 120.0, 300.0]).unwrap();
        assert_eq!(label, "NORMAL");

        // smoke alone over threshold
        let label = classifier.classify(&[24.0, 850.0, 300.0]).unwrap();
        assert_eq!(label, ALERT_LABEL);
    }

    #[test]
    fn wrong_feature_count_is_an_error() {
        let classifier = ThresholdClassifier::new().unwrap();
        assert!(classifier.classify(&[24.0]).is_err());
    }
}
