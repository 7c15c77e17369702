mod threshold;

pub use threshold::ThresholdClassifier;

/// The label that drives the actuation command ON. Every other label maps
/// to OFF.
pub const ALERT_LABEL: &str = "ALERT";

/// Maps a feature vector to a status label.
///
/// Features arrive in a fixed order: one value per required channel, in
/// registry declaration order. Implementations are pure and deterministic
/// and fail by returning an error, never by emitting a sentinel label.
pub trait Classifier {
    fn classify(&self, features: &[f64]) -> Result<String, Box<dyn std::error::Error>>;
}

pub type ClassifierPointer = Box<dyn Classifier + Send>;
