//! Error types for AQI estimation

use thiserror::Error;

/// Result type alias for estimator operations
pub type Result<T> = std::result::Result<T, AqiError>;

/// Errors that can occur while training, loading or querying the estimator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AqiError {
    /// No trained model is loaded
    #[error("Model not loaded")]
    ModelUnavailable,

    /// A required reading was not supplied
    #[error("Missing required feature: {0}")]
    MissingFeature(String),

    /// A reading could not be interpreted as a finite real number
    #[error("Invalid value for {field}: {value:?}")]
    InvalidInput { field: String, value: String },

    /// The regression model failed to produce a usable value
    #[error("Estimation failed: {0}")]
    EstimationFailure(String),

    /// Training or evaluation was attempted on zero samples
    #[error("Dataset is empty")]
    EmptyDataset,

    /// Dataset shape, labels or split parameters are unusable
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    /// Model artifact does not match the canonical feature schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Model artifact was written by an unknown format version
    #[error("Unsupported artifact version: {0}")]
    UnsupportedArtifactVersion(u32),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be parsed or applied
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AqiError {
    /// Create a new `InvalidInput` error for a specific field
    #[must_use]
    pub fn invalid_input(field: &str, value: &str) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Create a new `InvalidDataset` error for mismatched lengths
    #[must_use]
    pub fn length_mismatch(features: usize, labels: usize) -> Self {
        Self::InvalidDataset(format!(
            "Expected {features} labels for {features} samples, got {labels}"
        ))
    }

    /// True for errors caused by malformed caller input
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::MissingFeature(_) | Self::InvalidInput { .. })
    }
}

impl From<std::io::Error> for AqiError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AqiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
