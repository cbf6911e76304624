//! Air Quality Index estimation and health-advisory classification
//!
//! This crate estimates an AQI value from eight readings (six pollutants plus
//! temperature and humidity) with a random-forest regressor, and maps the value
//! to one of six severity tiers with display label, style tag and advice:
//! - [`classify`] - pure AQI to tier mapping
//! - [`Estimator`] - `Unloaded` or `Ready` model, loaded with [`load_model`]
//! - [`training`] - synthetic data, training, evaluation and artifact saving
//!
//! # Example
//!
//! ```rust
//! use aqi_estimator::{assess, synthetic, training, FeatureVector, ForestParams};
//!
//! let data = synthetic::generate(200, 42).unwrap();
//! let params = ForestParams { n_estimators: 10, ..ForestParams::default() };
//! let estimator = training::train(&data, &params).unwrap();
//!
//! let readings = FeatureVector::from_array([10.0, 20.0, 10.0, 5.0, 1.0, 10.0, 25.0, 50.0]);
//! let assessment = assess(&estimator, &readings).unwrap();
//! println!("AQI {} ({})", assessment.aqi, assessment.classification.label);
//! ```

pub mod artifact;
pub mod category;
pub mod config;
pub mod dataset;
pub mod error;
pub mod estimator;
pub mod features;
pub mod forest;
pub mod metrics;
pub mod synthetic;
pub mod training;

use serde::Serialize;

pub use artifact::ModelArtifact;
pub use category::{AqiCategory, Classification, classify};
pub use config::Settings;
pub use dataset::Dataset;
pub use error::{AqiError, Result};
pub use estimator::{Estimator, TrainedModel, load_model};
pub use features::{FEATURE_COUNT, FEATURE_NAMES, Feature, FeatureVector};
pub use forest::{ForestParams, RandomForest};
pub use metrics::Evaluation;
pub use training::{TrainingConfig, TrainingReport};

/// Estimated AQI with its classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Assessment {
    /// Predicted AQI rounded to two decimals
    pub aqi: f64,
    /// Tier of the unrounded prediction
    #[serde(flatten)]
    pub classification: Classification,
}

/// Predict the AQI for a feature vector and classify it
///
/// The tier is chosen from the unrounded prediction, so a value just above a
/// boundary keeps the upper tier even if it displays as the boundary.
///
/// # Errors
///
/// * `AqiError::ModelUnavailable` - Estimator is `Unloaded`
/// * `AqiError::InvalidInput` - A reading is not finite
/// * `AqiError::EstimationFailure` - The model could not produce a value
pub fn assess(estimator: &Estimator, features: &FeatureVector) -> Result<Assessment> {
    estimator.predict(features).map(assessment)
}

/// Parse named text readings, predict and classify
///
/// # Errors
///
/// See [`Estimator::predict_fields`].
pub fn assess_fields<I, K, V>(estimator: &Estimator, fields: I) -> Result<Assessment>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    estimator.predict_fields(fields).map(assessment)
}

fn assessment(aqi: f64) -> Assessment {
    Assessment {
        aqi: round2(aqi),
        classification: classify(aqi),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
