//! Trained AQI estimator and inference
//!
//! An [`Estimator`] is either `Unloaded` or `Ready` with a [`TrainedModel`]. It is
//! built once (by training or by [`load_model`]) and then only read, so a single
//! value can be shared across threads without locking.

use std::path::Path;

use crate::artifact::ModelArtifact;
use crate::error::{AqiError, Result};
use crate::features::{FEATURE_COUNT, FEATURE_NAMES, Feature, FeatureVector};
use crate::forest::RandomForest;

/// Regression forest paired with the ordered feature names it was trained on
#[derive(Debug, Clone)]
pub struct TrainedModel {
    forest: RandomForest,
    feature_names: Vec<String>,
}

impl TrainedModel {
    /// Pair a forest with its feature names
    ///
    /// # Errors
    ///
    /// * `AqiError::SchemaMismatch` - Names differ from the canonical order, the
    ///   forest width is not [`FEATURE_COUNT`], or the forest fails
    ///   [`RandomForest::check`]
    pub fn new(forest: RandomForest, feature_names: Vec<String>) -> Result<Self> {
        check_schema(&feature_names, &forest)?;
        Ok(Self {
            forest,
            feature_names,
        })
    }

    /// Pair a forest trained on canonical-order rows with the canonical names
    ///
    /// # Errors
    ///
    /// See [`TrainedModel::new`].
    pub fn from_forest(forest: RandomForest) -> Result<Self> {
        Self::new(forest, FEATURE_NAMES.map(String::from).to_vec())
    }

    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Predict the AQI for one feature vector
    ///
    /// # Errors
    ///
    /// * `AqiError::InvalidInput` - A reading is not finite
    /// * `AqiError::EstimationFailure` - The forest could not produce a value
    pub fn predict(&self, features: &FeatureVector) -> Result<f64> {
        features.validate()?;
        // feature_names is the canonical order (checked in `new`), so the
        // canonical array lines up with the training columns.
        self.forest.predict_row(&features.to_array())
    }

    /// Feature importances, most important first
    #[must_use]
    pub fn feature_importances(&self) -> Vec<(Feature, f64)> {
        let mut ranked: Vec<(Feature, f64)> = Feature::ALL
            .into_iter()
            .zip(self.forest.feature_importances())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

/// Reject feature lists or forests that do not match the canonical schema
pub(crate) fn check_schema(feature_names: &[String], forest: &RandomForest) -> Result<()> {
    forest.check()?;
    if feature_names.iter().map(String::as_str).ne(FEATURE_NAMES) {
        return Err(AqiError::SchemaMismatch(format!(
            "expected features {FEATURE_NAMES:?}, found {feature_names:?}"
        )));
    }
    if forest.n_features() != FEATURE_COUNT {
        return Err(AqiError::SchemaMismatch(format!(
            "model expects {} features, schema has {FEATURE_COUNT}",
            forest.n_features()
        )));
    }
    Ok(())
}

/// AQI estimator with an explicit readiness state
#[derive(Debug, Clone, Default)]
pub enum Estimator {
    /// No usable model; every prediction fails with `ModelUnavailable`
    #[default]
    Unloaded,
    /// Model loaded and schema-checked
    Ready(TrainedModel),
}

impl Estimator {
    /// Load a model artifact, falling back to `Unloaded` on any failure
    ///
    /// Use [`ModelArtifact::read`] to find out why a load failed.
    #[must_use]
    pub fn load(path: impl AsRef<Path>) -> Self {
        ModelArtifact::read(path)
            .and_then(ModelArtifact::into_model)
            .map_or(Self::Unloaded, Self::Ready)
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The loaded model
    ///
    /// # Errors
    ///
    /// * `AqiError::ModelUnavailable` - Estimator is `Unloaded`
    pub fn model(&self) -> Result<&TrainedModel> {
        match self {
            Self::Ready(model) => Ok(model),
            Self::Unloaded => Err(AqiError::ModelUnavailable),
        }
    }

    /// Predict the AQI for a feature vector
    ///
    /// # Errors
    ///
    /// * `AqiError::ModelUnavailable` - Estimator is `Unloaded`
    /// * `AqiError::InvalidInput` - A reading is not finite
    /// * `AqiError::EstimationFailure` - The model could not produce a value
    pub fn predict(&self, features: &FeatureVector) -> Result<f64> {
        self.model()?.predict(features)
    }

    /// Parse named text readings and predict
    ///
    /// Readiness is checked before the input is parsed.
    ///
    /// # Errors
    ///
    /// * `AqiError::ModelUnavailable` - Estimator is `Unloaded`
    /// * `AqiError::MissingFeature` / `AqiError::InvalidInput` - See
    ///   [`FeatureVector::from_fields`]
    /// * `AqiError::EstimationFailure` - The model could not produce a value
    pub fn predict_fields<I, K, V>(&self, fields: I) -> Result<f64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let model = self.model()?;
        model.predict(&FeatureVector::from_fields(fields)?)
    }

    /// Predict many feature vectors
    ///
    /// # Errors
    ///
    /// See [`Estimator::predict`]; stops at the first failure.
    pub fn predict_batch(&self, features: &[FeatureVector]) -> Result<Vec<f64>> {
        let model = self.model()?;
        features.iter().map(|fv| model.predict(fv)).collect()
    }
}

impl From<TrainedModel> for Estimator {
    fn from(model: TrainedModel) -> Self {
        Self::Ready(model)
    }
}

/// Load a model artifact; check [`Estimator::is_ready`] before predicting
#[must_use]
pub fn load_model(path: impl AsRef<Path>) -> Estimator {
    Estimator::load(path)
}
