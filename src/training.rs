//! Offline training pipeline
//!
//! Fits a [`RandomForest`] on a [`Dataset`], measures it on a held-out split and
//! persists the result as a [`ModelArtifact`]. This is the only module besides
//! artifact writing that logs.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::artifact::ModelArtifact;
use crate::dataset::Dataset;
use crate::error::{AqiError, Result};
use crate::estimator::{Estimator, TrainedModel};
use crate::features::Feature;
use crate::forest::{ForestParams, RandomForest};
use crate::metrics::Evaluation;
use crate::synthetic::{self, DEFAULT_CLEAN_AIR_FRACTION, DEFAULT_SAMPLES, DEFAULT_SEED};

/// Default share of samples held out for evaluation
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Training settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of synthetic samples when no CSV is supplied
    pub samples: usize,
    /// Share of samples held out for evaluation
    pub test_fraction: f64,
    /// Seed for synthetic generation and the train/test shuffle
    pub seed: u64,
    /// Share of synthetic samples drawn from the clean-air regime
    pub clean_air_fraction: f64,
    pub forest: ForestParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SEED,
            clean_air_fraction: DEFAULT_CLEAN_AIR_FRACTION,
            forest: ForestParams::default(),
        }
    }
}

impl TrainingConfig {
    /// Generate the synthetic dataset these settings describe
    ///
    /// # Errors
    ///
    /// * `AqiError::Config` - `clean_air_fraction` outside [0, 1]
    pub fn synthetic_dataset(&self) -> Result<Dataset> {
        synthetic::SyntheticGenerator::new(self.seed)
            .with_clean_air_fraction(self.clean_air_fraction)?
            .dataset(self.samples)
    }
}

/// Summary of one training run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub n_samples: usize,
    pub n_train: usize,
    pub n_test: usize,
    /// Smallest and largest label in the full dataset
    pub label_range: (f64, f64),
    pub evaluation: Evaluation,
    /// Split-weighted importances, most important first
    pub feature_importances: Vec<(Feature, f64)>,
}

/// Fit an estimator on every sample of `dataset`
///
/// # Errors
///
/// * `AqiError::EmptyDataset` - No samples
/// * `AqiError::InvalidDataset` - Bad forest parameters
pub fn train(dataset: &Dataset, params: &ForestParams) -> Result<Estimator> {
    fit_model(dataset, params).map(Estimator::from)
}

fn fit_model(dataset: &Dataset, params: &ForestParams) -> Result<TrainedModel> {
    if dataset.is_empty() {
        return Err(AqiError::EmptyDataset);
    }
    let forest = RandomForest::fit(&dataset.rows(), dataset.labels(), params)?;
    TrainedModel::from_forest(forest)
}

/// Measure an estimator against labeled samples
///
/// # Errors
///
/// * `AqiError::ModelUnavailable` - Estimator is `Unloaded`
/// * `AqiError::EmptyDataset` - No samples
pub fn evaluate(estimator: &Estimator, dataset: &Dataset) -> Result<Evaluation> {
    let model = estimator.model()?;
    if dataset.is_empty() {
        return Err(AqiError::EmptyDataset);
    }
    let predictions = estimator.predict_batch(dataset.features())?;
    debug!(trees = model.forest().n_trees(), samples = dataset.len(), "evaluated");
    Evaluation::compute(dataset.labels(), &predictions)
}

/// Split, fit on the training side and evaluate on the held-out side
///
/// # Errors
///
/// * `AqiError::EmptyDataset` - No samples
/// * `AqiError::InvalidDataset` - Bad split fraction, a split side would be
///   empty, or bad forest parameters
pub fn fit_and_evaluate(
    dataset: &Dataset,
    config: &TrainingConfig,
) -> Result<(TrainedModel, TrainingReport)> {
    let label_range = dataset.label_range().ok_or(AqiError::EmptyDataset)?;
    info!(
        samples = dataset.len(),
        min_aqi = label_range.0,
        max_aqi = label_range.1,
        "training dataset ready"
    );

    let (train_set, test_set) = dataset.split(config.test_fraction, Some(config.seed))?;
    info!(
        train = train_set.len(),
        test = test_set.len(),
        trees = config.forest.n_estimators,
        "fitting random forest"
    );
    let model = fit_model(&train_set, &config.forest)?;

    let estimator = Estimator::from(model);
    let evaluation = evaluate(&estimator, &test_set)?;
    info!(mae = evaluation.mae, r2 = evaluation.r2, "held-out evaluation");

    let Estimator::Ready(model) = estimator else {
        return Err(AqiError::ModelUnavailable);
    };
    let feature_importances = model.feature_importances();
    for (feature, importance) in &feature_importances {
        debug!(feature = feature.name(), importance, "feature importance");
    }

    let report = TrainingReport {
        n_samples: dataset.len(),
        n_train: train_set.len(),
        n_test: test_set.len(),
        label_range,
        evaluation,
        feature_importances,
    };
    Ok((model, report))
}

/// Train, evaluate and write the model artifact to `path`
///
/// Nothing is written when training fails.
///
/// # Errors
///
/// See [`fit_and_evaluate`] and [`ModelArtifact::write`].
pub fn train_and_save(
    dataset: &Dataset,
    config: &TrainingConfig,
    path: impl AsRef<Path>,
) -> Result<TrainingReport> {
    let path = path.as_ref();
    let (model, report) = fit_and_evaluate(dataset, config)?;
    ModelArtifact::new(&model, Some(report.evaluation)).write(path)?;
    info!(path = %path.display(), "model saved");
    Ok(report)
}
