//! Random forest regressor
//!
//! A thin wrapper over aprender's [`RandomForestRegressor`]: bagged CART trees
//! grown with the squared-error criterion, predictions averaged over the trees.
//! The wrapper owns the input checks and turns the model's panicking paths
//! (unfitted model, wrong row width, corrupt trees) into [`AqiError`]s.

use aprender::primitives::{Matrix, Vector};
use aprender::tree::RandomForestRegressor;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AqiError, Result};

/// Deepest tree the forest grows. Each level adds two JSON nesting levels to
/// the artifact, and serde_json refuses documents nested beyond 128.
pub const MAX_TREE_DEPTH: usize = 48;

/// Hyperparameters for forest training
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum tree depth (root has depth 0); `None` means [`MAX_TREE_DEPTH`]
    pub max_depth: Option<usize>,
    /// Seed for bootstrap sampling; tree `i` uses `seed + i`
    pub seed: Option<u64>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            seed: Some(42),
        }
    }
}

impl ForestParams {
    fn regressor(&self) -> Result<RandomForestRegressor> {
        if self.n_estimators == 0 {
            return Err(AqiError::InvalidDataset(
                "n_estimators must be at least 1".into(),
            ));
        }
        let depth = self.max_depth.unwrap_or(MAX_TREE_DEPTH);
        if depth > MAX_TREE_DEPTH {
            return Err(AqiError::InvalidDataset(format!(
                "max_depth must be at most {MAX_TREE_DEPTH}, got {depth}"
            )));
        }

        let model = RandomForestRegressor::new(self.n_estimators).with_max_depth(depth);
        match self.seed {
            Some(seed) => {
                // Tree seeds are `seed + i` and must not overflow
                if seed.checked_add(self.n_estimators as u64).is_none() {
                    return Err(AqiError::InvalidDataset(format!(
                        "seed {seed} is too large for {} trees",
                        self.n_estimators
                    )));
                }
                Ok(model.with_random_state(seed))
            }
            None => Ok(model),
        }
    }
}

/// Bagged ensemble of regression trees
///
/// # Example
///
/// ```rust
/// use aqi_estimator::forest::{ForestParams, RandomForest};
///
/// let x = vec![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
/// let y = vec![10.0, 10.0, 10.0, 50.0, 50.0, 50.0];
/// let params = ForestParams { n_estimators: 10, ..ForestParams::default() };
///
/// let forest = RandomForest::fit(&x, &y, &params).unwrap();
/// assert_eq!(forest.n_trees(), 10);
/// assert!(forest.predict_row(&[1.0]).unwrap() < forest.predict_row(&[6.0]).unwrap());
/// ```
///
/// A forest deserialized from untrusted JSON must pass [`RandomForest::check`]
/// before it is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    n_trees: usize,
    model: RandomForestRegressor,
}

impl RandomForest {
    /// Fit the forest to training rows
    ///
    /// # Errors
    ///
    /// * `AqiError::EmptyDataset` - No rows
    /// * `AqiError::InvalidDataset` - Length mismatch, ragged or non-finite rows,
    ///   bad hyperparameters, or a fit failure inside the model
    pub fn fit<R: AsRef<[f64]>>(x: &[R], y: &[f64], params: &ForestParams) -> Result<Self> {
        let n_features = check_training_data(x, y)?;
        let mut model = params.regressor()?;

        let (x, y) = to_matrix(x, y, n_features)?;
        model
            .fit(&x, &y)
            .map_err(|e| AqiError::InvalidDataset(format!("forest fit failed: {e}")))?;

        Ok(Self {
            n_features,
            n_trees: params.n_estimators,
            model,
        })
    }

    /// Average prediction of all trees for one row
    ///
    /// # Errors
    ///
    /// * `AqiError::EstimationFailure` - Row width differs from the training data,
    ///   the forest is not fitted, or the result is not finite
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.n_features {
            return Err(AqiError::EstimationFailure(format!(
                "expected {} features, got {}",
                self.n_features,
                row.len()
            )));
        }
        if self.n_trees == 0 {
            return Err(AqiError::EstimationFailure("forest has no trees".into()));
        }

        #[allow(clippy::cast_possible_truncation)]
        let values: Vec<f32> = row.iter().map(|&v| v as f32).collect();
        let x = Matrix::from_vec(1, self.n_features, values)
            .map_err(|e| AqiError::EstimationFailure(e.to_string()))?;
        let value = self
            .model
            .predict(&x)
            .as_slice()
            .first()
            .copied()
            .map(f64::from)
            .ok_or_else(|| AqiError::EstimationFailure("model returned no prediction".into()))?;

        if value.is_finite() {
            Ok(value)
        } else {
            Err(AqiError::EstimationFailure(format!(
                "model produced non-finite value {value}"
            )))
        }
    }

    /// Predict many rows
    ///
    /// # Errors
    ///
    /// See [`RandomForest::predict_row`].
    pub fn predict<R: AsRef<[f64]>>(&self, rows: &[R]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.predict_row(row.as_ref())).collect()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Split-weighted importance per feature, normalized to sum to 1
    ///
    /// All zero when no tree split at all.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        match self.model.feature_importances() {
            Some(imp) if imp.len() == self.n_features => {
                imp.into_iter().map(f64::from).collect()
            }
            _ => vec![0.0; self.n_features],
        }
    }

    /// Structural validation of a deserialized forest
    ///
    /// # Errors
    ///
    /// * `AqiError::SchemaMismatch` - No trees, an unfitted tree, a tree count
    ///   or width that disagrees with the model, or a split on a missing feature
    pub fn check(&self) -> Result<()> {
        let mismatch = |msg: String| AqiError::SchemaMismatch(msg);
        if self.n_trees == 0 {
            return Err(mismatch("forest has no trees".into()));
        }
        let model = serde_json::to_value(&self.model)?;
        let trees = model
            .get("trees")
            .and_then(Value::as_array)
            .ok_or_else(|| mismatch("model has no tree list".into()))?;
        if trees.len() != self.n_trees {
            return Err(mismatch(format!(
                "expected {} trees, found {}",
                self.n_trees,
                trees.len()
            )));
        }
        for (i, tree) in trees.iter().enumerate() {
            let root = tree
                .get("tree")
                .filter(|root| !root.is_null())
                .ok_or_else(|| mismatch(format!("tree {i} is not fitted")))?;
            check_node(root, self.n_features).map_err(|e| mismatch(format!("tree {i}: {e}")))?;
        }

        // Importances index by split feature, so only after the walk above
        match self.model.feature_importances() {
            None => Err(mismatch("forest is not fitted".into())),
            Some(imp) if imp.len() != self.n_features => Err(mismatch(format!(
                "model was trained on {} features, expected {}",
                imp.len(),
                self.n_features
            ))),
            Some(_) => Ok(()),
        }
    }
}

fn check_node(node: &Value, n_features: usize) -> std::result::Result<(), String> {
    if node.get("Leaf").is_some() {
        return Ok(());
    }
    let split = node.get("Node").ok_or("node is neither a split nor a leaf")?;
    let feature = split
        .get("feature_idx")
        .and_then(Value::as_u64)
        .ok_or("split has no feature index")?;
    if feature >= n_features as u64 {
        return Err(format!("split on feature {feature}"));
    }
    for side in ["left", "right"] {
        let child = split
            .get(side)
            .ok_or_else(|| format!("split has no {side} child"))?;
        check_node(child, n_features)?;
    }
    Ok(())
}

/// Validate training rows and return the feature count
fn check_training_data<R: AsRef<[f64]>>(x: &[R], y: &[f64]) -> Result<usize> {
    if x.len() != y.len() {
        return Err(AqiError::length_mismatch(x.len(), y.len()));
    }
    let Some(first) = x.first() else {
        return Err(AqiError::EmptyDataset);
    };
    let n_features = first.as_ref().len();
    if n_features == 0 {
        return Err(AqiError::InvalidDataset("rows have no features".into()));
    }
    for (row, (values, label)) in x.iter().zip(y).enumerate() {
        let values = values.as_ref();
        if values.len() != n_features {
            return Err(AqiError::InvalidDataset(format!(
                "row {row} has {} features, expected {n_features}",
                values.len()
            )));
        }
        if !label.is_finite() || values.iter().any(|v| !v.is_finite()) {
            return Err(AqiError::InvalidDataset(format!(
                "row {row} contains a non-finite value"
            )));
        }
    }
    Ok(n_features)
}

#[allow(clippy::cast_possible_truncation)]
fn to_matrix<R: AsRef<[f64]>>(
    x: &[R],
    y: &[f64],
    n_features: usize,
) -> Result<(Matrix<f32>, Vector<f32>)> {
    let values = x
        .iter()
        .flat_map(|row| row.as_ref().iter().map(|&v| v as f32))
        .collect();
    let x = Matrix::from_vec(x.len(), n_features, values)
        .map_err(|e| AqiError::InvalidDataset(e.to_string()))?;
    let y = Vector::from_vec(y.iter().map(|&v| v as f32).collect());
    Ok((x, y))
}
