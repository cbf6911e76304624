//! Persisted model artifact
//!
//! The artifact is a JSON document holding the format version, the ordered
//! feature names the model was trained on, the forest itself and, optionally,
//! the held-out evaluation from training. Feature names are checked against the
//! canonical order on read so a model trained on a different schema is rejected
//! rather than silently misaligned.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AqiError, Result};
use crate::estimator::{TrainedModel, check_schema};
use crate::forest::RandomForest;
use crate::metrics::Evaluation;

/// Current artifact format version
pub const FORMAT_VERSION: u32 = 1;

/// Default artifact location
pub const DEFAULT_MODEL_PATH: &str = "aqi_model.json";

/// Serialized model plus its feature schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub feature_names: Vec<String>,
    pub forest: RandomForest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
}

#[derive(Deserialize)]
struct VersionProbe {
    format_version: u32,
}

impl ModelArtifact {
    /// Package a trained model for saving
    #[must_use]
    pub fn new(model: &TrainedModel, evaluation: Option<Evaluation>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            feature_names: model.feature_names().to_vec(),
            forest: model.forest().clone(),
            evaluation,
        }
    }

    /// Parse and validate an artifact from JSON text
    ///
    /// # Errors
    ///
    /// * `AqiError::Serialization` - Not a valid artifact document
    /// * `AqiError::UnsupportedArtifactVersion` - Unknown `format_version`
    /// * `AqiError::SchemaMismatch` - Feature names or forest do not match
    pub fn from_json(text: &str) -> Result<Self> {
        let probe: VersionProbe = serde_json::from_str(text)?;
        if probe.format_version != FORMAT_VERSION {
            return Err(AqiError::UnsupportedArtifactVersion(probe.format_version));
        }
        let artifact: Self = serde_json::from_str(text)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Encode as pretty-printed JSON
    ///
    /// # Errors
    ///
    /// * `AqiError::Serialization` - Encoding failed
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read and validate an artifact file
    ///
    /// # Errors
    ///
    /// * `AqiError::Io` - File missing or unreadable
    /// * see [`ModelArtifact::from_json`]
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Write the artifact, replacing any existing file only once fully written
    ///
    /// # Errors
    ///
    /// * `AqiError::Io` - Write or rename failed
    /// * `AqiError::Serialization` - Encoding failed
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.to_json()?;
        let tmp = temp_path(path);

        if let Err(err) = std::fs::write(&tmp, text).and_then(|()| std::fs::rename(&tmp, path)) {
            let _ = std::fs::remove_file(&tmp);
            return Err(err.into());
        }
        debug!(path = %path.display(), trees = self.forest.n_trees(), "model artifact written");
        Ok(())
    }

    /// Check the feature schema and forest structure
    ///
    /// # Errors
    ///
    /// * `AqiError::SchemaMismatch` - Feature names or forest do not match
    pub fn validate(&self) -> Result<()> {
        check_schema(&self.feature_names, &self.forest)
    }

    /// Validate and turn the artifact into a ready-to-use model
    ///
    /// # Errors
    ///
    /// See [`ModelArtifact::validate`].
    pub fn into_model(self) -> Result<TrainedModel> {
        TrainedModel::new(self.forest, self.feature_names)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FEATURE_COUNT, FEATURE_NAMES};
    use crate::forest::ForestParams;

    fn model() -> TrainedModel {
        let x: Vec<[f64; FEATURE_COUNT]> = (0..20)
            .map(|i| [f64::from(i); FEATURE_COUNT])
            .collect();
        let y: Vec<f64> = (0..20).map(|i| f64::from(i) * 5.0).collect();
        let params = ForestParams {
            n_estimators: 3,
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&x, &y, &params).unwrap();
        TrainedModel::new(forest, FEATURE_NAMES.map(String::from).to_vec()).unwrap()
    }

    fn artifact() -> ModelArtifact {
        ModelArtifact::new(&model(), Some(Evaluation { mae: 1.5, r2: 0.9 }))
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let original = artifact();
        original.write(&path).unwrap();
        assert!(!temp_path(&path).exists());

        let loaded = ModelArtifact::read(&path).unwrap();
        assert_eq!(loaded.to_json().unwrap(), original.to_json().unwrap());
        assert_eq!(loaded.evaluation, original.evaluation);
    }

    #[test]
    fn read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ModelArtifact::read(dir.path().join("absent.json")),
            Err(AqiError::Io(_))
        ));
    }

    #[test]
    fn rejects_unknown_version() {
        let mut json = serde_json::to_value(artifact()).unwrap();
        json["format_version"] = serde_json::json!(2);
        assert_eq!(
            ModelArtifact::from_json(&json.to_string()).unwrap_err(),
            AqiError::UnsupportedArtifactVersion(2)
        );
    }

    #[test]
    fn rejects_reordered_features() {
        let mut json = serde_json::to_value(artifact()).unwrap();
        json["feature_names"][0] = serde_json::json!("PM10");
        json["feature_names"][1] = serde_json::json!("PM2.5");
        assert!(matches!(
            ModelArtifact::from_json(&json.to_string()),
            Err(AqiError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn rejects_corrupt_forest() {
        let mut json = serde_json::to_value(artifact()).unwrap();
        json["forest"]["model"]["trees"][0]["tree"] = serde_json::Value::Null;
        assert!(matches!(
            ModelArtifact::from_json(&json.to_string()),
            Err(AqiError::SchemaMismatch(_))
        ));

        let mut json = serde_json::to_value(artifact()).unwrap();
        json["forest"]["n_trees"] = serde_json::json!(0);
        let hollow = ModelArtifact::from_json(&json.to_string());
        assert!(matches!(hollow, Err(AqiError::SchemaMismatch(_))));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            ModelArtifact::from_json("not json"),
            Err(AqiError::Serialization(_))
        ));
        assert!(matches!(
            ModelArtifact::from_json(r#"{"format_version": 1}"#),
            Err(AqiError::Serialization(_))
        ));
    }

    #[test]
    fn evaluation_is_optional() {
        let mut json = serde_json::to_value(artifact()).unwrap();
        json.as_object_mut().unwrap().remove("evaluation");
        let loaded = ModelArtifact::from_json(&json.to_string()).unwrap();
        assert_eq!(loaded.evaluation, None);
    }

    #[test]
    fn temp_path_is_sibling() {
        assert_eq!(
            temp_path(Path::new("/models/aqi.json")),
            PathBuf::from("/models/aqi.json.tmp")
        );
    }
}
