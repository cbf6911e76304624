//! Runtime settings
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `AQI_*` environment variables. The file is taken from an explicit path, else
//! from `AQI_CONFIG`, else from `./aqi.toml` when it exists.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::artifact::DEFAULT_MODEL_PATH;
use crate::error::{AqiError, Result};
use crate::forest::MAX_TREE_DEPTH;
use crate::training::TrainingConfig;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "AQI_CONFIG";

/// Config file picked up from the working directory when present
pub const DEFAULT_CONFIG_PATH: &str = "aqi.toml";

/// Resolved settings for the CLI and training pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub model_path: PathBuf,
    pub training: TrainingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            training: TrainingConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from the config file and the process environment
    ///
    /// # Errors
    ///
    /// * `AqiError::Config` - Config file missing, unreadable or malformed, or
    ///   an override or resulting value is invalid
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        Self::load_with(config_path, |key| std::env::var(key).ok())
    }

    /// Same as [`Settings::load`] with a custom variable lookup
    ///
    /// # Errors
    ///
    /// See [`Settings::load`].
    pub fn load_with<F>(config_path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(path) = resolve_config_path(config_path, &lookup)? {
            let text = std::fs::read_to_string(&path).map_err(|err| {
                AqiError::Config(format!("failed reading {}: {err}", path.display()))
            })?;
            settings.apply_toml(&text)?;
        }
        settings.apply_overrides(lookup)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Defaults overlaid with a TOML document
    ///
    /// # Errors
    ///
    /// * `AqiError::Config` - Malformed TOML or invalid values
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut settings = Self::default();
        settings.apply_toml(text)?;
        settings.validate()?;
        Ok(settings)
    }

    fn apply_toml(&mut self, text: &str) -> Result<()> {
        let file: FileConfig =
            toml::from_str(text).map_err(|err| AqiError::Config(err.to_string()))?;

        if let Some(v) = non_empty(file.model_path) {
            self.model_path = PathBuf::from(v);
        }
        self.apply_file_training(file.training);
        Ok(())
    }

    fn apply_file_training(&mut self, training: Option<FileTrainingConfig>) {
        let Some(training) = training else {
            return;
        };
        let dst = &mut self.training;

        if let Some(v) = training.samples {
            dst.samples = v;
        }
        if let Some(v) = training.test_fraction {
            dst.test_fraction = v;
        }
        if let Some(v) = training.seed {
            dst.seed = v;
        }
        if let Some(v) = training.clean_air_fraction {
            dst.clean_air_fraction = v;
        }

        let Some(forest) = training.forest else {
            return;
        };
        if let Some(v) = forest.n_estimators {
            dst.forest.n_estimators = v;
        }
        if let Some(v) = forest.max_depth {
            dst.forest.max_depth = Some(v);
        }
        if let Some(v) = forest.seed {
            dst.forest.seed = Some(v);
        }
    }

    /// Apply `AQI_*` overrides read through `lookup`
    ///
    /// `AQI_SEED` sets both the data seed and the forest seed. Empty values are
    /// ignored.
    ///
    /// # Errors
    ///
    /// * `AqiError::Config` - A value does not parse
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| non_empty(lookup(key)).map(|v| (key.to_string(), v));

        if let Some((_, v)) = var("AQI_MODEL_PATH") {
            self.model_path = PathBuf::from(v);
        }
        if let Some((key, v)) = var("AQI_SEED") {
            let seed = parse_var(&key, &v)?;
            self.training.seed = seed;
            self.training.forest.seed = Some(seed);
        }
        if let Some((key, v)) = var("AQI_TREES") {
            self.training.forest.n_estimators = parse_var(&key, &v)?;
        }
        if let Some((key, v)) = var("AQI_SAMPLES") {
            self.training.samples = parse_var(&key, &v)?;
        }
        if let Some((key, v)) = var("AQI_TEST_FRACTION") {
            self.training.test_fraction = parse_var(&key, &v)?;
        }
        Ok(())
    }

    /// Reject settings training would fail on
    ///
    /// # Errors
    ///
    /// * `AqiError::Config` - A value is out of range
    pub fn validate(&self) -> Result<()> {
        let training = &self.training;
        if !(training.test_fraction > 0.0 && training.test_fraction < 1.0) {
            return Err(AqiError::Config(format!(
                "test_fraction must be between 0 and 1, got {}",
                training.test_fraction
            )));
        }
        if !(0.0..=1.0).contains(&training.clean_air_fraction) {
            return Err(AqiError::Config(format!(
                "clean_air_fraction must be within [0, 1], got {}",
                training.clean_air_fraction
            )));
        }
        if training.samples == 0 {
            return Err(AqiError::Config("samples must be at least 1".into()));
        }
        let forest = &training.forest;
        if forest.n_estimators == 0 {
            return Err(AqiError::Config("n_estimators must be at least 1".into()));
        }
        if let Some(depth) = forest.max_depth.filter(|&d| d > MAX_TREE_DEPTH) {
            return Err(AqiError::Config(format!(
                "max_depth must be at most {MAX_TREE_DEPTH}, got {depth}"
            )));
        }
        Ok(())
    }
}

fn resolve_config_path<F>(explicit: Option<&Path>, lookup: &F) -> Result<Option<PathBuf>>
where
    F: Fn(&str) -> Option<String>,
{
    let configured = explicit
        .map(Path::to_path_buf)
        .or_else(|| non_empty(lookup(CONFIG_ENV)).map(PathBuf::from));
    if let Some(path) = configured {
        if !path.exists() {
            return Err(AqiError::Config(format!(
                "config file does not exist: {}",
                path.display()
            )));
        }
        return Ok(Some(path));
    }

    let fallback = Path::new(DEFAULT_CONFIG_PATH);
    Ok(fallback.exists().then(|| fallback.to_path_buf()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| AqiError::Config(format!("invalid value for {key}: {value:?}")))
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    model_path: Option<String>,
    #[serde(default)]
    training: Option<FileTrainingConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct FileTrainingConfig {
    #[serde(default)]
    samples: Option<usize>,
    #[serde(default)]
    test_fraction: Option<f64>,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    clean_air_fraction: Option<f64>,
    #[serde(default)]
    forest: Option<FileForestConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct FileForestConfig {
    #[serde(default)]
    n_estimators: Option<usize>,
    #[serde(default)]
    max_depth: Option<usize>,
    #[serde(default)]
    seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const FULL: &str = r#"
model_path = "models/aqi.json"

[training]
samples = 500
test_fraction = 0.25
seed = 7
clean_air_fraction = 0.3

[training.forest]
n_estimators = 40
max_depth = 12
"#;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.model_path, PathBuf::from("aqi_model.json"));
        assert_eq!(settings.training, TrainingConfig::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn toml_overrides_defaults() {
        let settings = Settings::from_toml_str(FULL).unwrap();
        assert_eq!(settings.model_path, PathBuf::from("models/aqi.json"));
        assert_eq!(settings.training.samples, 500);
        assert_eq!(settings.training.test_fraction, 0.25);
        assert_eq!(settings.training.seed, 7);
        assert_eq!(settings.training.clean_air_fraction, 0.3);
        assert_eq!(settings.training.forest.n_estimators, 40);
        assert_eq!(settings.training.forest.max_depth, Some(12));
        // Untouched keys keep their defaults
        assert_eq!(settings.training.forest.seed, Some(42));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings = Settings::from_toml_str("[training]\nsamples = 10\n").unwrap();
        assert_eq!(settings.training.samples, 10);
        assert_eq!(settings.model_path, Settings::default().model_path);
        assert_eq!(settings.training.forest, TrainingConfig::default().forest);
    }

    #[rstest]
    #[case("training = 3")]
    #[case("[training]\nsamples = \"many\"")]
    #[case("[training]\ntest_fraction = 1.0")]
    #[case("[training.forest]\nn_estimators = 0")]
    #[case("[training.forest]\nmax_depth = 49")]
    #[case("[training]\nclean_air_fraction = -0.5")]
    fn bad_toml_is_config_error(#[case] text: &str) {
        assert!(matches!(
            Settings::from_toml_str(text),
            Err(AqiError::Config(_))
        ));
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aqi.toml");
        std::fs::write(&path, FULL).unwrap();

        let settings = Settings::load_with(
            Some(&path),
            env(&[
                ("AQI_MODEL_PATH", "/tmp/other.json"),
                ("AQI_SEED", "99"),
                ("AQI_TREES", "5"),
                ("AQI_SAMPLES", "  "),
                ("AQI_TEST_FRACTION", "0.5"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.model_path, PathBuf::from("/tmp/other.json"));
        assert_eq!(settings.training.seed, 99);
        assert_eq!(settings.training.forest.seed, Some(99));
        assert_eq!(settings.training.forest.n_estimators, 5);
        // Blank override leaves the file value
        assert_eq!(settings.training.samples, 500);
        assert_eq!(settings.training.test_fraction, 0.5);
    }

    #[test]
    fn config_path_from_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "model_path = \"from-env.json\"\n").unwrap();

        let settings = Settings::load_with(
            None,
            env(&[(CONFIG_ENV, path.to_str().unwrap())]),
        )
        .unwrap();
        assert_eq!(settings.model_path, PathBuf::from("from-env.json"));
    }

    #[test]
    fn missing_config_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            Settings::load_with(Some(&path), env(&[])),
            Err(AqiError::Config(_))
        ));
    }

    #[rstest]
    #[case("AQI_SEED", "-1")]
    #[case("AQI_TREES", "lots")]
    #[case("AQI_SAMPLES", "1e3")]
    #[case("AQI_TEST_FRACTION", "half")]
    fn bad_override_is_config_error(#[case] key: &str, #[case] value: &str) {
        let mut settings = Settings::default();
        let err = settings.apply_overrides(env(&[(key, value)])).unwrap_err();
        assert_eq!(
            err,
            AqiError::Config(format!("invalid value for {key}: {value:?}"))
        );
    }

    #[test]
    fn out_of_range_override_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aqi.toml");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            Settings::load_with(Some(&path), env(&[("AQI_TEST_FRACTION", "0")])),
            Err(AqiError::Config(_))
        ));
    }
}
