//! Synthetic AQI labels and sample generation
//!
//! The label is driven by the worst pollutant: each pollutant reading is scaled
//! against a reference level to a partial index, and the AQI is the largest
//! partial index, capped at [`AQI_CAP`]. Temperature and humidity are model
//! inputs but do not contribute to the label.
//!
//! Samples come from two regimes. The full regime draws every feature from its
//! [`Feature::expected_range`], where most labels land above 100. The clean-air
//! regime caps each pollutant at its reference level so everyday readings are
//! represented in the training data.

use rand::distributions::{Distribution, Uniform};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use crate::dataset::Dataset;
use crate::error::{AqiError, Result};
use crate::features::{FEATURE_COUNT, Feature, FeatureVector};

/// Upper cap applied to every synthetic label
pub const AQI_CAP: f64 = 500.0;

/// Pollutant readings that map to a partial index of 100
pub const REFERENCE_LEVELS: [(Feature, f64); 6] = [
    (Feature::Pm25, 60.0),
    (Feature::Pm10, 100.0),
    (Feature::No2, 80.0),
    (Feature::So2, 80.0),
    (Feature::Co, 4.0),
    (Feature::O3, 100.0),
];

/// Default number of generated samples
pub const DEFAULT_SAMPLES: usize = 1000;

/// Default generator seed
pub const DEFAULT_SEED: u64 = 42;

/// Default share of samples drawn from the clean-air regime
pub const DEFAULT_CLEAN_AIR_FRACTION: f64 = 0.5;

/// Partial index of one pollutant reading, `None` for non-pollutant features
#[must_use]
pub fn sub_index(feature: Feature, value: f64) -> Option<f64> {
    REFERENCE_LEVELS
        .iter()
        .find(|(f, _)| *f == feature)
        .map(|(_, reference)| value / reference * 100.0)
}

/// Synthetic AQI label for a feature vector
///
/// # Example
///
/// ```rust
/// use aqi_estimator::FeatureVector;
/// use aqi_estimator::synthetic::synthetic_aqi;
///
/// let fv = FeatureVector::from_array([120.0, 20.0, 10.0, 5.0, 1.0, 10.0, 25.0, 50.0]);
/// assert!((synthetic_aqi(&fv) - 200.0).abs() < 1e-9);
/// ```
#[must_use]
pub fn synthetic_aqi(features: &FeatureVector) -> f64 {
    REFERENCE_LEVELS
        .iter()
        .filter_map(|&(feature, _)| sub_index(feature, features.get(feature)))
        .fold(f64::NEG_INFINITY, f64::max)
        .min(AQI_CAP)
}

/// Seeded generator of uniformly sampled, synthetically labeled readings
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    rng: StdRng,
    clean_air_fraction: f64,
    full: [Uniform<f64>; FEATURE_COUNT],
    clean_air: [Uniform<f64>; FEATURE_COUNT],
}

impl SyntheticGenerator {
    /// Generator with the default clean-air share
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let full = Feature::ALL.map(|feature| {
            let (lo, hi) = feature.expected_range();
            Uniform::new(lo, hi)
        });
        let clean_air = Feature::ALL.map(|feature| {
            let (lo, hi) = feature.expected_range();
            let hi = REFERENCE_LEVELS
                .iter()
                .find(|(f, _)| *f == feature)
                .map_or(hi, |&(_, reference)| reference.min(hi));
            Uniform::new(lo, hi)
        });
        Self {
            rng: StdRng::seed_from_u64(seed),
            clean_air_fraction: DEFAULT_CLEAN_AIR_FRACTION,
            full,
            clean_air,
        }
    }

    /// Set the share of samples drawn from the clean-air regime
    ///
    /// # Errors
    ///
    /// * `AqiError::Config` - Fraction outside [0, 1]
    pub fn with_clean_air_fraction(mut self, fraction: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(AqiError::Config(format!(
                "clean_air_fraction must be within [0, 1], got {fraction}"
            )));
        }
        self.clean_air_fraction = fraction;
        Ok(self)
    }

    /// Draw one feature vector
    pub fn sample(&mut self) -> FeatureVector {
        let distributions = if self.rng.gen_bool(self.clean_air_fraction) {
            &self.clean_air
        } else {
            &self.full
        };
        let mut values = [0.0; FEATURE_COUNT];
        for (value, dist) in values.iter_mut().zip(distributions) {
            *value = dist.sample(&mut self.rng);
        }
        FeatureVector::from_array(values)
    }

    /// Draw `n` labeled samples
    ///
    /// # Errors
    ///
    /// Never fails for generated data; the signature mirrors [`Dataset::push`].
    pub fn dataset(&mut self, n: usize) -> Result<Dataset> {
        let mut dataset = Dataset::default();
        for _ in 0..n {
            let features = self.sample();
            dataset.push(features, synthetic_aqi(&features))?;
        }
        Ok(dataset)
    }
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

/// Generate `n` labeled samples with the given seed
///
/// # Errors
///
/// See [`SyntheticGenerator::dataset`].
pub fn generate(n: usize, seed: u64) -> Result<Dataset> {
    SyntheticGenerator::new(seed).dataset(n)
}
