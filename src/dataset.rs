//! Labeled training data
//!
//! A [`Dataset`] pairs feature vectors with AQI labels. It can be read from and
//! written to CSV with a header of the canonical feature names plus `AQI`.

use std::io::{Read, Write};
use std::path::Path;

use aprender::model_selection::train_test_split;
use aprender::primitives::{Matrix, Vector};
use serde::{Deserialize, Serialize};

use crate::error::{AqiError, Result};
use crate::features::{FEATURE_COUNT, FEATURE_NAMES, FeatureVector};

/// Column holding the AQI label in CSV files
pub const LABEL_COLUMN: &str = "AQI";

/// Largest dataset [`Dataset::split`] handles; row indices travel as `f32`
const MAX_SPLIT_ROWS: usize = 1 << 24;

/// Feature vectors with their AQI labels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    features: Vec<FeatureVector>,
    labels: Vec<f64>,
}

impl Dataset {
    /// Create a dataset from parallel feature and label vectors
    ///
    /// # Errors
    ///
    /// * `AqiError::InvalidDataset` - Lengths differ or a label is not finite
    /// * `AqiError::InvalidInput` - A feature reading is not finite
    pub fn new(features: Vec<FeatureVector>, labels: Vec<f64>) -> Result<Self> {
        if features.len() != labels.len() {
            return Err(AqiError::length_mismatch(features.len(), labels.len()));
        }
        for (row, (fv, &label)) in features.iter().zip(&labels).enumerate() {
            fv.validate()?;
            check_label(row, label)?;
        }
        Ok(Self { features, labels })
    }

    /// Append one labeled sample
    ///
    /// # Errors
    ///
    /// Same as [`Dataset::new`] for the single sample.
    pub fn push(&mut self, features: FeatureVector, label: f64) -> Result<()> {
        features.validate()?;
        check_label(self.len(), label)?;
        self.features.push(features);
        self.labels.push(label);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn features(&self) -> &[FeatureVector] {
        &self.features
    }

    #[must_use]
    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FeatureVector, f64)> {
        self.features.iter().zip(self.labels.iter().copied())
    }

    /// Feature rows in canonical column order
    #[must_use]
    pub fn rows(&self) -> Vec<[f64; FEATURE_COUNT]> {
        self.features.iter().map(FeatureVector::to_array).collect()
    }

    /// Smallest and largest label, `None` when empty
    #[must_use]
    pub fn label_range(&self) -> Option<(f64, f64)> {
        self.labels.iter().fold(None, |acc, &label| match acc {
            None => Some((label, label)),
            Some((lo, hi)) => Some((lo.min(label), hi.max(label))),
        })
    }

    /// Shuffle and split into (train, test) with aprender's `train_test_split`
    ///
    /// `test_fraction` of the samples (rounded) go to the test set. Rows are
    /// split by index, so readings keep their full `f64` precision.
    ///
    /// # Errors
    ///
    /// * `AqiError::EmptyDataset` - No samples
    /// * `AqiError::InvalidDataset` - Fraction outside (0, 1), a side would be
    ///   empty, or more rows than an `f32` index can address
    pub fn split(&self, test_fraction: f64, seed: Option<u64>) -> Result<(Self, Self)> {
        if self.is_empty() {
            return Err(AqiError::EmptyDataset);
        }
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(AqiError::InvalidDataset(format!(
                "test fraction must be between 0 and 1, got {test_fraction}"
            )));
        }
        if self.len() > MAX_SPLIT_ROWS {
            return Err(AqiError::InvalidDataset(format!(
                "cannot split more than {MAX_SPLIT_ROWS} rows"
            )));
        }

        #[allow(clippy::cast_precision_loss)]
        let indices: Vec<f32> = (0..self.len()).map(|i| i as f32).collect();
        let x = Matrix::from_vec(self.len(), 1, indices.clone())
            .map_err(|e| AqiError::InvalidDataset(e.to_string()))?;
        let y = Vector::from_vec(indices);

        #[allow(clippy::cast_possible_truncation)]
        let (_, _, train, test) = train_test_split(&x, &y, test_fraction as f32, seed)
            .map_err(AqiError::InvalidDataset)?;
        Ok((self.subset(train.as_slice()), self.subset(test.as_slice())))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn subset(&self, indices: &[f32]) -> Self {
        let rows = indices.iter().map(|&i| i as usize);
        Self {
            features: rows.clone().map(|i| self.features[i]).collect(),
            labels: rows.map(|i| self.labels[i]).collect(),
        }
    }

    /// Read a labeled CSV
    ///
    /// The header must name all eight features (canonical names or form keys, any
    /// order) and an `AQI` column. Extra columns are ignored.
    ///
    /// # Errors
    ///
    /// * `AqiError::InvalidDataset` - Malformed CSV, missing columns or bad values
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| AqiError::InvalidDataset(format!("header: {e}")))?
            .clone();
        let label_idx = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(LABEL_COLUMN))
            .ok_or_else(|| {
                AqiError::InvalidDataset(format!("missing {LABEL_COLUMN} column"))
            })?;

        let mut dataset = Self::default();
        for (row, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| AqiError::InvalidDataset(format!("row {row}: {e}")))?;

            let features = FeatureVector::from_fields(headers.iter().zip(record.iter()))
                .map_err(|e| AqiError::InvalidDataset(format!("row {row}: {e}")))?;

            let raw_label = record.get(label_idx).unwrap_or_default();
            let label = raw_label.parse::<f64>().map_err(|_| {
                AqiError::InvalidDataset(format!("row {row}: invalid {LABEL_COLUMN} {raw_label:?}"))
            })?;

            dataset.push(features, label)?;
        }
        Ok(dataset)
    }

    /// Read a labeled CSV file
    ///
    /// # Errors
    ///
    /// * `AqiError::Io` - File cannot be opened
    /// * see [`Dataset::from_csv_reader`]
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(std::io::BufReader::new(file))
    }

    /// Write as CSV with canonical feature columns followed by `AQI`
    ///
    /// # Errors
    ///
    /// * `AqiError::Io` - Write failure
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        let io_err = |e: csv::Error| AqiError::Io(e.to_string());

        wtr.write_record(FEATURE_NAMES.iter().copied().chain([LABEL_COLUMN]))
            .map_err(io_err)?;
        for (fv, label) in self.iter() {
            let record = fv
                .to_array()
                .iter()
                .chain([label].iter())
                .map(f64::to_string)
                .collect::<Vec<_>>();
            wtr.write_record(&record).map_err(io_err)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn check_label(row: usize, label: f64) -> Result<()> {
    if label.is_finite() {
        Ok(())
    } else {
        Err(AqiError::InvalidDataset(format!(
            "row {row}: label {label} is not finite"
        )))
    }
}
