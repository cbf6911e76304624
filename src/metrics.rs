//! Regression metrics used as training diagnostics
//!
//! The arithmetic is aprender's (`mae`, `r_squared`, both in `f32`). This module
//! adds the length checks aprender asserts on.

use aprender::metrics;
use aprender::primitives::Vector;
use serde::{Deserialize, Serialize};

use crate::error::{AqiError, Result};

/// Held-out accuracy of a trained estimator. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Mean absolute error
    pub mae: f64,
    /// Coefficient of determination
    pub r2: f64,
}

impl Evaluation {
    /// Compute both metrics
    ///
    /// # Errors
    ///
    /// * `AqiError::EmptyDataset` - No samples
    /// * `AqiError::InvalidDataset` - Lengths differ
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Result<Self> {
        let (y_true, y_pred) = vectors(y_true, y_pred)?;
        Ok(Self {
            mae: f64::from(metrics::mae(&y_pred, &y_true)),
            r2: f64::from(metrics::r_squared(&y_pred, &y_true)),
        })
    }
}

#[allow(clippy::cast_possible_truncation)]
fn vectors(y_true: &[f64], y_pred: &[f64]) -> Result<(Vector<f32>, Vector<f32>)> {
    if y_true.len() != y_pred.len() {
        return Err(AqiError::length_mismatch(y_true.len(), y_pred.len()));
    }
    if y_true.is_empty() {
        return Err(AqiError::EmptyDataset);
    }
    let to_vector = |v: &[f64]| Vector::from_vec(v.iter().map(|&x| x as f32).collect());
    Ok((to_vector(y_true), to_vector(y_pred)))
}

/// MAE = (1/n) Σ |y_true - y_pred|
///
/// # Errors
///
/// See [`Evaluation::compute`].
pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    let (y_true, y_pred) = vectors(y_true, y_pred)?;
    Ok(f64::from(metrics::mae(&y_pred, &y_true)))
}

/// R² = 1 - SS_res / SS_tot
///
/// Returns 0 when the targets have no variance.
///
/// # Errors
///
/// See [`Evaluation::compute`].
pub fn r_squared(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    let (y_true, y_pred) = vectors(y_true, y_pred)?;
    Ok(f64::from(metrics::r_squared(&y_pred, &y_true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const EPS: f64 = 1e-5;

    #[rstest]
    #[case(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 0.0, 1.0)]
    #[case(&[1.0, 2.0, 3.0], &[2.0, 3.0, 4.0], 1.0, -0.5)]
    #[case(&[0.0, 10.0], &[5.0, 5.0], 5.0, 0.0)]
    #[case(&[4.0, 4.0], &[3.0, 5.0], 1.0, 0.0)] // constant targets
    #[case(&[100.0, 200.0, 300.0, 400.0], &[110.0, 190.0, 320.0, 380.0], 15.0, 0.98)]
    fn metric_cases(
        #[case] y_true: &[f64],
        #[case] y_pred: &[f64],
        #[case] mae: f64,
        #[case] r2: f64,
    ) {
        let eval = Evaluation::compute(y_true, y_pred).unwrap();
        assert!((eval.mae - mae).abs() < EPS, "mae {}", eval.mae);
        assert!((eval.r2 - r2).abs() < EPS, "r2 {}", eval.r2);
        assert_eq!(mean_absolute_error(y_true, y_pred).unwrap(), eval.mae);
        assert_eq!(r_squared(y_true, y_pred).unwrap(), eval.r2);
    }

    #[test]
    fn metric_errors() {
        assert_eq!(
            mean_absolute_error(&[], &[]).unwrap_err(),
            AqiError::EmptyDataset
        );
        assert_eq!(
            r_squared(&[1.0], &[1.0, 2.0]).unwrap_err(),
            AqiError::length_mismatch(1, 2)
        );
        assert_eq!(
            Evaluation::compute(&[1.0, 2.0], &[1.0]).unwrap_err(),
            AqiError::length_mismatch(2, 1)
        );
    }
}
