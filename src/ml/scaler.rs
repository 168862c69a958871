//! Per-feature standardization (zero mean, unit variance).

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::TrainError;

/// Scale values below this are treated as constant features.
const MIN_SCALE: f64 = 1e-12;

/// Unfitted standardization step.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardScaler;

/// Learned per-feature mean and scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedScaler {
    pub mean: Vec<f64>,
    /// Population standard deviation; constant features keep a scale of `1.0`.
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Learn mean and scale for every column of `x`.
    pub fn fit(&self, x: ArrayView2<'_, f64>) -> Result<FittedScaler, TrainError> {
        let mean = x.mean_axis(Axis(0)).ok_or(TrainError::EmptyTrainingSet)?;
        let std = x.std_axis(Axis(0), 0.0);
        if mean.iter().chain(std.iter()).any(|v| !v.is_finite()) {
            return Err(TrainError::NonFinite("scaler statistics"));
        }
        let scale = std
            .iter()
            .map(|&s| if s < MIN_SCALE { 1.0 } else { s })
            .collect();
        Ok(FittedScaler {
            mean: mean.to_vec(),
            scale,
        })
    }
}

impl FittedScaler {
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Standardize every row of `x` with the learned statistics.
    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, TrainError> {
        if x.ncols() != self.n_features() {
            return Err(TrainError::FeatureCountMismatch {
                expected: self.n_features(),
                found: x.ncols(),
            });
        }
        let mut out = x.to_owned();
        for mut row in out.rows_mut() {
            for ((value, mean), scale) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
                *value = (*value - mean) / scale;
            }
        }
        Ok(out)
    }
}
