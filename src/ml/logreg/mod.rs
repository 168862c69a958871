//! Binary logistic regression classifier with L2 regularization.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

mod train;
pub use train::{LogRegOptions, train_logreg};

/// Artifact format version for [`LogRegModel`].
pub const LOGREG_MODEL_VERSION: i64 = 1;

/// Configured, unfitted logistic regression step.
#[derive(Debug, Clone, Default)]
pub struct LogisticRegression {
    pub options: LogRegOptions,
}

/// Fitted binary logistic regression weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRegModel {
    pub model_version: i64,
    pub classes: Vec<String>,
    pub weights: Vec<f64>,
    pub intercept: f64,
    /// Inverse regularization strength used during fitting.
    pub c: f64,
    /// Solver iterations performed.
    pub n_iter: usize,
    /// Whether the gradient tolerance was reached before `max_iter`.
    pub converged: bool,
}

impl LogisticRegression {
    pub fn new(options: LogRegOptions) -> Self {
        Self { options }
    }
}

impl LogRegModel {
    /// Validate dimensions and parameter sanity.
    pub fn validate(&self) -> Result<(), String> {
        if self.model_version != LOGREG_MODEL_VERSION {
            return Err(format!(
                "Unsupported model_version {} (expected {})",
                self.model_version, LOGREG_MODEL_VERSION
            ));
        }
        if self.classes.len() != 2 {
            return Err(format!(
                "Binary classifier needs 2 classes, found {}",
                self.classes.len()
            ));
        }
        if self.weights.is_empty() {
            return Err("No weights defined".to_string());
        }
        if !self.intercept.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err("weights must be finite".to_string());
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.weights.len()
    }

    /// Signed distance to the decision boundary for a single standardized row.
    pub fn decision_function(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.intercept
            + self
                .weights
                .iter()
                .zip(row.iter())
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }

    /// Probability of class `1` for a single standardized row.
    pub fn predict_proba(&self, row: ArrayView1<'_, f64>) -> f64 {
        sigmoid(self.decision_function(row))
    }

    /// Predicted class index for a single standardized row.
    pub fn predict(&self, row: ArrayView1<'_, f64>) -> usize {
        usize::from(self.decision_function(row) > 0.0)
    }
}

/// Numerically stable logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn model(weights: Vec<f64>, intercept: f64) -> LogRegModel {
        LogRegModel {
            model_version: LOGREG_MODEL_VERSION,
            classes: vec!["a".to_string(), "b".to_string()],
            weights,
            intercept,
            c: 1.0,
            n_iter: 0,
            converged: true,
        }
    }

    #[test]
    fn sigmoid_is_symmetric_and_saturates() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!((sigmoid(3.0) + sigmoid(-3.0) - 1.0).abs() < 1e-12);
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert_eq!(sigmoid(1000.0), 1.0);
    }

    #[test]
    fn predicts_by_sign_of_decision_function() {
        let model = model(vec![2.0, -1.0], 0.5);
        let row = array![1.0, 1.0];
        assert_eq!(model.decision_function(row.view()), 1.5);
        assert_eq!(model.predict(row.view()), 1);
        assert_eq!(model.predict(array![-1.0, 0.0].view()), 0);
        assert!(model.predict_proba(row.view()) > 0.5);
    }

    #[test]
    fn validate_rejects_bad_shapes() {
        model(vec![1.0], 0.0).validate().unwrap();
        let mut bad = model(vec![1.0], 0.0);
        bad.classes.pop();
        assert!(bad.validate().is_err());
        assert!(model(Vec::new(), 0.0).validate().is_err());
        assert!(model(vec![f64::NAN], 0.0).validate().is_err());
    }
}
