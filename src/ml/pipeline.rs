//! Two-stage model: standardization followed by logistic regression.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::TrainError;
use super::logreg::{LogRegModel, LogRegOptions, LogisticRegression, train_logreg};
use super::scaler::{FittedScaler, StandardScaler};
use crate::dataset::{FeatureTable, Targets};

/// Artifact format version for [`FittedPipeline`].
pub const PIPELINE_FORMAT_VERSION: i64 = 1;

/// Iteration cap for the classifier, large enough to converge on the bundled dataset.
pub const DEFAULT_MAX_ITER: usize = 1000;

/// Unfitted pipeline: a scaler step feeding a classifier step.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub scaler: StandardScaler,
    pub classifier: LogisticRegression,
}

/// Fitted pipeline, serialized as the published model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    pub format_version: i64,
    pub feature_names: Vec<String>,
    pub scaler: FittedScaler,
    pub classifier: LogRegModel,
}

/// Build the untrained standardize-then-classify pipeline.
pub fn build_model() -> Pipeline {
    Pipeline {
        scaler: StandardScaler,
        classifier: LogisticRegression::new(LogRegOptions {
            max_iter: DEFAULT_MAX_ITER,
            ..LogRegOptions::default()
        }),
    }
}

impl Pipeline {
    /// Fit the scaler on `x`, then the classifier on the standardized rows.
    pub fn fit(&self, x: &FeatureTable, y: &Targets) -> Result<FittedPipeline, TrainError> {
        if x.n_samples() != y.len() {
            return Err(TrainError::LengthMismatch {
                rows: x.n_samples(),
                labels: y.len(),
            });
        }
        let scaler = self.scaler.fit(x.values.view())?;
        let standardized = scaler.transform(x.values.view())?;
        let classifier = train_logreg(
            standardized.view(),
            &y.labels,
            &y.class_names,
            &self.classifier.options,
        )?;
        tracing::info!(
            iterations = classifier.n_iter,
            converged = classifier.converged,
            "Fitted pipeline on {} samples",
            x.n_samples()
        );
        Ok(FittedPipeline {
            format_version: PIPELINE_FORMAT_VERSION,
            feature_names: x.feature_names.clone(),
            scaler,
            classifier,
        })
    }
}

impl FittedPipeline {
    /// Check internal consistency after deserialization.
    pub fn validate(&self) -> Result<(), TrainError> {
        if self.format_version != PIPELINE_FORMAT_VERSION {
            return Err(TrainError::InvalidModel(format!(
                "Unsupported format_version {} (expected {})",
                self.format_version, PIPELINE_FORMAT_VERSION
            )));
        }
        self.classifier
            .validate()
            .map_err(TrainError::InvalidModel)?;
        let expected = self.feature_names.len();
        for (what, len) in [
            ("scaler mean", self.scaler.mean.len()),
            ("scaler scale", self.scaler.scale.len()),
            ("classifier weights", self.classifier.n_features()),
        ] {
            if len != expected {
                return Err(TrainError::InvalidModel(format!(
                    "{what} length {len} does not match {expected} features"
                )));
            }
        }
        Ok(())
    }

    pub fn class_names(&self) -> &[String] {
        &self.classifier.classes
    }

    /// Predicted class index for every row of `x`.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<usize>, TrainError> {
        let standardized = self.scaler.transform(x)?;
        Ok(standardized
            .rows()
            .into_iter()
            .map(|row| self.classifier.predict(row))
            .collect())
    }

    /// Probability of class `1` for every row of `x`.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>, TrainError> {
        let standardized = self.scaler.transform(x)?;
        Ok(standardized
            .rows()
            .into_iter()
            .map(|row| self.classifier.predict_proba(row))
            .collect())
    }
}
