//! Split, fit and score the pipeline on a holdout partition.

use crate::dataset::{FeatureTable, Targets};
use crate::ml::metrics::{ConfusionMatrix, PerClassStats, accuracy_score, precision_recall_by_class};
use crate::ml::split::stratified_split;
use crate::ml::{FittedPipeline, TrainError, build_model};

/// Holdout settings for [`train_model`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOptions {
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

/// Fitted model plus its holdout evaluation.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub model: FittedPipeline,
    /// Exact-match rate on the test partition, in `[0, 1]`.
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub per_class: Vec<PerClassStats>,
    pub n_train: usize,
    pub n_test: usize,
}

/// Split the data, fit a fresh pipeline on the train rows and score it on the test rows.
pub fn train_model(
    x: &FeatureTable,
    y: &Targets,
    options: &TrainOptions,
) -> Result<TrainOutcome, TrainError> {
    if x.n_samples() != y.len() {
        return Err(TrainError::LengthMismatch {
            rows: x.n_samples(),
            labels: y.len(),
        });
    }
    let split = stratified_split(&y.labels, options.test_fraction, options.seed)?;
    let (x_train, y_train) = (x.select(&split.train), y.select(&split.train));
    let (x_test, y_test) = (x.select(&split.test), y.select(&split.test));

    let model = build_model().fit(&x_train, &y_train)?;
    let predicted = model.predict(x_test.values.view())?;
    let accuracy = accuracy_score(&y_test.labels, &predicted);
    let confusion = ConfusionMatrix::from_predictions(y.n_classes(), &y_test.labels, &predicted);
    let per_class = precision_recall_by_class(&confusion);

    println!("Model accuracy: {accuracy:.4}");
    tracing::info!(
        accuracy,
        train = split.train.len(),
        test = split.test.len(),
        "Evaluated holdout accuracy"
    );
    for (name, stats) in y.class_names.iter().zip(&per_class) {
        tracing::info!(
            "class {:<10} precision={:.3} recall={:.3} f1={:.3} support={}",
            name,
            stats.precision,
            stats.recall,
            stats.f1(),
            stats.support
        );
    }

    Ok(TrainOutcome {
        model,
        accuracy,
        confusion,
        per_class,
        n_train: split.train.len(),
        n_test: split.test.len(),
    })
}
