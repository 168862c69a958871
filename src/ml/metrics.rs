//! Evaluation metrics for classification models.

#[derive(Debug, Clone, PartialEq, Eq)]
/// Confusion matrix for a `K`-class classifier.
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    /// Build a matrix from aligned truth/prediction slices.
    pub fn from_predictions(n_classes: usize, truth: &[usize], predicted: &[usize]) -> Self {
        let mut cm = Self::new(n_classes);
        for (&t, &p) in truth.iter().zip(predicted) {
            cm.add(t, p);
        }
        cm
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Precision/recall statistics for a single class.
pub struct PerClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f64,
    /// `TP / (TP + FN)`.
    pub recall: f64,
    /// Total number of true examples for the class.
    pub support: u32,
}

impl PerClassStats {
    pub fn f1(&self) -> f64 {
        if self.precision + self.recall == 0.0 {
            0.0
        } else {
            2.0 * self.precision * self.recall / (self.precision + self.recall)
        }
    }
}

/// Compute per-class precision and recall from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    let mut stats = Vec::with_capacity(k);
    for class_idx in 0..k {
        let tp = f64::from(cm.get(class_idx, class_idx));
        let mut fp = 0f64;
        let mut fn_ = 0f64;
        let mut support = 0u32;
        for j in 0..k {
            let v = cm.get(class_idx, j);
            support = support.saturating_add(v);
            if j != class_idx {
                fn_ += f64::from(v);
            }
        }
        for i in 0..k {
            if i != class_idx {
                fp += f64::from(cm.get(i, class_idx));
            }
        }
        let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
        let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
        stats.push(PerClassStats {
            precision,
            recall,
            support,
        });
    }
    stats
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f64 {
    let mut correct = 0u64;
    let mut total = 0u64;
    for truth in 0..cm.n_classes {
        for predicted in 0..cm.n_classes {
            let v = u64::from(cm.get(truth, predicted));
            total += v;
            if truth == predicted {
                correct += v;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        (correct as f64) / (total as f64)
    }
}

/// Fraction of positions where `predicted` equals `truth`; `0.0` for empty input.
pub fn accuracy_score(truth: &[usize], predicted: &[usize]) -> f64 {
    let total = truth.len().min(predicted.len());
    if total == 0 {
        return 0.0;
    }
    let hits = truth
        .iter()
        .zip(predicted)
        .filter(|(t, p)| t == p)
        .count();
    hits as f64 / total as f64
}
