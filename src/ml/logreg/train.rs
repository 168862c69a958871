use std::collections::VecDeque;

use ndarray::{Array1, ArrayView2, s};

use super::{LOGREG_MODEL_VERSION, LogRegModel, sigmoid};
use crate::ml::TrainError;

/// Correction pairs kept by the L-BFGS solver.
const HISTORY: usize = 10;
/// Sufficient-decrease constant for the backtracking line search.
const ARMIJO_C1: f64 = 1e-4;
const MAX_LINE_SEARCH_STEPS: usize = 60;

/// Solver options for the logistic regression step.
#[derive(Debug, Clone)]
pub struct LogRegOptions {
    /// Inverse L2 regularization strength.
    pub c: f64,
    pub max_iter: usize,
    /// Stop once every gradient component is at most this large.
    pub tol: f64,
}

impl Default for LogRegOptions {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tol: 1e-4,
        }
    }
}

/// Fit binary logistic regression on standardized rows with L-BFGS.
///
/// Minimizes `mean(log(1 + exp(-s * (w.x + b)))) + ||w||^2 / (2 * C * n)` where
/// `s` is `+1` for class `1` and `-1` for class `0`. The intercept is not
/// penalized. Weights start at zero, so the result only depends on the inputs.
pub fn train_logreg(
    x: ArrayView2<'_, f64>,
    labels: &[usize],
    classes: &[String],
    options: &LogRegOptions,
) -> Result<LogRegModel, TrainError> {
    let n = x.nrows();
    let d = x.ncols();
    if n == 0 || d == 0 {
        return Err(TrainError::EmptyTrainingSet);
    }
    if labels.len() != n {
        return Err(TrainError::LengthMismatch {
            rows: n,
            labels: labels.len(),
        });
    }
    if classes.len() != 2 {
        return Err(TrainError::InvalidModel(format!(
            "Binary classifier needs 2 classes, found {}",
            classes.len()
        )));
    }
    if !options.c.is_finite() || options.c <= 0.0 {
        return Err(TrainError::InvalidModel(format!(
            "C must be > 0 (got {})",
            options.c
        )));
    }
    if let Some(&label) = labels.iter().find(|&&label| label > 1) {
        return Err(TrainError::LabelOutOfRange { label });
    }
    if labels.iter().all(|&label| label == labels[0]) {
        return Err(TrainError::SingleClass(labels[0]));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(TrainError::NonFinite("training features"));
    }

    let targets: Vec<f64> = labels.iter().map(|&label| label as f64).collect();
    let objective = Objective {
        x: x.view(),
        targets: &targets,
        lambda: 1.0 / (options.c * n as f64),
    };

    let mut theta = Array1::<f64>::zeros(d + 1);
    let (mut loss, mut grad) = objective.evaluate(&theta)?;
    let mut history: VecDeque<Correction> = VecDeque::with_capacity(HISTORY);
    let mut converged = max_abs(&grad) <= options.tol;
    let mut n_iter = 0usize;

    while !converged && n_iter < options.max_iter {
        let mut direction = two_loop_direction(&grad, &history);
        let mut slope = grad.dot(&direction);
        if slope >= 0.0 {
            history.clear();
            direction = -&grad;
            slope = grad.dot(&direction);
        }

        n_iter += 1;
        let Some((next_theta, next_loss, next_grad)) =
            line_search(&objective, &theta, loss, &direction, slope)?
        else {
            tracing::debug!(iteration = n_iter, "Line search made no progress");
            break;
        };

        let step = &next_theta - &theta;
        let grad_change = &next_grad - &grad;
        let curvature = step.dot(&grad_change);
        if curvature > 1e-10 {
            if history.len() == HISTORY {
                history.pop_front();
            }
            history.push_back(Correction {
                rho: 1.0 / curvature,
                step,
                grad_change,
            });
        }

        theta = next_theta;
        loss = next_loss;
        grad = next_grad;
        converged = max_abs(&grad) <= options.tol;
    }

    if converged {
        tracing::debug!(iterations = n_iter, loss, "Logistic regression converged");
    } else {
        tracing::warn!(
            iterations = n_iter,
            max_iter = options.max_iter,
            "Logistic regression did not reach tolerance {}; consider raising max_iter",
            options.tol
        );
    }

    let model = LogRegModel {
        model_version: LOGREG_MODEL_VERSION,
        classes: classes.to_vec(),
        weights: theta.slice(s![..d]).to_vec(),
        intercept: theta[d],
        c: options.c,
        n_iter,
        converged,
    };
    model.validate().map_err(TrainError::InvalidModel)?;
    Ok(model)
}

struct Objective<'a> {
    x: ArrayView2<'a, f64>,
    targets: &'a [f64],
    lambda: f64,
}

struct Correction {
    step: Array1<f64>,
    grad_change: Array1<f64>,
    rho: f64,
}

impl Objective<'_> {
    /// Regularized mean log-loss and its gradient; `theta` is weights then intercept.
    fn evaluate(&self, theta: &Array1<f64>) -> Result<(f64, Array1<f64>), TrainError> {
        let d = self.x.ncols();
        let n = self.x.nrows() as f64;
        let weights = theta.slice(s![..d]);
        let intercept = theta[d];

        let z = self.x.dot(&weights) + intercept;
        let mut loss = 0.0;
        let mut residual = Array1::<f64>::zeros(z.len());
        for ((r, &zi), &yi) in residual.iter_mut().zip(z.iter()).zip(self.targets) {
            let margin = if yi > 0.5 { zi } else { -zi };
            loss += log1p_exp(-margin);
            *r = sigmoid(zi) - yi;
        }
        loss = loss / n + 0.5 * self.lambda * weights.dot(&weights);
        if !loss.is_finite() {
            return Err(TrainError::NonFinite("loss"));
        }

        let mut grad = Array1::<f64>::zeros(d + 1);
        let mut grad_w = self.x.t().dot(&residual) / n;
        grad_w.scaled_add(self.lambda, &weights);
        grad.slice_mut(s![..d]).assign(&grad_w);
        grad[d] = residual.sum() / n;
        Ok((loss, grad))
    }
}

/// L-BFGS two-loop recursion; falls back to steepest descent with no history.
fn two_loop_direction(grad: &Array1<f64>, history: &VecDeque<Correction>) -> Array1<f64> {
    let mut q = grad.clone();
    let mut alphas = Vec::with_capacity(history.len());
    for pair in history.iter().rev() {
        let alpha = pair.rho * pair.step.dot(&q);
        q.scaled_add(-alpha, &pair.grad_change);
        alphas.push(alpha);
    }
    let gamma = history
        .back()
        .map(|pair| pair.step.dot(&pair.grad_change) / pair.grad_change.dot(&pair.grad_change))
        .unwrap_or(1.0);
    let mut r = q * gamma;
    for (pair, alpha) in history.iter().zip(alphas.into_iter().rev()) {
        let beta = pair.rho * pair.grad_change.dot(&r);
        r.scaled_add(alpha - beta, &pair.step);
    }
    -r
}

/// Backtracking search along `direction`; `None` when no step decreases the loss enough.
fn line_search(
    objective: &Objective<'_>,
    theta: &Array1<f64>,
    loss: f64,
    direction: &Array1<f64>,
    slope: f64,
) -> Result<Option<(Array1<f64>, f64, Array1<f64>)>, TrainError> {
    let mut t = 1.0;
    for _ in 0..MAX_LINE_SEARCH_STEPS {
        let mut candidate = theta.clone();
        candidate.scaled_add(t, direction);
        match objective.evaluate(&candidate) {
            Ok((next_loss, next_grad)) if next_loss <= loss + ARMIJO_C1 * t * slope => {
                return Ok(Some((candidate, next_loss, next_grad)));
            }
            Ok(_) | Err(TrainError::NonFinite(_)) => t *= 0.5,
            Err(err) => return Err(err),
        }
    }
    Ok(None)
}

/// `ln(1 + e^t)` without overflow.
fn log1p_exp(t: f64) -> f64 {
    if t > 0.0 {
        t + (-t).exp().ln_1p()
    } else {
        t.exp().ln_1p()
    }
}

fn max_abs(values: &Array1<f64>) -> f64 {
    values.iter().fold(0.0, |acc, v| acc.max(v.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    fn classes() -> Vec<String> {
        vec!["neg".to_string(), "pos".to_string()]
    }

    fn separable() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [-2.0, 0.5],
            [-1.5, -0.3],
            [-1.0, 0.2],
            [-0.5, -0.1],
            [0.5, 0.1],
            [1.0, -0.2],
            [1.5, 0.3],
            [2.0, -0.5]
        ];
        (x, vec![0, 0, 0, 0, 1, 1, 1, 1])
    }

    #[test]
    fn learns_separable_boundary() {
        let (x, y) = separable();
        let options = LogRegOptions {
            max_iter: 1000,
            ..LogRegOptions::default()
        };
        let model = train_logreg(x.view(), &y, &classes(), &options).unwrap();
        assert!(model.converged);
        assert!(model.weights[0] > 0.0);
        for (row, &label) in x.rows().into_iter().zip(&y) {
            assert_eq!(model.predict(row), label);
        }
    }

    #[test]
    fn fitting_is_deterministic() {
        let (x, y) = separable();
        let options = LogRegOptions::default();
        let a = train_logreg(x.view(), &y, &classes(), &options).unwrap();
        let b = train_logreg(x.view(), &y, &classes(), &options).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn stronger_regularization_shrinks_weights() {
        let (x, y) = separable();
        let loose = LogRegOptions {
            c: 10.0,
            ..LogRegOptions::default()
        };
        let tight = LogRegOptions {
            c: 0.01,
            ..LogRegOptions::default()
        };
        let loose = train_logreg(x.view(), &y, &classes(), &loose).unwrap();
        let tight = train_logreg(x.view(), &y, &classes(), &tight).unwrap();
        assert!(tight.weights[0].abs() < loose.weights[0].abs());
    }

    #[test]
    fn stops_at_max_iter_without_error() {
        let (x, y) = separable();
        let options = LogRegOptions {
            max_iter: 1,
            tol: 0.0,
            ..LogRegOptions::default()
        };
        let model = train_logreg(x.view(), &y, &classes(), &options).unwrap();
        assert!(!model.converged);
        assert_eq!(model.n_iter, 1);
    }

    #[test]
    fn rejects_degenerate_inputs() {
        let (x, _) = separable();
        let options = LogRegOptions::default();
        assert!(matches!(
            train_logreg(x.view(), &[0; 8], &classes(), &options),
            Err(TrainError::SingleClass(0))
        ));
        assert!(matches!(
            train_logreg(x.view(), &[0, 1], &classes(), &options),
            Err(TrainError::LengthMismatch { rows: 8, labels: 2 })
        ));
        assert!(matches!(
            train_logreg(x.view(), &[0, 1, 2, 0, 1, 0, 1, 0], &classes(), &options),
            Err(TrainError::LabelOutOfRange { label: 2 })
        ));
        let empty = Array2::<f64>::zeros((0, 2));
        assert!(matches!(
            train_logreg(empty.view(), &[], &classes(), &options),
            Err(TrainError::EmptyTrainingSet)
        ));
    }

    #[test]
    fn log1p_exp_handles_large_magnitudes() {
        assert!((log1p_exp(0.0) - 2f64.ln()).abs() < 1e-12);
        assert_eq!(log1p_exp(800.0), 800.0);
        assert_eq!(log1p_exp(-800.0), 0.0);
    }
}
