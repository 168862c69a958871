//! Seeded, label-stratified train/test partitioning.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Row indices of a train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SplitError {
    #[error("test fraction must be in (0, 1), got {0}")]
    InvalidFraction(f64),
    #[error("need at least 2 samples to split, got {0}")]
    TooFewSamples(usize),
    #[error("class {class} has only {count} member(s); stratified split needs at least 2")]
    ClassTooSmall { class: usize, count: usize },
    #[error("partition sizes train={train} test={test} cannot hold all {classes} classes")]
    PartitionTooSmall {
        train: usize,
        test: usize,
        classes: usize,
    },
}

/// Split `labels` into train and test rows, preserving class proportions.
///
/// The test partition holds `ceil(test_fraction * n)` rows. Each class gets the
/// floor of its proportional share; leftover slots go to the classes with the
/// largest fractional remainder (lower class index wins ties). Rows are drawn from
/// each class with a `StdRng` seeded from `seed`, and both partitions are shuffled.
pub fn stratified_split(
    labels: &[usize],
    test_fraction: f64,
    seed: u64,
) -> Result<Split, SplitError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(SplitError::InvalidFraction(test_fraction));
    }
    let n = labels.len();
    if n < 2 {
        return Err(SplitError::TooFewSamples(n));
    }

    // Grouped by label value so sparse or very large labels need no dense table.
    let mut grouped: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (row, &label) in labels.iter().enumerate() {
        grouped.entry(label).or_default().push(row);
    }
    if let Some((&class, rows)) = grouped.iter().find(|(_, rows)| rows.len() == 1) {
        return Err(SplitError::ClassTooSmall {
            class,
            count: rows.len(),
        });
    }
    let by_class: Vec<Vec<usize>> = grouped.into_values().collect();
    let present = by_class.len();

    let n_test = (test_fraction * n as f64).ceil() as usize;
    let n_train = n - n_test.min(n);
    if n_test < present || n_train < present {
        return Err(SplitError::PartitionTooSmall {
            train: n_train,
            test: n_test,
            classes: present,
        });
    }

    let counts: Vec<usize> = by_class.iter().map(Vec::len).collect();
    let quotas = allocate_test_quotas(&counts, n, n_test);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut split = Split {
        train: Vec::with_capacity(n_train),
        test: Vec::with_capacity(n_test),
    };
    for (mut rows, quota) in by_class.into_iter().zip(quotas) {
        rows.shuffle(&mut rng);
        split.test.extend_from_slice(&rows[..quota]);
        split.train.extend_from_slice(&rows[quota..]);
    }
    split.train.shuffle(&mut rng);
    split.test.shuffle(&mut rng);
    tracing::debug!(
        train = split.train.len(),
        test = split.test.len(),
        seed,
        "Stratified split"
    );
    Ok(split)
}

/// Per-class test counts summing to `n_test`, leaving at least one row per class in train.
fn allocate_test_quotas(counts: &[usize], n: usize, n_test: usize) -> Vec<usize> {
    let mut quotas: Vec<usize> = counts.iter().map(|&count| count * n_test / n).collect();
    let mut remaining = n_test - quotas.iter().sum::<usize>();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let rem_a = counts[a] * n_test % n;
        let rem_b = counts[b] * n_test % n;
        rem_b.cmp(&rem_a).then(a.cmp(&b))
    });
    while remaining > 0 {
        let mut assigned = false;
        for &class in &order {
            if remaining == 0 {
                break;
            }
            if quotas[class] + 1 < counts[class] {
                quotas[class] += 1;
                remaining -= 1;
                assigned = true;
            }
        }
        if !assigned {
            break;
        }
    }
    quotas
}
