//! k-fold cross-validation

use super::{train, TrainedParameters};
use crate::core::{OptimizerConfig, Result};
use crate::kernel::Kernel;
use crate::solver::KernelSource;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed of the fold shuffle, fixed so repeated runs split identically
pub(crate) const FOLD_SEED: u64 = 1;

/// What is being predicted for each row
#[derive(Clone, Copy)]
pub(crate) enum Targets<'a> {
    Classes(&'a [i32]),
    Values(&'a [f64]),
}

impl Targets<'_> {
    fn len(&self) -> usize {
        match self {
            Targets::Classes(labels) => labels.len(),
            Targets::Values(values) => values.len(),
        }
    }
}

/// Fold layout: fold `f` holds `perm[fold_start[f]..fold_start[f + 1]]`
pub(crate) fn assign_folds(
    classes: Option<&[i32]>,
    l: usize,
    nr_fold: usize,
    rng: &mut StdRng,
) -> (Vec<usize>, Vec<usize>) {
    match classes {
        Some(labels) if nr_fold < l => stratified_folds(labels, nr_fold, rng),
        _ => {
            let mut perm: Vec<usize> = (0..l).collect();
            shuffle(&mut perm, rng);
            let fold_start = (0..=nr_fold).map(|f| f * l / nr_fold).collect();
            (perm, fold_start)
        }
    }
}

/// Each class is shuffled and then dealt evenly across the folds
fn stratified_folds(labels: &[i32], nr_fold: usize, rng: &mut StdRng) -> (Vec<usize>, Vec<usize>) {
    let groups = train::group_classes(labels);
    let nr_class = groups.labels.len();
    let mut index = groups.perm.clone();
    for c in 0..nr_class {
        let block = &mut index[groups.start[c]..groups.start[c] + groups.count[c]];
        shuffle(block, rng);
    }

    let fold_count: Vec<usize> = (0..nr_fold)
        .map(|f| {
            groups
                .count
                .iter()
                .map(|&n| (f + 1) * n / nr_fold - f * n / nr_fold)
                .sum()
        })
        .collect();
    let mut fold_start = vec![0; nr_fold + 1];
    for f in 0..nr_fold {
        fold_start[f + 1] = fold_start[f] + fold_count[f];
    }

    let mut perm = vec![0; labels.len()];
    let mut cursor = fold_start.clone();
    for c in 0..nr_class {
        let (start, n) = (groups.start[c], groups.count[c]);
        for f in 0..nr_fold {
            for &k in &index[start + f * n / nr_fold..start + (f + 1) * n / nr_fold] {
                perm[cursor[f]] = k;
                cursor[f] += 1;
            }
        }
    }
    (perm, fold_start)
}

/// Fisher-Yates shuffle
pub(crate) fn shuffle(items: &mut [usize], rng: &mut StdRng) {
    let n = items.len();
    for i in 0..n {
        let j = rng.gen_range(i..n);
        items.swap(i, j);
    }
}

/// Out-of-fold prediction for every position of `rows`
pub(crate) fn cross_validation<K: Kernel + ?Sized>(
    source: KernelSource<'_, K>,
    rows: &[usize],
    targets: Targets<'_>,
    config: &OptimizerConfig,
    nr_fold: usize,
    seed: u64,
) -> Result<Vec<f64>> {
    let l = targets.len();
    let nr_fold = if nr_fold > l {
        warn!("# folds ({nr_fold}) > # data ({l}); leave-one-out cross validation is used instead");
        l
    } else {
        nr_fold
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let classes = match targets {
        Targets::Classes(labels) => Some(labels),
        Targets::Values(_) => None,
    };
    let (perm, fold_start) = assign_folds(classes, l, nr_fold, &mut rng);

    let mut predicted = vec![0.0; l];
    for f in 0..nr_fold {
        let (begin, end) = (fold_start[f], fold_start[f + 1]);
        let train_pos: Vec<usize> = perm[..begin].iter().chain(&perm[end..]).copied().collect();
        let train_rows: Vec<usize> = train_pos.iter().map(|&k| rows[k]).collect();
        debug!("fold {}: training on {} rows", f + 1, train_rows.len());

        let model = match targets {
            Targets::Classes(labels) => {
                let sub: Vec<i32> = train_pos.iter().map(|&k| labels[k]).collect();
                train::train_classification(source, &train_rows, &sub, config)?
            }
            Targets::Values(values) => {
                let sub: Vec<f64> = train_pos.iter().map(|&k| values[k]).collect();
                train::train_regression(source, &train_rows, &sub, config)?
            }
        };

        let use_probability = config.probability && config.svm_type.is_classification();
        for &k in &perm[begin..end] {
            let dec = held_out_decision(&model, source, rows[k]);
            predicted[k] = model.output(&dec, use_probability);
        }
    }
    Ok(predicted)
}

/// Decision values of a sub-model at a dataset row it was not trained on
pub(crate) fn held_out_decision<K: Kernel + ?Sized>(
    model: &TrainedParameters,
    source: KernelSource<'_, K>,
    row: usize,
) -> Vec<f64> {
    let kvalue: Vec<f64> = model
        .sv_indices
        .iter()
        .map(|&sv| source.eval(sv, row))
        .collect();
    model.decision_values(&kvalue)
}

/// Fraction of predicted labels equal to the truth
pub fn accuracy(truth: &[f64], predicted: &[f64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth
        .iter()
        .zip(predicted)
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / truth.len() as f64
}

/// Mean squared error and squared correlation coefficient
pub fn regression_metrics(truth: &[f64], predicted: &[f64]) -> (f64, f64) {
    let l = truth.len() as f64;
    if truth.is_empty() {
        return (0.0, 0.0);
    }
    let mut total_error = 0.0;
    let (mut sumv, mut sumy, mut sumvv, mut sumyy, mut sumvy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (&y, &v) in truth.iter().zip(predicted) {
        total_error += (v - y) * (v - y);
        sumv += v;
        sumy += y;
        sumvv += v * v;
        sumyy += y * y;
        sumvy += v * y;
    }
    let mse = total_error / l;
    let num = l * sumvy - sumv * sumy;
    let scc = (num * num) / ((l * sumvv - sumv * sumv) * (l * sumyy - sumy * sumy));
    (mse, scc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Sample, SparseVector, SvmType};
    use crate::kernel::LinearKernel;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_stratified_folds_balance_classes() {
        let labels = [0, 0, 0, 0, 1, 1, 1, 1];
        let mut rng = StdRng::seed_from_u64(7);
        let (perm, fold_start) = assign_folds(Some(&labels), 8, 4, &mut rng);

        assert_eq!(fold_start, vec![0, 2, 4, 6, 8]);
        for f in 0..4 {
            let fold = &perm[fold_start[f]..fold_start[f + 1]];
            let zeros = fold.iter().filter(|&&k| labels[k] == 0).count();
            assert_eq!(zeros, 1);
        }
        let mut sorted = perm.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_plain_folds_cover_everything() {
        let mut rng = StdRng::seed_from_u64(7);
        let (perm, fold_start) = assign_folds(None, 7, 3, &mut rng);
        assert_eq!(fold_start, vec![0, 2, 4, 7]);
        let mut sorted = perm;
        sorted.sort_unstable();
        assert_eq!(sorted, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_cross_validation_is_deterministic() {
        let samples: Vec<Sample> = (0..12)
            .map(|i| {
                // -6..=-1 and 1..=6, so every split keeps a margin around 0
                let x = if i < 6 { i as f64 - 6.0 } else { i as f64 - 5.0 };
                Sample::new(SparseVector::from_dense(&[x]), if x > 0.0 { 1.0 } else { -1.0 })
            })
            .collect();
        let labels: Vec<i32> = samples.iter().map(|s| s.label as i32).collect();
        let kernel = LinearKernel::new();
        let source = KernelSource::new(&samples, &kernel, None);
        let rows: Vec<usize> = (0..12).collect();
        let config = OptimizerConfig::for_type(SvmType::CSvc);

        let first =
            cross_validation(source, &rows, Targets::Classes(&labels), &config, 3, FOLD_SEED).unwrap();
        let second =
            cross_validation(source, &rows, Targets::Classes(&labels), &config, 3, FOLD_SEED).unwrap();
        assert_eq!(first, second);

        let truth: Vec<f64> = samples.iter().map(|s| s.label).collect();
        assert_eq!(accuracy(&truth, &first), 1.0);
    }

    #[test]
    fn test_regression_metrics() {
        let (mse, scc) = regression_metrics(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_abs_diff_eq!(mse, 0.0);
        assert_abs_diff_eq!(scc, 1.0);

        let (mse, _) = regression_metrics(&[0.0, 0.0], &[1.0, -1.0]);
        assert_abs_diff_eq!(mse, 1.0);
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[1.0, 2.0, 2.0, 1.0], &[1.0, 2.0, 1.0, 1.0]), 0.75);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }
}
