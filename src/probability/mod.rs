//! Probability estimates
//!
//! Classification uses Platt scaling per class pair, fitted on decision
//! values from an internal 5-fold cross-validation, and then couples the
//! pairwise estimates into one distribution (Wu, Lin and Weng, 2004).
//! Regression models the residual as Laplace noise and reports its scale.

use crate::core::{OptimizerConfig, Result};
use crate::kernel::Kernel;
use crate::optimizer::train;
use crate::optimizer::validation::{self, Targets, FOLD_SEED};
use crate::solver::KernelSource;
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Folds used to collect out-of-sample decision values
const PROBABILITY_FOLDS: usize = 5;

/// Pairwise estimates are clipped into `[MIN_PROB, 1 - MIN_PROB]`
const MIN_PROB: f64 = 1e-7;

/// Fit `P(y = 1 | f) = 1 / (1 + exp(A f + B))` by Newton's method with
/// backtracking (Lin, Lin and Weng, 2007). `labels` holds ±1.
pub fn sigmoid_train(dec_values: &[f64], labels: &[f64]) -> (f64, f64) {
    let prior1 = labels.iter().filter(|&&y| y > 0.0).count() as f64;
    let prior0 = labels.len() as f64 - prior1;

    const MAX_ITER: usize = 100;
    const MIN_STEP: f64 = 1e-10;
    const SIGMA: f64 = 1e-12;
    const EPS: f64 = 1e-5;

    let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
    let lo_target = 1.0 / (prior0 + 2.0);
    let t: Vec<f64> = labels
        .iter()
        .map(|&y| if y > 0.0 { hi_target } else { lo_target })
        .collect();

    let objective = |a: f64, b: f64| -> f64 {
        dec_values
            .iter()
            .zip(&t)
            .map(|(&f, &ti)| {
                let f_apb = f * a + b;
                if f_apb >= 0.0 {
                    ti * f_apb + (-f_apb).exp().ln_1p()
                } else {
                    (ti - 1.0) * f_apb + f_apb.exp().ln_1p()
                }
            })
            .sum()
    };

    let mut a = 0.0;
    let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
    let mut fval = objective(a, b);

    let mut iter = 0;
    while iter < MAX_ITER {
        // gradient and Hessian, the latter shifted by SIGMA for stability
        let (mut h11, mut h22, mut h21) = (SIGMA, SIGMA, 0.0);
        let (mut g1, mut g2) = (0.0, 0.0);
        for (&f, &ti) in dec_values.iter().zip(&t) {
            let f_apb = f * a + b;
            let (p, q) = if f_apb >= 0.0 {
                let e = (-f_apb).exp();
                (e / (1.0 + e), 1.0 / (1.0 + e))
            } else {
                let e = f_apb.exp();
                (1.0 / (1.0 + e), e / (1.0 + e))
            };
            let d2 = p * q;
            h11 += f * f * d2;
            h22 += d2;
            h21 += f * d2;
            let d1 = ti - p;
            g1 += f * d1;
            g2 += d1;
        }

        if g1.abs() < EPS && g2.abs() < EPS {
            break;
        }

        let det = h11 * h22 - h21 * h21;
        let da = -(h22 * g1 - h21 * g2) / det;
        let db = -(-h21 * g1 + h11 * g2) / det;
        let gd = g1 * da + g2 * db;

        let mut step = 1.0;
        while step >= MIN_STEP {
            let (new_a, new_b) = (a + step * da, b + step * db);
            let new_f = objective(new_a, new_b);
            if new_f < fval + 0.0001 * step * gd {
                a = new_a;
                b = new_b;
                fval = new_f;
                break;
            }
            step /= 2.0;
        }

        if step < MIN_STEP {
            debug!("line search fails in two-class probability estimates");
            break;
        }
        iter += 1;
    }

    if iter >= MAX_ITER {
        debug!("reaching maximal iterations in two-class probability estimates");
    }
    (a, b)
}

/// Evaluate the fitted sigmoid without overflow
pub fn sigmoid_predict(decision_value: f64, a: f64, b: f64) -> f64 {
    let f_apb = decision_value * a + b;
    if f_apb >= 0.0 {
        let e = (-f_apb).exp();
        e / (1.0 + e)
    } else {
        1.0 / (1.0 + f_apb.exp())
    }
}

/// Couple pairwise estimates `r[i][j] ≈ P(i | i or j)` into class
/// probabilities by the second method of Wu, Lin and Weng.
pub fn multiclass_probability(k: usize, r: &[Vec<f64>]) -> Vec<f64> {
    if k == 1 {
        return vec![1.0];
    }
    let max_iter = k.max(100);
    let eps = 0.005 / k as f64;

    let mut q = vec![vec![0.0; k]; k];
    for t in 0..k {
        for j in 0..t {
            q[t][t] += r[j][t] * r[j][t];
            q[t][j] = q[j][t];
        }
        for j in t + 1..k {
            q[t][t] += r[j][t] * r[j][t];
            q[t][j] = -r[j][t] * r[t][j];
        }
    }

    let mut p = vec![1.0 / k as f64; k];
    let mut qp = vec![0.0; k];
    let mut iter = 0;
    while iter < max_iter {
        let mut p_qp = 0.0;
        for t in 0..k {
            qp[t] = (0..k).map(|j| q[t][j] * p[j]).sum();
            p_qp += p[t] * qp[t];
        }

        let max_error = qp
            .iter()
            .map(|&v| (v - p_qp).abs())
            .fold(0.0, f64::max);
        if max_error < eps {
            break;
        }

        for t in 0..k {
            let diff = (-qp[t] + p_qp) / q[t][t];
            p[t] += diff;
            p_qp = (p_qp + diff * (diff * q[t][t] + 2.0 * qp[t])) / (1.0 + diff) / (1.0 + diff);
            for j in 0..k {
                qp[j] = (qp[j] + diff * q[t][j]) / (1.0 + diff);
                p[j] /= 1.0 + diff;
            }
        }
        iter += 1;
    }
    if iter >= max_iter {
        debug!("exceeds max_iter in multiclass_probability");
    }
    p
}

/// Class probabilities in label order for the pairwise decision values of
/// a `k`-class model
pub fn class_probabilities(k: usize, dec_values: &[f64], prob_a: &[f64], prob_b: &[f64]) -> Vec<f64> {
    let mut pairwise = vec![vec![0.0; k]; k];
    let mut p = 0;
    for i in 0..k {
        for j in i + 1..k {
            let estimate = sigmoid_predict(dec_values[p], prob_a[p], prob_b[p]).clamp(MIN_PROB, 1.0 - MIN_PROB);
            pairwise[i][j] = estimate;
            pairwise[j][i] = 1.0 - estimate;
            p += 1;
        }
    }
    if k == 2 {
        vec![pairwise[0][1], pairwise[1][0]]
    } else {
        multiclass_probability(k, &pairwise)
    }
}

/// Platt parameters `(A, B)` for one binary sub-problem.
///
/// `y` holds ±1 for `rows`. Decision values come from models trained with
/// `C = 1` and class weights `cp` / `cn` on the other folds.
pub(crate) fn binary_svc_probability<K: Kernel + ?Sized>(
    source: KernelSource<'_, K>,
    rows: &[usize],
    y: &[f64],
    config: &OptimizerConfig,
    cp: f64,
    cn: f64,
) -> Result<(f64, f64)> {
    let l = rows.len();
    let mut rng = StdRng::seed_from_u64(FOLD_SEED);
    let mut perm: Vec<usize> = (0..l).collect();
    validation::shuffle(&mut perm, &mut rng);

    let sub_config = OptimizerConfig {
        cost: 1.0,
        weights: vec![(1, cp), (-1, cn)],
        probability: false,
        ..config.clone()
    };

    let mut dec_values = vec![0.0; l];
    for f in 0..PROBABILITY_FOLDS {
        let begin = f * l / PROBABILITY_FOLDS;
        let end = (f + 1) * l / PROBABILITY_FOLDS;
        let train_pos: Vec<usize> = perm[..begin].iter().chain(&perm[end..]).copied().collect();
        let positives = train_pos.iter().filter(|&&k| y[k] > 0.0).count();
        let negatives = train_pos.len() - positives;

        let held_out = &perm[begin..end];
        if positives == 0 || negatives == 0 {
            let fill = match (positives, negatives) {
                (0, 0) => 0.0,
                (_, 0) => 1.0,
                _ => -1.0,
            };
            for &k in held_out {
                dec_values[k] = fill;
            }
            continue;
        }

        let train_rows: Vec<usize> = train_pos.iter().map(|&k| rows[k]).collect();
        let train_labels: Vec<i32> = train_pos
            .iter()
            .map(|&k| if y[k] > 0.0 { 1 } else { -1 })
            .collect();
        let model = train::train_classification(source, &train_rows, &train_labels, &sub_config)?;
        let sign = f64::from(model.labels[0]);
        for &k in held_out {
            dec_values[k] = validation::held_out_decision(&model, source, rows[k])[0] * sign;
        }
    }

    Ok(sigmoid_train(&dec_values, y))
}

/// Laplace scale of out-of-sample regression residuals.
///
/// Residuals beyond five standard deviations of the first estimate are
/// treated as outliers and left out of the final mean.
pub(crate) fn svr_sigma<K: Kernel + ?Sized>(
    source: KernelSource<'_, K>,
    rows: &[usize],
    targets: &[f64],
    config: &OptimizerConfig,
) -> Result<f64> {
    let sub_config = OptimizerConfig {
        probability: false,
        ..config.clone()
    };
    let predicted = validation::cross_validation(
        source,
        rows,
        Targets::Values(targets),
        &sub_config,
        PROBABILITY_FOLDS,
        FOLD_SEED,
    )?;

    let residuals: Vec<f64> = targets
        .iter()
        .zip(&predicted)
        .map(|(t, p)| (t - p).abs())
        .collect();
    let mae = residuals.iter().sum::<f64>() / residuals.len() as f64;
    let std = (2.0 * mae * mae).sqrt();

    let kept: Vec<f64> = residuals.into_iter().filter(|&r| r <= 5.0 * std).collect();
    let mae = kept.iter().sum::<f64>() / kept.len() as f64;
    Ok(mae)
}
