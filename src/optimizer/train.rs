//! Formulation set-up around the SMO solver
//!
//! Each formulation maps to one solver call with its own linear term,
//! starting point and box bounds. Classification with `k` classes solves
//! the `k (k - 1) / 2` one-against-one sub-problems and merges their
//! support vectors into one shared list.
//!
//! Training here never fails on an empty solution; cross-validation and
//! probability fitting train on subsets where that is legitimate.

use super::TrainedParameters;
use crate::core::{OptimizerConfig, Result, SvmType};
use crate::kernel::Kernel;
use crate::probability;
use crate::solver::{KernelSource, SolutionInfo, Solver, SolverParams, SolverVariant, SvcQ, SvrQ};
use log::{debug, info, warn};

/// Solution of one binary or regression problem, in problem order
pub(crate) struct DecisionFunction {
    pub alpha: Vec<f64>,
    pub rho: f64,
}

fn solver_params(config: &OptimizerConfig, variant: SolverVariant, l: usize) -> SolverParams {
    SolverParams {
        variant,
        tolerance: config.tolerance,
        shrinking: config.shrinking,
        max_iterations: config.iteration_limit(l),
    }
}

fn signs(targets: &[f64]) -> Vec<i8> {
    targets.iter().map(|&t| if t > 0.0 { 1 } else { -1 }).collect()
}

fn solve_c_svc<K: Kernel + ?Sized>(
    source: KernelSource<'_, K>,
    rows: &[usize],
    y: &[i8],
    config: &OptimizerConfig,
    cp: f64,
    cn: f64,
) -> (Vec<f64>, SolutionInfo) {
    let l = rows.len();
    let mut alpha = vec![0.0; l];
    let p = vec![-1.0; l];
    let mut q = SvcQ::new(source, rows, y, config.cache_size);
    let info = Solver::solve(
        &mut q,
        &p,
        y,
        &mut alpha,
        cp,
        cn,
        &solver_params(config, SolverVariant::Standard, l),
    );

    if cp == cn {
        debug!("nu = {}", alpha.iter().sum::<f64>() / (cp * l as f64));
    }
    for (a, &yi) in alpha.iter_mut().zip(y) {
        *a *= f64::from(yi);
    }
    (alpha, info)
}

fn solve_nu_svc<K: Kernel + ?Sized>(
    source: KernelSource<'_, K>,
    rows: &[usize],
    y: &[i8],
    config: &OptimizerConfig,
) -> (Vec<f64>, SolutionInfo) {
    let l = rows.len();
    let mut sum_pos = config.nu * l as f64 / 2.0;
    let mut sum_neg = sum_pos;
    let mut alpha: Vec<f64> = y
        .iter()
        .map(|&yi| {
            let remaining = if yi == 1 { &mut sum_pos } else { &mut sum_neg };
            let a = remaining.min(1.0);
            *remaining -= a;
            a
        })
        .collect();

    let p = vec![0.0; l];
    let mut q = SvcQ::new(source, rows, y, config.cache_size);
    let mut info = Solver::solve(
        &mut q,
        &p,
        y,
        &mut alpha,
        1.0,
        1.0,
        &solver_params(config, SolverVariant::Nu, l),
    );

    // rescale so the decision function matches C-SVC with C = 1 / r
    let r = info.r;
    debug!("C = {}", 1.0 / r);
    for (a, &yi) in alpha.iter_mut().zip(y) {
        *a *= f64::from(yi) / r;
    }
    info.rho /= r;
    info.obj /= r * r;
    info.upper_bound_p = 1.0 / r;
    info.upper_bound_n = 1.0 / r;
    (alpha, info)
}

fn solve_epsilon_svr<K: Kernel + ?Sized>(
    source: KernelSource<'_, K>,
    rows: &[usize],
    targets: &[f64],
    config: &OptimizerConfig,
) -> (Vec<f64>, SolutionInfo) {
    let l = rows.len();
    let mut alpha2 = vec![0.0; 2 * l];
    let p: Vec<f64> = targets
        .iter()
        .map(|&t| config.epsilon - t)
        .chain(targets.iter().map(|&t| config.epsilon + t))
        .collect();
    let y: Vec<i8> = (0..2 * l).map(|k| if k < l { 1 } else { -1 }).collect();

    let mut q = SvrQ::new(source, rows, config.cache_size);
    let info = Solver::solve(
        &mut q,
        &p,
        &y,
        &mut alpha2,
        config.cost,
        config.cost,
        &solver_params(config, SolverVariant::Standard, 2 * l),
    );

    let alpha: Vec<f64> = (0..l).map(|i| alpha2[i] - alpha2[i + l]).collect();
    debug!(
        "nu = {}",
        alpha.iter().map(|a| a.abs()).sum::<f64>() / (config.cost * l as f64)
    );
    (alpha, info)
}

fn solve_nu_svr<K: Kernel + ?Sized>(
    source: KernelSource<'_, K>,
    rows: &[usize],
    targets: &[f64],
    config: &OptimizerConfig,
) -> (Vec<f64>, SolutionInfo) {
    let l = rows.len();
    let c = config.cost;
    let mut sum = c * config.nu * l as f64 / 2.0;
    let mut alpha2 = vec![0.0; 2 * l];
    for i in 0..l {
        let a = sum.min(c);
        alpha2[i] = a;
        alpha2[i + l] = a;
        sum -= a;
    }
    let p: Vec<f64> = targets
        .iter()
        .map(|&t| -t)
        .chain(targets.iter().copied())
        .collect();
    let y: Vec<i8> = (0..2 * l).map(|k| if k < l { 1 } else { -1 }).collect();

    let mut q = SvrQ::new(source, rows, config.cache_size);
    let info = Solver::solve(
        &mut q,
        &p,
        &y,
        &mut alpha2,
        c,
        c,
        &solver_params(config, SolverVariant::Nu, 2 * l),
    );
    debug!("epsilon = {}", -info.r);

    let alpha = (0..l).map(|i| alpha2[i] - alpha2[i + l]).collect();
    (alpha, info)
}

/// Solve one problem. For classification `targets` holds ±1.
pub(crate) fn train_one<K: Kernel + ?Sized>(
    source: KernelSource<'_, K>,
    rows: &[usize],
    targets: &[f64],
    config: &OptimizerConfig,
    cp: f64,
    cn: f64,
) -> DecisionFunction {
    let (alpha, info) = match config.svm_type {
        SvmType::CSvc => solve_c_svc(source, rows, &signs(targets), config, cp, cn),
        SvmType::NuSvc => solve_nu_svc(source, rows, &signs(targets), config),
        SvmType::EpsilonSvr => solve_epsilon_svr(source, rows, targets, config),
        SvmType::NuSvr => solve_nu_svr(source, rows, targets, config),
    };

    let mut n_sv = 0;
    let mut n_bsv = 0;
    for (a, &t) in alpha.iter().zip(targets) {
        if a.abs() > 0.0 {
            n_sv += 1;
            let bound = if t > 0.0 {
                info.upper_bound_p
            } else {
                info.upper_bound_n
            };
            if a.abs() >= bound {
                n_bsv += 1;
            }
        }
    }
    debug!(
        "obj = {:.6}, rho = {:.6}, nSV = {n_sv}, nBSV = {n_bsv}",
        info.obj, info.rho
    );

    DecisionFunction {
        alpha,
        rho: info.rho,
    }
}

/// Training rows grouped by class
pub(crate) struct ClassGroups {
    /// Distinct labels in first-seen order
    pub labels: Vec<i32>,
    pub start: Vec<usize>,
    pub count: Vec<usize>,
    /// `perm[k]` is the input position placed at grouped position `k`
    pub perm: Vec<usize>,
}

/// Group positions by label, keeping first-seen label order.
///
/// A binary problem labelled exactly `-1` then `+1` is flipped so `+1`
/// comes first and positive decision values mean `+1`.
pub(crate) fn group_classes(labels: &[i32]) -> ClassGroups {
    let mut unique: Vec<i32> = Vec::new();
    let mut count: Vec<usize> = Vec::new();
    let mut class_of: Vec<usize> = Vec::with_capacity(labels.len());

    for &label in labels {
        match unique.iter().position(|&u| u == label) {
            Some(c) => {
                count[c] += 1;
                class_of.push(c);
            }
            None => {
                unique.push(label);
                count.push(1);
                class_of.push(unique.len() - 1);
            }
        }
    }

    if unique == [-1, 1] {
        unique.swap(0, 1);
        count.swap(0, 1);
        for c in &mut class_of {
            *c = 1 - *c;
        }
    }

    let mut start = vec![0; unique.len()];
    for c in 1..unique.len() {
        start[c] = start[c - 1] + count[c - 1];
    }

    let mut next = start.clone();
    let mut perm = vec![0; labels.len()];
    for (i, &c) in class_of.iter().enumerate() {
        perm[next[c]] = i;
        next[c] += 1;
    }

    ClassGroups {
        labels: unique,
        start,
        count,
        perm,
    }
}

/// One-against-one training over `rows`, where `labels[k]` belongs to `rows[k]`
pub(crate) fn train_classification<K: Kernel + ?Sized>(
    source: KernelSource<'_, K>,
    rows: &[usize],
    labels: &[i32],
    config: &OptimizerConfig,
) -> Result<TrainedParameters> {
    let l = rows.len();
    let groups = group_classes(labels);
    let nr_class = groups.labels.len();
    if nr_class == 1 {
        info!("training data in only one class");
    }

    let grouped: Vec<usize> = groups.perm.iter().map(|&k| rows[k]).collect();

    let mut weighted_c = vec![config.cost; nr_class];
    for &(label, weight) in &config.weights {
        match groups.labels.iter().position(|&u| u == label) {
            Some(c) => weighted_c[c] *= weight,
            None => warn!("class label {label} specified in weight is not found"),
        }
    }

    let mut nonzero = vec![false; l];
    let mut functions = Vec::with_capacity(nr_class * nr_class.saturating_sub(1) / 2);
    let mut prob_a = Vec::new();
    let mut prob_b = Vec::new();

    for i in 0..nr_class {
        for j in i + 1..nr_class {
            let (si, ci) = (groups.start[i], groups.count[i]);
            let (sj, cj) = (groups.start[j], groups.count[j]);
            let sub_rows: Vec<usize> = grouped[si..si + ci]
                .iter()
                .chain(&grouped[sj..sj + cj])
                .copied()
                .collect();
            let sub_y: Vec<f64> = std::iter::repeat(1.0)
                .take(ci)
                .chain(std::iter::repeat(-1.0).take(cj))
                .collect();

            if config.probability {
                let (a, b) = probability::binary_svc_probability(
                    source,
                    &sub_rows,
                    &sub_y,
                    config,
                    weighted_c[i],
                    weighted_c[j],
                )?;
                prob_a.push(a);
                prob_b.push(b);
            }

            let f = train_one(source, &sub_rows, &sub_y, config, weighted_c[i], weighted_c[j]);
            for k in 0..ci {
                if f.alpha[k].abs() > 0.0 {
                    nonzero[si + k] = true;
                }
            }
            for k in 0..cj {
                if f.alpha[ci + k].abs() > 0.0 {
                    nonzero[sj + k] = true;
                }
            }
            functions.push(f);
        }
    }

    let n_sv: Vec<usize> = (0..nr_class)
        .map(|c| {
            (groups.start[c]..groups.start[c] + groups.count[c])
                .filter(|&k| nonzero[k])
                .count()
        })
        .collect();
    let total_sv: usize = n_sv.iter().sum();
    info!("Total nSV = {total_sv}");

    let sv_indices: Vec<usize> = (0..l).filter(|&k| nonzero[k]).map(|k| grouped[k]).collect();
    let samples = source.samples();
    let support_vectors = sv_indices
        .iter()
        .map(|&r| samples[r].features.clone())
        .collect();

    let mut nz_start = vec![0; nr_class];
    for c in 1..nr_class {
        nz_start[c] = nz_start[c - 1] + n_sv[c - 1];
    }

    let mut sv_coef = vec![vec![0.0; total_sv]; nr_class.saturating_sub(1)];
    let mut p = 0;
    for i in 0..nr_class {
        for j in i + 1..nr_class {
            let (si, ci) = (groups.start[i], groups.count[i]);
            let (sj, cj) = (groups.start[j], groups.count[j]);
            let alpha = &functions[p].alpha;

            let mut q = nz_start[i];
            for k in 0..ci {
                if nonzero[si + k] {
                    sv_coef[j - 1][q] = alpha[k];
                    q += 1;
                }
            }
            q = nz_start[j];
            for k in 0..cj {
                if nonzero[sj + k] {
                    sv_coef[i][q] = alpha[ci + k];
                    q += 1;
                }
            }
            p += 1;
        }
    }

    Ok(TrainedParameters {
        svm_type: config.svm_type,
        labels: groups.labels,
        n_sv,
        support_vectors,
        sv_indices,
        sv_coef,
        rho: functions.iter().map(|f| f.rho).collect(),
        prob_a,
        prob_b,
        sigma: None,
        precomputed: source.is_precomputed(),
    })
}

/// ε-SVR or ν-SVR over `rows`, where `targets[k]` belongs to `rows[k]`
pub(crate) fn train_regression<K: Kernel + ?Sized>(
    source: KernelSource<'_, K>,
    rows: &[usize],
    targets: &[f64],
    config: &OptimizerConfig,
) -> Result<TrainedParameters> {
    let sigma = if config.probability {
        let sigma = probability::svr_sigma(source, rows, targets, config)?;
        info!(
            "Prob. model for test data: target value = predicted value + z, \
             z: Laplace distribution e^(-|z|/sigma)/(2sigma), sigma = {sigma}"
        );
        Some(sigma)
    } else {
        None
    };

    let f = train_one(source, rows, targets, config, config.cost, config.cost);

    let positions: Vec<usize> = (0..rows.len()).filter(|&k| f.alpha[k].abs() > 0.0).collect();
    let samples = source.samples();
    let sv_indices: Vec<usize> = positions.iter().map(|&k| rows[k]).collect();
    info!("Total nSV = {}", sv_indices.len());

    Ok(TrainedParameters {
        svm_type: config.svm_type,
        labels: Vec::new(),
        n_sv: Vec::new(),
        support_vectors: sv_indices
            .iter()
            .map(|&r| samples[r].features.clone())
            .collect(),
        sv_indices,
        sv_coef: vec![positions.iter().map(|&k| f.alpha[k]).collect()],
        rho: vec![f.rho],
        prob_a: Vec::new(),
        prob_b: Vec::new(),
        sigma,
        precomputed: source.is_precomputed(),
    })
}
