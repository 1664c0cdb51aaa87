//! Training front end
//!
//! [`SVMOptimizer`] pairs a kernel with an [`OptimizerConfig`] and turns a
//! dataset into [`TrainedParameters`]: the support vectors, their dual
//! coefficients and the offsets of every decision function.

pub(crate) mod train;
pub(crate) mod validation;

use crate::core::{Dataset, OptimizerConfig, Result, SVMError, Sample, SparseVector, SvmType};
use crate::kernel::Kernel;
use crate::probability;
use crate::solver::KernelSource;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use validation::{accuracy, regression_metrics};

/// High-level SVM optimizer that integrates kernel functions and solving algorithms
pub struct SVMOptimizer<K: Kernel + ?Sized> {
    kernel: Arc<K>,
    config: OptimizerConfig,
}

impl<K: Kernel + ?Sized> SVMOptimizer<K> {
    /// Create a new SVM optimizer with the given kernel and configuration
    pub fn new(kernel: Arc<K>, config: OptimizerConfig) -> Self {
        Self { kernel, config }
    }

    /// Train on every sample of `dataset`.
    ///
    /// Uses the dataset's Gram matrix when it carries one. Fails with
    /// [`SVMError::NoSupportVectors`] when the solution is empty, which is
    /// what a single-class training set produces.
    pub fn train<D: Dataset + ?Sized>(&self, dataset: &D) -> Result<TrainedParameters> {
        let samples = self.prepare(dataset)?;
        let source = KernelSource::new(&samples, self.kernel.as_ref(), dataset.kernel_matrix());
        let rows: Vec<usize> = (0..samples.len()).collect();

        let params = if self.config.svm_type.is_classification() {
            let labels = class_labels(&samples)?;
            if self.config.svm_type == SvmType::NuSvc {
                check_nu_feasible(&labels, self.config.nu)?;
            }
            train::train_classification(source, &rows, &labels, &self.config)?
        } else {
            let targets: Vec<f64> = samples.iter().map(|s| s.label).collect();
            train::train_regression(source, &rows, &targets, &self.config)?
        };

        if params.support_vectors.is_empty() {
            return Err(SVMError::NoSupportVectors);
        }
        Ok(params)
    }

    /// Predicted label or target of every sample, each made by a model
    /// that never saw it during training.
    pub fn cross_validate<D: Dataset + ?Sized>(&self, dataset: &D, nr_fold: usize) -> Result<Vec<f64>> {
        if nr_fold < 2 {
            return Err(SVMError::InvalidParameter(format!(
                "number of folds must be at least 2, got {nr_fold}"
            )));
        }
        let samples = self.prepare(dataset)?;
        let source = KernelSource::new(&samples, self.kernel.as_ref(), dataset.kernel_matrix());
        let rows: Vec<usize> = (0..samples.len()).collect();

        if self.config.svm_type.is_classification() {
            let labels = class_labels(&samples)?;
            if self.config.svm_type == SvmType::NuSvc {
                check_nu_feasible(&labels, self.config.nu)?;
            }
            validation::cross_validation(
                source,
                &rows,
                validation::Targets::Classes(&labels),
                &self.config,
                nr_fold,
                validation::FOLD_SEED,
            )
        } else {
            let targets: Vec<f64> = samples.iter().map(|s| s.label).collect();
            validation::cross_validation(
                source,
                &rows,
                validation::Targets::Values(&targets),
                &self.config,
                nr_fold,
                validation::FOLD_SEED,
            )
        }
    }

    fn prepare<D: Dataset + ?Sized>(&self, dataset: &D) -> Result<Vec<Sample>> {
        self.config.validate()?;
        if dataset.is_empty() {
            return Err(SVMError::EmptyDataset);
        }
        if let Some(gram) = dataset.kernel_matrix() {
            if gram.len() != dataset.len() {
                return Err(SVMError::DimensionMismatch {
                    expected: dataset.len(),
                    actual: gram.len(),
                });
            }
        }
        let indices: Vec<usize> = (0..dataset.len()).collect();
        Ok(dataset.get_batch(&indices))
    }

    /// Get the optimizer configuration
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Get the kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }
}

fn class_labels(samples: &[Sample]) -> Result<Vec<i32>> {
    samples
        .iter()
        .map(|s| {
            if s.label.fract() == 0.0 && s.label.is_finite() {
                Ok(s.label as i32)
            } else {
                Err(SVMError::InvalidDataset(format!(
                    "classification label {} is not an integer",
                    s.label
                )))
            }
        })
        .collect()
}

/// ν-SVC needs `ν (n_i + n_j) / 2 <= min(n_i, n_j)` for every class pair
fn check_nu_feasible(labels: &[i32], nu: f64) -> Result<()> {
    let groups = train::group_classes(labels);
    let count = &groups.count;
    for i in 0..count.len() {
        for j in i + 1..count.len() {
            let (n1, n2) = (count[i] as f64, count[j] as f64);
            if nu * (n1 + n2) / 2.0 > n1.min(n2) {
                return Err(SVMError::InvalidParameter(format!(
                    "nu = {nu} is infeasible for classes {} and {}",
                    groups.labels[i], groups.labels[j]
                )));
            }
        }
    }
    Ok(())
}

/// Everything a trained model needs to evaluate its decision functions.
///
/// For `k` classes there are `k (k - 1) / 2` one-against-one functions in
/// pair order `(0,1), (0,2), ..., (k-2,k-1)`. Support vectors are stored
/// grouped by class; `sv_coef` has `k - 1` rows, and the function for pair
/// `(i, j)` reads row `j - 1` over class `i`'s block and row `i` over class
/// `j`'s block. Regression has one function and one row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedParameters {
    pub svm_type: SvmType,
    /// Class labels in training order; empty for regression
    pub labels: Vec<i32>,
    /// Support vectors per class; empty for regression
    pub n_sv: Vec<usize>,
    pub support_vectors: Vec<SparseVector>,
    /// Dataset row of each support vector
    pub sv_indices: Vec<usize>,
    pub sv_coef: Vec<Vec<f64>>,
    pub rho: Vec<f64>,
    /// Platt sigmoid parameters per class pair
    pub prob_a: Vec<f64>,
    pub prob_b: Vec<f64>,
    /// Laplace scale of regression residuals
    pub sigma: Option<f64>,
    /// Trained from a precomputed Gram matrix
    pub precomputed: bool,
}

impl TrainedParameters {
    /// Number of classes; regression counts as two
    pub fn nr_class(&self) -> usize {
        if self.svm_type.is_classification() {
            self.labels.len()
        } else {
            2
        }
    }

    pub fn total_sv(&self) -> usize {
        self.support_vectors.len()
    }

    pub fn has_probability(&self) -> bool {
        if self.svm_type.is_classification() {
            self.nr_class() >= 2 && self.prob_a.len() == self.rho.len()
        } else {
            self.sigma.is_some()
        }
    }

    /// Ordered class pairs, one per decision function
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        let k = self.labels.len();
        (0..k)
            .flat_map(|i| (i + 1..k).map(move |j| (i, j)))
            .collect()
    }

    /// First support vector of every class block
    pub(crate) fn class_starts(&self) -> Vec<usize> {
        self.n_sv
            .iter()
            .scan(0, |acc, &n| {
                let start = *acc;
                *acc += n;
                Some(start)
            })
            .collect()
    }

    /// Decision values from `kvalue[s] = K(x, sv_s)`
    pub fn decision_values(&self, kvalue: &[f64]) -> Vec<f64> {
        if !self.svm_type.is_classification() {
            let sum: f64 = self.sv_coef[0]
                .iter()
                .zip(kvalue)
                .map(|(c, k)| c * k)
                .sum();
            return vec![sum - self.rho[0]];
        }

        let start = self.class_starts();
        self.pairs()
            .into_iter()
            .zip(&self.rho)
            .map(|((i, j), rho)| {
                let block = |class: usize, row: &[f64]| -> f64 {
                    (start[class]..start[class] + self.n_sv[class])
                        .map(|s| row[s] * kvalue[s])
                        .sum()
                };
                block(i, &self.sv_coef[j - 1]) + block(j, &self.sv_coef[i]) - rho
            })
            .collect()
    }

    /// One-against-one vote; ties go to the class listed first
    pub fn vote(&self, dec_values: &[f64]) -> i32 {
        let mut votes = vec![0usize; self.labels.len()];
        for ((i, j), &d) in self.pairs().into_iter().zip(dec_values) {
            if d > 0.0 {
                votes[i] += 1;
            } else {
                votes[j] += 1;
            }
        }
        let mut best = 0;
        for (c, &v) in votes.iter().enumerate() {
            if v > votes[best] {
                best = c;
            }
        }
        self.labels.get(best).copied().unwrap_or_default()
    }

    /// Class probabilities in label order from decision values
    pub fn probabilities(&self, dec_values: &[f64]) -> Result<Vec<f64>> {
        if !self.svm_type.is_classification() || !self.has_probability() {
            return Err(SVMError::InvalidParameter(
                "model was not trained with probability estimates".to_string(),
            ));
        }
        Ok(probability::class_probabilities(
            self.labels.len(),
            dec_values,
            &self.prob_a,
            &self.prob_b,
        ))
    }

    /// Predicted label (as `f64`) or target for decision values
    pub(crate) fn output(&self, dec_values: &[f64], use_probability: bool) -> f64 {
        if !self.svm_type.is_classification() {
            return dec_values[0];
        }
        if use_probability {
            if let Ok(p) = self.probabilities(dec_values) {
                let best = argmax(&p);
                return f64::from(self.labels[best]);
            }
        }
        f64::from(self.vote(dec_values))
    }
}

/// Index of the largest entry; the first one on ties
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}
