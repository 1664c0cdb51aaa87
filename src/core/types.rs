//! Core type definitions for SVM

use crate::core::{Result, SVMError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decision values of one test vector, keyed by ordered label pair.
///
/// Both orientations are present: `(a, b)` maps to `f` and `(b, a)` to `-f`.
pub type DecisionValues = BTreeMap<(i32, i32), f64>;

/// Sparse vector representation with sorted indices
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    /// Sorted indices of non-zero elements
    pub indices: Vec<usize>,
    /// Values corresponding to indices
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Create a new sparse vector, ensuring indices are sorted
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        assert_eq!(
            indices.len(),
            values.len(),
            "Indices and values must have same length"
        );

        let mut pairs: Vec<_> = indices.into_iter().zip(values).collect();
        pairs.sort_by_key(|&(idx, _)| idx);

        let (indices, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self { indices, values }
    }

    /// Build from a dense row, dropping exact zeros
    pub fn from_dense(row: &[f64]) -> Self {
        let (indices, values) = row
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v != 0.0)
            .map(|(i, &v)| (i, v))
            .unzip();
        Self { indices, values }
    }

    /// Create an empty sparse vector
    pub fn empty() -> Self {
        Self {
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Get the value at a specific index (0 if not present)
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Dot product with another sparse vector.
    ///
    /// Both index lists are sorted, so this is a single merge pass.
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let mut result = 0.0;
        let mut i = 0;
        let mut j = 0;

        while i < self.indices.len() && j < other.indices.len() {
            let a = self.indices[i];
            let b = other.indices[j];

            if a == b {
                result += self.values[i] * other.values[j];
                i += 1;
                j += 1;
            } else if a < b {
                i += 1;
            } else {
                j += 1;
            }
        }

        result
    }

    /// Dot product with a dense weight vector; indices past its end count as zero
    pub fn dot_dense(&self, dense: &[f64]) -> f64 {
        self.indices
            .iter()
            .zip(&self.values)
            .filter(|&(&i, _)| i < dense.len())
            .map(|(&i, &v)| dense[i] * v)
            .sum()
    }

    /// Squared Euclidean distance ||x - y||²
    pub fn squared_distance(&self, other: &SparseVector) -> f64 {
        let mut distance_sq = 0.0;
        let mut i = 0;
        let mut j = 0;

        while i < self.indices.len() && j < other.indices.len() {
            let a = self.indices[i];
            let b = other.indices[j];

            if a == b {
                let diff = self.values[i] - other.values[j];
                distance_sq += diff * diff;
                i += 1;
                j += 1;
            } else if a < b {
                distance_sq += self.values[i] * self.values[i];
                i += 1;
            } else {
                distance_sq += other.values[j] * other.values[j];
                j += 1;
            }
        }

        distance_sq += self.values[i..].iter().map(|v| v * v).sum::<f64>();
        distance_sq += other.values[j..].iter().map(|v| v * v).sum::<f64>();
        distance_sq
    }

    /// Compute squared L2 norm
    pub fn norm_squared(&self) -> f64 {
        self.values.iter().map(|&v| v * v).sum()
    }

    /// Compute L2 norm
    pub fn norm(&self) -> f64 {
        self.norm_squared().sqrt()
    }

    /// One past the largest stored index (0 for an empty vector)
    pub fn dim(&self) -> usize {
        self.indices.last().map_or(0, |&i| i + 1)
    }

    /// Number of non-zero elements
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Check if vector is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Training sample with features and target
#[derive(Clone, Debug)]
pub struct Sample {
    /// Feature vector (sparse representation)
    pub features: SparseVector,
    /// Class label for classification, real target for regression
    pub label: f64,
}

impl Sample {
    /// Create a new sample
    pub fn new(features: SparseVector, label: f64) -> Self {
        Self { features, label }
    }
}

/// Formulation solved during training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SvmType {
    /// C-support vector classification
    CSvc,
    /// ν-support vector classification
    NuSvc,
    /// ε-support vector regression
    EpsilonSvr,
    /// ν-support vector regression
    NuSvr,
}

impl SvmType {
    pub fn is_classification(self) -> bool {
        matches!(self, SvmType::CSvc | SvmType::NuSvc)
    }

    pub fn name(self) -> &'static str {
        match self {
            SvmType::CSvc => "c-svc",
            SvmType::NuSvc => "nu-svc",
            SvmType::EpsilonSvr => "epsilon-svr",
            SvmType::NuSvr => "nu-svr",
        }
    }
}

/// Which decision-function evaluator backs a set of results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PredictorBackend {
    /// Block-summed evaluation over the shared support vector list
    #[default]
    Native,
    /// Independent per-pair expansion; supports compaction
    Reference,
}

/// Configuration for training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Formulation to solve
    pub svm_type: SvmType,
    /// Regularization parameter C (C-SVC, ε-SVR, ν-SVR)
    pub cost: f64,
    /// ν parameter (ν-SVC, ν-SVR)
    pub nu: f64,
    /// Width of the ε-insensitive tube (ε-SVR)
    pub epsilon: f64,
    /// Per-class multipliers of C, as (label, weight)
    pub weights: Vec<(i32, f64)>,
    /// Stopping tolerance on the maximal KKT violation
    pub tolerance: f64,
    /// Kernel row cache size in megabytes
    pub cache_size: usize,
    /// Enable shrinking heuristic
    pub shrinking: bool,
    /// Fit probability estimates during training
    pub probability: bool,
    /// Iteration cap; `None` selects max(10^7, 100 * l)
    pub max_iterations: Option<usize>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            svm_type: SvmType::CSvc,
            cost: 1.0,
            nu: 0.5,
            epsilon: 0.1,
            weights: Vec::new(),
            tolerance: 0.001,
            cache_size: 40,
            shrinking: true,
            probability: false,
            max_iterations: None,
        }
    }
}

impl OptimizerConfig {
    /// Default configuration for the given formulation
    pub fn for_type(svm_type: SvmType) -> Self {
        Self {
            svm_type,
            ..Self::default()
        }
    }

    /// Check that every parameter used by `svm_type` is in range
    pub fn validate(&self) -> Result<()> {
        let uses_cost = !matches!(self.svm_type, SvmType::NuSvc);
        if uses_cost && !(self.cost > 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "cost must be positive, got {}",
                self.cost
            )));
        }
        let uses_nu = matches!(self.svm_type, SvmType::NuSvc | SvmType::NuSvr);
        if uses_nu && !(self.nu > 0.0 && self.nu <= 1.0) {
            return Err(SVMError::InvalidParameter(format!(
                "nu must be in (0, 1], got {}",
                self.nu
            )));
        }
        if self.svm_type == SvmType::EpsilonSvr && !(self.epsilon >= 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "epsilon must be non-negative, got {}",
                self.epsilon
            )));
        }
        if !(self.tolerance > 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.cache_size == 0 {
            return Err(SVMError::InvalidParameter(
                "cache_size must be positive".to_string(),
            ));
        }
        if let Some(&(label, weight)) = self.weights.iter().find(|(_, w)| !(*w > 0.0)) {
            return Err(SVMError::InvalidParameter(format!(
                "weight for class {label} must be positive, got {weight}"
            )));
        }
        Ok(())
    }

    /// Iteration cap for a problem with `l` variables
    pub fn iteration_limit(&self, l: usize) -> usize {
        self.max_iterations
            .unwrap_or_else(|| 10_000_000usize.max(l.saturating_mul(100)))
    }
}

/// Dense symmetric Gram matrix, `K[i][j] = k(x_i, x_j)`
#[derive(Debug, Clone, PartialEq)]
pub struct KernelMatrix {
    n: usize,
    values: Vec<f64>,
}

impl KernelMatrix {
    /// Evaluate `f(i, j)` for every `i <= j` and mirror the result
    pub fn from_fn<F: FnMut(usize, usize) -> f64>(n: usize, mut f: F) -> Self {
        let mut values = vec![0.0; n * n];
        for i in 0..n {
            for j in i..n {
                let v = f(i, j);
                values[i * n + j] = v;
                values[j * n + i] = v;
            }
        }
        Self { n, values }
    }

    /// Grow to `n + extra` rows, evaluating only entries that touch a new row
    pub fn extend<F: FnMut(usize, usize) -> f64>(&self, extra: usize, mut f: F) -> Self {
        let old = self.n;
        let n = old + extra;
        let mut values = vec![0.0; n * n];
        for i in 0..old {
            values[i * n..i * n + old].copy_from_slice(&self.values[i * old..(i + 1) * old]);
        }
        for j in old..n {
            for i in 0..=j {
                let v = f(i, j);
                values[i * n + j] = v;
                values[j * n + i] = v;
            }
        }
        Self { n, values }
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n + j]
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }
}
