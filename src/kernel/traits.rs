//! Kernel trait definition

use crate::core::SparseVector;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Descriptor of a kernel's family and parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KernelKind {
    Linear,
    Polynomial { degree: i32, gamma: f64, coef0: f64 },
    Rbf { gamma: f64 },
    Sigmoid { gamma: f64, coef0: f64 },
    Custom,
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelKind::Linear => write!(f, "linear"),
            KernelKind::Polynomial {
                degree,
                gamma,
                coef0,
            } => write!(f, "polynomial(degree={degree}, gamma={gamma}, coef0={coef0})"),
            KernelKind::Rbf { gamma } => write!(f, "rbf(gamma={gamma})"),
            KernelKind::Sigmoid { gamma, coef0 } => {
                write!(f, "sigmoid(gamma={gamma}, coef0={coef0})")
            }
            KernelKind::Custom => write!(f, "custom"),
        }
    }
}

/// Kernel function trait
///
/// Any symmetric function of two vectors can serve as a kernel; the solver
/// does not check Mercer's condition, so indefinite kernels (for example a
/// negative gamma) still train, just without convexity guarantees.
pub trait Kernel: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64;

    /// Optional: compute kernel value using precomputed squared norms
    /// This can be more efficient for some kernels (e.g., RBF)
    fn compute_with_norms(
        &self,
        x: &SparseVector,
        y: &SparseVector,
        x_norm_sq: f64,
        y_norm_sq: f64,
    ) -> f64 {
        let _ = (x_norm_sq, y_norm_sq);
        self.compute(x, y)
    }

    /// Family and parameters of this kernel
    fn kind(&self) -> KernelKind;
}
