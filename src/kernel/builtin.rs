//! Runtime-selected built-in kernel
//!
//! Used where the kernel family is only known at runtime: the CLI and
//! models restored from disk.

use crate::core::{Result, SVMError, SparseVector};
use crate::kernel::{Kernel, KernelKind, LinearKernel, PolynomialKernel, RBFKernel, SigmoidKernel};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuiltinKernel {
    Linear(LinearKernel),
    Polynomial(PolynomialKernel),
    Rbf(RBFKernel),
    Sigmoid(SigmoidKernel),
}

impl BuiltinKernel {
    /// Rebuild a kernel from its descriptor
    pub fn from_kind(kind: KernelKind) -> Result<Self> {
        match kind {
            KernelKind::Linear => Ok(BuiltinKernel::Linear(LinearKernel::new())),
            KernelKind::Polynomial {
                degree,
                gamma,
                coef0,
            } => Ok(BuiltinKernel::Polynomial(PolynomialKernel::new(
                degree, gamma, coef0,
            ))),
            KernelKind::Rbf { gamma } => Ok(BuiltinKernel::Rbf(RBFKernel::new(gamma))),
            KernelKind::Sigmoid { gamma, coef0 } => {
                Ok(BuiltinKernel::Sigmoid(SigmoidKernel::new(gamma, coef0)))
            }
            KernelKind::Custom => Err(SVMError::InvalidParameter(
                "custom kernels cannot be reconstructed from a descriptor".to_string(),
            )),
        }
    }
}

impl Kernel for BuiltinKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        match self {
            BuiltinKernel::Linear(k) => k.compute(x, y),
            BuiltinKernel::Polynomial(k) => k.compute(x, y),
            BuiltinKernel::Rbf(k) => k.compute(x, y),
            BuiltinKernel::Sigmoid(k) => k.compute(x, y),
        }
    }

    fn compute_with_norms(
        &self,
        x: &SparseVector,
        y: &SparseVector,
        x_norm_sq: f64,
        y_norm_sq: f64,
    ) -> f64 {
        match self {
            BuiltinKernel::Rbf(k) => k.compute_with_norms(x, y, x_norm_sq, y_norm_sq),
            other => other.compute(x, y),
        }
    }

    fn kind(&self) -> KernelKind {
        match self {
            BuiltinKernel::Linear(k) => k.kind(),
            BuiltinKernel::Polynomial(k) => k.kind(),
            BuiltinKernel::Rbf(k) => k.kind(),
            BuiltinKernel::Sigmoid(k) => k.kind(),
        }
    }
}
