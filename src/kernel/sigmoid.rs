//! Sigmoid (hyperbolic tangent) kernel
//!
//! K(x, y) = tanh(γ * <x, y> + r)
//!
//! The sigmoid kernel is not positive semi-definite for most parameter
//! choices; training still converges, the solution is just a local one.

use crate::core::SparseVector;
use crate::kernel::traits::{Kernel, KernelKind};

/// Sigmoid kernel: K(x, y) = tanh(γ * <x, y> + coef0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmoidKernel {
    /// Scaling factor for the dot product
    pub gamma: f64,
    /// Independent term
    pub coef0: f64,
}

impl SigmoidKernel {
    /// Creates a new sigmoid kernel
    ///
    /// ```
    /// use svmlearn::kernel::SigmoidKernel;
    ///
    /// let kernel = SigmoidKernel::new(0.2, -0.5);
    /// assert_eq!(kernel.gamma, 0.2);
    /// assert_eq!(kernel.coef0, -0.5);
    /// ```
    pub fn new(gamma: f64, coef0: f64) -> Self {
        Self { gamma, coef0 }
    }
}

impl Kernel for SigmoidKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        (self.gamma * x.dot(y) + self.coef0).tanh()
    }

    fn kind(&self) -> KernelKind {
        KernelKind::Sigmoid {
            gamma: self.gamma,
            coef0: self.coef0,
        }
    }
}
