//! Linear kernel implementation

use crate::core::SparseVector;
use crate::kernel::{Kernel, KernelKind};

/// Linear kernel: K(x, y) = x^T * y
///
/// Models trained with this kernel can be compacted into one weight vector
/// per class pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinearKernel;

impl LinearKernel {
    /// Create a new linear kernel
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for LinearKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        x.dot(y)
    }

    fn kind(&self) -> KernelKind {
        KernelKind::Linear
    }
}
