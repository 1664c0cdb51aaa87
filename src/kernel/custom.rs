//! User-supplied kernel functions

use crate::core::SparseVector;
use crate::kernel::{Kernel, KernelKind};
use std::fmt;

/// Kernel backed by an arbitrary closure.
///
/// The closure receives the two vectors being compared. Custom kernels
/// train through [`PrecomputedDataSet`](crate::data::PrecomputedDataSet);
/// prediction calls the closure against each stored support vector.
///
/// ```
/// use svmlearn::kernel::{CustomKernel, Kernel};
/// use svmlearn::SparseVector;
///
/// let negated = CustomKernel::new(|x: &SparseVector, y: &SparseVector| -x.dot(y));
/// let x = SparseVector::from_dense(&[1.0, 2.0]);
/// assert_eq!(negated.compute(&x, &x), -5.0);
/// ```
#[derive(Clone)]
pub struct CustomKernel<F> {
    function: F,
}

impl<F> CustomKernel<F>
where
    F: Fn(&SparseVector, &SparseVector) -> f64 + Send + Sync,
{
    pub fn new(function: F) -> Self {
        Self { function }
    }
}

impl<F> fmt::Debug for CustomKernel<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomKernel")
    }
}

impl<F> Kernel for CustomKernel<F>
where
    F: Fn(&SparseVector, &SparseVector) -> f64 + Send + Sync,
{
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        (self.function)(x, y)
    }

    fn kind(&self) -> KernelKind {
        KernelKind::Custom
    }
}
