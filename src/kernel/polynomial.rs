//! Polynomial Kernel Implementation
//!
//! The polynomial kernel is defined as:
//! K(x, y) = (γ * <x, y> + r)^d
//!
//! Where:
//! - γ (gamma): scaling factor for the dot product
//! - r (coef0): independent term in the polynomial
//! - d (degree): degree of the polynomial
//!
//! Gamma and coef0 may take any sign. A negative degree evaluates to 1.

use crate::core::SparseVector;
use crate::kernel::traits::{Kernel, KernelKind};

/// Polynomial kernel with configurable degree, gamma, and coefficient
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolynomialKernel {
    /// Degree of the polynomial
    pub degree: i32,
    /// Scaling factor for the dot product
    pub gamma: f64,
    /// Independent term in the polynomial
    pub coef0: f64,
}

impl PolynomialKernel {
    /// Creates a new polynomial kernel
    ///
    /// # Examples
    /// ```
    /// use svmlearn::kernel::PolynomialKernel;
    ///
    /// // Cubic kernel without offset: (0.5·x·y)³
    /// let kernel = PolynomialKernel::new(3, 0.5, 0.0);
    /// assert_eq!(kernel.degree, 3);
    /// ```
    pub fn new(degree: i32, gamma: f64, coef0: f64) -> Self {
        Self {
            degree,
            gamma,
            coef0,
        }
    }

    /// Creates a polynomial kernel with gamma = 1 / n_features and no offset
    pub fn auto(degree: i32, n_features: usize) -> Self {
        let gamma = if n_features == 0 {
            0.0
        } else {
            1.0 / n_features as f64
        };
        Self::new(degree, gamma, 0.0)
    }
}

impl Kernel for PolynomialKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        powi(self.gamma * x.dot(y) + self.coef0, self.degree)
    }

    fn kind(&self) -> KernelKind {
        KernelKind::Polynomial {
            degree: self.degree,
            gamma: self.gamma,
            coef0: self.coef0,
        }
    }
}

/// Integer power by repeated squaring
pub(crate) fn powi(base: f64, times: i32) -> f64 {
    let mut tmp = base;
    let mut ret = 1.0;
    let mut t = times;
    while t > 0 {
        if t % 2 == 1 {
            ret *= tmp;
        }
        tmp *= tmp;
        t /= 2;
    }
    ret
}
