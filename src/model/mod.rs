//! Hyperparameter bundles
//!
//! A model is a kernel plus an [`OptimizerConfig`](crate::core::OptimizerConfig). Fitting never mutates
//! the model, so one model can be fitted to many datasets.
//!
//! ```rust
//! use svmlearn::{ClassificationDataSet, ClassificationModel, Dataset, RBFKernel, TestDataSet};
//!
//! # fn main() -> svmlearn::Result<()> {
//! let data = ClassificationDataSet::new(
//!     vec![0, 1, 1, 2],
//!     vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]],
//! )?;
//! let model = ClassificationModel::nu_svc(RBFKernel::new(data.gamma()));
//! let results = model.fit(&data)?;
//!
//! let test = TestDataSet::new(vec![vec![0.0, 0.0], vec![1.0, 1.0]]);
//! assert_eq!(results.predict(&test), vec![0, 2]);
//! # Ok(())
//! # }
//! ```

mod classification;
mod regression;

pub use classification::ClassificationModel;
pub use regression::RegressionModel;

use crate::core::{Dataset, Result, SVMError};
use crate::kernel::{Kernel, KernelKind};

/// Reject kernel settings no formulation can use
pub(crate) fn validate_kernel<K: Kernel + ?Sized>(kernel: &K) -> Result<()> {
    let gamma = match kernel.kind() {
        KernelKind::Polynomial { degree, gamma, coef0 } => {
            if degree < 0 {
                return Err(SVMError::InvalidParameter(format!(
                    "polynomial degree must be non-negative, got {degree}"
                )));
            }
            if !coef0.is_finite() {
                return Err(SVMError::InvalidParameter(format!("coef0 must be finite, got {coef0}")));
            }
            Some(gamma)
        }
        KernelKind::Rbf { gamma } => Some(gamma),
        KernelKind::Sigmoid { gamma, coef0 } => {
            if !coef0.is_finite() {
                return Err(SVMError::InvalidParameter(format!("coef0 must be finite, got {coef0}")));
            }
            Some(gamma)
        }
        KernelKind::Linear | KernelKind::Custom => None,
    };
    match gamma {
        Some(g) if !g.is_finite() => Err(SVMError::InvalidParameter(format!(
            "gamma must be finite, got {g}"
        ))),
        _ => Ok(()),
    }
}

/// A Gram matrix built with one kernel cannot train a model of another
pub(crate) fn check_precomputed_kernel<K, D>(kernel: &K, dataset: &D) -> Result<()>
where
    K: Kernel + ?Sized,
    D: Dataset + ?Sized,
{
    match dataset.precomputed_kernel() {
        Some(kind) if kind != KernelKind::Custom && kind != kernel.kind() => {
            Err(SVMError::InvalidParameter(format!(
                "dataset was precomputed with {kind} but the model uses {}",
                kernel.kind()
            )))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{LinearKernel, PolynomialKernel, RBFKernel};

    #[test]
    fn test_kernel_validation() {
        assert!(validate_kernel(&LinearKernel::new()).is_ok());
        assert!(validate_kernel(&RBFKernel::new(-0.5)).is_ok());
        assert!(validate_kernel(&PolynomialKernel::new(2, -0.2, 1.3)).is_ok());

        assert!(matches!(
            validate_kernel(&PolynomialKernel::new(-1, 1.0, 0.0)),
            Err(SVMError::InvalidParameter(_))
        ));
        assert!(validate_kernel(&RBFKernel::new(f64::NAN)).is_err());
    }
}
