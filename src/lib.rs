//! Support vector classification and regression
//!
//! C-SVC, ν-SVC, ε-SVR and ν-SVR trained with an SMO solver using
//! second-order working set selection, shrinking and an LRU kernel cache.
//! Kernels can be evaluated on the fly or read from a precomputed Gram
//! matrix, and trained results are evaluated by one of two interchangeable
//! predictor backends.
//!
//! ```rust
//! use svmlearn::{ClassificationDataSet, ClassificationModel, LinearKernel, TestDataSet};
//!
//! # fn main() -> svmlearn::Result<()> {
//! let data = ClassificationDataSet::new(
//!     vec![1, 1, -1, -1],
//!     vec![vec![2.0], vec![1.5], vec![-1.5], vec![-2.0]],
//! )?;
//! let results = ClassificationModel::c_svc(LinearKernel::new()).fit(&data)?;
//! assert_eq!(results.predict(&TestDataSet::new(vec![vec![3.0]])), vec![1]);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod core;
pub mod data;
pub mod kernel;
pub mod model;
pub mod optimizer;
pub mod persistence;
pub mod predictor;
pub mod probability;
pub mod results;
pub mod solver;

// Re-export main types for convenience
pub use crate::api::{EvaluationMetrics, RegressionMetrics};
pub use crate::cache::{CacheStats, KernelCache};
pub use crate::core::error::{Result, SVMError};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::data::{
    CSVDataset, ClassificationDataSet, LibSVMDataset, PrecomputedDataSet, RegressionDataSet,
    TestDataSet,
};
pub use crate::kernel::{
    BuiltinKernel, CustomKernel, Kernel, KernelKind, LinearKernel, PolynomialKernel, RBFKernel,
    SigmoidKernel,
};
pub use crate::model::{ClassificationModel, RegressionModel};
pub use crate::optimizer::{SVMOptimizer, TrainedParameters};
pub use crate::results::{ClassificationResults, RegressionResults};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
