//! Core traits for SVM implementation

use crate::core::{KernelMatrix, PredictorBackend, Result, Sample, SparseVector};
use crate::kernel::KernelKind;

/// Dataset abstraction for efficient data access
pub trait Dataset: Send + Sync {
    /// Number of samples in the dataset
    fn len(&self) -> usize;

    /// Number of features (dimensionality)
    fn dim(&self) -> usize;

    /// Get a single sample by index
    ///
    /// # Panics
    /// Panics if index >= len()
    fn get_sample(&self, i: usize) -> Sample;

    /// Get multiple samples at once
    fn get_batch(&self, indices: &[usize]) -> Vec<Sample> {
        indices.iter().map(|&i| self.get_sample(i)).collect()
    }

    /// Get all labels (or regression targets) as a vector
    fn get_labels(&self) -> Vec<f64>;

    /// Check if the dataset is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Default kernel width for this data: `1 / dim`
    fn gamma(&self) -> f64 {
        match self.dim() {
            0 => 0.0,
            d => 1.0 / d as f64,
        }
    }

    /// Gram matrix over all samples, when one has been precomputed
    fn kernel_matrix(&self) -> Option<&KernelMatrix> {
        None
    }

    /// Kernel the Gram matrix was built with
    fn precomputed_kernel(&self) -> Option<KernelKind> {
        None
    }
}

/// Decision-function evaluator behind trained results.
///
/// Values follow the pair order `(0,1), (0,2), ..., (k-2,k-1)` over the
/// model's label list; regression yields a single value.
pub trait Predictor: Send + Sync {
    /// Which backend this is
    fn backend(&self) -> PredictorBackend;

    /// Raw decision values for one vector
    fn predict_values(&self, x: &SparseVector) -> Vec<f64>;

    /// Class probabilities for one vector, in label order
    fn predict_probability(&self, x: &SparseVector) -> Result<Vec<f64>>;

    /// Shrink the stored expansion without changing any prediction
    fn compact(&mut self) -> Result<()>;
}
