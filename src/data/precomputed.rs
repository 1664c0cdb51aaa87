//! Datasets carrying their Gram matrix
//!
//! Training on a [`PrecomputedDataSet`] reads every kernel value from the
//! stored matrix instead of calling the kernel. Models trained this way are
//! identical to models trained on the raw samples with the same kernel.

use crate::core::{Dataset, KernelMatrix, Sample};
use crate::kernel::{Kernel, KernelKind};
use log::debug;
use std::fmt;
use std::sync::Arc;

/// Samples plus `G[i][j] = K(x_i, x_j)` for every pair
pub struct PrecomputedDataSet<K: Kernel + ?Sized> {
    samples: Vec<Sample>,
    dimensions: usize,
    kernel: Arc<K>,
    gram: KernelMatrix,
}

impl<K: Kernel + ?Sized> PrecomputedDataSet<K> {
    /// Evaluate the Gram matrix of `samples`
    pub fn new(samples: Vec<Sample>, kernel: Arc<K>) -> Self {
        let gram = KernelMatrix::from_fn(samples.len(), |i, j| {
            kernel.compute(&samples[i].features, &samples[j].features)
        });
        debug!("precomputed {}x{} {} kernel matrix", samples.len(), samples.len(), kernel.kind());
        let dimensions = samples.iter().map(|s| s.features.dim()).max().unwrap_or(0);
        Self {
            samples,
            dimensions,
            kernel,
            gram,
        }
    }

    /// Append the samples of `other`.
    ///
    /// Entries between existing samples are reused; only rows and columns
    /// touching the new samples are evaluated.
    pub fn combine<D: Dataset + ?Sized>(&self, other: &D) -> Self {
        let mut samples = self.samples.clone();
        samples.extend((0..other.len()).map(|i| other.get_sample(i)));

        let kernel = &self.kernel;
        let gram = self.gram.extend(other.len(), |i, j| {
            kernel.compute(&samples[i].features, &samples[j].features)
        });
        debug!("combined kernel matrix grown to {}x{}", gram.len(), gram.len());

        Self {
            dimensions: self.dimensions.max(other.dim()),
            samples,
            kernel: Arc::clone(&self.kernel),
            gram,
        }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn gram(&self) -> &KernelMatrix {
        &self.gram
    }
}

impl<K: Kernel + ?Sized> Clone for PrecomputedDataSet<K> {
    fn clone(&self) -> Self {
        Self {
            samples: self.samples.clone(),
            dimensions: self.dimensions,
            kernel: Arc::clone(&self.kernel),
            gram: self.gram.clone(),
        }
    }
}

impl<K: Kernel + ?Sized> fmt::Debug for PrecomputedDataSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrecomputedDataSet")
            .field("len", &self.samples.len())
            .field("dim", &self.dimensions)
            .field("kernel", &self.kernel.kind())
            .finish()
    }
}

impl<K: Kernel + ?Sized> Dataset for PrecomputedDataSet<K> {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn dim(&self) -> usize {
        self.dimensions
    }

    fn get_sample(&self, i: usize) -> Sample {
        self.samples[i].clone()
    }

    fn get_labels(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.label).collect()
    }

    fn kernel_matrix(&self) -> Option<&KernelMatrix> {
        Some(&self.gram)
    }

    fn precomputed_kernel(&self) -> Option<KernelKind> {
        Some(self.kernel.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SparseVector;
    use crate::data::{ClassificationDataSet, TestDataSet};
    use crate::kernel::{CustomKernel, RBFKernel};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_gram_matches_kernel() {
        let data = ClassificationDataSet::new(
            vec![0, 1, 1],
            vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![2.0, 2.0]],
        )
        .unwrap();
        let kernel = RBFKernel::new(0.5);
        let pc = data.precompute(kernel);

        for i in 0..3 {
            for j in 0..3 {
                let expected = kernel.compute(&data.get_sample(i).features, &data.get_sample(j).features);
                assert_eq!(pc.gram().get(i, j), expected);
            }
        }
        assert_eq!(pc.precomputed_kernel(), Some(KernelKind::Rbf { gamma: 0.5 }));
    }

    #[test]
    fn test_combine_only_evaluates_new_entries() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let kernel = CustomKernel::new(|x: &SparseVector, y: &SparseVector| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            x.dot(y)
        });

        let first = ClassificationDataSet::new(vec![0, 1], vec![vec![1.0], vec![2.0]]).unwrap();
        let pc = first.precompute(kernel);
        assert_eq!(CALLS.load(Ordering::SeqCst), 3);

        let second = ClassificationDataSet::new(vec![1, 0], vec![vec![3.0], vec![4.0]]).unwrap();
        let combined = pc.combine(&second);
        // new rows: (0,2) (1,2) (2,2) (0,3) (1,3) (2,3) (3,3)
        assert_eq!(CALLS.load(Ordering::SeqCst), 10);

        assert_eq!(combined.len(), 4);
        assert_eq!(combined.get_labels(), vec![0.0, 1.0, 1.0, 0.0]);
        assert_eq!(combined.gram().get(3, 1), 8.0);
        assert_eq!(combined.gram().get(0, 0), 1.0);
        // the original is untouched
        assert_eq!(pc.len(), 2);
    }

    #[test]
    fn test_combine_with_unlabelled_data() {
        let first = ClassificationDataSet::new(vec![0], vec![vec![1.0, 1.0]]).unwrap();
        let pc = first.precompute(RBFKernel::new(1.0));
        let combined = pc.combine(&TestDataSet::new(vec![vec![0.0, 0.0, 5.0]]));
        assert_eq!(combined.dim(), 3);
        assert_eq!(combined.kernel_matrix().map(|g| g.len()), Some(2));
    }
}
