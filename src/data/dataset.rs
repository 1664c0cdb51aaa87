//! In-memory datasets built from dense rows or sparse vectors

use crate::core::{Dataset, Result, SVMError, Sample, SparseVector};
use crate::data::PrecomputedDataSet;
use crate::kernel::Kernel;
use std::sync::Arc;

fn check_lengths(targets: usize, rows: usize) -> Result<()> {
    if targets != rows {
        return Err(SVMError::DimensionMismatch {
            expected: targets,
            actual: rows,
        });
    }
    if rows == 0 {
        return Err(SVMError::EmptyDataset);
    }
    Ok(())
}

fn dense_samples(targets: impl Iterator<Item = f64>, rows: &[Vec<f64>]) -> (Vec<Sample>, usize) {
    let dimensions = rows.iter().map(Vec::len).max().unwrap_or(0);
    let samples = targets
        .zip(rows)
        .map(|(t, row)| Sample::new(SparseVector::from_dense(row), t))
        .collect();
    (samples, dimensions)
}

fn sparse_samples(targets: impl Iterator<Item = f64>, vectors: Vec<SparseVector>) -> (Vec<Sample>, usize) {
    let dimensions = vectors.iter().map(SparseVector::dim).max().unwrap_or(0);
    let samples = targets
        .zip(vectors)
        .map(|(t, features)| Sample::new(features, t))
        .collect();
    (samples, dimensions)
}

/// Labelled vectors for C-SVC and ν-SVC
#[derive(Debug, Clone)]
pub struct ClassificationDataSet {
    samples: Vec<Sample>,
    targets: Vec<i32>,
    dimensions: usize,
}

impl ClassificationDataSet {
    /// One label per dense row
    pub fn new(labels: Vec<i32>, rows: Vec<Vec<f64>>) -> Result<Self> {
        check_lengths(labels.len(), rows.len())?;
        let (samples, dimensions) = dense_samples(labels.iter().map(|&l| f64::from(l)), &rows);
        Ok(Self {
            samples,
            targets: labels,
            dimensions,
        })
    }

    /// One label per sparse vector
    pub fn from_sparse(labels: Vec<i32>, vectors: Vec<SparseVector>) -> Result<Self> {
        check_lengths(labels.len(), vectors.len())?;
        let (samples, dimensions) = sparse_samples(labels.iter().map(|&l| f64::from(l)), vectors);
        Ok(Self {
            samples,
            targets: labels,
            dimensions,
        })
    }

    /// Copy a loaded dataset, requiring integral labels
    pub fn from_dataset<D: Dataset + ?Sized>(dataset: &D) -> Result<Self> {
        let mut labels = Vec::with_capacity(dataset.len());
        let mut vectors = Vec::with_capacity(dataset.len());
        for i in 0..dataset.len() {
            let sample = dataset.get_sample(i);
            if sample.label.fract() != 0.0 || !sample.label.is_finite() {
                return Err(SVMError::InvalidDataset(format!(
                    "sample {i} has non-integer class label {}",
                    sample.label
                )));
            }
            labels.push(sample.label as i32);
            vectors.push(sample.features);
        }
        let mut data = Self::from_sparse(labels, vectors)?;
        data.dimensions = data.dimensions.max(dataset.dim());
        Ok(data)
    }

    /// Distinct labels in order of first appearance
    pub fn labels(&self) -> Vec<i32> {
        let mut seen = Vec::new();
        for &label in &self.targets {
            if !seen.contains(&label) {
                seen.push(label);
            }
        }
        seen
    }

    /// Label of every sample
    pub fn targets(&self) -> &[i32] {
        &self.targets
    }

    /// Evaluate the full Gram matrix under `kernel`
    pub fn precompute<K: Kernel>(&self, kernel: K) -> PrecomputedDataSet<K> {
        PrecomputedDataSet::new(self.samples.clone(), Arc::new(kernel))
    }
}

impl Dataset for ClassificationDataSet {
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
}

/// Vectors with real-valued targets for ε-SVR and ν-SVR
#[derive(Debug, Clone)]
pub struct RegressionDataSet {
    samples: Vec<Sample>,
    dimensions: usize,
}

impl RegressionDataSet {
    /// One target per dense row
    pub fn new(targets: Vec<f64>, rows: Vec<Vec<f64>>) -> Result<Self> {
        check_lengths(targets.len(), rows.len())?;
        let (samples, dimensions) = dense_samples(targets.into_iter(), &rows);
        Ok(Self {
            samples,
            dimensions,
        })
    }

    /// One target per sparse vector
    pub fn from_sparse(targets: Vec<f64>, vectors: Vec<SparseVector>) -> Result<Self> {
        check_lengths(targets.len(), vectors.len())?;
        let (samples, dimensions) = sparse_samples(targets.into_iter(), vectors);
        Ok(Self {
            samples,
            dimensions,
        })
    }

    /// Copy a loaded dataset
    pub fn from_dataset<D: Dataset + ?Sized>(dataset: &D) -> Result<Self> {
        let (targets, vectors) = (0..dataset.len())
            .map(|i| {
                let sample = dataset.get_sample(i);
                (sample.label, sample.features)
            })
            .unzip();
        let mut data = Self::from_sparse(targets, vectors)?;
        data.dimensions = data.dimensions.max(dataset.dim());
        Ok(data)
    }

    /// Evaluate the full Gram matrix under `kernel`
    pub fn precompute<K: Kernel>(&self, kernel: K) -> PrecomputedDataSet<K> {
        PrecomputedDataSet::new(self.samples.clone(), Arc::new(kernel))
    }
}

impl Dataset for RegressionDataSet {
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
}

/// Unlabelled vectors to predict on. Samples report a label of 0.
#[derive(Debug, Clone, Default)]
pub struct TestDataSet {
    vectors: Vec<SparseVector>,
    dimensions: usize,
}

impl TestDataSet {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        let dimensions = rows.iter().map(Vec::len).max().unwrap_or(0);
        Self {
            vectors: rows.iter().map(|r| SparseVector::from_dense(r)).collect(),
            dimensions,
        }
    }

    pub fn from_sparse(vectors: Vec<SparseVector>) -> Self {
        let dimensions = vectors.iter().map(SparseVector::dim).max().unwrap_or(0);
        Self {
            vectors,
            dimensions,
        }
    }

    /// Drop the labels of any dataset
    pub fn from_dataset<D: Dataset + ?Sized>(dataset: &D) -> Self {
        Self {
            vectors: (0..dataset.len())
                .map(|i| dataset.get_sample(i).features)
                .collect(),
            dimensions: dataset.dim(),
        }
    }

    pub fn vectors(&self) -> &[SparseVector] {
        &self.vectors
    }
}

impl Dataset for TestDataSet {
    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn dim(&self) -> usize {
        self.dimensions
    }

    fn get_sample(&self, i: usize) -> Sample {
        Sample::new(self.vectors[i].clone(), 0.0)
    }

    fn get_labels(&self) -> Vec<f64> {
        vec![0.0; self.vectors.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::LinearKernel;

    #[test]
    fn test_classification_dataset() {
        let data = ClassificationDataSet::new(
            vec![2, 0, 2, 1],
            vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]],
        )
        .unwrap();

        assert_eq!(data.len(), 4);
        // zero rows still count towards dimensionality
        assert_eq!(data.dim(), 2);
        assert_eq!(data.gamma(), 0.5);
        assert_eq!(data.labels(), vec![2, 0, 1]);
        assert_eq!(data.get_labels(), vec![2.0, 0.0, 2.0, 1.0]);
        assert!(data.get_sample(0).features.is_empty());
    }

    #[test]
    fn test_length_mismatch_and_empty() {
        assert!(matches!(
            ClassificationDataSet::new(vec![1, 2], vec![vec![1.0]]),
            Err(SVMError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
        assert!(matches!(
            RegressionDataSet::new(vec![], vec![]),
            Err(SVMError::EmptyDataset)
        ));
    }

    #[test]
    fn test_from_dataset_requires_integer_labels() {
        let regression = RegressionDataSet::new(vec![0.5, 1.0], vec![vec![1.0], vec![2.0]]).unwrap();
        assert!(matches!(
            ClassificationDataSet::from_dataset(&regression),
            Err(SVMError::InvalidDataset(_))
        ));

        let regression = RegressionDataSet::new(vec![3.0, -1.0], vec![vec![1.0], vec![2.0]]).unwrap();
        let classes = ClassificationDataSet::from_dataset(&regression).unwrap();
        assert_eq!(classes.targets(), &[3, -1]);
    }

    #[test]
    fn test_test_dataset() {
        let test = TestDataSet::from_sparse(vec![
            SparseVector::new(vec![4], vec![1.0]),
            SparseVector::empty(),
        ]);
        assert_eq!(test.len(), 2);
        assert_eq!(test.dim(), 5);
        assert_eq!(test.get_labels(), vec![0.0, 0.0]);

        let regression = RegressionDataSet::new(vec![1.5], vec![vec![1.0, 2.0]]).unwrap();
        let unlabelled = TestDataSet::from_dataset(&regression);
        assert_eq!(unlabelled.vectors()[0], SparseVector::from_dense(&[1.0, 2.0]));
    }

    #[test]
    fn test_precompute_keeps_samples() {
        let data = RegressionDataSet::new(vec![1.0, 2.0], vec![vec![1.0, 2.0], vec![3.0, 0.0]]).unwrap();
        let pc = data.precompute(LinearKernel::new());
        assert_eq!(pc.len(), 2);
        assert_eq!(pc.get_labels(), vec![1.0, 2.0]);
        assert_eq!(pc.kernel_matrix().map(|g| g.get(0, 1)), Some(3.0));
    }
}
