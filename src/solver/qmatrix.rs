//! Q matrices seen by the solver
//!
//! The dual problems only need `Q_ij = y_i y_j K(x_i, x_j)`. Kernel values
//! come either from evaluating the kernel on raw samples or from a
//! precomputed Gram matrix; both paths go through [`KernelSource`] so the
//! solver sees identical numbers either way.

use crate::cache::{KernelCache, Qfloat};
use crate::core::{KernelMatrix, Sample};
use crate::kernel::Kernel;
use std::sync::Arc;

/// Access to the kernel between two dataset rows
pub struct KernelSource<'a, K: Kernel + ?Sized> {
    samples: &'a [Sample],
    kernel: &'a K,
    gram: Option<&'a KernelMatrix>,
}

impl<K: Kernel + ?Sized> Clone for KernelSource<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: Kernel + ?Sized> Copy for KernelSource<'_, K> {}

impl<'a, K: Kernel + ?Sized> KernelSource<'a, K> {
    pub fn new(samples: &'a [Sample], kernel: &'a K, gram: Option<&'a KernelMatrix>) -> Self {
        Self {
            samples,
            kernel,
            gram,
        }
    }

    /// Kernel value between dataset rows `a` and `b`
    #[inline]
    pub fn eval(&self, a: usize, b: usize) -> f64 {
        match self.gram {
            Some(gram) => gram.get(a, b),
            None => self
                .kernel
                .compute(&self.samples[a].features, &self.samples[b].features),
        }
    }

    pub fn samples(&self) -> &'a [Sample] {
        self.samples
    }

    pub fn kernel(&self) -> &'a K {
        self.kernel
    }

    pub fn is_precomputed(&self) -> bool {
        self.gram.is_some()
    }
}

/// Symmetric matrix of the quadratic term, addressed by variable index
pub trait QMatrix {
    /// Number of variables
    fn size(&self) -> usize;

    /// Full row `i`, indexed by variable
    fn row(&mut self, i: usize) -> Arc<[Qfloat]>;

    /// Diagonal `Q_ii`
    fn diagonal(&self) -> &[f64];
}

/// Q for classification: `Q_ij = y_i y_j K_ij`
pub struct SvcQ<'a, K: Kernel + ?Sized> {
    source: KernelSource<'a, K>,
    rows: &'a [usize],
    y: Vec<i8>,
    cache: KernelCache,
    qd: Vec<f64>,
}

impl<'a, K: Kernel + ?Sized> SvcQ<'a, K> {
    /// `rows[i]` is the dataset row of variable `i`
    pub fn new(source: KernelSource<'a, K>, rows: &'a [usize], y: &[i8], cache_mb: usize) -> Self {
        let qd = rows.iter().map(|&r| source.eval(r, r)).collect();
        Self {
            source,
            rows,
            y: y.to_vec(),
            cache: KernelCache::with_memory_limit(cache_mb, rows.len()),
            qd,
        }
    }
}

impl<K: Kernel + ?Sized> QMatrix for SvcQ<'_, K> {
    fn size(&self) -> usize {
        self.rows.len()
    }

    fn row(&mut self, i: usize) -> Arc<[Qfloat]> {
        let source = self.source;
        let rows = self.rows;
        let y = &self.y;
        self.cache.get_or_compute(i, || {
            rows.iter()
                .zip(y)
                .map(|(&r, &yj)| (f64::from(y[i] * yj) * source.eval(rows[i], r)) as Qfloat)
                .collect()
        })
    }

    fn diagonal(&self) -> &[f64] {
        &self.qd
    }
}

/// Q for regression over `2l` variables.
///
/// Variable `k < l` is `α_k`, variable `k + l` is `α*_k`; both refer to
/// training row `k` with opposite signs.
pub struct SvrQ<'a, K: Kernel + ?Sized> {
    source: KernelSource<'a, K>,
    rows: &'a [usize],
    sign: Vec<i8>,
    cache: KernelCache,
    qd: Vec<f64>,
}

impl<'a, K: Kernel + ?Sized> SvrQ<'a, K> {
    pub fn new(source: KernelSource<'a, K>, rows: &'a [usize], cache_mb: usize) -> Self {
        let l = rows.len();
        let diag: Vec<f64> = rows.iter().map(|&r| source.eval(r, r)).collect();
        let qd = diag.iter().chain(diag.iter()).copied().collect();
        let sign = (0..2 * l).map(|k| if k < l { 1 } else { -1 }).collect();
        Self {
            source,
            rows,
            sign,
            cache: KernelCache::with_memory_limit(cache_mb, l),
            qd,
        }
    }
}

impl<K: Kernel + ?Sized> QMatrix for SvrQ<'_, K> {
    fn size(&self) -> usize {
        2 * self.rows.len()
    }

    fn row(&mut self, i: usize) -> Arc<[Qfloat]> {
        let l = self.rows.len();
        let real = i % l;
        let source = self.source;
        let rows = self.rows;
        // cache holds plain kernel rows, one per training row
        let kernel_row = self.cache.get_or_compute(real, || {
            rows.iter()
                .map(|&r| source.eval(rows[real], r) as Qfloat)
                .collect()
        });
        let si = Qfloat::from(self.sign[i]);
        self.sign
            .iter()
            .enumerate()
            .map(|(j, &sj)| si * Qfloat::from(sj) * kernel_row[j % l])
            .collect()
    }

    fn diagonal(&self) -> &[f64] {
        &self.qd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SparseVector;
    use crate::kernel::LinearKernel;

    fn samples() -> Vec<Sample> {
        vec![
            Sample::new(SparseVector::from_dense(&[1.0, 0.0]), 1.0),
            Sample::new(SparseVector::from_dense(&[0.0, 2.0]), -1.0),
            Sample::new(SparseVector::from_dense(&[1.0, 1.0]), 1.0),
        ]
    }

    #[test]
    fn test_svc_q_signs_and_diagonal() {
        let data = samples();
        let kernel = LinearKernel::new();
        let source = KernelSource::new(&data, &kernel, None);
        let rows = vec![0, 1, 2];
        let mut q = SvcQ::new(source, &rows, &[1, -1, 1], 1);

        assert_eq!(q.size(), 3);
        assert_eq!(q.diagonal(), &[1.0, 4.0, 2.0]);
        // K(0,2) = 1, K(1,2) = 2 with y1 = -1
        assert_eq!(&*q.row(2), &[1.0, -2.0, 2.0]);
    }

    #[test]
    fn test_svc_q_uses_subset_rows() {
        let data = samples();
        let kernel = LinearKernel::new();
        let source = KernelSource::new(&data, &kernel, None);
        let rows = vec![2, 1];
        let mut q = SvcQ::new(source, &rows, &[1, 1], 1);

        assert_eq!(q.diagonal(), &[2.0, 4.0]);
        assert_eq!(&*q.row(0), &[2.0, 2.0]);
    }

    #[test]
    fn test_precomputed_source_matches_direct() {
        let data = samples();
        let kernel = LinearKernel::new();
        let gram = KernelMatrix::from_fn(3, |i, j| kernel.compute(&data[i].features, &data[j].features));
        let direct = KernelSource::new(&data, &kernel, None);
        let precomputed = KernelSource::new(&data, &kernel, Some(&gram));

        assert!(precomputed.is_precomputed());
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(direct.eval(i, j), precomputed.eval(i, j));
            }
        }
    }

    #[test]
    fn test_svr_q_doubles_variables() {
        let data = samples();
        let kernel = LinearKernel::new();
        let source = KernelSource::new(&data, &kernel, None);
        let rows = vec![0, 2];
        let mut q = SvrQ::new(source, &rows, 1);

        assert_eq!(q.size(), 4);
        assert_eq!(q.diagonal(), &[1.0, 2.0, 1.0, 2.0]);
        // variable 3 is the starred copy of row 2
        assert_eq!(&*q.row(3), &[-1.0, -2.0, 1.0, 2.0]);
        assert_eq!(&*q.row(0), &[1.0, 1.0, -1.0, -1.0]);
    }
}
