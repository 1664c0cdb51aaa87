use super::{check_precomputed_kernel, validate_kernel};
use crate::core::{Dataset, OptimizerConfig, PredictorBackend, Result, SvmType};
use crate::kernel::Kernel;
use crate::optimizer::{regression_metrics, SVMOptimizer};
use crate::results::RegressionResults;
use log::info;
use std::sync::Arc;

/// ε-SVR or ν-SVR with a fixed kernel
#[derive(Clone)]
pub struct RegressionModel<K: Kernel + 'static> {
    kernel: Arc<K>,
    config: OptimizerConfig,
}

impl<K: Kernel + 'static> RegressionModel<K> {
    /// ε-support vector regression, cost 1, ε = 0.1
    pub fn epsilon_svr(kernel: K) -> Self {
        Self {
            kernel: Arc::new(kernel),
            config: OptimizerConfig::for_type(SvmType::EpsilonSvr),
        }
    }

    /// ν-support vector regression, cost 1, ν = 0.5
    pub fn nu_svr(kernel: K) -> Self {
        Self {
            kernel: Arc::new(kernel),
            config: OptimizerConfig::for_type(SvmType::NuSvr),
        }
    }

    /// Set regularization parameter C
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.config.cost = cost;
        self
    }

    /// Set ν (ν-SVR)
    pub fn with_nu(mut self, nu: f64) -> Self {
        self.config.nu = nu;
        self
    }

    /// Set the tube width (ε-SVR)
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    /// Estimate the Laplace noise scale during training
    pub fn with_probability(mut self, probability: bool) -> Self {
        self.config.probability = probability;
        self
    }

    pub fn with_shrinking(mut self, shrinking: bool) -> Self {
        self.config.shrinking = shrinking;
        self
    }

    /// Set kernel cache size in megabytes
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.config.cache_size = cache_size;
        self
    }

    /// Set stopping tolerance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    /// Set maximum number of solver iterations
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = Some(max_iterations);
        self
    }

    pub fn svm_type(&self) -> SvmType {
        self.config.svm_type
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn cost(&self) -> f64 {
        self.config.cost
    }

    pub fn nu(&self) -> f64 {
        self.config.nu
    }

    pub fn epsilon(&self) -> f64 {
        self.config.epsilon
    }

    pub fn probability(&self) -> bool {
        self.config.probability
    }

    pub fn shrinking(&self) -> bool {
        self.config.shrinking
    }

    pub fn cache_size(&self) -> usize {
        self.config.cache_size
    }

    pub fn tolerance(&self) -> f64 {
        self.config.tolerance
    }

    pub fn max_iterations(&self) -> Option<usize> {
        self.config.max_iterations
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Train with the native evaluator
    pub fn fit<D: Dataset + ?Sized>(&self, dataset: &D) -> Result<RegressionResults> {
        self.fit_with(dataset, PredictorBackend::Native)
    }

    /// Train and evaluate with the chosen backend
    pub fn fit_with<D: Dataset + ?Sized>(
        &self,
        dataset: &D,
        backend: PredictorBackend,
    ) -> Result<RegressionResults> {
        let optimizer = self.optimizer(dataset)?;
        info!(
            "training {} with {} kernel on {} samples",
            self.config.svm_type.name(),
            self.kernel.kind(),
            dataset.len()
        );
        let params = optimizer.train(dataset)?;
        Ok(RegressionResults::new(params, Arc::clone(&self.kernel), backend))
    }

    /// Mean squared error and squared correlation coefficient over
    /// `nr_fold` random folds
    pub fn cross_validate<D: Dataset + ?Sized>(
        &self,
        dataset: &D,
        nr_fold: usize,
    ) -> Result<(f64, f64)> {
        let predicted = self.optimizer(dataset)?.cross_validate(dataset, nr_fold)?;
        let (mse, scc) = regression_metrics(&dataset.get_labels(), &predicted);
        info!("cross validation mean squared error = {mse}, squared correlation coefficient = {scc}");
        Ok((mse, scc))
    }

    fn optimizer<D: Dataset + ?Sized>(&self, dataset: &D) -> Result<SVMOptimizer<K>> {
        validate_kernel(self.kernel.as_ref())?;
        check_precomputed_kernel(self.kernel.as_ref(), dataset)?;
        Ok(SVMOptimizer::new(Arc::clone(&self.kernel), self.config.clone()))
    }
}
