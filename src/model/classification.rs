use super::{check_precomputed_kernel, validate_kernel};
use crate::core::{Dataset, OptimizerConfig, PredictorBackend, Result, SvmType};
use crate::kernel::Kernel;
use crate::optimizer::{accuracy, SVMOptimizer};
use crate::results::ClassificationResults;
use log::info;
use std::sync::Arc;

/// C-SVC or ν-SVC with a fixed kernel
#[derive(Clone)]
pub struct ClassificationModel<K: Kernel + 'static> {
    kernel: Arc<K>,
    config: OptimizerConfig,
}

impl<K: Kernel + 'static> ClassificationModel<K> {
    /// C-support vector classification, cost 1
    pub fn c_svc(kernel: K) -> Self {
        Self {
            kernel: Arc::new(kernel),
            config: OptimizerConfig::for_type(SvmType::CSvc),
        }
    }

    /// ν-support vector classification, ν = 0.5
    pub fn nu_svc(kernel: K) -> Self {
        Self {
            kernel: Arc::new(kernel),
            config: OptimizerConfig::for_type(SvmType::NuSvc),
        }
    }

    /// Set regularization parameter C (C-SVC)
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.config.cost = cost;
        self
    }

    /// Set ν (ν-SVC)
    pub fn with_nu(mut self, nu: f64) -> Self {
        self.config.nu = nu;
        self
    }

    /// Per-class multipliers of C, as `(label, weight)`; ν-SVC ignores them
    pub fn with_weights(mut self, weights: Vec<(i32, f64)>) -> Self {
        self.config.weights = weights;
        self
    }

    /// Fit Platt scaling so results can answer `predict_probability`
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

    pub fn weights(&self) -> &[(i32, f64)] {
        &self.config.weights
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
    pub fn fit<D: Dataset + ?Sized>(&self, dataset: &D) -> Result<ClassificationResults> {
        self.fit_with(dataset, PredictorBackend::Native)
    }

    /// Train and evaluate with the chosen backend
    pub fn fit_with<D: Dataset + ?Sized>(
        &self,
        dataset: &D,
        backend: PredictorBackend,
    ) -> Result<ClassificationResults> {
        let optimizer = self.optimizer(dataset)?;
        info!(
            "training {} with {} kernel on {} samples",
            self.config.svm_type.name(),
            self.kernel.kind(),
            dataset.len()
        );
        let params = optimizer.train(dataset)?;
        Ok(ClassificationResults::new(
            params,
            Arc::clone(&self.kernel),
            backend,
        ))
    }

    /// Stratified `nr_fold` cross-validation accuracy in `[0, 1]`
    pub fn cross_validate<D: Dataset + ?Sized>(&self, dataset: &D, nr_fold: usize) -> Result<f64> {
        let predicted = self.optimizer(dataset)?.cross_validate(dataset, nr_fold)?;
        let acc = accuracy(&dataset.get_labels(), &predicted);
        info!("cross validation accuracy = {:.4}%", acc * 100.0);
        Ok(acc)
    }

    fn optimizer<D: Dataset + ?Sized>(&self, dataset: &D) -> Result<SVMOptimizer<K>> {
        validate_kernel(self.kernel.as_ref())?;
        check_precomputed_kernel(self.kernel.as_ref(), dataset)?;
        Ok(SVMOptimizer::new(Arc::clone(&self.kernel), self.config.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SVMError;
    use crate::data::ClassificationDataSet;
    use crate::kernel::{LinearKernel, RBFKernel};

    fn toy() -> ClassificationDataSet {
        ClassificationDataSet::new(
            vec![0, 1, 1, 2],
            vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_builder_and_getters() {
        let model = ClassificationModel::c_svc(LinearKernel::new())
            .with_cost(10.0)
            .with_weights(vec![(1, 10.0)])
            .with_shrinking(false)
            .with_cache_size(60)
            .with_tolerance(0.005)
            .with_max_iterations(500)
            .with_probability(true);

        assert_eq!(model.svm_type(), SvmType::CSvc);
        assert_eq!(model.cost(), 10.0);
        assert_eq!(model.weights(), &[(1, 10.0)]);
        assert!(!model.shrinking());
        assert_eq!(model.cache_size(), 60);
        assert_eq!(model.tolerance(), 0.005);
        assert_eq!(model.max_iterations(), Some(500));
        assert!(model.probability());

        let model = ClassificationModel::nu_svc(LinearKernel::new());
        assert_eq!(model.svm_type(), SvmType::NuSvc);
        assert_eq!(model.nu(), 0.5);
        assert!(model.shrinking());
        assert_eq!(model.cache_size(), 40);
    }

    #[test]
    fn test_invalid_parameters_fail_at_fit() {
        let data = toy();
        let model = ClassificationModel::c_svc(LinearKernel::new()).with_cost(0.0);
        assert!(matches!(model.fit(&data), Err(SVMError::InvalidParameter(_))));

        let model = ClassificationModel::c_svc(LinearKernel::new()).with_cache_size(0);
        assert!(matches!(model.fit(&data), Err(SVMError::InvalidParameter(_))));
    }

    #[test]
    fn test_fit_is_repeatable() {
        let data = toy();
        let model = ClassificationModel::c_svc(RBFKernel::new(0.5))
            .with_cost(10.0)
            .with_weights(vec![(1, 10.0)]);
        let first = model.fit(&data).unwrap();
        let second = model.fit(&data).unwrap();
        assert_eq!(first.rho(), second.rho());
        assert_eq!(first.predict(&data), vec![0, 1, 1, 2]);
    }

    #[test]
    fn test_cross_validate_rejects_one_fold() {
        let data = toy();
        let model = ClassificationModel::c_svc(LinearKernel::new());
        assert!(matches!(
            model.cross_validate(&data, 1),
            Err(SVMError::InvalidParameter(_))
        ));
    }
}
