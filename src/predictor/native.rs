use crate::core::{Predictor, PredictorBackend, Result, SVMError, SparseVector};
use crate::kernel::Kernel;
use crate::optimizer::TrainedParameters;
use std::sync::Arc;

/// One kernel evaluation per support vector, then block sums per class pair
pub struct NativePredictor<K: Kernel + ?Sized> {
    kernel: Arc<K>,
    params: Arc<TrainedParameters>,
}

impl<K: Kernel + ?Sized> NativePredictor<K> {
    pub fn new(kernel: Arc<K>, params: Arc<TrainedParameters>) -> Self {
        Self { kernel, params }
    }
}

impl<K: Kernel + ?Sized> Predictor for NativePredictor<K> {
    fn backend(&self) -> PredictorBackend {
        PredictorBackend::Native
    }

    fn predict_values(&self, x: &SparseVector) -> Vec<f64> {
        let kvalue: Vec<f64> = self
            .params
            .support_vectors
            .iter()
            .map(|sv| self.kernel.compute(x, sv))
            .collect();
        self.params.decision_values(&kvalue)
    }

    fn predict_probability(&self, x: &SparseVector) -> Result<Vec<f64>> {
        if !self.params.svm_type.is_classification() {
            return Err(SVMError::InvalidParameter(
                "class probabilities are only defined for classification".to_string(),
            ));
        }
        self.params.probabilities(&self.predict_values(x))
    }

    fn compact(&mut self) -> Result<()> {
        Ok(())
    }
}
