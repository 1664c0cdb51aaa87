//! Trained models
//!
//! Results own the trained parameters and the evaluator chosen at fit time.
//! They are produced by `fit` and never retrained; `compact` only changes
//! how the evaluator stores its expansion.

use crate::core::{
    Dataset, DecisionValues, Predictor, PredictorBackend, Result, SVMError, SparseVector,
};
use crate::kernel::{Kernel, KernelKind};
use crate::optimizer::{argmax, TrainedParameters};
use crate::predictor::build_predictor;
use std::fmt;
use std::sync::Arc;

fn vectors<D: Dataset + ?Sized>(dataset: &D) -> impl Iterator<Item = SparseVector> + '_ {
    (0..dataset.len()).map(move |i| dataset.get_sample(i).features)
}

/// A trained C-SVC or ν-SVC model
pub struct ClassificationResults {
    params: Arc<TrainedParameters>,
    kernel_kind: KernelKind,
    predictor: Box<dyn Predictor>,
}

impl ClassificationResults {
    pub(crate) fn new<K: Kernel + ?Sized + 'static>(
        params: TrainedParameters,
        kernel: Arc<K>,
        backend: PredictorBackend,
    ) -> Self {
        let params = Arc::new(params);
        let kernel_kind = kernel.kind();
        let predictor = build_predictor(backend, kernel, Arc::clone(&params));
        Self {
            params,
            kernel_kind,
            predictor,
        }
    }

    /// Class labels in the order used by `rho`, decision values and probabilities
    pub fn labels(&self) -> &[i32] {
        &self.params.labels
    }

    /// Offsets of the one-against-one decision functions
    pub fn rho(&self) -> &[f64] {
        &self.params.rho
    }

    /// Support vectors per class
    pub fn n_support_vectors(&self) -> &[usize] {
        &self.params.n_sv
    }

    pub fn support_vectors(&self) -> &[SparseVector] {
        &self.params.support_vectors
    }

    /// Training row of each support vector
    pub fn support_vector_indices(&self) -> &[usize] {
        &self.params.sv_indices
    }

    pub fn dual_coefficients(&self) -> &[Vec<f64>] {
        &self.params.sv_coef
    }

    pub fn kernel_kind(&self) -> KernelKind {
        self.kernel_kind
    }

    pub fn backend(&self) -> PredictorBackend {
        self.predictor.backend()
    }

    pub fn has_probability(&self) -> bool {
        self.params.has_probability()
    }

    pub fn parameters(&self) -> &TrainedParameters {
        &self.params
    }

    /// Predicted label of one vector
    pub fn predict_one(&self, x: &SparseVector) -> i32 {
        self.params.vote(&self.predictor.predict_values(x))
    }

    /// Predicted label of every vector in `dataset`
    pub fn predict<D: Dataset + ?Sized>(&self, dataset: &D) -> Vec<i32> {
        vectors(dataset).map(|x| self.predict_one(&x)).collect()
    }

    /// Decision values keyed by label pair, in both orientations
    pub fn predict_values<D: Dataset + ?Sized>(&self, dataset: &D) -> Vec<DecisionValues> {
        let pairs = self.params.pairs();
        let labels = &self.params.labels;
        vectors(dataset)
            .map(|x| {
                let mut values = DecisionValues::new();
                for (&(i, j), &f) in pairs.iter().zip(&self.predictor.predict_values(&x)) {
                    values.insert((labels[i], labels[j]), f);
                    values.insert((labels[j], labels[i]), -f);
                }
                values
            })
            .collect()
    }

    /// Most probable label and the probability of every class, in `labels()` order.
    ///
    /// Fails with [`SVMError::InvalidParameter`] when the model was fitted
    /// without probability estimates.
    pub fn predict_probability<D: Dataset + ?Sized>(
        &self,
        dataset: &D,
    ) -> Result<Vec<(i32, Vec<f64>)>> {
        if !self.params.has_probability() {
            return Err(SVMError::InvalidParameter(
                "model was not trained with probability estimates".to_string(),
            ));
        }
        vectors(dataset)
            .map(|x| {
                let probabilities = self.predictor.predict_probability(&x)?;
                let label = self.params.labels[argmax(&probabilities)];
                Ok((label, probabilities))
            })
            .collect()
    }

    /// Re-encode the evaluator's expansion; predictions stay the same
    pub fn compact(&mut self) -> Result<()> {
        self.predictor.compact()
    }
}

impl fmt::Debug for ClassificationResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassificationResults")
            .field("svm_type", &self.params.svm_type)
            .field("labels", &self.params.labels)
            .field("n_sv", &self.params.n_sv)
            .field("kernel", &self.kernel_kind)
            .field("backend", &self.predictor.backend())
            .finish()
    }
}

/// A trained ε-SVR or ν-SVR model
pub struct RegressionResults {
    params: Arc<TrainedParameters>,
    kernel_kind: KernelKind,
    predictor: Box<dyn Predictor>,
}

impl RegressionResults {
    pub(crate) fn new<K: Kernel + ?Sized + 'static>(
        params: TrainedParameters,
        kernel: Arc<K>,
        backend: PredictorBackend,
    ) -> Self {
        let params = Arc::new(params);
        let kernel_kind = kernel.kind();
        let predictor = build_predictor(backend, kernel, Arc::clone(&params));
        Self {
            params,
            kernel_kind,
            predictor,
        }
    }

    /// Offset of the regression function
    pub fn rho(&self) -> f64 {
        self.params.rho[0]
    }

    pub fn support_vectors(&self) -> &[SparseVector] {
        &self.params.support_vectors
    }

    pub fn support_vector_indices(&self) -> &[usize] {
        &self.params.sv_indices
    }

    pub fn dual_coefficients(&self) -> &[f64] {
        &self.params.sv_coef[0]
    }

    pub fn kernel_kind(&self) -> KernelKind {
        self.kernel_kind
    }

    pub fn backend(&self) -> PredictorBackend {
        self.predictor.backend()
    }

    pub fn parameters(&self) -> &TrainedParameters {
        &self.params
    }

    pub fn predict_one(&self, x: &SparseVector) -> f64 {
        self.predictor.predict_values(x)[0]
    }

    pub fn predict<D: Dataset + ?Sized>(&self, dataset: &D) -> Vec<f64> {
        vectors(dataset).map(|x| self.predict_one(&x)).collect()
    }

    /// Scale σ of the Laplace noise model `p(z) = e^(-|z|/σ) / (2σ)` for
    /// `target = prediction + z`
    pub fn svr_probability(&self) -> Result<f64> {
        self.params.sigma.ok_or_else(|| {
            SVMError::InvalidParameter(
                "model was not trained with probability estimates".to_string(),
            )
        })
    }

    pub fn compact(&mut self) -> Result<()> {
        self.predictor.compact()
    }
}

impl fmt::Debug for RegressionResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegressionResults")
            .field("svm_type", &self.params.svm_type)
            .field("n_sv", &self.params.support_vectors.len())
            .field("rho", &self.params.rho[0])
            .field("kernel", &self.kernel_kind)
            .field("backend", &self.predictor.backend())
            .finish()
    }
}
