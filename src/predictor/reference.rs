use crate::core::{Predictor, PredictorBackend, Result, SVMError, SparseVector};
use crate::kernel::{Kernel, KernelKind};
use crate::optimizer::TrainedParameters;
use log::debug;
use std::sync::Arc;

/// Terms of one decision function
#[derive(Debug, Clone)]
enum Expansion {
    /// `Σ coef_s K(sv_s, x)`
    Kernel {
        support_vectors: Vec<SparseVector>,
        coefficients: Vec<f64>,
    },
    /// `w · x`, only valid for the linear kernel
    Linear { weights: Vec<f64> },
}

#[derive(Debug, Clone)]
struct DecisionFunction {
    expansion: Expansion,
    rho: f64,
}

/// Evaluates every decision function from its own copy of the expansion
pub struct ReferencePredictor<K: Kernel + ?Sized> {
    kernel: Arc<K>,
    params: Arc<TrainedParameters>,
    functions: Vec<DecisionFunction>,
}

impl<K: Kernel + ?Sized> ReferencePredictor<K> {
    pub fn new(kernel: Arc<K>, params: Arc<TrainedParameters>) -> Self {
        let functions = expand(&params);
        Self {
            kernel,
            params,
            functions,
        }
    }

    /// Total stored terms; a compacted linear function counts its weights
    pub fn n_terms(&self) -> usize {
        self.functions
            .iter()
            .map(|f| match &f.expansion {
                Expansion::Kernel { coefficients, .. } => coefficients.len(),
                Expansion::Linear { weights } => weights.len(),
            })
            .sum()
    }

    fn evaluate(&self, function: &DecisionFunction, x: &SparseVector) -> f64 {
        let sum: f64 = match &function.expansion {
            Expansion::Kernel {
                support_vectors,
                coefficients,
            } => support_vectors
                .iter()
                .zip(coefficients)
                .map(|(sv, c)| c * self.kernel.compute(sv, x))
                .sum(),
            Expansion::Linear { weights } => x.dot_dense(weights),
        };
        sum - function.rho
    }
}

/// One expansion per class pair, or a single one for regression
fn expand(params: &TrainedParameters) -> Vec<DecisionFunction> {
    if !params.svm_type.is_classification() {
        return vec![DecisionFunction {
            expansion: Expansion::Kernel {
                support_vectors: params.support_vectors.clone(),
                coefficients: params.sv_coef[0].clone(),
            },
            rho: params.rho[0],
        }];
    }

    let start = params.class_starts();
    params
        .pairs()
        .into_iter()
        .zip(&params.rho)
        .map(|((i, j), &rho)| {
            let mut support_vectors = Vec::new();
            let mut coefficients = Vec::new();
            for (class, row) in [(i, j - 1), (j, i)] {
                for s in start[class]..start[class] + params.n_sv[class] {
                    support_vectors.push(params.support_vectors[s].clone());
                    coefficients.push(params.sv_coef[row][s]);
                }
            }
            DecisionFunction {
                expansion: Expansion::Kernel {
                    support_vectors,
                    coefficients,
                },
                rho,
            }
        })
        .collect()
}

impl<K: Kernel + ?Sized> Predictor for ReferencePredictor<K> {
    fn backend(&self) -> PredictorBackend {
        PredictorBackend::Reference
    }

    fn predict_values(&self, x: &SparseVector) -> Vec<f64> {
        self.functions.iter().map(|f| self.evaluate(f, x)).collect()
    }

    fn predict_probability(&self, x: &SparseVector) -> Result<Vec<f64>> {
        if self.params.precomputed {
            return Err(SVMError::NotImplemented(
                "probability estimates for models trained on a precomputed kernel".to_string(),
            ));
        }
        if !self.params.svm_type.is_classification() {
            return Err(SVMError::InvalidParameter(
                "class probabilities are only defined for classification".to_string(),
            ));
        }
        self.params.probabilities(&self.predict_values(x))
    }

    /// Linear kernels collapse each expansion into `w = Σ coef_s sv_s`;
    /// other kernels drop terms whose coefficient is zero.
    fn compact(&mut self) -> Result<()> {
        let linear = self.kernel.kind() == KernelKind::Linear;
        let before = self.n_terms();

        for function in &mut self.functions {
            let Expansion::Kernel {
                support_vectors,
                coefficients,
            } = &function.expansion
            else {
                continue;
            };

            function.expansion = if linear {
                let dim = support_vectors.iter().map(SparseVector::dim).max().unwrap_or(0);
                let mut weights = vec![0.0; dim];
                for (sv, &c) in support_vectors.iter().zip(coefficients) {
                    for (&idx, &v) in sv.indices.iter().zip(&sv.values) {
                        weights[idx] += c * v;
                    }
                }
                Expansion::Linear { weights }
            } else {
                let (support_vectors, coefficients) = support_vectors
                    .iter()
                    .zip(coefficients)
                    .filter(|&(_, &c)| c != 0.0)
                    .map(|(sv, &c)| (sv.clone(), c))
                    .unzip();
                Expansion::Kernel {
                    support_vectors,
                    coefficients,
                }
            };
        }

        debug!("compacted reference predictor: {before} -> {} terms", self.n_terms());
        Ok(())
    }
}
