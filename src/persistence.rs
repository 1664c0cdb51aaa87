//! Model serialization and persistence
//!
//! Trained results are stored as JSON: the kernel descriptor, the trained
//! parameters and some metadata. Only built-in kernels can be restored, so
//! results fitted with a custom kernel are rejected when saving.

use crate::core::{Dataset, PredictorBackend, Result, SVMError, SvmType};
use crate::kernel::{BuiltinKernel, KernelKind};
use crate::optimizer::TrainedParameters;
use crate::results::{ClassificationResults, RegressionResults};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

/// Serializable representation of trained results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableModel {
    /// Kernel family and parameters
    pub kernel: KernelKind,
    /// Evaluator the results were using when saved
    pub backend: PredictorBackend,
    pub parameters: TrainedParameters,
    pub metadata: ModelMetadata,
}

/// Model metadata for tracking and validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the model
    pub library_version: String,
    /// Total number of support vectors
    pub n_support_vectors: usize,
    /// Creation timestamp, RFC 3339
    pub created_at: String,
}

/// Results restored from disk
#[derive(Debug)]
pub enum LoadedModel {
    Classification(ClassificationResults),
    Regression(RegressionResults),
}

impl LoadedModel {
    pub fn svm_type(&self) -> SvmType {
        match self {
            LoadedModel::Classification(results) => results.parameters().svm_type,
            LoadedModel::Regression(results) => results.parameters().svm_type,
        }
    }

    /// Predicted label (as a number) or regression value for every sample
    pub fn predict<D: Dataset + ?Sized>(&self, dataset: &D) -> Vec<f64> {
        match self {
            LoadedModel::Classification(results) => results
                .predict(dataset)
                .into_iter()
                .map(f64::from)
                .collect(),
            LoadedModel::Regression(results) => results.predict(dataset),
        }
    }
}

impl SerializableModel {
    fn new(kernel: KernelKind, backend: PredictorBackend, parameters: &TrainedParameters) -> Result<Self> {
        if kernel == KernelKind::Custom {
            return Err(SVMError::InvalidParameter(
                "models with a custom kernel cannot be saved".to_string(),
            ));
        }
        Ok(Self {
            kernel,
            backend,
            metadata: ModelMetadata {
                library_version: env!("CARGO_PKG_VERSION").to_string(),
                n_support_vectors: parameters.total_sv(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
            parameters: parameters.clone(),
        })
    }

    /// Capture trained classification results
    pub fn from_classification(results: &ClassificationResults) -> Result<Self> {
        Self::new(results.kernel_kind(), results.backend(), results.parameters())
    }

    /// Capture trained regression results
    pub fn from_regression(results: &RegressionResults) -> Result<Self> {
        Self::new(results.kernel_kind(), results.backend(), results.parameters())
    }

    /// Save model to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(SVMError::IoError)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;
        Ok(())
    }

    /// Load model from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        let reader = BufReader::new(file);
        let model: Self = serde_json::from_reader(reader)
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;
        model.check()?;
        Ok(model)
    }

    /// Reject files whose parameter shapes do not fit together
    fn check(&self) -> Result<()> {
        let p = &self.parameters;
        let l = p.support_vectors.len();
        let rows = if p.svm_type.is_classification() {
            p.labels.len().saturating_sub(1)
        } else {
            1
        };
        let functions = if p.svm_type.is_classification() {
            p.labels.len() * p.labels.len().saturating_sub(1) / 2
        } else {
            1
        };
        let class_blocks = !p.svm_type.is_classification()
            || (p.n_sv.len() == p.labels.len() && p.n_sv.iter().sum::<usize>() == l);
        // Platt parameters are either absent or one pair per decision function
        let platt = p.prob_a.len() == p.prob_b.len()
            && (p.prob_a.is_empty() || p.prob_a.len() == functions);
        let consistent = p.sv_coef.len() == rows
            && p.sv_coef.iter().all(|row| row.len() == l)
            && p.sv_indices.len() == l
            && p.rho.len() == functions
            && class_blocks
            && platt;
        if consistent {
            Ok(())
        } else {
            Err(SVMError::SerializationError(
                "model parameters are inconsistent".to_string(),
            ))
        }
    }

    /// Rebuild results with the evaluator they were saved with
    pub fn to_results(&self) -> Result<LoadedModel> {
        self.to_results_with(self.backend)
    }

    /// Rebuild results with a chosen evaluator
    pub fn to_results_with(&self, backend: PredictorBackend) -> Result<LoadedModel> {
        let kernel = Arc::new(BuiltinKernel::from_kind(self.kernel)?);
        let parameters = self.parameters.clone();
        Ok(if parameters.svm_type.is_classification() {
            LoadedModel::Classification(ClassificationResults::new(parameters, kernel, backend))
        } else {
            LoadedModel::Regression(RegressionResults::new(parameters, kernel, backend))
        })
    }

    /// Print model summary
    pub fn print_summary(&self) {
        let p = &self.parameters;
        println!("=== SVM Model Summary ===");
        println!("SVM Type: {}", p.svm_type.name());
        println!("Kernel: {}", self.kernel);
        if p.svm_type.is_classification() {
            println!("Classes: {:?}", p.labels);
            println!("Support Vectors: {} {:?}", self.metadata.n_support_vectors, p.n_sv);
        } else {
            println!("Support Vectors: {}", self.metadata.n_support_vectors);
        }
        println!("Rho: {:?}", p.rho);
        println!(
            "Probability: {}",
            if p.has_probability() { "yes" } else { "no" }
        );
        println!("Library Version: {}", self.metadata.library_version);
        println!("Created: {}", self.metadata.created_at);
    }
}
