//! Convenience helpers around the model API
//!
//! File loading with format detection, evaluation metrics, and a few
//! one-call shortcuts.
//!
//! ```rust,no_run
//! use svmlearn::api::{load_dataset, DataFormat, EvaluationMetrics};
//! use svmlearn::{ClassificationDataSet, ClassificationModel, Dataset, RBFKernel};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let train = ClassificationDataSet::from_dataset(&*load_dataset("train.libsvm", DataFormat::Auto)?)?;
//! let test = ClassificationDataSet::from_dataset(&*load_dataset("test.libsvm", DataFormat::Auto)?)?;
//!
//! let results = ClassificationModel::c_svc(RBFKernel::new(train.gamma()))
//!     .with_cost(2.0)
//!     .fit(&train)?;
//! let metrics = EvaluationMetrics::from_predictions(test.targets(), &results.predict(&test));
//! println!("Accuracy: {:.2}%", metrics.accuracy() * 100.0);
//! # Ok(())
//! # }
//! ```

use crate::core::{Dataset, Result, SVMError};
use crate::data::{CSVDataset, LibSVMDataset};
use crate::optimizer::regression_metrics;
use log::warn;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// On-disk dataset format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFormat {
    /// Decide from the file extension
    #[default]
    Auto,
    LibSVM,
    CSV,
}

impl FromStr for DataFormat {
    type Err = SVMError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(DataFormat::Auto),
            "libsvm" | "svm" => Ok(DataFormat::LibSVM),
            "csv" => Ok(DataFormat::CSV),
            other => Err(SVMError::InvalidParameter(format!(
                "Unsupported format: {other}. Use 'auto', 'libsvm' or 'csv'"
            ))),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFormat::Auto => write!(f, "auto"),
            DataFormat::LibSVM => write!(f, "libsvm"),
            DataFormat::CSV => write!(f, "csv"),
        }
    }
}

/// Format implied by a file extension; LibSVM when unknown
pub fn detect_format(path: &Path) -> DataFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("csv") => DataFormat::CSV,
        Some("libsvm") | Some("svm") => DataFormat::LibSVM,
        Some(_) => {
            warn!("Unknown file extension, assuming LibSVM format");
            DataFormat::LibSVM
        }
        None => {
            warn!("No file extension, assuming LibSVM format");
            DataFormat::LibSVM
        }
    }
}

/// Load a labelled dataset from `path`
pub fn load_dataset<P: AsRef<Path>>(path: P, format: DataFormat) -> Result<Box<dyn Dataset>> {
    let path = path.as_ref();
    let format = match format {
        DataFormat::Auto => detect_format(path),
        explicit => explicit,
    };
    match format {
        DataFormat::CSV => Ok(Box::new(CSVDataset::from_file(path)?)),
        _ => Ok(Box::new(LibSVMDataset::from_file(path)?)),
    }
}

/// Confusion counts of a classifier over the labels it was scored on
#[derive(Debug, Clone)]
pub struct EvaluationMetrics {
    labels: Vec<i32>,
    /// `confusion[actual][predicted]`, indexed like `labels`
    confusion: Vec<Vec<usize>>,
}

impl EvaluationMetrics {
    /// Tally true labels against predictions. Labels are listed in order of
    /// first appearance, true labels first.
    pub fn from_predictions(truth: &[i32], predicted: &[i32]) -> Self {
        let mut labels: Vec<i32> = Vec::new();
        for &label in truth.iter().chain(predicted) {
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        let position = |label: i32| labels.iter().position(|&l| l == label).unwrap_or(0);

        let mut confusion = vec![vec![0; labels.len()]; labels.len()];
        for (&actual, &guess) in truth.iter().zip(predicted) {
            confusion[position(actual)][position(guess)] += 1;
        }
        Self { labels, confusion }
    }

    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    pub fn confusion_matrix(&self) -> &[Vec<usize>] {
        &self.confusion
    }

    pub fn total(&self) -> usize {
        self.confusion.iter().flatten().sum()
    }

    fn index(&self, label: i32) -> Option<usize> {
        self.labels.iter().position(|&l| l == label)
    }

    fn ratio(numerator: usize, denominator: usize) -> f64 {
        if denominator == 0 {
            0.0
        } else {
            numerator as f64 / denominator as f64
        }
    }

    /// Fraction of correct predictions
    pub fn accuracy(&self) -> f64 {
        let correct = (0..self.labels.len()).map(|i| self.confusion[i][i]).sum();
        Self::ratio(correct, self.total())
    }

    /// Of the samples predicted as `label`, the fraction that are `label`
    pub fn precision(&self, label: i32) -> f64 {
        self.index(label).map_or(0.0, |c| {
            let predicted = self.confusion.iter().map(|row| row[c]).sum();
            Self::ratio(self.confusion[c][c], predicted)
        })
    }

    /// Of the samples that are `label`, the fraction predicted as `label`
    pub fn recall(&self, label: i32) -> f64 {
        self.index(label).map_or(0.0, |c| {
            Self::ratio(self.confusion[c][c], self.confusion[c].iter().sum())
        })
    }

    pub fn f1_score(&self, label: i32) -> f64 {
        let p = self.precision(label);
        let r = self.recall(label);
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * (p * r) / (p + r)
        }
    }

    /// Unweighted mean of the per-label F1 scores
    pub fn macro_f1(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.labels.iter().map(|&l| self.f1_score(l)).sum();
        sum / self.labels.len() as f64
    }
}

/// Error measures of a regression model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionMetrics {
    pub mean_squared_error: f64,
    pub squared_correlation: f64,
}

impl RegressionMetrics {
    pub fn from_predictions(truth: &[f64], predicted: &[f64]) -> Self {
        let (mean_squared_error, squared_correlation) = regression_metrics(truth, predicted);
        Self {
            mean_squared_error,
            squared_correlation,
        }
    }
}

/// One-call shortcuts with default hyperparameters
pub mod quick {
    use super::*;
    use crate::data::{ClassificationDataSet, RegressionDataSet};
    use crate::kernel::RBFKernel;
    use crate::model::{ClassificationModel, RegressionModel};
    use crate::results::{ClassificationResults, RegressionResults};

    /// C-SVC with an RBF kernel of width `1 / dim`
    pub fn train_classifier<P: AsRef<Path>>(path: P, cost: f64) -> Result<ClassificationResults> {
        let data = ClassificationDataSet::from_dataset(&*load_dataset(path, DataFormat::Auto)?)?;
        ClassificationModel::c_svc(RBFKernel::new(data.gamma()))
            .with_cost(cost)
            .fit(&data)
    }

    /// ε-SVR with an RBF kernel of width `1 / dim`
    pub fn train_regressor<P: AsRef<Path>>(path: P, cost: f64) -> Result<RegressionResults> {
        let data = RegressionDataSet::from_dataset(&*load_dataset(path, DataFormat::Auto)?)?;
        RegressionModel::epsilon_svr(RBFKernel::new(data.gamma()))
            .with_cost(cost)
            .fit(&data)
    }

    /// Train a classifier on one file and score it on another
    pub fn evaluate_split<P1: AsRef<Path>, P2: AsRef<Path>>(
        train_path: P1,
        test_path: P2,
        cost: f64,
    ) -> Result<EvaluationMetrics> {
        let results = train_classifier(train_path, cost)?;
        let test = ClassificationDataSet::from_dataset(&*load_dataset(test_path, DataFormat::Auto)?)?;
        Ok(EvaluationMetrics::from_predictions(
            test.targets(),
            &results.predict(&test),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_format_parsing_and_detection() {
        assert_eq!("CSV".parse::<DataFormat>().unwrap(), DataFormat::CSV);
        assert_eq!("libsvm".parse::<DataFormat>().unwrap(), DataFormat::LibSVM);
        assert!("arff".parse::<DataFormat>().is_err());

        assert_eq!(detect_format(Path::new("test.csv")), DataFormat::CSV);
        assert_eq!(detect_format(Path::new("test.libsvm")), DataFormat::LibSVM);
        assert_eq!(detect_format(Path::new("test.svm")), DataFormat::LibSVM);
        assert_eq!(detect_format(Path::new("test")), DataFormat::LibSVM);
    }

    #[test]
    fn test_evaluation_metrics() {
        let truth = [0, 0, 1, 1, 2, 2];
        let predicted = [0, 1, 1, 1, 2, 0];
        let metrics = EvaluationMetrics::from_predictions(&truth, &predicted);

        assert_eq!(metrics.labels(), &[0, 1, 2]);
        assert_eq!(metrics.total(), 6);
        assert_eq!(metrics.accuracy(), 4.0 / 6.0);
        assert_eq!(metrics.precision(1), 2.0 / 3.0);
        assert_eq!(metrics.recall(1), 1.0);
        assert_eq!(metrics.recall(2), 0.5);
        assert!((metrics.f1_score(1) - 0.8).abs() < 1e-12);
        assert_eq!(metrics.precision(7), 0.0);
        assert!(metrics.macro_f1() > 0.0 && metrics.macro_f1() < 1.0);
    }

    #[test]
    fn test_regression_metrics() {
        let metrics = RegressionMetrics::from_predictions(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(metrics.mean_squared_error, 0.0);
        assert!((metrics.squared_correlation - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_load_and_quick_training() {
        let mut temp_file = Builder::new()
            .suffix(".libsvm")
            .tempfile()
            .expect("Failed to create temp file");
        for (label, x) in [(1, 2.0), (-1, -2.0), (1, 1.5), (-1, -1.5), (1, 1.8), (-1, -1.8)] {
            writeln!(temp_file, "{label} 1:{x}").expect("Failed to write");
        }
        temp_file.flush().expect("Failed to flush");

        let dataset = load_dataset(temp_file.path(), DataFormat::Auto).unwrap();
        assert_eq!(dataset.len(), 6);
        assert_eq!(dataset.dim(), 1);

        let results = quick::train_classifier(temp_file.path(), 1.0).unwrap();
        assert_eq!(results.labels(), &[1, -1]);

        let metrics = quick::evaluate_split(temp_file.path(), temp_file.path(), 1.0).unwrap();
        assert_eq!(metrics.accuracy(), 1.0);
    }

    #[test]
    fn test_load_csv() {
        let mut temp_file = Builder::new()
            .suffix(".csv")
            .tempfile()
            .expect("Failed to create temp file");
        writeln!(temp_file, "x,y,target").expect("Failed to write");
        writeln!(temp_file, "0.0,1.0,0.5").expect("Failed to write");
        writeln!(temp_file, "1.0,0.0,1.5").expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        let dataset = load_dataset(temp_file.path(), DataFormat::Auto).unwrap();
        assert_eq!(dataset.get_labels(), vec![0.5, 1.5]);
    }
}
