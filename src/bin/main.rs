//! svmlearn command line interface
//!
//! Train, evaluate and apply SVM models on LibSVM and CSV data files.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use svmlearn::api::{load_dataset, DataFormat, EvaluationMetrics, RegressionMetrics};
use svmlearn::persistence::{LoadedModel, SerializableModel};
use svmlearn::{
    BuiltinKernel, ClassificationDataSet, ClassificationModel, Dataset, Kernel, LinearKernel,
    PolynomialKernel, RBFKernel, RegressionDataSet, RegressionModel, Result, SVMError,
    SigmoidKernel, SvmType, TestDataSet,
};

#[derive(Parser)]
#[command(name = "svmlearn")]
#[command(about = "Support vector classification and regression")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model and save it
    Train(TrainArgs),
    /// Predict labels or values with a saved model
    Predict(PredictArgs),
    /// Score a saved model on labelled data
    Evaluate(EvaluateArgs),
    /// Cross-validate hyperparameters on one dataset
    Cv(CvArgs),
    /// Display model information
    Info(InfoArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliSvmType {
    #[value(name = "c-svc")]
    CSvc,
    #[value(name = "nu-svc")]
    NuSvc,
    #[value(name = "epsilon-svr")]
    EpsilonSvr,
    #[value(name = "nu-svr")]
    NuSvr,
}

impl From<CliSvmType> for SvmType {
    fn from(cli_type: CliSvmType) -> Self {
        match cli_type {
            CliSvmType::CSvc => SvmType::CSvc,
            CliSvmType::NuSvc => SvmType::NuSvc,
            CliSvmType::EpsilonSvr => SvmType::EpsilonSvr,
            CliSvmType::NuSvr => SvmType::NuSvr,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliKernel {
    Linear,
    Polynomial,
    Rbf,
    Sigmoid,
}

/// Hyperparameters shared by `train` and `cv`
#[derive(Args)]
struct ModelArgs {
    /// Training data file (LibSVM or CSV format)
    #[arg(long)]
    data: PathBuf,

    /// Data format: auto, libsvm, or csv
    #[arg(short, long, default_value = "auto")]
    format: String,

    /// Formulation to train
    #[arg(long, value_enum, default_value = "c-svc")]
    svm_type: CliSvmType,

    /// Kernel function
    #[arg(short, long, value_enum, default_value = "rbf")]
    kernel: CliKernel,

    /// Cost parameter C
    #[arg(short = 'C', long = "cost", default_value = "1.0")]
    cost: f64,

    /// ν for nu-svc and nu-svr
    #[arg(long, default_value = "0.5")]
    nu: f64,

    /// Tube width for epsilon-svr
    #[arg(long, default_value = "0.1")]
    epsilon: f64,

    /// Kernel gamma (default 1/num_features)
    #[arg(short, long)]
    gamma: Option<f64>,

    /// Polynomial degree
    #[arg(long, default_value = "3")]
    degree: i32,

    /// Kernel coef0
    #[arg(long, default_value = "0.0")]
    coef0: f64,

    /// Class weight as label:weight, repeatable
    #[arg(short, long = "weight", allow_hyphen_values = true)]
    weights: Vec<String>,

    /// Stopping tolerance
    #[arg(long, default_value = "0.001")]
    tolerance: f64,

    /// Kernel cache size in MB
    #[arg(long, default_value = "40")]
    cache_size: usize,

    /// Disable the shrinking heuristic
    #[arg(long)]
    no_shrinking: bool,

    /// Fit probability estimates
    #[arg(long)]
    probability: bool,
}

#[derive(Args)]
struct TrainArgs {
    #[command(flatten)]
    model: ModelArgs,

    /// Output model file
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args)]
struct CvArgs {
    #[command(flatten)]
    model: ModelArgs,

    /// Number of folds
    #[arg(long, default_value = "5")]
    folds: usize,
}

#[derive(Args)]
struct PredictArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Input data file
    #[arg(long)]
    data: PathBuf,

    /// Output predictions file (optional, prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Data format: auto, libsvm, or csv
    #[arg(short, long, default_value = "auto")]
    format: String,

    /// Also print the decision values
    #[arg(long)]
    values: bool,

    /// Also print class probabilities
    #[arg(long)]
    probability: bool,
}

#[derive(Args)]
struct EvaluateArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Test data file
    #[arg(long)]
    data: PathBuf,

    /// Data format: auto, libsvm, or csv
    #[arg(short, long, default_value = "auto")]
    format: String,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::Evaluate(args) => evaluate_command(args),
        Commands::Cv(args) => cv_command(args),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn parse_weights(weights: &[String]) -> Result<Vec<(i32, f64)>> {
    weights
        .iter()
        .map(|w| {
            let parsed = w
                .split_once(':')
                .and_then(|(label, weight)| Some((label.parse::<i32>().ok()?, weight.parse::<f64>().ok()?)));
            parsed.ok_or_else(|| {
                SVMError::InvalidParameter(format!("Invalid weight '{w}', expected label:weight"))
            })
        })
        .collect()
}

impl ModelArgs {
    fn load(&self) -> Result<Box<dyn Dataset>> {
        let format: DataFormat = self.format.parse()?;
        info!("Loading {:?} as {format} format", self.data);
        let dataset = load_dataset(&self.data, format)?;
        info!(
            "Loaded {} samples with {} dimensions",
            dataset.len(),
            dataset.dim()
        );
        Ok(dataset)
    }

    fn kernel(&self, dataset: &dyn Dataset) -> BuiltinKernel {
        let gamma = self.gamma.unwrap_or_else(|| dataset.gamma());
        match self.kernel {
            CliKernel::Linear => BuiltinKernel::Linear(LinearKernel::new()),
            CliKernel::Polynomial => {
                BuiltinKernel::Polynomial(PolynomialKernel::new(self.degree, gamma, self.coef0))
            }
            CliKernel::Rbf => BuiltinKernel::Rbf(RBFKernel::new(gamma)),
            CliKernel::Sigmoid => BuiltinKernel::Sigmoid(SigmoidKernel::new(gamma, self.coef0)),
        }
    }

    fn classifier(&self, kernel: BuiltinKernel) -> Result<ClassificationModel<BuiltinKernel>> {
        let model = match SvmType::from(self.svm_type) {
            SvmType::NuSvc => ClassificationModel::nu_svc(kernel),
            _ => ClassificationModel::c_svc(kernel),
        };
        Ok(model
            .with_cost(self.cost)
            .with_nu(self.nu)
            .with_weights(parse_weights(&self.weights)?)
            .with_tolerance(self.tolerance)
            .with_cache_size(self.cache_size)
            .with_shrinking(!self.no_shrinking)
            .with_probability(self.probability))
    }

    fn regressor(&self, kernel: BuiltinKernel) -> RegressionModel<BuiltinKernel> {
        let model = match SvmType::from(self.svm_type) {
            SvmType::NuSvr => RegressionModel::nu_svr(kernel),
            _ => RegressionModel::epsilon_svr(kernel),
        };
        model
            .with_cost(self.cost)
            .with_nu(self.nu)
            .with_epsilon(self.epsilon)
            .with_tolerance(self.tolerance)
            .with_cache_size(self.cache_size)
            .with_shrinking(!self.no_shrinking)
            .with_probability(self.probability)
    }
}

fn train_command(args: TrainArgs) -> Result<()> {
    let dataset = args.model.load()?;
    let kernel = args.model.kernel(dataset.as_ref());
    let svm_type = SvmType::from(args.model.svm_type);
    info!("Training {} with {} kernel", svm_type.name(), kernel.kind());

    let serializable = if svm_type.is_classification() {
        let data = ClassificationDataSet::from_dataset(dataset.as_ref())?;
        let results = args.model.classifier(kernel)?.fit(&data)?;
        info!("Support vectors: {:?}", results.n_support_vectors());
        let metrics = EvaluationMetrics::from_predictions(data.targets(), &results.predict(&data));
        info!("Training accuracy: {:.2}%", metrics.accuracy() * 100.0);
        SerializableModel::from_classification(&results)?
    } else {
        let data = RegressionDataSet::from_dataset(dataset.as_ref())?;
        let results = args.model.regressor(kernel).fit(&data)?;
        info!("Support vectors: {}", results.support_vectors().len());
        let metrics = RegressionMetrics::from_predictions(&data.get_labels(), &results.predict(&data));
        info!("Training mean squared error: {:.6}", metrics.mean_squared_error);
        SerializableModel::from_regression(&results)?
    };

    serializable.save_to_file(&args.output)?;
    info!("Model saved to: {:?}", args.output);
    Ok(())
}

fn load_model(path: &Path) -> Result<(SerializableModel, LoadedModel)> {
    info!("Loading model from: {path:?}");
    let serializable = SerializableModel::load_from_file(path)?;
    let model = serializable.to_results()?;
    Ok((serializable, model))
}

fn predict_command(args: PredictArgs) -> Result<()> {
    let (_, model) = load_model(&args.model)?;
    let format: DataFormat = args.format.parse()?;
    let data = TestDataSet::from_dataset(load_dataset(&args.data, format)?.as_ref());
    info!("Predicting {} samples", data.len());

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };

    writeln!(writer, "# Predictions for {} samples", data.len())?;
    match &model {
        LoadedModel::Classification(results) => {
            let labels = results.labels().to_vec();
            let pairs = results.parameters().pairs();
            let predictions = results.predict(&data);
            let values = if args.values {
                Some(results.predict_values(&data))
            } else {
                None
            };
            let probabilities = if args.probability {
                Some(results.predict_probability(&data)?)
            } else {
                None
            };

            for (i, label) in predictions.iter().enumerate() {
                write!(writer, "{i} {label}")?;
                if let Some(values) = &values {
                    for &(a, b) in &pairs {
                        let f = values[i].get(&(labels[a], labels[b])).copied().unwrap_or_default();
                        write!(writer, " {f:.6}")?;
                    }
                }
                if let Some(probabilities) = &probabilities {
                    for p in &probabilities[i].1 {
                        write!(writer, " {p:.6}")?;
                    }
                }
                writeln!(writer)?;
            }
        }
        LoadedModel::Regression(results) => {
            if args.probability {
                writeln!(writer, "# Laplace sigma {:.6}", results.svr_probability()?)?;
            }
            for (i, value) in results.predict(&data).iter().enumerate() {
                writeln!(writer, "{i} {value}")?;
            }
        }
    }
    writer.flush()?;

    if let Some(path) = &args.output {
        info!("Predictions saved to: {path:?}");
    }
    Ok(())
}

fn evaluate_command(args: EvaluateArgs) -> Result<()> {
    let (serializable, model) = load_model(&args.model)?;
    let format: DataFormat = args.format.parse()?;
    let dataset = load_dataset(&args.data, format)?;

    println!("=== Model Evaluation ===");
    serializable.print_summary();
    println!("\nTest Results:");

    match &model {
        LoadedModel::Classification(results) => {
            let data = ClassificationDataSet::from_dataset(dataset.as_ref())?;
            let metrics =
                EvaluationMetrics::from_predictions(data.targets(), &results.predict(&data));
            println!("  Accuracy: {:.2}%", metrics.accuracy() * 100.0);
            for &label in metrics.labels() {
                println!(
                    "  Class {label}: precision {:.4}, recall {:.4}, F1 {:.4}",
                    metrics.precision(label),
                    metrics.recall(label),
                    metrics.f1_score(label)
                );
            }
        }
        LoadedModel::Regression(results) => {
            let metrics =
                RegressionMetrics::from_predictions(&dataset.get_labels(), &model.predict(dataset.as_ref()));
            println!("  Mean squared error: {:.6}", metrics.mean_squared_error);
            println!(
                "  Squared correlation coefficient: {:.6}",
                metrics.squared_correlation
            );
            info!("Support vectors: {}", results.support_vectors().len());
        }
    }
    Ok(())
}

fn cv_command(args: CvArgs) -> Result<()> {
    let dataset = args.model.load()?;
    let kernel = args.model.kernel(dataset.as_ref());
    let svm_type = SvmType::from(args.model.svm_type);
    info!(
        "{}-fold cross validation of {} with {} kernel",
        args.folds,
        svm_type.name(),
        kernel.kind()
    );

    println!("=== Cross-Validation Results ===");
    println!("Data file: {:?}", args.model.data);
    println!("Folds: {}", args.folds);
    if svm_type.is_classification() {
        let data = ClassificationDataSet::from_dataset(dataset.as_ref())?;
        let accuracy = args.model.classifier(kernel)?.cross_validate(&data, args.folds)?;
        println!("Cross Validation Accuracy = {:.4}%", accuracy * 100.0);
    } else {
        let data = RegressionDataSet::from_dataset(dataset.as_ref())?;
        let (mse, scc) = args.model.regressor(kernel).cross_validate(&data, args.folds)?;
        println!("Cross Validation Mean squared error = {mse:.6}");
        println!("Cross Validation Squared correlation coefficient = {scc:.6}");
    }
    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    let (serializable, _) = load_model(&args.model)?;
    serializable.print_summary();

    let parameters = &serializable.parameters;
    println!("\nSupport Vector Details:");
    println!("  Total: {}", parameters.support_vectors.len());
    if let Some(first_sv) = parameters.support_vectors.first() {
        println!("  First SV non-zeros: {}", first_sv.nnz());
        println!(
            "  First SV indices: {:?}",
            &first_sv.indices[..first_sv.indices.len().min(5)]
        );
        if first_sv.indices.len() > 5 {
            println!("    ... ({} more)", first_sv.indices.len() - 5);
        }
    }

    println!("\nDual coefficients:");
    for (row, coefficients) in parameters.sv_coef.iter().enumerate() {
        let n_show = coefficients.len().min(10);
        let shown: Vec<String> = coefficients[..n_show].iter().map(|c| format!("{c:.6}")).collect();
        print!("  row {row}: {}", shown.join(" "));
        if coefficients.len() > n_show {
            print!(" ... ({} more)", coefficients.len() - n_show);
        }
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_weights() {
        let weights = parse_weights(&["1:10".to_string(), "-1:0.5".to_string()]).unwrap();
        assert_eq!(weights, vec![(1, 10.0), (-1, 0.5)]);
        assert!(parse_weights(&["1".to_string()]).is_err());
        assert!(parse_weights(&["a:1".to_string()]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
