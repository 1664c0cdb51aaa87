//! Integration tests for the CLI application
//!
//! These tests run the `svmlearn` binary against real data files.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::{NamedTempFile, TempDir};

/// Helper to create test data files
struct TestDataFiles {
    pub libsvm_file: NamedTempFile,
    pub csv_file: NamedTempFile,
    pub test_libsvm_file: NamedTempFile,
    pub regression_file: NamedTempFile,
}

impl TestDataFiles {
    fn new() -> std::io::Result<Self> {
        let mut libsvm_file = NamedTempFile::with_suffix(".libsvm")?;
        writeln!(libsvm_file, "+1 1:2.0 2:1.0")?;
        writeln!(libsvm_file, "-1 1:-2.0 2:-1.0")?;
        writeln!(libsvm_file, "+1 1:1.5 2:0.8")?;
        writeln!(libsvm_file, "-1 1:-1.5 2:-0.8")?;
        writeln!(libsvm_file, "+1 1:1.8 2:0.9")?;
        writeln!(libsvm_file, "-1 1:-1.8 2:-0.9")?;
        libsvm_file.flush()?;

        let mut csv_file = NamedTempFile::with_suffix(".csv")?;
        writeln!(csv_file, "feature1,feature2,label")?;
        writeln!(csv_file, "2.0,1.0,1")?;
        writeln!(csv_file, "-2.0,-1.0,-1")?;
        writeln!(csv_file, "1.5,0.8,1")?;
        writeln!(csv_file, "-1.5,-0.8,-1")?;
        writeln!(csv_file, "1.8,0.9,1")?;
        writeln!(csv_file, "-1.8,-0.9,-1")?;
        csv_file.flush()?;

        let mut test_libsvm_file = NamedTempFile::new()?;
        writeln!(test_libsvm_file, "+1 1:1.6 2:0.7")?;
        writeln!(test_libsvm_file, "-1 1:-1.6 2:-0.7")?;
        test_libsvm_file.flush()?;

        let mut regression_file = NamedTempFile::with_suffix(".libsvm")?;
        for i in 0..10 {
            let x = i as f64 * 0.5;
            writeln!(regression_file, "{} 1:{x}", 0.5 * x + 1.0)?;
        }
        regression_file.flush()?;

        Ok(TestDataFiles {
            libsvm_file,
            csv_file,
            test_libsvm_file,
            regression_file,
        })
    }
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_svmlearn"))
        .args(args)
        .output()
        .expect("Failed to run svmlearn")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{what} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Train a classifier on the LibSVM training file and return the model path
fn train_model(test_data: &TestDataFiles, temp_dir: &TempDir, extra: &[&str]) -> std::path::PathBuf {
    let model_path = temp_dir.path().join("model.json");
    let mut args = vec![
        "train",
        "--data",
        path_str(test_data.libsvm_file.path()),
        "--output",
        path_str(&model_path),
    ];
    args.extend_from_slice(extra);
    assert_success(&run(&args), "train");
    assert!(model_path.exists(), "model file was not written");
    model_path
}

#[test]
fn test_cli_train_libsvm() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = train_model(&test_data, &temp_dir, &["--kernel", "linear", "-C", "2.0"]);

    let content = std::fs::read_to_string(model_path).expect("Failed to read model");
    assert!(content.contains("\"svm_type\""));
    assert!(content.contains("\"linear\""));
}

#[test]
fn test_cli_train_csv_auto_and_explicit() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    for format in ["auto", "csv"] {
        let model_path = temp_dir.path().join(format!("model_{format}.json"));
        let output = run(&[
            "train",
            "--data",
            path_str(test_data.csv_file.path()),
            "--format",
            format,
            "--output",
            path_str(&model_path),
        ]);
        assert_success(&output, "train from CSV");
        assert!(model_path.exists());
    }
}

#[test]
fn test_cli_train_with_weights_and_nu() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    train_model(
        &test_data,
        &temp_dir,
        &["--weight", "1:2", "--weight=-1:0.5", "--no-shrinking"],
    );

    let nu_model = temp_dir.path().join("nu.json");
    let output = run(&[
        "train",
        "--data",
        path_str(test_data.libsvm_file.path()),
        "--svm-type",
        "nu-svc",
        "--nu",
        "0.4",
        "--kernel",
        "polynomial",
        "--degree",
        "2",
        "--output",
        path_str(&nu_model),
    ]);
    assert_success(&output, "train nu-svc");
}

#[test]
fn test_cli_train_rejects_bad_weight() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    let output = run(&[
        "train",
        "--data",
        path_str(test_data.libsvm_file.path()),
        "--weight",
        "heavy",
        "--output",
        path_str(&model_path),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("label:weight"));
    assert!(!model_path.exists());
}

#[test]
fn test_cli_predict_to_stdout() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = train_model(&test_data, &temp_dir, &[]);

    let output = run(&[
        "predict",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.test_libsvm_file.path()),
        "--format",
        "libsvm",
    ]);
    assert_success(&output, "predict");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Predictions for 2 samples"));
    let lines: Vec<&str> = stdout.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(lines, vec!["0 1", "1 -1"]);
}

#[test]
fn test_cli_predict_with_values_to_file() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = train_model(&test_data, &temp_dir, &["--kernel", "linear"]);
    let predictions_path = temp_dir.path().join("predictions.txt");

    let output = run(&[
        "predict",
        "-m",
        path_str(&model_path),
        "--data",
        path_str(test_data.test_libsvm_file.path()),
        "--values",
        "-o",
        path_str(&predictions_path),
    ]);
    assert_success(&output, "predict");

    let content = std::fs::read_to_string(&predictions_path).expect("Failed to read predictions");
    let rows: Vec<Vec<&str>> = content
        .lines()
        .filter(|l| !l.starts_with('#'))
        .map(|l| l.split_whitespace().collect())
        .collect();
    assert_eq!(rows.len(), 2);
    for (row, expected) in rows.iter().zip(["1", "-1"]) {
        assert_eq!(row.len(), 3);
        assert_eq!(row[1], expected);
        let value: f64 = row[2].parse().expect("decision value");
        // Labels are ordered [1, -1], so positive values vote for 1
        assert_eq!(value > 0.0, expected == "1");
    }
}

#[test]
fn test_cli_evaluate_command() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = train_model(&test_data, &temp_dir, &[]);

    let output = run(&[
        "evaluate",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.test_libsvm_file.path()),
    ]);
    assert_success(&output, "evaluate");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Model Evaluation"));
    assert!(stdout.contains("Test Results"));
    assert!(stdout.contains("Accuracy: 100.00%"));
    assert!(stdout.contains("Class -1"));
}

#[test]
fn test_cli_regression_train_and_evaluate() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("svr.json");

    let output = run(&[
        "train",
        "--data",
        path_str(test_data.regression_file.path()),
        "--svm-type",
        "epsilon-svr",
        "--kernel",
        "linear",
        "-C",
        "10",
        "--epsilon",
        "0.01",
        "--output",
        path_str(&model_path),
    ]);
    assert_success(&output, "train epsilon-svr");

    let output = run(&[
        "evaluate",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.regression_file.path()),
    ]);
    assert_success(&output, "evaluate epsilon-svr");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Mean squared error"));
    assert!(stdout.contains("Squared correlation coefficient"));
}

#[test]
fn test_cli_cross_validation() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");

    let output = run(&[
        "cv",
        "--data",
        path_str(test_data.libsvm_file.path()),
        "--folds",
        "3",
        "--kernel",
        "linear",
    ]);
    assert_success(&output, "cv");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Cross-Validation Results"));
    assert!(stdout.contains("Cross Validation Accuracy = 100.0000%"));

    let output = run(&[
        "cv",
        "--data",
        path_str(test_data.regression_file.path()),
        "--svm-type",
        "nu-svr",
        "--folds",
        "5",
    ]);
    assert_success(&output, "cv nu-svr");
    assert!(String::from_utf8_lossy(&output.stdout).contains("Cross Validation Mean squared error"));
}

#[test]
fn test_cli_cross_validation_rejects_one_fold() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let output = run(&[
        "cv",
        "--data",
        path_str(test_data.libsvm_file.path()),
        "--folds",
        "1",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid parameter"));
}

#[test]
fn test_cli_info_command() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = train_model(&test_data, &temp_dir, &[]);

    let output = run(&["info", path_str(&model_path)]);
    assert_success(&output, "info");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("SVM Model Summary"));
    assert!(stdout.contains("SVM Type: c-svc"));
    assert!(stdout.contains("Classes: [1, -1]"));
    assert!(stdout.contains("Support Vector Details"));
    assert!(stdout.contains("Dual coefficients"));
}

#[test]
fn test_cli_verbose_and_debug_flags() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    train_model(&test_data, &temp_dir, &["-v"]);
    train_model(&test_data, &temp_dir, &["-d"]);
}

#[test]
fn test_cli_invalid_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    let output = run(&[
        "train",
        "--data",
        "/nonexistent/file.libsvm",
        "--output",
        path_str(&model_path),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error"));
}

#[test]
fn test_cli_invalid_format() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    let output = run(&[
        "train",
        "--data",
        path_str(test_data.libsvm_file.path()),
        "--format",
        "parquet",
        "--output",
        path_str(&model_path),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unsupported format"));
}

#[test]
fn test_cli_predict_with_missing_model() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let output = run(&[
        "predict",
        "--model",
        "/nonexistent/model.json",
        "--data",
        path_str(test_data.test_libsvm_file.path()),
    ]);
    assert!(!output.status.success());
}

#[test]
fn test_cli_train_single_class() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    let mut single_sample_file = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(single_sample_file, "+1 1:2.0 2:1.0").expect("Failed to write");
    single_sample_file.flush().expect("Failed to flush");

    let output = run(&[
        "train",
        "--data",
        path_str(single_sample_file.path()),
        "--output",
        path_str(&model_path),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error"));
}

#[test]
fn test_cli_help_output() {
    let output = run(&["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Support vector classification and regression"));
    for command in ["train", "predict", "evaluate", "cv", "info"] {
        assert!(stdout.contains(command), "help is missing {command}");
    }
}

#[test]
fn test_cli_version_output() {
    let output = run(&["--version"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("svmlearn"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}
