//! LibSVM text format
//!
//! One sample per line: a label (class or regression target) followed by
//! `index:value` pairs with 1-based indices. Blank lines and lines starting
//! with `#` are skipped.
//!
//! ```text
//! 2 1:0.5 3:1.2 7:0.8
//! 0 2:0.3 5:2.1
//! ```

use crate::core::{Dataset, Result, SVMError, Sample, SparseVector};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Samples read from a LibSVM format file, labels kept as written
#[derive(Debug, Clone)]
pub struct LibSVMDataset {
    samples: Vec<Sample>,
    dimensions: usize,
}

impl LibSVMDataset {
    /// Load a dataset from a LibSVM format file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load a dataset from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut samples = Vec::new();
        let mut dimensions = 0;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(SVMError::IoError)?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let sample = Self::parse_line(line).map_err(|e| {
                SVMError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;
            dimensions = dimensions.max(sample.features.dim());
            samples.push(sample);
        }

        if samples.is_empty() {
            return Err(SVMError::EmptyDataset);
        }
        Ok(Self {
            samples,
            dimensions,
        })
    }

    /// Parse a single line in libsvm format
    fn parse_line(line: &str) -> Result<Sample> {
        let mut parts = line.split_whitespace();
        let label_str = parts
            .next()
            .ok_or_else(|| SVMError::ParseError("Empty line".to_string()))?;
        let label = label_str
            .parse::<f64>()
            .map_err(|_| SVMError::ParseError(format!("Invalid label: {label_str}")))?;

        let mut indices = Vec::new();
        let mut values = Vec::new();
        for feature_str in parts {
            let (index_str, value_str) = feature_str.split_once(':').ok_or_else(|| {
                SVMError::ParseError(format!("Invalid feature format: {feature_str}"))
            })?;
            let index = index_str.parse::<usize>().map_err(|_| {
                SVMError::ParseError(format!("Invalid feature index: {index_str}"))
            })?;
            let value = value_str.parse::<f64>().map_err(|_| {
                SVMError::ParseError(format!("Invalid feature value: {value_str}"))
            })?;
            if index == 0 {
                return Err(SVMError::ParseError(
                    "Feature index must be positive: 0".to_string(),
                ));
            }
            indices.push(index - 1);
            values.push(value);
        }

        Ok(Sample::new(SparseVector::new(indices, values), label))
    }

    /// Wrap samples that are already in memory
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        let dimensions = samples.iter().map(|s| s.features.dim()).max().unwrap_or(0);
        Self {
            samples,
            dimensions,
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
}

/// Write samples in LibSVM format, 1-based indices
pub fn write_libsvm<W: Write, D: Dataset + ?Sized>(writer: &mut W, dataset: &D) -> Result<()> {
    for i in 0..dataset.len() {
        let sample = dataset.get_sample(i);
        write!(writer, "{}", sample.label)?;
        for (&idx, &v) in sample.features.indices.iter().zip(&sample.features.values) {
            write!(writer, " {}:{}", idx + 1, v)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

impl Dataset for LibSVMDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn dim(&self) -> usize {
        self.dimensions
    }

    fn get_sample(&self, i: usize) -> Sample {
        self.samples[i].clone()
    }

    fn get_labels(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.label).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_line_basic() {
        let sample = LibSVMDataset::parse_line("+1 1:0.5 3:1.2").unwrap();

        assert_eq!(sample.label, 1.0);
        assert_eq!(sample.features.indices, vec![0, 2]); // 1-based to 0-based
        assert_eq!(sample.features.values, vec![0.5, 1.2]);
    }

    #[test]
    fn test_parse_line_keeps_labels() {
        assert_eq!(LibSVMDataset::parse_line("2 1:1.0").unwrap().label, 2.0);
        assert_eq!(LibSVMDataset::parse_line("-3 1:1.0").unwrap().label, -3.0);
        assert_eq!(LibSVMDataset::parse_line("0.25 4:1").unwrap().label, 0.25);
    }

    #[test]
    fn test_parse_line_unsorted_indices() {
        let sample = LibSVMDataset::parse_line("0 5:2.0 2:1.0").unwrap();
        assert_eq!(sample.features.indices, vec![1, 4]);
        assert_eq!(sample.features.values, vec![1.0, 2.0]);
    }

    #[test]
    fn test_parse_line_invalid_format() {
        assert!(LibSVMDataset::parse_line("+1 1").is_err());
        assert!(LibSVMDataset::parse_line("+1 abc:1.0").is_err());
        assert!(LibSVMDataset::parse_line("+1 1:abc").is_err());
        assert!(LibSVMDataset::parse_line("x 1:1.0").is_err());
        // libsvm indices are 1-based
        assert!(LibSVMDataset::parse_line("+1 0:1.0").is_err());
    }

    #[test]
    fn test_from_reader_basic() {
        let dataset = LibSVMDataset::from_reader(Cursor::new("+1 1:0.5 3:1.2\n-1 2:0.3 5:2.1\n")).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.dim(), 5);
        assert_eq!(dataset.get_sample(0).features.indices, vec![0, 2]);
        assert_eq!(dataset.get_sample(1).features.indices, vec![1, 4]);
        assert_eq!(dataset.gamma(), 0.2);
    }

    #[test]
    fn test_from_reader_empty_lines_and_comments() {
        let data = "# Comment line\n1 1:0.5\n\n# Another comment\n3 2:0.3\n";
        let dataset = LibSVMDataset::from_reader(Cursor::new(data)).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.get_labels(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_from_reader_reports_line_number() {
        let err = LibSVMDataset::from_reader(Cursor::new("1 1:0.5\n1 1:oops\n")).unwrap_err();
        match err {
            SVMError::ParseError(msg) => assert!(msg.contains("line 2")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_reader_empty_dataset() {
        let result = LibSVMDataset::from_reader(Cursor::new("# Only comments\n\n"));
        assert!(matches!(result, Err(SVMError::EmptyDataset)));
    }

    #[test]
    fn test_write_then_read_back() {
        let dataset = LibSVMDataset::from_reader(Cursor::new("2 1:0.5 3:1.5\n-1 2:4\n")).unwrap();
        let mut out = Vec::new();
        write_libsvm(&mut out, &dataset).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "2 1:0.5 3:1.5\n-1 2:4\n");
    }

    #[test]
    fn test_large_dimension_handling() {
        let data = "+1 1:1.0 1000:2.0 5000:3.0\n-1 2:1.0 500:2.0\n";
        let dataset = LibSVMDataset::from_reader(Cursor::new(data)).unwrap();

        assert_eq!(dataset.dim(), 5000);
        assert_eq!(dataset.get_sample(0).features.indices, vec![0, 999, 4999]);
    }

    #[test]
    fn test_from_file() {
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "1 1:0.5 3:1.2").expect("Failed to write");
        writeln!(temp_file, "2 2:0.3 5:2.1").expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        let dataset = LibSVMDataset::from_file(temp_file.path()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.get_labels(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_from_file_io_error() {
        let result = LibSVMDataset::from_file("/non/existent/file.libsvm");
        assert!(matches!(result, Err(SVMError::IoError(_))));
    }
}
