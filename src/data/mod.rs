//! Datasets and file formats
//!
//! In-memory datasets for training and prediction live in [`dataset`];
//! [`precomputed`] adds the Gram-matrix-backed variant. The LibSVM and CSV
//! loaders read labelled samples from text files.

pub mod csv;
pub mod dataset;
pub mod libsvm;
pub mod precomputed;

pub use self::csv::*;
pub use self::dataset::*;
pub use self::libsvm::*;
pub use self::precomputed::*;
