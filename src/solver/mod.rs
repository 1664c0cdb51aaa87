//! SVM solver implementations
//!
//! The SMO solver works on any [`QMatrix`]; the classification and
//! regression Q matrices adapt a kernel (or a precomputed Gram matrix) to it.

pub mod qmatrix;
pub mod shrinking;
pub mod smo;

pub use self::qmatrix::*;
pub use self::smo::*;
