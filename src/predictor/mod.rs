//! Decision-function evaluators
//!
//! Trained parameters can be evaluated two ways. [`NativePredictor`] walks
//! the shared support vector list once and sums per class block.
//! [`ReferencePredictor`] keeps an independent expansion per decision
//! function, which is what allows it to be compacted.

mod native;
mod reference;

pub use native::NativePredictor;
pub use reference::ReferencePredictor;

use crate::core::{PredictorBackend, Predictor};
use crate::kernel::Kernel;
use crate::optimizer::TrainedParameters;
use std::sync::Arc;

/// Build the evaluator for `backend`
pub fn build_predictor<K: Kernel + ?Sized + 'static>(
    backend: PredictorBackend,
    kernel: Arc<K>,
    params: Arc<TrainedParameters>,
) -> Box<dyn Predictor> {
    match backend {
        PredictorBackend::Native => Box::new(NativePredictor::new(kernel, params)),
        PredictorBackend::Reference => Box::new(ReferencePredictor::new(kernel, params)),
    }
}
