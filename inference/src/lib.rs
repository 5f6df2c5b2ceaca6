mod error;
mod extract;
mod partition;
mod predictions;
mod predictor;
mod runner;

pub use error::{InferenceErr, Result};
pub use extract::{Extractor, ScalarField, TextLines, VectorField};
pub use partition::{BatchPlan, batch_range};
pub use predictions::Predictions;
pub use predictor::{
    FnPredictor, Invoke, InvokePredictor, PredictErr, Predictor, Response, predictor_fn,
};
pub use runner::Runner;
