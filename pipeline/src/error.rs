use std::{error::Error, fmt, io};

use dataset::DatasetErr;
use inference::InferenceErr;

use crate::location::Location;

/// The pipeline module's result type.
pub type Result<T> = std::result::Result<T, PipelineErr>;

/// Whatever a training service reports back when an operation fails.
pub type ServiceErr = Box<dyn Error + Send + Sync>;

/// All errors that can occur while running a pipeline.
#[derive(Debug)]
pub enum PipelineErr {
    /// Invalid configuration, caught before anything is uploaded.
    InvalidConfig(String),
    Dataset(DatasetErr),
    /// Predictions and ground truth of different lengths.
    EvaluationMismatch {
        actual: usize,
        predicted: usize,
    },
    Inference(InferenceErr),
    /// Failed to read or write an object.
    Storage {
        location: Location,
        source: io::Error,
    },
    /// The training service failed an operation.
    Service {
        op: &'static str,
        source: ServiceErr,
    },
    Io(io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for PipelineErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Dataset(e) => write!(f, "dataset error: {e}"),
            Self::EvaluationMismatch { actual, predicted } => write!(
                f,
                "can't evaluate {predicted} predictions against {actual} ground truth labels"
            ),
            Self::Inference(e) => write!(f, "inference error: {e}"),
            Self::Storage { location, source } => write!(f, "storage error at {location}: {source}"),
            Self::Service { op, source } => write!(f, "service error during {op}: {source}"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl Error for PipelineErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Dataset(e) => Some(e),
            Self::Inference(e) => Some(e),
            Self::Storage { source, .. } => Some(source),
            Self::Service { source, .. } => Some(&**source),
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::InvalidConfig(_) | Self::EvaluationMismatch { .. } => None,
        }
    }
}

impl From<DatasetErr> for PipelineErr {
    fn from(e: DatasetErr) -> Self {
        Self::Dataset(e)
    }
}

impl From<InferenceErr> for PipelineErr {
    fn from(e: InferenceErr) -> Self {
        Self::Inference(e)
    }
}

impl From<io::Error> for PipelineErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for PipelineErr {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
