use std::{error::Error, fmt, io, ops::Range};

use crate::predictor::PredictErr;

/// The inference module's result type.
pub type Result<T> = std::result::Result<T, InferenceErr>;

/// Batched inference failures.
#[derive(Debug)]
pub enum InferenceErr {
    /// There are no rows to predict.
    EmptyInput,
    InvalidBatchCount {
        count: usize,
        rows: usize,
    },
    /// A batch plan built for a different number of rows.
    PlanMismatch {
        planned: usize,
        rows: usize,
    },
    /// The predictor failed on a batch, the whole run is aborted.
    BatchCallFailed {
        batch: usize,
        rows: Range<usize>,
        source: PredictErr,
    },
    /// A response didn't carry the expected result field.
    MalformedResponse {
        batch: usize,
        msg: String,
    },
    RowCountMismatch {
        batch: usize,
        got: usize,
        expected: usize,
    },
    /// Vector results of different lengths can't be reshaped into a matrix.
    RaggedResult {
        row: usize,
        got: usize,
        expected: usize,
    },
}

impl fmt::Display for InferenceErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceErr::EmptyInput => write!(f, "there are no rows to predict"),
            InferenceErr::InvalidBatchCount { count, rows } => {
                write!(f, "can't split {rows} rows into {count} batches")
            }
            InferenceErr::PlanMismatch { planned, rows } => write!(
                f,
                "the batch plan covers {planned} rows but there are {rows} to predict"
            ),
            InferenceErr::BatchCallFailed { batch, rows, source } => write!(
                f,
                "prediction for batch {batch} (rows {}..{}) failed: {source}",
                rows.start, rows.end
            ),
            InferenceErr::MalformedResponse { batch, msg } => {
                write!(f, "malformed response for batch {batch}: {msg}")
            }
            InferenceErr::RowCountMismatch {
                batch,
                got,
                expected,
            } => write!(
                f,
                "row count mismatch for batch {batch}: got {got}, expected {expected}"
            ),
            InferenceErr::RaggedResult { row, got, expected } => write!(
                f,
                "ragged result at row {row}: got {got} values, expected {expected}"
            ),
        }
    }
}

impl Error for InferenceErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InferenceErr::BatchCallFailed { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

impl From<InferenceErr> for io::Error {
    fn from(value: InferenceErr) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, value)
    }
}
