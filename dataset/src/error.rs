use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used in the entire dataset module.
pub type Result<T> = std::result::Result<T, DatasetErr>;

/// The dataset module's error type.
#[derive(Debug)]
pub enum DatasetErr {
    ShapeMismatch {
        features: usize,
        labels: usize,
    },
    EmptyInput,
    RaggedRow {
        row: usize,
        got: usize,
        expected: usize,
    },
    Parse {
        line: usize,
        msg: String,
    },
    InvalidFormat(String),
    InvalidSplit(String),
    Io(io::Error),
}

impl Display for DatasetErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetErr::ShapeMismatch { features, labels } => write!(
                f,
                "There's a shape mismatch between features and labels, got {features} feature rows and {labels} labels"
            ),
            DatasetErr::EmptyInput => write!(f, "The input has no rows"),
            DatasetErr::RaggedRow { row, got, expected } => write!(
                f,
                "Row {row} has {got} features, expected {expected} like the previous rows"
            ),
            DatasetErr::Parse { line, msg } => write!(f, "Failed to parse line {line}: {msg}"),
            DatasetErr::InvalidFormat(msg) => write!(f, "Invalid dataset format: {msg}"),
            DatasetErr::InvalidSplit(msg) => write!(f, "Invalid dataset split: {msg}"),
            DatasetErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for DatasetErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DatasetErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DatasetErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for DatasetErr {
    fn from(value: csv::Error) -> Self {
        let line = value.position().map_or(0, |p| p.line() as usize);
        Self::Parse {
            line,
            msg: value.to_string(),
        }
    }
}
