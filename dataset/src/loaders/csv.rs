use std::{collections::HashMap, fs, path::Path};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::{DatasetErr, Result},
    partition::Partition,
};

/// How to read a labeled CSV file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvOptions {
    /// The zero based column holding the label.
    #[serde(default)]
    pub label_column: usize,
    /// Whether the first non blank line is a header to skip.
    #[serde(default)]
    pub has_header: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            label_column: 0,
            has_header: false,
        }
    }
}

/// A partition read from CSV along with its class names.
///
/// When the label column isn't numeric every distinct label is mapped to a class
/// index, in order of first appearance, and `classes[i]` is the name of class `i`.
/// `classes` is empty for numeric labels.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvDataset {
    pub partition: Partition,
    pub classes: Vec<String>,
}

/// Parses labeled CSV text.
///
/// # Errors
/// `Parse` for lines with a missing label column or non numeric features,
/// `RaggedRow` if the rows have different widths.
pub fn parse_csv(text: &str, options: &CsvOptions) -> Result<CsvDataset> {
    let mut rows = Vec::new();
    let mut raw_labels = Vec::new();

    let mut reader = recordio::csv::reader(text.as_bytes(), options.has_header);
    for (n, record) in reader.records().enumerate() {
        let record = record?;
        let line_no = record
            .position()
            .map_or(n + 1, |p| p.line() as usize);

        let label = record
            .get(options.label_column)
            .ok_or_else(|| DatasetErr::Parse {
                line: line_no,
                msg: format!("missing label column {}", options.label_column),
            })?;

        let row = record
            .iter()
            .enumerate()
            .filter(|&(col, _)| col != options.label_column)
            .map(|(col, field)| {
                field.parse::<f32>().map_err(|e| DatasetErr::Parse {
                    line: line_no,
                    msg: format!("column {col}: {field:?} {e}"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        rows.push(row);
        raw_labels.push(label.to_string());
    }

    let (labels, classes) = resolve_labels(&raw_labels);
    let partition = Partition::from_rows(rows, labels)?;

    Ok(CsvDataset { partition, classes })
}

/// Loads labeled CSV from a file.
pub fn load_csv(path: &Path, options: &CsvOptions) -> Result<CsvDataset> {
    let text = fs::read_to_string(path)?;
    let dataset = parse_csv(&text, options)?;

    debug!(
        rows = dataset.partition.len(),
        dim = dataset.partition.dim(),
        classes = dataset.classes.len();
        "loaded csv from {}",
        path.display()
    );

    Ok(dataset)
}

/// Numeric labels are kept as is, anything else becomes a class index.
fn resolve_labels(raw: &[String]) -> (Vec<f32>, Vec<String>) {
    if let Ok(numeric) = raw
        .iter()
        .map(|l| l.parse::<f32>())
        .collect::<std::result::Result<Vec<_>, _>>()
    {
        return (numeric, Vec::new());
    }

    let mut classes: Vec<String> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    let labels = raw
        .iter()
        .map(|label| {
            let id = *index.entry(label.as_str()).or_insert_with(|| {
                classes.push(label.to_string());
                classes.len() - 1
            });
            id as f32
        })
        .collect();

    (labels, classes)
}
