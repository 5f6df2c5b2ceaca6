//! Headerless numeric CSV, the row format of the custom container.

use std::io;

use csv::{ReaderBuilder, Trim, WriterBuilder};
use ndarray::{ArrayView1, ArrayView2, Axis};

/// A CSV reader that trims fields, skips blank lines and allows rows of any
/// width, so callers can report ragged rows themselves.
pub fn reader<R: io::Read>(rdr: R, has_header: bool) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(has_header)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(rdr)
}

/// Writes one line per row, with the label (if any) as the first column.
///
/// # Arguments
/// * `features` - The N x D feature matrix.
/// * `labels` - The N labels, if they should lead each line.
///
/// # Returns
/// The CSV text, or an io error of kind `InvalidInput` if `labels` doesn't have
/// one entry per row.
pub fn write_rows(
    features: ArrayView2<'_, f32>,
    labels: Option<ArrayView1<'_, f32>>,
) -> io::Result<String> {
    if let Some(labels) = labels {
        if labels.len() != features.nrows() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "got {} labels for {} feature rows",
                    labels.len(),
                    features.nrows()
                ),
            ));
        }
    }

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    for (i, row) in features.axis_iter(Axis(0)).enumerate() {
        let label = labels.map(|labels| labels[i]);
        writer.write_record(
            label
                .into_iter()
                .chain(row.iter().copied())
                .map(|value| value.to_string()),
        )?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Parses numeric CSV text into rows, skipping blank lines.
///
/// # Returns
/// The parsed rows, or an io error of kind `InvalidData` naming the line and field
/// that isn't a number.
pub fn parse_rows(text: &str) -> io::Result<Vec<Vec<f32>>> {
    let mut rows = Vec::new();

    for (n, record) in reader(text.as_bytes(), false).records().enumerate() {
        let record = record?;
        let line = record.position().map_or(n as u64 + 1, |p| p.line());

        let row = record
            .iter()
            .enumerate()
            .map(|(col, field)| {
                field.parse::<f32>().map_err(|e| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("line {line}, column {col}: {field:?} {e}"),
                    )
                })
            })
            .collect::<io::Result<Vec<_>>>()?;
        rows.push(row);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn label_leads_each_line() {
        let features = array![[0.5, 1.0], [2.0, 3.25]];
        let labels = array![1.0, 0.0];

        let text = write_rows(features.view(), Some(labels.view())).unwrap();
        assert_eq!(text, "1,0.5,1\n0,2,3.25\n");
    }

    #[test]
    fn features_only() {
        let features = array![[1.5, -2.0]];
        let text = write_rows(features.view(), None).unwrap();
        assert_eq!(text, "1.5,-2\n");
    }

    #[test]
    fn parse_skips_blank_lines_and_trims() {
        let rows = parse_rows("1, 2,3\n\n 4,\"5\",6\r\n").unwrap();
        assert_eq!(rows, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    }

    #[test]
    fn quoted_fields_keep_their_commas() {
        let mut rdr = reader("\"a, b\",1\n".as_bytes(), false);
        let record = rdr.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "a, b");
        assert_eq!(&record[1], "1");
    }

    #[test]
    fn parse_reports_line_of_bad_field() {
        let err = parse_rows("1,2\n3,x\n").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("line 2"));
    }
}
