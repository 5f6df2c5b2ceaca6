use std::io;

use bytes::{Bytes, BytesMut};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

use crate::{Deserialize, Record, Serialize, frames};

/// Rows decoded back from a dense RecordIO buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseRecords {
    pub features: Array2<f32>,
    pub labels: Option<Array1<f32>>,
}

/// Encodes a feature matrix, and optionally its labels, as dense RecordIO records.
///
/// Each row becomes one `Record` whose `values` feature holds the row and whose
/// `values` label holds the scalar label. Rows are encoded in parallel but written
/// in their original order.
///
/// # Arguments
/// * `features` - The N x D feature matrix.
/// * `labels` - The N labels, if the records should carry them.
///
/// # Returns
/// The encoded bytes, or an io error of kind `InvalidInput` if `labels` doesn't
/// have one entry per row.
pub fn encode_dense(
    features: ArrayView2<'_, f32>,
    labels: Option<ArrayView1<'_, f32>>,
) -> io::Result<Bytes> {
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

    let encoded = features
        .axis_iter(Axis(0))
        .into_par_iter()
        .enumerate()
        .map(|(i, row)| {
            let label = labels.map(|labels| labels[i]);
            let record = Record::dense(row.to_vec(), label);

            let mut frame = Vec::new();
            record.serialize(&mut frame)?;
            Ok(frame)
        })
        .collect::<io::Result<Vec<_>>>()?;

    let size = encoded.iter().map(Vec::len).sum();
    let mut buf = BytesMut::with_capacity(size);
    for frame in encoded {
        buf.extend_from_slice(&frame);
    }

    Ok(buf.freeze())
}

/// Decodes a buffer produced by [`encode_dense`].
///
/// # Returns
/// The feature matrix and the labels (if every record carries one), or an io error
/// of kind `InvalidData` if the frames are malformed, rows have different widths,
/// or only some of the records are labeled.
pub fn decode_dense(buf: &[u8]) -> io::Result<DenseRecords> {
    let invalid = |msg: String| io::Error::new(io::ErrorKind::InvalidData, msg);

    let mut width = None;
    let mut rows = 0;
    let mut values = Vec::new();
    let mut labels = Vec::new();

    for payload in frames(buf) {
        let record = Record::deserialize(payload?)?;

        let row = record
            .feature_values()
            .ok_or_else(|| invalid(format!("record {rows} has no dense feature values")))?;

        let expected = *width.get_or_insert(row.len());
        if row.len() != expected {
            return Err(invalid(format!(
                "record {rows} has {} features, expected {expected}",
                row.len()
            )));
        }
        values.extend_from_slice(row);

        match record.label_values() {
            Some(&[label]) => labels.push(label),
            Some(other) => {
                return Err(invalid(format!(
                    "record {rows} has a label of {} values, expected a scalar",
                    other.len()
                )));
            }
            None => {}
        }

        rows += 1;
    }

    let labels = match labels.len() {
        0 => None,
        n if n == rows => Some(Array1::from_vec(labels)),
        n => {
            return Err(invalid(format!(
                "only {n} of {rows} records carry a label"
            )));
        }
    };

    let features = Array2::from_shape_vec((rows, width.unwrap_or(0)), values)
        .map_err(|e| invalid(e.to_string()))?;

    Ok(DenseRecords { features, labels })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn encode_then_decode_keeps_rows_and_labels() {
        let features = array![[0.0, 0.5, 1.0], [2.0, 2.5, 3.0]];
        let labels = array![1.0, 0.0];

        let buf = encode_dense(features.view(), Some(labels.view())).unwrap();
        let decoded = decode_dense(&buf).unwrap();

        assert_eq!(decoded.features, features);
        assert_eq!(decoded.labels, Some(labels));
    }

    #[test]
    fn unlabeled_rows_decode_without_labels() {
        let features = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];

        let buf = encode_dense(features.view(), None).unwrap();
        let decoded = decode_dense(&buf).unwrap();

        assert_eq!(decoded.features, features);
        assert_eq!(decoded.labels, None);
    }

    #[test]
    fn encoding_is_deterministic() {
        let features = Array2::from_shape_fn((64, 8), |(i, j)| (i * 8 + j) as f32 / 7.0);
        let labels = Array1::from_shape_fn(64, |i| (i % 10) as f32);

        let a = encode_dense(features.view(), Some(labels.view())).unwrap();
        let b = encode_dense(features.view(), Some(labels.view())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn label_count_must_match_rows() {
        let features = array![[1.0], [2.0]];
        let labels = array![1.0];

        let err = encode_dense(features.view(), Some(labels.view())).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn ragged_records_are_rejected() {
        let mut buf = Vec::new();
        Record::dense(vec![1.0, 2.0], None).serialize(&mut buf).unwrap();
        Record::dense(vec![1.0], None).serialize(&mut buf).unwrap();

        let err = decode_dense(&buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn partially_labeled_records_are_rejected() {
        let mut buf = Vec::new();
        Record::dense(vec![1.0], Some(1.0)).serialize(&mut buf).unwrap();
        Record::dense(vec![2.0], None).serialize(&mut buf).unwrap();

        assert!(decode_dense(&buf).is_err());
    }

    #[test]
    fn transposed_views_encode_row_by_row() {
        let columns = array![[1.0, 3.0], [2.0, 4.0]];
        let rows = columns.t();

        let buf = encode_dense(rows, None).unwrap();
        let decoded = decode_dense(&buf).unwrap();
        assert_eq!(decoded.features, array![[1.0, 2.0], [3.0, 4.0]]);
    }
}
