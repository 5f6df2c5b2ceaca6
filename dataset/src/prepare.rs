use std::io::{self, Cursor};

use bytes::Bytes;
use log::debug;
use ndarray::{Array1, ArrayView1, ArrayView2};
use recordio::ContentType;

use crate::{
    error::{DatasetErr, Result},
    partition::Partition,
    remap::binary_remap,
};

/// The layout a `WireBuffer` is encoded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireFormat {
    /// RecordIO framed protobuf records with dense `f32` tensors.
    RecordIo,
    /// Headerless CSV with the label, if any, in the first column.
    Csv,
}

impl WireFormat {
    pub fn content_type(&self) -> ContentType {
        match self {
            Self::RecordIo => ContentType::RecordIoProtobuf,
            Self::Csv => ContentType::Csv,
        }
    }
}

/// An encoded dataset ready to be uploaded.
///
/// The bytes are immutable and every reader handed out starts at offset 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireBuffer {
    bytes: Bytes,
    format: WireFormat,
    rows: usize,
}

impl WireBuffer {
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The amount of examples encoded.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn format(&self) -> WireFormat {
        self.format
    }

    #[inline]
    pub fn content_type(&self) -> ContentType {
        self.format.content_type()
    }

    /// A reader positioned at the start of the buffer.
    pub fn reader(&self) -> impl io::Read + '_ {
        Cursor::new(self.as_bytes())
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// Turns feature matrices and labels into `WireBuffer`s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preparer {
    format: WireFormat,
    target_class: Option<f32>,
}

impl Preparer {
    /// Creates a new `Preparer` that passes labels through unchanged.
    ///
    /// # Arguments
    /// * `format` - The layout of the buffers it prepares.
    pub fn new(format: WireFormat) -> Self {
        Self {
            format,
            target_class: None,
        }
    }

    /// Remaps labels to 1 for `class` and 0 otherwise before encoding.
    pub fn target_class(mut self, class: f32) -> Self {
        self.target_class = Some(class);
        self
    }

    /// Same as `target_class` but taking an optional class.
    pub fn with_target_class(mut self, class: Option<f32>) -> Self {
        self.target_class = class;
        self
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Encodes `features`, and `labels` if given, into a new buffer.
    ///
    /// # Arguments
    /// * `features` - The N x D feature matrix.
    /// * `labels` - One label per row, if the buffer should carry them.
    ///
    /// # Errors
    /// `EmptyInput` if there are no rows, `ShapeMismatch` if there isn't exactly one
    /// label per row.
    pub fn prepare(
        &self,
        features: ArrayView2<'_, f32>,
        labels: Option<ArrayView1<'_, f32>>,
    ) -> Result<WireBuffer> {
        let rows = features.nrows();
        if rows == 0 {
            return Err(DatasetErr::EmptyInput);
        }

        if let Some(labels) = labels {
            if labels.len() != rows {
                return Err(DatasetErr::ShapeMismatch {
                    features: rows,
                    labels: labels.len(),
                });
            }
        }

        let remapped: Option<Array1<f32>> = match (labels, self.target_class) {
            (Some(labels), Some(target)) => Some(binary_remap(labels, target)),
            _ => None,
        };
        let labels = remapped.as_ref().map(|l| l.view()).or(labels);

        let bytes = match self.format {
            WireFormat::RecordIo => recordio::encode_dense(features, labels)?,
            WireFormat::Csv => Bytes::from(recordio::csv::write_rows(features, labels)?),
        };

        debug!(
            rows = rows,
            bytes = bytes.len(),
            content_type = self.format.content_type().as_str();
            "prepared wire buffer"
        );

        Ok(WireBuffer {
            bytes,
            format: self.format,
            rows,
        })
    }

    /// Encodes a partition's features and labels.
    pub fn prepare_partition(&self, partition: &Partition) -> Result<WireBuffer> {
        self.prepare(partition.features(), Some(partition.labels()))
    }

    /// Encodes features alone, for algorithms that don't learn from labels.
    pub fn prepare_features(&self, features: ArrayView2<'_, f32>) -> Result<WireBuffer> {
        self.prepare(features, None)
    }
}

/// Encodes `features` and optional `labels` as RecordIO dense records, remapping
/// the labels to a binary target first if `target_class` is given.
pub fn prepare(
    features: ArrayView2<'_, f32>,
    labels: Option<ArrayView1<'_, f32>>,
    target_class: Option<f32>,
) -> Result<WireBuffer> {
    Preparer::new(WireFormat::RecordIo)
        .with_target_class(target_class)
        .prepare(features, labels)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use ndarray::{Array2, array};

    #[test]
    fn empty_input_produces_no_buffer() {
        let features = Array2::<f32>::zeros((0, 784));
        let labels = Array1::<f32>::zeros(0);

        let err = prepare(features.view(), Some(labels.view()), None).unwrap_err();
        assert!(matches!(err, DatasetErr::EmptyInput));
    }

    #[test]
    fn label_count_must_match_rows() {
        let features = array![[1.0, 2.0], [3.0, 4.0]];
        let labels = array![1.0, 2.0, 3.0];

        let err = prepare(features.view(), Some(labels.view()), None).unwrap_err();
        assert!(matches!(
            err,
            DatasetErr::ShapeMismatch {
                features: 2,
                labels: 3
            }
        ));
    }

    #[test]
    fn target_class_remaps_before_encoding() {
        let features = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let labels = array![3.0, 1.0, 3.0, 7.0, 3.0];

        let buffer = prepare(features.view(), Some(labels.view()), Some(3.0)).unwrap();
        let decoded = recordio::decode_dense(buffer.as_bytes()).unwrap();

        assert_eq!(decoded.labels, Some(array![1.0, 0.0, 1.0, 0.0, 1.0]));
        assert_eq!(decoded.features, features);
        assert_eq!(buffer.rows(), 5);
        assert_eq!(buffer.content_type(), ContentType::RecordIoProtobuf);
    }

    #[test]
    fn preparing_twice_is_byte_identical() {
        let features = Array2::from_shape_fn((50, 784), |(i, j)| ((i * j) % 256) as f32 / 255.0);
        let labels = Array1::from_shape_fn(50, |i| (i % 10) as f32);

        let a = prepare(features.view(), Some(labels.view()), Some(0.0)).unwrap();
        let b = prepare(features.view(), Some(labels.view()), Some(0.0)).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn reader_always_starts_at_the_beginning() {
        let features = array![[1.0, 2.0]];
        let buffer = prepare(features.view(), None, None).unwrap();

        let mut first = Vec::new();
        buffer.reader().read_to_end(&mut first).unwrap();
        let mut second = Vec::new();
        buffer.reader().read_to_end(&mut second).unwrap();

        assert_eq!(first, buffer.as_bytes());
        assert_eq!(first, second);
    }

    #[test]
    fn csv_format_puts_label_first() {
        let partition = Partition::new(array![[0.5, 1.0], [2.0, 3.0]], array![2.0, 0.0]).unwrap();
        let buffer = Preparer::new(WireFormat::Csv)
            .prepare_partition(&partition)
            .unwrap();

        assert_eq!(buffer.as_bytes(), b"2,0.5,1\n0,2,3\n");
        assert_eq!(buffer.content_type(), ContentType::Csv);
    }

    #[test]
    fn features_only_buffer_has_no_labels() {
        let features = array![[1.0], [2.0]];
        let buffer = Preparer::new(WireFormat::RecordIo)
            .target_class(1.0)
            .prepare_features(features.view())
            .unwrap();

        let decoded = recordio::decode_dense(buffer.as_bytes()).unwrap();
        assert_eq!(decoded.labels, None);
    }
}
