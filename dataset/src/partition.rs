use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::{
    error::{DatasetErr, Result},
    remap::binary_remap,
};

/// A feature matrix with one label per row.
///
/// Invariants:
/// - `features.nrows() == labels.len()`
/// - row `i` of the features is described by `labels[i]`, the order is never changed
///   unless explicitly asked for with `select`.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    features: Array2<f32>,
    labels: Array1<f32>,
}

impl Partition {
    /// Creates a new partition from owned arrays.
    ///
    /// # Errors
    /// `ShapeMismatch` if there isn't exactly one label per feature row.
    pub fn new(features: Array2<f32>, labels: Array1<f32>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(DatasetErr::ShapeMismatch {
                features: features.nrows(),
                labels: labels.len(),
            });
        }

        Ok(Self { features, labels })
    }

    /// Creates a new partition from row vectors.
    ///
    /// # Errors
    /// `RaggedRow` if a row's width differs from the first row's, `ShapeMismatch` if
    /// there isn't exactly one label per row.
    pub fn from_rows(rows: Vec<Vec<f32>>, labels: Vec<f32>) -> Result<Self> {
        if rows.len() != labels.len() {
            return Err(DatasetErr::ShapeMismatch {
                features: rows.len(),
                labels: labels.len(),
            });
        }

        let dim = rows.first().map(Vec::len).unwrap_or(0);
        let mut flat = Vec::with_capacity(rows.len() * dim);

        for (row, values) in rows.iter().enumerate() {
            if values.len() != dim {
                return Err(DatasetErr::RaggedRow {
                    row,
                    got: values.len(),
                    expected: dim,
                });
            }
            flat.extend_from_slice(values);
        }

        let features = Array2::from_shape_vec((rows.len(), dim), flat)
            .map_err(|e| DatasetErr::InvalidFormat(e.to_string()))?;

        Self::new(features, Array1::from_vec(labels))
    }

    /// An empty partition whose rows would have `dim` features.
    pub fn empty(dim: usize) -> Self {
        Self {
            features: Array2::zeros((0, dim)),
            labels: Array1::zeros(0),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The amount of features per row.
    #[inline]
    pub fn dim(&self) -> usize {
        self.features.ncols()
    }

    #[inline]
    pub fn features(&self) -> ArrayView2<'_, f32> {
        self.features.view()
    }

    #[inline]
    pub fn labels(&self) -> ArrayView1<'_, f32> {
        self.labels.view()
    }

    pub fn into_parts(self) -> (Array2<f32>, Array1<f32>) {
        (self.features, self.labels)
    }

    /// Returns a new partition made of the rows at `indices`, in that order.
    ///
    /// # Panics
    /// If any index is out of bounds.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
        }
    }

    /// Returns a copy of this partition whose labels are 1 for `target` and 0 otherwise.
    pub fn remap_labels(&self, target: f32) -> Self {
        Self {
            features: self.features.clone(),
            labels: binary_remap(self.labels.view(), target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn partition_basic() {
        let p = Partition::new(array![[1.0, 2.0], [3.0, 4.0]], array![0.0, 1.0]).unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(p.dim(), 2);
        assert!(!p.is_empty());
    }

    #[test]
    fn rejects_label_count_mismatch() {
        let err = Partition::new(array![[1.0], [2.0]], array![0.0]).unwrap_err();
        assert!(matches!(
            err,
            DatasetErr::ShapeMismatch {
                features: 2,
                labels: 1
            }
        ));
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let err = Partition::from_rows(vec![vec![1.0, 2.0], vec![3.0]], vec![0.0, 1.0]).unwrap_err();
        assert!(matches!(
            err,
            DatasetErr::RaggedRow {
                row: 1,
                got: 1,
                expected: 2
            }
        ));
    }

    #[test]
    fn select_keeps_rows_and_labels_aligned() {
        let p = Partition::from_rows(
            vec![vec![0.0], vec![10.0], vec![20.0]],
            vec![0.0, 1.0, 2.0],
        )
        .unwrap();

        let s = p.select(&[2, 0]);
        assert_eq!(s.features(), array![[20.0], [0.0]]);
        assert_eq!(s.labels(), array![2.0, 0.0]);
    }

    #[test]
    fn remap_labels_keeps_features() {
        let p = Partition::new(array![[1.0], [2.0], [3.0]], array![3.0, 1.0, 3.0]).unwrap();
        let r = p.remap_labels(3.0);

        assert_eq!(r.features(), p.features());
        assert_eq!(r.labels(), array![1.0, 0.0, 1.0]);
    }
}
