use ndarray::{Array1, ArrayView1};

/// Collapses a multi-class label vector into a {0, 1} indicator of `target`.
///
/// The output has the same length as `labels` and `out[i] == 1.0` iff
/// `labels[i] == target`.
pub fn binary_remap(labels: ArrayView1<'_, f32>, target: f32) -> Array1<f32> {
    labels.mapv(|label| if label == target { 1.0 } else { 0.0 })
}
