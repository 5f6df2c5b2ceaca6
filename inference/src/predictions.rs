use std::{ops::Index, str::FromStr};

use ndarray::Array2;

use crate::error::{InferenceErr, Result};

/// One result per input row, `predictions[i]` belongs to `features[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions<T> {
    values: Vec<T>,
}

impl<T> Predictions<T> {
    pub fn new(values: Vec<T>) -> Self {
        Self { values }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<T> {
        self.values
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Predictions<U> {
        Predictions::new(self.values.into_iter().map(f).collect())
    }
}

impl Predictions<String> {
    /// Parses textual results, such as the lines a custom container replies with.
    ///
    /// # Returns
    /// The parsed values or the first row that failed to parse, with its text.
    pub fn parse<U: FromStr>(&self) -> std::result::Result<Predictions<U>, (usize, String)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, s)| s.parse().map_err(|_| (i, s.clone())))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Predictions::new)
    }
}

impl Predictions<Vec<f32>> {
    /// Stacks the vector results into an N x K matrix, one row per input row.
    ///
    /// # Errors
    /// `RaggedResult` if the vectors have different lengths.
    pub fn to_matrix(&self) -> Result<Array2<f32>> {
        let k = self.values.first().map_or(0, Vec::len);

        let mut flat = Vec::with_capacity(self.values.len() * k);
        for (row, values) in self.values.iter().enumerate() {
            if values.len() != k {
                return Err(InferenceErr::RaggedResult {
                    row,
                    got: values.len(),
                    expected: k,
                });
            }
            flat.extend_from_slice(values);
        }

        Array2::from_shape_vec((self.values.len(), k), flat).map_err(|_| {
            InferenceErr::RaggedResult {
                row: 0,
                got: 0,
                expected: k,
            }
        })
    }

    /// The K x N transpose of `to_matrix`, one row per result component.
    pub fn transposed(&self) -> Result<Array2<f32>> {
        Ok(self.to_matrix()?.reversed_axes().as_standard_layout().into_owned())
    }
}

impl<T> Index<usize> for Predictions<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.values[index]
    }
}

impl<T> IntoIterator for Predictions<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Predictions<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl<T> From<Vec<T>> for Predictions<T> {
    fn from(values: Vec<T>) -> Self {
        Self::new(values)
    }
}
