use std::{num::NonZeroUsize, ops::Range};

use crate::error::{InferenceErr, Result};

/// Splits `total` rows among `count` batches and returns the rows of batch `batch`.
///
/// Properties:
/// - Ranges are contiguous, disjoint and cover `[0..total)`.
/// - Sizes differ by at most 1, the first `total % count` batches take one extra row.
pub fn batch_range(total: usize, batch: usize, count: usize) -> Range<usize> {
    debug_assert!(count > 0);
    debug_assert!(batch < count);

    let base = total / count;
    let rem = total % count;

    let start = batch * base + batch.min(rem);
    let extra = usize::from(batch < rem);
    let end = start + base + extra;

    start..end
}

/// A partition of `total` rows into contiguous near equal batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    total: usize,
    count: NonZeroUsize,
}

impl BatchPlan {
    /// Creates a new `BatchPlan`.
    ///
    /// # Arguments
    /// * `total` - The amount of rows.
    /// * `count` - The amount of batches, between 1 and `total`.
    ///
    /// # Errors
    /// `EmptyInput` if there are no rows, `InvalidBatchCount` if `count` is out of range.
    pub fn new(total: usize, count: usize) -> Result<Self> {
        if total == 0 {
            return Err(InferenceErr::EmptyInput);
        }

        match NonZeroUsize::new(count) {
            Some(count) if count.get() <= total => Ok(Self { total, count }),
            _ => Err(InferenceErr::InvalidBatchCount { count, rows: total }),
        }
    }

    /// Uses as few batches as possible while keeping every batch at or under
    /// `max_rows` rows.
    pub fn with_batch_size(total: usize, max_rows: NonZeroUsize) -> Result<Self> {
        Self::new(total, total.div_ceil(max_rows.get()))
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    /// The amount of batches.
    #[inline]
    pub fn len(&self) -> usize {
        self.count.get()
    }

    /// Always false, a plan holds at least one batch.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The rows of batch `batch`.
    ///
    /// # Panics
    /// If `batch` is out of range.
    pub fn range(&self, batch: usize) -> Range<usize> {
        assert!(batch < self.len(), "batch {batch} out of range");
        batch_range(self.total, batch, self.len())
    }

    /// Every batch's rows, in order.
    pub fn ranges(&self) -> impl ExactSizeIterator<Item = Range<usize>> + '_ {
        (0..self.len()).map(|batch| batch_range(self.total, batch, self.len()))
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.ranges().map(|r| r.len()).collect()
    }
}
