use std::fmt;

use log::debug;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{
    error::{DatasetErr, Result},
    partition::Partition,
};

/// Which of the three disjoint partitions of a `Dataset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionKind {
    Train,
    Validation,
    Test,
}

impl PartitionKind {
    pub const ALL: [PartitionKind; 3] = [Self::Train, Self::Validation, Self::Test];

    /// The name used for this partition as a training channel.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Validation => "validation",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How to carve validation and test partitions out of a single labeled set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitSpec {
    /// Fraction of the rows going to the validation partition.
    #[serde(default)]
    pub validation: f32,
    /// Fraction of the rows going to the test partition.
    #[serde(default)]
    pub test: f32,
    /// Shuffles the rows before splitting.
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
    pub seed: Option<u64>,
}

fn default_shuffle() -> bool {
    true
}

impl SplitSpec {
    fn validate(&self) -> Result<()> {
        for (name, fraction) in [("validation", self.validation), ("test", self.test)] {
            if !(0.0..1.0).contains(&fraction) {
                return Err(DatasetErr::InvalidSplit(format!(
                    "{name} fraction must be in [0, 1), got {fraction}"
                )));
            }
        }

        if self.validation + self.test >= 1.0 {
            return Err(DatasetErr::InvalidSplit(format!(
                "validation + test fractions must leave rows for training, got {}",
                self.validation + self.test
            )));
        }

        Ok(())
    }
}

/// A labeled dataset made of three disjoint partitions sharing the same row width.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub train: Partition,
    pub validation: Partition,
    pub test: Partition,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Errors
    /// `InvalidFormat` if the non empty partitions have different row widths, or
    /// `EmptyInput` if the training partition has no rows.
    pub fn new(train: Partition, validation: Partition, test: Partition) -> Result<Self> {
        if train.is_empty() {
            return Err(DatasetErr::EmptyInput);
        }

        for (kind, partition) in [
            (PartitionKind::Validation, &validation),
            (PartitionKind::Test, &test),
        ] {
            if !partition.is_empty() && partition.dim() != train.dim() {
                return Err(DatasetErr::InvalidFormat(format!(
                    "{kind} rows have {} features but train rows have {}",
                    partition.dim(),
                    train.dim()
                )));
            }
        }

        Ok(Self {
            train,
            validation,
            test,
        })
    }

    /// Splits a single labeled set into train, validation and test partitions.
    ///
    /// # Arguments
    /// * `all` - Every labeled row available.
    /// * `spec` - The fractions, and whether and how to shuffle.
    ///
    /// # Returns
    /// A new dataset or an error if the split leaves no training rows.
    pub fn split(all: Partition, spec: SplitSpec) -> Result<Self> {
        spec.validate()?;

        let n = all.len();
        let n_validation = (n as f32 * spec.validation).round() as usize;
        let n_test = (n as f32 * spec.test).round() as usize;

        if n_validation + n_test >= n {
            return Err(DatasetErr::InvalidSplit(format!(
                "{n} rows can't hold {n_validation} validation and {n_test} test rows plus training rows"
            )));
        }

        let indices = row_order(n, spec.shuffle, spec.seed);
        let (train_idx, rest) = indices.split_at(n - n_validation - n_test);
        let (validation_idx, test_idx) = rest.split_at(n_validation);

        debug!(
            train = train_idx.len(),
            validation = validation_idx.len(),
            test = test_idx.len();
            "split dataset"
        );

        Self::new(
            all.select(train_idx),
            all.select(validation_idx),
            all.select(test_idx),
        )
    }

    /// Builds a dataset from an already separated train and test set, carving the
    /// validation partition out of the training rows.
    pub fn from_train_test(
        train: Partition,
        test: Partition,
        validation: f32,
        seed: Option<u64>,
    ) -> Result<Self> {
        let spec = SplitSpec {
            validation,
            test: 0.0,
            shuffle: true,
            seed,
        };

        let Self {
            train, validation, ..
        } = Self::split(train, spec)?;

        Self::new(train, validation, test)
    }

    /// The amount of features per row.
    pub fn dim(&self) -> usize {
        self.train.dim()
    }

    pub fn get(&self, kind: PartitionKind) -> &Partition {
        match kind {
            PartitionKind::Train => &self.train,
            PartitionKind::Validation => &self.validation,
            PartitionKind::Test => &self.test,
        }
    }

    /// Returns a copy where every partition's labels indicate membership of `target`.
    pub fn remap_labels(&self, target: f32) -> Self {
        Self {
            train: self.train.remap_labels(target),
            validation: self.validation.remap_labels(target),
            test: self.test.remap_labels(target),
        }
    }
}

/// The order in which rows are dealt into partitions.
fn row_order(n: usize, shuffle: bool, seed: Option<u64>) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();

    if shuffle {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        indices.shuffle(&mut rng);
    }

    indices
}
