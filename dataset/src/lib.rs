//! Labeled datasets and their preparation for upload.
//!
//! A `Dataset` holds train, validation and test `Partition`s. The `Preparer`
//! encodes a partition into a `WireBuffer` in the layout the training platform
//! reads, optionally collapsing the labels into a binary target first.

mod dataset;
pub mod error;
pub mod loaders;
mod partition;
mod prepare;
mod remap;

pub use dataset::{Dataset, PartitionKind, SplitSpec};
pub use error::{DatasetErr, Result};
pub use partition::Partition;
pub use prepare::{Preparer, WireBuffer, WireFormat, prepare};
pub use remap::binary_remap;
