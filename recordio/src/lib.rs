//! Wire formats understood by the training and hosting platform.
//!
//! The main format is RecordIO framing around protobuf `Record` messages holding
//! dense `f32` tensors, one record per example. CSV rows and newline-delimited text
//! cover the custom container contract.

mod codec;
mod content;
pub mod csv;
mod dense;
mod frame;
pub mod record;
pub mod text;

pub use codec::{Deserialize, Serialize};
pub use content::ContentType;
pub use dense::{DenseRecords, decode_dense, encode_dense};
pub use frame::{Frames, MAGIC, MAX_FRAME_LEN, frames, write_frame};
pub use record::Record;

/// The key under which dense features and labels are stored inside a `Record`.
pub const VALUES_KEY: &str = "values";
