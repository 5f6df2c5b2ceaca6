//! The traits every framed wire message implements.

use std::io;

use bytes::BufMut;

/// Writes `self` as one complete frame at the end of `buf`.
pub trait Serialize {
    fn serialize<B: BufMut>(&self, buf: &mut B) -> io::Result<()>;
}

/// Reads `Self` back from the payload of a single frame, as yielded by `frames`.
///
/// The lifetime lets implementors borrow from the payload instead of copying it.
pub trait Deserialize<'a>: Sized {
    fn deserialize(payload: &'a [u8]) -> io::Result<Self>;
}
