//! RecordIO framing.
//!
//! Every frame is laid out as:
//! ```text
//! bytes 0-3:  MAGIC                      (little-endian u32)
//! bytes 4-7:  cflag << 29 | payload len  (little-endian u32)
//! bytes 8..:  payload, zero padded to a multiple of 4 bytes
//! ```
//! Only whole records (`cflag == 0`) are written or accepted.

use std::io;

use bytes::BufMut;

type Header = u32;
const HEADER_SIZE: usize = size_of::<Header>();

/// The magic number opening every RecordIO frame.
pub const MAGIC: u32 = 0xced7_230a;

/// The largest payload a single frame can carry, the length field has 29 bits.
pub const MAX_FRAME_LEN: usize = (1 << 29) - 1;

const LEN_MASK: u32 = MAX_FRAME_LEN as u32;

/// Returns the amount of zero bytes needed after a payload of `len` bytes.
fn padding(len: usize) -> usize {
    len.next_multiple_of(4) - len
}

/// Appends `payload` to `buf` as a single RecordIO frame.
///
/// # Arguments
/// * `buf` - Where to write the frame.
/// * `payload` - The bytes of the record.
///
/// # Returns
/// An io error of kind `InvalidInput` if the payload doesn't fit in a frame.
pub fn write_frame<B: BufMut>(buf: &mut B, payload: &[u8]) -> io::Result<()> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "record of {} bytes exceeds the maximum frame size of {MAX_FRAME_LEN} bytes",
                payload.len()
            ),
        ));
    }

    buf.put_u32_le(MAGIC);
    buf.put_u32_le(payload.len() as u32);
    buf.put_slice(payload);
    buf.put_bytes(0, padding(payload.len()));
    Ok(())
}

/// Iterates over the payloads of consecutive frames inside a byte slice.
pub fn frames(buf: &[u8]) -> Frames<'_> {
    Frames { buf, offset: 0 }
}

/// An iterator over RecordIO frame payloads, created by [`frames`].
///
/// Yields an `InvalidData` error and then stops on the first malformed frame.
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Frames<'a> {
    /// The byte offset of the next frame.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn fail<T>(&mut self, msg: String) -> Option<io::Result<T>> {
        let offset = self.offset;
        self.offset = self.buf.len();
        Some(Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{msg} at offset {offset}"),
        )))
    }

    fn read_header(&self, at: usize) -> Header {
        let mut bytes = [0; HEADER_SIZE];
        bytes.copy_from_slice(&self.buf[at..at + HEADER_SIZE]);
        Header::from_le_bytes(bytes)
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = io::Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.buf.len() - self.offset;
        if remaining == 0 {
            return None;
        }

        if remaining < 2 * HEADER_SIZE {
            return self.fail(format!("truncated frame header of {remaining} bytes"));
        }

        let magic = self.read_header(self.offset);
        if magic != MAGIC {
            return self.fail(format!("invalid magic number {magic:#010x}"));
        }

        let lrecord = self.read_header(self.offset + HEADER_SIZE);
        let cflag = lrecord >> 29;
        if cflag != 0 {
            return self.fail(format!("unsupported multipart record flag {cflag}"));
        }

        let len = (lrecord & LEN_MASK) as usize;
        let start = self.offset + 2 * HEADER_SIZE;
        let end = start + len;
        if end > self.buf.len() {
            return self.fail(format!(
                "truncated payload, expected {len} bytes but {} remain",
                self.buf.len() - start
            ));
        }

        self.offset = (end + padding(len)).min(self.buf.len());
        Some(Ok(&self.buf[start..end]))
    }
}
