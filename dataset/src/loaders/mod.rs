//! Readers turning dataset files into `Partition`s.

mod csv;
mod idx;

use std::{fs, io::Read, path::Path};

use flate2::read::GzDecoder;

use crate::error::Result;

pub use csv::{CsvDataset, CsvOptions, load_csv, parse_csv};
pub use idx::{load_idx_pair, parse_idx_pair};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Reads a whole file, inflating it first if it's gzip compressed.
pub fn read_maybe_gz(path: &Path) -> Result<Vec<u8>> {
    let raw = fs::read(path)?;
    if !raw.starts_with(&GZIP_MAGIC) {
        return Ok(raw);
    }

    let mut inflated = Vec::new();
    GzDecoder::new(raw.as_slice()).read_to_end(&mut inflated)?;
    Ok(inflated)
}
