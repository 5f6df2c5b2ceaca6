//! IDX files, the layout MNIST ships in.
//!
//! ```text
//! bytes 0-1:  0x00 0x00   reserved
//! byte  2:    0x08        dtype, only unsigned bytes are supported
//! byte  3:    ndim
//! then ndim big-endian u32 dimension sizes, then the row-major data
//! ```

use std::path::Path;

use log::debug;
use ndarray::{Array1, Array2};
use rayon::prelude::*;

use super::read_maybe_gz;
use crate::{
    error::{DatasetErr, Result},
    partition::Partition,
};

const DTYPE_U8: u8 = 0x08;
const PIXEL_MAX: f32 = 255.0;

/// A parsed IDX header with a view of its data.
struct Idx<'a> {
    dims: Vec<usize>,
    data: &'a [u8],
}

fn parse_idx<'a>(what: &str, bytes: &'a [u8]) -> Result<Idx<'a>> {
    let invalid = |msg: String| Err(DatasetErr::InvalidFormat(format!("{what}: {msg}")));

    if bytes.len() < 4 {
        return invalid(format!("expected a 4 byte header, got {} bytes", bytes.len()));
    }

    if bytes[0] != 0 || bytes[1] != 0 {
        return invalid(format!(
            "reserved bytes must be zero, got {:#04x} {:#04x}",
            bytes[0], bytes[1]
        ));
    }

    if bytes[2] != DTYPE_U8 {
        return invalid(format!("unsupported dtype {:#04x}", bytes[2]));
    }

    let ndim = bytes[3] as usize;
    let header_len = 4 + 4 * ndim;
    if bytes.len() < header_len {
        return invalid(format!("truncated header for {ndim} dimensions"));
    }

    let dims: Vec<usize> = bytes[4..header_len]
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]) as usize)
        .collect();

    let expected = element_count(what, &dims)?;
    let data = &bytes[header_len..];
    if data.len() != expected {
        return invalid(format!(
            "dimensions {dims:?} need {expected} bytes of data, got {}",
            data.len()
        ));
    }

    Ok(Idx { dims, data })
}

/// The product of `dims`, or `InvalidFormat` if it doesn't fit in a `usize`.
fn element_count(what: &str, dims: &[usize]) -> Result<usize> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| {
            DatasetErr::InvalidFormat(format!("{what}: dimensions {dims:?} overflow"))
        })
}

/// Parses an image IDX file and its label IDX file into a partition.
///
/// Every image is flattened into one row and its pixels are scaled into `[0, 1]`.
///
/// # Errors
/// `InvalidFormat` for malformed files, `ShapeMismatch` if the files hold a different
/// number of items.
pub fn parse_idx_pair(image_bytes: &[u8], label_bytes: &[u8]) -> Result<Partition> {
    let images = parse_idx("images", image_bytes)?;
    let labels = parse_idx("labels", label_bytes)?;

    if images.dims.len() < 2 {
        return Err(DatasetErr::InvalidFormat(format!(
            "images: expected at least 2 dimensions, got {}",
            images.dims.len()
        )));
    }

    if labels.dims.len() != 1 {
        return Err(DatasetErr::InvalidFormat(format!(
            "labels: expected 1 dimension, got {}",
            labels.dims.len()
        )));
    }

    let n = images.dims[0];
    let dim = element_count("images", &images.dims[1..])?;

    if labels.dims[0] != n {
        return Err(DatasetErr::ShapeMismatch {
            features: n,
            labels: labels.dims[0],
        });
    }

    let pixels: Vec<f32> = images
        .data
        .par_iter()
        .map(|&p| f32::from(p) / PIXEL_MAX)
        .collect();

    let features = Array2::from_shape_vec((n, dim), pixels)
        .map_err(|e| DatasetErr::InvalidFormat(e.to_string()))?;
    let labels = Array1::from_iter(labels.data.iter().copied().map(f32::from));

    Partition::new(features, labels)
}

/// Loads an image IDX file and its label IDX file, either may be gzip compressed.
pub fn load_idx_pair(images: &Path, labels: &Path) -> Result<Partition> {
    let image_bytes = read_maybe_gz(images)?;
    let label_bytes = read_maybe_gz(labels)?;

    let partition = parse_idx_pair(&image_bytes, &label_bytes)?;
    debug!(
        rows = partition.len(),
        dim = partition.dim();
        "loaded idx pair from {}",
        images.display()
    );

    Ok(partition)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx_images(images: &[[u8; 4]]) -> Vec<u8> {
        let mut buf = vec![0, 0, DTYPE_U8, 3];
        buf.extend_from_slice(&(images.len() as u32).to_be_bytes());
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&2u32.to_be_bytes());
        for image in images {
            buf.extend_from_slice(image);
        }
        buf
    }

    fn idx_labels(labels: &[u8]) -> Vec<u8> {
        let mut buf = vec![0, 0, DTYPE_U8, 1];
        buf.extend_from_slice(&(labels.len() as u32).to_be_bytes());
        buf.extend_from_slice(labels);
        buf
    }

    #[test]
    fn parses_images_into_scaled_rows() {
        let images = idx_images(&[[0, 255, 51, 0], [255, 255, 0, 0]]);
        let labels = idx_labels(&[7, 3]);

        let p = parse_idx_pair(&images, &labels).unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(p.dim(), 4);
        assert_eq!(p.features().row(0).to_vec(), vec![0.0, 1.0, 0.2, 0.0]);
        assert_eq!(p.labels().to_vec(), vec![7.0, 3.0]);
    }

    #[test]
    fn rejects_count_mismatch() {
        let images = idx_images(&[[0; 4], [0; 4]]);
        let labels = idx_labels(&[1]);

        let err = parse_idx_pair(&images, &labels).unwrap_err();
        assert!(matches!(
            err,
            DatasetErr::ShapeMismatch {
                features: 2,
                labels: 1
            }
        ));
    }

    #[test]
    fn rejects_truncated_data() {
        let mut images = idx_images(&[[0; 4]]);
        images.pop();

        let err = parse_idx_pair(&images, &idx_labels(&[1])).unwrap_err();
        assert!(matches!(err, DatasetErr::InvalidFormat(_)));
    }

    #[test]
    fn rejects_non_byte_dtype() {
        let mut images = idx_images(&[[0; 4]]);
        images[2] = 0x0d;

        assert!(parse_idx_pair(&images, &idx_labels(&[1])).is_err());
    }

    #[test]
    fn overflowing_dimensions_are_invalid() {
        let mut images = vec![0, 0, DTYPE_U8, 3];
        for _ in 0..3 {
            images.extend_from_slice(&u32::MAX.to_be_bytes());
        }

        let err = parse_idx_pair(&images, &idx_labels(&[1])).unwrap_err();
        assert!(matches!(err, DatasetErr::InvalidFormat(_)));
    }
}
