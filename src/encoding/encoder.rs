//! Steganographic encoding: envelope bytes to PNG images.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use rand::RngCore;
use tracing::debug;

use crate::config::{BYTES_PER_PIXEL, LENGTH_PREFIX_SIZE};
use crate::crypto::envelope;
use crate::encoding::pixels::bytes_to_pixels;
use crate::error::{Error, Result};

/// Pack one chunk of envelope bytes into a 16-bit RGBA PNG.
///
/// The chunk is prefixed with its big-endian length and padded with random
/// bytes until it fills a near-square pixel grid, so image dimensions leak
/// nothing beyond the rough data size.
pub fn encode_image(chunk: &[u8]) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(LENGTH_PREFIX_SIZE + chunk.len());
    data.extend_from_slice(&(chunk.len() as u64).to_be_bytes());
    data.extend_from_slice(chunk);

    let pixel_count = data.len().div_ceil(BYTES_PER_PIXEL);
    let width = (pixel_count as f64).sqrt().ceil() as usize;
    let height = pixel_count.div_ceil(width);
    let total_bytes = width * height * BYTES_PER_PIXEL;

    let mut padding = vec![0u8; total_bytes - data.len()];
    rand::thread_rng().fill_bytes(&mut padding);
    data.extend_from_slice(&padding);

    let pixels = bytes_to_pixels(&data)?;

    // write_image takes 16-bit samples in native byte order
    let mut samples = Vec::with_capacity(data.len());
    for pixel in &pixels {
        for channel in pixel {
            samples.extend_from_slice(&channel.to_ne_bytes());
        }
    }

    let width = u32::try_from(width).map_err(|_| dimension_error(width))?;
    let height = u32::try_from(height).map_err(|_| dimension_error(height))?;

    // High-entropy ciphertext does not compress; skip filtering so the
    // pixel data passes through the container untouched.
    let mut png = Vec::new();
    PngEncoder::new_with_quality(&mut png, CompressionType::Fast, FilterType::NoFilter)
        .write_image(&samples, width, height, ExtendedColorType::Rgba16)
        .map_err(|e| Error::InvalidData(e.to_string()))?;

    debug!(width, height, bytes = chunk.len(), "encoded image");
    Ok(png)
}

/// Wrap data into an envelope and spread it over PNG images of at most
/// `limit` envelope bytes each, in chunk order.
pub fn encode(data: &[u8], password: &str, limit: usize) -> Result<Vec<Vec<u8>>> {
    if limit == 0 {
        return Err(Error::InvalidData("chunk limit must be nonzero".to_string()));
    }

    let envelope = envelope::wrap(data, password)?;

    let images: Vec<Vec<u8>> = envelope
        .chunks(limit)
        .map(encode_image)
        .collect::<Result<_>>()?;

    debug!(
        images = images.len(),
        payload = data.len(),
        envelope = envelope.len(),
        "encoded data"
    );
    Ok(images)
}

fn dimension_error(side: usize) -> Error {
    Error::InvalidData(format!("image dimension {} exceeds PNG limits", side))
}
