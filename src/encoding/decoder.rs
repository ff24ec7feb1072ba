//! Steganographic decoding: PNG images back to envelope bytes.

use tracing::debug;

use crate::config::LENGTH_PREFIX_SIZE;
use crate::crypto::envelope;
use crate::encoding::pixels::{pixels_to_bytes, Pixel};
use crate::error::{Error, Result};

/// Extract one chunk of envelope bytes from a PNG produced by
/// `encode_image`, dropping the trailing padding.
pub fn decode_image(png: &[u8]) -> Result<Vec<u8>> {
    let image = image::load_from_memory_with_format(png, image::ImageFormat::Png)
        .map_err(|e| Error::InvalidData(e.to_string()))?;

    let pixels: Vec<Pixel> = image.into_rgba16().pixels().map(|p| p.0).collect();
    let bytes = pixels_to_bytes(&pixels);

    if bytes.len() < LENGTH_PREFIX_SIZE {
        return Err(Error::NotEnoughData {
            expected: LENGTH_PREFIX_SIZE,
            actual: bytes.len(),
        });
    }

    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    prefix.copy_from_slice(&bytes[..LENGTH_PREFIX_SIZE]);
    let chunk_len = usize::try_from(u64::from_be_bytes(prefix))
        .map_err(|_| Error::InvalidData("chunk length exceeds address space".to_string()))?;

    let remaining = bytes.len() - LENGTH_PREFIX_SIZE;
    if chunk_len > remaining {
        return Err(Error::NotEnoughData {
            expected: chunk_len,
            actual: remaining,
        });
    }

    Ok(bytes[LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + chunk_len].to_vec())
}

/// Reassemble an envelope from its images, in order, and open it.
pub fn decode(images: &[Vec<u8>], password: &str) -> Result<Vec<u8>> {
    let mut envelope_bytes = Vec::new();
    for image in images {
        envelope_bytes.extend_from_slice(&decode_image(image)?);
    }

    let (payload, _header) = envelope::unwrap(&envelope_bytes, password)?;

    debug!(
        images = images.len(),
        payload = payload.len(),
        "decoded data"
    );
    Ok(payload)
}
