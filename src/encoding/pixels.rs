//! Byte ↔ pixel packing.
//!
//! Every 8 consecutive bytes become one RGBA pixel with 16-bit components:
//! 2 bytes per channel, big-endian, in channel order R, G, B, A.

use crate::config::BYTES_PER_PIXEL;
use crate::error::{Error, Result};

/// One RGBA pixel with 16-bit components, in channel order.
pub type Pixel = [u16; 4];

/// Pack bytes into pixels. Fails with `BadDataCount` if the input length is
/// not a multiple of 8.
pub fn bytes_to_pixels(bytes: &[u8]) -> Result<Vec<Pixel>> {
    if bytes.len() % BYTES_PER_PIXEL != 0 {
        return Err(Error::BadDataCount {
            required: bytes.len().next_multiple_of(BYTES_PER_PIXEL),
            actual: bytes.len(),
        });
    }

    let pixels = bytes
        .chunks_exact(BYTES_PER_PIXEL)
        .map(|chunk| {
            let mut pixel = [0u16; 4];
            for (channel, pair) in pixel.iter_mut().zip(chunk.chunks_exact(2)) {
                *channel = u16::from_be_bytes([pair[0], pair[1]]);
            }
            pixel
        })
        .collect();

    Ok(pixels)
}

/// Unpack pixels back into the byte stream `bytes_to_pixels` consumed.
pub fn pixels_to_bytes(pixels: &[Pixel]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(pixels.len() * BYTES_PER_PIXEL);
    for pixel in pixels {
        for channel in pixel {
            bytes.extend_from_slice(&channel.to_be_bytes());
        }
    }
    bytes
}
