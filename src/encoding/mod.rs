//! Steganographic codec: byte buffers disguised as PNG images.
//!
//! An envelope is split into size-limited chunks, each packed into the
//! pixels of a 16-bit RGBA image behind a length prefix. Decoding reverses
//! the mapping losslessly, so the images double as an exact byte store.

mod decoder;
mod encoder;
mod pixels;

pub use decoder::{decode, decode_image};
pub use encoder::{encode, encode_image};
pub use pixels::{bytes_to_pixels, pixels_to_bytes, Pixel};
