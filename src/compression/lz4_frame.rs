//! `LZ4` compression variant (§4.5): the LZ4 *frame* format, not the bare
//! block format. Each chunk is a single, complete frame.

use std::io::{Read, Write};

use lz4_flex::frame::{FrameDecoder, FrameEncoder};

use crate::errors::XorbFormatError;

pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = FrameEncoder::new(Vec::new());
    encoder.write_all(data).expect("writing to an in-memory buffer cannot fail");
    encoder
        .finish()
        .expect("finishing an in-memory LZ4 frame cannot fail")
}

pub fn decompress(data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>, XorbFormatError> {
    let mut decoder = FrameDecoder::new(data);
    let mut out = Vec::with_capacity(uncompressed_size);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| XorbFormatError::Decompression(e.to_string()))?;
    Ok(out)
}
