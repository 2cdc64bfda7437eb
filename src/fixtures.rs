//! Shared test fixtures: known-answer byte sequences and lazily-built
//! sample objects, reused across this crate's test modules instead of
//! being redefined in each one. Mirrors the teacher's `fixtures.rs`.

#![cfg(test)]

use std::sync::LazyLock;

use bytes::Bytes;

use crate::chunking::Chunk;
use crate::digests::h_data;

/// Bytes `0x00..=0x1f`, the input to the hash-string-codec known-answer
/// test (§8 scenario 2).
pub static HASH_STRING_CODEC_INPUT: LazyLock<[u8; 32]> = LazyLock::new(|| {
    hex_literal::hex!("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f")
});

/// A chunk-sized sample buffer, large enough to exercise the chunker past
/// `MIN_CHUNK_SIZE` and small enough to stay under `MAX_CHUNK_SIZE`.
pub static SAMPLE_CHUNK_DATA: LazyLock<Bytes> =
    LazyLock::new(|| Bytes::from(vec![0x42u8; 40_000]));

pub static SAMPLE_CHUNK: LazyLock<Chunk> = LazyLock::new(|| Chunk {
    offset: 0,
    hash: h_data(&SAMPLE_CHUNK_DATA),
    data: SAMPLE_CHUNK_DATA.clone(),
});

/// Three distinct sample chunks of varying size, useful wherever a test
/// needs more than one chunk without caring about their exact contents.
pub static SAMPLE_CHUNKS: LazyLock<Vec<Chunk>> = LazyLock::new(|| {
    [(0x10u8, 9_000usize), (0x20, 15_000), (0x30, 22_000)]
        .into_iter()
        .map(|(byte, len)| {
            let data = Bytes::from(vec![byte; len]);
            Chunk {
                offset: 0,
                hash: h_data(&data),
                data,
            }
        })
        .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_chunk_hash_matches_its_data() {
        assert_eq!(SAMPLE_CHUNK.hash, h_data(&SAMPLE_CHUNK_DATA));
    }

    #[test]
    fn sample_chunks_are_distinct() {
        let hashes: Vec<_> = SAMPLE_CHUNKS.iter().map(|c| c.hash).collect();
        for i in 0..hashes.len() {
            for j in (i + 1)..hashes.len() {
                assert_ne!(hashes[i], hashes[j]);
            }
        }
    }
}
