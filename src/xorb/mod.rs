//! A xorb: a chunk region plus the self-describing [`CasObjectInfo`] footer
//! that names it (§4.6). Chunks are compressed independently; the footer
//! carries every chunk's hash and both its compressed and uncompressed
//! cumulative offsets, so a single chunk can be fetched by byte range
//! without touching its neighbors.

mod format;

use bytes::{Buf, Bytes, BytesMut};
use tracing::instrument;

use crate::chunking::{Chunk, MAX_CHUNK_SIZE};
use crate::compression::{choose_scheme, CompressionScheme};
use crate::digests::{h_data, Hash};
use crate::errors::XorbFormatError;
use crate::merkle::{merkle_root, Node};

pub use format::{CasObjectInfo, ChunkHeader, CHUNK_HEADER_LEN};

pub const MAX_XORB_SIZE: usize = 64 * 1024 * 1024;
pub const MAX_XORB_CHUNKS: usize = 8192;

/// Accumulates chunks into a xorb's chunk region, enforcing the size and
/// count caps as each chunk is added rather than after the fact.
#[derive(Default)]
pub struct XorbBuilder {
    region: BytesMut,
    chunk_hashes: Vec<Hash>,
    region_boundaries: Vec<u32>,
    uncompressed_boundaries: Vec<u32>,
    uncompressed_total: u64,
}

impl XorbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.chunk_hashes.is_empty()
    }

    pub fn num_chunks(&self) -> usize {
        self.chunk_hashes.len()
    }

    pub fn region_len(&self) -> usize {
        self.region.len()
    }

    /// Compresses `chunk` and appends its header and payload to the region.
    /// Picks its own compression scheme; the choice never affects any hash.
    pub fn add_chunk(&mut self, chunk: &Chunk) -> Result<(), XorbFormatError> {
        if self.num_chunks() >= MAX_XORB_CHUNKS {
            return Err(XorbFormatError::TooManyChunks {
                count: self.num_chunks() + 1,
                max: MAX_XORB_CHUNKS,
            });
        }
        if chunk.len() == 0 || chunk.len() > MAX_CHUNK_SIZE {
            return Err(XorbFormatError::UncompressedSizeOutOfBounds {
                index: self.num_chunks(),
                size: chunk.len() as u32,
                max: MAX_CHUNK_SIZE as u32,
            });
        }

        let (scheme, compressed) = choose_scheme(&chunk.data);
        let projected_len = self.region.len() + CHUNK_HEADER_LEN + compressed.len();
        if projected_len > MAX_XORB_SIZE {
            return Err(XorbFormatError::XorbTooLarge {
                size: projected_len,
                max: MAX_XORB_SIZE,
            });
        }

        let header = ChunkHeader {
            compressed_size: compressed.len() as u32,
            compression_type: scheme,
            uncompressed_size: chunk.len() as u32,
        };
        header.write(&mut self.region);
        self.region.extend_from_slice(&compressed);

        self.chunk_hashes.push(chunk.hash);
        self.uncompressed_total += chunk.len() as u64;
        self.region_boundaries.push(self.region.len() as u32);
        self.uncompressed_boundaries.push(self.uncompressed_total as u32);

        Ok(())
    }

    /// Computes the xorb hash (the Merkle root over chunk hash/size pairs,
    /// §4.3) and serializes the full xorb: chunk region, `CasObjectInfo`
    /// footer, then a trailing 4-byte little-endian footer length.
    #[instrument(skip_all, fields(chunks = self.num_chunks()))]
    pub fn finish(self) -> Result<(Hash, Bytes), XorbFormatError> {
        if self.is_empty() {
            return Err(XorbFormatError::Empty);
        }

        let nodes: Vec<Node> = self
            .chunk_hashes
            .iter()
            .zip(boundaries_to_sizes(&self.uncompressed_boundaries))
            .map(|(&hash, size)| Node::new(hash, size))
            .collect();
        let xorb_hash = merkle_root(&nodes);

        let info = CasObjectInfo {
            xorb_hash,
            chunk_hashes: self.chunk_hashes,
            region_boundaries: self.region_boundaries,
            uncompressed_boundaries: self.uncompressed_boundaries,
        };
        let footer = info.serialize();

        let mut out = BytesMut::with_capacity(self.region.len() + footer.len() + 4);
        out.extend_from_slice(&self.region);
        out.extend_from_slice(&footer);
        out.extend_from_slice(&(footer.len() as u32).to_le_bytes());

        Ok((xorb_hash, out.freeze()))
    }
}

fn boundaries_to_sizes(boundaries: &[u32]) -> Vec<u64> {
    let mut sizes = Vec::with_capacity(boundaries.len());
    let mut prev = 0u32;
    for &b in boundaries {
        sizes.push((b - prev) as u64);
        prev = b;
    }
    sizes
}

/// A parsed xorb: the raw chunk region plus its footer, ready to serve
/// individual chunks by index.
pub struct Xorb {
    region: Bytes,
    info: CasObjectInfo,
}

impl Xorb {
    pub fn info(&self) -> &CasObjectInfo {
        &self.info
    }

    pub fn hash(&self) -> Hash {
        self.info.xorb_hash
    }

    pub fn num_chunks(&self) -> usize {
        self.info.num_chunks()
    }

    /// Parses a complete xorb: locates the footer via the trailing 4-byte
    /// length, validates it, and checks the region boundaries are
    /// consistent with the region's actual length. Does not decompress or
    /// verify any chunk; that happens lazily in [`Xorb::get_chunk`].
    #[instrument(skip_all, fields(len = data.len()))]
    pub fn parse(data: Bytes) -> Result<Self, XorbFormatError> {
        if data.len() < 4 {
            return Err(XorbFormatError::Truncated {
                needed: 4,
                have: data.len(),
            });
        }
        let trailer_start = data.len() - 4;
        let footer_len = (&data[trailer_start..]).get_u32_le() as usize;
        if footer_len > trailer_start {
            return Err(XorbFormatError::Truncated {
                needed: footer_len,
                have: trailer_start,
            });
        }
        let footer_start = trailer_start - footer_len;

        let info = CasObjectInfo::parse(&data[footer_start..trailer_start])?;

        if let Some(&last_boundary) = info.region_boundaries.last() {
            if last_boundary as usize != footer_start {
                return Err(XorbFormatError::BoundaryTotalMismatch {
                    index: info.num_chunks() - 1,
                    total: last_boundary,
                    region_len: footer_start as u32,
                });
            }
        }

        let merkle_hash = xorb_hash_from_info(&info);
        if merkle_hash != info.xorb_hash {
            return Err(XorbFormatError::HashMismatch);
        }

        Ok(Self {
            region: data.slice(0..footer_start),
            info,
        })
    }

    /// Fetches and decompresses chunk `index`, verifying its content hash
    /// against the footer's record.
    pub fn get_chunk(&self, index: usize) -> Result<Bytes, XorbFormatError> {
        if index >= self.num_chunks() {
            return Err(XorbFormatError::UnexpectedIdent {
                expected: b"chunk index within range",
                found: index.to_le_bytes().to_vec(),
            });
        }

        let region_start = if index == 0 {
            0
        } else {
            self.info.region_boundaries[index - 1] as usize
        };
        let region_end = self.info.region_boundaries[index] as usize;

        let mut header_buf = self.region.slice(region_start..region_end);
        let header = ChunkHeader::parse(&mut header_buf, index)?;
        let payload = header_buf.copy_to_bytes(header.compressed_size as usize);

        let decompressed = header
            .compression_type
            .decompress(&payload, header.uncompressed_size as usize)?;

        if h_data(&decompressed) != self.info.chunk_hashes[index] {
            return Err(XorbFormatError::HashMismatch);
        }

        Ok(Bytes::from(decompressed))
    }
}

fn xorb_hash_from_info(info: &CasObjectInfo) -> Hash {
    let sizes = boundaries_to_sizes(&info.uncompressed_boundaries);
    let nodes: Vec<Node> = info
        .chunk_hashes
        .iter()
        .zip(sizes)
        .map(|(&hash, size)| Node::new(hash, size))
        .collect();
    merkle_root(&nodes)
}
