//! Byte-level layout of a single chunk header and the `CasObjectInfo` footer
//! (§4.6). Pure serialize/parse functions; no allocation happens before a
//! structurally valid header or footer has been read.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::chunking::MAX_CHUNK_SIZE;
use crate::compression::CompressionScheme;
use crate::digests::{Hash, HASH_LEN};
use crate::errors::XorbFormatError;

pub const CHUNK_HEADER_LEN: usize = 8;
const CHUNK_HEADER_VERSION: u8 = 0;

const MAIN_IDENT: &[u8; 7] = b"XETBLOB";
const MAIN_VERSION: u8 = 1;
const HASH_IDENT: &[u8; 7] = b"XBLBHSH";
const HASH_VERSION: u8 = 0;
const BOUNDARY_IDENT: &[u8; 7] = b"XBLBBND";
const BOUNDARY_VERSION: u8 = 1;
const TRAILER_RESERVED: usize = 16;

/// One 8-byte chunk header preceding a chunk's compressed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub compressed_size: u32,
    pub compression_type: CompressionScheme,
    pub uncompressed_size: u32,
}

impl ChunkHeader {
    pub fn write(&self, out: &mut BytesMut) {
        out.put_u8(CHUNK_HEADER_VERSION);
        out.put_uint_le(self.compressed_size as u64, 3);
        out.put_u8(self.compression_type.tag());
        out.put_uint_le(self.uncompressed_size as u64, 3);
    }

    /// Parses an 8-byte header and validates size bounds before the caller
    /// allocates anything for the payload.
    pub fn parse(buf: &mut Bytes, index: usize) -> Result<Self, XorbFormatError> {
        if buf.remaining() < CHUNK_HEADER_LEN {
            return Err(XorbFormatError::Truncated {
                needed: CHUNK_HEADER_LEN,
                have: buf.remaining(),
            });
        }

        let version = buf.get_u8();
        if version != CHUNK_HEADER_VERSION {
            return Err(XorbFormatError::UnsupportedVersion {
                what: "chunk header",
                expected: CHUNK_HEADER_VERSION,
                found: version,
            });
        }

        let compressed_size = buf.get_uint_le(3) as u32;
        let compression_type = CompressionScheme::try_from(buf.get_u8())?;
        let uncompressed_size = buf.get_uint_le(3) as u32;

        if uncompressed_size == 0 || uncompressed_size as usize > MAX_CHUNK_SIZE {
            return Err(XorbFormatError::UncompressedSizeOutOfBounds {
                index,
                size: uncompressed_size,
                max: MAX_CHUNK_SIZE as u32,
            });
        }
        if compressed_size == 0 || compressed_size as usize > MAX_CHUNK_SIZE {
            return Err(XorbFormatError::CompressedSizeOutOfBounds {
                index,
                size: compressed_size,
                max: MAX_CHUNK_SIZE as u32,
            });
        }

        Ok(Self {
            compressed_size,
            compression_type,
            uncompressed_size,
        })
    }
}

/// The self-describing footer appended after the chunk region: identifies
/// the xorb, lists every chunk hash in order, and records both the
/// in-region and uncompressed cumulative offsets of every chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasObjectInfo {
    pub xorb_hash: Hash,
    pub chunk_hashes: Vec<Hash>,
    /// Cumulative end offsets of each chunk's header+payload within the
    /// chunk region; `region_boundaries[i]` is where chunk `i` ends.
    pub region_boundaries: Vec<u32>,
    /// Cumulative end offsets of each chunk's *uncompressed* bytes.
    pub uncompressed_boundaries: Vec<u32>,
}

impl CasObjectInfo {
    pub fn num_chunks(&self) -> usize {
        self.chunk_hashes.len()
    }

    pub fn serialize(&self) -> Bytes {
        let n = self.num_chunks() as u32;
        let mut out = BytesMut::new();

        // Main section.
        out.put_slice(MAIN_IDENT);
        out.put_u8(MAIN_VERSION);
        out.put_slice(self.xorb_hash.as_bytes());

        // Hash section.
        let hash_section_start = out.len();
        out.put_slice(HASH_IDENT);
        out.put_u8(HASH_VERSION);
        out.put_u32_le(n);
        for h in &self.chunk_hashes {
            out.put_slice(h.as_bytes());
        }

        // Boundary section.
        let boundary_section_start = out.len();
        out.put_slice(BOUNDARY_IDENT);
        out.put_u8(BOUNDARY_VERSION);
        out.put_u32_le(n);
        for b in &self.region_boundaries {
            out.put_u32_le(*b);
        }
        for b in &self.uncompressed_boundaries {
            out.put_u32_le(*b);
        }

        // Trailer.
        let footer_len_so_far = out.len();
        out.put_u32_le(n);
        out.put_u32_le((footer_len_so_far - hash_section_start) as u32);
        out.put_u32_le((footer_len_so_far - boundary_section_start) as u32);
        out.put_bytes(0, TRAILER_RESERVED);

        out.freeze()
    }

    pub fn parse(footer: &[u8]) -> Result<Self, XorbFormatError> {
        let mut buf = Bytes::copy_from_slice(footer);

        expect_ident(&mut buf, MAIN_IDENT)?;
        expect_version(&mut buf, "CasObjectInfo main", MAIN_VERSION)?;
        let xorb_hash = read_hash(&mut buf)?;

        let hash_section_start = footer.len() - buf.remaining();
        expect_ident(&mut buf, HASH_IDENT)?;
        expect_version(&mut buf, "CasObjectInfo hash section", HASH_VERSION)?;
        require(&buf, 4)?;
        let num_chunks = buf.get_u32_le() as usize;
        require(&buf, num_chunks * HASH_LEN)?;
        let mut chunk_hashes = Vec::with_capacity(num_chunks);
        for _ in 0..num_chunks {
            chunk_hashes.push(read_hash(&mut buf)?);
        }

        let boundary_section_start = footer.len() - buf.remaining();
        expect_ident(&mut buf, BOUNDARY_IDENT)?;
        expect_version(&mut buf, "CasObjectInfo boundary section", BOUNDARY_VERSION)?;
        require(&buf, 4)?;
        let num_chunks_2 = buf.get_u32_le() as usize;
        if num_chunks_2 != num_chunks {
            return Err(XorbFormatError::UnexpectedIdent {
                expected: b"matching num_chunks in hash and boundary sections",
                found: num_chunks_2.to_le_bytes().to_vec(),
            });
        }
        require(&buf, num_chunks * 4)?;
        let region_boundaries: Vec<u32> = (0..num_chunks).map(|_| buf.get_u32_le()).collect();
        require(&buf, num_chunks * 4)?;
        let uncompressed_boundaries: Vec<u32> = (0..num_chunks).map(|_| buf.get_u32_le()).collect();

        require(&buf, 4 + 4 + 4 + TRAILER_RESERVED)?;
        let trailer_num_chunks = buf.get_u32_le() as usize;
        let hashes_offset_from_end = buf.get_u32_le() as usize;
        let boundaries_offset_from_end = buf.get_u32_le() as usize;
        let reserved = buf.copy_to_bytes(TRAILER_RESERVED);

        if trailer_num_chunks != num_chunks {
            return Err(XorbFormatError::UnexpectedIdent {
                expected: b"trailer num_chunks matching body",
                found: trailer_num_chunks.to_le_bytes().to_vec(),
            });
        }
        if !reserved.iter().all(|&b| b == 0) {
            return Err(XorbFormatError::UnexpectedIdent {
                expected: b"16 reserved zero bytes",
                found: reserved.to_vec(),
            });
        }

        let footer_len_so_far = footer.len() - buf.remaining();
        let expected_hashes_offset = footer_len_so_far - hash_section_start;
        let expected_boundaries_offset = footer_len_so_far - boundary_section_start;
        if hashes_offset_from_end != expected_hashes_offset
            || boundaries_offset_from_end != expected_boundaries_offset
        {
            return Err(XorbFormatError::UnexpectedIdent {
                expected: b"trailer offsets consistent with section positions",
                found: vec![],
            });
        }

        verify_strictly_increasing(&region_boundaries)?;
        verify_strictly_increasing(&uncompressed_boundaries)?;

        Ok(Self {
            xorb_hash,
            chunk_hashes,
            region_boundaries,
            uncompressed_boundaries,
        })
    }
}

fn verify_strictly_increasing(boundaries: &[u32]) -> Result<(), XorbFormatError> {
    let mut prev = 0u32;
    for (i, &b) in boundaries.iter().enumerate() {
        if i > 0 && b <= prev {
            return Err(XorbFormatError::NonIncreasingBoundary { index: i });
        }
        prev = b;
    }
    Ok(())
}

fn require(buf: &Bytes, needed: usize) -> Result<(), XorbFormatError> {
    if buf.remaining() < needed {
        return Err(XorbFormatError::Truncated {
            needed,
            have: buf.remaining(),
        });
    }
    Ok(())
}

fn expect_ident(buf: &mut Bytes, ident: &'static [u8; 7]) -> Result<(), XorbFormatError> {
    require(buf, ident.len())?;
    let found = buf.copy_to_bytes(ident.len());
    if found.as_ref() != ident.as_slice() {
        return Err(XorbFormatError::UnexpectedIdent {
            expected: ident.as_slice(),
            found: found.to_vec(),
        });
    }
    Ok(())
}

fn expect_version(
    buf: &mut Bytes,
    what: &'static str,
    expected: u8,
) -> Result<(), XorbFormatError> {
    require(buf, 1)?;
    let found = buf.get_u8();
    if found != expected {
        return Err(XorbFormatError::UnsupportedVersion {
            what,
            expected,
            found,
        });
    }
    Ok(())
}

fn read_hash(buf: &mut Bytes) -> Result<Hash, XorbFormatError> {
    require(buf, HASH_LEN)?;
    let bytes = buf.copy_to_bytes(HASH_LEN);
    Ok(Hash::try_from(bytes.as_ref())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(b: u8) -> Hash {
        Hash::from([b; 32])
    }

    #[test]
    fn chunk_header_round_trips() {
        let header = ChunkHeader {
            compressed_size: 1234,
            compression_type: CompressionScheme::Lz4,
            uncompressed_size: 5678,
        };
        let mut out = BytesMut::new();
        header.write(&mut out);
        assert_eq!(out.len(), CHUNK_HEADER_LEN);

        let mut buf = out.freeze();
        let parsed = ChunkHeader::parse(&mut buf, 0).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn chunk_header_rejects_unsupported_version() {
        let mut out = BytesMut::new();
        out.put_u8(1); // bad version
        out.put_uint_le(1, 3);
        out.put_u8(0);
        out.put_uint_le(1, 3);
        let mut buf = out.freeze();
        assert!(matches!(
            ChunkHeader::parse(&mut buf, 0),
            Err(XorbFormatError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn chunk_header_rejects_zero_sizes() {
        let mut out = BytesMut::new();
        out.put_u8(0);
        out.put_uint_le(0, 3);
        out.put_u8(0);
        out.put_uint_le(0, 3);
        let mut buf = out.freeze();
        assert!(ChunkHeader::parse(&mut buf, 0).is_err());
    }

    #[test]
    fn cas_object_info_round_trips() {
        let info = CasObjectInfo {
            xorb_hash: hash(0xAA),
            chunk_hashes: vec![hash(1), hash(2), hash(3)],
            region_boundaries: vec![10, 30, 45],
            uncompressed_boundaries: vec![20, 60, 90],
        };
        let bytes = info.serialize();
        let parsed = CasObjectInfo::parse(&bytes).unwrap();
        assert_eq!(parsed, info);
    }

    #[test]
    fn cas_object_info_rejects_bad_main_ident() {
        let info = CasObjectInfo {
            xorb_hash: hash(0xAA),
            chunk_hashes: vec![hash(1)],
            region_boundaries: vec![10],
            uncompressed_boundaries: vec![20],
        };
        let mut bytes = info.serialize().to_vec();
        bytes[0] = b'Z';
        assert!(matches!(
            CasObjectInfo::parse(&bytes),
            Err(XorbFormatError::UnexpectedIdent { .. })
        ));
    }

    #[test]
    fn cas_object_info_rejects_non_increasing_boundaries() {
        let info = CasObjectInfo {
            xorb_hash: hash(0xAA),
            chunk_hashes: vec![hash(1), hash(2)],
            region_boundaries: vec![20, 10],
            uncompressed_boundaries: vec![20, 40],
        };
        let bytes = info.serialize();
        assert!(matches!(
            CasObjectInfo::parse(&bytes),
            Err(XorbFormatError::NonIncreasingBoundary { .. })
        ));
    }
}
