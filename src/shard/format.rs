//! Byte-level layout of every fixed-size block in the shard format (§4.7):
//! header, bookend, the four file-info block kinds, the two CAS-info block
//! kinds, the three lookup-table entry kinds, and the footer. Every block
//! here is exactly 48 bytes except the lookup entries (12/12/16 B) and the
//! footer (200 B); each type's `LEN` constant documents this directly.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::digests::{Hash, HASH_LEN};
use crate::errors::ShardFormatError;

pub const HF_APPLICATION_ID: &[u8; 14] = b"HFRepoMetaData";
pub const SHARD_MAGIC_SEQUENCE: [u8; 17] = [
    0x77, 0x82, 0x45, 0xe6, 0xac, 0xbe, 0x60, 0xfa, 0x68, 0x1c, 0xef, 0x0a, 0xc6, 0xa5, 0xeb, 0xb0,
    0x4a,
];
pub const HEADER_VERSION: u64 = 2;
pub const FOOTER_VERSION: u64 = 1;

pub const HEADER_LEN: usize = 48;
pub const BOOKEND_LEN: usize = 48;
pub const BLOCK_LEN: usize = 48;
pub const FILE_LOOKUP_ENTRY_LEN: usize = 12;
pub const CAS_LOOKUP_ENTRY_LEN: usize = 12;
pub const CHUNK_LOOKUP_ENTRY_LEN: usize = 16;
pub const FOOTER_LEN: usize = 200;

pub const FLAG_WITH_VERIFICATION: u32 = 1 << 31;
pub const FLAG_WITH_METADATA_EXT: u32 = 1 << 30;
pub const FLAG_GLOBAL_DEDUP_ELIGIBLE: u32 = 1 << 31;

fn require(buf: &Bytes, needed: usize) -> Result<(), ShardFormatError> {
    if buf.remaining() < needed {
        return Err(ShardFormatError::Truncated {
            needed,
            have: buf.remaining(),
        });
    }
    Ok(())
}

fn read_hash(buf: &mut Bytes) -> Result<Hash, ShardFormatError> {
    require(buf, HASH_LEN)?;
    Ok(Hash::try_from(buf.copy_to_bytes(HASH_LEN).as_ref())?)
}

fn write_hash(out: &mut BytesMut, hash: &Hash) {
    out.put_slice(hash.as_bytes());
}

/// The 48-byte shard header: magic tag, format version, optional footer
/// size (0 in upload form).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardHeader {
    pub footer_size: u64,
}

impl ShardHeader {
    pub fn write(&self, out: &mut BytesMut) {
        let mut app_id = [0u8; 15];
        app_id[..HF_APPLICATION_ID.len()].copy_from_slice(HF_APPLICATION_ID);
        out.put_slice(&app_id);
        out.put_slice(&SHARD_MAGIC_SEQUENCE);
        out.put_u64_le(HEADER_VERSION);
        out.put_u64_le(self.footer_size);
    }

    pub fn parse(buf: &mut Bytes) -> Result<Self, ShardFormatError> {
        require(buf, HEADER_LEN)?;
        let tag = buf.copy_to_bytes(32);
        let suffix = &tag[32 - SHARD_MAGIC_SEQUENCE.len()..];
        if suffix != SHARD_MAGIC_SEQUENCE.as_slice() {
            return Err(ShardFormatError::BadMagic);
        }
        let version = buf.get_u64_le();
        if version != HEADER_VERSION {
            return Err(ShardFormatError::UnsupportedHeaderVersion {
                expected: HEADER_VERSION,
                found: version,
            });
        }
        let footer_size = buf.get_u64_le();
        Ok(Self { footer_size })
    }
}

/// Writes the 48-byte section terminator: 32×0xFF then 16×0x00.
pub fn write_bookend(out: &mut BytesMut) {
    out.put_bytes(0xFF, 32);
    out.put_bytes(0x00, 16);
}

pub fn parse_bookend(buf: &mut Bytes, section: &'static str) -> Result<(), ShardFormatError> {
    require(buf, BOOKEND_LEN)?;
    let block = buf.copy_to_bytes(BOOKEND_LEN);
    let is_bookend = block[..32].iter().all(|&b| b == 0xFF) && block[32..].iter().all(|&b| b == 0);
    if !is_bookend {
        return Err(ShardFormatError::MissingBookend { section });
    }
    Ok(())
}

/// Peeks at the next `BLOCK_LEN` bytes without consuming them, to let a
/// section-reading loop distinguish "one more block" from "the bookend".
pub fn peek_is_bookend(buf: &Bytes) -> bool {
    if buf.remaining() < BOOKEND_LEN {
        return false;
    }
    let block = &buf.chunk()[..BOOKEND_LEN];
    block[..32].iter().all(|&b| b == 0xFF) && block[32..].iter().all(|&b| b == 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDataSequenceHeader {
    pub file_hash: Hash,
    pub flags: u32,
    pub num_entries: u32,
}

impl FileDataSequenceHeader {
    pub fn with_verification(&self) -> bool {
        self.flags & FLAG_WITH_VERIFICATION != 0
    }

    pub fn with_metadata_ext(&self) -> bool {
        self.flags & FLAG_WITH_METADATA_EXT != 0
    }

    pub fn write(&self, out: &mut BytesMut) {
        write_hash(out, &self.file_hash);
        out.put_u32_le(self.flags);
        out.put_u32_le(self.num_entries);
        out.put_bytes(0, 8);
    }

    pub fn parse(buf: &mut Bytes) -> Result<Self, ShardFormatError> {
        require(buf, BLOCK_LEN)?;
        let file_hash = read_hash(buf)?;
        let flags = buf.get_u32_le();
        let num_entries = buf.get_u32_le();
        buf.advance(8);
        Ok(Self {
            file_hash,
            flags,
            num_entries,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDataSequenceEntry {
    pub xorb_hash: Hash,
    pub unpacked_segment_bytes: u32,
    pub chunk_start: u32,
    pub chunk_end: u32,
}

impl FileDataSequenceEntry {
    pub fn write(&self, out: &mut BytesMut) {
        write_hash(out, &self.xorb_hash);
        out.put_u32_le(0); // cas_flags, reserved
        out.put_u32_le(self.unpacked_segment_bytes);
        out.put_u32_le(self.chunk_start);
        out.put_u32_le(self.chunk_end);
    }

    pub fn parse(buf: &mut Bytes) -> Result<Self, ShardFormatError> {
        require(buf, BLOCK_LEN)?;
        let xorb_hash = read_hash(buf)?;
        let _cas_flags = buf.get_u32_le();
        let unpacked_segment_bytes = buf.get_u32_le();
        let chunk_start = buf.get_u32_le();
        let chunk_end = buf.get_u32_le();
        if chunk_end <= chunk_start {
            return Err(ShardFormatError::EmptyTermRange {
                chunk_start,
                chunk_end,
            });
        }
        Ok(Self {
            xorb_hash,
            unpacked_segment_bytes,
            chunk_start,
            chunk_end,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileVerificationEntry {
    pub range_hash: Hash,
}

impl FileVerificationEntry {
    pub fn write(&self, out: &mut BytesMut) {
        write_hash(out, &self.range_hash);
        out.put_bytes(0, 16);
    }

    pub fn parse(buf: &mut Bytes) -> Result<Self, ShardFormatError> {
        require(buf, BLOCK_LEN)?;
        let range_hash = read_hash(buf)?;
        buf.advance(16);
        Ok(Self { range_hash })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadataExt {
    pub sha256: [u8; 32],
}

impl FileMetadataExt {
    pub fn write(&self, out: &mut BytesMut) {
        out.put_slice(&self.sha256);
        out.put_bytes(0, 16);
    }

    pub fn parse(buf: &mut Bytes) -> Result<Self, ShardFormatError> {
        require(buf, BLOCK_LEN)?;
        let mut sha256 = [0u8; 32];
        buf.copy_to_slice(&mut sha256);
        buf.advance(16);
        Ok(Self { sha256 })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CasChunkSequenceHeader {
    pub xorb_hash: Hash,
    pub num_entries: u32,
    pub num_bytes_in_cas: u32,
    pub num_bytes_on_disk: u32,
}

impl CasChunkSequenceHeader {
    pub fn write(&self, out: &mut BytesMut) {
        write_hash(out, &self.xorb_hash);
        out.put_u32_le(0); // cas_flags, reserved
        out.put_u32_le(self.num_entries);
        out.put_u32_le(self.num_bytes_in_cas);
        out.put_u32_le(self.num_bytes_on_disk);
    }

    pub fn parse(buf: &mut Bytes) -> Result<Self, ShardFormatError> {
        require(buf, BLOCK_LEN)?;
        let xorb_hash = read_hash(buf)?;
        let _cas_flags = buf.get_u32_le();
        let num_entries = buf.get_u32_le();
        let num_bytes_in_cas = buf.get_u32_le();
        let num_bytes_on_disk = buf.get_u32_le();
        Ok(Self {
            xorb_hash,
            num_entries,
            num_bytes_in_cas,
            num_bytes_on_disk,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CasChunkSequenceEntry {
    pub chunk_hash: Hash,
    pub chunk_byte_range_start: u32,
    pub unpacked_segment_bytes: u32,
    pub flags: u32,
}

impl CasChunkSequenceEntry {
    pub fn global_dedup_eligible(&self) -> bool {
        self.flags & FLAG_GLOBAL_DEDUP_ELIGIBLE != 0
    }

    pub fn write(&self, out: &mut BytesMut) {
        write_hash(out, &self.chunk_hash);
        out.put_u32_le(self.chunk_byte_range_start);
        out.put_u32_le(self.unpacked_segment_bytes);
        out.put_u32_le(self.flags);
        out.put_bytes(0, 4);
    }

    pub fn parse(buf: &mut Bytes) -> Result<Self, ShardFormatError> {
        require(buf, BLOCK_LEN)?;
        let chunk_hash = read_hash(buf)?;
        let chunk_byte_range_start = buf.get_u32_le();
        let unpacked_segment_bytes = buf.get_u32_le();
        let flags = buf.get_u32_le();
        buf.advance(4);
        Ok(Self {
            chunk_hash,
            chunk_byte_range_start,
            unpacked_segment_bytes,
            flags,
        })
    }
}

/// A sorted lookup-table entry: truncated hash key plus a payload that
/// differs per table kind. `K` carries the payload fields.
pub trait LookupEntry: Sized + Copy {
    const LEN: usize;
    fn trunc_hash(&self) -> u64;
    fn write(&self, out: &mut BytesMut);
    fn parse(buf: &mut Bytes) -> Result<Self, ShardFormatError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileLookupEntry {
    pub trunc_hash: u64,
    pub file_index: u32,
}

impl LookupEntry for FileLookupEntry {
    const LEN: usize = FILE_LOOKUP_ENTRY_LEN;

    fn trunc_hash(&self) -> u64 {
        self.trunc_hash
    }

    fn write(&self, out: &mut BytesMut) {
        out.put_u64_le(self.trunc_hash);
        out.put_u32_le(self.file_index);
    }

    fn parse(buf: &mut Bytes) -> Result<Self, ShardFormatError> {
        require(buf, Self::LEN)?;
        Ok(Self {
            trunc_hash: buf.get_u64_le(),
            file_index: buf.get_u32_le(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CasLookupEntry {
    pub trunc_hash: u64,
    pub cas_index: u32,
}

impl LookupEntry for CasLookupEntry {
    const LEN: usize = CAS_LOOKUP_ENTRY_LEN;

    fn trunc_hash(&self) -> u64 {
        self.trunc_hash
    }

    fn write(&self, out: &mut BytesMut) {
        out.put_u64_le(self.trunc_hash);
        out.put_u32_le(self.cas_index);
    }

    fn parse(buf: &mut Bytes) -> Result<Self, ShardFormatError> {
        require(buf, Self::LEN)?;
        Ok(Self {
            trunc_hash: buf.get_u64_le(),
            cas_index: buf.get_u32_le(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLookupEntry {
    pub trunc_hash: u64,
    pub cas_index: u32,
    pub chunk_index: u32,
}

impl LookupEntry for ChunkLookupEntry {
    const LEN: usize = CHUNK_LOOKUP_ENTRY_LEN;

    fn trunc_hash(&self) -> u64 {
        self.trunc_hash
    }

    fn write(&self, out: &mut BytesMut) {
        out.put_u64_le(self.trunc_hash);
        out.put_u32_le(self.cas_index);
        out.put_u32_le(self.chunk_index);
    }

    fn parse(buf: &mut Bytes) -> Result<Self, ShardFormatError> {
        require(buf, Self::LEN)?;
        Ok(Self {
            trunc_hash: buf.get_u64_le(),
            cas_index: buf.get_u32_le(),
            chunk_index: buf.get_u32_le(),
        })
    }
}

pub fn write_lookup_table<E: LookupEntry>(out: &mut BytesMut, entries: &[E]) {
    for e in entries {
        e.write(out);
    }
}

pub fn parse_lookup_table<E: LookupEntry>(
    buf: &mut Bytes,
    num_entries: u64,
) -> Result<Vec<E>, ShardFormatError> {
    let num_entries = num_entries as usize;
    require(buf, num_entries * E::LEN)?;
    let mut out = Vec::with_capacity(num_entries);
    for _ in 0..num_entries {
        out.push(E::parse(buf)?);
    }
    let mut prev: Option<u64> = None;
    for e in &out {
        if let Some(p) = prev {
            if e.trunc_hash() < p {
                return Err(ShardFormatError::UnsortedLookupTable);
            }
        }
        prev = Some(e.trunc_hash());
    }
    Ok(out)
}

/// The 200-byte stored-form footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardFooter {
    pub file_info_offset: u64,
    pub cas_info_offset: u64,
    pub file_lookup_offset: u64,
    pub cas_lookup_offset: u64,
    pub chunk_lookup_offset: u64,
    pub file_lookup_num_entries: u64,
    pub cas_lookup_num_entries: u64,
    pub chunk_lookup_num_entries: u64,
    pub chunk_hash_key: [u8; 32],
    pub shard_creation_timestamp: u64,
    pub shard_key_expiry: u64,
    pub stored_bytes_on_disk: u64,
    pub materialized_bytes: u64,
    pub stored_bytes: u64,
    pub footer_offset: u64,
}

impl ShardFooter {
    pub fn write(&self, out: &mut BytesMut) {
        out.put_u64_le(FOOTER_VERSION);
        out.put_u64_le(self.file_info_offset);
        out.put_u64_le(self.cas_info_offset);
        out.put_u64_le(self.file_lookup_offset);
        out.put_u64_le(self.cas_lookup_offset);
        out.put_u64_le(self.chunk_lookup_offset);
        out.put_u64_le(self.file_lookup_num_entries);
        out.put_u64_le(self.cas_lookup_num_entries);
        out.put_u64_le(self.chunk_lookup_num_entries);
        out.put_slice(&self.chunk_hash_key);
        out.put_u64_le(self.shard_creation_timestamp);
        out.put_u64_le(self.shard_key_expiry);
        out.put_bytes(0, 48);
        out.put_u64_le(self.stored_bytes_on_disk);
        out.put_u64_le(self.materialized_bytes);
        out.put_u64_le(self.stored_bytes);
        out.put_u64_le(self.footer_offset);
    }

    pub fn parse(buf: &mut Bytes) -> Result<Self, ShardFormatError> {
        require(buf, FOOTER_LEN)?;
        let version = buf.get_u64_le();
        if version != FOOTER_VERSION {
            return Err(ShardFormatError::UnsupportedFooterVersion {
                expected: FOOTER_VERSION,
                found: version,
            });
        }
        let file_info_offset = buf.get_u64_le();
        let cas_info_offset = buf.get_u64_le();
        let file_lookup_offset = buf.get_u64_le();
        let cas_lookup_offset = buf.get_u64_le();
        let chunk_lookup_offset = buf.get_u64_le();
        let file_lookup_num_entries = buf.get_u64_le();
        let cas_lookup_num_entries = buf.get_u64_le();
        let chunk_lookup_num_entries = buf.get_u64_le();
        let mut chunk_hash_key = [0u8; 32];
        buf.copy_to_slice(&mut chunk_hash_key);
        let shard_creation_timestamp = buf.get_u64_le();
        let shard_key_expiry = buf.get_u64_le();
        buf.advance(48);
        let stored_bytes_on_disk = buf.get_u64_le();
        let materialized_bytes = buf.get_u64_le();
        let stored_bytes = buf.get_u64_le();
        let footer_offset = buf.get_u64_le();
        Ok(Self {
            file_info_offset,
            cas_info_offset,
            file_lookup_offset,
            cas_lookup_offset,
            chunk_lookup_offset,
            file_lookup_num_entries,
            cas_lookup_num_entries,
            chunk_lookup_num_entries,
            chunk_hash_key,
            shard_creation_timestamp,
            shard_key_expiry,
            stored_bytes_on_disk,
            materialized_bytes,
            stored_bytes,
            footer_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = ShardHeader { footer_size: 12345 };
        let mut out = BytesMut::new();
        header.write(&mut out);
        assert_eq!(out.len(), HEADER_LEN);
        let mut buf = out.freeze();
        assert_eq!(ShardHeader::parse(&mut buf).unwrap(), header);
    }

    #[test]
    fn header_rejects_bad_magic() {
        let mut out = BytesMut::new();
        out.put_bytes(0, 32);
        out.put_u64_le(HEADER_VERSION);
        out.put_u64_le(0);
        let mut buf = out.freeze();
        assert!(matches!(ShardHeader::parse(&mut buf), Err(ShardFormatError::BadMagic)));
    }

    #[test]
    fn bookend_round_trips() {
        let mut out = BytesMut::new();
        write_bookend(&mut out);
        assert_eq!(out.len(), BOOKEND_LEN);
        let mut buf = out.freeze();
        parse_bookend(&mut buf, "test").unwrap();
    }

    #[test]
    fn all_block_types_are_48_bytes() {
        let mut out = BytesMut::new();
        FileDataSequenceHeader {
            file_hash: Hash::from([1; 32]),
            flags: 0,
            num_entries: 0,
        }
        .write(&mut out);
        assert_eq!(out.len(), BLOCK_LEN);

        out.clear();
        FileDataSequenceEntry {
            xorb_hash: Hash::from([1; 32]),
            unpacked_segment_bytes: 1,
            chunk_start: 0,
            chunk_end: 1,
        }
        .write(&mut out);
        assert_eq!(out.len(), BLOCK_LEN);

        out.clear();
        FileVerificationEntry {
            range_hash: Hash::from([1; 32]),
        }
        .write(&mut out);
        assert_eq!(out.len(), BLOCK_LEN);

        out.clear();
        FileMetadataExt { sha256: [2; 32] }.write(&mut out);
        assert_eq!(out.len(), BLOCK_LEN);

        out.clear();
        CasChunkSequenceHeader {
            xorb_hash: Hash::from([1; 32]),
            num_entries: 1,
            num_bytes_in_cas: 1,
            num_bytes_on_disk: 1,
        }
        .write(&mut out);
        assert_eq!(out.len(), BLOCK_LEN);

        out.clear();
        CasChunkSequenceEntry {
            chunk_hash: Hash::from([1; 32]),
            chunk_byte_range_start: 0,
            unpacked_segment_bytes: 1,
            flags: 0,
        }
        .write(&mut out);
        assert_eq!(out.len(), BLOCK_LEN);
    }

    #[test]
    fn footer_is_200_bytes_and_round_trips() {
        let footer = ShardFooter {
            file_info_offset: 48,
            cas_info_offset: 500,
            file_lookup_offset: 900,
            cas_lookup_offset: 1000,
            chunk_lookup_offset: 1100,
            file_lookup_num_entries: 3,
            cas_lookup_num_entries: 2,
            chunk_lookup_num_entries: 10,
            chunk_hash_key: [9; 32],
            shard_creation_timestamp: 1_700_000_000,
            shard_key_expiry: 1_800_000_000,
            stored_bytes_on_disk: 123,
            materialized_bytes: 456,
            stored_bytes: 789,
            footer_offset: 1200,
        };
        let mut out = BytesMut::new();
        footer.write(&mut out);
        assert_eq!(out.len(), FOOTER_LEN);
        let mut buf = out.freeze();
        assert_eq!(ShardFooter::parse(&mut buf).unwrap(), footer);
    }

    #[test]
    fn lookup_table_rejects_unsorted_entries() {
        let entries = vec![
            CasLookupEntry {
                trunc_hash: 10,
                cas_index: 0,
            },
            CasLookupEntry {
                trunc_hash: 5,
                cas_index: 1,
            },
        ];
        let mut out = BytesMut::new();
        write_lookup_table(&mut out, &entries);
        let mut buf = out.freeze();
        assert!(matches!(
            parse_lookup_table::<CasLookupEntry>(&mut buf, entries.len() as u64),
            Err(ShardFormatError::UnsortedLookupTable)
        ));
    }
}
