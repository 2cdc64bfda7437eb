//! A shard: the binary metadata object describing file reconstructions and
//! the xorbs they reference (§4.7). Upload form is header + file-info +
//! CAS-info, each section closed with a bookend; stored form adds the three
//! sorted lookup tables and a 200-byte footer whose fields are absolute
//! byte offsets into the shard, so a stored shard is fully self-describing
//! once its footer is read.

mod format;

use bytes::{Bytes, BytesMut};

pub use format::{
    CasChunkSequenceEntry, CasChunkSequenceHeader, CasLookupEntry, ChunkLookupEntry,
    FileDataSequenceEntry, FileDataSequenceHeader, FileLookupEntry, FileMetadataExt,
    FileVerificationEntry, ShardFooter, ShardHeader, FLAG_GLOBAL_DEDUP_ELIGIBLE,
    FLAG_WITH_METADATA_EXT, FLAG_WITH_VERIFICATION, FOOTER_LEN, HEADER_LEN,
};

use crate::digests::Hash;
use crate::errors::ShardFormatError;

/// Truncates a hash to its lookup-table key: the last 8 bytes read as a
/// little-endian u64 (the same "low bytes" convention the aggregated hash
/// tree's cut point and the dedup eligibility predicate use, §4.3/§4.9).
pub fn trunc_hash(hash: &Hash) -> u64 {
    u64::from_le_bytes(hash.as_bytes()[24..32].try_into().unwrap())
}

/// One file's reconstruction: a header plus its ordered data-sequence
/// entries and optional verification/metadata blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub header: FileDataSequenceHeader,
    pub entries: Vec<FileDataSequenceEntry>,
    pub verification: Option<Vec<FileVerificationEntry>>,
    pub metadata_ext: Option<FileMetadataExt>,
}

/// One xorb's chunk catalogue, as recorded by a shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasInfo {
    pub header: CasChunkSequenceHeader,
    pub entries: Vec<CasChunkSequenceEntry>,
}

/// Accumulates file and CAS info blocks and serializes either form.
#[derive(Default)]
pub struct ShardBuilder {
    files: Vec<FileInfo>,
    cas_entries: Vec<CasInfo>,
    chunk_hash_key: [u8; 32],
}

impl ShardBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server-rotated key used to produce the chunk lookup table's
    /// keyed hashes (§4.9). Zero means "unkeyed": the raw chunk hash is used.
    pub fn with_chunk_hash_key(mut self, key: [u8; 32]) -> Self {
        self.chunk_hash_key = key;
        self
    }

    pub fn add_file(&mut self, file: FileInfo) {
        self.files.push(file);
    }

    pub fn add_cas(&mut self, cas: CasInfo) {
        self.cas_entries.push(cas);
    }

    fn write_file_info_section(&self, out: &mut BytesMut) {
        for file in &self.files {
            file.header.write(out);
            for e in &file.entries {
                e.write(out);
            }
            if let Some(v) = &file.verification {
                for e in v {
                    e.write(out);
                }
            }
            if let Some(ext) = &file.metadata_ext {
                ext.write(out);
            }
        }
        format::write_bookend(out);
    }

    fn write_cas_info_section(&self, out: &mut BytesMut) {
        for cas in &self.cas_entries {
            cas.header.write(out);
            for e in &cas.entries {
                e.write(out);
            }
        }
        format::write_bookend(out);
    }

    /// Serializes the upload form: header (`footer_size = 0`), file-info
    /// section, CAS-info section. No lookup tables, no footer.
    pub fn finish_upload_form(&self) -> Bytes {
        let mut out = BytesMut::new();
        ShardHeader { footer_size: 0 }.write(&mut out);
        self.write_file_info_section(&mut out);
        self.write_cas_info_section(&mut out);
        out.freeze()
    }

    /// Serializes the stored form: header, file-info, CAS-info, the three
    /// sorted lookup tables, then the 200-byte footer.
    pub fn finish_stored_form(
        &self,
        shard_creation_timestamp: u64,
        shard_key_expiry: u64,
    ) -> Bytes {
        let mut out = BytesMut::new();
        ShardHeader {
            footer_size: format::FOOTER_LEN as u64,
        }
        .write(&mut out);

        let file_info_offset = out.len() as u64;
        self.write_file_info_section(&mut out);

        let cas_info_offset = out.len() as u64;
        self.write_cas_info_section(&mut out);

        let file_lookup_offset = out.len() as u64;
        let mut file_lookup: Vec<FileLookupEntry> = self
            .files
            .iter()
            .enumerate()
            .map(|(i, f)| FileLookupEntry {
                trunc_hash: trunc_hash(&f.header.file_hash),
                file_index: i as u32,
            })
            .collect();
        file_lookup.sort_by_key(|e| e.trunc_hash);
        format::write_lookup_table(&mut out, &file_lookup);

        let cas_lookup_offset = out.len() as u64;
        let mut cas_lookup: Vec<CasLookupEntry> = self
            .cas_entries
            .iter()
            .enumerate()
            .map(|(i, c)| CasLookupEntry {
                trunc_hash: trunc_hash(&c.header.xorb_hash),
                cas_index: i as u32,
            })
            .collect();
        cas_lookup.sort_by_key(|e| e.trunc_hash);
        format::write_lookup_table(&mut out, &cas_lookup);

        let chunk_lookup_offset = out.len() as u64;
        let keyed = self.chunk_hash_key != [0u8; 32];
        let mut chunk_lookup: Vec<ChunkLookupEntry> = self
            .cas_entries
            .iter()
            .enumerate()
            .flat_map(|(cas_index, c)| {
                c.entries.iter().enumerate().map(move |(chunk_index, e)| {
                    let hash = e.chunk_hash;
                    (cas_index, chunk_index, hash)
                })
            })
            .map(|(cas_index, chunk_index, hash)| {
                let key = if keyed {
                    crate::digests::h_keyed(&self.chunk_hash_key, hash.as_bytes())
                } else {
                    hash
                };
                ChunkLookupEntry {
                    trunc_hash: trunc_hash(&key),
                    cas_index: cas_index as u32,
                    chunk_index: chunk_index as u32,
                }
            })
            .collect();
        chunk_lookup.sort_by_key(|e| e.trunc_hash);
        format::write_lookup_table(&mut out, &chunk_lookup);

        let footer_offset = out.len() as u64;
        let footer = ShardFooter {
            file_info_offset,
            cas_info_offset,
            file_lookup_offset,
            cas_lookup_offset,
            chunk_lookup_offset,
            file_lookup_num_entries: file_lookup.len() as u64,
            cas_lookup_num_entries: cas_lookup.len() as u64,
            chunk_lookup_num_entries: chunk_lookup.len() as u64,
            chunk_hash_key: self.chunk_hash_key,
            shard_creation_timestamp,
            shard_key_expiry,
            stored_bytes_on_disk: self
                .cas_entries
                .iter()
                .map(|c| c.header.num_bytes_on_disk as u64)
                .sum(),
            materialized_bytes: self
                .cas_entries
                .iter()
                .map(|c| c.header.num_bytes_in_cas as u64)
                .sum(),
            stored_bytes: footer_offset + format::FOOTER_LEN as u64,
            footer_offset,
        };
        footer.write(&mut out);

        out.freeze()
    }
}

/// A parsed shard, upload or stored form. `footer` and the lookup tables are
/// `None`/empty for upload form.
pub struct Shard {
    pub header: ShardHeader,
    pub files: Vec<FileInfo>,
    pub cas_entries: Vec<CasInfo>,
    pub footer: Option<ShardFooter>,
    file_lookup: Vec<FileLookupEntry>,
    cas_lookup: Vec<CasLookupEntry>,
    chunk_lookup: Vec<ChunkLookupEntry>,
}

impl Shard {
    pub fn is_stored_form(&self) -> bool {
        self.footer.is_some()
    }

    pub fn chunk_hash_key(&self) -> Option<[u8; 32]> {
        self.footer.map(|f| f.chunk_hash_key)
    }

    pub fn find_file(&self, hash: &Hash) -> Option<&FileInfo> {
        let key = trunc_hash(hash);
        let idx = self
            .file_lookup
            .binary_search_by_key(&key, |e| e.trunc_hash)
            .ok()?;
        self.files.get(self.file_lookup[idx].file_index as usize)
    }

    pub fn find_cas(&self, xorb_hash: &Hash) -> Option<&CasInfo> {
        let key = trunc_hash(xorb_hash);
        let idx = self
            .cas_lookup
            .binary_search_by_key(&key, |e| e.trunc_hash)
            .ok()?;
        self.cas_entries.get(self.cas_lookup[idx].cas_index as usize)
    }

    /// Looks up a (possibly keyed) truncated chunk hash in the chunk lookup
    /// table, returning the matching CAS block, the chunk's index within
    /// that block's entries (its position within the referenced xorb), and
    /// the chunk entry itself.
    pub fn find_chunk(
        &self,
        keyed_trunc_hash: u64,
    ) -> Option<(&CasInfo, u32, &CasChunkSequenceEntry)> {
        let idx = self
            .chunk_lookup
            .binary_search_by_key(&keyed_trunc_hash, |e| e.trunc_hash)
            .ok()?;
        let entry = &self.chunk_lookup[idx];
        let cas = self.cas_entries.get(entry.cas_index as usize)?;
        let chunk = cas.entries.get(entry.chunk_index as usize)?;
        Some((cas, entry.chunk_index, chunk))
    }

    fn parse_file_info_section(buf: &mut Bytes) -> Result<Vec<FileInfo>, ShardFormatError> {
        let mut files = Vec::new();
        while !format::peek_is_bookend(buf) {
            let header = FileDataSequenceHeader::parse(buf)?;
            let mut entries = Vec::with_capacity(header.num_entries as usize);
            for _ in 0..header.num_entries {
                entries.push(FileDataSequenceEntry::parse(buf)?);
            }
            let verification = if header.with_verification() {
                let mut v = Vec::with_capacity(header.num_entries as usize);
                for _ in 0..header.num_entries {
                    v.push(FileVerificationEntry::parse(buf)?);
                }
                Some(v)
            } else {
                None
            };
            let metadata_ext = if header.with_metadata_ext() {
                Some(FileMetadataExt::parse(buf)?)
            } else {
                None
            };
            files.push(FileInfo {
                header,
                entries,
                verification,
                metadata_ext,
            });
        }
        format::parse_bookend(buf, "file info")?;
        Ok(files)
    }

    fn parse_cas_info_section(buf: &mut Bytes) -> Result<Vec<CasInfo>, ShardFormatError> {
        let mut cas_entries = Vec::new();
        while !format::peek_is_bookend(buf) {
            let header = CasChunkSequenceHeader::parse(buf)?;
            let mut entries = Vec::with_capacity(header.num_entries as usize);
            for _ in 0..header.num_entries {
                entries.push(CasChunkSequenceEntry::parse(buf)?);
            }
            cas_entries.push(CasInfo { header, entries });
        }
        format::parse_bookend(buf, "CAS info")?;
        Ok(cas_entries)
    }

    /// Parses a complete shard, upload or stored form (distinguished by
    /// `header.footer_size`).
    pub fn parse(data: Bytes) -> Result<Self, ShardFormatError> {
        let mut cursor = data.clone();
        let header = ShardHeader::parse(&mut cursor)?;

        if header.footer_size == 0 {
            let files = Self::parse_file_info_section(&mut cursor)?;
            let cas_entries = Self::parse_cas_info_section(&mut cursor)?;
            return Ok(Self {
                header,
                files,
                cas_entries,
                footer: None,
                file_lookup: Vec::new(),
                cas_lookup: Vec::new(),
                chunk_lookup: Vec::new(),
            });
        }

        if data.len() < format::FOOTER_LEN {
            return Err(ShardFormatError::Truncated {
                needed: format::FOOTER_LEN,
                have: data.len(),
            });
        }
        let footer_start = data.len() - format::FOOTER_LEN;
        let mut footer_buf = data.slice(footer_start..);
        let footer = ShardFooter::parse(&mut footer_buf)?;

        let tail_from = |offset: u64| -> Result<Bytes, ShardFormatError> {
            let offset = offset as usize;
            if offset > data.len() {
                return Err(ShardFormatError::Truncated {
                    needed: offset,
                    have: data.len(),
                });
            }
            Ok(data.slice(offset..))
        };

        let mut file_info_buf = tail_from(footer.file_info_offset)?;
        let files = Self::parse_file_info_section(&mut file_info_buf)?;

        let mut cas_info_buf = tail_from(footer.cas_info_offset)?;
        let cas_entries = Self::parse_cas_info_section(&mut cas_info_buf)?;

        let mut file_lookup_buf = tail_from(footer.file_lookup_offset)?;
        let file_lookup = format::parse_lookup_table::<FileLookupEntry>(
            &mut file_lookup_buf,
            footer.file_lookup_num_entries,
        )?;

        let mut cas_lookup_buf = tail_from(footer.cas_lookup_offset)?;
        let cas_lookup = format::parse_lookup_table::<CasLookupEntry>(
            &mut cas_lookup_buf,
            footer.cas_lookup_num_entries,
        )?;

        let mut chunk_lookup_buf = tail_from(footer.chunk_lookup_offset)?;
        let chunk_lookup = format::parse_lookup_table::<ChunkLookupEntry>(
            &mut chunk_lookup_buf,
            footer.chunk_lookup_num_entries,
        )?;

        Ok(Self {
            header,
            files,
            cas_entries,
            footer: Some(footer),
            file_lookup,
            cas_lookup,
            chunk_lookup,
        })
    }
}
