//! The out-of-scope external collaborator boundary (§6): HTTP transport,
//! authentication, CDN fetch, and server-side CAS persistence are all named
//! here as a single async trait the core depends on but never implements
//! for a real network. Mirrors the teacher's `BlobService`/`DirectoryService`
//! split -- the rest of this crate only ever holds a `&dyn CasTransport`.

use async_trait::async_trait;
use bytes::Bytes;

use crate::digests::Hash;
use crate::errors::Error;

/// An inclusive byte range in HTTP `Range` semantics -- distinct from the
/// exclusive `[start, end)` convention used everywhere else in this crate
/// (§9, "end-index conventions collide").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpRange {
    pub start: u64,
    pub end_inclusive: u64,
}

impl HttpRange {
    pub fn new(start: u64, end_inclusive: u64) -> Self {
        Self { start, end_inclusive }
    }

    pub fn len(&self) -> u64 {
        self.end_inclusive - self.start + 1
    }
}

/// Where and how to fetch the bytes backing one term's xorb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchInfo {
    pub xorb_hash: Hash,
    pub url: String,
    pub url_range: HttpRange,
}

/// One contiguous slice of a file: a chunk range within a single xorb, plus
/// the independently-verifiable hash of that range (§4.4, glossary).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub xorb_hash: Hash,
    pub chunk_start: u32,
    pub chunk_end: u32,
    pub unpacked_length: u64,
    pub verification_hash: Hash,
}

/// Response to `get_reconstruction`: the ordered term list needed to
/// rebuild a file (or the requested byte range of one), plus where to fetch
/// each referenced xorb's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructionResponse {
    pub offset_into_first_range: u64,
    pub terms: Vec<Term>,
    pub fetch_info: Vec<FetchInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutXorbResult {
    pub was_inserted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutShardResult {
    AlreadyExisted,
    Registered,
}

/// Everything the core needs from a CAS deployment: reconstruction lookup,
/// global dedup query, object upload, and raw byte fetch. A production
/// implementation backs this with HTTP, auth, retries, and a CDN (§6); this
/// crate never implements that side, only the trait boundary and an
/// in-memory reference implementation ([`crate::memory_transport`]) for
/// tests.
#[async_trait]
pub trait CasTransport: Send + Sync {
    async fn get_reconstruction(
        &self,
        file_hash: Hash,
        byte_range: Option<HttpRange>,
    ) -> Result<ReconstructionResponse, Error>;

    async fn query_dedup(&self, namespace: &str, chunk_hash: Hash) -> Result<Option<Bytes>, Error>;

    async fn put_xorb(
        &self,
        namespace: &str,
        xorb_hash: Hash,
        bytes: Bytes,
    ) -> Result<PutXorbResult, Error>;

    async fn put_shard(&self, shard_bytes: Bytes) -> Result<PutShardResult, Error>;

    async fn fetch_bytes(&self, url: &str, range: HttpRange) -> Result<Bytes, Error>;
}
