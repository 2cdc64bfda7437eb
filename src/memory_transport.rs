//! An in-memory [`CasTransport`] for tests and local experimentation:
//! xorbs, shards, and reconstruction responses live in
//! `parking_lot::RwLock<HashMap>`s, the same pattern the teacher's
//! `MemoryBlobService` uses for its blob store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::instrument;

use crate::digests::Hash;
use crate::errors::Error;
use crate::transport::{
    CasTransport, HttpRange, PutShardResult, PutXorbResult, ReconstructionResponse,
};

#[derive(Default)]
pub struct MemoryCasTransport {
    xorbs_by_url: RwLock<HashMap<String, Bytes>>,
    xorbs_by_hash: RwLock<HashMap<Hash, Bytes>>,
    shards: RwLock<Vec<Bytes>>,
    dedup_index: RwLock<HashMap<Hash, Bytes>>,
    reconstructions: RwLock<HashMap<Hash, ReconstructionResponse>>,
    next_url_id: AtomicU64,
}

impl MemoryCasTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a xorb's bytes under a freshly minted URL, as if it had
    /// already been uploaded and were reachable via CDN. Returns the URL to
    /// use in a [`crate::transport::FetchInfo`].
    pub fn register_xorb(&self, xorb_hash: Hash, bytes: Bytes) -> String {
        let id = self.next_url_id.fetch_add(1, Ordering::Relaxed);
        let url = format!("memory://xorb/{id}");
        self.xorbs_by_url.write().insert(url.clone(), bytes.clone());
        self.xorbs_by_hash.write().insert(xorb_hash, bytes);
        url
    }

    /// Registers the reconstruction response a real server would compute
    /// from its shard index, so `get_reconstruction` can serve it back.
    pub fn register_reconstruction(&self, file_hash: Hash, response: ReconstructionResponse) {
        self.reconstructions.write().insert(file_hash, response);
    }

    /// Makes `shard_bytes` the dedup response for any future query of
    /// `chunk_hash`.
    pub fn register_dedup_match(&self, chunk_hash: Hash, shard_bytes: Bytes) {
        self.dedup_index.write().insert(chunk_hash, shard_bytes);
    }

    pub fn shards_uploaded(&self) -> usize {
        self.shards.read().len()
    }

    pub fn xorb_by_hash(&self, hash: Hash) -> Option<Bytes> {
        self.xorbs_by_hash.read().get(&hash).cloned()
    }
}

#[async_trait]
impl CasTransport for MemoryCasTransport {
    #[instrument(skip(self))]
    async fn get_reconstruction(
        &self,
        file_hash: Hash,
        byte_range: Option<HttpRange>,
    ) -> Result<ReconstructionResponse, Error> {
        // A real server would slice the term list to `byte_range`; this
        // reference double just returns whatever was registered whole.
        let _ = byte_range;
        self.reconstructions.read().get(&file_hash).cloned().ok_or_else(|| {
            Error::InvalidRequest(format!("no reconstruction registered for {file_hash}"))
        })
    }

    #[instrument(skip(self))]
    async fn query_dedup(
        &self,
        _namespace: &str,
        chunk_hash: Hash,
    ) -> Result<Option<Bytes>, Error> {
        Ok(self.dedup_index.read().get(&chunk_hash).cloned())
    }

    #[instrument(skip(self, bytes))]
    async fn put_xorb(
        &self,
        _namespace: &str,
        xorb_hash: Hash,
        bytes: Bytes,
    ) -> Result<PutXorbResult, Error> {
        let was_inserted = self.xorbs_by_hash.write().insert(xorb_hash, bytes).is_none();
        Ok(PutXorbResult { was_inserted })
    }

    #[instrument(skip(self, shard_bytes))]
    async fn put_shard(&self, shard_bytes: Bytes) -> Result<PutShardResult, Error> {
        self.shards.write().push(shard_bytes);
        Ok(PutShardResult::Registered)
    }

    #[instrument(skip(self))]
    async fn fetch_bytes(&self, url: &str, range: HttpRange) -> Result<Bytes, Error> {
        let bytes = self.xorbs_by_url.read().get(url).cloned().ok_or_else(|| {
            Error::InvalidRequest(format!("no object registered at {url}"))
        })?;

        let start = range.start as usize;
        let end_inclusive = (range.end_inclusive as usize).min(bytes.len().saturating_sub(1));
        if bytes.is_empty() || start >= bytes.len() || start > end_inclusive {
            return Err(Error::InvalidRequest(format!(
                "range {start}..={end} out of bounds for {len}-byte object",
                start = range.start,
                end = range.end_inclusive,
                len = bytes.len()
            )));
        }
        Ok(bytes.slice(start..=end_inclusive))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_bytes_respects_registered_range() {
        let transport = MemoryCasTransport::new();
        let xorb_hash = Hash::from([1; 32]);
        let url = transport.register_xorb(xorb_hash, Bytes::from_static(b"0123456789"));

        let got = transport.fetch_bytes(&url, HttpRange::new(2, 5)).await.unwrap();
        assert_eq!(&got[..], b"2345");
    }

    #[tokio::test]
    async fn fetch_bytes_rejects_unknown_url() {
        let transport = MemoryCasTransport::new();
        let err = transport
            .fetch_bytes("memory://xorb/missing", HttpRange::new(0, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn put_xorb_reports_first_insertion_only() {
        let transport = MemoryCasTransport::new();
        let hash = Hash::from([2; 32]);
        let first = transport
            .put_xorb("ns", hash, Bytes::from_static(b"data"))
            .await
            .unwrap();
        let second = transport
            .put_xorb("ns", hash, Bytes::from_static(b"data"))
            .await
            .unwrap();
        assert!(first.was_inserted);
        assert!(!second.was_inserted);
    }

    #[tokio::test]
    async fn query_dedup_returns_none_when_unregistered() {
        let transport = MemoryCasTransport::new();
        let result = transport.query_dedup("ns", Hash::from([3; 32])).await.unwrap();
        assert!(result.is_none());
    }
}
