//! Client-side deduplication (§4.9): decides which chunks are eligible for
//! the global dedup query, matches local chunk hashes against a (possibly
//! keyed) remote lookup table, and rewrites a file's chunk stream into
//! upload/reuse decisions subject to a minimum-run fragmentation policy.

use parking_lot::RwLock;
use tracing::{debug, instrument, warn};

use crate::chunking::Chunk;
use crate::digests::{h_keyed, Hash};
use crate::errors::{DedupError, Error};
use crate::shard::{trunc_hash, Shard};
use crate::transport::CasTransport;

pub const ELIGIBILITY_MODULUS: u64 = 1024;
pub const DEFAULT_MIN_RUN_CHUNKS: usize = 8;
pub const DEFAULT_MIN_RUN_BYTES: u64 = 1024 * 1024;

/// A chunk is eligible for the global dedup query if it opens the file, or
/// if the low 8 bytes of its hash are divisible by 1024 -- a fixed-density
/// content sample independent of position within the file.
pub fn is_dedup_eligible(chunk_hash: &Hash, is_first_chunk_of_file: bool) -> bool {
    is_first_chunk_of_file || trunc_hash(chunk_hash) % ELIGIBILITY_MODULUS == 0
}

/// One contiguous run of local chunks matched against a single remote xorb,
/// addressed the same way a reconstruction [`crate::transport::Term`] is:
/// `[chunk_start, chunk_end)` within that xorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchedRun {
    pub xorb_hash: Hash,
    pub chunk_start: u32,
    pub chunk_end: u32,
}

/// Fragmentation-avoidance policy: a matched run must clear one of these
/// thresholds, or it is rejected in favor of uploading fresh chunks (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinimumRunPolicy {
    pub min_chunks: usize,
    pub min_bytes: u64,
}

impl Default for MinimumRunPolicy {
    fn default() -> Self {
        Self {
            min_chunks: DEFAULT_MIN_RUN_CHUNKS,
            min_bytes: DEFAULT_MIN_RUN_BYTES,
        }
    }
}

impl MinimumRunPolicy {
    pub fn accepts(&self, run_chunks: usize, run_bytes: u64) -> bool {
        run_chunks >= self.min_chunks || run_bytes >= self.min_bytes
    }
}

/// Per-chunk outcome of deduplication: either the chunk must be packed into
/// a new xorb, or it is covered by an accepted matched run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupDecision {
    Upload,
    Reuse(MatchedRun),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MatchedChunk {
    xorb_hash: Hash,
    cas_chunk_index: u32,
}

/// Drives dedup queries through a [`CasTransport`] and caches the shards
/// they return, so that matching a later file against the same remote
/// content needs no further network round trip. The cache is shared across
/// concurrently chunking files (§5), guarded by a `parking_lot::RwLock` the
/// way the teacher's in-memory services guard their maps.
pub struct DeduplicationCoordinator {
    cached_shards: RwLock<Vec<Shard>>,
    policy: MinimumRunPolicy,
}

impl DeduplicationCoordinator {
    pub fn new(policy: MinimumRunPolicy) -> Self {
        Self {
            cached_shards: RwLock::new(Vec::new()),
            policy,
        }
    }

    /// Drops every cached shard whose key has expired as of `now` (epoch
    /// seconds). An expired shard's matches must never be trusted; callers
    /// re-query instead (§9). Each eviction is surfaced as a logged
    /// [`DedupError::KeyExpired`] diagnostic, not a hard error: the cache
    /// simply forgets the shard and callers transparently re-query.
    pub fn evict_expired(&self, now: u64) {
        self.cached_shards.write().retain(|shard| match shard.footer {
            Some(footer) if footer.shard_key_expiry <= now => {
                let err = DedupError::KeyExpired {
                    expiry: footer.shard_key_expiry,
                    now,
                };
                warn!(%err, "evicting expired dedup shard");
                false
            }
            _ => true,
        });
    }

    /// Rewrites `chunks` (in file order) into per-chunk upload/reuse
    /// decisions: queries the transport for each eligible chunk not already
    /// covered by a cached shard, groups consecutive matches against the
    /// same xorb into runs, and accepts a run only if it clears the
    /// minimum-run policy.
    #[instrument(skip_all, fields(chunks = chunks.len()))]
    pub async fn process_file_chunks(
        &self,
        transport: &dyn CasTransport,
        namespace: &str,
        chunks: &[Chunk],
    ) -> Result<Vec<DedupDecision>, Error> {
        let mut matches: Vec<Option<MatchedChunk>> = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            if !is_dedup_eligible(&chunk.hash, i == 0) {
                matches.push(None);
                continue;
            }
            matches.push(self.lookup(transport, namespace, chunk.hash).await?);
        }

        Ok(self.decide_from_matches(chunks, &matches))
    }

    fn decide_from_matches(
        &self,
        chunks: &[Chunk],
        matches: &[Option<MatchedChunk>],
    ) -> Vec<DedupDecision> {
        let mut decisions = vec![DedupDecision::Upload; chunks.len()];

        let mut i = 0;
        while i < chunks.len() {
            let Some(m) = matches[i] else {
                i += 1;
                continue;
            };

            let mut j = i + 1;
            let mut prev_index = m.cas_chunk_index;
            while let Some(Some(mj)) = matches.get(j) {
                if mj.xorb_hash != m.xorb_hash || mj.cas_chunk_index != prev_index + 1 {
                    break;
                }
                prev_index = mj.cas_chunk_index;
                j += 1;
            }

            let run_chunks = j - i;
            let run_bytes: u64 = chunks[i..j].iter().map(|c| c.len() as u64).sum();
            if self.policy.accepts(run_chunks, run_bytes) {
                let run = MatchedRun {
                    xorb_hash: m.xorb_hash,
                    chunk_start: m.cas_chunk_index,
                    chunk_end: m.cas_chunk_index + run_chunks as u32,
                };
                for decision in &mut decisions[i..j] {
                    *decision = DedupDecision::Reuse(run);
                }
            } else {
                let err = DedupError::RunTooShort {
                    run: run_chunks,
                    minimum: self.policy.min_chunks,
                };
                debug!(%err, "matched run rejected, falling back to upload");
            }
            i = j;
        }

        decisions
    }

    async fn lookup(
        &self,
        transport: &dyn CasTransport,
        namespace: &str,
        chunk_hash: Hash,
    ) -> Result<Option<MatchedChunk>, Error> {
        if let Some(m) = self.match_against_cache(chunk_hash) {
            return Ok(Some(m));
        }

        let Some(shard_bytes) = transport.query_dedup(namespace, chunk_hash).await? else {
            return Ok(None);
        };
        let shard = Shard::parse(shard_bytes)?;
        let matched = match_chunk_in_shard(&shard, chunk_hash);
        self.cached_shards.write().push(shard);
        Ok(matched)
    }

    fn match_against_cache(&self, chunk_hash: Hash) -> Option<MatchedChunk> {
        self.cached_shards
            .read()
            .iter()
            .find_map(|shard| match_chunk_in_shard(shard, chunk_hash))
    }
}

/// The asymmetric match oracle (§4.9, §9): the client never learns a remote
/// chunk hash, only whether a hash it already holds matches, by binary
/// searching the shard's chunk lookup table on `H_KEYED(key, local_hash)`
/// (or the raw hash, for an unkeyed shard).
fn match_chunk_in_shard(shard: &Shard, chunk_hash: Hash) -> Option<MatchedChunk> {
    let key = shard.chunk_hash_key()?;
    let query_hash = if key == [0u8; 32] {
        chunk_hash
    } else {
        h_keyed(&key, chunk_hash.as_bytes())
    };
    let (cas, chunk_index, _entry) = shard.find_chunk(trunc_hash(&query_hash))?;
    Some(MatchedChunk {
        xorb_hash: cas.header.xorb_hash,
        cas_chunk_index: chunk_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{SAMPLE_CHUNK, SAMPLE_CHUNKS};
    use crate::memory_transport::MemoryCasTransport;
    use crate::shard::{
        CasChunkSequenceEntry, CasChunkSequenceHeader, CasInfo, ShardBuilder, FLAG_GLOBAL_DEDUP_ELIGIBLE,
    };

    #[test]
    fn eligibility_always_includes_first_chunk() {
        let h = Hash::from([0xFF; 32]);
        assert!(is_dedup_eligible(&h, true));
    }

    #[test]
    fn minimum_run_policy_accepts_either_threshold() {
        let policy = MinimumRunPolicy {
            min_chunks: 8,
            min_bytes: 1_000_000,
        };
        assert!(policy.accepts(8, 1));
        assert!(policy.accepts(1, 1_000_000));
        assert!(!policy.accepts(1, 1));
    }

    #[tokio::test]
    async fn matched_run_below_policy_falls_back_to_upload() {
        let transport = MemoryCasTransport::new();
        let coordinator = DeduplicationCoordinator::new(MinimumRunPolicy {
            min_chunks: 8,
            min_bytes: u64::MAX,
        });

        // Build a remote shard (unkeyed) exposing one matching chunk.
        let remote_xorb_hash = Hash::from([0x77; 32]);
        let local_chunk = SAMPLE_CHUNK.clone();
        let mut builder = ShardBuilder::new();
        builder.add_cas(CasInfo {
            header: CasChunkSequenceHeader {
                xorb_hash: remote_xorb_hash,
                num_entries: 1,
                num_bytes_in_cas: local_chunk.len() as u32,
                num_bytes_on_disk: local_chunk.len() as u32,
            },
            entries: vec![CasChunkSequenceEntry {
                chunk_hash: local_chunk.hash,
                chunk_byte_range_start: 0,
                unpacked_segment_bytes: local_chunk.len() as u32,
                flags: FLAG_GLOBAL_DEDUP_ELIGIBLE,
            }],
        });
        let shard_bytes = builder.finish_stored_form(0, u64::MAX);
        transport.register_dedup_match(local_chunk.hash, shard_bytes);

        let chunks = vec![local_chunk];
        let decisions = coordinator
            .process_file_chunks(&transport, "ns", &chunks)
            .await
            .unwrap();

        // Single matched chunk, but the policy requires 8+ chunks and
        // effectively unlimited bytes: the run is rejected.
        assert_eq!(decisions, vec![DedupDecision::Upload]);
    }

    #[tokio::test]
    async fn matched_run_meeting_policy_is_reused() {
        let transport = MemoryCasTransport::new();
        let coordinator = DeduplicationCoordinator::new(MinimumRunPolicy {
            min_chunks: 2,
            min_bytes: u64::MAX,
        });

        let remote_xorb_hash = Hash::from([0x88; 32]);
        let local_chunks = vec![SAMPLE_CHUNKS[0].clone(), SAMPLE_CHUNKS[1].clone()];

        let mut builder = ShardBuilder::new();
        builder.add_cas(CasInfo {
            header: CasChunkSequenceHeader {
                xorb_hash: remote_xorb_hash,
                num_entries: 2,
                num_bytes_in_cas: (local_chunks[0].len() + local_chunks[1].len()) as u32,
                num_bytes_on_disk: (local_chunks[0].len() + local_chunks[1].len()) as u32,
            },
            entries: vec![
                CasChunkSequenceEntry {
                    chunk_hash: local_chunks[0].hash,
                    chunk_byte_range_start: 0,
                    unpacked_segment_bytes: local_chunks[0].len() as u32,
                    flags: FLAG_GLOBAL_DEDUP_ELIGIBLE,
                },
                CasChunkSequenceEntry {
                    chunk_hash: local_chunks[1].hash,
                    chunk_byte_range_start: local_chunks[0].len() as u32,
                    unpacked_segment_bytes: local_chunks[1].len() as u32,
                    flags: FLAG_GLOBAL_DEDUP_ELIGIBLE,
                },
            ],
        });
        let shard_bytes = builder.finish_stored_form(0, u64::MAX);
        transport.register_dedup_match(local_chunks[0].hash, shard_bytes.clone());
        transport.register_dedup_match(local_chunks[1].hash, shard_bytes);

        let decisions = coordinator
            .process_file_chunks(&transport, "ns", &local_chunks)
            .await
            .unwrap();

        let expected_run = MatchedRun {
            xorb_hash: remote_xorb_hash,
            chunk_start: 0,
            chunk_end: 2,
        };
        assert_eq!(
            decisions,
            vec![
                DedupDecision::Reuse(expected_run),
                DedupDecision::Reuse(expected_run),
            ]
        );
    }

    #[tokio::test]
    async fn second_lookup_hits_cache_not_transport() {
        let transport = MemoryCasTransport::new();
        let coordinator = DeduplicationCoordinator::new(MinimumRunPolicy::default());

        let remote_xorb_hash = Hash::from([0x55; 32]);
        let shared_chunk = SAMPLE_CHUNK.clone();

        let mut builder = ShardBuilder::new();
        builder.add_cas(CasInfo {
            header: CasChunkSequenceHeader {
                xorb_hash: remote_xorb_hash,
                num_entries: 1,
                num_bytes_in_cas: shared_chunk.len() as u32,
                num_bytes_on_disk: shared_chunk.len() as u32,
            },
            entries: vec![CasChunkSequenceEntry {
                chunk_hash: shared_chunk.hash,
                chunk_byte_range_start: 0,
                unpacked_segment_bytes: shared_chunk.len() as u32,
                flags: FLAG_GLOBAL_DEDUP_ELIGIBLE,
            }],
        });
        transport.register_dedup_match(shared_chunk.hash, builder.finish_stored_form(0, u64::MAX));

        let first = coordinator.lookup(&transport, "ns", shared_chunk.hash).await.unwrap();
        assert!(first.is_some());

        // Remove the registration; a cache hit must not need it anymore.
        let transport2 = MemoryCasTransport::new();
        let second = coordinator.lookup(&transport2, "ns", shared_chunk.hash).await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn evict_expired_drops_stale_shards() {
        let coordinator = DeduplicationCoordinator::new(MinimumRunPolicy::default());
        let builder = ShardBuilder::new();
        let shard = Shard::parse(builder.finish_stored_form(0, 100)).unwrap();
        coordinator.cached_shards.write().push(shard);

        coordinator.evict_expired(200);
        assert!(coordinator.cached_shards.read().is_empty());
    }
}
