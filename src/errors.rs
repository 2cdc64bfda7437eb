use thiserror::Error;

/// Crate-wide error type for operational failures: storage/transport
/// collaborator errors and malformed requests. Format- and integrity-specific
/// failures get their own enums ([`XorbFormatError`], [`ShardFormatError`])
/// since callers usually want the structured detail (offsets, idents) rather
/// than a string.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("xorb format error: {0}")]
    Xorb(#[from] XorbFormatError),

    #[error("shard format error: {0}")]
    Shard(#[from] ShardFormatError),

    #[error("dedup error: {0}")]
    Dedup(#[from] DedupError),

    #[error("reconstruction error: {0}")]
    Reconstruction(#[from] ReconstructionError),
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        if value.kind() == std::io::ErrorKind::InvalidInput {
            Error::InvalidRequest(value.to_string())
        } else {
            Error::Transport(value.to_string())
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        match value {
            Error::InvalidRequest(msg) => Self::new(std::io::ErrorKind::InvalidInput, msg),
            other => Self::new(std::io::ErrorKind::Other, other.to_string()),
        }
    }
}

/// Failures parsing or validating a xorb (chunk headers, `CasObjectInfo`
/// footer). All fatal for the object; the object must not be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum XorbFormatError {
    #[error("truncated xorb: need at least {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },

    #[error("unexpected ident {found:?}, expected {expected:?}")]
    UnexpectedIdent { expected: &'static [u8], found: Vec<u8> },

    #[error("unsupported {what} version {found}, expected {expected}")]
    UnsupportedVersion {
        what: &'static str,
        expected: u8,
        found: u8,
    },

    #[error("chunk {index}: uncompressed_size {size} out of bounds (0, {max}]")]
    UncompressedSizeOutOfBounds {
        index: usize,
        size: u32,
        max: u32,
    },

    #[error("chunk {index}: compressed_size {size} out of bounds (0, {max}]")]
    CompressedSizeOutOfBounds {
        index: usize,
        size: u32,
        max: u32,
    },

    #[error("chunk {index}: boundary table is not strictly increasing")]
    NonIncreasingBoundary { index: usize },

    #[error("chunk {index}: boundary total {total} does not match region length {region_len}")]
    BoundaryTotalMismatch {
        index: usize,
        total: u32,
        region_len: u32,
    },

    #[error("xorb exceeds MAX_XORB_SIZE ({size} > {max})")]
    XorbTooLarge { size: usize, max: usize },

    #[error("xorb exceeds MAX_XORB_CHUNKS ({count} > {max})")]
    TooManyChunks { count: usize, max: usize },

    #[error("xorb has no chunks")]
    Empty,

    #[error("computed xorb hash does not match stored hash")]
    HashMismatch,

    #[error("decompression failed: {0}")]
    Decompression(String),

    #[error("invalid digest length: {0}")]
    InvalidDigestLen(usize),
}

/// Failures parsing or validating a shard (header, sections, lookup tables,
/// footer). All fatal for the object.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShardFormatError {
    #[error("truncated shard: need at least {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },

    #[error("bad magic sequence")]
    BadMagic,

    #[error("unsupported header version {found}, expected {expected}")]
    UnsupportedHeaderVersion { expected: u64, found: u64 },

    #[error("unsupported footer version {found}, expected {expected}")]
    UnsupportedFooterVersion { expected: u64, found: u64 },

    #[error("missing bookend after {section} section")]
    MissingBookend { section: &'static str },

    #[error("lookup table is not sorted ascending")]
    UnsortedLookupTable,

    #[error("invalid digest length: {0}")]
    InvalidDigestLen(usize),

    #[error("term chunk_end ({chunk_end}) <= chunk_start ({chunk_start})")]
    EmptyTermRange { chunk_start: u32, chunk_end: u32 },
}

/// Failures in the deduplication coordinator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DedupError {
    #[error("dedup shard key expired at {expiry}, now is {now}")]
    KeyExpired { expiry: u64, now: u64 },

    #[error("matched run shorter than minimum-run policy ({run} < {minimum})")]
    RunTooShort { run: usize, minimum: usize },
}

/// Failures in the reconstruction engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconstructionError {
    #[error("term {index} references out-of-range chunks [{start}, {end}) in xorb with {chunk_count} chunks")]
    TermOutOfRange {
        index: usize,
        start: u32,
        end: u32,
        chunk_count: usize,
    },

    #[error("offset_into_first_range ({offset}) exceeds first term length ({len})")]
    OffsetExceedsFirstTerm { offset: u64, len: u64 },
}

impl From<crate::digests::Error> for XorbFormatError {
    fn from(e: crate::digests::Error) -> Self {
        match e {
            crate::digests::Error::InvalidDigestLen(n) => XorbFormatError::InvalidDigestLen(n),
        }
    }
}

impl From<crate::digests::Error> for ShardFormatError {
    fn from(e: crate::digests::Error) -> Self {
        match e {
            crate::digests::Error::InvalidDigestLen(n) => ShardFormatError::InvalidDigestLen(n),
        }
    }
}
