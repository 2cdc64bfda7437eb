//! Keyed 256-bit hashes and the byte-swapped hex string representation used
//! throughout the xorb and shard wire formats.
//!
//! The suite is deployment-global (never negotiated on the wire): BLAKE3 in
//! keyed mode, bound to four distinct 32-byte domain keys. Generalizes the
//! teacher's `B3Digest` (a thin wrapper over `Bytes`, used because digests
//! also cross a protobuf boundary there) to a fixed-size `Copy` array, since
//! every hash in this protocol is exactly 32 bytes and never touches a wire
//! codec outside this crate.

use data_encoding::HEXLOWER;
use thiserror::Error;

pub const HASH_LEN: usize = 32;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("invalid digest length: {0}")]
    InvalidDigestLen(usize),
}

/// A 32-byte keyed hash output.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; HASH_LEN]);

impl Hash {
    pub const fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Lower-hex encoding of the raw bytes, *not* the wire string form.
    /// Useful for log lines; never appears on the wire.
    pub fn to_raw_hex(self) -> String {
        HEXLOWER.encode(&self.0)
    }

    /// The byte-swapped hex string form mandated by the wire formats (see
    /// [`hash_to_string`]).
    pub fn to_wire_string(self) -> String {
        hash_to_string(&self)
    }
}

impl From<[u8; HASH_LEN]> for Hash {
    fn from(value: [u8; HASH_LEN]) -> Self {
        Self(value)
    }
}

impl From<blake3::Hash> for Hash {
    fn from(value: blake3::Hash) -> Self {
        Self(*value.as_bytes())
    }
}

impl TryFrom<&[u8]> for Hash {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.len() != HASH_LEN {
            return Err(Error::InvalidDigestLen(value.len()));
        }
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(value);
        Ok(Self(out))
    }
}

impl TryFrom<Vec<u8>> for Hash {
    type Error = Error;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::try_from(value.as_slice())
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hash_to_string(self))
    }
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash({})", hash_to_string(self))
    }
}

/// `ZERO_HASH`: the root of an empty aggregated hash tree (§4.3).
pub const ZERO_HASH: Hash = Hash([0u8; HASH_LEN]);

// Domain keys. Distinct, literal, 32 bytes each — the four bindings the
// suite uses to separate chunk, internal-node, verification, and
// file-final hashing so that a value computed for one purpose can never be
// replayed as another. An interoperable deployment fixes these bytes
// globally; see DESIGN.md for how these particular literals were chosen.
pub const DATA_KEY: [u8; 32] = [
    0x05, 0x20, 0xb5, 0xa3, 0x9d, 0xf7, 0x11, 0xcf, 0xfe, 0x6a, 0xfe, 0x44, 0x44, 0x83, 0xe4, 0x2b,
    0xa1, 0xd9, 0x1c, 0xc1, 0xa4, 0x49, 0x4d, 0x60, 0x38, 0x41, 0x32, 0xc2, 0xea, 0x66, 0xa2, 0x6e,
];

pub const INTERNAL_NODE_KEY: [u8; 32] = [
    0x28, 0xaf, 0xad, 0x24, 0xf7, 0x92, 0x1c, 0x7d, 0x0b, 0x6e, 0xba, 0xe4, 0x73, 0xf4, 0x6a, 0xcc,
    0xa8, 0xc3, 0xe2, 0xa8, 0x95, 0xf3, 0x56, 0x34, 0x24, 0x10, 0xbb, 0x31, 0x33, 0x2f, 0xbd, 0x56,
];

pub const VERIFICATION_KEY: [u8; 32] = [
    0xa4, 0x52, 0x96, 0x00, 0xe4, 0xeb, 0xd0, 0x49, 0x8d, 0x6e, 0x30, 0xa2, 0x32, 0x85, 0xcb, 0xfa,
    0x56, 0x82, 0x25, 0x36, 0xcd, 0x60, 0x47, 0xae, 0x57, 0xe2, 0x16, 0xef, 0x5b, 0x88, 0xe2, 0x64,
];

pub const ZERO_KEY: [u8; 32] = [
    0x20, 0xd0, 0x17, 0x15, 0xc7, 0x50, 0x24, 0xc6, 0xb8, 0x13, 0xe9, 0xa3, 0xca, 0xa4, 0x17, 0xcd,
    0x6d, 0x32, 0x47, 0x01, 0x4f, 0x68, 0xc0, 0xb0, 0xe9, 0xd4, 0xba, 0xa8, 0x6b, 0x01, 0x79, 0x2b,
];

/// Computes the keyed hash of `data` under `key`. The building block all
/// four domain hashes are defined in terms of.
pub fn keyed_hash(key: &[u8; 32], data: &[u8]) -> Hash {
    let mut hasher = blake3::Hasher::new_keyed(key);
    hasher.update(data);
    hasher.finalize().into()
}

/// `H_DATA`: the chunk hash.
pub fn h_data(data: &[u8]) -> Hash {
    keyed_hash(&DATA_KEY, data)
}

/// `H_INTERNAL`: hashes the textual merge buffer of the aggregated hash tree.
pub fn h_internal(data: &[u8]) -> Hash {
    keyed_hash(&INTERNAL_NODE_KEY, data)
}

/// `H_VER`: hashes the raw-byte concatenation of a term's chunk hashes.
pub fn h_verification(data: &[u8]) -> Hash {
    keyed_hash(&VERIFICATION_KEY, data)
}

/// `H_ZERO`: wraps a Merkle root to produce the final file hash.
pub fn h_zero(data: &[u8]) -> Hash {
    keyed_hash(&ZERO_KEY, data)
}

/// `H_KEYED`: the server-rotated key used to protect chunk hashes in the
/// global dedup match oracle (§4.9). `key` is `chunk_hash_key` from a
/// shard's footer.
pub fn h_keyed(key: &[u8; 32], data: &[u8]) -> Hash {
    keyed_hash(key, data)
}

/// Byte-swapped hex string form of a 32-byte hash (§4.1): interpret the 32
/// bytes as four little-endian u64 words, print each as 16 lowercase hex
/// digits, concatenate. Equivalent to reversing each 8-byte lane before
/// hex-encoding. This is the form that appears literally inside the
/// aggregated hash tree's merge buffer (§4.3), so it must be reproduced
/// exactly: hashing raw bytes instead is a protocol-breaking shortcut.
pub fn hash_to_string(hash: &Hash) -> String {
    let mut out = String::with_capacity(HASH_LEN * 2);
    for lane in hash.as_bytes().chunks_exact(8) {
        let word = u64::from_le_bytes(lane.try_into().unwrap());
        out.push_str(&format!("{word:016x}"));
    }
    out
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StringError {
    #[error("expected a 64-character lowercase hex string, got {0} characters")]
    WrongLength(usize),
    #[error("invalid hex digit in hash string")]
    InvalidHex,
}

/// Inverse of [`hash_to_string`].
pub fn string_to_hash(s: &str) -> Result<Hash, StringError> {
    if s.len() != HASH_LEN * 2 {
        return Err(StringError::WrongLength(s.len()));
    }
    let mut out = [0u8; HASH_LEN];
    for (i, lane) in s.as_bytes().chunks_exact(16).enumerate() {
        let lane_str = std::str::from_utf8(lane).map_err(|_| StringError::InvalidHex)?;
        let word = u64::from_str_radix(lane_str, 16).map_err(|_| StringError::InvalidHex)?;
        out[i * 8..i * 8 + 8].copy_from_slice(&word.to_le_bytes());
    }
    Ok(Hash(out))
}
