//! Chunk compression variants (§4.5): `None`, LZ4 frame, and a byte-grouping
//! pre-transform followed by LZ4 frame. The variant is a 1-byte tag carried
//! in each chunk header (§4.6); selection policy is a local decision and
//! never affects hashes.

mod byte_grouping;
mod lz4_frame;
mod none;

use crate::errors::XorbFormatError;

/// Chunk compression variant, the 1-byte tag in a chunk header.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CompressionScheme {
    None = 0,
    Lz4 = 1,
    ByteGrouping4Lz4 = 2,
}

impl CompressionScheme {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn compress(self, data: &[u8]) -> Vec<u8> {
        match self {
            CompressionScheme::None => none::compress(data),
            CompressionScheme::Lz4 => lz4_frame::compress(data),
            CompressionScheme::ByteGrouping4Lz4 => {
                lz4_frame::compress(&byte_grouping::byte_group_4(data))
            }
        }
    }

    pub fn decompress(
        self,
        data: &[u8],
        uncompressed_size: usize,
    ) -> Result<Vec<u8>, XorbFormatError> {
        match self {
            CompressionScheme::None => Ok(none::decompress(data)),
            CompressionScheme::Lz4 => lz4_frame::decompress(data, uncompressed_size),
            CompressionScheme::ByteGrouping4Lz4 => {
                let grouped = lz4_frame::decompress(data, uncompressed_size)?;
                Ok(byte_grouping::byte_ungroup_4(&grouped, uncompressed_size))
            }
        }
    }
}

impl TryFrom<u8> for CompressionScheme {
    type Error = XorbFormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CompressionScheme::None),
            1 => Ok(CompressionScheme::Lz4),
            2 => Ok(CompressionScheme::ByteGrouping4Lz4),
            other => Err(XorbFormatError::UnexpectedIdent {
                expected: b"compression type 0, 1, or 2",
                found: vec![other],
            }),
        }
    }
}

/// Picks a compression scheme for `data`: tries `ByteGrouping4Lz4`, falling
/// back to plain `Lz4`, falling back to `None` if neither shrinks the chunk.
/// Unconstrained by the spec; this is a local policy decision that never
/// affects any hash.
pub fn choose_scheme(data: &[u8]) -> (CompressionScheme, Vec<u8>) {
    let mut best = (CompressionScheme::None, none::compress(data));

    for scheme in [CompressionScheme::Lz4, CompressionScheme::ByteGrouping4Lz4] {
        let candidate = scheme.compress(data);
        if candidate.len() < best.1.len() {
            best = (scheme, candidate);
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn roundtrip(scheme: CompressionScheme, data: &[u8]) {
        let compressed = scheme.compress(data);
        let decompressed = scheme.decompress(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data, "{scheme:?} round trip failed");
    }

    #[rstest]
    #[case(CompressionScheme::None)]
    #[case(CompressionScheme::Lz4)]
    #[case(CompressionScheme::ByteGrouping4Lz4)]
    fn every_variant_round_trips(#[case] scheme: CompressionScheme) {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(200);
        roundtrip(scheme, &data);
    }

    #[rstest]
    #[case(CompressionScheme::Lz4)]
    #[case(CompressionScheme::ByteGrouping4Lz4)]
    fn empty_chunk_round_trips(#[case] scheme: CompressionScheme) {
        roundtrip(scheme, &[]);
    }

    #[test]
    fn tag_values_match_spec() {
        assert_eq!(CompressionScheme::None.tag(), 0);
        assert_eq!(CompressionScheme::Lz4.tag(), 1);
        assert_eq!(CompressionScheme::ByteGrouping4Lz4.tag(), 2);
    }

    #[test]
    fn try_from_rejects_unknown_tags() {
        assert!(CompressionScheme::try_from(3).is_err());
        assert!(CompressionScheme::try_from(255).is_err());
    }

    #[test]
    fn choose_scheme_never_picks_a_larger_encoding_than_identity() {
        let data = vec![0u8; 50_000];
        let (_, chosen) = choose_scheme(&data);
        assert!(chosen.len() <= data.len());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn compress_decompress_is_identity(data in proptest::collection::vec(any::<u8>(), 0..10_000)) {
            for scheme in [
                CompressionScheme::None,
                CompressionScheme::Lz4,
                CompressionScheme::ByteGrouping4Lz4,
            ] {
                let compressed = scheme.compress(&data);
                let decompressed = scheme.decompress(&compressed, data.len()).unwrap();
                prop_assert_eq!(decompressed, data.clone());
            }
        }
    }
}
