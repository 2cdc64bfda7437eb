//! `None` compression variant (§4.5): identity.

pub fn compress(data: &[u8]) -> Vec<u8> {
    data.to_vec()
}

pub fn decompress(data: &[u8]) -> Vec<u8> {
    data.to_vec()
}
