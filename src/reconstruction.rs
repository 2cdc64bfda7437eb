//! Reassembles file bytes from a reconstruction response (§4.8): fetch each
//! term's xorb byte range, decompress only the chunks the term references,
//! concatenate, then apply `offset_into_first_range` and truncate to the
//! requested length.

use bytes::{Bytes, BytesMut};
use tracing::instrument;

use crate::errors::{Error, ReconstructionError};
use crate::transport::{CasTransport, FetchInfo, ReconstructionResponse, Term};
use crate::xorb::Xorb;

/// Reconstructs bytes by fetching each term's xorb range through
/// `transport` and concatenating the decompressed chunks it references.
/// `requested_len`, if given, truncates the final output -- used for range
/// reads where the last term may carry more chunks than the query asked for.
#[instrument(skip_all, fields(terms = response.terms.len()))]
pub async fn reconstruct(
    transport: &dyn CasTransport,
    response: &ReconstructionResponse,
    requested_len: Option<u64>,
) -> Result<Bytes, Error> {
    let mut out = BytesMut::new();

    for (index, term) in response.terms.iter().enumerate() {
        let fetch_info = find_fetch_info(&response.fetch_info, term)?;
        let xorb_bytes = transport
            .fetch_bytes(&fetch_info.url, fetch_info.url_range)
            .await?;
        let xorb = Xorb::parse(xorb_bytes)?;

        if term.chunk_end as usize > xorb.num_chunks() {
            return Err(Error::Reconstruction(ReconstructionError::TermOutOfRange {
                index,
                start: term.chunk_start,
                end: term.chunk_end,
                chunk_count: xorb.num_chunks(),
            }));
        }

        let term_start = out.len();
        for chunk_index in term.chunk_start..term.chunk_end {
            let chunk = xorb.get_chunk(chunk_index as usize)?;
            out.extend_from_slice(&chunk);
        }

        if index == 0 && response.offset_into_first_range > 0 {
            let term_len = (out.len() - term_start) as u64;
            if response.offset_into_first_range > term_len {
                return Err(Error::Reconstruction(
                    ReconstructionError::OffsetExceedsFirstTerm {
                        offset: response.offset_into_first_range,
                        len: term_len,
                    },
                ));
            }
            let remainder = out.split_off(response.offset_into_first_range as usize);
            out = remainder;
        }
    }

    if let Some(len) = requested_len {
        out.truncate(len as usize);
    }

    Ok(out.freeze())
}

fn find_fetch_info<'a>(fetch_info: &'a [FetchInfo], term: &Term) -> Result<&'a FetchInfo, Error> {
    fetch_info
        .iter()
        .find(|f| f.xorb_hash == term.xorb_hash)
        .ok_or_else(|| {
            Error::InvalidRequest(format!("no fetch info for xorb {}", term.xorb_hash))
        })
}
