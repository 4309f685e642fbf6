//! Handlers for each message kind.
//!
//! - [`propose`] - dealer's data arrives; echo shards
//! - [`echo`] / [`ready`] - reliable broadcast of the dealt data
//! - [`output`] - decoded data; check own share
//! - [`commitment`] - cross-committee agreement on the secret commitment
//! - [`implicate`] - complaints about bad shares
//! - [`recovery`] - rebuilding a bad share from peers' shares

pub mod commitment;
pub mod echo;
pub mod implicate;
pub mod output;
pub mod propose;
pub mod ready;
pub mod recovery;

use dpss_crypto::curve::point_to_hex;
use dpss_crypto::predicate::{predicate, VerifiedShare};
use dpss_crypto::DacssCurve;
use dpss_transport::AcssData;
use dpss_types::{CommitteeParams, NodeDetails};

/// Run the predicate on `holder`'s entry of `data` using `key`.
///
/// A missing entry, or a share dealt for another x-coordinate, fails the
/// same way a bad ciphertext does.
pub(crate) fn check_share<C: DacssCurve>(
    data: &AcssData,
    holder: NodeDetails,
    holder_pk: &C,
    key: &C,
    params: &CommitteeParams,
) -> Option<VerifiedShare<C>> {
    let entry = point_to_hex(holder_pk).ok()?;
    let Some(ciphertext) = data.share_map.get(&entry) else {
        tracing::debug!(%holder, "no share dealt to holder");
        return None;
    };
    let verified = predicate(key, ciphertext, &data.commitments, params.k)?;
    if verified.share.id != holder.index {
        tracing::debug!(%holder, share_id = verified.share.id, "share dealt for another index");
        return None;
    }
    Some(verified)
}
