//! Cross-committee commitment agreement.
//!
//! Both committees' polynomials share the constant term, so the hash of
//! `C_0` must agree across them. A node tallies the hashes announced by
//! the other committee; `t + 1` equal announcements (the other
//! committee's `t`) fix the canonical hash.

use dpss_crypto::DacssCurve;
use dpss_transport::messages::CommitmentMessage;
use dpss_transport::Envelope;
use dpss_types::{short_hex, AcssRoundId, NodeDetails};

use crate::node::DacssNode;
use crate::{DacssError, Result};

impl<C: DacssCurve> DacssNode<C> {
    pub(crate) async fn on_commitment(
        &self,
        from: NodeDetails,
        round: AcssRoundId,
        msg: CommitmentMessage,
    ) -> Result<Vec<Envelope>> {
        let other = self.committee().other();
        let other_params = self.membership.params(other);
        if from.committee != other || !other_params.contains(from.index) {
            return Err(DacssError::UnexpectedSender {
                sender: from,
                kind: "commitment",
            });
        }

        let handle = self.store.get_or_create(&round).await;
        let mut state = handle.lock().await;
        let had_canonical = state.canonical_commitment.is_some();
        if !state.record_commitment(from.index, msg.commitment_hash, other_params.honest_threshold()) {
            return Ok(Vec::new());
        }
        if let (false, Some(canonical)) = (had_canonical, state.canonical_commitment) {
            tracing::info!(
                node = %self.details(),
                %round,
                commitment = %short_hex(&canonical),
                "{other} committee agreed on commitment"
            );
            if state.own_commitment_hash.is_some_and(|own| own != canonical) {
                tracing::warn!(node = %self.details(), %round, "own commitment differs from canonical");
            }
        }
        self.emit_if_due(round, &mut state);
        Ok(Vec::new())
    }
}
