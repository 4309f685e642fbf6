//! Post-broadcast share check.
//!
//! With the agreed data in hand, a member decrypts its own share and
//! checks it. A good share is announced to the other committee through
//! its commitment hash; a bad one is implicated.

use dpss_crypto::curve::{point_from_bytes, point_to_bytes};
use dpss_crypto::DacssCurve;
use dpss_transport::messages::{
    CommitmentMessage, ImplicateReceiveMessage, OutputMessage, ShareRecoveryMessage,
};
use dpss_transport::{AcssData, Envelope};
use dpss_types::{short_hex, AcssRoundId};

use crate::node::DacssNode;
use crate::protocol::check_share;
use crate::{DacssError, Result};

impl<C: DacssCurve> DacssNode<C> {
    pub(crate) async fn on_output(&self, round: AcssRoundId, msg: OutputMessage) -> Result<Vec<Envelope>> {
        let data = AcssData::from_bytes(&msg.payload)?;
        let me = self.details();
        let params = self.params();
        let ephemeral: C = point_from_bytes(&data.dealer_ephemeral_pub_key)?;
        let pk_self = self.public_key(me)?;
        let key = self.symmetric_key(&ephemeral);
        let verified = check_share(&data, me, &pk_self, &key, &params);

        let handle = self.store.get(&round).await.ok_or(DacssError::UnknownRound(round))?;
        let mut state = handle.lock().await;
        if state.output_processed || state.has_valid_share() {
            return Ok(Vec::new());
        }
        state.output_processed = true;
        let drained = state.set_acss_data(data, msg.hash);
        let mut follow_ups = self.execute_envelopes(round, drained)?;

        match verified {
            Some(verified) => {
                let commitment_hash = verified.commitments.secret_commitment_hash()?;
                state.accept_share(verified.share, verified.commitments, commitment_hash);
                let send_commitment = !state.commitment_sent;
                state.commitment_sent = true;
                let recovery_pending = state.share_recovery_ongoing;
                self.emit_if_due(round, &mut state);
                drop(state);

                tracing::debug!(node = %me, %round, commitment = %short_hex(&commitment_hash), "share verified");
                if send_commitment {
                    let commitment = self.envelope(round, &CommitmentMessage { commitment_hash })?;
                    self.outbox.broadcast(me.committee.other(), commitment)?;
                }
                // Peers may already be waiting on this node's share.
                if recovery_pending {
                    follow_ups.push(self.envelope(round, &ShareRecoveryMessage::default())?);
                }
            }
            None => {
                state.valid_share_output = false;
                let send_implicate = !state.implicate_sent;
                state.implicate_sent = true;
                drop(state);

                if send_implicate {
                    tracing::warn!(node = %me, %round, "own share failed verification, implicating dealer");
                    let (key, proof) = self.prove_symmetric_key(&ephemeral)?;
                    let implicate = self.envelope(
                        round,
                        &ImplicateReceiveMessage {
                            symmetric_key: point_to_bytes(&key)?,
                            proof: proof.to_bytes()?,
                        },
                    )?;
                    self.outbox.broadcast(me.committee, implicate)?;
                }
            }
        }
        Ok(follow_ups)
    }
}
