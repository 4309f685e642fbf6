//! Share recovery.
//!
//! Once an implicate is accepted, every member holding a verified share
//! publishes its ECDH key for the round with a proof, together with the
//! dealt data. A recovering member checks each such share itself and,
//! with `k` of them, interpolates its own share.

use dpss_crypto::curve::{point_from_bytes, point_to_bytes};
use dpss_crypto::shamir::obtain_eval_for_x;
use dpss_crypto::{DacssCurve, ShamirShare};
use dpss_transport::messages::{
    CommitmentMessage, MessageKind, ReceiveShareRecoveryMessage, ShareRecoveryMessage,
};
use dpss_transport::Envelope;
use dpss_types::{short_hex, AcssRoundId, NodeDetails};

use crate::node::DacssNode;
use crate::protocol::check_share;
use crate::{DacssError, Result};

impl<C: DacssCurve> DacssNode<C> {
    pub(crate) async fn on_share_recovery(
        &self,
        round: AcssRoundId,
        _msg: ShareRecoveryMessage,
    ) -> Result<Vec<Envelope>> {
        let me = self.details();
        let handle = self.store.get(&round).await.ok_or(DacssError::UnknownRound(round))?;
        let data = {
            let mut state = handle.lock().await;
            state.share_recovery_ongoing = true;
            if !state.has_valid_share() || state.recovery_sent {
                return Ok(Vec::new());
            }
            let Some(data) = state.acss_data.clone() else {
                return Ok(Vec::new());
            };
            state.recovery_sent = true;
            data
        };

        let ephemeral: C = point_from_bytes(&data.dealer_ephemeral_pub_key)?;
        let (key, proof) = self.prove_symmetric_key(&ephemeral)?;
        let recovery = self.envelope(
            round,
            &ReceiveShareRecoveryMessage {
                symmetric_key: point_to_bytes(&key)?,
                proof: proof.to_bytes()?,
                data,
            },
        )?;
        tracing::debug!(node = %me, %round, "publishing share for recovery");
        self.outbox.broadcast(me.committee, recovery)?;
        Ok(Vec::new())
    }

    pub(crate) async fn on_receive_share_recovery(
        &self,
        from: NodeDetails,
        round: AcssRoundId,
        msg: ReceiveShareRecoveryMessage,
    ) -> Result<Vec<Envelope>> {
        self.require_member(from, MessageKind::ReceiveShareRecovery)?;
        let me = self.details();
        if from == me {
            return Ok(Vec::new());
        }
        let hash = msg.data.hash()?;

        let handle = self.store.get_or_create(&round).await;
        {
            let state = handle.lock().await;
            if state.has_valid_share() || state.verified_recovery_shares.contains_key(&from.index) {
                return Ok(Vec::new());
            }
            if state.acss_data_hash != Some(hash) {
                tracing::debug!(node = %me, %round, %from, hash = %short_hex(&hash), "recovery data does not match");
                return Ok(Vec::new());
            }
        }

        let params = self.params();
        let ephemeral: C = point_from_bytes(&msg.data.dealer_ephemeral_pub_key)?;
        let Some(key) = self.verify_symmetric_key(from, &ephemeral, &msg.symmetric_key, &msg.proof)?
        else {
            tracing::warn!(node = %me, %round, %from, "recovery rejected: key proof invalid");
            return Ok(Vec::new());
        };
        let pk_from = self.public_key(from)?;
        let Some(verified) = check_share(&msg.data, from, &pk_from, &key, &params) else {
            tracing::warn!(node = %me, %round, %from, "recovery rejected: share does not verify");
            return Ok(Vec::new());
        };

        let mut state = handle.lock().await;
        if state.has_valid_share() || state.verified_recovery_shares.contains_key(&from.index) {
            return Ok(Vec::new());
        }
        state.verified_recovery_shares.insert(from.index, verified.share);
        let collected = state.verified_recovery_shares.len();
        if collected < params.k {
            tracing::debug!(node = %me, %round, %from, collected, "recovery share stored");
            return Ok(Vec::new());
        }

        let shares: Vec<_> = state
            .verified_recovery_shares
            .values()
            .take(params.k)
            .cloned()
            .collect();
        let share = ShamirShare::new(me.index, obtain_eval_for_x(&shares, me.index)?);
        if !verified.commitments.verify(&share) {
            return Err(DacssError::InvalidMessage(
                "interpolated share does not match commitments".to_string(),
            ));
        }
        let commitment_hash = verified.commitments.secret_commitment_hash()?;
        state.accept_share(share, verified.commitments, commitment_hash);
        state.rbc.force_end();
        let drained = state.set_acss_data(msg.data, hash);
        let send_commitment = !state.commitment_sent;
        state.commitment_sent = true;
        self.emit_if_due(round, &mut state);
        drop(state);

        tracing::info!(node = %me, %round, "share recovered");
        if send_commitment {
            let commitment = self.envelope(round, &CommitmentMessage { commitment_hash })?;
            self.outbox.broadcast(me.committee.other(), commitment)?;
        }
        self.execute_envelopes(round, drained)
    }
}
