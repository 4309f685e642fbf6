//! Implicates: proof-backed complaints about a bad share.
//!
//! An implicate is executed once the dealt data is known. It is accepted
//! only if the complainant's key proof verifies and its share, decrypted
//! with that key, really fails the predicate. Acceptance starts share
//! recovery for the round.

use dpss_crypto::curve::point_from_bytes;
use dpss_crypto::DacssCurve;
use dpss_transport::messages::{
    ImplicateExecuteMessage, ImplicateReceiveMessage, MessageKind, ShareRecoveryMessage,
};
use dpss_transport::Envelope;
use dpss_types::{AcssRoundId, NodeDetails};

use crate::node::DacssNode;
use crate::protocol::check_share;
use crate::state::ImplicateRecord;
use crate::{DacssError, Result};

impl<C: DacssCurve> DacssNode<C> {
    pub(crate) async fn on_implicate_receive(
        &self,
        from: NodeDetails,
        round: AcssRoundId,
        msg: ImplicateReceiveMessage,
    ) -> Result<Vec<Envelope>> {
        self.require_member(from, MessageKind::ImplicateReceive)?;
        let record = ImplicateRecord {
            accused_by: from.index,
            symmetric_key: msg.symmetric_key,
            proof: msg.proof,
        };

        let handle = self.store.get_or_create(&round).await;
        let mut state = handle.lock().await;
        if state.acss_data.is_none() {
            tracing::debug!(node = %self.details(), %round, %from, "implicate buffered until data arrives");
            state.queue_implicate(record);
            return Ok(Vec::new());
        }
        if state.share_recovery_ongoing {
            tracing::debug!(node = %self.details(), %round, %from, "recovery already under way");
            return Ok(Vec::new());
        }
        drop(state);
        self.execute_envelopes(round, vec![record])
    }

    pub(crate) async fn on_implicate_execute(
        &self,
        round: AcssRoundId,
        msg: ImplicateExecuteMessage,
    ) -> Result<Vec<Envelope>> {
        let me = self.details();
        let handle = self.store.get(&round).await.ok_or(DacssError::UnknownRound(round))?;
        let data = {
            let state = handle.lock().await;
            if state.share_recovery_ongoing {
                return Ok(Vec::new());
            }
            state.acss_data.clone()
        }
        .ok_or_else(|| DacssError::InvalidMessage("implicate executed before data".to_string()))?;

        let accused = NodeDetails::new(msg.accused_by, me.committee);
        let ephemeral: C = point_from_bytes(&data.dealer_ephemeral_pub_key)?;
        let Some(key) =
            self.verify_symmetric_key(accused, &ephemeral, &msg.symmetric_key, &msg.proof)?
        else {
            tracing::warn!(node = %me, %round, %accused, "implicate rejected: key proof invalid");
            return Ok(Vec::new());
        };
        let pk_accused = self.public_key(accused)?;
        if check_share(&data, accused, &pk_accused, &key, &self.params()).is_some() {
            tracing::warn!(node = %me, %round, %accused, "implicate rejected: share verifies");
            return Ok(Vec::new());
        }

        let mut state = handle.lock().await;
        if state.share_recovery_ongoing {
            return Ok(Vec::new());
        }
        state.share_recovery_ongoing = true;
        drop(state);

        tracing::info!(node = %me, %round, %accused, "implicate accepted, starting share recovery");
        Ok(vec![self.envelope(round, &ShareRecoveryMessage::default())?])
    }
}
