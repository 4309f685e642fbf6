//! The dealer's proposal.
//!
//! A member that receives the dealt data for its committee re-encodes it
//! and sends shard `j` to member `j`, which starts the reliable
//! broadcast. Implicates that were waiting for the data are executed.

use dpss_crypto::DacssCurve;
use dpss_rbc::payload_hash;
use dpss_transport::messages::{EchoMessage, ImplicateExecuteMessage, ProposeMessage};
use dpss_transport::Envelope;
use dpss_types::{short_hex, AcssRoundId, CommitteeKind, NodeDetails};

use crate::node::DacssNode;
use crate::state::ImplicateRecord;
use crate::{DacssError, Result};

impl<C: DacssCurve> DacssNode<C> {
    pub(crate) async fn on_propose(
        &self,
        from: NodeDetails,
        round: AcssRoundId,
        msg: ProposeMessage,
    ) -> Result<Vec<Envelope>> {
        let dealer = NodeDetails::new(round.dealer, CommitteeKind::Old);
        if from != dealer {
            return Err(DacssError::UnexpectedSender {
                sender: from,
                kind: "propose",
            });
        }
        let me = self.details();
        if msg.committee != me.committee {
            return Err(DacssError::InvalidMessage(format!(
                "proposal for the {} committee received by {me}",
                msg.committee
            )));
        }

        let payload = msg.data.to_bytes()?;
        let hash = payload_hash(&payload);
        let shards = self.codec.encode(&payload)?;
        let own_shard = shards
            .get(me.index as usize - 1)
            .cloned()
            .ok_or_else(|| DacssError::InvalidMessage(format!("no shard for {me}")))?;

        let handle = self.store.get_or_create(&round).await;
        let drained = {
            let mut state = handle.lock().await;
            if let Some(known) = state.acss_data_hash.filter(|known| *known != hash) {
                tracing::warn!(
                    node = %me,
                    %round,
                    known = %short_hex(&known),
                    proposed = %short_hex(&hash),
                    "conflicting proposal ignored"
                );
                return Ok(Vec::new());
            }
            if !state.rbc.start(own_shard, hash) {
                tracing::debug!(node = %me, %round, "duplicate proposal");
                return Ok(Vec::new());
            }
            state.set_acss_data(msg.data, hash)
        };

        tracing::debug!(node = %me, %round, hash = %short_hex(&hash), "proposal accepted, echoing");
        for (recipient, shard) in self.membership.nodes(me.committee).into_iter().zip(shards) {
            let echo = self.envelope(round, &EchoMessage { shard, hash })?;
            self.outbox.send(recipient, echo)?;
        }

        self.execute_envelopes(round, drained)
    }

    /// Local execute messages for implicates released from the queue.
    pub(crate) fn execute_envelopes(
        &self,
        round: AcssRoundId,
        records: Vec<ImplicateRecord>,
    ) -> Result<Vec<Envelope>> {
        records
            .into_iter()
            .map(|record| {
                self.envelope(
                    round,
                    &ImplicateExecuteMessage {
                        accused_by: record.accused_by,
                        symmetric_key: record.symmetric_key,
                        proof: record.proof,
                    },
                )
            })
            .collect()
    }
}
