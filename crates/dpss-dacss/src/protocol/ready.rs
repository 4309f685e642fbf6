//! READY handling and payload delivery.

use dpss_crypto::DacssCurve;
use dpss_rbc::RbcAction;
use dpss_transport::messages::{MessageKind, OutputMessage, ReadyMessage};
use dpss_transport::Envelope;
use dpss_types::{short_hex, AcssRoundId, NodeDetails};

use crate::node::DacssNode;
use crate::Result;

impl<C: DacssCurve> DacssNode<C> {
    pub(crate) async fn on_ready(
        &self,
        from: NodeDetails,
        round: AcssRoundId,
        msg: ReadyMessage,
    ) -> Result<Vec<Envelope>> {
        self.require_member(from, MessageKind::Ready)?;
        let me = self.details();
        let params = self.params();

        let handle = self.store.get_or_create(&round).await;
        let actions = {
            let mut state = handle.lock().await;
            let known = state.acss_data_hash;
            let actions = state
                .rbc
                .handle_ready(&params, &self.codec, from.index, msg.shard, msg.hash, known);
            if actions.iter().any(|a| matches!(a, RbcAction::Deliver { .. })) {
                state.valid_share_output = true;
            }
            actions
        };

        let mut follow_ups = Vec::new();
        for action in actions {
            match action {
                RbcAction::BroadcastReady { shard, hash } => {
                    tracing::info!(node = %me, %round, "ready quorum reached, amplifying");
                    let ready = self.envelope(round, &ReadyMessage { shard, hash })?;
                    self.outbox.broadcast(me.committee, ready)?;
                }
                RbcAction::Deliver { payload, hash } => {
                    tracing::info!(node = %me, %round, hash = %short_hex(&hash), "broadcast ended");
                    follow_ups.push(self.envelope(round, &OutputMessage { payload, hash })?);
                }
            }
        }
        Ok(follow_ups)
    }
}
