//! ECHO handling.

use dpss_crypto::DacssCurve;
use dpss_rbc::RbcAction;
use dpss_transport::messages::{EchoMessage, MessageKind, ReadyMessage};
use dpss_transport::Envelope;
use dpss_types::{AcssRoundId, NodeDetails};

use crate::node::DacssNode;
use crate::{DacssError, Result};

impl<C: DacssCurve> DacssNode<C> {
    pub(crate) async fn on_echo(
        &self,
        from: NodeDetails,
        round: AcssRoundId,
        msg: EchoMessage,
    ) -> Result<Vec<Envelope>> {
        self.require_member(from, MessageKind::Echo)?;
        let me = self.details();
        if msg.shard.index != me.index as usize - 1 {
            return Err(DacssError::InvalidMessage(format!(
                "echo carries shard {} for {me}",
                msg.shard.index
            )));
        }

        let params = self.params();
        let handle = self.store.get_or_create(&round).await;
        let action = {
            let mut state = handle.lock().await;
            state.rbc.handle_echo(&params, from.index, msg.shard, msg.hash)
        };

        if let Some(RbcAction::BroadcastReady { shard, hash }) = action {
            tracing::info!(node = %me, %round, "echo quorum reached, sending ready");
            let ready = self.envelope(round, &ReadyMessage { shard, hash })?;
            self.outbox.broadcast(me.committee, ready)?;
        }
        Ok(Vec::new())
    }
}
