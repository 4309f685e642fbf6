//! Outbound message queue.
//!
//! Handlers never send while holding a round lock: they enqueue
//! [`Outbound`] items here after releasing it, and the transport drains
//! the receiving end.

use tokio::sync::mpsc;

use dpss_transport::Envelope;
use dpss_types::{CommitteeKind, NodeDetails};

use crate::{DacssError, Result};

/// Destination of an outbound envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Node(NodeDetails),
    /// Every member of the committee, the sender included if it is a member.
    Committee(CommitteeKind),
}

#[derive(Debug, Clone)]
pub struct Outbound {
    pub from: NodeDetails,
    pub recipient: Recipient,
    pub envelope: Envelope,
}

/// Sending half handed to a node.
#[derive(Debug, Clone)]
pub struct Outbox {
    from: NodeDetails,
    sender: mpsc::UnboundedSender<Outbound>,
}

impl Outbox {
    /// New outbox for `from` and the receiver the transport consumes.
    pub fn channel(from: NodeDetails) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { from, sender }, receiver)
    }

    pub fn send(&self, to: NodeDetails, envelope: Envelope) -> Result<()> {
        self.push(Recipient::Node(to), envelope)
    }

    pub fn broadcast(&self, committee: CommitteeKind, envelope: Envelope) -> Result<()> {
        self.push(Recipient::Committee(committee), envelope)
    }

    fn push(&self, recipient: Recipient, envelope: Envelope) -> Result<()> {
        tracing::trace!(from = %self.from, ?recipient, kind = %envelope.kind, round = %envelope.round, "enqueue");
        self.sender
            .send(Outbound {
                from: self.from,
                recipient,
                envelope,
            })
            .map_err(|_| DacssError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpss_transport::messages::CommitmentMessage;
    use dpss_types::{AcssRoundId, CurveName, PssId};

    #[tokio::test]
    async fn test_enqueue_and_drain() {
        let me = NodeDetails::new(1, CommitteeKind::Old);
        let (outbox, mut receiver) = Outbox::channel(me);
        let envelope = Envelope::new(
            AcssRoundId::new(1, PssId(1), 0),
            CurveName::Secp256k1,
            &CommitmentMessage {
                commitment_hash: [1u8; 32],
            },
        )
        .expect("envelope");

        outbox.broadcast(CommitteeKind::New, envelope.clone()).expect("send");
        let item = receiver.recv().await.expect("item");
        assert_eq!(item.from, me);
        assert_eq!(item.recipient, Recipient::Committee(CommitteeKind::New));
        assert_eq!(item.envelope, envelope);
    }

    #[tokio::test]
    async fn test_closed_channel() {
        let me = NodeDetails::new(1, CommitteeKind::Old);
        let (outbox, receiver) = Outbox::channel(me);
        drop(receiver);
        let envelope = Envelope::new(
            AcssRoundId::new(1, PssId(1), 0),
            CurveName::Secp256k1,
            &CommitmentMessage {
                commitment_hash: [1u8; 32],
            },
        )
        .expect("envelope");
        assert!(matches!(outbox.send(me, envelope), Err(DacssError::ChannelClosed)));
    }
}
