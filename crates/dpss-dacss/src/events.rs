//! Output events for the consensus layer.
//!
//! One [`DacssOutput`] is emitted per round once the node holds a verified
//! share and the other committee has confirmed the same secret
//! commitment. Absence of the event is the only failure signal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use dpss_crypto::{DacssCurve, FeldmanCommitments, Scalar, ShamirShare};
use dpss_types::{AcssRoundId, CommitteeKind, Hash};

#[derive(Debug, Clone)]
pub struct DacssOutput<C: DacssCurve> {
    pub round: AcssRoundId,
    /// Committee the share belongs to.
    pub committee: CommitteeKind,
    /// Hash of the secret commitment agreed with the other committee.
    pub commitment_hash: Hash,
    pub commitments: FeldmanCommitments<C>,
    pub share: ShamirShare<Scalar<C>>,
}

/// Event bus for broadcasting outputs to subscribers.
#[derive(Clone)]
pub struct EventBus<C: DacssCurve> {
    sender: broadcast::Sender<DacssOutput<C>>,
    emitted: Arc<AtomicU64>,
}

impl<C: DacssCurve> EventBus<C> {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            emitted: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an output to all subscribers.
    pub fn emit(&self, output: DacssOutput<C>) {
        self.emitted.fetch_add(1, Ordering::SeqCst);
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(output);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DacssOutput<C>> {
        self.sender.subscribe()
    }

    /// Number of outputs emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpss_crypto::{Polynomial, Secp256k1};
    use dpss_types::PssId;
    use rand::rngs::OsRng;

    #[tokio::test]
    async fn test_emit_reaches_subscriber() {
        let bus = EventBus::<Secp256k1>::new(4);
        let mut receiver = bus.subscribe();
        let polynomial = Polynomial::random(Scalar::<Secp256k1>::from(5u64), 1, &mut OsRng);
        let output = DacssOutput {
            round: AcssRoundId::new(1, PssId(1), 0),
            committee: CommitteeKind::New,
            commitment_hash: [0u8; 32],
            commitments: FeldmanCommitments::<Secp256k1>::commit(&polynomial),
            share: ShamirShare::new(1, polynomial.evaluate(Scalar::<Secp256k1>::from(1u64))),
        };
        bus.emit(output.clone());
        let received = receiver.recv().await.expect("event");
        assert_eq!(received.round, output.round);
        assert_eq!(received.share, output.share);
        assert_eq!(bus.emitted(), 1);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::<Secp256k1>::new(1);
        let polynomial = Polynomial::random(Scalar::<Secp256k1>::from(5u64), 1, &mut OsRng);
        bus.emit(DacssOutput {
            round: AcssRoundId::new(1, PssId(1), 0),
            committee: CommitteeKind::Old,
            commitment_hash: [0u8; 32],
            commitments: FeldmanCommitments::<Secp256k1>::commit(&polynomial),
            share: ShamirShare::new(1, polynomial.intercept()),
        });
        assert_eq!(bus.emitted(), 1);
    }
}
