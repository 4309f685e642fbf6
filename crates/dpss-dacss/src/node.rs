//! Message dispatch for one node on one curve.
//!
//! Every inbound envelope is handled by [`DacssNode::handle_message`].
//! Handlers mutate round state under the round lock, release it, then
//! enqueue outbound envelopes. Follow-up work a node addresses to itself
//! (output, implicate execution, share recovery) is returned to the
//! dispatcher and processed in the same call, in order.

use std::collections::VecDeque;
use std::sync::Arc;

use ark_ec::Group;
use rand::rngs::OsRng;
use zeroize::Zeroize;

use dpss_crypto::channel::shared_key;
use dpss_crypto::curve::point_from_bytes;
use dpss_crypto::{DacssCurve, NizkProof};
use dpss_rbc::ErasureCodec;
use dpss_transport::messages::{MessageKind, Payload};
use dpss_transport::Envelope;
use dpss_types::{short_hex, AcssRoundId, CommitteeKind, CommitteeParams, NodeDetails, PssId};

use crate::events::{DacssOutput, EventBus};
use crate::keys::KeyAccess;
use crate::membership::Membership;
use crate::outbox::Outbox;
use crate::state::{AccsState, RoundSnapshot};
use crate::store::RoundStore;
use crate::{DacssError, Result};

/// A committee member running DACSS rounds over curve `C`.
pub struct DacssNode<C: DacssCurve> {
    pub(crate) membership: Arc<dyn Membership>,
    pub(crate) keys: Arc<dyn KeyAccess<C>>,
    pub(crate) store: RoundStore<C>,
    pub(crate) outbox: Outbox,
    pub(crate) events: EventBus<C>,
    /// Codec for this node's own committee.
    pub(crate) codec: ErasureCodec,
}

impl<C: DacssCurve> DacssNode<C> {
    pub fn new(
        membership: Arc<dyn Membership>,
        keys: Arc<dyn KeyAccess<C>>,
        outbox: Outbox,
        events: EventBus<C>,
    ) -> Result<Self> {
        let details = membership.details();
        let params = membership.params(details.committee);
        if !params.contains(details.index) {
            return Err(DacssError::InvalidMessage(format!(
                "node {details} outside committee of size {}",
                params.n
            )));
        }
        let codec = ErasureCodec::new(&params)?;
        tracing::info!(node = %details, curve = %C::NAME, n = params.n, t = params.t, "dacss node ready");
        Ok(Self {
            membership,
            keys,
            store: RoundStore::new(),
            outbox,
            events,
            codec,
        })
    }

    pub fn details(&self) -> NodeDetails {
        self.membership.details()
    }

    pub fn committee(&self) -> CommitteeKind {
        self.details().committee
    }

    /// Parameters of this node's committee.
    pub fn params(&self) -> CommitteeParams {
        self.membership.params(self.committee())
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DacssOutput<C>> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &RoundStore<C> {
        &self.store
    }

    /// Current view of a round, if it has state.
    pub async fn round_snapshot(&self, round: &AcssRoundId) -> Option<RoundSnapshot<C>> {
        let handle = self.store.get(round).await?;
        let state = handle.lock().await;
        Some(state.snapshot())
    }

    pub async fn teardown(&self, round: &AcssRoundId) -> bool {
        self.store.teardown(round).await
    }

    pub async fn teardown_session(&self, pss_id: PssId) -> usize {
        self.store.teardown_session(pss_id).await
    }

    /// Decode a wire envelope and handle it. Malformed bytes are logged
    /// and dropped.
    pub async fn handle_bytes(&self, from: NodeDetails, bytes: &[u8]) {
        match Envelope::from_bytes(bytes) {
            Ok(envelope) => self.handle_message(from, envelope).await,
            Err(e) => tracing::warn!(node = %self.details(), %from, error = %e, "dropping malformed envelope"),
        }
    }

    /// Handle one envelope from `from` and every local follow-up it causes.
    ///
    /// Errors are logged and the offending message dropped; nothing is
    /// reported back to the sender.
    pub async fn handle_message(&self, from: NodeDetails, envelope: Envelope) {
        let me = self.details();
        let mut queue = VecDeque::from([(from, envelope)]);
        while let Some((from, envelope)) = queue.pop_front() {
            let round = envelope.round;
            let kind = envelope.kind;
            match self.dispatch(from, &envelope).await {
                Ok(follow_ups) => queue.extend(follow_ups.into_iter().map(|e| (me, e))),
                Err(e) => tracing::warn!(node = %me, %round, %kind, %from, error = %e, "dropping message"),
            }
        }
    }

    async fn dispatch(&self, from: NodeDetails, envelope: &Envelope) -> Result<Vec<Envelope>> {
        envelope.validate()?;
        if envelope.curve != C::NAME {
            return Err(DacssError::CurveMismatch {
                expected: C::NAME,
                actual: envelope.curve,
            });
        }
        if envelope.kind.is_local() && from != self.details() {
            return Err(DacssError::UnexpectedSender {
                sender: from,
                kind: envelope.kind.as_str(),
            });
        }
        tracing::debug!(node = %self.details(), round = %envelope.round, kind = %envelope.kind, %from, "handling");

        let round = envelope.round;
        match envelope.kind {
            MessageKind::Propose => self.on_propose(from, round, envelope.decode()?).await,
            MessageKind::Echo => self.on_echo(from, round, envelope.decode()?).await,
            MessageKind::Ready => self.on_ready(from, round, envelope.decode()?).await,
            MessageKind::Output => self.on_output(round, envelope.decode()?).await,
            MessageKind::Commitment => self.on_commitment(from, round, envelope.decode()?).await,
            MessageKind::ImplicateReceive => {
                self.on_implicate_receive(from, round, envelope.decode()?).await
            }
            MessageKind::ImplicateExecute => {
                self.on_implicate_execute(round, envelope.decode()?).await
            }
            MessageKind::ShareRecovery => self.on_share_recovery(round, envelope.decode()?).await,
            MessageKind::ReceiveShareRecovery => {
                self.on_receive_share_recovery(from, round, envelope.decode()?).await
            }
        }
    }

    /// Wrap a payload for this node's curve.
    pub(crate) fn envelope<P: Payload>(&self, round: AcssRoundId, payload: &P) -> Result<Envelope> {
        Ok(Envelope::new(round, C::NAME, payload)?)
    }

    pub(crate) fn public_key(&self, node: NodeDetails) -> Result<C> {
        self.keys
            .public_key_of(node.index, node.committee)
            .ok_or(DacssError::MissingKey(node))
    }

    /// Reject senders outside this node's committee.
    pub(crate) fn require_member(&self, from: NodeDetails, kind: MessageKind) -> Result<()> {
        if from.committee != self.committee() || !self.params().contains(from.index) {
            return Err(DacssError::UnexpectedSender {
                sender: from,
                kind: kind.as_str(),
            });
        }
        Ok(())
    }

    /// This node's ECDH point with a dealer ephemeral key and a proof of
    /// its derivation.
    pub(crate) fn prove_symmetric_key(&self, ephemeral: &C) -> Result<(C, NizkProof<C>)> {
        let pk_self = self.public_key(self.details())?;
        let mut sk = self.keys.private_key();
        let key = shared_key(&sk, ephemeral);
        let proof = NizkProof::generate(&sk, &pk_self, ephemeral, &key, &C::generator(), &mut OsRng);
        sk.zeroize();
        Ok((key, proof?))
    }

    /// This node's ECDH point with a dealer ephemeral key.
    pub(crate) fn symmetric_key(&self, ephemeral: &C) -> C {
        let mut sk = self.keys.private_key();
        let key = shared_key(&sk, ephemeral);
        sk.zeroize();
        key
    }

    /// Decode and check a claimed ECDH point of `holder`.
    ///
    /// `Ok(None)` means the proof does not verify.
    pub(crate) fn verify_symmetric_key(
        &self,
        holder: NodeDetails,
        ephemeral: &C,
        symmetric_key: &[u8],
        proof: &[u8],
    ) -> Result<Option<C>> {
        let key: C = point_from_bytes(symmetric_key)?;
        let proof = NizkProof::<C>::from_bytes(proof)?;
        let pk_holder = self.public_key(holder)?;
        if proof.verify(&C::generator(), &pk_holder, ephemeral, &key) {
            Ok(Some(key))
        } else {
            Ok(None)
        }
    }

    /// Emit the round's output if it just became due.
    pub(crate) fn emit_if_due(&self, round: AcssRoundId, state: &mut AccsState<C>) {
        if let Some((share, commitments, commitment_hash)) = state.take_output() {
            tracing::info!(
                node = %self.details(),
                %round,
                commitment = %short_hex(&commitment_hash),
                "commitment agreed, emitting share"
            );
            self.events.emit(DacssOutput {
                round,
                committee: self.committee(),
                commitment_hash,
                commitments,
                share,
            });
        }
    }
}
