//! Per-round protocol state.
//!
//! One [`AccsState`] exists per [`AcssRoundId`](dpss_types::AcssRoundId).
//! It is only touched under its round lock (see [`crate::store`]), so
//! every check-then-act below is atomic with respect to other messages of
//! the same round.

use std::collections::{BTreeMap, HashMap, HashSet};

use dpss_crypto::{DacssCurve, FeldmanCommitments, Scalar, ShamirShare};
use dpss_rbc::{RbcPhase, RbcState};
use dpss_transport::AcssData;
use dpss_types::{Hash, NodeIndex};

/// An implicate waiting for the dealt data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicateRecord {
    pub accused_by: NodeIndex,
    pub symmetric_key: Vec<u8>,
    pub proof: Vec<u8>,
}

pub struct AccsState<C: DacssCurve> {
    pub rbc: RbcState,
    /// Hash of the dealt payload, fixed once known.
    pub acss_data_hash: Option<Hash>,
    pub acss_data: Option<AcssData>,
    pub received_share: Option<ShamirShare<Scalar<C>>>,
    pub commitments: Option<FeldmanCommitments<C>>,
    pub own_commitment_hash: Option<Hash>,
    pub valid_share_output: bool,
    /// The decoded payload has been checked against this node's share.
    pub output_processed: bool,
    pub commitment_sent: bool,
    pub implicate_sent: bool,
    pub share_recovery_ongoing: bool,
    pub recovery_sent: bool,
    pub verified_recovery_shares: BTreeMap<NodeIndex, ShamirShare<Scalar<C>>>,
    pub implicate_queue: Vec<ImplicateRecord>,
    received_commitments: HashSet<NodeIndex>,
    commitment_counts: HashMap<Hash, usize>,
    pub canonical_commitment: Option<Hash>,
    pub output_emitted: bool,
}

impl<C: DacssCurve> Default for AccsState<C> {
    fn default() -> Self {
        Self {
            rbc: RbcState::new(),
            acss_data_hash: None,
            acss_data: None,
            received_share: None,
            commitments: None,
            own_commitment_hash: None,
            valid_share_output: false,
            output_processed: false,
            commitment_sent: false,
            implicate_sent: false,
            share_recovery_ongoing: false,
            recovery_sent: false,
            verified_recovery_shares: BTreeMap::new(),
            implicate_queue: Vec::new(),
            received_commitments: HashSet::new(),
            commitment_counts: HashMap::new(),
            canonical_commitment: None,
            output_emitted: false,
        }
    }
}

impl<C: DacssCurve> AccsState<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the dealt data if none is known yet and hand back the
    /// implicates that were waiting for it.
    pub fn set_acss_data(&mut self, data: AcssData, hash: Hash) -> Vec<ImplicateRecord> {
        if self.acss_data.is_some() {
            return Vec::new();
        }
        self.acss_data = Some(data);
        self.acss_data_hash.get_or_insert(hash);
        std::mem::take(&mut self.implicate_queue)
    }

    /// Buffer an implicate. One record per sender; a newer one replaces
    /// the older.
    pub fn queue_implicate(&mut self, record: ImplicateRecord) {
        match self
            .implicate_queue
            .iter_mut()
            .find(|queued| queued.accused_by == record.accused_by)
        {
            Some(queued) => *queued = record,
            None => self.implicate_queue.push(record),
        }
    }

    /// A verified share is held.
    pub fn has_valid_share(&self) -> bool {
        self.valid_share_output && self.received_share.is_some()
    }

    /// Store a verified share and its commitments.
    pub fn accept_share(
        &mut self,
        share: ShamirShare<Scalar<C>>,
        commitments: FeldmanCommitments<C>,
        commitment_hash: Hash,
    ) {
        self.received_share = Some(share);
        self.commitments = Some(commitments);
        self.own_commitment_hash = Some(commitment_hash);
        self.valid_share_output = true;
    }

    /// Tally a commitment hash from `sender`. The first hash to reach
    /// `threshold` becomes canonical. Returns `false` for a repeat sender.
    pub fn record_commitment(&mut self, sender: NodeIndex, hash: Hash, threshold: usize) -> bool {
        if !self.received_commitments.insert(sender) {
            return false;
        }
        let count = self.commitment_counts.entry(hash).or_insert(0);
        *count += 1;
        if *count >= threshold && self.canonical_commitment.is_none() {
            self.canonical_commitment = Some(hash);
        }
        true
    }

    pub fn commitment_count(&self, hash: &Hash) -> usize {
        self.commitment_counts.get(hash).copied().unwrap_or(0)
    }

    /// Whether the output event is due: a valid share whose commitment
    /// matches the canonical one, not yet emitted. Marks it emitted.
    pub fn take_output(&mut self) -> Option<(ShamirShare<Scalar<C>>, FeldmanCommitments<C>, Hash)> {
        if self.output_emitted || !self.valid_share_output {
            return None;
        }
        let canonical = self.canonical_commitment?;
        if self.own_commitment_hash != Some(canonical) {
            return None;
        }
        let share = self.received_share.clone()?;
        let commitments = self.commitments.clone()?;
        self.output_emitted = true;
        Some((share, commitments, canonical))
    }

    pub fn snapshot(&self) -> RoundSnapshot<C> {
        RoundSnapshot {
            phase: self.rbc.phase(),
            ready_sent: self.rbc.is_ready_msg_sent(),
            acss_data_hash: self.acss_data_hash,
            valid_share_output: self.valid_share_output,
            received_share: self.received_share.clone(),
            share_recovery_ongoing: self.share_recovery_ongoing,
            verified_recovery_shares: self.verified_recovery_shares.len(),
            canonical_commitment: self.canonical_commitment,
            output_emitted: self.output_emitted,
        }
    }
}

/// Read-only view of a round for collaborators and tests.
#[derive(Debug, Clone)]
pub struct RoundSnapshot<C: DacssCurve> {
    pub phase: RbcPhase,
    pub ready_sent: bool,
    pub acss_data_hash: Option<Hash>,
    pub valid_share_output: bool,
    pub received_share: Option<ShamirShare<Scalar<C>>>,
    pub share_recovery_ongoing: bool,
    pub verified_recovery_shares: usize,
    pub canonical_commitment: Option<Hash>,
    pub output_emitted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpss_crypto::{Polynomial, Secp256k1};
    use rand::rngs::OsRng;
    use std::collections::BTreeMap;

    type State = AccsState<Secp256k1>;

    fn record(sender: NodeIndex, tag: u8) -> ImplicateRecord {
        ImplicateRecord {
            accused_by: sender,
            symmetric_key: vec![tag],
            proof: vec![tag],
        }
    }

    fn data() -> AcssData {
        AcssData {
            commitments: vec![1, 2, 3],
            share_map: BTreeMap::new(),
            dealer_ephemeral_pub_key: vec![4],
        }
    }

    #[test]
    fn test_implicates_buffered_until_data() {
        let mut state = State::new();
        state.queue_implicate(record(3, 1));
        state.queue_implicate(record(5, 1));
        let drained = state.set_acss_data(data(), [9u8; 32]);
        assert_eq!(drained.len(), 2);
        assert!(state.implicate_queue.is_empty());

        // Data arrives a second time: nothing replayed.
        assert!(state.set_acss_data(data(), [9u8; 32]).is_empty());
    }

    #[test]
    fn test_repeated_implicate_from_same_sender_overwrites() {
        let mut state = State::new();
        state.queue_implicate(record(3, 1));
        state.queue_implicate(record(3, 2));
        assert_eq!(state.implicate_queue, vec![record(3, 2)]);
    }

    #[test]
    fn test_acss_hash_fixed_once_known() {
        let mut state = State::new();
        state.acss_data_hash = Some([1u8; 32]);
        state.set_acss_data(data(), [2u8; 32]);
        assert_eq!(state.acss_data_hash, Some([1u8; 32]));
    }

    #[test]
    fn test_commitment_tally() {
        let mut state = State::new();
        let good = [7u8; 32];
        let bad = [8u8; 32];
        assert!(state.record_commitment(1, bad, 3));
        assert!(state.record_commitment(2, good, 3));
        assert!(!state.record_commitment(2, good, 3));
        assert!(state.record_commitment(3, good, 3));
        assert_eq!(state.canonical_commitment, None);
        assert!(state.record_commitment(4, good, 3));
        assert_eq!(state.canonical_commitment, Some(good));
        assert_eq!(state.commitment_count(&good), 3);
        assert_eq!(state.commitment_count(&bad), 1);
    }

    #[test]
    fn test_take_output_once() {
        let mut state = State::new();
        let polynomial = Polynomial::random(Scalar::<Secp256k1>::from(11u64), 2, &mut OsRng);
        let commitments = FeldmanCommitments::<Secp256k1>::commit(&polynomial);
        let hash = commitments.secret_commitment_hash().expect("hash");
        let share = ShamirShare::new(1, polynomial.evaluate(Scalar::<Secp256k1>::from(1u64)));

        state.accept_share(share.clone(), commitments, hash);
        assert!(state.take_output().is_none());

        for sender in 1..=3 {
            state.record_commitment(sender, hash, 3);
        }
        let (out_share, _, out_hash) = state.take_output().expect("due");
        assert_eq!(out_share, share);
        assert_eq!(out_hash, hash);
        assert!(state.take_output().is_none());
    }

    #[test]
    fn test_take_output_requires_matching_hash() {
        let mut state = State::new();
        let polynomial = Polynomial::random(Scalar::<Secp256k1>::from(11u64), 2, &mut OsRng);
        let commitments = FeldmanCommitments::<Secp256k1>::commit(&polynomial);
        let hash = commitments.secret_commitment_hash().expect("hash");
        state.accept_share(ShamirShare::new(1, Scalar::<Secp256k1>::from(1u64)), commitments, hash);
        for sender in 1..=3 {
            state.record_commitment(sender, [0u8; 32], 3);
        }
        assert!(state.take_output().is_none());
    }
}
