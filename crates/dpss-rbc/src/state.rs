//! Per-round reliable broadcast state machine.
//!
//! Pure state: callers feed ECHO/READY messages in under the round's
//! lock and perform the returned [`RbcAction`]s after releasing it.
//!
//! ```text
//! Initial --start--> Started --READY sent--> Proposing --decoded--> Ended
//! ```
//!
//! Phases only move forward. READY is sent at most once per round.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use dpss_crypto::blake3::{self, contexts, encode_multi_field};
use dpss_types::{short_hex, CommitteeParams, Hash, NodeIndex, Shard};

use crate::codec::ErasureCodec;

/// Broadcast progress for one round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RbcPhase {
    /// State exists but the dealer's proposal has not been seen.
    #[default]
    Initial,
    /// Own shard and payload hash are known; echoes sent.
    Started,
    /// READY has been broadcast.
    Proposing,
    /// Payload decoded and delivered.
    Ended,
}

impl std::fmt::Display for RbcPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RbcPhase::Initial => write!(f, "initial"),
            RbcPhase::Started => write!(f, "started"),
            RbcPhase::Proposing => write!(f, "proposing"),
            RbcPhase::Ended => write!(f, "ended"),
        }
    }
}

/// Side effect requested by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RbcAction {
    /// Broadcast READY with this shard to the committee.
    BroadcastReady { shard: Shard, hash: Hash },
    /// The payload was reconstructed and matches `hash`.
    Deliver { payload: Vec<u8>, hash: Hash },
}

#[derive(Debug, Clone)]
struct EchoTally {
    shard: Shard,
    hash: Hash,
    count: usize,
}

/// ECHO/READY bookkeeping for one round.
#[derive(Debug, Default)]
pub struct RbcState {
    phase: RbcPhase,
    own_shard: Option<Shard>,
    own_hash: Option<Hash>,
    received_echo: HashSet<NodeIndex>,
    received_ready: HashSet<NodeIndex>,
    echo_tally: HashMap<Hash, EchoTally>,
    ready_counts: HashMap<Hash, usize>,
    ready_shards: Vec<Shard>,
    is_ready_msg_sent: bool,
    delivered: Option<Hash>,
}

impl RbcState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> RbcPhase {
        self.phase
    }

    pub fn is_ready_msg_sent(&self) -> bool {
        self.is_ready_msg_sent
    }

    pub fn own_shard(&self) -> Option<&Shard> {
        self.own_shard.as_ref()
    }

    /// Shards collected from READY messages.
    pub fn ready_shards(&self) -> &[Shard] {
        &self.ready_shards
    }

    pub fn delivered_hash(&self) -> Option<Hash> {
        self.delivered
    }

    fn advance(&mut self, to: RbcPhase) {
        if to > self.phase {
            self.phase = to;
        }
    }

    /// Record this node's own shard once the dealer's payload is known.
    ///
    /// Returns `false` if the round was already started.
    pub fn start(&mut self, own_shard: Shard, hash: Hash) -> bool {
        if self.own_hash.is_some() {
            return false;
        }
        self.own_shard = Some(own_shard);
        self.own_hash = Some(hash);
        self.advance(RbcPhase::Started);
        true
    }

    /// Move straight to `Ended`. Used when the share is obtained through
    /// recovery instead of decoding.
    pub fn force_end(&mut self) {
        self.advance(RbcPhase::Ended);
    }

    /// Count an ECHO from `sender`.
    ///
    /// Once `2t + 1` echoes carry the same shard and hash, READY is
    /// requested, at most once per round.
    pub fn handle_echo(
        &mut self,
        params: &CommitteeParams,
        sender: NodeIndex,
        shard: Shard,
        hash: Hash,
    ) -> Option<RbcAction> {
        if self.phase == RbcPhase::Ended {
            return None;
        }
        if let (Some(own_shard), Some(own_hash)) = (&self.own_shard, &self.own_hash) {
            if *own_shard != shard || *own_hash != hash {
                tracing::debug!(sender, hash = %short_hex(&hash), "echo does not match own shard");
                return None;
            }
        }
        if !self.received_echo.insert(sender) {
            return None;
        }

        let key = fingerprint(&shard, &hash);
        let tally = self.echo_tally.entry(key).or_insert_with(|| EchoTally {
            shard,
            hash,
            count: 0,
        });
        tally.count += 1;

        if tally.count >= params.echo_threshold() && !self.is_ready_msg_sent {
            let shard = tally.shard.clone();
            let hash = tally.hash;
            self.is_ready_msg_sent = true;
            self.advance(RbcPhase::Proposing);
            return Some(RbcAction::BroadcastReady { shard, hash });
        }
        None
    }

    /// Record a READY from `sender` and attempt decoding.
    ///
    /// A READY carries the sender's own shard, index `sender - 1`; others
    /// are dropped. `known_hash` is the payload hash this node learned
    /// from the dealer, if any; otherwise the hash backed by `t + 1`
    /// READYs is decoded. A pool of `2t + 1 + r` shards decodes despite
    /// up to `r` corrupt ones.
    pub fn handle_ready(
        &mut self,
        params: &CommitteeParams,
        codec: &ErasureCodec,
        sender: NodeIndex,
        shard: Shard,
        hash: Hash,
        known_hash: Option<Hash>,
    ) -> Vec<RbcAction> {
        let mut actions = Vec::new();
        if shard.index + 1 != sender as usize {
            tracing::debug!(sender, index = shard.index, "ready carries another member's shard");
            return actions;
        }
        if self.phase == RbcPhase::Ended || !self.received_ready.insert(sender) {
            return actions;
        }

        let count = {
            let count = self.ready_counts.entry(hash).or_insert(0);
            *count += 1;
            *count
        };
        self.ready_shards.push(shard);

        // Amplification: t + 1 READYs mean an honest node saw 2t + 1 echoes.
        if count >= params.honest_threshold() && !self.is_ready_msg_sent {
            let supported = self
                .echo_tally
                .values()
                .find(|tally| tally.hash == hash && tally.count >= params.honest_threshold())
                .map(|tally| tally.shard.clone());
            if let Some(own) = supported {
                self.is_ready_msg_sent = true;
                self.advance(RbcPhase::Proposing);
                actions.push(RbcAction::BroadcastReady { shard: own, hash });
            }
        }

        let pool = self.ready_shards.len();
        let decode_window = params.echo_threshold()..=params.echo_threshold() + params.t;
        if !decode_window.contains(&pool) {
            return actions;
        }
        let target = known_hash.or_else(|| {
            self.ready_counts
                .iter()
                .find(|(_, count)| **count >= params.honest_threshold())
                .map(|(hash, _)| *hash)
        });
        let Some(target) = target else {
            return actions;
        };
        if let Some(payload) = codec.decode_matching(&self.ready_shards, &target) {
            self.delivered = Some(target);
            self.advance(RbcPhase::Ended);
            tracing::debug!(pool, hash = %short_hex(&target), "payload decoded");
            actions.push(RbcAction::Deliver {
                payload,
                hash: target,
            });
        }
        actions
    }
}

fn fingerprint(shard: &Shard, hash: &Hash) -> Hash {
    let index = (shard.index as u64).to_le_bytes();
    blake3::derive_key(
        contexts::SHARD_FINGERPRINT,
        &encode_multi_field(&[hash, &index, &shard.data]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload_hash;

    struct Fixture {
        params: CommitteeParams,
        codec: ErasureCodec,
        shards: Vec<Shard>,
        payload: Vec<u8>,
        hash: Hash,
    }

    fn fixture() -> Fixture {
        let params = CommitteeParams::new(7, 2).expect("params");
        let codec = ErasureCodec::new(&params).expect("codec");
        let payload = b"acss data for round 1".repeat(10);
        let shards = codec.encode(&payload).expect("encode");
        let hash = payload_hash(&payload);
        Fixture {
            params,
            codec,
            shards,
            payload,
            hash,
        }
    }

    #[test]
    fn test_ready_after_threshold_echoes() {
        let f = fixture();
        let mut state = RbcState::new();
        assert!(state.start(f.shards[0].clone(), f.hash));
        assert_eq!(state.phase(), RbcPhase::Started);

        for sender in 1..=4 {
            assert!(state
                .handle_echo(&f.params, sender, f.shards[0].clone(), f.hash)
                .is_none());
        }
        let action = state.handle_echo(&f.params, 5, f.shards[0].clone(), f.hash);
        assert_eq!(
            action,
            Some(RbcAction::BroadcastReady {
                shard: f.shards[0].clone(),
                hash: f.hash
            })
        );
        assert_eq!(state.phase(), RbcPhase::Proposing);

        // Further echoes never trigger a second READY.
        for sender in 6..=7 {
            assert!(state
                .handle_echo(&f.params, sender, f.shards[0].clone(), f.hash)
                .is_none());
        }
    }

    #[test]
    fn test_duplicate_echoes_not_double_counted() {
        let f = fixture();
        let mut state = RbcState::new();
        state.start(f.shards[0].clone(), f.hash);
        for _ in 0..10 {
            assert!(state
                .handle_echo(&f.params, 1, f.shards[0].clone(), f.hash)
                .is_none());
        }
        assert!(!state.is_ready_msg_sent());
    }

    #[test]
    fn test_mismatched_echo_ignored() {
        let f = fixture();
        let mut state = RbcState::new();
        state.start(f.shards[0].clone(), f.hash);
        for sender in 1..=7 {
            assert!(state
                .handle_echo(&f.params, sender, f.shards[1].clone(), f.hash)
                .is_none());
        }
        assert!(!state.is_ready_msg_sent());
    }

    #[test]
    fn test_echoes_before_start_still_count() {
        let f = fixture();
        let mut state = RbcState::new();
        let mut actions = Vec::new();
        for sender in 1..=5 {
            actions.extend(state.handle_echo(&f.params, sender, f.shards[3].clone(), f.hash));
        }
        assert_eq!(actions.len(), 1);
        assert_eq!(state.phase(), RbcPhase::Proposing);
        // A late start does not move the phase backwards.
        state.start(f.shards[3].clone(), f.hash);
        assert_eq!(state.phase(), RbcPhase::Proposing);
    }

    #[test]
    fn test_decode_at_2t_plus_1_readies() {
        let f = fixture();
        let mut state = RbcState::new();
        state.start(f.shards[0].clone(), f.hash);

        for sender in 1..=4u32 {
            let shard = f.shards[sender as usize - 1].clone();
            let actions = state.handle_ready(&f.params, &f.codec, sender, shard, f.hash, Some(f.hash));
            assert!(actions.iter().all(|a| !matches!(a, RbcAction::Deliver { .. })));
        }
        let actions = state.handle_ready(
            &f.params,
            &f.codec,
            5,
            f.shards[4].clone(),
            f.hash,
            Some(f.hash),
        );
        assert!(actions.contains(&RbcAction::Deliver {
            payload: f.payload.clone(),
            hash: f.hash
        }));
        assert_eq!(state.phase(), RbcPhase::Ended);
        assert_eq!(state.delivered_hash(), Some(f.hash));

        // Later READYs are no-ops.
        assert!(state
            .handle_ready(&f.params, &f.codec, 6, f.shards[5].clone(), f.hash, Some(f.hash))
            .is_empty());
    }

    #[test]
    fn test_amplification_needs_echo_support() {
        let f = fixture();
        let mut state = RbcState::new();
        // Three echoes (t + 1) for shard 2, not enough for READY on their own.
        for sender in 1..=3 {
            assert!(state
                .handle_echo(&f.params, sender, f.shards[2].clone(), f.hash)
                .is_none());
        }
        let mut actions = Vec::new();
        for sender in 4..=6u32 {
            let shard = f.shards[sender as usize - 1].clone();
            actions.extend(state.handle_ready(&f.params, &f.codec, sender, shard, f.hash, None));
        }
        assert_eq!(
            actions,
            vec![RbcAction::BroadcastReady {
                shard: f.shards[2].clone(),
                hash: f.hash
            }]
        );
        assert!(state.is_ready_msg_sent());
    }

    #[test]
    fn test_decode_without_local_hash_uses_ready_majority() {
        let f = fixture();
        let mut state = RbcState::new();
        let mut delivered = None;
        for sender in 1..=5u32 {
            let shard = f.shards[sender as usize - 1].clone();
            for action in state.handle_ready(&f.params, &f.codec, sender, shard, f.hash, None) {
                if let RbcAction::Deliver { payload, .. } = action {
                    delivered = Some(payload);
                }
            }
        }
        assert_eq!(delivered, Some(f.payload));
    }

    #[test]
    fn test_byzantine_ready_shards_tolerated() {
        let f = fixture();
        let mut state = RbcState::new();
        state.start(f.shards[0].clone(), f.hash);
        let garbage = |index: usize| Shard {
            index,
            data: vec![0xEE; f.shards[index].data.len()],
        };
        // t = 2 Byzantine nodes send garbage first.
        state.handle_ready(&f.params, &f.codec, 1, garbage(0), f.hash, Some(f.hash));
        state.handle_ready(&f.params, &f.codec, 2, garbage(1), f.hash, Some(f.hash));
        let mut delivered = false;
        for sender in 3..=7u32 {
            let shard = f.shards[sender as usize - 1].clone();
            let actions =
                state.handle_ready(&f.params, &f.codec, sender, shard, f.hash, Some(f.hash));
            delivered |= actions.iter().any(|a| matches!(a, RbcAction::Deliver { .. }));
        }
        assert!(delivered);
        assert_eq!(state.phase(), RbcPhase::Ended);
    }

    #[test]
    fn test_byzantine_ready_shards_first_large_committee() {
        for (n, t) in [(22usize, 7usize), (31, 10)] {
            let params = CommitteeParams::new(n, t).expect("params");
            let codec = ErasureCodec::new(&params).expect("codec");
            let payload = b"acss data for a large committee".repeat(40);
            let hash = payload_hash(&payload);
            let shards = codec.encode(&payload).expect("encode");

            let mut state = RbcState::new();
            state.start(shards[n - 1].clone(), hash);
            let mut delivered = None;
            for (position, shard) in shards.iter().enumerate() {
                let sender = position as u32 + 1;
                // The first t senders are Byzantine.
                let shard = if position < t {
                    Shard {
                        index: position,
                        data: vec![0xEE; shard.data.len()],
                    }
                } else {
                    shard.clone()
                };
                for action in state.handle_ready(&params, &codec, sender, shard, hash, Some(hash)) {
                    if let RbcAction::Deliver { payload, .. } = action {
                        delivered = Some(payload);
                    }
                }
            }
            assert_eq!(delivered.as_ref(), Some(&payload), "n={n} t={t}");
            assert_eq!(state.phase(), RbcPhase::Ended);
        }
    }

    #[test]
    fn test_ready_with_foreign_shard_dropped() {
        let f = fixture();
        let mut state = RbcState::new();
        for sender in 1..=5u32 {
            // Every sender claims shard 0.
            let actions =
                state.handle_ready(&f.params, &f.codec, sender, f.shards[0].clone(), f.hash, Some(f.hash));
            assert!(actions.is_empty());
        }
        assert!(state.ready_shards().len() <= 1);
        assert_ne!(state.phase(), RbcPhase::Ended);
    }

    #[test]
    fn test_force_end_is_monotonic() {
        let mut state = RbcState::new();
        state.force_end();
        assert_eq!(state.phase(), RbcPhase::Ended);
        let f = fixture();
        assert!(state.start(f.shards[0].clone(), f.hash));
        assert_eq!(state.phase(), RbcPhase::Ended);
    }
}
