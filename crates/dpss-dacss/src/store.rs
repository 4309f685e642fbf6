//! Keyed store of per-round state.
//!
//! `RoundId -> Arc<Mutex<AccsState>>`. Entries are created lazily by the
//! first message for a round and removed only by explicit teardown from
//! the session layer. The map lock is held just long enough to clone the
//! entry's `Arc`; all protocol work happens under the entry's own lock.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use dpss_crypto::DacssCurve;
use dpss_types::{AcssRoundId, PssId};

use crate::state::AccsState;

pub type RoundHandle<C> = Arc<Mutex<AccsState<C>>>;

pub struct RoundStore<C: DacssCurve> {
    rounds: RwLock<HashMap<AcssRoundId, RoundHandle<C>>>,
}

impl<C: DacssCurve> Default for RoundStore<C> {
    fn default() -> Self {
        Self {
            rounds: RwLock::new(HashMap::new()),
        }
    }
}

impl<C: DacssCurve> RoundStore<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing state for `round`, or a fresh one.
    pub async fn get_or_create(&self, round: &AcssRoundId) -> RoundHandle<C> {
        if let Some(handle) = self.rounds.read().await.get(round) {
            return Arc::clone(handle);
        }
        let mut rounds = self.rounds.write().await;
        Arc::clone(rounds.entry(*round).or_insert_with(|| {
            tracing::debug!(%round, "creating round state");
            Arc::new(Mutex::new(AccsState::new()))
        }))
    }

    pub async fn get(&self, round: &AcssRoundId) -> Option<RoundHandle<C>> {
        self.rounds.read().await.get(round).map(Arc::clone)
    }

    /// Drop one round's state. Returns whether it existed.
    pub async fn teardown(&self, round: &AcssRoundId) -> bool {
        self.rounds.write().await.remove(round).is_some()
    }

    /// Drop every round of a PSS session. Returns how many were removed.
    pub async fn teardown_session(&self, pss_id: PssId) -> usize {
        let mut rounds = self.rounds.write().await;
        let before = rounds.len();
        rounds.retain(|round, _| round.pss_id != pss_id);
        let removed = before - rounds.len();
        tracing::debug!(%pss_id, removed, "session torn down");
        removed
    }

    pub async fn len(&self) -> usize {
        self.rounds.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rounds.read().await.is_empty()
    }
}
