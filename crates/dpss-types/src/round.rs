//! Identifiers for sharing rounds.

use serde::{Deserialize, Serialize};

use crate::NodeIndex;

/// Proactive secret sharing session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PssId(pub u64);

impl std::fmt::Display for PssId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pss-{}", self.0)
    }
}

/// One sharing instance: a dealer's `batch_index`-th secret within a
/// PSS session. Key into all per-round state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AcssRoundId {
    /// Index of the dealer in the old committee.
    pub dealer: NodeIndex,
    pub pss_id: PssId,
    pub batch_index: u32,
}

impl AcssRoundId {
    pub fn new(dealer: NodeIndex, pss_id: PssId, batch_index: u32) -> Self {
        Self {
            dealer,
            pss_id,
            batch_index,
        }
    }
}

impl std::fmt::Display for AcssRoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/d{}/b{}", self.pss_id, self.dealer, self.batch_index)
    }
}
