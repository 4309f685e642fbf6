//! Committee membership and threshold parameters.

use serde::{Deserialize, Serialize};

use crate::{NodeIndex, Result, TypesError, MAX_COMMITTEE_SIZE};

/// Which side of a resharing a committee is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitteeKind {
    /// Committee currently holding shares; dealers come from here.
    Old,
    /// Committee receiving shares.
    New,
}

impl CommitteeKind {
    /// The committee on the other side of the resharing.
    pub fn other(self) -> Self {
        match self {
            CommitteeKind::Old => CommitteeKind::New,
            CommitteeKind::New => CommitteeKind::Old,
        }
    }
}

impl std::fmt::Display for CommitteeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitteeKind::Old => write!(f, "old"),
            CommitteeKind::New => write!(f, "new"),
        }
    }
}

/// Identity of a node: its index within a committee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeDetails {
    pub index: NodeIndex,
    pub committee: CommitteeKind,
}

impl NodeDetails {
    pub fn new(index: NodeIndex, committee: CommitteeKind) -> Self {
        Self { index, committee }
    }
}

impl std::fmt::Display for NodeDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.committee, self.index)
    }
}

/// `(n, k, t)` for one committee, with `k = t + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeParams {
    /// Committee size.
    pub n: usize,
    /// Reconstruction threshold.
    pub k: usize,
    /// Maximum number of Byzantine members tolerated.
    pub t: usize,
}

impl CommitteeParams {
    /// Build parameters for `n` nodes tolerating `t` faults.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::InvalidParams`] unless `t >= 1`, `n > 3t` and
    /// `n <= 255`.
    pub fn new(n: usize, t: usize) -> Result<Self> {
        if t == 0 {
            return Err(TypesError::InvalidParams("t must be at least 1".to_string()));
        }
        if n <= 3 * t {
            return Err(TypesError::InvalidParams(format!(
                "n = {n} must exceed 3t = {}",
                3 * t
            )));
        }
        if n > MAX_COMMITTEE_SIZE {
            return Err(TypesError::InvalidParams(format!(
                "n = {n} exceeds maximum {MAX_COMMITTEE_SIZE}"
            )));
        }
        Ok(Self { n, k: t + 1, t })
    }

    /// ECHO count that triggers READY.
    pub fn echo_threshold(&self) -> usize {
        2 * self.t + 1
    }

    /// Matching READY or commitment count that implies one honest sender.
    pub fn honest_threshold(&self) -> usize {
        self.t + 1
    }

    /// Whether `index` names a member of a committee of this size.
    pub fn contains(&self, index: NodeIndex) -> bool {
        index >= 1 && (index as usize) <= self.n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_derive_k() {
        let params = CommitteeParams::new(7, 2).expect("params");
        assert_eq!(params.k, 3);
        assert_eq!(params.echo_threshold(), 5);
        assert_eq!(params.honest_threshold(), 3);
    }

    #[test]
    fn test_params_reject_small_committee() {
        assert!(CommitteeParams::new(6, 2).is_err());
        assert!(CommitteeParams::new(4, 0).is_err());
        assert!(CommitteeParams::new(300, 10).is_err());
        assert!(CommitteeParams::new(4, 1).is_ok());
    }

    #[test]
    fn test_contains() {
        let params = CommitteeParams::new(4, 1).expect("params");
        assert!(!params.contains(0));
        assert!(params.contains(1));
        assert!(params.contains(4));
        assert!(!params.contains(5));
    }

    #[test]
    fn test_other_committee() {
        assert_eq!(CommitteeKind::Old.other(), CommitteeKind::New);
        assert_eq!(CommitteeKind::New.other(), CommitteeKind::Old);
    }
}
