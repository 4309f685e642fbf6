//! Committee membership capability.

use dpss_types::{CommitteeKind, CommitteeParams, NodeDetails};

use crate::config::DacssConfig;

/// Who this node is and who its peers are.
pub trait Membership: Send + Sync {
    /// This node's identity.
    fn details(&self) -> NodeDetails;

    /// `(n, k, t)` of a committee.
    fn params(&self, committee: CommitteeKind) -> CommitteeParams;

    /// Every member of a committee.
    fn nodes(&self, committee: CommitteeKind) -> Vec<NodeDetails> {
        let n = self.params(committee).n as u32;
        (1..=n).map(|index| NodeDetails::new(index, committee)).collect()
    }
}

/// Fixed committees with members indexed `1..=n`.
#[derive(Debug, Clone)]
pub struct StaticMembership {
    details: NodeDetails,
    old: CommitteeParams,
    new: CommitteeParams,
}

impl StaticMembership {
    pub fn new(details: NodeDetails, old: CommitteeParams, new: CommitteeParams) -> Self {
        Self { details, old, new }
    }

    pub fn from_config(config: &DacssConfig) -> dpss_types::Result<Self> {
        Ok(Self::new(
            config.details(),
            config.old_committee.params()?,
            config.new_committee.params()?,
        ))
    }
}

impl Membership for StaticMembership {
    fn details(&self) -> NodeDetails {
        self.details
    }

    fn params(&self, committee: CommitteeKind) -> CommitteeParams {
        match committee {
            CommitteeKind::Old => self.old,
            CommitteeKind::New => self.new,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nodes_per_committee() {
        let membership = StaticMembership::new(
            NodeDetails::new(1, CommitteeKind::Old),
            CommitteeParams::new(7, 2).expect("params"),
            CommitteeParams::new(4, 1).expect("params"),
        );
        let old = membership.nodes(CommitteeKind::Old);
        let new = membership.nodes(CommitteeKind::New);
        assert_eq!(old.len(), 7);
        assert_eq!(new.len(), 4);
        assert_eq!(new[3], NodeDetails::new(4, CommitteeKind::New));
    }
}
