//! Key material capability.

use std::collections::HashMap;

use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use dpss_crypto::curve::keypair;
use dpss_crypto::{DacssCurve, Scalar};
use dpss_types::{CommitteeKind, NodeDetails, NodeIndex};

/// Long-term keys: this node's private key and every member's public key.
pub trait KeyAccess<C: DacssCurve>: Send + Sync {
    fn private_key(&self) -> Scalar<C>;

    fn public_key_of(&self, index: NodeIndex, committee: CommitteeKind) -> Option<C>;
}

/// In-memory key directory.
pub struct StaticKeys<C: DacssCurve> {
    private_key: Scalar<C>,
    directory: HashMap<NodeDetails, C>,
}

impl<C: DacssCurve> StaticKeys<C> {
    pub fn new(private_key: Scalar<C>, directory: HashMap<NodeDetails, C>) -> Self {
        Self {
            private_key,
            directory,
        }
    }
}

impl<C: DacssCurve> Drop for StaticKeys<C> {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

impl<C: DacssCurve> KeyAccess<C> for StaticKeys<C> {
    fn private_key(&self) -> Scalar<C> {
        self.private_key
    }

    fn public_key_of(&self, index: NodeIndex, committee: CommitteeKind) -> Option<C> {
        self.directory.get(&NodeDetails::new(index, committee)).copied()
    }
}

/// Fresh key pairs for every member of both committees.
///
/// Returns the private keys and the shared public directory.
pub fn generate_committee_keys<C: DacssCurve, R: RngCore + CryptoRng>(
    old_n: usize,
    new_n: usize,
    rng: &mut R,
) -> (HashMap<NodeDetails, Scalar<C>>, HashMap<NodeDetails, C>) {
    let mut secrets = HashMap::new();
    let mut directory = HashMap::new();
    let members = (1..=old_n as u32)
        .map(|i| NodeDetails::new(i, CommitteeKind::Old))
        .chain((1..=new_n as u32).map(|i| NodeDetails::new(i, CommitteeKind::New)));
    for node in members {
        let (sk, pk) = keypair::<C, R>(rng);
        secrets.insert(node, sk);
        directory.insert(node, pk);
    }
    (secrets, directory)
}
