//! Dealing a secret to both committees.
//!
//! The dealer samples one polynomial per committee, both with the secret
//! as constant term, commits to each with Feldman commitments and
//! encrypts every member's share under `PK_j^eph` for a fresh ephemeral
//! key `eph` shared by both committees of the round.

use std::collections::BTreeMap;

use ark_ec::Group;
use ark_ff::Zero;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use dpss_crypto::channel::{self, shared_key};
use dpss_crypto::curve::{keypair, point_to_bytes, point_to_hex, random_scalar};
use dpss_crypto::{DacssCurve, FeldmanCommitments, Polynomial, Scalar, Shamir, ShamirShare};
use dpss_transport::messages::ProposeMessage;
use dpss_transport::AcssData;
use dpss_types::{AcssRoundId, CommitteeKind, CommitteeParams, NodeDetails, PssId};

use crate::keys::KeyAccess;
use crate::node::DacssNode;
use crate::{DacssError, Result};

/// Everything produced when dealing to one committee.
#[derive(Debug, Clone)]
pub struct CommitteeDealing<C: DacssCurve> {
    pub data: AcssData,
    pub polynomial: Polynomial<Scalar<C>>,
    /// Plaintext shares, index `j - 1` for member `j`.
    pub shares: Vec<ShamirShare<Scalar<C>>>,
    pub commitments: FeldmanCommitments<C>,
}

/// Share `secret` to the members of `committee`.
pub fn build_acss_data<C: DacssCurve, R: RngCore + CryptoRng>(
    keys: &dyn KeyAccess<C>,
    committee: CommitteeKind,
    params: &CommitteeParams,
    secret: Scalar<C>,
    ephemeral_secret: &Scalar<C>,
    rng: &mut R,
) -> Result<CommitteeDealing<C>> {
    let shamir = Shamir::new(params.k, params.n)?;
    let (polynomial, shares) = shamir.split_with_polynomial(secret, rng)?;
    let commitments = FeldmanCommitments::<C>::commit(&polynomial);
    let ephemeral_public = C::generator() * *ephemeral_secret;

    let mut share_map = BTreeMap::new();
    for share in &shares {
        let member = NodeDetails::new(share.id, committee);
        let pk = keys
            .public_key_of(share.id, committee)
            .ok_or(DacssError::MissingKey(member))?;
        let key = shared_key(ephemeral_secret, &pk);
        let ciphertext = channel::encrypt(&key, &share.to_bytes()?)?;
        share_map.insert(point_to_hex(&pk)?, ciphertext);
    }

    Ok(CommitteeDealing {
        data: AcssData {
            commitments: commitments.to_bytes()?,
            share_map,
            dealer_ephemeral_pub_key: point_to_bytes(&ephemeral_public)?,
        },
        polynomial,
        shares,
        commitments,
    })
}

impl<C: DacssCurve> DacssNode<C> {
    /// Deal `secret` for `round` to both committees.
    ///
    /// Only the round's dealer, a member of the old committee, may call
    /// this.
    pub fn deal(&self, round: AcssRoundId, secret: Scalar<C>) -> Result<()> {
        let me = self.details();
        if me != NodeDetails::new(round.dealer, CommitteeKind::Old) {
            return Err(DacssError::NotDealer { node: me, round });
        }

        let (mut ephemeral_secret, _) = keypair::<C, _>(&mut OsRng);
        let dealt = [CommitteeKind::Old, CommitteeKind::New].map(|committee| {
            let params = self.membership.params(committee);
            build_acss_data(
                self.keys.as_ref(),
                committee,
                &params,
                secret,
                &ephemeral_secret,
                &mut OsRng,
            )
            .map(|dealing| (committee, dealing))
        });
        ephemeral_secret.zeroize();

        for dealing in dealt {
            let (committee, dealing) = dealing?;
            let propose = self.envelope(
                round,
                &ProposeMessage {
                    committee,
                    data: dealing.data,
                },
            )?;
            self.outbox.broadcast(committee, propose)?;
        }
        tracing::info!(node = %me, %round, "dealt to both committees");
        Ok(())
    }

    /// Deal enough fresh random secrets to cover `old_share_count` shares
    /// of the old committee. Each round yields `n - 2t` usable sharings
    /// after batch reconstruction, so `ceil(count / (n - 2t))` rounds are
    /// dealt. Returns the dealt rounds; none if this node is not in the
    /// old committee.
    pub fn start_batch(&self, pss_id: PssId, old_share_count: usize) -> Result<Vec<AcssRoundId>> {
        let me = self.details();
        if me.committee != CommitteeKind::Old {
            return Ok(Vec::new());
        }
        let params = self.membership.params(CommitteeKind::Old);
        let batch_size = old_share_count.div_ceil(params.n - 2 * params.t);

        let mut rounds = Vec::with_capacity(batch_size);
        for batch_index in 0..batch_size as u32 {
            let round = AcssRoundId::new(me.index, pss_id, batch_index);
            let mut secret = nonzero_scalar::<C>();
            let dealt = self.deal(round, secret);
            secret.zeroize();
            dealt?;
            rounds.push(round);
        }
        tracing::info!(node = %me, %pss_id, rounds = rounds.len(), "batch dealt");
        Ok(rounds)
    }
}

fn nonzero_scalar<C: DacssCurve>() -> Scalar<C> {
    loop {
        let scalar: Scalar<C> = random_scalar(&mut OsRng);
        if !scalar.is_zero() {
            return scalar;
        }
    }
}
