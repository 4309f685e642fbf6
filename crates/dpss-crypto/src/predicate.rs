//! Decrypt-and-verify check on a dealt share.

use crate::channel;
use crate::curve::{DacssCurve, Scalar};
use crate::feldman::FeldmanCommitments;
use crate::shamir::ShamirShare;

/// A share that decrypted and matched the dealer's commitments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedShare<C: DacssCurve> {
    pub share: ShamirShare<Scalar<C>>,
    pub commitments: FeldmanCommitments<C>,
}

/// Decrypt `ciphertext` with the ECDH point `key` and check the result
/// against the `k` compressed commitments.
///
/// Returns `None` on any failure: bad tag, undecodable share or
/// commitments, or a share that is off the committed polynomial. Callers
/// treat all of these the same way.
pub fn predicate<C: DacssCurve>(
    key: &C,
    ciphertext: &[u8],
    commitments: &[u8],
    k: usize,
) -> Option<VerifiedShare<C>> {
    let plaintext = match channel::decrypt(key, ciphertext) {
        Ok(plaintext) => plaintext,
        Err(e) => {
            tracing::debug!(error = %e, "predicate: share decryption failed");
            return None;
        }
    };
    let share = match ShamirShare::<Scalar<C>>::from_bytes(&plaintext) {
        Ok(share) => share,
        Err(e) => {
            tracing::debug!(error = %e, "predicate: share decoding failed");
            return None;
        }
    };
    let commitments = match FeldmanCommitments::<C>::from_bytes(commitments, k) {
        Ok(commitments) => commitments,
        Err(e) => {
            tracing::debug!(error = %e, "predicate: commitment decoding failed");
            return None;
        }
    };
    if !commitments.verify(&share) {
        tracing::debug!(share_id = share.id, "predicate: share off committed polynomial");
        return None;
    }
    Some(VerifiedShare { share, commitments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::shared_key;
    use crate::curve::{keypair, random_scalar, Secp256k1};
    use crate::shamir::Shamir;
    use rand::rngs::OsRng;

    struct Dealt {
        key: Secp256k1,
        commitments: Vec<u8>,
        shares: Vec<ShamirShare<Scalar<Secp256k1>>>,
    }

    fn deal() -> Dealt {
        let shamir = Shamir::new(3, 7).expect("params");
        let secret: Scalar<Secp256k1> = random_scalar(&mut OsRng);
        let (polynomial, shares) = shamir.split_with_polynomial(secret, &mut OsRng).expect("split");
        let commitments = FeldmanCommitments::<Secp256k1>::commit(&polynomial)
            .to_bytes()
            .expect("encode");
        let (sk, _) = keypair::<Secp256k1, _>(&mut OsRng);
        let (_, pk) = keypair::<Secp256k1, _>(&mut OsRng);
        Dealt {
            key: shared_key(&sk, &pk),
            commitments,
            shares,
        }
    }

    #[test]
    fn test_accepts_every_honest_share() {
        let dealt = deal();
        for share in &dealt.shares {
            let ciphertext =
                channel::encrypt(&dealt.key, &share.to_bytes().expect("encode")).expect("encrypt");
            let verified = predicate(&dealt.key, &ciphertext, &dealt.commitments, 3).expect("valid");
            assert_eq!(&verified.share, share);
        }
    }

    #[test]
    fn test_rejects_share_off_polynomial() {
        let dealt = deal();
        let mut share = dealt.shares[2].clone();
        share.value += Scalar::<Secp256k1>::from(1u64);
        let ciphertext =
            channel::encrypt(&dealt.key, &share.to_bytes().expect("encode")).expect("encrypt");
        assert!(predicate(&dealt.key, &ciphertext, &dealt.commitments, 3).is_none());
    }

    #[test]
    fn test_rejects_wrong_key() {
        let dealt = deal();
        let ciphertext = channel::encrypt(&dealt.key, &dealt.shares[0].to_bytes().expect("encode"))
            .expect("encrypt");
        let (sk, pk) = keypair::<Secp256k1, _>(&mut OsRng);
        let other = shared_key(&sk, &pk);
        assert!(predicate(&other, &ciphertext, &dealt.commitments, 3).is_none());
    }

    #[test]
    fn test_rejects_wrong_threshold() {
        let dealt = deal();
        let ciphertext = channel::encrypt(&dealt.key, &dealt.shares[0].to_bytes().expect("encode"))
            .expect("encrypt");
        assert!(predicate(&dealt.key, &ciphertext, &dealt.commitments, 2).is_none());
    }
}
